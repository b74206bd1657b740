//! gRPC server adapter for the rpc role.

use std::net::SocketAddr;

use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tracing::info;

use crate::error::Error;
use crate::host::{RpcServeable, ServeOutcome, Serveable};

pub use tonic::service::Routes;

/// A named gRPC service pending registration.
///
/// Registration is deferred as a closure so any generated tonic service
/// can be added to the server's route set without this crate naming its
/// concrete type:
///
/// ```rust,ignore
/// let service = RpcService::from_fn("grpc.health.v1.Health", move |routes| {
///     routes.add_service(health_service)
/// });
/// ```
pub struct RpcService {
    name: String,
    register: Box<dyn FnOnce(Routes) -> Routes + Send>,
}

impl RpcService {
    pub fn from_fn<F>(name: impl Into<String>, register: F) -> Self
    where
        F: FnOnce(Routes) -> Routes + Send + 'static,
    {
        Self {
            name: name.into(),
            register: Box::new(register),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A gRPC server which services requests on a single listen address.
///
/// Created with no services registered and not yet accepting requests;
/// stops gracefully, draining in-flight RPCs before the terminal
/// outcome is delivered.
pub struct GrpcServer {
    addr: SocketAddr,
    routes: Mutex<Routes>,
    shutdown: CancellationToken,
}

impl GrpcServer {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            routes: Mutex::new(Routes::default()),
            shutdown: CancellationToken::new(),
        }
    }
}

impl Serveable for GrpcServer {
    fn serve(&self, result: oneshot::Sender<ServeOutcome>) {
        let addr = self.addr;
        let routes = std::mem::take(&mut *self.routes.lock());
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            info!(server = "grpc", %addr, "serving");
            let outcome = serve_routes(addr, routes, shutdown).await;
            info!(server = "grpc", %addr, "serving complete");
            let _ = result.send(outcome);
        });
    }

    fn stop(&self) {
        self.shutdown.cancel();
        info!(server = "grpc", "stop requested");
    }
}

impl RpcServeable for GrpcServer {
    fn register(&self, services: Vec<RpcService>) {
        let mut routes = self.routes.lock();
        for service in services {
            info!(server = "grpc", service = %service.name, "registered");
            let RpcService { register, .. } = service;
            *routes = register(std::mem::take(&mut *routes));
        }
    }
}

async fn serve_routes(
    addr: SocketAddr,
    routes: Routes,
    shutdown: CancellationToken,
) -> ServeOutcome {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| Error::Bind { addr, source })?;
    info!(server = "grpc", %addr, "listening");

    Server::builder()
        .add_routes(routes)
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown.cancelled_owned())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::time::Duration;

    fn loopback() -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, 0))
    }

    #[tokio::test]
    async fn serve_then_stop_is_clean() {
        let server = GrpcServer::new(loopback());
        let (tx, rx) = oneshot::channel();
        server.serve(tx);

        tokio::time::sleep(Duration::from_millis(50)).await;
        server.stop();

        assert!(rx.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_safe_before_serve() {
        let server = GrpcServer::new(loopback());
        server.stop();
        server.stop();

        let (tx, rx) = oneshot::channel();
        server.serve(tx);

        // The gate is already open, so the server winds down on its own.
        assert!(rx.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn occupied_port_reports_bind_error() {
        let taken = TcpListener::bind(loopback()).await.unwrap();
        let addr = taken.local_addr().unwrap();

        let server = GrpcServer::new(addr);
        let (tx, rx) = oneshot::channel();
        server.serve(tx);

        let err = rx.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Bind { .. }));
        assert!(err.to_string().contains(&addr.to_string()));
    }
}
