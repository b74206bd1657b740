//! HTTP server adapter for the protocol role.

use std::net::SocketAddr;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::Error;
use crate::host::{HttpServeable, ServeOutcome, Serveable};

/// How long a stopped server may keep draining in-flight connections
/// before they are abandoned.
const DEFAULT_DRAIN: Duration = Duration::from_secs(10);

/// An HTTP server which services requests on a single listen address.
///
/// Stopping is graceful: the listener closes immediately and in-flight
/// connections get a bounded drain window.
pub struct HttpServer {
    addr: SocketAddr,
    router: Mutex<Option<axum::Router>>,
    shutdown: CancellationToken,
    drain: Duration,
}

impl HttpServer {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            router: Mutex::new(None),
            shutdown: CancellationToken::new(),
            drain: DEFAULT_DRAIN,
        }
    }

    /// Overrides the drain window applied after a stop request.
    pub fn with_drain(mut self, drain: Duration) -> Self {
        self.drain = drain;
        self
    }
}

impl Serveable for HttpServer {
    fn serve(&self, result: oneshot::Sender<ServeOutcome>) {
        let addr = self.addr;
        let router = self.router.lock().take().unwrap_or_default();
        let shutdown = self.shutdown.clone();
        let drain = self.drain;

        tokio::spawn(async move {
            info!(server = "http", %addr, "serving");
            let outcome = serve_router(addr, router, shutdown, drain).await;
            info!(server = "http", %addr, "serving complete");
            let _ = result.send(outcome);
        });
    }

    fn stop(&self) {
        self.shutdown.cancel();
        info!(server = "http", "stop requested");
    }
}

impl HttpServeable for HttpServer {
    fn handle(&self, router: axum::Router) {
        *self.router.lock() = Some(router);
    }
}

async fn serve_router(
    addr: SocketAddr,
    router: axum::Router,
    shutdown: CancellationToken,
    drain: Duration,
) -> ServeOutcome {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| Error::Bind { addr, source })?;
    info!(server = "http", %addr, "listening");

    let deadline = {
        let shutdown = shutdown.clone();
        async move {
            shutdown.cancelled().await;
            tokio::time::sleep(drain).await;
        }
    };

    let graceful =
        axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned());

    tokio::select! {
        res = graceful => res.map_err(Error::Http),
        () = deadline => {
            warn!(server = "http", "drain deadline exceeded, abandoning open connections");
            Ok(())
        }
    }
}
