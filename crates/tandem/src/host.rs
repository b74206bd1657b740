//! Dual-server lifecycle orchestration.
//!
//! A [`Host`] owns exactly two hosted servers — an rpc role and an http
//! role — plus the shared database handle both depend on. It starts the
//! servers concurrently and coordinates their shutdown so that:
//!
//! - a stop request from any source (an explicit [`Stopper`], the
//!   caller-supplied cancellation context, an OS termination signal, or
//!   one server finishing on its own) converges on one single-fire stop
//!   gate,
//! - the database handle is released exactly once, and never before
//!   both servers have reported their terminal outcome,
//! - every service error is surfaced to the caller, in encounter order
//!   when both roles fail.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, MultiError, Result};
use crate::grpc::RpcService;
use crate::signal::Signals;
use crate::sql::Database;

/// Default time to linger after shutdown so buffered log output can
/// flush before the process exits.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(1);

/// Terminal outcome of a single serve lifecycle.
pub type ServeOutcome = Result<()>;

/// The capability contract a hosted server must provide.
pub trait Serveable: Send + Sync + 'static {
    /// Begins accepting traffic. Must not block the caller beyond
    /// initial setup: implementations spawn their own task and deliver
    /// exactly one terminal outcome on `result` when they stop serving
    /// for any reason. Dropping the sender without a value counts as a
    /// clean stop.
    fn serve(&self, result: oneshot::Sender<ServeOutcome>);

    /// Requests a graceful halt. Safe to call before `serve`, after the
    /// outcome has been delivered, and any number of times from any
    /// task.
    fn stop(&self);
}

/// The rpc role: a [`Serveable`] that accepts gRPC service registration.
pub trait RpcServeable: Serveable {
    fn register(&self, services: Vec<RpcService>);
}

/// The http role: a [`Serveable`] that accepts an HTTP router.
pub trait HttpServeable: Serveable {
    fn handle(&self, router: axum::Router);
}

/// Cloneable handle that opens a host's stop gate.
///
/// Opening the gate is idempotent: any number of calls, from any task,
/// behave the same as a single call.
#[derive(Clone)]
pub struct Stopper(CancellationToken);

impl Stopper {
    pub fn stop(&self) {
        self.0.cancel();
    }
}

/// Hosts one rpc-role server and one http-role server as a single
/// logical process.
///
/// A host lives for exactly one [`serve`](Host::serve) call; `serve`
/// consumes the host, so a second lifecycle cannot be started.
pub struct Host {
    rpc: Arc<dyn RpcServeable>,
    http: Arc<dyn HttpServeable>,
    db: Box<dyn Database>,
    stop: CancellationToken,
    grace: Duration,
}

impl Host {
    pub fn new(
        rpc: impl RpcServeable,
        http: impl HttpServeable,
        db: impl Database,
    ) -> Self {
        Self {
            rpc: Arc::new(rpc),
            http: Arc::new(http),
            db: Box::new(db),
            stop: CancellationToken::new(),
            grace: DEFAULT_GRACE,
        }
    }

    /// Overrides the post-shutdown linger interval. Deployments whose
    /// logging flushes on drop can set this to zero.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// The shared database handle. The host retains exclusive ownership;
    /// the handle is released by the host once both servers have
    /// stopped.
    pub fn db(&self) -> &dyn Database {
        self.db.as_ref()
    }

    /// Registers gRPC services with the rpc-role server. Must be called
    /// before [`serve`](Host::serve).
    pub fn register(&self, services: Vec<RpcService>) {
        self.rpc.register(services);
    }

    /// Installs the HTTP router on the http-role server. Must be called
    /// before [`serve`](Host::serve).
    pub fn handle(&self, router: axum::Router) {
        self.http.handle(router);
    }

    /// Opens the stop gate. Idempotent.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// A handle that can open the stop gate from another task once
    /// `serve` has consumed the host.
    pub fn stopper(&self) -> Stopper {
        Stopper(self.stop.clone())
    }

    /// Runs both servers until they stop, then returns the joined
    /// outcome: `Ok` on a clean joint shutdown, the sole error if
    /// exactly one role failed, or an [`Error::Aggregate`] (rpc error
    /// first) if both did.
    ///
    /// Shutdown is triggered by whichever fires first: the stop gate,
    /// `ctx` being cancelled, an OS termination signal (SIGINT,
    /// SIGTERM, SIGQUIT), or either server finishing on its own. A
    /// failing server is not retried; it stops its sibling.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signal`] if the OS signal handlers cannot be
    /// installed; otherwise only what the hosted servers reported.
    pub async fn serve(self, ctx: CancellationToken) -> Result<()> {
        let Self {
            rpc,
            http,
            db,
            stop,
            grace,
        } = self;

        // Install signal handlers before anything is spawned so a
        // registration failure surfaces without a partial startup.
        let mut signals = Signals::install()?;

        let (rpc_tx, rpc_rx) = oneshot::channel();
        let (http_tx, http_rx) = oneshot::channel();
        rpc.serve(rpc_tx);
        http.serve(http_tx);

        let (done_tx, mut done_rx) = oneshot::channel();
        tokio::spawn(coordinate(
            stop.clone(),
            Arc::clone(&rpc),
            Arc::clone(&http),
            rpc_rx,
            http_rx,
            db,
            done_tx,
        ));

        let outcome = tokio::select! {
            res = &mut done_rx => res,
            () = ctx.cancelled() => {
                info!("shutdown requested by caller");
                stop.cancel();
                (&mut done_rx).await
            }
            name = signals.recv() => {
                info!(signal = name, "signal received");
                stop.cancel();
                (&mut done_rx).await
            }
        };

        // Linger so buffered log output can flush before the caller
        // exits.
        tokio::time::sleep(grace).await;

        outcome.unwrap_or(Ok(()))
    }
}

/// Races the stop gate against either server finishing, stops whatever
/// is still running, and releases the database once both outcomes are
/// in hand.
async fn coordinate(
    gate: CancellationToken,
    rpc: Arc<dyn RpcServeable>,
    http: Arc<dyn HttpServeable>,
    mut rpc_rx: oneshot::Receiver<ServeOutcome>,
    mut http_rx: oneshot::Receiver<ServeOutcome>,
    db: Box<dyn Database>,
    done: oneshot::Sender<ServeOutcome>,
) {
    let (rpc_res, http_res) = tokio::select! {
        () = gate.cancelled() => {
            debug!("stop gate opened, stopping both servers");
            rpc.stop();
            http.stop();
            ((&mut rpc_rx).await, (&mut http_rx).await)
        }
        res = &mut rpc_rx => {
            debug!("grpc server finished, stopping http server");
            http.stop();
            (res, (&mut http_rx).await)
        }
        res = &mut http_rx => {
            debug!("http server finished, stopping grpc server");
            rpc.stop();
            ((&mut rpc_rx).await, res)
        }
    };

    // The join point: both outcomes are known, so the shared handle may
    // go. A close failure never joins the returned error.
    if let Err(err) = db.close().await {
        warn!(error = %err, "database close failed");
    }

    let _ = done.send(join(outcome(rpc_res), outcome(http_res)));
}

/// Extracts the service's terminal error, if any, from a channel
/// receive. A sender dropped without a value counts as a clean stop.
fn outcome(res: core::result::Result<ServeOutcome, oneshot::error::RecvError>) -> Option<Error> {
    match res {
        Ok(Ok(())) | Err(_) => None,
        Ok(Err(err)) => Some(err),
    }
}

/// Joins the two terminal outcomes: clean when both are clean, the sole
/// error when one role failed, an aggregate (rpc first) when both did.
fn join(rpc: Option<Error>, http: Option<Error>) -> ServeOutcome {
    match (rpc, http) {
        (None, None) => Ok(()),
        (Some(err), None) | (None, Some(err)) => Err(err),
        (Some(rpc), Some(http)) => Err(Error::Aggregate(MultiError::new([rpc, http]))),
    }
}
