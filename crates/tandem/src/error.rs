//! Error types for the host and its server adapters.
//!
//! The central [`Error`] enum covers every failure a hosted server can
//! surface through the orchestrator, plus [`MultiError`], the ordered
//! aggregate produced when both server roles fail during the same
//! shutdown.

use core::fmt;
use std::net::SocketAddr;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// A type-erased error, used at the database boundary.
pub type BoxError = Box<dyn core::error::Error + Send + Sync + 'static>;

/// Unified error type for the tandem runtime.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The server could not bind its listen address.
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// The gRPC transport failed while serving.
    #[error("grpc server error: {0}")]
    Rpc(#[from] tonic::transport::Error),

    /// The HTTP server failed while serving.
    #[error("http server error: {0}")]
    Http(#[source] std::io::Error),

    /// An OS signal handler could not be installed.
    #[error("failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),

    /// The database handle reported a failure.
    #[error("database error: {0}")]
    Database(#[source] BoxError),

    /// An opaque failure reported by a hosted service. Surfaced to the
    /// caller exactly as the service produced it.
    #[error("{0}")]
    Service(String),

    /// Both server roles failed; the individual errors are preserved in
    /// encounter order.
    #[error(transparent)]
    Aggregate(MultiError),
}

/// An ordered, immutable collection of errors produced at the shutdown
/// join point.
///
/// Renders as a header line followed by one tab-indented line per
/// constituent error, in construction order. Two aggregates with the
/// same constituent messages in the same order render identically, so
/// tests may compare them by string.
#[derive(Debug, Default)]
pub struct MultiError {
    errors: Vec<Error>,
}

impl MultiError {
    /// Builds an aggregate from the given errors, preserving encounter
    /// order and dropping duplicates (two errors are duplicates when
    /// they render to the same message).
    pub fn new<I>(errors: I) -> Self
    where
        I: IntoIterator<Item = Error>,
    {
        let mut seen: Vec<String> = Vec::new();
        let mut unique = Vec::new();
        for err in errors {
            let msg = err.to_string();
            if seen.contains(&msg) {
                continue;
            }
            seen.push(msg);
            unique.push(err);
        }
        Self { errors: unique }
    }

    /// The constituent errors, in construction order.
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Errors:")?;
        for err in &self.errors {
            write!(f, "\n\t{err}")?;
        }
        Ok(())
    }
}

impl core::error::Error for MultiError {}

impl PartialEq for MultiError {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}
