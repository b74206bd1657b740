//! The database boundary owned by the host.
//!
//! Driver and connection-pool internals live outside this crate; the
//! host only needs a handle it can health-check and release exactly
//! once at the shutdown join point.

use async_trait::async_trait;

use crate::error::Result;

/// A shared database handle.
///
/// `close` consumes the boxed handle, so a handle cannot be released
/// twice.
#[async_trait]
pub trait Database: Send + Sync + 'static {
    /// Verifies the underlying connection is usable.
    async fn ping(&self) -> Result<()>;

    /// Releases the handle and any pooled connections behind it.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A database that accepts every call and holds nothing. Useful for
/// hosts without persistence and in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDatabase;

#[async_trait]
impl Database for NullDatabase {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
