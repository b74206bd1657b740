#![doc = include_str!("../README.md")]

pub mod error;
pub mod grpc;
pub mod host;
pub mod http;
mod signal;
pub mod sql;

pub use error::{BoxError, Error, MultiError, Result};
pub use host::{Host, HttpServeable, RpcServeable, Serveable, Stopper};
// Public re-export so downstream crates can name the cancellation context
// type without depending on `tokio_util` directly.
pub use tokio_util::sync::CancellationToken;
