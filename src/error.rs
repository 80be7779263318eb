//! Error surface of the data layer.
//!
//! Cancellation is deliberately absent: a cancelled task never completes its
//! callback, so there is nothing to report.

use thiserror::Error;

use crate::net::TransportError;
use crate::store::StoreError;

/// Any failure a repository or use case can surface to its caller.
///
/// Errors are propagated, never retried or swallowed at this layer; the
/// caller decides whether to retry, surface a message, or keep showing
/// cached data.
#[derive(Debug, Clone, Error)]
pub enum DataError {
  #[error(transparent)]
  Transport(#[from] TransportError),
  #[error(transparent)]
  Store(#[from] StoreError),
}

pub type DataResult<T> = Result<T, DataError>;
