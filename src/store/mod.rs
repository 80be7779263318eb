//! Persistent response store.
//!
//! Durable, keyed storage of the last-known request/response pair per
//! resource kind. At most one record exists per natural key per resource:
//! writes delete the prior record before inserting the new one, inside a
//! single transaction, so a concurrent reader observes either the old or the
//! new complete record and never a gap. Lookup is by exact natural-key match.

mod sqlite;

pub use sqlite::SqliteResponseStore;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Persistence failures, one variant per operation so callers can tell a
/// degraded read from a dropped write.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
  #[error("cache read failed: {0}")]
  Read(String),
  #[error("cache save failed: {0}")]
  Save(String),
  #[error("cache delete failed: {0}")]
  Delete(String),
}

/// A request that keys a cached response.
///
/// Implementors name their resource kind and derive the natural key under
/// which this request's response is stored (a user id, "singleton" for
/// process-wide lists, a hash for parameterized queries).
pub trait StoreRequest: Serialize + DeserializeOwned + Clone + Send + Sync {
  /// Resource kind; one partition of the store per kind.
  const RESOURCE: &'static str;

  /// Natural key identifying the single record this request maps to.
  fn natural_key(&self) -> String;
}

/// Stable fixed-length key for parameterized requests.
pub fn hashed_key(input: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(input.as_bytes());
  hex::encode(hasher.finalize())
}

/// The persisted (request, response) pair for one natural key.
#[derive(Debug, Clone)]
pub struct CachedRecord<Q, T> {
  /// The request that produced the response; kept so records can be
  /// invalidated by request alone.
  pub request: Q,
  pub response: T,
  pub cached_at: DateTime<Utc>,
}

/// Storage backend contract.
///
/// A `save` must be durable before it returns; errors are reported, never
/// swallowed.
pub trait ResponseStore: Send + Sync {
  /// Last-known record for this request's natural key, if any.
  fn response_for<Q, T>(&self, request: &Q) -> Result<Option<CachedRecord<Q, T>>, StoreError>
  where
    Q: StoreRequest,
    T: DeserializeOwned;

  /// Replace the record under this request's natural key
  /// (delete-then-insert, never update-in-place).
  fn save<Q, T>(&self, request: &Q, response: &T) -> Result<(), StoreError>
  where
    Q: StoreRequest,
    T: Serialize;

  /// Drop the record under this request's natural key. Deleting a missing
  /// record is not an error.
  fn delete<Q>(&self, request: &Q) -> Result<(), StoreError>
  where
    Q: StoreRequest;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hashed_key_is_stable_and_hex() {
    let a = hashed_key("genre:drama");
    let b = hashed_key("genre:drama");
    assert_eq!(a, b);
    assert_eq!(a.len(), 64);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
  }

  #[test]
  fn hashed_key_distinguishes_inputs() {
    assert_ne!(hashed_key("genre:drama"), hashed_key("genre:comedy"));
  }
}
