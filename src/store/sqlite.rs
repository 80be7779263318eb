//! SQLite-backed response store.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{CachedRecord, ResponseStore, StoreError, StoreRequest};

/// Schema for the response cache.
const STORE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS response_cache (
    resource TEXT NOT NULL,
    natural_key TEXT NOT NULL,
    request BLOB NOT NULL,
    response BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (resource, natural_key)
);
"#;

/// Response store over a single SQLite connection.
///
/// All operations serialize on the connection mutex; `save` runs its
/// delete-then-insert inside one transaction and commits before returning.
pub struct SqliteResponseStore {
  conn: Mutex<Connection>,
}

impl SqliteResponseStore {
  /// Open the store at the default platform location, creating parent
  /// directories as needed. `cache_dir` overrides the directory.
  pub fn open(cache_dir: Option<&Path>) -> Result<Self, StoreError> {
    let path = match cache_dir {
      Some(dir) => dir.join("responses.db"),
      None => Self::default_path()?,
    };
    Self::open_at(&path)
  }

  /// Open or create the store at an explicit path.
  pub fn open_at(path: &Path) -> Result<Self, StoreError> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| StoreError::Save(format!("failed to create cache directory: {}", e)))?;
    }

    let conn = Connection::open(path).map_err(|e| {
      StoreError::Read(format!("failed to open cache database at {}: {}", path.display(), e))
    })?;

    Self::from_connection(conn)
  }

  /// In-memory store; used by tests and cache-less embedders.
  pub fn in_memory() -> Result<Self, StoreError> {
    let conn = Connection::open_in_memory()
      .map_err(|e| StoreError::Read(format!("failed to open in-memory database: {}", e)))?;
    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self, StoreError> {
    conn
      .execute_batch(STORE_SCHEMA)
      .map_err(|e| StoreError::Save(format!("failed to run cache migrations: {}", e)))?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  fn default_path() -> Result<PathBuf, StoreError> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| StoreError::Read("could not determine data directory".into()))?;

    Ok(data_dir.join("reelkit").join("responses.db"))
  }
}

impl ResponseStore for SqliteResponseStore {
  fn response_for<Q, T>(&self, request: &Q) -> Result<Option<CachedRecord<Q, T>>, StoreError>
  where
    Q: StoreRequest,
    T: DeserializeOwned,
  {
    let conn = self
      .conn
      .lock()
      .map_err(|e| StoreError::Read(format!("lock poisoned: {}", e)))?;

    let row: Option<(Vec<u8>, Vec<u8>, String)> = conn
      .query_row(
        "SELECT request, response, cached_at FROM response_cache
         WHERE resource = ?1 AND natural_key = ?2",
        params![Q::RESOURCE, request.natural_key()],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
      )
      .optional()
      .map_err(|e| StoreError::Read(e.to_string()))?;

    let Some((request_blob, response_blob, cached_at)) = row else {
      return Ok(None);
    };

    let request: Q = serde_json::from_slice(&request_blob)
      .map_err(|e| StoreError::Read(format!("failed to decode cached request: {}", e)))?;
    let response: T = serde_json::from_slice(&response_blob)
      .map_err(|e| StoreError::Read(format!("failed to decode cached response: {}", e)))?;

    Ok(Some(CachedRecord {
      request,
      response,
      cached_at: parse_datetime(&cached_at)?,
    }))
  }

  fn save<Q, T>(&self, request: &Q, response: &T) -> Result<(), StoreError>
  where
    Q: StoreRequest,
    T: Serialize,
  {
    let key = request.natural_key();
    let request_blob = serde_json::to_vec(request)
      .map_err(|e| StoreError::Save(format!("failed to serialize request: {}", e)))?;
    let response_blob = serde_json::to_vec(response)
      .map_err(|e| StoreError::Save(format!("failed to serialize response: {}", e)))?;

    let mut conn = self
      .conn
      .lock()
      .map_err(|e| StoreError::Save(format!("lock poisoned: {}", e)))?;

    let tx = conn
      .transaction()
      .map_err(|e| StoreError::Save(e.to_string()))?;

    tx.execute(
      "DELETE FROM response_cache WHERE resource = ?1 AND natural_key = ?2",
      params![Q::RESOURCE, key],
    )
    .map_err(|e| StoreError::Save(e.to_string()))?;

    tx.execute(
      "INSERT INTO response_cache (resource, natural_key, request, response, cached_at)
       VALUES (?1, ?2, ?3, ?4, datetime('now'))",
      params![Q::RESOURCE, key, request_blob, response_blob],
    )
    .map_err(|e| StoreError::Save(e.to_string()))?;

    tx.commit().map_err(|e| StoreError::Save(e.to_string()))
  }

  fn delete<Q>(&self, request: &Q) -> Result<(), StoreError>
  where
    Q: StoreRequest,
  {
    let conn = self
      .conn
      .lock()
      .map_err(|e| StoreError::Delete(format!("lock poisoned: {}", e)))?;

    conn
      .execute(
        "DELETE FROM response_cache WHERE resource = ?1 AND natural_key = ?2",
        params![Q::RESOURCE, request.natural_key()],
      )
      .map_err(|e| StoreError::Delete(e.to_string()))?;

    Ok(())
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| StoreError::Read(format!("failed to parse datetime '{}': {}", s, e)))
}
