//! Data-access and caching core for the Reel streaming client.
//!
//! The crate is organized leaf-first:
//!
//! - [`observable`] — single-value reactive cell with replay-on-subscribe
//! - [`task`] — cancellable task handles and the one-live-task slot
//! - [`net`] — endpoint descriptors, HTTP transport, data-transfer service
//! - [`store`] — durable keyed request/response cache (SQLite)
//! - [`repo`] — per-resource façades binding the service to the store
//! - [`images`] — keyed in-memory image cache with network-backed fill
//! - [`usecase`] — named operations composed from repository calls
//!
//! Everything is injected through explicit construction: one
//! [`store::SqliteResponseStore`] and one [`images::ImageCacheService`] are
//! created at startup and shared via `Arc`. A tokio runtime is assumed;
//! workers are spawned on it and completion callbacks fire there.

pub mod config;
pub mod error;
pub mod images;
pub mod model;
pub mod net;
pub mod observable;
pub mod repo;
pub mod store;
pub mod task;
pub mod usecase;

pub use config::{ApiConfig, ConfigError};
pub use error::{DataError, DataResult};
pub use observable::{Observable, SubscriptionId};
pub use task::{TaskSlot, TransferTask};
