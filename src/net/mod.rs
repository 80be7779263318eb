//! Network stack: endpoint descriptors, HTTP transport, data-transfer
//! service.
//!
//! The transport executes; the service decodes and hands out cancellable
//! handles. Nothing here retries — failed requests are classified and
//! surfaced to the caller.

mod endpoint;
mod service;
mod transport;
mod types;

pub use endpoint::Endpoint;
pub use service::DataTransferService;
pub use transport::{HttpTransport, TransportError, TransportResult};
pub use types::{ApiErrorBody, BodyEncoding, Method, ResponseEnvelope};
