//! Data-transfer service: the single place responses are decoded.
//!
//! Wraps the transport and surfaces two calling conventions with identical
//! semantics: [`request`] returns a cancellable handle synchronously and
//! invokes its completion callback exactly once — never twice, and never
//! after cancellation; [`call`] is the plain async variant for flows with no
//! cancellation slot.
//!
//! [`request`]: DataTransferService::request
//! [`call`]: DataTransferService::call

use serde::de::DeserializeOwned;

use crate::task::TransferTask;

use super::endpoint::Endpoint;
use super::transport::{HttpTransport, TransportResult};

#[derive(Debug, Clone)]
pub struct DataTransferService {
  transport: HttpTransport,
}

impl DataTransferService {
  pub fn new(transport: HttpTransport) -> Self {
    Self { transport }
  }

  /// Execute `endpoint` and decode the response.
  pub async fn call<R>(&self, endpoint: Endpoint<R>) -> TransportResult<R>
  where
    R: DeserializeOwned,
  {
    self.transport.execute(&endpoint).await
  }

  /// Execute `endpoint` on a worker task.
  ///
  /// The returned handle is live immediately; cancelling it aborts the
  /// worker and suppresses `completion`. A completed task invokes
  /// `completion` exactly once with the decoded result or the classified
  /// failure.
  pub fn request<R, F>(&self, endpoint: Endpoint<R>, completion: F) -> TransferTask
  where
    R: DeserializeOwned + Send + 'static,
    F: FnOnce(TransportResult<R>) + Send + 'static,
  {
    let task = TransferTask::new();
    let transport = self.transport.clone();
    let guard = task.clone();

    let join = tokio::spawn(async move {
      let result = transport.execute(&endpoint).await;
      // Completed and cancelled are mutually exclusive: a cancelled task
      // must never reach its completion callback.
      if guard.mark_completed() {
        completion(result);
      }
    });
    task.bind(join.abort_handle());

    task
  }
}
