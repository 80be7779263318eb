//! Home-screen sections repository.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::DataError;
use crate::model::Section;
use crate::net::{DataTransferService, Endpoint, ResponseEnvelope};
use crate::store::{ResponseStore, StoreRequest};
use crate::task::TransferTask;

/// There is exactly one curated section set per process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionsRequest;

impl StoreRequest for SectionsRequest {
  const RESOURCE: &'static str = "sections";

  fn natural_key(&self) -> String {
    "singleton".into()
  }
}

/// Repository for curated home-screen rows; cache-first like the catalog.
pub struct SectionRepository<S> {
  service: DataTransferService,
  store: Arc<S>,
}

impl<S: ResponseStore + 'static> SectionRepository<S> {
  pub fn new(service: DataTransferService, store: Arc<S>) -> Self {
    Self { service, store }
  }

  /// Cache-first fetch of all sections; the network refresh always runs and
  /// overwrites the singleton record.
  pub fn get_all(
    &self,
    cached: impl FnOnce(Option<ResponseEnvelope<Vec<Section>>>) + Send + 'static,
    completion: impl FnOnce(Result<ResponseEnvelope<Vec<Section>>, DataError>) + Send + 'static,
  ) -> TransferTask {
    let request = SectionsRequest;

    match self.store.response_for::<SectionsRequest, ResponseEnvelope<Vec<Section>>>(&request) {
      Ok(record) => cached(record.map(|r| r.response)),
      Err(e) => {
        warn!(error = %e, "sections cache read failed, treating as miss");
        cached(None);
      }
    }

    let endpoint = Endpoint::get("api/v1/sections");
    let store = Arc::clone(&self.store);
    self.service.request(
      endpoint,
      move |result: Result<ResponseEnvelope<Vec<Section>>, _>| {
        let outcome = result.map_err(DataError::from).and_then(|envelope| {
          store.save(&request, &envelope).map_err(DataError::from)?;
          Ok(envelope)
        });
        completion(outcome);
      },
    )
  }
}
