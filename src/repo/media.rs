//! Media catalog repository.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::DataError;
use crate::model::Media;
use crate::net::{DataTransferService, Endpoint, ResponseEnvelope};
use crate::store::{hashed_key, ResponseStore, StoreRequest};
use crate::task::TransferTask;

/// Catalog list request; the unfiltered list is the singleton record,
/// filtered lists key on a hash of their normalized parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaListRequest {
  #[serde(default)]
  pub genre: Option<String>,
}

impl StoreRequest for MediaListRequest {
  const RESOURCE: &'static str = "media_list";

  fn natural_key(&self) -> String {
    match &self.genre {
      None => "singleton".into(),
      Some(genre) => hashed_key(&format!("genre:{}", genre.trim().to_lowercase())),
    }
  }
}

/// Repository for the media catalog. Lists are cache-first; search is
/// network-only.
pub struct MediaRepository<S> {
  service: DataTransferService,
  store: Arc<S>,
}

impl<S: ResponseStore + 'static> MediaRepository<S> {
  pub fn new(service: DataTransferService, store: Arc<S>) -> Self {
    Self { service, store }
  }

  /// Cache-first list fetch.
  ///
  /// Any cached record reaches `cached` first; the network refresh always
  /// runs regardless, and its response overwrites the record — last network
  /// response wins. Cancelling the returned task suppresses `completion`.
  pub fn get_all(
    &self,
    request: MediaListRequest,
    cached: impl FnOnce(Option<ResponseEnvelope<Vec<Media>>>) + Send + 'static,
    completion: impl FnOnce(Result<ResponseEnvelope<Vec<Media>>, DataError>) + Send + 'static,
  ) -> TransferTask {
    match self.store.response_for::<MediaListRequest, ResponseEnvelope<Vec<Media>>>(&request) {
      Ok(record) => cached(record.map(|r| r.response)),
      Err(e) => {
        warn!(error = %e, "media cache read failed, treating as miss");
        cached(None);
      }
    }

    let mut endpoint = Endpoint::get("api/v1/media");
    if let Some(genre) = &request.genre {
      endpoint = endpoint.with_query("genre", genre);
    }

    let store = Arc::clone(&self.store);
    self.service.request(
      endpoint,
      move |result: Result<ResponseEnvelope<Vec<Media>>, _>| {
        let outcome = result.map_err(DataError::from).and_then(|envelope| {
          store.save(&request, &envelope).map_err(DataError::from)?;
          Ok(envelope)
        });
        completion(outcome);
      },
    )
  }

  /// Title search. Network-only: transient queries never touch the store.
  pub fn search(
    &self,
    query: &str,
    completion: impl FnOnce(Result<ResponseEnvelope<Vec<Media>>, DataError>) + Send + 'static,
  ) -> TransferTask {
    let endpoint = Endpoint::get("api/v1/media/search").with_query("q", query);
    self.service.request(
      endpoint,
      move |result: Result<ResponseEnvelope<Vec<Media>>, _>| {
        completion(result.map_err(DataError::from));
      },
    )
  }
}
