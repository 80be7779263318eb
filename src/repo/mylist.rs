//! My-list repository.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::error::DataError;
use crate::model::MyList;
use crate::net::{DataTransferService, Endpoint, ResponseEnvelope};
use crate::store::{ResponseStore, StoreRequest};
use crate::task::TransferTask;

/// One saved-titles list per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MyListRequest {
  pub user_id: String,
}

impl StoreRequest for MyListRequest {
  const RESOURCE: &'static str = "my_list";

  fn natural_key(&self) -> String {
    self.user_id.clone()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MyListAction {
  Add,
  Remove,
}

impl MyListAction {
  fn as_str(self) -> &'static str {
    match self {
      MyListAction::Add => "add",
      MyListAction::Remove => "remove",
    }
  }
}

/// Repository for a user's saved-titles list. Reads are cache-first;
/// mutations go to the network and replace the cached record with the
/// returned list.
pub struct MyListRepository<S> {
  service: DataTransferService,
  store: Arc<S>,
}

impl<S: ResponseStore + 'static> MyListRepository<S> {
  pub fn new(service: DataTransferService, store: Arc<S>) -> Self {
    Self { service, store }
  }

  /// Cache-first fetch of the user's list; the network refresh always runs
  /// and overwrites the record.
  pub fn get(
    &self,
    request: MyListRequest,
    cached: impl FnOnce(Option<ResponseEnvelope<MyList>>) + Send + 'static,
    completion: impl FnOnce(Result<ResponseEnvelope<MyList>, DataError>) + Send + 'static,
  ) -> TransferTask {
    match self.store.response_for::<MyListRequest, ResponseEnvelope<MyList>>(&request) {
      Ok(record) => cached(record.map(|r| r.response)),
      Err(e) => {
        warn!(error = %e, "my-list cache read failed, treating as miss");
        cached(None);
      }
    }

    let endpoint = Endpoint::get(format!("api/v1/mylists/{}", request.user_id));
    let store = Arc::clone(&self.store);
    self.service.request(
      endpoint,
      move |result: Result<ResponseEnvelope<MyList>, _>| {
        let outcome = result.map_err(DataError::from).and_then(|envelope| {
          store.save(&request, &envelope).map_err(DataError::from)?;
          Ok(envelope)
        });
        completion(outcome);
      },
    )
  }

  /// Add or remove one title. Always a network call; the server responds
  /// with the updated list, which replaces the cached record.
  pub fn update(
    &self,
    user_id: &str,
    media_slug: &str,
    action: MyListAction,
    completion: impl FnOnce(Result<ResponseEnvelope<MyList>, DataError>) + Send + 'static,
  ) -> TransferTask {
    let request = MyListRequest {
      user_id: user_id.to_string(),
    };
    let endpoint = Endpoint::patch(format!("api/v1/mylists/{}", user_id)).with_body(json!({
      "media": media_slug,
      "action": action.as_str(),
    }));

    let store = Arc::clone(&self.store);
    self.service.request(
      endpoint,
      move |result: Result<ResponseEnvelope<MyList>, _>| {
        let outcome = result.map_err(DataError::from).and_then(|envelope| {
          store.save(&request, &envelope).map_err(DataError::from)?;
          Ok(envelope)
        });
        completion(outcome);
      },
    )
  }
}
