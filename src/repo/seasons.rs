//! Season repository.
//!
//! Seasons are fetched per show and season number and are not cached:
//! episode metadata is small and view-scoped, so every fetch goes to the
//! network.

use crate::error::DataError;
use crate::model::Season;
use crate::net::{DataTransferService, Endpoint, ResponseEnvelope};
use crate::task::TransferTask;

pub struct SeasonRepository {
  service: DataTransferService,
}

impl SeasonRepository {
  pub fn new(service: DataTransferService) -> Self {
    Self { service }
  }

  /// Fetch one season of a show. Cancelling the returned task suppresses
  /// `completion`.
  pub fn get_season(
    &self,
    media_slug: &str,
    number: u32,
    completion: impl FnOnce(Result<ResponseEnvelope<Season>, DataError>) + Send + 'static,
  ) -> TransferTask {
    let endpoint = Endpoint::get(format!("api/v1/media/{}/seasons/{}", media_slug, number));
    self.service.request(
      endpoint,
      move |result: Result<ResponseEnvelope<Season>, _>| {
        completion(result.map_err(DataError::from));
      },
    )
  }
}
