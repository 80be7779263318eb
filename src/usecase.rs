//! Use cases: semantically named operations composed from repository calls.
//!
//! Thin by design — a use case holds its repositories and forwards; failure
//! handling is pass-through. The search use case additionally owns the task
//! slot that serializes rapid repeated queries.

use std::sync::Arc;

use crate::error::DataError;
use crate::model::{Media, MyList, Season, Section, UserSession};
use crate::net::ResponseEnvelope;
use crate::repo::{
  AuthRepository, MediaListRequest, MediaRepository, MyListAction, MyListRepository,
  MyListRequest, SeasonRepository, SectionRepository, SignInRequest,
};
use crate::store::ResponseStore;
use crate::task::{TaskSlot, TransferTask};

pub struct SignInUseCase<S> {
  auth: Arc<AuthRepository<S>>,
}

impl<S: ResponseStore + 'static> SignInUseCase<S> {
  pub fn new(auth: Arc<AuthRepository<S>>) -> Self {
    Self { auth }
  }

  pub fn execute(
    &self,
    request: SignInRequest,
    cached: impl FnOnce(ResponseEnvelope<UserSession>) + Send + 'static,
    completion: impl FnOnce(Result<ResponseEnvelope<UserSession>, DataError>) + Send + 'static,
  ) -> Option<TransferTask> {
    self.auth.sign_in(request, cached, completion)
  }
}

pub struct FetchMediaCatalogUseCase<S> {
  media: Arc<MediaRepository<S>>,
}

impl<S: ResponseStore + 'static> FetchMediaCatalogUseCase<S> {
  pub fn new(media: Arc<MediaRepository<S>>) -> Self {
    Self { media }
  }

  pub fn execute(
    &self,
    request: MediaListRequest,
    cached: impl FnOnce(Option<ResponseEnvelope<Vec<Media>>>) + Send + 'static,
    completion: impl FnOnce(Result<ResponseEnvelope<Vec<Media>>, DataError>) + Send + 'static,
  ) -> TransferTask {
    self.media.get_all(request, cached, completion)
  }
}

/// Search-as-you-type entry point.
///
/// Owns a [`TaskSlot`]: each new query cancels the previous in-flight search
/// before starting, so a stale result can never land after a fresh one.
pub struct SearchMediaUseCase<S> {
  media: Arc<MediaRepository<S>>,
  slot: TaskSlot,
}

impl<S: ResponseStore + 'static> SearchMediaUseCase<S> {
  pub fn new(media: Arc<MediaRepository<S>>) -> Self {
    Self {
      media,
      slot: TaskSlot::new(),
    }
  }

  pub fn execute(
    &self,
    query: &str,
    completion: impl FnOnce(Result<ResponseEnvelope<Vec<Media>>, DataError>) + Send + 'static,
  ) -> TransferTask {
    let task = self.media.search(query, completion);
    self.slot.assign(task.clone());
    task
  }
}

pub struct FetchHomeSectionsUseCase<S> {
  sections: Arc<SectionRepository<S>>,
}

impl<S: ResponseStore + 'static> FetchHomeSectionsUseCase<S> {
  pub fn new(sections: Arc<SectionRepository<S>>) -> Self {
    Self { sections }
  }

  pub fn execute(
    &self,
    cached: impl FnOnce(Option<ResponseEnvelope<Vec<Section>>>) + Send + 'static,
    completion: impl FnOnce(Result<ResponseEnvelope<Vec<Section>>, DataError>) + Send + 'static,
  ) -> TransferTask {
    self.sections.get_all(cached, completion)
  }
}

pub struct FetchSeasonUseCase {
  seasons: Arc<SeasonRepository>,
}

impl FetchSeasonUseCase {
  pub fn new(seasons: Arc<SeasonRepository>) -> Self {
    Self { seasons }
  }

  pub fn execute(
    &self,
    media_slug: &str,
    number: u32,
    completion: impl FnOnce(Result<ResponseEnvelope<Season>, DataError>) + Send + 'static,
  ) -> TransferTask {
    self.seasons.get_season(media_slug, number, completion)
  }
}

/// Fetches the current user's list; composes the session observable with the
/// list repository.
pub struct FetchMyListUseCase<S> {
  auth: Arc<AuthRepository<S>>,
  list: Arc<MyListRepository<S>>,
}

impl<S: ResponseStore + 'static> FetchMyListUseCase<S> {
  pub fn new(auth: Arc<AuthRepository<S>>, list: Arc<MyListRepository<S>>) -> Self {
    Self { auth, list }
  }

  /// Returns `None` without invoking either callback when no session is
  /// active.
  pub fn execute(
    &self,
    cached: impl FnOnce(Option<ResponseEnvelope<MyList>>) + Send + 'static,
    completion: impl FnOnce(Result<ResponseEnvelope<MyList>, DataError>) + Send + 'static,
  ) -> Option<TransferTask> {
    let session = self.auth.session().get()?;
    let request = MyListRequest {
      user_id: session.user_id,
    };
    Some(self.list.get(request, cached, completion))
  }
}

/// Adds or removes one title from the current user's list.
pub struct UpdateMyListUseCase<S> {
  auth: Arc<AuthRepository<S>>,
  list: Arc<MyListRepository<S>>,
}

impl<S: ResponseStore + 'static> UpdateMyListUseCase<S> {
  pub fn new(auth: Arc<AuthRepository<S>>, list: Arc<MyListRepository<S>>) -> Self {
    Self { auth, list }
  }

  /// Returns `None` without invoking the callback when no session is active.
  pub fn execute(
    &self,
    media_slug: &str,
    action: MyListAction,
    completion: impl FnOnce(Result<ResponseEnvelope<MyList>, DataError>) + Send + 'static,
  ) -> Option<TransferTask> {
    let session = self.auth.session().get()?;
    Some(
      self
        .list
        .update(&session.user_id, media_slug, action, completion),
    )
  }
}
