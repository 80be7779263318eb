//! Authentication repository and session state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::error::DataError;
use crate::model::UserSession;
use crate::net::{DataTransferService, Endpoint, ResponseEnvelope};
use crate::observable::Observable;
use crate::store::{ResponseStore, StoreRequest};
use crate::task::TransferTask;

/// The stored key for the auth resource.
///
/// Sign-in lookups and sign-out invalidation both happen by request, before
/// any response exists, so the natural key must be derivable from the
/// request alone: the normalized email. Credentials are never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthRequest {
  pub email: String,
}

impl AuthRequest {
  pub fn new(email: &str) -> Self {
    Self {
      email: email.to_string(),
    }
  }
}

impl StoreRequest for AuthRequest {
  const RESOURCE: &'static str = "auth";

  fn natural_key(&self) -> String {
    self.email.trim().to_lowercase()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignInRequest {
  pub email: String,
  pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignUpRequest {
  pub name: String,
  pub email: String,
  pub password: String,
}

/// Repository for the auth/user resource family.
///
/// Publishes the current session to an observable so cache and network
/// updates reach observers without polling.
pub struct AuthRepository<S> {
  service: DataTransferService,
  store: Arc<S>,
  session: Observable<Option<UserSession>>,
}

impl<S: ResponseStore + 'static> AuthRepository<S> {
  pub fn new(service: DataTransferService, store: Arc<S>) -> Self {
    Self {
      service,
      store,
      session: Observable::new(None),
    }
  }

  /// The current session. Replays on subscribe.
  pub fn session(&self) -> &Observable<Option<UserSession>> {
    &self.session
  }

  /// Cache-short-circuiting sign-in.
  ///
  /// A cached record for this email is handed to `cached` and no network
  /// call is made (returns `None`). On a miss the network call runs, the
  /// result is persisted keyed by the request, and the session is published.
  /// Cancelling the returned task suppresses both callbacks.
  pub fn sign_in(
    &self,
    request: SignInRequest,
    cached: impl FnOnce(ResponseEnvelope<UserSession>) + Send + 'static,
    completion: impl FnOnce(Result<ResponseEnvelope<UserSession>, DataError>) + Send + 'static,
  ) -> Option<TransferTask> {
    let key = AuthRequest::new(&request.email);

    match self.store.response_for::<AuthRequest, ResponseEnvelope<UserSession>>(&key) {
      Ok(Some(record)) => {
        self.session.set(Some(record.response.data.clone()));
        cached(record.response);
        return None;
      }
      Ok(None) => {}
      Err(e) => warn!(error = %e, "auth cache read failed, treating as miss"),
    }

    let endpoint = Endpoint::post("api/v1/users/signin").with_body(json!({
      "email": request.email,
      "password": request.password,
    }));

    let store = Arc::clone(&self.store);
    let session = self.session.clone();
    let task = self.service.request(
      endpoint,
      move |result: Result<ResponseEnvelope<UserSession>, _>| {
        let outcome = result.map_err(DataError::from).and_then(|envelope| {
          store.save(&key, &envelope).map_err(DataError::from)?;
          session.set(Some(envelope.data.clone()));
          Ok(envelope)
        });
        completion(outcome);
      },
    );

    Some(task)
  }

  /// Create an account. Always a network call; success replaces the cached
  /// record for this email and publishes the session.
  pub fn sign_up(
    &self,
    request: SignUpRequest,
    completion: impl FnOnce(Result<ResponseEnvelope<UserSession>, DataError>) + Send + 'static,
  ) -> TransferTask {
    let key = AuthRequest::new(&request.email);
    let endpoint = Endpoint::post("api/v1/users/signup").with_body(json!({
      "name": request.name,
      "email": request.email,
      "password": request.password,
    }));

    let store = Arc::clone(&self.store);
    let session = self.session.clone();
    self.service.request(
      endpoint,
      move |result: Result<ResponseEnvelope<UserSession>, _>| {
        let outcome = result.map_err(DataError::from).and_then(|envelope| {
          store.save(&key, &envelope).map_err(DataError::from)?;
          session.set(Some(envelope.data.clone()));
          Ok(envelope)
        });
        completion(outcome);
      },
    )
  }

  /// End the current session. Always a network call; success deletes the
  /// cached record for the session's email and publishes `None`.
  ///
  /// Returns `None` (with `completion` invoked immediately) when no session
  /// is active.
  pub fn sign_out(
    &self,
    completion: impl FnOnce(Result<(), DataError>) + Send + 'static,
  ) -> Option<TransferTask> {
    let Some(current) = self.session.get() else {
      completion(Ok(()));
      return None;
    };

    let endpoint = Endpoint::post("api/v1/users/signout").with_body(json!({
      "token": current.token,
    }));

    let store = Arc::clone(&self.store);
    let session = self.session.clone();
    let task = self.service.request(
      endpoint,
      move |result: Result<ResponseEnvelope<Option<serde_json::Value>>, _>| {
        let outcome = result.map_err(DataError::from).and_then(|_| {
          store
            .delete(&AuthRequest::new(&current.email))
            .map_err(DataError::from)?;
          session.set(None);
          Ok(())
        });
        completion(outcome);
      },
    );

    Some(task)
  }
}
