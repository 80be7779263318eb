//! HTTP execution and failure classification.

use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::{ApiConfig, ConfigError};

use super::endpoint::Endpoint;
use super::types::{ApiErrorBody, BodyEncoding};

/// Transport-level failure, classified.
///
/// Error payloads are strings rather than source errors so the type stays
/// `Clone` and can cross completion-callback boundaries freely.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
  /// The server answered with an empty body where one was expected
  #[error("no response body")]
  NoResponse,
  /// Connectivity-level failure; the request may never have left
  #[error("network failure: {0}")]
  Network(String),
  /// The server resolved the request and returned a structured error
  #[error("server error {status}: {message}")]
  Resolved { status: u16, message: String },
  /// The body arrived but did not decode into the expected shape
  #[error("decode failure: {0}")]
  Parsing(String),
  #[error("invalid url: {0}")]
  Url(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Executes endpoints against the configured API base.
#[derive(Clone)]
pub struct HttpTransport {
  client: Client,
  base: Url,
}

impl HttpTransport {
  pub fn new(config: &ApiConfig) -> Result<Self, ConfigError> {
    let base = config.base_url()?;
    Ok(Self {
      client: Client::new(),
      base,
    })
  }

  /// Execute `endpoint` and decode a successful body into `R`.
  ///
  /// Failures are classified, never retried: retry policy belongs to the
  /// caller.
  pub async fn execute<R: DeserializeOwned>(&self, endpoint: &Endpoint<R>) -> TransportResult<R> {
    let url = endpoint.url(&self.base)?;
    debug!(%url, method = ?endpoint.method, "executing request");

    let mut request = self.client.request(endpoint.method.as_reqwest(), url);
    if let Some(body) = &endpoint.body {
      request = match endpoint.encoding {
        BodyEncoding::Json => request.json(body),
        BodyEncoding::FormUrlEncoded => request.form(body),
      };
    }

    let response = request
      .send()
      .await
      .map_err(|e| TransportError::Network(e.to_string()))?;

    let status = response.status();
    let bytes = response
      .bytes()
      .await
      .map_err(|e| TransportError::Network(e.to_string()))?;

    if !status.is_success() {
      let message = serde_json::from_slice::<ApiErrorBody>(&bytes)
        .ok()
        .and_then(|body| body.status_message)
        .unwrap_or_else(|| String::from_utf8_lossy(&bytes).trim().to_string());
      return Err(TransportError::Resolved {
        status: status.as_u16(),
        message,
      });
    }

    if bytes.is_empty() {
      return Err(TransportError::NoResponse);
    }

    serde_json::from_slice(&bytes).map_err(|e| TransportError::Parsing(e.to_string()))
  }
}

impl std::fmt::Debug for HttpTransport {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("HttpTransport")
      .field("base", &self.base.as_str())
      .finish_non_exhaustive()
  }
}
