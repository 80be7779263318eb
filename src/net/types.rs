//! Wire-level types shared across the network stack.

use serde::{Deserialize, Serialize};

/// HTTP method of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  Post,
  Patch,
  Delete,
}

impl Method {
  pub(crate) fn as_reqwest(self) -> reqwest::Method {
    match self {
      Method::Get => reqwest::Method::GET,
      Method::Post => reqwest::Method::POST,
      Method::Patch => reqwest::Method::PATCH,
      Method::Delete => reqwest::Method::DELETE,
    }
  }
}

/// How an endpoint's body parameters are serialized onto the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyEncoding {
  #[default]
  Json,
  FormUrlEncoded,
}

/// Standard envelope every structured endpoint responds with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T> {
  pub status: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub results: Option<u32>,
  pub data: T,
}

/// Structured error body some endpoints return alongside a non-2xx status.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
  #[serde(default)]
  pub status_message: Option<String>,
}
