//! Declarative endpoint descriptors.
//!
//! An [`Endpoint`] is a pure value describing one HTTP operation: path,
//! method, query and body parameters, body encoding. It carries no execution
//! logic and is typed by the response it decodes to; execution lives in the
//! transport and decoding in the data-transfer service.

use std::marker::PhantomData;

use serde_json::Value;
use url::Url;

use super::transport::TransportError;
use super::types::{BodyEncoding, Method};

/// Typed description of one HTTP operation.
pub struct Endpoint<R> {
  /// Path relative to the configured base, e.g. "api/v1/media"
  pub path: String,
  pub method: Method,
  pub query: Vec<(String, String)>,
  /// Body parameters, serialized per `encoding`
  pub body: Option<Value>,
  pub encoding: BodyEncoding,
  _response: PhantomData<fn() -> R>,
}

impl<R> Endpoint<R> {
  pub fn new(method: Method, path: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      method,
      query: Vec::new(),
      body: None,
      encoding: BodyEncoding::default(),
      _response: PhantomData,
    }
  }

  pub fn get(path: impl Into<String>) -> Self {
    Self::new(Method::Get, path)
  }

  pub fn post(path: impl Into<String>) -> Self {
    Self::new(Method::Post, path)
  }

  pub fn patch(path: impl Into<String>) -> Self {
    Self::new(Method::Patch, path)
  }

  pub fn delete(path: impl Into<String>) -> Self {
    Self::new(Method::Delete, path)
  }

  pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.query.push((name.into(), value.into()));
    self
  }

  pub fn with_body(mut self, body: Value) -> Self {
    self.body = Some(body);
    self
  }

  pub fn with_encoding(mut self, encoding: BodyEncoding) -> Self {
    self.encoding = encoding;
    self
  }

  /// Full request URL: base joined with the path, query pairs appended.
  pub(crate) fn url(&self, base: &Url) -> Result<Url, TransportError> {
    let mut url = base
      .join(&self.path)
      .map_err(|e| TransportError::Url(format!("{}: {}", self.path, e)))?;

    if !self.query.is_empty() {
      url
        .query_pairs_mut()
        .extend_pairs(self.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }

    Ok(url)
  }
}

impl<R> Clone for Endpoint<R> {
  fn clone(&self) -> Self {
    Self {
      path: self.path.clone(),
      method: self.method,
      query: self.query.clone(),
      body: self.body.clone(),
      encoding: self.encoding,
      _response: PhantomData,
    }
  }
}

impl<R> std::fmt::Debug for Endpoint<R> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Endpoint")
      .field("path", &self.path)
      .field("method", &self.method)
      .field("query", &self.query)
      .field("encoding", &self.encoding)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn base() -> Url {
    Url::parse("https://api.reel.example/").unwrap()
  }

  #[test]
  fn builds_url_from_base_and_path() {
    let endpoint: Endpoint<()> = Endpoint::get("api/v1/media");
    let url = endpoint.url(&base()).unwrap();
    assert_eq!(url.as_str(), "https://api.reel.example/api/v1/media");
  }

  #[test]
  fn appends_query_pairs_in_order() {
    let endpoint: Endpoint<()> = Endpoint::get("api/v1/media/search")
      .with_query("q", "dark water")
      .with_query("page", "2");
    let url = endpoint.url(&base()).unwrap();
    assert_eq!(
      url.as_str(),
      "https://api.reel.example/api/v1/media/search?q=dark+water&page=2"
    );
  }

  #[test]
  fn body_defaults_to_json_encoding() {
    let endpoint: Endpoint<()> =
      Endpoint::post("api/v1/users/signin").with_body(json!({"email": "a@b.com"}));
    assert_eq!(endpoint.encoding, BodyEncoding::Json);
    assert!(endpoint.body.is_some());
  }
}
