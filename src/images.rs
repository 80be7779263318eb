//! Keyed in-memory image cache with network-backed fill.
//!
//! Entries are decoded images keyed by an opaque identifier (e.g.
//! `"poster_<slug>"`). A miss issues exactly one fetch through the injected
//! [`ImageTransport`]; concurrent misses on the same identifier coalesce
//! onto one shared in-flight fetch. Failures are never cached — a later call
//! with the same identifier retries.
//!
//! The cache is bounded: least-recently-used entries are evicted once the
//! estimated pixel-byte total exceeds the configured cap.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use image::DynamicImage;
use tracing::{debug, warn};
use url::Url;

use crate::net::TransportError;

/// Loads raw image bytes from a URL. Injected so tests and previews can
/// substitute the network.
#[async_trait]
pub trait ImageTransport: Send + Sync {
  async fn fetch(&self, url: &Url) -> Result<Bytes, TransportError>;
}

/// Production transport over reqwest.
#[derive(Debug, Clone, Default)]
pub struct HttpImageTransport {
  client: reqwest::Client,
}

impl HttpImageTransport {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl ImageTransport for HttpImageTransport {
  async fn fetch(&self, url: &Url) -> Result<Bytes, TransportError> {
    let response = self
      .client
      .get(url.clone())
      .send()
      .await
      .map_err(|e| TransportError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
      return Err(TransportError::Resolved {
        status: status.as_u16(),
        message: format!("image fetch failed for {}", url),
      });
    }

    response
      .bytes()
      .await
      .map_err(|e| TransportError::Network(e.to_string()))
  }
}

const DEFAULT_MAX_BYTES: usize = 64 * 1024 * 1024;

type CachedImage = Option<Arc<DynamicImage>>;
type FillFuture = Shared<BoxFuture<'static, CachedImage>>;

struct CacheEntry {
  image: Arc<DynamicImage>,
  bytes: usize,
}

#[derive(Default)]
struct CacheState {
  entries: HashMap<String, CacheEntry>,
  /// LRU order, most recently used at the back
  order: VecDeque<String>,
  total_bytes: usize,
}

impl CacheState {
  fn touch(&mut self, identifier: &str) {
    if let Some(pos) = self.order.iter().position(|key| key == identifier) {
      self.order.remove(pos);
      self.order.push_back(identifier.to_string());
    }
  }

  fn get(&mut self, identifier: &str) -> CachedImage {
    if self.entries.contains_key(identifier) {
      self.touch(identifier);
    }
    self.entries.get(identifier).map(|entry| Arc::clone(&entry.image))
  }

  fn insert(&mut self, identifier: String, image: Arc<DynamicImage>, max_bytes: usize) {
    let bytes = estimated_bytes(&image);

    if let Some(old) = self.entries.insert(identifier.clone(), CacheEntry { image, bytes }) {
      self.total_bytes -= old.bytes;
      if let Some(pos) = self.order.iter().position(|key| *key == identifier) {
        self.order.remove(pos);
      }
    }
    self.order.push_back(identifier.clone());
    self.total_bytes += bytes;

    // Soft cap: evict least-recently-used entries, but never the entry just
    // inserted, even when it alone exceeds the cap.
    while self.total_bytes > max_bytes && self.order.len() > 1 {
      let Some(victim) = self.order.pop_front() else {
        break;
      };
      if let Some(entry) = self.entries.remove(&victim) {
        self.total_bytes -= entry.bytes;
        debug!(identifier = %victim, "evicted image cache entry");
      }
    }
  }
}

/// Estimated RGBA footprint of a decoded image.
fn estimated_bytes(image: &DynamicImage) -> usize {
  (image.width() as usize) * (image.height() as usize) * 4
}

struct Inner {
  transport: Arc<dyn ImageTransport>,
  state: Mutex<CacheState>,
  in_flight: Mutex<HashMap<String, FillFuture>>,
  max_bytes: usize,
}

fn relock<'a, T>(
  result: Result<MutexGuard<'a, T>, PoisonError<MutexGuard<'a, T>>>,
) -> MutexGuard<'a, T> {
  result.unwrap_or_else(PoisonError::into_inner)
}

/// Process-wide image cache; clone handles to share it.
#[derive(Clone)]
pub struct ImageCacheService {
  inner: Arc<Inner>,
}

impl ImageCacheService {
  pub fn new(transport: Arc<dyn ImageTransport>) -> Self {
    Self::with_max_bytes(transport, DEFAULT_MAX_BYTES)
  }

  pub fn with_max_bytes(transport: Arc<dyn ImageTransport>, max_bytes: usize) -> Self {
    Self {
      inner: Arc::new(Inner {
        transport,
        state: Mutex::new(CacheState::default()),
        in_flight: Mutex::new(HashMap::new()),
        max_bytes,
      }),
    }
  }

  /// Synchronous cache-only lookup for callers that must not await, e.g.
  /// the cell-reuse fast path. Never touches the network.
  pub fn object(&self, identifier: &str) -> CachedImage {
    relock(self.inner.state.lock()).get(identifier)
  }

  /// Cache-first load.
  ///
  /// A hit resolves without a network call. Concurrent misses on the same
  /// identifier share one in-flight fetch. Transport or decode failures
  /// resolve to `None` and are not cached.
  pub async fn load(&self, url: Url, identifier: &str) -> CachedImage {
    if let Some(image) = self.object(identifier) {
      return Some(image);
    }

    let fill = {
      let mut in_flight = relock(self.inner.in_flight.lock());
      if let Some(existing) = in_flight.get(identifier) {
        existing.clone()
      } else if let Some(image) = relock(self.inner.state.lock()).get(identifier) {
        // A fill finished between the cache check above and taking this
        // lock; serve it rather than fetching again.
        return Some(image);
      } else {
        let fill = Self::fill(Arc::clone(&self.inner), url, identifier.to_string())
          .boxed()
          .shared();
        in_flight.insert(identifier.to_string(), fill.clone());
        fill
      }
    };

    fill.await
  }

  /// Callback variant of [`load`](Self::load) with identical semantics.
  pub fn load_with(
    &self,
    url: Url,
    identifier: &str,
    completion: impl FnOnce(CachedImage) + Send + 'static,
  ) {
    let service = self.clone();
    let identifier = identifier.to_string();
    tokio::spawn(async move {
      completion(service.load(url, &identifier).await);
    });
  }

  async fn fill(inner: Arc<Inner>, url: Url, identifier: String) -> CachedImage {
    let image = match inner.transport.fetch(&url).await {
      Ok(bytes) => match image::load_from_memory(&bytes) {
        Ok(decoded) => Some(Arc::new(decoded)),
        Err(e) => {
          warn!(identifier = %identifier, error = %e, "image decode failed");
          None
        }
      },
      Err(e) => {
        warn!(identifier = %identifier, error = %e, "image fetch failed");
        None
      }
    };

    if let Some(image) = &image {
      relock(inner.state.lock()).insert(identifier.clone(), Arc::clone(image), inner.max_bytes);
    }

    // Failures are not cached: dropping the in-flight entry lets a later
    // call with the same identifier retry the fetch.
    relock(inner.in_flight.lock()).remove(&identifier);

    image
  }
}
