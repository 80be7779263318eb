//! Minimal single-value reactive cell with change notification.
//!
//! `Observable<V>` holds one value and an ordered list of observers. A new
//! observer is replayed the current value immediately on subscription;
//! subsequent `set` calls deliver one notification round per assignment on a
//! spawned delivery pass. There is no back-pressure and no coalescing: every
//! assignment notifies, even when the new value equals the old one.
//!
//! Observers are keyed by the `SubscriptionId` returned from [`observe`];
//! owners unsubscribe explicitly on teardown rather than relying on weak
//! references.
//!
//! [`observe`]: Observable::observe

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Handle identifying one registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<V> = Arc<dyn Fn(&V) + Send + Sync>;

struct Entry<V> {
  id: u64,
  callback: Callback<V>,
}

struct Inner<V> {
  value: Mutex<V>,
  /// Subscription order; notification delivery follows this order.
  observers: Mutex<Vec<Entry<V>>>,
  next_id: AtomicU64,
}

/// A single-value cell whose assignments notify registered observers.
///
/// Cloning the handle shares the underlying cell.
pub struct Observable<V> {
  inner: Arc<Inner<V>>,
}

impl<V> Clone for Observable<V> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

fn relock<'a, T>(
  result: Result<MutexGuard<'a, T>, PoisonError<MutexGuard<'a, T>>>,
) -> MutexGuard<'a, T> {
  // A panicking observer must not wedge the cell for everyone else.
  result.unwrap_or_else(PoisonError::into_inner)
}

impl<V: Clone + Send + Sync + 'static> Observable<V> {
  pub fn new(value: V) -> Self {
    Self {
      inner: Arc::new(Inner {
        value: Mutex::new(value),
        observers: Mutex::new(Vec::new()),
        next_id: AtomicU64::new(0),
      }),
    }
  }

  /// Clone of the current value.
  pub fn get(&self) -> V {
    relock(self.inner.value.lock()).clone()
  }

  /// Register `callback` and immediately replay the current value to it.
  ///
  /// Returns the id to pass to [`unsubscribe`](Self::unsubscribe) when the
  /// owner is torn down.
  pub fn observe(&self, callback: impl Fn(&V) + Send + Sync + 'static) -> SubscriptionId {
    let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
    let callback: Callback<V> = Arc::new(callback);
    relock(self.inner.observers.lock()).push(Entry {
      id,
      callback: Arc::clone(&callback),
    });

    // Replay outside the observers lock so the callback may itself subscribe
    // or unsubscribe.
    let current = self.get();
    callback(&current);

    SubscriptionId(id)
  }

  /// Unregister the observer registered under `id`. Unknown ids are ignored.
  pub fn unsubscribe(&self, id: SubscriptionId) {
    relock(self.inner.observers.lock()).retain(|entry| entry.id != id.0);
  }

  /// Store `value`, then deliver one notification round to every observer.
  ///
  /// The value is updated synchronously; delivery happens on a spawned pass
  /// (the next scheduling turn of the runtime). An observer unsubscribed
  /// while the pass is running is skipped for the remainder of that pass.
  pub fn set(&self, value: V) {
    *relock(self.inner.value.lock()) = value.clone();

    let inner = Arc::clone(&self.inner);
    tokio::spawn(async move {
      let snapshot: Vec<(u64, Callback<V>)> = relock(inner.observers.lock())
        .iter()
        .map(|entry| (entry.id, Arc::clone(&entry.callback)))
        .collect();

      for (id, callback) in snapshot {
        let still_subscribed = relock(inner.observers.lock())
          .iter()
          .any(|entry| entry.id == id);
        if still_subscribed {
          callback(&value);
        }
      }
    });
  }

  /// Number of registered observers.
  pub fn observer_count(&self) -> usize {
    relock(self.inner.observers.lock()).len()
  }
}
