//! Cancellable task handles for in-flight operations.
//!
//! A [`TransferTask`] moves Created → Running → {Completed | Cancelled}.
//! Cancelling aborts the underlying worker future and suppresses its
//! completion callback; cancelling twice, or after completion, is a no-op.
//!
//! [`TaskSlot`] holds at most one live task: assigning a new task cancels
//! whatever was previously in the slot. Rapid repeated requests through one
//! slot therefore never race — each assignment cancels the prior request
//! before the new one can deliver.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::AbortHandle;

#[derive(Debug)]
struct TaskState {
  cancelled: AtomicBool,
  completed: AtomicBool,
  abort: Mutex<Option<AbortHandle>>,
}

fn relock<'a, T>(
  result: Result<MutexGuard<'a, T>, PoisonError<MutexGuard<'a, T>>>,
) -> MutexGuard<'a, T> {
  result.unwrap_or_else(PoisonError::into_inner)
}

/// Handle to one in-flight operation.
///
/// Clones share the same underlying state; cancelling any clone cancels the
/// operation.
#[derive(Debug, Clone)]
pub struct TransferTask {
  state: Arc<TaskState>,
}

impl TransferTask {
  pub(crate) fn new() -> Self {
    Self {
      state: Arc::new(TaskState {
        cancelled: AtomicBool::new(false),
        completed: AtomicBool::new(false),
        abort: Mutex::new(None),
      }),
    }
  }

  /// Attach the abort handle of the spawned worker.
  ///
  /// Cancellation requested before the handle is attached still suppresses
  /// the completion callback via the cancelled flag.
  pub(crate) fn bind(&self, handle: AbortHandle) {
    if self.state.cancelled.load(Ordering::Acquire) {
      handle.abort();
      return;
    }
    *relock(self.state.abort.lock()) = Some(handle);
  }

  /// Cancel the operation. Idempotent: a second call, or a call after the
  /// operation completed, has no further effect.
  pub fn cancel(&self) {
    if self.state.completed.load(Ordering::Acquire) {
      return;
    }
    if self.state.cancelled.swap(true, Ordering::AcqRel) {
      return;
    }
    if let Some(handle) = relock(self.state.abort.lock()).take() {
      handle.abort();
    }
  }

  pub fn is_cancelled(&self) -> bool {
    self.state.cancelled.load(Ordering::Acquire)
  }

  /// Transition Running → Completed.
  ///
  /// Returns `false` when the task was cancelled first; the caller must then
  /// suppress its completion callback.
  pub(crate) fn mark_completed(&self) -> bool {
    if self.state.cancelled.load(Ordering::Acquire) {
      return false;
    }
    self.state.completed.store(true, Ordering::Release);
    true
  }
}

/// A logical slot holding at most one live task.
#[derive(Default)]
pub struct TaskSlot {
  current: Mutex<Option<TransferTask>>,
}

impl TaskSlot {
  pub fn new() -> Self {
    Self::default()
  }

  /// Store `task`, cancelling whatever task previously occupied the slot.
  pub fn assign(&self, task: TransferTask) {
    let previous = relock(self.current.lock()).replace(task);
    if let Some(previous) = previous {
      previous.cancel();
    }
  }

  /// Cancel and drop the current task, if any.
  pub fn clear(&self) {
    if let Some(previous) = relock(self.current.lock()).take() {
      previous.cancel();
    }
  }
}

impl Drop for TaskSlot {
  fn drop(&mut self) {
    self.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  fn running_task() -> (TransferTask, Arc<AtomicBool>) {
    let task = TransferTask::new();
    let landed = Arc::new(AtomicBool::new(false));
    let landed_clone = Arc::clone(&landed);
    let probe = task.clone();
    let join = tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(100)).await;
      if probe.mark_completed() {
        landed_clone.store(true, Ordering::SeqCst);
      }
    });
    task.bind(join.abort_handle());
    (task, landed)
  }

  #[tokio::test]
  async fn cancel_is_idempotent() {
    let (task, landed) = running_task();

    task.cancel();
    task.cancel();

    assert!(task.is_cancelled());
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!landed.load(Ordering::SeqCst));
  }

  #[tokio::test]
  async fn cancel_after_completion_is_noop() {
    let (task, landed) = running_task();

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(landed.load(Ordering::SeqCst));

    task.cancel();
    assert!(!task.is_cancelled());
  }

  #[tokio::test]
  async fn cancel_before_bind_still_suppresses_completion() {
    let task = TransferTask::new();
    task.cancel();
    assert!(!task.mark_completed());
  }

  #[tokio::test]
  async fn slot_assignment_cancels_previous_task() {
    let slot = TaskSlot::new();
    let (first, first_landed) = running_task();
    let (second, second_landed) = running_task();

    slot.assign(first.clone());
    slot.assign(second.clone());

    assert!(first.is_cancelled());
    assert!(!second.is_cancelled());

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!first_landed.load(Ordering::SeqCst));
    assert!(second_landed.load(Ordering::SeqCst));
  }

  #[tokio::test]
  async fn clear_cancels_current_task() {
    let slot = TaskSlot::new();
    let (task, landed) = running_task();

    slot.assign(task.clone());
    slot.clear();

    assert!(task.is_cancelled());
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!landed.load(Ordering::SeqCst));
  }
}
