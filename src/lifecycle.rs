//! Loading/error bookkeeping around each asynchronous store operation.
//!
//! Every invocation walks `Idle -> Running -> {Succeeded, Failed}`. The
//! store-level status only remembers the most recent transition, so when two
//! invocations overlap the one that settles last decides what the UI sees,
//! even if the other is still running. Invocations are not queued.
//!
//! There is no cancellation either: dropping interest in an in-flight
//! operation does not stop it from mutating the cache once the underlying
//! call completes, as long as its future is still being polled.
//!
//! # Example
//!
//! ```ignore
//! let courses = lifecycle
//!   .run(FETCH_COURSES, http.get::<Vec<Course>>("/v1/courses"), |items| {
//!     cache.set_list(items.clone());
//!     items
//!   })
//!   .await?;
//! ```

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, debug_span, warn, Instrument};

use crate::api::notify::{NotifyKind, Notifier};
use crate::error::Result;

/// Where the most recent invocation on a store stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
  /// Nothing has run yet (or the store was reset)
  #[default]
  Idle,
  /// An invocation has started and nothing has settled since
  Running,
  Succeeded,
  Failed,
}

/// The `{loading, error}` pair a UI binds to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationStatus {
  pub phase: Phase,
  pub error: Option<String>,
}

impl OperationStatus {
  pub fn is_loading(&self) -> bool {
    self.phase == Phase::Running
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }
}

/// Static description of one store operation.
#[derive(Debug, Clone, Copy)]
pub struct Operation {
  pub name: &'static str,
  /// Message used when the failure carries none of its own
  pub failure: &'static str,
  /// Notification sent on success, if any
  pub success: Option<&'static str>,
}

impl Operation {
  pub const fn new(name: &'static str, failure: &'static str) -> Self {
    Self {
      name,
      failure,
      success: None,
    }
  }

  pub const fn announce(self, success: &'static str) -> Self {
    Self {
      success: Some(success),
      ..self
    }
  }
}

/// Per-store lifecycle wrapper.
pub struct Lifecycle {
  store: &'static str,
  status: RwLock<OperationStatus>,
  notifier: Arc<dyn Notifier>,
}

impl Lifecycle {
  pub fn new(store: &'static str, notifier: Arc<dyn Notifier>) -> Self {
    Self {
      store,
      status: RwLock::new(OperationStatus::default()),
      notifier,
    }
  }

  pub fn status(&self) -> OperationStatus {
    self
      .status
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  pub fn is_loading(&self) -> bool {
    self.status().is_loading()
  }

  pub fn error(&self) -> Option<String> {
    self.status().error
  }

  pub fn reset(&self) {
    self.set(OperationStatus::default());
  }

  fn set(&self, status: OperationStatus) {
    *self.status.write().unwrap_or_else(PoisonError::into_inner) = status;
  }

  /// Run `call`, then `apply` its value to the cache on success.
  ///
  /// `apply` runs only after the call resolved successfully, so a failed call
  /// leaves every cache untouched. Failures are recorded, announced, and
  /// returned to the caller.
  pub async fn run<T, R, Fut, F>(&self, op: Operation, call: Fut, apply: F) -> Result<R>
  where
    Fut: Future<Output = Result<T>>,
    F: FnOnce(T) -> R,
  {
    self.set(OperationStatus {
      phase: Phase::Running,
      error: None,
    });
    debug!(store = self.store, operation = op.name, "operation started");

    let span = debug_span!("operation", store = self.store, name = op.name);
    match call.instrument(span).await {
      Ok(value) => {
        let out = apply(value);
        self.set(OperationStatus {
          phase: Phase::Succeeded,
          error: None,
        });
        debug!(store = self.store, operation = op.name, "operation succeeded");
        if let Some(message) = op.success {
          self.notifier.notify(NotifyKind::Success, message);
        }
        Ok(out)
      }
      Err(err) => {
        let mut message = err.to_string();
        if message.is_empty() {
          message = op.failure.to_string();
        }
        self.set(OperationStatus {
          phase: Phase::Failed,
          error: Some(message.clone()),
        });
        warn!(store = self.store, operation = op.name, error = %message, "operation failed");
        self.notifier.notify(NotifyKind::Error, &message);
        Err(err)
      }
    }
  }
}

impl std::fmt::Debug for Lifecycle {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Lifecycle")
      .field("store", &self.store)
      .field("status", &self.status())
      .finish_non_exhaustive()
  }
}
