//! Notification sink the stores report outcomes to.

use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
  Success,
  Error,
}

/// Fire-and-forget user notifications.
///
/// Stores call this after their state has settled, so nothing a sink does
/// can change cache contents.
pub trait Notifier: Send + Sync {
  fn notify(&self, kind: NotifyKind, message: &str);
}

/// Routes notifications into the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
  fn notify(&self, kind: NotifyKind, message: &str) {
    match kind {
      NotifyKind::Success => info!(target: "troupe::notify", "{}", message),
      NotifyKind::Error => warn!(target: "troupe::notify", "{}", message),
    }
  }
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
  fn notify(&self, _kind: NotifyKind, _message: &str) {}
}
