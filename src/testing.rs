//! Test doubles for the HTTP and notification boundaries.

use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use crate::api::http::{ApiRequest, HttpClient, Method};
use crate::api::notify::{Notifier, NotifyKind};
use crate::error::{Error, Result};

enum Reply {
  Ready(Result<Value>),
  Gated(oneshot::Receiver<Result<Value>>),
}

/// Scripted backend: each route answers from its own FIFO of replies.
///
/// Unscripted routes fail with a 404 so a missing expectation shows up as a
/// failed operation rather than a hang.
#[derive(Default)]
pub struct MockHttp {
  routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
  calls: Mutex<Vec<ApiRequest>>,
  token: Mutex<Option<String>>,
}

impl MockHttp {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  fn push(&self, method: Method, path: &str, reply: Reply) {
    self
      .routes
      .lock()
      .unwrap()
      .entry((method, path.to_string()))
      .or_default()
      .push_back(reply);
  }

  pub fn reply(&self, method: Method, path: &str, value: Value) {
    self.push(method, path, Reply::Ready(Ok(value)));
  }

  pub fn fail(&self, method: Method, path: &str, err: Error) {
    self.push(method, path, Reply::Ready(Err(err)));
  }

  /// Queue a reply that resolves only when the returned sender fires.
  pub fn gate(&self, method: Method, path: &str) -> oneshot::Sender<Result<Value>> {
    let (tx, rx) = oneshot::channel();
    self.push(method, path, Reply::Gated(rx));
    tx
  }

  pub fn calls(&self) -> Vec<ApiRequest> {
    self.calls.lock().unwrap().clone()
  }

  pub fn call_count(&self, method: Method, path: &str) -> usize {
    self
      .calls
      .lock()
      .unwrap()
      .iter()
      .filter(|c| c.method == method && c.path == path)
      .count()
  }

  pub fn last_call(&self) -> Option<ApiRequest> {
    self.calls.lock().unwrap().last().cloned()
  }

  /// Token most recently handed to the transport.
  pub fn token(&self) -> Option<String> {
    self.token.lock().unwrap().clone()
  }
}

impl HttpClient for MockHttp {
  fn set_token(&self, token: Option<String>) {
    *self.token.lock().unwrap() = token;
  }

  fn send(&self, request: ApiRequest) -> impl Future<Output = Result<Value>> + Send {
    self.calls.lock().unwrap().push(request.clone());
    let reply = self
      .routes
      .lock()
      .unwrap()
      .get_mut(&(request.method, request.path.clone()))
      .and_then(VecDeque::pop_front);

    async move {
      match reply {
        Some(Reply::Ready(result)) => result,
        Some(Reply::Gated(rx)) => rx
          .await
          .unwrap_or_else(|_| Err(Error::transport("gate dropped"))),
        None => Err(Error::from_status(
          404,
          format!("no reply scripted for {:?} {}", request.method, request.path),
        )),
      }
    }
  }
}

/// Keeps every notification for later inspection.
#[derive(Default)]
pub struct RecordingNotifier {
  events: Mutex<Vec<(NotifyKind, String)>>,
}

impl RecordingNotifier {
  pub fn events(&self) -> Vec<(NotifyKind, String)> {
    self.events.lock().unwrap().clone()
  }

  pub fn messages(&self, kind: NotifyKind) -> Vec<String> {
    self
      .events()
      .into_iter()
      .filter(|(k, _)| *k == kind)
      .map(|(_, m)| m)
      .collect()
  }
}

impl Notifier for RecordingNotifier {
  fn notify(&self, kind: NotifyKind, message: &str) {
    self.events.lock().unwrap().push((kind, message.to_string()));
  }
}
