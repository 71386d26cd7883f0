//! HTTP capability consumed by the stores, and the reqwest-backed client.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
  Get,
  Post,
  Put,
  Delete,
}

impl Method {
  fn as_reqwest(self) -> reqwest::Method {
    match self {
      Method::Get => reqwest::Method::GET,
      Method::Post => reqwest::Method::POST,
      Method::Put => reqwest::Method::PUT,
      Method::Delete => reqwest::Method::DELETE,
    }
  }
}

/// One call against the backend, relative to its base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
  pub method: Method,
  pub path: String,
  pub query: Option<Value>,
  pub body: Option<Value>,
}

impl ApiRequest {
  pub fn new(method: Method, path: impl Into<String>) -> Self {
    Self {
      method,
      path: path.into(),
      query: None,
      body: None,
    }
  }

  pub fn with_query(mut self, query: Value) -> Self {
    self.query = Some(query);
    self
  }

  pub fn with_body(mut self, body: Value) -> Self {
    self.body = Some(body);
    self
  }
}

/// Transport used by every store.
///
/// Implementations resolve with the decoded payload or fail with a
/// classified [`Error`]. Retries, timeouts and auth headers are the
/// implementation's business; stores treat every failure the same way.
pub trait HttpClient: Send + Sync {
  fn send(&self, request: ApiRequest) -> impl Future<Output = Result<Value>> + Send;

  /// Bearer token attached to subsequent requests. Transports without auth ignore it.
  fn set_token(&self, _token: Option<String>) {}

  fn get<T>(&self, path: &str) -> impl Future<Output = Result<T>> + Send
  where
    T: DeserializeOwned + Send,
  {
    let request = ApiRequest::new(Method::Get, path);
    async move { decode(self.send(request).await?) }
  }

  /// GET with query parameters taken from a serializable filter.
  fn get_with<T, Q>(&self, path: &str, params: &Q) -> impl Future<Output = Result<T>> + Send
  where
    T: DeserializeOwned + Send,
    Q: Serialize + ?Sized,
  {
    let request = serde_json::to_value(params).map(|q| {
      let request = ApiRequest::new(Method::Get, path);
      match q {
        Value::Object(ref map) if map.is_empty() => request,
        Value::Null => request,
        q => request.with_query(q),
      }
    });
    async move { decode(self.send(request?).await?) }
  }

  fn post<T, B>(&self, path: &str, body: &B) -> impl Future<Output = Result<T>> + Send
  where
    T: DeserializeOwned + Send,
    B: Serialize + ?Sized,
  {
    let request = serde_json::to_value(body).map(|b| ApiRequest::new(Method::Post, path).with_body(b));
    async move { decode(self.send(request?).await?) }
  }

  fn post_empty<T>(&self, path: &str) -> impl Future<Output = Result<T>> + Send
  where
    T: DeserializeOwned + Send,
  {
    let request = ApiRequest::new(Method::Post, path);
    async move { decode(self.send(request).await?) }
  }

  fn put<T, B>(&self, path: &str, body: &B) -> impl Future<Output = Result<T>> + Send
  where
    T: DeserializeOwned + Send,
    B: Serialize + ?Sized,
  {
    let request = serde_json::to_value(body).map(|b| ApiRequest::new(Method::Put, path).with_body(b));
    async move { decode(self.send(request?).await?) }
  }

  fn delete<T>(&self, path: &str) -> impl Future<Output = Result<T>> + Send
  where
    T: DeserializeOwned + Send,
  {
    let request = ApiRequest::new(Method::Delete, path);
    async move { decode(self.send(request).await?) }
  }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
  Ok(serde_json::from_value(value)?)
}

/// Unwrap the backend's `{code, message, data}` envelope.
///
/// Bodies without the envelope pass through untouched.
pub fn unwrap_envelope(body: Value) -> Result<Value> {
  let mut map = match body {
    Value::Object(map) => map,
    other => return Ok(other),
  };

  if !map.contains_key("code") || !(map.contains_key("data") || map.contains_key("message")) {
    return Ok(Value::Object(map));
  }

  let code = map.get("code").and_then(Value::as_i64).unwrap_or(0);
  if code != 0 {
    let message = map
      .get("message")
      .and_then(Value::as_str)
      .unwrap_or("request rejected")
      .to_string();
    return Err(Error::Validation {
      status: u16::try_from(code).unwrap_or(400),
      message,
    });
  }

  // Paged envelopes carry the items under `data` next to the paging fields.
  if map.contains_key("total") {
    map.remove("code");
    map.remove("message");
    return Ok(Value::Object(map));
  }

  Ok(map.remove("data").unwrap_or(Value::Null))
}

/// Pull a human-readable message out of an error body.
fn error_message(body: &Value, fallback: &str) -> String {
  body
    .get("detail")
    .or_else(|| body.get("message"))
    .and_then(|v| match v {
      Value::String(s) => Some(s.clone()),
      Value::Null => None,
      other => Some(other.to_string()),
    })
    .unwrap_or_else(|| fallback.to_string())
}

/// reqwest-backed [`HttpClient`].
pub struct RestClient {
  client: reqwest::Client,
  base_url: Url,
  token: RwLock<Option<String>>,
}

impl RestClient {
  pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
    // Joining relative paths needs a trailing slash on the base.
    let normalized = if base_url.ends_with('/') {
      base_url.to_string()
    } else {
      format!("{}/", base_url)
    };
    let base_url = Url::parse(&normalized)
      .map_err(|e| Error::InvalidInput(format!("bad API base URL {}: {}", base_url, e)))?;

    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| Error::transport(format!("failed to build HTTP client: {}", e)))?;

    Ok(Self {
      client,
      base_url,
      token: RwLock::new(None),
    })
  }

  fn url(&self, path: &str) -> Result<Url> {
    self
      .base_url
      .join(path.trim_start_matches('/'))
      .map_err(|e| Error::InvalidInput(format!("bad request path {}: {}", path, e)))
  }
}

impl HttpClient for RestClient {
  fn set_token(&self, token: Option<String>) {
    *self.token.write().unwrap_or_else(PoisonError::into_inner) = token.filter(|t| !t.is_empty());
  }

  fn send(&self, request: ApiRequest) -> impl Future<Output = Result<Value>> + Send {
    let url = self.url(&request.path);
    let token = self
      .token
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone();

    async move {
      let url = url?;
      debug!(method = ?request.method, url = %url, "sending request");

      let mut builder = self.client.request(request.method.as_reqwest(), url);
      if let Some(token) = token {
        builder = builder.bearer_auth(token);
      }
      if let Some(query) = &request.query {
        builder = builder.query(query);
      }
      if let Some(body) = &request.body {
        builder = builder.json(body);
      }

      let response = builder
        .send()
        .await
        .map_err(|e| Error::transport(e.to_string()))?;
      let status = response.status();
      let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::transport(e.to_string()))?;

      let body: Value = if bytes.is_empty() {
        Value::Null
      } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
      };

      if !status.is_success() {
        let fallback = status.canonical_reason().unwrap_or("request failed");
        return Err(Error::from_status(status.as_u16(), error_message(&body, fallback)));
      }

      unwrap_envelope(body)
    }
  }
}
