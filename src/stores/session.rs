//! Signed-in user, bearer token and roles, mirrored into durable storage.
//!
//! One [`SessionStore`] is built at startup and shared by reference for the
//! life of the process. Token, user and roles change together in memory; in
//! storage each sits under its own key so a torn write can be detected on the
//! next [`restore`](SessionStore::restore).

use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use tracing::{info, warn};

use crate::api::http::HttpClient;
use crate::api::notify::{Notifier, NotifyKind};
use crate::api::types::{Credentials, LoginResponse, UserInfo, UserProfile};
use crate::cache::SessionStorage;
use crate::error::{Error, Result};
use crate::lifecycle::{Lifecycle, Operation, OperationStatus};

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "userInfo";
pub const ROLES_KEY: &str = "roles";

const ADMIN_ROLE: &str = "admin";

const LOGIN: Operation = Operation::new("login", "Login failed").announce("Login successful");
const FETCH_USER: Operation = Operation::new("fetch_user_info", "Failed to load user info");
const UPDATE_USER: Operation =
  Operation::new("update_user_info", "Failed to update user info").announce("User info updated");

/// In-memory session. Anonymous when `token` is empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
  pub token: String,
  pub user: Option<UserInfo>,
  pub roles: Vec<String>,
}

impl Session {
  fn is_admin(&self) -> bool {
    self.roles.iter().any(|r| r == ADMIN_ROLE)
  }
}

pub struct SessionStore<H> {
  http: Arc<H>,
  storage: Arc<dyn SessionStorage>,
  session: RwLock<Session>,
  notifier: Arc<dyn Notifier>,
  lifecycle: Lifecycle,
}

impl<H: HttpClient> SessionStore<H> {
  pub fn new(http: Arc<H>, storage: Arc<dyn SessionStorage>, notifier: Arc<dyn Notifier>) -> Self {
    Self {
      http,
      storage,
      session: RwLock::new(Session::default()),
      lifecycle: Lifecycle::new("session", notifier.clone()),
      notifier,
    }
  }

  fn read(&self) -> RwLockReadGuard<'_, Session> {
    self.session.read().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn status(&self) -> OperationStatus {
    self.lifecycle.status()
  }

  pub fn session(&self) -> Session {
    self.read().clone()
  }

  pub fn is_logged_in(&self) -> bool {
    !self.read().token.is_empty()
  }

  pub fn is_admin(&self) -> bool {
    self.read().is_admin()
  }

  /// Signed-in users hold every role except `admin`, which must be granted.
  pub fn has_permission(&self, role: &str) -> bool {
    let session = self.read();
    if session.token.is_empty() {
      return false;
    }
    role != ADMIN_ROLE || session.is_admin()
  }

  pub fn token(&self) -> Option<String> {
    Some(self.read().token.clone()).filter(|t| !t.is_empty())
  }

  pub fn user(&self) -> Option<UserInfo> {
    self.read().user.clone()
  }

  pub fn roles(&self) -> Vec<String> {
    self.read().roles.clone()
  }

  pub fn username(&self) -> String {
    self
      .read()
      .user
      .as_ref()
      .map(|u| u.username.clone())
      .unwrap_or_default()
  }

  /// Display name: the nickname when set, the username otherwise.
  pub fn nickname(&self) -> String {
    let session = self.read();
    let Some(user) = session.user.as_ref() else {
      return String::new();
    };
    user
      .nickname
      .clone()
      .filter(|n| !n.is_empty())
      .unwrap_or_else(|| user.username.clone())
  }

  /// Reload the session persisted by a previous run. Returns whether a
  /// session was restored.
  ///
  /// A stored token whose user is missing or unreadable signs the client out.
  pub fn restore(&self) -> bool {
    let token = self.load_key(TOKEN_KEY).unwrap_or_default();
    if token.is_empty() {
      return false;
    }

    let user = self
      .load_key(USER_KEY)
      .and_then(|raw| serde_json::from_str::<UserInfo>(&raw).ok());
    let Some(user) = user else {
      info!("stored session has no readable user, signing out");
      self.clear();
      return false;
    };

    let roles = self
      .load_key(ROLES_KEY)
      .and_then(|raw| serde_json::from_str::<Vec<String>>(&raw).ok())
      .unwrap_or_default();

    info!(user = %user.username, "session restored");
    self.http.set_token(Some(token.clone()));
    *self.session.write().unwrap_or_else(PoisonError::into_inner) = Session {
      token,
      user: Some(user),
      roles,
    };
    true
  }

  /// Sign in. Token, user and roles are all set, or none are.
  pub async fn login(&self, credentials: &Credentials) -> Result<UserInfo> {
    let endpoint = if credentials.admin {
      "/auth/admin/login"
    } else {
      "/auth/login"
    };

    let call = async {
      let response: LoginResponse = self.http.post(endpoint, credentials).await?;
      if response.token.is_empty() {
        return Err(Error::Session("login response carried no token".to_string()));
      }
      let user = response
        .user
        .ok_or_else(|| Error::Session("login response carried no user".to_string()))?;
      Ok::<_, Error>(Session {
        token: response.token,
        user: Some(user),
        roles: response.roles,
      })
    };

    self
      .lifecycle
      .run(LOGIN, call, |session| {
        let user = session.user.clone().unwrap_or_default();
        info!(user = %user.username, admin = session.is_admin(), "signed in");
        self.establish(session);
        user
      })
      .await
  }

  /// Refresh the user record. Any failure signs the client out and yields `None`.
  ///
  /// Without a token nothing is sent. A refresh that lands after the session
  /// was cleared or replaced is dropped.
  pub async fn fetch_user_info(&self) -> Option<UserInfo> {
    let Some(token) = self.token() else {
      return None;
    };
    let endpoint = if self.is_admin() {
      "/users/admin/me"
    } else {
      "/users/me"
    };

    let result = self
      .lifecycle
      .run(FETCH_USER, self.http.get::<UserProfile>(endpoint), |profile| {
        let mut session = self.session();
        if session.token != token {
          info!("session changed during user refresh, dropping result");
          return None;
        }
        session.user = Some(profile.user.clone());
        if let Some(roles) = profile.roles {
          session.roles = roles;
        }
        self.establish(session);
        Some(profile.user)
      })
      .await;

    match result {
      Ok(user) => user,
      Err(err) => {
        info!(error = %err, "user info unavailable, signing out");
        self.clear();
        None
      }
    }
  }

  /// Send profile changes; the fields the server returns are merged over the
  /// current user.
  pub async fn update_user_info<P>(&self, patch: &P) -> Result<UserInfo>
  where
    P: Serialize + ?Sized,
  {
    let Some(current) = self.user() else {
      return Err(Error::Session("not signed in".to_string()));
    };
    let path = if self.is_admin() {
      format!("/users/admin/{}", current.id)
    } else {
      "/users/me".to_string()
    };

    let call = async {
      let changes: Value = self.http.put(&path, patch).await?;
      merge_user(&current, changes)
    };

    self
      .lifecycle
      .run(UPDATE_USER, call, |user| {
        let mut session = self.session();
        session.user = Some(user.clone());
        self.establish(session);
        user
      })
      .await
  }

  /// Sign out. The local session is cleared before the server is told, so
  /// the client is signed out even if the call fails or is abandoned.
  pub async fn logout(&self) {
    let endpoint = if self.is_admin() {
      "/auth/admin/logout"
    } else {
      "/auth/logout"
    };
    let token = self.token();
    self.clear();
    info!("signed out");

    // The request still has to carry the old token.
    self.http.set_token(token);
    let result = self.http.post_empty::<Value>(endpoint).await;
    if !self.is_logged_in() {
      self.http.set_token(None);
    }
    match result {
      Ok(_) => self.notifier.notify(NotifyKind::Success, "Logged out"),
      Err(err) => warn!(error = %err, "logout request failed"),
    }
  }

  fn establish(&self, session: Session) {
    self.http.set_token(Some(session.token.clone()));
    self.persist(&session);
    *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
  }

  fn clear(&self) {
    *self.session.write().unwrap_or_else(PoisonError::into_inner) = Session::default();
    self.http.set_token(None);
    for key in [TOKEN_KEY, USER_KEY, ROLES_KEY] {
      if let Err(err) = self.storage.remove(key) {
        warn!(key, error = %err, "failed to remove session key");
      }
    }
  }

  fn persist(&self, session: &Session) {
    let user = session
      .user
      .as_ref()
      .and_then(|u| serde_json::to_string(u).ok())
      .unwrap_or_else(|| "{}".to_string());
    let roles = serde_json::to_string(&session.roles).unwrap_or_else(|_| "[]".to_string());

    for (key, value) in [
      (TOKEN_KEY, session.token.as_str()),
      (USER_KEY, user.as_str()),
      (ROLES_KEY, roles.as_str()),
    ] {
      if let Err(err) = self.storage.save(key, value) {
        warn!(key, error = %err, "failed to persist session key");
      }
    }
  }

  fn load_key(&self, key: &str) -> Option<String> {
    match self.storage.load(key) {
      Ok(value) => value,
      Err(err) => {
        warn!(key, error = %err, "failed to read session key");
        None
      }
    }
  }
}

/// Overlay the object fields of `changes` on `current`.
fn merge_user(current: &UserInfo, changes: Value) -> Result<UserInfo> {
  let mut merged = serde_json::to_value(current)?;
  if let (Value::Object(base), Value::Object(changes)) = (&mut merged, changes) {
    base.extend(changes);
  }
  Ok(serde_json::from_value(merged)?)
}

impl<H> std::fmt::Debug for SessionStore<H> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let session = self.session.read().unwrap_or_else(PoisonError::into_inner);
    f.debug_struct("SessionStore")
      .field("logged_in", &!session.token.is_empty())
      .field("roles", &session.roles)
      .finish_non_exhaustive()
  }
}
