//! Domain stores and their composition.

mod courses;
mod health;
mod session;
mod social;

pub use courses::CourseStore;
pub use health::HealthStore;
pub use session::{Session, SessionStore, ROLES_KEY, TOKEN_KEY, USER_KEY};
pub use social::SocialStore;

use std::sync::Arc;

use crate::api::http::HttpClient;
use crate::api::notify::Notifier;
use crate::api::types::UserInfo;
use crate::cache::SessionStorage;

/// Every store of the client, sharing one transport and one notification sink.
pub struct Stores<H> {
  pub session: SessionStore<H>,
  pub courses: CourseStore<H>,
  pub health: HealthStore<H>,
  pub social: SocialStore<H>,
}

impl<H: HttpClient> Stores<H> {
  pub fn new(http: Arc<H>, storage: Arc<dyn SessionStorage>, notifier: Arc<dyn Notifier>) -> Self {
    Self {
      session: SessionStore::new(http.clone(), storage, notifier.clone()),
      courses: CourseStore::new(http.clone(), notifier.clone()),
      health: HealthStore::new(http.clone(), notifier.clone()),
      social: SocialStore::new(http, notifier),
    }
  }

  /// Reload the persisted session. Cached data is dropped when no session
  /// survives.
  pub fn restore(&self) -> bool {
    let restored = self.session.restore();
    if !restored {
      self.reset_caches();
    }
    restored
  }

  /// Refresh the signed-in user. A refresh that signs the client out also
  /// drops everything cached for the previous user.
  pub async fn fetch_user_info(&self) -> Option<UserInfo> {
    let user = self.session.fetch_user_info().await;
    if !self.session.is_logged_in() {
      self.reset_caches();
    }
    user
  }

  /// Sign out and forget everything cached for the previous user.
  pub async fn logout(&self) {
    self.session.logout().await;
    self.reset_caches();
  }

  fn reset_caches(&self) {
    self.courses.reset();
    self.health.reset();
    self.social.reset();
  }
}
