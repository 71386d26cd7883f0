//! Course catalogue, favorites and per-course progress.

use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock};

use crate::api::http::HttpClient;
use crate::api::notify::Notifier;
use crate::api::types::{Course, CourseProgress, CourseQuery, EntityId, ListPayload, NewCourse};
use crate::cache::{views, Entity, EntityCache};
use crate::error::{Error, Result};
use crate::lifecycle::{Lifecycle, Operation, OperationStatus};

const FETCH_COURSES: Operation = Operation::new("fetch_courses", "Failed to load courses");
const FETCH_COURSE: Operation = Operation::new("fetch_course", "Failed to load course details");
const CREATE_COURSE: Operation =
  Operation::new("create_course", "Failed to create course").announce("Course created");
const UPDATE_COURSE: Operation =
  Operation::new("update_course", "Failed to update course").announce("Course updated");
const DELETE_COURSE: Operation =
  Operation::new("delete_course", "Failed to delete course").announce("Course deleted");
const FETCH_FAVORITES: Operation =
  Operation::new("fetch_favorites", "Failed to load favorite courses");
const ADD_FAVORITE: Operation =
  Operation::new("add_favorite", "Operation failed").announce("Added to favorites");
const REMOVE_FAVORITE: Operation =
  Operation::new("remove_favorite", "Operation failed").announce("Removed from favorites");
const FETCH_PROGRESS: Operation = Operation::new("fetch_progress", "Failed to load progress");
const UPDATE_PROGRESS: Operation = Operation::new("update_progress", "Failed to update progress");

pub struct CourseStore<H> {
  http: Arc<H>,
  courses: EntityCache<Course>,
  favorites: RwLock<BTreeSet<EntityId>>,
  /// Only courses the user has started have an entry.
  progress: RwLock<BTreeMap<EntityId, u8>>,
  lifecycle: Lifecycle,
}

impl<H: HttpClient> CourseStore<H> {
  pub fn new(http: Arc<H>, notifier: Arc<dyn Notifier>) -> Self {
    Self {
      http,
      courses: EntityCache::new(),
      favorites: RwLock::new(BTreeSet::new()),
      progress: RwLock::new(BTreeMap::new()),
      lifecycle: Lifecycle::new("courses", notifier),
    }
  }

  pub fn status(&self) -> OperationStatus {
    self.lifecycle.status()
  }

  pub fn courses(&self) -> Vec<Course> {
    self.courses.list()
  }

  /// Course currently shown in detail.
  pub fn current(&self) -> Option<Course> {
    self.courses.detail()
  }

  pub fn course(&self, id: EntityId) -> Option<Course> {
    views::find_by_id(&self.courses.list(), id).cloned()
  }

  pub fn favorite_ids(&self) -> BTreeSet<EntityId> {
    self
      .favorites
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  pub fn is_favorite(&self, id: EntityId) -> bool {
    views::membership_of(&self.favorite_ids(), id)
  }

  /// Listed courses that are favorites, in list order.
  pub fn favorite_courses(&self) -> Vec<Course> {
    let favorites = self.favorite_ids();
    views::filter_by(&self.courses.list(), |c| views::membership_of(&favorites, c.id))
  }

  /// Recorded progress, or `None` when the course was never started.
  pub fn progress_of(&self, id: EntityId) -> Option<u8> {
    self
      .progress
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(&id)
      .copied()
  }

  pub fn progress(&self) -> BTreeMap<EntityId, u8> {
    self
      .progress
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  pub async fn fetch_courses(&self, query: &CourseQuery) -> Result<Vec<Course>> {
    let call = self.http.get_with::<ListPayload<Course>, _>("/v1/courses", query);
    self
      .lifecycle
      .run(FETCH_COURSES, call, |payload| {
        let courses = payload.into_vec();
        self.courses.set_list(courses.clone());
        courses
      })
      .await
  }

  pub async fn fetch_course(&self, id: EntityId) -> Result<Course> {
    let path = format!("/v1/courses/{}", id);
    self
      .lifecycle
      .run(FETCH_COURSE, self.http.get::<Course>(&path), |course| {
        self.courses.set_detail(course.clone());
        course
      })
      .await
  }

  pub async fn create_course(&self, course: &NewCourse) -> Result<Course> {
    let call = self.http.post::<Course, _>("/v1/courses", course);
    self
      .lifecycle
      .run(CREATE_COURSE, call, |created| {
        self.courses.upsert_in_list(created.clone());
        created
      })
      .await
  }

  /// Send a partial update; the server's copy replaces every cached copy.
  pub async fn update_course<P>(&self, id: EntityId, patch: &P) -> Result<Course>
  where
    P: Serialize + ?Sized,
  {
    let path = format!("/v1/courses/{}", id);
    self
      .lifecycle
      .run(UPDATE_COURSE, self.http.put::<Course, _>(&path, patch), |updated| {
        self.courses.upsert_in_list(updated.clone());
        updated
      })
      .await
  }

  pub async fn delete_course(&self, id: EntityId) -> Result<()> {
    let path = format!("/v1/courses/{}", id);
    self
      .lifecycle
      .run(DELETE_COURSE, self.http.delete::<Value>(&path), |_| {
        self.courses.evict(id);
      })
      .await
  }

  pub async fn fetch_favorites(&self) -> Result<Vec<Course>> {
    let call = self
      .http
      .get::<ListPayload<Course>>("/v1/courses/favorites");
    self
      .lifecycle
      .run(FETCH_FAVORITES, call, |payload| {
        let courses = payload.into_vec();
        *self.favorites.write().unwrap_or_else(PoisonError::into_inner) =
          courses.iter().map(|c| c.id).collect();
        courses
      })
      .await
  }

  /// Flip favorite membership once the server confirms it.
  ///
  /// Returns the new membership. The course must be in the current list.
  pub async fn toggle_favorite(&self, id: EntityId) -> Result<bool> {
    if !self.courses.contains(id) {
      return Err(Error::NotCached {
        entity: Course::entity_type(),
        id,
      });
    }

    let path = format!("/v1/courses/{}/favorite", id);
    if self.is_favorite(id) {
      self
        .lifecycle
        .run(REMOVE_FAVORITE, self.http.delete::<Value>(&path), |_| {
          self
            .favorites
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
          false
        })
        .await
    } else {
      self
        .lifecycle
        .run(ADD_FAVORITE, self.http.post_empty::<Value>(&path), |_| {
          self
            .favorites
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
          true
        })
        .await
    }
  }

  pub async fn fetch_progress(&self) -> Result<Vec<CourseProgress>> {
    let call = self
      .http
      .get::<ListPayload<CourseProgress>>("/v1/courses/progress");
    self
      .lifecycle
      .run(FETCH_PROGRESS, call, |payload| {
        let entries = payload.into_vec();
        *self.progress.write().unwrap_or_else(PoisonError::into_inner) = entries
          .iter()
          .map(|e| (e.course_id, e.progress))
          .collect();
        entries
      })
      .await
  }

  /// Record progress (0-100) for a course.
  pub async fn update_progress(&self, id: EntityId, progress: u8) -> Result<u8> {
    if progress > 100 {
      return Err(Error::InvalidInput(format!(
        "progress must be between 0 and 100, got {}",
        progress
      )));
    }

    let path = format!("/v1/courses/{}/progress", id);
    let body = json!({ "progress": progress });
    self
      .lifecycle
      .run(UPDATE_PROGRESS, self.http.post::<Value, _>(&path, &body), |_| {
        self
          .progress
          .write()
          .unwrap_or_else(PoisonError::into_inner)
          .insert(id, progress);
        progress
      })
      .await
  }

  /// Forget everything cached for the signed-out user.
  pub fn reset(&self) {
    self.courses.clear();
    self
      .favorites
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .clear();
    self
      .progress
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .clear();
    self.lifecycle.reset();
  }
}
