//! Records mirrored from the backend, plus the payloads sent to it.
//!
//! Every server-owned record keeps a fixed set of known fields and an `extra`
//! map that captures anything else the server sends, so unknown fields
//! survive a round trip.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Server-assigned identity, unique within its collection.
pub type EntityId = i64;

/// Catch-all for fields this client does not model.
pub type Extra = BTreeMap<String, Value>;

// ============================================================================
// Courses
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
  pub id: EntityId,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub cover_url: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub difficulty: Option<String>,
  /// Minutes.
  #[serde(default)]
  pub duration: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub instructor_id: Option<EntityId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub instructor_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub category: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub tags: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub video_url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub enrolled_count: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rating: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<String>,
  #[serde(flatten)]
  pub extra: Extra,
}

/// Payload for creating a course.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewCourse {
  pub title: String,
  pub description: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cover_url: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub difficulty: Option<String>,
  pub duration: u32,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub instructor_id: Option<EntityId>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub category: Option<String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub tags: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub video_url: Option<String>,
}

/// Course list filters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CourseQuery {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub skip: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub limit: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub difficulty: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub keyword: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub instructor_id: Option<EntityId>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub min_duration: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_duration: Option<u32>,
}

/// One entry of the progress listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgress {
  pub course_id: EntityId,
  pub progress: u8,
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthRecord {
  pub id: EntityId,
  #[serde(default)]
  pub user_id: EntityId,
  /// Measurement kind, e.g. "weight" or "steps".
  #[serde(rename = "type", default)]
  pub kind: String,
  #[serde(default)]
  pub value: f64,
  #[serde(default)]
  pub unit: String,
  #[serde(default)]
  pub date: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
  #[serde(flatten)]
  pub extra: Extra,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHealthRecord {
  #[serde(rename = "type")]
  pub kind: String,
  pub value: f64,
  pub unit: String,
  pub date: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrescriptionStatus {
  #[default]
  Active,
  Completed,
  Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
  pub id: EntityId,
  #[serde(default)]
  pub user_id: EntityId,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub exercises: Vec<Exercise>,
  #[serde(default)]
  pub status: PrescriptionStatus,
  #[serde(default)]
  pub start_date: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub end_date: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_by: Option<EntityId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<String>,
  #[serde(flatten)]
  pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
  pub id: EntityId,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub description: String,
  /// Minutes.
  #[serde(default)]
  pub duration: u32,
  #[serde(default)]
  pub frequency: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sets: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub reps: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image_url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub video_url: Option<String>,
}

// ============================================================================
// Social
// ============================================================================

/// Compact user reference embedded in posts and comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
  pub id: EntityId,
  #[serde(default)]
  pub username: String,
  #[serde(default)]
  pub nickname: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
  pub id: EntityId,
  #[serde(default)]
  pub user_id: EntityId,
  #[serde(default)]
  pub content: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub images: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub video: Option<String>,
  #[serde(default)]
  pub likes: u64,
  /// Server-side comment total; may run ahead of the loaded comment sequence.
  #[serde(default)]
  pub comment_count: u64,
  #[serde(default)]
  pub is_liked: bool,
  #[serde(default)]
  pub created_at: String,
  #[serde(default)]
  pub updated_at: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub user: Option<Author>,
  #[serde(flatten)]
  pub extra: Extra,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewPost {
  pub content: String,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub images: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub video: Option<String>,
}

/// Feed filters.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub page: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub limit: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub user_id: Option<EntityId>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub keyword: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
  pub id: EntityId,
  #[serde(default)]
  pub feed_id: EntityId,
  #[serde(default)]
  pub user_id: EntityId,
  #[serde(default)]
  pub content: String,
  #[serde(default)]
  pub created_at: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub user: Option<Author>,
}

/// Answer to a like/unlike request.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LikeCount {
  pub likes: u64,
}

// ============================================================================
// Session
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
  pub id: EntityId,
  #[serde(default)]
  pub username: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub nickname: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub avatar: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  #[serde(flatten)]
  pub extra: Extra,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
  pub username: String,
  pub password: String,
  #[serde(rename = "isAdmin", skip_serializing_if = "std::ops::Not::not")]
  pub admin: bool,
}

/// Answer to a profile fetch. Roles, when present, replace the session's.
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
  #[serde(flatten)]
  pub user: UserInfo,
  #[serde(default)]
  pub roles: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
  #[serde(alias = "access_token", default)]
  pub token: String,
  pub user: Option<UserInfo>,
  #[serde(default)]
  pub roles: Vec<String>,
}

// ============================================================================
// Envelopes
// ============================================================================

/// A collection answer, either a bare array or a paged object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListPayload<T> {
  Bare(Vec<T>),
  Paged {
    #[serde(alias = "data")]
    items: Vec<T>,
    #[serde(default)]
    #[allow(dead_code)]
    total: Option<u64>,
  },
}

impl<T> ListPayload<T> {
  pub fn into_vec(self) -> Vec<T> {
    match self {
      ListPayload::Bare(items) | ListPayload::Paged { items, .. } => items,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_unknown_fields_survive_round_trip() {
    let raw = json!({
      "id": 3,
      "title": "Waltz basics",
      "duration": 45,
      "level_badge": "gold",
      "meta": {"season": 2}
    });

    let course: Course = serde_json::from_value(raw.clone()).unwrap();
    assert_eq!(course.extra.get("level_badge"), Some(&json!("gold")));

    let back = serde_json::to_value(&course).unwrap();
    assert_eq!(back["level_badge"], json!("gold"));
    assert_eq!(back["meta"], json!({"season": 2}));
    assert!(back.get("difficulty").is_none());
  }

  #[test]
  fn test_post_uses_camel_case() {
    let post: Post = serde_json::from_value(json!({
      "id": 7,
      "likes": 3,
      "commentCount": 2,
      "isLiked": false
    }))
    .unwrap();

    assert_eq!(post.comment_count, 2);
    assert!(!post.is_liked);
    assert!(post.extra.is_empty());
  }

  #[test]
  fn test_health_record_type_field() {
    let record: HealthRecord = serde_json::from_value(json!({
      "id": 1,
      "type": "weight",
      "value": 61.5,
      "unit": "kg",
      "date": "2024-03-01"
    }))
    .unwrap();

    assert_eq!(record.kind, "weight");
  }

  #[test]
  fn test_list_payload_shapes() {
    let bare: ListPayload<CourseProgress> =
      serde_json::from_value(json!([{"courseId": 1, "progress": 40}])).unwrap();
    assert_eq!(bare.into_vec().len(), 1);

    let paged: ListPayload<CourseProgress> = serde_json::from_value(json!({
      "items": [{"courseId": 1, "progress": 40}, {"courseId": 2, "progress": 90}],
      "total": 2
    }))
    .unwrap();
    assert_eq!(paged.into_vec()[1].course_id, 2);

    let data: ListPayload<CourseProgress> =
      serde_json::from_value(json!({"data": [], "total": 0})).unwrap();
    assert!(data.into_vec().is_empty());
  }

  #[test]
  fn test_login_accepts_access_token() {
    let resp: LoginResponse = serde_json::from_value(json!({
      "access_token": "abc",
      "user": {"id": 1, "username": "mei"}
    }))
    .unwrap();

    assert_eq!(resp.token, "abc");
    assert!(resp.roles.is_empty());
  }

  #[test]
  fn test_profile_roles_stay_out_of_extra() {
    let profile: UserProfile = serde_json::from_value(json!({
      "id": 2,
      "username": "li",
      "roles": ["admin"],
      "level": 3
    }))
    .unwrap();

    assert_eq!(profile.roles, Some(vec!["admin".to_string()]));
    assert!(profile.user.extra.get("roles").is_none());
    assert_eq!(profile.user.extra.get("level"), Some(&json!(3)));
  }

  #[test]
  fn test_credentials_omit_admin_flag_for_members() {
    let creds = Credentials {
      username: "mei".into(),
      password: "pw".into(),
      admin: false,
    };
    let value = serde_json::to_value(&creds).unwrap();
    assert!(value.get("isAdmin").is_none());
  }
}
