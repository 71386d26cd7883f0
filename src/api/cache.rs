//! Cache identities for the backend's record types.

use crate::cache::{ChildCounter, Entity};

use super::types::{Course, EntityId, HealthRecord, Post, Prescription};

// ============================================================================
// Entity implementations
// ============================================================================

impl Entity for Course {
  fn id(&self) -> EntityId {
    self.id
  }

  fn entity_type() -> &'static str {
    "course"
  }
}

impl Entity for HealthRecord {
  fn id(&self) -> EntityId {
    self.id
  }

  fn entity_type() -> &'static str {
    "health record"
  }
}

impl Entity for Prescription {
  fn id(&self) -> EntityId {
    self.id
  }

  fn entity_type() -> &'static str {
    "prescription"
  }
}

impl Entity for Post {
  fn id(&self) -> EntityId {
    self.id
  }

  fn entity_type() -> &'static str {
    "post"
  }
}

// ============================================================================
// Denormalized counters
// ============================================================================

impl ChildCounter for Post {
  fn child_count(&self) -> u64 {
    self.comment_count
  }

  fn set_child_count(&mut self, count: u64) {
    self.comment_count = count;
  }
}
