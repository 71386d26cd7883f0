//! Parent-id keyed sequences of child records.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::entity::{Entity, EntityCache};
use crate::api::types::EntityId;

/// A parent entity that carries a denormalized count of its children.
pub trait ChildCounter: Entity {
  fn child_count(&self) -> u64;

  fn set_child_count(&mut self, count: u64);
}

/// Ordered children per parent id.
///
/// A parent with no entry has not been loaded yet, which is different from a
/// loaded parent with zero children: the parent's counter may be non-zero
/// while its sequence is still absent.
#[derive(Debug)]
pub struct RelationIndex<C> {
  children: RwLock<HashMap<EntityId, Vec<C>>>,
}

impl<C> Default for RelationIndex<C> {
  fn default() -> Self {
    Self {
      children: RwLock::new(HashMap::new()),
    }
  }
}

impl<C: Clone> RelationIndex<C> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Children of `parent` in insertion order; empty if never loaded.
  pub fn children_of(&self, parent: EntityId) -> Vec<C> {
    self
      .children
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(&parent)
      .cloned()
      .unwrap_or_default()
  }

  pub fn has_loaded(&self, parent: EntityId) -> bool {
    self
      .children
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .contains_key(&parent)
  }

  /// Replace the whole sequence for `parent`.
  pub fn set_children(&self, parent: EntityId, children: Vec<C>) {
    self
      .children
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(parent, children);
  }

  /// Replace the sequence and bring the parent's counter in line with it.
  pub fn load_children<P: ChildCounter>(
    &self,
    parents: &EntityCache<P>,
    parent: EntityId,
    children: Vec<C>,
  ) {
    let count = children.len() as u64;
    self.set_children(parent, children);
    parents.update(parent, |p| p.set_child_count(count));
  }

  /// Record a newly created child and bump the parent's counter by one.
  ///
  /// The child is appended only when the parent's sequence is already
  /// loaded. For an unloaded parent the child is not kept anywhere: only the
  /// counter moves, and the caller has to fetch the sequence to see the new
  /// child. Creating a child never turns an unloaded sequence into a
  /// one-element loaded one, so a loaded sequence always matches the counter.
  pub fn add_child<P: ChildCounter>(&self, parents: &EntityCache<P>, parent: EntityId, child: C) {
    if let Some(seq) = self
      .children
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .get_mut(&parent)
    {
      seq.push(child);
    }
    parents.update(parent, |p| p.set_child_count(p.child_count() + 1));
  }

  pub fn remove_parent(&self, parent: EntityId) {
    self
      .children
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(&parent);
  }

  pub fn clear(&self) {
    self
      .children
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .clear();
  }
}
