//! In-memory mirror of one server collection plus its detail slot.

use serde::{de::DeserializeOwned, Serialize};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::api::types::EntityId;

/// Trait for server records that can live in an [`EntityCache`].
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned {
  /// Server identity, unique within the collection.
  fn id(&self) -> EntityId;

  /// Entity type name used in logs and errors (e.g. "course", "post").
  fn entity_type() -> &'static str;
}

#[derive(Debug)]
struct Slots<T> {
  list: Vec<T>,
  detail: Option<T>,
}

/// Keyed store of server entities plus a "current" detail slot.
///
/// Whenever the list and the detail slot hold the same id, every write keeps
/// both copies identical. Accessors are total: they hand out snapshots and
/// never fail.
#[derive(Debug)]
pub struct EntityCache<T> {
  slots: RwLock<Slots<T>>,
}

impl<T> Default for EntityCache<T> {
  fn default() -> Self {
    Self {
      slots: RwLock::new(Slots {
        list: Vec::new(),
        detail: None,
      }),
    }
  }
}

impl<T: Entity> EntityCache<T> {
  pub fn new() -> Self {
    Self::default()
  }

  fn read(&self) -> RwLockReadGuard<'_, Slots<T>> {
    self.slots.read().unwrap_or_else(PoisonError::into_inner)
  }

  fn write(&self) -> RwLockWriteGuard<'_, Slots<T>> {
    self.slots.write().unwrap_or_else(PoisonError::into_inner)
  }

  /// Last fetched collection, in server order.
  pub fn list(&self) -> Vec<T> {
    self.read().list.clone()
  }

  /// Most recently fetched or mutated single item.
  pub fn detail(&self) -> Option<T> {
    self.read().detail.clone()
  }

  pub fn find(&self, id: EntityId) -> Option<T> {
    self.read().list.iter().find(|e| e.id() == id).cloned()
  }

  pub fn contains(&self, id: EntityId) -> bool {
    self.read().list.iter().any(|e| e.id() == id)
  }

  pub fn len(&self) -> usize {
    self.read().list.len()
  }

  pub fn is_empty(&self) -> bool {
    self.read().list.is_empty()
  }

  /// Replace the whole collection. A held detail with a matching id picks up the new copy.
  pub fn set_list(&self, items: Vec<T>) {
    let mut slots = self.write();
    if let Some(detail) = slots.detail.as_mut() {
      if let Some(fresh) = items.iter().find(|e| e.id() == detail.id()) {
        *detail = fresh.clone();
      }
    }
    slots.list = items;
  }

  /// Set the detail slot, propagating into the list copy if present.
  pub fn set_detail(&self, item: T) {
    let mut slots = self.write();
    let id = item.id();
    if let Some(existing) = slots.list.iter_mut().find(|e| e.id() == id) {
      *existing = item.clone();
    }
    slots.detail = Some(item);
  }

  /// Replace the entry with a matching id, or append it.
  pub fn upsert_in_list(&self, item: T) {
    let mut slots = self.write();
    Self::sync_detail(&mut slots, &item);
    let id = item.id();
    match slots.list.iter_mut().find(|e| e.id() == id) {
      Some(existing) => *existing = item,
      None => slots.list.push(item),
    }
  }

  /// Insert at the front, or replace in place if the id is already present.
  pub fn prepend(&self, item: T) {
    let mut slots = self.write();
    Self::sync_detail(&mut slots, &item);
    let id = item.id();
    match slots.list.iter_mut().find(|e| e.id() == id) {
      Some(existing) => *existing = item,
      None => slots.list.insert(0, item),
    }
  }

  /// Drop the entry with this id from the list. Returns whether one was removed.
  pub fn remove_from_list(&self, id: EntityId) -> bool {
    let mut slots = self.write();
    let before = slots.list.len();
    slots.list.retain(|e| e.id() != id);
    slots.list.len() != before
  }

  /// Remove the id from both the list and the detail slot.
  pub fn evict(&self, id: EntityId) {
    let mut slots = self.write();
    slots.list.retain(|e| e.id() != id);
    if slots.detail.as_ref().is_some_and(|d| d.id() == id) {
      slots.detail = None;
    }
  }

  /// Apply an in-place edit to every copy of the entity with this id.
  ///
  /// Returns the edited value if any copy was found.
  pub fn update<F>(&self, id: EntityId, mut edit: F) -> Option<T>
  where
    F: FnMut(&mut T),
  {
    let mut slots = self.write();
    let mut edited = None;

    if let Some(existing) = slots.list.iter_mut().find(|e| e.id() == id) {
      edit(existing);
      edited = Some(existing.clone());
    }

    if let Some(detail) = slots.detail.as_mut().filter(|d| d.id() == id) {
      match &edited {
        // Keep the detail identical to the list copy rather than editing twice.
        Some(list_copy) => *detail = list_copy.clone(),
        None => {
          edit(detail);
          edited = Some(detail.clone());
        }
      }
    }

    edited
  }

  pub fn clear(&self) {
    let mut slots = self.write();
    slots.list.clear();
    slots.detail = None;
  }

  fn sync_detail(slots: &mut Slots<T>, item: &T) {
    if let Some(detail) = slots.detail.as_mut().filter(|d| d.id() == item.id()) {
      *detail = item.clone();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde::Deserialize;

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Item {
    id: EntityId,
    name: String,
    hits: u32,
  }

  impl Entity for Item {
    fn id(&self) -> EntityId {
      self.id
    }

    fn entity_type() -> &'static str {
      "item"
    }
  }

  fn item(id: EntityId, name: &str) -> Item {
    Item {
      id,
      name: name.to_string(),
      hits: 0,
    }
  }

  #[test]
  fn test_empty_cache_is_total() {
    let cache: EntityCache<Item> = EntityCache::new();
    assert!(cache.list().is_empty());
    assert!(cache.detail().is_none());
    assert!(cache.find(1).is_none());
    assert!(!cache.remove_from_list(1));
  }

  #[test]
  fn test_upsert_replaces_or_appends() {
    let cache = EntityCache::new();
    cache.set_list(vec![item(1, "a"), item(2, "b")]);

    cache.upsert_in_list(item(2, "b2"));
    cache.upsert_in_list(item(3, "c"));

    let names: Vec<_> = cache.list().into_iter().map(|i| i.name).collect();
    assert_eq!(names, vec!["a", "b2", "c"]);
  }

  #[test]
  fn test_detail_propagates_into_list() {
    let cache = EntityCache::new();
    cache.set_list(vec![item(1, "a"), item(2, "b")]);

    cache.set_detail(item(2, "fresh"));

    assert_eq!(cache.find(2).unwrap().name, "fresh");
    assert_eq!(cache.detail().unwrap(), cache.find(2).unwrap());
  }

  #[test]
  fn test_detail_for_unlisted_id_leaves_list_alone() {
    let cache = EntityCache::new();
    cache.set_list(vec![item(1, "a")]);

    cache.set_detail(item(9, "z"));

    assert_eq!(cache.len(), 1);
    assert_eq!(cache.detail().unwrap().id, 9);
  }

  #[test]
  fn test_list_write_propagates_into_detail() {
    let cache = EntityCache::new();
    cache.set_detail(item(1, "old"));

    cache.upsert_in_list(item(1, "new"));
    assert_eq!(cache.detail().unwrap().name, "new");

    cache.set_list(vec![item(1, "newer")]);
    assert_eq!(cache.detail().unwrap().name, "newer");
  }

  #[test]
  fn test_prepend_puts_new_items_first() {
    let cache = EntityCache::new();
    cache.set_list(vec![item(1, "a")]);

    cache.prepend(item(2, "b"));
    cache.prepend(item(1, "a2"));

    let ids: Vec<_> = cache.list().into_iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![2, 1]);
    assert_eq!(cache.find(1).unwrap().name, "a2");
  }

  #[test]
  fn test_evict_clears_matching_detail() {
    let cache = EntityCache::new();
    cache.set_list(vec![item(1, "a"), item(2, "b")]);
    cache.set_detail(item(2, "b"));

    cache.evict(1);
    assert!(cache.detail().is_some());

    cache.evict(2);
    assert!(cache.detail().is_none());
    assert!(cache.is_empty());
  }

  #[test]
  fn test_update_edits_both_copies_once() {
    let cache = EntityCache::new();
    cache.set_list(vec![item(1, "a")]);
    cache.set_detail(item(1, "a"));

    let edited = cache.update(1, |i| i.hits += 1).unwrap();

    assert_eq!(edited.hits, 1);
    assert_eq!(cache.find(1).unwrap().hits, 1);
    assert_eq!(cache.detail().unwrap().hits, 1);
  }

  #[test]
  fn test_update_detail_only() {
    let cache = EntityCache::new();
    cache.set_detail(item(5, "solo"));

    assert_eq!(cache.update(5, |i| i.hits = 4).unwrap().hits, 4);
    assert!(cache.update(6, |i| i.hits = 4).is_none());
  }
}
