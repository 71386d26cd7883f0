//! Read-only projections over cache snapshots.
//!
//! Nothing here is memoized; every call recomputes from the slice it is given.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::BTreeSet;

use super::entity::Entity;
use crate::api::types::EntityId;

pub fn find_by_id<T: Entity>(list: &[T], id: EntityId) -> Option<&T> {
  list.iter().find(|e| e.id() == id)
}

pub fn filter_by<T, P>(list: &[T], pred: P) -> Vec<T>
where
  T: Clone,
  P: Fn(&T) -> bool,
{
  list.iter().filter(|e| pred(e)).cloned().collect()
}

/// Entry with the greatest parsed date; the first occurrence wins ties.
///
/// Entries whose date does not parse are ignored.
pub fn latest_by<T, F>(list: &[T], date: F) -> Option<&T>
where
  F: Fn(&T) -> &str,
{
  let mut best: Option<(DateTime<Utc>, &T)> = None;
  for entry in list {
    let Some(at) = parse_date(date(entry)) else {
      continue;
    };
    match best {
      Some((current, _)) if at <= current => {}
      _ => best = Some((at, entry)),
    }
  }
  best.map(|(_, entry)| entry)
}

pub fn membership_of(ids: &BTreeSet<EntityId>, id: EntityId) -> bool {
  ids.contains(&id)
}

/// Parse the date formats the backend emits: RFC 3339, naive ISO timestamps,
/// and plain calendar dates (taken as midnight UTC).
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
  let s = s.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc));
  }
  for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
      return Some(dt.and_utc());
    }
  }
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .ok()
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug, Clone, PartialEq)]
  struct Reading {
    tag: &'static str,
    date: &'static str,
  }

  fn reading(tag: &'static str, date: &'static str) -> Reading {
    Reading { tag, date }
  }

  #[test]
  fn test_latest_by_picks_max_date() {
    let list = vec![
      reading("a", "2024-01-03"),
      reading("b", "2024-02-01T08:00:00Z"),
      reading("c", "2024-01-20T10:00:00"),
    ];
    assert_eq!(latest_by(&list, |r| r.date).unwrap().tag, "b");
  }

  #[test]
  fn test_latest_by_first_occurrence_wins_ties() {
    let list = vec![
      reading("first", "2024-05-01"),
      reading("second", "2024-05-01T00:00:00Z"),
    ];
    assert_eq!(latest_by(&list, |r| r.date).unwrap().tag, "first");
  }

  #[test]
  fn test_latest_by_skips_unparseable() {
    let list = vec![reading("bad", "yesterday"), reading("ok", "2023-12-31")];
    assert_eq!(latest_by(&list, |r| r.date).unwrap().tag, "ok");
    assert!(latest_by(&[reading("bad", "")], |r| r.date).is_none());
  }

  #[test]
  fn test_latest_by_does_not_reorder() {
    let list = vec![reading("old", "2020-01-01"), reading("new", "2021-01-01")];
    let _ = latest_by(&list, |r| r.date);
    assert_eq!(list[0].tag, "old");
  }

  #[test]
  fn test_filter_by_keeps_order() {
    let list = vec![1, 2, 3, 4, 5, 6];
    assert_eq!(filter_by(&list, |n| n % 2 == 0), vec![2, 4, 6]);
  }

  #[test]
  fn test_membership() {
    let ids: BTreeSet<EntityId> = [1, 5].into_iter().collect();
    assert!(membership_of(&ids, 5));
    assert!(!membership_of(&ids, 2));
  }

  #[test]
  fn test_parse_date_offsets() {
    let a = parse_date("2024-03-01T10:00:00+02:00").unwrap();
    let b = parse_date("2024-03-01T08:00:00Z").unwrap();
    assert_eq!(a, b);
  }
}
