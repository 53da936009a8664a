//! Significant-change detection for polled collections
//!
//! Poll responses are freshly deserialized and may come back in a different
//! order; republishing them unconditionally would redraw the sidebar on
//! every tick. `changed` answers whether anything a user could see differs.

use super::ThreadSummary;
use std::collections::HashMap;

/// A record that can be compared on its user-visible fields
pub trait Tracked {
    fn id(&self) -> &str;

    /// True when every significant field matches `other`
    fn same_significant_fields(&self, other: &Self) -> bool;
}

impl Tracked for ThreadSummary {
    fn id(&self) -> &str {
        &self.id
    }

    fn same_significant_fields(&self, other: &Self) -> bool {
        self.title == other.title
            && self.status == other.status
            && self.updated_at.timestamp_millis() == other.updated_at.timestamp_millis()
            && self.pinned == other.pinned
    }
}

fn sorted_ids<T: Tracked>(items: &[T]) -> Vec<&str> {
    let mut ids: Vec<&str> = items.iter().map(|item| item.id()).collect();
    ids.sort_unstable();
    ids
}

/// Whether `next` differs meaningfully from `prev`
pub fn changed<T: Tracked>(prev: &[T], next: &[T]) -> bool {
    if sorted_ids(prev) != sorted_ids(next) {
        return true;
    }

    let previous: HashMap<&str, &T> = prev.iter().map(|item| (item.id(), item)).collect();
    next.iter().any(|item| {
        previous
            .get(item.id())
            .is_some_and(|old| !old.same_significant_fields(item))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threads::test_support::record;
    use crate::threads::ThreadStatus;

    fn summaries(specs: &[(&str, &str, i64)]) -> Vec<ThreadSummary> {
        specs
            .iter()
            .map(|(id, title, secs)| ThreadSummary::from(&record(id, title, false, *secs)))
            .collect()
    }

    #[test]
    fn test_identical_is_unchanged() {
        let items = summaries(&[("a", "A", 1), ("b", "B", 2)]);
        assert!(!changed(&items, &items));
        assert!(!changed::<ThreadSummary>(&[], &[]));
        // Idempotent
        assert_eq!(changed(&items, &items), changed(&items, &items));
    }

    #[test]
    fn test_reordering_is_unchanged() {
        let prev = summaries(&[("a", "A", 1), ("b", "B", 2)]);
        let next = summaries(&[("b", "B", 2), ("a", "A", 1)]);
        assert!(!changed(&prev, &next));
    }

    #[test]
    fn test_id_set_difference() {
        let prev = summaries(&[("a", "A", 1)]);
        let next = summaries(&[("a", "A", 1), ("b", "B", 2)]);
        assert!(changed(&prev, &next));
        assert!(changed(&next, &prev));
    }

    #[test]
    fn test_ids_containing_separators_stay_distinct() {
        let joined = summaries(&[("a,b", "A", 1)]);
        let split = summaries(&[("a", "A", 1), ("b", "A", 1)]);
        assert!(changed(&joined, &split));
        assert!(changed(&split, &joined));
    }

    #[test]
    fn test_significant_field_changes() {
        let prev = summaries(&[("a", "A", 1)]);

        let mut retitled = prev.clone();
        retitled[0].title = "Renamed".to_string();
        let mut busy = prev.clone();
        busy[0].status = ThreadStatus::Busy;
        let mut touched = prev.clone();
        touched[0].updated_at += chrono::Duration::seconds(5);
        let mut pinned = prev.clone();
        pinned[0].pinned = true;

        for next in [retitled, busy, touched, pinned] {
            assert!(changed(&prev, &next), "expected change: {:?}", next[0]);
        }
    }

    #[test]
    fn test_insignificant_field_ignored() {
        let prev = summaries(&[("a", "A", 1)]);
        let mut next = prev.clone();
        next[0].has_started = !next[0].has_started;
        assert!(!changed(&prev, &next));
    }
}
