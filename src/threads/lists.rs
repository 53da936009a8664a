//! Pinned / unpinned thread collections
//!
//! Every thread id lives in exactly one of the two lists. User actions
//! apply locally first, then call the server; if the call fails, both
//! lists are restored to what they were before the action and the error is
//! handed back to the caller to show.

use super::api::ThreadApi;
use super::change;
use super::{ThreadMetadata, ThreadRecord, ThreadStatus, ThreadSummary};
use crate::errors::{AgentdeckError, Result};
use serde_json::json;

/// Which collection a thread is in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Pinned,
    Unpinned,
}

/// Which collections a poll actually changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListChanges {
    pub pinned: bool,
    pub unpinned: bool,
}

impl ListChanges {
    pub fn any(self) -> bool {
        self.pinned || self.unpinned
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreadLists {
    pinned: Vec<ThreadSummary>,
    unpinned: Vec<ThreadSummary>,
}

/// Newest first
fn sort_by_recency(items: &mut [ThreadSummary]) {
    items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}

/// Split server records into (pinned, unpinned), each newest first
pub fn partition(records: &[ThreadRecord]) -> (Vec<ThreadSummary>, Vec<ThreadSummary>) {
    let (mut pinned, mut unpinned): (Vec<_>, Vec<_>) = records
        .iter()
        .map(ThreadSummary::from)
        .partition(|summary| summary.pinned);
    sort_by_recency(&mut pinned);
    sort_by_recency(&mut unpinned);
    (pinned, unpinned)
}

impl ThreadLists {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pinned(&self) -> &[ThreadSummary] {
        &self.pinned
    }

    pub fn unpinned(&self) -> &[ThreadSummary] {
        &self.unpinned
    }

    pub fn len(&self) -> usize {
        self.pinned.len() + self.unpinned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Where `id` currently lives
    pub fn locate(&self, id: &str) -> Option<ListKind> {
        if self.pinned.iter().any(|t| t.id == id) {
            Some(ListKind::Pinned)
        } else if self.unpinned.iter().any(|t| t.id == id) {
            Some(ListKind::Unpinned)
        } else {
            None
        }
    }

    pub fn get(&self, id: &str) -> Option<&ThreadSummary> {
        self.pinned
            .iter()
            .chain(self.unpinned.iter())
            .find(|t| t.id == id)
    }

    /// Replace both collections from a poll, each only if it changed
    pub fn apply_poll(&mut self, records: &[ThreadRecord]) -> ListChanges {
        let (pinned, unpinned) = partition(records);
        let changes = ListChanges {
            pinned: change::changed(&self.pinned, &pinned),
            unpinned: change::changed(&self.unpinned, &unpinned),
        };
        if changes.pinned {
            self.pinned = pinned;
        }
        if changes.unpinned {
            self.unpinned = unpinned;
        }
        changes
    }

    fn take(&mut self, id: &str) -> Option<(ListKind, ThreadSummary)> {
        if let Some(pos) = self.pinned.iter().position(|t| t.id == id) {
            return Some((ListKind::Pinned, self.pinned.remove(pos)));
        }
        if let Some(pos) = self.unpinned.iter().position(|t| t.id == id) {
            return Some((ListKind::Unpinned, self.unpinned.remove(pos)));
        }
        None
    }

    /// Move `id` into the collection matching `pinned`, locally only
    fn move_local(&mut self, id: &str, pinned: bool) -> Result<()> {
        let (_, mut summary) = self
            .take(id)
            .ok_or_else(|| AgentdeckError::UnknownThread(id.to_string()))?;
        summary.pinned = pinned;
        if pinned {
            self.pinned.insert(0, summary);
        } else {
            self.unpinned.push(summary);
            sort_by_recency(&mut self.unpinned);
        }
        Ok(())
    }

    async fn set_pinned<A: ThreadApi>(&mut self, api: &A, id: &str, pinned: bool) -> Result<()> {
        let target = if pinned {
            ListKind::Pinned
        } else {
            ListKind::Unpinned
        };
        match self.locate(id) {
            None => return Err(AgentdeckError::UnknownThread(id.to_string())),
            Some(kind) if kind == target => return Ok(()),
            Some(_) => {}
        }

        let before = self.clone();
        self.move_local(id, pinned)?;

        if let Err(e) = api.update_thread(id, &json!({ "top": pinned })).await {
            tracing::warn!(thread_id = %id, pinned = pinned, error = %e, "Pin update failed, rolling back");
            *self = before;
            return Err(e);
        }
        tracing::info!(thread_id = %id, pinned = pinned, "Thread pin updated");
        Ok(())
    }

    /// Pin a thread (optimistic, rolled back on failure)
    pub async fn pin<A: ThreadApi>(&mut self, api: &A, id: &str) -> Result<()> {
        self.set_pinned(api, id, true).await
    }

    /// Unpin a thread (optimistic, rolled back on failure)
    pub async fn unpin<A: ThreadApi>(&mut self, api: &A, id: &str) -> Result<()> {
        self.set_pinned(api, id, false).await
    }

    /// Delete a thread (optimistic, rolled back on failure)
    pub async fn delete<A: ThreadApi>(&mut self, api: &A, id: &str) -> Result<()> {
        let before = self.clone();
        self.take(id)
            .ok_or_else(|| AgentdeckError::UnknownThread(id.to_string()))?;

        if let Err(e) = api.delete_thread(id).await {
            tracing::warn!(thread_id = %id, error = %e, "Delete failed, restoring thread");
            *self = before;
            return Err(e);
        }
        tracing::info!(thread_id = %id, "Thread deleted");
        Ok(())
    }

    /// Create a thread on the server and add it to the top of the list
    pub async fn create<A: ThreadApi>(
        &mut self,
        api: &A,
        metadata: &ThreadMetadata,
    ) -> Result<ThreadSummary> {
        let record = api.create_thread(metadata).await?;
        let summary = ThreadSummary::from(&record);
        // A thread can be created pinned
        if summary.pinned {
            self.pinned.insert(0, summary.clone());
        } else {
            self.unpinned.insert(0, summary.clone());
        }
        tracing::info!(thread_id = %summary.id, "Thread created");
        Ok(summary)
    }

    /// Cancel the thread's current run and mark it interrupted
    pub async fn cancel<A: ThreadApi>(&mut self, api: &A, id: &str) -> Result<()> {
        if self.locate(id).is_none() {
            return Err(AgentdeckError::UnknownThread(id.to_string()));
        }
        api.cancel_thread(id).await?;
        if let Some(summary) = self
            .pinned
            .iter_mut()
            .chain(self.unpinned.iter_mut())
            .find(|t| t.id == id)
        {
            summary.status = ThreadStatus::Interrupted;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use crate::threads::{ThreadFilter, ThreadState};
    use serde_json::Value;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// In-memory server with injectable failures
    #[derive(Default)]
    pub struct FakeApi {
        pub records: Mutex<Vec<ThreadRecord>>,
        /// Number of upcoming calls that fail with a 503
        pub failures_pending: AtomicU32,
        pub calls: AtomicU32,
    }

    impl FakeApi {
        pub fn with_records(records: Vec<ThreadRecord>) -> Self {
            Self {
                records: Mutex::new(records),
                ..Default::default()
            }
        }

        pub fn fail_next(&self, n: u32) {
            self.failures_pending.store(n, Ordering::SeqCst);
        }

        fn gate(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let pending = self.failures_pending.load(Ordering::SeqCst);
            if pending > 0 {
                self.failures_pending.store(pending - 1, Ordering::SeqCst);
                return Err(AgentdeckError::Api {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            Ok(())
        }

        fn with_records_mut<T>(&self, f: impl FnOnce(&mut Vec<ThreadRecord>) -> T) -> T {
            let mut guard = match self.records.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            f(&mut guard)
        }
    }

    impl ThreadApi for FakeApi {
        async fn list_threads(&self, _filter: &ThreadFilter) -> Result<Vec<ThreadRecord>> {
            self.gate()?;
            Ok(self.with_records_mut(|records| records.clone()))
        }

        async fn create_thread(&self, metadata: &ThreadMetadata) -> Result<ThreadRecord> {
            self.gate()?;
            let record = self.with_records_mut(|records| {
                let mut record = crate::threads::test_support::record(
                    &format!("t-new-{}", records.len()),
                    "",
                    metadata.top,
                    10_000,
                );
                record.metadata = metadata.clone();
                records.push(record.clone());
                record
            });
            Ok(record)
        }

        async fn delete_thread(&self, id: &str) -> Result<()> {
            self.gate()?;
            self.with_records_mut(|records| records.retain(|r| r.id != id));
            Ok(())
        }

        async fn update_thread(&self, id: &str, patch: &Value) -> Result<ThreadRecord> {
            self.gate()?;
            self.with_records_mut(|records| {
                let record = records
                    .iter_mut()
                    .find(|r| r.id == id)
                    .ok_or_else(|| AgentdeckError::UnknownThread(id.to_string()))?;
                if let Some(top) = patch.get("top").and_then(Value::as_bool) {
                    record.metadata.top = top;
                }
                Ok(record.clone())
            })
        }

        async fn get_thread_state(&self, _id: &str) -> Result<ThreadState> {
            self.gate()?;
            Ok(ThreadState::default())
        }

        async fn cancel_thread(&self, _id: &str) -> Result<()> {
            self.gate()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeApi;
    use super::*;
    use crate::threads::test_support::record;

    fn seeded() -> (FakeApi, ThreadLists) {
        let records = vec![
            record("a", "Alpha", true, 30),
            record("b", "Beta", false, 20),
            record("c", "Gamma", false, 10),
        ];
        let mut lists = ThreadLists::new();
        let _ = lists.apply_poll(&records);
        (FakeApi::with_records(records), lists)
    }

    fn assert_exclusive(lists: &ThreadLists, ids: &[&str]) {
        for id in ids {
            let in_pinned = lists.pinned().iter().filter(|t| t.id == *id).count();
            let in_unpinned = lists.unpinned().iter().filter(|t| t.id == *id).count();
            assert_eq!(in_pinned + in_unpinned, 1, "thread {} must be in exactly one list", id);
        }
    }

    #[test]
    fn test_partition_sorted_newest_first() {
        let (_, lists) = seeded();
        let pinned: Vec<&str> = lists.pinned().iter().map(|t| t.id.as_str()).collect();
        let unpinned: Vec<&str> = lists.unpinned().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(pinned, vec!["a"]);
        assert_eq!(unpinned, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_pin_moves_thread() {
        let (api, mut lists) = seeded();
        lists.pin(&api, "c").await.unwrap();
        assert_eq!(lists.locate("c"), Some(ListKind::Pinned));
        assert_eq!(lists.pinned()[0].id, "c");
        assert!(lists.get("c").unwrap().pinned);
        assert_exclusive(&lists, &["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_pin_failure_rolls_back() {
        let (api, mut lists) = seeded();
        let before = lists.clone();
        api.fail_next(1);

        let err = lists.pin(&api, "b").await.unwrap_err();
        assert!(matches!(err, AgentdeckError::Api { status: 503, .. }));
        assert_eq!(lists, before);
        assert_exclusive(&lists, &["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_unpin_failure_rolls_back() {
        let (api, mut lists) = seeded();
        api.fail_next(1);
        assert!(lists.unpin(&api, "a").await.is_err());
        assert_eq!(lists.locate("a"), Some(ListKind::Pinned));
    }

    #[tokio::test]
    async fn test_pin_unpin_sequence_keeps_exclusivity() {
        let (api, mut lists) = seeded();
        let steps: Vec<(&str, bool, bool)> = vec![
            // (id, pin?, fail?)
            ("b", true, false),
            ("b", false, true),
            ("c", true, true),
            ("a", false, false),
            ("c", true, false),
            ("a", true, true),
            ("b", false, false),
        ];
        for (id, pin, fail) in steps {
            if fail {
                api.fail_next(1);
            }
            let result = if pin {
                lists.pin(&api, id).await
            } else {
                lists.unpin(&api, id).await
            };
            assert_eq!(result.is_err(), fail, "step {} pin={} fail={}", id, pin, fail);
            assert_exclusive(&lists, &["a", "b", "c"]);
        }
        assert_eq!(lists.locate("c"), Some(ListKind::Pinned));
        assert_eq!(lists.locate("a"), Some(ListKind::Unpinned));
        assert_eq!(lists.locate("b"), Some(ListKind::Unpinned));
    }

    #[tokio::test]
    async fn test_pin_already_pinned_is_noop() {
        let (api, mut lists) = seeded();
        lists.pin(&api, "a").await.unwrap();
        assert_eq!(api.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_thread() {
        let (api, mut lists) = seeded();
        assert!(matches!(
            lists.pin(&api, "zzz").await,
            Err(AgentdeckError::UnknownThread(_))
        ));
        assert!(matches!(
            lists.delete(&api, "zzz").await,
            Err(AgentdeckError::UnknownThread(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_and_rollback() {
        let (api, mut lists) = seeded();
        api.fail_next(1);
        assert!(lists.delete(&api, "b").await.is_err());
        assert_eq!(lists.locate("b"), Some(ListKind::Unpinned));

        lists.delete(&api, "b").await.unwrap();
        assert_eq!(lists.locate("b"), None);
        assert_eq!(lists.len(), 2);
    }

    #[tokio::test]
    async fn test_create_inserts_at_top() {
        let (api, mut lists) = seeded();
        let metadata = ThreadMetadata {
            title: Some("Fresh".to_string()),
            ..Default::default()
        };
        let created = lists.create(&api, &metadata).await.unwrap();
        assert_eq!(created.title, "Fresh");
        assert_eq!(lists.unpinned()[0].id, created.id);
    }

    #[tokio::test]
    async fn test_create_failure_surfaces() {
        let (api, mut lists) = seeded();
        api.fail_next(1);
        assert!(lists.create(&api, &ThreadMetadata::default()).await.is_err());
        assert_eq!(lists.len(), 3);
    }

    #[tokio::test]
    async fn test_cancel_marks_interrupted() {
        let (api, mut lists) = seeded();
        lists.cancel(&api, "b").await.unwrap();
        assert_eq!(lists.get("b").unwrap().status, ThreadStatus::Interrupted);
    }

    #[test]
    fn test_apply_poll_reports_per_collection() {
        let (_, mut lists) = seeded();
        let mut records = vec![
            record("a", "Alpha", true, 30),
            record("c", "Gamma", false, 10),
            record("b", "Beta", false, 20),
        ];
        // Reordered, otherwise identical
        assert_eq!(lists.apply_poll(&records), ListChanges::default());

        records[1].metadata.title = Some("Gamma 2".to_string());
        let changes = lists.apply_poll(&records);
        assert!(!changes.pinned);
        assert!(changes.unpinned);
        assert_eq!(lists.get("c").unwrap().title, "Gamma 2");
    }
}
