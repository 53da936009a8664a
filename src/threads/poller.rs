//! Periodic thread-list refresh
//!
//! Polls on a fixed interval. A failed poll is retried at the same interval;
//! after `max_failures` consecutive failures polling stops without surfacing
//! an error, leaving the last good list in place.

use super::api::ThreadApi;
use super::lists::{ListChanges, ThreadLists};
use super::ThreadFilter;
use crate::config::PollingConfig;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Outcome of one poll tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTick {
    /// Poll succeeded; which collections changed
    Refreshed(ListChanges),
    /// Poll failed; consecutive failure count so far
    Failed(u32),
    /// Failure budget exhausted, polling should stop
    GaveUp,
}

pub struct ThreadPoller {
    interval: Duration,
    max_failures: u32,
    page_size: usize,
    failures: u32,
}

impl ThreadPoller {
    pub fn new(config: &PollingConfig) -> Self {
        Self {
            interval: config.interval(),
            max_failures: config.max_failures,
            page_size: config.page_size,
            failures: 0,
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn exhausted(&self) -> bool {
        self.failures >= self.max_failures
    }

    fn filter(&self) -> ThreadFilter {
        ThreadFilter {
            limit: self.page_size,
            ..Default::default()
        }
    }

    /// Fetch once and apply the change detector to each collection
    pub async fn poll_once<A: ThreadApi>(&mut self, api: &A, lists: &mut ThreadLists) -> PollTick {
        if self.exhausted() {
            return PollTick::GaveUp;
        }

        match api.list_threads(&self.filter()).await {
            Ok(records) => {
                self.failures = 0;
                let changes = lists.apply_poll(&records);
                if changes.any() {
                    tracing::debug!(
                        pinned = changes.pinned,
                        unpinned = changes.unpinned,
                        total = records.len(),
                        "Thread list changed"
                    );
                }
                PollTick::Refreshed(changes)
            }
            Err(e) => {
                self.failures += 1;
                if e.is_transient() {
                    tracing::debug!(attempt = self.failures, error = %e, "Thread poll failed");
                } else {
                    tracing::warn!(attempt = self.failures, error = %e, "Thread poll failed");
                }
                if self.exhausted() {
                    tracing::warn!(
                        failures = self.failures,
                        "Giving up on thread polling, keeping last known list"
                    );
                    PollTick::GaveUp
                } else {
                    PollTick::Failed(self.failures)
                }
            }
        }
    }

    /// Poll until cancelled or the failure budget runs out. `on_change` is
    /// called only when a collection actually changed.
    pub async fn run<A, F>(
        &mut self,
        api: &A,
        lists: &mut ThreadLists,
        cancel: CancellationToken,
        mut on_change: F,
    ) where
        A: ThreadApi,
        F: FnMut(&ThreadLists, ListChanges),
    {
        loop {
            match self.poll_once(api, lists).await {
                PollTick::Refreshed(changes) if changes.any() => on_change(lists, changes),
                PollTick::Refreshed(_) | PollTick::Failed(_) => {}
                PollTick::GaveUp => return,
            }

            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::debug!("Thread poller cancelled");
                    return;
                }
                () = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threads::lists::fake::FakeApi;
    use crate::threads::test_support::record;
    use std::sync::atomic::Ordering;

    fn poller() -> ThreadPoller {
        ThreadPoller::new(&PollingConfig::default())
    }

    #[tokio::test]
    async fn test_first_poll_changes_then_quiet() {
        let api = FakeApi::with_records(vec![
            record("a", "Alpha", true, 2),
            record("b", "Beta", false, 1),
        ]);
        let mut lists = ThreadLists::new();
        let mut poller = poller();

        let first = poller.poll_once(&api, &mut lists).await;
        assert_eq!(
            first,
            PollTick::Refreshed(ListChanges {
                pinned: true,
                unpinned: true
            })
        );

        let second = poller.poll_once(&api, &mut lists).await;
        assert_eq!(second, PollTick::Refreshed(ListChanges::default()));
    }

    #[tokio::test]
    async fn test_gives_up_after_eleven_failures() {
        let api = FakeApi::with_records(vec![record("a", "Alpha", false, 1)]);
        let mut lists = ThreadLists::new();
        let mut poller = poller();
        api.fail_next(100);

        for attempt in 1..=10 {
            assert_eq!(
                poller.poll_once(&api, &mut lists).await,
                PollTick::Failed(attempt)
            );
        }
        assert_eq!(poller.poll_once(&api, &mut lists).await, PollTick::GaveUp);
        // No further requests once exhausted
        let calls = api.calls.load(Ordering::SeqCst);
        assert_eq!(poller.poll_once(&api, &mut lists).await, PollTick::GaveUp);
        assert_eq!(api.calls.load(Ordering::SeqCst), calls);
        assert!(lists.is_empty());
    }

    #[tokio::test]
    async fn test_success_resets_failure_count() {
        let api = FakeApi::with_records(vec![record("a", "Alpha", false, 1)]);
        let mut lists = ThreadLists::new();
        let mut poller = poller();

        api.fail_next(3);
        for _ in 0..3 {
            let _ = poller.poll_once(&api, &mut lists).await;
        }
        assert_eq!(poller.failures(), 3);
        let _ = poller.poll_once(&api, &mut lists).await;
        assert_eq!(poller.failures(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_silently_when_exhausted() {
        let api = FakeApi::with_records(vec![record("a", "Alpha", false, 1)]);
        let mut lists = ThreadLists::new();
        let mut poller = poller();
        api.fail_next(u32::MAX);

        let mut notified = 0;
        poller
            .run(&api, &mut lists, CancellationToken::new(), |_, _| notified += 1)
            .await;

        assert_eq!(notified, 0);
        assert_eq!(api.calls.load(Ordering::SeqCst), 11);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_notifies_only_on_change() {
        let api = FakeApi::with_records(vec![record("a", "Alpha", false, 1)]);
        let mut lists = ThreadLists::new();
        let mut poller = poller();
        let cancel = CancellationToken::new();

        let stopper = cancel.clone();
        let mut notified = 0;
        poller
            .run(&api, &mut lists, cancel, |lists, _| {
                notified += 1;
                assert_eq!(lists.len(), 1);
                // Stop after the first tick so the test finishes
                stopper.cancel();
            })
            .await;

        assert_eq!(notified, 1);
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }
}
