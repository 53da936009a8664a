//! Per-transcript view model
//!
//! Owns everything derived from one thread's event log: the correlated
//! actions and the panel state. Switching to a different thread id throws
//! all of it away so nothing leaks between transcripts.

use super::classify::{classify, EventKind, ToolCategory};
use super::correlate::{AuxResults, Correlator, ProcessedAction};
use super::panel::{PanelEngine, PanelLatches, PanelMode};
use super::{Event, SnapshotFields};
use crate::config::PanelConfig;
use serde::Serialize;
use std::collections::BTreeMap;

/// Result of feeding a new log snapshot into the view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewUpdate {
    pub actions_changed: bool,
    pub mode: PanelMode,
    pub mode_changed: bool,
}

/// Serializable summary of the view, used by the CLI
#[derive(Debug, Serialize)]
pub struct ViewSnapshot<'a> {
    pub thread_id: Option<&'a str>,
    pub panel_mode: PanelMode,
    pub latches: PanelLatches,
    pub active_category: Option<ToolCategory>,
    /// Number of events of each kind in the log
    pub event_counts: &'a BTreeMap<EventKind, usize>,
    pub actions: &'a [ProcessedAction],
}

pub struct TranscriptView {
    thread_id: Option<String>,
    correlator: Correlator,
    panel: PanelEngine,
    event_counts: BTreeMap<EventKind, usize>,
}

impl TranscriptView {
    pub fn new(config: &PanelConfig) -> Self {
        Self {
            thread_id: None,
            correlator: Correlator::new(config.warn_on_orphan_results),
            panel: PanelEngine::new(config.design_prefix.clone()),
            event_counts: BTreeMap::new(),
        }
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    /// Point the view at a thread. A different id resets actions and
    /// latches; the same id is a no-op.
    pub fn switch_thread(&mut self, thread_id: &str) {
        if self.thread_id.as_deref() == Some(thread_id) {
            return;
        }
        tracing::debug!(
            from = ?self.thread_id,
            to = %thread_id,
            "Transcript replaced, resetting view state"
        );
        self.thread_id = Some(thread_id.to_string());
        self.correlator.reset();
        self.panel.reset();
        self.event_counts.clear();
    }

    /// Recompute from the full current log. `current` holds the thread's
    /// live state fields; they take precedence over the newest snapshot
    /// event in the log.
    pub fn update(
        &mut self,
        events: &[Event],
        aux: &AuxResults,
        current: &SnapshotFields,
    ) -> ViewUpdate {
        let before = self.panel.mode();
        let actions_changed = self.correlator.update(events, aux);
        let snapshot = SnapshotFields::latest(events).overlaid_with(current);

        self.event_counts.clear();
        for event in events {
            *self.event_counts.entry(classify(event).kind).or_default() += 1;
        }

        let mode = self.panel.decide(self.correlator.actions(), &snapshot);

        ViewUpdate {
            actions_changed,
            mode,
            mode_changed: mode != before,
        }
    }

    pub fn actions(&self) -> &[ProcessedAction] {
        self.correlator.actions()
    }

    /// User picked a panel explicitly
    #[cfg(test)]
    pub fn select_panel(&mut self, mode: PanelMode) {
        self.panel.select(mode);
    }

    /// Category of the newest pending action, else of the newest action
    pub fn active_category(&self) -> Option<ToolCategory> {
        let actions = self.correlator.actions();
        actions
            .iter()
            .rev()
            .find(|a| a.is_pending())
            .or_else(|| actions.last())
            .map(|a| a.category)
    }

    pub fn snapshot(&self) -> ViewSnapshot<'_> {
        ViewSnapshot {
            thread_id: self.thread_id(),
            panel_mode: self.panel.mode(),
            latches: self.panel.latches(),
            active_category: self.active_category(),
            event_counts: &self.event_counts,
            actions: self.actions(),
        }
    }
}
