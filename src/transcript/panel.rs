//! Side panel decisions
//!
//! Derives which auxiliary surface should be showing from the processed
//! actions and the newest snapshot. Two rules run on every evaluation:
//!
//! 1. Task reveal: a non-empty design action, or growth in the number of
//!    task-panel actions, switches to `Task` unless already there.
//! 2. Plan reveal: the first non-empty plan switches to `Plan`, once per
//!    transcript.
//!
//! All state (mode, latches, last count) lives in a per-transcript
//! `PanelState` that is reset when the transcript is replaced.

use super::correlate::ProcessedAction;
use super::SnapshotFields;
use serde::Serialize;

/// Auxiliary surface shown next to the transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelMode {
    Task,
    Plan,
    Sandbox,
    #[default]
    Hidden,
}

impl PanelMode {
    pub fn label(self) -> &'static str {
        match self {
            PanelMode::Task => "task",
            PanelMode::Plan => "plan",
            PanelMode::Sandbox => "sandbox",
            PanelMode::Hidden => "hidden",
        }
    }
}

/// One-shot flags, scoped to a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PanelLatches {
    pub has_auto_shown_task: bool,
    pub has_auto_shown_plan: bool,
}

/// What the rules look at, extracted from actions and snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PanelInputs {
    /// A design-namespace action has produced output
    pub design_active: bool,
    /// Actions in the task-panel categories
    pub task_action_count: usize,
    /// Steps in the snapshot's plan
    pub plan_step_count: usize,
}

impl PanelInputs {
    pub fn from_transcript(
        actions: &[ProcessedAction],
        snapshot: &SnapshotFields,
        design_prefix: &str,
    ) -> Self {
        let design_active = actions
            .iter()
            .any(|a| a.action.id.starts_with(design_prefix) && !a.is_pending());
        // Web actions only exist here once they carry results
        let task_action_count = actions
            .iter()
            .filter(|a| a.category.reveals_task_panel())
            .count();

        Self {
            design_active,
            task_action_count,
            plan_step_count: snapshot.plan_steps().len(),
        }
    }
}

/// Panel state owned by one transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PanelState {
    pub mode: PanelMode,
    pub latches: PanelLatches,
    /// Task-panel action count seen by the previous evaluation
    pub last_task_action_count: usize,
}

/// Apply both rules to `state`. Pure; both rules may fire in one call.
pub fn evaluate(inputs: &PanelInputs, mut state: PanelState) -> PanelState {
    let increased = inputs.task_action_count > state.last_task_action_count;
    state.last_task_action_count = inputs.task_action_count;

    let design_reveal = inputs.design_active && !state.latches.has_auto_shown_task;
    if (design_reveal || increased) && state.mode != PanelMode::Task {
        state.mode = PanelMode::Task;
        state.latches.has_auto_shown_task = true;
    } else if design_reveal {
        // Already showing; the design reveal is spent
        state.latches.has_auto_shown_task = true;
    }

    if inputs.plan_step_count > 0
        && !state.latches.has_auto_shown_plan
        && state.mode != PanelMode::Plan
    {
        state.mode = PanelMode::Plan;
        state.latches.has_auto_shown_plan = true;
    }

    state
}

/// Stateful wrapper that re-runs the rules on every transcript change
#[derive(Debug, Clone)]
pub struct PanelEngine {
    design_prefix: String,
    state: PanelState,
}

impl PanelEngine {
    pub fn new(design_prefix: impl Into<String>) -> Self {
        Self {
            design_prefix: design_prefix.into(),
            state: PanelState::default(),
        }
    }

    pub fn mode(&self) -> PanelMode {
        self.state.mode
    }

    pub fn latches(&self) -> PanelLatches {
        self.state.latches
    }

    /// Evaluate against the current actions and snapshot
    pub fn decide(&mut self, actions: &[ProcessedAction], snapshot: &SnapshotFields) -> PanelMode {
        let inputs = PanelInputs::from_transcript(actions, snapshot, &self.design_prefix);
        self.apply(&inputs)
    }

    /// Evaluate against pre-extracted inputs (used by replay)
    pub fn apply(&mut self, inputs: &PanelInputs) -> PanelMode {
        let before = self.state.mode;
        self.state = evaluate(inputs, self.state);
        if self.state.mode != before {
            tracing::debug!(
                from = before.label(),
                to = self.state.mode.label(),
                "Panel mode switched"
            );
        }
        self.state.mode
    }

    /// Explicit selection by the user; latches are untouched
    pub fn select(&mut self, mode: PanelMode) {
        self.state.mode = mode;
    }

    /// Transcript replaced: clear mode, latches and counters
    pub fn reset(&mut self) {
        self.state = PanelState::default();
    }
}
