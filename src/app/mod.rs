//! Replay viewer state
//!
//! The `App` owns the replay scheduler and the panel engine fed from its
//! state. The main loop in `main.rs` waits on key events, the scheduler's
//! deadline and a render tick; the App only reacts.

mod keyboard;

use crate::config::AgentdeckConfig;
use crate::event::Event;
use crate::replay::handlers::ReplayTiming;
use crate::replay::scheduler::{Phase, ReplayScheduler, ReplaySink};
use crate::replay::{CaseScript, LogEntry, ReplayMessage};
use crate::transcript::panel::{PanelEngine, PanelMode};
use serde_json::{Map, Value};
use tokio::time::Instant;

/// Records which parts of the replay state a step published
#[derive(Debug, Default)]
struct StepChanges {
    messages: bool,
    logs: bool,
    results: bool,
    phase: Option<Phase>,
}

impl ReplaySink for StepChanges {
    fn messages_changed(&mut self, _messages: &[ReplayMessage]) {
        self.messages = true;
    }

    fn logs_changed(&mut self, _logs: &[LogEntry]) {
        self.logs = true;
    }

    fn results_changed(&mut self, _results: &Map<String, Value>) {
        self.results = true;
    }

    fn phase_changed(&mut self, phase: Phase) {
        self.phase = Some(phase);
    }
}

pub struct App {
    pub replay: ReplayScheduler,
    pub panel: PanelEngine,
    /// Name shown in the header, usually the script file name
    pub title: String,
    pub should_quit: bool,
    pub show_help: bool,
    /// Dirty flag: true if UI needs re-render
    pub needs_render: bool,
    /// Transient message shown in the footer
    pub status_message: Option<String>,
}

impl App {
    pub fn new(script: CaseScript, title: impl Into<String>, config: &AgentdeckConfig) -> Self {
        Self {
            replay: ReplayScheduler::new(script, ReplayTiming::from(&config.replay)),
            panel: PanelEngine::new(config.panel.design_prefix.clone()),
            title: title.into(),
            should_quit: false,
            show_help: false,
            needs_render: true,
            status_message: None,
        }
    }

    pub fn start(&mut self) {
        self.replay.start();
        self.needs_render = true;
    }

    /// When the next replay step is due, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.replay.deadline()
    }

    /// Run the due replay step and refresh derived state
    pub fn on_deadline(&mut self) {
        let mut changes = StepChanges::default();
        self.replay.fire(&mut changes);

        if changes.messages || changes.results {
            self.panel.apply(&self.replay.state().panel_inputs());
        }
        if let Some(phase) = changes.phase {
            self.status_message = match phase {
                Phase::Aborted => Some("Replay aborted, see log for details".to_string()),
                Phase::Finished => Some("Replay finished".to_string()),
                _ => None,
            };
        }
        self.needs_render = self.needs_render
            || changes.messages
            || changes.logs
            || changes.results
            || changes.phase.is_some();
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Resize => {}
        }
        // Any input triggers a render
        self.needs_render = true;
    }

    /// Stop playback; accumulated state stays on screen
    pub fn stop(&mut self) {
        if self.replay.phase() == Phase::Running {
            self.replay.cancel();
            self.status_message = Some("Replay stopped".to_string());
        }
    }

    /// Play the script again from the start with a fresh panel
    pub fn restart(&mut self) {
        self.replay.restart();
        self.panel.reset();
        self.status_message = None;
    }

    /// Cycle the side panel by hand
    pub fn cycle_panel(&mut self) {
        let next = match self.panel.mode() {
            PanelMode::Hidden => PanelMode::Task,
            PanelMode::Task => PanelMode::Plan,
            PanelMode::Plan => PanelMode::Sandbox,
            PanelMode::Sandbox => PanelMode::Hidden,
        };
        self.panel.select(next);
    }

    /// Tear the view down; the scheduler's timer is cleared first
    pub fn quit(&mut self) {
        self.replay.cancel();
        self.should_quit = true;
    }

    /// Tick for elapsed-time driven redraws
    pub fn tick(&mut self) {
        if self.replay.phase() == Phase::Running {
            self.needs_render = true;
        }
    }

    /// Called after render to reset dirty flag
    pub fn rendered(&mut self) {
        self.needs_render = false;
    }
}
