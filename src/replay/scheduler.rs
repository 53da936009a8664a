//! Single-timer replay state machine
//!
//! `Idle -> Running -> Finished | Cancelled | Aborted`. The scheduler owns
//! exactly one `TimerSlot`; every path that leaves `Running` clears it
//! before doing anything else, and dropping the scheduler clears it too.
//!
//! The scheduler itself never sleeps. `run` drives it for headless playback
//! and the terminal viewer waits on `deadline()` inside its own select loop.

use super::handlers::{handler_for, ReplayTiming, StepEffect};
use super::{CaseScript, LogEntry, ReplayMessage, ReplayState};
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Finished,
    Cancelled,
    Aborted,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Running => "playing",
            Phase::Finished => "finished",
            Phase::Cancelled => "stopped",
            Phase::Aborted => "aborted",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Finished | Phase::Cancelled | Phase::Aborted)
    }
}

/// Receives the parts of the replay state a step changed
pub trait ReplaySink {
    fn messages_changed(&mut self, _messages: &[ReplayMessage]) {}
    fn logs_changed(&mut self, _logs: &[LogEntry]) {}
    fn results_changed(&mut self, _results: &Map<String, Value>) {}
    fn phase_changed(&mut self, _phase: Phase) {}
}

/// Sink that discards everything
#[cfg(test)]
pub struct NullSink;

#[cfg(test)]
impl ReplaySink for NullSink {}

/// Roughly thirty years
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Holder for the one pending step deadline. Arming replaces any previous
/// deadline, so two timers can never be pending at once.
#[derive(Debug, Default)]
pub struct TimerSlot {
    deadline: Option<Instant>,
}

impl TimerSlot {
    /// Delays past the clock's range are capped at `FAR_FUTURE`
    pub fn arm(&mut self, delay: Duration) {
        let now = Instant::now();
        self.deadline = Some(now.checked_add(delay).unwrap_or(now + FAR_FUTURE));
    }

    /// Clear the pending deadline; returns whether one was pending
    pub fn clear(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[cfg(test)]
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }
}

enum Step {
    Continue(StepEffect),
    Finished,
    Aborted,
}

pub struct ReplayScheduler {
    script: CaseScript,
    timing: ReplayTiming,
    state: ReplayState,
    timer: TimerSlot,
    phase: Phase,
    steps: usize,
}

impl ReplayScheduler {
    pub fn new(script: CaseScript, timing: ReplayTiming) -> Self {
        Self {
            script,
            timing,
            state: ReplayState::new(),
            timer: TimerSlot::default(),
            phase: Phase::Idle,
            steps: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &ReplayState {
        &self.state
    }

    pub fn script(&self) -> &CaseScript {
        &self.script
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Begin playback; the first step is due immediately
    pub fn start(&mut self) {
        if self.phase != Phase::Idle {
            return;
        }
        self.timer.clear();
        self.phase = Phase::Running;
        self.timer.arm(Duration::ZERO);
        tracing::info!(events = self.script.len(), "Replay started");
    }

    /// Drop all accumulated state and play again from the first entry
    pub fn restart(&mut self) {
        self.timer.clear();
        self.state = ReplayState::new();
        self.phase = Phase::Idle;
        self.steps = 0;
        self.start();
    }

    /// Explicit stop: clears the timer and marks the replay cancelled
    pub fn cancel(&mut self) {
        self.timer.clear();
        if !self.phase.is_terminal() {
            self.phase = Phase::Cancelled;
            tracing::info!(cursor = self.state.cursor, steps = self.steps, "Replay cancelled");
        }
    }

    /// Run one step and schedule the next. Does nothing unless running.
    pub fn fire(&mut self, sink: &mut impl ReplaySink) -> Phase {
        if self.phase != Phase::Running {
            return self.phase;
        }
        self.timer.clear();

        match self.step() {
            Step::Continue(effect) => {
                self.steps += 1;
                if effect.touched.messages {
                    sink.messages_changed(&self.state.messages);
                }
                if effect.touched.logs {
                    sink.logs_changed(&self.state.logs);
                }
                if effect.touched.results {
                    sink.results_changed(&self.state.results);
                }
                tracing::debug!(
                    cursor = self.state.cursor,
                    delay_ms = u64::try_from(effect.delay.as_millis()).unwrap_or(u64::MAX),
                    "Replay step"
                );
                self.timer.arm(effect.delay);
            }
            Step::Finished => {
                self.phase = Phase::Finished;
                tracing::info!(steps = self.steps, "Replay finished");
                sink.phase_changed(self.phase);
            }
            Step::Aborted => {
                self.timer.clear();
                self.phase = Phase::Aborted;
                sink.phase_changed(self.phase);
            }
        }
        self.phase
    }

    fn step(&mut self) -> Step {
        let index = self.state.cursor;
        let Some(event) = self.script.get(index) else {
            return Step::Finished;
        };

        let Some(kind) = event.event_type() else {
            tracing::warn!(index, kind = %event.kind, "Unknown case event type, aborting replay");
            return Step::Aborted;
        };

        match handler_for(kind)(event, &mut self.state, &self.timing) {
            Ok(effect) => {
                if effect.advance {
                    self.state.cursor += 1;
                }
                Step::Continue(effect)
            }
            Err(e) => {
                tracing::error!(index, kind = kind.as_str(), error = %e, "Replay step failed");
                Step::Aborted
            }
        }
    }

    /// Play to completion, waiting out each delay. Cancelling `cancel`
    /// stops playback as an explicit stop would.
    pub async fn run(&mut self, sink: &mut impl ReplaySink, cancel: CancellationToken) -> Phase {
        self.start();
        while let Some(deadline) = self.timer.deadline() {
            tokio::select! {
                () = cancel.cancelled() => {
                    self.cancel();
                    sink.phase_changed(self.phase);
                }
                () = tokio::time::sleep_until(deadline) => {
                    self.fire(sink);
                }
            }
        }
        self.phase
    }
}

#[cfg(test)]
impl ReplayScheduler {
    /// Number of steps executed since the last (re)start
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn has_pending_timer(&self) -> bool {
        self.timer.is_armed()
    }

    /// Whether the pending step is due at `now`
    pub fn is_due(&self, now: Instant) -> bool {
        self.phase == Phase::Running && self.timer.deadline().is_some_and(|d| d <= now)
    }
}

impl Drop for ReplayScheduler {
    fn drop(&mut self) {
        if self.timer.clear() {
            tracing::debug!(cursor = self.state.cursor, "Replay torn down with a pending step");
        }
    }
}

/// Sleep until `deadline`, or forever when there is none
pub async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
