//! Per-type step handlers
//!
//! Every case entry type maps to exactly one handler. A handler mutates the
//! replay state for one step and reports which parts it touched, whether
//! the cursor should move on, and how long to wait before the next step.

use super::{CaseEvent, CaseEventType, LogEntry, MessageKind, ReplayMessage, ReplayState, Role};
use crate::config::ReplayConfig;
use crate::errors::{AgentdeckError, Result};
use std::collections::VecDeque;
use std::time::Duration;

/// Delays and chunking used while stepping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayTiming {
    pub default_delay: Duration,
    pub chunk_delay: Duration,
    pub chunk_size: usize,
}

impl Default for ReplayTiming {
    fn default() -> Self {
        Self::from(&ReplayConfig::default())
    }
}

impl From<&ReplayConfig> for ReplayTiming {
    fn from(config: &ReplayConfig) -> Self {
        Self {
            default_delay: Duration::from_millis(config.default_delay_ms),
            chunk_delay: Duration::from_millis(config.chunk_delay_ms),
            chunk_size: config.chunk_size.max(1),
        }
    }
}

/// Which parts of the state a step modified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Touched {
    pub messages: bool,
    pub logs: bool,
    pub results: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepEffect {
    pub touched: Touched,
    /// Move the cursor to the next entry after this step
    pub advance: bool,
    pub delay: Duration,
}

impl StepEffect {
    fn done(touched: Touched, delay: Duration) -> Self {
        Self {
            touched,
            advance: true,
            delay,
        }
    }
}

pub type Handler = fn(&CaseEvent, &mut ReplayState, &ReplayTiming) -> Result<StepEffect>;

/// Handler for an entry type
pub fn handler_for(kind: CaseEventType) -> Handler {
    match kind {
        CaseEventType::Message => stream_text,
        CaseEventType::MessageUser => user_message,
        CaseEventType::MessageFile => file_message,
        CaseEventType::MessageTerminal => terminal_message,
        CaseEventType::MessageWeb => web_message,
        CaseEventType::MessageWebResult => merge_results,
        CaseEventType::MessageDesign => design_message,
        CaseEventType::MessageTool => tool_message,
        CaseEventType::LogNew => append_log,
        CaseEventType::LogPrevious => replace_last_log,
    }
}

/// Entry's own delay (clamped to >= 0) or `fallback`
fn delay_or(event: &CaseEvent, fallback: Duration) -> Duration {
    match event.delay {
        Some(ms) => Duration::from_millis(u64::try_from(ms).unwrap_or(0)),
        None => fallback,
    }
}

/// Split on character boundaries, `size` chars per chunk
pub fn chunk_text(text: &str, size: usize) -> VecDeque<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

const MESSAGES: Touched = Touched {
    messages: true,
    logs: false,
    results: false,
};

const LOGS: Touched = Touched {
    messages: false,
    logs: true,
    results: false,
};

/// Type the assistant message out a chunk per step. The cursor stays on
/// this entry until the queue drains.
fn stream_text(event: &CaseEvent, state: &mut ReplayState, timing: &ReplayTiming) -> Result<StepEffect> {
    if !state.streaming {
        state.messages.push(ReplayMessage {
            role: Role::Assistant,
            kind: MessageKind::Text,
            text: String::new(),
            content: event.content.clone(),
        });
        state.pending_text = chunk_text(&super::content_text(&event.content), timing.chunk_size);
        state.streaming = true;
    }

    if let Some(chunk) = state.pending_text.pop_front() {
        if let Some(last) = state.messages.last_mut() {
            last.text.push_str(&chunk);
        }
    }

    let drained = state.pending_text.is_empty();
    if drained {
        state.streaming = false;
    }
    Ok(StepEffect {
        touched: MESSAGES,
        advance: drained,
        delay: delay_or(event, timing.chunk_delay),
    })
}

fn push_message(
    role: Role,
    kind: MessageKind,
    event: &CaseEvent,
    state: &mut ReplayState,
    timing: &ReplayTiming,
) -> Result<StepEffect> {
    state.messages.push(ReplayMessage::new(role, kind, &event.content));
    Ok(StepEffect::done(MESSAGES, delay_or(event, timing.default_delay)))
}

fn user_message(event: &CaseEvent, state: &mut ReplayState, timing: &ReplayTiming) -> Result<StepEffect> {
    push_message(Role::User, MessageKind::Text, event, state, timing)
}

fn file_message(event: &CaseEvent, state: &mut ReplayState, timing: &ReplayTiming) -> Result<StepEffect> {
    push_message(Role::Tool, MessageKind::File, event, state, timing)
}

fn terminal_message(event: &CaseEvent, state: &mut ReplayState, timing: &ReplayTiming) -> Result<StepEffect> {
    push_message(Role::Tool, MessageKind::Terminal, event, state, timing)
}

fn web_message(event: &CaseEvent, state: &mut ReplayState, timing: &ReplayTiming) -> Result<StepEffect> {
    push_message(Role::Tool, MessageKind::Web, event, state, timing)
}

fn design_message(event: &CaseEvent, state: &mut ReplayState, timing: &ReplayTiming) -> Result<StepEffect> {
    push_message(Role::Tool, MessageKind::Design, event, state, timing)
}

fn tool_message(event: &CaseEvent, state: &mut ReplayState, timing: &ReplayTiming) -> Result<StepEffect> {
    push_message(Role::Tool, MessageKind::Tool, event, state, timing)
}

/// Merge an object of results (e.g. hits keyed by URL) into the accumulator
fn merge_results(event: &CaseEvent, state: &mut ReplayState, timing: &ReplayTiming) -> Result<StepEffect> {
    let Some(entries) = event.content.as_object() else {
        return Err(AgentdeckError::MalformedCaseEvent {
            index: state.cursor,
            reason: format!("{} content must be an object", event.kind),
        });
    };
    for (key, value) in entries {
        state.results.insert(key.clone(), value.clone());
    }
    let touched = Touched {
        results: true,
        ..Default::default()
    };
    Ok(StepEffect::done(touched, delay_or(event, timing.default_delay)))
}

fn append_log(event: &CaseEvent, state: &mut ReplayState, timing: &ReplayTiming) -> Result<StepEffect> {
    state.push_log(LogEntry::new(&event.content));
    Ok(StepEffect::done(LOGS, delay_or(event, timing.default_delay)))
}

fn replace_last_log(event: &CaseEvent, state: &mut ReplayState, timing: &ReplayTiming) -> Result<StepEffect> {
    let entry = LogEntry::new(&event.content);
    match state.logs.last_mut() {
        Some(last) => *last = entry,
        None => state.push_log(entry),
    }
    Ok(StepEffect::done(LOGS, delay_or(event, timing.default_delay)))
}
