//! Transcript event model
//!
//! A transcript is the append-only event log of one conversational thread.
//! Events arrive from the agent server (or a recorded file) as JSON objects
//! tagged by `type`; anything that does not match a known shape is logged
//! and skipped rather than failing the whole transcript.

pub mod classify;
pub mod correlate;
pub mod panel;
pub mod view;

use crate::errors::{AgentdeckError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// One entry of the transcript log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Text typed by the user
    UserText { id: String, text: String },
    /// A streamed chunk of assistant text
    AssistantText {
        id: String,
        #[serde(default)]
        parent_id: Option<String>,
        text: String,
    },
    /// The assistant asked for one or more tools to run
    ToolCall(ToolCallEvent),
    /// Outcome of an earlier tool call, keyed by its call id
    ToolResult(ToolResult),
    /// Periodic full copy of the agent's structured state
    StateSnapshot {
        #[serde(default)]
        fields: Map<String, Value>,
    },
}

#[cfg(test)]
impl Event {
    /// Event identity; tool results are identified by the call they answer
    pub fn id(&self) -> Option<&str> {
        match self {
            Event::UserText { id, .. } | Event::AssistantText { id, .. } => Some(id.as_str()),
            Event::ToolCall(call) => Some(call.id.as_str()),
            Event::ToolResult(result) => Some(result.tool_call_id.as_str()),
            Event::StateSnapshot { .. } => None,
        }
    }
}

/// A tool-call event. Either a single invocation described inline by
/// `tool_name`/`arguments_json`, or a batch listed in `calls`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallEvent {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub arguments_json: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<ToolInvocation>,
}

impl ToolCallEvent {
    /// Single-invocation call event
    #[cfg(test)]
    pub fn single(id: impl Into<String>, tool_name: impl Into<String>, arguments_json: &str) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            tool_name: Some(tool_name.into()),
            arguments_json: Some(arguments_json.to_string()),
            calls: Vec::new(),
        }
    }

    /// Every invocation carried by this event, in declaration order
    pub fn invocations(&self) -> Vec<ToolInvocation> {
        if !self.calls.is_empty() {
            return self.calls.clone();
        }
        match &self.tool_name {
            Some(name) => vec![ToolInvocation {
                id: self.id.clone(),
                tool_name: name.clone(),
                arguments_json: self.arguments_json.clone().unwrap_or_default(),
            }],
            None => {
                tracing::warn!(call_id = %self.id, "Tool call event without tool name or calls");
                Vec::new()
            }
        }
    }
}

/// One requested tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub id: String,
    pub tool_name: String,
    #[serde(default)]
    pub arguments_json: String,
}

impl ToolInvocation {
    /// Parsed arguments; unparseable JSON is logged and treated as absent
    pub fn arguments(&self) -> Option<Value> {
        if self.arguments_json.trim().is_empty() {
            return None;
        }
        match serde_json::from_str(&self.arguments_json) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(
                    call_id = %self.id,
                    tool = %self.tool_name,
                    error = %e,
                    "Unparseable tool arguments"
                );
                None
            }
        }
    }
}

/// Result of a tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    #[serde(default)]
    pub tool_name: String,
    #[serde(default)]
    pub content: Value,
}

/// Structured agent state carried by the newest snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotFields(pub Map<String, Value>);

impl SnapshotFields {
    /// Fields of the last `StateSnapshot` in the log, or empty
    pub fn latest(events: &[Event]) -> Self {
        events
            .iter()
            .rev()
            .find_map(|event| match event {
                Event::StateSnapshot { fields } => Some(Self(fields.clone())),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Merge `current` over these fields; keys present in both take the
    /// value from `current`
    pub fn overlaid_with(mut self, current: &SnapshotFields) -> Self {
        for (key, value) in &current.0 {
            self.0.insert(key.clone(), value.clone());
        }
        self
    }

    /// Steps of the agent's plan (`plan.steps`)
    pub fn plan_steps(&self) -> &[Value] {
        self.0
            .get("plan")
            .and_then(|plan| plan.get("steps"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Parse raw JSON values into events, skipping the ones that don't fit
pub fn parse_events(raw: &[Value]) -> Vec<Event> {
    raw.iter()
        .enumerate()
        .filter_map(|(index, value)| match parse_event(value) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(index = index, error = %e, "Skipping malformed transcript event");
                None
            }
        })
        .collect()
}

/// Parse one raw JSON value into an event
pub fn parse_event(value: &Value) -> Result<Event> {
    serde_json::from_value(value.clone()).map_err(|e| {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("<missing type>");
        AgentdeckError::MalformedEvent(format!("{kind}: {e}"))
    })
}

/// Load a transcript from a JSON array file or a JSON-lines file
pub fn load_events(path: &Path) -> Result<Vec<Event>> {
    let content = std::fs::read_to_string(path)?;
    let raw = parse_document(&content)?;
    let events = parse_events(&raw);
    tracing::info!(
        path = %path.display(),
        loaded = events.len(),
        skipped = raw.len() - events.len(),
        "Loaded transcript"
    );
    Ok(events)
}

/// Split a document into raw values: a JSON array, or one value per line
pub(crate) fn parse_document(content: &str) -> Result<Vec<Value>> {
    if content.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(content)?);
    }

    let mut values = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(value) => values.push(value),
            Err(e) => {
                tracing::warn!(line = line_no + 1, error = %e, "Skipping unparseable line");
            }
        }
    }
    Ok(values)
}
