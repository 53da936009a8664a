//! Recorded case playback
//!
//! A case script is a fixed, ordered list of `{type, content, delay?}`
//! entries. The scheduler walks it on a timer and each entry mutates a
//! `ReplayState` the same way a live transcript would grow.

pub mod handlers;
pub mod scheduler;

use crate::config::MAX_VISIBLE_LOGS;
use crate::errors::{AgentdeckError, Result};
use crate::transcript::panel::PanelInputs;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::path::Path;

/// One entry of a case script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: Value,
    /// Milliseconds to wait before the next step; negative values clamp to 0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<i64>,
}

impl CaseEvent {
    pub fn event_type(&self) -> Option<CaseEventType> {
        CaseEventType::parse(&self.kind)
    }
}

/// Entry types the handler table knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseEventType {
    Message,
    MessageUser,
    MessageFile,
    MessageTerminal,
    MessageWeb,
    MessageWebResult,
    MessageDesign,
    MessageTool,
    LogNew,
    LogPrevious,
}

impl CaseEventType {
    pub const ALL: [CaseEventType; 10] = [
        CaseEventType::Message,
        CaseEventType::MessageUser,
        CaseEventType::MessageFile,
        CaseEventType::MessageTerminal,
        CaseEventType::MessageWeb,
        CaseEventType::MessageWebResult,
        CaseEventType::MessageDesign,
        CaseEventType::MessageTool,
        CaseEventType::LogNew,
        CaseEventType::LogPrevious,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CaseEventType::Message => "message",
            CaseEventType::MessageUser => "message-user",
            CaseEventType::MessageFile => "message-file",
            CaseEventType::MessageTerminal => "message-terminal",
            CaseEventType::MessageWeb => "message-web",
            CaseEventType::MessageWebResult => "message-web-result",
            CaseEventType::MessageDesign => "message-design",
            CaseEventType::MessageTool => "message-tool",
            CaseEventType::LogNew => "log-new",
            CaseEventType::LogPrevious => "log-previous",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == raw)
    }
}

/// Fixed playback script
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseScript {
    events: Vec<CaseEvent>,
}

impl CaseScript {
    #[cfg(test)]
    pub fn new(events: Vec<CaseEvent>) -> Self {
        Self { events }
    }

    /// Parse a JSON array (or one entry per line). Entries must at least be
    /// objects with a string `type`; unknown types are kept and abort the
    /// replay when reached.
    pub fn from_json(raw: &str) -> Result<Self> {
        let values = crate::transcript::parse_document(raw)?;
        let mut events = Vec::with_capacity(values.len());
        for (index, value) in values.into_iter().enumerate() {
            let event: CaseEvent =
                serde_json::from_value(value).map_err(|e| AgentdeckError::MalformedCaseEvent {
                    index,
                    reason: e.to_string(),
                })?;
            events.push(event);
        }
        Ok(Self { events })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let script = Self::from_json(&raw)?;
        if script.is_empty() {
            tracing::warn!(path = %path.display(), "Case script has no entries");
        }
        tracing::info!(path = %path.display(), events = script.len(), "Loaded case script");
        Ok(script)
    }

    #[cfg(test)]
    pub fn events(&self) -> &[CaseEvent] {
        &self.events
    }

    pub fn get(&self, index: usize) -> Option<&CaseEvent> {
        self.events.get(index)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

/// What a replayed message renders as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    File,
    Terminal,
    Web,
    Design,
    Tool,
}

impl MessageKind {
    pub fn label(self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::File => "file",
            MessageKind::Terminal => "terminal",
            MessageKind::Web => "web",
            MessageKind::Design => "design",
            MessageKind::Tool => "tool",
        }
    }

    /// Kinds that count toward revealing the task panel
    fn is_task_work(self) -> bool {
        matches!(
            self,
            MessageKind::File | MessageKind::Terminal | MessageKind::Web
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayMessage {
    pub role: Role,
    pub kind: MessageKind,
    pub text: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub content: Value,
}

impl ReplayMessage {
    pub fn new(role: Role, kind: MessageKind, content: &Value) -> Self {
        Self {
            role,
            kind,
            text: content_text(content),
            content: content.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub text: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub content: Value,
}

impl LogEntry {
    pub fn new(content: &Value) -> Self {
        Self {
            text: content_text(content),
            content: content.clone(),
        }
    }
}

/// Display text for a case entry's content: a plain string, an object's
/// `text` (or `content`) field, or compact JSON
pub fn content_text(content: &Value) -> String {
    match content {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("text")
            .or_else(|| map.get("content"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| content.to_string()),
        other => other.to_string(),
    }
}

/// Mutable playback cursor and everything accumulated so far
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayState {
    pub messages: Vec<ReplayMessage>,
    pub logs: Vec<LogEntry>,
    /// Chunks of the assistant message currently being typed out
    pub pending_text: VecDeque<String>,
    /// Structured results merged from `message-web-result` entries
    pub results: Map<String, Value>,
    /// Index of the next script entry to play
    pub cursor: usize,
    /// The entry at `cursor` has started streaming into the last message
    pub(crate) streaming: bool,
}

impl ReplayState {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_log(&mut self, entry: LogEntry) {
        self.logs.push(entry);
        if self.logs.len() > MAX_VISIBLE_LOGS {
            let excess = self.logs.len() - MAX_VISIBLE_LOGS;
            self.logs.drain(..excess);
        }
    }

    /// Panel inputs equivalent to what a live transcript with the same
    /// messages would produce
    pub fn panel_inputs(&self) -> PanelInputs {
        let task_action_count = self
            .messages
            .iter()
            .filter(|m| m.kind.is_task_work())
            .filter(|m| m.kind != MessageKind::Web || !self.results.is_empty())
            .count();
        PanelInputs {
            design_active: self.messages.iter().any(|m| m.kind == MessageKind::Design),
            task_action_count,
            plan_step_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_type_parse() {
        for kind in CaseEventType::ALL {
            assert_eq!(CaseEventType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(CaseEventType::parse("message-video"), None);
        assert_eq!(CaseEventType::parse("Message"), None);
    }

    #[test]
    fn test_script_from_json_keeps_unknown_types() {
        let script = CaseScript::from_json(
            r#"[
                {"type": "message-user", "content": "hi"},
                {"type": "message", "content": "hello", "delay": -5},
                {"type": "message-hologram"}
            ]"#,
        )
        .unwrap();
        assert_eq!(script.len(), 3);
        assert_eq!(script.events()[1].delay, Some(-5));
        assert_eq!(script.events()[2].event_type(), None);
        assert_eq!(script.events()[2].content, Value::Null);
    }

    #[test]
    fn test_script_rejects_entry_without_type() {
        let err = CaseScript::from_json(r#"[{"type": "log-new"}, {"content": "x"}]"#).unwrap_err();
        assert!(
            matches!(err, AgentdeckError::MalformedCaseEvent { index: 1, .. }),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn test_script_load_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("case.jsonl");
        std::fs::write(
            &path,
            "{\"type\": \"log-new\", \"content\": \"boot\"}\n{\"type\": \"log-previous\", \"content\": \"ready\"}\n",
        )
        .unwrap();
        let script = CaseScript::load(&path).unwrap();
        assert_eq!(script.len(), 2);
    }

    #[test]
    fn test_content_text() {
        let cases = vec![
            (json!("plain"), "plain"),
            (json!({"text": "from text"}), "from text"),
            (json!({"content": "from content"}), "from content"),
            (json!(null), ""),
            (json!(42), "42"),
            (json!({"path": "a.rs"}), r#"{"path":"a.rs"}"#),
        ];
        for (content, expected) in cases {
            assert_eq!(content_text(&content), expected, "content: {content}");
        }
    }

    #[test]
    fn test_log_cap() {
        let mut state = ReplayState::new();
        for i in 0..MAX_VISIBLE_LOGS + 5 {
            state.push_log(LogEntry::new(&json!(format!("line {i}"))));
        }
        assert_eq!(state.logs.len(), MAX_VISIBLE_LOGS);
        assert_eq!(state.logs[0].text, "line 5");
    }

    #[test]
    fn test_panel_inputs_from_messages() {
        let mut state = ReplayState::new();
        state
            .messages
            .push(ReplayMessage::new(Role::Tool, MessageKind::Web, &json!("search")));
        assert_eq!(state.panel_inputs().task_action_count, 0);

        state.results.insert("https://a.example".into(), json!({"title": "A"}));
        state
            .messages
            .push(ReplayMessage::new(Role::Tool, MessageKind::File, &json!("a.rs")));
        let inputs = state.panel_inputs();
        assert_eq!(inputs.task_action_count, 2);
        assert!(!inputs.design_active);

        state
            .messages
            .push(ReplayMessage::new(Role::Tool, MessageKind::Design, &json!("mock")));
        assert!(state.panel_inputs().design_active);
    }
}
