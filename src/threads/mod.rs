//! Thread summaries and their wire shapes
//!
//! The agent server returns thread records with free-form metadata; the
//! sidebar only needs a handful of fields, collected in `ThreadSummary`.

pub mod api;
pub mod change;
pub mod lists;
pub mod poller;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Run status of a thread as reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatus {
    Idle,
    Busy,
    Interrupted,
    Error,
    /// Anything the server reports that we don't recognize
    #[default]
    #[serde(other)]
    Unknown,
}

impl ThreadStatus {
    pub fn label(self) -> &'static str {
        match self {
            ThreadStatus::Idle => "idle",
            ThreadStatus::Busy => "busy",
            ThreadStatus::Interrupted => "interrupted",
            ThreadStatus::Error => "error",
            ThreadStatus::Unknown => "unknown",
        }
    }
}

/// Client-owned metadata stored on each thread
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Pinned to the top of the sidebar
    #[serde(default)]
    pub top: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachment_list: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_type: Option<String>,
}

/// Thread as returned by the agent server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadRecord {
    #[serde(alias = "thread_id")]
    pub id: String,
    #[serde(default)]
    pub metadata: ThreadMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub status: ThreadStatus,
    #[serde(default)]
    pub values: Value,
}

/// Sidebar entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreadSummary {
    pub id: String,
    pub title: String,
    pub status: ThreadStatus,
    pub pinned: bool,
    pub updated_at: DateTime<Utc>,
    /// Whether the thread has any conversation state yet
    pub has_started: bool,
}

impl From<&ThreadRecord> for ThreadSummary {
    fn from(record: &ThreadRecord) -> Self {
        let has_started = match &record.values {
            Value::Null => false,
            Value::Object(map) => !map.is_empty(),
            Value::Array(items) => !items.is_empty(),
            _ => true,
        };
        Self {
            id: record.id.clone(),
            title: record
                .metadata
                .title
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "Untitled".to_string()),
            status: record.status,
            pinned: record.metadata.top,
            updated_at: record.updated_at,
            has_started,
        }
    }
}

/// Filter passed to the thread search endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ThreadFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ThreadStatus>,
    pub limit: usize,
    pub offset: usize,
}

/// Conversation state of one thread
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ThreadState {
    #[serde(default)]
    pub values: Value,
    #[serde(default)]
    pub next: Vec<String>,
}

impl ThreadState {
    /// Transcript events stored in the state values
    pub fn events(&self) -> Vec<crate::transcript::Event> {
        let raw = self
            .values
            .get("events")
            .or_else(|| self.values.get("messages"))
            .and_then(Value::as_array);
        match raw {
            Some(items) => crate::transcript::parse_events(items),
            None => Vec::new(),
        }
    }

    /// State values as snapshot fields (plan, auxiliary results, ...)
    pub fn snapshot(&self) -> crate::transcript::SnapshotFields {
        crate::transcript::SnapshotFields(self.values.as_object().cloned().unwrap_or_default())
    }

    /// Auxiliary results stored under `values.aux_results`, keyed by call id
    pub fn aux_results(&self) -> crate::transcript::correlate::AuxResults {
        self.values
            .get("aux_results")
            .and_then(Value::as_object)
            .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_deserializes_server_shape() {
        let record: ThreadRecord = serde_json::from_value(json!({
            "thread_id": "t-1",
            "metadata": {"title": "Trip plan", "top": true, "agentType": "research"},
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:05:00Z",
            "status": "busy",
            "values": {"messages": []}
        }))
        .unwrap();
        assert_eq!(record.id, "t-1");
        assert!(record.metadata.top);
        assert_eq!(record.metadata.agent_type.as_deref(), Some("research"));

        let summary = ThreadSummary::from(&record);
        assert_eq!(summary.title, "Trip plan");
        assert_eq!(summary.status, ThreadStatus::Busy);
        assert!(summary.pinned);
        assert!(summary.has_started);
    }

    #[test]
    fn test_unknown_status_and_missing_title() {
        let record: ThreadRecord = serde_json::from_value(json!({
            "id": "t-2",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
            "status": "done"
        }))
        .unwrap();
        let summary = ThreadSummary::from(&record);
        assert_eq!(summary.status, ThreadStatus::Unknown);
        assert_eq!(summary.title, "Untitled");
        assert!(!summary.pinned);
        assert!(!summary.has_started);
    }

    #[test]
    fn test_thread_state_exposes_transcript() {
        let state: ThreadState = serde_json::from_value(json!({
            "values": {
                "events": [
                    {"type": "tool_call", "id": "c1", "tool_name": "web"},
                    {"type": "bogus"}
                ],
                "aux_results": {"c1": {"https://a.example": {"title": "A"}}},
                "plan": {"steps": ["look up"]}
            }
        }))
        .unwrap();
        assert_eq!(state.events().len(), 1);
        assert!(state.aux_results().contains_key("c1"));
        assert_eq!(state.snapshot().plan_steps().len(), 1);
    }
}
