//! Tool call / result correlation
//!
//! Builds one `ProcessedAction` per tool invocation in the transcript by
//! matching results on `tool_call_id`. The whole list is rebuilt from the
//! full event log on every change and only published when it differs from
//! the previous build, so arrival order never matters and nothing drifts.

use super::classify::{classify_invocation, display_label, ToolCategory};
use super::{Event, ToolInvocation, ToolResult};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// Provider-specific structured results keyed by tool-call id
pub type AuxResults = HashMap<String, Value>;

/// Decides whether a web call has materialized enough to be shown
pub type WebMessagePredicate = fn(&ToolInvocation, &AuxResults) -> bool;

/// A tool invocation together with everything known about its outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedAction {
    /// Id of the transcript event that carried the invocation
    pub event_id: String,
    pub action: ToolInvocation,
    pub category: ToolCategory,
    /// What the action is doing, as shown to the user
    pub label: String,
    /// Parsed arguments; absent when missing or unparseable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
    pub results: Vec<ToolResult>,
    pub auxiliary_results: Map<String, Value>,
}

impl ProcessedAction {
    /// No result has arrived yet
    pub fn is_pending(&self) -> bool {
        self.results.is_empty() && self.auxiliary_results.is_empty()
    }
}

/// Show a web call once its auxiliary blob exists and is not empty
pub fn default_show_web_message(call: &ToolInvocation, aux: &AuxResults) -> bool {
    aux.get(&call.id).is_some_and(|blob| !aux_entries(blob).is_empty())
}

/// Flatten an auxiliary blob into keyed entries.
///
/// Objects keep their keys (e.g. search hits keyed by URL), arrays are keyed
/// by position, any other non-null value becomes a single `result` entry.
fn aux_entries(blob: &Value) -> Map<String, Value> {
    match blob {
        Value::Object(map) => map.clone(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| (i.to_string(), item.clone()))
            .collect(),
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("result".to_string(), other.clone());
            map
        }
    }
}

/// Build the processed-action list from scratch
pub fn reconcile(
    events: &[Event],
    aux: &AuxResults,
    show_web_message: WebMessagePredicate,
) -> Vec<ProcessedAction> {
    // Results in log order, grouped by the call they answer
    let mut results_by_call: HashMap<&str, Vec<&ToolResult>> = HashMap::new();
    for event in events {
        if let Event::ToolResult(result) = event {
            results_by_call
                .entry(result.tool_call_id.as_str())
                .or_default()
                .push(result);
        }
    }

    let mut actions = Vec::new();
    for event in events {
        let Event::ToolCall(call_event) = event else {
            continue;
        };

        for call in call_event.invocations() {
            let category = classify_invocation(&call);
            let mut auxiliary_results = Map::new();
            let mut results = Vec::new();

            if category == ToolCategory::Web && show_web_message(&call, aux) {
                if let Some(blob) = aux.get(&call.id) {
                    auxiliary_results = aux_entries(blob);
                }
            } else if let Some(matched) = results_by_call.get(call.id.as_str()) {
                results = matched.iter().map(|r| (*r).clone()).collect();
            }

            // Web calls only exist once their structured results do
            if category == ToolCategory::Web && auxiliary_results.is_empty() {
                continue;
            }

            actions.push(ProcessedAction {
                event_id: call_event.id.clone(),
                label: display_label(&call.tool_name).into_owned(),
                arguments: call.arguments(),
                action: call,
                category,
                results,
                auxiliary_results,
            });
        }
    }
    actions
}

/// Results whose call id matches no invocation in the log
pub fn orphan_results(events: &[Event]) -> Vec<&ToolResult> {
    let known: HashSet<String> = events
        .iter()
        .filter_map(|event| match event {
            Event::ToolCall(call) => Some(call.invocations()),
            _ => None,
        })
        .flatten()
        .map(|call| call.id)
        .collect();

    events
        .iter()
        .filter_map(|event| match event {
            Event::ToolResult(result) if !known.contains(&result.tool_call_id) => Some(result),
            _ => None,
        })
        .collect()
}

/// Holds the last published action list and republishes only on change
pub struct Correlator {
    show_web_message: WebMessagePredicate,
    warn_on_orphan_results: bool,
    actions: Vec<ProcessedAction>,
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Correlator {
    pub fn new(warn_on_orphan_results: bool) -> Self {
        Self {
            show_web_message: default_show_web_message,
            warn_on_orphan_results,
            actions: Vec::new(),
        }
    }

    /// Currently published actions
    pub fn actions(&self) -> &[ProcessedAction] {
        &self.actions
    }

    /// Rebuild from the current log. Returns true when the published list
    /// changed.
    #[must_use = "check if actions changed to trigger re-render"]
    pub fn update(&mut self, events: &[Event], aux: &AuxResults) -> bool {
        let next = reconcile(events, aux, self.show_web_message);

        if self.warn_on_orphan_results {
            for orphan in orphan_results(events) {
                tracing::warn!(
                    tool_call_id = %orphan.tool_call_id,
                    tool = %orphan.tool_name,
                    "Tool result without a matching call"
                );
            }
        }

        if next == self.actions {
            return false;
        }
        tracing::debug!(
            before = self.actions.len(),
            after = next.len(),
            "Processed actions changed"
        );
        self.actions = next;
        true
    }

    /// Forget the published list (transcript replaced)
    pub fn reset(&mut self) {
        self.actions.clear();
    }
}
