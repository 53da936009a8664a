//! Event classification
//!
//! Single source of truth for mapping transcript events to their kind and
//! tool names to a closed set of categories. Unknown tool names never fail:
//! they land in `ToolCategory::Other` with a synthesized label.

use super::{Event, ToolInvocation};
use serde::Serialize;
use std::borrow::Cow;

/// What a transcript event is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    UserText,
    AssistantText,
    ToolCall,
    ToolResult,
    StateSnapshot,
}

/// Category of a tool, derived from its declared name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Files,
    ExecuteCommand,
    Web,
    Browser,
    ComputerUse,
    ExposePort,
    Image,
    DeepInsight,
    /// Any tool not in the table
    Other,
}

impl ToolCategory {
    /// Categories whose arrival reveals the task panel
    pub fn reveals_task_panel(self) -> bool {
        matches!(
            self,
            ToolCategory::Files
                | ToolCategory::ExecuteCommand
                | ToolCategory::Web
                | ToolCategory::Image
                | ToolCategory::DeepInsight
        )
    }
}

/// Classification of one event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub kind: EventKind,
    /// Present for tool calls and tool results
    pub category: Option<ToolCategory>,
}

enum NameMatch {
    Exact(&'static str),
    Prefix(&'static str),
}

impl NameMatch {
    fn matches(&self, name: &str) -> bool {
        match self {
            NameMatch::Exact(exact) => name == *exact,
            NameMatch::Prefix(prefix) => name.starts_with(prefix),
        }
    }
}

struct ToolEntry {
    pattern: NameMatch,
    category: ToolCategory,
    label: &'static str,
}

/// Known tools, checked in order
const TOOL_TABLE: &[ToolEntry] = &[
    ToolEntry {
        pattern: NameMatch::Exact("files"),
        category: ToolCategory::Files,
        label: "Editing files",
    },
    ToolEntry {
        pattern: NameMatch::Exact("execute_command"),
        category: ToolCategory::ExecuteCommand,
        label: "Running command",
    },
    ToolEntry {
        pattern: NameMatch::Exact("web"),
        category: ToolCategory::Web,
        label: "Searching the web",
    },
    ToolEntry {
        pattern: NameMatch::Exact("browser"),
        category: ToolCategory::Browser,
        label: "Using the browser",
    },
    ToolEntry {
        pattern: NameMatch::Prefix("computer_use_"),
        category: ToolCategory::ComputerUse,
        label: "Operating the computer",
    },
    ToolEntry {
        pattern: NameMatch::Exact("expose_port"),
        category: ToolCategory::ExposePort,
        label: "Exposing port",
    },
    ToolEntry {
        pattern: NameMatch::Prefix("image"),
        category: ToolCategory::Image,
        label: "Generating image",
    },
    ToolEntry {
        pattern: NameMatch::Prefix("deepinsight"),
        category: ToolCategory::DeepInsight,
        label: "Running deep insight",
    },
];

fn lookup(tool_name: &str) -> Option<&'static ToolEntry> {
    TOOL_TABLE.iter().find(|entry| entry.pattern.matches(tool_name))
}

/// Resolve a tool name to its category
pub fn categorize(tool_name: &str) -> ToolCategory {
    lookup(tool_name).map_or(ToolCategory::Other, |entry| entry.category)
}

/// Human-readable label for a tool
pub fn display_label(tool_name: &str) -> Cow<'static, str> {
    match lookup(tool_name) {
        Some(entry) => Cow::Borrowed(entry.label),
        None => Cow::Owned(format!("execute {tool_name} tool")),
    }
}

/// Category of one invocation
pub fn classify_invocation(call: &ToolInvocation) -> ToolCategory {
    categorize(&call.tool_name)
}

/// Classify an event. A batched call event takes the category of its first
/// invocation.
pub fn classify(event: &Event) -> Classification {
    match event {
        Event::UserText { .. } => Classification {
            kind: EventKind::UserText,
            category: None,
        },
        Event::AssistantText { .. } => Classification {
            kind: EventKind::AssistantText,
            category: None,
        },
        Event::ToolCall(call) => Classification {
            kind: EventKind::ToolCall,
            category: Some(
                call.invocations()
                    .first()
                    .map_or(ToolCategory::Other, classify_invocation),
            ),
        },
        Event::ToolResult(result) => Classification {
            kind: EventKind::ToolResult,
            category: Some(categorize(&result.tool_name)),
        },
        Event::StateSnapshot { .. } => Classification {
            kind: EventKind::StateSnapshot,
            category: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{ToolCallEvent, ToolResult};

    #[test]
    fn test_categorize_table() {
        let cases = vec![
            ("files", ToolCategory::Files),
            ("execute_command", ToolCategory::ExecuteCommand),
            ("web", ToolCategory::Web),
            ("browser", ToolCategory::Browser),
            ("computer_use_click", ToolCategory::ComputerUse),
            ("computer_use_screenshot", ToolCategory::ComputerUse),
            ("expose_port", ToolCategory::ExposePort),
            ("image_generate", ToolCategory::Image),
            ("deepinsight_report", ToolCategory::DeepInsight),
            // Exact entries don't match by prefix
            ("files_v2", ToolCategory::Other),
            ("web_scraper", ToolCategory::Other),
            ("computer_use", ToolCategory::Other),
            ("", ToolCategory::Other),
        ];
        for (name, expected) in cases {
            assert_eq!(categorize(name), expected, "tool name: {:?}", name);
        }
    }

    #[test]
    fn test_unknown_tool_label() {
        assert_eq!(display_label("calendar"), "execute calendar tool");
        assert_eq!(display_label("files"), "Editing files");
    }

    #[test]
    fn test_classify_kinds() {
        let call = Event::ToolCall(ToolCallEvent::single("c1", "execute_command", "{}"));
        assert_eq!(
            classify(&call),
            Classification {
                kind: EventKind::ToolCall,
                category: Some(ToolCategory::ExecuteCommand),
            }
        );

        let result = Event::ToolResult(ToolResult {
            tool_call_id: "c1".to_string(),
            tool_name: "mystery".to_string(),
            content: serde_json::Value::Null,
        });
        assert_eq!(classify(&result).category, Some(ToolCategory::Other));

        let user = Event::UserText {
            id: "u1".to_string(),
            text: "hi".to_string(),
        };
        assert_eq!(classify(&user).kind, EventKind::UserText);
        assert_eq!(classify(&user).category, None);
    }

    #[test]
    fn test_task_panel_categories() {
        assert!(ToolCategory::Files.reveals_task_panel());
        assert!(ToolCategory::DeepInsight.reveals_task_panel());
        assert!(!ToolCategory::Browser.reveals_task_panel());
        assert!(!ToolCategory::Other.reveals_task_panel());
    }
}
