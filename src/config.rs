use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Maximum log lines kept in the replay viewer's log pane
pub const MAX_VISIBLE_LOGS: usize = 200;

/// Application configuration loaded from file
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AgentdeckConfig {
    /// Agent server connection
    #[serde(default)]
    pub api: ApiConfig,

    /// Thread list polling
    #[serde(default)]
    pub polling: PollingConfig,

    /// Case replay timing
    #[serde(default)]
    pub replay: ReplayConfig,

    /// Side panel rules
    #[serde(default)]
    pub panel: PanelConfig,
}

/// Agent server connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    /// Base URL of the agent server
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key sent as `x-api-key`
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:2024".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Thread list polling settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollingConfig {
    /// Seconds between poll ticks (also the retry interval after a failure)
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,

    /// Consecutive failed polls before polling stops
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,

    /// Threads requested per poll
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
            max_failures: default_max_failures(),
            page_size: default_page_size(),
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_poll_interval() -> u64 {
    10
}

fn default_max_failures() -> u32 {
    11
}

fn default_page_size() -> usize {
    100
}

/// Case replay timing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplayConfig {
    /// Delay after non-text events (milliseconds)
    #[serde(default = "default_delay_ms")]
    pub default_delay_ms: u64,

    /// Delay between streamed text chunks (milliseconds)
    #[serde(default = "default_chunk_delay_ms")]
    pub chunk_delay_ms: u64,

    /// Characters revealed per text chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            default_delay_ms: default_delay_ms(),
            chunk_delay_ms: default_chunk_delay_ms(),
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_chunk_delay_ms() -> u64 {
    100
}

fn default_chunk_size() -> usize {
    3
}

/// Side panel rules
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PanelConfig {
    /// Tool-call id prefix marking the design namespace
    #[serde(default = "default_design_prefix")]
    pub design_prefix: String,

    /// Log results whose tool call never appears in the transcript
    #[serde(default)]
    pub warn_on_orphan_results: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            design_prefix: default_design_prefix(),
            warn_on_orphan_results: false,
        }
    }
}

fn default_design_prefix() -> String {
    "design".to_string()
}

impl AgentdeckConfig {
    /// Load configuration from default path (~/.config/agentdeck/config.toml)
    pub fn load() -> Self {
        Self::load_from_path(Self::default_path())
    }

    /// Get the default configuration path
    pub fn default_path() -> PathBuf {
        directories::BaseDirs::new().map_or_else(
            || PathBuf::from("~/.config/agentdeck/config.toml"),
            |dirs| dirs.config_dir().join("agentdeck").join("config.toml"),
        )
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: PathBuf) -> Self {
        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {:?}", path);
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config file: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Apply command-line overrides on top of file values
    pub fn with_overrides(mut self, api_url: Option<&str>, api_key: Option<&str>) -> Self {
        if let Some(url) = api_url {
            self.api.base_url = url.to_string();
        }
        if let Some(key) = api_key {
            self.api.api_key = Some(key.to_string());
        }
        self
    }

    /// Generate example configuration file content
    pub fn example() -> String {
        r#"# agentdeck configuration
# Place this file at ~/.config/agentdeck/config.toml

[api]
# Agent server base URL
base_url = "http://localhost:2024"
# api_key = "..."
timeout_secs = 30

[polling]
# Thread list refresh interval; failed polls retry at the same interval
interval_secs = 10
# Polling stops silently after this many consecutive failures
max_failures = 11
page_size = 100

[replay]
default_delay_ms = 1000
chunk_delay_ms = 100
chunk_size = 3

[panel]
# Tool calls whose id starts with this prefix reveal the task panel
design_prefix = "design"
warn_on_orphan_results = false
"#
        .to_string()
    }
}

/// Tokyo Night color palette
pub mod colors {
    use super::Color;

    pub const BG: Color = Color::Rgb(26, 27, 38); // #1a1b26
    pub const FG: Color = Color::Rgb(192, 202, 245); // #c0caf5
    pub const USER: Color = Color::Rgb(122, 162, 247); // #7aa2f7 blue
    pub const TOOL: Color = Color::Rgb(255, 158, 100); // #ff9e64 orange
    pub const MUTED: Color = Color::Rgb(86, 95, 137); // #565f89 gray
    pub const PLAN: Color = Color::Rgb(224, 175, 104); // #e0af68 yellow
    pub const BORDER: Color = Color::Rgb(59, 66, 97); // #3b4261
    pub const HIGHLIGHT: Color = Color::Rgb(187, 154, 247); // #bb9af7 purple
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AgentdeckConfig::load_from_path(dir.path().join("absent.toml"));
        assert_eq!(config, AgentdeckConfig::default());
        assert_eq!(config.polling.interval_secs, 10);
        assert_eq!(config.polling.max_failures, 11);
        assert_eq!(config.replay.chunk_size, 3);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[replay]\nchunk_delay_ms = 25\n").unwrap();

        let config = AgentdeckConfig::load_from_path(path);
        assert_eq!(config.replay.chunk_delay_ms, 25);
        assert_eq!(config.replay.default_delay_ms, 1000);
        assert_eq!(config.api.base_url, "http://localhost:2024");
    }

    #[test]
    fn test_unparseable_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[polling\ninterval_secs = ").unwrap();

        assert_eq!(
            AgentdeckConfig::load_from_path(path),
            AgentdeckConfig::default()
        );
    }

    #[test]
    fn test_example_parses() {
        let config: AgentdeckConfig = toml::from_str(&AgentdeckConfig::example()).unwrap();
        assert_eq!(config, AgentdeckConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = AgentdeckConfig::default().with_overrides(Some("http://agents:8123"), None);
        assert_eq!(config.api.base_url, "http://agents:8123");
        assert!(config.api.api_key.is_none());
    }
}
