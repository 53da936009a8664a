//! CLI argument parsing
//!
//! Uses clap for argument parsing with derive macros.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

/// Agent conversation client: replay recorded cases, reconcile transcripts
/// and manage threads on an agent server
#[derive(Parser, Debug)]
#[command(name = "agentdeck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,

    /// Config file (default: <config dir>/agentdeck/config.toml)
    #[arg(short, long, env = "AGENTDECK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Agent server base URL, overrides the config file
    #[arg(long, env = "AGENTDECK_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Agent server API key, overrides the config file
    #[arg(long, env = "AGENTDECK_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Frame rate in frames per second for the replay viewer
    #[arg(short = 'F', long, default_value_t = 30.0, global = true)]
    pub frame_rate: f64,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play a recorded case script
    ///
    /// Opens the terminal viewer (q quits, s stops, r restarts). With
    /// --headless, prints each change to stdout instead.
    Replay {
        /// Case script: JSON array or one entry per line
        script: PathBuf,

        /// Print updates to stdout instead of opening the viewer
        #[arg(long, default_value_t = false)]
        headless: bool,
    },

    /// Reconcile an event log into processed actions and a panel mode
    Reconcile {
        /// Event log: JSON array or JSONL
        events: PathBuf,

        /// Auxiliary results keyed by tool call id (JSON object)
        #[arg(long)]
        aux: Option<PathBuf>,

        /// Thread the events belong to
        #[arg(long, default_value = "local")]
        thread_id: String,
    },

    /// List pinned then unpinned threads
    Threads {
        /// Keep polling and reprint when the lists change
        #[arg(short, long, default_value_t = false)]
        watch: bool,
    },

    /// Pin a thread to the top of the list
    Pin { id: String },

    /// Unpin a thread
    Unpin { id: String },

    /// Delete a thread
    Delete { id: String },

    /// Create a new thread
    Create {
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Cancel the run in flight on a thread
    Cancel { id: String },

    /// Fetch a thread's state and print its reconciled transcript
    Transcript { id: String },

    /// Print a sample config file, or where the config is read from
    Config {
        /// Print the config path instead of the sample
        #[arg(long, default_value_t = false)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Generate shell completions and print to stdout
pub fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "agentdeck", &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_commands() {
        let cli = Cli::parse_from(["agentdeck", "replay", "case.json", "--headless"]);
        assert!(matches!(
            cli.command,
            Commands::Replay { headless: true, .. }
        ));

        let cli = Cli::parse_from([
            "agentdeck",
            "reconcile",
            "events.jsonl",
            "--aux",
            "aux.json",
        ]);
        match cli.command {
            Commands::Reconcile { aux, thread_id, .. } => {
                assert_eq!(aux, Some(PathBuf::from("aux.json")));
                assert_eq!(thread_id, "local");
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::parse_from(["agentdeck", "--api-url", "http://x:1", "pin", "t-1"]);
        assert_eq!(cli.api_url.as_deref(), Some("http://x:1"));
        assert!(matches!(cli.command, Commands::Pin { ref id } if id == "t-1"));
    }
}
