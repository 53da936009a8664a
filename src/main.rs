// Clippy configuration: enable pedantic but allow overly strict lints
#![allow(clippy::missing_errors_doc)] // Internal functions don't need # Errors docs
#![allow(clippy::missing_panics_doc)] // Internal functions don't need # Panics docs
#![allow(clippy::must_use_candidate)] // Not all getters need #[must_use]
#![allow(clippy::module_name_repetitions)] // e.g., ThreadApi in threads::api is fine
#![allow(clippy::doc_markdown)] // Don't require backticks around JSON, JSONL, etc.
#![allow(clippy::too_many_lines)] // Some functions are naturally long
#![allow(clippy::struct_excessive_bools)] // Change flags are plain bools
#![allow(clippy::cast_possible_truncation)] // We're careful with our casts
#![allow(clippy::match_same_arms)] // Explicit arms are clearer than combined patterns
#![allow(clippy::single_match_else)] // match with else is fine for Result handling
#![allow(clippy::needless_pass_by_value)] // PathBuf by value is fine for config loading

//! agentdeck - terminal client for agent conversation threads
//!
//! - `replay`: plays a recorded case script in a terminal viewer
//! - `reconcile` / `transcript`: derive processed tool actions and the side
//!   panel decision from an event log
//! - `threads`, `pin`, `unpin`, `create`, `delete`, `cancel`: manage threads
//!   on an agent server
//!
//! Usage:
//!   agentdeck replay case.json
//!   agentdeck threads --watch

mod app;
mod cli;
mod config;
mod errors;
mod event;
mod replay;
mod threads;
mod transcript;
mod tui;
mod ui;

use app::App;
use clap::Parser;
use cli::{Cli, Commands};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use config::AgentdeckConfig;
use replay::scheduler::{Phase, ReplayScheduler, ReplaySink};
use replay::{CaseScript, LogEntry, ReplayMessage, Role};
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use threads::api::{HttpThreadApi, ThreadApi};
use threads::lists::ThreadLists;
use threads::poller::ThreadPoller;
use threads::{ThreadFilter, ThreadMetadata, ThreadSummary};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transcript::correlate::AuxResults;
use transcript::view::TranscriptView;
use transcript::SnapshotFields;

/// Get the log directory path
fn get_log_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || std::env::temp_dir().join("agentdeck").join("logs"),
        |dirs| dirs.cache_dir().join("agentdeck").join("logs"),
    )
}

/// Log to a daily rolling file so output never lands on the viewer's screen
fn init_logging(level: &str) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = get_log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "agentdeck.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let log_filter = format!("agentdeck={level}");
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&log_filter))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(non_blocking),
        )
        .init();

    tracing::info!("Starting agentdeck v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Log directory: {:?}", log_dir);
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Commands that never touch logging or the network
    match &cli.command {
        Commands::Completions { shell } => {
            cli::print_completions(*shell);
            return Ok(());
        }
        Commands::Config { path } => {
            if *path {
                let path = cli.config.clone().unwrap_or_else(AgentdeckConfig::default_path);
                println!("{}", path.display());
            } else {
                print!("{}", AgentdeckConfig::example());
            }
            return Ok(());
        }
        _ => {}
    }

    color_eyre::install()?;
    let _guard = init_logging(&cli.log_level)?;

    let config = match &cli.config {
        Some(path) => AgentdeckConfig::load_from_path(path.clone()),
        None => AgentdeckConfig::load(),
    }
    .with_overrides(cli.api_url.as_deref(), cli.api_key.as_deref());
    tracing::debug!(base_url = %config.api.base_url, "Loaded config");

    match cli.command {
        Commands::Replay { script, headless } => {
            let case = CaseScript::load(&script)
                .wrap_err_with(|| format!("Failed to load case script {}", script.display()))?;
            if headless {
                run_headless(case, &config).await
            } else {
                let title = script
                    .file_name()
                    .map_or_else(|| "case".to_string(), |n| n.to_string_lossy().to_string());
                run_tui(App::new(case, title, &config), cli.frame_rate).await
            }
        }
        Commands::Reconcile {
            events,
            aux,
            thread_id,
        } => handle_reconcile(&events, aux.as_deref(), &thread_id, &config),
        Commands::Completions { .. } | Commands::Config { .. } => Ok(()),
        command => {
            let api = HttpThreadApi::new(&config.api)?;
            tracing::debug!(base_url = api.base_url(), "Using agent server");
            handle_thread_command(command, &api, &config).await
        }
    }
}

/// Load an event log (and optional aux results) and print the derived view
fn handle_reconcile(
    events_path: &Path,
    aux_path: Option<&Path>,
    thread_id: &str,
    config: &AgentdeckConfig,
) -> Result<()> {
    let events = transcript::load_events(events_path)
        .wrap_err_with(|| format!("Failed to load events from {}", events_path.display()))?;

    let aux: AuxResults = match aux_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&raw)
                .wrap_err_with(|| format!("{} must be a JSON object keyed by call id", path.display()))?
        }
        None => AuxResults::new(),
    };

    let mut view = TranscriptView::new(&config.panel);
    view.switch_thread(thread_id);
    let update = view.update(&events, &aux, &SnapshotFields::default());
    tracing::info!(
        thread_id = %thread_id,
        actions = view.actions().len(),
        mode = update.mode.label(),
        "Reconciled event log"
    );

    println!("{}", serde_json::to_string_pretty(&view.snapshot())?);
    Ok(())
}

/// Current lists from the server; direct commands surface fetch errors
async fn fetch_lists<A: ThreadApi>(api: &A, config: &AgentdeckConfig) -> Result<ThreadLists> {
    let filter = ThreadFilter {
        limit: config.polling.page_size,
        ..Default::default()
    };
    let records = api.list_threads(&filter).await?;
    let mut lists = ThreadLists::new();
    let _ = lists.apply_poll(&records);
    Ok(lists)
}

fn print_thread_row(thread: &ThreadSummary) {
    let marker = if thread.pinned { "*" } else { " " };
    println!(
        "{} {:<38} {:<12} {:<17} {}",
        marker,
        thread.id,
        thread.status.label(),
        thread.updated_at.format("%Y-%m-%d %H:%M"),
        thread.title
    );
}

/// `id (title)` when the thread is known locally, else just the id
fn thread_label(lists: &ThreadLists, id: &str) -> String {
    match lists.get(id) {
        Some(thread) => format!("{} ({})", id, thread.title),
        None => id.to_string(),
    }
}

fn print_lists(lists: &ThreadLists) {
    if lists.is_empty() {
        println!("No threads found");
        return;
    }
    println!("  {:<38} {:<12} {:<17} {}", "ID", "STATUS", "UPDATED", "TITLE");
    println!("{}", "-".repeat(80));
    for thread in lists.pinned().iter().chain(lists.unpinned()) {
        print_thread_row(thread);
    }
}

async fn handle_thread_command<A: ThreadApi>(
    command: Commands,
    api: &A,
    config: &AgentdeckConfig,
) -> Result<()> {
    match command {
        Commands::Threads { watch: false } => {
            let lists = fetch_lists(api, config).await?;
            print_lists(&lists);
        }
        Commands::Threads { watch: true } => {
            let mut lists = ThreadLists::new();
            let mut poller = ThreadPoller::new(&config.polling);
            println!(
                "Watching threads every {}s (Ctrl+C to stop)",
                config.polling.interval_secs
            );
            poller
                .run(api, &mut lists, CancellationToken::new(), |lists, changes| {
                    tracing::debug!(
                        pinned = changes.pinned,
                        unpinned = changes.unpinned,
                        "Reprinting thread lists"
                    );
                    println!();
                    print_lists(lists);
                })
                .await;
            // Polling gave up; keep the last list on screen
            eprintln!(
                "Stopped polling after {} consecutive failures",
                poller.failures()
            );
        }
        Commands::Pin { id } => {
            let mut lists = fetch_lists(api, config).await?;
            lists.pin(api, &id).await.wrap_err("Failed to pin thread")?;
            println!("Pinned: {}", thread_label(&lists, &id));
        }
        Commands::Unpin { id } => {
            let mut lists = fetch_lists(api, config).await?;
            lists.unpin(api, &id).await.wrap_err("Failed to unpin thread")?;
            println!("Unpinned: {}", thread_label(&lists, &id));
        }
        Commands::Delete { id } => {
            let mut lists = fetch_lists(api, config).await?;
            lists.delete(api, &id).await.wrap_err("Failed to delete thread")?;
            println!("Deleted: {id}");
        }
        Commands::Cancel { id } => {
            let mut lists = fetch_lists(api, config).await?;
            lists.cancel(api, &id).await.wrap_err("Failed to cancel run")?;
            println!("Cancelled run on: {}", thread_label(&lists, &id));
        }
        Commands::Create { title } => {
            let mut lists = ThreadLists::new();
            let metadata = ThreadMetadata {
                title,
                ..Default::default()
            };
            let summary = lists
                .create(api, &metadata)
                .await
                .wrap_err("Failed to create thread")?;
            println!("Created: {} ({})", summary.id, summary.title);
        }
        Commands::Transcript { id } => {
            let state = api
                .get_thread_state(&id)
                .await
                .wrap_err_with(|| format!("Failed to fetch state for {id}"))?;
            let mut view = TranscriptView::new(&config.panel);
            view.switch_thread(&id);
            let update = view.update(&state.events(), &state.aux_results(), &state.snapshot());
            tracing::info!(
                thread_id = %id,
                actions = view.actions().len(),
                mode = update.mode.label(),
                "Fetched transcript"
            );
            println!("{}", serde_json::to_string_pretty(&view.snapshot())?);
        }
        Commands::Replay { .. }
        | Commands::Reconcile { .. }
        | Commands::Config { .. }
        | Commands::Completions { .. } => {}
    }
    Ok(())
}

/// Prints replay changes to stdout as they are published
#[derive(Default)]
struct ConsoleSink {
    messages_seen: usize,
    /// Characters of the last message already printed
    text_seen: usize,
}

fn message_prefix(message: &ReplayMessage) -> &'static str {
    match message.role {
        Role::User => "you",
        Role::Assistant => "agent",
        Role::Tool => message.kind.label(),
    }
}

impl ReplaySink for ConsoleSink {
    fn messages_changed(&mut self, messages: &[ReplayMessage]) {
        let mut out = std::io::stdout().lock();
        let start = self.messages_seen.min(messages.len());
        let new_count = messages.len() - start;
        for (offset, message) in messages[start..].iter().enumerate() {
            let _ = write!(out, "\n{:>9} │ ", message_prefix(message));
            self.text_seen = 0;
            if offset + 1 < new_count {
                let _ = write!(out, "{}", message.text);
            }
        }
        self.messages_seen = messages.len();

        // The last message may still be streaming in
        if let Some(last) = messages.last() {
            let fresh: String = last.text.chars().skip(self.text_seen).collect();
            self.text_seen += fresh.chars().count();
            let _ = write!(out, "{fresh}");
        }
        let _ = out.flush();
    }

    fn logs_changed(&mut self, logs: &[LogEntry]) {
        if let Some(last) = logs.last() {
            print!("\n{:>9} │ {}", "log", last.text);
            let _ = std::io::stdout().flush();
        }
    }

    fn results_changed(&mut self, results: &Map<String, Value>) {
        print!("\n{:>9} │ {} result(s)", "results", results.len());
        let _ = std::io::stdout().flush();
    }

    fn phase_changed(&mut self, phase: Phase) {
        println!("\n[{}]", phase.label());
    }
}

async fn run_headless(script: CaseScript, config: &AgentdeckConfig) -> Result<()> {
    let mut replay = ReplayScheduler::new(script, (&config.replay).into());
    let phase = replay
        .run(&mut ConsoleSink::default(), CancellationToken::new())
        .await;
    match phase {
        Phase::Aborted => Err(color_eyre::eyre::eyre!(
            "Replay aborted at entry {}",
            replay.state().cursor
        )),
        _ => Ok(()),
    }
}

async fn run_tui(mut app: App, frame_rate: f64) -> Result<()> {
    use std::time::{Duration, Instant};

    let frame_duration = Duration::from_secs_f64(1.0 / frame_rate.max(1.0));
    tracing::info!("Viewer starting: {:.1} FPS", frame_rate);

    // Restored on drop, including on panic or early return
    let mut session = tui::TerminalSession::enter()?;

    let (event_tx, mut event_rx) = mpsc::channel(100);
    let cancel = CancellationToken::new();
    let input_cancel = cancel.clone();
    let input_handle = tokio::spawn(async move {
        event::input::listen(event_tx, input_cancel).await;
    });

    app.start();
    let mut last_frame = Instant::now();

    loop {
        // Frame rate limiting with dirty flag check
        let now = Instant::now();
        if app.needs_render && now.duration_since(last_frame) >= frame_duration {
            session.draw(|f| ui::render(f, &app))?;
            app.rendered();
            last_frame = now;
        }

        let deadline = app.deadline();
        tokio::select! {
            Some(event) = event_rx.recv() => {
                app.handle_event(event);
            }
            () = replay::scheduler::sleep_until_opt(deadline) => {
                app.on_deadline();
            }
            () = tokio::time::sleep(frame_duration) => {
                app.tick();
            }
        }

        if app.should_quit {
            break;
        }
    }

    tracing::debug!("Shutting down input listener");
    cancel.cancel();
    input_handle.abort();
    // Tear the replay down before the terminal
    drop(app);
    session.restore()?;

    Ok(())
}
