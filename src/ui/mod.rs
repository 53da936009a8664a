//! Replay viewer rendering
//!
//! Header with playback progress and panel mode, the transcript on the
//! left, the auto-selected side panel on the right (hidden mode gives the
//! transcript the full width), recent log lines and a key hint footer.

mod helpers;

use crate::app::App;
use crate::config::colors;
use crate::replay::scheduler::Phase;
use crate::replay::{MessageKind, ReplayMessage, ReplayState, Role};
use crate::transcript::panel::PanelMode;
use helpers::{centered_rect, pane, truncate};
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

/// Main render function
pub fn render(f: &mut Frame, app: &App) {
    f.render_widget(Block::default().style(Style::default().bg(colors::BG)), f.area());

    let [header, body, logs, footer] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(8),
        Constraint::Length(8),
        Constraint::Length(1),
    ])
    .areas(f.area());

    render_header(f, header, app);

    let state = app.replay.state();
    match app.panel.mode() {
        PanelMode::Hidden => render_transcript(f, body, state),
        mode => {
            let [left, right] =
                Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)])
                    .areas(body);
            render_transcript(f, left, state);
            render_side_panel(f, right, mode, state);
        }
    }

    render_logs(f, logs, state);
    render_footer(f, footer, app);

    if app.show_help {
        render_help(f);
    }
}

fn phase_color(phase: Phase) -> ratatui::style::Color {
    match phase {
        Phase::Running => colors::USER,
        Phase::Finished => colors::PLAN,
        Phase::Cancelled | Phase::Idle => colors::MUTED,
        Phase::Aborted => colors::TOOL,
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let phase = app.replay.phase();
    let total = app.replay.script().len();
    let cursor = app.replay.state().cursor.min(total);

    let line = Line::from(vec![
        Span::styled(
            format!("agentdeck · {}", app.title),
            Style::default().fg(colors::FG).add_modifier(Modifier::BOLD),
        ),
        Span::raw("   "),
        Span::styled(
            format!("[{}]", phase.label()),
            Style::default().fg(phase_color(phase)),
        ),
        Span::styled(
            format!("  {cursor}/{total}  panel: {}", app.panel.mode().label()),
            Style::default().fg(colors::MUTED),
        ),
    ]);

    let header = Paragraph::new(line).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(colors::BORDER))
            .border_type(BorderType::Rounded),
    );
    f.render_widget(header, area);
}

fn message_line(message: &ReplayMessage) -> Line<'_> {
    let (prefix, color) = match (message.role, message.kind) {
        (Role::User, _) => ("you", colors::USER),
        (Role::Assistant, _) => ("agent", colors::FG),
        (Role::Tool, kind) => (kind.label(), colors::TOOL),
    };
    Line::from(vec![
        Span::styled(
            format!("{prefix:>8} │ "),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(message.text.as_str(), Style::default().fg(colors::FG)),
    ])
}

fn render_transcript(f: &mut Frame, area: Rect, state: &ReplayState) {
    let lines: Vec<Line> = state.messages.iter().map(message_line).collect();
    let transcript = Paragraph::new(lines).wrap(Wrap { trim: false });

    // Keep the newest rows in view, counted after wrapping
    let inner = pane("Transcript", false).inner(area);
    let rows = transcript.line_count(inner.width);
    let scroll = rows.saturating_sub(usize::from(inner.height));
    let transcript = transcript
        .scroll((u16::try_from(scroll).unwrap_or(u16::MAX), 0))
        .block(pane("Transcript", false));
    f.render_widget(transcript, area);
}

fn render_side_panel(f: &mut Frame, area: Rect, mode: PanelMode, state: &ReplayState) {
    let width = usize::from(area.width.saturating_sub(4));
    let items: Vec<ListItem> = match mode {
        PanelMode::Task => {
            let mut items: Vec<ListItem> = state
                .messages
                .iter()
                .filter(|m| m.role == Role::Tool)
                .map(|m| {
                    let color = if m.kind == MessageKind::Design {
                        colors::HIGHLIGHT
                    } else {
                        colors::TOOL
                    };
                    ListItem::new(Line::from(vec![
                        Span::styled(format!("{:<9}", m.kind.label()), Style::default().fg(color)),
                        Span::raw(truncate(&m.text, width.saturating_sub(9))),
                    ]))
                })
                .collect();
            items.extend(state.results.keys().map(|key| {
                ListItem::new(Span::styled(
                    format!("  ↳ {}", truncate(key, width.saturating_sub(4))),
                    Style::default().fg(colors::MUTED),
                ))
            }));
            items
        }
        PanelMode::Sandbox => state
            .logs
            .iter()
            .map(|log| ListItem::new(truncate(&log.text, width)))
            .collect(),
        PanelMode::Plan | PanelMode::Hidden => vec![ListItem::new(Span::styled(
            "No plan in this case",
            Style::default().fg(colors::MUTED),
        ))],
    };

    let title = match mode {
        PanelMode::Task => "Task",
        PanelMode::Plan => "Plan",
        PanelMode::Sandbox => "Sandbox",
        PanelMode::Hidden => "",
    };
    f.render_widget(List::new(items).block(pane(title, true)), area);
}

fn render_logs(f: &mut Frame, area: Rect, state: &ReplayState) {
    let visible = usize::from(area.height.saturating_sub(2));
    let width = usize::from(area.width.saturating_sub(4));
    let start = state.logs.len().saturating_sub(visible);
    let items: Vec<ListItem> = state.logs[start..]
        .iter()
        .map(|log| {
            ListItem::new(Span::styled(
                truncate(&log.text, width),
                Style::default().fg(colors::MUTED),
            ))
        })
        .collect();
    f.render_widget(List::new(items).block(pane("Log", false)), area);
}

fn render_footer(f: &mut Frame, area: Rect, app: &App) {
    let hint = "s:stop  r:restart  Tab:panel  ?:help  q:quit";
    let text = match &app.status_message {
        Some(message) => format!("{message}  ·  {hint}"),
        None => hint.to_string(),
    };
    let footer = Paragraph::new(text)
        .style(Style::default().fg(colors::MUTED))
        .alignment(Alignment::Center);
    f.render_widget(footer, area);
}

fn render_help(f: &mut Frame) {
    let area = centered_rect(40, 40, f.area());

    let help_text = r"
  Playback
  s           Stop (keeps what has played)
  r           Restart from the beginning

  Display
  Tab         Cycle side panel
  ?           This help
  q, Esc      Quit
";

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(colors::FG))
        .block(
            Block::default()
                .title(" Help ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors::HIGHLIGHT))
                .border_type(BorderType::Rounded)
                .style(Style::default().bg(colors::BG)),
        );

    f.render_widget(Clear, area);
    f.render_widget(help, area);
}
