//! TUI rendering
//!
//! All drawing lives here. Views read [`TuiState`] and never modify it.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use tracing::trace;

use super::state::TuiState;
use crate::session::{Phase, Role, WorkerStatus};

/// Panel colors
mod colors {
    use ratatui::style::Color;

    pub const HEADER: Color = Color::Rgb(0, 255, 255); // Cyan
    pub const PHASE_DONE: Color = Color::Rgb(50, 205, 50); // Lime green
    pub const PHASE_ACTIVE: Color = Color::Rgb(255, 215, 0); // Gold
    pub const HUMAN: Color = Color::Rgb(0, 255, 127); // Spring green
    pub const AGENT: Color = Color::Rgb(100, 149, 237); // Cornflower blue
    pub const ERROR: Color = Color::Rgb(220, 20, 60); // Crimson
    pub const DIM: Color = Color::DarkGray;
}

/// Main render function
pub fn render(state: &TuiState, frame: &mut Frame) {
    trace!(phase = %state.phase, "render");
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Main content
            Constraint::Length(3), // Input
            Constraint::Length(1), // Footer hints
        ])
        .split(frame.area());

    render_header(state, frame, chunks[0]);
    render_main(state, frame, chunks[1]);
    render_input(state, frame, chunks[2]);
    render_footer(state, frame, chunks[3]);
}

/// Phase indicator: completed phases get a check, the active one a dot
fn render_header(state: &TuiState, frame: &mut Frame, area: Rect) {
    let phases = [Phase::Explore, Phase::Engineer, Phase::Crystallize];
    let mut spans = vec![Span::styled(
        " distill ",
        Style::default()
            .fg(colors::HEADER)
            .add_modifier(Modifier::BOLD),
    )];

    for phase in phases {
        let (icon, style) = if phase_rank(state.phase) > phase_rank(phase) {
            ("\u{2713}", Style::default().fg(colors::PHASE_DONE))
        } else if state.phase == phase {
            ("\u{25CF}", Style::default().fg(colors::PHASE_ACTIVE))
        } else {
            ("\u{25CB}", Style::default().fg(colors::DIM))
        };
        spans.push(Span::raw("  "));
        spans.push(Span::styled(format!("{} {}", icon, phase.as_str()), style));
    }

    if let Some(path) = &state.spec_path {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("\u{2713} {}", path.display()),
            Style::default().fg(colors::PHASE_DONE),
        ));
    }

    let header = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

fn phase_rank(phase: Phase) -> u8 {
    match phase {
        Phase::Idle => 0,
        Phase::Explore => 1,
        Phase::Engineer => 2,
        Phase::Crystallize => 3,
        Phase::Complete => 4,
    }
}

/// Activity panel on the left, conversation on the right
fn render_main(state: &TuiState, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3), Constraint::Ratio(2, 3)])
        .split(area);

    render_activity(state, frame, chunks[0]);
    render_conversation(state, frame, chunks[1]);
}

fn render_activity(state: &TuiState, frame: &mut Frame, area: Rect) {
    let visible = area.height.saturating_sub(2) as usize;
    let mut lines: Vec<Line> = state
        .activity
        .iter()
        .rev()
        .take(visible)
        .rev()
        .map(|entry| Line::from(entry.as_str()))
        .collect();

    for worker in &state.workers {
        if worker.status == WorkerStatus::Running {
            let progress = worker.progress.as_deref().unwrap_or("");
            lines.push(Line::from(Span::styled(
                format!("  {} {} {}", worker.kind.display_name(), state.streaming_word, progress),
                Style::default().fg(colors::PHASE_ACTIVE),
            )));
        }
    }

    let panel = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Activity "))
        .wrap(Wrap { trim: true });
    frame.render_widget(panel, area);
}

fn render_conversation(state: &TuiState, frame: &mut Frame, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();
    for message in &state.messages {
        let (label, color) = match message.role {
            Role::Human => ("You", colors::HUMAN),
            Role::Agent => ("Engineer", colors::AGENT),
        };
        lines.push(Line::from(Span::styled(
            format!("{}:", label),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
        for text_line in message.text.lines() {
            lines.push(Line::from(format!("  {}", text_line)));
        }
        lines.push(Line::from(""));
    }

    // Keep the tail visible
    let visible = area.height.saturating_sub(2) as usize;
    let skip = lines.len().saturating_sub(visible);
    let lines: Vec<Line> = lines.into_iter().skip(skip).collect();

    let panel = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Conversation "))
        .wrap(Wrap { trim: false });
    frame.render_widget(panel, area);
}

fn render_input(state: &TuiState, frame: &mut Frame, area: Rect) {
    let (content, style, title) = if state.input_enabled() {
        (
            format!("> {}", state.input),
            Style::default().fg(colors::HUMAN),
            " Your answer (Enter to send) ",
        )
    } else if state.spec_path.is_some() {
        (
            "Run complete. Press q to exit.".to_string(),
            Style::default().fg(colors::PHASE_DONE),
            " Input ",
        )
    } else {
        (
            format!("{}...", state.streaming_word),
            Style::default().fg(colors::DIM),
            " Input ",
        )
    };

    let input = Paragraph::new(content)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(input, area);
}

fn render_footer(state: &TuiState, frame: &mut Frame, area: Rect) {
    let hint = if let Some(error) = &state.last_error {
        Line::from(Span::styled(
            format!(" {}", error),
            Style::default().fg(colors::ERROR),
        ))
    } else {
        Line::from(Span::styled(
            " Enter send \u{2502} type done/exit/quit/finish to wrap up \u{2502} Esc cancel",
            Style::default().fg(colors::DIM),
        ))
    };
    frame.render_widget(Paragraph::new(hint), area);
}
