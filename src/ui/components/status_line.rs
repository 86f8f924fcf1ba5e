//! Top strip standing in for the menu bar item: bar glyph, optional
//! percentage, and poll state.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use usagebar_core::presentation::{classify, status_title, IconState};

use super::Theme;
use crate::state::AppState;

/// Cells in the bar glyph
const GLYPH_CELLS: usize = 3;

/// Status strip widget
pub struct StatusLine;

impl StatusLine {
    /// Render the status strip
    pub fn render(frame: &mut Frame, area: Rect, state: &AppState, theme: Theme) {
        let icon = classify(&state.snapshot);

        let block = Block::default()
            .title(format!(" {} ", icon.accessibility_description()))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme.fg(Color::Gray));

        let mut spans = vec![
            Span::raw(" "),
            Span::styled(Self::glyph(&icon), theme.icon(icon.color())),
            Span::raw(" "),
        ];

        if let Some(title) = status_title(&state.snapshot, state.show_percentage) {
            spans.push(Span::styled(
                title,
                theme.icon(icon.color()).add_modifier(Modifier::BOLD),
            ));
        }

        spans.push(Span::styled(
            format!(" {} ", Self::detail(state)),
            theme.fg(Color::DarkGray),
        ));

        if state.snapshot.error.is_some() {
            spans.push(Span::styled("!", theme.fg(Color::Red).add_modifier(Modifier::BOLD)));
        }

        frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
    }

    /// Horizontal bar glyph for the icon's fill level: "█░░"
    pub fn glyph(icon: &IconState) -> String {
        let filled = (icon.fill_level() * GLYPH_CELLS as f64).round() as usize;
        let filled = filled.min(GLYPH_CELLS);
        format!(
            "[{}{}]",
            "█".repeat(filled),
            "░".repeat(GLYPH_CELLS - filled)
        )
    }

    /// Poll cadence and last update time
    fn detail(state: &AppState) -> String {
        let cadence = state.poll_mode.display_name();
        if state.snapshot.loading {
            return format!("{} · updating…", cadence);
        }
        match state.snapshot.fetched_at {
            Some(at) => format!(
                "{} · updated {}",
                cadence,
                at.with_timezone(&chrono::Local).format("%H:%M")
            ),
            None => cadence.to_string(),
        }
    }
}

/// Key hints, or the transient message when there is one
pub struct Footer;

impl Footer {
    pub fn render(frame: &mut Frame, area: Rect, state: &AppState, theme: Theme) {
        let line = match &state.message {
            Some(message) => Line::from(Span::styled(
                format!(" {}", message),
                theme.fg(Color::Yellow),
            )),
            None => {
                let key = theme.fg(Color::Yellow).add_modifier(Modifier::BOLD);
                let hint = theme.fg(Color::DarkGray);
                let panel = if state.panel_open { ":Hide " } else { ":Usage " };
                Line::from(vec![
                    Span::raw(" "),
                    Span::styled("Enter", key),
                    Span::styled(panel, hint),
                    Span::styled("r", key),
                    Span::styled(":Refresh ", hint),
                    Span::styled("s", key),
                    Span::styled(":Settings ", hint),
                    Span::styled("?", key),
                    Span::styled(":Help ", hint),
                    Span::styled("q", key),
                    Span::styled(":Quit", hint),
                ])
            }
        };

        frame.render_widget(Paragraph::new(line), area);
    }
}
