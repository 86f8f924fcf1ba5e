use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
    Frame,
};

/// Help popup widget
pub struct HelpPopup;

impl HelpPopup {
    /// Render the help popup
    pub fn render(frame: &mut Frame, area: Rect) {
        // Clear the area first
        frame.render_widget(Clear, area);

        let heading = Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD);

        let help_text = vec![
            Line::from(vec![Span::styled(
                "usagebar - claude.ai plan usage",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )]),
            Line::from(""),
            Line::from(vec![Span::styled("Usage", heading)]),
            Self::help_line("Enter / Space", "Show or hide the usage panel"),
            Self::help_line("r", "Refresh now"),
            Self::help_line("s", "Open settings"),
            Line::from(""),
            Line::from(vec![Span::styled("Settings", heading)]),
            Self::help_line("Tab / S-Tab", "Next / previous field"),
            Self::help_line("Space", "Toggle the percentage checkbox"),
            Self::help_line("Ctrl+u", "Clear the field"),
            Self::help_line("Enter", "Save"),
            Self::help_line("Esc", "Cancel"),
            Line::from(""),
            Line::from(vec![Span::styled("General", heading)]),
            Self::help_line("?", "Toggle this help"),
            Self::help_line("q / Esc", "Quit"),
            Line::from(""),
            Line::from(vec![Span::styled(
                "Press any key to close",
                Style::default().fg(Color::DarkGray),
            )]),
        ];

        let block = Block::default()
            .title(" Help ")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Cyan));

        let paragraph = Paragraph::new(help_text).block(block);

        frame.render_widget(paragraph, area);
    }

    fn help_line(key: &str, description: &str) -> Line<'static> {
        Line::from(vec![
            Span::styled(
                format!("  {:14}", key),
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(description.to_string(), Style::default().fg(Color::White)),
        ])
    }
}
