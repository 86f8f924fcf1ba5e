use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use super::Theme;
use crate::state::{FormField, SettingsForm, TextField};

/// Label column width ("Session key" = 11 chars)
const LABEL_WIDTH: usize = 12;

/// Mask character for the session key
const MASK: char = '•';

/// Height of the form popup, borders included
pub const FORM_HEIGHT: u16 = 10;

/// Width of the form popup, borders included
pub const FORM_WIDTH: u16 = 64;

/// Settings form popup
pub struct SettingsFormWidget;

impl SettingsFormWidget {
    /// Render the settings form
    pub fn render(frame: &mut Frame, area: Rect, form: &SettingsForm, theme: Theme) {
        frame.render_widget(Clear, area);

        let block = Block::default()
            .title(" Settings ")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme.fg(Color::Cyan));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let hint = theme.fg(Color::DarkGray);
        let key = theme.fg(Color::Yellow).add_modifier(Modifier::BOLD);

        let checkbox = if form.show_percentage { "[x]" } else { "[ ]" };
        let save_style = if form.can_save() {
            key
        } else {
            hint.add_modifier(Modifier::CROSSED_OUT)
        };

        let mut lines = vec![
            Self::field_line(
                "Org ID",
                form.org_id.value().to_string(),
                form.focus == FormField::OrgId,
                theme,
            ),
            Self::field_line(
                "Session key",
                Self::masked(&form.session_key),
                form.focus == FormField::SessionKey,
                theme,
            ),
            Line::from(""),
            Line::from(vec![
                Span::styled(
                    format!(" {} ", checkbox),
                    Self::focus_style(form.focus == FormField::ShowPercentage, theme),
                ),
                Span::styled("Show percentage in status line", theme.fg(Color::White)),
            ]),
            Line::from(""),
            Line::from(vec![
                Span::styled(" Tab", key),
                Span::styled(":Next ", hint),
                Span::styled("Space", key),
                Span::styled(":Toggle ", hint),
                Span::styled("Enter", save_style),
                Span::styled(":Save ", hint),
                Span::styled("Esc", key),
                Span::styled(":Cancel", hint),
            ]),
        ];

        if let Some(err) = &form.error {
            lines.push(Line::from(Span::styled(
                format!(" {}", err),
                theme.fg(Color::Red),
            )));
        }

        frame.render_widget(Paragraph::new(lines), inner);

        // Set cursor position for IME support
        let cursor = match form.focus {
            FormField::OrgId => Some((0, form.org_id.value()[..form.org_id.cursor()].width())),
            FormField::SessionKey => Some((1, Self::masked_cursor(&form.session_key))),
            FormField::ShowPercentage => None,
        };
        if let Some((row, column)) = cursor {
            Self::set_cursor(frame, inner, row, column);
        }
    }

    fn field_line(label: &str, value: String, focused: bool, theme: Theme) -> Line<'static> {
        let marker = if focused { "›" } else { " " };
        Line::from(vec![
            Span::styled(marker.to_string(), theme.fg(Color::Cyan)),
            Span::styled(
                format!("{:w$}", label, w = LABEL_WIDTH),
                theme.fg(Color::White).add_modifier(Modifier::DIM),
            ),
            Span::styled(value, Self::focus_style(focused, theme)),
        ])
    }

    fn focus_style(focused: bool, theme: Theme) -> Style {
        if focused {
            theme.fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            theme.fg(Color::White)
        }
    }

    /// Session key shown as one mask character per character
    pub fn masked(field: &TextField) -> String {
        std::iter::repeat(MASK)
            .take(field.value().chars().count())
            .collect()
    }

    /// Display column of the cursor within the masked session key
    fn masked_cursor(field: &TextField) -> usize {
        field.value()[..field.cursor()].chars().count()
    }

    fn set_cursor(frame: &mut Frame, inner: Rect, row: u16, column: usize) {
        let x = inner.x + 1 + LABEL_WIDTH as u16 + column as u16;
        let x = x.min(inner.x + inner.width.saturating_sub(1));
        frame.set_cursor_position((x, inner.y + row));
    }
}
