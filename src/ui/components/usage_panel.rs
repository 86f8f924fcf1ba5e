//! Usage panel shown below the status strip while open.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
    Frame,
};

use unicode_width::UnicodeWidthStr;
use usagebar_core::presentation::{ExtraUsageRow, PanelView, UsageRow};
use usagebar_core::usage::UsageSnapshot;

use super::Theme;

/// Fixed label width for alignment (longest label "Weekly (7 day)" = 14 chars)
const LABEL_WIDTH: usize = 14;

/// Usage panel widget
pub struct UsagePanel;

impl UsagePanel {
    /// Height needed for `view`, borders included
    pub fn height(view: &PanelView) -> u16 {
        let content_rows = match view {
            PanelView::Loading => 1,
            PanelView::Failed(_) => 2,
            PanelView::Rows { rows, extra, error } => {
                // label+bar line, then reset line when present
                let row_lines: usize = rows
                    .iter()
                    .map(|r| 1 + usize::from(r.reset_text.is_some()))
                    .sum();
                let extra_lines = if extra.is_some() { 2 } else { 0 };
                let error_lines = usize::from(error.is_some());
                (row_lines + extra_lines + error_lines).max(1)
            }
        };
        content_rows as u16 + 2
    }

    /// Render the usage panel
    pub fn render(
        frame: &mut Frame,
        area: Rect,
        snapshot: &UsageSnapshot,
        view: &PanelView,
        theme: Theme,
    ) {
        if area.height < 3 || area.width < 10 {
            return;
        }

        let block = Block::default()
            .title(Self::build_title(snapshot))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme.fg(Color::Gray));

        let inner = block.inner(area);
        frame.render_widget(block, area);

        let lines = Self::build_lines(view, inner.width, theme);
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
    }

    /// Build the block title with optional timestamp
    fn build_title(snapshot: &UsageSnapshot) -> String {
        if let Some(fetched_at) = snapshot.fetched_at {
            let local = fetched_at.with_timezone(&chrono::Local);
            format!(" Usage ({}) ", local.format("%H:%M"))
        } else {
            " Usage ".to_string()
        }
    }

    fn build_lines(view: &PanelView, width: u16, theme: Theme) -> Vec<Line<'static>> {
        let dim = theme.fg(Color::DarkGray);
        match view {
            PanelView::Loading => vec![Line::from(Span::styled(" Loading…", dim))],
            PanelView::Failed(err) => vec![
                Line::from(Span::styled(format!(" {}", err), theme.fg(Color::Red))),
                Line::from(vec![
                    Span::styled(" r", theme.fg(Color::Yellow).add_modifier(Modifier::BOLD)),
                    Span::styled(":Retry", dim),
                ]),
            ],
            PanelView::Rows { rows, extra, error } => {
                let mut lines = Vec::new();
                for row in rows {
                    lines.push(Self::row_line(row, width, theme));
                    if let Some(reset) = &row.reset_text {
                        lines.push(Line::from(Span::styled(
                            format!(" {:w$} {}", "", reset, w = LABEL_WIDTH),
                            dim,
                        )));
                    }
                }
                if let Some(extra) = extra {
                    lines.extend(Self::extra_lines(extra, width, theme));
                }
                if let Some(err) = error {
                    lines.push(Line::from(Span::styled(
                        format!(" {}", err),
                        theme.fg(Color::Red),
                    )));
                }
                if lines.is_empty() {
                    lines.push(Line::from(Span::styled(" No usage data", dim)));
                }
                lines
            }
        }
    }

    /// " Session (5 hr) ████████░░░░░ 42% used"
    fn row_line(row: &UsageRow, width: u16, theme: Theme) -> Line<'static> {
        let used = format!(" {}", row.used_text);
        let bar_width = Self::bar_width(width, used.width());
        let mut spans = vec![Span::styled(
            format!(" {:w$} ", row.label, w = LABEL_WIDTH),
            theme.fg(Color::White).add_modifier(Modifier::DIM),
        )];
        spans.extend(Self::bar(row.fraction, bar_width, theme.tint(row.tint), theme));
        spans.push(Span::styled(used, theme.fg(Color::White)));
        Line::from(spans)
    }

    /// Extra usage bar with spend and remaining text
    fn extra_lines(extra: &ExtraUsageRow, width: u16, theme: Theme) -> Vec<Line<'static>> {
        let spent = format!(" {}", extra.spent_text);
        let bar_width = Self::bar_width(width, spent.width());
        let mut spans = vec![Span::styled(
            format!(" {:w$} ", "Extra usage", w = LABEL_WIDTH),
            theme.fg(Color::White).add_modifier(Modifier::DIM),
        )];
        spans.extend(Self::bar(extra.fraction, bar_width, theme.tint(extra.tint), theme));
        spans.push(Span::styled(spent, theme.fg(Color::White)));

        vec![
            Line::from(spans),
            Line::from(Span::styled(
                format!(" {:w$} {}", "", extra.remaining_text, w = LABEL_WIDTH),
                theme.fg(Color::DarkGray),
            )),
        ]
    }

    fn bar_width(width: u16, tail: usize) -> usize {
        // " label " + bar + tail
        let fixed = 1 + LABEL_WIDTH + 1 + tail;
        (width as usize).saturating_sub(fixed).max(4)
    }

    fn bar(
        fraction: f64,
        width: usize,
        style: ratatui::style::Style,
        theme: Theme,
    ) -> [Span<'static>; 2] {
        let filled = ((fraction.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
        [
            Span::styled("█".repeat(filled), style),
            Span::styled(
                "░".repeat(width - filled),
                theme.fg(Color::DarkGray).add_modifier(Modifier::DIM),
            ),
        ]
    }
}
