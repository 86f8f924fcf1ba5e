use ratatui::layout::{Constraint, Direction, Rect};

/// Height of the status strip
const STATUS_HEIGHT: u16 = 3;

/// Height of the key hint line
const FOOTER_HEIGHT: u16 = 1;

/// Layout areas for rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutAreas {
    /// Bar glyph, percentage and poll state
    pub status: Rect,
    /// Usage panel, when open
    pub panel: Option<Rect>,
    /// Key hints and transient messages
    pub footer: Rect,
}

/// Layout manager for the UI
#[derive(Debug, Clone, Default)]
pub struct Layout;

impl Layout {
    pub fn new() -> Self {
        Self
    }

    /// Calculate layout areas; `panel_height` is `None` while the panel is closed
    pub fn calculate(&self, area: Rect, panel_height: Option<u16>) -> LayoutAreas {
        let panel_constraint = match panel_height {
            Some(height) => Constraint::Length(height),
            None => Constraint::Length(0),
        };

        let chunks = ratatui::layout::Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(STATUS_HEIGHT),
                panel_constraint,
                Constraint::Min(0),
                Constraint::Length(FOOTER_HEIGHT),
            ])
            .split(area);

        LayoutAreas {
            status: chunks[0],
            panel: panel_height.map(|_| chunks[1]),
            footer: chunks[3],
        }
    }

    /// Calculate popup area (centered)
    pub fn popup_area(&self, area: Rect, width_pct: u16, height_pct: u16) -> Rect {
        let popup_layout = ratatui::layout::Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage((100 - height_pct) / 2),
                Constraint::Percentage(height_pct),
                Constraint::Percentage((100 - height_pct) / 2),
            ])
            .split(area);

        ratatui::layout::Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage((100 - width_pct) / 2),
                Constraint::Percentage(width_pct),
                Constraint::Percentage((100 - width_pct) / 2),
            ])
            .split(popup_layout[1])[1]
    }

    /// Centered area of a fixed size, shrunk to fit
    pub fn fixed_popup_area(&self, area: Rect, width: u16, height: u16) -> Rect {
        let width = width.min(area.width);
        let height = height.min(area.height);
        Rect {
            x: area.x + (area.width - width) / 2,
            y: area.y + (area.height - height) / 2,
            width,
            height,
        }
    }
}
