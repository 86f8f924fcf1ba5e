//! Color mapping shared by the widgets; everything collapses to the terminal
//! default when color is disabled.

use ratatui::style::{Color, Style};

use usagebar_core::presentation::{IconColor, Tint};

/// Colors for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    color: bool,
}

impl Theme {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Foreground style, or the plain style when color is off
    pub fn fg(&self, color: Color) -> Style {
        if self.color {
            Style::default().fg(color)
        } else {
            Style::default()
        }
    }

    pub fn icon(&self, color: IconColor) -> Style {
        self.fg(match color {
            IconColor::Default => Color::White,
            IconColor::Orange => Color::Rgb(255, 149, 0),
            IconColor::Gray => Color::DarkGray,
        })
    }

    pub fn tint(&self, tint: Tint) -> Style {
        self.fg(match tint {
            Tint::Accent => Color::Cyan,
            Tint::Warning => Color::Rgb(255, 149, 0),
            Tint::Critical => Color::Red,
        })
    }
}
