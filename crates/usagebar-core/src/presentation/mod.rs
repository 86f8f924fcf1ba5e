//! Toolkit-independent presentation of a usage snapshot.
//!
//! Everything here is a pure function of `UsageSnapshot` (plus the current
//! time for reset texts), so renderers only map the results to their own
//! glyphs and colors.

mod icon;
mod panel;

pub use icon::{classify, fill_for_percent, status_title, IconColor, IconState, ICON_LABEL};
pub use panel::{
    absolute_reset_text, currency_symbol, format_minor_units, panel_view, relative_reset_text,
    tint_for_percent, ExtraUsageRow, PanelView, Tint, UsageRow,
};
