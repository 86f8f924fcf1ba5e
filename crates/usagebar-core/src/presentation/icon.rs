//! Status icon classification.

use crate::usage::UsageSnapshot;

/// Name shown in accessibility descriptions
pub const ICON_LABEL: &str = "Claude Usage";

/// What the status icon shows
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IconState {
    /// Session utilization unknown
    Loading,
    /// Under the session limit (percent in `0..100`)
    Normal(f64),
    /// Over the session limit, spending pay-as-you-go credits
    PaidQuota,
    /// Over the session limit with no credits left to spend
    OutOfQuota,
}

/// Tint applied to the status icon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconColor {
    Default,
    Orange,
    Gray,
}

/// Classify a snapshot. Total: every snapshot maps to exactly one state.
///
/// A negative or non-finite session percentage is treated as unknown.
pub fn classify(snapshot: &UsageSnapshot) -> IconState {
    let Some(percent) = snapshot
        .session_percent
        .filter(|p| p.is_finite() && *p >= 0.0)
    else {
        return IconState::Loading;
    };

    if percent < 100.0 {
        return IconState::Normal(percent);
    }

    let credits_left = matches!(
        (snapshot.used_credits_minor, snapshot.monthly_limit_minor),
        (Some(used), Some(limit)) if used < limit
    );
    if snapshot.extra_usage_enabled == Some(true) && credits_left {
        IconState::PaidQuota
    } else {
        IconState::OutOfQuota
    }
}

/// Icon fill level for a percentage: steps at 25, 50 and 75
pub fn fill_for_percent(percent: f64) -> f64 {
    if percent < 25.0 {
        0.0
    } else if percent < 50.0 {
        0.34
    } else if percent < 75.0 {
        0.67
    } else {
        1.0
    }
}

impl IconState {
    /// Fill level of the bar glyph (0.0, 0.34, 0.67 or 1.0)
    pub fn fill_level(&self) -> f64 {
        match self {
            IconState::Loading => 0.0,
            IconState::Normal(percent) => fill_for_percent(*percent),
            IconState::PaidQuota | IconState::OutOfQuota => 1.0,
        }
    }

    pub fn color(&self) -> IconColor {
        match self {
            IconState::Loading | IconState::Normal(_) => IconColor::Default,
            IconState::PaidQuota => IconColor::Orange,
            IconState::OutOfQuota => IconColor::Gray,
        }
    }

    /// Percentage shown next to the icon; `None` while loading
    pub fn percentage_text(&self) -> Option<String> {
        match self {
            IconState::Loading => None,
            IconState::Normal(percent) => Some(format!("{}%", percent.trunc() as u32)),
            IconState::PaidQuota | IconState::OutOfQuota => Some("100%".to_string()),
        }
    }

    pub fn accessibility_description(&self) -> String {
        match self {
            IconState::Loading => ICON_LABEL.to_string(),
            IconState::Normal(percent) => {
                format!("{}: {}%", ICON_LABEL, percent.trunc() as u32)
            }
            IconState::PaidQuota => format!("{}: 100%, using extra usage", ICON_LABEL),
            IconState::OutOfQuota => format!("{}: 100%, limit reached", ICON_LABEL),
        }
    }
}

/// Text placed beside the icon when the show-percentage preference is on
pub fn status_title(snapshot: &UsageSnapshot, show_percentage: bool) -> Option<String> {
    if !show_percentage {
        return None;
    }
    classify(snapshot)
        .percentage_text()
        .map(|text| format!("{} ", text))
}
