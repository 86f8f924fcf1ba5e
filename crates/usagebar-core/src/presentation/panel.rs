//! Contents of the usage panel: one row per quota window plus extra usage.

use std::fmt::Display;

use chrono::{DateTime, TimeZone, Utc};

use crate::usage::UsageSnapshot;

/// Severity tint for a progress bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tint {
    Accent,
    Warning,
    Critical,
}

/// Red from 80%, orange from 50%
pub fn tint_for_percent(percent: f64) -> Tint {
    if percent >= 80.0 {
        Tint::Critical
    } else if percent >= 50.0 {
        Tint::Warning
    } else {
        Tint::Accent
    }
}

/// One quota window
#[derive(Debug, Clone, PartialEq)]
pub struct UsageRow {
    pub label: &'static str,
    pub percent: f64,
    /// Bar fill in `0.0..=1.0`
    pub fraction: f64,
    /// e.g. "42% used"
    pub used_text: String,
    pub reset_text: Option<String>,
    pub tint: Tint,
}

impl UsageRow {
    fn new(label: &'static str, percent: f64, reset_text: Option<String>) -> Self {
        Self {
            label,
            percent,
            fraction: (percent / 100.0).clamp(0.0, 1.0),
            used_text: format!("{}% used", percent.trunc() as i64),
            reset_text,
            tint: tint_for_percent(percent),
        }
    }
}

/// Pay-as-you-go spending for the month
#[derive(Debug, Clone, PartialEq)]
pub struct ExtraUsageRow {
    /// e.g. "$12.34 of $50.00"
    pub spent_text: String,
    /// e.g. "$37.66 remaining"
    pub remaining_text: String,
    /// Bar fill in `0.0..=1.0`
    pub fraction: f64,
    pub tint: Tint,
}

impl ExtraUsageRow {
    /// Present only when extra usage is enabled with a positive limit and
    /// known spend and currency
    pub fn from_snapshot(snapshot: &UsageSnapshot) -> Option<Self> {
        if snapshot.extra_usage_enabled != Some(true) {
            return None;
        }
        let limit = snapshot.monthly_limit_minor.filter(|l| *l > 0)?;
        let used = snapshot.used_credits_minor?;
        let currency = snapshot.currency.as_deref()?;

        let fraction = used as f64 / limit as f64;
        Some(Self {
            spent_text: format!(
                "{} of {}",
                format_minor_units(used, currency),
                format_minor_units(limit, currency)
            ),
            remaining_text: format!(
                "{} remaining",
                format_minor_units(limit.saturating_sub(used), currency)
            ),
            fraction: fraction.clamp(0.0, 1.0),
            tint: tint_for_percent((fraction * 100.0).min(100.0)),
        })
    }
}

/// What the usage panel body shows
#[derive(Debug, Clone, PartialEq)]
pub enum PanelView {
    /// First fetch still running
    Loading,
    /// Nothing to show but an error; offer a retry
    Failed(String),
    /// Known rows, optional extra usage, and a trailing error if any
    Rows {
        rows: Vec<UsageRow>,
        extra: Option<ExtraUsageRow>,
        error: Option<String>,
    },
}

/// Build the panel for `snapshot` as seen at `now`.
///
/// Absolute reset times are rendered in `now`'s time zone.
pub fn panel_view<Tz>(snapshot: &UsageSnapshot, now: &DateTime<Tz>) -> PanelView
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if snapshot.session_percent.is_none() {
        if snapshot.loading {
            return PanelView::Loading;
        }
        if let Some(err) = &snapshot.error {
            return PanelView::Failed(err.clone());
        }
    }

    let now_utc = now.with_timezone(&Utc);
    let mut rows = Vec::new();

    if let Some(percent) = snapshot.session_percent {
        let reset = snapshot
            .session_resets_at
            .map(|at| relative_reset_text(&at, &now_utc));
        rows.push(UsageRow::new("Session (5 hr)", percent, reset));
    }
    if let Some(percent) = snapshot.weekly_percent {
        let reset = snapshot
            .weekly_resets_at
            .map(|at| absolute_reset_text(&at.with_timezone(&now.timezone())));
        rows.push(UsageRow::new("Weekly (7 day)", percent, reset));
    }
    if let Some(percent) = snapshot.opus_percent {
        rows.push(UsageRow::new("Opus Weekly", percent, None));
    }

    PanelView::Rows {
        rows,
        extra: ExtraUsageRow::from_snapshot(snapshot),
        error: snapshot.error.clone(),
    }
}

/// "Resets in 3h 12m", or "Resets soon" once the time has passed
pub fn relative_reset_text(resets_at: &DateTime<Utc>, now: &DateTime<Utc>) -> String {
    let remaining = (*resets_at - *now).num_seconds();
    if remaining <= 0 {
        return "Resets soon".to_string();
    }
    let hours = remaining / 3600;
    let minutes = (remaining % 3600) / 60;
    format!("Resets in {}h {}m", hours, minutes)
}

/// "Resets Mon, Oct 19 at 3:04 PM"
pub fn absolute_reset_text<Tz>(resets_at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("Resets {}", resets_at.format("%a, %b %-d at %-I:%M %p"))
}

/// Symbol for the handful of currencies the API reports
pub fn currency_symbol(currency: &str) -> &'static str {
    match currency {
        "GBP" => "£",
        "EUR" => "€",
        _ => "$",
    }
}

/// Minor units to a two-decimal amount, e.g. 1234 USD -> "$12.34"
pub fn format_minor_units(minor: i64, currency: &str) -> String {
    format!("{}{:.2}", currency_symbol(currency), minor as f64 / 100.0)
}
