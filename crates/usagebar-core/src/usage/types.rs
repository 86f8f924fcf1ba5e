//! Usage data types parsed from the organization usage endpoints.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::parser::parse_reset_time;

/// Last-fetched usage state for the configured organization.
///
/// Fields are updated independently per endpoint, so an error from a later
/// fetch can sit next to numbers populated by an earlier one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageSnapshot {
    /// Rolling 5-hour utilization (percent)
    pub session_percent: Option<f64>,
    /// When the 5-hour window resets
    pub session_resets_at: Option<DateTime<Utc>>,
    /// Rolling 7-day utilization (percent)
    pub weekly_percent: Option<f64>,
    /// When the 7-day window resets
    pub weekly_resets_at: Option<DateTime<Utc>>,
    /// Rolling 7-day utilization of the Opus model (percent)
    pub opus_percent: Option<f64>,
    /// Whether pay-as-you-go extra usage is enabled
    pub extra_usage_enabled: Option<bool>,
    /// Monthly extra usage limit in minor currency units
    pub monthly_limit_minor: Option<i64>,
    /// Extra usage spent this month in minor currency units
    pub used_credits_minor: Option<i64>,
    /// ISO currency code for the extra usage amounts
    pub currency: Option<String>,
    /// Whether a fetch is currently in progress
    pub loading: bool,
    /// Error message from the last fetch attempt
    pub error: Option<String>,
    /// When an endpoint last answered successfully
    pub fetched_at: Option<DateTime<Utc>>,
}

impl UsageSnapshot {
    /// Merge a successful `/usage` response.
    ///
    /// A window object that is present overwrites its utilization, even to
    /// unset. The reset time is only touched when `resets_at` is a string.
    pub fn apply_usage(&mut self, report: &UsageReport) {
        if let Some(window) = &report.five_hour {
            self.session_percent = window.utilization;
            if let Some(raw) = &window.resets_at {
                self.session_resets_at = parse_reset_time(raw);
            }
        }
        if let Some(window) = &report.seven_day {
            self.weekly_percent = window.utilization;
            if let Some(raw) = &window.resets_at {
                self.weekly_resets_at = parse_reset_time(raw);
            }
        }
        if let Some(window) = &report.seven_day_opus {
            self.opus_percent = window.utilization;
        }
    }

    /// Merge a successful `/overage_spend_limit` response
    pub fn apply_overage(&mut self, report: &OverageReport) {
        self.extra_usage_enabled = report.is_enabled;
        self.monthly_limit_minor = report.monthly_credit_limit;
        self.used_credits_minor = report.used_credits;
        self.currency = report.currency.clone();
    }

    /// True when nothing has been fetched yet
    pub fn is_empty(&self) -> bool {
        self.session_percent.is_none()
            && self.weekly_percent.is_none()
            && self.opus_percent.is_none()
            && self.extra_usage_enabled.is_none()
    }
}

/// One rolling window from the `/usage` response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowReport {
    pub utilization: Option<f64>,
    /// Raw `resets_at` string, parsed when applied
    pub resets_at: Option<String>,
}

/// Fields contributed by a successful `/usage` response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageReport {
    pub five_hour: Option<WindowReport>,
    pub seven_day: Option<WindowReport>,
    pub seven_day_opus: Option<WindowReport>,
}

/// Fields contributed by a successful `/overage_spend_limit` response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverageReport {
    pub is_enabled: Option<bool>,
    pub monthly_credit_limit: Option<i64>,
    pub used_credits: Option<i64>,
    pub currency: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window(utilization: Option<f64>, resets_at: Option<&str>) -> WindowReport {
        WindowReport {
            utilization,
            resets_at: resets_at.map(str::to_string),
        }
    }

    #[test]
    fn test_apply_usage_sets_present_windows() {
        let mut snapshot = UsageSnapshot::default();
        snapshot.apply_usage(&UsageReport {
            five_hour: Some(window(Some(42.0), Some("2026-10-19T15:00:00Z"))),
            seven_day: Some(window(Some(13.5), None)),
            seven_day_opus: None,
        });

        assert_eq!(snapshot.session_percent, Some(42.0));
        assert_eq!(
            snapshot.session_resets_at,
            Some(Utc.with_ymd_and_hms(2026, 10, 19, 15, 0, 0).unwrap())
        );
        assert_eq!(snapshot.weekly_percent, Some(13.5));
        assert!(snapshot.weekly_resets_at.is_none());
        assert!(snapshot.opus_percent.is_none());
    }

    #[test]
    fn test_apply_usage_leaves_absent_windows_alone() {
        let mut snapshot = UsageSnapshot {
            weekly_percent: Some(70.0),
            opus_percent: Some(5.0),
            ..Default::default()
        };
        snapshot.apply_usage(&UsageReport {
            five_hour: Some(window(Some(10.0), None)),
            ..Default::default()
        });

        assert_eq!(snapshot.session_percent, Some(10.0));
        assert_eq!(snapshot.weekly_percent, Some(70.0));
        assert_eq!(snapshot.opus_percent, Some(5.0));
    }

    #[test]
    fn test_apply_usage_present_window_without_utilization_clears_it() {
        let mut snapshot = UsageSnapshot {
            session_percent: Some(55.0),
            ..Default::default()
        };
        snapshot.apply_usage(&UsageReport {
            five_hour: Some(window(None, None)),
            ..Default::default()
        });
        assert!(snapshot.session_percent.is_none());
    }

    #[test]
    fn test_apply_usage_keeps_reset_when_not_a_string() {
        let reset = Utc.with_ymd_and_hms(2026, 10, 20, 0, 0, 0).unwrap();
        let mut snapshot = UsageSnapshot {
            session_resets_at: Some(reset),
            ..Default::default()
        };
        snapshot.apply_usage(&UsageReport {
            five_hour: Some(window(Some(1.0), None)),
            ..Default::default()
        });
        assert_eq!(snapshot.session_resets_at, Some(reset));

        snapshot.apply_usage(&UsageReport {
            five_hour: Some(window(Some(1.0), Some("tomorrow"))),
            ..Default::default()
        });
        assert!(snapshot.session_resets_at.is_none());
    }

    #[test]
    fn test_apply_overage_overwrites_all_fields() {
        let mut snapshot = UsageSnapshot {
            extra_usage_enabled: Some(true),
            monthly_limit_minor: Some(5000),
            used_credits_minor: Some(10),
            currency: Some("USD".to_string()),
            ..Default::default()
        };
        snapshot.apply_overage(&OverageReport {
            is_enabled: Some(false),
            ..Default::default()
        });

        assert_eq!(snapshot.extra_usage_enabled, Some(false));
        assert!(snapshot.monthly_limit_minor.is_none());
        assert!(snapshot.used_credits_minor.is_none());
        assert!(snapshot.currency.is_none());
    }

    #[test]
    fn test_is_empty() {
        assert!(UsageSnapshot::default().is_empty());
        let snapshot = UsageSnapshot {
            opus_percent: Some(0.0),
            ..Default::default()
        };
        assert!(!snapshot.is_empty());
    }
}
