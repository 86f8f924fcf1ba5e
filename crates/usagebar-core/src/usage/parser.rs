//! Parser for the `/usage` and `/overage_spend_limit` JSON bodies.
//!
//! Both endpoints are read leniently: a missing field, or one with an
//! unexpected JSON type, is reported as unset rather than failing the parse.
//! Only a body that is not a JSON object is an error.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::fetcher::FetchError;
use super::types::{OverageReport, UsageReport, WindowReport};

/// Parse the body of `{org}/usage`
pub fn parse_usage_body(body: &[u8]) -> Result<UsageReport, FetchError> {
    let json = parse_object(body)?;

    Ok(UsageReport {
        five_hour: window(&json, "five_hour"),
        seven_day: window(&json, "seven_day"),
        seven_day_opus: window(&json, "seven_day_opus"),
    })
}

/// Parse the body of `{org}/overage_spend_limit`
pub fn parse_overage_body(body: &[u8]) -> Result<OverageReport, FetchError> {
    let json = parse_object(body)?;

    Ok(OverageReport {
        is_enabled: json.get("is_enabled").and_then(Value::as_bool),
        monthly_credit_limit: json.get("monthly_credit_limit").and_then(integer),
        used_credits: json.get("used_credits").and_then(integer),
        currency: json
            .get("currency")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Parse an ISO-8601 reset timestamp, with or without fractional seconds
pub fn parse_reset_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_object(body: &[u8]) -> Result<Map<String, Value>, FetchError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(FetchError::MalformedResponse),
    }
}

/// Extract one rolling window; `None` when the key is absent or not an object
fn window(json: &Map<String, Value>, key: &str) -> Option<WindowReport> {
    let obj = json.get(key)?.as_object()?;
    Some(WindowReport {
        utilization: obj.get("utilization").and_then(Value::as_f64),
        resets_at: obj
            .get("resets_at")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Integer minor-unit amounts; fractional values are truncated
fn integer(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f.trunc() as i64))
}
