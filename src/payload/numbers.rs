//! Permissive readers for loosely typed JSON fields.
//!
//! The platform reports counts as numbers, digit strings, comma-grouped
//! strings or abbreviated strings such as `"1.2万"`. Anything unreadable
//! becomes zero or an empty string.

use chrono::{DateTime, FixedOffset};
use serde_json::Value;

/// Ten thousand, the unit of `万` / `w`.
const WAN: f64 = 10_000.0;

/// One hundred million, the unit of `亿`.
const YI: f64 = 100_000_000.0;

/// Platform local time (China Standard Time, UTC+08:00).
const PLATFORM_UTC_OFFSET_SECS: i32 = 8 * 3600;

/// Reads a non-negative count, defaulting to zero.
#[must_use]
pub fn parse_count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().and_then(float_to_count))
            .unwrap_or(0),
        Some(Value::String(s)) => parse_count_text(s),
        _ => 0,
    }
}

/// Parses `"12345"`, `"12,345"`, `"1.2万"`, `"3w"`, `"1亿"`.
#[must_use]
pub fn parse_count_text(text: &str) -> u64 {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();

    let (digits, multiplier) = if let Some(rest) = cleaned.strip_suffix('万') {
        (rest, Some(WAN))
    } else if let Some(rest) = cleaned
        .strip_suffix('w')
        .or_else(|| cleaned.strip_suffix('W'))
    {
        (rest, Some(WAN))
    } else if let Some(rest) = cleaned.strip_suffix('亿') {
        (rest, Some(YI))
    } else {
        (cleaned.as_str(), None)
    };

    let digits = digits.trim();
    let Some(multiplier) = multiplier else {
        return digits
            .parse::<u64>()
            .ok()
            .or_else(|| digits.parse::<f64>().ok().and_then(float_to_count))
            .unwrap_or(0);
    };

    digits
        .parse::<f64>()
        .ok()
        .and_then(|n| float_to_count(n * multiplier))
        .unwrap_or(0)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn float_to_count(n: f64) -> Option<u64> {
    (n.is_finite() && n >= 0.0).then(|| n.round() as u64)
}

/// Reads a string-like field; numbers are rendered as their digits.
#[must_use]
pub fn parse_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Formats an epoch-milliseconds timestamp as `YYYY-MM-DD HH:MM:SS` in
/// platform local time. Zero, missing or out-of-range values give `""`.
#[must_use]
pub fn format_publish_time(value: Option<&Value>) -> String {
    let millis = parse_count(value);
    if millis == 0 {
        return String::new();
    }
    let Ok(millis) = i64::try_from(millis) else {
        return String::new();
    };
    let (Some(utc), Some(offset)) = (
        DateTime::from_timestamp_millis(millis),
        FixedOffset::east_opt(PLATFORM_UTC_OFFSET_SECS),
    ) else {
        return String::new();
    };
    utc.with_timezone(&offset)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
