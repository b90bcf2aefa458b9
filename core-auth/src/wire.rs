//! Lenient decoding helpers for REST payloads
//!
//! The server (and older persisted records) are loose about types: ids come
//! as numbers or strings, durations as numbers, numeric strings or `null`,
//! and empty strings stand in for missing values. These helpers are used with
//! `#[serde(deserialize_with = ...)]` so that defaulting happens once, while
//! decoding.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// String field that may arrive as a number. `null` and other shapes decode
/// to an empty string.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

/// Optional string where blank means absent.
pub fn non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Non-negative count. Negative, fractional or garbage values are clamped
/// or truncated; anything unparsable is zero.
pub fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_u64(&Value::deserialize(deserializer)?))
}

/// Like [`lenient_u64`], saturating at `u32::MAX`.
pub fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = value_to_u64(&Value::deserialize(deserializer)?);
    Ok(u32::try_from(value).unwrap_or(u32::MAX))
}

/// Optional timestamp, see [`parse_timestamp`].
pub fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => parse_timestamp(&s),
        _ => None,
    })
}

fn value_to_u64(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().map(float_to_u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<f64>().map(float_to_u64).unwrap_or(0),
        _ => 0,
    }
}

fn float_to_u64(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        // `as` saturates at u64::MAX.
        value.trunc() as u64
    } else {
        0
    }
}

/// Parse a server timestamp.
///
/// Accepts RFC 3339 (`2023-01-01T10:00:00Z`), a naive ISO date-time
/// (`2023-01-01T10:00:00`, optionally with fractional seconds) taken as UTC,
/// or a bare date (`2023-01-01`) at midnight UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "lenient_string")]
        id: String,
        #[serde(default, deserialize_with = "non_empty_string")]
        genre: Option<String>,
        #[serde(default, deserialize_with = "lenient_u32")]
        duration: u32,
        #[serde(default, deserialize_with = "lenient_u64")]
        likes: u64,
        #[serde(default, deserialize_with = "lenient_datetime")]
        created_at: Option<DateTime<Utc>>,
    }

    fn probe(value: serde_json::Value) -> Probe {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_ids_accept_numbers_and_strings() {
        assert_eq!(probe(json!({ "id": 42 })).id, "42");
        assert_eq!(probe(json!({ "id": "abc" })).id, "abc");
        assert_eq!(probe(json!({ "id": null })).id, "");
        assert_eq!(probe(json!({})).id, "");
    }

    #[test]
    fn test_blank_strings_are_absent() {
        assert_eq!(probe(json!({ "genre": "" })).genre, None);
        assert_eq!(probe(json!({ "genre": "   " })).genre, None);
        assert_eq!(probe(json!({ "genre": "Rock" })).genre.as_deref(), Some("Rock"));
    }

    #[test]
    fn test_durations_default_to_zero() {
        assert_eq!(probe(json!({ "duration": 200 })).duration, 200);
        assert_eq!(probe(json!({ "duration": "200" })).duration, 200);
        assert_eq!(probe(json!({ "duration": 200.9 })).duration, 200);
        assert_eq!(probe(json!({ "duration": -5 })).duration, 0);
        assert_eq!(probe(json!({ "duration": "three" })).duration, 0);
        assert_eq!(probe(json!({ "duration": null })).duration, 0);
        assert_eq!(probe(json!({ "likes": 1e30 })).likes, u64::MAX);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let rfc = parse_timestamp("2024-03-05T10:20:30+02:00").unwrap();
        assert_eq!(rfc.hour(), 8);

        let naive = parse_timestamp("2023-01-01T10:00:00").unwrap();
        assert_eq!((naive.year(), naive.hour()), (2023, 10));

        let fractional = parse_timestamp("2023-01-01T10:00:00.123456").unwrap();
        assert_eq!(fractional.minute(), 0);

        let date = parse_timestamp("2023-01-01").unwrap();
        assert_eq!((date.month(), date.day(), date.hour()), (1, 1, 0));

        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_datetime_field() {
        assert!(probe(json!({ "created_at": "2024-01-01" })).created_at.is_some());
        assert!(probe(json!({ "created_at": 1700000000 })).created_at.is_none());
    }
}
