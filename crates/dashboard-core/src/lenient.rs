//! Field deserializers that never reject a payload over one bad field.
//!
//! Missing fields are handled by `#[serde(default)]`; these cover explicit
//! `null`s, values of the wrong type and out-of-range numbers.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// `null` or a value of the wrong type becomes `T::default()`. Integral
/// floats such as `2.0` are accepted for integer fields.
pub(crate) fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(T::default());
    }
    Ok(from_value(value).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Mistyped field, using default");
        T::default()
    }))
}

/// `serde_json::from_value`, retrying an integral float as an integer.
pub(crate) fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, serde_json::Error> {
    if let Some(int) = integral(&value) {
        if let Ok(decoded) = serde_json::from_value(int) {
            return Ok(decoded);
        }
    }
    serde_json::from_value(value)
}

/// `Some` for floats with no fractional part that fit an `i64` or `u64`.
pub(crate) fn integral(value: &Value) -> Option<Value> {
    if !value.is_f64() {
        return None;
    }
    let f = value.as_f64()?;
    if !f.is_finite() || f.fract() != 0.0 {
        return None;
    }
    if f >= 0.0 && f < u64::MAX as f64 {
        Some(Value::from(f as u64))
    } else if f < 0.0 && f >= i64::MIN as f64 {
        Some(Value::from(f as i64))
    } else {
        None
    }
}

/// Milliseconds as a non-negative integer. Accepts fractional JSON numbers,
/// clamps negatives to zero; anything that is not a number is zero.
pub(crate) fn millis<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?.as_f64().unwrap_or(0.0);
    Ok(clamp_millis(raw))
}

pub(crate) fn clamp_millis(raw: f64) -> u64 {
    if raw.is_finite() && raw > 0.0 {
        raw.round() as u64
    } else {
        0
    }
}

/// A point in time sent either as epoch milliseconds or as an ISO-8601
/// string. Strings without an offset are taken as UTC; empty or unparseable
/// values become `None`.
pub(crate) fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n
            .as_f64()
            .and_then(|ms| DateTime::from_timestamp_millis(ms as i64)),
        Some(Value::String(s)) => parse_timestamp(&s),
        _ => None,
    })
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    match NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(naive) => Some(naive.and_utc()),
        Err(e) => {
            tracing::warn!(value = raw, error = %e, "Unparseable timestamp");
            None
        }
    }
}
