//! Multi-candidate field extraction over raw retailer JSON.
//!
//! Retailer payloads disagree on field names and nesting, so every canonical
//! field is resolved through an ordered list of dotted candidate paths; the
//! first path that yields a defined, non-null value wins. Paths use `.` as
//! the separator and bare integers as array indices, e.g. `variants.0.price`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Resolves a dotted path against a JSON value. `None` for missing segments
/// and for explicit nulls — a `null` price must not shadow a later candidate.
pub(crate) fn lookup<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = record;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => {
                let index: usize = segment.parse().ok()?;
                items.get(index)?
            }
            _ => return None,
        };
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// First candidate path that resolves to a non-null value.
pub(crate) fn first_value<'a>(record: &'a Value, candidates: &[&str]) -> Option<&'a Value> {
    candidates.iter().find_map(|path| lookup(record, path))
}

/// First candidate resolving to a non-empty string. Numbers are stringified
/// so numeric ids ("id": 123456) can serve as string identifiers.
pub(crate) fn first_str(record: &Value, candidates: &[&str]) -> Option<String> {
    candidates.iter().find_map(|path| {
        match lookup(record, path)? {
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_owned())
                }
            }
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    })
}

/// First candidate coercible to a finite number.
///
/// Accepts JSON numbers and numeric strings with common price decoration
/// (`"$130.00"`, `"1,299.99"`, `"€180"`). Absent or unparseable values yield
/// `None` — never zero, never NaN.
pub(crate) fn first_f64(record: &Value, candidates: &[&str]) -> Option<f64> {
    candidates.iter().find_map(|path| {
        match lookup(record, path)? {
            Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
            Value::String(s) => parse_price_str(s),
            _ => None,
        }
    })
}

fn parse_price_str(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// First candidate resolving to a boolean. String `"true"`/`"false"` count;
/// other shapes do not coerce.
pub(crate) fn first_bool(record: &Value, candidates: &[&str]) -> Option<bool> {
    candidates.iter().find_map(|path| {
        match lookup(record, path)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    })
}

/// First candidate parseable as a timestamp.
///
/// Strings try RFC 3339, then a handful of date shapes retailers actually
/// emit; bare dates become midnight UTC. Numbers are treated as epoch
/// seconds, or milliseconds when too large for seconds. Unparseable values
/// are skipped, not errors.
pub(crate) fn first_datetime(record: &Value, candidates: &[&str]) -> Option<DateTime<Utc>> {
    candidates.iter().find_map(|path| {
        match lookup(record, path)? {
            Value::String(s) => parse_datetime_str(s),
            Value::Number(n) => n.as_i64().and_then(parse_epoch),
            _ => None,
        }
    })
}

fn parse_datetime_str(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    for format in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
        }
    }

    None
}

fn parse_epoch(value: i64) -> Option<DateTime<Utc>> {
    // Heuristic: anything past the year 33658 in seconds is milliseconds.
    if value.abs() >= 1_000_000_000_000 {
        Utc.timestamp_millis_opt(value).single()
    } else {
        Utc.timestamp_opt(value, 0).single()
    }
}

/// First candidate yielding a non-empty, ordered list of image URLs.
///
/// Accepts arrays of URL strings, arrays of objects carrying `src`/`url`/
/// `image_url`, a single object with those keys, or a bare URL string.
/// No candidate matching yields an empty vec — never null.
pub(crate) fn image_urls(record: &Value, candidates: &[&str]) -> Vec<String> {
    for path in candidates {
        let Some(value) = lookup(record, path) else {
            continue;
        };
        let urls = collect_image_urls(value);
        if !urls.is_empty() {
            return urls;
        }
    }
    Vec::new()
}

fn collect_image_urls(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(image_url_of).collect(),
        other => image_url_of(other).into_iter().collect(),
    }
}

fn image_url_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Object(map) => ["src", "url", "image_url", "imageUrl"]
            .iter()
            .find_map(|key| map.get(*key))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned),
        _ => None,
    }
}
