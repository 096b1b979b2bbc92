//! Loose value helpers shared by the formatters, context builder and interpreter
//!
//! Collaborator payloads are loosely typed: prices arrive as numbers or
//! numeric strings, flags as booleans, `1`/`0` or `"true"`. These helpers
//! read them the same way everywhere.

use serde_json::{Map, Value};

/// Read a value as a number, accepting numeric strings
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
            }
        }
        _ => None,
    }
}

/// Truthiness used by conditionals and flag checks.
///
/// `null`, `false`, `0`, `NaN`, `""` and empty arrays are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

/// Read a boolean-ish flag (`true`, `1`, `"true"`, `"1"`, `"yes"`)
pub fn as_flag(value: &Value) -> bool {
    match value {
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        other => is_truthy(other),
    }
}

/// Render a number the way a browser would print it: `3`, `2.5`, `-0.25`
pub fn format_number(n: f64) -> String {
    if !n.is_finite() {
        return if n.is_nan() { "NaN".to_string() } else if n > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() };
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// String form of a scalar value; `None` for objects and arrays
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(match n.as_i64() {
            Some(i) => i.to_string(),
            None => n.as_f64().map(format_number).unwrap_or_default(),
        }),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Blank means missing, null, or whitespace-only text
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

pub fn get_str<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key).and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

pub fn get_number(map: &Map<String, Value>, key: &str) -> Option<f64> {
    map.get(key).and_then(as_number)
}

pub fn get_flag(map: &Map<String, Value>, key: &str) -> bool {
    map.get(key).map(as_flag).unwrap_or(false)
}

/// Identifier of an entity as text (`id` may be numeric or a string)
pub fn get_id(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `add_to_cart` -> `Add To Cart`; for dotted keys only the last segment is used
pub fn humanize_key(key: &str) -> String {
    let last = key.rsplit('.').next().unwrap_or(key);
    last.split(|c: char| c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// HTML-escape text for `{{path}}` substitution
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            '`' => escaped.push_str("&#x60;"),
            '=' => escaped.push_str("&#x3D;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
