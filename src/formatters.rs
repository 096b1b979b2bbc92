//! Value formatters: currency, dates, labels and defensive string coercion

use crate::stock::StockLabeler;
use crate::types::{Locale, Settings, DEFAULT_CURRENCY};
use crate::utils::{as_number, scalar_to_string};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};

/// Where the currency symbol goes relative to the amount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolPosition {
    Before,
    BeforeSpaced,
    AfterSpaced,
}

/// Currency formatting rules for one currency in one locale
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyFormat {
    pub code: String,
    pub symbol: String,
    pub decimals: usize,
    pub thousands_separator: &'static str,
    pub decimal_separator: &'static str,
    pub position: SymbolPosition,
}

impl CurrencyFormat {
    pub fn new(code: &str, locale: &Locale) -> Self {
        let code = if code.trim().is_empty() {
            DEFAULT_CURRENCY.to_string()
        } else {
            code.trim().to_ascii_uppercase()
        };

        let (thousands_separator, decimal_separator, position) = match locale.language().as_str() {
            "de" | "es" | "it" | "pt" | "da" => (".", ",", SymbolPosition::AfterSpaced),
            "nl" => (".", ",", SymbolPosition::BeforeSpaced),
            "fr" => (" ", ",", SymbolPosition::AfterSpaced),
            "sv" | "nb" | "no" | "fi" | "pl" => (" ", ",", SymbolPosition::AfterSpaced),
            _ => (",", ".", SymbolPosition::Before),
        };

        Self {
            symbol: currency_symbol(&code).to_string(),
            decimals: currency_decimals(&code),
            code,
            thousands_separator,
            decimal_separator,
            position,
        }
    }

    /// Pick the currency from settings, then store, then the default
    pub fn from_settings(settings: &Settings, store_currency: Option<&str>, locale: &Locale) -> Self {
        let code = settings
            .currency
            .as_deref()
            .or(store_currency)
            .unwrap_or(DEFAULT_CURRENCY);
        Self::new(code, locale)
    }

    pub fn format(&self, amount: f64) -> String {
        let amount = if amount.is_finite() { amount } else { 0.0 };
        let fixed = format!("{:.*}", self.decimals, amount.abs());
        let (int_part, frac_part) = match fixed.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (fixed.as_str(), None),
        };

        let mut number = group_thousands(int_part, self.thousands_separator);
        if let Some(frac) = frac_part {
            number.push_str(self.decimal_separator);
            number.push_str(frac);
        }

        // "-0.00" is not a thing
        let negative = amount < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0');
        let sign = if negative { "-" } else { "" };

        match self.position {
            SymbolPosition::Before => format!("{}{}{}", sign, self.symbol, number),
            SymbolPosition::BeforeSpaced => format!("{}{} {}", sign, self.symbol, number),
            SymbolPosition::AfterSpaced => format!("{}{} {}", sign, number, self.symbol),
        }
    }
}

fn group_thousands(digits: &str, separator: &str) -> String {
    let len = digits.len();
    let mut grouped = String::with_capacity(len + len / 3 * separator.len());
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            grouped.push_str(separator);
        }
        grouped.push(ch);
    }
    grouped
}

pub fn currency_symbol(code: &str) -> &str {
    match code {
        "USD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "JPY" | "CNY" => "¥",
        "INR" => "₹",
        "KRW" => "₩",
        "AUD" => "A$",
        "CAD" => "CA$",
        "NZD" => "NZ$",
        "BRL" => "R$",
        "MXN" => "MX$",
        "CHF" => "CHF",
        "SEK" | "NOK" | "DKK" => "kr",
        "PLN" => "zł",
        "TRY" => "₺",
        "ZAR" => "R",
        other => other,
    }
}

pub fn currency_decimals(code: &str) -> usize {
    match code {
        "JPY" | "KRW" | "VND" | "CLP" | "ISK" => 0,
        _ => 2,
    }
}

/// Parse a loosely formatted date (RFC 3339, SQL datetime, plain date, epoch millis)
pub fn parse_date(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Number(n) => {
            let millis = n.as_f64()? as i64;
            Utc.timestamp_millis_opt(millis).single().map(|dt| dt.naive_utc())
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.naive_utc());
            }
            for pattern in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
                if let Ok(dt) = NaiveDateTime::parse_from_str(s, pattern) {
                    return Some(dt);
                }
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        }
        _ => None,
    }
}

/// Locale date string (`en`: `3/7/2024`, `de`: `7.3.2024`, ...)
pub fn format_date(value: &Value, locale: &Locale) -> String {
    let Some(date) = parse_date(value) else {
        return scalar_to_string(value).unwrap_or_default();
    };

    let pattern = match locale.language().as_str() {
        "en" => "%-m/%-d/%Y",
        "de" => "%-d.%-m.%Y",
        "nl" => "%-d-%-m-%Y",
        "fr" | "es" | "it" | "pt" => "%d/%m/%Y",
        "ja" | "zh" => "%Y/%-m/%-d",
        _ => "%Y-%m-%d",
    };
    date.format(pattern).to_string()
}

/// Display text of a label entry; labels may be plain strings or objects
pub fn label_text(label: &Value) -> Option<String> {
    match label {
        Value::Object(map) => ["text", "name", "label"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string),
        other => scalar_to_string(other).filter(|s| !s.is_empty()),
    }
}

pub fn join_labels(labels: &[Value]) -> String {
    labels
        .iter()
        .filter_map(label_text)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Formatting rules for one render: currency, locale and stock labels
#[derive(Debug, Clone)]
pub struct ValueFormatter {
    currency: CurrencyFormat,
    locale: Locale,
    stock: StockLabeler,
}

impl ValueFormatter {
    pub fn new(settings: &Settings, currency: CurrencyFormat, locale: Locale) -> Self {
        Self {
            stock: StockLabeler::new(settings, locale.clone()),
            currency,
            locale,
        }
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn currency(&self) -> &CurrencyFormat {
        &self.currency
    }

    pub fn stock(&self) -> &StockLabeler {
        &self.stock
    }

    pub fn format_price(&self, amount: f64) -> String {
        self.currency.format(amount)
    }

    /// Currency string for a loosely typed price; already formatted strings pass through
    pub fn format_price_value(&self, value: &Value) -> String {
        match value {
            Value::Number(_) => as_number(value).map(|n| self.format_price(n)).unwrap_or_default(),
            other => scalar_to_string(other).unwrap_or_default(),
        }
    }

    /// Path-driven formatting of a resolved value.
    ///
    /// `owner` is the object holding the value, used to compute stock labels
    /// for `*.stock_status` paths.
    pub fn format_value(&self, value: &Value, path: &str, owner: Option<&Map<String, Value>>) -> String {
        if path.contains("price") && !path.contains("filters.price") {
            if let Some(n) = value.as_f64() {
                return self.format_price(n);
            }
        }

        if path.contains("stock_status") {
            return match value {
                Value::Object(product) => self.stock_text(product),
                Value::String(s) => s.clone(),
                _ => owner.map(|product| self.stock_text(product)).unwrap_or_default(),
            };
        }

        if path.contains("labels") {
            if let Value::Array(labels) = value {
                return join_labels(labels);
            }
        }

        if path.contains("date") && !value.is_null() {
            return format_date(value, &self.locale);
        }

        coerce_to_string(value, path)
    }

    fn stock_text(&self, product: &Map<String, Value>) -> String {
        self.stock
            .label(product)
            .map(|label| label.text)
            .unwrap_or_default()
    }
}

/// Best-effort string coercion that never leaks an object dump into output
pub fn coerce_to_string(value: &Value, path: &str) -> String {
    if let Some(text) = scalar_to_string(value) {
        return text;
    }

    if let Value::Array(items) = value {
        let parts: Option<Vec<String>> = items.iter().map(scalar_to_string).collect();
        if let Some(parts) = parts {
            return parts.join(",");
        }
    }

    log::warn!("Object value reached template output at '{}', rendering empty string", path);
    String::new()
}
