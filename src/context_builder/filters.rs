//! Category filter normalization
//!
//! The price filter arrives in one of three shapes, told apart by `kind`:
//! a slider range, a list of ranges, or a map of `"min-max"` keys to labels.
//! All three are normalized into either a slider or a list of ranges.
//! Attribute filters get per-option product counts; options no product
//! matches are dropped.

use super::translated_field;
use crate::types::{Locale, DEFAULT_SORT_ORDER};
use crate::utils::{as_number, format_number, get_str, scalar_to_string};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PriceFilter {
    Slider {
        min: f64,
        max: f64,
    },
    RangeList {
        ranges: Vec<PriceRange>,
    },
    /// `{"0-50": "Under 50", "50-": "50 and up"}`
    Map {
        values: Map<String, Value>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub label: Option<String>,
}

impl PriceRange {
    /// `"0-50"` / `"50-"` / `"50+"`
    pub fn parse_key(key: &str) -> Option<Self> {
        let key = key.trim();
        if let Some(min) = key.strip_suffix('+') {
            return Some(Self {
                min: min.trim().parse().ok()?,
                max: None,
                label: None,
            });
        }
        let (min, max) = key.split_once('-')?;
        let max = max.trim();
        Some(Self {
            min: min.trim().parse().ok()?,
            max: if max.is_empty() { None } else { Some(max.parse().ok()?) },
            label: None,
        })
    }

    pub fn key(&self) -> String {
        match self.max {
            Some(max) => format!("{}-{}", format_number(self.min), format_number(max)),
            None => format!("{}-", format_number(self.min)),
        }
    }

    pub fn display_label(&self) -> String {
        if let Some(label) = self.label.as_deref().filter(|l| !l.trim().is_empty()) {
            return label.to_string();
        }
        match self.max {
            Some(max) => format!("{} - {}", format_number(self.min), format_number(max)),
            None => format!("{}+", format_number(self.min)),
        }
    }

    fn is_selected(&self, selected: Option<&Value>) -> bool {
        match selected {
            Some(Value::String(key)) => PriceRange::parse_key(key)
                .map(|range| range.min == self.min && range.max == self.max)
                .unwrap_or(false),
            Some(Value::Object(range)) => {
                range.get("min").and_then(as_number) == Some(self.min)
                    && range.get("max").and_then(as_number) == self.max
            }
            Some(Value::Array(keys)) => keys.iter().any(|key| self.is_selected(Some(key))),
            _ => false,
        }
    }
}

impl PriceFilter {
    /// Normalize into `{kind: "slider", min, max}` or `{kind: "ranges", ranges}`
    pub fn normalize(&self, selected: Option<&Value>) -> Value {
        let ranges = match self {
            PriceFilter::Slider { min, max } => {
                let mut slider = Map::new();
                slider.insert("kind".to_string(), Value::from("slider"));
                slider.insert("min".to_string(), Value::from(*min));
                slider.insert("max".to_string(), Value::from(*max));
                if let Some(Value::Object(current)) = selected {
                    slider.insert("current".to_string(), Value::Object(current.clone()));
                }
                return Value::Object(slider);
            }
            PriceFilter::RangeList { ranges } => ranges.clone(),
            PriceFilter::Map { values } => values
                .iter()
                .filter_map(|(key, label)| {
                    let mut range = PriceRange::parse_key(key)?;
                    range.label = scalar_to_string(label).filter(|l| !l.is_empty());
                    Some(range)
                })
                .collect(),
        };

        let ranges: Vec<Value> = ranges
            .iter()
            .map(|range| {
                let mut entry = Map::new();
                entry.insert("min".to_string(), Value::from(range.min));
                entry.insert("max".to_string(), range.max.map(Value::from).unwrap_or(Value::Null));
                entry.insert("label".to_string(), Value::from(range.display_label()));
                entry.insert("value".to_string(), Value::from(range.key()));
                entry.insert("active".to_string(), Value::Bool(range.is_selected(selected)));
                Value::Object(entry)
            })
            .collect();

        let mut normalized = Map::new();
        normalized.insert("kind".to_string(), Value::from("ranges"));
        normalized.insert("ranges".to_string(), Value::Array(ranges));
        Value::Object(normalized)
    }
}

/// Normalize raw filter data for a category page.
///
/// Returns `{ price, attributes }`; `price` is null when absent or undecodable.
pub fn format_filters(
    filters: Option<&Value>,
    filterable_attributes: &[Value],
    locale: &Locale,
    all_products: &[Value],
    selected_filters: &Map<String, Value>,
) -> Value {
    let price = filters
        .and_then(|filters| filters.get("price"))
        .filter(|price| !price.is_null())
        .and_then(|price| match serde_json::from_value::<PriceFilter>(price.clone()) {
            Ok(filter) => Some(filter.normalize(selected_filters.get("price"))),
            Err(e) => {
                log::warn!("Ignoring undecodable price filter: {}", e);
                None
            }
        })
        .unwrap_or(Value::Null);

    let attributes: Vec<Value> = filterable_attributes
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|attribute| format_attribute(attribute, locale, all_products, selected_filters))
        .collect();

    let mut formatted = Map::new();
    formatted.insert("price".to_string(), price);
    formatted.insert("attributes".to_string(), Value::Array(attributes));
    Value::Object(formatted)
}

fn format_attribute(
    attribute: &Map<String, Value>,
    locale: &Locale,
    all_products: &[Value],
    selected_filters: &Map<String, Value>,
) -> Option<Value> {
    let code = get_str(attribute, "code").or_else(|| get_str(attribute, "slug"))?;
    let selected = selected_values(selected_filters.get(code));

    let mut options: Vec<(i64, Map<String, Value>)> = attribute
        .get("options")
        .or_else(|| attribute.get("values"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
        .iter()
        .filter_map(|option| {
            let (value, mut entry) = match option {
                Value::Object(option) => (option_value(option)?, option.clone()),
                scalar => (scalar_to_string(scalar).filter(|v| !v.is_empty())?, Map::new()),
            };

            let count = all_products
                .iter()
                .filter_map(Value::as_object)
                .filter(|product| product_has_value(product, code, &value))
                .count();
            if count == 0 {
                return None;
            }

            let label = match option {
                Value::Object(option) => Some(translated_field(option, "label", locale))
                    .filter(|l| !l.is_empty())
                    .or_else(|| Some(translated_field(option, "name", locale)).filter(|l| !l.is_empty())),
                _ => None,
            }
            .unwrap_or_else(|| value.clone());

            let sort_order = entry
                .get("sort_order")
                .and_then(as_number)
                .map(|n| n as i64)
                .unwrap_or(DEFAULT_SORT_ORDER);

            entry.insert("active".to_string(), Value::Bool(selected.contains(&value)));
            entry.insert("value".to_string(), Value::from(value));
            entry.insert("label".to_string(), Value::from(label));
            entry.insert("count".to_string(), Value::from(count));
            entry.insert("sort_order".to_string(), Value::from(sort_order));
            Some((sort_order, entry))
        })
        .collect();

    if options.is_empty() {
        return None;
    }
    // Stable: equal sort orders keep input order
    options.sort_by_key(|(order, _)| *order);

    let mut formatted = Map::new();
    formatted.insert("code".to_string(), Value::from(code));
    formatted.insert(
        "name".to_string(),
        Value::from(
            Some(translated_field(attribute, "name", locale))
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| code.to_string()),
        ),
    );
    formatted.insert(
        "options".to_string(),
        Value::Array(options.into_iter().map(|(_, entry)| Value::Object(entry)).collect()),
    );
    Some(Value::Object(formatted))
}

fn option_value(option: &Map<String, Value>) -> Option<String> {
    ["value", "id", "code"]
        .iter()
        .find_map(|key| option.get(*key).and_then(scalar_to_string))
        .filter(|v| !v.is_empty())
}

fn selected_values(selected: Option<&Value>) -> Vec<String> {
    match selected {
        Some(Value::Array(values)) => values.iter().filter_map(scalar_to_string).collect(),
        Some(Value::String(joined)) => joined
            .split(',')
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect(),
        Some(other) => scalar_to_string(other).into_iter().filter(|v| !v.is_empty()).collect(),
        None => Vec::new(),
    }
}

/// Does the product carry `value` for attribute `code`?
///
/// Attribute values live in `attributes` (map or `[{code, value}]` list)
/// or directly on the product; multi-valued attributes are arrays.
fn product_has_value(product: &Map<String, Value>, code: &str, value: &str) -> bool {
    let from_attributes = match product.get("attributes") {
        Some(Value::Object(attributes)) => attributes.get(code),
        Some(Value::Array(attributes)) => attributes
            .iter()
            .filter_map(Value::as_object)
            .find(|attribute| get_str(attribute, "code") == Some(code))
            .and_then(|attribute| attribute.get("value")),
        _ => None,
    };

    match from_attributes.or_else(|| product.get(code)) {
        Some(Value::Array(values)) => values.iter().any(|v| matches_value(v, value)),
        Some(other) => matches_value(other, value),
        None => false,
    }
}

fn matches_value(candidate: &Value, value: &str) -> bool {
    match candidate {
        Value::Object(option) => option_value(option).as_deref() == Some(value),
        other => scalar_to_string(other).as_deref() == Some(value),
    }
}
