//! Stock labels and availability rules
//!
//! Label templates carry optional `{...}` blocks around quantity
//! placeholders, e.g. `In Stock{ ({quantity} {item} available)}`. When the
//! quantity is known the placeholders are filled and the wrapping braces
//! dropped; when it is unknown or hidden every block that mentions a
//! placeholder disappears entirely.

use crate::types::*;
use crate::utils::{get_flag, get_number, get_str};
use serde::Serialize;
use serde_json::{Map, Value};

const QUANTITY_PLACEHOLDERS: [&str; 4] = ["quantity", "item", "unit", "piece"];

/// Product types that are never purchased directly
const PARENT_PRODUCT_TYPES: [&str; 2] = ["configurable", "grouped"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockLabel {
    pub text: String,
    #[serde(rename = "textColor")]
    pub text_color: String,
    #[serde(rename = "bgColor")]
    pub bg_color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockState {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockState {
    fn setting_key(self) -> &'static str {
        match self {
            StockState::InStock => "in_stock_label",
            StockState::LowStock => "low_stock_label",
            StockState::OutOfStock => "out_of_stock_label",
        }
    }

    fn theme_prefix(self) -> &'static str {
        match self {
            StockState::InStock => "stock_in_stock",
            StockState::LowStock => "stock_low_stock",
            StockState::OutOfStock => "stock_out_of_stock",
        }
    }

    fn fallback_colors(self) -> (&'static str, &'static str) {
        match self {
            StockState::InStock => (IN_STOCK_TEXT_COLOR, IN_STOCK_BG_COLOR),
            StockState::LowStock => (LOW_STOCK_TEXT_COLOR, LOW_STOCK_BG_COLOR),
            StockState::OutOfStock => (OUT_OF_STOCK_TEXT_COLOR, OUT_OF_STOCK_BG_COLOR),
        }
    }

    fn default_template(self) -> &'static str {
        match self {
            StockState::InStock => DEFAULT_IN_STOCK_LABEL,
            StockState::LowStock => DEFAULT_LOW_STOCK_LABEL,
            StockState::OutOfStock => DEFAULT_OUT_OF_STOCK_LABEL,
        }
    }
}

/// How many units a shopper can put in the cart
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AvailableQuantity {
    Unlimited,
    Limited(f64),
}

fn has_infinite_stock(product: &Map<String, Value>) -> bool {
    get_flag(product, "infinite_stock")
}

fn stock_unmanaged(product: &Map<String, Value>) -> bool {
    matches!(product.get("manage_stock"), Some(v) if !v.is_null() && !crate::utils::as_flag(v))
}

/// Out of stock: managed, finite, a known quantity of nothing and no backorders
pub fn is_product_out_of_stock(product: &Map<String, Value>) -> bool {
    if has_infinite_stock(product) || stock_unmanaged(product) {
        return false;
    }
    match get_number(product, "stock_quantity") {
        Some(quantity) => quantity <= 0.0 && !get_flag(product, "allow_backorders"),
        None => false,
    }
}

/// An unknown quantity is not a limit
pub fn available_quantity(product: &Map<String, Value>) -> AvailableQuantity {
    if has_infinite_stock(product) || stock_unmanaged(product) || get_flag(product, "allow_backorders") {
        return AvailableQuantity::Unlimited;
    }
    match get_number(product, "stock_quantity") {
        Some(quantity) => AvailableQuantity::Limited(quantity.max(0.0)),
        None => AvailableQuantity::Unlimited,
    }
}

/// Computes stock labels from store settings for one locale
#[derive(Debug, Clone)]
pub struct StockLabeler {
    stock_settings: StockSettings,
    theme: Map<String, Value>,
    hide_quantity: bool,
    store_threshold: Option<f64>,
    locale: Locale,
}

impl StockLabeler {
    pub fn new(settings: &Settings, locale: Locale) -> Self {
        Self {
            stock_settings: settings.stock_settings.clone(),
            theme: settings.theme.clone(),
            hide_quantity: settings.hide_stock_quantity,
            store_threshold: settings
                .display_low_stock_threshold
                .or(settings.stock_settings.low_stock_threshold),
            locale,
        }
    }

    pub fn label(&self, product: &Map<String, Value>) -> Option<StockLabel> {
        if !self.stock_settings.show_stock_label {
            return None;
        }

        if let Some(kind) = get_str(product, "type") {
            if PARENT_PRODUCT_TYPES.contains(&kind.to_ascii_lowercase().as_str()) {
                return None;
            }
        }

        if has_infinite_stock(product) || stock_unmanaged(product) {
            return Some(self.build(StockState::InStock, None));
        }

        let Some(quantity) = get_number(product, "stock_quantity") else {
            return Some(self.build(StockState::InStock, None));
        };

        if quantity <= 0.0 {
            return Some(self.build(StockState::OutOfStock, None));
        }

        let threshold = get_number(product, "low_stock_threshold").or(self.store_threshold);
        if let Some(threshold) = threshold {
            if quantity <= threshold {
                return Some(self.build(StockState::LowStock, Some(quantity)));
            }
        }

        let shown = if self.hide_quantity { None } else { Some(quantity) };
        Some(self.build(StockState::InStock, shown))
    }

    fn build(&self, state: StockState, quantity: Option<f64>) -> StockLabel {
        let template = self.template_for(state);
        let text = match quantity {
            Some(q) => fill_quantity_placeholders(&template, q),
            None => strip_quantity_blocks(&template),
        };

        let (text_fallback, bg_fallback) = state.fallback_colors();
        StockLabel {
            text,
            text_color: self.theme_color(&format!("{}_text_color", state.theme_prefix()), text_fallback),
            bg_color: self.theme_color(&format!("{}_bg_color", state.theme_prefix()), bg_fallback),
        }
    }

    fn template_for(&self, state: StockState) -> String {
        let key = state.setting_key();

        let translated = [self.locale.as_str().to_string(), self.locale.language()]
            .iter()
            .find_map(|lang| {
                self.stock_settings
                    .translations
                    .get(lang)
                    .and_then(Value::as_object)
                    .and_then(|table| get_str(table, key))
                    .map(str::to_string)
            });
        if let Some(text) = translated {
            return text;
        }

        let configured = match state {
            StockState::InStock => &self.stock_settings.in_stock_label,
            StockState::LowStock => &self.stock_settings.low_stock_label,
            StockState::OutOfStock => &self.stock_settings.out_of_stock_label,
        };
        configured
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| state.default_template())
            .to_string()
    }

    fn theme_color(&self, key: &str, fallback: &str) -> String {
        self.theme
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(fallback)
            .to_string()
    }
}

/// Outermost `{...}` spans (byte offsets, inclusive of braces) found by depth counting
fn outer_brace_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (i, ch) in text.char_indices() {
        match ch {
            '{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push((start, i + 1));
                }
            }
            _ => {}
        }
    }
    spans
}

fn is_placeholder(inner: &str) -> bool {
    QUANTITY_PLACEHOLDERS.contains(&inner.trim())
}

fn mentions_placeholder(inner: &str) -> bool {
    QUANTITY_PLACEHOLDERS
        .iter()
        .any(|name| inner.contains(&format!("{{{}}}", name)))
}

/// Rewrite every outermost brace span with `rewrite(inner)`; returns the new text
fn rewrite_spans(text: &str, mut rewrite: impl FnMut(&str) -> String) -> String {
    let mut result = String::with_capacity(text.len());
    let mut cursor = 0;
    for (start, end) in outer_brace_spans(text) {
        result.push_str(&text[cursor..start]);
        result.push_str(&rewrite(&text[start + 1..end - 1]));
        cursor = end;
    }
    result.push_str(&text[cursor..]);
    result
}

fn run_to_fixed_point(text: &str, pass: impl Fn(&str) -> String) -> String {
    let mut current = text.to_string();
    for _ in 0..MAX_LABEL_PASSES {
        let next = pass(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Marks where a block was removed
const SEAM: char = '\u{1}';

const CLOSING_PUNCTUATION: [char; 7] = ['.', ',', '!', '?', ';', ':', ')'];

/// Tidy the text around removed blocks only: "In Stock ()" -> "In Stock",
/// "Ready !" -> "Ready!". Text away from a seam keeps its spacing.
fn close_seams(text: &str) -> String {
    let mut text = text.to_string();
    // Parentheses left wrapping nothing but a removed block
    while let Some(open) = find_empty_parens(&text) {
        let close = open + text[open..].find(')').unwrap_or(0);
        text.replace_range(open..=close, &SEAM.to_string());
    }

    let mut pieces = text.split(SEAM);
    let mut result = pieces.next().unwrap_or_default().to_string();
    for piece in pieces {
        let right = piece.trim_start();
        let spaced = result.ends_with(char::is_whitespace) || right.len() != piece.len();
        let at_edge = result.trim().is_empty() || right.is_empty();
        let before_punctuation = right.starts_with(CLOSING_PUNCTUATION);

        result.truncate(result.trim_end().len());
        if spaced && !at_edge && !before_punctuation {
            result.push(' ');
        }
        result.push_str(right);
    }
    result
}

fn find_empty_parens(text: &str) -> Option<usize> {
    text.match_indices('(').map(|(i, _)| i).find(|&open| {
        let rest = &text[open + 1..];
        match rest.find(')') {
            Some(close) => {
                let inner = &rest[..close];
                inner.contains(SEAM) && inner.chars().all(|c| c == SEAM || c.is_whitespace())
            }
            None => false,
        }
    })
}

/// Remove every block that mentions a quantity placeholder, unwrap the rest
pub fn strip_quantity_blocks(template: &str) -> String {
    let stripped = run_to_fixed_point(template, |text| {
        rewrite_spans(text, |inner| {
            if is_placeholder(inner) || mentions_placeholder(inner) {
                SEAM.to_string()
            } else {
                inner.to_string()
            }
        })
    });
    close_seams(&stripped)
}

/// Fill placeholders with the quantity and unwrap the blocks around them
pub fn fill_quantity_placeholders(template: &str, quantity: f64) -> String {
    let count = crate::utils::format_number(quantity);
    let singular = quantity == 1.0;

    let filled = run_to_fixed_point(template, |text| {
        rewrite_spans(text, |inner| match inner.trim() {
            "quantity" => count.clone(),
            "item" => noun("item", singular),
            "unit" => noun("unit", singular),
            "piece" => noun("piece", singular),
            _ => inner.to_string(),
        })
    });
    filled
}

fn noun(word: &str, singular: bool) -> String {
    if singular {
        word.to_string()
    } else {
        format!("{}s", word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn labeler(settings: Settings) -> StockLabeler {
        StockLabeler::new(&settings, Locale::default())
    }

    #[test]
    fn test_out_of_stock_label() {
        let label = labeler(Settings::default())
            .label(&product(json!({ "stock_quantity": 0 })))
            .unwrap();
        assert_eq!(label.text, "Out of Stock");
        assert_eq!(label.text_color, OUT_OF_STOCK_TEXT_COLOR);
        assert_eq!(label.bg_color, OUT_OF_STOCK_BG_COLOR);
    }

    #[test]
    fn test_infinite_stock_strips_quantity() {
        let label = labeler(Settings::default())
            .label(&product(json!({ "infinite_stock": true, "stock_quantity": 4 })))
            .unwrap();
        assert_eq!(label.text, "In Stock");
        assert!(!label.text.contains('{'));
        assert_eq!(label.text_color, IN_STOCK_TEXT_COLOR);
    }

    #[test]
    fn test_low_stock_with_custom_template() {
        let mut settings = Settings::default();
        settings.stock_settings.low_stock_label = Some("Only {quantity} {item} left".to_string());
        let label = labeler(settings)
            .label(&product(json!({ "stock_quantity": 3, "low_stock_threshold": 5 })))
            .unwrap();
        assert_eq!(label.text, "Only 3 items left");
        assert_eq!(label.bg_color, LOW_STOCK_BG_COLOR);
    }

    #[test]
    fn test_low_stock_uses_store_threshold() {
        let mut settings = Settings::default();
        settings.display_low_stock_threshold = Some(2.0);
        let label = labeler(settings)
            .label(&product(json!({ "stock_quantity": "1" })))
            .unwrap();
        assert_eq!(label.text, "Low Stock, only 1 item left");
    }

    #[test]
    fn test_in_stock_quantity_shown_and_hidden() {
        let label = labeler(Settings::default())
            .label(&product(json!({ "stock_quantity": 12 })))
            .unwrap();
        assert_eq!(label.text, "In Stock (12 items available)");

        let mut settings = Settings::default();
        settings.hide_stock_quantity = true;
        let label = labeler(settings)
            .label(&product(json!({ "stock_quantity": 12 })))
            .unwrap();
        assert_eq!(label.text, "In Stock");
    }

    #[test]
    fn test_disabled_and_parent_products() {
        let mut settings = Settings::default();
        settings.stock_settings.show_stock_label = false;
        assert!(labeler(settings).label(&product(json!({ "stock_quantity": 1 }))).is_none());

        let parent = product(json!({ "type": "configurable", "stock_quantity": 0 }));
        assert!(labeler(Settings::default()).label(&parent).is_none());
    }

    #[test]
    fn test_translated_label_and_theme_colors() {
        let settings: Settings = serde_json::from_value(json!({
            "stock_settings": {
                "translations": { "nl": { "out_of_stock_label": "Uitverkocht" } }
            },
            "theme": { "stock_out_of_stock_text_color": "#111111" }
        }))
        .unwrap();
        let label = StockLabeler::new(&settings, Locale::new("nl-BE"))
            .label(&product(json!({ "stock_quantity": -2 })))
            .unwrap();
        assert_eq!(label.text, "Uitverkocht");
        assert_eq!(label.text_color, "#111111");
        assert_eq!(label.bg_color, OUT_OF_STOCK_BG_COLOR);
    }

    #[test]
    fn test_nested_blocks() {
        let template = "Ready{ to ship{: {quantity} {piece}}}!";
        assert_eq!(strip_quantity_blocks(template), "Ready!");
        assert_eq!(fill_quantity_placeholders(template, 1.0), "Ready to ship: 1 piece!");
        assert_eq!(fill_quantity_placeholders("{{quantity} {unit}} left", 2.0), "2 units left");
    }

    #[test]
    fn test_strip_only_touches_removed_blocks() {
        assert_eq!(strip_quantity_blocks("En stock !"), "En stock !");
        assert_eq!(strip_quantity_blocks("Ships in  2 days (weekdays)"), "Ships in  2 days (weekdays)");
        assert_eq!(strip_quantity_blocks("Op voorraad () {({quantity})}"), "Op voorraad ()");
        assert_eq!(strip_quantity_blocks("In Stock ({quantity} {item})"), "In Stock");
        assert_eq!(strip_quantity_blocks("Only {quantity} left"), "Only left");
        assert_eq!(strip_quantity_blocks("{quantity} {item} ready !"), "ready !");
    }

    #[test]
    fn test_out_of_stock_rule() {
        assert!(is_product_out_of_stock(&product(json!({ "stock_quantity": 0 }))));
        assert!(!is_product_out_of_stock(&product(json!({ "stock_quantity": 0, "allow_backorders": true }))));
        assert!(!is_product_out_of_stock(&product(json!({ "stock_quantity": 0, "infinite_stock": true }))));
        assert!(!is_product_out_of_stock(&product(json!({ "stock_quantity": 0, "manage_stock": false }))));
        assert!(!is_product_out_of_stock(&product(json!({ "stock_quantity": 5 }))));
    }

    #[test]
    fn test_unknown_quantity_is_available() {
        let untracked = product(json!({ "id": 1, "price": 5 }));
        assert!(!is_product_out_of_stock(&untracked));
        assert_eq!(available_quantity(&untracked), AvailableQuantity::Unlimited);
        assert!(!is_product_out_of_stock(&product(json!({ "stock_quantity": "n/a" }))));

        let label = labeler(Settings::default()).label(&untracked).unwrap();
        assert_eq!(label.text, "In Stock");
    }

    #[test]
    fn test_available_quantity() {
        assert_eq!(available_quantity(&product(json!({ "stock_quantity": -3 }))), AvailableQuantity::Limited(0.0));
        assert_eq!(available_quantity(&product(json!({ "stock_quantity": 7 }))), AvailableQuantity::Limited(7.0));
        assert_eq!(available_quantity(&product(json!({ "infinite_stock": true }))), AvailableQuantity::Unlimited);
        assert_eq!(
            available_quantity(&product(json!({ "stock_quantity": 0, "allow_backorders": 1 }))),
            AvailableQuantity::Unlimited
        );
    }
}
