//! Core types and constants for slotkit

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

// Interpreter limits
pub const MAX_LOOP_DEPTH: usize = 10;
pub const MAX_LABEL_PASSES: usize = 10;

// Context builder defaults
pub const DEFAULT_SORT_ORDER: i64 = 999;
pub const DEFAULT_URL_PREFIX: &str = "/public";
pub const PLACEHOLDER_IMAGE: &str = "/placeholder-product.svg";
pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_LANGUAGE: &str = "en";

/// Fragment emitted for `{{product.stock_status}}`; filled in client-side.
pub const STOCK_STATUS_PLACEHOLDER: &str =
    r#"<span class="stock-status" data-stock-status></span>"#;

// Stock label color fallbacks
pub const IN_STOCK_TEXT_COLOR: &str = "#166534";
pub const IN_STOCK_BG_COLOR: &str = "#dcfce7";
pub const LOW_STOCK_TEXT_COLOR: &str = "#92400e";
pub const LOW_STOCK_BG_COLOR: &str = "#fef3c7";
pub const OUT_OF_STOCK_TEXT_COLOR: &str = "#991b1b";
pub const OUT_OF_STOCK_BG_COLOR: &str = "#fee2e2";

// Stock label templates used when the store configures none
pub const DEFAULT_IN_STOCK_LABEL: &str = "In Stock{ ({quantity} {item} available)}";
pub const DEFAULT_LOW_STOCK_LABEL: &str = "Low Stock{, only {quantity} {item} left}";
pub const DEFAULT_OUT_OF_STOCK_LABEL: &str = "Out of Stock";

/// A BCP 47-ish language tag such as `en`, `nl` or `pt-BR`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locale(String);

impl Locale {
    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            Self(DEFAULT_LANGUAGE.to_string())
        } else {
            Self(trimmed.replace('_', "-"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Primary language subtag, lowercased (`pt-BR` -> `pt`)
    pub fn language(&self) -> String {
        self.0
            .split('-')
            .next()
            .unwrap_or(DEFAULT_LANGUAGE)
            .to_ascii_lowercase()
    }

    pub fn is_default(&self) -> bool {
        self.language() == DEFAULT_LANGUAGE
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self(DEFAULT_LANGUAGE.to_string())
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Locale {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

/// Page kinds the context builder knows how to shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageType {
    Category,
    Product,
    Cart,
    Header,
    Checkout,
    Success,
    Account,
    Login,
    Other(String),
}

impl PageType {
    pub fn as_str(&self) -> &str {
        match self {
            PageType::Category => "category",
            PageType::Product => "product",
            PageType::Cart => "cart",
            PageType::Header => "header",
            PageType::Checkout => "checkout",
            PageType::Success => "success",
            PageType::Account => "account",
            PageType::Login => "login",
            PageType::Other(name) => name,
        }
    }

    /// Pages that only get the base context merged with their raw data
    pub fn is_generic(&self) -> bool {
        matches!(
            self,
            PageType::Checkout | PageType::Success | PageType::Account | PageType::Login
        )
    }
}

impl FromStr for PageType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "category" => PageType::Category,
            "product" => PageType::Product,
            "cart" => PageType::Cart,
            "header" => PageType::Header,
            "checkout" => PageType::Checkout,
            "success" => PageType::Success,
            "account" => PageType::Account,
            "login" => PageType::Login,
            other => PageType::Other(other.to_string()),
        })
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Store identity as handed over by the storefront collaborator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Store {
    pub slug: String,
    pub name: String,
    pub logo_url: Option<String>,
    pub code: Option<String>,
    pub currency: Option<String>,
    pub default_language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StockSettings {
    pub show_stock_label: bool,
    pub in_stock_label: Option<String>,
    pub low_stock_label: Option<String>,
    pub out_of_stock_label: Option<String>,
    pub low_stock_threshold: Option<f64>,
    /// Per-language overrides: `{ "nl": { "in_stock_label": "Op voorraad" } }`
    pub translations: Map<String, Value>,
}

impl Default for StockSettings {
    fn default() -> Self {
        Self {
            show_stock_label: true,
            in_stock_label: None,
            low_stock_label: None,
            out_of_stock_label: None,
            low_stock_threshold: None,
            translations: Map::new(),
        }
    }
}

/// Store settings relevant to rendering
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub stock_settings: StockSettings,
    /// `{ lang: { key: text } }`, values may also be nested objects
    pub ui_translations: Map<String, Value>,
    pub theme: Map<String, Value>,
    pub hide_stock_quantity: bool,
    pub display_low_stock_threshold: Option<f64>,
    pub currency: Option<String>,
    pub product_labels: Vec<Value>,
}

impl Settings {
    /// Theme entry as a non-empty string
    pub fn theme_str(&self, key: &str) -> Option<&str> {
        self.theme
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_locale_language() {
        assert_eq!(Locale::new("pt_BR").language(), "pt");
        assert_eq!(Locale::new("pt_BR").as_str(), "pt-BR");
        assert_eq!(Locale::new("  ").as_str(), "en");
        assert!(Locale::default().is_default());
    }

    #[test]
    fn test_page_type_parsing() {
        assert_eq!("Category".parse::<PageType>().unwrap(), PageType::Category);
        assert!("login".parse::<PageType>().unwrap().is_generic());
        assert_eq!(
            "landing".parse::<PageType>().unwrap(),
            PageType::Other("landing".to_string())
        );
    }

    #[test]
    fn test_settings_defaults() {
        let settings: Settings = serde_json::from_value(json!({
            "hide_stock_quantity": true,
            "theme": { "stock_in_stock_text_color": "#000000" }
        }))
        .unwrap();

        assert!(settings.hide_stock_quantity);
        assert!(settings.stock_settings.show_stock_label);
        assert_eq!(settings.theme_str("stock_in_stock_text_color"), Some("#000000"));
        assert_eq!(settings.theme_str("missing"), None);
    }
}
