//! Page context builder
//!
//! Turns a raw, page-type-tagged data bundle into the [`VariableContext`]
//! a slot template is rendered against. Every page gets the base context
//! (store, settings, theme, language, currency); page types with known
//! shapes get their collections decorated with display strings.

pub mod cart;
pub mod filters;
pub mod header;
pub mod pagination;
pub mod products;

use crate::formatters::{CurrencyFormat, ValueFormatter};
use crate::types::*;
use crate::utils::{get_str, is_truthy};
use crate::variable_context::VariableContext;
use serde_json::{Map, Value};

pub use filters::{format_filters, PriceFilter};
pub use pagination::{pagination_text, Pagination};

/// Knobs resolved once at the request boundary
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub locale: Locale,
    /// Overrides the settings/store currency
    pub currency: Option<String>,
    pub url_prefix: String,
    pub placeholder_image: String,
    /// Let loop item keys shadow context keys such as `settings`
    pub item_keys_shadow: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            currency: None,
            url_prefix: DEFAULT_URL_PREFIX.to_string(),
            placeholder_image: PLACEHOLDER_IMAGE.to_string(),
            item_keys_shadow: true,
        }
    }
}

impl BuildOptions {
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }
}

pub struct ContextBuilder {
    store: Store,
    settings: Settings,
    options: BuildOptions,
    formatter: ValueFormatter,
}

impl ContextBuilder {
    pub fn new(store: Store, settings: Settings, options: BuildOptions) -> Self {
        let currency = match options.currency.as_deref() {
            Some(code) => CurrencyFormat::new(code, &options.locale),
            None => CurrencyFormat::from_settings(&settings, store.currency.as_deref(), &options.locale),
        };
        let formatter = ValueFormatter::new(&settings, currency, options.locale.clone());
        Self {
            store,
            settings,
            options,
            formatter,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn formatter(&self) -> &ValueFormatter {
        &self.formatter
    }

    pub fn locale(&self) -> &Locale {
        &self.options.locale
    }

    /// Build the context for one page render
    pub fn build(&self, page_type: &PageType, raw: &Map<String, Value>) -> VariableContext {
        log::debug!("Building {} context for store '{}'", page_type, self.store.slug);

        let base = self.base_context(page_type, raw);
        let page = match page_type {
            PageType::Category => self.category_page(raw),
            PageType::Product => self.product_page(raw),
            PageType::Cart => self.cart_page(raw),
            PageType::Header => self.header_page(raw),
            generic if generic.is_generic() => raw.clone(),
            unknown => {
                log::warn!("Unknown page type '{}', passing raw data through", unknown);
                raw.clone()
            }
        };

        VariableContext::from_layers(base, page).with_item_shadowing(self.options.item_keys_shadow)
    }

    /// Keys present on every page
    pub fn base_context(&self, page_type: &PageType, raw: &Map<String, Value>) -> Map<String, Value> {
        let mut base = Map::new();

        let mut store = Map::new();
        store.insert("name".to_string(), Value::from(self.store.name.clone()));
        store.insert("slug".to_string(), Value::from(self.store.slug.clone()));
        store.insert(
            "logo_url".to_string(),
            self.store.logo_url.clone().map(Value::from).unwrap_or(Value::Null),
        );
        store.insert(
            "code".to_string(),
            self.store.code.clone().map(Value::from).unwrap_or(Value::Null),
        );
        store.insert("url".to_string(), Value::from(self.store_url()));

        base.insert("store".to_string(), Value::Object(store));
        base.insert(
            "settings".to_string(),
            serde_json::to_value(&self.settings).unwrap_or(Value::Null),
        );
        base.insert("theme".to_string(), Value::Object(self.settings.theme.clone()));
        base.insert("current_language".to_string(), Value::from(self.locale().as_str()));
        base.insert("currency_code".to_string(), Value::from(self.formatter.currency().code.clone()));
        base.insert("store_url".to_string(), Value::from(self.store_url()));
        base.insert("page_type".to_string(), Value::from(page_type.as_str()));

        if let Some(user) = raw.get("user").filter(|user| !user.is_null()) {
            base.insert("user".to_string(), user.clone());
            base.insert("is_logged_in".to_string(), Value::Bool(is_truthy(user)));
        } else {
            base.insert("is_logged_in".to_string(), Value::Bool(false));
        }

        base
    }

    pub fn store_url(&self) -> String {
        format!("{}/{}", self.options.url_prefix.trim_end_matches('/'), self.store.slug)
    }

    pub fn product_url(&self, product: &Map<String, Value>) -> String {
        let handle = get_str(product, "slug")
            .map(str::to_string)
            .or_else(|| crate::utils::get_id(product, "id"))
            .unwrap_or_default();
        format!("{}/product/{}", self.store_url(), handle)
    }

    pub fn category_url(&self, category: &Map<String, Value>) -> String {
        let handle = get_str(category, "slug")
            .map(str::to_string)
            .or_else(|| crate::utils::get_id(category, "id"))
            .unwrap_or_default();
        format!("{}/category/{}", self.store_url(), handle)
    }

    /// Localized entity field: `translations[locale|language|en][field]`, then the raw field
    pub fn translated_field(&self, entity: &Map<String, Value>, field: &str) -> String {
        translated_field(entity, field, self.locale())
    }

    fn category_page(&self, raw: &Map<String, Value>) -> Map<String, Value> {
        let mut page = raw.clone();

        if let Some(Value::Object(category)) = raw.get("category") {
            let mut category = category.clone();
            let name = translated_field(&category, "name", self.locale());
            let description = translated_field(&category, "description", self.locale());
            let url = self.category_url(&category);
            category.insert("name".to_string(), Value::from(name));
            category.insert("description".to_string(), Value::from(description));
            category.insert("url".to_string(), Value::from(url));
            page.insert("category".to_string(), Value::Object(category));
        }

        let products = self.format_products(array(raw, "products"));
        page.insert("products".to_string(), Value::Array(products));

        let subcategories: Vec<Value> = array(raw, "subcategories")
            .iter()
            .filter_map(Value::as_object)
            .map(|category| Value::Object(self.decorate_category(category)))
            .collect();
        page.insert("subcategories".to_string(), Value::Array(subcategories));
        page.insert(
            "breadcrumbs".to_string(),
            Value::Array(self.format_breadcrumbs(array(raw, "breadcrumbs"))),
        );

        let all_products = match raw.get("allProducts") {
            Some(Value::Array(all)) => all.as_slice(),
            _ => array(raw, "products"),
        };
        let empty = Map::new();
        let selected = raw
            .get("selectedFilters")
            .and_then(Value::as_object)
            .unwrap_or(&empty);
        let filters = format_filters(
            raw.get("filters"),
            array(raw, "filterableAttributes"),
            self.locale(),
            all_products,
            selected,
        );
        page.insert("filters".to_string(), filters);

        let pagination = Pagination::from_raw(raw.get("pagination"), all_products.len());
        page.insert("product_count_text".to_string(), Value::from(pagination.text()));
        page.insert("pagination".to_string(), pagination.to_value());

        if let Some(sort_by) = raw.get("sortBy").or_else(|| raw.get("sort_by")) {
            page.insert("sort_by".to_string(), sort_by.clone());
        }

        page
    }

    fn product_page(&self, raw: &Map<String, Value>) -> Map<String, Value> {
        let mut page = raw.clone();

        if let Some(Value::Object(product)) = raw.get("product") {
            page.insert("product".to_string(), Value::Object(self.format_product(product)));
        }
        let related = self.format_products(array(raw, "relatedProducts"));
        page.insert("related_products".to_string(), Value::Array(related));
        page.insert(
            "breadcrumbs".to_string(),
            Value::Array(self.format_breadcrumbs(array(raw, "breadcrumbs"))),
        );
        if let Some(Value::Object(category)) = raw.get("category") {
            page.insert("category".to_string(), Value::Object(self.decorate_category(category)));
        }

        page
    }

    fn decorate_category(&self, category: &Map<String, Value>) -> Map<String, Value> {
        let mut decorated = category.clone();
        decorated.insert(
            "name".to_string(),
            Value::from(translated_field(category, "name", self.locale())),
        );
        decorated.insert("url".to_string(), Value::from(self.category_url(category)));
        decorated
    }

    /// Breadcrumbs get translated names; entries without a URL are taken as categories
    fn format_breadcrumbs(&self, crumbs: &[Value]) -> Vec<Value> {
        let last = crumbs.len().saturating_sub(1);
        crumbs
            .iter()
            .enumerate()
            .filter_map(|(idx, crumb)| {
                let crumb = crumb.as_object()?;
                let mut decorated = crumb.clone();
                decorated.insert(
                    "name".to_string(),
                    Value::from(translated_field(crumb, "name", self.locale())),
                );
                if get_str(crumb, "url").is_none() && (crumb.contains_key("slug") || crumb.contains_key("id")) {
                    decorated.insert("url".to_string(), Value::from(self.category_url(crumb)));
                }
                decorated.insert("is_last".to_string(), Value::Bool(idx == last));
                Some(Value::Object(decorated))
            })
            .collect()
    }
}

/// Array under `key`, empty when missing or not an array
pub(crate) fn array<'a>(raw: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    match raw.get(key) {
        Some(Value::Array(items)) => items.as_slice(),
        _ => &[],
    }
}

/// Localized entity field with fallback to English and then the raw value
pub fn translated_field(entity: &Map<String, Value>, field: &str, locale: &Locale) -> String {
    if let Some(Value::Object(translations)) = entity.get("translations") {
        let candidates = [locale.as_str().to_string(), locale.language(), DEFAULT_LANGUAGE.to_string()];
        let found = candidates.iter().find_map(|lang| {
            translations
                .get(lang)
                .and_then(Value::as_object)
                .and_then(|table| get_str(table, field))
        });
        if let Some(text) = found {
            return text.to_string();
        }
    }
    get_str(entity, field).map(str::to_string).unwrap_or_default()
}
