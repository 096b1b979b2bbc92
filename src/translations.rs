//! UI translation lookup for `{{t 'key'}}`

use crate::types::{Locale, DEFAULT_LANGUAGE};
use crate::utils::humanize_key;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Read-only translation tables keyed by language tag
#[derive(Debug, Clone, Default)]
pub struct TranslationCatalog {
    tables: HashMap<String, Map<String, Value>>,
}

impl TranslationCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `ui_translations` settings block (`{ lang: { key: text } }`)
    pub fn from_settings(ui_translations: &Map<String, Value>) -> Self {
        let mut catalog = Self::new();
        for (lang, table) in ui_translations {
            match table {
                Value::Object(entries) => catalog.add_table(lang, entries.clone()),
                _ => log::debug!("Ignoring non-object translation table for '{}'", lang),
            }
        }
        catalog
    }

    pub fn add_table(&mut self, lang: &str, entries: Map<String, Value>) {
        self.tables
            .entry(lang.to_ascii_lowercase())
            .or_default()
            .extend(entries);
    }

    /// Lookup in one language: flat dotted key first, then nested objects
    pub fn lookup(&self, lang: &str, key: &str) -> Option<&str> {
        let table = self.tables.get(&lang.to_ascii_lowercase())?;

        if let Some(text) = table.get(key).and_then(Value::as_str) {
            return Some(text);
        }

        let mut parts = key.split('.');
        let mut current = table.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        current.as_str()
    }

    /// Active locale, then its base language, then English, then a humanized key
    pub fn translate(&self, key: &str, locale: &Locale) -> String {
        let key = key.trim();
        let candidates = [
            locale.as_str().to_string(),
            locale.language(),
            DEFAULT_LANGUAGE.to_string(),
        ];

        candidates
            .iter()
            .find_map(|lang| self.lookup(lang, key).filter(|text| !text.is_empty()))
            .map(str::to_string)
            .unwrap_or_else(|| humanize_key(key))
    }
}
