//! Slotkit: storefront slot templates
//!
//! Renders the small template expressions embedded in storefront page
//! layouts ("slots") against normalized page data.
//!
//! # Features
//!
//! - Handlebars-style directives: `{{path}}`, `{{{path}}}`, `{{#each}}`,
//!   `{{#if}}` / `{{#unless}}` with `{{else}}`, and `{{t 'key'}}`
//! - Malformed templates degrade to literal text instead of failing
//! - Page context building for category, product, cart and header pages
//! - Locale-aware currency, date and stock label formatting
//!
//! # Basic Usage
//!
//! ```rust
//! use slotkit::{BuildOptions, ContextBuilder, Interpreter, PageType, Settings, Store};
//! use serde_json::json;
//!
//! let store = Store { slug: "acme".into(), name: "Acme".into(), ..Store::default() };
//! let settings = Settings::default();
//! let options = BuildOptions::default();
//!
//! let builder = ContextBuilder::new(store.clone(), settings.clone(), options.clone());
//! let raw = json!({ "products": [{ "name": "Mug", "price": 12 }] });
//! let ctx = builder.build(&PageType::Category, raw.as_object().unwrap());
//!
//! let interpreter = Interpreter::from_settings(&settings, &store, options.locale.clone(), None);
//! let html = interpreter.render("{{#each products}}{{name}}: {{price_formatted}}{{/each}}", &ctx);
//! assert_eq!(html, "Mug: $12.00");
//! ```
//!
//! # Rendering Pipeline
//!
//! 1. **Context Builder** - merge raw page data with store and settings
//! 2. **Lexer** - split the template into text and directive tokens
//! 3. **Parser** - group blocks kind by kind into a small tree
//! 4. **Interpreter** - expand loops, pick branches, translate, substitute

pub mod types;
pub mod error;
pub mod utils;
pub mod lexer;
pub mod ast;
pub mod parser;
pub mod variable_context;
pub mod condition;
pub mod translations;
pub mod stock;
pub mod formatters;
pub mod interpreter;
pub mod context_builder;
pub mod cli;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Instant;

// Re-export commonly used types and functions
pub use error::{Result, SlotError};
pub use types::*;
pub use lexer::{BlockKind, Lexer, Token, TokenType};
pub use ast::{Diagnostic, Template, TemplateNode};
pub use parser::Parser;
pub use variable_context::{VariableContext, VariableScope};
pub use condition::ConditionEvaluator;
pub use translations::TranslationCatalog;
pub use stock::{available_quantity, is_product_out_of_stock, AvailableQuantity, StockLabel, StockLabeler};
pub use formatters::{CurrencyFormat, ValueFormatter};
pub use interpreter::Interpreter;
pub use context_builder::{BuildOptions, ContextBuilder, PriceFilter};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

pub const BUILD_INFO: SlotkitInfo = SlotkitInfo {
    version: VERSION,
    name: NAME,
    description: DESCRIPTION,
    supported_directives: &["variable", "raw-variable", "each", "if", "unless", "else", "t"],
};

#[derive(Debug, Clone)]
pub struct SlotkitInfo {
    pub version: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub supported_directives: &'static [&'static str],
}

/// Everything needed to render one slot: store, settings and the raw page data.
///
/// This is the JSON shape the CLI reads:
///
/// ```json
/// { "page_type": "category", "locale": "nl", "store": {..}, "settings": {..}, "data": {..} }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageBundle {
    pub page_type: String,
    pub locale: Option<String>,
    pub store: Store,
    pub settings: Settings,
    pub data: Map<String, Value>,
}

impl PageBundle {
    pub fn page_type(&self) -> PageType {
        let name = if self.page_type.trim().is_empty() { "other" } else { self.page_type.trim() };
        name.parse().unwrap_or_else(|_| PageType::Other(name.to_string()))
    }

    /// Bundle locale, then store default language, then `fallback`
    pub fn resolve_locale(&self, fallback: &Locale) -> Locale {
        self.locale
            .as_deref()
            .or(self.store.default_language.as_deref())
            .filter(|tag| !tag.trim().is_empty())
            .map(Locale::new)
            .unwrap_or_else(|| fallback.clone())
    }
}

/// Render statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct RenderStats {
    /// Template size in bytes
    pub template_size: usize,

    /// Rendered output size in bytes
    pub output_size: usize,

    /// Number of variable references in the template
    pub variable_count: usize,

    /// Unmatched directives left as literal text
    pub diagnostic_count: usize,

    pub render_time_ms: u64,
}

/// Output of a full page render
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub html: String,
    pub stats: RenderStats,
}

/// Build the page context for a bundle
pub fn build_context(bundle: &PageBundle, options: &BuildOptions) -> VariableContext {
    let options = options.clone().with_locale(bundle.resolve_locale(&options.locale));
    let builder = ContextBuilder::new(bundle.store.clone(), bundle.settings.clone(), options);
    builder.build(&bundle.page_type(), &bundle.data)
}

/// Render a template against a page bundle
pub fn render_page(template: &str, bundle: &PageBundle, options: &BuildOptions) -> RenderOutput {
    let start_time = Instant::now();
    let locale = bundle.resolve_locale(&options.locale);

    let parsed = Template::parse(template);
    for diagnostic in &parsed.diagnostics {
        log::warn!("line {}: {}", diagnostic.line, diagnostic.message);
    }

    let ctx = build_context(bundle, options);
    let interpreter = Interpreter::from_settings(&bundle.settings, &bundle.store, locale, options.currency.as_deref());
    let html = interpreter.render_template(&parsed, &ctx);

    let stats = RenderStats {
        template_size: template.len(),
        output_size: html.len(),
        variable_count: parsed.variable_paths().len(),
        diagnostic_count: parsed.diagnostics.len(),
        render_time_ms: start_time.elapsed().as_millis() as u64,
    };
    log::debug!("Rendered {} bytes in {}ms", stats.output_size, stats.render_time_ms);

    RenderOutput { html, stats }
}

/// Read a page bundle from a JSON file
pub fn load_bundle(path: impl AsRef<Path>) -> Result<PageBundle> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|e| SlotError::FileNotFound {
        path: format!("{}: {}", path.display(), e),
    })?;
    serde_json::from_str(&source)
        .map_err(|e| SlotError::context(format!("Invalid page bundle {}: {}", path.display(), e)))
}

/// Render a template file against a bundle file
pub fn render_file(template_path: &str, bundle_path: &str, options: &BuildOptions) -> Result<RenderOutput> {
    let template = std::fs::read_to_string(template_path).map_err(|e| SlotError::FileNotFound {
        path: format!("{}: {}", template_path, e),
    })?;
    let bundle = load_bundle(bundle_path)?;
    Ok(render_page(&template, &bundle, options))
}

/// Fail on the first unmatched directive
pub fn check_source(source: &str, filename: &str) -> Result<Template> {
    let template = Template::parse(source);
    match template.diagnostics.first() {
        Some(diagnostic) => Err(SlotError::template(filename, diagnostic.line, diagnostic.message.clone())),
        None => Ok(template),
    }
}

pub fn supports_directive(directive: &str) -> bool {
    BUILD_INFO.supported_directives.contains(&directive)
}

pub fn build_info() -> &'static SlotkitInfo {
    &BUILD_INFO
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn bundle() -> PageBundle {
        serde_json::from_value(json!({
            "page_type": "category",
            "locale": "de",
            "store": { "slug": "acme", "name": "Acme", "currency": "EUR" },
            "settings": { "ui_translations": { "de": { "add_to_cart": "In den Warenkorb" } } },
            "data": {
                "products": [
                    { "id": 1, "name": "Becher", "price": 1234.5 },
                    { "id": 2, "name": "Teller", "price": 8, "compare_price": 10 }
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_render_page() {
        let template = "{{product_count_text}}: {{#each products}}{{name}} {{price_formatted}}{{#unless @last}}, {{/unless}}{{/each}} [{{t 'add_to_cart'}}]";
        let output = render_page(template, &bundle(), &BuildOptions::default());
        assert_eq!(output.html, "2 products: Becher 1.234,50 €, Teller 8,00 € [In den Warenkorb]");
        assert_eq!(output.stats.diagnostic_count, 0);
        assert_eq!(output.stats.variable_count, 3);
    }

    #[test]
    fn test_bundle_locale_resolution() {
        let mut bundle = bundle();
        assert_eq!(bundle.resolve_locale(&Locale::default()).as_str(), "de");
        bundle.locale = None;
        assert!(bundle.resolve_locale(&Locale::default()).is_default());
        assert_eq!(bundle.page_type(), PageType::Category);
    }

    #[test]
    fn test_render_file() {
        let temp_dir = TempDir::new().unwrap();
        let template_path = temp_dir.path().join("slot.hbs");
        let bundle_path = temp_dir.path().join("page.json");
        fs::write(&template_path, "{{store.name}}").unwrap();
        fs::write(&bundle_path, serde_json::to_string(&bundle()).unwrap()).unwrap();

        let output = render_file(
            template_path.to_str().unwrap(),
            bundle_path.to_str().unwrap(),
            &BuildOptions::default(),
        )
        .unwrap();
        assert_eq!(output.html, "Acme");

        let missing = render_file("/nonexistent/slot.hbs", bundle_path.to_str().unwrap(), &BuildOptions::default());
        assert!(matches!(missing, Err(SlotError::FileNotFound { .. })));
    }

    #[test]
    fn test_check_source() {
        assert!(check_source("{{#if a}}x{{/if}}", "ok.hbs").is_ok());
        match check_source("a\n{{#each items}}x", "broken.hbs") {
            Err(SlotError::Template { file, line, .. }) => {
                assert_eq!(file, "broken.hbs");
                assert_eq!(line, 2);
            }
            other => panic!("Expected template error, got {:?}", other),
        }
    }

    #[test]
    fn test_build_info() {
        assert!(supports_directive("each"));
        assert!(!supports_directive("with"));
        assert_eq!(build_info().name, "slotkit");
    }
}
