//! Template interpreter
//!
//! Evaluates a parsed [`Template`] against a [`VariableContext`]. The
//! interpreter only holds read-only formatting rules, a translation catalog
//! and the active locale, so one instance can serve any number of slots.

use crate::ast::{ConditionalBlock, LoopBlock, Template, TemplateNode};
use crate::condition::ConditionEvaluator;
use crate::formatters::{CurrencyFormat, ValueFormatter};
use crate::parser::parse_inline_variables;
use crate::translations::TranslationCatalog;
use crate::types::{Locale, Settings, Store, MAX_LOOP_DEPTH, STOCK_STATUS_PLACEHOLDER};
use crate::utils::{as_number, escape_html, is_blank, is_truthy, scalar_to_string};
use crate::variable_context::{normalize_path, VariableContext, VariableScope};
use serde_json::{Map, Value};

/// Rendered variable text and whether it still needs escaping
enum Output {
    Text(String),
    Markup(String),
}

pub struct Interpreter {
    formatter: ValueFormatter,
    catalog: TranslationCatalog,
    conditions: ConditionEvaluator,
}

impl Interpreter {
    pub fn new(formatter: ValueFormatter, catalog: TranslationCatalog) -> Self {
        Self {
            formatter,
            catalog,
            conditions: ConditionEvaluator::new(),
        }
    }

    /// Interpreter for one store and locale, with currency picked from
    /// `currency`, then settings, then the store
    pub fn from_settings(settings: &Settings, store: &Store, locale: Locale, currency: Option<&str>) -> Self {
        let currency = match currency {
            Some(code) => CurrencyFormat::new(code, &locale),
            None => CurrencyFormat::from_settings(settings, store.currency.as_deref(), &locale),
        };
        let formatter = ValueFormatter::new(settings, currency, locale);
        Self::new(formatter, TranslationCatalog::from_settings(&settings.ui_translations))
    }

    pub fn locale(&self) -> &Locale {
        self.formatter.locale()
    }

    pub fn formatter(&self) -> &ValueFormatter {
        &self.formatter
    }

    pub fn catalog(&self) -> &TranslationCatalog {
        &self.catalog
    }

    /// Parse and render a template string
    pub fn render(&self, template: &str, ctx: &VariableContext) -> String {
        if !template.contains("{{") {
            return template.to_string();
        }
        self.render_template(&Template::parse(template), ctx)
    }

    /// Render an already parsed template
    pub fn render_template(&self, template: &Template, ctx: &VariableContext) -> String {
        let mut scope = ctx.clone();
        let mut out = String::new();
        self.render_nodes(&template.nodes, &mut scope, 0, &mut out);
        out
    }

    pub fn evaluate_condition(&self, condition: &str, ctx: &VariableContext) -> bool {
        self.conditions.evaluate(condition, ctx)
    }

    /// `{{t 'key'}}` text before inline variable substitution
    pub fn translate(&self, key: &str) -> String {
        self.catalog.translate(key, self.formatter.locale())
    }

    fn render_nodes(&self, nodes: &[TemplateNode], ctx: &mut VariableContext, depth: usize, out: &mut String) {
        for node in nodes {
            match node {
                TemplateNode::Text(text) => out.push_str(text),
                TemplateNode::Variable { path, raw } => self.render_variable(path, *raw, ctx, out),
                TemplateNode::Translation { key } => self.render_translation(key, ctx, out),
                TemplateNode::Loop(block) => self.render_loop(block, ctx, depth, out),
                TemplateNode::Conditional(block) => self.render_conditional(block, ctx, depth, out),
            }
        }
    }

    fn render_loop(&self, block: &LoopBlock, ctx: &mut VariableContext, depth: usize, out: &mut String) {
        if depth >= MAX_LOOP_DEPTH {
            log::warn!(
                "Loop nesting deeper than {} at line {}, leaving '{{{{#each {}}}}}' unexpanded",
                MAX_LOOP_DEPTH,
                block.line,
                block.path
            );
            out.push_str(&block.source);
            return;
        }

        let items = match ctx.resolve(&block.path) {
            Some(Value::Array(items)) if !items.is_empty() => items.clone(),
            _ => return,
        };

        let last = items.len() - 1;
        for (index, item) in items.into_iter().enumerate() {
            let mut iteration = Map::new();
            iteration.insert("@index".to_string(), Value::from(index));
            iteration.insert("@first".to_string(), Value::Bool(index == 0));
            iteration.insert("@last".to_string(), Value::Bool(index == last));
            let fields = match &item {
                Value::Object(fields) => Some(fields.clone()),
                _ => None,
            };
            iteration.insert("this".to_string(), item);

            ctx.push_scope(VariableScope::Iteration, iteration);
            let frames = match fields {
                Some(fields) => {
                    ctx.push_scope(VariableScope::Item, fields);
                    2
                }
                None => 1,
            };

            self.render_nodes(&block.body, ctx, depth + 1, out);

            for _ in 0..frames {
                ctx.pop_scope();
            }
        }
    }

    fn render_conditional(&self, block: &ConditionalBlock, ctx: &mut VariableContext, depth: usize, out: &mut String) {
        let holds = self.conditions.evaluate(&block.condition, ctx) != block.negated;
        let branch = if holds { &block.then_branch } else { &block.else_branch };
        self.render_nodes(branch, ctx, depth, out);
    }

    fn render_translation(&self, key: &str, ctx: &mut VariableContext, out: &mut String) {
        let text = self.translate(key);
        if !text.contains("{{") {
            out.push_str(&text);
            return;
        }
        for node in parse_inline_variables(&text) {
            match node {
                TemplateNode::Variable { path, raw } => self.render_variable(&path, raw, ctx, out),
                TemplateNode::Text(text) => out.push_str(&text),
                _ => {}
            }
        }
    }

    fn render_variable(&self, path: &str, raw: bool, ctx: &VariableContext, out: &mut String) {
        match self.variable_output(path, ctx) {
            Output::Markup(markup) => out.push_str(&markup),
            Output::Text(text) if raw => out.push_str(&text),
            Output::Text(text) => out.push_str(&escape_html(&text)),
        }
    }

    fn variable_output(&self, path: &str, ctx: &VariableContext) -> Output {
        let path = normalize_path(path);
        match path.as_ref() {
            "product.stock_status" => Output::Markup(STOCK_STATUS_PLACEHOLDER.to_string()),
            "product.compare_price_formatted" => {
                Output::Text(self.product_price(ctx, "compare_price", "compare_price_formatted"))
            }
            "product.price_formatted" => Output::Text(self.product_price(ctx, "price", "price_formatted")),
            "product.short_description" => {
                let short = ctx.resolve("product.short_description");
                let value = if is_blank(short) {
                    ctx.resolve("product.description")
                } else {
                    short
                };
                Output::Text(value.map(|v| self.formatter.format_value(v, &path, None)).unwrap_or_default())
            }
            other => Output::Text(match ctx.resolve(other) {
                Some(value) => self.formatter.format_value(value, other, ctx.resolve_owner(other)),
                // Stock text is derived from the owning product when the key is absent
                None if other.contains("stock_status") => {
                    self.formatter.format_value(&Value::Null, other, stock_owner(ctx, other))
                }
                None => String::new(),
            }),
        }
    }

    /// Formatted product price; empty unless the raw price is truthy
    fn product_price(&self, ctx: &VariableContext, price_key: &str, formatted_key: &str) -> String {
        let Some(product) = ctx.resolve("product").and_then(Value::as_object) else {
            return String::new();
        };
        let Some(price) = product.get(price_key).filter(|value| is_truthy(value)) else {
            return String::new();
        };

        if let Some(formatted) = product.get(formatted_key).and_then(Value::as_str) {
            if !is_placeholder(formatted) {
                return formatted.to_string();
            }
        }

        match as_number(price) {
            Some(amount) => self.formatter.format_price(amount),
            None => scalar_to_string(price).unwrap_or_default(),
        }
    }
}

/// Unfilled or unresolved display strings
fn is_placeholder(text: &str) -> bool {
    let text = text.trim();
    text.is_empty() || text.contains("{{") || text == "undefined" || text == "null"
}

/// Object owning a `*.stock_status` path; a bare key inside a loop belongs to `this`
fn stock_owner<'a>(ctx: &'a VariableContext, path: &str) -> Option<&'a Map<String, Value>> {
    if path.contains('.') {
        ctx.resolve_owner(path)
    } else {
        ctx.resolve("this").and_then(Value::as_object)
    }
}
