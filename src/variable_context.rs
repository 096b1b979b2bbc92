//! Layered variable context and path resolution
//!
//! A context is a stack of scopes searched from the innermost outwards:
//! - base context (store, settings, theme, language)
//! - page data produced by the context builder
//! - loop iteration scope (`this`, `@index`, `@first`, `@last`)
//! - the loop item's own keys
//!
//! Paths are dotted and may index arrays: `products.0.name`, `a[0]`, `a.[0]`.

use serde_json::{Map, Value};
use std::borrow::Cow;

/// Variable scope levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableScope {
    Base,
    Page,
    Iteration,
    Item,
}

#[derive(Debug, Clone)]
pub struct ScopeFrame {
    pub scope: VariableScope,
    pub vars: Map<String, Value>,
}

/// Path -> value mapping available while rendering one slot
#[derive(Debug, Clone)]
pub struct VariableContext {
    frames: Vec<ScopeFrame>,
    // Loop item keys outrank every other scope when set
    item_keys_shadow: bool,
}

impl VariableContext {
    pub fn new() -> Self {
        Self {
            frames: vec![ScopeFrame {
                scope: VariableScope::Base,
                vars: Map::new(),
            }],
            item_keys_shadow: true,
        }
    }

    /// Base context overlaid with page data
    pub fn from_layers(base: Map<String, Value>, page: Map<String, Value>) -> Self {
        let mut context = Self::new();
        context.frames[0].vars = base;
        context.push_scope(VariableScope::Page, page);
        context
    }

    /// Whether a loop item's own keys may shadow context keys such as `settings`
    pub fn with_item_shadowing(mut self, enabled: bool) -> Self {
        self.item_keys_shadow = enabled;
        self
    }

    pub fn push_scope(&mut self, scope: VariableScope, vars: Map<String, Value>) {
        self.frames.push(ScopeFrame { scope, vars });
    }

    /// Pop the innermost scope; the base scope always stays
    pub fn pop_scope(&mut self) -> Option<ScopeFrame> {
        if self.frames.len() <= 1 {
            return None;
        }
        self.frames.pop()
    }

    /// Insert into the innermost scope
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.vars.insert(key.into(), value);
        }
    }

    /// Look up a top-level key, innermost scope first
    pub fn get(&self, key: &str) -> Option<&Value> {
        if self.item_keys_shadow {
            return self.frames.iter().rev().find_map(|frame| frame.vars.get(key));
        }

        self.frames
            .iter()
            .rev()
            .filter(|frame| frame.scope != VariableScope::Item)
            .chain(
                self.frames
                    .iter()
                    .rev()
                    .filter(|frame| frame.scope == VariableScope::Item),
            )
            .find_map(|frame| frame.vars.get(key))
    }

    /// Resolve a dotted path
    pub fn resolve(&self, path: &str) -> Option<&Value> {
        let path = normalize_path(path);
        if path.is_empty() {
            return None;
        }

        // Keys may themselves contain dots
        if let Some(value) = self.get(&path) {
            return Some(value);
        }

        let mut segments = path.split('.').filter(|s| !s.is_empty());
        let head = self.get(segments.next()?)?;
        segments.try_fold(head, |current, segment| step(current, segment))
    }

    /// Object holding the last segment of `path` (`product` for `product.stock_status`)
    pub fn resolve_owner(&self, path: &str) -> Option<&Map<String, Value>> {
        let path = normalize_path(path);
        let (parent, _) = path.rsplit_once('.')?;
        self.resolve(parent)?.as_object()
    }

    /// Collapse all scopes into one map, honouring shadowing rules
    pub fn flatten(&self) -> Map<String, Value> {
        let mut merged = Map::new();
        let (items, others): (Vec<_>, Vec<_>) = self
            .frames
            .iter()
            .partition(|frame| frame.scope == VariableScope::Item);

        let ordered: Vec<&ScopeFrame> = if self.item_keys_shadow {
            self.frames.iter().collect()
        } else {
            items.into_iter().chain(others).collect()
        };

        for frame in ordered {
            for (key, value) in &frame.vars {
                merged.insert(key.clone(), value.clone());
            }
        }
        merged
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.flatten())
    }
}

impl Default for VariableContext {
    fn default() -> Self {
        Self::new()
    }
}

fn step<'v>(current: &'v Value, segment: &str) -> Option<&'v Value> {
    match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|idx| items.get(idx)),
        _ => None,
    }
}

/// `a[0].b` and `a.[0].b` -> `a.0.b`
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    let trimmed = path.trim();
    if !trimmed.contains('[') {
        return Cow::Borrowed(trimmed);
    }
    Cow::Owned(
        trimmed
            .replace(".[", ".")
            .replace('[', ".")
            .replace(']', ""),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn context() -> VariableContext {
        VariableContext::from_layers(
            map(json!({ "store": { "name": "Shop" }, "settings": { "theme": "dark" }, "title": "Base" })),
            map(json!({ "title": "Page", "products": [{ "name": "Mug", "tags": ["a", "b"] }] })),
        )
    }

    #[test]
    fn test_variable_scoping() {
        let mut ctx = context();
        assert_eq!(ctx.resolve("title"), Some(&json!("Page")));

        ctx.push_scope(VariableScope::Iteration, map(json!({ "this": "x", "@index": 0 })));
        assert_eq!(ctx.resolve("this"), Some(&json!("x")));
        assert_eq!(ctx.resolve("store.name"), Some(&json!("Shop")));

        ctx.pop_scope().unwrap();
        assert!(ctx.resolve("this").is_none());

        ctx.pop_scope().unwrap();
        assert!(ctx.pop_scope().is_none());
        assert_eq!(ctx.resolve("title"), Some(&json!("Base")));
    }

    #[test]
    fn test_index_syntax() {
        let ctx = context();
        assert_eq!(ctx.resolve("products.0.name"), Some(&json!("Mug")));
        assert_eq!(ctx.resolve("products[0].name"), Some(&json!("Mug")));
        assert_eq!(ctx.resolve("products.[0].tags.[1]"), Some(&json!("b")));
        assert!(ctx.resolve("products.5.name").is_none());
        assert!(ctx.resolve("title.length").is_none());
    }

    #[test]
    fn test_dotted_keys() {
        let mut ctx = VariableContext::new();
        ctx.set("product.price_formatted", json!("$1.00"));
        assert_eq!(ctx.resolve("product.price_formatted"), Some(&json!("$1.00")));
    }

    #[test]
    fn test_item_keys_shadow_context() {
        let mut ctx = context();
        ctx.push_scope(VariableScope::Iteration, map(json!({ "this": { "settings": "item" } })));
        ctx.push_scope(VariableScope::Item, map(json!({ "settings": "item" })));

        assert_eq!(ctx.resolve("settings"), Some(&json!("item")));
        assert_eq!(ctx.flatten()["settings"], json!("item"));

        let ctx = ctx.with_item_shadowing(false);
        assert_eq!(ctx.resolve("settings.theme"), Some(&json!("dark")));
        assert_eq!(ctx.resolve("this.settings"), Some(&json!("item")));
        assert_eq!(ctx.flatten()["settings"], json!({ "theme": "dark" }));
    }

    #[test]
    fn test_resolve_owner() {
        let ctx = context();
        let owner = ctx.resolve_owner("products.0.stock_status").unwrap();
        assert_eq!(owner.get("name"), Some(&json!("Mug")));
        assert!(ctx.resolve_owner("title").is_none());
    }
}
