//! Condition evaluation for `{{#if}}` / `{{#unless}}`
//!
//! Recognised forms, tried in order:
//! 1. `(eq path "literal")`
//! 2. `(gt path number)`
//! 3. infix comparison with `>=`, `<=`, `>`, `<`, `==`, `!=`
//!    (`===` / `!==` read as their loose forms)
//! 4. truthiness of a path

use crate::utils::{as_number, is_truthy, scalar_to_string};
use crate::variable_context::VariableContext;
use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;

// Strict forms first so `!==` is not split at its `==`
const INFIX_OPERATORS: [&str; 8] = ["===", "!==", ">=", "<=", ">", "<", "==", "!="];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    GreaterOrEqual,
    LessOrEqual,
    Greater,
    Less,
    Equal,
    NotEqual,
}

impl Comparison {
    fn from_operator(op: &str) -> Option<Self> {
        match op {
            ">=" => Some(Comparison::GreaterOrEqual),
            "<=" => Some(Comparison::LessOrEqual),
            ">" => Some(Comparison::Greater),
            "<" => Some(Comparison::Less),
            "==" | "===" => Some(Comparison::Equal),
            "!=" | "!==" => Some(Comparison::NotEqual),
            _ => None,
        }
    }
}

/// Parsed condition, kept separate from evaluation for testing and reuse
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq { path: String, literal: String },
    Gt { path: String, threshold: Option<f64> },
    Compare { left: String, op: Comparison, right: String },
    Truthy(String),
}

pub struct ConditionEvaluator {
    eq_regex: Regex,
    gt_regex: Regex,
}

impl ConditionEvaluator {
    pub fn new() -> Self {
        Self {
            eq_regex: Regex::new(r#"^\(\s*eq\s+(\S+)\s+(?:"([^"]*)"|'([^']*)'|(\S+?))\s*\)$"#).unwrap(),
            gt_regex: Regex::new(r"^\(\s*gt\s+(\S+)\s+(\S+?)\s*\)$").unwrap(),
        }
    }

    pub fn parse(&self, condition: &str) -> Condition {
        let condition = condition.trim();

        if let Some(caps) = self.eq_regex.captures(condition) {
            let literal = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            return Condition::Eq {
                path: caps[1].to_string(),
                literal,
            };
        }

        if let Some(caps) = self.gt_regex.captures(condition) {
            return Condition::Gt {
                path: caps[1].to_string(),
                threshold: caps[2].trim().parse::<f64>().ok(),
            };
        }

        for op in INFIX_OPERATORS {
            if let Some((left, right)) = condition.split_once(op) {
                let (left, right) = (left.trim(), right.trim());
                if left.is_empty() || right.is_empty() {
                    continue;
                }
                if let Some(op) = Comparison::from_operator(op) {
                    return Condition::Compare {
                        left: left.to_string(),
                        op,
                        right: right.to_string(),
                    };
                }
            }
        }

        Condition::Truthy(condition.to_string())
    }

    pub fn evaluate(&self, condition: &str, ctx: &VariableContext) -> bool {
        match self.parse(condition) {
            Condition::Eq { path, literal } => ctx
                .resolve(&path)
                .and_then(scalar_to_string)
                .map(|value| value == literal)
                .unwrap_or(false),
            Condition::Gt { path, threshold } => {
                let value = ctx.resolve(&path).and_then(as_number);
                matches!((value, threshold), (Some(v), Some(t)) if v > t)
            }
            Condition::Compare { left, op, right } => {
                compare(&operand(&left, ctx), op, &operand(&right, ctx))
            }
            Condition::Truthy(path) => ctx.resolve(&path).map(is_truthy).unwrap_or(false),
        }
    }
}

impl Default for ConditionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// Numeric and quoted literals stand for themselves, anything else is a path
fn operand(token: &str, ctx: &VariableContext) -> Value {
    if let Ok(n) = token.parse::<f64>() {
        return serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null);
    }

    for quote in ['"', '\''] {
        if token.len() >= 2 && token.starts_with(quote) && token.ends_with(quote) {
            return Value::String(token[1..token.len() - 1].to_string());
        }
    }

    match token {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        path => ctx.resolve(path).cloned().unwrap_or(Value::Null),
    }
}

fn compare(left: &Value, op: Comparison, right: &Value) -> bool {
    match op {
        Comparison::Equal => loosely_equal(left, right),
        Comparison::NotEqual => !loosely_equal(left, right),
        _ => match order(left, right) {
            Some(ordering) => match op {
                Comparison::GreaterOrEqual => ordering != Ordering::Less,
                Comparison::LessOrEqual => ordering != Ordering::Greater,
                Comparison::Greater => ordering == Ordering::Greater,
                Comparison::Less => ordering == Ordering::Less,
                Comparison::Equal | Comparison::NotEqual => false,
            },
            None => false,
        },
    }
}

fn order(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Some(l), Some(r)) = (as_number(left), as_number(right)) {
        return l.partial_cmp(&r);
    }
    match (left, right) {
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

fn loosely_equal(left: &Value, right: &Value) -> bool {
    if left.is_null() || right.is_null() {
        return left.is_null() && right.is_null();
    }
    if let (Some(l), Some(r)) = (as_number(left), as_number(right)) {
        return l == r;
    }
    match (scalar_to_string(left), scalar_to_string(right)) {
        (Some(l), Some(r)) => l == r,
        _ => left == right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> VariableContext {
        let page = json!({
            "product": { "type": "simple", "stock_quantity": 3, "price": "19.99", "tags": [] },
            "cart": { "count": 0 },
            "user": { "name": "Ada" },
            "limit": 3
        });
        VariableContext::from_layers(Default::default(), page.as_object().cloned().unwrap())
    }

    #[test]
    fn test_parse_forms() {
        let evaluator = ConditionEvaluator::new();
        assert_eq!(
            evaluator.parse(r#"(eq product.type "simple")"#),
            Condition::Eq { path: "product.type".to_string(), literal: "simple".to_string() }
        );
        assert_eq!(
            evaluator.parse("(gt cart.count 2)"),
            Condition::Gt { path: "cart.count".to_string(), threshold: Some(2.0) }
        );
        assert_eq!(
            evaluator.parse("a != b"),
            Condition::Compare { left: "a".to_string(), op: Comparison::NotEqual, right: "b".to_string() }
        );
        assert_eq!(
            evaluator.parse("product.type !== 'bundle'"),
            Condition::Compare {
                left: "product.type".to_string(),
                op: Comparison::NotEqual,
                right: "'bundle'".to_string()
            }
        );
        assert_eq!(evaluator.parse(" user.name "), Condition::Truthy("user.name".to_string()));
    }

    #[test]
    fn test_eq_helper() {
        let evaluator = ConditionEvaluator::new();
        let ctx = ctx();
        assert!(evaluator.evaluate(r#"(eq product.type "simple")"#, &ctx));
        assert!(evaluator.evaluate("(eq product.type 'simple')", &ctx));
        assert!(!evaluator.evaluate(r#"(eq product.type "bundle")"#, &ctx));
        assert!(evaluator.evaluate(r#"(eq product.stock_quantity "3")"#, &ctx));
        assert!(!evaluator.evaluate(r#"(eq missing "x")"#, &ctx));
    }

    #[test]
    fn test_gt_helper() {
        let evaluator = ConditionEvaluator::new();
        let ctx = ctx();
        assert!(evaluator.evaluate("(gt product.stock_quantity 2)", &ctx));
        assert!(!evaluator.evaluate("(gt product.stock_quantity 3)", &ctx));
        assert!(evaluator.evaluate("(gt product.price 10)", &ctx));
        assert!(!evaluator.evaluate("(gt cart.count abc)", &ctx));
    }

    #[test]
    fn test_infix_comparisons() {
        let evaluator = ConditionEvaluator::new();
        let ctx = ctx();
        assert!(evaluator.evaluate("product.stock_quantity >= 3", &ctx));
        assert!(evaluator.evaluate("product.stock_quantity <= limit", &ctx));
        assert!(!evaluator.evaluate("product.stock_quantity > limit", &ctx));
        assert!(evaluator.evaluate("cart.count < 1", &ctx));
        assert!(evaluator.evaluate("product.stock_quantity == 3", &ctx));
        assert!(evaluator.evaluate("product.type === 'simple'", &ctx));
        assert!(evaluator.evaluate("product.type != 'bundle'", &ctx));
        assert!(evaluator.evaluate("product.type !== 'bundle'", &ctx));
        assert!(!evaluator.evaluate("product.type !== 'simple'", &ctx));
        assert!(!evaluator.evaluate("product.type === 'bundle'", &ctx));
        assert!(!evaluator.evaluate("missing > 0", &ctx));
        assert!(evaluator.evaluate("missing == null", &ctx));
    }

    #[test]
    fn test_truthiness() {
        let evaluator = ConditionEvaluator::new();
        let ctx = ctx();
        assert!(evaluator.evaluate("user.name", &ctx));
        assert!(!evaluator.evaluate("cart.count", &ctx));
        assert!(!evaluator.evaluate("product.tags", &ctx));
        assert!(!evaluator.evaluate("nothing.here", &ctx));
    }
}
