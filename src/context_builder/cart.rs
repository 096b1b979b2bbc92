//! Cart line items and totals

use super::{array, translated_field, ContextBuilder};
use crate::utils::{as_number, get_number, get_str, scalar_to_string};
use serde_json::{Map, Value};

const TOTAL_FIELDS: [&str; 5] = ["subtotal", "discount", "tax", "shipping", "total"];

impl ContextBuilder {
    pub(super) fn cart_page(&self, raw: &Map<String, Value>) -> Map<String, Value> {
        let mut page = raw.clone();
        let cart = self.format_cart(raw);
        for (key, value) in cart.iter() {
            if key != "items" {
                page.insert(key.clone(), value.clone());
            }
        }
        if let Some(items) = cart.get("items") {
            page.insert("cart_items".to_string(), items.clone());
        }
        page.insert("cart".to_string(), Value::Object(cart));
        page
    }

    /// Line items plus aggregate totals as currency strings
    pub fn format_cart(&self, raw: &Map<String, Value>) -> Map<String, Value> {
        let source = raw.get("cartItems").or_else(|| raw.get("cart_items")).or_else(|| raw.get("items"));
        let items: Vec<Map<String, Value>> = match source {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_object)
                .map(|item| self.format_cart_item(item))
                .collect(),
            _ => Vec::new(),
        };

        let totals = raw.get("totals").and_then(Value::as_object);
        let total_of = |field: &str| -> Option<f64> {
            totals
                .and_then(|totals| get_number(totals, field))
                .or_else(|| get_number(raw, field))
        };

        let line_sum: f64 = items.iter().filter_map(|item| get_number(item, "line_total")).sum();
        let subtotal = total_of("subtotal").unwrap_or(line_sum);
        let discount = total_of("discount").unwrap_or(0.0);
        let tax = total_of("tax").unwrap_or(0.0);
        let shipping = total_of("shipping").unwrap_or(0.0);
        let total = total_of("total").unwrap_or(subtotal - discount + tax + shipping);
        let item_count: f64 = items.iter().filter_map(|item| get_number(item, "quantity")).sum();

        let mut cart = Map::new();
        for (field, amount) in TOTAL_FIELDS.iter().zip([subtotal, discount, tax, shipping, total]) {
            cart.insert(field.to_string(), Value::from(amount));
            cart.insert(
                format!("{}_formatted", field),
                Value::from(self.formatter().format_price(amount)),
            );
        }
        cart.insert("item_count".to_string(), Value::from(item_count as u64));
        cart.insert("is_empty".to_string(), Value::Bool(items.is_empty()));
        cart.insert(
            "items".to_string(),
            Value::Array(items.into_iter().map(Value::Object).collect()),
        );
        cart
    }

    pub fn format_cart_item(&self, item: &Map<String, Value>) -> Map<String, Value> {
        let empty = Map::new();
        let product = item.get("product").and_then(Value::as_object).unwrap_or(&empty);
        let mut display = item.clone();

        let name = Some(translated_field(product, "name", self.locale()))
            .filter(|name| !name.is_empty())
            .or_else(|| get_str(item, "name").map(str::to_string))
            .unwrap_or_default();

        let quantity = get_number(item, "quantity").unwrap_or(1.0);
        let unit_price = effective_unit_price(item, product);
        let options = selected_options(item);
        let options_price: f64 = options.iter().filter_map(|o| get_number(o, "price")).sum();
        let line_total = quantity * (unit_price + options_price);

        let image = if product.is_empty() { item } else { product };
        let mut image_url = self.image_url(image);
        if image_url == self.options().placeholder_image {
            image_url = self.image_url(item);
        }

        display.insert("name".to_string(), Value::from(name));
        display.insert("quantity".to_string(), Value::from(quantity));
        display.insert("unit_price".to_string(), Value::from(unit_price + options_price));
        display.insert(
            "unit_price_formatted".to_string(),
            Value::from(self.formatter().format_price(unit_price + options_price)),
        );
        display.insert("line_total".to_string(), Value::from(line_total));
        display.insert(
            "line_total_formatted".to_string(),
            Value::from(self.formatter().format_price(line_total)),
        );
        display.insert("image_url".to_string(), Value::from(image_url));
        display.insert("options_text".to_string(), Value::from(options_text(&options)));
        if !product.is_empty() {
            display.insert("url".to_string(), Value::from(self.product_url(product)));
        }
        display
    }
}

/// Item price, else the product's positive sale price, else the product price
fn effective_unit_price(item: &Map<String, Value>, product: &Map<String, Value>) -> f64 {
    get_number(item, "price")
        .or_else(|| get_number(product, "sale_price").filter(|price| *price > 0.0))
        .or_else(|| get_number(product, "price"))
        .unwrap_or(0.0)
}

fn selected_options(item: &Map<String, Value>) -> Vec<Map<String, Value>> {
    let options = item
        .get("selected_options")
        .or_else(|| item.get("selectedOptions"))
        .or_else(|| item.get("options"));
    match options {
        Some(Value::Array(options)) => options.iter().filter_map(Value::as_object).cloned().collect(),
        _ => Vec::new(),
    }
}

/// `Size: M, Color: Red`
fn options_text(options: &[Map<String, Value>]) -> String {
    options
        .iter()
        .filter_map(|option| {
            let value = option.get("value").and_then(scalar_to_string).filter(|v| !v.is_empty());
            match (get_str(option, "name"), value) {
                (Some(name), Some(value)) => Some(format!("{}: {}", name, value)),
                (None, Some(value)) => Some(value),
                (Some(name), None) => Some(name.to_string()),
                (None, None) => None,
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Raw cart item count for header badges
pub(super) fn cart_count(raw: &Map<String, Value>) -> u64 {
    if let Some(count) = raw.get("cartCount").or_else(|| raw.get("cart_count")).and_then(as_number) {
        return count.max(0.0) as u64;
    }
    let items = match raw.get("cartItems") {
        Some(Value::Array(_)) => array(raw, "cartItems"),
        _ => array(raw, "cart_items"),
    };
    items
        .iter()
        .filter_map(Value::as_object)
        .map(|item| get_number(item, "quantity").unwrap_or(1.0).max(0.0) as u64)
        .sum()
}
