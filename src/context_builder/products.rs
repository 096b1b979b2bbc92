//! Display product decoration

use super::{translated_field, ContextBuilder};
use crate::stock::is_product_out_of_stock;
use crate::utils::{as_flag, get_flag, get_number, get_str, is_truthy};
use serde_json::{Map, Value};

/// Price fields that get `_number` and `_formatted` variants
const PRICE_FIELDS: [&str; 4] = ["price", "compare_price", "original_price", "sale_price"];

impl ContextBuilder {
    pub fn format_products(&self, products: &[Value]) -> Vec<Value> {
        products
            .iter()
            .filter_map(Value::as_object)
            .map(|product| Value::Object(self.format_product(product)))
            .collect()
    }

    /// Decorate one raw product for display. The raw fields are kept.
    pub fn format_product(&self, product: &Map<String, Value>) -> Map<String, Value> {
        let mut display = product.clone();

        display.insert(
            "name".to_string(),
            Value::from(translated_field(product, "name", self.locale())),
        );
        for field in ["description", "short_description"] {
            if product.contains_key(field) {
                display.insert(
                    field.to_string(),
                    Value::from(translated_field(product, field, self.locale())),
                );
            }
        }

        for field in PRICE_FIELDS {
            let Some(amount) = get_number(product, field) else {
                continue;
            };
            // `price` is always shown, the others only when set
            if field != "price" && amount == 0.0 {
                continue;
            }
            display.insert(format!("{}_number", field), Value::from(amount));
            display.insert(
                format!("{}_formatted", field),
                Value::from(self.formatter().format_price(amount)),
            );
        }

        display.insert("image_url".to_string(), Value::from(self.image_url(product)));
        display.insert("url".to_string(), Value::from(self.product_url(product)));
        display.insert("in_stock".to_string(), Value::Bool(!is_product_out_of_stock(product)));
        display.insert(
            "stock_label".to_string(),
            self.formatter()
                .stock()
                .label(product)
                .and_then(|label| serde_json::to_value(label).ok())
                .unwrap_or(Value::Null),
        );
        display.insert("labels".to_string(), Value::Array(self.product_labels(product)));

        display
    }

    /// First usable image: `image_url`, `image`, then `images[0]` (string or `{url}`)
    pub fn image_url(&self, entity: &Map<String, Value>) -> String {
        let first_image = match entity.get("images") {
            Some(Value::Array(images)) => images.first().and_then(|image| match image {
                Value::String(url) => Some(url.as_str()),
                Value::Object(image) => get_str(image, "url"),
                _ => None,
            }),
            _ => None,
        };

        get_str(entity, "image_url")
            .or_else(|| get_str(entity, "image"))
            .or(first_image)
            .filter(|url| !url.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.options().placeholder_image.clone())
    }

    /// Promotional labels matching the product's flags, in catalog order
    pub fn product_labels(&self, product: &Map<String, Value>) -> Vec<Value> {
        let mut wanted = Vec::new();
        if get_flag(product, "is_new") {
            wanted.push("new");
        }
        if product.get("compare_price").map(is_truthy).unwrap_or(false) {
            wanted.push("sale");
        }
        if get_flag(product, "is_featured") {
            wanted.push("featured");
        }
        if wanted.is_empty() {
            return Vec::new();
        }

        self.settings()
            .product_labels
            .iter()
            .filter_map(Value::as_object)
            .filter(|label| label.get("is_active").map(as_flag).unwrap_or(true))
            .filter(|label| {
                ["type", "key", "slug"]
                    .iter()
                    .find_map(|key| get_str(label, key))
                    .map(|kind| wanted.contains(&kind.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .map(|label| {
                let mut label = label.clone();
                let text = translated_field(&label, "text", self.locale());
                if !text.is_empty() {
                    label.insert("text".to_string(), Value::from(text));
                }
                Value::Object(label)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::context_builder::tests::builder;
    use crate::types::PLACEHOLDER_IMAGE;
    use serde_json::{json, Map, Value};

    fn product(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_format_product_prices() {
        let builder = builder("en");
        let display = builder.format_product(&product(json!({
            "id": 3, "name": "Lamp", "price": "1299.5", "compare_price": 1500, "stock_quantity": 2
        })));

        assert_eq!(display["price_formatted"], json!("$1,299.50"));
        assert_eq!(display["price_number"], json!(1299.5));
        assert_eq!(display["compare_price_formatted"], json!("$1,500.00"));
        assert!(display.get("original_price_formatted").is_none());
        assert_eq!(display["in_stock"], json!(true));
        assert_eq!(display["url"], json!("/public/acme/product/3"));
    }

    #[test]
    fn test_translated_name() {
        let builder = builder("de-DE");
        let display = builder.format_product(&product(json!({
            "name": "Lamp", "translations": { "de": { "name": "Lampe" } }
        })));
        assert_eq!(display["name"], json!("Lampe"));
    }

    #[test]
    fn test_image_fallbacks() {
        let builder = builder("en");
        assert_eq!(builder.image_url(&product(json!({}))), PLACEHOLDER_IMAGE);
        assert_eq!(builder.image_url(&product(json!({ "image_url": " " }))), PLACEHOLDER_IMAGE);
        assert_eq!(builder.image_url(&product(json!({ "images": ["/a.jpg"] }))), "/a.jpg");
        assert_eq!(builder.image_url(&product(json!({ "images": [{ "url": "/b.jpg" }] }))), "/b.jpg");
        assert_eq!(
            builder.image_url(&product(json!({ "image_url": "/c.jpg", "images": ["/a.jpg"] }))),
            "/c.jpg"
        );
    }

    #[test]
    fn test_stock_fields() {
        let builder = builder("en");
        let display = builder.format_product(&product(json!({ "stock_quantity": 0 })));
        assert_eq!(display["in_stock"], json!(false));
        assert_eq!(display["stock_label"]["text"], json!("Out of Stock"));
        assert_eq!(display["stock_label"]["textColor"], json!("#991b1b"));
    }

    #[test]
    fn test_untracked_stock_is_in_stock() {
        let builder = builder("en");
        let display = builder.format_product(&product(json!({ "id": 1, "price": 5 })));
        assert_eq!(display["in_stock"], json!(true));
        assert_eq!(display["stock_label"]["text"], json!("In Stock"));
    }

    #[test]
    fn test_product_labels() {
        let builder = builder("en");
        let labels = builder.product_labels(&product(json!({ "is_new": true, "compare_price": 20 })));
        let texts: Vec<&str> = labels.iter().filter_map(|l| l["text"].as_str()).collect();
        assert_eq!(texts, vec!["New", "Sale"]);

        assert!(builder.product_labels(&product(json!({ "compare_price": 0 }))).is_empty());
    }
}
