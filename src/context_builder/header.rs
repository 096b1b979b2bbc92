//! Header context: category tree, language switcher and cart badge

use super::cart::cart_count;
use super::{array, translated_field, ContextBuilder};
use crate::types::DEFAULT_SORT_ORDER;
use crate::utils::{as_number, get_flag, get_id, get_str};
use serde_json::{Map, Value};
use std::collections::HashMap;

impl ContextBuilder {
    pub(super) fn header_page(&self, raw: &Map<String, Value>) -> Map<String, Value> {
        let mut page = raw.clone();

        page.insert("categories".to_string(), Value::Array(self.category_tree(array(raw, "categories"))));
        page.insert("languages".to_string(), Value::Array(self.languages(array(raw, "languages"))));
        page.insert("cart_count".to_string(), Value::from(cart_count(raw)));
        page.insert(
            "logo_url".to_string(),
            self.store().logo_url.clone().map(Value::from).unwrap_or(Value::Null),
        );
        page
    }

    /// Nest a flat category list by `parent_id`, siblings ordered by `sort_order`.
    ///
    /// Categories whose parent is missing from the list are treated as roots;
    /// inactive or hidden categories are left out.
    pub fn category_tree(&self, categories: &[Value]) -> Vec<Value> {
        let visible: Vec<&Map<String, Value>> = categories
            .iter()
            .filter_map(Value::as_object)
            .filter(|category| category.get("is_active").map(|_| get_flag(category, "is_active")).unwrap_or(true))
            .filter(|category| !get_flag(category, "hide_in_menu"))
            .collect();

        let ids: Vec<Option<String>> = visible.iter().map(|category| get_id(category, "id")).collect();
        let mut children: HashMap<Option<String>, Vec<usize>> = HashMap::new();
        for (idx, category) in visible.iter().enumerate() {
            let parent = get_id(category, "parent_id").filter(|parent| ids.contains(&Some(parent.clone())));
            children.entry(parent).or_default().push(idx);
        }
        for siblings in children.values_mut() {
            siblings.sort_by_key(|idx| sort_order(visible[*idx]));
        }

        let mut path = Vec::new();
        self.build_level(None, &visible, &ids, &children, &mut path)
    }

    fn build_level(
        &self,
        parent: Option<String>,
        visible: &[&Map<String, Value>],
        ids: &[Option<String>],
        children: &HashMap<Option<String>, Vec<usize>>,
        path: &mut Vec<usize>,
    ) -> Vec<Value> {
        let Some(indices) = children.get(&parent) else {
            return Vec::new();
        };

        indices
            .iter()
            .filter_map(|idx| {
                // Cycles in parent_id would recurse forever
                if path.contains(idx) {
                    log::warn!("Category parent cycle at {:?}, cutting tree", ids[*idx]);
                    return None;
                }
                path.push(*idx);
                let category = visible[*idx];
                let nested = match &ids[*idx] {
                    Some(id) => self.build_level(Some(id.clone()), visible, ids, children, path),
                    None => Vec::new(),
                };
                path.pop();

                let mut node = category.clone();
                node.insert(
                    "name".to_string(),
                    Value::from(translated_field(category, "name", self.locale())),
                );
                node.insert("url".to_string(), Value::from(self.category_url(category)));
                node.insert("has_children".to_string(), Value::Bool(!nested.is_empty()));
                node.insert("children".to_string(), Value::Array(nested));
                Some(Value::Object(node))
            })
            .collect()
    }

    /// Language switcher entries flagged with `is_current`
    pub fn languages(&self, languages: &[Value]) -> Vec<Value> {
        let current = self.locale();
        languages
            .iter()
            .filter_map(|language| {
                let mut entry = match language {
                    Value::String(code) => {
                        let mut entry = Map::new();
                        entry.insert("code".to_string(), Value::from(code.clone()));
                        entry
                    }
                    Value::Object(entry) => entry.clone(),
                    _ => return None,
                };
                let code = get_str(&entry, "code")?.to_string();
                let is_current = code.eq_ignore_ascii_case(current.as_str())
                    || code.eq_ignore_ascii_case(&current.language());
                entry.insert("is_current".to_string(), Value::Bool(is_current));
                if !entry.contains_key("name") {
                    entry.insert("name".to_string(), Value::from(code.to_ascii_uppercase()));
                }
                Some(Value::Object(entry))
            })
            .collect()
    }
}

fn sort_order(category: &Map<String, Value>) -> i64 {
    category
        .get("sort_order")
        .and_then(as_number)
        .map(|n| n as i64)
        .unwrap_or(DEFAULT_SORT_ORDER)
}

#[cfg(test)]
mod tests {
    use crate::context_builder::tests::builder;
    use crate::types::PageType;
    use serde_json::{json, Map, Value};

    fn names(nodes: &Value) -> Vec<&str> {
        nodes.as_array().unwrap().iter().map(|n| n["name"].as_str().unwrap()).collect()
    }

    #[test]
    fn test_category_tree() {
        let builder = builder("en");
        let categories = vec![
            json!({ "id": 1, "name": "Kitchen", "slug": "kitchen", "sort_order": 2 }),
            json!({ "id": 2, "name": "Mugs", "slug": "mugs", "parent_id": 1 }),
            json!({ "id": 3, "name": "Garden", "slug": "garden", "sort_order": 1 }),
            json!({ "id": 4, "name": "Plates", "slug": "plates", "parent_id": 1, "sort_order": 1 }),
            json!({ "id": 5, "name": "Hidden", "parent_id": 3, "is_active": false }),
            json!({ "id": 6, "name": "Orphan", "parent_id": 99 }),
        ];
        let tree = Value::Array(builder.category_tree(&categories));

        assert_eq!(names(&tree), vec!["Garden", "Kitchen", "Orphan"]);
        assert_eq!(names(&tree[1]["children"]), vec!["Plates", "Mugs"]);
        assert_eq!(tree[1]["url"], json!("/public/acme/category/kitchen"));
        assert_eq!(tree[0]["has_children"], json!(false));
    }

    #[test]
    fn test_parent_cycle_is_cut() {
        let builder = builder("en");
        let categories = vec![
            json!({ "id": 1, "name": "A", "parent_id": 2 }),
            json!({ "id": 2, "name": "B", "parent_id": 1 }),
        ];
        // Neither is a root, so nothing is reachable
        assert!(builder.category_tree(&categories).is_empty());
    }

    #[test]
    fn test_header_page() {
        let builder = builder("nl-NL");
        let raw: Map<String, Value> = json!({
            "languages": ["en", { "code": "nl", "name": "Nederlands" }],
            "cartItems": [{ "quantity": 2 }]
        })
        .as_object()
        .cloned()
        .unwrap();
        let ctx = builder.build(&PageType::Header, &raw);

        assert_eq!(ctx.resolve("languages.0.is_current"), Some(&json!(false)));
        assert_eq!(ctx.resolve("languages.1.is_current"), Some(&json!(true)));
        assert_eq!(ctx.resolve("languages.0.name"), Some(&json!("EN")));
        assert_eq!(ctx.resolve("cart_count"), Some(&json!(2)));
    }
}
