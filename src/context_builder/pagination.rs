//! Pagination state and the "x-y of z products" text

use crate::utils::as_number;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current_page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(current_page: u64, per_page: u64, total: u64) -> Self {
        let per_page = per_page.max(1);
        let total_pages = if total == 0 { 0 } else { total / per_page + u64::from(total % per_page != 0) };
        Self {
            current_page: current_page.max(1),
            per_page,
            total,
            total_pages,
        }
    }

    /// Read `{currentPage, itemsPerPage, total}` (snake_case accepted too).
    /// Without pagination data everything is on one page.
    pub fn from_raw(raw: Option<&Value>, fallback_total: usize) -> Self {
        let read = |keys: &[&str]| -> Option<u64> {
            let raw = raw?.as_object()?;
            keys.iter()
                .find_map(|key| raw.get(*key).and_then(as_number))
                .filter(|n| *n >= 0.0)
                .map(|n| n as u64)
        };

        let total = read(&["total", "totalItems", "total_items"]).unwrap_or(fallback_total as u64);
        let current_page = read(&["currentPage", "current_page", "page"]).unwrap_or(1);
        let per_page = read(&["itemsPerPage", "items_per_page", "per_page", "perPage"])
            .unwrap_or_else(|| total.max(1));
        Self::new(current_page, per_page, total)
    }

    pub fn start(&self) -> u64 {
        page_start(self.current_page, self.per_page)
    }

    pub fn end(&self) -> u64 {
        page_end(self.current_page, self.per_page, self.total)
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    pub fn text(&self) -> String {
        pagination_text(self.current_page, self.per_page, self.total)
    }

    pub fn to_value(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut value {
            map.insert("start".to_string(), Value::from(self.start().min(self.total)));
            map.insert("end".to_string(), Value::from(self.end()));
            map.insert("has_previous".to_string(), Value::Bool(self.has_previous()));
            map.insert("has_next".to_string(), Value::Bool(self.has_next()));
            map.insert(
                "previous_page".to_string(),
                if self.has_previous() { Value::from(self.current_page - 1) } else { Value::Null },
            );
            map.insert(
                "next_page".to_string(),
                if self.has_next() { Value::from(self.current_page.saturating_add(1)) } else { Value::Null },
            );
            map.insert("text".to_string(), Value::from(self.text()));
        }
        value
    }
}

/// `"No products found"`, `"<total> product(s)"` or `"<start>-<end> of <total> product(s)"`
pub fn pagination_text(current_page: u64, per_page: u64, total: u64) -> String {
    if total == 0 {
        return "No products found".to_string();
    }

    let current_page = current_page.max(1);
    let per_page = per_page.max(1);
    let noun = if total == 1 { "product" } else { "products" };
    let start = page_start(current_page, per_page);
    let end = page_end(current_page, per_page, total);

    if start <= 1 && end >= total {
        format!("{} {}", total, noun)
    } else {
        format!("{}-{} of {} {}", start, end, total, noun)
    }
}

// Saturating: page and size come straight from request data
fn page_start(current_page: u64, per_page: u64) -> u64 {
    current_page
        .max(1)
        .saturating_sub(1)
        .saturating_mul(per_page.max(1))
        .saturating_add(1)
}

fn page_end(current_page: u64, per_page: u64, total: u64) -> u64 {
    current_page.max(1).saturating_mul(per_page.max(1)).min(total)
}
