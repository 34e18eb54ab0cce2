//! List filtering and pagination shared by every collection endpoint

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PER_PAGE: u32 = 10;
pub const MAX_PER_PAGE: u32 = 100;

/// Sort instruction, already checked against a field whitelist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub field: String,
    pub descending: bool,
}

impl Default for Order {
    fn default() -> Self {
        Self {
            field: "id".to_string(),
            descending: false,
        }
    }
}

impl Order {
    /// Parse `field` or `-field`; fields outside `allowed` fall back to `id` ascending.
    pub fn parse(order_by: Option<&str>, allowed: &[&str]) -> Self {
        let Some(raw) = order_by.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::default();
        };

        let (field, descending) = match raw.strip_prefix('-') {
            Some(field) => (field, true),
            None => (raw, false),
        };

        if allowed.contains(&field) {
            Self {
                field: field.to_string(),
                descending,
            }
        } else {
            Self::default()
        }
    }

    pub fn direction(&self) -> &'static str {
        if self.descending {
            "DESC"
        } else {
            "ASC"
        }
    }
}

/// Normalized list query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub page: u32,
    pub per_page: u32,
    pub keyword: Option<String>,
    pub order: Order,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
            keyword: None,
            order: Order::default(),
        }
    }
}

impl Filter {
    pub fn new(
        page: Option<u32>,
        per_page: Option<u32>,
        keyword: Option<String>,
        order_by: Option<&str>,
        allowed: &[&str],
    ) -> Self {
        Self {
            page: page.filter(|p| *p > 0).unwrap_or(DEFAULT_PAGE),
            per_page: per_page
                .filter(|p| *p > 0)
                .unwrap_or(DEFAULT_PER_PAGE)
                .min(MAX_PER_PAGE),
            keyword: keyword
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            order: Order::parse(order_by, allowed),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.per_page)
    }

    /// Case-insensitive keyword match against any of `fields`
    pub fn matches_keyword<'a>(&self, fields: impl IntoIterator<Item = &'a str>) -> bool {
        match &self.keyword {
            None => true,
            Some(keyword) => {
                let keyword = keyword.to_lowercase();
                fields
                    .into_iter()
                    .any(|f| f.to_lowercase().contains(&keyword))
            }
        }
    }
}

/// One page of results plus the unpaged total
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

/// Pagination metadata returned alongside list data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl Meta {
    pub fn new(filter: &Filter, total: u64) -> Self {
        Self {
            page: filter.page,
            per_page: filter.per_page,
            total,
        }
    }
}
