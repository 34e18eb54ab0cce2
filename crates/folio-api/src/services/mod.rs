//! Resource services
//!
//! Business rules for users, articles and categories, sitting between the
//! handlers and the repositories.

pub mod articles;
pub mod categories;
pub mod users;

pub use articles::ArticleService;
pub use categories::CategoryService;
pub use users::{UserDetail, UserService};

use folio_core::Filter;
use serde::Deserialize;
use utoipa::IntoParams;

/// Query string shared by every list endpoint
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// 1-based page number
    pub page: Option<u32>,
    /// Page size, capped at 100
    pub per_page: Option<u32>,
    /// Case-insensitive substring search
    pub keyword: Option<String>,
    /// Sort field; prefix with `-` for descending
    pub order_by: Option<String>,
}

impl ListQuery {
    pub fn to_filter(&self, allowed: &[&str]) -> Filter {
        Filter::new(
            self.page,
            self.per_page,
            self.keyword.clone(),
            self.order_by.as_deref(),
            allowed,
        )
    }
}

/// `Some(value)` only for a present, non-blank value
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
