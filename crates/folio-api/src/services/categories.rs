//! Category listing and creation

use super::non_empty;
use folio_core::{slugify, Category, CategoryRepository, Filter, FolioError, NewCategory, Page, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

/// Sortable category columns
pub const CATEGORY_ORDER_FIELDS: &[&str] = &["id", "name", "slug", "sort_order"];

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Defaults to the slugified name
    pub slug: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<i64>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
}

pub struct CategoryService {
    categories: Arc<dyn CategoryRepository>,
}

impl CategoryService {
    pub fn new(categories: Arc<dyn CategoryRepository>) -> Self {
        Self { categories }
    }

    /// Active categories only
    pub async fn list(&self, filter: &Filter) -> Result<Page<Category>> {
        self.categories.list(filter, true).await
    }

    pub async fn create(&self, request: CreateCategoryRequest) -> Result<Category> {
        let slug = slugify(&non_empty(request.slug).unwrap_or_else(|| request.name.clone()));
        if slug.is_empty() {
            return Err(FolioError::ValidationFailed(
                "slug must contain at least one letter or digit".to_string(),
            ));
        }

        self.categories
            .create(NewCategory {
                name: request.name,
                slug,
                description: non_empty(request.description),
                parent_id: request.parent_id,
                is_active: request.is_active.unwrap_or(true),
                sort_order: request.sort_order.unwrap_or_default(),
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_store::MemoryStore;

    #[tokio::test]
    async fn test_list_hides_inactive_and_searches() {
        let service = CategoryService::new(Arc::new(MemoryStore::new()));
        let news = service
            .create(CreateCategoryRequest {
                name: "Company News".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(news.slug, "company-news");
        assert!(news.is_active);

        service
            .create(CreateCategoryRequest {
                name: "Hidden".to_string(),
                is_active: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();

        let all = service.list(&Filter::default()).await.unwrap();
        assert_eq!(all.total, 1);

        let filter = Filter::new(None, None, Some("news".to_string()), None, CATEGORY_ORDER_FIELDS);
        assert_eq!(service.list(&filter).await.unwrap().items[0].id, news.id);

        let filter = Filter::new(None, None, Some("zzz".to_string()), None, CATEGORY_ORDER_FIELDS);
        assert_eq!(service.list(&filter).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_blank_slug_rejected() {
        let service = CategoryService::new(Arc::new(MemoryStore::new()));
        let result = service
            .create(CreateCategoryRequest {
                name: "!!!".to_string(),
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(FolioError::ValidationFailed(_))));
    }
}
