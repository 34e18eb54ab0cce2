//! Article management and guest reads

use super::non_empty;
use folio_core::{
    slugify, Article, ArticleRepository, ArticleStatus, Filter, FolioError, NewArticle, Page,
    Result, UserId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

/// Sortable article columns
pub const ARTICLE_ORDER_FIELDS: &[&str] = &["id", "title", "slug", "status", "published_at", "created_at"];

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateArticleRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    /// Defaults to the slugified title
    #[validate(length(max = 255))]
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    #[serde(default)]
    pub content: String,
    pub cover_image: Option<String>,
    /// draft, published or archived; defaults to draft
    pub status: Option<String>,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<String>,
    #[validate(url)]
    pub youtube_url: Option<String>,
    #[validate(url)]
    pub tiktok_url: Option<String>,
}

/// Partial update; absent or blank fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateArticleRequest {
    #[validate(length(max = 255))]
    pub title: Option<String>,
    #[validate(length(max = 255))]
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub cover_image: Option<String>,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<String>,
    #[validate(url)]
    pub youtube_url: Option<String>,
    #[validate(url)]
    pub tiktok_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ArticleStatusRequest {
    #[validate(length(min = 1))]
    pub status: String,
}

fn slug_for(explicit: Option<String>, title: &str) -> Result<String> {
    let slug = match non_empty(explicit) {
        Some(slug) => slugify(&slug),
        None => slugify(title),
    };
    if slug.is_empty() {
        return Err(FolioError::ValidationFailed(
            "slug must contain at least one letter or digit".to_string(),
        ));
    }
    Ok(slug)
}

pub struct ArticleService {
    articles: Arc<dyn ArticleRepository>,
}

impl ArticleService {
    pub fn new(articles: Arc<dyn ArticleRepository>) -> Self {
        Self { articles }
    }

    async fn find(&self, id: i64) -> Result<Article> {
        self.articles
            .find_by_id(id)
            .await?
            .ok_or_else(|| FolioError::NotFound("Article".to_string()))
    }

    async fn ensure_slug_free(&self, slug: &str, owner: Option<i64>) -> Result<()> {
        match self.articles.find_by_slug(slug).await? {
            Some(existing) if Some(existing.id) != owner => Err(FolioError::ValidationFailed(
                format!("slug '{slug}' is already in use"),
            )),
            _ => Ok(()),
        }
    }

    /// Every article, any status
    pub async fn list(&self, filter: &Filter) -> Result<Page<Article>> {
        self.articles.list(filter, None).await
    }

    pub async fn list_published(&self, filter: &Filter) -> Result<Page<Article>> {
        self.articles.list(filter, Some(ArticleStatus::Published)).await
    }

    pub async fn get(&self, id: i64) -> Result<Article> {
        self.find(id).await
    }

    /// Published article by slug; bumps its view counter best-effort
    pub async fn view_published(&self, slug: &str) -> Result<Article> {
        let mut article = self
            .articles
            .find_by_slug(slug)
            .await?
            .filter(|a| a.status == ArticleStatus::Published)
            .ok_or_else(|| FolioError::NotFound("Article".to_string()))?;

        match self.articles.increment_view_count(article.id).await {
            Ok(()) => article.view_count += 1,
            Err(e) => tracing::warn!(article_id = article.id, error = %e, "Failed to count view"),
        }

        Ok(article)
    }

    pub async fn create(&self, author_id: UserId, request: CreateArticleRequest) -> Result<Article> {
        let slug = slug_for(request.slug, &request.title)?;
        self.ensure_slug_free(&slug, None).await?;

        let status = match non_empty(request.status) {
            Some(s) => s.parse::<ArticleStatus>()?,
            None => ArticleStatus::Draft,
        };
        let published_at = (status == ArticleStatus::Published).then(chrono::Utc::now);

        self.articles
            .create(NewArticle {
                title: request.title,
                slug,
                excerpt: non_empty(request.excerpt),
                content: request.content,
                cover_image: non_empty(request.cover_image),
                status,
                seo_description: non_empty(request.seo_description),
                seo_keywords: non_empty(request.seo_keywords),
                author_id,
                published_at,
                youtube_url: non_empty(request.youtube_url),
                tiktok_url: non_empty(request.tiktok_url),
            })
            .await
    }

    pub async fn update(&self, id: i64, request: UpdateArticleRequest) -> Result<Article> {
        let mut article = self.find(id).await?;

        if let Some(title) = non_empty(request.title) {
            article.title = title;
        }
        if request.slug.as_deref().is_some_and(|s| !s.trim().is_empty()) {
            let slug = slug_for(request.slug, &article.title)?;
            self.ensure_slug_free(&slug, Some(id)).await?;
            article.slug = slug;
        }
        if let Some(content) = non_empty(request.content) {
            article.content = content;
        }

        let optional = [
            (&mut article.excerpt, request.excerpt),
            (&mut article.cover_image, request.cover_image),
            (&mut article.seo_description, request.seo_description),
            (&mut article.seo_keywords, request.seo_keywords),
            (&mut article.youtube_url, request.youtube_url),
            (&mut article.tiktok_url, request.tiktok_url),
        ];
        for (field, value) in optional {
            if let Some(value) = non_empty(value) {
                *field = Some(value);
            }
        }

        self.articles.update(&article).await?;
        self.find(id).await
    }

    pub async fn set_status(&self, id: i64, status: ArticleStatus) -> Result<Article> {
        let mut article = self.find(id).await?;
        article.set_status(status);
        self.articles.update(&article).await?;
        self.find(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.find(id).await?;
        self.articles.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_store::MemoryStore;

    fn service() -> ArticleService {
        ArticleService::new(Arc::new(MemoryStore::new()))
    }

    fn draft(title: &str) -> CreateArticleRequest {
        CreateArticleRequest {
            title: title.to_string(),
            content: "Body".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_defaults_slug_and_draft() {
        let service = service();
        let article = service.create(1, draft("Hello, World!")).await.unwrap();

        assert_eq!(article.slug, "hello-world");
        assert_eq!(article.status, ArticleStatus::Draft);
        assert!(article.published_at.is_none());
        assert_eq!(article.author_id, 1);
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let service = service();
        service.create(1, draft("Same")).await.unwrap();

        assert!(matches!(
            service.create(1, draft("same")).await,
            Err(FolioError::ValidationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_publish_stamps_once() {
        let service = service();
        let id = service.create(1, draft("Stamp")).await.unwrap().id;

        let published = service.set_status(id, ArticleStatus::Published).await.unwrap();
        let stamped = published.published_at.unwrap();

        service.set_status(id, ArticleStatus::Archived).await.unwrap();
        let again = service.set_status(id, ArticleStatus::Published).await.unwrap();
        assert_eq!(again.published_at, Some(stamped));
    }

    #[tokio::test]
    async fn test_guest_view_only_published_and_counts() {
        let service = service();
        let id = service.create(1, draft("Guest")).await.unwrap().id;

        assert!(matches!(
            service.view_published("guest").await,
            Err(FolioError::NotFound(_))
        ));

        service.set_status(id, ArticleStatus::Published).await.unwrap();
        assert_eq!(service.view_published("guest").await.unwrap().view_count, 1);
        assert_eq!(service.view_published("guest").await.unwrap().view_count, 2);
    }

    #[tokio::test]
    async fn test_list_published_filters_drafts() {
        let service = service();
        service.create(1, draft("Draft one")).await.unwrap();
        let id = service.create(1, draft("Live one")).await.unwrap().id;
        service.set_status(id, ArticleStatus::Published).await.unwrap();

        let filter = Filter::default();
        assert_eq!(service.list(&filter).await.unwrap().total, 2);

        let published = service.list_published(&filter).await.unwrap();
        assert_eq!(published.total, 1);
        assert_eq!(published.items[0].id, id);
    }

    #[tokio::test]
    async fn test_update_keeps_blank_fields() {
        let service = service();
        let id = service.create(1, draft("Original")).await.unwrap().id;

        let updated = service
            .update(
                id,
                UpdateArticleRequest {
                    title: Some("Renamed".to_string()),
                    content: Some("  ".to_string()),
                    excerpt: Some("Short".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.slug, "original");
        assert_eq!(updated.content, "Body");
        assert_eq!(updated.excerpt.as_deref(), Some("Short"));
    }
}
