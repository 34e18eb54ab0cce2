//! Response bodies shared by the handlers

use crate::services::UserDetail;
use chrono::{DateTime, Utc};
use folio_core::{Article, Category, Filter, Meta, Page, Role};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleResponse {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "Administrator")]
    pub name: String,
    #[schema(example = "admin")]
    pub slug: String,
}

impl From<Role> for RoleResponse {
    fn from(role: Role) -> Self {
        Self {
            id: role.id,
            name: role.name,
            slug: role.slug.as_str().to_string(),
        }
    }
}

/// User as returned to clients; never carries the password hash or reset token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub fullname: String,
    pub phone: String,
    #[schema(example = "active")]
    pub status: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub blocked_at: Option<DateTime<Utc>>,
    pub last_access_at: Option<DateTime<Utc>>,
    pub roles: Vec<RoleResponse>,
}

impl From<UserDetail> for UserResponse {
    fn from(detail: UserDetail) -> Self {
        let user = detail.user;
        Self {
            id: user.id,
            email: user.email,
            fullname: user.fullname,
            phone: user.phone,
            status: user.status.as_str().to_string(),
            avatar: user.avatar,
            created_at: user.created_at,
            updated_at: user.updated_at,
            verified_at: user.verified_at,
            blocked_at: user.blocked_at,
            last_access_at: user.last_access_at,
            roles: detail.roles.into_iter().map(RoleResponse::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ArticleResponse {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub cover_image: Option<String>,
    #[schema(example = "published")]
    pub status: String,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<String>,
    pub author_id: i64,
    pub published_at: Option<DateTime<Utc>>,
    pub youtube_url: Option<String>,
    pub tiktok_url: Option<String>,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Article> for ArticleResponse {
    fn from(a: Article) -> Self {
        Self {
            id: a.id,
            title: a.title,
            slug: a.slug,
            excerpt: a.excerpt,
            content: a.content,
            cover_image: a.cover_image,
            status: a.status.as_str().to_string(),
            seo_description: a.seo_description,
            seo_keywords: a.seo_keywords,
            author_id: a.author_id,
            published_at: a.published_at,
            youtube_url: a.youtube_url,
            tiktok_url: a.tiktok_url,
            view_count: a.view_count,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<i64>,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Category> for CategoryResponse {
    fn from(c: Category) -> Self {
        Self {
            id: c.id,
            name: c.name,
            slug: c.slug,
            description: c.description,
            parent_id: c.parent_id,
            is_active: c.is_active,
            sort_order: c.sort_order,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct MetaResponse {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl From<Meta> for MetaResponse {
    fn from(meta: Meta) -> Self {
        Self {
            page: meta.page,
            per_page: meta.per_page,
            total: meta.total,
        }
    }
}

/// `{ meta, data }` envelope for list endpoints
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[aliases(
    UserList = ListResponse<UserResponse>,
    ArticleList = ListResponse<ArticleResponse>,
    CategoryList = ListResponse<CategoryResponse>
)]
pub struct ListResponse<T> {
    pub meta: MetaResponse,
    pub data: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn from_page<U>(filter: &Filter, page: Page<U>) -> Self
    where
        T: From<U>,
    {
        Self {
            meta: Meta::new(filter, page.total).into(),
            data: page.items.into_iter().map(T::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::{RoleSlug, User, UserStatus};

    fn user() -> User {
        let now = Utc::now();
        User {
            id: 7,
            email: "x@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            fullname: "X".to_string(),
            phone: String::new(),
            token: Some("reset_password:abc".to_string()),
            status: UserStatus::Blocked,
            avatar: None,
            created_at: now,
            updated_at: now,
            verified_at: None,
            blocked_at: Some(now),
            deleted_at: None,
            last_access_at: None,
        }
    }

    #[test]
    fn test_user_response_hides_secrets() {
        let detail = UserDetail {
            user: user(),
            roles: vec![Role::from_slug(RoleSlug::Admin, Utc::now())],
        };

        let json = serde_json::to_value(UserResponse::from(detail)).unwrap();
        let text = json.to_string();
        assert!(!text.contains("argon2"));
        assert!(!text.contains("reset_password"));
        assert_eq!(json["status"], "blocked");
        assert_eq!(json["roles"][0]["slug"], "admin");
        assert_eq!(json["roles"][0]["id"], 1);
    }

    #[test]
    fn test_list_envelope() {
        let filter = Filter::new(Some(2), Some(5), None, None, &["id"]);
        let page = Page {
            items: vec![Role::from_slug(RoleSlug::Guest, Utc::now())],
            total: 6,
        };

        let list: ListResponse<RoleResponse> = ListResponse::from_page(&filter, page);
        let json = serde_json::to_value(list).unwrap();
        assert_eq!(json["meta"]["page"], 2);
        assert_eq!(json["meta"]["per_page"], 5);
        assert_eq!(json["meta"]["total"], 6);
        assert_eq!(json["data"][0]["slug"], "guest");
    }
}
