//! Domain models for users, articles and categories

use crate::FolioError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Principal identifier
pub type UserId = i64;

// ============================================================================
// Users
// ============================================================================

/// Account status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Pending,
    Blocked,
}

impl UserStatus {
    pub const ALL: [UserStatus; 3] = [UserStatus::Active, UserStatus::Pending, UserStatus::Blocked];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Pending => "pending",
            UserStatus::Blocked => "blocked",
        }
    }
}

impl FromStr for UserStatus {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(UserStatus::Active),
            "pending" => Ok(UserStatus::Pending),
            "blocked" => Ok(UserStatus::Blocked),
            _ => Err(FolioError::ValidationFailed(format!(
                "status must be one of active, pending, blocked (got {s})"
            ))),
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored user record
///
/// `password_hash` and `token` never leave the process through serde.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub fullname: String,
    pub phone: String,
    #[serde(skip_serializing, default)]
    pub token: Option<String>,
    pub status: UserStatus,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub blocked_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub last_access_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active && self.deleted_at.is_none()
    }

    /// Change status, keeping `blocked_at` in step with it
    pub fn set_status(&mut self, status: UserStatus) {
        self.status = status;
        self.blocked_at = match status {
            UserStatus::Blocked => Some(Utc::now()),
            _ => None,
        };
    }
}

/// Fields required to insert a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub fullname: String,
    pub phone: String,
    pub avatar: Option<String>,
    pub status: UserStatus,
}

// ============================================================================
// Articles
// ============================================================================

/// Publication state of an article
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Draft => "draft",
            ArticleStatus::Published => "published",
            ArticleStatus::Archived => "archived",
        }
    }
}

impl FromStr for ArticleStatus {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(ArticleStatus::Draft),
            "published" => Ok(ArticleStatus::Published),
            "archived" => Ok(ArticleStatus::Archived),
            _ => Err(FolioError::ValidationFailed(format!(
                "status must be one of draft, published, archived (got {s})"
            ))),
        }
    }
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub cover_image: Option<String>,
    pub status: ArticleStatus,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<String>,
    pub author_id: UserId,
    pub published_at: Option<DateTime<Utc>>,
    pub youtube_url: Option<String>,
    pub tiktok_url: Option<String>,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    /// Move to `status`; the first publication stamps `published_at`
    pub fn set_status(&mut self, status: ArticleStatus) {
        self.status = status;
        if status == ArticleStatus::Published && self.published_at.is_none() {
            self.published_at = Some(Utc::now());
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewArticle {
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub cover_image: Option<String>,
    pub status: ArticleStatus,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<String>,
    pub author_id: UserId,
    pub published_at: Option<DateTime<Utc>>,
    pub youtube_url: Option<String>,
    pub tiktok_url: Option<String>,
}

// ============================================================================
// Categories
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
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

#[derive(Debug, Clone, Default)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<i64>,
    pub is_active: bool,
    pub sort_order: i32,
}

/// Lowercase ASCII slug: alphanumerics kept, every other run collapsed to `-`
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: 7,
            email: "jane@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            fullname: "Jane".to_string(),
            phone: "555-0100".to_string(),
            token: Some("reset_password:abc".to_string()),
            status: UserStatus::Active,
            avatar: None,
            created_at: now,
            updated_at: now,
            verified_at: None,
            blocked_at: None,
            deleted_at: None,
            last_access_at: None,
        }
    }

    #[test]
    fn test_user_status_parse() {
        assert_eq!("ACTIVE".parse::<UserStatus>().unwrap(), UserStatus::Active);
        assert_eq!("blocked".parse::<UserStatus>().unwrap(), UserStatus::Blocked);
        assert!(matches!(
            "deleted".parse::<UserStatus>(),
            Err(FolioError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_user_serialization_hides_secrets() {
        let json = serde_json::to_string(&sample_user()).unwrap();
        assert!(json.contains("jane@example.com"));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("reset_password"));
        assert!(json.contains("\"status\":\"active\""));
    }

    #[test]
    fn test_set_status_tracks_blocked_at() {
        let mut user = sample_user();
        user.set_status(UserStatus::Blocked);
        assert!(user.blocked_at.is_some());
        assert!(!user.is_active());

        user.set_status(UserStatus::Active);
        assert!(user.blocked_at.is_none());
        assert!(user.is_active());
    }

    #[test]
    fn test_article_publish_stamps_once() {
        let now = Utc::now();
        let mut article = Article {
            id: 1,
            title: "Hello".to_string(),
            slug: "hello".to_string(),
            excerpt: None,
            content: "body".to_string(),
            cover_image: None,
            status: ArticleStatus::Draft,
            seo_description: None,
            seo_keywords: None,
            author_id: 1,
            published_at: None,
            youtube_url: None,
            tiktok_url: None,
            view_count: 0,
            created_at: now,
            updated_at: now,
        };

        article.set_status(ArticleStatus::Published);
        let first = article.published_at;
        assert!(first.is_some());

        article.set_status(ArticleStatus::Archived);
        article.set_status(ArticleStatus::Published);
        assert_eq!(article.published_at, first);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Rust 2024 edition  "), "rust-2024-edition");
        assert_eq!(slugify("---"), "");
    }
}
