//! Folio Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout Folio:
//! - Domain models (users, roles, articles, categories)
//! - The fixed role table and its lookups
//! - List filtering and pagination
//! - Common error types
//! - Collaborator traits (stores, key-value cache, mailer)
//! - Configuration management

pub mod config;
pub mod filter;
pub mod models;
pub mod role;

pub use config::{AppConfig, ConfigError, JwtSettings};
pub use filter::{Filter, Meta, Order, Page};
pub use models::{
    slugify, Article, ArticleStatus, Category, NewArticle, NewCategory, NewUser, User, UserId,
    UserStatus,
};
pub use role::{resolve_slugs, Role, RoleSlug};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for Folio operations
#[derive(Error, Debug)]
pub enum FolioError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is not active")]
    AccountNotActive,

    #[error("Invalid token: {0}")]
    TokenInvalid(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    TokenBlacklisted,

    #[error("Refresh token does not match")]
    RefreshMismatch,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Notification error: {0}")]
    Notify(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, FolioError>;

impl From<sqlx::Error> for FolioError {
    fn from(err: sqlx::Error) -> Self {
        FolioError::Store(err.to_string())
    }
}

impl From<CacheError> for FolioError {
    fn from(err: CacheError) -> Self {
        FolioError::Store(err.to_string())
    }
}

impl From<MailError> for FolioError {
    fn from(err: MailError) -> Self {
        FolioError::Notify(err.to_string())
    }
}

/// Key-value cache failures
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid cache key: {0}")]
    InvalidKey(String),
}

/// Mail notifier failures
#[derive(Error, Debug)]
pub enum MailError {
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Persistent user records
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Look up by (already lowercased) email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Look up by the stored reset token
    async fn find_by_token(&self, token: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>>;

    async fn create(&self, user: NewUser) -> Result<User>;

    /// Persist every mutable field of `user`, bumping `updated_at`
    async fn update(&self, user: &User) -> Result<()>;

    async fn delete(&self, id: UserId) -> Result<()>;

    async fn list(&self, filter: &Filter) -> Result<Page<User>>;

    /// Cheap connectivity probe used by readiness checks
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// User-role assignments
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// All roles assigned to a user, ordered by role id
    async fn roles_for_user(&self, user_id: UserId) -> Result<Vec<Role>>;

    /// Atomically replace the user's assignments with `roles`.
    ///
    /// Either every assignment is written or none is.
    async fn replace_user_roles(&self, user_id: UserId, roles: &[RoleSlug]) -> Result<()>;
}

/// Article storage
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    async fn list(&self, filter: &Filter, status: Option<ArticleStatus>) -> Result<Page<Article>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Article>>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Article>>;

    async fn create(&self, article: NewArticle) -> Result<Article>;

    async fn update(&self, article: &Article) -> Result<()>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn increment_view_count(&self, id: i64) -> Result<()>;
}

/// Category storage
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn list(&self, filter: &Filter, active_only: bool) -> Result<Page<Category>>;

    async fn create(&self, category: NewCategory) -> Result<Category>;
}

/// Key-value cache with per-entry TTL
///
/// A zero TTL stores the entry without expiry.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> std::result::Result<(), CacheError>;

    async fn get(&self, key: &str) -> std::result::Result<Option<String>, CacheError>;

    async fn delete(&self, key: &str) -> std::result::Result<(), CacheError>;
}

/// Outgoing templated mail
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        template: &str,
        recipient: &str,
        data: serde_json::Value,
    ) -> std::result::Result<(), MailError>;
}
