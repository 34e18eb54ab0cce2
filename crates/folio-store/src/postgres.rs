//! PostgreSQL repositories
//!
//! Implements every store trait over one sqlx pool. Schema lives in
//! `migrations/` and is applied by `PgStore::migrate`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use folio_core::{
    Article, ArticleRepository, ArticleStatus, Category, CategoryRepository, Filter, FolioError,
    NewArticle, NewCategory, NewUser, Page, Result, Role, RoleRepository, RoleSlug, User, UserId,
    UserRepository,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, QueryBuilder};

const USER_COLUMNS: &str = "id, email, password, fullname, phone, token, status, avatar, \
     created_at, updated_at, verified_at, blocked_at, deleted_at, last_access_at";

const ARTICLE_COLUMNS: &str = "id, title, slug, excerpt, content, cover_image, status, \
     seo_description, seo_keywords, author_id, published_at, youtube_url, tiktok_url, \
     view_count, created_at, updated_at";

const CATEGORY_COLUMNS: &str =
    "id, name, slug, description, parent_id, is_active, sort_order, created_at, updated_at";

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Open a pool against `database_url`
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| FolioError::Store(format!("PostgreSQL connection failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| FolioError::Store(format!("migration failed: {e}")))
    }
}

fn like_pattern(keyword: &str) -> String {
    let escaped = keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Append `AND (col ILIKE $n OR ...)` for the filter keyword
fn push_keyword(qb: &mut QueryBuilder<'_, Postgres>, filter: &Filter, columns: &[&str]) {
    let Some(keyword) = &filter.keyword else {
        return;
    };
    let pattern = like_pattern(keyword);

    qb.push(" AND (");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        qb.push(*column).push(" ILIKE ").push_bind(pattern.clone());
    }
    qb.push(")");
}

/// Append ORDER BY / LIMIT / OFFSET. The order field has already been
/// checked against the caller's whitelist.
fn push_page(qb: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    qb.push(format!(
        " ORDER BY {} {}, id ASC",
        filter.order.field,
        filter.order.direction()
    ));
    qb.push(" LIMIT ")
        .push_bind(filter.limit() as i64)
        .push(" OFFSET ")
        .push_bind(filter.offset() as i64);
}

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    email: String,
    password: String,
    fullname: String,
    phone: String,
    token: Option<String>,
    status: String,
    avatar: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    verified_at: Option<DateTime<Utc>>,
    blocked_at: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
    last_access_at: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = FolioError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: row.id,
            email: row.email,
            password_hash: row.password,
            fullname: row.fullname,
            phone: row.phone,
            token: row.token,
            status: row.status.parse()?,
            avatar: row.avatar,
            created_at: row.created_at,
            updated_at: row.updated_at,
            verified_at: row.verified_at,
            blocked_at: row.blocked_at,
            deleted_at: row.deleted_at,
            last_access_at: row.last_access_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: i64,
    name: String,
    slug: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ArticleRow {
    id: i64,
    title: String,
    slug: String,
    excerpt: Option<String>,
    content: String,
    cover_image: Option<String>,
    status: String,
    seo_description: Option<String>,
    seo_keywords: Option<String>,
    author_id: i64,
    published_at: Option<DateTime<Utc>>,
    youtube_url: Option<String>,
    tiktok_url: Option<String>,
    view_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ArticleRow> for Article {
    type Error = FolioError;

    fn try_from(row: ArticleRow) -> Result<Self> {
        Ok(Article {
            id: row.id,
            title: row.title,
            slug: row.slug,
            excerpt: row.excerpt,
            content: row.content,
            cover_image: row.cover_image,
            status: row.status.parse()?,
            seo_description: row.seo_description,
            seo_keywords: row.seo_keywords,
            author_id: row.author_id,
            published_at: row.published_at,
            youtube_url: row.youtube_url,
            tiktok_url: row.tiktok_url,
            view_count: row.view_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    slug: String,
    description: Option<String>,
    parent_id: Option<i64>,
    is_active: bool,
    sort_order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            parent_id: row.parent_id,
            is_active: row.is_active,
            sort_order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = FolioError>,
{
    rows.into_iter().map(T::try_from).collect()
}

// ============================================================================
// Users
// ============================================================================

#[async_trait]
impl UserRepository for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE token = $1 AND deleted_at IS NULL"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let row: UserRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO users (email, password, fullname, phone, avatar, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.fullname)
        .bind(&user.phone)
        .bind(&user.avatar)
        .bind(user.status.as_str())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn update(&self, user: &User) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = $2, password = $3, fullname = $4, phone = $5, token = $6,
                status = $7, avatar = $8, verified_at = $9, blocked_at = $10,
                deleted_at = $11, last_access_at = $12, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.fullname)
        .bind(&user.phone)
        .bind(&user.token)
        .bind(user.status.as_str())
        .bind(&user.avatar)
        .bind(user.verified_at)
        .bind(user.blocked_at)
        .bind(user.deleted_at)
        .bind(user.last_access_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(FolioError::NotFound("User".to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: UserId) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(FolioError::NotFound("User".to_string()));
        }
        Ok(())
    }

    async fn list(&self, filter: &Filter) -> Result<Page<User>> {
        const SEARCH: &[&str] = &["email", "fullname", "phone"];

        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM users WHERE deleted_at IS NULL",
        );
        push_keyword(&mut count, filter, SEARCH);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {USER_COLUMNS} FROM users WHERE deleted_at IS NULL"
        ));
        push_keyword(&mut select, filter, SEARCH);
        push_page(&mut select, filter);
        let rows: Vec<UserRow> = select.build_query_as().fetch_all(&self.pool).await?;

        Ok(Page {
            items: convert_all(rows)?,
            total: total as u64,
        })
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// ============================================================================
// Roles
// ============================================================================

#[async_trait]
impl RoleRepository for PgStore {
    async fn roles_for_user(&self, user_id: UserId) -> Result<Vec<Role>> {
        let rows: Vec<RoleRow> = sqlx::query_as(
            r#"
            SELECT r.id, r.name, r.slug, r.created_at
            FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            ORDER BY r.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match RoleSlug::from_slug(&row.slug) {
                Some(slug) => Some(Role {
                    id: row.id,
                    name: row.name,
                    slug,
                    created_at: row.created_at,
                }),
                None => {
                    tracing::warn!(role_id = row.id, slug = %row.slug, "Skipping unknown role slug");
                    None
                }
            })
            .collect())
    }

    async fn replace_user_roles(&self, user_id: UserId, roles: &[RoleSlug]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Serialize concurrent replacements for the same user.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for slug in roles {
            sqlx::query(
                r#"
                INSERT INTO user_roles (user_id, role_id, created_at)
                SELECT $1, id, NOW() FROM roles WHERE slug = $2
                ON CONFLICT (user_id, role_id) DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(slug.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

// ============================================================================
// Articles
// ============================================================================

#[async_trait]
impl ArticleRepository for PgStore {
    async fn list(&self, filter: &Filter, status: Option<ArticleStatus>) -> Result<Page<Article>> {
        const SEARCH: &[&str] = &["title", "slug", "excerpt"];

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM articles WHERE TRUE");
        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE TRUE"
        ));

        for qb in [&mut count, &mut select] {
            if let Some(status) = status {
                qb.push(" AND status = ").push_bind(status.as_str());
            }
            push_keyword(qb, filter, SEARCH);
        }
        push_page(&mut select, filter);

        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;
        let rows: Vec<ArticleRow> = select.build_query_as().fetch_all(&self.pool).await?;

        Ok(Page {
            items: convert_all(rows)?,
            total: total as u64,
        })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Article>> {
        let row: Option<ArticleRow> =
            sqlx::query_as(&format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Article::try_from).transpose()
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        let row: Option<ArticleRow> =
            sqlx::query_as(&format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE slug = $1"))
                .bind(slug)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Article::try_from).transpose()
    }

    async fn create(&self, article: NewArticle) -> Result<Article> {
        let row: ArticleRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO articles (title, slug, excerpt, content, cover_image, status,
                seo_description, seo_keywords, author_id, published_at, youtube_url, tiktok_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {ARTICLE_COLUMNS}
            "#
        ))
        .bind(&article.title)
        .bind(&article.slug)
        .bind(&article.excerpt)
        .bind(&article.content)
        .bind(&article.cover_image)
        .bind(article.status.as_str())
        .bind(&article.seo_description)
        .bind(&article.seo_keywords)
        .bind(article.author_id)
        .bind(article.published_at)
        .bind(&article.youtube_url)
        .bind(&article.tiktok_url)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn update(&self, article: &Article) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE articles
            SET title = $2, slug = $3, excerpt = $4, content = $5, cover_image = $6,
                status = $7, seo_description = $8, seo_keywords = $9, published_at = $10,
                youtube_url = $11, tiktok_url = $12, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(article.id)
        .bind(&article.title)
        .bind(&article.slug)
        .bind(&article.excerpt)
        .bind(&article.content)
        .bind(&article.cover_image)
        .bind(article.status.as_str())
        .bind(&article.seo_description)
        .bind(&article.seo_keywords)
        .bind(article.published_at)
        .bind(&article.youtube_url)
        .bind(&article.tiktok_url)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(FolioError::NotFound("Article".to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(FolioError::NotFound("Article".to_string()));
        }
        Ok(())
    }

    async fn increment_view_count(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE articles SET view_count = view_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ============================================================================
// Categories
// ============================================================================

#[async_trait]
impl CategoryRepository for PgStore {
    async fn list(&self, filter: &Filter, active_only: bool) -> Result<Page<Category>> {
        const SEARCH: &[&str] = &["name", "slug"];

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM categories WHERE TRUE");
        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE TRUE"
        ));

        for qb in [&mut count, &mut select] {
            if active_only {
                qb.push(" AND is_active");
            }
            push_keyword(qb, filter, SEARCH);
        }
        push_page(&mut select, filter);

        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;
        let rows: Vec<CategoryRow> = select.build_query_as().fetch_all(&self.pool).await?;

        Ok(Page {
            items: rows.into_iter().map(Category::from).collect(),
            total: total as u64,
        })
    }

    async fn create(&self, category: NewCategory) -> Result<Category> {
        let row: CategoryRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO categories (name, slug, description, parent_id, is_active, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(category.parent_id)
        .bind(category.is_active)
        .bind(category.sort_order)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("jane"), "%jane%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_page_clause() {
        let filter = Filter::new(Some(3), Some(20), None, Some("-email"), &["email"]);
        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM users WHERE TRUE");
        push_page(&mut qb, &filter);
        assert_eq!(
            qb.sql(),
            "SELECT id FROM users WHERE TRUE ORDER BY email DESC, id ASC LIMIT $1 OFFSET $2"
        );
    }

    #[test]
    fn test_keyword_clause() {
        let filter = Filter::new(None, None, Some("jane".to_string()), None, &["id"]);
        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM users WHERE TRUE");
        push_keyword(&mut qb, &filter, &["email", "fullname"]);
        assert_eq!(
            qb.sql(),
            "SELECT id FROM users WHERE TRUE AND (email ILIKE $1 OR fullname ILIKE $2)"
        );
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a disposable PostgreSQL"]
    async fn test_role_replacement_roundtrip() {
        let url = std::env::var("DATABASE_URL").unwrap();
        let store = PgStore::connect(&url, 2).await.unwrap();
        store.migrate().await.unwrap();

        let user = UserRepository::create(
            &store,
            NewUser {
                email: format!("pg-{}@example.com", Utc::now().timestamp_nanos_opt().unwrap()),
                password_hash: "hash".to_string(),
                fullname: "Pg".to_string(),
                phone: String::new(),
                avatar: None,
                status: folio_core::UserStatus::Active,
            },
        )
        .await
        .unwrap();

        store
            .replace_user_roles(user.id, &[RoleSlug::Admin, RoleSlug::Member])
            .await
            .unwrap();
        let roles = store.roles_for_user(user.id).await.unwrap();
        assert_eq!(roles.len(), 2);

        store.replace_user_roles(user.id, &[]).await.unwrap();
        assert!(store.roles_for_user(user.id).await.unwrap().is_empty());

        UserRepository::delete(&store, user.id).await.unwrap();
    }
}
