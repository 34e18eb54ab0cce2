//! Process-local repositories
//!
//! Everything lives behind one `RwLock`, so each trait call is atomic with
//! respect to every other call. Role replacement in particular happens under
//! a single write guard.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use folio_core::{
    Article, ArticleRepository, ArticleStatus, Category, CategoryRepository, Filter, FolioError,
    NewArticle, NewCategory, NewUser, Page, Result, Role, RoleRepository, RoleSlug, User, UserId,
    UserRepository,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    users: BTreeMap<UserId, User>,
    user_roles: HashMap<UserId, BTreeSet<RoleSlug>>,
    articles: BTreeMap<i64, Article>,
    categories: BTreeMap<i64, Category>,
    next_user_id: i64,
    next_article_id: i64,
    next_category_id: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

/// In-memory implementation of every repository trait
pub struct MemoryStore {
    state: RwLock<State>,
    roles_seeded_at: DateTime<Utc>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            roles_seeded_at: Utc::now(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn unique_violation(constraint: &str) -> FolioError {
    FolioError::Store(format!(
        "duplicate key value violates unique constraint \"{constraint}\""
    ))
}

/// Compare two records on a whitelisted field
fn compare_by<T>(a: &T, b: &T, key: impl Fn(&T) -> SortKey) -> Ordering {
    key(a).cmp(&key(b))
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Int(i64),
    Text(String),
    Time(Option<DateTime<Utc>>),
}

fn user_sort_key(field: &str) -> impl Fn(&User) -> SortKey + '_ {
    move |u: &User| match field {
        "email" => SortKey::Text(u.email.clone()),
        "fullname" => SortKey::Text(u.fullname.clone()),
        "phone" => SortKey::Text(u.phone.clone()),
        "status" => SortKey::Text(u.status.as_str().to_string()),
        "last_access_at" => SortKey::Time(u.last_access_at),
        _ => SortKey::Int(u.id),
    }
}

fn article_sort_key(field: &str) -> impl Fn(&Article) -> SortKey + '_ {
    move |a: &Article| match field {
        "title" => SortKey::Text(a.title.clone()),
        "slug" => SortKey::Text(a.slug.clone()),
        "status" => SortKey::Text(a.status.as_str().to_string()),
        "published_at" => SortKey::Time(a.published_at),
        "created_at" => SortKey::Time(Some(a.created_at)),
        _ => SortKey::Int(a.id),
    }
}

fn category_sort_key(field: &str) -> impl Fn(&Category) -> SortKey + '_ {
    move |c: &Category| match field {
        "name" => SortKey::Text(c.name.clone()),
        "slug" => SortKey::Text(c.slug.clone()),
        "sort_order" => SortKey::Int(i64::from(c.sort_order)),
        _ => SortKey::Int(c.id),
    }
}

/// Sort, then slice one page out of `items`
fn paginate<T>(mut items: Vec<T>, filter: &Filter, key: impl Fn(&T) -> SortKey) -> Page<T> {
    items.sort_by(|a, b| {
        let ord = compare_by(a, b, &key);
        if filter.order.descending {
            ord.reverse()
        } else {
            ord
        }
    });

    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(filter.offset() as usize)
        .take(filter.limit() as usize)
        .collect();

    Page { items, total }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.email == email && u.deleted_at.is_none())
            .cloned())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.token.as_deref() == Some(token))
            .cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).filter(|u| u.deleted_at.is_none()).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(unique_violation("users_email_key"));
        }

        let now = Utc::now();
        let id = next_id(&mut state.next_user_id);
        let record = User {
            id,
            email: user.email,
            password_hash: user.password_hash,
            fullname: user.fullname,
            phone: user.phone,
            token: None,
            status: user.status,
            avatar: user.avatar,
            created_at: now,
            updated_at: now,
            verified_at: None,
            blocked_at: None,
            deleted_at: None,
            last_access_at: None,
        };
        state.users.insert(id, record.clone());
        Ok(record)
    }

    async fn update(&self, user: &User) -> Result<()> {
        let mut state = self.state.write().await;

        let clash = |other: &User| {
            other.id != user.id
                && (other.email == user.email
                    || (user.token.is_some() && other.token == user.token))
        };
        if state.users.values().any(clash) {
            return Err(unique_violation("users_email_token_key"));
        }

        let Some(stored) = state.users.get_mut(&user.id) else {
            return Err(FolioError::NotFound("User".to_string()));
        };
        *stored = user.clone();
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, id: UserId) -> Result<()> {
        let mut state = self.state.write().await;
        if state.users.remove(&id).is_none() {
            return Err(FolioError::NotFound("User".to_string()));
        }
        state.user_roles.remove(&id);
        Ok(())
    }

    async fn list(&self, filter: &Filter) -> Result<Page<User>> {
        let state = self.state.read().await;
        let matching = state
            .users
            .values()
            .filter(|u| u.deleted_at.is_none())
            .filter(|u| filter.matches_keyword([u.email.as_str(), u.fullname.as_str(), u.phone.as_str()]))
            .cloned()
            .collect();

        Ok(paginate(matching, filter, user_sort_key(&filter.order.field)))
    }
}

#[async_trait]
impl RoleRepository for MemoryStore {
    async fn roles_for_user(&self, user_id: UserId) -> Result<Vec<Role>> {
        let state = self.state.read().await;
        Ok(state
            .user_roles
            .get(&user_id)
            .map(|slugs| {
                slugs
                    .iter()
                    .map(|slug| Role::from_slug(*slug, self.roles_seeded_at))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn replace_user_roles(&self, user_id: UserId, roles: &[RoleSlug]) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user_id) {
            return Err(FolioError::Store(format!(
                "insert or update on table \"user_roles\" violates foreign key constraint (user {user_id})"
            )));
        }

        let slugs: BTreeSet<RoleSlug> = roles.iter().copied().collect();
        if slugs.is_empty() {
            state.user_roles.remove(&user_id);
        } else {
            state.user_roles.insert(user_id, slugs);
        }
        Ok(())
    }
}

#[async_trait]
impl ArticleRepository for MemoryStore {
    async fn list(&self, filter: &Filter, status: Option<ArticleStatus>) -> Result<Page<Article>> {
        let state = self.state.read().await;
        let matching = state
            .articles
            .values()
            .filter(|a| status.map_or(true, |s| a.status == s))
            .filter(|a| {
                filter.matches_keyword([
                    a.title.as_str(),
                    a.slug.as_str(),
                    a.excerpt.as_deref().unwrap_or_default(),
                ])
            })
            .cloned()
            .collect();

        Ok(paginate(matching, filter, article_sort_key(&filter.order.field)))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Article>> {
        Ok(self.state.read().await.articles.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        let state = self.state.read().await;
        Ok(state.articles.values().find(|a| a.slug == slug).cloned())
    }

    async fn create(&self, article: NewArticle) -> Result<Article> {
        let mut state = self.state.write().await;
        if state.articles.values().any(|a| a.slug == article.slug) {
            return Err(unique_violation("articles_slug_key"));
        }

        let now = Utc::now();
        let id = next_id(&mut state.next_article_id);
        let record = Article {
            id,
            title: article.title,
            slug: article.slug,
            excerpt: article.excerpt,
            content: article.content,
            cover_image: article.cover_image,
            status: article.status,
            seo_description: article.seo_description,
            seo_keywords: article.seo_keywords,
            author_id: article.author_id,
            published_at: article.published_at,
            youtube_url: article.youtube_url,
            tiktok_url: article.tiktok_url,
            view_count: 0,
            created_at: now,
            updated_at: now,
        };
        state.articles.insert(id, record.clone());
        Ok(record)
    }

    async fn update(&self, article: &Article) -> Result<()> {
        let mut state = self.state.write().await;
        if state
            .articles
            .values()
            .any(|a| a.id != article.id && a.slug == article.slug)
        {
            return Err(unique_violation("articles_slug_key"));
        }

        let Some(stored) = state.articles.get_mut(&article.id) else {
            return Err(FolioError::NotFound("Article".to_string()));
        };
        *stored = article.clone();
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut state = self.state.write().await;
        match state.articles.remove(&id) {
            Some(_) => Ok(()),
            None => Err(FolioError::NotFound("Article".to_string())),
        }
    }

    async fn increment_view_count(&self, id: i64) -> Result<()> {
        let mut state = self.state.write().await;
        match state.articles.get_mut(&id) {
            Some(article) => {
                article.view_count += 1;
                Ok(())
            }
            None => Err(FolioError::NotFound("Article".to_string())),
        }
    }
}

#[async_trait]
impl CategoryRepository for MemoryStore {
    async fn list(&self, filter: &Filter, active_only: bool) -> Result<Page<Category>> {
        let state = self.state.read().await;
        let matching = state
            .categories
            .values()
            .filter(|c| !active_only || c.is_active)
            .filter(|c| filter.matches_keyword([c.name.as_str(), c.slug.as_str()]))
            .cloned()
            .collect();

        Ok(paginate(matching, filter, category_sort_key(&filter.order.field)))
    }

    async fn create(&self, category: NewCategory) -> Result<Category> {
        let mut state = self.state.write().await;
        if state.categories.values().any(|c| c.slug == category.slug) {
            return Err(unique_violation("categories_slug_key"));
        }

        let now = Utc::now();
        let id = next_id(&mut state.next_category_id);
        let record = Category {
            id,
            name: category.name,
            slug: category.slug,
            description: category.description,
            parent_id: category.parent_id,
            is_active: category.is_active,
            sort_order: category.sort_order,
            created_at: now,
            updated_at: now,
        };
        state.categories.insert(id, record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::UserStatus;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            fullname: format!("User {email}"),
            phone: "555".to_string(),
            avatar: None,
            status: UserStatus::Active,
        }
    }

    #[tokio::test]
    async fn test_user_lookup_paths() {
        let store = MemoryStore::new();
        let user = UserRepository::create(&store, new_user("a@example.com")).await.unwrap();

        assert_eq!(UserRepository::find_by_id(&store, user.id).await.unwrap().unwrap().email, "a@example.com");
        assert!(store.find_by_email("a@example.com").await.unwrap().is_some());
        assert!(store.find_by_email("b@example.com").await.unwrap().is_none());

        let mut with_token = user.clone();
        with_token.token = Some("reset_password:xyz".to_string());
        UserRepository::update(&store, &with_token).await.unwrap();
        let found = store.find_by_token("reset_password:xyz").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryStore::new();
        UserRepository::create(&store, new_user("dup@example.com")).await.unwrap();
        assert!(matches!(
            UserRepository::create(&store, new_user("dup@example.com")).await,
            Err(FolioError::Store(_))
        ));
    }

    #[tokio::test]
    async fn test_replace_roles_is_full_replace() {
        let store = MemoryStore::new();
        let user = UserRepository::create(&store, new_user("r@example.com")).await.unwrap();

        store
            .replace_user_roles(user.id, &[RoleSlug::Guest, RoleSlug::Moderator])
            .await
            .unwrap();
        store
            .replace_user_roles(user.id, &[RoleSlug::Member, RoleSlug::Admin, RoleSlug::Admin])
            .await
            .unwrap();

        let slugs: Vec<RoleSlug> = store
            .roles_for_user(user.id)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.slug)
            .collect();
        assert_eq!(slugs, vec![RoleSlug::Admin, RoleSlug::Member]);

        store.replace_user_roles(user.id, &[]).await.unwrap();
        assert!(store.roles_for_user(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_roles_unknown_user_fails() {
        let store = MemoryStore::new();
        assert!(store.replace_user_roles(99, &[RoleSlug::Admin]).await.is_err());
    }

    #[tokio::test]
    async fn test_user_list_filter_and_order() {
        let store = MemoryStore::new();
        for email in ["carol@example.com", "alice@example.com", "bob@test.org"] {
            UserRepository::create(&store, new_user(email)).await.unwrap();
        }

        let filter = Filter::new(
            Some(1),
            Some(10),
            Some("example".to_string()),
            Some("-email"),
            &["id", "email"],
        );
        let page = UserRepository::list(&store, &filter).await.unwrap();
        assert_eq!(page.total, 2);
        let emails: Vec<_> = page.items.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, vec!["carol@example.com", "alice@example.com"]);

        let second = Filter::new(Some(2), Some(2), None, None, &["id"]);
        let page = UserRepository::list(&store, &second).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].email, "bob@test.org");
    }

    #[tokio::test]
    async fn test_article_slug_and_views() {
        let store = MemoryStore::new();
        let article = ArticleRepository::create(
            &store,
            NewArticle {
                title: "Hello".to_string(),
                slug: "hello".to_string(),
                content: "body".to_string(),
                author_id: 1,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        store.increment_view_count(article.id).await.unwrap();
        store.increment_view_count(article.id).await.unwrap();
        let found = store.find_by_slug("hello").await.unwrap().unwrap();
        assert_eq!(found.view_count, 2);

        let published = ArticleRepository::list(&store, &Filter::default(), Some(ArticleStatus::Published))
            .await
            .unwrap();
        assert_eq!(published.total, 0);
    }
}
