//! Application state management

use crate::auth::{AuthService, JwtConfig, PasswordConfig, RoleService, TokenService};
use crate::services::{ArticleService, CategoryService, UserService};
use folio_core::{
    AppConfig, ArticleRepository, CategoryRepository, KeyValueCache, Mailer, RoleRepository,
    UserRepository,
};
use folio_store::{LogMailer, MemoryCache, MemoryStore, PgStore};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Collaborators the services are built on
#[derive(Clone)]
pub struct Backends {
    pub users: Arc<dyn UserRepository>,
    pub roles: Arc<dyn RoleRepository>,
    pub articles: Arc<dyn ArticleRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub cache: Arc<dyn KeyValueCache>,
    pub mailer: Arc<dyn Mailer>,
}

impl Backends {
    /// Process-local store and cache, logging mailer
    pub fn in_memory(config: &AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            users: store.clone(),
            roles: store.clone(),
            articles: store.clone(),
            categories: store,
            cache: Arc::new(MemoryCache::with_config(&config.cache)),
            mailer: Arc::new(LogMailer::new(config.mail.from_address.clone())),
        }
    }

    /// Postgres repositories, in-process cache, logging mailer
    pub fn postgres(store: PgStore, config: &AppConfig) -> Self {
        let store = Arc::new(store);
        Self {
            users: store.clone(),
            roles: store.clone(),
            articles: store.clone(),
            categories: store,
            cache: Arc::new(MemoryCache::with_config(&config.cache)),
            mailer: Arc::new(LogMailer::new(config.mail.from_address.clone())),
        }
    }
}

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Ready status; false while draining for shutdown
    pub is_ready: AtomicBool,
    pub users: Arc<dyn UserRepository>,
    pub tokens: TokenService,
    pub roles: RoleService,
    pub auth: AuthService,
    pub user_admin: UserService,
    pub articles: ArticleService,
    pub categories: CategoryService,
}

impl AppState {
    pub fn new(config: AppConfig, backends: Backends, password: PasswordConfig) -> Self {
        let jwt = JwtConfig::from_settings(&config.jwt);
        let roles = RoleService::new(backends.roles.clone());

        Self {
            tokens: TokenService::new(
                backends.users.clone(),
                backends.cache.clone(),
                jwt,
                &config.jwt,
            ),
            auth: AuthService::new(
                backends.users.clone(),
                backends.mailer.clone(),
                password.clone(),
                config.server.app_url.clone(),
            ),
            user_admin: UserService::new(backends.users.clone(), roles.clone(), password),
            articles: ArticleService::new(backends.articles.clone()),
            categories: CategoryService::new(backends.categories.clone()),
            users: backends.users,
            roles,
            config,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            is_ready: AtomicBool::new(true),
        }
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check if service is ready
    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }

    /// Set ready status. Cleared once shutdown begins.
    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::SeqCst);
    }
}
