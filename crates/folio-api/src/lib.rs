//! Folio API - HTTP server
//!
//! Token-authenticated JSON endpoints for accounts, users, articles and
//! categories, plus session-authenticated pages.

pub mod audit;
pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::create_router;

#[cfg(any(test, feature = "test-utils"))]
pub use test_support::{create_router_for_testing, TestApp};

#[cfg(any(test, feature = "test-utils"))]
mod test_support {
    use crate::auth::PasswordConfig;
    use crate::services::users::CreateUserRequest;
    use crate::services::UserDetail;
    use crate::state::{AppState, Backends};
    use axum::Router;
    use folio_core::AppConfig;
    use folio_store::{MemoryCache, MemoryMailer};
    use std::sync::Arc;

    /// Router over in-memory backends, with handles on the fakes
    pub struct TestApp {
        pub router: Router,
        pub state: Arc<AppState>,
        pub mailer: Arc<MemoryMailer>,
        pub cache: Arc<MemoryCache>,
    }

    impl TestApp {
        pub fn new() -> Self {
            Self::with_config(AppConfig::default())
        }

        pub fn with_config(config: AppConfig) -> Self {
            let mailer = Arc::new(MemoryMailer::new());
            let cache = Arc::new(MemoryCache::new());

            let backends = Backends {
                mailer: mailer.clone(),
                cache: cache.clone(),
                ..Backends::in_memory(&config)
            };

            let state = Arc::new(AppState::new(
                config,
                backends,
                PasswordConfig::insecure_fast(),
            ));

            Self {
                router: crate::create_router(state.clone()),
                state,
                mailer,
                cache,
            }
        }

        /// Create an active account holding `roles`
        pub async fn seed_user(&self, email: &str, password: &str, roles: &[&str]) -> UserDetail {
            self.state
                .user_admin
                .create(CreateUserRequest {
                    email: email.to_string(),
                    password: password.to_string(),
                    fullname: email.split('@').next().unwrap_or(email).to_string(),
                    phone: String::new(),
                    avatar: None,
                    status: None,
                    roles: roles.iter().map(|r| r.to_string()).collect(),
                })
                .await
                .expect("seed user")
        }
    }

    impl Default for TestApp {
        fn default() -> Self {
            Self::new()
        }
    }

    /// Create a router for testing
    pub fn create_router_for_testing() -> Router {
        TestApp::new().router
    }
}
