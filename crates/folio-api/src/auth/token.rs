//! Token lifecycle: sign-in, refresh rotation, sign-out and the blacklist
//!
//! Refresh tokens live in the key-value cache under `refresh_token:<id>`, one
//! per principal. Revoked access tokens live there too, under
//! `<prefix>:<token>` with the value `blocked`, until their lifetime is up.

use super::jwt::{
    decode_claims, generate_token_pair, is_valid_refresh_token, Claims, JwtConfig, TokenPair,
};
use super::password::verify_password;
use crate::audit::{audit_log, AuditEvent};
use crate::middleware::metrics::{BLACKLIST_CHECK_FAILURES, REVOCATION_FAILURES};
use chrono::Utc;
use folio_core::{FolioError, JwtSettings, KeyValueCache, Result, User, UserId, UserRepository};
use std::sync::Arc;

const BLOCKED: &str = "blocked";

/// Cache key holding the live refresh token of `user_id`
pub fn refresh_key(user_id: UserId) -> String {
    format!("refresh_token:{user_id}")
}

pub struct TokenService {
    users: Arc<dyn UserRepository>,
    cache: Arc<dyn KeyValueCache>,
    jwt: JwtConfig,
    blacklist_prefix: String,
    check_blacklist: bool,
    fail_open: bool,
}

impl TokenService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        cache: Arc<dyn KeyValueCache>,
        jwt: JwtConfig,
        settings: &JwtSettings,
    ) -> Self {
        Self {
            users,
            cache,
            jwt,
            blacklist_prefix: settings.blacklist_prefix.clone(),
            check_blacklist: settings.check_blacklist,
            fail_open: settings.blacklist_fail_open,
        }
    }

    pub fn jwt(&self) -> &JwtConfig {
        &self.jwt
    }

    fn blacklist_key(&self, access_token: &str) -> String {
        format!("{}:{access_token}", self.blacklist_prefix)
    }

    /// Check credentials and return the active account they belong to.
    ///
    /// Records the access time. Used by both token and session sign-in.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        let email = username.trim().to_lowercase();
        let Some(mut user) = self.users.find_by_email(&email).await? else {
            return Err(FolioError::InvalidCredentials);
        };

        let matches = verify_password(password, &user.password_hash)
            .map_err(|e| FolioError::Other(e.into()))?;
        if !matches {
            return Err(FolioError::InvalidCredentials);
        }

        if !user.is_active() {
            return Err(FolioError::AccountNotActive);
        }

        user.last_access_at = Some(Utc::now());
        if let Err(e) = self.users.update(&user).await {
            tracing::warn!(user_id = user.id, error = %e, "Failed to record last access");
        }

        Ok(user)
    }

    /// Exchange credentials for a fresh token pair.
    ///
    /// Any refresh token previously cached for the principal is overwritten.
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<TokenPair> {
        let user = self.authenticate(username, password).await?;
        self.issue(user.id).await
    }

    /// Rotate a token pair.
    ///
    /// The access token may already be expired; only its signature matters.
    /// The old access token is revoked once the new pair is cached.
    pub async fn refresh(&self, access_token: &str, refresh_token: &str) -> Result<TokenPair> {
        let user_id = principal_of(&self.extract_claims(access_token)?)?;

        if !is_valid_refresh_token(refresh_token) {
            return Err(FolioError::RefreshMismatch);
        }

        let cached = self.cache.get(&refresh_key(user_id)).await?;
        if cached.as_deref() != Some(refresh_token) {
            return Err(FolioError::RefreshMismatch);
        }

        let pair = self.issue(user_id).await?;
        self.revoke(user_id, access_token).await;

        Ok(pair)
    }

    /// Drop the principal's refresh token and revoke `access_token`.
    ///
    /// Returns the principal that signed out.
    pub async fn sign_out(&self, access_token: &str) -> Result<UserId> {
        let user_id = principal_of(&self.extract_claims(access_token)?)?;

        self.cache.delete(&refresh_key(user_id)).await?;
        self.revoke(user_id, access_token).await;

        Ok(user_id)
    }

    /// Whether `access_token` has been revoked
    pub async fn is_blocked(&self, access_token: &str) -> bool {
        if !self.check_blacklist {
            return false;
        }

        match self.cache.get(&self.blacklist_key(access_token)).await {
            Ok(value) => value.as_deref() == Some(BLOCKED),
            Err(e) => {
                BLACKLIST_CHECK_FAILURES.inc();
                audit_log(&AuditEvent::BlacklistCheckFailed {
                    reason: e.to_string(),
                    fail_open: self.fail_open,
                });
                !self.fail_open
            }
        }
    }

    /// Verify the signature and decode claims. Expiry is not checked.
    pub fn extract_claims(&self, access_token: &str) -> Result<Claims> {
        decode_claims(&self.jwt, access_token).map_err(|e| FolioError::TokenInvalid(e.to_string()))
    }

    async fn issue(&self, user_id: UserId) -> Result<TokenPair> {
        let pair = generate_token_pair(&self.jwt, user_id)
            .map_err(|e| FolioError::Other(e.into()))?;

        self.cache
            .set(&refresh_key(user_id), &pair.refresh, self.jwt.refresh_ttl)
            .await?;

        Ok(pair)
    }

    /// Best-effort blacklist write
    async fn revoke(&self, user_id: UserId, access_token: &str) {
        let key = self.blacklist_key(access_token);
        if let Err(e) = self.cache.set(&key, BLOCKED, self.jwt.access_ttl).await {
            REVOCATION_FAILURES.inc();
            audit_log(&AuditEvent::RevocationFailed {
                user_id,
                reason: e.to_string(),
            });
        }
    }
}

fn principal_of(claims: &Claims) -> Result<UserId> {
    claims
        .principal_id()
        .map_err(|e| FolioError::TokenInvalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::generate_access_token;
    use crate::auth::password::{hash_password_with_config, PasswordConfig};
    use async_trait::async_trait;
    use folio_core::{CacheError, NewUser, UserStatus};
    use folio_store::{MemoryCache, MemoryStore};
    use std::time::Duration;

    struct Fixture {
        service: TokenService,
        cache: Arc<MemoryCache>,
        users: Arc<MemoryStore>,
    }

    fn fixture() -> Fixture {
        let users = Arc::new(MemoryStore::new());
        let cache = Arc::new(MemoryCache::new());
        let settings = JwtSettings::default();
        let service = TokenService::new(
            users.clone(),
            cache.clone(),
            JwtConfig::from_settings(&settings),
            &settings,
        );
        Fixture {
            service,
            cache,
            users,
        }
    }

    async fn seed_user(store: &MemoryStore, email: &str, status: UserStatus) -> UserId {
        let hash = hash_password_with_config("Secret123", &PasswordConfig::insecure_fast()).unwrap();
        let user = UserRepository::create(
            store,
            NewUser {
                email: email.to_string(),
                password_hash: hash,
                fullname: "Test User".to_string(),
                phone: "0100000000".to_string(),
                avatar: None,
                status,
            },
        )
        .await
        .unwrap();
        user.id
    }

    /// Cache whose reads and writes always fail
    struct BrokenCache;

    #[async_trait]
    impl KeyValueCache for BrokenCache {
        async fn set(&self, _: &str, _: &str, _: Duration) -> std::result::Result<(), CacheError> {
            Err(CacheError::Unavailable("down".to_string()))
        }

        async fn get(&self, _: &str) -> std::result::Result<Option<String>, CacheError> {
            Err(CacheError::Unavailable("down".to_string()))
        }

        async fn delete(&self, _: &str) -> std::result::Result<(), CacheError> {
            Err(CacheError::Unavailable("down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_sign_in_caches_returned_refresh_token() {
        let f = fixture();
        let id = seed_user(&f.users, "a@example.com", UserStatus::Active).await;

        let pair = f.service.sign_in("A@Example.com", "Secret123").await.unwrap();

        let cached = f.cache.get(&refresh_key(id)).await.unwrap();
        assert_eq!(cached.as_deref(), Some(pair.refresh.as_str()));
    }

    #[tokio::test]
    async fn test_second_sign_in_replaces_refresh_token() {
        let f = fixture();
        let id = seed_user(&f.users, "a@example.com", UserStatus::Active).await;

        let first = f.service.sign_in("a@example.com", "Secret123").await.unwrap();
        let second = f.service.sign_in("a@example.com", "Secret123").await.unwrap();

        let cached = f.cache.get(&refresh_key(id)).await.unwrap();
        assert_eq!(cached.as_deref(), Some(second.refresh.as_str()));
        assert!(matches!(
            f.service.refresh(&first.access, &first.refresh).await,
            Err(FolioError::RefreshMismatch)
        ));
    }

    #[tokio::test]
    async fn test_sign_in_failures() {
        let f = fixture();
        seed_user(&f.users, "pending@example.com", UserStatus::Pending).await;
        seed_user(&f.users, "ok@example.com", UserStatus::Active).await;

        assert!(matches!(
            f.service.sign_in("pending@example.com", "Secret123").await,
            Err(FolioError::AccountNotActive)
        ));
        assert!(matches!(
            f.service.sign_in("ok@example.com", "wrong-password1").await,
            Err(FolioError::InvalidCredentials)
        ));
        assert!(matches!(
            f.service.sign_in("nobody@example.com", "Secret123").await,
            Err(FolioError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_refresh_rotates_and_revokes() {
        let f = fixture();
        let id = seed_user(&f.users, "a@example.com", UserStatus::Active).await;
        let pair = f.service.sign_in("a@example.com", "Secret123").await.unwrap();

        let rotated = f.service.refresh(&pair.access, &pair.refresh).await.unwrap();

        assert_ne!(rotated.refresh, pair.refresh);
        assert!(f.service.is_blocked(&pair.access).await);
        assert!(!f.service.is_blocked(&rotated.access).await);
        let cached = f.cache.get(&refresh_key(id)).await.unwrap();
        assert_eq!(cached.as_deref(), Some(rotated.refresh.as_str()));
    }

    #[tokio::test]
    async fn test_refresh_mismatch() {
        let f = fixture();
        seed_user(&f.users, "a@example.com", UserStatus::Active).await;
        let pair = f.service.sign_in("a@example.com", "Secret123").await.unwrap();

        let other = crate::auth::jwt::generate_refresh_token(f.service.jwt(), 999);
        assert!(matches!(
            f.service.refresh(&pair.access, &other).await,
            Err(FolioError::RefreshMismatch)
        ));
        assert!(matches!(
            f.service.refresh(&pair.access, "garbage").await,
            Err(FolioError::RefreshMismatch)
        ));
    }

    #[tokio::test]
    async fn test_refresh_with_bad_access_token() {
        let f = fixture();
        assert!(matches!(
            f.service.refresh("not.a.jwt", "x").await,
            Err(FolioError::TokenInvalid(_))
        ));
    }

    #[tokio::test]
    async fn test_sign_out_blocks_token_and_drops_refresh() {
        let f = fixture();
        let id = seed_user(&f.users, "a@example.com", UserStatus::Active).await;
        let pair = f.service.sign_in("a@example.com", "Secret123").await.unwrap();

        assert_eq!(f.service.sign_out(&pair.access).await.unwrap(), id);

        assert!(f.service.is_blocked(&pair.access).await);
        assert_eq!(f.cache.get(&refresh_key(id)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sign_out_blocks_token_in_busy_cache() {
        let f = fixture();
        seed_user(&f.users, "a@example.com", UserStatus::Active).await;
        let pair = f.service.sign_in("a@example.com", "Secret123").await.unwrap();

        for i in 0..5_000 {
            let key = format!("jwt_blacklist:other-{i}");
            f.cache.set(&key, BLOCKED, Duration::from_secs(900)).await.unwrap();
            for _ in 0..5 {
                f.cache.get(&key).await.unwrap();
            }
        }
        f.cache.run_pending_tasks().await;

        f.service.sign_out(&pair.access).await.unwrap();
        f.cache.run_pending_tasks().await;

        assert!(f.service.is_blocked(&pair.access).await);
    }

    #[tokio::test]
    async fn test_authenticate_records_last_access() {
        let f = fixture();
        let id = seed_user(&f.users, "a@example.com", UserStatus::Active).await;

        let user = f.service.authenticate(" A@example.com ", "Secret123").await.unwrap();
        assert_eq!(user.id, id);

        let stored = UserRepository::find_by_id(f.users.as_ref(), id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.last_access_at.is_some());
    }

    #[tokio::test]
    async fn test_blacklist_disabled() {
        let users = Arc::new(MemoryStore::new());
        let cache = Arc::new(MemoryCache::new());
        let settings = JwtSettings {
            check_blacklist: false,
            ..Default::default()
        };
        let service = TokenService::new(
            users,
            cache.clone(),
            JwtConfig::from_settings(&settings),
            &settings,
        );

        let token = generate_access_token(service.jwt(), 1).unwrap();
        cache
            .set(&service.blacklist_key(&token), BLOCKED, Duration::from_secs(60))
            .await
            .unwrap();

        assert!(!service.is_blocked(&token).await);
    }

    #[tokio::test]
    async fn test_blacklist_read_failure_policy() {
        for fail_open in [true, false] {
            let settings = JwtSettings {
                blacklist_fail_open: fail_open,
                ..Default::default()
            };
            let service = TokenService::new(
                Arc::new(MemoryStore::new()),
                Arc::new(BrokenCache),
                JwtConfig::from_settings(&settings),
                &settings,
            );

            assert_eq!(service.is_blocked("any-token").await, !fail_open);
        }
    }

    #[tokio::test]
    async fn test_sign_out_surfaces_cache_failure() {
        let settings = JwtSettings::default();
        let service = TokenService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(BrokenCache),
            JwtConfig::from_settings(&settings),
            &settings,
        );
        let token = generate_access_token(service.jwt(), 1).unwrap();

        assert!(matches!(
            service.sign_out(&token).await,
            Err(FolioError::Store(_))
        ));
    }
}
