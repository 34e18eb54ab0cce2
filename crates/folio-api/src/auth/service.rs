//! Account service layer
//!
//! Registration and the forgot/reset password flow. Token issuance lives in
//! [`super::token::TokenService`].

use super::password::{hash_password_with_config, validate_password_strength, PasswordConfig};
use chrono::Utc;
use folio_core::{FolioError, Mailer, NewUser, Result, User, UserRepository, UserStatus};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

pub const FORGOT_PASSWORD_TEMPLATE: &str = "forgot_password";
pub const CHANGE_PASSWORD_TEMPLATE: &str = "change_password";

const RESET_TOKEN_PREFIX: &str = "reset_password";

/// User registration request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SignUpRequest {
    #[validate(email, length(max = 255))]
    pub email: String,
    #[validate(length(min = 8, max = 255))]
    pub password: String,
    #[validate(length(min = 1, max = 255))]
    pub fullname: String,
    #[validate(length(max = 20))]
    pub phone: String,
    pub avatar: Option<String>,
    /// active, pending or blocked; defaults to active
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(length(min = 8, max = 255))]
    pub password: String,
}

/// Stored form of a reset token
fn stored_reset_token(hash: &str) -> String {
    format!("{RESET_TOKEN_PREFIX}:{hash}")
}

/// Fresh reset hash: sha256 over the email and the current time
fn reset_hash(email: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.as_bytes());
    hasher.update(Utc::now().timestamp_nanos_opt().unwrap_or_default().to_be_bytes());
    format!("{:x}", hasher.finalize())
}

/// Account service
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    mailer: Arc<dyn Mailer>,
    password: PasswordConfig,
    base_url: String,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        mailer: Arc<dyn Mailer>,
        password: PasswordConfig,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            users,
            mailer,
            password,
            base_url: base_url.into(),
        }
    }

    /// Register a new user
    ///
    /// The email is lowercased and must not already be taken.
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<User> {
        let email = request.email.trim().to_lowercase();

        validate_password_strength(&request.password).map_err(FolioError::ValidationFailed)?;

        let status = match request.status.as_deref() {
            Some(s) if !s.is_empty() => s.parse::<UserStatus>()?,
            _ => UserStatus::Active,
        };

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(FolioError::ValidationFailed(
                "User with the given email address already exists".to_string(),
            ));
        }

        let password_hash = hash_password_with_config(&request.password, &self.password)
            .map_err(|e| FolioError::Other(e.into()))?;

        let user = self
            .users
            .create(NewUser {
                email,
                password_hash,
                fullname: request.fullname,
                phone: request.phone,
                avatar: request.avatar,
                status,
            })
            .await?;

        tracing::info!(user_id = user.id, "User registered");
        Ok(user)
    }

    /// Issue a reset token and mail it to the account owner.
    ///
    /// Returns the user the token was issued to.
    pub async fn forgot_password(&self, email: &str) -> Result<User> {
        let email = email.trim().to_lowercase();
        let Some(mut user) = self.users.find_by_email(&email).await? else {
            return Err(FolioError::ValidationFailed("Invalid input data".to_string()));
        };

        let hash = reset_hash(&user.email);
        user.token = Some(stored_reset_token(&hash));
        self.users.update(&user).await?;

        let data = json!({
            "title": "Reset password",
            "base_url": self.base_url,
            "email": user.email,
            "user_name": user.fullname,
            "token": hash,
        });
        self.mailer
            .send(FORGOT_PASSWORD_TEMPLATE, &user.email, data)
            .await
            .inspect_err(|e| tracing::error!(user_id = user.id, error = %e, "Forgot password mail failed"))?;

        Ok(user)
    }

    /// Consume a reset token and set a new password.
    ///
    /// The password change stays committed even if the confirmation mail
    /// cannot be sent; the mail error is still returned.
    pub async fn reset_password(&self, request: ResetPasswordRequest) -> Result<User> {
        let Some(mut user) = self
            .users
            .find_by_token(&stored_reset_token(&request.token))
            .await?
        else {
            return Err(FolioError::ValidationFailed("Invalid input data".to_string()));
        };

        validate_password_strength(&request.password).map_err(FolioError::ValidationFailed)?;

        user.token = None;
        user.password_hash = hash_password_with_config(&request.password, &self.password)
            .map_err(|e| FolioError::Other(e.into()))?;
        self.users.update(&user).await?;

        let data = json!({
            "title": "Change password",
            "base_url": self.base_url,
            "email": user.email,
            "user_name": user.fullname,
        });
        self.mailer
            .send(CHANGE_PASSWORD_TEMPLATE, &user.email, data)
            .await
            .inspect_err(|e| tracing::error!(user_id = user.id, error = %e, "Change password mail failed"))?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use async_trait::async_trait;
    use folio_core::MailError;
    use folio_store::{MemoryMailer, MemoryStore};

    fn signup(email: &str) -> SignUpRequest {
        SignUpRequest {
            email: email.to_string(),
            password: "Secret123".to_string(),
            fullname: "New User".to_string(),
            phone: "0100000000".to_string(),
            avatar: None,
            status: None,
        }
    }

    fn service(store: Arc<MemoryStore>, mailer: Arc<dyn Mailer>) -> AuthService {
        AuthService::new(
            store,
            mailer,
            PasswordConfig::insecure_fast(),
            "http://localhost:7789",
        )
    }

    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(
            &self,
            _: &str,
            _: &str,
            _: serde_json::Value,
        ) -> std::result::Result<(), MailError> {
            Err(MailError::Delivery("smtp down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_sign_up_lowercases_and_defaults_active() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store.clone(), Arc::new(MemoryMailer::new()));

        let user = service.sign_up(signup("New@Example.com")).await.unwrap();

        assert_eq!(user.email, "new@example.com");
        assert_eq!(user.status, UserStatus::Active);
        assert!(verify_password("Secret123", &user.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_sign_up_rejects_duplicate_and_bad_status() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store, Arc::new(MemoryMailer::new()));
        service.sign_up(signup("dup@example.com")).await.unwrap();

        assert!(matches!(
            service.sign_up(signup("DUP@example.com")).await,
            Err(FolioError::ValidationFailed(_))
        ));

        let mut request = signup("status@example.com");
        request.status = Some("sleeping".to_string());
        assert!(matches!(
            service.sign_up(request).await,
            Err(FolioError::ValidationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_forgot_then_reset() {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(MemoryMailer::new());
        let service = service(store.clone(), mailer.clone());
        let user = service.sign_up(signup("reset@example.com")).await.unwrap();

        service.forgot_password("reset@example.com").await.unwrap();

        let mail = mailer.last_to("reset@example.com").await.unwrap();
        assert_eq!(mail.template, FORGOT_PASSWORD_TEMPLATE);
        let token = mail.data["token"].as_str().unwrap().to_string();

        let stored = UserRepository::find_by_id(store.as_ref(), user.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.token, Some(format!("reset_password:{token}")));

        let request = ResetPasswordRequest {
            token: token.clone(),
            password: "Changed456".to_string(),
        };
        let changed = service.reset_password(request.clone()).await.unwrap();
        assert!(changed.token.is_none());
        assert!(verify_password("Changed456", &changed.password_hash).unwrap());
        assert_eq!(
            mailer.last_to("reset@example.com").await.unwrap().template,
            CHANGE_PASSWORD_TEMPLATE
        );

        // Single use
        assert!(matches!(
            service.reset_password(request).await,
            Err(FolioError::ValidationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_forgot_unknown_email() {
        let service = service(Arc::new(MemoryStore::new()), Arc::new(MemoryMailer::new()));
        assert!(matches!(
            service.forgot_password("ghost@example.com").await,
            Err(FolioError::ValidationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_reset_commits_when_mail_fails() {
        let store = Arc::new(MemoryStore::new());
        let recorder = Arc::new(MemoryMailer::new());
        let setup = service(store.clone(), recorder.clone());
        setup.sign_up(signup("mailfail@example.com")).await.unwrap();
        setup.forgot_password("mailfail@example.com").await.unwrap();
        let token = recorder.last_to("mailfail@example.com").await.unwrap().data["token"]
            .as_str()
            .unwrap()
            .to_string();

        let failing = service(store.clone(), Arc::new(FailingMailer));
        let result = failing
            .reset_password(ResetPasswordRequest {
                token,
                password: "Changed456".to_string(),
            })
            .await;
        assert!(matches!(result, Err(FolioError::Notify(_))));

        let stored = UserRepository::find_by_email(store.as_ref(), "mailfail@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(stored.token.is_none());
        assert!(verify_password("Changed456", &stored.password_hash).unwrap());
    }
}
