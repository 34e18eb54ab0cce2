//! JWT token generation and validation
//!
//! Access tokens are HMAC-SHA256 signed JWTs naming the principal in `sub`.
//! Refresh tokens are opaque `<sha256-hex>.<expiry-unix>` strings; their
//! authority comes from the copy held in the key-value cache.

use chrono::Utc;
use folio_core::{JwtSettings, UserId};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// JWT Claims structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Token issuer
    pub iss: String,
    /// Subject - principal id
    pub sub: String,
    /// JWT ID, keeps two tokens minted in the same second distinct
    pub jti: String,
    /// Issued at timestamp (Unix epoch)
    pub iat: i64,
    /// Expiration timestamp (Unix epoch)
    pub exp: i64,
}

impl Claims {
    pub fn principal_id(&self) -> Result<UserId, JwtError> {
        self.sub.parse().map_err(|_| JwtError::InvalidToken)
    }

    pub fn is_expired(&self) -> bool {
        self.exp < Utc::now().timestamp()
    }
}

/// JWT token generation and validation errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token format")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid token signature")]
    InvalidSignature,
}

/// JWT Configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for HMAC signing
    pub secret: String,
    /// Secret mixed into refresh token digests
    pub refresh_key: String,
    /// Access token lifetime
    pub access_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_ttl: Duration,
    /// Token issuer identifier
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self::from_settings(&JwtSettings::default())
    }
}

impl JwtConfig {
    pub fn from_settings(settings: &JwtSettings) -> Self {
        Self {
            secret: settings.secret_key.clone(),
            refresh_key: settings.refresh_key.clone(),
            access_ttl: Duration::from_secs(settings.ttl_minutes * 60),
            refresh_ttl: Duration::from_secs(settings.refresh_ttl_days * 24 * 60 * 60),
            issuer: settings.issuer.clone(),
        }
    }
}

/// Access/refresh pair handed to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    /// Signed access token
    pub access: String,
    /// Opaque refresh token
    pub refresh: String,
}

/// Generate a signed access token for `user_id`
pub fn generate_access_token(config: &JwtConfig, user_id: UserId) -> Result<String, JwtError> {
    let now = Utc::now().timestamp();

    let claims = Claims {
        iss: config.issuer.clone(),
        sub: user_id.to_string(),
        jti: Uuid::new_v4().to_string(),
        iat: now,
        exp: now + config.access_ttl.as_secs() as i64,
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verify signature and issuer, then decode claims.
///
/// Expiry is not enforced, so refresh and sign-out can still read the
/// principal out of an expired access token.
pub fn decode_claims(config: &JwtConfig, token: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);
    validation.validate_exp = false;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        _ => JwtError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// Decode claims and reject tokens past their expiry
pub fn validate_access_token(config: &JwtConfig, token: &str) -> Result<Claims, JwtError> {
    let claims = decode_claims(config, token)?;
    if claims.is_expired() {
        return Err(JwtError::ExpiredToken);
    }
    Ok(claims)
}

/// Generate an opaque refresh token: `<sha256-hex>.<expiry-unix>`
pub fn generate_refresh_token(config: &JwtConfig, user_id: UserId) -> String {
    let mut nonce = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut nonce);

    let mut hasher = Sha256::new();
    hasher.update(config.refresh_key.as_bytes());
    hasher.update(user_id.to_be_bytes());
    hasher.update(nonce);
    let digest = hasher.finalize();

    let expires_at = Utc::now().timestamp() + config.refresh_ttl.as_secs() as i64;
    format!("{digest:x}.{expires_at}")
}

/// Structural check on a refresh token: well-formed and not past its embedded expiry
pub fn is_valid_refresh_token(token: &str) -> bool {
    let Some((digest, expires_at)) = token.rsplit_once('.') else {
        return false;
    };

    if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
        return false;
    }

    expires_at
        .parse::<i64>()
        .map(|exp| exp > Utc::now().timestamp())
        .unwrap_or(false)
}

/// Mint a fresh access/refresh pair
pub fn generate_token_pair(config: &JwtConfig, user_id: UserId) -> Result<TokenPair, JwtError> {
    Ok(TokenPair {
        access: generate_access_token(config, user_id)?,
        refresh: generate_refresh_token(config, user_id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expired_token(config: &JwtConfig, user_id: UserId) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: config.issuer.clone(),
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_generate_and_validate_token() {
        let config = JwtConfig::default();

        let token = generate_access_token(&config, 42).expect("Failed to generate token");
        let claims = validate_access_token(&config, &token).expect("Failed to validate token");

        assert_eq!(claims.principal_id().unwrap(), 42);
        assert_eq!(claims.iss, "folio");
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn test_tokens_are_unique() {
        let config = JwtConfig::default();
        let a = generate_access_token(&config, 1).unwrap();
        let b = generate_access_token(&config, 1).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_invalid_token() {
        let config = JwtConfig::default();
        let result = decode_claims(&config, "invalid.token.here");
        assert!(matches!(result, Err(JwtError::InvalidToken)));
    }

    #[test]
    fn test_wrong_secret() {
        let config1 = JwtConfig {
            secret: "secret1".to_string(),
            ..Default::default()
        };
        let config2 = JwtConfig {
            secret: "secret2".to_string(),
            ..Default::default()
        };

        let token = generate_access_token(&config1, 1).unwrap();
        let result = decode_claims(&config2, &token);
        assert!(matches!(result, Err(JwtError::InvalidSignature)));
    }

    #[test]
    fn test_wrong_issuer() {
        let config = JwtConfig::default();
        let other = JwtConfig {
            issuer: "someone-else".to_string(),
            ..Default::default()
        };

        let token = generate_access_token(&other, 1).unwrap();
        assert!(decode_claims(&config, &token).is_err());
    }

    #[test]
    fn test_expired_token_still_decodes() {
        let config = JwtConfig::default();
        let token = expired_token(&config, 9);

        let claims = decode_claims(&config, &token).expect("expired tokens decode");
        assert_eq!(claims.principal_id().unwrap(), 9);
        assert!(claims.is_expired());

        let result = validate_access_token(&config, &token);
        assert!(matches!(result, Err(JwtError::ExpiredToken)));
    }

    #[test]
    fn test_refresh_token_format() {
        let config = JwtConfig::default();
        let token = generate_refresh_token(&config, 5);

        assert!(is_valid_refresh_token(&token));
        assert_ne!(token, generate_refresh_token(&config, 5));

        let (digest, _) = token.rsplit_once('.').unwrap();
        assert!(!is_valid_refresh_token(&format!("{digest}.1000")));
        assert!(!is_valid_refresh_token("not-a-token"));
        assert!(!is_valid_refresh_token("abc.99999999999"));
    }
}
