//! Authentication middleware for protecting routes
//!
//! The token gate resolves a bearer token to a stored principal and attaches
//! it to request extensions as [`AuthenticatedUser`]. The role gate and the
//! self-modification guard run after it and read that principal back.
//!
//! Gates are built by factories that capture the shared state and a list of
//! excluded paths, and are mounted with `axum::middleware::from_fn`.

use super::jwt::validate_access_token;
use crate::audit::{audit_log, extract_ip_address, AuditEvent};
use crate::error::AppError;
use crate::extract::PathParam;
use crate::state::AppState;
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, OriginalUri, Request},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use folio_core::{RoleSlug, User, UserId};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type alias for gate middleware futures
pub type GateFuture = Pin<Box<dyn Future<Output = Result<Response, AppError>> + Send>>;

/// The principal behind the current request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl AuthenticatedUser {
    pub fn id(&self) -> UserId {
        self.0.id
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

/// Paths a gate lets through untouched.
///
/// Entries are exact paths, or prefixes written as `/articles/*`.
#[derive(Debug, Clone, Default)]
pub struct PathList {
    exact: Vec<String>,
    prefixes: Vec<String>,
}

impl PathList {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Self::default();
        for pattern in patterns {
            let pattern = pattern.into();
            match pattern.strip_suffix('*') {
                Some(prefix) => list.prefixes.push(prefix.to_string()),
                None => list.exact.push(pattern),
            }
        }
        list
    }

    pub fn matches(&self, path: &str) -> bool {
        let path = match path.strip_suffix('/') {
            Some(trimmed) if !trimmed.is_empty() => trimmed,
            _ => path,
        };
        self.exact.iter().any(|p| p == path)
            || self.prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }
}

/// Full request path, even inside nested routers
pub fn request_path(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}

/// Token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Bearer-token gate for API routes
///
/// 1. Skips excluded paths
/// 2. Rejects blacklisted tokens
/// 3. Validates signature and expiry
/// 4. Loads the principal and adds it to request extensions
pub fn jwt_auth(
    state: Arc<AppState>,
    excludes: PathList,
) -> impl Fn(Request<Body>, Next) -> GateFuture + Clone {
    move |mut request: Request<Body>, next: Next| -> GateFuture {
        let state = state.clone();
        let excludes = excludes.clone();
        Box::pin(async move {
            let path = request_path(&request);
            if excludes.matches(&path) {
                return Ok(next.run(request).await);
            }

            let ip_address = extract_ip_address(request.headers());
            let reject = |reason: &str| {
                audit_log(&AuditEvent::InvalidToken {
                    resource: path.clone(),
                    reason: reason.to_string(),
                    ip_address: ip_address.clone(),
                });
                AppError::Unauthorized(reason.to_string())
            };

            let token = bearer_token(request.headers())
                .ok_or_else(|| reject("Missing or invalid authorization header"))?
                .to_string();

            if state.tokens.is_blocked(&token).await {
                return Err(reject("Token has been revoked"));
            }

            let claims = validate_access_token(state.tokens.jwt(), &token)
                .map_err(|e| reject(&e.to_string()))?;
            let user_id = claims.principal_id().map_err(|e| reject(&e.to_string()))?;

            let user = state
                .users
                .find_by_id(user_id)
                .await?
                .ok_or_else(|| reject("Unknown principal"))?;

            request.extensions_mut().insert(AuthenticatedUser(user));
            Ok(next.run(request).await)
        })
    }
}

/// Role gate: the principal must hold at least one of `required_roles`
///
/// # Example
///
/// ```ignore
/// let admin = Router::new()
///     .route("/api/v1/admin/users", get(list_users))
///     .route_layer(middleware::from_fn(require_any_role(
///         state.clone(),
///         &[RoleSlug::Admin],
///         PathList::default(),
///     )));
/// ```
pub fn require_any_role(
    state: Arc<AppState>,
    required_roles: &'static [RoleSlug],
    excludes: PathList,
) -> impl Fn(Request<Body>, Next) -> GateFuture + Clone {
    move |request: Request<Body>, next: Next| -> GateFuture {
        let state = state.clone();
        let excludes = excludes.clone();
        Box::pin(async move {
            let path = request_path(&request);
            if excludes.matches(&path) {
                return Ok(next.run(request).await);
            }

            let user_id = request
                .extensions()
                .get::<AuthenticatedUser>()
                .map(AuthenticatedUser::id)
                .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

            if !state.roles.has_any_role(user_id, required_roles).await? {
                let required: Vec<&str> = required_roles.iter().map(|r| r.as_str()).collect();
                audit_log(&AuditEvent::AccessDenied {
                    user_id: Some(user_id),
                    resource: path,
                    reason: format!("requires one of: {}", required.join(",")),
                    ip_address: extract_ip_address(request.headers()),
                });
                return Err(AppError::Forbidden("Insufficient permissions".to_string()));
            }

            Ok(next.run(request).await)
        })
    }
}

/// Refuse requests where the `:id` path parameter is the caller's own id
pub async fn prevent_self_update(
    PathParam(target): PathParam<UserId>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(AuthenticatedUser::id)
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    if user_id == target {
        audit_log(&AuditEvent::AccessDenied {
            user_id: Some(user_id),
            resource: request_path(&request),
            reason: "self modification".to_string(),
            ip_address: extract_ip_address(request.headers()),
        });
        return Err(AppError::Forbidden(
            "You cannot modify your own account here".to_string(),
        ));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_path_list_exact_and_prefix() {
        let list = PathList::new(["/api/v1/auth/signin", "/api/v1/articles", "/api/v1/articles/*"]);

        assert!(list.matches("/api/v1/auth/signin"));
        assert!(list.matches("/api/v1/auth/signin/"));
        assert!(list.matches("/api/v1/articles"));
        assert!(list.matches("/api/v1/articles/hello-world"));

        assert!(!list.matches("/api/v1/auth/signout"));
        assert!(!list.matches("/api/v1/admin/articles"));
        assert!(!list.matches("/api/v1/articlesx"));
    }

    #[test]
    fn test_empty_path_list() {
        let list = PathList::default();
        assert!(!list.matches("/"));
        assert!(!list.matches("/api/v1/users/profile"));
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }

    #[test]
    fn test_request_path_prefers_original_uri() {
        let mut request = Request::builder()
            .uri("/users")
            .body(Body::empty())
            .unwrap();
        assert_eq!(request_path(&request), "/users");

        request
            .extensions_mut()
            .insert(OriginalUri("/api/v1/admin/users".parse().unwrap()));
        assert_eq!(request_path(&request), "/api/v1/admin/users");
    }
}
