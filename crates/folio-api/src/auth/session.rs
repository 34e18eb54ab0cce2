//! Session gate for server-rendered pages
//!
//! Pages are authenticated by a `username` entry in the tower-sessions
//! session. A missing or stale session sends the browser to the login page,
//! carrying the original URL so it can come back after signing in.

use super::middleware::{request_path, AuthenticatedUser, PathList};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use folio_core::User;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tower_sessions::Session;

/// Session key holding the signed-in email
pub const SESSION_USER_KEY: &str = "username";

pub const LOGIN_PATH: &str = "/login";

pub type SessionFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// `/login?redirect_url=<original>`
pub fn login_redirect_target(original: &str) -> String {
    let query: String = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("redirect_url", original)
        .finish();
    format!("{LOGIN_PATH}?{query}")
}

/// Resolve the session's username to a stored principal
async fn session_user(state: &AppState, session: &Session) -> Option<User> {
    let username = match session.get::<String>(SESSION_USER_KEY).await {
        Ok(Some(username)) => username,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read session");
            return None;
        }
    };

    match state.users.find_by_email(&username).await {
        Ok(user) => user.filter(User::is_active),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load session principal");
            None
        }
    }
}

/// Session gate for page routes
///
/// Every request has its session read; a resolvable username attaches the
/// principal. Excluded paths pass through either way, the rest redirect to
/// the login page when no principal could be attached.
pub fn session_auth(
    state: Arc<AppState>,
    excludes: PathList,
) -> impl Fn(Request<Body>, Next) -> SessionFuture + Clone {
    move |mut request: Request<Body>, next: Next| -> SessionFuture {
        let state = state.clone();
        let excludes = excludes.clone();
        Box::pin(async move {
            let path = request_path(&request);
            let session = request.extensions().get::<Session>().cloned();

            let user = match &session {
                Some(session) => session_user(&state, session).await,
                None => None,
            };

            match user {
                Some(user) => {
                    request.extensions_mut().insert(AuthenticatedUser(user));
                }
                None if excludes.matches(&path) => {}
                None => {
                    let original = request
                        .uri()
                        .path_and_query()
                        .map(|pq| pq.as_str().to_string())
                        .unwrap_or(path);
                    return Redirect::to(&login_redirect_target(&original)).into_response();
                }
            }

            next.run(request).await
        })
    }
}

/// Store `email` as the session principal, rotating the session id
pub async fn sign_in_session(session: &Session, email: &str) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(SESSION_USER_KEY, email.to_string()).await
}

/// Drop all session data
pub async fn sign_out_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_redirect_target_encodes_original() {
        assert_eq!(
            login_redirect_target("/profile"),
            "/login?redirect_url=%2Fprofile"
        );
        assert_eq!(
            login_redirect_target("/users?page=2&keyword=a b"),
            "/login?redirect_url=%2Fusers%3Fpage%3D2%26keyword%3Da+b"
        );
    }
}
