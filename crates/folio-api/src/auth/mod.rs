//! Authentication and authorization module
//!
//! This module provides JWT-based authentication with the following components:
//! - Token generation and validation
//! - Password hashing with Argon2
//! - Token lifecycle: sign-in, refresh rotation, sign-out, blacklist
//! - Role lookups and role-set synchronization
//! - Middleware for token, role and session gates
//! - Account registration and password reset

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod roles;
pub mod service;
pub mod session;
pub mod token;

pub use jwt::{Claims, JwtConfig, JwtError, TokenPair};
pub use middleware::{
    bearer_token, jwt_auth, prevent_self_update, require_any_role, AuthenticatedUser, PathList,
};
pub use password::{PasswordConfig, PasswordError};
pub use roles::RoleService;
pub use service::{AuthService, ForgotPasswordRequest, ResetPasswordRequest, SignUpRequest};
pub use session::session_auth;
pub use token::TokenService;
