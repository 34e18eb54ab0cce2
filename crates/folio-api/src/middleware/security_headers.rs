//! Security headers middleware
//!
//! Adds a fixed set of hardening headers to every response. A header the
//! handler already set is left alone, so a page can carry its own policy.

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

/// Swagger UI loads inline scripts and styles
const SWAGGER_PREFIX: &str = "/swagger-ui";

const DEFAULT_CSP: &str = "default-src 'self'; frame-ancestors 'none'";
const SWAGGER_CSP: &str = "default-src 'self'; script-src 'self' 'unsafe-inline'; style-src 'self' 'unsafe-inline'; img-src 'self' data:";

fn static_headers() -> [(HeaderName, &'static str); 6] {
    [
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        (header::X_FRAME_OPTIONS, "DENY"),
        (header::X_XSS_PROTECTION, "1; mode=block"),
        (
            header::STRICT_TRANSPORT_SECURITY,
            "max-age=31536000; includeSubDomains",
        ),
        (header::REFERRER_POLICY, "strict-origin-when-cross-origin"),
        (
            HeaderName::from_static("permissions-policy"),
            "geolocation=(), camera=(), microphone=()",
        ),
    ]
}

/// Security headers middleware
pub async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let csp = if request.uri().path().starts_with(SWAGGER_PREFIX) {
        SWAGGER_CSP
    } else {
        DEFAULT_CSP
    };

    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    for (name, value) in static_headers() {
        headers
            .entry(name)
            .or_insert_with(|| HeaderValue::from_static(value));
    }
    headers
        .entry(header::CONTENT_SECURITY_POLICY)
        .or_insert_with(|| HeaderValue::from_static(csp));

    response
}
