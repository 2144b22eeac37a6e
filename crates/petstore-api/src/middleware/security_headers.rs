//! Security headers middleware
//!
//! Every response is JSON consumed by API clients, never rendered as a page,
//! so the policy is as strict as it can be:
//! - X-Content-Type-Options: nosniff
//! - X-Frame-Options: DENY
//! - Strict-Transport-Security: one year, subdomains included
//! - Content-Security-Policy: nothing may load, nothing may frame
//! - Referrer-Policy: no-referrer
//! - Cache-Control: no-store, since responses carry tokens and account data

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    (
        "strict-transport-security",
        "max-age=31536000; includeSubDomains",
    ),
    (
        "content-security-policy",
        "default-src 'none'; frame-ancestors 'none'",
    ),
    ("referrer-policy", "no-referrer"),
    ("cache-control", "no-store"),
];

/// Add the security headers to every response, errors included
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    for (name, value) in SECURITY_HEADERS {
        headers.insert(HeaderName::from_static(*name), HeaderValue::from_static(*value));
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware,
        response::IntoResponse,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/ok", get(|| async { (StatusCode::OK, "ok") }))
            .route(
                "/error",
                get(|| async { (StatusCode::UNAUTHORIZED, "nope").into_response() }),
            )
            .layer(middleware::from_fn(security_headers_middleware))
    }

    #[tokio::test]
    async fn test_security_headers_added() {
        let response = app()
            .oneshot(Request::builder().uri("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        for (name, value) in SECURITY_HEADERS {
            assert_eq!(response.headers().get(*name).unwrap(), *value, "{name}");
        }
    }

    #[tokio::test]
    async fn test_security_headers_on_error_response() {
        let response = app()
            .oneshot(Request::builder().uri("/error").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get("cache-control").unwrap(),
            "no-store"
        );
    }
}
