//! Request ID middleware for request tracing and correlation.
//!
//! Every request gets an ID: the upstream proxy's `x-request-id` when it is
//! sane, otherwise a fresh UUID v4. The ID is recorded on the current span,
//! tagged on the Sentry scope, and echoed in the response headers.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest upstream ID accepted verbatim.
const MAX_REQUEST_ID_LENGTH: usize = 128;

/// Accept an upstream ID only if it is short, non-empty, visible ASCII.
fn accept_upstream(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_REQUEST_ID_LENGTH
        && value.bytes().all(|b| b.is_ascii_graphic())
}

/// Middleware that ensures every request has a request ID.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|id| accept_upstream(id))
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    Span::current().record("request_id", &request_id);

    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_upstream() {
        assert!(accept_upstream("cf-7d1f0a2b"));
        assert!(!accept_upstream(""));
        assert!(!accept_upstream("has space"));
        assert!(!accept_upstream(&"a".repeat(MAX_REQUEST_ID_LENGTH + 1)));
    }
}
