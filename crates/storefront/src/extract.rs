//! Request extractors whose rejections use the API's JSON error body.
//!
//! These wrap axum's `Json`, `Query` and `Path`. A malformed body, query
//! string or path segment becomes [`AppError::BadRequest`] carrying axum's
//! description of the problem, so clients always get `{"error": ...}`.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::AppError;

/// JSON request body, and JSON response body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Query string.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct Query<T>(pub T);

/// Path parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct Path<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Page {
        page: u32,
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let request = Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"page\": "))
            .unwrap();

        let err = Json::<Page>::from_request(request, &()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(!err.client_message().is_empty());
    }

    #[tokio::test]
    async fn test_bad_query_is_bad_request() {
        let request = Request::builder().uri("/?page=abc").body(()).unwrap();
        let (mut parts, ()) = request.into_parts();

        let err = Query::<Page>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let request = Request::builder().uri("/?page=4").body(()).unwrap();
        let (mut parts, ()) = request.into_parts();
        let Query(page) = Query::<Page>::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(page.page, 4);
    }
}
