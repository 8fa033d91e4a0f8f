//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`. Error bodies are JSON: `{"error": "message"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use urban_style_core::catalog::CatalogValidationError;
use urban_style_core::checkout::CheckoutError;
use urban_style_core::reports::ReportRangeError;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::checkout::PlaceOrderError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout was refused.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Category or product form was rejected.
    #[error("Validation error: {0}")]
    Validation(#[from] CatalogValidationError),

    /// Report date range was rejected.
    #[error("Report range error: {0}")]
    ReportRange(#[from] ReportRangeError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<PlaceOrderError> for AppError {
    fn from(err: PlaceOrderError) -> Self {
        match err {
            PlaceOrderError::Checkout(e) => Self::Checkout(e),
            PlaceOrderError::Cart(e) => Self::Cart(e),
            PlaceOrderError::Repository(e) => Self::Database(e),
        }
    }
}

const INTERNAL_MESSAGE: &str = "Internal server error";

fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn repository_message(err: &RepositoryError) -> String {
    match err {
        RepositoryError::NotFound => "Not found".to_string(),
        RepositoryError::Conflict(msg) => capitalize(msg),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            INTERNAL_MESSAGE.to_string()
        }
    }
}

fn capitalize(msg: &str) -> String {
    let mut chars = msg.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => repository_status(err),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::MissingField(_)
                | AuthError::InvalidEmail(_)
                | AuthError::WeakPassword(_)
                | AuthError::PasswordMismatch => StatusCode::BAD_REQUEST,
                AuthError::Repository(err) => repository_status(err),
                AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Cart(err) => match err {
                CartError::UnknownProduct => StatusCode::NOT_FOUND,
                CartError::InvalidSize(_) | CartError::QuantityTooLarge => StatusCode::BAD_REQUEST,
                CartError::Repository(err) => repository_status(err),
                CartError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Checkout(_) | Self::Validation(_) | Self::ReportRange(_) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the client.
    ///
    /// Server errors never expose their details.
    #[must_use]
    pub fn client_message(&self) -> String {
        if self.status().is_server_error() {
            return INTERNAL_MESSAGE.to_string();
        }

        match self {
            Self::Database(err) | Self::Auth(AuthError::Repository(err)) => {
                repository_message(err)
            }
            Self::Cart(CartError::Repository(err)) => repository_message(err),
            Self::Auth(err) => match err {
                AuthError::MissingField(field) => format!("{field} is required"),
                AuthError::InvalidEmail(_) => "Invalid email format".to_string(),
                AuthError::InvalidCredentials => "Invalid credentials".to_string(),
                AuthError::UserAlreadyExists => {
                    "An account with this email already exists".to_string()
                }
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::PasswordMismatch => "Passwords do not match".to_string(),
                _ => "Authentication error".to_string(),
            },
            Self::Cart(CartError::UnknownProduct) => "Product not found".to_string(),
            Self::Checkout(CheckoutError::InvalidEmail(_)) => "Invalid email format".to_string(),
            Self::Cart(err) => capitalize(&err.to_string()),
            Self::Checkout(err) => capitalize(&err.to_string()),
            Self::Validation(err) => capitalize(&err.to_string()),
            Self::ReportRange(err) => capitalize(&err.to_string()),
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg) => msg.clone(),
            Self::Session(_) => INTERNAL_MESSAGE.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (status, Json(json!({ "error": self.client_message() }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_repository_errors_map_by_kind() {
        assert_eq!(
            get_status(AppError::Database(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
        let conflict = AppError::Database(RepositoryError::Conflict(
            "a category with this slug already exists".to_string(),
        ));
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
        assert_eq!(
            conflict.client_message(),
            "A category with this slug already exists"
        );

        let corrupt = AppError::Database(RepositoryError::DataCorruption("bad row".to_string()));
        assert_eq!(corrupt.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(corrupt.client_message(), "Internal server error");
    }

    #[test]
    fn test_auth_messages() {
        let err = AppError::Auth(AuthError::InvalidCredentials);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.client_message(), "Invalid credentials");

        let err = AppError::Auth(AuthError::MissingField("Email"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.client_message(), "Email is required");

        let err = AppError::Auth(AuthError::UserAlreadyExists);
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_checkout_errors_are_bad_requests() {
        let err = AppError::from(PlaceOrderError::Checkout(CheckoutError::EmptyCart));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.client_message(), "Your cart is empty");
    }

    #[test]
    fn test_oversized_quantity_is_a_client_error() {
        let err = AppError::Cart(CartError::QuantityTooLarge);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.client_message(), "Quantity cannot exceed 999");
    }

    #[tokio::test]
    async fn test_error_body_is_json() {
        let response = AppError::NotFound("Product not found".to_string()).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Product not found");
    }
}
