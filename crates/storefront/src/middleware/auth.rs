//! Authentication extractors and session helpers.
//!
//! The session holds a [`CurrentUser`] snapshot under
//! [`session_keys::CURRENT_USER`]. Handlers pick the extractor matching
//! their access level: [`OptionalAuth`], [`RequireAuth`] or [`RequireAdmin`].

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::db::UserRepository;
use crate::error::AppError;
use crate::models::{CurrentUser, User, session_keys};
use crate::state::AppState;

async fn session_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// Extractor that requires a signed-in user.
///
/// Rejects with `401 {"error": "..."}` when nobody is signed in.
///
/// # Example
///
/// ```rust,ignore
/// async fn orders(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Orders for {}", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_user(parts)
            .await
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized("Please sign in to continue".to_string()))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is signed in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_user(parts).await))
    }
}

/// Extractor for back-office routes.
///
/// The role in the session is only a snapshot, so the user is reloaded and
/// the role checked against the database: `401` when not signed in (or the
/// account is gone), `403` when signed in without the admin role.
pub struct RequireAdmin(pub User);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let unauthorized = || AppError::Unauthorized("Please sign in to continue".to_string());

        let current = session_user(parts).await.ok_or_else(unauthorized)?;
        let user = UserRepository::new(state.pool())
            .get_by_id(current.id)
            .await?
            .ok_or_else(unauthorized)?;

        if !user.role.is_admin() {
            tracing::warn!(user_id = %user.id, "Non-admin attempted back-office access");
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }

        Ok(Self(user))
    }
}

/// Store the signed-in user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}
