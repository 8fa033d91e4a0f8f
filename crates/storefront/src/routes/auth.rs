//! Authentication route handlers.
//!
//! Register, login and logout with email and password. A successful login
//! or registration cycles the session ID and folds the guest cart into the
//! user's server cart.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use urban_style_core::cart::CartSummary;

use crate::db::UserRepository;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::extract::Json;
use crate::middleware::{OptionalAuth, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::auth::{AuthService, LoginForm, RegisterForm};
use crate::services::cart::{ActiveCartStore, CartService, merge_guest_cart};
use crate::state::AppState;

/// Body returned after login or registration.
#[derive(Debug, Serialize)]
pub struct SignedIn {
    pub user: User,
    pub is_admin: bool,
    pub cart: CartSummary,
}

/// Body of `GET /api/auth/me`.
#[derive(Debug, Serialize)]
pub struct Me {
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub is_admin: bool,
}

/// Put `user` in the session and merge the guest cart.
///
/// A failed merge is logged and leaves the guest cart in the session; the
/// sign-in itself still succeeds.
async fn sign_in(state: &AppState, session: &Session, user: User) -> Result<SignedIn> {
    session.cycle_id().await?;
    set_current_user(session, &CurrentUser::from(&user)).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    let cart = match merge_guest_cart(session, state.pool(), state.catalog(), user.id).await {
        Ok(cart) => cart,
        Err(e) => {
            tracing::error!(error = %e, user_id = %user.id, "Guest cart merge failed");
            let store = ActiveCartStore::for_request(
                session.clone(),
                Some(&CurrentUser::from(&user)),
                state.pool(),
                state.catalog(),
            );
            CartService::new(store).cart().await?
        }
    };

    Ok(SignedIn {
        is_admin: user.role.is_admin(),
        cart: cart.summary(),
        user,
    })
}

/// `POST /api/auth/register`
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<RegisterForm>,
) -> Result<impl IntoResponse> {
    let user = AuthService::new(state.pool()).register(&form).await?;
    let body = sign_in(&state, &session, user).await?;

    Ok((StatusCode::CREATED, Json(body)))
}

/// `POST /api/auth/login`
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<LoginForm>,
) -> Result<Json<SignedIn>> {
    let user = AuthService::new(state.pool()).login(&form).await.inspect_err(|e| {
        tracing::info!(error = %e, "Login rejected");
    })?;

    Ok(Json(sign_in(&state, &session, user).await?))
}

/// `POST /api/auth/logout`
///
/// Drops the whole session. The server cart stays in the database; the
/// next anonymous session starts with an empty guest cart.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<StatusCode> {
    session.flush().await?;
    clear_sentry_user();

    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/auth/me`
///
/// Reloads the profile so the admin flag reflects the current role.
pub async fn me(
    State(state): State<AppState>,
    OptionalAuth(current): OptionalAuth,
) -> Result<Json<Me>> {
    let user = match current {
        Some(current) => UserRepository::new(state.pool()).get_by_id(current.id).await?,
        None => None,
    };

    Ok(Json(Me {
        is_authenticated: user.is_some(),
        is_admin: user.as_ref().is_some_and(|u| u.role.is_admin()),
        user,
    }))
}
