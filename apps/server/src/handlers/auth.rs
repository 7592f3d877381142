//! # Signup, Login, Logout
//!
//! ## Login Flow
//! ```text
//! POST /login (form: email, password)
//!      │
//!      ▼
//! users.get_by_email ── none ──────────────┐
//!      │                                    │
//!      ▼                                    ▼
//! verify_password ───── mismatch ──► 401 AUTH_ERROR  (no lockout, no session)
//!      │
//!      ▼
//! issue JWT ──► Set-Cookie ──► 303 /inventory
//! ```
//!
//! Unknown email and wrong password produce the same response.

use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::response::{IntoResponse, Redirect};
use axum::Form;
use serde::Deserialize;
use tally_core::auth::authorize_signup_role;
use tally_core::validation::{require, validate_email, validate_name, validate_pin};
use tally_core::{CoreError, Role, SessionUser};
use tally_db::NewUser;
use tracing::{info, warn};

use super::form_body;
use crate::auth::{hash_password, verify_password, MaybeSession};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub pin: Option<String>,
    pub role: Option<String>,
}

/// `POST /signup`: registers an account and redirects to `/login`.
///
/// ## Errors
/// * 400 `VALIDATION_ERROR` - missing or malformed field
/// * 403 `FORBIDDEN` - non-customer role requested without an admin session
/// * 409 `CONFLICT` - email already registered
pub async fn signup(
    State(state): State<AppState>,
    session: MaybeSession,
    form: Result<Form<SignupForm>, FormRejection>,
) -> ApiResult<Redirect> {
    let form = form_body(form)?;

    let name = validate_name("name", &require("name", form.name.as_deref())?)?;
    let email = validate_email(&require("email", form.email.as_deref())?)?;
    let password = require("password", form.password.as_deref())?;
    let pin = validate_pin(&require("pin", form.pin.as_deref())?)?;
    let role = match form.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(raw) => raw.parse::<Role>()?,
        None => Role::default(),
    };

    if let Err(e) = authorize_signup_role(session.0.as_ref(), role) {
        warn!(%email, %role, "Signup with elevated role refused");
        return Err(e.into());
    }

    let password_hash = hash_password(&password)?;

    let user = state
        .db
        .users()
        .insert(NewUser {
            name,
            email: Some(email),
            password_hash: Some(password_hash),
            pin: Some(pin),
            role,
        })
        .await?;

    info!(user_id = %user.id, role = %user.role, "User signed up");
    Ok(Redirect::to("/login"))
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// `POST /login`: establishes a session cookie and redirects to `/inventory`.
pub async fn login(
    State(state): State<AppState>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> ApiResult<impl IntoResponse> {
    let form = form_body(form)?;

    let email = require("email", form.email.as_deref())?.to_lowercase();
    let password = require("password", form.password.as_deref())?;

    let user = state.db.users().get_by_email(&email).await?;

    let verified = match user.as_ref().and_then(|u| u.password_hash.as_deref()) {
        Some(hash) => verify_password(&password, hash)?,
        None => false,
    };

    let user = match user {
        Some(user) if verified => user,
        _ => {
            warn!(%email, "Login rejected");
            return Err(CoreError::InvalidCredentials.into());
        }
    };

    let session = SessionUser {
        user_id: user.id,
        name: user.name,
        role: user.role,
    };
    let token = state.sessions.issue(&session)?;

    info!(user_id = %session.user_id, role = %session.role, "User logged in");
    Ok((
        [(SET_COOKIE, state.sessions.session_cookie(&token))],
        Redirect::to("/inventory"),
    ))
}

/// `POST /logout`: clears the session cookie.
pub async fn logout(State(state): State<AppState>, session: MaybeSession) -> impl IntoResponse {
    if let Some(user) = &session.0 {
        info!(user_id = %user.user_id, "User logged out");
    }
    (
        [(SET_COOKIE, state.sessions.clear_cookie())],
        Redirect::to("/login"),
    )
}
