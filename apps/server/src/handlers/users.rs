//! User administration (admin only).

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tally_core::auth::ADMIN_ONLY;
use tally_core::validation::{optional, require, validate_email, validate_name, validate_pin};
use tally_core::{Role, User};
use tally_db::NewUser;
use tracing::info;

use super::json_body;
use crate::auth::{hash_password, MaybeSession};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Public view of a user. Never carries the hash or the PIN.
#[derive(Debug, Clone, Serialize)]
pub struct UserDto {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub role: Role,
}

impl From<User> for UserDto {
    fn from(u: User) -> Self {
        UserDto {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub pin: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedUser {
    pub id: String,
    pub name: String,
}

/// `POST /users`: creates a user directly. Only `name` is required.
pub async fn create_user(
    State(state): State<AppState>,
    session: MaybeSession,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreatedUser>)> {
    let admin = session.require(ADMIN_ONLY)?;
    let body = json_body(body)?;

    let name = validate_name("name", &require("name", body.name.as_deref())?)?;
    let email = optional(body.email.as_deref())
        .map(|e| validate_email(&e))
        .transpose()?;
    let pin = optional(body.pin.as_deref())
        .map(|p| validate_pin(&p))
        .transpose()?;
    let password_hash = optional(body.password.as_deref())
        .map(|p| hash_password(&p))
        .transpose()?;
    let role = match optional(body.role.as_deref()) {
        Some(raw) => raw.parse::<Role>()?,
        None => Role::default(),
    };

    let user = state
        .db
        .users()
        .insert(NewUser {
            name,
            email,
            password_hash,
            pin,
            role,
        })
        .await?;

    info!(user_id = %user.id, created_by = %admin.user_id, "User created");
    Ok((
        StatusCode::CREATED,
        Json(CreatedUser {
            id: user.id,
            name: user.name,
        }),
    ))
}

/// `GET /users`
pub async fn list_users(
    State(state): State<AppState>,
    session: MaybeSession,
) -> ApiResult<Json<Vec<UserDto>>> {
    session.require(ADMIN_ONLY)?;

    let users = state.db.users().list().await?;
    Ok(Json(users.into_iter().map(UserDto::from).collect()))
}

/// `GET /oneusers/{id}`
pub async fn get_user(
    State(state): State<AppState>,
    session: MaybeSession,
    Path(id): Path<String>,
) -> ApiResult<Json<UserDto>> {
    session.require(ADMIN_ONLY)?;

    let user = state
        .db
        .users()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", &id))?;

    Ok(Json(user.into()))
}
