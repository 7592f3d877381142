//! # HTTP Handlers
//!
//! One module per resource. Every handler follows the same shape:
//!
//! ```text
//! extract (State, MaybeSession, Path/Query/Form/Json)
//!    │
//!    ▼
//! session.allow(access)?     ← single authorization policy
//!    │
//!    ▼
//! validate input (tally_core::validation)
//!    │
//!    ▼
//! repository call (tally_db) ──► ApiError on failure
//!    │
//!    ▼
//! JSON body or 303 redirect
//! ```

pub mod auth;
pub mod customers;
pub mod health;
pub mod orders;
pub mod products;
pub mod users;

use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::{Form, Json};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};

/// Body for operations that have nothing else to return.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(MessageResponse {
            message: message.into(),
        })
    }
}

/// Unwraps a form body, reporting decode failures as `VALIDATION_ERROR`.
pub(crate) fn form_body<T>(payload: Result<Form<T>, FormRejection>) -> ApiResult<T> {
    payload
        .map(|Form(body)| body)
        .map_err(|e| ApiError::validation(e.body_text()))
}

/// Unwraps a JSON body, reporting decode failures as `VALIDATION_ERROR`.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::validation(e.body_text()))
}
