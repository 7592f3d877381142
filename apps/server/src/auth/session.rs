//! Signed session tokens.
//!
//! ## Session Flow
//! ```text
//! POST /login ──► verify password ──► issue JWT ──► Set-Cookie: tally_session=<jwt>
//!
//! any request ──► MaybeSession extractor
//!                   │
//!                   ├── Authorization: Bearer <jwt>   (checked first)
//!                   ├── Cookie: tally_session=<jwt>
//!                   │
//!                   ├── valid   ──► Some(SessionUser)
//!                   └── missing / bad / expired ──► None
//! ```
//!
//! The extractor never rejects; the authorization policy decides what an
//! anonymous caller may do.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use tally_core::auth::require_user;
use tally_core::{authorize, Access, Role, SessionUser};
use uuid::Uuid;

use crate::config::AuthSettings;
use crate::error::{ApiError, ErrorCode};
use crate::state::AppState;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Display name
    pub name: String,

    pub role: Role,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,
}

impl From<Claims> for SessionUser {
    fn from(claims: Claims) -> Self {
        SessionUser {
            user_id: claims.sub,
            name: claims.name,
            role: claims.role,
        }
    }
}

/// Issues and verifies session tokens, and builds the session cookie.
pub struct SessionManager {
    secret: String,
    lifetime_secs: i64,
    cookie_name: String,
}

impl SessionManager {
    pub fn new(secret: String, lifetime_secs: i64, cookie_name: String) -> Self {
        SessionManager {
            secret,
            lifetime_secs,
            cookie_name,
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        SessionManager::new(
            settings.session_secret.clone(),
            settings.session_lifetime_secs,
            settings.cookie_name.clone(),
        )
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Generate a session token for `user`.
    pub fn issue(&self, user: &SessionUser) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: user.user_id.clone(),
            name: user.name.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| {
            tracing::error!("Failed to generate session token: {}", e);
            ApiError::internal("Failed to establish session")
        })
    }

    /// Validate and decode a token.
    pub fn verify(&self, token: &str) -> Result<SessionUser, ApiError> {
        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| ApiError::new(ErrorCode::AuthError, format!("Invalid session: {}", e)))?;

        Ok(token_data.claims.into())
    }

    /// `Set-Cookie` value carrying `token`.
    pub fn session_cookie(&self, token: &str) -> String {
        format!(
            "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
            self.cookie_name, token, self.lifetime_secs
        )
    }

    /// `Set-Cookie` value that removes the session cookie.
    pub fn clear_cookie(&self) -> String {
        format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", self.cookie_name)
    }

    /// Finds the session token in a bearer header or the session cookie.
    pub fn token_from_headers<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        if let Some(token) = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(extract_bearer_token)
        {
            return Some(token);
        }

        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, value)| *name == self.cookie_name && !value.is_empty())
            .map(|(_, value)| value)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

// =============================================================================
// Extractor
// =============================================================================

/// The caller's session, if any.
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<SessionUser>);

impl MaybeSession {
    /// Runs the authorization policy against this session.
    pub fn allow(&self, access: Access) -> Result<Option<&SessionUser>, ApiError> {
        authorize(self.0.as_ref(), access).map_err(|e| self.denied(e))
    }

    /// Like [`MaybeSession::allow`], for operations that always need a
    /// signed-in caller.
    pub fn require(&self, access: Access) -> Result<&SessionUser, ApiError> {
        require_user(self.0.as_ref(), access).map_err(|e| self.denied(e))
    }

    fn denied(&self, err: tally_core::CoreError) -> ApiError {
        match &self.0 {
            Some(user) => {
                tracing::warn!(user_id = %user.user_id, role = %user.role, "Forbidden: {}", err)
            }
            None => tracing::warn!("Forbidden: {}", err),
        }
        err.into()
    }
}

impl FromRequestParts<AppState> for MaybeSession {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = state.sessions.token_from_headers(&parts.headers) else {
            return Ok(MaybeSession(None));
        };

        match state.sessions.verify(token) {
            Ok(user) => Ok(MaybeSession(Some(user))),
            Err(e) => {
                tracing::debug!("Ignoring session token: {}", e.message);
                Ok(MaybeSession(None))
            }
        }
    }
}
