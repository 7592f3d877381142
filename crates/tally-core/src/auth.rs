//! # Authorization Policy
//!
//! The single guard every protected operation passes through.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request ──► session extractor ──► authorize(session, access) ──► op   │
//! │                     │                         │                         │
//! │                     │                         ├── Ok(&SessionUser)      │
//! │              Option<SessionUser>              └── Err(Forbidden)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Handlers never inspect roles themselves; they declare an [`Access`] and
//! let [`authorize`] decide.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::Role;

/// Who is making the request, as carried by a verified session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub user_id: String,
    pub name: String,
    pub role: Role,
}

/// What an operation requires of its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Anyone, signed in or not.
    Public,
    /// Any signed-in user.
    Authenticated,
    /// A signed-in user holding one of these roles.
    Roles(&'static [Role]),
}

/// Admin or employee.
pub const STAFF: Access = Access::Roles(&[Role::Admin, Role::Employee]);

/// Admin only.
pub const ADMIN_ONLY: Access = Access::Roles(&[Role::Admin]);

/// Decides whether `session` may perform an operation guarded by `access`.
///
/// ## Returns
/// * `Ok(Some(user))` - allowed, caller is signed in
/// * `Ok(None)` - allowed, anonymous caller on a public operation
/// * `Err(CoreError::Forbidden)` - denied
pub fn authorize(session: Option<&SessionUser>, access: Access) -> CoreResult<Option<&SessionUser>> {
    match (access, session) {
        (Access::Public, session) => Ok(session),
        (_, None) => Err(CoreError::forbidden("sign in required")),
        (Access::Authenticated, Some(user)) => Ok(Some(user)),
        (Access::Roles(allowed), Some(user)) => {
            if allowed.contains(&user.role) {
                Ok(Some(user))
            } else {
                Err(CoreError::forbidden(format!(
                    "role '{}' may not perform this action",
                    user.role
                )))
            }
        }
    }
}

/// Like [`authorize`] for operations that always need a signed-in caller.
pub fn require_user(session: Option<&SessionUser>, access: Access) -> CoreResult<&SessionUser> {
    match authorize(session, access)? {
        Some(user) => Ok(user),
        None => Err(CoreError::forbidden("sign in required")),
    }
}

/// Checks whether a signup may request `role`.
///
/// Anyone may create a customer account; employee and admin accounts need
/// an admin session.
pub fn authorize_signup_role(session: Option<&SessionUser>, role: Role) -> CoreResult<()> {
    if role == Role::Customer {
        return Ok(());
    }
    authorize(session, ADMIN_ONLY).map(|_| ())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> SessionUser {
        SessionUser {
            user_id: "u-1".to_string(),
            name: "Sam".to_string(),
            role,
        }
    }

    #[test]
    fn test_public_allows_everyone() {
        assert!(authorize(None, Access::Public).unwrap().is_none());
        let customer = user(Role::Customer);
        assert!(authorize(Some(&customer), Access::Public).unwrap().is_some());
    }

    #[test]
    fn test_anonymous_is_forbidden_everywhere_else() {
        assert!(matches!(
            authorize(None, Access::Authenticated),
            Err(CoreError::Forbidden { .. })
        ));
        assert!(authorize(None, STAFF).is_err());
        assert!(require_user(None, ADMIN_ONLY).is_err());
    }

    #[test]
    fn test_staff_policy() {
        assert!(authorize(Some(&user(Role::Customer)), STAFF).is_err());
        assert!(authorize(Some(&user(Role::Employee)), STAFF).is_ok());
        assert!(authorize(Some(&user(Role::Admin)), STAFF).is_ok());
    }

    #[test]
    fn test_admin_only_policy() {
        assert!(authorize(Some(&user(Role::Employee)), ADMIN_ONLY).is_err());
        let admin = user(Role::Admin);
        assert_eq!(require_user(Some(&admin), ADMIN_ONLY).unwrap(), &admin);
    }

    #[test]
    fn test_signup_role_policy() {
        assert!(authorize_signup_role(None, Role::Customer).is_ok());
        assert!(authorize_signup_role(None, Role::Employee).is_err());
        assert!(authorize_signup_role(Some(&user(Role::Employee)), Role::Admin).is_err());
        assert!(authorize_signup_role(Some(&user(Role::Admin)), Role::Employee).is_ok());
    }
}
