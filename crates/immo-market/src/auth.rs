//! Principal extraction and role checks.
//!
//! The identity provider sits in front of the service and forwards the authenticated user id
//! in `x-user-id`. Roles are never taken from the request: they are read from the stored user
//! record on every privileged call.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::store::RepositoryError;
use crate::workflows::accounts::domain::{Role, UserAccount, UserId};
use crate::workflows::accounts::repository::UserDirectory;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller, as asserted by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
}

impl Principal {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: UserId(user_id.into()),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        match user_id {
            Some(id) => Ok(Principal::new(id)),
            None => Err(AccessError::UnknownPrincipal.into_response()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("principal is not a registered user")]
    UnknownPrincipal,
    #[error("{role} role required")]
    Forbidden { role: &'static str },
    #[error(transparent)]
    Store(#[from] RepositoryError),
}

impl AccessError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AccessError::UnknownPrincipal => StatusCode::UNAUTHORIZED,
            AccessError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AccessError::Store(err) => err.status_code(),
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            AccessError::UnknownPrincipal => "Please sign in again to continue.",
            AccessError::Forbidden { .. } => RepositoryError::PermissionDenied.user_message(),
            AccessError::Store(err) => err.user_message(),
        }
    }
}

impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.user_message() });
        (self.status_code(), Json(payload)).into_response()
    }
}

/// Load the caller's stored record.
pub fn resolve<U>(users: &U, principal: &Principal) -> Result<UserAccount, AccessError>
where
    U: UserDirectory + ?Sized,
{
    users
        .fetch_user(&principal.user_id)?
        .ok_or(AccessError::UnknownPrincipal)
}

/// Load the caller's record and require the admin role on it.
pub fn require_admin<U>(users: &U, principal: &Principal) -> Result<UserAccount, AccessError>
where
    U: UserDirectory + ?Sized,
{
    let account = resolve(users, principal)?;
    if account.role == Role::Admin {
        Ok(account)
    } else {
        tracing::warn!(user = %principal.user_id, "admin action refused");
        Err(AccessError::Forbidden {
            role: Role::Admin.label(),
        })
    }
}
