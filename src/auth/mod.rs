//! Trusted identity extraction.
//!
//! Authentication happens upstream; the gateway injects the authenticated
//! user id and role as headers on every request. This service trusts that
//! identity and never re-validates credentials.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::models::AppRole;
use crate::utils::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: AppRole,
}

impl AuthUser {
    pub fn require_organizer(&self) -> Result<(), AppError> {
        if self.role == AppRole::Organizer {
            Ok(())
        } else {
            Err(AppError::Forbidden("organizer role required".to_string()))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::AuthError("missing user identity".to_string()))?
            .parse::<Uuid>()
            .map_err(|_| AppError::AuthError("malformed user identity".to_string()))?;

        let role = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("participant")
            .parse::<AppRole>()
            .map_err(|_| AppError::AuthError("unknown role".to_string()))?;

        Ok(AuthUser { user_id, role })
    }
}
