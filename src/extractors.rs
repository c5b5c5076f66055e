use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::{AppError, AppResult};

/// The identity the authorization gate resolved for this request.
///
/// Only available on routes wrapped by the gate; anywhere else extraction
/// fails with 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub is_admin: bool,
    pub is_blocked: bool,
}

impl CurrentUser {
    /// Owners and admins may change or delete an entity.
    pub fn ensure_can_modify(&self, owner_id: i64) -> AppResult<()> {
        if self.id == owner_id || self.is_admin {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "You can only modify your own content.".into(),
            ))
        }
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}
