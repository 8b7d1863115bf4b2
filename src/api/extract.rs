//! Caller identity.
//!
//! Authentication happens in front of this service; the gateway forwards the
//! signed-in user's id in `x-user-id`. Roles come from the user's profile.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::error::ApiError;
use super::AppState;
use crate::domain::aggregates::User;

pub const USER_ID_HEADER: &str = "x-user-id";

fn header_user_id(parts: &Parts) -> Option<String> {
    parts.headers.get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Authenticated id, whether or not a profile exists yet.
pub struct UserId(pub String);

#[async_trait]
impl FromRequestParts<AppState> for UserId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        header_user_id(parts).map(Self).ok_or(ApiError::Unauthorized)
    }
}

/// Signed-in user with a profile.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let id = header_user_id(parts).ok_or(ApiError::Unauthorized)?;
        let user = state.users.get(&id).await?.ok_or(ApiError::Unauthorized)?;
        Ok(Self(user))
    }
}

/// Signed-in user if there is one; anonymous shoppers get `None`.
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match header_user_id(parts) {
            Some(id) => Ok(Self(state.users.get(&id).await?)),
            None => Ok(Self(None)),
        }
    }
}

/// Signed-in user whose role is admin.
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            tracing::warn!(user_id = %user.id, "admin route refused");
            return Err(ApiError::Forbidden);
        }
        Ok(Self(user))
    }
}
