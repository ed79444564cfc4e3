use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::domain::user::Role;
use crate::http::AppError;
use crate::AppState;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

/// An authenticated moderator or admin.
#[derive(Debug, Clone)]
pub struct ModeratorUser {
    pub user_id: Uuid,
    pub role: Role,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("invalid Authorization header"))?;

        let session = state
            .tokens
            .authenticate_access_token(token)
            .map_err(|err| {
                tracing::error!(error = ?err, "failed to authenticate");
                AppError::internal("failed to authenticate")
            })?;

        let session = session.ok_or_else(|| AppError::unauthorized("invalid token"))?;
        Ok(AuthUser {
            user_id: session.user_id,
            role: session.role,
        })
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for ModeratorUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.role.is_staff() {
            return Err(AppError::forbidden("moderator role required"));
        }
        Ok(ModeratorUser {
            user_id: user.user_id,
            role: user.role,
        })
    }
}
