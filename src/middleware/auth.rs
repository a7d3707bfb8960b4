use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use sea_orm::EntityTrait;
use uuid::Uuid;

use crate::{
    entity::{Users, sea_orm_active_enums::Role},
    error::{AppError, AppResult},
    services::auth_service::decode_token,
    state::AppState,
};

/// Authenticated caller. The role is read from the database on every request,
/// never from the token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owners and admins may mutate an owned resource.
    pub fn can_manage(&self, owner_id: Uuid) -> bool {
        self.is_admin() || self.user_id == owner_id
    }
}

pub fn ensure_roles(user: &AuthUser, allowed: &[Role]) -> AppResult<()> {
    if !allowed.contains(&user.role) {
        return Err(AppError::forbidden("Insufficient permissions"));
    }
    Ok(())
}

pub fn ensure_admin(user: &AuthUser) -> AppResult<()> {
    ensure_roles(user, &[Role::Admin])
}

pub fn ensure_merchant(user: &AuthUser) -> AppResult<()> {
    ensure_roles(user, &[Role::Admin, Role::BusinessOwner])
}

pub fn ensure_owner(user: &AuthUser, owner_id: Uuid, what: &str) -> AppResult<()> {
    if !user.can_manage(owner_id) {
        return Err(AppError::forbidden(format!(
            "You do not have permission to modify this {what}"
        )));
    }
    Ok(())
}

fn bearer_token(parts: &Parts) -> AppResult<Option<&str>> {
    let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::forbidden("Invalid or expired token"))?;
    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::forbidden("Invalid or expired token"))?;
    Ok(Some(token))
}

async fn resolve(state: &AppState, token: &str) -> AppResult<AuthUser> {
    let claims = decode_token(&state.config, token)
        .map_err(|_| AppError::forbidden("Invalid or expired token"))?;
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::forbidden("Invalid or expired token"))?;

    let user = Users::find_by_id(user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::forbidden("Invalid or expired token"))?;

    Ok(AuthUser {
        user_id: user.id,
        role: user.role,
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?
            .ok_or_else(|| AppError::Unauthorized("Access token required".into()))?;
        resolve(state, token).await
    }
}

/// Optional authentication: a missing or invalid token degrades to an
/// anonymous caller instead of rejecting the request.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = match bearer_token(parts) {
            Ok(Some(token)) => token,
            _ => return Ok(Self(None)),
        };
        match resolve(state, token).await {
            Ok(user) => Ok(Self(Some(user))),
            Err(AppError::Forbidden(_)) => Ok(Self(None)),
            Err(err) => {
                tracing::warn!(error = %err, "optional authentication failed");
                Ok(Self(None))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn role_gates() {
        assert!(ensure_merchant(&user(Role::BusinessOwner)).is_ok());
        assert!(ensure_merchant(&user(Role::Admin)).is_ok());
        assert!(matches!(
            ensure_merchant(&user(Role::Customer)),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            ensure_admin(&user(Role::BusinessOwner)),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn admin_bypasses_ownership() {
        let owner = user(Role::BusinessOwner);
        let other = user(Role::BusinessOwner);
        let admin = user(Role::Admin);

        assert!(ensure_owner(&owner, owner.user_id, "product").is_ok());
        assert!(ensure_owner(&admin, owner.user_id, "product").is_ok());
        assert!(matches!(
            ensure_owner(&other, owner.user_id, "product"),
            Err(AppError::Forbidden(_))
        ));
    }
}
