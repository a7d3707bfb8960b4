use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::users::{UpdateUserRequest, UserList},
    entity::{Carts, Users, carts, users},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::UserProfile,
    response::{ApiResponse, Deleted, Meta},
    services::{auth_service::normalize_email, shop_service::is_valid_email},
    state::AppState,
};

pub async fn list_users(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;
    let items: Vec<UserProfile> = Users::find()
        .order_by_desc(users::Column::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(UserProfile::from)
        .collect();
    let meta = Meta::total(items.len() as u64);
    Ok(ApiResponse::success("Users", UserList { items }, Some(meta)))
}

pub async fn update_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateUserRequest,
) -> AppResult<ApiResponse<UserProfile>> {
    ensure_admin(user)?;
    let existing = Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    let mut active: users::ActiveModel = existing.into();
    if let Some(name) = payload.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
        active.name = Set(name);
    }
    if let Some(email) = payload.email.map(|e| normalize_email(&e)).filter(|e| !e.is_empty()) {
        if !is_valid_email(&email) {
            return Err(AppError::bad_request("Invalid email address"));
        }
        active.email = Set(email);
    }
    if let Some(role) = payload.role {
        active.role = Set(role);
    }
    active.updated_at = Set(Utc::now().into());

    let updated = active.update(&state.orm).await?;
    tracing::info!(user_id = %updated.id, role = updated.role.as_str(), admin_id = %user.user_id, "user updated");
    Ok(ApiResponse::success(
        "User updated successfully",
        updated.into(),
        Some(Meta::empty()),
    ))
}

/// Removes the account and its cart. Orders are kept.
pub async fn delete_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Deleted>> {
    ensure_admin(user)?;
    if id == user.user_id {
        return Err(AppError::bad_request("You cannot delete your own account"));
    }

    let txn = state.orm.begin().await?;
    let existing = Users::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    Carts::delete_many()
        .filter(carts::Column::UserId.eq(id))
        .exec(&txn)
        .await?;
    existing.delete(&txn).await?;
    txn.commit().await?;

    tracing::info!(user_id = %id, admin_id = %user.user_id, "user deleted");
    Ok(ApiResponse::success(
        "User deleted successfully",
        Deleted { id },
        Some(Meta::empty()),
    ))
}
