use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, QuerySelect,
    Set,
};
use uuid::Uuid;

use crate::{
    dto::shops::ShopList,
    entity::{Shops, Users, sea_orm_active_enums::Role, shops, users},
    error::{AppError, AppResult},
    middleware::{
        auth::{AuthUser, ensure_merchant, ensure_owner},
        form::FormData,
    },
    models::Shop,
    response::{ApiResponse, Deleted, Meta},
    state::AppState,
};

const IMAGE_FOLDER: &str = "shops";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid regex"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn checked_email(email: String) -> AppResult<String> {
    if !is_valid_email(&email) {
        return Err(AppError::bad_request("Invalid email address"));
    }
    Ok(email)
}

fn shop_list(models: Vec<shops::Model>) -> (ShopList, Meta) {
    let items: Vec<Shop> = models.into_iter().map(Shop::from).collect();
    let meta = Meta::total(items.len() as u64);
    (ShopList { items }, meta)
}

pub async fn list_shops(state: &AppState) -> AppResult<ApiResponse<ShopList>> {
    let models = Shops::find()
        .order_by_desc(shops::Column::CreatedAt)
        .all(&state.orm)
        .await?;
    let (data, meta) = shop_list(models);
    Ok(ApiResponse::success("Shops", data, Some(meta)))
}

pub async fn list_my_shops(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<ShopList>> {
    ensure_merchant(user)?;
    let models = Shops::find()
        .filter(shops::Column::OwnerId.eq(user.user_id))
        .order_by_desc(shops::Column::CreatedAt)
        .all(&state.orm)
        .await?;
    let (data, meta) = shop_list(models);
    Ok(ApiResponse::success("My shops", data, Some(meta)))
}

pub async fn get_shop(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Shop>> {
    let shop = Shops::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Shop"))?;
    Ok(ApiResponse::success("Shop", shop.into(), None))
}

/// Shop contact plus every admin, without duplicates.
async fn shop_notification_recipients(state: &AppState, contact: &str) -> AppResult<Vec<String>> {
    let admins: Vec<String> = Users::find()
        .select_only()
        .column(users::Column::Email)
        .filter(users::Column::Role.eq(Role::Admin))
        .into_tuple()
        .all(&state.orm)
        .await?;

    let mut recipients = vec![contact.to_string()];
    for email in admins {
        if !recipients.contains(&email) {
            recipients.push(email);
        }
    }
    Ok(recipients)
}

pub async fn create_shop(
    state: &AppState,
    user: &AuthUser,
    mut form: FormData,
) -> AppResult<ApiResponse<Shop>> {
    ensure_merchant(user)?;

    let (Some(name), Some(location), Some(telephone), Some(email)) = (
        form.string("name"),
        form.string("location"),
        form.string("telephone"),
        form.string("email"),
    ) else {
        return Err(AppError::bad_request(
            "Name, location, telephone, and email are required",
        ));
    };
    let email = checked_email(email)?;

    let image = form.image(state.media.as_ref(), IMAGE_FOLDER, "image").await;
    let now = Utc::now();
    let shop = shops::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        description: Set(form.string("description")),
        location: Set(location),
        telephone: Set(telephone),
        email: Set(email),
        image: Set(image),
        owner_id: Set(user.user_id),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(shop_id = %shop.id, owner_id = %user.user_id, "shop created");

    // Notification lookup problems must not fail a shop that already exists.
    match shop_notification_recipients(state, &shop.email).await {
        Ok(recipients) => state
            .notifier
            .shop_created(&shop.name, &shop.location, &recipients),
        Err(err) => {
            tracing::error!(shop_id = %shop.id, error = %err, "could not resolve shop notification recipients")
        }
    }

    Ok(ApiResponse::success(
        "Shop created successfully",
        shop.into(),
        Some(Meta::empty()),
    ))
}

pub async fn update_shop(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    mut form: FormData,
) -> AppResult<ApiResponse<Shop>> {
    ensure_merchant(user)?;
    let existing = Shops::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Shop"))?;
    ensure_owner(user, existing.owner_id, "shop")?;

    let mut active: shops::ActiveModel = existing.into();
    if let Some(name) = form.string("name") {
        active.name = Set(name);
    }
    if let Some(description) = form.string("description") {
        active.description = Set(Some(description));
    }
    if let Some(location) = form.string("location") {
        active.location = Set(location);
    }
    if let Some(telephone) = form.string("telephone") {
        active.telephone = Set(telephone);
    }
    if let Some(email) = form.string("email") {
        active.email = Set(checked_email(email)?);
    }
    if let Some(image) = form.image(state.media.as_ref(), IMAGE_FOLDER, "image").await {
        active.image = Set(Some(image));
    }
    active.updated_at = Set(Utc::now().into());

    let shop = active.update(&state.orm).await?;
    tracing::info!(shop_id = %shop.id, user_id = %user.user_id, "shop updated");
    Ok(ApiResponse::success(
        "Shop updated successfully",
        shop.into(),
        Some(Meta::empty()),
    ))
}

/// Products and promotions keep the shop id; it resolves to `null` afterwards.
pub async fn delete_shop(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Deleted>> {
    ensure_merchant(user)?;
    let existing = Shops::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Shop"))?;
    ensure_owner(user, existing.owner_id, "shop")?;

    existing.delete(&state.orm).await?;
    tracing::info!(shop_id = %id, user_id = %user.user_id, "shop deleted");
    Ok(ApiResponse::success(
        "Shop deleted successfully",
        Deleted { id },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::is_valid_email;

    #[test]
    fn email_shape() {
        assert!(is_valid_email("shop@market.rw"));
        assert!(!is_valid_email("shop@market"));
        assert!(!is_valid_email("shop market@x.rw"));
        assert!(!is_valid_email("@market.rw"));
    }
}
