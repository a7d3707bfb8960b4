use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, ModelTrait, QueryOrder, Set};
use uuid::Uuid;

use crate::{
    dto::categories::CategoryList,
    entity::{Categories, categories},
    error::{AppError, AppResult},
    middleware::{
        auth::{AuthUser, ensure_admin},
        form::FormData,
    },
    models::Category,
    response::{ApiResponse, Deleted, Meta},
    state::AppState,
};

const IMAGE_FOLDER: &str = "categories";

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let items: Vec<Category> = Categories::find()
        .order_by_asc(categories::Column::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Category::from)
        .collect();
    let meta = Meta::total(items.len() as u64);
    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(meta),
    ))
}

pub async fn get_category(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Category>> {
    let category = Categories::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Category"))?;
    Ok(ApiResponse::success("Category", category.into(), None))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    mut form: FormData,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;
    let name = form.required("name")?;

    let image = form.image(state.media.as_ref(), IMAGE_FOLDER, "image").await;
    let now = Utc::now();
    let category = categories::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        description: Set(form.string("description")),
        image: Set(image),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(category_id = %category.id, "category created");
    Ok(ApiResponse::success(
        "Category created successfully",
        category.into(),
        Some(Meta::empty()),
    ))
}

pub async fn update_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    mut form: FormData,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;
    let existing = Categories::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Category"))?;

    let mut active: categories::ActiveModel = existing.into();
    if let Some(name) = form.string("name") {
        active.name = Set(name);
    }
    if let Some(description) = form.string("description") {
        active.description = Set(Some(description));
    }
    if let Some(image) = form.image(state.media.as_ref(), IMAGE_FOLDER, "image").await {
        active.image = Set(Some(image));
    }
    active.updated_at = Set(Utc::now().into());

    let category = active.update(&state.orm).await?;
    tracing::info!(category_id = %category.id, "category updated");
    Ok(ApiResponse::success(
        "Category updated successfully",
        category.into(),
        Some(Meta::empty()),
    ))
}

/// Products and promotions that still reference the category keep the id and
/// resolve it to `null` from then on.
pub async fn delete_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Deleted>> {
    ensure_admin(user)?;
    let existing = Categories::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Category"))?;
    existing.delete(&state.orm).await?;

    tracing::info!(category_id = %id, "category deleted");
    Ok(ApiResponse::success(
        "Category deleted successfully",
        Deleted { id },
        Some(Meta::empty()),
    ))
}
