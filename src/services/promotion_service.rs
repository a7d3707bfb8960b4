use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    dto::promotions::PromotionList,
    entity::{
        Categories, Promotions, Shops, categories, promotions,
        sea_orm_active_enums::DiscountType, shops,
    },
    error::{AppError, AppResult},
    middleware::{
        auth::{AuthUser, ensure_merchant, ensure_owner},
        form::FormData,
    },
    models::{CategorySummary, Promotion, ShopSummary},
    response::{ApiResponse, Deleted, Meta},
    state::AppState,
};

const IMAGE_FOLDER: &str = "promotions";

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM[:SS]` (UTC) or a plain date (midnight UTC).
pub fn parse_date(name: &str, raw: &str) -> AppResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Some(naive) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(naive.and_utc());
    }
    Err(AppError::bad_request(format!("{name} must be a valid date")))
}

pub fn parse_discount_type(raw: &str) -> AppResult<DiscountType> {
    raw.parse::<DiscountType>()
        .map_err(|_| AppError::bad_request("discountType must be percentage or fixed"))
}

pub fn validate_discount(discount_type: DiscountType, value: f64) -> AppResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AppError::bad_request("discountValue must be greater than 0"));
    }
    if discount_type == DiscountType::Percentage && value > 100.0 {
        return Err(AppError::bad_request(
            "Percentage discount cannot exceed 100",
        ));
    }
    Ok(())
}

pub fn validate_window(start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<()> {
    if end <= start {
        return Err(AppError::bad_request("endDate must be after startDate"));
    }
    Ok(())
}

/// Evaluated at read time; nothing ever flips `is_active` when a window closes.
pub fn is_currently_active(model: &promotions::Model, now: DateTime<Utc>) -> bool {
    model.is_active && model.start_date <= now && now <= model.end_date
}

fn promotion_from_entity(
    model: promotions::Model,
    shops: &HashMap<Uuid, shops::Model>,
    categories: &HashMap<Uuid, categories::Model>,
) -> Promotion {
    let shop = shops.get(&model.shop_id).map(|s| ShopSummary {
        id: s.id,
        name: s.name.clone(),
        location: s.location.clone(),
    });
    let category = model
        .category_id
        .and_then(|id| categories.get(&id))
        .map(|c| CategorySummary {
            id: c.id,
            name: c.name.clone(),
        });

    Promotion {
        id: model.id,
        title: model.title,
        description: model.description,
        discount_type: model.discount_type,
        discount_value: model.discount_value,
        banner_image: model.banner_image,
        location: model.location,
        start_date: model.start_date.with_timezone(&Utc),
        end_date: model.end_date.with_timezone(&Utc),
        shop_id: model.shop_id,
        shop,
        category_id: model.category_id,
        category,
        is_active: model.is_active,
        terms: model.terms,
        owner_id: model.owner_id,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

async fn promotion_views(
    state: &AppState,
    models: Vec<promotions::Model>,
) -> AppResult<Vec<Promotion>> {
    let shop_ids: HashSet<Uuid> = models.iter().map(|p| p.shop_id).collect();
    let category_ids: HashSet<Uuid> = models.iter().filter_map(|p| p.category_id).collect();

    let mut shops = HashMap::new();
    if !shop_ids.is_empty() {
        for shop in Shops::find()
            .filter(shops::Column::Id.is_in(shop_ids))
            .all(&state.orm)
            .await?
        {
            shops.insert(shop.id, shop);
        }
    }
    let mut categories = HashMap::new();
    if !category_ids.is_empty() {
        for category in Categories::find()
            .filter(categories::Column::Id.is_in(category_ids))
            .all(&state.orm)
            .await?
        {
            categories.insert(category.id, category);
        }
    }

    Ok(models
        .into_iter()
        .map(|p| promotion_from_entity(p, &shops, &categories))
        .collect())
}

async fn promotion_list(
    state: &AppState,
    message: &str,
    models: Vec<promotions::Model>,
) -> AppResult<ApiResponse<PromotionList>> {
    let total = models.len() as u64;
    let items = promotion_views(state, models).await?;
    Ok(ApiResponse::success(
        message,
        PromotionList { items },
        Some(Meta::total(total)),
    ))
}

pub async fn list_promotions(state: &AppState) -> AppResult<ApiResponse<PromotionList>> {
    let models = Promotions::find()
        .order_by_desc(promotions::Column::CreatedAt)
        .all(&state.orm)
        .await?;
    promotion_list(state, "Promotions", models).await
}

pub async fn list_active_promotions(state: &AppState) -> AppResult<ApiResponse<PromotionList>> {
    let now = Utc::now();
    let models = Promotions::find()
        .filter(promotions::Column::IsActive.eq(true))
        .filter(promotions::Column::StartDate.lte(now))
        .filter(promotions::Column::EndDate.gte(now))
        .order_by_asc(promotions::Column::EndDate)
        .all(&state.orm)
        .await?
        .into_iter()
        .filter(|p| is_currently_active(p, now))
        .collect();
    promotion_list(state, "Active promotions", models).await
}

pub async fn list_my_promotions(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<PromotionList>> {
    ensure_merchant(user)?;
    let models = Promotions::find()
        .filter(promotions::Column::OwnerId.eq(user.user_id))
        .order_by_desc(promotions::Column::CreatedAt)
        .all(&state.orm)
        .await?;
    promotion_list(state, "My promotions", models).await
}

pub async fn get_promotion(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Promotion>> {
    let model = Promotions::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Promotion"))?;
    let promotion = promotion_views(state, vec![model])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("Promotion"))?;
    Ok(ApiResponse::success("Promotion", promotion, None))
}

async fn ensure_shop_exists(state: &AppState, id: Uuid) -> AppResult<()> {
    if Shops::find_by_id(id).one(&state.orm).await?.is_none() {
        return Err(AppError::bad_request("Shop not found"));
    }
    Ok(())
}

fn shop_field(form: &FormData) -> AppResult<Option<Uuid>> {
    Ok(form.uuid("shopId")?.or(form.uuid("shop")?))
}

fn category_field(form: &FormData) -> AppResult<Option<Uuid>> {
    Ok(form.uuid("categoryId")?.or(form.uuid("category")?))
}

pub async fn create_promotion(
    state: &AppState,
    user: &AuthUser,
    mut form: FormData,
) -> AppResult<ApiResponse<Promotion>> {
    ensure_merchant(user)?;

    let (
        Some(title),
        Some(description),
        Some(discount_type),
        Some(discount_value),
        Some(location),
        Some(start_date),
        Some(end_date),
        Some(shop_id),
    ) = (
        form.string("title"),
        form.string("description"),
        form.string("discountType"),
        form.float("discountValue")?,
        form.string("location"),
        form.string("startDate"),
        form.string("endDate"),
        shop_field(&form)?,
    )
    else {
        return Err(AppError::bad_request("All required fields must be provided"));
    };

    let discount_type = parse_discount_type(&discount_type)?;
    validate_discount(discount_type, discount_value)?;
    let start_date = parse_date("startDate", &start_date)?;
    let end_date = parse_date("endDate", &end_date)?;
    validate_window(start_date, end_date)?;
    let category_id = category_field(&form)?;
    let is_active = form.boolean("isActive")?.unwrap_or(true);
    ensure_shop_exists(state, shop_id).await?;

    let banner_image = form
        .image(state.media.as_ref(), IMAGE_FOLDER, "bannerImage")
        .await;
    let now = Utc::now();
    let promotion = promotions::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title),
        description: Set(description),
        discount_type: Set(discount_type),
        discount_value: Set(discount_value),
        banner_image: Set(banner_image),
        location: Set(location),
        start_date: Set(start_date.into()),
        end_date: Set(end_date.into()),
        shop_id: Set(shop_id),
        category_id: Set(category_id),
        is_active: Set(is_active),
        terms: Set(form.string("terms")),
        owner_id: Set(user.user_id),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(promotion_id = %promotion.id, owner_id = %user.user_id, "promotion created");
    let view = promotion_views(state, vec![promotion])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("promotion view missing")))?;
    Ok(ApiResponse::success(
        "Promotion created successfully",
        view,
        Some(Meta::empty()),
    ))
}

pub async fn update_promotion(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    mut form: FormData,
) -> AppResult<ApiResponse<Promotion>> {
    ensure_merchant(user)?;
    let existing = Promotions::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Promotion"))?;
    ensure_owner(user, existing.owner_id, "promotion")?;

    // Validate the merged record, not just the submitted fields.
    let discount_type = match form.text("discountType") {
        Some(raw) => parse_discount_type(raw)?,
        None => existing.discount_type,
    };
    let discount_value = form.float("discountValue")?.unwrap_or(existing.discount_value);
    validate_discount(discount_type, discount_value)?;

    let start_date = match form.text("startDate") {
        Some(raw) => parse_date("startDate", raw)?,
        None => existing.start_date.with_timezone(&Utc),
    };
    let end_date = match form.text("endDate") {
        Some(raw) => parse_date("endDate", raw)?,
        None => existing.end_date.with_timezone(&Utc),
    };
    validate_window(start_date, end_date)?;

    let mut active: promotions::ActiveModel = existing.into();
    active.discount_type = Set(discount_type);
    active.discount_value = Set(discount_value);
    active.start_date = Set(start_date.into());
    active.end_date = Set(end_date.into());

    if let Some(title) = form.string("title") {
        active.title = Set(title);
    }
    if let Some(description) = form.string("description") {
        active.description = Set(description);
    }
    if let Some(location) = form.string("location") {
        active.location = Set(location);
    }
    if let Some(shop_id) = shop_field(&form)? {
        ensure_shop_exists(state, shop_id).await?;
        active.shop_id = Set(shop_id);
    }
    if let Some(category_id) = category_field(&form)? {
        active.category_id = Set(Some(category_id));
    }
    if let Some(is_active) = form.boolean("isActive")? {
        active.is_active = Set(is_active);
    }
    if let Some(terms) = form.string("terms") {
        active.terms = Set(Some(terms));
    }
    if let Some(banner) = form
        .image(state.media.as_ref(), IMAGE_FOLDER, "bannerImage")
        .await
    {
        active.banner_image = Set(Some(banner));
    }
    active.updated_at = Set(Utc::now().into());

    let promotion = active.update(&state.orm).await?;
    tracing::info!(promotion_id = %promotion.id, user_id = %user.user_id, "promotion updated");
    let view = promotion_views(state, vec![promotion])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("promotion view missing")))?;
    Ok(ApiResponse::success(
        "Promotion updated successfully",
        view,
        Some(Meta::empty()),
    ))
}

pub async fn delete_promotion(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Deleted>> {
    ensure_merchant(user)?;
    let existing = Promotions::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Promotion"))?;
    ensure_owner(user, existing.owner_id, "promotion")?;

    existing.delete(&state.orm).await?;
    tracing::info!(promotion_id = %id, user_id = %user.user_id, "promotion deleted");
    Ok(ApiResponse::success(
        "Promotion deleted successfully",
        Deleted { id },
        Some(Meta::empty()),
    ))
}
