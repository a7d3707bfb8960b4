mod common;

use chrono::{Duration, SecondsFormat, Utc};
use local_commerce_api::{
    entity::sea_orm_active_enums::{DiscountType, Role},
    error::AppError,
    middleware::{auth::AuthUser, form::FormData},
    services::{promotion_service, shop_service},
    state::AppState,
};
use uuid::Uuid;

async fn shop_for(state: &AppState, owner: &AuthUser) -> anyhow::Result<Uuid> {
    let shop = shop_service::create_shop(
        state,
        owner,
        FormData::from_pairs([
            ("name", "Promo Shop"),
            ("location", "Kigali"),
            ("telephone", "0788123456"),
            ("email", "promo@example.com"),
        ]),
    )
    .await?;
    Ok(shop.data.expect("shop").id)
}

fn promotion_fields(
    title: &str,
    shop_id: Uuid,
    start_offset_days: i64,
    end_offset_days: i64,
    is_active: bool,
) -> Vec<(String, String)> {
    let now = Utc::now();
    let start = (now + Duration::days(start_offset_days)).to_rfc3339_opts(SecondsFormat::Secs, true);
    let end = (now + Duration::days(end_offset_days)).to_rfc3339_opts(SecondsFormat::Secs, true);
    vec![
        ("title".to_string(), title.to_string()),
        ("description".to_string(), "Seasonal offer".to_string()),
        ("discountType".to_string(), "percentage".to_string()),
        ("discountValue".to_string(), "15".to_string()),
        ("location".to_string(), "Kigali".to_string()),
        ("startDate".to_string(), start),
        ("endDate".to_string(), end),
        ("shopId".to_string(), shop_id.to_string()),
        ("isActive".to_string(), is_active.to_string()),
    ]
}

fn promotion_form(
    title: &str,
    shop_id: Uuid,
    start_offset_days: i64,
    end_offset_days: i64,
    is_active: bool,
) -> FormData {
    FormData::from_pairs(promotion_fields(
        title,
        shop_id,
        start_offset_days,
        end_offset_days,
        is_active,
    ))
}

fn with_fields(mut fields: Vec<(String, String)>, overrides: &[(&str, &str)]) -> FormData {
    for (name, value) in overrides {
        match fields.iter_mut().find(|(k, _)| k == name) {
            Some(field) => field.1 = value.to_string(),
            None => fields.push((name.to_string(), value.to_string())),
        }
    }
    FormData::from_pairs(fields)
}

#[tokio::test]
async fn active_list_only_contains_running_promotions() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let owner = common::create_user(&state, "owner@example.com", Role::BusinessOwner).await?;
    let shop_id = shop_for(&state, &owner).await?;

    for form in [
        promotion_form("Past", shop_id, -10, -1, true),
        promotion_form("Future", shop_id, 1, 10, true),
        promotion_form("Current", shop_id, -1, 1, true),
        promotion_form("Paused", shop_id, -1, 1, false),
    ] {
        promotion_service::create_promotion(&state, &owner, form).await?;
    }

    let active = promotion_service::list_active_promotions(&state)
        .await?
        .data
        .expect("promotions");
    let titles: Vec<_> = active.items.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, ["Current"]);
    assert_eq!(
        active.items[0].shop.as_ref().map(|s| s.name.as_str()),
        Some("Promo Shop")
    );

    let all = promotion_service::list_promotions(&state).await?;
    assert_eq!(all.data.expect("promotions").items.len(), 4);
    Ok(())
}

#[tokio::test]
async fn percentage_discount_is_capped_at_one_hundred() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let owner = common::create_user(&state, "owner@example.com", Role::BusinessOwner).await?;
    let shop_id = shop_for(&state, &owner).await?;

    let full = with_fields(
        promotion_fields("Free", shop_id, -1, 1, true),
        &[("discountValue", "100")],
    );
    let created = promotion_service::create_promotion(&state, &owner, full)
        .await?
        .data
        .expect("promotion");
    assert_eq!(created.discount_type, DiscountType::Percentage);
    assert_eq!(created.discount_value, 100.0);

    let too_much = with_fields(
        promotion_fields("Too much", shop_id, -1, 1, true),
        &[("discountValue", "101")],
    );
    let err = promotion_service::create_promotion(&state, &owner, too_much)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let fixed = with_fields(
        promotion_fields("Fixed", shop_id, -1, 1, true),
        &[("discountType", "fixed"), ("discountValue", "2500")],
    );
    promotion_service::create_promotion(&state, &owner, fixed).await?;
    Ok(())
}

#[tokio::test]
async fn window_and_shop_are_validated() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let owner = common::create_user(&state, "owner@example.com", Role::BusinessOwner).await?;
    let customer = common::create_user(&state, "cus@example.com", Role::Customer).await?;
    let shop_id = shop_for(&state, &owner).await?;

    let backwards = promotion_form("Backwards", shop_id, 2, 1, true);
    let err = promotion_service::create_promotion(&state, &owner, backwards)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let ghost_shop = promotion_form("Ghost", Uuid::new_v4(), -1, 1, true);
    let err = promotion_service::create_promotion(&state, &owner, ghost_shop)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref m) if m == "Shop not found"));

    let err = promotion_service::create_promotion(
        &state,
        &customer,
        promotion_form("Nope", shop_id, -1, 1, true),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    Ok(())
}

#[tokio::test]
async fn owners_update_and_delete_their_promotions() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let owner = common::create_user(&state, "owner@example.com", Role::BusinessOwner).await?;
    let rival = common::create_user(&state, "rival@example.com", Role::BusinessOwner).await?;
    let shop_id = shop_for(&state, &owner).await?;

    let promotion = promotion_service::create_promotion(
        &state,
        &owner,
        promotion_form("Weekend", shop_id, -1, 1, true),
    )
    .await?
    .data
    .expect("promotion");

    let err = promotion_service::update_promotion(
        &state,
        &rival,
        promotion.id,
        FormData::from_pairs([("title", "Stolen")]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // The merged record must still be valid.
    let err = promotion_service::update_promotion(
        &state,
        &owner,
        promotion.id,
        FormData::from_pairs([("discountValue", "150")]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let updated = promotion_service::update_promotion(
        &state,
        &owner,
        promotion.id,
        FormData::from_pairs([("title", "Long weekend"), ("isActive", "false")]),
    )
    .await?
    .data
    .expect("promotion");
    assert_eq!(updated.title, "Long weekend");
    assert!(!updated.is_active);

    let mine = promotion_service::list_my_promotions(&state, &owner).await?;
    assert_eq!(mine.data.expect("promotions").items.len(), 1);

    promotion_service::delete_promotion(&state, &owner, promotion.id).await?;
    let err = promotion_service::get_promotion(&state, promotion.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}
