use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{entity::sea_orm_active_enums::DiscountType, models::Promotion};

#[allow(dead_code)]
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromotionForm {
    pub title: String,
    pub description: String,
    pub discount_type: DiscountType,
    /// Positive; at most 100 for percentage discounts.
    pub discount_value: f64,
    pub location: String,
    /// RFC 3339 date-time or `YYYY-MM-DD`.
    pub start_date: String,
    /// Must be strictly after `startDate`.
    pub end_date: String,
    pub shop_id: Uuid,
    pub category_id: Option<Uuid>,
    /// Defaults to true.
    pub is_active: Option<bool>,
    pub terms: Option<String>,
    /// Banner file, or the URL of an already hosted image.
    pub banner_image: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct PromotionList {
    #[schema(value_type = Vec<Promotion>)]
    pub items: Vec<Promotion>,
}
