use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Product;

/// Product write body. Sent as multipart (with an optional `image` file) or JSON;
/// on update every field is optional.
#[allow(dead_code)]
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductForm {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub original_price: Option<f64>,
    pub category_id: Uuid,
    pub shop_id: Option<Uuid>,
    /// Defaults to 0.
    pub stock: Option<i32>,
    pub seller: String,
    pub location: String,
    /// Image file, or the URL of an already hosted image.
    pub image: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}
