use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Shop;

#[allow(dead_code)]
#[derive(Debug, Deserialize, ToSchema)]
pub struct ShopForm {
    pub name: String,
    pub description: Option<String>,
    pub location: String,
    pub telephone: String,
    /// Contact address, also notified when the shop is created.
    pub email: String,
    /// Image file, or the URL of an already hosted image.
    pub image: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ShopList {
    #[schema(value_type = Vec<Shop>)]
    pub items: Vec<Shop>,
}
