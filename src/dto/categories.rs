use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Category;

#[allow(dead_code)]
#[derive(Debug, Deserialize, ToSchema)]
pub struct CategoryForm {
    pub name: String,
    pub description: Option<String>,
    /// Image file, or the URL of an already hosted image.
    pub image: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CategoryList {
    #[schema(value_type = Vec<Category>)]
    pub items: Vec<Category>,
}
