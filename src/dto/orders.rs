use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Order, ShippingAddress};

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddressInput {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
}

impl ShippingAddressInput {
    /// All fields except the postal code are required.
    pub fn into_address(self) -> Option<ShippingAddress> {
        fn present(value: Option<String>) -> Option<String> {
            value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
        }

        Some(ShippingAddress {
            full_name: present(self.full_name)?,
            phone: present(self.phone)?,
            email: present(self.email)?,
            address: present(self.address)?,
            city: present(self.city)?,
            postal_code: present(self.postal_code),
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub shipping_address: Option<ShippingAddressInput>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    /// One of pending, processing, shipped, delivered, cancelled.
    pub status: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct OrderList {
    #[schema(value_type = Vec<Order>)]
    pub items: Vec<Order>,
}
