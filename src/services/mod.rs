pub mod auth_service;
pub mod cart_service;
pub mod category_service;
pub mod media;
pub mod notifications;
pub mod order_service;
pub mod product_service;
pub mod promotion_service;
pub mod shop_service;
pub mod user_service;
