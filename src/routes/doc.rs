use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest},
        cart::CartItemRequest,
        categories::{CategoryForm, CategoryList},
        orders::{CreateOrderRequest, OrderList, ShippingAddressInput, UpdateOrderStatusRequest},
        products::{ProductForm, ProductList},
        promotions::{PromotionForm, PromotionList},
        shops::{ShopForm, ShopList},
        users::{UpdateUserRequest, UserList},
    },
    entity::sea_orm_active_enums::{DiscountType, OrderStatus, PaymentStatus, Role},
    models::{
        Cart, CartLine, Category, CategorySummary, Order, OrderLine, Product, ProductDetail,
        Promotion, ShippingAddress, Shop, ShopSummary, UserProfile,
    },
    response::{Deleted, Meta},
    routes::{auth, cart, categories, health, orders, params, products, promotions, shops, users},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::me,
        auth::change_password,
        users::list_users,
        users::update_user,
        users::delete_user,
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        products::list_products,
        products::list_my_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        shops::list_shops,
        shops::list_my_shops,
        shops::get_shop,
        shops::create_shop,
        shops::update_shop,
        shops::delete_shop,
        promotions::list_promotions,
        promotions::list_active_promotions,
        promotions::list_my_promotions,
        promotions::get_promotion,
        promotions::create_promotion,
        promotions::update_promotion,
        promotions::delete_promotion,
        cart::get_cart,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        cart::clear_cart,
        orders::create_order,
        orders::list_orders,
        orders::list_all_orders,
        orders::get_order,
        orders::update_order_status
    ),
    components(
        schemas(
            Role,
            OrderStatus,
            PaymentStatus,
            DiscountType,
            UserProfile,
            Category,
            CategorySummary,
            Shop,
            ShopSummary,
            Product,
            ProductDetail,
            Promotion,
            Cart,
            CartLine,
            Order,
            OrderLine,
            ShippingAddress,
            RegisterRequest,
            LoginRequest,
            ChangePasswordRequest,
            AuthResponse,
            UpdateUserRequest,
            UserList,
            CategoryForm,
            CategoryList,
            ProductForm,
            ProductList,
            ShopForm,
            ShopList,
            PromotionForm,
            PromotionList,
            CartItemRequest,
            CreateOrderRequest,
            ShippingAddressInput,
            UpdateOrderStatusRequest,
            OrderList,
            params::SortOrder,
            params::ProductSortBy,
            Deleted,
            Meta
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and the current user"),
        (name = "Users", description = "User administration"),
        (name = "Categories", description = "Category endpoints"),
        (name = "Products", description = "Product endpoints"),
        (name = "Shops", description = "Shop endpoints"),
        (name = "Promotions", description = "Promotion endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Order endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
