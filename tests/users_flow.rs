mod common;

use local_commerce_api::{
    dto::{
        cart::CartItemRequest,
        orders::{CreateOrderRequest, ShippingAddressInput},
        users::UpdateUserRequest,
    },
    entity::{CartItems, Carts, Orders, sea_orm_active_enums::Role},
    error::AppError,
    services::{cart_service, order_service, user_service},
};
use sea_orm::{EntityTrait, PaginatorTrait};

#[tokio::test]
async fn user_management_is_admin_only() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let admin = common::create_user(&state, "admin@example.com", Role::Admin).await?;
    let customer = common::create_user(&state, "cus@example.com", Role::Customer).await?;

    let err = user_service::list_users(&state, &customer).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let users = user_service::list_users(&state, &admin).await?;
    assert_eq!(users.data.expect("users").items.len(), 2);

    let promoted = user_service::update_user(
        &state,
        &admin,
        customer.user_id,
        UpdateUserRequest {
            name: Some("  Grace ".into()),
            email: Some("Grace@Example.com".into()),
            role: Some(Role::BusinessOwner),
        },
    )
    .await?
    .data
    .expect("user");
    assert_eq!(promoted.name, "Grace");
    assert_eq!(promoted.email, "grace@example.com");
    assert_eq!(promoted.role, Role::BusinessOwner);

    let err = user_service::update_user(
        &state,
        &admin,
        customer.user_id,
        UpdateUserRequest {
            name: None,
            email: Some("grace-at-example".into()),
            role: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = user_service::delete_user(&state, &admin, admin.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    Ok(())
}

#[tokio::test]
async fn deleting_a_user_drops_the_cart_but_keeps_orders() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let admin = common::create_user(&state, "admin@example.com", Role::Admin).await?;
    let customer = common::create_user(&state, "cus@example.com", Role::Customer).await?;
    let category = common::create_category(&state, &admin, "Groceries").await?;
    let beans = common::create_product(&state, &admin, category, "Beans", 2.5).await?;

    let add = |quantity| CartItemRequest {
        product_id: Some(beans),
        quantity: Some(quantity),
    };
    cart_service::add_item(&state, &customer, add(1)).await?;
    order_service::create_order(
        &state,
        &customer,
        CreateOrderRequest {
            shipping_address: Some(ShippingAddressInput {
                full_name: Some("Grace".into()),
                phone: Some("0788".into()),
                email: Some("cus@example.com".into()),
                address: Some("KN 5 Rd".into()),
                city: Some("Kigali".into()),
                postal_code: None,
            }),
            payment_method: Some("cash".into()),
        },
    )
    .await?;
    cart_service::add_item(&state, &customer, add(2)).await?;

    user_service::delete_user(&state, &admin, customer.user_id).await?;

    assert_eq!(Carts::find().count(&state.orm).await?, 0);
    assert_eq!(CartItems::find().count(&state.orm).await?, 0);
    assert_eq!(Orders::find().count(&state.orm).await?, 1);

    let err = user_service::delete_user(&state, &admin, customer.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}
