mod common;

use local_commerce_api::{
    dto::{
        cart::CartItemRequest,
        orders::{CreateOrderRequest, ShippingAddressInput, UpdateOrderStatusRequest},
    },
    entity::{
        Orders,
        sea_orm_active_enums::{OrderStatus, PaymentStatus, Role},
    },
    error::AppError,
    middleware::form::FormData,
    services::{cart_service, order_service, product_service},
};
use sea_orm::{EntityTrait, PaginatorTrait};

fn shipping() -> ShippingAddressInput {
    ShippingAddressInput {
        full_name: Some("Ana Uwase".into()),
        phone: Some("0788000000".into()),
        email: Some("ana@example.com".into()),
        address: Some("KG 11 Ave".into()),
        city: Some("Kigali".into()),
        postal_code: None,
    }
}

fn checkout() -> CreateOrderRequest {
    CreateOrderRequest {
        shipping_address: Some(shipping()),
        payment_method: Some("cash_on_delivery".into()),
    }
}

// Integration flow: add to cart -> checkout -> price change -> admin moves the order along.
#[tokio::test]
async fn checkout_snapshots_prices_and_empties_the_cart() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let admin = common::create_user(&state, "admin@example.com", Role::Admin).await?;
    let customer = common::create_user(&state, "cus@example.com", Role::Customer).await?;
    let category = common::create_category(&state, &admin, "Groceries").await?;
    let beans = common::create_product(&state, &admin, category, "Beans", 2.5).await?;
    let rice = common::create_product(&state, &admin, category, "Rice", 4.0).await?;

    for (product_id, quantity) in [(beans, 2), (rice, 1)] {
        cart_service::add_item(
            &state,
            &customer,
            CartItemRequest {
                product_id: Some(product_id),
                quantity: Some(quantity),
            },
        )
        .await?;
    }

    let created = order_service::create_order(&state, &customer, checkout()).await?;
    assert_eq!(created.message, "Order created successfully");
    let order = created.data.expect("order");
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.items[0].product_id, beans);
    assert_eq!(order.items[0].price, 2.5);
    assert_eq!(order.items[0].subtotal, 5.0);
    assert!((order.total_amount - 9.0).abs() < 1e-9);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.shipping_address.city, "Kigali");

    let cart = cart_service::get_cart(&state, &customer).await?.data.expect("cart");
    assert!(cart.items.is_empty());

    // Later price changes do not rewrite history.
    product_service::update_product(
        &state,
        &admin,
        beans,
        FormData::from_pairs([("price", "3.75")]),
    )
    .await?;
    let reloaded = order_service::get_order(&state, &customer, order.id)
        .await?
        .data
        .expect("order");
    assert_eq!(reloaded.items[0].price, 2.5);
    assert!((reloaded.total_amount - 9.0).abs() < 1e-9);

    let shipped = order_service::update_order_status(
        &state,
        &admin,
        order.id,
        UpdateOrderStatusRequest {
            status: Some("shipped".into()),
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(shipped.status, OrderStatus::Shipped);

    let mine = order_service::list_my_orders(&state, &customer).await?;
    assert_eq!(mine.data.expect("orders").items.len(), 1);
    let all = order_service::list_all_orders(&state, &admin).await?;
    assert_eq!(all.meta.and_then(|m| m.total), Some(1));
    Ok(())
}

#[tokio::test]
async fn empty_cart_creates_no_order() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let customer = common::create_user(&state, "cus@example.com", Role::Customer).await?;

    // No cart at all.
    let err = order_service::create_order(&state, &customer, checkout())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref m) if m == "Cart is empty"));

    // A cart with no lines.
    cart_service::get_cart(&state, &customer).await?;
    let err = order_service::create_order(&state, &customer, checkout())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    assert_eq!(Orders::find().count(&state.orm).await?, 0);
    Ok(())
}

#[tokio::test]
async fn checkout_requires_shipping_and_payment() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let customer = common::create_user(&state, "cus@example.com", Role::Customer).await?;

    let no_payment = CreateOrderRequest {
        shipping_address: Some(shipping()),
        payment_method: Some("  ".into()),
    };
    let err = order_service::create_order(&state, &customer, no_payment)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let mut partial = shipping();
    partial.phone = None;
    let no_phone = CreateOrderRequest {
        shipping_address: Some(partial),
        payment_method: Some("card".into()),
    };
    let err = order_service::create_order(&state, &customer, no_phone)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    Ok(())
}

#[tokio::test]
async fn orders_are_private_and_status_is_admin_only() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let admin = common::create_user(&state, "admin@example.com", Role::Admin).await?;
    let buyer = common::create_user(&state, "buyer@example.com", Role::Customer).await?;
    let other = common::create_user(&state, "other@example.com", Role::Customer).await?;
    let category = common::create_category(&state, &admin, "Crafts").await?;
    let basket = common::create_product(&state, &admin, category, "Basket", 12.0).await?;

    cart_service::add_item(
        &state,
        &buyer,
        CartItemRequest {
            product_id: Some(basket),
            quantity: Some(1),
        },
    )
    .await?;
    let order = order_service::create_order(&state, &buyer, checkout())
        .await?
        .data
        .expect("order");

    let err = order_service::get_order(&state, &other, order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = order_service::list_all_orders(&state, &buyer).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = order_service::update_order_status(
        &state,
        &buyer,
        order.id,
        UpdateOrderStatusRequest {
            status: Some("delivered".into()),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = order_service::update_order_status(
        &state,
        &admin,
        order.id,
        UpdateOrderStatusRequest {
            status: Some("teleported".into()),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    Ok(())
}
