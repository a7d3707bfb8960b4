use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::orders::{CreateOrderRequest, OrderList, UpdateOrderStatusRequest},
    entity::{
        CartItems, Carts, OrderItems, Orders, Products, cart_items, carts, order_items, orders,
        products,
        sea_orm_active_enums::{OrderStatus, PaymentStatus},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderLine, ShippingAddress},
    response::{ApiResponse, Meta},
    services::product_service::product_views,
    state::AppState,
};

/// Snapshot of one cart line at checkout time.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSnapshot {
    pub product_id: Uuid,
    pub name: String,
    pub price: f64,
    pub quantity: i32,
}

pub fn order_total(lines: &[LineSnapshot]) -> f64 {
    lines
        .iter()
        .map(|line| line.price * f64::from(line.quantity))
        .sum()
}

fn shipping_from_entity(model: &orders::Model) -> ShippingAddress {
    ShippingAddress {
        full_name: model.shipping_full_name.clone(),
        phone: model.shipping_phone.clone(),
        email: model.shipping_email.clone(),
        address: model.shipping_address.clone(),
        city: model.shipping_city.clone(),
        postal_code: model.shipping_postal_code.clone(),
    }
}

/// Orders with their lines; products that no longer exist resolve to `None`.
async fn order_views<C: ConnectionTrait>(
    db: &C,
    models: Vec<orders::Model>,
) -> AppResult<Vec<Order>> {
    if models.is_empty() {
        return Ok(Vec::new());
    }
    let order_ids: Vec<Uuid> = models.iter().map(|o| o.id).collect();
    let lines = OrderItems::find()
        .filter(order_items::Column::OrderId.is_in(order_ids))
        .order_by_asc(order_items::Column::Position)
        .all(db)
        .await?;

    let product_ids: HashSet<Uuid> = lines.iter().map(|l| l.product_id).collect();
    let product_models = if product_ids.is_empty() {
        Vec::new()
    } else {
        Products::find()
            .filter(products::Column::Id.is_in(product_ids))
            .all(db)
            .await?
    };
    let products: HashMap<Uuid, _> = product_views(db, product_models)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut lines_by_order: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
    for line in lines {
        lines_by_order
            .entry(line.order_id)
            .or_default()
            .push(OrderLine {
                product_id: line.product_id,
                subtotal: line.price * f64::from(line.quantity),
                product: products.get(&line.product_id).cloned(),
                name: line.name,
                price: line.price,
                quantity: line.quantity,
            });
    }

    Ok(models
        .into_iter()
        .map(|model| Order {
            id: model.id,
            user_id: model.user_id,
            items: lines_by_order.remove(&model.id).unwrap_or_default(),
            total_amount: model.total_amount,
            status: model.status,
            shipping_address: shipping_from_entity(&model),
            payment_method: model.payment_method.clone(),
            payment_status: model.payment_status,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        })
        .collect())
}

async fn order_view<C: ConnectionTrait>(db: &C, model: orders::Model) -> AppResult<Order> {
    order_views(db, vec![model])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("Order"))
}

/// Turn the caller's cart into an order.
///
/// Reading the cart, writing the order and emptying the cart happen in one
/// transaction with the cart row locked: either all of it is visible or none.
pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    req: CreateOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    let payment_method = req
        .payment_method
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());
    let shipping = req.shipping_address.and_then(|a| a.into_address());
    let (Some(shipping), Some(payment_method)) = (shipping, payment_method) else {
        return Err(AppError::bad_request(
            "Shipping address and payment method are required",
        ));
    };

    let txn = state.orm.begin().await?;

    let Some(cart) = Carts::find()
        .filter(carts::Column::UserId.eq(user.user_id))
        .lock_exclusive()
        .one(&txn)
        .await?
    else {
        return Err(AppError::bad_request("Cart is empty"));
    };

    let rows = CartItems::find()
        .filter(cart_items::Column::CartId.eq(cart.id))
        .order_by_asc(cart_items::Column::Position)
        .find_also_related(Products)
        .all(&txn)
        .await?;
    if rows.is_empty() {
        return Err(AppError::bad_request("Cart is empty"));
    }

    let mut snapshot = Vec::with_capacity(rows.len());
    for (line, product) in rows {
        let Some(product) = product else {
            return Err(AppError::bad_request(format!(
                "Product {} in cart is no longer available",
                line.product_id
            )));
        };
        snapshot.push(LineSnapshot {
            product_id: product.id,
            name: product.name,
            price: product.price,
            quantity: line.quantity,
        });
    }
    let total_amount = order_total(&snapshot);

    let now = Utc::now();
    let order = orders::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        total_amount: Set(total_amount),
        status: Set(OrderStatus::Pending),
        payment_method: Set(payment_method),
        payment_status: Set(PaymentStatus::Pending),
        shipping_full_name: Set(shipping.full_name),
        shipping_phone: Set(shipping.phone),
        shipping_email: Set(shipping.email),
        shipping_address: Set(shipping.address),
        shipping_city: Set(shipping.city),
        shipping_postal_code: Set(shipping.postal_code),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    for (position, line) in snapshot.into_iter().enumerate() {
        order_items::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            name: Set(line.name),
            price: Set(line.price),
            quantity: Set(line.quantity),
            position: Set(position as i32),
        }
        .insert(&txn)
        .await?;
    }

    CartItems::delete_many()
        .filter(cart_items::Column::CartId.eq(cart.id))
        .exec(&txn)
        .await?;
    let mut cart: carts::ActiveModel = cart.into();
    cart.updated_at = Set(now.into());
    cart.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        user_id = %user.user_id,
        total_amount,
        "order created"
    );
    Ok(ApiResponse::success(
        "Order created successfully",
        order_view(&state.orm, order).await?,
        Some(Meta::empty()),
    ))
}

async fn order_list(
    state: &AppState,
    message: &str,
    models: Vec<orders::Model>,
) -> AppResult<ApiResponse<OrderList>> {
    let total = models.len() as u64;
    let items = order_views(&state.orm, models).await?;
    Ok(ApiResponse::success(
        message,
        OrderList { items },
        Some(Meta::total(total)),
    ))
}

pub async fn list_my_orders(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<OrderList>> {
    let models = Orders::find()
        .filter(orders::Column::UserId.eq(user.user_id))
        .order_by_desc(orders::Column::CreatedAt)
        .all(&state.orm)
        .await?;
    order_list(state, "Orders", models).await
}

pub async fn list_all_orders(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let models = Orders::find()
        .order_by_desc(orders::Column::CreatedAt)
        .all(&state.orm)
        .await?;
    order_list(state, "All orders", models).await
}

pub async fn get_order(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<Order>> {
    let model = Orders::find()
        .filter(orders::Column::Id.eq(id))
        .filter(orders::Column::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;
    Ok(ApiResponse::success(
        "Order",
        order_view(&state.orm, model).await?,
        None,
    ))
}

/// Any status in the enumerated set may be set; transitions are not restricted.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    req: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let status = req
        .status
        .as_deref()
        .and_then(|s| s.trim().parse::<OrderStatus>().ok())
        .ok_or_else(|| AppError::bad_request("Valid status is required"))?;

    let existing = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;
    let previous = existing.status;

    let mut active: orders::ActiveModel = existing.into();
    active.status = Set(status);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    tracing::info!(
        order_id = %order.id,
        from = previous.as_str(),
        to = status.as_str(),
        "order status updated"
    );
    Ok(ApiResponse::success(
        "Order status updated",
        order_view(&state.orm, order).await?,
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_is_sum_of_line_subtotals() {
        let lines = vec![
            LineSnapshot {
                product_id: Uuid::new_v4(),
                name: "Beans".into(),
                price: 2.5,
                quantity: 4,
            },
            LineSnapshot {
                product_id: Uuid::new_v4(),
                name: "Rice".into(),
                price: 10.0,
                quantity: 1,
            },
        ];
        assert_eq!(order_total(&lines), 20.0);
        assert_eq!(order_total(&[]), 0.0);
    }
}
