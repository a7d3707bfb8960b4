//! Per-user cart. One cart row per user, at most one line per product.
//!
//! Mutations run in a transaction with the cart row locked, so two requests
//! from the same user touching the same cart are applied one after the other.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::cart::CartItemRequest,
    entity::{CartItems, Carts, Products, cart_items, carts},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Cart, CartLine},
    response::{ApiResponse, Meta},
    services::product_service::product_views,
    state::AppState,
};

const INVALID_LINE: &str = "Product ID and valid quantity are required";

fn validated_line(req: CartItemRequest) -> AppResult<(Uuid, i32)> {
    match (req.product_id, req.quantity) {
        (Some(product_id), Some(quantity)) if quantity >= 1 => Ok((product_id, quantity)),
        _ => Err(AppError::bad_request(INVALID_LINE)),
    }
}

async fn find_cart<C: ConnectionTrait>(db: &C, user_id: Uuid) -> Result<Option<carts::Model>, DbErr> {
    Carts::find()
        .filter(carts::Column::UserId.eq(user_id))
        .one(db)
        .await
}

/// `SELECT ... FOR UPDATE` on backends that support row locks.
async fn lock_cart<C: ConnectionTrait>(db: &C, user_id: Uuid) -> Result<Option<carts::Model>, DbErr> {
    Carts::find()
        .filter(carts::Column::UserId.eq(user_id))
        .lock_exclusive()
        .one(db)
        .await
}

pub(crate) async fn get_or_create_cart(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> AppResult<carts::Model> {
    if let Some(cart) = find_cart(db, user_id).await? {
        return Ok(cart);
    }

    let now = Utc::now();
    let inserted = carts::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await;

    match inserted {
        Ok(cart) => Ok(cart),
        // Another request created it first.
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            find_cart(db, user_id)
                .await?
                .ok_or_else(|| AppError::not_found("Cart"))
        }
        Err(err) => Err(err.into()),
    }
}

async fn touch<C: ConnectionTrait>(db: &C, cart: carts::Model) -> AppResult<carts::Model> {
    let mut active: carts::ActiveModel = cart.into();
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(db).await?)
}

pub(crate) async fn cart_view<C: ConnectionTrait>(db: &C, cart: carts::Model) -> AppResult<Cart> {
    let rows = CartItems::find()
        .filter(cart_items::Column::CartId.eq(cart.id))
        .order_by_asc(cart_items::Column::Position)
        .find_also_related(Products)
        .all(db)
        .await?;

    let products = rows.iter().filter_map(|(_, p)| p.clone()).collect();
    let products: HashMap<Uuid, _> = product_views(db, products)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let items = rows
        .into_iter()
        .map(|(line, _)| CartLine {
            product_id: line.product_id,
            quantity: line.quantity,
            product: products.get(&line.product_id).cloned(),
        })
        .collect();

    Ok(Cart {
        id: cart.id,
        user_id: cart.user_id,
        items,
        updated_at: cart.updated_at.with_timezone(&Utc),
    })
}

fn cart_response(message: &str, cart: Cart) -> ApiResponse<Cart> {
    let total = cart.items.len() as u64;
    ApiResponse::success(message, cart, Some(Meta::total(total)))
}

pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Cart>> {
    let cart = get_or_create_cart(&state.orm, user.user_id).await?;
    let view = cart_view(&state.orm, cart).await?;
    Ok(cart_response("Cart", view))
}

/// Adding a product already in the cart increases its quantity.
pub async fn add_item(
    state: &AppState,
    user: &AuthUser,
    req: CartItemRequest,
) -> AppResult<ApiResponse<Cart>> {
    let (product_id, quantity) = validated_line(req)?;
    if Products::find_by_id(product_id).one(&state.orm).await?.is_none() {
        return Err(AppError::bad_request("Product not found"));
    }
    get_or_create_cart(&state.orm, user.user_id).await?;

    let txn = state.orm.begin().await?;
    let cart = lock_cart(&txn, user.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Cart"))?;

    let existing = CartItems::find()
        .filter(cart_items::Column::CartId.eq(cart.id))
        .filter(cart_items::Column::ProductId.eq(product_id))
        .one(&txn)
        .await?;

    match existing {
        Some(line) => {
            let merged = line
                .quantity
                .checked_add(quantity)
                .ok_or_else(|| AppError::bad_request("Quantity is too large"))?;
            let mut active: cart_items::ActiveModel = line.into();
            active.quantity = Set(merged);
            active.update(&txn).await?;
        }
        None => {
            let position = CartItems::find()
                .filter(cart_items::Column::CartId.eq(cart.id))
                .order_by_desc(cart_items::Column::Position)
                .one(&txn)
                .await?
                .map_or(0, |last| last.position + 1);
            cart_items::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_id: Set(product_id),
                quantity: Set(quantity),
                position: Set(position),
                created_at: Set(Utc::now().into()),
            }
            .insert(&txn)
            .await?;
        }
    }

    let cart = touch(&txn, cart).await?;
    txn.commit().await?;

    tracing::debug!(user_id = %user.user_id, %product_id, quantity, "cart item added");
    let view = cart_view(&state.orm, cart).await?;
    Ok(cart_response("Item added to cart", view))
}

/// Replaces the quantity of a line that is already in the cart.
pub async fn set_item_quantity(
    state: &AppState,
    user: &AuthUser,
    req: CartItemRequest,
) -> AppResult<ApiResponse<Cart>> {
    let (product_id, quantity) = validated_line(req)?;

    let txn = state.orm.begin().await?;
    let cart = lock_cart(&txn, user.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Cart"))?;
    let line = CartItems::find()
        .filter(cart_items::Column::CartId.eq(cart.id))
        .filter(cart_items::Column::ProductId.eq(product_id))
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Item not found in cart".into()))?;

    let mut active: cart_items::ActiveModel = line.into();
    active.quantity = Set(quantity);
    active.update(&txn).await?;

    let cart = touch(&txn, cart).await?;
    txn.commit().await?;

    let view = cart_view(&state.orm, cart).await?;
    Ok(cart_response("Cart updated", view))
}

/// Removing a product that is not in the cart leaves the cart unchanged.
pub async fn remove_item(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<Cart>> {
    let txn = state.orm.begin().await?;
    let cart = lock_cart(&txn, user.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Cart"))?;

    let removed = CartItems::delete_many()
        .filter(cart_items::Column::CartId.eq(cart.id))
        .filter(cart_items::Column::ProductId.eq(product_id))
        .exec(&txn)
        .await?
        .rows_affected;

    let cart = if removed > 0 { touch(&txn, cart).await? } else { cart };
    txn.commit().await?;

    let view = cart_view(&state.orm, cart).await?;
    Ok(cart_response("Item removed from cart", view))
}

pub async fn clear_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Cart>> {
    let txn = state.orm.begin().await?;
    let cart = lock_cart(&txn, user.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Cart"))?;

    CartItems::delete_many()
        .filter(cart_items::Column::CartId.eq(cart.id))
        .exec(&txn)
        .await?;
    let cart = touch(&txn, cart).await?;
    txn.commit().await?;

    let view = cart_view(&state.orm, cart).await?;
    Ok(cart_response("Cart cleared", view))
}
