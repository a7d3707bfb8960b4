use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, ModelTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    sea_query::{Expr, Func},
};
use uuid::Uuid;

use crate::{
    dto::products::ProductList,
    entity::{Categories, Products, Shops, categories, products, shops},
    error::{AppError, AppResult},
    middleware::{
        auth::{AuthUser, MaybeUser, ensure_merchant, ensure_owner},
        form::FormData,
    },
    models::{CategorySummary, Product, ProductDetail, ShopSummary},
    response::{ApiResponse, Deleted, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

const IMAGE_FOLDER: &str = "products";

fn product_from_entity(
    model: products::Model,
    categories: &HashMap<Uuid, categories::Model>,
    shops: &HashMap<Uuid, shops::Model>,
) -> Product {
    let category = categories.get(&model.category_id).map(|c| CategorySummary {
        id: c.id,
        name: c.name.clone(),
    });
    let shop = model
        .shop_id
        .and_then(|id| shops.get(&id))
        .map(|s| ShopSummary {
            id: s.id,
            name: s.name.clone(),
            location: s.location.clone(),
        });

    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        original_price: model.original_price,
        category_id: model.category_id,
        category,
        shop_id: model.shop_id,
        shop,
        image: model.image,
        stock: model.stock,
        seller: model.seller,
        location: model.location,
        owner_id: model.owner_id,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

/// Resolve category and shop references for a batch of products. References
/// to deleted rows resolve to `None`.
pub(crate) async fn product_views<C: ConnectionTrait>(
    db: &C,
    models: Vec<products::Model>,
) -> AppResult<Vec<Product>> {
    let category_ids: HashSet<Uuid> = models.iter().map(|p| p.category_id).collect();
    let shop_ids: HashSet<Uuid> = models.iter().filter_map(|p| p.shop_id).collect();

    let categories: HashMap<Uuid, categories::Model> = if category_ids.is_empty() {
        HashMap::new()
    } else {
        Categories::find()
            .filter(categories::Column::Id.is_in(category_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect()
    };
    let shops: HashMap<Uuid, shops::Model> = if shop_ids.is_empty() {
        HashMap::new()
    } else {
        Shops::find()
            .filter(shops::Column::Id.is_in(shop_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect()
    };

    Ok(models
        .into_iter()
        .map(|p| product_from_entity(p, &categories, &shops))
        .collect())
}

async fn product_view<C: ConnectionTrait>(db: &C, model: products::Model) -> AppResult<Product> {
    product_views(db, vec![model])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("product view missing")))
}

fn search_condition(query: &ProductQuery) -> Condition {
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search.to_lowercase());
        condition = condition.add(
            Condition::any()
                .add(Expr::expr(Func::lower(Expr::col(products::Column::Name))).like(pattern.clone()))
                .add(Expr::expr(Func::lower(Expr::col(products::Column::Description))).like(pattern)),
        );
    }
    if let Some(category) = query.category {
        condition = condition.add(products::Column::CategoryId.eq(category));
    }
    if let Some(shop) = query.shop {
        condition = condition.add(products::Column::ShopId.eq(shop));
    }
    if let Some(min_price) = query.min_price {
        condition = condition.add(products::Column::Price.gte(min_price));
    }
    if let Some(max_price) = query.max_price {
        condition = condition.add(products::Column::Price.lte(max_price));
    }
    condition
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let sort_col = match query.sort_by.unwrap_or(ProductSortBy::CreatedAt) {
        ProductSortBy::CreatedAt => products::Column::CreatedAt,
        ProductSortBy::Price => products::Column::Price,
        ProductSortBy::Name => products::Column::Name,
    };
    let order = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => Order::Asc,
        SortOrder::Desc => Order::Desc,
    };

    let finder = Products::find()
        .filter(search_condition(&query))
        .order_by(sort_col, order)
        .order_by_asc(products::Column::Id);

    let (models, meta) = match query.pagination().normalize() {
        Some((page, per_page, offset)) => {
            let total = finder.clone().count(&state.orm).await?;
            let models = finder
                .limit(per_page)
                .offset(offset)
                .all(&state.orm)
                .await?;
            (models, Meta::new(page, per_page, total))
        }
        None => {
            let models = finder.all(&state.orm).await?;
            let total = models.len() as u64;
            (models, Meta::total(total))
        }
    };

    let items = product_views(&state.orm, models).await?;
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn list_my_products(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_merchant(user)?;
    let models = Products::find()
        .filter(products::Column::OwnerId.eq(user.user_id))
        .order_by_desc(products::Column::CreatedAt)
        .all(&state.orm)
        .await?;
    let total = models.len() as u64;
    let items = product_views(&state.orm, models).await?;
    Ok(ApiResponse::success(
        "My products",
        ProductList { items },
        Some(Meta::total(total)),
    ))
}

pub async fn get_product(
    state: &AppState,
    viewer: &MaybeUser,
    id: Uuid,
) -> AppResult<ApiResponse<ProductDetail>> {
    let model = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;
    let can_manage = viewer
        .0
        .as_ref()
        .is_some_and(|user| user.can_manage(model.owner_id));
    let product = product_view(&state.orm, model).await?;
    Ok(ApiResponse::success(
        "Product",
        ProductDetail {
            product,
            can_manage,
        },
        None,
    ))
}

fn positive(name: &str, value: f64) -> AppResult<f64> {
    if value <= 0.0 {
        return Err(AppError::bad_request(format!("{name} must be greater than 0")));
    }
    Ok(value)
}

fn non_negative_stock(stock: i32) -> AppResult<i32> {
    if stock < 0 {
        return Err(AppError::bad_request("stock cannot be negative"));
    }
    Ok(stock)
}

async fn ensure_category_exists(state: &AppState, id: Uuid) -> AppResult<()> {
    if Categories::find_by_id(id).one(&state.orm).await?.is_none() {
        return Err(AppError::bad_request("Category not found"));
    }
    Ok(())
}

async fn ensure_shop_exists(state: &AppState, id: Uuid) -> AppResult<()> {
    if Shops::find_by_id(id).one(&state.orm).await?.is_none() {
        return Err(AppError::bad_request("Shop not found"));
    }
    Ok(())
}

fn category_field(form: &FormData) -> AppResult<Option<Uuid>> {
    Ok(form.uuid("categoryId")?.or(form.uuid("category")?))
}

fn shop_field(form: &FormData) -> AppResult<Option<Uuid>> {
    Ok(form.uuid("shopId")?.or(form.uuid("shop")?))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    mut form: FormData,
) -> AppResult<ApiResponse<Product>> {
    ensure_merchant(user)?;

    let (Some(name), Some(price), Some(category_id), Some(seller), Some(location)) = (
        form.string("name"),
        form.float("price")?,
        category_field(&form)?,
        form.string("seller"),
        form.string("location"),
    ) else {
        return Err(AppError::bad_request(
            "Name, price, category, seller, and location are required",
        ));
    };
    let price = positive("price", price)?;
    let original_price = form
        .float("originalPrice")?
        .map(|p| positive("originalPrice", p))
        .transpose()?;
    let stock = non_negative_stock(form.int("stock")?.unwrap_or(0))?;
    let shop_id = shop_field(&form)?;

    ensure_category_exists(state, category_id).await?;
    if let Some(shop_id) = shop_id {
        ensure_shop_exists(state, shop_id).await?;
    }

    let image = form.image(state.media.as_ref(), IMAGE_FOLDER, "image").await;
    let now = Utc::now();
    let product = products::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        description: Set(form.string("description")),
        price: Set(price),
        original_price: Set(original_price),
        category_id: Set(category_id),
        shop_id: Set(shop_id),
        image: Set(image),
        stock: Set(stock),
        seller: Set(seller),
        location: Set(location),
        owner_id: Set(user.user_id),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(product_id = %product.id, owner_id = %user.user_id, "product created");
    Ok(ApiResponse::success(
        "Product created successfully",
        product_view(&state.orm, product).await?,
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    mut form: FormData,
) -> AppResult<ApiResponse<Product>> {
    ensure_merchant(user)?;
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;
    ensure_owner(user, existing.owner_id, "product")?;

    let mut active: products::ActiveModel = existing.into();
    if let Some(name) = form.string("name") {
        active.name = Set(name);
    }
    if let Some(description) = form.string("description") {
        active.description = Set(Some(description));
    }
    if let Some(price) = form.float("price")? {
        active.price = Set(positive("price", price)?);
    }
    if let Some(original_price) = form.float("originalPrice")? {
        active.original_price = Set(Some(positive("originalPrice", original_price)?));
    }
    if let Some(category_id) = category_field(&form)? {
        ensure_category_exists(state, category_id).await?;
        active.category_id = Set(category_id);
    }
    if let Some(shop_id) = shop_field(&form)? {
        ensure_shop_exists(state, shop_id).await?;
        active.shop_id = Set(Some(shop_id));
    }
    if let Some(stock) = form.int("stock")? {
        active.stock = Set(non_negative_stock(stock)?);
    }
    if let Some(seller) = form.string("seller") {
        active.seller = Set(seller);
    }
    if let Some(location) = form.string("location") {
        active.location = Set(location);
    }
    if let Some(image) = form.image(state.media.as_ref(), IMAGE_FOLDER, "image").await {
        active.image = Set(Some(image));
    }
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&state.orm).await?;
    tracing::info!(product_id = %product.id, user_id = %user.user_id, "product updated");
    Ok(ApiResponse::success(
        "Product updated successfully",
        product_view(&state.orm, product).await?,
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Deleted>> {
    ensure_merchant(user)?;
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;
    ensure_owner(user, existing.owner_id, "product")?;

    existing.delete(&state.orm).await?;
    tracing::info!(product_id = %id, user_id = %user.user_id, "product deleted");
    Ok(ApiResponse::success(
        "Product deleted successfully",
        Deleted { id },
        Some(Meta::empty()),
    ))
}
