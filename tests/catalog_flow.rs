mod common;

use local_commerce_api::{
    entity::sea_orm_active_enums::Role,
    error::AppError,
    middleware::{
        auth::{AuthUser, MaybeUser},
        form::FormData,
    },
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    services::{category_service, product_service, shop_service},
};
use uuid::Uuid;

fn shop_form(name: &str) -> FormData {
    FormData::from_pairs([
        ("name", name),
        ("location", "Musanze"),
        ("telephone", "0788123456"),
        ("email", "shop@example.com"),
    ])
}

#[tokio::test]
async fn duplicate_category_name_is_a_conflict() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let admin = common::create_user(&state, "admin@example.com", Role::Admin).await?;
    common::create_category(&state, &admin, "Groceries").await?;

    let err = category_service::create_category(
        &state,
        &admin,
        FormData::from_pairs([("name", "Groceries")]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let list = category_service::list_categories(&state).await?;
    assert_eq!(list.data.expect("categories").items.len(), 1);
    Ok(())
}

#[tokio::test]
async fn only_admins_manage_categories() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let owner = common::create_user(&state, "owner@example.com", Role::BusinessOwner).await?;

    let err = category_service::create_category(
        &state,
        &owner,
        FormData::from_pairs([("name", "Crafts")]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    Ok(())
}

#[tokio::test]
async fn product_ownership_is_enforced() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let admin = common::create_user(&state, "admin@example.com", Role::Admin).await?;
    let owner = common::create_user(&state, "owner@example.com", Role::BusinessOwner).await?;
    let rival = common::create_user(&state, "rival@example.com", Role::BusinessOwner).await?;
    let customer = common::create_user(&state, "cus@example.com", Role::Customer).await?;
    let category = common::create_category(&state, &admin, "Crafts").await?;
    let product = common::create_product(&state, &owner, category, "Basket", 12.0).await?;

    let err = product_service::update_product(
        &state,
        &rival,
        product,
        FormData::from_pairs([("price", "1")]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = product_service::delete_product(&state, &customer, product)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let updated = product_service::update_product(
        &state,
        &owner,
        product,
        FormData::from_pairs([("stock", "3"), ("name", "Woven basket")]),
    )
    .await?
    .data
    .expect("product");
    assert_eq!(updated.stock, 3);
    assert_eq!(updated.name, "Woven basket");
    assert_eq!(updated.price, 12.0);

    let detail = product_service::get_product(&state, &MaybeUser(Some(owner.clone())), product)
        .await?
        .data
        .expect("product");
    assert!(detail.can_manage);
    let detail = product_service::get_product(&state, &MaybeUser(None), product)
        .await?
        .data
        .expect("product");
    assert!(!detail.can_manage);

    // Admins may act on anything.
    product_service::delete_product(&state, &admin, product).await?;
    let err = product_service::get_product(&state, &MaybeUser(None), product)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn product_validation() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let admin = common::create_user(&state, "admin@example.com", Role::Admin).await?;
    let category = common::create_category(&state, &admin, "Crafts").await?;
    let category = category.to_string();

    let missing_seller = FormData::from_pairs([
        ("name", "Basket"),
        ("price", "10"),
        ("categoryId", category.as_str()),
        ("location", "Kigali"),
    ]);
    let err = product_service::create_product(&state, &admin, missing_seller)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let zero_price = FormData::from_pairs([
        ("name", "Basket"),
        ("price", "0"),
        ("categoryId", category.as_str()),
        ("seller", "Ana"),
        ("location", "Kigali"),
    ]);
    let err = product_service::create_product(&state, &admin, zero_price)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let unknown = Uuid::new_v4().to_string();
    let unknown_category = FormData::from_pairs([
        ("name", "Basket"),
        ("price", "10"),
        ("category", unknown.as_str()),
        ("seller", "Ana"),
        ("location", "Kigali"),
    ]);
    let err = product_service::create_product(&state, &admin, unknown_category)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref m) if m == "Category not found"));
    Ok(())
}

#[tokio::test]
async fn product_search_filters_and_pages() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let admin = common::create_user(&state, "admin@example.com", Role::Admin).await?;
    let food = common::create_category(&state, &admin, "Groceries").await?;
    let crafts = common::create_category(&state, &admin, "Crafts").await?;
    common::create_product(&state, &admin, food, "Red Beans", 2.0).await?;
    common::create_product(&state, &admin, food, "Rice", 4.0).await?;
    common::create_product(&state, &admin, crafts, "Bean bag", 30.0).await?;

    let found = product_service::list_products(
        &state,
        ProductQuery {
            q: Some("BEAN".into()),
            sort_by: Some(ProductSortBy::Price),
            sort_order: Some(SortOrder::Asc),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("products");
    let names: Vec<_> = found.items.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["Red Beans", "Bean bag"]);

    let in_food = product_service::list_products(
        &state,
        ProductQuery {
            category: Some(food),
            max_price: Some(3.0),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("products");
    assert_eq!(in_food.items.len(), 1);
    assert_eq!(
        in_food.items[0].category.as_ref().map(|c| c.name.as_str()),
        Some("Groceries")
    );

    let page = product_service::list_products(
        &state,
        ProductQuery {
            sort_by: Some(ProductSortBy::Name),
            sort_order: Some(SortOrder::Asc),
            page: Some(2),
            per_page: Some(2),
            ..Default::default()
        },
    )
    .await?;
    let meta = page.meta.expect("meta");
    assert_eq!(meta.total, Some(3));
    assert_eq!(meta.page, Some(2));
    let items = page.data.expect("products").items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Rice");
    Ok(())
}

#[tokio::test]
async fn deleted_category_leaves_products_with_empty_reference() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let admin = common::create_user(&state, "admin@example.com", Role::Admin).await?;
    let category = common::create_category(&state, &admin, "Seasonal").await?;
    let product = common::create_product(&state, &admin, category, "Lantern", 9.0).await?;

    category_service::delete_category(&state, &admin, category).await?;

    let detail = product_service::get_product(&state, &MaybeUser(None), product)
        .await?
        .data
        .expect("product");
    assert_eq!(detail.product.category_id, category);
    assert!(detail.product.category.is_none());
    Ok(())
}

#[tokio::test]
async fn shops_are_owned_and_validated() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let owner = common::create_user(&state, "owner@example.com", Role::BusinessOwner).await?;
    let rival = common::create_user(&state, "rival@example.com", Role::BusinessOwner).await?;
    let customer = common::create_user(&state, "cus@example.com", Role::Customer).await?;

    let err = shop_service::create_shop(&state, &customer, shop_form("Nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let bad_email = FormData::from_pairs([
        ("name", "Crafty"),
        ("location", "Huye"),
        ("telephone", "0788"),
        ("email", "not-an-email"),
    ]);
    let err = shop_service::create_shop(&state, &owner, bad_email)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let shop = shop_service::create_shop(&state, &owner, shop_form("Crafty"))
        .await?
        .data
        .expect("shop");
    assert_eq!(shop.owner_id, owner.user_id);

    let err = shop_service::update_shop(
        &state,
        &rival,
        shop.id,
        FormData::from_pairs([("name", "Mine now")]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let mine = shop_service::list_my_shops(&state, &owner).await?;
    assert_eq!(mine.data.expect("shops").items.len(), 1);
    let theirs = shop_service::list_my_shops(&state, &rival).await?;
    assert!(theirs.data.expect("shops").items.is_empty());

    shop_service::delete_shop(&state, &owner, shop.id).await?;
    let err = shop_service::get_shop(&state, shop.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn product_can_reference_a_shop() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let admin = common::create_user(&state, "admin@example.com", Role::Admin).await?;
    let owner: AuthUser =
        common::create_user(&state, "owner@example.com", Role::BusinessOwner).await?;
    let category = common::create_category(&state, &admin, "Crafts").await?.to_string();
    let shop = shop_service::create_shop(&state, &owner, shop_form("Crafty"))
        .await?
        .data
        .expect("shop");
    let shop_id = shop.id.to_string();

    let product = product_service::create_product(
        &state,
        &owner,
        FormData::from_pairs([
            ("name", "Basket"),
            ("price", "10"),
            ("originalPrice", "14"),
            ("category", category.as_str()),
            ("shop", shop_id.as_str()),
            ("seller", "Crafty"),
            ("location", "Musanze"),
        ]),
    )
    .await?
    .data
    .expect("product");

    assert_eq!(product.shop_id, Some(shop.id));
    assert_eq!(product.shop.as_ref().map(|s| s.name.as_str()), Some("Crafty"));
    assert_eq!(product.original_price, Some(14.0));
    assert_eq!(product.stock, 0);
    Ok(())
}
