mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use local_commerce_api::{
    app::build_app,
    entity::sea_orm_active_enums::Role,
    middleware::form::FormData,
    services::{auth_service::issue_token, shop_service},
    state::AppState,
};
use serde_json::{Value, json};
use tower::ServiceExt;

fn app(state: AppState) -> Router {
    build_app(state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

fn get_request(uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).expect("request")
}

#[tokio::test]
async fn health_reports_database_status() -> anyhow::Result<()> {
    let app = app(common::setup_state().await?);

    let (status, body) = send(&app, get_request("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Health check");
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["database"], "up");
    Ok(())
}

#[tokio::test]
async fn unknown_routes_get_a_json_404() -> anyhow::Result<()> {
    let app = app(common::setup_state().await?);

    let response = app
        .clone()
        .oneshot(get_request("/api/nowhere", None))
        .await?;
    assert!(response.headers().contains_key("x-request-id"));

    let (status, body) = send(&app, get_request("/api/nowhere", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["data"]["path"], "/api/nowhere");
    Ok(())
}

#[tokio::test]
async fn missing_token_is_401_and_bad_token_is_403() -> anyhow::Result<()> {
    let app = app(common::setup_state().await?);

    let (status, body) = send(&app, get_request("/api/cart", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Access token required");
    assert_eq!(body["data"]["error"], "Access token required");

    let (status, _) = send(&app, get_request("/api/cart", Some("Bearer not-a-jwt"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, get_request("/api/cart", Some("Basic abc"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn token_for_a_deleted_account_is_rejected() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let token = issue_token(&state.config, uuid::Uuid::new_v4())?;
    let app = app(state);

    let auth = format!("Bearer {token}");
    let (status, _) = send(&app, get_request("/api/auth/me", Some(&auth))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn register_login_and_me_over_http() -> anyhow::Result<()> {
    let app = app(common::setup_state().await?);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/register",
            None,
            json!({ "email": "ana@example.com", "password": "secret123", "name": "Ana" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["user"]["role"], "customer");
    assert!(body["data"]["user"].get("passwordHash").is_none());

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": "ana@example.com", "password": "secret123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().expect("token").to_string();

    let auth = format!("Bearer {token}");
    let (status, body) = send(&app, get_request("/api/auth/me", Some(&auth))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "ana@example.com");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": "ana@example.com", "password": "wrong-password" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid email or password");
    Ok(())
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() -> anyhow::Result<()> {
    let app = app(common::setup_state().await?);

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .expect("request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
    Ok(())
}

#[tokio::test]
async fn catalog_writes_follow_roles() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let admin = common::create_user(&state, "admin@example.com", Role::Admin).await?;
    let customer = common::create_user(&state, "cus@example.com", Role::Customer).await?;
    let admin_token = issue_token(&state.config, admin.user_id)?;
    let customer_token = issue_token(&state.config, customer.user_id)?;
    let app = app(state);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/categories",
            Some(&customer_token),
            json!({ "name": "Crafts" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/categories",
            Some(&admin_token),
            json!({ "name": "Crafts", "description": "Handmade" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let category_id = body["data"]["id"].as_str().expect("id").to_string();

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/products",
            Some(&admin_token),
            json!({
                "name": "Basket",
                "price": 12.5,
                "categoryId": category_id,
                "seller": "Ana",
                "location": "Kigali",
                "stock": 4
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["category"]["name"], "Crafts");
    let product_id = body["data"]["id"].as_str().expect("id").to_string();

    let (status, body) = send(
        &app,
        get_request("/api/products?minPrice=10&page=1&perPage=5", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["meta"]["perPage"], 5);
    assert_eq!(body["data"][0]["id"], product_id.as_str());

    let customer_auth = format!("Bearer {customer_token}");
    let (status, body) = send(
        &app,
        get_request(&format!("/api/products/{product_id}"), Some(&customer_auth)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["canManage"], false);
    Ok(())
}

#[tokio::test]
async fn cart_and_checkout_over_http() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let admin = common::create_user(&state, "admin@example.com", Role::Admin).await?;
    let customer = common::create_user(&state, "cus@example.com", Role::Customer).await?;
    let category = common::create_category(&state, &admin, "Groceries").await?;
    let product = common::create_product(&state, &admin, category, "Beans", 2.5).await?;
    let token = issue_token(&state.config, customer.user_id)?;
    let app = app(state);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/cart",
            Some(&token),
            json!({ "productId": product, "quantity": 4 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"][0]["quantity"], 4);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/orders",
            Some(&token),
            json!({
                "shippingAddress": {
                    "fullName": "Ana Uwase",
                    "phone": "0788000000",
                    "email": "ana@example.com",
                    "address": "KG 11 Ave",
                    "city": "Kigali"
                },
                "paymentMethod": "mobile_money"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["totalAmount"], 10.0);
    assert_eq!(body["data"]["status"], "pending");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/orders",
            Some(&token),
            json!({
                "shippingAddress": { "fullName": "Ana" },
                "paymentMethod": "cash"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
    Ok(())
}

fn request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn malformed_ids_and_queries_use_the_error_envelope() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let customer = common::create_user(&state, "cus@example.com", Role::Customer).await?;
    let token = issue_token(&state.config, customer.user_id)?;
    let app = app(state);

    for (method, uri) in [
        ("GET", "/api/orders/xyz"),
        ("GET", "/api/products/not-a-uuid"),
        ("DELETE", "/api/cart/xyz"),
        ("GET", "/api/products?minPrice=cheap"),
    ] {
        let response = app.clone().oneshot(request(method, uri, &token)).await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{method} {uri}");
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("application/json"), "{method} {uri}");

        let (_, body) = send(&app, request(method, uri, &token)).await;
        assert!(body["message"].is_string(), "{method} {uri}");
        assert_eq!(body["data"]["error"], body["message"]);
    }
    Ok(())
}

#[tokio::test]
async fn static_routes_win_over_id_routes_and_keep_their_role_gates() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let admin = common::create_user(&state, "admin@example.com", Role::Admin).await?;
    let owner = common::create_user(&state, "owner@example.com", Role::BusinessOwner).await?;
    let customer = common::create_user(&state, "cus@example.com", Role::Customer).await?;
    shop_service::create_shop(
        &state,
        &owner,
        FormData::from_pairs([
            ("name", "Corner Shop"),
            ("location", "Kigali"),
            ("telephone", "0788123456"),
            ("email", "corner@example.com"),
        ]),
    )
    .await?;
    let admin_token = issue_token(&state.config, admin.user_id)?;
    let owner_token = issue_token(&state.config, owner.user_id)?;
    let customer_token = issue_token(&state.config, customer.user_id)?;
    let app = app(state);

    let cases = [
        ("GET", "/api/orders/all", &admin_token, StatusCode::OK),
        ("GET", "/api/orders/admin/all", &admin_token, StatusCode::OK),
        ("GET", "/api/orders/all", &customer_token, StatusCode::FORBIDDEN),
        ("GET", "/api/orders/admin/all", &customer_token, StatusCode::FORBIDDEN),
        ("GET", "/api/products/my", &customer_token, StatusCode::FORBIDDEN),
        ("GET", "/api/shops/my", &customer_token, StatusCode::FORBIDDEN),
        ("GET", "/api/promotions/my", &customer_token, StatusCode::FORBIDDEN),
        ("GET", "/api/products/my", &owner_token, StatusCode::OK),
        ("GET", "/api/promotions/my", &owner_token, StatusCode::OK),
        ("GET", "/api/promotions/active", &customer_token, StatusCode::OK),
        ("GET", "/api/cart", &customer_token, StatusCode::OK),
        ("DELETE", "/api/cart/clear/all", &customer_token, StatusCode::OK),
        ("DELETE", "/api/cart", &customer_token, StatusCode::OK),
    ];
    for (method, uri, token, expected) in cases {
        let (status, _) = send(&app, request(method, uri, token)).await;
        assert_eq!(status, expected, "{method} {uri}");
    }

    let (status, body) = send(&app, request("GET", "/api/shops/my", &owner_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["name"], "Corner Shop");
    Ok(())
}
