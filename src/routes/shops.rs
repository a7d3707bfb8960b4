use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::shops::{ShopForm, ShopList},
    error::AppResult,
    middleware::{auth::AuthUser, extract::ApiPath, form::FormData},
    models::Shop,
    response::{ApiResponse, Deleted},
    services::shop_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_shops).post(create_shop))
        .route("/my", get(list_my_shops))
        .route("/{id}", get(get_shop).put(update_shop).delete(delete_shop))
}

#[utoipa::path(
    get,
    path = "/api/shops",
    responses((status = 200, description = "List shops", body = ApiResponse<ShopList>)),
    tag = "Shops"
)]
pub async fn list_shops(State(state): State<AppState>) -> AppResult<Json<ApiResponse<ShopList>>> {
    let resp = shop_service::list_shops(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/shops/my",
    responses(
        (status = 200, description = "Shops owned by the caller", body = ApiResponse<ShopList>),
        (status = 403, description = "Admin or business owner only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Shops"
)]
pub async fn list_my_shops(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ShopList>>> {
    let resp = shop_service::list_my_shops(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/shops/{id}",
    params(("id" = Uuid, Path, description = "Shop ID")),
    responses(
        (status = 200, description = "Get shop", body = ApiResponse<Shop>),
        (status = 404, description = "Shop not found"),
    ),
    tag = "Shops"
)]
pub async fn get_shop(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<Shop>>> {
    let resp = shop_service::get_shop(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/shops",
    request_body(content = ShopForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Shop created; owner and admins are notified", body = ApiResponse<Shop>),
        (status = 400, description = "Missing field, invalid email or duplicate name"),
    ),
    security(("bearer_auth" = [])),
    tag = "Shops"
)]
pub async fn create_shop(
    State(state): State<AppState>,
    user: AuthUser,
    form: FormData,
) -> AppResult<(StatusCode, Json<ApiResponse<Shop>>)> {
    let resp = shop_service::create_shop(&state, &user, form).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/shops/{id}",
    params(("id" = Uuid, Path, description = "Shop ID")),
    request_body(content = ShopForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Shop updated", body = ApiResponse<Shop>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Shop not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Shops"
)]
pub async fn update_shop(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    form: FormData,
) -> AppResult<Json<ApiResponse<Shop>>> {
    let resp = shop_service::update_shop(&state, &user, id, form).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/shops/{id}",
    params(("id" = Uuid, Path, description = "Shop ID")),
    responses(
        (status = 200, description = "Shop deleted", body = ApiResponse<Deleted>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Shop not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Shops"
)]
pub async fn delete_shop(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<Deleted>>> {
    let resp = shop_service::delete_shop(&state, &user, id).await?;
    Ok(Json(resp))
}
