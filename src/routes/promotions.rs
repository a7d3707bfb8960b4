use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::promotions::{PromotionForm, PromotionList},
    error::AppResult,
    middleware::{auth::AuthUser, extract::ApiPath, form::FormData},
    models::Promotion,
    response::{ApiResponse, Deleted},
    services::promotion_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_promotions).post(create_promotion))
        .route("/my", get(list_my_promotions))
        .route("/active", get(list_active_promotions))
        .route(
            "/{id}",
            get(get_promotion)
                .put(update_promotion)
                .delete(delete_promotion),
        )
}

#[utoipa::path(
    get,
    path = "/api/promotions",
    responses((status = 200, description = "All promotions", body = ApiResponse<PromotionList>)),
    tag = "Promotions"
)]
pub async fn list_promotions(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<PromotionList>>> {
    let resp = promotion_service::list_promotions(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/promotions/active",
    responses((status = 200, description = "Promotions running right now", body = ApiResponse<PromotionList>)),
    tag = "Promotions"
)]
pub async fn list_active_promotions(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<PromotionList>>> {
    let resp = promotion_service::list_active_promotions(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/promotions/my",
    responses(
        (status = 200, description = "Promotions owned by the caller", body = ApiResponse<PromotionList>),
        (status = 403, description = "Admin or business owner only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Promotions"
)]
pub async fn list_my_promotions(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<PromotionList>>> {
    let resp = promotion_service::list_my_promotions(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/promotions/{id}",
    params(("id" = Uuid, Path, description = "Promotion ID")),
    responses(
        (status = 200, description = "Get promotion", body = ApiResponse<Promotion>),
        (status = 404, description = "Promotion not found"),
    ),
    tag = "Promotions"
)]
pub async fn get_promotion(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<Promotion>>> {
    let resp = promotion_service::get_promotion(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/promotions",
    request_body(content = PromotionForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Promotion created", body = ApiResponse<Promotion>),
        (status = 400, description = "Missing field, invalid discount or date window"),
    ),
    security(("bearer_auth" = [])),
    tag = "Promotions"
)]
pub async fn create_promotion(
    State(state): State<AppState>,
    user: AuthUser,
    form: FormData,
) -> AppResult<(StatusCode, Json<ApiResponse<Promotion>>)> {
    let resp = promotion_service::create_promotion(&state, &user, form).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/promotions/{id}",
    params(("id" = Uuid, Path, description = "Promotion ID")),
    request_body(content = PromotionForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Promotion updated", body = ApiResponse<Promotion>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Promotion not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Promotions"
)]
pub async fn update_promotion(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    form: FormData,
) -> AppResult<Json<ApiResponse<Promotion>>> {
    let resp = promotion_service::update_promotion(&state, &user, id, form).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/promotions/{id}",
    params(("id" = Uuid, Path, description = "Promotion ID")),
    responses(
        (status = 200, description = "Promotion deleted", body = ApiResponse<Deleted>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Promotion not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Promotions"
)]
pub async fn delete_promotion(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<Deleted>>> {
    let resp = promotion_service::delete_promotion(&state, &user, id).await?;
    Ok(Json(resp))
}
