use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use uuid::Uuid;

use crate::{
    dto::carousels::{CarouselList, CreateCarouselRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Carousel,
    response::ApiResponse,
    services::carousel_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_carousels).post(create_carousel))
        .route("/{id}", delete(delete_carousel))
}

#[utoipa::path(
    get,
    path = "/api/carousels",
    responses(
        (status = 200, description = "List carousels in display order", body = ApiResponse<CarouselList>)
    ),
    tag = "Carousels"
)]
pub async fn list_carousels(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<CarouselList>>> {
    let resp = carousel_service::list_carousels(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/carousels",
    request_body = CreateCarouselRequest,
    responses(
        (status = 201, description = "Create carousel", body = ApiResponse<Carousel>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Carousels"
)]
pub async fn create_carousel(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCarouselRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Carousel>>)> {
    let resp = carousel_service::create_carousel(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    delete,
    path = "/api/carousels/{id}",
    params(
        ("id" = Uuid, Path, description = "Carousel ID")
    ),
    responses(
        (status = 200, description = "Deleted carousel"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Carousel not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Carousels"
)]
pub async fn delete_carousel(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = carousel_service::delete_carousel(&state, &user, id).await?;
    Ok(Json(resp))
}
