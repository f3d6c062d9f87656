use axum::{
    Json, Router,
    extract::State,
    http::header::SET_COOKIE,
    response::AppendHeaders,
    routing::post,
};

use crate::{
    dto::auth::{LoginRequest, LoginResponse, RegisterRequest},
    error::AppResult,
    models::User,
    response::ApiResponse,
    services::auth_service::{self, login_user, register_user},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/admin/login", post(admin_login))
        .route("/vendor/register", post(vendor_register))
        .route("/vendor/login", post(vendor_login))
}

type LoginReply = (
    AppendHeaders<[(axum::http::HeaderName, String); 1]>,
    Json<ApiResponse<LoginResponse>>,
);

async fn login_with_policy(
    state: &AppState,
    policy: auth_service::RolePolicy,
    payload: LoginRequest,
) -> AppResult<LoginReply> {
    let (resp, cookie) = login_user(state, policy, payload).await?;
    Ok((AppendHeaders([(SET_COOKIE, cookie)]), Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Register customer", body = ApiResponse<User>),
        (status = 400, description = "Email already taken")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = register_user(&state, auth_service::CUSTOMER, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login customer", body = ApiResponse<LoginResponse>),
        (status = 400, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<LoginReply> {
    login_with_policy(&state, auth_service::CUSTOMER, payload).await
}

#[utoipa::path(
    post,
    path = "/api/auth/admin/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login admin", body = ApiResponse<LoginResponse>),
        (status = 400, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
pub async fn admin_login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<LoginReply> {
    login_with_policy(&state, auth_service::ADMIN, payload).await
}

#[utoipa::path(
    post,
    path = "/api/auth/vendor/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Register vendor", body = ApiResponse<User>),
        (status = 400, description = "Email already taken")
    ),
    tag = "Auth"
)]
pub async fn vendor_register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = register_user(&state, auth_service::VENDOR, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/vendor/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login vendor", body = ApiResponse<LoginResponse>),
        (status = 400, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
pub async fn vendor_login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<LoginReply> {
    login_with_policy(&state, auth_service::VENDOR, payload).await
}
