use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::orders::{VerifyPaymentRequest, VerifyPaymentResponse},
    error::AppResult,
    response::ApiResponse,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/verify", post(verify_payment))
}

#[utoipa::path(
    post,
    path = "/api/payment/verify",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment confirmed", body = ApiResponse<VerifyPaymentResponse>),
        (status = 400, description = "Invalid signature"),
        (status = 404, description = "No order for the gateway id"),
        (status = 409, description = "Order reservation expired"),
    ),
    tag = "Payment"
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    Json(payload): Json<VerifyPaymentRequest>,
) -> AppResult<Json<ApiResponse<VerifyPaymentResponse>>> {
    let resp = order_service::verify_payment(&state, payload).await?;
    Ok(Json(resp))
}
