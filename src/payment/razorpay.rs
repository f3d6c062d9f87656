use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use super::{GatewayOrder, PaymentGateway};
use crate::error::{AppError, AppResult};

/// Razorpay Orders API client. Requests are bounded by the configured
/// timeout; a timed-out or failed creation is reported as a gateway error and
/// never retried here.
pub struct RazorpayGateway {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayGateway {
    pub fn new(
        base_url: impl Into<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> AppResult<GatewayOrder> {
        let url = format!("{}/orders", self.base_url);
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&json!({
                "amount": amount_minor,
                "currency": currency,
                "receipt": receipt,
            }))
            .send()
            .await
            .map_err(|e| AppError::Gateway(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, %body, "gateway rejected order creation");
            return Err(AppError::Gateway(format!(
                "order creation failed with status {status}"
            )));
        }

        let order = response
            .json::<GatewayOrder>()
            .await
            .map_err(|e| AppError::Gateway(format!("invalid gateway response: {e}")))?;

        tracing::info!(gateway_order_id = %order.id, amount = order.amount, "gateway order created");
        Ok(order)
    }
}
