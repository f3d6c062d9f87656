use async_trait::async_trait;
use rand::{Rng, distributions::Alphanumeric};
use serde::Deserialize;

use crate::error::AppResult;

pub mod razorpay;
pub mod signature;

pub use razorpay::RazorpayGateway;

/// A payment order ("intent") created on the gateway's side. The client UI
/// opens the gateway checkout with this id; the verification callback
/// correlates back to our order through it.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

/// Seam to the payment provider. Production uses [`RazorpayGateway`]; tests
/// substitute a stub.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment order for `amount_minor` in the gateway's smallest
    /// currency unit. Must not be retried on failure: the call is not
    /// idempotent on the gateway side.
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> AppResult<GatewayOrder>;
}

/// Receipt identifier sent with the gateway order, unique per checkout.
pub fn generate_receipt() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();
    format!("rcpt_{suffix}")
}

#[cfg(test)]
mod tests {
    use super::generate_receipt;

    #[test]
    fn receipts_are_prefixed_and_unique() {
        let a = generate_receipt();
        let b = generate_receipt();
        assert!(a.starts_with("rcpt_"));
        assert_eq!(a.len(), 21);
        assert_ne!(a, b);
    }
}
