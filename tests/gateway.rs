use std::time::Duration;

use marketplace_api::{
    error::AppError,
    payment::{PaymentGateway, RazorpayGateway},
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{basic_auth, method, path},
};

#[tokio::test]
async fn creates_a_gateway_order() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(basic_auth("rzp_test_key", "rzp_test_secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "order_abc",
            "amount": 30000,
            "currency": "INR",
            "receipt": "rcpt_x",
            "status": "created"
        })))
        .mount(&server)
        .await;

    let gateway = RazorpayGateway::new(
        server.uri(),
        "rzp_test_key",
        "rzp_test_secret",
        Duration::from_secs(5),
    )?;

    let order = gateway.create_order(30000, "INR", "rcpt_x").await?;
    assert_eq!(order.id, "order_abc");
    assert_eq!(order.amount, 30000);
    assert_eq!(order.currency, "INR");
    Ok(())
}

#[tokio::test]
async fn gateway_rejection_surfaces_as_gateway_error() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": { "code": "BAD_REQUEST_ERROR" }
        })))
        .mount(&server)
        .await;

    let gateway =
        RazorpayGateway::new(server.uri(), "k", "s", Duration::from_secs(5))?;

    let err = gateway
        .create_order(100, "INR", "rcpt_y")
        .await
        .expect_err("4xx must fail");
    assert!(matches!(err, AppError::Gateway(_)));
    Ok(())
}

#[tokio::test]
async fn slow_gateway_times_out() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(5))
                .set_body_json(serde_json::json!({
                    "id": "order_slow",
                    "amount": 100,
                    "currency": "INR"
                })),
        )
        .mount(&server)
        .await;

    let gateway =
        RazorpayGateway::new(server.uri(), "k", "s", Duration::from_millis(200))?;

    let err = gateway
        .create_order(100, "INR", "rcpt_z")
        .await
        .expect_err("timeout must fail");
    assert!(matches!(err, AppError::Gateway(_)));
    Ok(())
}
