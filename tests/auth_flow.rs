use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use marketplace_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    dto::auth::{LoginRequest, RegisterRequest},
    entity::users::UserRole,
    error::{AppError, AppResult},
    payment::{GatewayOrder, PaymentGateway},
    services::auth_service::{self, login_user, register_user},
    state::AppState,
};

struct NoGateway;

#[async_trait]
impl PaymentGateway for NoGateway {
    async fn create_order(
        &self,
        _amount_minor: i64,
        _currency: &str,
        _receipt: &str,
    ) -> AppResult<GatewayOrder> {
        Err(AppError::Gateway("not used in auth tests".into()))
    }
}

async fn test_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(None);
        }
    };

    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;

    let config = AppConfig {
        database_url,
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "test-secret".into(),
        razorpay_key_id: "rzp_test_key".into(),
        razorpay_key_secret: "test_key_secret".into(),
        razorpay_api_url: "http://localhost:0".into(),
        gateway_timeout: Duration::from_secs(5),
        reservation_ttl: Duration::from_secs(15 * 60),
        cookie_secure: false,
    };

    Ok(Some(AppState {
        orm,
        config: Arc::new(config),
        gateway: Arc::new(NoGateway),
    }))
}

fn register_request(email: &str) -> RegisterRequest {
    RegisterRequest {
        name: "Test User".into(),
        email: email.into(),
        password: "s3cret-password".into(),
    }
}

#[tokio::test]
async fn customer_register_and_login_sets_session_cookie() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let email = format!("customer-{}@example.com", Uuid::new_v4().simple());
    let created = register_user(&state, auth_service::CUSTOMER, register_request(&email)).await?;
    let user = created.data.expect("user data");
    assert_eq!(user.role, UserRole::Customer);
    assert_eq!(user.email, email);

    let (resp, cookie) = login_user(
        &state,
        auth_service::CUSTOMER,
        LoginRequest {
            email: email.clone(),
            password: "s3cret-password".into(),
        },
    )
    .await?;
    assert!(!resp.data.expect("login data").token.is_empty());
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Max-Age=604800"));
    assert!(cookie.contains("Path=/"));

    Ok(())
}

#[tokio::test]
async fn wrong_password_and_wrong_surface_are_rejected() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let email = format!("customer-{}@example.com", Uuid::new_v4().simple());
    register_user(&state, auth_service::CUSTOMER, register_request(&email)).await?;

    let err = login_user(
        &state,
        auth_service::CUSTOMER,
        LoginRequest {
            email: email.clone(),
            password: "wrong".into(),
        },
    )
    .await
    .expect_err("wrong password must fail");
    assert!(matches!(err, AppError::BadRequest(_)));

    // A customer account does not open the vendor surface.
    let err = login_user(
        &state,
        auth_service::VENDOR,
        LoginRequest {
            email,
            password: "s3cret-password".into(),
        },
    )
    .await
    .expect_err("customer cannot log in as vendor");
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn same_email_may_exist_once_per_role() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let email = format!("dual-{}@example.com", Uuid::new_v4().simple());
    register_user(&state, auth_service::CUSTOMER, register_request(&email)).await?;
    let vendor = register_user(&state, auth_service::VENDOR, register_request(&email)).await?;
    assert_eq!(vendor.data.expect("user data").role, UserRole::Vendor);

    let err = register_user(&state, auth_service::CUSTOMER, register_request(&email))
        .await
        .expect_err("duplicate registration must fail");
    assert!(matches!(err, AppError::BadRequest(_)));

    let (_, cookie) = login_user(
        &state,
        auth_service::VENDOR,
        LoginRequest {
            email,
            password: "s3cret-password".into(),
        },
    )
    .await?;
    assert!(cookie.starts_with("vendor_token="));

    Ok(())
}
