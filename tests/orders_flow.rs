use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use marketplace_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    dto::orders::{CreateOrderRequest, OrderItemRequest, VerifyPaymentRequest},
    entity::{
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, OrderStatus},
        products::{ActiveModel as ProductActive, Entity as Products, Model as ProductModel},
        users::{ActiveModel as UserActive, UserRole},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::CustomerSnapshot,
    payment::{GatewayOrder, PaymentGateway},
    routes::admin::UpdateOrderStatusRequest,
    services::{admin_service, order_service},
    state::AppState,
};

const TEST_GATEWAY_SECRET: &str = "test_key_secret";

/// Records requested amounts and hands out unique gateway order ids.
struct StubGateway {
    fail: bool,
    calls: AtomicU64,
}

impl StubGateway {
    fn ok() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            calls: AtomicU64::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            calls: AtomicU64::new(0),
        })
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        _receipt: &str,
    ) -> AppResult<GatewayOrder> {
        if self.fail {
            return Err(AppError::Gateway("stub gateway refused".into()));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(GatewayOrder {
            id: format!("order_stub_{}", Uuid::new_v4().simple()),
            amount: amount_minor,
            currency: currency.to_string(),
        })
    }
}

/// Build state against the test database, or None when no DB is configured.
async fn test_state(gateway: Arc<dyn PaymentGateway>) -> anyhow::Result<Option<AppState>> {
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
        razorpay_key_secret: TEST_GATEWAY_SECRET.into(),
        razorpay_api_url: "http://localhost:0".into(),
        gateway_timeout: Duration::from_secs(5),
        reservation_ttl: Duration::from_secs(15 * 60),
        cookie_secure: false,
    };

    Ok(Some(AppState {
        orm,
        config: Arc::new(config),
        gateway,
    }))
}

async fn create_vendor(state: &AppState) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(format!("vendor-{}@example.com", Uuid::new_v4().simple())),
        password_hash: Set("dummy".into()),
        name: Set("Test Vendor".into()),
        role: Set(UserRole::Vendor),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(user.id)
}

async fn create_product(
    state: &AppState,
    vendor_id: Uuid,
    price: i64,
    stock: i32,
) -> anyhow::Result<ProductModel> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        vendor_id: Set(vendor_id),
        category_id: Set(None),
        name: Set(format!("Widget {}", Uuid::new_v4().simple())),
        description: Set(Some("A product for testing".into())),
        price: Set(price),
        stock: Set(stock),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(product)
}

fn snapshot() -> CustomerSnapshot {
    CustomerSnapshot {
        name: "Asha Rao".into(),
        email: Some("asha@example.com".into()),
        mobile: "9999999999".into(),
        address: "12 MG Road".into(),
        city: "Bengaluru".into(),
        state: "Karnataka".into(),
        pincode: "560001".into(),
    }
}

fn order_request(product_id: Uuid, quantity: i32) -> CreateOrderRequest {
    CreateOrderRequest {
        customer: snapshot(),
        items: vec![OrderItemRequest {
            product_id,
            quantity,
        }],
    }
}

fn valid_verification(gateway_order_id: &str, payment_id: &str) -> VerifyPaymentRequest {
    let signature = marketplace_api::payment::signature::compute_signature(
        gateway_order_id,
        payment_id,
        TEST_GATEWAY_SECRET,
    );
    VerifyPaymentRequest {
        razorpay_order_id: gateway_order_id.to_string(),
        razorpay_payment_id: payment_id.to_string(),
        razorpay_signature: signature,
    }
}

async fn fetch_stock(state: &AppState, product_id: Uuid) -> anyhow::Result<i32> {
    Ok(Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .expect("product exists")
        .stock)
}

// End-to-end: checkout reserves stock and snapshots prices, a valid callback
// flips the order to PAID, and a repeat callback is a no-op success.
#[tokio::test]
async fn checkout_and_verify_flow() -> anyhow::Result<()> {
    let Some(state) = test_state(StubGateway::ok()).await? else {
        return Ok(());
    };

    let vendor_id = create_vendor(&state).await?;
    let product = create_product(&state, vendor_id, 150, 5).await?;

    let resp = order_service::create_order(&state, None, order_request(product.id, 2)).await?;
    let checkout = resp.data.expect("checkout data");
    assert_eq!(checkout.order.total_amount, 300);
    assert_eq!(checkout.order.status, OrderStatus::Pending);
    assert_eq!(checkout.items.len(), 1);
    assert_eq!(checkout.items[0].unit_price, 150);
    assert_eq!(checkout.items[0].quantity, 2);
    assert_eq!(checkout.order.customer.name, "Asha Rao");

    // Stock is reserved at creation time.
    assert_eq!(fetch_stock(&state, product.id).await?, 3);

    // Later catalog edits must not leak into the order.
    let mut active: ProductActive = Products::find_by_id(product.id)
        .one(&state.orm)
        .await?
        .expect("product exists")
        .into();
    active.price = Set(999);
    active.update(&state.orm).await?;

    let verify =
        order_service::verify_payment(&state, valid_verification(&checkout.gateway_order_id, "pay_xyz"))
            .await?;
    assert_eq!(verify.data.expect("verify data").order_id, checkout.order.id);

    let paid = Orders::find_by_id(checkout.order.id)
        .one(&state.orm)
        .await?
        .expect("order exists");
    assert_eq!(paid.status, OrderStatus::Paid);
    assert_eq!(paid.payment_id.as_deref(), Some("pay_xyz"));
    assert_eq!(paid.total_amount, 300);

    let item = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(paid.id))
        .one(&state.orm)
        .await?
        .expect("item exists");
    assert_eq!(item.unit_price, 150);

    // Gateways retry callbacks; the second confirmation changes nothing.
    let again =
        order_service::verify_payment(&state, valid_verification(&checkout.gateway_order_id, "pay_xyz"))
            .await?;
    assert_eq!(again.data.expect("verify data").order_id, checkout.order.id);

    let still_paid = Orders::find_by_id(checkout.order.id)
        .one(&state.orm)
        .await?
        .expect("order exists");
    assert_eq!(still_paid.status, OrderStatus::Paid);
    assert_eq!(still_paid.payment_id.as_deref(), Some("pay_xyz"));

    Ok(())
}

#[tokio::test]
async fn tampered_signature_is_rejected() -> anyhow::Result<()> {
    let Some(state) = test_state(StubGateway::ok()).await? else {
        return Ok(());
    };

    let vendor_id = create_vendor(&state).await?;
    let product = create_product(&state, vendor_id, 100, 3).await?;

    let resp = order_service::create_order(&state, None, order_request(product.id, 1)).await?;
    let checkout = resp.data.expect("checkout data");

    let mut request = valid_verification(&checkout.gateway_order_id, "pay_tampered");
    let mut bytes = hex::decode(&request.razorpay_signature)?;
    bytes[0] ^= 0x01;
    request.razorpay_signature = hex::encode(bytes);

    let err = order_service::verify_payment(&state, request)
        .await
        .expect_err("tampered signature must fail");
    assert!(matches!(err, AppError::InvalidSignature));

    let order = Orders::find_by_id(checkout.order.id)
        .one(&state.orm)
        .await?
        .expect("order exists");
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_id, None);

    Ok(())
}

#[tokio::test]
async fn empty_cart_and_unknown_product_are_rejected() -> anyhow::Result<()> {
    let Some(state) = test_state(StubGateway::ok()).await? else {
        return Ok(());
    };

    let err = order_service::create_order(
        &state,
        None,
        CreateOrderRequest {
            customer: snapshot(),
            items: vec![],
        },
    )
    .await
    .expect_err("empty cart must fail");
    assert!(matches!(err, AppError::EmptyCart));

    let missing = Uuid::new_v4();
    let err = order_service::create_order(&state, None, order_request(missing, 1))
        .await
        .expect_err("unknown product must fail");
    assert!(matches!(err, AppError::ProductNotFound(id) if id == missing));

    Ok(())
}

#[tokio::test]
async fn insufficient_stock_leaves_no_trace() -> anyhow::Result<()> {
    let Some(state) = test_state(StubGateway::ok()).await? else {
        return Ok(());
    };

    let vendor_id = create_vendor(&state).await?;
    let product = create_product(&state, vendor_id, 200, 1).await?;

    let err = order_service::create_order(&state, None, order_request(product.id, 2))
        .await
        .expect_err("over-request must fail");
    assert!(matches!(err, AppError::InsufficientStock(id) if id == product.id));

    assert_eq!(fetch_stock(&state, product.id).await?, 1);

    let orphaned = OrderItems::find()
        .filter(OrderItemCol::ProductId.eq(product.id))
        .all(&state.orm)
        .await?;
    assert!(orphaned.is_empty(), "no order rows may be persisted");

    Ok(())
}

// Two buyers race for the last unit: exactly one wins.
#[tokio::test]
async fn concurrent_checkouts_cannot_oversell() -> anyhow::Result<()> {
    let Some(state) = test_state(StubGateway::ok()).await? else {
        return Ok(());
    };

    let vendor_id = create_vendor(&state).await?;
    let product = create_product(&state, vendor_id, 500, 1).await?;

    let (a, b) = tokio::join!(
        order_service::create_order(&state, None, order_request(product.id, 1)),
        order_service::create_order(&state, None, order_request(product.id, 1)),
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1, "exactly one checkout may win the last unit");

    let failure = if a.is_err() { a.err() } else { b.err() };
    assert!(matches!(
        failure.expect("one must fail"),
        AppError::InsufficientStock(_)
    ));

    assert_eq!(fetch_stock(&state, product.id).await?, 0);

    Ok(())
}

#[tokio::test]
async fn gateway_failure_rolls_back_reservation() -> anyhow::Result<()> {
    let Some(state) = test_state(StubGateway::failing()).await? else {
        return Ok(());
    };

    let vendor_id = create_vendor(&state).await?;
    let product = create_product(&state, vendor_id, 300, 4).await?;

    let err = order_service::create_order(&state, None, order_request(product.id, 2))
        .await
        .expect_err("gateway failure must fail the checkout");
    assert!(matches!(err, AppError::Gateway(_)));

    assert_eq!(fetch_stock(&state, product.id).await?, 4);

    let orphaned = OrderItems::find()
        .filter(OrderItemCol::ProductId.eq(product.id))
        .all(&state.orm)
        .await?;
    assert!(orphaned.is_empty(), "no order may be persisted");

    Ok(())
}

#[tokio::test]
async fn expired_reservation_is_released() -> anyhow::Result<()> {
    let Some(state) = test_state(StubGateway::ok()).await? else {
        return Ok(());
    };

    let vendor_id = create_vendor(&state).await?;
    let product = create_product(&state, vendor_id, 150, 5).await?;

    let resp = order_service::create_order(&state, None, order_request(product.id, 2)).await?;
    let checkout = resp.data.expect("checkout data");
    assert_eq!(fetch_stock(&state, product.id).await?, 3);

    // Backdate the order past the reservation TTL.
    Orders::update_many()
        .set(OrderActive {
            created_at: Set((Utc::now() - chrono::Duration::hours(1)).into()),
            ..Default::default()
        })
        .filter(OrderCol::Id.eq(checkout.order.id))
        .exec(&state.orm)
        .await?;

    let released =
        order_service::release_expired_orders(&state.orm, Duration::from_secs(15 * 60)).await?;
    assert!(released >= 1);

    let order = Orders::find_by_id(checkout.order.id)
        .one(&state.orm)
        .await?
        .expect("order exists");
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(fetch_stock(&state, product.id).await?, 5);

    // A late confirmation for the released order is a conflict.
    let err =
        order_service::verify_payment(&state, valid_verification(&checkout.gateway_order_id, "pay_late"))
            .await
            .expect_err("released order cannot be paid");
    assert!(matches!(err, AppError::OrderExpired));

    Ok(())
}

#[tokio::test]
async fn admin_transitions_follow_the_lifecycle() -> anyhow::Result<()> {
    let Some(state) = test_state(StubGateway::ok()).await? else {
        return Ok(());
    };

    let admin = AuthUser {
        user_id: Uuid::new_v4(),
        email: "admin@example.com".into(),
        role: UserRole::Admin,
    };

    let vendor_id = create_vendor(&state).await?;
    let product = create_product(&state, vendor_id, 100, 10).await?;

    // A PENDING order cannot jump to DELIVERED, and PAID is never set here.
    let resp = order_service::create_order(&state, None, order_request(product.id, 2)).await?;
    let pending = resp.data.expect("checkout data");
    for status in [OrderStatus::Delivered, OrderStatus::Paid, OrderStatus::Shipped] {
        let err = admin_service::update_order_status(
            &state,
            &admin,
            pending.order.id,
            UpdateOrderStatusRequest { status },
        )
        .await
        .expect_err("transition must be rejected");
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    // Cancelling the PENDING order returns its stock.
    assert_eq!(fetch_stock(&state, product.id).await?, 8);
    admin_service::update_order_status(
        &state,
        &admin,
        pending.order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Cancelled,
        },
    )
    .await?;
    assert_eq!(fetch_stock(&state, product.id).await?, 10);

    // A PAID order moves through SHIPPED to DELIVERED.
    let resp = order_service::create_order(&state, None, order_request(product.id, 1)).await?;
    let checkout = resp.data.expect("checkout data");
    order_service::verify_payment(&state, valid_verification(&checkout.gateway_order_id, "pay_adm"))
        .await?;

    for status in [OrderStatus::Shipped, OrderStatus::Delivered] {
        let updated = admin_service::update_order_status(
            &state,
            &admin,
            checkout.order.id,
            UpdateOrderStatusRequest { status },
        )
        .await?;
        assert_eq!(updated.data.expect("order data").status, status);
    }

    Ok(())
}
