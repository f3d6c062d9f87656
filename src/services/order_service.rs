use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{
        CheckoutResponse, CreateOrderRequest, OrderList, OrderWithItems, VerifyPaymentRequest,
        VerifyPaymentResponse,
    },
    entity::{
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
            OrderStatus,
        },
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{CustomerSnapshot, Order, OrderItem},
    payment::{generate_receipt, signature::verify_signature},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

const GATEWAY_CURRENCY: &str = "INR";

/// Create a PENDING order from the submitted item list.
///
/// Runs entirely inside one transaction: stock is reserved with conditional
/// decrements, the gateway order is created while the transaction is open,
/// and the order rows are inserted last. Any failure before commit rolls the
/// reservations back, so a rejected checkout leaves no trace.
pub async fn create_order(
    state: &AppState,
    user: Option<&AuthUser>,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    if payload.items.is_empty() {
        return Err(AppError::EmptyCart);
    }

    // Merge duplicate product lines so the conditional decrement sees the
    // combined quantity.
    let mut requested: BTreeMap<Uuid, i32> = BTreeMap::new();
    for item in &payload.items {
        if item.quantity < 1 {
            return Err(AppError::BadRequest(format!(
                "invalid quantity {} for product {}",
                item.quantity, item.product_id
            )));
        }
        *requested.entry(item.product_id).or_insert(0) += item.quantity;
    }

    let txn = state.orm.begin().await?;

    let mut total_amount: i64 = 0;
    let mut priced: Vec<(Uuid, i32, i64)> = Vec::with_capacity(requested.len());

    for (&product_id, &quantity) in &requested {
        // Atomic reservation: succeeds only if enough stock remains. Two
        // concurrent checkouts for the last unit cannot both pass.
        let result = Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(quantity))
            .filter(ProdCol::Id.eq(product_id))
            .filter(ProdCol::Stock.gte(quantity))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            return match Products::find_by_id(product_id).one(&txn).await? {
                None => Err(AppError::ProductNotFound(product_id)),
                Some(_) => Err(AppError::InsufficientStock(product_id)),
            };
        }

        let product = Products::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or(AppError::ProductNotFound(product_id))?;

        // The stored price is authoritative. Client-side prices are ignored.
        total_amount += product.price * quantity as i64;
        priced.push((product_id, quantity, product.price));
    }

    // Gateway amounts are in paise. A failure here aborts the transaction
    // and releases the reservations; the call is never retried because
    // gateway order creation is not idempotent.
    let receipt = generate_receipt();
    let gateway_order = state
        .gateway
        .create_order(total_amount * 100, GATEWAY_CURRENCY, &receipt)
        .await?;

    let order_id = Uuid::new_v4();
    let order = OrderActive {
        id: Set(order_id),
        user_id: Set(user.map(|u| u.user_id)),
        customer_name: Set(payload.customer.name.clone()),
        customer_email: Set(payload.customer.email.clone()),
        customer_mobile: Set(payload.customer.mobile.clone()),
        customer_address: Set(payload.customer.address.clone()),
        customer_city: Set(payload.customer.city.clone()),
        customer_state: Set(payload.customer.state.clone()),
        customer_pincode: Set(payload.customer.pincode.clone()),
        total_amount: Set(total_amount),
        status: Set(OrderStatus::Pending),
        gateway_order_id: Set(gateway_order.id.clone()),
        payment_id: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut items: Vec<OrderItem> = Vec::with_capacity(priced.len());
    for (product_id, quantity, unit_price) in priced {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(product_id),
            quantity: Set(quantity),
            unit_price: Set(unit_price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
        items.push(order_item_from_entity(item));
    }

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        gateway_order_id = %order.gateway_order_id,
        total_amount,
        "order created"
    );

    if let Err(err) = log_audit(
        &state.orm,
        user.map(|u| u.user_id),
        "order_created",
        Some("orders"),
        Some(serde_json::json!({
            "order_id": order.id,
            "gateway_order_id": order.gateway_order_id,
            "total_amount": total_amount,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let gateway_order_id = order.gateway_order_id.clone();
    Ok(ApiResponse::success(
        "Order created",
        CheckoutResponse {
            order: order_from_entity(order),
            items,
            gateway_order_id,
        },
        Some(Meta::empty()),
    ))
}

/// Confirm a payment callback and transition the matching order to PAID.
///
/// The PENDING -> PAID flip is a single conditional update, so duplicate or
/// concurrent callbacks cannot double-apply. A repeat callback for an
/// already-PAID order is a no-op success; a callback for an order whose
/// reservation already expired is a conflict.
pub async fn verify_payment(
    state: &AppState,
    payload: VerifyPaymentRequest,
) -> AppResult<ApiResponse<VerifyPaymentResponse>> {
    if !verify_signature(
        &payload.razorpay_order_id,
        &payload.razorpay_payment_id,
        &payload.razorpay_signature,
        &state.config.razorpay_key_secret,
    ) {
        tracing::warn!(
            gateway_order_id = %payload.razorpay_order_id,
            "payment signature mismatch"
        );
        return Err(AppError::InvalidSignature);
    }

    let result = Orders::update_many()
        .set(OrderActive {
            status: Set(OrderStatus::Paid),
            payment_id: Set(Some(payload.razorpay_payment_id.clone())),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        })
        .filter(OrderCol::GatewayOrderId.eq(payload.razorpay_order_id.as_str()))
        .filter(OrderCol::Status.eq(OrderStatus::Pending))
        .exec(&state.orm)
        .await?;

    let order = Orders::find()
        .filter(OrderCol::GatewayOrderId.eq(payload.razorpay_order_id.as_str()))
        .one(&state.orm)
        .await?
        .ok_or(AppError::OrderNotFound)?;

    if result.rows_affected == 0 {
        match order.status {
            // Gateways retry callbacks; confirming twice is harmless.
            OrderStatus::Paid | OrderStatus::Shipped | OrderStatus::Delivered => {}
            OrderStatus::Cancelled => return Err(AppError::OrderExpired),
            OrderStatus::Pending => {
                // Lost a race with a concurrent verification that has not
                // committed yet from our point of view; treat as paid.
            }
        }
    } else {
        tracing::info!(
            order_id = %order.id,
            payment_id = %payload.razorpay_payment_id,
            "order marked paid"
        );
        if let Err(err) = log_audit(
            &state.orm,
            order.user_id,
            "order_paid",
            Some("orders"),
            Some(serde_json::json!({
                "order_id": order.id,
                "payment_id": payload.razorpay_payment_id,
            })),
        )
        .await
        {
            tracing::warn!(error = %err, "audit log failed");
        }
    }

    Ok(ApiResponse::success(
        "Payment verified",
        VerifyPaymentResponse { order_id: order.id },
        Some(Meta::empty()),
    ))
}

/// Cancel PENDING orders older than `ttl` and return their reserved stock.
///
/// Each order is released in its own transaction, guarded by the same
/// conditional status update the verifier uses, so a payment confirmation
/// racing the sweep wins or loses cleanly but never both.
pub async fn release_expired_orders(conn: &DatabaseConnection, ttl: Duration) -> AppResult<u64> {
    let cutoff = Utc::now()
        - chrono::Duration::from_std(ttl)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;

    let stale = Orders::find()
        .filter(OrderCol::Status.eq(OrderStatus::Pending))
        .filter(OrderCol::CreatedAt.lt(cutoff))
        .all(conn)
        .await?;

    let mut released = 0u64;
    for order in stale {
        let txn = conn.begin().await?;

        let result = Orders::update_many()
            .set(OrderActive {
                status: Set(OrderStatus::Cancelled),
                updated_at: Set(Utc::now().into()),
                ..Default::default()
            })
            .filter(OrderCol::Id.eq(order.id))
            .filter(OrderCol::Status.eq(OrderStatus::Pending))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            // A verification slipped in; leave the order alone.
            continue;
        }

        let items = OrderItems::find()
            .filter(OrderItemCol::OrderId.eq(order.id))
            .all(&txn)
            .await?;
        for item in items {
            Products::update_many()
                .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(item.quantity))
                .filter(ProdCol::Id.eq(item.product_id))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        released += 1;
        tracing::info!(order_id = %order.id, "expired order reservation released");
    }

    Ok(released)
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::OrderNotFound)?;

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Ok",
        OrderWithItems {
            order: order_from_entity(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        customer: CustomerSnapshot {
            name: model.customer_name,
            email: model.customer_email,
            mobile: model.customer_mobile,
            address: model.customer_address,
            city: model.customer_city,
            state: model.customer_state,
            pincode: model.customer_pincode,
        },
        total_amount: model.total_amount,
        status: model.status,
        gateway_order_id: model.gateway_order_id,
        payment_id: model.payment_id,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        quantity: model.quantity,
        unit_price: model.unit_price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
