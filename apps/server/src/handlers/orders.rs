//! # Order Handlers (staff only)
//!
//! ```text
//! POST /create_order {customer_id, items:[{product_id, quantity}]}
//!      │
//!      ▼
//! OrderRepository::create_order   (one SQLite transaction)
//!      │
//!      ├── Ok  ──► 200 {message, order_id, total, total_cents, loyalty_points}
//!      └── Err ──► 400 VALIDATION_ERROR | UNAVAILABLE, 404 NOT_FOUND
//!                  nothing persisted, stock untouched
//! ```

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tally_core::auth::STAFF;
use tally_core::{Order, OrderRequest, OrderStatus, OrderWithItems};
use tracing::info;

use super::{json_body, MessageResponse};
use crate::auth::MaybeSession;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderCreated {
    pub message: String,
    pub order_id: String,
    /// Display string, e.g. "7.50".
    pub total: String,
    pub total_cents: i64,
    pub loyalty_points: i64,
}

/// `POST /create_order`
pub async fn create_order(
    State(state): State<AppState>,
    session: MaybeSession,
    body: Result<Json<OrderRequest>, JsonRejection>,
) -> ApiResult<Json<OrderCreated>> {
    let user = session.require(STAFF)?;
    let request = json_body(body)?;

    let receipt = state.db.orders().create_order(request).await?;

    info!(
        order_id = %receipt.order_id,
        customer_id = %receipt.customer_id,
        total = %receipt.total,
        lines = receipt.items.len(),
        by = %user.user_id,
        "Order placed"
    );

    Ok(Json(OrderCreated {
        message: "Order created successfully".to_string(),
        order_id: receipt.order_id,
        total: receipt.total.to_string(),
        total_cents: receipt.total.cents(),
        loyalty_points: receipt.loyalty_points_awarded,
    }))
}

/// `GET /orders/{customer_id}`: the customer's orders with nested items.
pub async fn list_for_customer(
    State(state): State<AppState>,
    session: MaybeSession,
    Path(customer_id): Path<String>,
) -> ApiResult<Json<Vec<OrderWithItems>>> {
    session.require(STAFF)?;

    Ok(Json(state.db.orders().list_for_customer(&customer_id).await?))
}

/// `GET /order/{order_id}`
pub async fn get_order(
    State(state): State<AppState>,
    session: MaybeSession,
    Path(order_id): Path<String>,
) -> ApiResult<Json<OrderWithItems>> {
    session.require(STAFF)?;

    let order = state
        .db
        .orders()
        .get(&order_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", &order_id))?;

    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

/// `POST /orders/{order_id}/status`: pending → completed | canceled.
pub async fn update_status(
    State(state): State<AppState>,
    session: MaybeSession,
    Path(order_id): Path<String>,
    body: Result<Json<StatusRequest>, JsonRejection>,
) -> ApiResult<Json<Order>> {
    let user = session.require(STAFF)?;
    let next: OrderStatus = json_body(body)?.status.trim().parse()?;

    let order = state.db.orders().update_status(&order_id, next).await?;

    info!(order_id = %order_id, status = %order.status, by = %user.user_id, "Order status changed");
    Ok(Json(order))
}

/// `DELETE /orders/{order_id}`: removes the order and its items.
///
/// Stock and loyalty points are not given back.
pub async fn delete_order(
    State(state): State<AppState>,
    session: MaybeSession,
    Path(order_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let user = session.require(STAFF)?;

    state.db.orders().delete(&order_id).await?;

    info!(order_id = %order_id, by = %user.user_id, "Order deleted");
    Ok(MessageResponse::new("Order deleted"))
}
