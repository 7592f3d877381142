//! # Customer Handlers (staff only)
//!
//! Customers are keyed by phone for loyalty lookups at the counter.

use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::extract::{Path, State};
use axum::response::Redirect;
use axum::{Form, Json};
use serde::Deserialize;
use tally_core::auth::STAFF;
use tally_core::validation::{
    optional, require, validate_email, validate_name, validate_phone, validate_points,
};
use tally_core::{Customer, NewCustomer};
use tracing::info;

use super::{form_body, json_body, MessageResponse};
use crate::auth::MaybeSession;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CustomerForm {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// `POST /customers`: registers a customer and redirects to `/customersPage`.
///
/// ## Errors
/// * 400 `VALIDATION_ERROR` - name or phone missing, malformed email
/// * 409 `CONFLICT` - phone (or email) already on file
pub async fn create_customer(
    State(state): State<AppState>,
    session: MaybeSession,
    form: Result<Form<CustomerForm>, FormRejection>,
) -> ApiResult<Redirect> {
    let user = session.require(STAFF)?;
    let form = form_body(form)?;

    let new = NewCustomer {
        name: validate_name("name", &require("name", form.name.as_deref())?)?,
        phone: validate_phone(&require("phone", form.phone.as_deref())?)?,
        email: optional(form.email.as_deref())
            .map(|e| validate_email(&e))
            .transpose()?,
        address: optional(form.address.as_deref()),
    };

    let customer = state.db.customers().create(new).await?;

    info!(customer_id = %customer.id, by = %user.user_id, "Customer registered");
    Ok(Redirect::to("/customersPage"))
}

/// `GET /customersPage`: every customer with their loyalty balance.
pub async fn customers_page(
    State(state): State<AppState>,
    session: MaybeSession,
) -> ApiResult<Json<Vec<Customer>>> {
    session.require(STAFF)?;

    Ok(Json(state.db.customers().list().await?))
}

/// `GET /customers/by-phone/{phone}`
pub async fn get_by_phone(
    State(state): State<AppState>,
    session: MaybeSession,
    Path(phone): Path<String>,
) -> ApiResult<Json<Customer>> {
    session.require(STAFF)?;

    let phone = validate_phone(&phone)?;
    let customer = state
        .db
        .customers()
        .get_by_phone(&phone)
        .await?
        .ok_or_else(|| ApiError::not_found("Customer", &phone))?;

    Ok(Json(customer))
}

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub points: i64,
}

/// `POST /customers/{id}/redeem`: spends loyalty points.
///
/// ## Errors
/// * 400 `UNAVAILABLE` - balance lower than requested, nothing deducted
/// * 404 `NOT_FOUND` - no such customer
pub async fn redeem_points(
    State(state): State<AppState>,
    session: MaybeSession,
    Path(id): Path<String>,
    body: Result<Json<RedeemRequest>, JsonRejection>,
) -> ApiResult<Json<Customer>> {
    let user = session.require(STAFF)?;
    let points = validate_points(json_body(body)?.points)?;

    let customer = state.db.customers().redeem_points(&id, points).await?;

    info!(customer_id = %id, points, by = %user.user_id, "Loyalty points redeemed");
    Ok(Json(customer))
}

/// `DELETE /customers/{id}`: removes the customer with their orders.
pub async fn delete_customer(
    State(state): State<AppState>,
    session: MaybeSession,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let user = session.require(STAFF)?;

    state.db.customers().delete(&id).await?;

    info!(customer_id = %id, by = %user.user_id, "Customer deleted");
    Ok(MessageResponse::new("Customer deleted"))
}
