//! # Product Handlers
//!
//! ## Access
//! ```text
//! GET  /products                 public         full active catalog
//! GET  /inventory?category&search  any session  filtered catalog
//! POST /add_product              staff          form
//! POST /product/{id}/edit        staff          form, partial
//! POST /delete_product/{id}      staff          soft delete
//! ```
//!
//! Form fields arrive as text; numbers and dates are parsed here so a bad
//! value is a `VALIDATION_ERROR`, never a silent zero.

use axum::extract::rejection::FormRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Form, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tally_core::auth::STAFF;
use tally_core::validation::{
    generate_sku, optional, parse_date, parse_price, parse_stock, require, validate_name,
    validate_search_query, validate_sku,
};
use tally_core::{Access, NewProduct, Product, ProductPatch, DEFAULT_CATEGORY};
use tally_db::ProductFilter;
use tracing::{debug, info};

use super::{form_body, MessageResponse};
use crate::auth::MaybeSession;
use crate::error::ApiResult;
use crate::state::AppState;

/// Product as clients see it.
///
/// `price` is the display string ("2.50"); `price_cents` is exact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDto {
    pub id: String,
    pub name: String,
    pub price: String,
    pub price_cents: i64,
    pub stock: i64,
    pub category: String,
    pub sku: String,
    pub image: String,
}

impl From<Product> for ProductDto {
    fn from(p: Product) -> Self {
        ProductDto {
            price: p.price().to_string(),
            id: p.id,
            name: p.name,
            price_cents: p.price_cents,
            stock: p.stock,
            category: p.category,
            sku: p.sku,
            image: p.image_url,
        }
    }
}

fn to_dtos(products: Vec<Product>) -> Json<Vec<ProductDto>> {
    Json(products.into_iter().map(ProductDto::from).collect())
}

/// `GET /products`
pub async fn list_products(
    State(state): State<AppState>,
    session: MaybeSession,
) -> ApiResult<Json<Vec<ProductDto>>> {
    session.allow(Access::Public)?;

    let products = state.db.products().list(&ProductFilter::default()).await?;
    Ok(to_dtos(products))
}

#[derive(Debug, Default, Deserialize)]
pub struct InventoryQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}

/// `GET /inventory?category=&search=`
///
/// Search is a case-insensitive substring match on name, SKU, or category.
/// No parameters returns everything.
pub async fn inventory(
    State(state): State<AppState>,
    session: MaybeSession,
    Query(query): Query<InventoryQuery>,
) -> ApiResult<Json<Vec<ProductDto>>> {
    session.require(Access::Authenticated)?;

    let filter = ProductFilter {
        category: optional(query.category.as_deref()),
        search: validate_search_query(query.search.as_deref())?,
    };
    debug!(?filter, "Inventory listing");

    let products = state.db.products().list(&filter).await?;
    Ok(to_dtos(products))
}

/// Fields of the add and edit product forms.
#[derive(Debug, Default, Deserialize)]
pub struct ProductForm {
    pub name: Option<String>,
    pub category: Option<String>,
    pub sku: Option<String>,
    pub stock: Option<String>,
    pub price: Option<String>,
    pub last_restocked: Option<String>,
    pub image: Option<String>,
}

/// `POST /add_product`: 201 with the stored product.
///
/// Missing SKU gets a random 6-character code; missing category, stock
/// and restock date fall back to "General", 0 and now.
pub async fn add_product(
    State(state): State<AppState>,
    session: MaybeSession,
    form: Result<Form<ProductForm>, FormRejection>,
) -> ApiResult<(StatusCode, Json<ProductDto>)> {
    let user = session.require(STAFF)?;
    let form = form_body(form)?;

    let name = validate_name("name", &require("name", form.name.as_deref())?)?;
    let price = parse_price(&require("price", form.price.as_deref())?)?;
    let category = optional(form.category.as_deref())
        .map(|c| validate_name("category", &c))
        .transpose()?
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
    let sku = match optional(form.sku.as_deref()) {
        Some(sku) => validate_sku(&sku)?,
        None => generate_sku(),
    };
    let stock = optional(form.stock.as_deref())
        .map(|s| parse_stock(&s))
        .transpose()?
        .unwrap_or(0);
    let last_restocked = optional(form.last_restocked.as_deref())
        .map(|d| parse_date("last_restocked", &d))
        .transpose()?
        .unwrap_or_else(Utc::now);
    let image_url = optional(form.image.as_deref()).unwrap_or_default();

    let product = state
        .db
        .products()
        .insert(NewProduct {
            name,
            category,
            sku,
            stock,
            price,
            image_url,
            last_restocked,
        })
        .await?;

    info!(product_id = %product.id, sku = %product.sku, by = %user.user_id, "Product added");
    Ok((StatusCode::CREATED, Json(product.into())))
}

/// `POST /product/{id}/edit`: blank or absent fields are left unchanged.
pub async fn edit_product(
    State(state): State<AppState>,
    session: MaybeSession,
    Path(id): Path<String>,
    form: Result<Form<ProductForm>, FormRejection>,
) -> ApiResult<Json<ProductDto>> {
    let user = session.require(STAFF)?;
    let form = form_body(form)?;

    let patch = ProductPatch {
        name: optional(form.name.as_deref())
            .map(|n| validate_name("name", &n))
            .transpose()?,
        category: optional(form.category.as_deref())
            .map(|c| validate_name("category", &c))
            .transpose()?,
        sku: optional(form.sku.as_deref())
            .map(|s| validate_sku(&s))
            .transpose()?,
        stock: optional(form.stock.as_deref())
            .map(|s| parse_stock(&s))
            .transpose()?,
        price: optional(form.price.as_deref())
            .map(|p| parse_price(&p))
            .transpose()?,
        image_url: optional(form.image.as_deref()),
        last_restocked: optional(form.last_restocked.as_deref())
            .map(|d| parse_date("last_restocked", &d))
            .transpose()?,
    };

    let product = state.db.products().update(&id, patch).await?;

    info!(product_id = %id, by = %user.user_id, "Product updated");
    Ok(Json(product.into()))
}

/// `POST /delete_product/{id}`
pub async fn delete_product(
    State(state): State<AppState>,
    session: MaybeSession,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let user = session.require(STAFF)?;

    state.db.products().soft_delete(&id).await?;

    info!(product_id = %id, by = %user.user_id, "Product deleted");
    Ok(MessageResponse::new("Product deleted"))
}
