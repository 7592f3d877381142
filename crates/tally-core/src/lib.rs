//! # tally-core: Pure Business Logic for Tally POS
//!
//! This crate holds the business rules of Tally POS as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 tally-server (axum HTTP API)                    │   │
//! │  │   /signup /login  /products /inventory  /customers  /orders     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   order   │  │   auth    │  │   │
//! │  │   │  Product  │  │   Money   │  │  totals   │  │ authorize │  │   │
//! │  │   │  Customer │  │  parsing  │  │  loyalty  │  │   roles   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │        SQLite queries, migrations, the order transaction        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (User, Product, Customer, Order, OrderItem)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`order`] - Order request validation, totals, loyalty points
//! - [`auth`] - Session identity and the authorization policy
//! - [`error`] - Domain error types
//! - [`validation`] - Field validation and form parsing
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::order::OrderTotals;
//! use tally_core::validation::parse_price;
//!
//! let price = parse_price("2.50").unwrap();
//! let mut totals = OrderTotals::default();
//! totals.add_line(price, 3);
//!
//! assert_eq!(totals.total.to_string(), "7.50");
//! assert_eq!(totals.loyalty_points(), 7);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod auth;
pub mod error;
pub mod money;
pub mod order;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use auth::{authorize, Access, SessionUser};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use order::{OrderLine, OrderRequest};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity on a single order line.
///
/// ## Business Reason
/// Catches fat-finger input (typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum number of lines in one order.
pub const MAX_ORDER_LINES: usize = 100;

/// Length of generated SKUs.
pub const SKU_LENGTH: usize = 6;

/// Length of a user PIN.
pub const PIN_LENGTH: usize = 4;

/// Category given to products added without one.
pub const DEFAULT_CATEGORY: &str = "General";
