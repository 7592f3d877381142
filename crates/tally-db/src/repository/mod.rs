//! # Repository Module
//!
//! Database repository implementations for Tally POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  state.db.orders().create_order(request)                       │
//! │       ▼                                                                 │
//! │  OrderRepository                                                       │
//! │  ├── create_order(&self, request)   ← one transaction                  │
//! │  ├── list_for_customer(&self, id)                                      │
//! │  ├── update_status(&self, id, status)                                  │
//! │  └── delete(&self, id)                                                 │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`user::UserRepository`] - Accounts and credentials
//! - [`product::ProductRepository`] - Catalog CRUD and search
//! - [`customer::CustomerRepository`] - Customers and loyalty points
//! - [`order::OrderRepository`] - Order transaction and history

use uuid::Uuid;

pub mod customer;
pub mod order;
pub mod product;
pub mod user;

/// Generates a new entity ID (UUID v4).
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
