//! # Domain Types
//!
//! Core domain types used throughout Tally POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      User       │   │    Product      │   │    Customer     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  email (unique) │   │  sku (business) │   │  phone (unique) │       │
//! │  │  role           │   │  price_cents    │   │  loyalty_points │       │
//! │  └─────────────────┘   └─────────────────┘   └────────┬────────┘       │
//! │                                                       │ owns            │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌────────▼────────┐       │
//! │  │      Role       │   │   OrderStatus   │   │      Order      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Customer       │   │  Pending        │   │  total_cents    │       │
//! │  │  Employee       │   │  Completed      │   │  status         │       │
//! │  │  Admin          │   │  Canceled       │   └────────┬────────┘       │
//! │  └─────────────────┘   └─────────────────┘            │ owns            │
//! │                                              ┌────────▼────────┐       │
//! │                                              │    OrderItem    │       │
//! │                                              │  price snapshot │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business key: (email, sku, phone) - human-readable, used for lookups

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Role
// =============================================================================

/// What a user is allowed to do.
///
/// ```text
/// Customer ── can browse products, nothing else
/// Employee ── staff: inventory, customers, orders
/// Admin    ── staff + user management + privileged signup
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Employee,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Customer, Role::Employee, Role::Admin];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Employee => "employee",
            Role::Admin => "admin",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Customer
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == wanted)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: Role::ALL.iter().map(|r| r.to_string()).collect(),
            })
    }
}

// =============================================================================
// User
// =============================================================================

/// A person who can sign in (or a record created by an admin).
///
/// Credentials never leave the server: `password_hash` and `pin` are
/// skipped during serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: Option<String>,

    /// Argon2id PHC string. `None` for users created without a password,
    /// who therefore cannot log in.
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,

    /// Four-digit PIN.
    #[serde(skip_serializing, default)]
    pub pin: Option<String>,

    pub role: Role,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name, unique among active products.
    pub name: String,

    pub category: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Units on hand. Never negative.
    pub stock: i64,

    /// Price in cents (smallest currency unit).
    pub price_cents: i64,

    pub image_url: String,

    pub last_restocked: DateTime<Utc>,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// Fields for a product that does not exist yet.
///
/// Built by the HTTP layer after validation; `sku` is already defaulted.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub sku: String,
    pub stock: i64,
    pub price: Money,
    pub image_url: String,
    pub last_restocked: DateTime<Utc>,
}

/// Partial product update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub sku: Option<String>,
    pub stock: Option<i64>,
    pub price: Option<Money>,
    pub image_url: Option<String>,
    pub last_restocked: Option<DateTime<Utc>>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.sku.is_none()
            && self.stock.is_none()
            && self.price.is_none()
            && self.image_url.is_none()
            && self.last_restocked.is_none()
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A shopper known by phone number, accruing loyalty points.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    /// Loyalty lookup key.
    pub phone: String,
    pub address: Option<String>,
    pub loyalty_points: i64,
    pub created_at: DateTime<Utc>,
}

/// Fields for registering a customer.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
}

// =============================================================================
// Order Status
// =============================================================================

/// The status of an order.
///
/// ```text
///            ┌──────────► Completed
///  Pending ──┤
///            └──────────► Canceled
/// ```
/// Completed and Canceled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Completed,
    Canceled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 3] = [
        OrderStatus::Pending,
        OrderStatus::Completed,
        OrderStatus::Canceled,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Canceled => "canceled",
        }
    }

    pub const fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Completed)
                | (OrderStatus::Pending, OrderStatus::Canceled)
        )
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: OrderStatus::ALL.iter().map(|s| s.to_string()).collect(),
            })
    }
}

// =============================================================================
// Order
// =============================================================================

/// An order placed for a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    /// Σ(snapshot price × quantity), fixed at creation.
    pub total_cents: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Order Item
// =============================================================================

/// A line item in an order.
/// Uses snapshot pattern to freeze the unit price at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub price_cents: i64,
}

impl OrderItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// An order together with its line items, as listed per customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_product() -> Product {
        let now = Utc::now();
        Product {
            id: "p-1".to_string(),
            name: "Espresso Beans".to_string(),
            category: "Coffee".to_string(),
            sku: "ESP001".to_string(),
            stock: 10,
            price_cents: 250,
            image_url: "beans.png".to_string(),
            last_restocked: now,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_role_default_and_parse() {
        assert_eq!(Role::default(), Role::Customer);
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" employee ".parse::<Role>().unwrap(), Role::Employee);
        assert!("manager".parse::<Role>().is_err());
    }

    #[test]
    fn test_order_status_transitions() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Completed));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Canceled));
        assert!(!OrderStatus::Completed.can_transition_to(OrderStatus::Canceled));
        assert!(!OrderStatus::Canceled.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_product_price_is_money() {
        let product = sample_product();
        assert_eq!(product.price(), Money::from_cents(250));
        assert_eq!(product.price().to_string(), "2.50");
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(ProductPatch::default().is_empty());
        let patch = ProductPatch {
            price: Some(Money::from_cents(300)),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_user_serialization_hides_credentials() {
        let user = User {
            id: "u-1".to_string(),
            name: "Ana".to_string(),
            email: Some("ana@example.com".to_string()),
            password_hash: Some("$argon2id$secret".to_string()),
            pin: Some("1234".to_string()),
            role: Role::Employee,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("pin").is_none());
        assert_eq!(json["role"], "employee");
    }
}
