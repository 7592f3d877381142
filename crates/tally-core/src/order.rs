//! # Order Arithmetic
//!
//! The pure half of order creation: request validation, line totals and
//! loyalty accrual. The storage half (stock decrement, persistence, rollback)
//! lives in `tally-db`.
//!
//! ## Order Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  OrderRequest { customer_id, lines }                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate_order_request()      ← THIS MODULE                           │
//! │       │  customer id present, ≥1 line, each qty in 1..=999             │
//! │       ▼                                                                 │
//! │  per line: price snapshot × qty ──► OrderTotals::add_line()            │
//! │       │  checked: an overflowing line or sum is a validation error     │
//! │       ▼                                                                 │
//! │  total ──► loyalty_points_for(total) = whole currency units            │
//! │            12.70 → 12 points, 0.99 → 0 points                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::{require, validate_quantity, ValidationResult};
use crate::MAX_ORDER_LINES;

/// One requested line: a product and how many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: String,
    pub quantity: i64,
}

/// An order as submitted by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    #[serde(default)]
    pub customer_id: String,
    #[serde(default, alias = "items")]
    pub lines: Vec<OrderLine>,
}

/// Checks an order request before any storage is touched.
///
/// Returns the request with ids trimmed. Lines keep their input order;
/// that order decides which product is reported when several are short.
pub fn validate_order_request(request: OrderRequest) -> ValidationResult<OrderRequest> {
    let customer_id = require("customer_id", Some(&request.customer_id))?;

    if request.lines.is_empty() {
        return Err(ValidationError::required("items"));
    }
    if request.lines.len() > MAX_ORDER_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_ORDER_LINES as i64,
        });
    }

    let lines = request
        .lines
        .into_iter()
        .map(|line| {
            let product_id = require("product_id", Some(&line.product_id))?;
            validate_quantity(line.quantity)?;
            Ok(OrderLine {
                product_id,
                quantity: line.quantity,
            })
        })
        .collect::<ValidationResult<Vec<_>>>()?;

    Ok(OrderRequest { customer_id, lines })
}

/// Loyalty points earned for an order total: one per whole currency unit.
#[inline]
pub fn loyalty_points_for(total: Money) -> i64 {
    total.whole_units().max(0)
}

/// Running total while lines are priced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderTotals {
    pub total: Money,
    pub units: i64,
}

impl OrderTotals {
    /// Adds `quantity` units at `unit_price` and returns the line total.
    ///
    /// Fails without touching the running total when the line or the new
    /// total does not fit in `i64` cents.
    pub fn add_line(&mut self, unit_price: Money, quantity: i64) -> ValidationResult<Money> {
        let line_total = unit_price
            .checked_multiply(quantity)
            .ok_or_else(total_too_large)?;
        let total = self
            .total
            .checked_add(line_total)
            .ok_or_else(total_too_large)?;

        self.total = total;
        self.units += quantity;
        Ok(line_total)
    }

    pub fn loyalty_points(&self) -> i64 {
        loyalty_points_for(self.total)
    }
}

fn total_too_large() -> ValidationError {
    ValidationError::OutOfRange {
        field: "total".to_string(),
        min: 0,
        max: i64::MAX,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: &str, quantity: i64) -> OrderLine {
        OrderLine {
            product_id: product_id.to_string(),
            quantity,
        }
    }

    #[test]
    fn test_validate_rejects_missing_customer() {
        let req = OrderRequest {
            customer_id: "  ".to_string(),
            lines: vec![line("p-1", 1)],
        };
        assert!(matches!(
            validate_order_request(req),
            Err(ValidationError::Required { field }) if field == "customer_id"
        ));
    }

    #[test]
    fn test_validate_rejects_empty_lines() {
        let req = OrderRequest {
            customer_id: "c-1".to_string(),
            lines: vec![],
        };
        assert!(matches!(
            validate_order_request(req),
            Err(ValidationError::Required { field }) if field == "items"
        ));
    }

    #[test]
    fn test_validate_rejects_bad_quantity() {
        let req = OrderRequest {
            customer_id: "c-1".to_string(),
            lines: vec![line("p-1", 2), line("p-2", 0)],
        };
        assert!(validate_order_request(req).is_err());
    }

    #[test]
    fn test_validate_keeps_line_order() {
        let req = OrderRequest {
            customer_id: " c-1 ".to_string(),
            lines: vec![line("p-2", 1), line(" p-1 ", 3)],
        };
        let req = validate_order_request(req).unwrap();
        assert_eq!(req.customer_id, "c-1");
        assert_eq!(req.lines, vec![line("p-2", 1), line("p-1", 3)]);
    }

    #[test]
    fn test_items_alias_deserializes() {
        let req: OrderRequest = serde_json::from_str(
            r#"{"customer_id":"c-1","items":[{"product_id":"p-1","quantity":3}]}"#,
        )
        .unwrap();
        assert_eq!(req.lines.len(), 1);
    }

    #[test]
    fn test_totals_and_points() {
        let mut totals = OrderTotals::default();
        let first = totals.add_line(Money::from_cents(250), 3).unwrap();
        assert_eq!(first.cents(), 750);
        assert_eq!(totals.loyalty_points(), 7);

        totals.add_line(Money::from_cents(520), 1).unwrap();
        assert_eq!(totals.total.cents(), 1270);
        assert_eq!(totals.units, 4);
        assert_eq!(totals.loyalty_points(), 12);
    }

    #[test]
    fn test_oversized_line_is_rejected() {
        let mut totals = OrderTotals::default();
        let price: Money = "90000000000000000.00".parse().unwrap();

        let err = totals.add_line(price, 2).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { ref field, .. } if field == "total"));
        assert_eq!(totals, OrderTotals::default());
    }

    #[test]
    fn test_overflowing_sum_is_rejected() {
        let mut totals = OrderTotals::default();
        let price: Money = "50000000000000000.00".parse().unwrap();

        totals.add_line(price, 1).unwrap();
        assert!(totals.add_line(price, 1).is_err());
        assert_eq!(totals.total, price);
        assert_eq!(totals.units, 1);
    }

    #[test]
    fn test_points_truncate() {
        assert_eq!(loyalty_points_for(Money::from_cents(99)), 0);
        assert_eq!(loyalty_points_for(Money::from_cents(100)), 1);
        assert_eq!(loyalty_points_for(Money::from_cents(1270)), 12);
    }
}
