//! # Order Repository
//!
//! Order creation is the one multi-step write in Tally POS. Everything it
//! touches (the order row, every line item, every stock decrement, the
//! loyalty award) commits together or not at all.
//!
//! ## The Order Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   │                                                                     │
//! │   ├─ INSERT orders (status pending, total 0)                           │
//! │   │     first statement is a write: the write lock is taken here, so   │
//! │   │     concurrent orders queue on busy_timeout instead of failing     │
//! │   │     later on a stale snapshot. Missing customer → FK → NotFound    │
//! │   │                                                                     │
//! │   ├─ for each line, in input order:                                    │
//! │   │     UPDATE products SET stock = stock - q                          │
//! │   │      WHERE id = ? AND is_active = 1 AND stock >= q                 │
//! │   │      RETURNING price_cents, name                                   │
//! │   │        │                                                            │
//! │   │        ├─ row  → INSERT order_items (price snapshot)               │
//! │   │        └─ none → ProductUnavailable | InsufficientStock ──► ROLLBACK│
//! │   │     running total overflows i64 cents → Validation ──► ROLLBACK   │
//! │   │                                                                     │
//! │   ├─ UPDATE orders SET total_cents = Σ price × q                       │
//! │   ├─ UPDATE customers SET loyalty_points += ⌊total⌋                    │
//! │   │                                                                     │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any `?` before COMMIT drops the transaction, and sqlx rolls it back on
//! drop: stock decrements and the order row disappear together.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use tally_core::order::{validate_order_request, OrderTotals};
use tally_core::{
    CoreError, Money, Order, OrderItem, OrderLine, OrderRequest, OrderStatus, OrderWithItems,
};

const ORDER_COLUMNS: &str = "id, customer_id, total_cents, status, created_at";
const ITEM_COLUMNS: &str = "id, order_id, product_id, quantity, price_cents";

/// What a successful `create_order` reports back.
#[derive(Debug, Clone)]
pub struct OrderReceipt {
    pub order_id: String,
    pub customer_id: String,
    pub total: Money,
    pub loyalty_points_awarded: i64,
    pub items: Vec<OrderItem>,
}

/// Repository for orders and their line items.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Places an order: validates, decrements stock, snapshots prices,
    /// awards loyalty points, all in one transaction.
    ///
    /// ## Returns
    /// * `Ok(OrderReceipt)` - Committed order id and total
    /// * `Err(DbError::Core(Validation))` - Empty customer id, no lines, or a
    ///   total too large to represent
    /// * `Err(DbError::NotFound)` - Customer doesn't exist
    /// * `Err(DbError::Core(ProductUnavailable))` - Unknown or deleted product
    /// * `Err(DbError::Core(InsufficientStock))` - First line that can't be served
    pub async fn create_order(&self, request: OrderRequest) -> DbResult<OrderReceipt> {
        let request = validate_order_request(request)?;

        debug!(
            customer_id = %request.customer_id,
            lines = request.lines.len(),
            "Creating order"
        );

        let mut tx = self.pool.begin().await?;

        let order_id = generate_id();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, total_cents, status, created_at)
            VALUES (?1, ?2, 0, ?3, ?4)
            "#,
        )
        .bind(&order_id)
        .bind(&request.customer_id)
        .bind(OrderStatus::Pending)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::ForeignKeyViolation { .. } => {
                DbError::not_found("Customer", &request.customer_id)
            }
            other => other,
        })?;

        let mut totals = OrderTotals::default();
        let mut items = Vec::with_capacity(request.lines.len());

        for line in &request.lines {
            let taken: Option<(i64, String)> = sqlx::query_as(
                r#"
                UPDATE products
                SET stock = stock - ?2, updated_at = ?3
                WHERE id = ?1 AND is_active = 1 AND stock >= ?2
                RETURNING price_cents, name
                "#,
            )
            .bind(&line.product_id)
            .bind(line.quantity)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?;

            let Some((price_cents, name)) = taken else {
                let err = explain_shortfall(&mut *tx, line).await;
                warn!(
                    order_id = %order_id,
                    product_id = %line.product_id,
                    error = %err,
                    "Order line rejected, rolling back"
                );
                return Err(err);
            };

            let unit_price = Money::from_cents(price_cents);
            if let Err(e) = totals.add_line(unit_price, line.quantity) {
                warn!(
                    order_id = %order_id,
                    product_id = %line.product_id,
                    error = %e,
                    "Order total out of range, rolling back"
                );
                return Err(e.into());
            }

            let item = OrderItem {
                id: generate_id(),
                order_id: order_id.clone(),
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                price_cents,
            };

            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, quantity, price_cents)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&item.id)
            .bind(&item.order_id)
            .bind(&item.product_id)
            .bind(item.quantity)
            .bind(item.price_cents)
            .execute(&mut *tx)
            .await?;

            debug!(product = %name, quantity = line.quantity, unit_price = %unit_price, "Line reserved");
            items.push(item);
        }

        sqlx::query("UPDATE orders SET total_cents = ?2 WHERE id = ?1")
            .bind(&order_id)
            .bind(totals.total.cents())
            .execute(&mut *tx)
            .await?;

        let points = totals.loyalty_points();
        let awarded = sqlx::query(
            "UPDATE customers SET loyalty_points = loyalty_points + ?2 WHERE id = ?1",
        )
        .bind(&request.customer_id)
        .bind(points)
        .execute(&mut *tx)
        .await?;

        if awarded.rows_affected() == 0 {
            // unreachable while the orders FK holds
            debug!(customer_id = %request.customer_id, "No customer row to award points to");
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            order_id = %order_id,
            customer_id = %request.customer_id,
            total = %totals.total,
            points,
            "Order placed"
        );

        Ok(OrderReceipt {
            order_id,
            customer_id: request.customer_id,
            total: totals.total,
            loyalty_points_awarded: points,
            items,
        })
    }

    /// Gets one order with its items.
    pub async fn get(&self, order_id: &str) -> DbResult<Option<OrderWithItems>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(order) = order else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 ORDER BY rowid"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(OrderWithItems { order, items }))
    }

    /// Lists a customer's orders (oldest first), each with its items.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - No such customer
    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<OrderWithItems>> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM customers WHERE id = ?1")
            .bind(customer_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(DbError::not_found("Customer", customer_id));
        }

        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = ?1 ORDER BY created_at, rowid"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, OrderItem>(&format!(
            r#"
            SELECT {ITEM_COLUMNS} FROM order_items
            WHERE order_id IN (SELECT id FROM orders WHERE customer_id = ?1)
            ORDER BY rowid
            "#
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<String, Vec<OrderItem>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id.clone()).or_default().push(item);
        }

        let orders: Vec<OrderWithItems> = orders
            .into_iter()
            .map(|order| {
                let items = by_order.remove(&order.id).unwrap_or_default();
                OrderWithItems { order, items }
            })
            .collect();

        debug!(customer_id = %customer_id, count = orders.len(), "Listed orders");
        Ok(orders)
    }

    /// Moves an order to `next` if the transition is allowed.
    ///
    /// The UPDATE is conditional on the status we checked, so a concurrent
    /// change is reported instead of overwritten.
    pub async fn update_status(&self, order_id: &str, next: OrderStatus) -> DbResult<Order> {
        let current = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Order", order_id))?;

        let rejected = |from: OrderStatus| -> DbError {
            CoreError::InvalidStatusTransition {
                order_id: order_id.to_string(),
                from: from.to_string(),
                to: next.to_string(),
            }
            .into()
        };

        if !current.status.can_transition_to(next) {
            return Err(rejected(current.status));
        }

        let updated = sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET status = ?3 WHERE id = ?1 AND status = ?2 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order_id)
        .bind(current.status)
        .bind(next)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(order) => {
                info!(order_id = %order_id, from = %current.status, to = %next, "Order status changed");
                Ok(order)
            }
            None => {
                let now = self.get(order_id).await?.map(|o| o.order.status);
                match now {
                    Some(status) => Err(rejected(status)),
                    None => Err(DbError::not_found("Order", order_id)),
                }
            }
        }
    }

    /// Deletes an order and its items in one transaction.
    ///
    /// Stock and loyalty points are not reverted; the order history simply
    /// loses the record.
    pub async fn delete(&self, order_id: &str) -> DbResult<()> {
        debug!(order_id = %order_id, "Deleting order");

        let mut tx = self.pool.begin().await?;

        let items = sqlx::query("DELETE FROM order_items WHERE order_id = ?1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        let order = sqlx::query("DELETE FROM orders WHERE id = ?1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        if order.rows_affected() == 0 {
            return Err(DbError::not_found("Order", order_id));
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(order_id = %order_id, items = items.rows_affected(), "Order deleted");
        Ok(())
    }
}

/// Works out why a conditional stock decrement matched no row.
///
/// Runs inside the order transaction so it sees the same data the UPDATE
/// just did.
async fn explain_shortfall(conn: &mut SqliteConnection, line: &OrderLine) -> DbError {
    let row: Result<Option<(String, i64, bool)>, sqlx::Error> =
        sqlx::query_as("SELECT name, stock, is_active FROM products WHERE id = ?1")
            .bind(&line.product_id)
            .fetch_optional(conn)
            .await;

    match row {
        Ok(Some((name, stock, true))) => CoreError::InsufficientStock {
            product: name,
            available: stock,
            requested: line.quantity,
        }
        .into(),
        Ok(Some((name, _, false))) => CoreError::ProductUnavailable { product: name }.into(),
        Ok(None) => CoreError::ProductUnavailable {
            product: line.product_id.clone(),
        }
        .into(),
        Err(e) => e.into(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use tally_core::{Customer, NewCustomer, NewProduct, Product, ProductPatch, ValidationError};

    async fn product(db: &Database, name: &str, stock: i64, price: &str) -> Product {
        db.products()
            .insert(NewProduct {
                name: name.to_string(),
                category: "General".to_string(),
                sku: name.chars().take(3).collect::<String>().to_uppercase(),
                stock,
                price: price.parse().unwrap(),
                image_url: String::new(),
                last_restocked: Utc::now(),
            })
            .await
            .unwrap()
    }

    async fn customer(db: &Database, phone: &str) -> Customer {
        db.customers()
            .create(NewCustomer {
                name: "Ana".to_string(),
                phone: phone.to_string(),
                email: None,
                address: None,
            })
            .await
            .unwrap()
    }

    fn request(customer_id: &str, lines: &[(&str, i64)]) -> OrderRequest {
        OrderRequest {
            customer_id: customer_id.to_string(),
            lines: lines
                .iter()
                .map(|(product_id, quantity)| OrderLine {
                    product_id: product_id.to_string(),
                    quantity: *quantity,
                })
                .collect(),
        }
    }

    async fn stock_of(db: &Database, id: &str) -> i64 {
        sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(id)
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    async fn points_of(db: &Database, id: &str) -> i64 {
        db.customers().get_by_id(id).await.unwrap().unwrap().loyalty_points
    }

    async fn order_count(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_order_decrements_stock_and_awards_points() {
        let db = Database::in_memory().await.unwrap();
        let beans = product(&db, "Beans", 10, "2.50").await;
        let ana = customer(&db, "555-0100").await;

        let receipt = db
            .orders()
            .create_order(request(&ana.id, &[(&beans.id, 3)]))
            .await
            .unwrap();

        assert_eq!(receipt.total.cents(), 750);
        assert_eq!(receipt.total.to_string(), "7.50");
        assert_eq!(receipt.loyalty_points_awarded, 7);
        assert_eq!(stock_of(&db, &beans.id).await, 7);
        assert_eq!(points_of(&db, &ana.id).await, 7);

        let stored = db.orders().get(&receipt.order_id).await.unwrap().unwrap();
        assert_eq!(stored.order.status, OrderStatus::Pending);
        assert_eq!(stored.order.total_cents, 750);
        assert_eq!(stored.items.len(), 1);
        assert_eq!(stored.items[0].price_cents, 250);
    }

    #[tokio::test]
    async fn test_overdraw_leaves_everything_untouched() {
        let db = Database::in_memory().await.unwrap();
        let beans = product(&db, "Beans", 10, "2.50").await;
        let ana = customer(&db, "555-0100").await;

        let err = db
            .orders()
            .create_order(request(&ana.id, &[(&beans.id, 15)]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientStock { available: 10, requested: 15, .. })
        ));
        assert_eq!(stock_of(&db, &beans.id).await, 10);
        assert_eq!(order_count(&db).await, 0);
        assert_eq!(points_of(&db, &ana.id).await, 0);
    }

    #[tokio::test]
    async fn test_failing_line_reverts_earlier_lines() {
        let db = Database::in_memory().await.unwrap();
        let beans = product(&db, "Beans", 10, "2.50").await;
        let mugs = product(&db, "Mugs", 2, "8.00").await;
        let ana = customer(&db, "555-0100").await;

        let err = db
            .orders()
            .create_order(request(&ana.id, &[(&beans.id, 3), (&mugs.id, 5)]))
            .await
            .unwrap_err();

        match err {
            DbError::Core(CoreError::InsufficientStock { product, .. }) => assert_eq!(product, "Mugs"),
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        assert_eq!(stock_of(&db, &beans.id).await, 10);
        assert_eq!(stock_of(&db, &mugs.id).await, 2);
        assert_eq!(order_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_first_failing_line_is_reported() {
        let db = Database::in_memory().await.unwrap();
        let beans = product(&db, "Beans", 1, "2.50").await;
        let mugs = product(&db, "Mugs", 1, "8.00").await;
        let ana = customer(&db, "555-0100").await;

        let err = db
            .orders()
            .create_order(request(&ana.id, &[(&mugs.id, 2), (&beans.id, 2)]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientStock { ref product, .. }) if product == "Mugs"
        ));
    }

    #[tokio::test]
    async fn test_repeated_product_lines_share_stock() {
        let db = Database::in_memory().await.unwrap();
        let beans = product(&db, "Beans", 5, "1.00").await;
        let ana = customer(&db, "555-0100").await;

        let err = db
            .orders()
            .create_order(request(&ana.id, &[(&beans.id, 3), (&beans.id, 3)]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientStock { available: 2, requested: 3, .. })
        ));
        assert_eq!(stock_of(&db, &beans.id).await, 5);
    }

    #[tokio::test]
    async fn test_oversized_line_total_rolls_back() {
        let db = Database::in_memory().await.unwrap();
        let gold = product(&db, "Gold Bar", 10, "90000000000000000.00").await;
        let ana = customer(&db, "555-0100").await;

        let err = db
            .orders()
            .create_order(request(&ana.id, &[(&gold.id, 2)]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Core(CoreError::Validation(ValidationError::OutOfRange { ref field, .. }))
                if field == "total"
        ));
        assert_eq!(stock_of(&db, &gold.id).await, 10);
        assert_eq!(points_of(&db, &ana.id).await, 0);
        assert_eq!(order_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_overflowing_order_sum_rolls_back() {
        let db = Database::in_memory().await.unwrap();
        let gold = product(&db, "Gold Bar", 10, "50000000000000000.00").await;
        let diamond = product(&db, "Diamond", 10, "50000000000000000.00").await;
        let ana = customer(&db, "555-0100").await;

        let err = db
            .orders()
            .create_order(request(&ana.id, &[(&gold.id, 1), (&diamond.id, 1)]))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
        assert_eq!(stock_of(&db, &gold.id).await, 10);
        assert_eq!(stock_of(&db, &diamond.id).await, 10);
        assert_eq!(order_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_unknown_and_deleted_products_are_unavailable() {
        let db = Database::in_memory().await.unwrap();
        let beans = product(&db, "Beans", 10, "2.50").await;
        let ana = customer(&db, "555-0100").await;

        let err = db
            .orders()
            .create_order(request(&ana.id, &[("no-such-product", 1)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::ProductUnavailable { ref product }) if product == "no-such-product"
        ));

        db.products().soft_delete(&beans.id).await.unwrap();
        let err = db
            .orders()
            .create_order(request(&ana.id, &[(&beans.id, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::ProductUnavailable { ref product }) if product == "Beans"
        ));
        assert_eq!(stock_of(&db, &beans.id).await, 10);
    }

    #[tokio::test]
    async fn test_missing_customer_is_not_found() {
        let db = Database::in_memory().await.unwrap();
        let beans = product(&db, "Beans", 10, "2.50").await;

        let err = db
            .orders()
            .create_order(request("ghost", &[(&beans.id, 1)]))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::NotFound { ref entity, .. } if entity == "Customer"));
        assert_eq!(stock_of(&db, &beans.id).await, 10);
        assert_eq!(order_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_validation_runs_before_storage() {
        let db = Database::in_memory().await.unwrap();

        let err = db.orders().create_order(request("", &[("p", 1)])).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::Validation(ValidationError::Required { .. }))
        ));

        let err = db.orders().create_order(request("c", &[])).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_points_truncate_total() {
        let db = Database::in_memory().await.unwrap();
        let cake = product(&db, "Cake", 5, "12.70").await;
        let ana = customer(&db, "555-0100").await;

        let receipt = db
            .orders()
            .create_order(request(&ana.id, &[(&cake.id, 1)]))
            .await
            .unwrap();

        assert_eq!(receipt.total.cents(), 1270);
        assert_eq!(points_of(&db, &ana.id).await, 12);
    }

    #[tokio::test]
    async fn test_price_change_does_not_touch_history() {
        let db = Database::in_memory().await.unwrap();
        let beans = product(&db, "Beans", 10, "2.50").await;
        let ana = customer(&db, "555-0100").await;

        let receipt = db
            .orders()
            .create_order(request(&ana.id, &[(&beans.id, 3)]))
            .await
            .unwrap();

        db.products()
            .update(
                &beans.id,
                ProductPatch {
                    price: Some(Money::from_cents(999)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let history = db.orders().list_for_customer(&ana.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].order.id, receipt.order_id);
        assert_eq!(history[0].order.total_cents, 750);
        assert_eq!(history[0].items[0].price_cents, 250);
    }

    #[tokio::test]
    async fn test_list_for_customer_nests_items() {
        let db = Database::in_memory().await.unwrap();
        let beans = product(&db, "Beans", 10, "2.50").await;
        let mugs = product(&db, "Mugs", 10, "8.00").await;
        let ana = customer(&db, "555-0100").await;
        let ben = customer(&db, "555-0101").await;

        db.orders()
            .create_order(request(&ana.id, &[(&beans.id, 1), (&mugs.id, 2)]))
            .await
            .unwrap();
        db.orders()
            .create_order(request(&ana.id, &[(&mugs.id, 1)]))
            .await
            .unwrap();
        db.orders()
            .create_order(request(&ben.id, &[(&beans.id, 1)]))
            .await
            .unwrap();

        let history = db.orders().list_for_customer(&ana.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].items.len(), 2);
        assert_eq!(history[0].items[0].product_id, beans.id);
        assert_eq!(history[1].items.len(), 1);
        assert!(history
            .iter()
            .all(|o| o.items.iter().all(|i| i.order_id == o.order.id)));

        assert!(matches!(
            db.orders().list_for_customer("ghost").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let db = Database::in_memory().await.unwrap();
        let beans = product(&db, "Beans", 10, "2.50").await;
        let ana = customer(&db, "555-0100").await;
        let receipt = db
            .orders()
            .create_order(request(&ana.id, &[(&beans.id, 1)]))
            .await
            .unwrap();

        let done = db
            .orders()
            .update_status(&receipt.order_id, OrderStatus::Completed)
            .await
            .unwrap();
        assert_eq!(done.status, OrderStatus::Completed);

        let err = db
            .orders()
            .update_status(&receipt.order_id, OrderStatus::Canceled)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvalidStatusTransition { .. })));

        assert!(matches!(
            db.orders().update_status("missing", OrderStatus::Completed).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_order_removes_items() {
        let db = Database::in_memory().await.unwrap();
        let beans = product(&db, "Beans", 10, "2.50").await;
        let ana = customer(&db, "555-0100").await;
        let receipt = db
            .orders()
            .create_order(request(&ana.id, &[(&beans.id, 2)]))
            .await
            .unwrap();

        db.orders().delete(&receipt.order_id).await.unwrap();

        assert!(db.orders().get(&receipt.order_id).await.unwrap().is_none());
        let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(items, 0);
        assert!(matches!(
            db.orders().delete(&receipt.order_id).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_customer_cascades() {
        let db = Database::in_memory().await.unwrap();
        let beans = product(&db, "Beans", 10, "2.50").await;
        let ana = customer(&db, "555-0100").await;
        let ben = customer(&db, "555-0101").await;
        db.orders()
            .create_order(request(&ana.id, &[(&beans.id, 2)]))
            .await
            .unwrap();
        let kept = db
            .orders()
            .create_order(request(&ben.id, &[(&beans.id, 1)]))
            .await
            .unwrap();

        db.customers().delete(&ana.id).await.unwrap();

        assert!(db.customers().get_by_id(&ana.id).await.unwrap().is_none());
        assert_eq!(order_count(&db).await, 1);
        let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(items, 1);
        assert!(db.orders().get(&kept.order_id).await.unwrap().is_some());
        assert!(db.products().get_by_id(&beans.id).await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_orders_never_oversell() {
        let path = std::env::temp_dir().join(format!("tally-oversell-{}.db", generate_id()));
        let db = Database::new(crate::DbConfig::new(path.clone()).max_connections(4))
            .await
            .unwrap();
        let beans = product(&db, "Beans", 10, "1.00").await;
        let ana = customer(&db, "555-0100").await;

        let mut handles = Vec::new();
        for _ in 0..4 {
            let orders = db.orders();
            let req = request(&ana.id, &[(&beans.id, 3)]);
            handles.push(tokio::spawn(async move { orders.create_order(req).await }));
        }

        let mut placed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => placed += 1,
                Err(DbError::Core(CoreError::InsufficientStock { .. })) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(placed, 3);
        assert_eq!(stock_of(&db, &beans.id).await, 1);
        assert_eq!(points_of(&db, &ana.id).await, 9);

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_price_edits_keep_sold_stock() {
        let path = std::env::temp_dir().join(format!("tally-edit-race-{}.db", generate_id()));
        let db = Database::new(crate::DbConfig::new(path.clone()).max_connections(4))
            .await
            .unwrap();
        let beans = product(&db, "Beans", 40, "1.00").await;
        let ana = customer(&db, "555-0100").await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let orders = db.orders();
            let req = request(&ana.id, &[(&beans.id, 1)]);
            handles.push(tokio::spawn(async move {
                orders.create_order(req).await.map(|_| ())
            }));

            let products = db.products();
            let id = beans.id.clone();
            handles.push(tokio::spawn(async move {
                let patch = ProductPatch {
                    price: Some(Money::from_cents(100 + i)),
                    ..Default::default()
                };
                products.update(&id, patch).await.map(|_| ())
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(stock_of(&db, &beans.id).await, 32);

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
        }
    }
}
