//! # Customer Repository
//!
//! Customers, their loyalty balance, and the customer → orders cascade.
//!
//! ## Loyalty Points
//! ```text
//! create_order ── awards ──► loyalty_points += ⌊total⌋   (order repository)
//! redeem       ── spends ──► loyalty_points -= n  only if balance ≥ n
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use tally_core::{CoreError, Customer, NewCustomer};

const CUSTOMER_COLUMNS: &str = "id, name, email, phone, address, loyalty_points, created_at";

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Registers a customer with zero points.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - Phone (or email) already on file
    pub async fn create(&self, new: NewCustomer) -> DbResult<Customer> {
        debug!(phone = %new.phone, "Creating customer");

        let customer = Customer {
            id: generate_id(),
            name: new.name,
            email: new.email,
            phone: new.phone,
            address: new.address,
            loyalty_points: 0,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO customers (id, name, email, phone, address, loyalty_points, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(customer.loyalty_points)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DbError::from(e).with_duplicate_value(|field| match field {
                "phone" => Some(customer.phone.clone()),
                "email" => customer.email.clone(),
                _ => None,
            })
        })?;

        info!(customer_id = %customer.id, "Customer created");
        Ok(customer)
    }

    /// Lists all customers by name.
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY name COLLATE NOCASE, created_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Looks a customer up by phone, the loyalty key.
    pub async fn get_by_phone(&self, phone: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE phone = ?1"
        ))
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Spends `points` from the customer's balance.
    ///
    /// The balance check and the deduction are one conditional UPDATE, so
    /// two concurrent redemptions can't overdraw.
    ///
    /// ## Returns
    /// * `Ok(Customer)` - Customer with the new balance
    /// * `Err(DbError::NotFound)` - No such customer
    /// * `Err(DbError::Core(InsufficientPoints))` - Balance too low, nothing changed
    pub async fn redeem_points(&self, id: &str, points: i64) -> DbResult<Customer> {
        debug!(customer_id = %id, points, "Redeeming loyalty points");

        let updated = sqlx::query_as::<_, Customer>(&format!(
            r#"
            UPDATE customers
            SET loyalty_points = loyalty_points - ?2
            WHERE id = ?1 AND loyalty_points >= ?2
            RETURNING {CUSTOMER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(points)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(customer) = updated {
            info!(customer_id = %id, points, balance = customer.loyalty_points, "Points redeemed");
            return Ok(customer);
        }

        match self.get_by_id(id).await? {
            Some(customer) => Err(CoreError::InsufficientPoints {
                available: customer.loyalty_points,
                requested: points,
            }
            .into()),
            None => Err(DbError::not_found("Customer", id)),
        }
    }

    /// Deletes a customer together with their orders and order items.
    ///
    /// ```text
    /// BEGIN
    ///   DELETE order_items WHERE order_id IN (customer's orders)
    ///   DELETE orders      WHERE customer_id = ?
    ///   DELETE customers   WHERE id = ?        ← 0 rows → NotFound, rollback
    /// COMMIT
    /// ```
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(customer_id = %id, "Deleting customer");

        let mut tx = self.pool.begin().await?;

        let items = sqlx::query(
            "DELETE FROM order_items WHERE order_id IN (SELECT id FROM orders WHERE customer_id = ?1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let orders = sqlx::query("DELETE FROM orders WHERE customer_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let customer = sqlx::query("DELETE FROM customers WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if customer.rows_affected() == 0 {
            // tx dropped → rollback
            return Err(DbError::not_found("Customer", id));
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            customer_id = %id,
            orders = orders.rows_affected(),
            items = items.rows_affected(),
            "Customer deleted"
        );
        Ok(())
    }
}
