//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Filtered listing (category + free-text search)
//! - CRUD operations with soft delete
//!
//! ## Search
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How Inventory Search Works                           │
//! │                                                                         │
//! │  GET /inventory?category=coffee&search=bean                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  category  → exact match, case-insensitive      ("Coffee" = "coffee")  │
//! │  search    → substring of name OR sku OR category, case-insensitive    │
//! │              LIKE '%bean%' ESCAPE '\'  (user % and _ are escaped)       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │ products (is_active = 1)                │                           │
//! │  │                                         │                           │
//! │  │ ESP001 | Espresso Beans | Coffee       │ ← MATCH!                  │
//! │  │ DEC002 | Decaf Beans    | Coffee       │ ← MATCH!                  │
//! │  │ MUG003 | Travel Mug     | Merch        │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │                                                                         │
//! │  No filter → every active product                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use tally_core::{NewProduct, Product, ProductPatch};

const PRODUCT_COLUMNS: &str = "id, name, category, sku, stock, price_cents, image_url, \
                               last_restocked, is_active, created_at, updated_at";

/// Optional listing filters. Both `None` returns the full active catalog.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub search: Option<String>,
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists active products matching `filter`, sorted by name.
    pub async fn list(&self, filter: &ProductFilter) -> DbResult<Vec<Product>> {
        debug!(category = ?filter.category, search = ?filter.search, "Listing products");

        let pattern = filter.search.as_deref().map(like_pattern);

        let products = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE is_active = 1
              AND (?1 IS NULL OR lower(category) = lower(?1))
              AND (?2 IS NULL
                   OR name LIKE ?2 ESCAPE '\'
                   OR sku LIKE ?2 ESCAPE '\'
                   OR category LIKE ?2 ESCAPE '\')
            ORDER BY name COLLATE NOCASE
            "#
        ))
        .bind(filter.category.as_deref())
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Listing returned products");
        Ok(products)
    }

    /// Gets an active product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found or soft-deleted
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND is_active = 1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product with generated fields
    /// * `Err(DbError::UniqueViolation)` - An active product has this name
    pub async fn insert(&self, new: NewProduct) -> DbResult<Product> {
        debug!(sku = %new.sku, name = %new.name, "Inserting product");

        let now = Utc::now();
        let product = Product {
            id: generate_id(),
            name: new.name,
            category: new.category,
            sku: new.sku,
            stock: new.stock,
            price_cents: new.price.cents(),
            image_url: new.image_url,
            last_restocked: new.last_restocked,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, category, sku, stock, price_cents, image_url,
                last_restocked, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(&product.sku)
        .bind(product.stock)
        .bind(product.price_cents)
        .bind(&product.image_url)
        .bind(product.last_restocked)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(|_| Some(product.name.clone())))?;

        Ok(product)
    }

    /// Applies a partial update to an active product.
    ///
    /// One statement: unset fields keep the column's current value, so a
    /// price edit never writes back a stock count an order has since
    /// decremented.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The product after the update
    /// * `Err(DbError::NotFound)` - Product doesn't exist (or was deleted)
    /// * `Err(DbError::UniqueViolation)` - Renamed onto another active product
    pub async fn update(&self, id: &str, patch: ProductPatch) -> DbResult<Product> {
        if patch.is_empty() {
            return self
                .get_by_id(id)
                .await?
                .ok_or_else(|| DbError::not_found("Product", id));
        }

        debug!(id = %id, "Updating product");

        let new_name = patch.name.clone();
        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products SET
                name = COALESCE(?2, name),
                category = COALESCE(?3, category),
                sku = COALESCE(?4, sku),
                stock = COALESCE(?5, stock),
                price_cents = COALESCE(?6, price_cents),
                image_url = COALESCE(?7, image_url),
                last_restocked = COALESCE(?8, last_restocked),
                updated_at = ?9
            WHERE id = ?1 AND is_active = 1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.name)
        .bind(patch.category)
        .bind(patch.sku)
        .bind(patch.stock)
        .bind(patch.price.map(|p| p.cents()))
        .bind(patch.image_url)
        .bind(patch.last_restocked)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(|_| new_name.clone()))?;

        product.ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Historical order items keep pointing at the row; listings, edits
    /// and new orders no longer see it.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET is_active = 0, updated_at = ?2
            WHERE id = ?1 AND is_active = 1
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products (for diagnostics and seeding).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Wraps user text in `%…%`, escaping LIKE wildcards with `\`.
fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use tally_core::Money;

    fn new_product(name: &str, category: &str, sku: &str) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            category: category.to_string(),
            sku: sku.to_string(),
            stock: 10,
            price: Money::from_cents(250),
            image_url: format!("{sku}.png"),
            last_restocked: Utc::now(),
        }
    }

    async fn seeded() -> Database {
        let db = Database::in_memory().await.unwrap();
        let repo = db.products();
        repo.insert(new_product("Espresso Beans", "Coffee", "ESP001")).await.unwrap();
        repo.insert(new_product("Decaf Beans", "Coffee", "DEC002")).await.unwrap();
        repo.insert(new_product("Travel Mug", "Merch", "MUG003")).await.unwrap();
        repo.insert(new_product("100% Cocoa", "Baking", "COC_04")).await.unwrap();
        db
    }

    fn names(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("bean"), "%bean%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
    }

    #[tokio::test]
    async fn test_list_without_filter_returns_everything() {
        let db = seeded().await;
        let all = db.products().list(&ProductFilter::default()).await.unwrap();
        assert_eq!(all.len(), 4);
    }

    #[tokio::test]
    async fn test_search_matches_name_sku_and_category() {
        let db = seeded().await;
        let repo = db.products();

        let by_name = repo
            .list(&ProductFilter { search: Some("BEANS".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(names(&by_name), vec!["Decaf Beans", "Espresso Beans"]);

        let by_sku = repo
            .list(&ProductFilter { search: Some("mug0".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(names(&by_sku), vec!["Travel Mug"]);

        let by_category = repo
            .list(&ProductFilter { search: Some("merc".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(names(&by_category), vec!["Travel Mug"]);
    }

    #[tokio::test]
    async fn test_search_wildcards_are_literal() {
        let db = seeded().await;
        let repo = db.products();

        let percent = repo
            .list(&ProductFilter { search: Some("%".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(names(&percent), vec!["100% Cocoa"]);

        let underscore = repo
            .list(&ProductFilter { search: Some("_".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(names(&underscore), vec!["100% Cocoa"]);
    }

    #[tokio::test]
    async fn test_category_filter_combines_with_search() {
        let db = seeded().await;
        let repo = db.products();

        let coffee = repo
            .list(&ProductFilter { category: Some("coffee".into()), search: None })
            .await
            .unwrap();
        assert_eq!(coffee.len(), 2);

        let decaf = repo
            .list(&ProductFilter {
                category: Some("Coffee".into()),
                search: Some("decaf".into()),
            })
            .await
            .unwrap();
        assert_eq!(names(&decaf), vec!["Decaf Beans"]);
    }

    #[tokio::test]
    async fn test_duplicate_active_name_rejected() {
        let db = seeded().await;
        let err = db
            .products()
            .insert(new_product("Travel Mug", "Merch", "MUG999"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "name"));
    }

    #[tokio::test]
    async fn test_update_is_partial() {
        let db = seeded().await;
        let repo = db.products();
        let mug = repo.insert(new_product("Tumbler", "Merch", "TUM005")).await.unwrap();

        let updated = repo
            .update(
                &mug.id,
                ProductPatch {
                    price: Some(Money::from_cents(1299)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price_cents, 1299);
        assert_eq!(updated.name, "Tumbler");

        let reloaded = repo.get_by_id(&mug.id).await.unwrap().unwrap();
        assert_eq!(reloaded.price_cents, 1299);
        assert_eq!(reloaded.stock, 10);
    }

    #[tokio::test]
    async fn test_price_edit_keeps_stock_sold_since_load() {
        let db = seeded().await;
        let repo = db.products();
        let mug = repo.insert(new_product("Tumbler", "Merch", "TUM005")).await.unwrap();
        assert_eq!(mug.stock, 10);

        // An order lands between the editor loading the product and saving.
        sqlx::query("UPDATE products SET stock = stock - 3 WHERE id = ?1")
            .bind(&mug.id)
            .execute(db.pool())
            .await
            .unwrap();

        let updated = repo
            .update(
                &mug.id,
                ProductPatch {
                    price: Some(Money::from_cents(1299)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.stock, 7);
        assert_eq!(updated.price_cents, 1299);
    }

    #[tokio::test]
    async fn test_update_can_set_every_field() {
        let db = seeded().await;
        let repo = db.products();
        let mug = repo.insert(new_product("Tumbler", "Merch", "TUM005")).await.unwrap();
        let restocked = Utc::now() - chrono::Duration::days(3);

        let updated = repo
            .update(
                &mug.id,
                ProductPatch {
                    name: Some("Steel Tumbler".into()),
                    category: Some("Drinkware".into()),
                    sku: Some("TUM777".into()),
                    stock: Some(4),
                    price: Some(Money::from_cents(1999)),
                    image_url: Some("steel.png".into()),
                    last_restocked: Some(restocked),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Steel Tumbler");
        assert_eq!(updated.category, "Drinkware");
        assert_eq!(updated.sku, "TUM777");
        assert_eq!(updated.stock, 4);
        assert_eq!(updated.image_url, "steel.png");
        assert_eq!(updated.last_restocked.timestamp(), restocked.timestamp());
    }

    #[tokio::test]
    async fn test_rename_onto_active_name_conflicts() {
        let db = seeded().await;
        let repo = db.products();
        let mug = repo.insert(new_product("Tumbler", "Merch", "TUM005")).await.unwrap();

        let err = repo
            .update(
                &mug.id,
                ProductPatch {
                    name: Some("Travel Mug".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::UniqueViolation { ref value, .. } if value == "Travel Mug"
        ));
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let db = seeded().await;
        let err = db
            .products()
            .update("missing", ProductPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_soft_delete_hides_and_frees_name() {
        let db = seeded().await;
        let repo = db.products();
        let mug = repo.insert(new_product("Tumbler", "Merch", "TUM005")).await.unwrap();

        repo.soft_delete(&mug.id).await.unwrap();

        assert!(repo.get_by_id(&mug.id).await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 4);
        assert!(matches!(
            repo.soft_delete(&mug.id).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            repo.update(&mug.id, ProductPatch::default()).await,
            Err(DbError::NotFound { .. })
        ));

        // The name is free again once the old row is inactive.
        repo.insert(new_product("Tumbler", "Merch", "TUM006")).await.unwrap();
    }
}
