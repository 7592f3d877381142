//! # Seed Data Generator
//!
//! Creates an admin account and a small sample catalog for development.
//!
//! ## Usage
//! ```bash
//! # Defaults: ./tally_dev.db, admin@tally.local / admin
//! cargo run -p tally-server --bin seed
//!
//! # Custom database and admin credentials
//! cargo run -p tally-server --bin seed -- --db ./data/tally.db \
//!     --admin-email owner@example.com --admin-password s3cret
//! ```
//!
//! Running it twice is harmless: an existing admin email is kept, and the
//! catalog is only generated into an empty products table.

use std::path::PathBuf;

use chrono::Utc;
use clap::Parser;
use tally_core::validation::generate_sku;
use tally_core::{Money, NewProduct, Role};
use tally_db::{Database, DbConfig, DbError, NewUser};
use tally_server::auth::hash_password;

/// Sample catalog: (category, name, price in cents, stock)
const CATALOG: &[(&str, &str, i64, i64)] = &[
    ("Produce", "Apple", 250, 120),
    ("Produce", "Banana", 35, 200),
    ("Produce", "Avocado", 199, 40),
    ("Dairy", "Whole Milk", 389, 30),
    ("Dairy", "Cheddar Cheese", 1270, 15),
    ("Dairy", "Greek Yogurt", 149, 48),
    ("Bakery", "Sourdough Loaf", 650, 12),
    ("Bakery", "Croissant", 275, 24),
    ("Beverages", "Sparkling Water", 129, 96),
    ("Beverages", "Cold Brew Coffee", 450, 36),
    ("Grocery", "Pasta Penne", 219, 60),
    ("Grocery", "Peanut Butter", 529, 25),
];

#[derive(Parser)]
#[command(name = "seed")]
#[command(about = "Tally POS seed data generator")]
struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "./tally_dev.db")]
    db: PathBuf,

    /// Admin account email
    #[arg(long, default_value = "admin@tally.local")]
    admin_email: String,

    /// Admin account password
    #[arg(long, default_value = "admin")]
    admin_password: String,

    /// Admin account PIN (4 digits)
    #[arg(long, default_value = "0000")]
    admin_pin: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    println!("Tally POS Seed Data Generator");
    println!("=============================");
    println!("Database: {}", cli.db.display());
    println!();

    let db = Database::new(DbConfig::new(cli.db.clone())).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Admin account
    let password_hash = hash_password(&cli.admin_password)?;
    let admin = NewUser {
        name: "Administrator".to_string(),
        email: Some(cli.admin_email.trim().to_lowercase()),
        password_hash: Some(password_hash),
        pin: Some(cli.admin_pin.clone()),
        role: Role::Admin,
    };
    match db.users().insert(admin).await {
        Ok(user) => println!("✓ Admin account created: {} ({})", cli.admin_email, user.id),
        Err(DbError::UniqueViolation { .. }) => {
            println!("⚠ Admin {} already exists, keeping it", cli.admin_email)
        }
        Err(e) => return Err(e.into()),
    }

    // Catalog
    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping catalog to avoid duplicates.");
        return Ok(());
    }

    let mut generated = 0;
    for (category, name, price_cents, stock) in CATALOG {
        let product = NewProduct {
            name: name.to_string(),
            category: category.to_string(),
            sku: generate_sku(),
            stock: *stock,
            price: Money::from_cents(*price_cents),
            image_url: String::new(),
            last_restocked: Utc::now(),
        };

        match db.products().insert(product).await {
            Ok(p) => {
                generated += 1;
                println!("  {:<8} {:<18} {:>7}  stock {}", p.sku, p.name, p.price(), p.stock);
            }
            Err(e) => eprintln!("Failed to insert {}: {}", name, e),
        }
    }

    println!();
    println!("✓ Generated {} products", generated);
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}
