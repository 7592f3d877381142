//! # Tally Server
//!
//! HTTP API for Tally POS: accounts and sessions, inventory, customers and
//! orders over a single SQLite database.
//!
//! ## Request Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  HTTP ──► axum Router ──► MaybeSession ──► handler ──► tally-db ──► SQLite
//! │                              │               │                          │
//! │                     cookie / bearer JWT      │                          │
//! │                                              ▼                          │
//! │                              authorize(session, access)   (tally-core)  │
//! │                                                                         │
//! │  Errors from any layer become ApiError { code, message } + status.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Startup Sequence
//! 1. Initialize logging (`RUST_LOG` overrides the default filter)
//! 2. Load [`config::ServerConfig`]
//! 3. Open the database and run pending migrations
//! 4. Bind, serve, and drain on Ctrl+C / SIGTERM

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tally_db::{Database, DbConfig};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::error::StartupError;
use crate::handlers::{auth as auth_handlers, customers, health, orders, products, users};
pub use crate::state::AppState;

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        // Accounts
        .route("/signup", post(auth_handlers::signup))
        .route("/login", post(auth_handlers::login))
        .route("/logout", post(auth_handlers::logout))
        .route("/users", post(users::create_user).get(users::list_users))
        .route("/oneusers/{id}", get(users::get_user))
        // Inventory
        .route("/products", get(products::list_products))
        .route("/inventory", get(products::inventory))
        .route("/add_product", post(products::add_product))
        .route("/product/{id}/edit", post(products::edit_product))
        .route("/delete_product/{id}", post(products::delete_product))
        // Customers
        .route("/customers", post(customers::create_customer))
        .route("/customersPage", get(customers::customers_page))
        .route("/customers/by-phone/{phone}", get(customers::get_by_phone))
        .route("/customers/{id}", axum::routing::delete(customers::delete_customer))
        .route("/customers/{id}/redeem", post(customers::redeem_points))
        // Orders. `{id}` is the customer on GET and the order on DELETE.
        .route("/create_order", post(orders::create_order))
        .route(
            "/orders/{id}",
            get(orders::list_for_customer).delete(orders::delete_order),
        )
        .route("/orders/{id}/status", post(orders::update_status))
        .route("/order/{id}", get(orders::get_order))
        .with_state(state)
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - everything at debug
/// - `RUST_LOG=tally=trace` - trace for the tally crates only
/// - Default: `info,tally=debug,sqlx=warn`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tally=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Opens the database and serves until a shutdown signal arrives.
pub async fn serve(config: ServerConfig) -> Result<(), StartupError> {
    let db_path = config.database.path.clone();
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    info!(?db_path, "Database path determined");

    let db = Database::new(
        DbConfig::new(db_path).max_connections(config.database.max_connections),
    )
    .await?;
    info!("Database connected and migrations applied");

    let addr = config.server.bind_address();
    let state = AppState::new(db.clone(), config);

    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "Tally server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}

// =============================================================================
// Router Tests
// =============================================================================
