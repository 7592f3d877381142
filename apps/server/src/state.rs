//! # Application State
//!
//! Shared by every handler through axum's `State` extractor.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         AppState (Clone)                                │
//! │                                                                         │
//! │  ┌──────────────┐  ┌────────────────────┐  ┌──────────────────────┐    │
//! │  │  Database    │  │ Arc<SessionManager>│  │  Arc<ServerConfig>   │    │
//! │  │  (SQLite     │  │  JWT secret,       │  │  read-only after     │    │
//! │  │   pool)      │  │  cookie settings   │  │  startup             │    │
//! │  └──────────────┘  └────────────────────┘  └──────────────────────┘    │
//! │                                                                         │
//! │  No per-request mutable state: the pool handles its own locking and    │
//! │  sessions travel in the request, not in memory.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tally_db::Database;

use crate::auth::SessionManager;
use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub sessions: Arc<SessionManager>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        AppState {
            db,
            sessions: Arc::new(SessionManager::from_settings(&config.auth)),
            config: Arc::new(config),
        }
    }
}
