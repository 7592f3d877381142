//! # Tally Server Binary
//!
//! ```bash
//! tally-server                       # defaults + platform config file
//! tally-server --config ./tally.toml
//! RUST_LOG=debug TALLY_PORT=9090 tally-server
//! ```

use std::path::PathBuf;

use clap::Parser;
use tally_server::config::ServerConfig;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "tally-server")]
#[command(about = "Tally POS HTTP API")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "TALLY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    tally_server::init_tracing();

    info!("Starting Tally POS server");

    let config = match ServerConfig::load(cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return std::process::ExitCode::FAILURE;
        }
    };
    info!(
        bind = %config.server.bind_address(),
        db = %config.database.path.display(),
        "Configuration loaded"
    );

    match tally_server::serve(config).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!("Server error: {}", e);
            std::process::ExitCode::FAILURE
        }
    }
}
