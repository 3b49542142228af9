//! Awesome Webapp - Main entry point.

use awesome_webapp::config::Config;
use awesome_webapp::db::Database;
use awesome_webapp::models::Models;
use awesome_webapp::server::HttpServer;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    info!("Starting Awesome Webapp v{}", env!("CARGO_PKG_VERSION"));

    // Schema definition errors are fatal
    let models = Models::register()?;
    info!(count = models.all().len(), "Models registered");

    let database = match config.database_options() {
        Some(options) => Some(Database::connect(&options).await?),
        None => {
            info!("No database configured, running without one");
            None
        }
    };

    let server = HttpServer::new(&config.http_host, config.http_port);
    let result = server.run().await;

    if let Some(db) = &database {
        db.close().await;
    }

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
