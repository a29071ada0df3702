//! kvlog Server Binary
//!
//! Starts the TCP server for kvlog.

use std::sync::Arc;

use clap::Parser;
use kvlog::network::Server;
use kvlog::{Config, StoreService};
use tracing_subscriber::{fmt, EnvFilter};

/// kvlog Server
#[derive(Parser, Debug)]
#[command(name = "kvlog-server")]
#[command(about = "Networked key-value store backed by an append-only log")]
#[command(version)]
struct Args {
    /// The DB file for the key value store
    #[arg(short, long)]
    db_file: String,

    /// Host to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// The port used for binding the DB server
    #[arg(short, long, default_value = "9090")]
    port: u16,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// How long shutdown waits for in-flight requests (milliseconds)
    #[arg(long, default_value = "5000")]
    drain_timeout_ms: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kvlog=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("kvlog Server v{}", kvlog::VERSION);

    let config = Config::builder()
        .db_file(&args.db_file)
        .listen_addr(format!("{}:{}", args.host, args.port))
        .max_connections(args.max_connections)
        .drain_timeout_ms(args.drain_timeout_ms)
        .build();

    // Open the record log; any failure here aborts startup
    let service = match StoreService::open(&config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting up on {}", config.listen_addr);
    let server = match Server::bind(config, service) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    // Set up Ctrl+C handler
    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        shutdown.trigger();
    }) {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
