//! kvlog CLI Client
//!
//! Interactive shell against a kvlog server, or directly against a log
//! file with `--db-file`.

use std::io;
use std::path::PathBuf;

use clap::Parser;
use kvlog::network::Client;
use kvlog::{shell, Config, StoreService};
use tracing_subscriber::{fmt, EnvFilter};

/// kvlog CLI
#[derive(Parser, Debug)]
#[command(name = "kvlog-cli")]
#[command(about = "Interactive shell for the kvlog key-value store")]
struct Args {
    /// Key Value DB server address in the format host:port
    #[arg(short, long, default_value = "127.0.0.1:9090")]
    server: String,

    /// Open this log file directly instead of connecting to a server
    #[arg(short, long)]
    db_file: Option<PathBuf>,

    /// Per-request deadline in milliseconds
    #[arg(long, default_value = "10000")]
    deadline_ms: u64,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(io::stderr).init();

    let args = Args::parse();
    let config = Config::builder()
        .listen_addr(&args.server)
        .request_deadline_ms(args.deadline_ms)
        .build();

    let stdin = io::stdin();
    let stdout = io::stdout();

    let result = match args.db_file {
        Some(path) => StoreService::open_path(&path).and_then(|mut service| {
            println!(
                "Loaded {} records from {}",
                service.log().recovery().records,
                path.display()
            );
            let result = shell::run(&mut service, stdin.lock(), stdout.lock());
            service.close()?;
            result
        }),
        None => Client::connect(&config.listen_addr, config.request_deadline())
            .and_then(|mut client| shell::run(&mut client, stdin.lock(), stdout.lock())),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
