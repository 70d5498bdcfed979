//! emberkv server entry point.
//!
//! Parses configuration, recovers the store from the append log, starts
//! the background reaper and accepts connections until Ctrl+C.

use emberkv::commands::CommandHandler;
use emberkv::connection::{handle_connection, ConnectionStats};
use emberkv::storage::{start_reaper, Store, SyncPolicy};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Server configuration
struct Config {
    /// Host to bind to
    host: String,
    /// Port to listen on
    port: u16,
    /// Append log path
    aof_path: PathBuf,
    /// Snapshot export path
    snapshot_path: PathBuf,
    /// Append log sync policy
    sync: SyncPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: emberkv::DEFAULT_HOST.to_string(),
            port: emberkv::DEFAULT_PORT,
            aof_path: PathBuf::from(emberkv::DEFAULT_AOF_FILE),
            snapshot_path: PathBuf::from(emberkv::DEFAULT_SNAPSHOT_FILE),
            sync: SyncPolicy::Strict,
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    if i + 1 < args.len() {
                        config.host = args[i + 1].clone();
                        i += 2;
                    } else {
                        eprintln!("Error: --host requires a value");
                        std::process::exit(1);
                    }
                }
                "--port" | "-p" => {
                    if i + 1 < args.len() {
                        config.port = args[i + 1].parse().unwrap_or_else(|_| {
                            eprintln!("Error: invalid port number");
                            std::process::exit(1);
                        });
                        i += 2;
                    } else {
                        eprintln!("Error: --port requires a value");
                        std::process::exit(1);
                    }
                }
                "--aof" => {
                    if i + 1 < args.len() {
                        config.aof_path = PathBuf::from(&args[i + 1]);
                        i += 2;
                    } else {
                        eprintln!("Error: --aof requires a value");
                        std::process::exit(1);
                    }
                }
                "--snapshot" => {
                    if i + 1 < args.len() {
                        config.snapshot_path = PathBuf::from(&args[i + 1]);
                        i += 2;
                    } else {
                        eprintln!("Error: --snapshot requires a value");
                        std::process::exit(1);
                    }
                }
                "--no-sync" => {
                    config.sync = SyncPolicy::Buffered;
                    i += 1;
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("emberkv version {}", emberkv::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }

    /// Returns the bind address as a string
    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn print_help() {
    println!(
        r#"
emberkv - A Minimal Durable In-Memory Key-Value Store

USAGE:
    emberkv [OPTIONS]

OPTIONS:
    -h, --host <HOST>        Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>        Port to listen on (default: 6380)
        --aof <PATH>         Append log path (default: appendonly.aof)
        --snapshot <PATH>    Snapshot export path (default: dump.json)
        --no-sync            Buffer log appends instead of fsyncing each one
    -v, --version            Print version information
        --help               Print this help message

EXAMPLES:
    emberkv                          # Start on 127.0.0.1:6380, strict sync
    emberkv --port 6381 --no-sync    # Faster, less durable
    emberkv --aof /var/lib/ember.aof # Custom log location

CONNECTING:
    $ nc 127.0.0.1 6380
    PING
    +PONG
    SET name ember
    +OK
    GET name
    $5
    ember
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_args();

    // Set up logging
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    // Recover the store from the append log; failure here aborts
    // startup entirely - there is no partial-start mode.
    let store = Arc::new(Store::open(&config.aof_path, config.sync).await?);
    info!(
        keys = store.len().await,
        aof = %config.aof_path.display(),
        "Store recovered"
    );

    // Start the background expiry reaper
    let _reaper = start_reaper(Arc::clone(&store));

    // Create connection statistics
    let stats = Arc::new(ConnectionStats::new());

    // Bind the TCP listener
    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("Listening on {}", config.bind_address());

    // Set up shutdown on Ctrl+C
    let shutdown = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Shutdown signal received, stopping server...");
    };

    let snapshot_path = config.snapshot_path.clone();
    tokio::select! {
        _ = accept_loop(listener, store, snapshot_path, stats) => {}
        _ = shutdown => {}
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Main loop that accepts incoming connections.
///
/// One task per connection, unbounded. A single failed accept is logged
/// and tolerated; the loop continues without backoff.
async fn accept_loop(
    listener: TcpListener,
    store: Arc<Store>,
    snapshot_path: PathBuf,
    stats: Arc<ConnectionStats>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = CommandHandler::new(Arc::clone(&store), snapshot_path.clone());
                let stats = Arc::clone(&stats);

                tokio::spawn(async move {
                    handle_connection(stream, addr, handler, stats).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
