//! Memengine MCP Server
//!
//! Exposes a durable, block-structured memory store to conversational
//! agents over the Model Context Protocol, speaking JSON-RPC 2.0 on
//! stdio.

mod protocol;
mod server;
mod tools;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use memengine_core::{MemoryEngineConfig, NullEmbeddingProvider, Store};
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use crate::protocol::stdio::StdioTransport;
use crate::server::McpServer;

/// Parses command-line arguments and returns the optional data directory
/// path. Returns `None` if no `--data-dir` was specified. Exits the
/// process if `--help` or `--version` is requested.
fn parse_args() -> Option<PathBuf> {
    let args: Vec<String> = std::env::args().collect();
    let mut data_dir: Option<PathBuf> = None;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!("memengine-mcp {}", env!("CARGO_PKG_VERSION"));
                println!();
                println!("MCP server exposing durable block memory to conversational agents.");
                println!();
                println!("USAGE:");
                println!("    memengine-mcp [OPTIONS]");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help              Print help information");
                println!("    -V, --version           Print version information");
                println!("    --data-dir <PATH>       Custom data directory");
                println!();
                println!("ENVIRONMENT:");
                println!("    RUST_LOG               Log level filter (e.g., debug, info, warn, error)");
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("memengine-mcp {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--data-dir" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --data-dir requires a path argument");
                    std::process::exit(1);
                }
                data_dir = Some(PathBuf::from(&args[i]));
            }
            arg if arg.starts_with("--data-dir=") => {
                let path = arg.strip_prefix("--data-dir=").unwrap_or("");
                if path.is_empty() {
                    eprintln!("error: --data-dir requires a path argument");
                    std::process::exit(1);
                }
                data_dir = Some(PathBuf::from(path));
            }
            arg => {
                eprintln!("error: unknown argument '{}'", arg);
                eprintln!("Try 'memengine-mcp --help' for more information.");
                std::process::exit(1);
            }
        }
        i += 1;
    }

    data_dir
}

#[tokio::main]
async fn main() {
    let data_dir = parse_args();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();

    info!("memengine-mcp v{} starting...", env!("CARGO_PKG_VERSION"));

    let db_path = data_dir.map(|dir| dir.join("memengine.db"));

    #[cfg(feature = "local-embeddings")]
    let embeddings: Arc<dyn memengine_core::EmbeddingProvider> =
        Arc::new(memengine_core::LocalEmbeddingProvider::new());
    #[cfg(not(feature = "local-embeddings"))]
    let embeddings: Arc<dyn memengine_core::EmbeddingProvider> =
        Arc::new(NullEmbeddingProvider::new(768));

    let store = match Store::open(db_path, MemoryEngineConfig::default(), embeddings, None) {
        Ok(s) => {
            info!("store opened successfully");
            Arc::new(s)
        }
        Err(e) => {
            error!("failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    if store.migration_needed().unwrap_or(false) {
        info!("legacy kv_memory rows detected, migrating to blocks");
        match store.migrate_kv_to_blocks().await {
            Ok(report) => info!(
                migrated = report.migrated,
                skipped = report.skipped,
                errors = ?report.errors,
                "migration complete"
            ),
            Err(e) => error!("migration failed: {}", e),
        }
    }

    let server = McpServer::new(store);
    let transport = StdioTransport::new();

    info!("starting MCP server on stdio...");

    if let Err(e) = transport.run(server).await {
        error!("server error: {}", e);
        std::process::exit(1);
    }

    info!("memengine-mcp shutting down");
}
