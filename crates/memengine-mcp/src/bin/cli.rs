//! Memengine CLI
//!
//! Offline maintenance commands for a memengine database: migration
//! from the legacy key/value store, rollback, and listing blocks
//! without going through the MCP server.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use memengine_core::{BlockType, MemoryEngineConfig, NullEmbeddingProvider, Store};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "memengine")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CLI for maintaining a memengine database")]
struct Cli {
    /// Path to the database directory (defaults to the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate legacy kv_memory rows into core blocks
    Migrate,

    /// Undo the most recent migration, restoring kv_memory
    Rollback,

    /// Snapshot core blocks back into kv_memory
    ExportToKv,

    /// List blocks, optionally filtered by type
    ListBlocks {
        #[arg(long, value_enum)]
        block_type: Option<BlockTypeArg>,
    },
}

#[derive(Clone, clap::ValueEnum)]
enum BlockTypeArg {
    Core,
    Archival,
}

fn open_store(data_dir: Option<PathBuf>) -> Result<Store, String> {
    let db_path = data_dir.map(|dir| dir.join("memengine.db"));
    Store::open(
        db_path,
        MemoryEngineConfig::default(),
        Arc::new(NullEmbeddingProvider::new(768)),
        None,
    )
    .map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let result = run(cli).await;
    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let store = open_store(cli.data_dir)?;

    match cli.command {
        Commands::Migrate => {
            let report = store.migrate_kv_to_blocks().await.map_err(|e| e.to_string())?;
            println!("{}", "migration complete".green().bold());
            println!("  total:    {}", report.total);
            println!("  migrated: {}", report.migrated);
            println!("  skipped:  {}", report.skipped);
            println!("  errors:   {:?}", report.errors);
        }
        Commands::Rollback => {
            store.rollback_migration().map_err(|e| e.to_string())?;
            println!("{}", "rollback complete, kv_memory restored".green().bold());
        }
        Commands::ExportToKv => {
            let count = store.export_blocks_to_kv().map_err(|e| e.to_string())?;
            println!("{} {} blocks exported to kv_memory", "done:".green().bold(), count);
        }
        Commands::ListBlocks { block_type } => {
            let filter = block_type.map(|t| match t {
                BlockTypeArg::Core => BlockType::Core,
                BlockTypeArg::Archival => BlockType::Archival,
            });
            let blocks = store.get_all_blocks(filter).map_err(|e| e.to_string())?;
            for block in blocks {
                println!("{} {} ({} bytes)", block.id.cyan(), block.label, block.content.len());
            }
        }
    }

    Ok(())
}
