//! Batch maintenance jobs, run standalone rather than per-request:
//!
//!   phishguard-jobs import [domain|email] [config.toml]
//!   phishguard-jobs dedup  [domain|email] [config.toml]
//!
//! Exits 0 on full success, 1 if any feed or chunk produced an unrecovered
//! error. Never schedule `import` and `dedup` concurrently on the same kind.

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};

use phishguard::config::{setup_logging, Config};
use phishguard::dedup::Deduplicator;
use phishguard::error::Error;
use phishguard::ingest::IngestionPipeline;
use phishguard::store::Store;
use phishguard::types::Kind;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str);

    let (command, kind, config_path) = match command {
        Some(cmd @ ("import" | "dedup")) => {
            let kind = match args.get(2).map(String::as_str) {
                Some("email") => Kind::Email,
                Some("domain") | None => Kind::Domain,
                Some(other) => {
                    eprintln!("Unknown kind '{}'; expected 'domain' or 'email'.", other);
                    std::process::exit(2);
                }
            };
            let config_path = args.get(3).cloned().unwrap_or("config.toml".to_string());
            (cmd, kind, config_path)
        }
        _ => {
            eprintln!("Usage: phishguard-jobs <import|dedup> [domain|email] [config.toml]");
            std::process::exit(2);
        }
    };

    let config = if std::path::Path::new(&config_path).exists() {
        Config::load(&config_path).await?
    } else {
        Config::default()
    };
    setup_logging(&config);

    // Schema init is skipped for dedup: applying the uniqueness index to a
    // database still holding duplicate rows would fail before repair.
    let store = Arc::new(Store::open(&config.database_path)?);

    match command {
        "import" => {
            store.init_schema()?;
            let feeds = config.get_feeds_sorted();
            if feeds.is_empty() {
                info!("No feeds configured, nothing to import.");
                return Ok(());
            }
            let pipeline = IngestionPipeline::new(store, config.import.chunk_size)?;
            let summary = pipeline.run(kind, &feeds).await;
            info!(
                "Import finished: added {}, reactivated {}, skipped {} invalid / {} in-file dup / {} existing, {} errors",
                summary.added,
                summary.reactivated,
                summary.skipped_invalid,
                summary.skipped_duplicate_in_file,
                summary.skipped_existing_in_store,
                summary.errors
            );
            if summary.errors > 0 {
                std::process::exit(1);
            }
        }
        "dedup" => {
            let dedup = Deduplicator::new(store, config.import.chunk_size);
            match dedup.deduplicate(kind) {
                Ok(deleted) => {
                    info!("Deduplication finished: {} rows removed.", deleted);
                }
                Err(Error::PartialBatchFailure { completed, cause }) => {
                    error!(
                        "Deduplication aborted after {} committed deletions: {}",
                        completed, cause
                    );
                    std::process::exit(1);
                }
                Err(e) => {
                    error!("Deduplication failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        _ => unreachable!(),
    }

    Ok(())
}
