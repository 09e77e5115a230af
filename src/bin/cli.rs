//! Harvester CLI
//!
//! Local execution entry point.

use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use harvester::{
    config,
    error::{AppError, Result},
    models::{Config, MergeMode, RecordScope},
    pipeline::{self, Orchestrator, SearchQuery},
    services::{
        MomoBrandAdapter, ShopeeModelAdapter, ShopeeShopAdapter, SourceAdapter,
        shopee_models::model_work_items,
    },
    storage::{LocalStorage, MemorySink, RecordSink},
    utils::{http, log as runlog},
};

/// Harvester - price comparison catalog ingestion
#[derive(Parser, Debug)]
#[command(
    name = "harvester",
    version,
    about = "Product catalog harvester for price comparison"
)]
struct Cli {
    /// Path to storage directory containing config and catalog files
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Source {
    Shopee,
    ShopeeModels,
    Momo,
}

impl Source {
    fn scope(self) -> RecordScope {
        match self {
            Source::Shopee => RecordScope::ShopeeProducts,
            Source::ShopeeModels => RecordScope::ShopeeModels,
            Source::Momo => RecordScope::MomoProducts,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl one source and persist records not seen before
    Crawl {
        #[arg(long, value_enum)]
        source: Source,

        /// Gate and persist each work item as soon as it finishes
        #[arg(long)]
        streaming: bool,

        /// Crawl and report without writing the catalog
        #[arg(long)]
        dry_run: bool,

        /// Path to work items file (default: {storage_dir}/workItems.toml)
        #[arg(long)]
        work_items: Option<PathBuf>,
    },

    /// Search persisted records by product name
    Search {
        name: String,

        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Validate configuration and work items
    Validate,

    /// Show catalog sizes and the last run of each source
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

async fn ingest<A: SourceAdapter>(
    adapter: &A,
    sink: &dyn RecordSink,
    config: &Config,
    items: Vec<A::WorkItem>,
    mode: MergeMode,
) -> Result<()> {
    let orchestrator = Orchestrator::from_config(config, Utc::now());
    let outcome = pipeline::run_ingest(adapter, sink, &orchestrator, items, mode).await?;
    if outcome.report.failed_items() > 0 {
        log::warn!(
            "{} of {} work items failed",
            outcome.report.failed_items(),
            outcome.report.items.len()
        );
    }
    Ok(())
}

async fn crawl(
    storage: &LocalStorage,
    source: Source,
    mode: MergeMode,
    dry_run: bool,
    work_items: Option<&Path>,
) -> Result<()> {
    let (config, items) = config::load_all(storage.root(), work_items)?;
    let client = http::create_async_client(&config.crawler)?;

    // A dry run reads the real catalog but writes into memory only.
    let memory;
    let sink: &dyn RecordSink = if dry_run {
        let mut seed = storage.load_records(source.scope()).await?;
        if matches!(source, Source::ShopeeModels) {
            seed.extend(storage.load_records(RecordScope::ShopeeProducts).await?);
        }
        log::info!("Dry run: {} stored records loaded into memory", seed.len());
        memory = MemorySink::with_records(seed);
        &memory
    } else {
        storage
    };

    runlog::header(&format!("Crawl {} ({mode})", source.scope()));
    match source {
        Source::Shopee => {
            let adapter = ShopeeShopAdapter::new(client, config.shopee.clone());
            ingest(&adapter, sink, &config, items.shopee_shops, mode).await
        }
        Source::ShopeeModels => {
            let products = sink.load_records(RecordScope::ShopeeProducts).await?;
            let item_refs = model_work_items(&products);
            if item_refs.is_empty() {
                log::warn!("No Shopee products stored yet. Run 'crawl --source shopee' first.");
            }
            let adapter = ShopeeModelAdapter::new(client, config.shopee.clone());
            ingest(&adapter, sink, &config, item_refs, mode).await
        }
        Source::Momo => {
            let adapter = MomoBrandAdapter::new(client, config.momo.clone())?;
            ingest(&adapter, sink, &config, items.momo_brands, mode).await
        }
    }
}

async fn search(storage: &LocalStorage, query: SearchQuery) -> Result<()> {
    let records = pipeline::load_catalog(storage).await?;
    let hits = pipeline::search(&records, &query)?;

    log::info!("{} matches for {:?}", hits.len(), query.name);
    for record in hits {
        println!(
            "{:>12}  {:<8}  {}  {}",
            record.price.format_grouped(),
            record.platform,
            record.name,
            record.display_url()
        );
    }
    Ok(())
}

async fn info(storage: &LocalStorage) -> Result<()> {
    log::info!("Storage directory: {}", storage.root().display());
    for scope in RecordScope::ALL {
        let count = storage.load_records(scope).await?.len();
        match storage.load_run_report(scope).await? {
            Some(report) => log::info!(
                "{scope}: {count} records, last run {} ({} accepted, {} failed items)",
                report.finished_at.to_rfc3339(),
                report.accepted,
                report.failed_items()
            ),
            None => log::info!("{scope}: {count} records, never crawled"),
        }
    }
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("Harvester starting...");
    let storage = LocalStorage::new(&cli.storage_dir);

    match cli.command {
        Command::Crawl {
            source,
            streaming,
            dry_run,
            work_items,
        } => {
            let mode = if streaming {
                MergeMode::Streaming
            } else {
                MergeMode::Gather
            };
            crawl(&storage, source, mode, dry_run, work_items.as_deref()).await?;
            log::info!("Crawl complete!");
        }

        Command::Search { name, limit } => {
            if name.trim().is_empty() {
                return Err(AppError::validation("search name is empty"));
            }
            search(&storage, SearchQuery { name, limit }).await?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            let (_, items) = config::load_all(&cli.storage_dir, None)?;
            log::info!("✓ Config OK");
            log::info!(
                "✓ Work items OK ({} shops, {} brands)",
                items.shopee_shops.len(),
                items.momo_brands.len()
            );
            log::info!("All validations passed!");
        }

        Command::Info => info(&storage).await?,
    }

    log::info!("Done!");

    Ok(())
}
