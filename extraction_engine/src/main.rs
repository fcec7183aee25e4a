// @file: extraction_engine/src/main.rs
// @description: Command-line entry point: lists tradable symbols or runs an extraction and emits the JSON result.
// @author: LAS.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use extraction_engine::connectors::rest_dispatch::build_client_from_env;
use extraction_engine::core::engine::ExtractionEngine;
use extraction_engine::core::interfaces::ExchangeHistoryClient;
use extraction_engine::core::models::{
    ExecutionMode, ExtractionRequest, ExtractionResult, RecordKind, TimeWindow,
};
use extraction_engine::orchestration::storage::LocalObjectStore;
use extraction_engine::orchestration::workflow::InProcessOrchestrator;
use extraction_engine::utils::config::AppConfig;


//
// COMMAND LINE
//

#[derive(Parser, Debug)]
#[command(name = "extraction_engine")]
#[command(about = "Paginated order and fill history extraction", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch, merge and deduplicate history for a set of symbols
    Extract(ExtractArgs),

    /// Print the symbols currently online
    Symbols,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Comma-separated symbols (e.g. BTCUSDT,ETHUSDT)
    #[arg(short, long, value_delimiter = ',')]
    symbols: Vec<String>,

    /// Extract every online symbol instead of --symbols
    #[arg(long, conflicts_with = "symbols")]
    all_symbols: bool,

    /// Window start, milliseconds since epoch
    #[arg(long)]
    start_time: Option<i64>,

    /// Window end, milliseconds since epoch
    #[arg(long)]
    end_time: Option<i64>,

    /// Record kind (defaults to the configured one)
    #[arg(long, value_enum)]
    kind: Option<KindArg>,

    /// Execution mode (defaults to the configured one)
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Write the JSON result here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also store the result under the configured storage root
    #[arg(long)]
    persist: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Orders,
    Fills,
}

impl From<KindArg> for RecordKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Orders => RecordKind::Orders,
            KindArg::Fills => RecordKind::Fills,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Local,
    Batch,
}

impl From<ModeArg> for ExecutionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Local => ExecutionMode::Local,
            ModeArg::Batch => ExecutionMode::Batch,
        }
    }
}


//
// ENTRY POINT
//

#[tokio::main]
async fn main() -> Result<()> {
    // #1. Environment, configuration and logging
    dotenv::dotenv().ok();
    let config: AppConfig = AppConfig::load().context("failed to load configuration")?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level.as_str()),
    )
    .init();

    let cli = Cli::parse();
    info!(">>> Extraction Engine is Starting... <<<");

    // #2. Shared exchange client
    let client: Arc<dyn ExchangeHistoryClient> = build_client_from_env(&config)?;
    let engine = ExtractionEngine::new(Arc::clone(&client), &config);

    match cli.command {
        Commands::Symbols => {
            for symbol in engine.list_symbols().await? {
                println!("{}", symbol);
            }
            Ok(())
        }
        Commands::Extract(args) => run_extract(args, engine, client, &config).await,
    }
}

async fn run_extract(
    args: ExtractArgs,
    engine: ExtractionEngine,
    client: Arc<dyn ExchangeHistoryClient>,
    config: &AppConfig,
) -> Result<()> {
    let kind: RecordKind = args.kind.map(RecordKind::from).unwrap_or(config.record_kind);
    let mode: ExecutionMode = args.mode.map(ExecutionMode::from).unwrap_or(config.execution_mode);

    // #1. Resolve symbols
    let symbols: Vec<String> = if args.all_symbols {
        let listed = engine.list_symbols().await?;
        info!("Resolved {} online symbol(s)", listed.len());
        listed
    } else {
        args.symbols
    };

    // #2. Attach optional collaborators
    let mut engine = engine;
    if mode == ExecutionMode::Batch {
        let orchestrator = InProcessOrchestrator::new(
            client,
            config.pagination_settings(),
            config.batch_settings(),
            config.max_workers,
        );
        engine = engine.with_orchestrator(Arc::new(orchestrator));
    }
    if args.persist || config.persist_results {
        let store = LocalObjectStore::new(config.storage_root());
        engine = engine.with_store(Arc::new(store), config.storage_bucket.clone());
    }

    // #3. Run
    let request = ExtractionRequest {
        symbols,
        window: TimeWindow { start_time: args.start_time, end_time: args.end_time },
        kind,
    };
    let result: ExtractionResult = engine.run(&request, mode).await?;

    // #4. Emit
    let json: String = serde_json::to_string_pretty(&result)?;
    match &args.output {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Wrote {} record(s) to {}", result.total_orders, path.display());
        }
        None => println!("{}", json),
    }

    if !result.success {
        warn!("No symbol produced data ({} failure(s))", result.failed_symbols.len());
        bail!("extraction failed for every requested symbol");
    }
    Ok(())
}
