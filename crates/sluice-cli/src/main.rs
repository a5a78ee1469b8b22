mod targets;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use sluice_client::extractor::{DEFAULT_ELEMENT_ID_TEMPLATE, DEFAULT_ID_PARAM};
use sluice_client::predicate::{DEFAULT_MARKER_WINDOW, DEFAULT_NOT_FOUND_MARKER};
use sluice_client::{FragmentExtractor, MarkerPredicate, ReqwestTransport};
use sluice_core::{
    CongestionController, Driver, DriverState, FetchTimeout, FetchWorker, ResultSink,
    RoundExecutor, SchedulerConfig, Target, TargetQueue, TracingRunReporter,
};
use sluice_store::{DirectoryStore, StoreConfig};

#[derive(Parser)]
#[command(
    name = "sluice",
    version,
    about = "Adaptive-concurrency page fetcher with a saturation breaker"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a contiguous range of numeric ids
    Range {
        /// URL with an `{id}` placeholder, e.g. "https://classicdb.ch/?item={id}"
        #[arg(short, long)]
        url_template: String,

        /// First id (inclusive)
        #[arg(long)]
        first: u64,

        /// Last id (inclusive)
        #[arg(long)]
        last: u64,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Fetch every URL listed in a file (one per line, `#` for comments)
    List {
        /// Path to the target list
        #[arg(short, long)]
        file: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Inter-round delay ceiling in seconds; reaching it stops the run
    #[arg(long, env = "SLUICE_MAX_WAIT", default_value_t = 90.0)]
    max_wait: f64,

    /// Maximum parallel fetches per round
    #[arg(long, env = "SLUICE_MAX_CONCURRENCY", default_value_t = 10)]
    max_concurrency: usize,

    /// Connect timeout per fetch, in seconds
    #[arg(long, env = "SLUICE_CONNECT_TIMEOUT", default_value_t = 3.05)]
    connect_timeout: f64,

    /// Read timeout per fetch, in seconds
    #[arg(long, env = "SLUICE_READ_TIMEOUT", default_value_t = 27.0)]
    read_timeout: f64,

    /// Directory receiving one JSON file per non-empty round
    /// (falls back to SLUICE_OUTPUT_DIR, then `data`)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Marker that identifies a "not found" page
    #[arg(long, env = "SLUICE_NOT_FOUND_MARKER", default_value = DEFAULT_NOT_FOUND_MARKER)]
    not_found_marker: String,

    /// Number of leading body bytes searched for the marker
    #[arg(long, env = "SLUICE_MARKER_WINDOW", default_value_t = DEFAULT_MARKER_WINDOW)]
    marker_window: usize,

    /// Query parameter of the final URL that carries the item id
    #[arg(long, env = "SLUICE_ID_PARAM", default_value = DEFAULT_ID_PARAM)]
    id_param: String,

    /// Element id to extract, with `{id}` replaced by the item id
    #[arg(long, env = "SLUICE_ELEMENT_ID_TEMPLATE", default_value = DEFAULT_ELEMENT_ID_TEMPLATE)]
    element_id_template: String,
}

impl RunArgs {
    fn scheduler_config(&self) -> Result<SchedulerConfig> {
        let timeout = FetchTimeout::new(
            secs("--connect-timeout", self.connect_timeout)?,
            secs("--read-timeout", self.read_timeout)?,
        );
        let config = SchedulerConfig::default()
            .with_max_wait(self.max_wait)
            .with_max_concurrency(self.max_concurrency)
            .with_fetch_timeout(timeout);
        config.validate().context("Invalid scheduler settings")?;
        Ok(config)
    }

    fn store_config(&self) -> Result<StoreConfig> {
        StoreConfig::resolve(self.output_dir.clone()).context("Invalid output directory")
    }
}

fn secs(flag: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .with_context(|| format!("{flag} must be a non-negative number of seconds"))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("sluice=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let (targets, run) = match cli.command {
        Commands::Range {
            url_template,
            first,
            last,
            run,
        } => (targets::from_range(&url_template, first, last)?, run),
        Commands::List { file, run } => (targets::from_file(&file)?, run),
    };

    let state = cmd_run(targets, &run).await?;
    Ok(ExitCode::from(exit_status(state)))
}

async fn cmd_run(targets: Vec<Target>, args: &RunArgs) -> Result<DriverState> {
    let config = args.scheduler_config()?;
    let store_config = args.store_config()?;

    // The only filesystem bootstrap; runs before any round.
    let store = DirectoryStore::open(&store_config)
        .await
        .context("Failed to prepare output directory")?;

    let transport = ReqwestTransport::with_timeout(config.fetch_timeout)
        .context("Failed to create HTTP client")?;
    let predicate = MarkerPredicate::new(&args.not_found_marker, args.marker_window);
    let extractor = FragmentExtractor::new(&args.id_param, &args.element_id_template);

    let worker = FetchWorker::new(transport, predicate, config.fetch_timeout);
    let executor = RoundExecutor::new(
        targets.into_iter().collect::<TargetQueue>(),
        CongestionController::new(&config),
        worker,
        extractor,
    );
    let mut driver = Driver::new(executor, ResultSink::new(store));

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling run");
            on_interrupt.cancel();
        }
    });

    let summary = driver.run(cancel, &TracingRunReporter).await;

    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(summary.state)
}

fn exit_status(state: DriverState) -> u8 {
    match state {
        DriverState::Done => 0,
        DriverState::Tripped => 2,
        DriverState::Cancelled => 130,
        // Non-terminal states never come back from a finished run.
        DriverState::Running | DriverState::Draining => 1,
    }
}
