//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

use tenderfeed_core::{
    DeliveryBatcher, JsonLinesSink, ProgressReporter, RunReport, TenderAssembler,
};
use tenderfeed_crawler::{DetailPageEnricher, Enrichment, HttpFetcher};
use tenderfeed_feed::ListingFeed;
use tenderfeed_shared::{AppConfig, init_config, load_config, load_config_from, validate_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// tenderfeed: normalize open SANRAL tenders into queue-ready records.
#[derive(Parser)]
#[command(
    name = "tenderfeed",
    version,
    about = "Scrape open SANRAL tenders and emit canonical tender records.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.tenderfeed/tenderfeed.toml.
    #[arg(long, env = "TENDERFEED_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch the listing feed, assemble every tender and deliver the batches.
    Run {
        /// Override the listing endpoint.
        #[arg(long)]
        listing_url: Option<String>,

        /// Output for the message lines: `-` for stdout or a file path.
        #[arg(short, long)]
        out: Option<String>,

        /// Messages per batch (1-10).
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Assemble a single listing row given as a JSON array.
    Assemble {
        /// The raw row, e.g. '["<a href=\"/tender/1\">RFP1</a>", ...]'.
        row: String,
    },

    /// Scrape one tender detail page and print what was extracted.
    Enrich {
        /// Detail page URL.
        url: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so stdout can
/// carry message output.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "tenderfeed=info",
        1 => "tenderfeed=debug",
        _ => "tenderfeed=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;

    match cli.command {
        Command::Run {
            listing_url,
            out,
            batch_size,
        } => {
            let mut config = resolve_config(config_path.as_ref())?;
            if let Some(listing_url) = listing_url {
                config.portal.listing_url = listing_url;
            }
            if let Some(out) = out {
                config.delivery.output = out;
            }
            if let Some(batch_size) = batch_size {
                config.delivery.batch_size = batch_size;
            }
            cmd_run(&config).await
        }
        Command::Assemble { row } => cmd_assemble(&resolve_config(config_path.as_ref())?, &row).await,
        Command::Enrich { url } => cmd_enrich(&resolve_config(config_path.as_ref())?, &url).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path.as_ref()).await,
        },
    }
}

/// File values over defaults; an explicit `--config` must exist.
fn resolve_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(config: &AppConfig) -> Result<()> {
    validate_config(config)?;

    let listing_url = Url::parse(&config.portal.listing_url)
        .map_err(|e| eyre!("invalid listing URL '{}': {e}", config.portal.listing_url))?;

    let feed = ListingFeed::new(listing_url, &config.http)?;
    let assembler = TenderAssembler::new(&config.portal, HttpFetcher::new(&config.http)?)?;
    let batcher = DeliveryBatcher::from_config(&config.delivery);

    info!(
        source = %config.portal.source,
        output = %config.delivery.output,
        batch_size = batcher.batch_size(),
        "starting tender run"
    );

    let reporter = CliProgress::new();
    // The output is only truncated once the feed has answered.
    let open_sink = || JsonLinesSink::open(&config.delivery.output);
    let report = tenderfeed_core::run(&feed, &assembler, &batcher, open_sink, &reporter).await?;

    // stdout may be the message stream, so the summary goes to stderr.
    eprintln!();
    eprintln!("  Run complete");
    eprintln!("  Run ID:    {}", report.run_id);
    eprintln!("  Rows:      {}", report.rows);
    eprintln!("  Processed: {}", report.processed);
    eprintln!("  Skipped:   {}", report.skipped);
    eprintln!("  Sent:      {}", report.sent);
    eprintln!("  Failed:    {}", report.failed);
    eprintln!("  Time:      {:.1}s", report.elapsed.as_secs_f64());
    eprintln!();

    Ok(())
}

async fn cmd_assemble(config: &AppConfig, row: &str) -> Result<()> {
    let row: serde_json::Value =
        serde_json::from_str(row).map_err(|e| eyre!("row is not valid JSON: {e}"))?;

    let assembler = TenderAssembler::new(&config.portal, HttpFetcher::new(&config.http)?)?;
    let tender = assembler
        .try_assemble(&row)
        .await
        .map_err(|reason| eyre!("row rejected: {reason}"))?;

    println!("{}", serde_json::to_string_pretty(&tender)?);
    Ok(())
}

async fn cmd_enrich(config: &AppConfig, url: &str) -> Result<()> {
    let url = Url::parse(url).map_err(|e| eyre!("invalid URL '{url}': {e}"))?;

    let enricher = DetailPageEnricher::new(HttpFetcher::new(&config.http)?);
    match enricher.enrich(&url).await {
        Enrichment::Available(fields) => {
            println!("{}", serde_json::to_string_pretty(&fields)?);
            Ok(())
        }
        Enrichment::Unavailable { reason } => {
            Err(eyre!("detail page unavailable: {reason}"))
        }
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(path: Option<&PathBuf>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn row_processed(&self, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Assembling tenders [{current}/{total}]"));
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}
