//! tenderfeed CLI: scrape open SANRAL tenders into canonical queue messages.
//!
//! Reads the portal's listing feed, enriches each tender from its detail
//! page, and writes batched JSON messages for downstream ingestion.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
