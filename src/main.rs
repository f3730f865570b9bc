mod auth;
mod cli;
mod config;
mod error;
mod http;
mod metrics;
mod output;
mod providers;
mod queue;
mod scheduler;
mod sinks;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    output::print_banner();
    info!("Starting QueueLens - CircleCI queue depth reporter");
    cli.execute().await?;

    Ok(())
}
