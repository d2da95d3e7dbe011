mod cli;
mod commands;
mod config;
mod error;
mod model;
mod output;
mod view;
mod watch;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting cipanel - CI pipeline activity panel");
    cli.execute().await?;

    Ok(())
}
