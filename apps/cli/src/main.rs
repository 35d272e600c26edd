//! Predict CLI — vulnerability fix/introduction annotation tool.
//!
//! Looks up CVE records with their commit links normalized, records user
//! annotations, and shows per-vulnerability consensus against a focal user.

mod commands;
mod render;

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
