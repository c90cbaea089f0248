//! shipfiles CLI — ship dynamically loaded runtime files with a standalone
//! build.
//!
//! Patches the trace manifests of an emitted build and copies the runtime
//! files they now reference into the output root.

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
