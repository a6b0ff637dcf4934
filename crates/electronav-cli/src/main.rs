//! ElectroNav CLI - Command-line interface
//!
//! Grid and catalog inspection, transform application, electrode
//! localisation, slice resolution and the recording history.

mod cli;
mod commands;
mod config_loader;
mod errors;
mod output;
mod output_types;

use clap::Parser;
use cli::Cli;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(error) = commands::execute(cli) {
        errors::from_anyhow(error).display();
        std::process::exit(1);
    }
}
