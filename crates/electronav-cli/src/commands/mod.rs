//! Command implementations

mod config;
mod electrodes;
mod grid;
mod history;
mod locate;
mod session;
mod slice;
mod transform;

use crate::cli::{Cli, Commands, SessionCommands};
use crate::config_loader::{load_catalog, load_config};
use crate::output::OutputWriter;
use anyhow::Result;

/// Execute a CLI command
pub fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let config = load_config(&cli)?;
    let catalog_path = cli.catalog.as_deref();

    match &cli.command {
        Commands::Grid(args) => grid::execute(args, &config, &output),
        Commands::Electrodes => electrodes::execute(load_catalog(catalog_path)?.as_ref(), &output),
        Commands::Transform(args) => transform::execute(args, &output),
        Commands::Locate(args) => {
            locate::execute(args, &config, load_catalog(catalog_path)?.as_ref(), &output)
        }
        Commands::Slice(args) => slice::execute(args, &config, &output),
        Commands::Session(args) => match &args.command {
            SessionCommands::Record(record) => {
                session::record(record, &config, load_catalog(catalog_path)?.as_ref(), &output)
            }
        },
        Commands::History(args) => {
            history::execute(args, &config, load_catalog(catalog_path)?.as_ref(), &output)
        }
        Commands::Config => config::execute(&config, &output),
    }
}
