//! Configuration and collaborator loading for CLI commands

use crate::cli::Cli;
use anyhow::{Context, Result};
use electronav_core::config::{parse_hemisphere_offset, CliConfigOverrides, LayeredConfig};
use electronav_core::ports::ElectrodeCatalog;
use electronav_store::{BuiltinCatalog, FileCatalog};
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "electronav.toml";

/// Build the layered configuration: defaults, file, environment, then flags
pub fn load_config(cli: &Cli) -> Result<LayeredConfig> {
    let mut config = LayeredConfig::with_defaults();

    let file = match &cli.config {
        Some(path) => Some(path.clone()),
        None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()),
    };
    if let Some(path) = file {
        tracing::debug!(path = %path.display(), "Reading configuration file");
        config = config
            .load_from_file(&path)
            .with_context(|| format!("Failed to load configuration file {}", path.display()))?;
    }

    let mut config = config.load_from_env();
    config.update_from_cli(overrides(cli)?);
    Ok(config)
}

fn overrides(cli: &Cli) -> Result<CliConfigOverrides> {
    let hemisphere_offset = cli
        .hemisphere_offset
        .as_deref()
        .map(parse_hemisphere_offset)
        .transpose()?;

    Ok(CliConfigOverrides {
        quality_levels: cli.quality_levels,
        hemisphere_offset,
        smoothing_sigma: cli.smoothing_sigma,
        default_electrode: None,
        history_path: cli.history.clone(),
    })
}

/// Electrode catalog from `--catalog`, or the built-in probes
pub fn load_catalog(path: Option<&Path>) -> Result<Box<dyn ElectrodeCatalog>> {
    match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Using electrode catalog file");
            let catalog = FileCatalog::load(path)
                .with_context(|| format!("Failed to load electrode catalog {}", path.display()))?;
            Ok(Box::new(catalog))
        }
        None => Ok(Box::new(BuiltinCatalog::new())),
    }
}
