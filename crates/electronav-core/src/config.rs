use crate::error::{ElectronavError, Result};
use crate::models::{GridModel, GridSpec, HemisphereFolding, LayerOptions, QualityScale};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for ElectroNav
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// Number of contact quality levels (size of the quality colour map)
    pub quality_levels: ConfigValue<usize>,
    /// Atlas hemisphere label offset; `None` disables folding
    pub hemisphere_offset: ConfigValue<Option<f32>>,
    /// Default Gaussian smoothing sigma for overlay layers
    pub smoothing_sigma: ConfigValue<f64>,
    /// Electrode type used for the first electrode of a new session
    pub default_electrode: ConfigValue<String>,
    /// Recording history spreadsheet
    pub history_path: ConfigValue<PathBuf>,
    /// Recording grid geometry
    pub grid: ConfigValue<GridSpec>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            quality_levels: ConfigValue::new(5, ConfigSource::Default),
            hemisphere_offset: ConfigValue::new(
                Some(HemisphereFolding::default().offset),
                ConfigSource::Default,
            ),
            smoothing_sigma: ConfigValue::new(0.0, ConfigSource::Default),
            default_electrode: ConfigValue::new("PLX24".to_string(), ConfigSource::Default),
            history_path: ConfigValue::new(
                PathBuf::from("electronav_sessions.csv"),
                ConfigSource::Default,
            ),
            grid: ConfigValue::new(GridSpec::default(), ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ElectronavError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| ElectronavError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        // Update values from file
        if let Some(levels) = file_config.quality_levels {
            self.quality_levels.update(check_quality_levels(levels)?, ConfigSource::File);
        }

        if let Some(offset) = file_config.hemisphere_offset {
            let offset = match offset {
                OffsetSetting::Number(value) => Some(check_offset(value)?),
                OffsetSetting::Text(text) => parse_hemisphere_offset(&text)?,
            };
            self.hemisphere_offset.update(offset, ConfigSource::File);
        }

        if let Some(sigma) = file_config.smoothing_sigma {
            self.smoothing_sigma.update(check_sigma(sigma)?, ConfigSource::File);
        }

        if let Some(electrode) = file_config.default_electrode {
            self.default_electrode.update(electrode, ConfigSource::File);
        }

        if let Some(history_path) = file_config.history_path {
            self.history_path.update(history_path, ConfigSource::File);
        }

        if let Some(grid) = file_config.grid {
            grid.validate().map_err(|e| ElectronavError::ConfigInvalid {
                key: "grid".to_string(),
                reason: e.to_string(),
            })?;
            self.grid.update(grid, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // ELECTRONAV_QUALITY_LEVELS
        if let Ok(levels_str) = env::var("ELECTRONAV_QUALITY_LEVELS") {
            match parse_quality_levels(&levels_str) {
                Ok(levels) => self.quality_levels.update(levels, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid ELECTRONAV_QUALITY_LEVELS value '{}': expected a positive integer",
                    levels_str
                ),
            }
        }

        // ELECTRONAV_HEMISPHERE_OFFSET
        if let Ok(offset_str) = env::var("ELECTRONAV_HEMISPHERE_OFFSET") {
            match parse_hemisphere_offset(&offset_str) {
                Ok(offset) => self.hemisphere_offset.update(offset, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid ELECTRONAV_HEMISPHERE_OFFSET value '{}': expected a positive number or 'none'",
                    offset_str
                ),
            }
        }

        // ELECTRONAV_SMOOTHING_SIGMA
        if let Ok(sigma_str) = env::var("ELECTRONAV_SMOOTHING_SIGMA") {
            match parse_smoothing_sigma(&sigma_str) {
                Ok(sigma) => self.smoothing_sigma.update(sigma, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid ELECTRONAV_SMOOTHING_SIGMA value '{}': expected a number >= 0",
                    sigma_str
                ),
            }
        }

        // ELECTRONAV_DEFAULT_ELECTRODE
        if let Ok(electrode) = env::var("ELECTRONAV_DEFAULT_ELECTRODE") {
            self.default_electrode.update(electrode, ConfigSource::Environment);
        }

        // ELECTRONAV_HISTORY_PATH
        if let Ok(path) = env::var("ELECTRONAV_HISTORY_PATH") {
            self.history_path.update(PathBuf::from(path), ConfigSource::Environment);
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(levels) = overrides.quality_levels {
            self.quality_levels.update(levels, ConfigSource::Cli);
        }

        if let Some(offset) = overrides.hemisphere_offset {
            self.hemisphere_offset.update(offset, ConfigSource::Cli);
        }

        if let Some(sigma) = overrides.smoothing_sigma {
            self.smoothing_sigma.update(sigma, ConfigSource::Cli);
        }

        if let Some(electrode) = overrides.default_electrode {
            self.default_electrode.update(electrode, ConfigSource::Cli);
        }

        if let Some(history_path) = overrides.history_path {
            self.history_path.update(history_path, ConfigSource::Cli);
        }
    }

    pub fn quality_scale(&self) -> Result<QualityScale> {
        QualityScale::new(self.quality_levels.value)
    }

    pub fn grid_model(&self) -> Result<GridModel> {
        GridModel::new(self.grid.value.clone())
    }

    /// Display options for the layer at stacking position `number`
    pub fn layer_options(&self, number: usize) -> LayerOptions {
        LayerOptions {
            opacity: if number == 1 { 1.0 } else { 0.5 },
            smoothing_sigma: if number == 1 { 0.0 } else { self.smoothing_sigma.value },
            folding: self.hemisphere_offset.value.map(HemisphereFolding::new),
        }
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "quality_levels".to_string(),
            (self.quality_levels.value.to_string(), self.quality_levels.source),
        );

        map.insert(
            "hemisphere_offset".to_string(),
            (
                self.hemisphere_offset
                    .value
                    .map(|o| o.to_string())
                    .unwrap_or_else(|| "none".to_string()),
                self.hemisphere_offset.source,
            ),
        );

        map.insert(
            "smoothing_sigma".to_string(),
            (self.smoothing_sigma.value.to_string(), self.smoothing_sigma.source),
        );

        map.insert(
            "default_electrode".to_string(),
            (self.default_electrode.value.clone(), self.default_electrode.source),
        );

        map.insert(
            "history_path".to_string(),
            (self.history_path.value.display().to_string(), self.history_path.source),
        );

        let grid = &self.grid.value;
        map.insert(
            "grid".to_string(),
            (
                format!(
                    "{} rows, {} mm pitch, {} mm holes",
                    grid.holes_per_dim(),
                    grid.inter_hole_spacing,
                    grid.hole_diameter
                ),
                self.grid.source,
            ),
        );

        map
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
enum OffsetSetting {
    Number(f64),
    Text(String),
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    quality_levels: Option<usize>,
    hemisphere_offset: Option<OffsetSetting>,
    smoothing_sigma: Option<f64>,
    default_electrode: Option<String>,
    history_path: Option<PathBuf>,
    grid: Option<GridSpec>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub quality_levels: Option<usize>,
    pub hemisphere_offset: Option<Option<f32>>,
    pub smoothing_sigma: Option<f64>,
    pub default_electrode: Option<String>,
    pub history_path: Option<PathBuf>,
}

/// Parse the number of quality levels from string
pub fn parse_quality_levels(s: &str) -> Result<usize> {
    let levels = s.trim().parse::<usize>().map_err(|_| ElectronavError::ConfigInvalid {
        key: "quality_levels".to_string(),
        reason: format!("Invalid quality level count: {}", s),
    })?;
    check_quality_levels(levels)
}

/// Parse a hemisphere offset; `none`, `off`, or `0` disable folding
pub fn parse_hemisphere_offset(s: &str) -> Result<Option<f32>> {
    match s.trim().to_lowercase().as_str() {
        "none" | "off" | "0" => Ok(None),
        other => {
            let value = other.parse::<f64>().map_err(|_| ElectronavError::ConfigInvalid {
                key: "hemisphere_offset".to_string(),
                reason: format!("Invalid hemisphere offset: {}. Use a number or none", s),
            })?;
            check_offset(value).map(Some)
        }
    }
}

/// Parse a smoothing sigma from string
pub fn parse_smoothing_sigma(s: &str) -> Result<f64> {
    let sigma = s.trim().parse::<f64>().map_err(|_| ElectronavError::ConfigInvalid {
        key: "smoothing_sigma".to_string(),
        reason: format!("Invalid smoothing sigma: {}", s),
    })?;
    check_sigma(sigma)
}

fn check_quality_levels(levels: usize) -> Result<usize> {
    if levels == 0 {
        return Err(ElectronavError::ConfigInvalid {
            key: "quality_levels".to_string(),
            reason: "At least one quality level is required".to_string(),
        });
    }
    Ok(levels)
}

fn check_offset(value: f64) -> Result<f32> {
    if !(value.is_finite() && value > 0.0) {
        return Err(ElectronavError::ConfigInvalid {
            key: "hemisphere_offset".to_string(),
            reason: format!("Offset must be a positive number, got {}", value),
        });
    }
    Ok(value as f32)
}

fn check_sigma(sigma: f64) -> Result<f64> {
    if !(sigma.is_finite() && sigma >= 0.0) {
        return Err(ElectronavError::ConfigInvalid {
            key: "smoothing_sigma".to_string(),
            reason: format!("Sigma must be >= 0, got {}", sigma),
        });
    }
    Ok(sigma)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = LayeredConfig::with_defaults();
        assert_eq!(config.quality_levels.value, 5);
        assert_eq!(config.quality_levels.source, ConfigSource::Default);
        assert_eq!(config.hemisphere_offset.value, Some(1000.0));
        assert_eq!(config.default_electrode.value, "PLX24");
        assert_eq!(config.grid.value.holes_per_dim(), 17);
    }

    #[test]
    fn test_config_precedence() {
        let mut value = ConfigValue::new(100, ConfigSource::Default);

        value.update(200, ConfigSource::File);
        assert_eq!(value.value, 200);
        assert_eq!(value.source, ConfigSource::File);

        value.update(300, ConfigSource::Environment);
        assert_eq!(value.value, 300);

        value.update(400, ConfigSource::Cli);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);

        // Lower precedence should not override
        value.update(500, ConfigSource::File);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
quality_levels = 7
hemisphere_offset = "none"
smoothing_sigma = 1.5
default_electrode = "NN32"
history_path = "rig2.csv"

[grid]
holes_per_column = [3, 5, 3]
inter_hole_spacing = 0.8
hole_diameter = 0.4
"#
        )
        .unwrap();

        let config = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap();

        assert_eq!(config.quality_levels.value, 7);
        assert_eq!(config.quality_levels.source, ConfigSource::File);
        assert_eq!(config.hemisphere_offset.value, None);
        assert_eq!(config.smoothing_sigma.value, 1.5);
        assert_eq!(config.default_electrode.value, "NN32");
        assert_eq!(config.history_path.value, PathBuf::from("rig2.csv"));
        assert_eq!(config.grid.value.holes_per_column, vec![3, 5, 3]);
        assert_eq!(config.grid_model().unwrap().len(), 11);
    }

    #[test]
    fn test_invalid_grid_in_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[grid]
holes_per_column = [3, 0]
inter_hole_spacing = 1.0
hole_diameter = 0.5
"#
        )
        .unwrap();

        let result = LayeredConfig::with_defaults().load_from_file(file.path());
        assert!(matches!(result, Err(ElectronavError::ConfigInvalid { .. })));
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = LayeredConfig::with_defaults();

        let overrides = CliConfigOverrides {
            quality_levels: Some(3),
            hemisphere_offset: Some(Some(500.0)),
            ..CliConfigOverrides::default()
        };

        config.update_from_cli(overrides);

        assert_eq!(config.quality_levels.value, 3);
        assert_eq!(config.quality_levels.source, ConfigSource::Cli);
        assert_eq!(config.hemisphere_offset.value, Some(500.0));
        // These should still be defaults
        assert_eq!(config.smoothing_sigma.source, ConfigSource::Default);
        assert_eq!(config.default_electrode.source, ConfigSource::Default);
    }

    #[test]
    fn test_parse_hemisphere_offset() {
        assert_eq!(parse_hemisphere_offset("1000").unwrap(), Some(1000.0));
        assert_eq!(parse_hemisphere_offset("NONE").unwrap(), None);
        assert_eq!(parse_hemisphere_offset("0").unwrap(), None);
        assert!(parse_hemisphere_offset("-5").is_err());
        assert!(parse_hemisphere_offset("left").is_err());
    }

    #[test]
    fn test_parse_quality_levels_and_sigma() {
        assert_eq!(parse_quality_levels("5").unwrap(), 5);
        assert!(parse_quality_levels("0").is_err());
        assert!(parse_quality_levels("five").is_err());
        assert_eq!(parse_smoothing_sigma("0.75").unwrap(), 0.75);
        assert!(parse_smoothing_sigma("-1").is_err());
    }

    #[test]
    fn test_layer_options() {
        let mut config = LayeredConfig::with_defaults();
        config.smoothing_sigma.update(2.0, ConfigSource::Cli);
        let base = config.layer_options(1);
        assert_eq!(base.smoothing_sigma, 0.0);
        assert_eq!(base.opacity, 1.0);
        let overlay = config.layer_options(2);
        assert_eq!(overlay.smoothing_sigma, 2.0);
        assert_eq!(overlay.folding, Some(HemisphereFolding::new(1000.0)));
    }

    #[test]
    fn test_inspection_map() {
        let config = LayeredConfig::with_defaults();
        let map = config.to_inspection_map();

        assert!(map.contains_key("quality_levels"));
        assert!(map.contains_key("grid"));

        let (offset, source) = &map["hemisphere_offset"];
        assert_eq!(offset, "1000");
        assert_eq!(*source, ConfigSource::Default);
    }
}
