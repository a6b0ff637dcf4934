//! Electrode type catalogs.
//!
//! Lookups ignore ASCII case, so `plx24` finds `PLX24`.

use electronav_core::error::{ElectronavError, Result};
use electronav_core::models::{ElectrodeColors, ElectrodeType};
use electronav_core::ports::ElectrodeCatalog;
use serde::Deserialize;
use std::fs;
use std::path::Path;

fn find(types: &[ElectrodeType], id: &str) -> Result<ElectrodeType> {
    types
        .iter()
        .find(|t| t.id.eq_ignore_ascii_case(id.trim()))
        .cloned()
        .ok_or_else(|| ElectronavError::UnknownElectrodeType { id: id.to_string() })
}

fn probe(
    id: &str,
    diameter: f64,
    tip_length: f64,
    contact_diameter: f64,
    contact_spacing: f64,
    contacts: usize,
    contact_colour: [f32; 3],
) -> ElectrodeType {
    ElectrodeType {
        id: id.to_string(),
        diameter,
        tip_length,
        contact_diameter,
        contact_spacing,
        default_contact_number: contacts,
        colors: ElectrodeColors { contact: contact_colour, ..ElectrodeColors::default() },
    }
}

/// Common laminar probes and single-channel microelectrodes (mm)
#[derive(Debug, Clone)]
pub struct BuiltinCatalog {
    types: Vec<ElectrodeType>,
}

impl BuiltinCatalog {
    pub fn new() -> Self {
        let types = vec![
            probe("PLX24", 0.185, 0.3, 0.015, 0.1, 24, [1.0, 0.8, 0.0]),
            probe("PLX16", 0.185, 0.3, 0.015, 0.15, 16, [1.0, 0.8, 0.0]),
            probe("PLX32", 0.21, 0.3, 0.015, 0.075, 32, [1.0, 0.8, 0.0]),
            probe("NN32", 0.05, 0.05, 0.0177, 0.05, 32, [0.0, 0.8, 1.0]),
            probe("FHC", 0.125, 0.05, 0.002, 0.0, 1, [1.0, 0.2, 0.2]),
        ];
        Self { types }
    }
}

impl Default for BuiltinCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ElectrodeCatalog for BuiltinCatalog {
    fn lookup(&self, id: &str) -> Result<ElectrodeType> {
        find(&self.types, id)
    }

    fn list(&self) -> Vec<ElectrodeType> {
        self.types.clone()
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "electrode")]
    electrodes: Vec<ElectrodeType>,
}

/// Catalog read from a TOML file of `[[electrode]]` tables
#[derive(Debug, Clone)]
pub struct FileCatalog {
    types: Vec<ElectrodeType>,
}

impl FileCatalog {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let catalog = Self::parse(&content).map_err(|e| match e {
            ElectronavError::Serialization(reason) => {
                ElectronavError::Serialization(format!("{}: {}", path.display(), reason))
            }
            other => other,
        })?;
        tracing::debug!(path = %path.display(), types = catalog.types.len(), "Loaded electrode catalog");
        Ok(catalog)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let file: CatalogFile =
            toml::from_str(content).map_err(|e| ElectronavError::Serialization(e.to_string()))?;

        for (i, kind) in file.electrodes.iter().enumerate() {
            kind.validate()?;
            if file.electrodes[..i].iter().any(|t| t.id.eq_ignore_ascii_case(&kind.id)) {
                return Err(ElectronavError::invalid(
                    "electrode catalog",
                    format!("duplicate electrode id {}", kind.id),
                ));
            }
        }
        Ok(Self { types: file.electrodes })
    }
}

impl ElectrodeCatalog for FileCatalog {
    fn lookup(&self, id: &str) -> Result<ElectrodeType> {
        find(&self.types, id)
    }

    fn list(&self) -> Vec<ElectrodeType> {
        self.types.clone()
    }
}
