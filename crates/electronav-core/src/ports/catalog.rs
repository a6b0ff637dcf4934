use crate::error::Result;
use crate::models::ElectrodeType;

/// Port for electrode type lookup.
///
/// A miss must surface as `ElectronavError::UnknownElectrodeType`.
pub trait ElectrodeCatalog {
    /// Look up an electrode type by its id
    fn lookup(&self, id: &str) -> Result<ElectrodeType>;

    /// All known electrode types, in display order
    fn list(&self) -> Vec<ElectrodeType>;
}
