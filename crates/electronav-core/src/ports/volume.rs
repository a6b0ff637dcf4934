use crate::error::Result;
use crate::models::LoadedVolume;
use std::path::Path;

/// Port for volumetric image loading (NIfTI and friends).
///
/// Format specifics stay in the adapter; the core only needs the shape below.
pub trait VolumeLoader {
    fn load(&self, path: &Path) -> Result<LoadedVolume>;
}
