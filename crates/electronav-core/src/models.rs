pub mod electrode;
pub mod grid;
pub mod record;
pub mod session;
pub mod volume;

pub use electrode::{
    ContactSelection, DepthComponent, Electrode, ElectrodeColors, ElectrodeGeometry,
    ElectrodeHandle, ElectrodeType, QualityScale, Target,
};
pub use grid::{GridHole, GridModel, GridSpec};
pub use record::{ElectrodeRecord, SessionRecord};
pub use session::Session;
pub use volume::{HemisphereFolding, LayerKind, LayerOptions, LoadedVolume, VolumeLayer};
