//! Port trait definitions
//!
//! These traits define the collaborator interfaces that adapters must implement.

pub mod catalog;
pub mod storage;
pub mod volume;

pub use catalog::ElectrodeCatalog;
pub use storage::{SaveOutcome, SessionHistoryStore};
pub use volume::VolumeLoader;
