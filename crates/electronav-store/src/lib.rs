//! ElectroNav Store - adapters for the core ports
//!
//! Session history (in memory and CSV spreadsheet), electrode catalogs
//! (built in and TOML file) and a NIfTI-1 volume loader.

pub mod catalog;
pub mod history_csv;
pub mod memory;
pub mod nifti;

pub use catalog::{BuiltinCatalog, FileCatalog};
pub use history_csv::CsvHistoryStore;
pub use memory::MemoryHistoryStore;
pub use nifti::NiftiLoader;
