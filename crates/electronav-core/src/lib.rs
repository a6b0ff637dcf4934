//! ElectroNav Core - Domain models, configuration, and collaborator ports
//!
//! This crate holds the electrode/session state model, the recording grid
//! geometry, volume layers, and the port traits implemented by adapters.

pub mod config;
pub mod error;
pub mod models;
pub mod ports;

pub use error::{ElectronavError, Result};
