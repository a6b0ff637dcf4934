//! ElectroNav Geo - Transforms, slice resolution, and structure outlines
//!
//! This crate maps grid-local electrode geometry into scanner space and
//! derives the 2D slice data consumed by the rendering layer.

pub mod outline;
pub mod placement;
pub mod slice;
pub mod transform;
