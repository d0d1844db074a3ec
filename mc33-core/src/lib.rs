//! Core data structures and traits for mc33
//!
//! This crate provides the types shared by the isosurface extractor:
//! scalar fields sampled on regular grids, the append-only mesh sinks the
//! extractor writes into, and the list-backed surface with its validity checks.

pub mod point;
pub mod field;
pub mod mesh;
pub mod traits;
pub mod error;

pub use point::*;
pub use field::*;
pub use mesh::*;
pub use traits::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3};
