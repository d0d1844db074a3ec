//! # mc33
//!
//! Topologically correct isosurface extraction for Rust.
//!
//! This is the umbrella crate that provides convenient access to all mc33 functionality.
//! You can use this crate to get everything in one place, or use individual crates for
//! more granular control over dependencies.
//!
//! ## Features
//!
//! - **Core**: Scalar fields, mesh sinks and the triangle surface with its validity checks
//! - **Extract**: Marching Cubes 33 extraction with ambiguity resolution and vertex sharing
//!
//! ## Quick Start
//!
//! ```rust
//! use mc33::prelude::*;
//!
//! // Signed distance to a sphere, negative inside
//! let grid = create_sphere_volume(Point3f::origin(), 0.6, [12, 12, 12], [2.0, 2.0, 2.0]).unwrap();
//!
//! // Extract the zero level set
//! let surface = marching_cubes33(&grid, 0.0).unwrap();
//! assert!(surface.is_closed());
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: Enables extract
//! - `extract`: MC33 isosurface extraction
//!
//! The core data structures of `mc33-core` are always available.
//! - `all`: Enables all features

// Re-export core functionality
pub use mc33_core::*;

// Re-export sub-crates
#[cfg(feature = "extract")]
pub use mc33_extract as extract;

/// Convenient imports for common use cases
pub mod prelude {
    pub use mc33_core::*;

    #[cfg(feature = "extract")]
    pub use mc33_extract::{
        create_sphere_volume, marching_cubes33, marching_cubes33_with_normals, CaseTable,
        ExtractionStats, Mc33, Mc33Config,
    };
}
