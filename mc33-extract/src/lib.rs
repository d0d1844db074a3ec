//! # mc33 Extract
//!
//! Topologically correct isosurface extraction with Marching Cubes 33.
//!
//! Each grid cell is classified by the signs of its eight corners into one of
//! the 15 base configurations. Faces and cell interiors whose topology is
//! ambiguous are resolved with bilinear and trilinear tests, so neighbouring
//! cells always agree on shared faces and closed level sets give closed meshes.
//!
//! The case table behind the classification is generated from the cube's
//! topology when first needed and shared by all extractors.

pub mod ambiguity;
mod atlas;
pub mod case_table;
pub mod classifier;
pub mod cube;
pub mod mc33;
pub mod sampler;
pub mod vertex_cache;

// Re-export commonly used items
pub use ambiguity::{AmbiguityResolver, Case13, FaceTests};
pub use case_table::{CaseDescriptor, CaseId, CaseTable, Outcome, PatternEntry, Probe, Variant};
pub use classifier::{CellClassifier, Classification};
pub use mc33::*;
pub use sampler::PointSampler;
pub use vertex_cache::{BufferPair, EdgeKey, VertexCache};

pub use mc33_core::{ArrayGrid, Error, MeshSink, NormalMeshSink, Result, ScalarField, Surface};
