//! Core traits for mc33

use crate::point::*;

/// Append-only destination for extracted geometry
pub trait MeshSink {
    /// Append a vertex and return its index (indices start at 0 and increase by one)
    fn add_vertex(&mut self, position: Point3f) -> usize;

    /// Append a triangle referencing three previously added vertices
    fn add_triangle(&mut self, i: usize, j: usize, k: usize);
}

/// A sink that also records one unit normal per vertex
pub trait NormalMeshSink: MeshSink {
    /// Append a vertex with its normal and return its index
    fn add_vertex_with_normal(&mut self, position: Point3f, normal: Vector3f) -> usize;
}

impl<S: MeshSink + ?Sized> MeshSink for &mut S {
    fn add_vertex(&mut self, position: Point3f) -> usize {
        (**self).add_vertex(position)
    }

    fn add_triangle(&mut self, i: usize, j: usize, k: usize) {
        (**self).add_triangle(i, j, k)
    }
}

impl<S: NormalMeshSink + ?Sized> NormalMeshSink for &mut S {
    fn add_vertex_with_normal(&mut self, position: Point3f, normal: Vector3f) -> usize {
        (**self).add_vertex_with_normal(position, normal)
    }
}
