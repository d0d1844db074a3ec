//! Triangle surface produced by isosurface extraction

use crate::point::*;
use crate::traits::{MeshSink, NormalMeshSink};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default squared-distance tolerance for [`are_equivalent`]
pub const EQUIVALENCE_EPSILON: f32 = 1e-9;

/// A list-backed triangle surface with optional per-vertex normals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
    pub normals: Option<Vec<Vector3f>>,
}

impl Surface {
    /// Create a new empty surface
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            normals: None,
        }
    }

    /// Create a surface from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of triangles
    pub fn triangle_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the surface has no triangles
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Vertex positions in insertion order
    pub fn vertices(&self) -> &[Point3f] {
        &self.vertices
    }

    /// Triangle indices flattened into consecutive triples
    pub fn triangles(&self) -> Vec<usize> {
        self.faces.iter().flatten().copied().collect()
    }

    /// Per-vertex normals, if the surface was built by a normal-producing extraction
    pub fn normals(&self) -> Option<&[Vector3f]> {
        self.normals.as_deref()
    }

    /// Corner positions of one triangle; `None` when an index is out of range
    pub fn triangle_position(&self, face: &[usize; 3]) -> Option<[Point3f; 3]> {
        Some([
            *self.vertices.get(face[0])?,
            *self.vertices.get(face[1])?,
            *self.vertices.get(face[2])?,
        ])
    }

    /// The three corner positions of every triangle, or `None` if any triangle
    /// refers to a missing vertex
    pub fn triangle_positions(&self) -> Option<Vec<[Point3f; 3]>> {
        self.faces.iter().map(|f| self.triangle_position(f)).collect()
    }

    /// Calculate unit face normals following the triangle winding.
    /// Triangles with missing vertices get a zero normal.
    pub fn calculate_face_normals(&self) -> Vec<Vector3f> {
        self.faces
            .iter()
            .map(|f| match self.triangle_position(f) {
                Some([v0, v1, v2]) => {
                    let n = (v1 - v0).cross(&(v2 - v0));
                    n.try_normalize(0.0).unwrap_or_else(Vector3f::zeros)
                }
                None => Vector3f::zeros(),
            })
            .collect()
    }

    /// A surface is closed when every undirected edge borders exactly two triangles.
    /// A surface without triangles is closed.
    pub fn is_closed(&self) -> bool {
        let mut edge_counts: HashMap<(usize, usize), usize> = HashMap::new();
        for face in &self.faces {
            for k in 0..3 {
                let (a, b) = (face[k], face[(k + 1) % 3]);
                let key = if a < b { (a, b) } else { (b, a) };
                *edge_counts.entry(key).or_insert(0) += 1;
            }
        }
        edge_counts.values().all(|&count| count == 2)
    }

    /// Every undirected edge is traversed equally often in both directions.
    ///
    /// This is the closedness that survives vertices snapped onto grid points:
    /// sheets collapsed onto a grid plane leave back-to-back triangle pairs whose
    /// edges border four triangles, but no edge is left open.
    pub fn has_balanced_edges(&self) -> bool {
        let mut balance: HashMap<(usize, usize), i64> = HashMap::new();
        for face in &self.faces {
            for k in 0..3 {
                let (a, b) = (face[k], face[(k + 1) % 3]);
                if a < b {
                    *balance.entry((a, b)).or_insert(0) += 1;
                } else {
                    *balance.entry((b, a)).or_insert(0) -= 1;
                }
            }
        }
        balance.values().all(|&b| b == 0)
    }

    /// Winding-sensitive geometric comparison, see [`are_equivalent`]
    pub fn is_equivalent_to(&self, other: &Surface, epsilon: f32) -> bool {
        are_equivalent(self, other, epsilon)
    }

    /// Clear the surface
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.faces.clear();
        self.normals = None;
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshSink for Surface {
    fn add_vertex(&mut self, position: Point3f) -> usize {
        let index = self.vertices.len();
        self.vertices.push(position);
        if let Some(normals) = self.normals.as_mut() {
            normals.push(Vector3f::zeros());
        }
        index
    }

    fn add_triangle(&mut self, i: usize, j: usize, k: usize) {
        self.faces.push([i, j, k]);
    }
}

impl NormalMeshSink for Surface {
    fn add_vertex_with_normal(&mut self, position: Point3f, normal: Vector3f) -> usize {
        let existing = self.vertices.len();
        let normals = self
            .normals
            .get_or_insert_with(|| vec![Vector3f::zeros(); existing]);
        normals.push(normal);
        self.vertices.push(position);
        existing
    }
}

/// True when `a` and `b` hold the same number of triangles and every triangle of `a`
/// matches some triangle of `b` up to a cyclic rotation of its corners.
///
/// Reflections are not accepted, so the comparison respects winding. Corners match
/// when their squared distance is below `epsilon`. Vertex numbering and triangle
/// order are ignored.
pub fn are_equivalent(a: &Surface, b: &Surface, epsilon: f32) -> bool {
    if a.triangle_count() != b.triangle_count() {
        return false;
    }
    let (Some(ours), Some(theirs)) = (a.triangle_positions(), b.triangle_positions()) else {
        return false;
    };
    ours.iter()
        .all(|t| theirs.iter().any(|u| triangles_match(t, u, epsilon)))
}

fn triangles_match(t: &[Point3f; 3], u: &[Point3f; 3], epsilon: f32) -> bool {
    (0..3).any(|offset| {
        (0..3).all(|k| points_approx_equal(&t[k], &u[(k + offset) % 3], epsilon))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetrahedron() -> Surface {
        let vertices = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
            Point3f::new(0.0, 0.0, 1.0),
        ];
        let faces = vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]];
        Surface::from_vertices_and_faces(vertices, faces)
    }

    #[test]
    fn test_empty_surface_is_closed() {
        assert!(Surface::new().is_closed());
        assert!(Surface::new().is_empty());
    }

    #[test]
    fn test_tetrahedron_is_closed() {
        let mut mesh = tetrahedron();
        assert!(mesh.is_closed());

        mesh.faces.pop();
        assert!(!mesh.is_closed());
    }

    #[test]
    fn test_flattened_triangles() {
        let mesh = tetrahedron();
        assert_eq!(mesh.triangles()[..6], [0, 2, 1, 0, 1, 3]);
        assert_eq!(mesh.triangles().len(), 12);
    }

    #[test]
    fn test_equivalence_ignores_numbering_and_rotation() {
        let a = tetrahedron();

        // Same geometry, vertices renumbered and triangle corners rotated
        let vertices = vec![
            Point3f::new(0.0, 0.0, 1.0),
            Point3f::new(0.0, 1.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.0, 0.0, 0.0),
        ];
        let faces = vec![[2, 0, 3], [1, 2, 3], [3, 0, 1], [2, 1, 0]];
        let b = Surface::from_vertices_and_faces(vertices, faces);

        assert!(are_equivalent(&a, &b, EQUIVALENCE_EPSILON));
        assert!(b.is_equivalent_to(&a, EQUIVALENCE_EPSILON));
    }

    #[test]
    fn test_equivalence_respects_winding() {
        let a = tetrahedron();
        let mut b = tetrahedron();
        b.faces[0] = [0, 1, 2];
        assert!(!are_equivalent(&a, &b, EQUIVALENCE_EPSILON));

        let mut c = tetrahedron();
        c.faces.pop();
        assert!(!are_equivalent(&a, &c, EQUIVALENCE_EPSILON));
    }

    #[test]
    fn test_equivalence_rejects_dangling_index() {
        let a = tetrahedron();
        let mut b = tetrahedron();
        b.faces[3] = [1, 2, 7];
        assert!(b.triangle_positions().is_none());
        assert!(!are_equivalent(&a, &b, EQUIVALENCE_EPSILON));
        assert!(!are_equivalent(&b, &a, EQUIVALENCE_EPSILON));
        assert_eq!(b.calculate_face_normals()[3], Vector3f::zeros());
    }

    #[test]
    fn test_back_to_back_pair_is_balanced() {
        let mut mesh = tetrahedron();
        assert!(mesh.has_balanced_edges());

        // A doubled sheet glued onto one face: balanced but not a 2-manifold
        mesh.faces.push([0, 2, 1]);
        mesh.faces.push([0, 1, 2]);
        assert!(mesh.has_balanced_edges());
        assert!(!mesh.is_closed());

        mesh.faces.pop();
        assert!(!mesh.has_balanced_edges());
    }

    #[test]
    fn test_normals_stay_aligned() {
        let mut mesh = Surface::new();
        mesh.add_vertex(Point3f::origin());
        let i = mesh.add_vertex_with_normal(Point3f::new(1.0, 0.0, 0.0), Vector3f::x());
        mesh.add_vertex(Point3f::new(0.0, 1.0, 0.0));

        assert_eq!(i, 1);
        let normals = mesh.normals().unwrap();
        assert_eq!(normals.len(), 3);
        assert_eq!(normals[1], Vector3f::x());
        assert_eq!(normals[2], Vector3f::zeros());
    }

    #[test]
    fn test_face_normals_follow_winding() {
        let mut mesh = Surface::new();
        let a = mesh.add_vertex(Point3f::new(0.5, 0.0, 0.0));
        let b = mesh.add_vertex(Point3f::new(0.0, 0.5, 0.0));
        let c = mesh.add_vertex(Point3f::new(0.0, 0.0, 0.5));
        mesh.add_triangle(a, b, c);

        let n = mesh.calculate_face_normals()[0];
        assert!(n.x > 0.0 && n.y > 0.0 && n.z > 0.0);
    }
}
