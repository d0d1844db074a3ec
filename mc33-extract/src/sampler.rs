//! Vertex positions and normals for edge and center slots

use crate::cube::{CORNERS, EDGES};
use mc33_core::{Point3f, ScalarField, Vector3f, Vertex};

/// Computes surface points inside cells of a scalar field
#[derive(Debug, Clone, Copy)]
pub struct PointSampler<'f, F: ScalarField> {
    field: &'f F,
    size: [usize; 3],
}

impl<'f, F: ScalarField> PointSampler<'f, F> {
    pub fn new(field: &'f F) -> Self {
        Self {
            field,
            size: field.size(),
        }
    }

    /// Interpolation parameter along an edge with corner values `va` and `vb`.
    /// A zero endpoint snaps the vertex onto that grid point.
    #[inline]
    pub fn crossing(va: f32, vb: f32) -> f32 {
        if va == 0.0 {
            0.0
        } else if vb == 0.0 {
            1.0
        } else {
            va / (va - vb)
        }
    }

    /// Vertex on edge slot `slot` of `cell`, given the cell's corner values
    pub fn edge_vertex(&self, cell: [usize; 3], slot: usize, v: &[f32; 8], with_normal: bool) -> Vertex {
        let [a, b] = EDGES[slot];
        let t = Self::crossing(v[a], v[b]);
        let (pa, pb) = (corner_point(cell, a), corner_point(cell, b));
        let local = pa + (pb - pa) * t;
        let position = self.field.to_world(&local);

        if !with_normal {
            return Vertex::new(position);
        }
        let ga = self.gradient(grid_point(cell, a));
        let gb = self.gradient(grid_point(cell, b));
        let normal = (ga * (1.0 - t) + gb * t)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| {
                // Flat field: point from the negative endpoint towards the set one
                let along = (pb - pa).normalize();
                if v[a] >= 0.0 {
                    -along
                } else {
                    along
                }
            });
        Vertex::with_normal(position, normal)
    }

    /// Vertex at the center of `cell`
    pub fn center_vertex(&self, cell: [usize; 3], v: &[f32; 8], with_normal: bool) -> Vertex {
        let local = Point3f::new(
            cell[0] as f32 + 0.5,
            cell[1] as f32 + 0.5,
            cell[2] as f32 + 0.5,
        );
        let position = self.field.to_world(&local);
        if !with_normal {
            return Vertex::new(position);
        }

        // Average slope of the corner values across the cell
        let spacing = self.field.spacing();
        let normal = Vector3f::new(
            (v[4] + v[5] + v[6] + v[7] - v[0] - v[1] - v[2] - v[3]) / spacing.x,
            (v[1] + v[2] + v[5] + v[6] - v[0] - v[3] - v[4] - v[7]) / spacing.y,
            (v[2] + v[3] + v[6] + v[7] - v[0] - v[1] - v[4] - v[5]) / spacing.z,
        )
        .try_normalize(f32::EPSILON)
        .unwrap_or_else(Vector3f::z);
        Vertex::with_normal(position, normal)
    }

    /// Negative field gradient at a grid point, pointing towards lower samples.
    /// Central differences inside the grid, one-sided on its outer faces.
    pub fn gradient(&self, point: [usize; 3]) -> Vector3f {
        let spacing = self.field.spacing();
        let mut g = Vector3f::zeros();
        for k in 0..3 {
            let mut lo = point;
            let mut hi = point;
            let mut span = 2.0;
            if point[k] == 0 {
                span -= 1.0;
            } else {
                lo[k] -= 1;
            }
            if point[k] >= self.size[k] {
                span -= 1.0;
            } else {
                hi[k] += 1;
            }
            if span > 0.0 {
                let d = self.sample(lo) - self.sample(hi);
                g[k] = d / (span * spacing[k]);
            }
        }
        g
    }

    fn sample(&self, [x, y, z]: [usize; 3]) -> f32 {
        self.field.sample(x, y, z)
    }
}

fn grid_point(cell: [usize; 3], corner: usize) -> [usize; 3] {
    std::array::from_fn(|k| cell[k] + CORNERS[corner][k])
}

fn corner_point(cell: [usize; 3], corner: usize) -> Point3f {
    let [x, y, z] = grid_point(cell, corner);
    Point3f::new(x as f32, y as f32, z as f32)
}
