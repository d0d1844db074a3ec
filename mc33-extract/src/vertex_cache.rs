//! Streaming vertex reuse across neighbouring cells
//!
//! Cells are visited with x fastest, then y, then z. Every grid edge gets one
//! vertex, created by the first cell that needs it and read back by the cells
//! after it. Only the layers the current cell can touch are kept: two rows of
//! z-edges inside the current slab, and the bottom and top planes of x- and
//! y-edges. Rows swap after each scan line and planes after each slab, so
//! memory depends on the grid cross-section only.
//!
//! Edge buffers are never cleared. An entry is trusted only when the first cell
//! containing its edge precedes the current cell in scan order, which rules
//! out stale values left by earlier rows or slabs.
//!
//! A vertex that snaps onto a grid point is shared by every crossing edge
//! meeting there. Such vertices are also registered per grid point in the
//! bottom and top planes, so edges that reach the point from different slabs
//! still agree on one vertex.

use crate::cube::{self, Axis, CORNERS, EDGES};
use ndarray::Array2;

/// A lower and an upper layer with an explicit swap
#[derive(Debug, Clone, PartialEq)]
pub struct BufferPair<T> {
    lower: T,
    upper: T,
}

impl<T> BufferPair<T> {
    pub fn new(lower: T, upper: T) -> Self {
        Self { lower, upper }
    }

    pub fn lower(&self) -> &T {
        &self.lower
    }

    pub fn upper(&self) -> &T {
        &self.upper
    }

    pub fn layer(&self, upper: bool) -> &T {
        if upper {
            &self.upper
        } else {
            &self.lower
        }
    }

    pub fn layer_mut(&mut self, upper: bool) -> &mut T {
        if upper {
            &mut self.upper
        } else {
            &mut self.lower
        }
    }

    /// Advance one layer: the upper buffer becomes the lower one and the old
    /// lower buffer is reused, contents and all, as the new upper one
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.lower, &mut self.upper);
    }
}

/// A grid edge named by its axis and its lower endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeKey {
    pub axis: Axis,
    pub origin: [usize; 3],
}

impl EdgeKey {
    /// Grid edge behind an edge slot of `cell`; `None` for the center slot
    pub fn of_slot(cell: [usize; 3], slot: usize) -> Option<Self> {
        let &[corner, _] = EDGES.get(slot)?;
        let offset = CORNERS[corner];
        Some(Self {
            axis: cube::edge_axis(slot),
            origin: std::array::from_fn(|k| cell[k] + offset[k]),
        })
    }

    /// The first cell in scan order that contains this edge
    pub fn first_cell(&self) -> [usize; 3] {
        let [x, y, z] = self.origin;
        match self.axis {
            Axis::X => [x, y.saturating_sub(1), z.saturating_sub(1)],
            Axis::Y => [x.saturating_sub(1), y, z.saturating_sub(1)],
            Axis::Z => [x.saturating_sub(1), y.saturating_sub(1), z],
        }
    }
}

/// Whether cell `a` comes before cell `b` in z, y, x scan order
fn precedes(a: [usize; 3], b: [usize; 3]) -> bool {
    (a[2], a[1], a[0]) < (b[2], b[1], b[0])
}

/// Which layer of a pair holds grid coordinate `g` seen from cell coordinate `c`
fn layer_of(g: usize, c: usize) -> Option<bool> {
    if g == c {
        Some(false)
    } else if g == c + 1 {
        Some(true)
    } else {
        None
    }
}

/// Vertex indices of grid edges near the current cell
#[derive(Debug, Clone)]
pub struct VertexCache {
    cell: [usize; 3],
    /// x-edges of the bottom and top planes, indexed `[y, x]`
    x_edges: BufferPair<Array2<Option<usize>>>,
    /// y-edges of the bottom and top planes, indexed `[y, x]`
    y_edges: BufferPair<Array2<Option<usize>>>,
    /// z-edges of the front and back rows of the current slab, indexed by x
    z_edges: BufferPair<Vec<Option<usize>>>,
    /// Vertices snapped onto grid points of the bottom and top planes, indexed `[y, x]`
    points: BufferPair<Array2<Option<usize>>>,
}

impl VertexCache {
    /// Create buffers for a grid of `size` cells
    pub fn new(size: [usize; 3]) -> Self {
        let [nx, ny, _] = size;
        let sheet = |rows, cols| Array2::from_elem((rows, cols), None);
        Self {
            cell: [0; 3],
            x_edges: BufferPair::new(sheet(ny + 1, nx), sheet(ny + 1, nx)),
            y_edges: BufferPair::new(sheet(ny, nx + 1), sheet(ny, nx + 1)),
            z_edges: BufferPair::new(vec![None; nx + 1], vec![None; nx + 1]),
            points: BufferPair::new(sheet(ny + 1, nx + 1), sheet(ny + 1, nx + 1)),
        }
    }

    /// Set the cell whose edges are looked up next
    pub fn begin_cell(&mut self, cell: [usize; 3]) {
        self.cell = cell;
    }

    /// Finish a scan line: the back row of z-edges becomes the front row
    pub fn end_row(&mut self) {
        self.z_edges.swap();
    }

    /// Finish a slab: the top planes become the bottom planes
    pub fn end_slab(&mut self) {
        self.x_edges.swap();
        self.y_edges.swap();
        self.points.swap();
        self.points.layer_mut(true).fill(None);
    }

    fn entry(&self, key: &EdgeKey) -> Option<&Option<usize>> {
        let [_, y, z] = self.cell;
        let [gx, gy, gz] = key.origin;
        match key.axis {
            Axis::X => self.x_edges.layer(layer_of(gz, z)?).get((gy, gx)),
            Axis::Y => self.y_edges.layer(layer_of(gz, z)?).get((gy, gx)),
            Axis::Z if gz == z => self.z_edges.layer(layer_of(gy, y)?).get(gx),
            Axis::Z => None,
        }
    }

    fn entry_mut(&mut self, key: &EdgeKey) -> Option<&mut Option<usize>> {
        let [_, y, z] = self.cell;
        let [gx, gy, gz] = key.origin;
        match key.axis {
            Axis::X => self.x_edges.layer_mut(layer_of(gz, z)?).get_mut((gy, gx)),
            Axis::Y => self.y_edges.layer_mut(layer_of(gz, z)?).get_mut((gy, gx)),
            Axis::Z if gz == z => self.z_edges.layer_mut(layer_of(gy, y)?).get_mut(gx),
            Axis::Z => None,
        }
    }

    /// Vertex of an edge already handled by an earlier cell
    pub fn lookup(&self, key: &EdgeKey) -> Option<usize> {
        if !precedes(key.first_cell(), self.cell) {
            return None;
        }
        self.entry(key).copied().flatten()
    }

    /// Record the vertex of an edge. Edges outside the buffered layers are ignored.
    pub fn store(&mut self, key: &EdgeKey, index: usize) {
        if let Some(entry) = self.entry_mut(key) {
            *entry = Some(index);
        }
    }

    /// Vertex already placed exactly on grid point `point`
    pub fn lookup_snapped(&self, point: [usize; 3]) -> Option<usize> {
        let [px, py, pz] = point;
        self.points
            .layer(layer_of(pz, self.cell[2])?)
            .get((py, px))
            .copied()
            .flatten()
    }

    /// Register a vertex placed exactly on grid point `point`
    pub fn store_snapped(&mut self, point: [usize; 3], index: usize) {
        let [px, py, pz] = point;
        let Some(upper) = layer_of(pz, self.cell[2]) else {
            return;
        };
        if let Some(entry) = self.points.layer_mut(upper).get_mut((py, px)) {
            *entry = Some(index);
        }
    }
}
