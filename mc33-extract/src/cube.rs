//! Cube topology shared by the case table and the extractor
//!
//! ```text
//! corner  offset      edge  corners   edge  corners   edge  corners
//!   0    (0, 0, 0)      0    0-1        4    4-5        8    0-4
//!   1    (0, 1, 0)      1    1-2        5    5-6        9    1-5
//!   2    (0, 1, 1)      2    3-2        6    7-6       10    2-6
//!   3    (0, 0, 1)      3    0-3        7    4-7       11    3-7
//!   4    (1, 0, 0)
//!   5    (1, 1, 0)
//!   6    (1, 1, 1)
//!   7    (1, 0, 1)
//! ```
//!
//! Slots 0..=11 name the edges, slot 12 the cell center.

use nalgebra::Vector3;

/// Integer (x, y, z) offset of each corner from the cell origin
pub const CORNERS: [[usize; 3]; 8] = [
    [0, 0, 0],
    [0, 1, 0],
    [0, 1, 1],
    [0, 0, 1],
    [1, 0, 0],
    [1, 1, 0],
    [1, 1, 1],
    [1, 0, 1],
];

/// Endpoint corners of each edge slot, lower corner first
pub const EDGES: [[usize; 2]; 12] = [
    [0, 1],
    [1, 2],
    [3, 2],
    [0, 3],
    [4, 5],
    [5, 6],
    [7, 6],
    [4, 7],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];

/// Cell-center slot
pub const CENTER_SLOT: u8 = 12;

/// Number of slots (12 edges plus the center)
pub const SLOT_COUNT: usize = 13;

/// Faces as corner cycles. Opposite corners of a cycle form the face diagonals.
pub const FACES: [[usize; 4]; 6] = [
    [0, 1, 5, 4], // z = 0
    [1, 2, 6, 5], // y = 1
    [3, 2, 6, 7], // z = 1
    [0, 3, 7, 4], // y = 0
    [0, 1, 2, 3], // x = 0
    [4, 5, 6, 7], // x = 1
];

/// Body diagonals in interior-test order
pub const DIAGONALS: [[usize; 2]; 4] = [[0, 6], [1, 7], [2, 4], [3, 5]];

/// Grid axis of an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Whether corner `corner` is set in `pattern`
#[inline]
pub fn is_set(pattern: u8, corner: usize) -> bool {
    (pattern >> corner) & 1 == 1
}

/// Edge slot joining two corners, if they are adjacent
pub fn edge_between(a: usize, b: usize) -> Option<usize> {
    EDGES
        .iter()
        .position(|&[p, q]| (p == a && q == b) || (p == b && q == a))
}

/// Axis along which an edge slot runs
pub fn edge_axis(slot: usize) -> Axis {
    match slot {
        0 | 2 | 4 | 6 => Axis::Y,
        1 | 3 | 5 | 7 => Axis::Z,
        _ => Axis::X,
    }
}

/// Number of coordinates in which two corners differ
pub fn corner_distance(a: usize, b: usize) -> usize {
    (0..3).filter(|&k| CORNERS[a][k] != CORNERS[b][k]).count()
}

/// A face is ambiguous when both diagonals carry equal signs that differ from each other
pub fn face_is_ambiguous(pattern: u8, face: usize) -> bool {
    let [a, b, c, d] = FACES[face].map(|corner| is_set(pattern, corner));
    a == c && b == d && a != b
}

pub(crate) fn corner_position(corner: usize) -> Vector3<f32> {
    let [x, y, z] = CORNERS[corner];
    Vector3::new(x as f32, y as f32, z as f32)
}

/// Midpoint of an edge slot, or the cell center for slot 12, in unit-cell coordinates
pub(crate) fn slot_midpoint(slot: u8) -> Vector3<f32> {
    match EDGES.get(slot as usize) {
        Some(&[a, b]) => (corner_position(a) + corner_position(b)) * 0.5,
        None => Vector3::repeat(0.5),
    }
}

/// Whether every slot in `slots` is an edge of one common face.
/// The center slot lies on no face.
pub(crate) fn on_common_face(slots: &[u8]) -> bool {
    FACES.iter().any(|face| {
        slots.iter().all(|&slot| match EDGES.get(slot as usize) {
            Some(&[a, b]) => face.contains(&a) && face.contains(&b),
            None => false,
        })
    })
}

/// Outward unit normal of a face
pub(crate) fn face_normal(face: usize) -> Vector3<f32> {
    let center = FACES[face]
        .iter()
        .map(|&c| corner_position(c))
        .sum::<Vector3<f32>>()
        * 0.25;
    (center - Vector3::repeat(0.5)) * 2.0
}
