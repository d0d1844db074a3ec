//! Scalar fields sampled on a regular grid
//!
//! A field is addressed by integer sample coordinates `[x, y, z]` with
//! `0 <= x <= size_x` (and likewise for y and z), where `size_*` counts
//! cells, i.e. one less than the number of samples along that axis.
//! World coordinates are `origin + spacing ⊙ cell_coordinate`.

use crate::{Error, Point3f, Result, Vector3f};
use ndarray::Array3;
use serde::{Deserialize, Serialize};

/// Read-only source of scalar samples on a regular grid
pub trait ScalarField {
    /// Number of cells along x, y and z
    fn size(&self) -> [usize; 3];

    /// Sample at integer grid coordinates, `0 <= x <= size()[0]` etc.
    fn sample(&self, x: usize, y: usize, z: usize) -> f32;

    /// World-space position of sample `[0, 0, 0]`
    fn origin(&self) -> Point3f;

    /// World-space distance between neighbouring samples along each axis
    fn spacing(&self) -> Vector3f;

    /// Map a (possibly fractional) cell coordinate into world space
    fn to_world(&self, local: &Point3f) -> Point3f {
        self.origin() + self.spacing().component_mul(&local.coords)
    }
}

impl<T: ScalarField + ?Sized> ScalarField for &T {
    fn size(&self) -> [usize; 3] {
        (**self).size()
    }

    fn sample(&self, x: usize, y: usize, z: usize) -> f32 {
        (**self).sample(x, y, z)
    }

    fn origin(&self) -> Point3f {
        (**self).origin()
    }

    fn spacing(&self) -> Vector3f {
        (**self).spacing()
    }
}

/// Dense scalar grid backed by an `[x, y, z]` ordered array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayGrid {
    values: Array3<f32>,
    origin: Point3f,
    spacing: Vector3f,
}

impl ArrayGrid {
    /// Create a zero-filled grid with `cells` cells per axis
    pub fn new(cells: [usize; 3], origin: Point3f, spacing: Vector3f) -> Result<Self> {
        Self::from_array(
            Array3::zeros((cells[0] + 1, cells[1] + 1, cells[2] + 1)),
            origin,
            spacing,
        )
    }

    /// Wrap an existing sample array
    pub fn from_array(values: Array3<f32>, origin: Point3f, spacing: Vector3f) -> Result<Self> {
        let shape = values.shape();
        if shape.iter().any(|&n| n < 2) {
            return Err(Error::InvalidData(format!(
                "Grid needs at least 2 samples per axis, got {:?}",
                shape
            )));
        }
        Ok(Self {
            values,
            origin,
            spacing,
        })
    }

    /// Build a grid from samples laid out x-major (z varies fastest)
    pub fn from_vec(
        samples: [usize; 3],
        data: Vec<f32>,
        origin: Point3f,
        spacing: Vector3f,
    ) -> Result<Self> {
        let expected = samples[0] * samples[1] * samples[2];
        if data.len() != expected {
            return Err(Error::InvalidData(format!(
                "Expected {} samples for shape {:?}, got {}",
                expected,
                samples,
                data.len()
            )));
        }
        let values = Array3::from_shape_vec((samples[0], samples[1], samples[2]), data)
            .map_err(|e| Error::InvalidData(e.to_string()))?;
        Self::from_array(values, origin, spacing)
    }

    /// Build a grid by evaluating `f` at every sample coordinate
    pub fn from_fn<F>(cells: [usize; 3], origin: Point3f, spacing: Vector3f, f: F) -> Result<Self>
    where
        F: Fn(usize, usize, usize) -> f32,
    {
        let values = Array3::from_shape_fn((cells[0] + 1, cells[1] + 1, cells[2] + 1), |(x, y, z)| {
            f(x, y, z)
        });
        Self::from_array(values, origin, spacing)
    }

    /// Unit-spaced grid at the origin built from nested `[x][y][z]` slices
    pub fn from_nested(data: &[Vec<Vec<f32>>]) -> Result<Self> {
        let sx = data.len();
        let sy = data.first().map_or(0, Vec::len);
        let sz = data.first().and_then(|p| p.first()).map_or(0, Vec::len);

        let mut flat = Vec::with_capacity(sx * sy * sz);
        for (x, plane) in data.iter().enumerate() {
            if plane.len() != sy {
                return Err(Error::InvalidData(format!("Ragged grid at x = {}", x)));
            }
            for (y, row) in plane.iter().enumerate() {
                if row.len() != sz {
                    return Err(Error::InvalidData(format!("Ragged grid at x = {}, y = {}", x, y)));
                }
                flat.extend_from_slice(row);
            }
        }
        Self::from_vec([sx, sy, sz], flat, Point3f::origin(), Vector3f::repeat(1.0))
    }

    /// Samples per axis
    pub fn sample_count(&self) -> [usize; 3] {
        let shape = self.values.shape();
        [shape[0], shape[1], shape[2]]
    }

    /// Get a sample with bounds checking
    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<f32> {
        self.values.get((x, y, z)).copied()
    }

    /// Set a sample with bounds checking
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: f32) -> Result<()> {
        let shape = self.sample_count();
        match self.values.get_mut((x, y, z)) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Error::InvalidData(format!(
                "Grid coordinates ({}, {}, {}) out of bounds for samples {:?}",
                x, y, z, shape
            ))),
        }
    }

    /// Borrow the underlying sample array
    pub fn values(&self) -> &Array3<f32> {
        &self.values
    }
}

impl ScalarField for ArrayGrid {
    fn size(&self) -> [usize; 3] {
        let [sx, sy, sz] = self.sample_count();
        [sx - 1, sy - 1, sz - 1]
    }

    fn sample(&self, x: usize, y: usize, z: usize) -> f32 {
        // Out-of-range reads are outside the contract; NaN keeps them from panicking.
        self.get(x, y, z).unwrap_or(f32::NAN)
    }

    fn origin(&self) -> Point3f {
        self.origin
    }

    fn spacing(&self) -> Vector3f {
        self.spacing
    }
}
