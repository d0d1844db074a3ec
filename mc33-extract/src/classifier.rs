//! Per-cell classification: corner pattern, case lookup and ambiguity resolution

use crate::ambiguity::AmbiguityResolver;
use crate::case_table::{CaseDescriptor, CaseTable, Outcome};

/// Bits of the four corners on one x-face, from corner values in face order
#[inline]
pub fn face_bits(values: &[f32]) -> u8 {
    values
        .iter()
        .take(4)
        .enumerate()
        .fold(0, |bits, (i, &v)| bits | (u8::from(v >= 0.0) << i))
}

/// Pattern of the next cell along x: the old x+1 face becomes the x face
#[inline]
pub fn advance_pattern(pattern: u8, next_face: u8) -> u8 {
    (pattern >> 4) | (next_face << 4)
}

/// Pattern of a cell from all eight corner values
pub fn pattern_of(v: &[f32; 8]) -> u8 {
    face_bits(&v[..4]) | face_bits(&v[4..]) << 4
}

/// A classified cell ready for emission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification<'t> {
    pub descriptor: CaseDescriptor,
    pub outcome: Outcome,
    /// Packed slot triples in canonical winding
    pub triangles: &'t [u16],
}

/// Maps cells to triangle lists through the case table
#[derive(Debug, Clone, Copy)]
pub struct CellClassifier<'t> {
    table: &'t CaseTable,
    resolver: AmbiguityResolver<'t>,
}

impl<'t> CellClassifier<'t> {
    pub fn new(table: &'t CaseTable) -> Self {
        Self {
            table,
            resolver: AmbiguityResolver::new(table),
        }
    }

    /// Classify a cell; `None` when the cell holds no surface
    pub fn classify(&self, pattern: u8, v: &[f32; 8]) -> Option<Classification<'t>> {
        let descriptor = self.table.case_of(pattern)?;
        let outcome = self.resolver.resolve(&descriptor, v);
        let triangles = self
            .table
            .triangles_for(descriptor.case, descriptor.subcase, &outcome);
        Some(Classification {
            descriptor,
            outcome,
            triangles,
        })
    }
}
