//! Numerical tests that pick among the triangulations of ambiguous cases
//!
//! Corner values are `iso - sample`, so a corner is set when its value is
//! non-negative. Face decisions are reported in canonical terms: +1 when the
//! canonical set diagonal of a face is joined across it, -1 when the other
//! diagonal is, and 0 for faces that are not ambiguous.

use crate::case_table::{CaseDescriptor, CaseId, CaseTable, Outcome};
use crate::cube::{self, FACES};
use tracing::trace;

/// Results of the face tests of one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FaceTests {
    pub results: [i8; 6],
    pub sum: i8,
}

impl FaceTests {
    /// Faces whose canonical set diagonal is joined, as a bitmask
    pub fn joined_mask(&self) -> u8 {
        self.results
            .iter()
            .enumerate()
            .filter(|&(_, &r)| r > 0)
            .fold(0, |mask, (face, _)| mask | 1 << face)
    }
}

/// Whether the non-negative diagonal of an ambiguous face is joined across it.
///
/// The face is a bilinear patch; its non-negative diagonal `(a, c)` is joined when
/// `v_a * v_c >= v_b * v_d`, so ties join it. A corner exactly on the surface
/// zeroes its product and is always cut off.
pub fn face_joins_nonnegative(face: usize, v: &[f32; 8]) -> bool {
    let [a, b, c, d] = FACES[face];
    let (a, b, c, d) = if v[a] >= 0.0 { (a, b, c, d) } else { (b, c, d, a) };
    v[a] * v[c] >= v[b] * v[d]
}

/// Single-face fast path: +1 or -1 for one face of a canonical pattern
pub fn face_test1(face: usize, v: &[f32; 8], reversed: bool) -> i8 {
    if face_joins_nonnegative(face, v) != reversed {
        1
    } else {
        -1
    }
}

/// Run the face test on every ambiguous face of `canonical`
pub fn face_tests(canonical: u8, v: &[f32; 8], reversed: bool) -> FaceTests {
    let mut tests = FaceTests::default();
    for face in 0..FACES.len() {
        if cube::face_is_ambiguous(canonical, face) {
            tests.results[face] = face_test1(face, v, reversed);
            tests.sum += tests.results[face];
        }
    }
    tests
}

/// Interior test along a body diagonal.
///
/// Slicing the cell at `x = t` gives a bilinear face whose corners move linearly
/// along the four x-edges. The product `A*C - B*D` is quadratic in `t`; at its
/// extremum the slice may connect the two diagonals. Returns the sign of the
/// channel (`true` for non-negative) when the slice joins the diagonal pair that
/// `diagonal` runs between, or `None` when the extremum leaves the cell or no
/// channel forms.
pub fn interior_test(diagonal: usize, v: &[f32; 8]) -> Option<bool> {
    let at = v[4] - v[0];
    let bt = v[5] - v[1];
    let ct = v[6] - v[2];
    let dt = v[7] - v[3];
    let a = at * ct - bt * dt;

    let odd = diagonal & 1 == 1;
    if (odd && a <= 0.0) || (!odd && a >= 0.0) {
        return None;
    }

    let t = 0.5 * (v[3] * bt + v[1] * dt - v[2] * at - v[0] * ct) / a;
    if !(t > 0.0 && t < 1.0) {
        return None;
    }

    let sa = v[0] + at * t;
    let sb = v[1] + bt * t;
    let sc = v[2] + ct * t;
    let sd = v[3] + dt * t;

    if odd {
        (sa * sc < sb * sd && (sb < 0.0) == (sd < 0.0)).then_some(sb >= 0.0)
    } else {
        (sa * sc > sb * sd && (sa < 0.0) == (sc < 0.0)).then_some(sa >= 0.0)
    }
}

/// Branches of case 13, named by subcase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Case13 {
    /// All faces agree: four separated corners
    One,
    /// One face disagrees
    Two,
    /// Two faces disagree
    Three,
    /// Three against three, no interior channel possible
    Four,
    /// Three against three, decided by the interior test
    Five,
}

impl Case13 {
    /// Reduce the face test sum; `admits_tunnel` tells 13.4 from 13.5
    pub fn from_face_tests(tests: &FaceTests, admits_tunnel: bool) -> Self {
        match tests.sum.unsigned_abs() {
            6 => Case13::One,
            4 => Case13::Two,
            2 => Case13::Three,
            _ if admits_tunnel => Case13::Five,
            _ => Case13::Four,
        }
    }
}

/// Resolves an ambiguous cell into an [`Outcome`] using the table's probes
#[derive(Debug, Clone, Copy)]
pub struct AmbiguityResolver<'t> {
    table: &'t CaseTable,
}

impl<'t> AmbiguityResolver<'t> {
    pub fn new(table: &'t CaseTable) -> Self {
        Self { table }
    }

    pub fn resolve(&self, descriptor: &CaseDescriptor, v: &[f32; 8]) -> Outcome {
        let CaseDescriptor {
            case,
            subcase,
            reversed,
            canonical,
        } = *descriptor;

        match case {
            CaseId::One
            | CaseId::Two
            | CaseId::Five
            | CaseId::Eight
            | CaseId::Nine
            | CaseId::Eleven
            | CaseId::Fourteen => Outcome::Direct,
            CaseId::Three | CaseId::Six => {
                let joined = match self.table.ambiguous_faces(case, subcase).first() {
                    Some(&face) if face_test1(face as usize, v, reversed) > 0 => 1 << face,
                    _ => 0,
                };
                self.probe(descriptor, joined, v)
            }
            CaseId::Four => self.probe(descriptor, 0, v),
            CaseId::Seven | CaseId::Ten | CaseId::Twelve => {
                let tests = face_tests(canonical, v, reversed);
                self.probe(descriptor, tests.joined_mask(), v)
            }
            CaseId::Thirteen => {
                let tests = face_tests(canonical, v, reversed);
                let joined = tests.joined_mask();
                let admits_tunnel = !self.table.probes(case, subcase, joined).is_empty();
                let branch = Case13::from_face_tests(&tests, admits_tunnel);
                trace!(?branch, sum = tests.sum, "Case 13 face tests");
                match branch {
                    Case13::Five => self.probe(descriptor, joined, v),
                    _ => Outcome::Faces { joined },
                }
            }
        }
    }

    /// Run the interior probes for fixed face decisions; the first channel found wins
    fn probe(&self, descriptor: &CaseDescriptor, joined: u8, v: &[f32; 8]) -> Outcome {
        let probes = self
            .table
            .probes(descriptor.case, descriptor.subcase, joined);
        probes
            .iter()
            .position(|probe| {
                interior_test(probe.diagonal as usize, v)
                    .is_some_and(|nonnegative| (nonnegative != descriptor.reversed) == probe.set_side)
            })
            .map_or(Outcome::Faces { joined }, |index| Outcome::Tunnel {
                joined,
                probe: index as u8,
            })
    }
}
