//! The MC33 case table
//!
//! Maps each of the 256 corner-sign patterns to a canonical case and subcase,
//! and each (case, subcase, disambiguation outcome) to a triangle list. Every
//! triangle is a `u16` packing three 4-bit slots: `s0 | s1 << 4 | s2 << 8`.
//!
//! The table is generated once from the cube topology and checked for
//! consistency before first use; a failed check is a configuration error.

use crate::atlas::CellTopology;
use crate::cube::{self, CORNERS, EDGES, FACES};
use mc33_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use tracing::debug;

static SHARED_TABLE: OnceLock<std::result::Result<CaseTable, Error>> = OnceLock::new();

/// The fourteen non-empty marching cubes cases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CaseId {
    /// One corner
    One,
    /// Two corners sharing an edge
    Two,
    /// Two corners across a face diagonal
    Three,
    /// Two corners across the body diagonal
    Four,
    /// Three corners on one face
    Five,
    /// An edge and a far corner
    Six,
    /// Three corners, pairwise across face diagonals
    Seven,
    /// A whole face
    Eight,
    /// A corner and its three neighbours
    Nine,
    /// Two opposite edges
    Ten,
    /// A four-corner path turning one way
    Eleven,
    /// An L of three corners and a far corner
    Twelve,
    /// Four corners, pairwise across face diagonals
    Thirteen,
    /// A four-corner path turning the other way
    Fourteen,
}

impl CaseId {
    pub const ALL: [CaseId; 14] = [
        CaseId::One,
        CaseId::Two,
        CaseId::Three,
        CaseId::Four,
        CaseId::Five,
        CaseId::Six,
        CaseId::Seven,
        CaseId::Eight,
        CaseId::Nine,
        CaseId::Ten,
        CaseId::Eleven,
        CaseId::Twelve,
        CaseId::Thirteen,
        CaseId::Fourteen,
    ];

    /// Conventional case number, 1 to 14
    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Whether the case has more than one valid triangulation
    pub fn is_ambiguous(self) -> bool {
        matches!(
            self,
            CaseId::Three
                | CaseId::Four
                | CaseId::Six
                | CaseId::Seven
                | CaseId::Ten
                | CaseId::Twelve
                | CaseId::Thirteen
        )
    }

    /// Classify a non-trivial pattern by the shape of its smaller corner set
    pub fn classify(pattern: u8) -> Option<CaseId> {
        let small = if pattern.count_ones() > 4 { !pattern } else { pattern };
        let corners: Vec<usize> = (0..8).filter(|&c| cube::is_set(small, c)).collect();
        let degree = |c: usize| {
            corners
                .iter()
                .filter(|&&o| cube::corner_distance(c, o) == 1)
                .count()
        };
        let edges = corners.iter().map(|&c| degree(c)).sum::<usize>() / 2;

        let case = match (corners.len(), edges) {
            (1, _) => CaseId::One,
            (2, _) => match cube::corner_distance(corners[0], corners[1]) {
                1 => CaseId::Two,
                2 => CaseId::Three,
                _ => CaseId::Four,
            },
            (3, 2) => CaseId::Five,
            (3, 1) => CaseId::Six,
            (3, _) => CaseId::Seven,
            (4, 4) => CaseId::Eight,
            (4, 3) if corners.iter().any(|&c| degree(c) == 3) => CaseId::Nine,
            (4, 3) => {
                if path_handedness(&corners) > 0 {
                    CaseId::Eleven
                } else {
                    CaseId::Fourteen
                }
            }
            (4, 2) if corners.iter().any(|&c| degree(c) == 2) => CaseId::Twelve,
            (4, 2) => CaseId::Ten,
            (4, _) => CaseId::Thirteen,
            _ => return None,
        };
        Some(case)
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "case {}", self.number())
    }
}

/// Sign of the triple product of the steps along a four-corner path.
/// Walking the path backwards gives the same sign.
fn path_handedness(corners: &[usize]) -> i32 {
    let adjacent = |a: usize, b: usize| cube::corner_distance(a, b) == 1;
    let Some(&start) = corners
        .iter()
        .find(|&&c| corners.iter().filter(|&&o| adjacent(c, o)).count() == 1)
    else {
        return 0;
    };

    let mut path = vec![start];
    while path.len() < corners.len() {
        let last = path[path.len() - 1];
        match corners
            .iter()
            .find(|&&c| adjacent(last, c) && !path.contains(&c))
        {
            Some(&c) => path.push(c),
            None => return 0,
        }
    }

    let step = |i: usize| -> [i32; 3] {
        std::array::from_fn(|k| CORNERS[path[i + 1]][k] as i32 - CORNERS[path[i]][k] as i32)
    };
    let (a, b, c) = (step(0), step(1), step(2));
    let det = a[0] * (b[1] * c[2] - b[2] * c[1]) - a[1] * (b[0] * c[2] - b[2] * c[0])
        + a[2] * (b[0] * c[1] - b[1] * c[0]);
    det.signum()
}

/// Classification of one pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseDescriptor {
    pub case: CaseId,
    /// Index into the case's canonical patterns, in ascending pattern order
    pub subcase: u8,
    /// The pattern was complemented before lookup, so emitted winding must be flipped
    pub reversed: bool,
    /// The complemented-if-needed pattern, with corner 0 unset
    pub canonical: u8,
}

/// Result of resolving a cell's ambiguity, consumed by [`CaseTable::triangles_for`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The case has a single triangulation
    Direct,
    /// Face decisions only. Bit `f` of `joined` is set when face `f` connects
    /// the canonical set diagonal.
    Faces { joined: u8 },
    /// Face decisions plus an interior channel taken from the probe at `probe`
    Tunnel { joined: u8, probe: u8 },
}

impl Outcome {
    pub fn joined_faces(&self) -> u8 {
        match *self {
            Outcome::Direct => 0,
            Outcome::Faces { joined } | Outcome::Tunnel { joined, .. } => joined,
        }
    }
}

/// An interior channel to test, with the triangulation used when it is present
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Probe {
    /// Index into the body diagonals, which selects the interior test
    pub diagonal: u8,
    /// Required channel sign in canonical terms (true = set)
    pub set_side: bool,
    triangles: Vec<u16>,
}

impl Probe {
    pub fn triangles(&self) -> &[u16] {
        &self.triangles
    }
}

/// Triangulation for one combination of face decisions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    triangles: Vec<u16>,
    probes: Vec<Probe>,
}

impl Variant {
    pub fn triangles(&self) -> &[u16] {
        &self.triangles
    }

    /// Interior channels to test, in order; the first one found wins
    pub fn probes(&self) -> &[Probe] {
        &self.probes
    }
}

/// All variants of one canonical pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternEntry {
    pattern: u8,
    ambiguous_faces: Vec<u8>,
    /// Indexed by a mask whose bit `j` is the decision for `ambiguous_faces[j]`
    variants: Vec<Variant>,
}

impl PatternEntry {
    fn build(pattern: u8) -> Result<Self> {
        let ambiguous_faces: Vec<u8> = (0..FACES.len())
            .filter(|&f| cube::face_is_ambiguous(pattern, f))
            .map(|f| f as u8)
            .collect();

        let mut variants = Vec::with_capacity(1 << ambiguous_faces.len());
        for mask in 0..(1u32 << ambiguous_faces.len()) {
            let mut joined = [false; 6];
            for (j, &face) in ambiguous_faces.iter().enumerate() {
                joined[face as usize] = (mask >> j) & 1 == 1;
            }

            let topology = CellTopology::build(pattern, joined)?;
            let triangles = topology.triangulate();
            topology.verify(&triangles)?;

            let mut probes = Vec::new();
            for tunnel in topology.tunnels() {
                let Some(tube) = topology.triangulate_with_tube(tunnel.loops) else {
                    debug!(pattern, diagonal = tunnel.diagonal, "Skipping tunnel without a band");
                    continue;
                };
                topology.verify(&tube)?;
                probes.push(Probe {
                    diagonal: tunnel.diagonal,
                    set_side: tunnel.set_side,
                    triangles: pack_all(&tube),
                });
            }

            variants.push(Variant {
                triangles: pack_all(&triangles),
                probes,
            });
        }

        Ok(Self {
            pattern,
            ambiguous_faces,
            variants,
        })
    }

    pub fn pattern(&self) -> u8 {
        self.pattern
    }

    pub fn ambiguous_faces(&self) -> &[u8] {
        &self.ambiguous_faces
    }

    /// Variant for face decisions given as a per-face bitmask
    pub fn variant(&self, joined: u8) -> Option<&Variant> {
        let mask = self
            .ambiguous_faces
            .iter()
            .enumerate()
            .filter(|&(_, &face)| (joined >> face) & 1 == 1)
            .fold(0usize, |mask, (j, _)| mask | (1 << j));
        self.variants.get(mask)
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }
}

/// Pack three slots into one table entry
#[inline]
pub fn pack(slots: [u8; 3]) -> u16 {
    slots[0] as u16 | (slots[1] as u16) << 4 | (slots[2] as u16) << 8
}

/// Unpack a table entry into its three slots
#[inline]
pub fn unpack(triangle: u16) -> [u8; 3] {
    [
        (triangle & 0xF) as u8,
        ((triangle >> 4) & 0xF) as u8,
        ((triangle >> 8) & 0xF) as u8,
    ]
}

fn pack_all(triangles: &[[u8; 3]]) -> Vec<u16> {
    triangles.iter().map(|&t| pack(t)).collect()
}

/// Immutable case table shared by all extractions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseTable {
    descriptors: Vec<Option<CaseDescriptor>>,
    /// Canonical patterns per case, indexed by subcase
    cases: Vec<Vec<PatternEntry>>,
}

impl CaseTable {
    /// Generate and check the full table
    pub fn generate() -> Result<Self> {
        let mut cases: Vec<Vec<PatternEntry>> = vec![Vec::new(); CaseId::ALL.len()];
        let mut canonical: Vec<Option<(CaseId, u8)>> = vec![None; 256];

        for pattern in (2u8..=254).step_by(2) {
            let case = CaseId::classify(pattern).ok_or_else(|| {
                Error::CaseTable(format!("Pattern {:#010b} has no case", pattern))
            })?;
            let entries = &mut cases[case.index()];
            canonical[pattern as usize] = Some((case, entries.len() as u8));
            entries.push(PatternEntry::build(pattern)?);
        }

        let mut descriptors = vec![None; 256];
        for raw in 1..=254u8 {
            let reversed = cube::is_set(raw, 0);
            let key = if reversed { !raw } else { raw };
            let (case, subcase) = canonical[key as usize].ok_or_else(|| {
                Error::CaseTable(format!("Pattern {:#010b} was not generated", key))
            })?;
            descriptors[raw as usize] = Some(CaseDescriptor {
                case,
                subcase,
                reversed,
                canonical: key,
            });
        }

        let table = Self { descriptors, cases };
        table.check()?;

        debug!(
            patterns = table.cases.iter().map(Vec::len).sum::<usize>(),
            variants = table.variant_count(),
            probes = table.probe_count(),
            "Generated MC33 case table"
        );
        Ok(table)
    }

    /// Process-wide table, generated on first use
    pub fn shared() -> Result<&'static CaseTable> {
        SHARED_TABLE
            .get_or_init(CaseTable::generate)
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Case and subcase of a pattern; `None` for the empty patterns 0x00 and 0xFF
    pub fn case_of(&self, pattern: u8) -> Option<CaseDescriptor> {
        self.descriptors.get(pattern as usize).copied().flatten()
    }

    pub fn entry(&self, case: CaseId, subcase: u8) -> Option<&PatternEntry> {
        self.cases.get(case.index())?.get(subcase as usize)
    }

    /// Canonical patterns of a case, indexed by subcase
    pub fn subcases(&self, case: CaseId) -> &[PatternEntry] {
        self.cases
            .get(case.index())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Faces whose test applies to a subcase
    pub fn ambiguous_faces(&self, case: CaseId, subcase: u8) -> &[u8] {
        self.entry(case, subcase)
            .map(PatternEntry::ambiguous_faces)
            .unwrap_or_default()
    }

    /// Interior probes to run once the face decisions are known
    pub fn probes(&self, case: CaseId, subcase: u8, joined: u8) -> &[Probe] {
        self.entry(case, subcase)
            .and_then(|entry| entry.variant(joined))
            .map(Variant::probes)
            .unwrap_or_default()
    }

    /// Triangle list for a resolved cell. Unknown subcases or probes yield no triangles.
    pub fn triangles_for(&self, case: CaseId, subcase: u8, outcome: &Outcome) -> &[u16] {
        let Some(variant) = self
            .entry(case, subcase)
            .and_then(|entry| entry.variant(outcome.joined_faces()))
        else {
            return &[];
        };
        match *outcome {
            Outcome::Tunnel { probe, .. } => variant
                .probes
                .get(probe as usize)
                .map_or(variant.triangles(), Probe::triangles),
            _ => variant.triangles(),
        }
    }

    fn variant_count(&self) -> usize {
        self.cases.iter().flatten().map(|e| e.variants.len()).sum()
    }

    fn probe_count(&self) -> usize {
        self.cases
            .iter()
            .flatten()
            .flat_map(|e| &e.variants)
            .map(|v| v.probes.len())
            .sum()
    }

    /// Structural checks beyond the per-variant topology verification
    fn check(&self) -> Result<()> {
        for case in CaseId::ALL {
            for entry in self.subcases(case) {
                let fail = |what: &str| {
                    Err(Error::CaseTable(format!(
                        "{} pattern {:#010b}: {}",
                        case, entry.pattern, what
                    )))
                };
                if !case.is_ambiguous() && !entry.ambiguous_faces.is_empty() {
                    return fail("unambiguous case with ambiguous faces");
                }
                for variant in &entry.variants {
                    if variant.triangles.is_empty() {
                        return fail("empty triangulation");
                    }
                    if !case.is_ambiguous() && !variant.probes.is_empty() {
                        return fail("unambiguous case with interior probes");
                    }
                    let all = variant
                        .probes
                        .iter()
                        .flat_map(|p| &p.triangles)
                        .chain(&variant.triangles);
                    if all.flat_map(|&t| unpack(t)).any(|s| s as usize >= cube::SLOT_COUNT) {
                        return fail("slot out of range");
                    }
                }
            }
        }
        // Every crossing edge of every pattern must be reachable through the descriptors
        for pattern in 1..=254u8 {
            let descriptor = self
                .case_of(pattern)
                .ok_or_else(|| Error::CaseTable(format!("No descriptor for {:#010b}", pattern)))?;
            let entry = self
                .entry(descriptor.case, descriptor.subcase)
                .ok_or_else(|| Error::CaseTable(format!("No entry for {:#010b}", pattern)))?;
            if entry.pattern != descriptor.canonical {
                return Err(Error::CaseTable(format!(
                    "Descriptor of {:#010b} points at {:#010b}",
                    pattern, entry.pattern
                )));
            }
            let crossing = EDGES
                .iter()
                .filter(|&&[a, b]| cube::is_set(pattern, a) != cube::is_set(pattern, b))
                .count();
            let used = entry.variants[0]
                .triangles
                .iter()
                .flat_map(|&t| unpack(t))
                .filter(|&s| s < cube::CENTER_SLOT)
                .fold(0u16, |seen, s| seen | 1 << s)
                .count_ones() as usize;
            if used != crossing {
                return Err(Error::CaseTable(format!(
                    "Pattern {:#010b} uses {} of {} crossing edges",
                    pattern, used, crossing
                )));
            }
        }
        Ok(())
    }
}
