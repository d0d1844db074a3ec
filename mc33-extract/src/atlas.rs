//! Topological construction of the MC33 triangulations
//!
//! For a canonical pattern and one decision per ambiguous face, the cell
//! surface is built from first principles:
//!
//! 1. every face contributes oriented segments between its crossing edges,
//!    with the set corners on the left when the face is viewed from outside;
//! 2. segments chain into closed loops of edge slots;
//! 3. corners group into patches (regions of equal sign), and loops connect
//!    adjacent patches into a tree;
//! 4. each loop becomes a disc, or two loops become a tube when an interior
//!    channel joins the patches on either side of them.
//!
//! Everything here runs once while the [`CaseTable`](crate::CaseTable) is built.

use crate::cube::{self, CENTER_SLOT, DIAGONALS, EDGES, FACES};
use itertools::Itertools;
use mc33_core::{Error, Result};
use std::collections::{HashMap, HashSet, VecDeque};

/// Loops with at least this many vertices are fanned around the cell center
const CENTER_FAN_MIN: usize = 8;

/// A body diagonal whose interior channel would join two patches through a tube
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TunnelCandidate {
    /// Index into [`DIAGONALS`]
    pub diagonal: u8,
    /// Whether the channel carries set (non-negative) values
    pub set_side: bool,
    /// The two loops the tube replaces
    pub loops: [usize; 2],
}

/// Surface topology of one cell under fixed face decisions
#[derive(Debug, Clone)]
pub(crate) struct CellTopology {
    pattern: u8,
    loops: Vec<Vec<u8>>,
    patch_of: [usize; 8],
    /// Neighbouring patch and separating loop for each patch
    adjacency: Vec<Vec<(usize, usize)>>,
}

impl CellTopology {
    /// Build the loops and patch tree of `pattern`.
    ///
    /// `joined[f]` selects, for an ambiguous face `f`, whether its set diagonal
    /// is connected across the face. Entries for other faces are ignored.
    pub fn build(pattern: u8, joined: [bool; 6]) -> Result<Self> {
        let mut segments = Vec::new();
        for face in 0..FACES.len() {
            segments.extend(face_segments(pattern, face, joined[face])?);
        }
        let loops = chain_loops(pattern, &segments)?;
        let patch_of = patches(pattern, joined);
        let patch_count = patch_of.iter().max().map_or(0, |&p| p + 1);

        let mut adjacency = vec![Vec::new(); patch_count];
        for (index, cycle) in loops.iter().enumerate() {
            let [a, b] = loop_patches(&patch_of, cycle)?;
            adjacency[a].push((b, index));
            adjacency[b].push((a, index));
        }

        if patch_count != loops.len() + 1 {
            return Err(Error::CaseTable(format!(
                "Pattern {:#010b}: {} patches for {} loops",
                pattern,
                patch_count,
                loops.len()
            )));
        }

        Ok(Self {
            pattern,
            loops,
            patch_of,
            adjacency,
        })
    }

    #[cfg(test)]
    pub fn loops(&self) -> &[Vec<u8>] {
        &self.loops
    }

    /// Loops separating two patches, in order along the tree path
    fn path(&self, from: usize, to: usize) -> Option<Vec<usize>> {
        let mut parent: Vec<Option<(usize, usize)>> = vec![None; self.adjacency.len()];
        let mut seen = vec![false; self.adjacency.len()];
        let mut queue = VecDeque::from([from]);
        seen[from] = true;

        while let Some(patch) = queue.pop_front() {
            if patch == to {
                let mut loops = Vec::new();
                let mut current = to;
                while let Some((previous, cycle)) = parent[current] {
                    loops.push(cycle);
                    current = previous;
                }
                loops.reverse();
                return Some(loops);
            }
            for &(next, cycle) in &self.adjacency[patch] {
                if !seen[next] {
                    seen[next] = true;
                    parent[next] = Some((patch, cycle));
                    queue.push_back(next);
                }
            }
        }
        None
    }

    fn tube_between(&self, from: usize, to: usize) -> Option<[usize; 2]> {
        match self.path(from, to)?.as_slice() {
            &[first, second] => Some([first, second]),
            _ => None,
        }
    }

    /// Interior channels along body diagonals that this topology can still accept.
    ///
    /// A same-sign diagonal qualifies when its ends sit in different patches two
    /// loops apart. A mixed-sign diagonal qualifies for the sign of end `e` when
    /// the other end is an isolated leaf patch whose only neighbour, of sign `e`,
    /// lies two loops away from the patch of `e`.
    pub fn tunnels(&self) -> Vec<TunnelCandidate> {
        let mut found: Vec<TunnelCandidate> = Vec::new();
        for (diagonal, &[p, q]) in DIAGONALS.iter().enumerate() {
            let (set_p, set_q) = (cube::is_set(self.pattern, p), cube::is_set(self.pattern, q));

            let mut push = |set_side: bool, loops: [usize; 2]| {
                if !found
                    .iter()
                    .any(|t| t.diagonal as usize == diagonal && t.set_side == set_side)
                {
                    found.push(TunnelCandidate {
                        diagonal: diagonal as u8,
                        set_side,
                        loops,
                    });
                }
            };

            if set_p == set_q {
                let (a, b) = (self.patch_of[p], self.patch_of[q]);
                if a != b {
                    if let Some(loops) = self.tube_between(a, b) {
                        push(set_p, loops);
                    }
                }
                continue;
            }

            for (end, other) in [(p, q), (q, p)] {
                let leaf = self.patch_of[other];
                if let &[(neighbour, _)] = self.adjacency[leaf].as_slice() {
                    let home = self.patch_of[end];
                    if neighbour != home {
                        if let Some(loops) = self.tube_between(home, neighbour) {
                            push(cube::is_set(self.pattern, end), loops);
                        }
                    }
                }
            }
        }
        found
    }

    /// One disc per loop
    pub fn triangulate(&self) -> Vec<[u8; 3]> {
        self.loops.iter().flat_map(|cycle| disc(cycle)).collect()
    }

    /// Discs for every loop except `tube`, which is replaced by a band between its two loops.
    /// `None` when the two loops admit no band off the cube faces.
    pub fn triangulate_with_tube(&self, tube: [usize; 2]) -> Option<Vec<[u8; 3]>> {
        let band = band(&self.loops[tube[0]], &self.loops[tube[1]]);
        if band.is_empty() {
            return None;
        }
        let mut triangles: Vec<[u8; 3]> = self
            .loops
            .iter()
            .enumerate()
            .filter(|(index, _)| !tube.contains(index))
            .flat_map(|(_, cycle)| disc(cycle))
            .collect();
        triangles.extend(band);
        Some(triangles)
    }

    /// Check that `triangles` form an oriented surface bounded exactly by the loops
    pub fn verify(&self, triangles: &[[u8; 3]]) -> Result<()> {
        let fail = |what: String| {
            Err(Error::CaseTable(format!(
                "Pattern {:#010b}: {}",
                self.pattern, what
            )))
        };

        let mut directed: HashMap<(u8, u8), usize> = HashMap::new();
        for t in triangles {
            if t.iter().any(|&s| s > CENTER_SLOT) || t[0] == t[1] || t[1] == t[2] || t[0] == t[2] {
                return fail(format!("bad triangle {:?}", t));
            }
            if cube::on_common_face(t) {
                return fail(format!("triangle {:?} lies in a cube face", t));
            }
            for k in 0..3 {
                *directed.entry((t[k], t[(k + 1) % 3])).or_insert(0) += 1;
            }
        }

        let boundary: HashSet<(u8, u8)> = self
            .loops
            .iter()
            .flat_map(|cycle| cycle.iter().copied().circular_tuple_windows::<(u8, u8)>())
            .collect();

        for (&(a, b), &count) in &directed {
            if count != 1 {
                return fail(format!("edge {}->{} used {} times", a, b, count));
            }
            let paired = directed.contains_key(&(b, a));
            if paired == boundary.contains(&(a, b)) {
                return fail(format!("edge {}->{} breaks the loop boundary", a, b));
            }
        }
        if let Some(missing) = boundary.iter().find(|s| !directed.contains_key(s)) {
            return fail(format!("loop segment {:?} not covered", missing));
        }
        Ok(())
    }
}

/// Oriented segments of one face. Set corners lie to the left of each segment
/// as seen from outside the cell.
fn face_segments(pattern: u8, face: usize, set_joined: bool) -> Result<Vec<(u8, u8)>> {
    let corners = FACES[face];
    let set = corners.map(|c| cube::is_set(pattern, c));
    let mut edges = [0usize; 4];
    for i in 0..4 {
        edges[i] = cube::edge_between(corners[i], corners[(i + 1) % 4]).ok_or_else(|| {
            Error::CaseTable(format!("Face {} corners {:?} are not a cycle", face, corners))
        })?;
    }
    let crossings: Vec<usize> = (0..4).filter(|&i| set[i] != set[(i + 1) % 4]).collect();

    match crossings.as_slice() {
        [] => Ok(Vec::new()),
        &[first, second] => {
            let reference = (0..4).find(|&i| set[i]).unwrap_or(0);
            Ok(vec![orient(
                face,
                edges[first],
                edges[second],
                corners[reference],
                set[reference],
            )])
        }
        [_, _, _, _] => Ok((0..4)
            // Joining the set diagonal cuts off the unset corners, and vice versa
            .filter(|&i| set[i] != set_joined)
            .map(|i| orient(face, edges[(i + 3) % 4], edges[i], corners[i], set[i]))
            .collect()),
        _ => Err(Error::CaseTable(format!(
            "Face {} of pattern {:#010b} has {} crossings",
            face,
            pattern,
            crossings.len()
        ))),
    }
}

/// Order the segment between two edge midpoints so that `corner` lies on the
/// left (for a set corner) or on the right (for an unset one).
fn orient(face: usize, a: usize, b: usize, corner: usize, corner_set: bool) -> (u8, u8) {
    let p = cube::slot_midpoint(a as u8);
    let q = cube::slot_midpoint(b as u8);
    let s = cube::corner_position(corner);
    let side = (q - p).cross(&(s - p)).dot(&cube::face_normal(face));
    if (side > 0.0) == corner_set {
        (a as u8, b as u8)
    } else {
        (b as u8, a as u8)
    }
}

fn chain_loops(pattern: u8, segments: &[(u8, u8)]) -> Result<Vec<Vec<u8>>> {
    let fail = |what: &str| {
        Err(Error::CaseTable(format!(
            "Pattern {:#010b}: {}",
            pattern, what
        )))
    };

    let mut next: [Option<u8>; 12] = [None; 12];
    let mut has_previous = [false; 12];
    for &(tail, head) in segments {
        if next[tail as usize].is_some() || has_previous[head as usize] {
            return fail("edge joined by more than two segments");
        }
        next[tail as usize] = Some(head);
        has_previous[head as usize] = true;
    }
    for (slot, &[a, b]) in EDGES.iter().enumerate() {
        let crossing = cube::is_set(pattern, a) != cube::is_set(pattern, b);
        if crossing != next[slot].is_some() || crossing != has_previous[slot] {
            return fail("open loop");
        }
    }

    let mut visited = [false; 12];
    let mut loops = Vec::new();
    for start in 0..12u8 {
        if visited[start as usize] || next[start as usize].is_none() {
            continue;
        }
        let mut cycle = Vec::new();
        let mut current = start;
        loop {
            visited[current as usize] = true;
            cycle.push(current);
            current = match next[current as usize] {
                Some(slot) => slot,
                None => return fail("open loop"),
            };
            if current == start {
                break;
            }
            if visited[current as usize] {
                return fail("loops cross");
            }
        }
        loops.push(cycle);
    }
    Ok(loops)
}

/// Group corners into connected regions of equal sign
fn patches(pattern: u8, joined: [bool; 6]) -> [usize; 8] {
    fn find(parent: &mut [usize; 8], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }
    fn union(parent: &mut [usize; 8], a: usize, b: usize) {
        let (ra, rb) = (find(parent, a), find(parent, b));
        parent[ra.max(rb)] = ra.min(rb);
    }

    let mut parent: [usize; 8] = std::array::from_fn(|i| i);
    for &[a, b] in &EDGES {
        if cube::is_set(pattern, a) == cube::is_set(pattern, b) {
            union(&mut parent, a, b);
        }
    }
    for (face, corners) in FACES.iter().enumerate() {
        if !cube::face_is_ambiguous(pattern, face) {
            continue;
        }
        let set_diagonal = cube::is_set(pattern, corners[0]);
        // Exactly one diagonal of an ambiguous face is connected
        let (a, b) = if set_diagonal == joined[face] {
            (corners[0], corners[2])
        } else {
            (corners[1], corners[3])
        };
        union(&mut parent, a, b);
    }

    let mut roots: Vec<usize> = Vec::new();
    let mut patch_of = [0usize; 8];
    for corner in 0..8 {
        let root = find(&mut parent, corner);
        patch_of[corner] = match roots.iter().position(|&r| r == root) {
            Some(index) => index,
            None => {
                roots.push(root);
                roots.len() - 1
            }
        };
    }
    patch_of
}

fn loop_patches(patch_of: &[usize; 8], cycle: &[u8]) -> Result<[usize; 2]> {
    let mut pair: Option<[usize; 2]> = None;
    for &slot in cycle {
        let [a, b] = EDGES[slot as usize];
        let (pa, pb) = (patch_of[a], patch_of[b]);
        let current = [pa.min(pb), pa.max(pb)];
        match pair {
            None => pair = Some(current),
            Some(existing) if existing != current => {
                return Err(Error::CaseTable(format!(
                    "Loop {:?} separates more than two patches",
                    cycle
                )))
            }
            Some(_) => {}
        }
    }
    pair.ok_or_else(|| Error::CaseTable("Empty loop".to_string()))
}

/// Triangulate a loop as a disc keeping its orientation.
///
/// Short loops are fanned from a vertex whose chords all cross the cell interior.
/// A chord between two slots of one face would lie in that face, where the
/// neighbouring cell may draw the same edge. Loops without such a vertex, and
/// long loops, are fanned about the cell center.
fn disc(cycle: &[u8]) -> Vec<[u8; 3]> {
    let n = cycle.len();
    let apex = (n < CENTER_FAN_MIN)
        .then(|| {
            (0..n).find(|&r| {
                (2..n.saturating_sub(1)).all(|j| !cube::on_common_face(&[cycle[r], cycle[(r + j) % n]]))
            })
        })
        .flatten();

    match apex {
        Some(r) => (1..n.saturating_sub(1))
            .map(|i| [cycle[r], cycle[(r + i) % n], cycle[(r + i + 1) % n]])
            .collect(),
        None => cycle
            .iter()
            .copied()
            .circular_tuple_windows::<(u8, u8)>()
            .map(|(a, b)| [a, b, CENTER_SLOT])
            .collect(),
    }
}

/// Extra cost of a band rung lying in a cube face
const IN_FACE_RUNG_COST: f32 = 4.0;

/// Triangulate the band between two loops.
///
/// The band is bounded by both loops in their own direction, so the first loop is
/// walked forward and the second backward. Every starting rung is tried, and the
/// triangulation with the shortest rungs wins among those with no triangle lying
/// in a cube face. An empty result means no such triangulation exists.
fn band(first: &[u8], second: &[u8]) -> Vec<[u8; 3]> {
    let reversed: Vec<u8> = second.iter().rev().copied().collect();
    let mut best: Option<(f32, Vec<[u8; 3]>)> = None;
    for s in 0..first.len() {
        for t in 0..reversed.len() {
            for lead_first in [true, false] {
                if let Some((cost, triangles)) = zipper(first, &reversed, (s, t), lead_first) {
                    if best.as_ref().map_or(true, |(b, _)| cost < *b) {
                        best = Some((cost, triangles));
                    }
                }
            }
        }
    }
    best.map(|(_, triangles)| triangles).unwrap_or_default()
}

/// Cheapest zipper between two loops rotated to start at `start`.
///
/// Lattice node `(i, k)` is the rung from `a[i]` to `c[k]`. A step along `a` or
/// along `c` adds one triangle. The path leaves `(0, 0)` along one loop and reaches
/// `(n, m)` along the other, and skips `(n, 0)` and `(0, m)`, so no rung is used
/// twice around the band.
fn zipper(
    a: &[u8],
    c: &[u8],
    start: (usize, usize),
    lead_first: bool,
) -> Option<(f32, Vec<[u8; 3]>)> {
    let (n, m) = (a.len(), c.len());
    let at = |i: usize| a[(start.0 + i) % n];
    let ct = |k: usize| c[(start.1 + k) % m];
    let rung = |i: usize, k: usize| {
        let (p, q) = (at(i), ct(k));
        let length = (cube::slot_midpoint(p) - cube::slot_midpoint(q)).norm_squared();
        if cube::on_common_face(&[p, q]) {
            length + IN_FACE_RUNG_COST
        } else {
            length
        }
    };
    let along_first = |i: usize, k: usize| [at(i), at(i + 1), ct(k)];
    let along_second = |i: usize, k: usize| [at(i), ct(k + 1), ct(k)];

    let mut cost = vec![vec![f32::INFINITY; m + 1]; n + 1];
    let mut via_first = vec![vec![false; m + 1]; n + 1];
    cost[0][0] = rung(0, 0);

    for i in 0..=n {
        for k in 0..=m {
            if (i, k) == (0, 0) || (i, k) == (n, 0) || (i, k) == (0, m) {
                continue;
            }
            let leaving = |from: (usize, usize), first_step: bool| {
                (from != (0, 0) || first_step == lead_first)
                    && ((i, k) != (n, m) || first_step != lead_first)
            };

            let mut here = f32::INFINITY;
            if i > 0 && leaving((i - 1, k), true) && !cube::on_common_face(&along_first(i - 1, k)) {
                here = cost[i - 1][k];
                via_first[i][k] = true;
            }
            if k > 0
                && leaving((i, k - 1), false)
                && !cube::on_common_face(&along_second(i, k - 1))
                && cost[i][k - 1] < here
            {
                here = cost[i][k - 1];
                via_first[i][k] = false;
            }
            if here.is_finite() {
                cost[i][k] = here + if (i, k) == (n, m) { 0.0 } else { rung(i, k) };
            }
        }
    }

    if !cost[n][m].is_finite() {
        return None;
    }
    let mut triangles = Vec::with_capacity(n + m);
    let (mut i, mut k) = (n, m);
    while (i, k) != (0, 0) {
        if via_first[i][k] {
            i -= 1;
            triangles.push(along_first(i, k));
        } else {
            k -= 1;
            triangles.push(along_second(i, k));
        }
    }
    triangles.reverse();
    Some((cost[n][m], triangles))
}
