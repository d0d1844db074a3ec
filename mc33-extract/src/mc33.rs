//! Marching Cubes 33 isosurface extraction
//!
//! This module sweeps a scalar field cell by cell (x fastest, then y, then z),
//! classifies each cell with the MC33 case table, resolves ambiguous faces and
//! interior channels, and streams vertices and triangles into a mesh sink.
//! Vertices on shared edges are created once and reused by every cell that
//! touches them, so closed level sets produce closed meshes.

use crate::case_table::{self, CaseTable};
use crate::classifier::{self, CellClassifier};
use crate::cube::{CORNERS, EDGES, SLOT_COUNT};
use crate::sampler::PointSampler;
use crate::vertex_cache::{EdgeKey, VertexCache};
use mc33_core::{
    ArrayGrid, Error, MeshSink, NormalMeshSink, Point3f, Result, ScalarField, Surface, Vector3f,
    Vertex,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

/// Configuration for MC33 extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mc33Config {
    /// Isosurface level (scalar value to extract)
    pub iso_level: f32,
    /// Whether [`Mc33::extract_surface`] computes vertex normals
    pub compute_normals: bool,
}

impl Default for Mc33Config {
    fn default() -> Self {
        Self {
            iso_level: 0.0,
            compute_normals: false,
        }
    }
}

impl Mc33Config {
    pub fn with_iso_level(mut self, iso_level: f32) -> Self {
        self.iso_level = iso_level;
        self
    }

    pub fn with_normals(mut self, compute_normals: bool) -> Self {
        self.compute_normals = compute_normals;
        self
    }
}

/// Counters collected during one extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Cells visited
    pub cells: usize,
    /// Cells that produced triangles
    pub active_cells: usize,
    /// Active cells of an ambiguous case
    pub ambiguous_cells: usize,
    /// Cells resolved with an interior tunnel
    pub tunnels: usize,
    pub vertices: usize,
    pub triangles: usize,
    /// Triangles dropped because two corners resolved to the same vertex
    pub degenerate_triangles: usize,
}

/// MC33 extractor bound to a case table
#[derive(Debug, Clone)]
pub struct Mc33<'t> {
    config: Mc33Config,
    table: &'t CaseTable,
}

impl Mc33<'static> {
    /// Create an extractor using the shared case table
    pub fn new(config: Mc33Config) -> Result<Self> {
        Ok(Self {
            config,
            table: CaseTable::shared()?,
        })
    }
}

impl<'t> Mc33<'t> {
    /// Create an extractor with an explicitly supplied case table
    pub fn with_table(config: Mc33Config, table: &'t CaseTable) -> Self {
        Self { config, table }
    }

    pub fn config(&self) -> &Mc33Config {
        &self.config
    }

    /// Extract positions only into `sink`
    pub fn extract<F, S>(&self, field: &F, sink: &mut S) -> Result<ExtractionStats>
    where
        F: ScalarField,
        S: MeshSink,
    {
        self.sweep(field, PositionEmitter(sink))
    }

    /// Extract positions and unit normals into `sink`
    pub fn extract_with_normals<F, S>(&self, field: &F, sink: &mut S) -> Result<ExtractionStats>
    where
        F: ScalarField,
        S: NormalMeshSink,
    {
        self.sweep(field, NormalEmitter(sink))
    }

    /// Extract into a fresh [`Surface`], with normals if the config asks for them
    pub fn extract_surface<F: ScalarField>(&self, field: &F) -> Result<Surface> {
        let mut surface = Surface::new();
        if self.config.compute_normals {
            surface.normals = Some(Vec::new());
            self.extract_with_normals(field, &mut surface)?;
        } else {
            self.extract(field, &mut surface)?;
        }
        Ok(surface)
    }

    fn sweep<F, E>(&self, field: &F, emitter: E) -> Result<ExtractionStats>
    where
        F: ScalarField,
        E: Emitter,
    {
        let size = field.size();
        if size.contains(&0) {
            return Err(Error::InvalidData(format!(
                "Scalar field needs at least one cell per axis, got {:?}",
                size
            )));
        }
        let iso = self.config.iso_level;
        info!(?size, iso, normals = E::NORMALS, "Extracting MC33 isosurface");

        let mut sweep = Sweep {
            field,
            iso,
            sampler: PointSampler::new(field),
            cache: VertexCache::new(size),
            emitter,
            stats: ExtractionStats::default(),
        };
        let classifier = CellClassifier::new(self.table);
        let [nx, ny, nz] = size;

        for z in 0..nz {
            for y in 0..ny {
                let mut v = [0.0f32; 8];
                sweep.load_face(0, y, z, &mut v[4..]);
                let mut pattern = classifier::face_bits(&v[4..]) << 4;

                for x in 0..nx {
                    v.copy_within(4..8, 0);
                    sweep.load_face(x + 1, y, z, &mut v[4..]);
                    pattern = classifier::advance_pattern(pattern, classifier::face_bits(&v[4..]));
                    sweep.stats.cells += 1;

                    if pattern == 0 || pattern == 0xFF {
                        continue;
                    }
                    if let Some(cell) = classifier.classify(pattern, &v) {
                        if cell.triangles.is_empty() {
                            return Err(Error::Algorithm(format!(
                                "No triangles for {} subcase {} at cell {:?}",
                                cell.descriptor.case,
                                cell.descriptor.subcase,
                                [x, y, z]
                            )));
                        }
                        trace!(
                            x, y, z,
                            case = cell.descriptor.case.number(),
                            subcase = cell.descriptor.subcase,
                            outcome = ?cell.outcome,
                            "Classified cell"
                        );
                        sweep.stats.active_cells += 1;
                        if cell.descriptor.case.is_ambiguous() {
                            sweep.stats.ambiguous_cells += 1;
                        }
                        if matches!(cell.outcome, case_table::Outcome::Tunnel { .. }) {
                            sweep.stats.tunnels += 1;
                        }
                        sweep.emit_cell([x, y, z], &v, cell.triangles, cell.descriptor.reversed);
                    }
                }
                sweep.cache.end_row();
            }
            sweep.cache.end_slab();
        }

        let stats = sweep.stats;
        debug!(
            active = stats.active_cells,
            ambiguous = stats.ambiguous_cells,
            tunnels = stats.tunnels,
            degenerate = stats.degenerate_triangles,
            "Extraction statistics"
        );
        info!(
            vertices = stats.vertices,
            triangles = stats.triangles,
            "MC33 extraction complete"
        );
        Ok(stats)
    }
}

/// Writes vertices with or without normals
trait Emitter {
    const NORMALS: bool;

    fn vertex(&mut self, vertex: Vertex) -> usize;

    fn triangle(&mut self, i: usize, j: usize, k: usize);
}

struct PositionEmitter<'s, S: MeshSink>(&'s mut S);

impl<S: MeshSink> Emitter for PositionEmitter<'_, S> {
    const NORMALS: bool = false;

    fn vertex(&mut self, vertex: Vertex) -> usize {
        self.0.add_vertex(vertex.position)
    }

    fn triangle(&mut self, i: usize, j: usize, k: usize) {
        self.0.add_triangle(i, j, k);
    }
}

struct NormalEmitter<'s, S: NormalMeshSink>(&'s mut S);

impl<S: NormalMeshSink> Emitter for NormalEmitter<'_, S> {
    const NORMALS: bool = true;

    fn vertex(&mut self, vertex: Vertex) -> usize {
        let normal = vertex.normal.unwrap_or_else(Vector3f::z);
        self.0.add_vertex_with_normal(vertex.position, normal)
    }

    fn triangle(&mut self, i: usize, j: usize, k: usize) {
        self.0.add_triangle(i, j, k);
    }
}

/// Mutable state of one extraction
struct Sweep<'f, F: ScalarField, E: Emitter> {
    field: &'f F,
    iso: f32,
    sampler: PointSampler<'f, F>,
    cache: VertexCache,
    emitter: E,
    stats: ExtractionStats,
}

impl<F: ScalarField, E: Emitter> Sweep<'_, F, E> {
    fn value(&self, [x, y, z]: [usize; 3]) -> f32 {
        self.iso - self.field.sample(x, y, z)
    }

    /// Corner values of the x-face at `x`, in corner order 0, 1, 2, 3
    fn load_face(&self, x: usize, y: usize, z: usize, out: &mut [f32]) {
        out[0] = self.value([x, y, z]);
        out[1] = self.value([x, y + 1, z]);
        out[2] = self.value([x, y + 1, z + 1]);
        out[3] = self.value([x, y, z + 1]);
    }

    fn emit_cell(&mut self, cell: [usize; 3], v: &[f32; 8], triangles: &[u16], reversed: bool) {
        self.cache.begin_cell(cell);
        let mut resolved = [None; SLOT_COUNT];

        for &packed in triangles {
            let slots = case_table::unpack(packed);
            let [a, b, c] = slots.map(|slot| self.slot_vertex(cell, slot, v, &mut resolved));
            if a == b || b == c || a == c {
                self.stats.degenerate_triangles += 1;
                continue;
            }
            if reversed {
                self.emitter.triangle(c, b, a);
            } else {
                self.emitter.triangle(a, b, c);
            }
            self.stats.triangles += 1;
        }
    }

    fn slot_vertex(
        &mut self,
        cell: [usize; 3],
        slot: u8,
        v: &[f32; 8],
        resolved: &mut [Option<usize>; SLOT_COUNT],
    ) -> usize {
        let slot = (slot as usize).min(SLOT_COUNT - 1);
        if let Some(index) = resolved[slot] {
            return index;
        }

        let index = match EdgeKey::of_slot(cell, slot) {
            None => self.create(self.sampler.center_vertex(cell, v, E::NORMALS)),
            Some(key) => self.edge_vertex(cell, slot, key, v),
        };
        resolved[slot] = Some(index);
        index
    }

    fn edge_vertex(&mut self, cell: [usize; 3], slot: usize, key: EdgeKey, v: &[f32; 8]) -> usize {
        if let Some(index) = self.cache.lookup(&key) {
            return index;
        }

        let [a, b] = EDGES[slot];
        let snapped = if v[a] == 0.0 {
            Some(a)
        } else if v[b] == 0.0 {
            Some(b)
        } else {
            None
        };

        let index = match snapped {
            Some(corner) => {
                // Every crossing edge meeting at this grid point shares its vertex
                let point: [usize; 3] = std::array::from_fn(|k| cell[k] + CORNERS[corner][k]);
                match self.cache.lookup_snapped(point) {
                    Some(index) => index,
                    None => {
                        let index = self.create(self.sampler.edge_vertex(cell, slot, v, E::NORMALS));
                        self.cache.store_snapped(point, index);
                        index
                    }
                }
            }
            None => self.create(self.sampler.edge_vertex(cell, slot, v, E::NORMALS)),
        };
        self.cache.store(&key, index);
        index
    }

    fn create(&mut self, vertex: Vertex) -> usize {
        self.stats.vertices += 1;
        self.emitter.vertex(vertex)
    }
}

/// Extract the isosurface of `field` at `iso_level` into `sink` using the shared case table
pub fn extract<F, S>(field: &F, iso_level: f32, sink: &mut S) -> Result<ExtractionStats>
where
    F: ScalarField,
    S: MeshSink,
{
    Mc33::new(Mc33Config::default().with_iso_level(iso_level))?.extract(field, sink)
}

/// Convenience function for basic MC33 extraction
pub fn marching_cubes33<F: ScalarField>(field: &F, iso_level: f32) -> Result<Surface> {
    Mc33::new(Mc33Config::default().with_iso_level(iso_level))?.extract_surface(field)
}

/// Convenience function for MC33 extraction with per-vertex normals
pub fn marching_cubes33_with_normals<F: ScalarField>(field: &F, iso_level: f32) -> Result<Surface> {
    let config = Mc33Config::default()
        .with_iso_level(iso_level)
        .with_normals(true);
    Mc33::new(config)?.extract_surface(field)
}

/// Create a signed-distance volume of a sphere: negative inside, positive outside.
///
/// `samples` counts grid samples per axis and `extent` is the world size of the
/// grid, which is centered on `center`.
pub fn create_sphere_volume(
    center: Point3f,
    radius: f32,
    samples: [usize; 3],
    extent: [f32; 3],
) -> Result<ArrayGrid> {
    if samples.iter().any(|&n| n < 2) {
        return Err(Error::InvalidData(format!(
            "Sphere volume needs at least 2 samples per axis, got {:?}",
            samples
        )));
    }
    let origin = Point3f::new(
        center.x - extent[0] / 2.0,
        center.y - extent[1] / 2.0,
        center.z - extent[2] / 2.0,
    );
    let spacing = Vector3f::new(
        extent[0] / (samples[0] - 1) as f32,
        extent[1] / (samples[1] - 1) as f32,
        extent[2] / (samples[2] - 1) as f32,
    );
    let cells = [samples[0] - 1, samples[1] - 1, samples[2] - 1];

    ArrayGrid::from_fn(cells, origin, spacing, |x, y, z| {
        let p = origin + spacing.component_mul(&Vector3f::new(x as f32, y as f32, z as f32));
        (p - center).norm() - radius
    })
}
