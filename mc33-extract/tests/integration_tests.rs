//! Integration tests for mc33-extract
//!
//! These tests run whole extractions over small hand-built grids and check the
//! resulting meshes: geometry against expected triangles, closedness of
//! padded fields, vertex sharing and the normal-producing variant.

use mc33_core::{are_equivalent, Point3f, Vector3f, EQUIVALENCE_EPSILON};
use mc33_extract::cube::CORNERS;
use mc33_extract::*;

/// A single-cell grid holding `samples` in corner order
fn cube_grid(samples: [f32; 8], spacing: f32) -> ArrayGrid {
    ArrayGrid::from_fn([1, 1, 1], Point3f::origin(), Vector3f::repeat(spacing), |x, y, z| {
        let corner = CORNERS.iter().position(|c| *c == [x, y, z]).unwrap();
        samples[corner]
    })
    .unwrap()
}

fn corner_point(corner: usize, spacing: f32) -> Point3f {
    let [x, y, z] = CORNERS[corner];
    Point3f::new(x as f32, y as f32, z as f32) * spacing
}

/// Build a surface from loose triangles, flipping each so its normal faces `toward`
fn oriented(triangles: &[[Point3f; 3]], toward: &Vector3f) -> Surface {
    let mut surface = Surface::new();
    for t in triangles {
        let normal = (t[1] - t[0]).cross(&(t[2] - t[0]));
        let order = if normal.dot(toward) >= 0.0 { [0, 1, 2] } else { [0, 2, 1] };
        let base = surface.vertex_count();
        for k in order {
            surface.add_vertex(t[k]);
        }
        surface.add_triangle(base, base + 1, base + 2);
    }
    surface
}

/// Every fan triangulation of a convex polygon given in cyclic order
fn fans(polygon: &[Point3f]) -> Vec<Vec<[Point3f; 3]>> {
    let n = polygon.len();
    (0..n)
        .map(|s| {
            (1..n - 1)
                .map(|i| [polygon[s], polygon[(s + i) % n], polygon[(s + i + 1) % n]])
                .collect()
        })
        .collect()
}

/// A grid of `cells` cells whose outer samples all lie above the isovalue
fn padded_grid(cells: usize, inner: impl Fn(usize, usize, usize) -> f32) -> ArrayGrid {
    ArrayGrid::from_fn(
        [cells, cells, cells],
        Point3f::origin(),
        Vector3f::repeat(1.0),
        |x, y, z| {
            let on_shell = [x, y, z].iter().any(|&c| c == 0 || c == cells);
            if on_shell {
                1.0
            } else {
                inner(x, y, z)
            }
        },
    )
    .unwrap()
}

/// Euler characteristic of a closed triangle mesh: V - E + F with E = 3F / 2
fn euler_characteristic(surface: &Surface) -> i64 {
    surface.vertex_count() as i64 - surface.triangle_count() as i64 / 2
}

#[test]
fn test_uniform_fields_produce_nothing() {
    for sample in [-1.0, 1.0] {
        let surface = marching_cubes33(&cube_grid([sample; 8], 1.0), 0.0).unwrap();
        assert!(surface.is_empty());
        assert_eq!(surface.vertex_count(), 0);
    }
}

#[test]
fn test_single_corner_every_position() {
    // (inside sample, outside sample, iso level, crossing fraction from the corner)
    let cases: [(f32, f32, f32, f32); 4] = [
        (-1.0, 1.0, 0.0, 0.5),
        (-3.0, 1.0, 0.0, 0.75),
        (-1.0, 3.0, 0.0, 0.25),
        (-0.5, 1.5, 0.5, 0.5),
    ];

    for corner in 0..8 {
        for &(inside, outside, iso, t) in &cases {
            let p = corner_point(corner, 1.0);
            let neighbours: Vec<Point3f> = (0..8)
                .filter(|&n| mc33_extract::cube::corner_distance(corner, n) == 1)
                .map(|n| p + (corner_point(n, 1.0) - p) * t)
                .collect();
            let triangle = [neighbours[0], neighbours[1], neighbours[2]];
            let centroid = Point3f::from((triangle[0].coords + triangle[1].coords + triangle[2].coords) / 3.0);

            // One corner below the isovalue: the normal faces that corner
            let mut samples = [outside; 8];
            samples[corner] = inside;
            let surface = marching_cubes33(&cube_grid(samples, 1.0), iso).unwrap();
            let expected = oriented(&[triangle], &(p - centroid));
            assert!(
                are_equivalent(&surface, &expected, EQUIVALENCE_EPSILON),
                "corner {} with samples ({}, {})",
                corner,
                inside,
                outside
            );
            assert_eq!(surface.vertex_count(), 3);
        }

        // One corner above the isovalue: same triangle facing the other way
        let mut samples = [-1.0; 8];
        samples[corner] = 1.0;
        let p = corner_point(corner, 1.0);
        let neighbours: Vec<Point3f> = (0..8)
            .filter(|&n| mc33_extract::cube::corner_distance(corner, n) == 1)
            .map(|n| p + (corner_point(n, 1.0) - p) * 0.5)
            .collect();
        let triangle = [neighbours[0], neighbours[1], neighbours[2]];
        let surface = marching_cubes33(&cube_grid(samples, 1.0), 0.0).unwrap();
        let centroid = Point3f::from((triangle[0].coords + triangle[1].coords + triangle[2].coords) / 3.0);
        let expected = oriented(&[triangle], &(centroid - p));
        assert!(are_equivalent(&surface, &expected, EQUIVALENCE_EPSILON), "corner {} reversed", corner);
    }
}

#[test]
fn test_grid_spacing_scales_positions() {
    let spacing = 0.75;
    let mut samples = [1.0; 8];
    samples[6] = -3.0;
    let surface = marching_cubes33(&cube_grid(samples, spacing), 0.0).unwrap();

    // Crossings sit three quarters of the way from corner 6 towards its neighbours
    let p = corner_point(6, spacing);
    let triangle = [
        p + (corner_point(2, spacing) - p) * 0.75,
        p + (corner_point(5, spacing) - p) * 0.75,
        p + (corner_point(7, spacing) - p) * 0.75,
    ];
    let centroid = Point3f::from((triangle[0].coords + triangle[1].coords + triangle[2].coords) / 3.0);
    let expected = oriented(&[triangle], &(p - centroid));
    assert!(are_equivalent(&surface, &expected, EQUIVALENCE_EPSILON));

    for vertex in surface.vertices() {
        assert!(vertex.coords.iter().all(|&c| (0.0..=spacing).contains(&c)));
    }
}

#[test]
fn test_adjacent_corners_form_quad() {
    // Corners 0 and 1 share the edge x = 0, z = 0
    let polygon = [
        Point3f::new(0.0, 0.0, 0.5),
        Point3f::new(0.5, 0.0, 0.0),
        Point3f::new(0.5, 1.0, 0.0),
        Point3f::new(0.0, 1.0, 0.5),
    ];
    for inside in [-1.0f32, 1.0] {
        let mut samples = [-inside; 8];
        samples[0] = inside;
        samples[1] = inside;
        let surface = marching_cubes33(&cube_grid(samples, 1.0), 0.0).unwrap();
        assert_eq!(surface.triangle_count(), 2);
        assert_eq!(surface.vertex_count(), 4);

        // Normals face the corners below the isovalue
        let toward = Vector3f::new(-1.0, 0.0, -1.0) * -inside;
        let matches = fans(&polygon)
            .iter()
            .any(|fan| are_equivalent(&surface, &oriented(fan, &toward), EQUIVALENCE_EPSILON));
        assert!(matches, "inside sample {}", inside);
    }
}

#[test]
fn test_half_cube_forms_plane() {
    // Corners 0, 1, 4 and 5 make up the face z = 0
    let mut samples = [1.0; 8];
    for corner in [0, 1, 4, 5] {
        samples[corner] = -1.0;
    }
    let surface = marching_cubes33(&cube_grid(samples, 1.0), 0.0).unwrap();

    let polygon = [
        Point3f::new(0.0, 0.0, 0.5),
        Point3f::new(0.0, 1.0, 0.5),
        Point3f::new(1.0, 1.0, 0.5),
        Point3f::new(1.0, 0.0, 0.5),
    ];
    let toward = Vector3f::new(0.0, 0.0, -1.0);
    assert!(fans(&polygon)
        .iter()
        .any(|fan| are_equivalent(&surface, &oriented(fan, &toward), EQUIVALENCE_EPSILON)));
    for normal in surface.calculate_face_normals() {
        assert!(normal.z < -0.99);
    }
}

#[test]
fn test_opposite_corners_tunnel() {
    // Corners 0 and 6 lie below the isovalue on opposite ends of a body diagonal
    let mut separated = [1.0; 8];
    separated[0] = -1.0;
    separated[6] = -1.0;
    let surface = marching_cubes33(&cube_grid(separated, 1.0), 0.0).unwrap();
    assert_eq!(surface.triangle_count(), 2);

    // Weak positive samples let a channel form between them
    let mut connected = [0.1; 8];
    connected[0] = -1.0;
    connected[6] = -1.0;
    let surface = marching_cubes33(&cube_grid(connected, 1.0), 0.0).unwrap();
    assert_eq!(surface.vertex_count(), 6);
    assert_eq!(surface.triangle_count(), 6);
}

#[test]
fn test_every_corner_combination_extracts() {
    let extractor = Mc33::new(Mc33Config::default()).unwrap();
    let mut grid = ArrayGrid::new([1, 1, 1], Point3f::origin(), Vector3f::repeat(1.0)).unwrap();
    let levels = [-2.0f32, -1.0, 0.0, 1.0, 2.0];
    let mut surface = Surface::new();

    for code in 0..levels.len().pow(8) {
        let mut rest = code;
        for &[x, y, z] in CORNERS.iter() {
            grid.set(x, y, z, levels[rest % levels.len()]).unwrap();
            rest /= levels.len();
        }

        surface.clear();
        let stats = extractor.extract(&grid, &mut surface).unwrap();
        assert_eq!(stats.triangles, surface.triangle_count());
        for face in &surface.faces {
            assert!(face.iter().all(|&i| i < surface.vertex_count()), "code {}", code);
            assert!(face[0] != face[1] && face[1] != face[2] && face[0] != face[2]);
        }
    }
}

#[test]
fn test_padded_grids_are_closed() {
    // Every sign pattern on the inner 2x2x2 block, with uneven magnitudes
    let extractor = Mc33::new(Mc33Config::default()).unwrap();
    for pattern in 0..256usize {
        for variation in 0..3usize {
            let grid = padded_grid(3, |x, y, z| {
                let bit = (x - 1) + 2 * (y - 1) + 4 * (z - 1);
                let magnitude = 0.25 + ((bit * 5 + pattern + variation * 3) % 7) as f32 * 0.3;
                if pattern >> bit & 1 == 1 {
                    -magnitude
                } else {
                    magnitude
                }
            });
            let surface = extractor.extract_surface(&grid).unwrap();
            assert!(
                surface.is_closed(),
                "pattern {:#010b} variation {}",
                pattern,
                variation
            );
        }
    }
}

/// Deterministic sample picker for the randomized grid tests
fn scrambled(seed: usize, x: usize, y: usize, z: usize) -> usize {
    let mut h = (seed as u64) << 32 ^ (x as u64) << 20 ^ (y as u64) << 10 ^ z as u64;
    h = h.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    h ^= h >> 29;
    h = h.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    (h >> 32) as usize
}

#[test]
fn test_random_padded_grids_are_closed() {
    let extractor = Mc33::new(Mc33Config::default()).unwrap();
    let levels = [-1.0f32, -0.35, 0.2, 0.7, 1.3];
    for seed in 0..300 {
        let grid = padded_grid(4, |x, y, z| levels[scrambled(seed, x, y, z) % levels.len()]);
        let surface = extractor.extract_surface(&grid).unwrap();
        assert!(surface.is_closed(), "seed {}", seed);
    }
}

#[test]
fn test_zero_samples_leave_no_open_edges() {
    // Exact zeros snap vertices onto grid points. Collapsed sheets may leave
    // back-to-back triangles, but every edge stays balanced and no vertex is duplicated.
    let extractor = Mc33::new(Mc33Config::default()).unwrap();
    let levels = [-1.0f32, -0.4, 0.0, 0.6, 1.0];
    let mut snapped = 0;
    for seed in 0..300 {
        let grid = padded_grid(4, |x, y, z| levels[scrambled(seed, x, y, z) % levels.len()]);
        let mut surface = Surface::new();
        let stats = extractor.extract(&grid, &mut surface).unwrap();
        snapped += stats.degenerate_triangles;

        assert!(surface.has_balanced_edges(), "seed {}", seed);
        let mut positions: Vec<[u32; 3]> = surface
            .vertices()
            .iter()
            .map(|p| [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()])
            .collect();
        positions.sort_unstable();
        positions.dedup();
        assert_eq!(positions.len(), surface.vertex_count(), "seed {}", seed);
    }
    assert!(snapped > 0);
}

/// Padded grid whose middle cell holds `v`, given as `iso - sample` per corner
fn middle_cell(v: [f32; 8]) -> ArrayGrid {
    padded_grid(3, |x, y, z| {
        let corner = CORNERS
            .iter()
            .position(|c| *c == [x - 1, y - 1, z - 1])
            .unwrap();
        -v[corner]
    })
}

#[test]
fn test_case13_tunnel_changes_genus() {
    // Set corners 1, 4 and 6 link around corner 5 and corner 3 sits apart.
    // Without an interior channel both parts are spheres.
    let separated = middle_cell([-1.0, 1.0, -1.0, 0.1, 1.0, -0.1, 1.0, -1.0]);
    let surface = marching_cubes33(&separated, 0.0).unwrap();
    assert!(surface.is_closed());
    assert_eq!(euler_characteristic(&surface), 4);

    // A strong corner 5 opens a channel through the linked corners, making a torus
    let tunnel = middle_cell([-0.5, 1.0, -0.5, 0.1, 1.0, -1.8, 1.0, -0.5]);
    let mut surface = Surface::new();
    let stats = extract(&tunnel, 0.0, &mut surface).unwrap();
    assert_eq!(stats.tunnels, 1);
    assert!(surface.is_closed());
    assert_eq!(euler_characteristic(&surface), 2);
}

#[test]
fn test_sphere_is_closed_genus_zero() {
    let grid = create_sphere_volume(Point3f::origin(), 0.61, [16, 16, 16], [2.0, 2.0, 2.0]).unwrap();
    let surface = marching_cubes33(&grid, 0.0).unwrap();

    assert!(!surface.is_empty());
    assert!(surface.is_closed());
    assert_eq!(euler_characteristic(&surface), 2);
    for vertex in surface.vertices() {
        let r = vertex.coords.norm();
        assert!((r - 0.61).abs() < 0.05);
    }
}

#[test]
fn test_torus_is_closed_genus_one() {
    let (major, minor) = (0.5f32, 0.21f32);
    let spacing = 2.0 / 24.0;
    let grid = ArrayGrid::from_fn(
        [24, 24, 24],
        Point3f::new(-1.0, -1.0, -1.0),
        Vector3f::repeat(spacing),
        |x, y, z| {
            let p = Vector3f::new(x as f32, y as f32, z as f32) * spacing - Vector3f::repeat(1.0);
            let ring = (p.x * p.x + p.y * p.y).sqrt() - major;
            (ring * ring + p.z * p.z).sqrt() - minor
        },
    )
    .unwrap();
    let surface = marching_cubes33(&grid, 0.0).unwrap();

    assert!(surface.is_closed());
    assert_eq!(euler_characteristic(&surface), 0);
}

#[test]
fn test_shared_vertices_across_cells() {
    // One sample below the isovalue in the middle of a 2x2x2-cell grid
    let grid = padded_grid(2, |_, _, _| -1.0);
    let surface = marching_cubes33(&grid, 0.0).unwrap();

    // An octahedron: one vertex per grid edge around the center
    assert_eq!(surface.vertex_count(), 6);
    assert_eq!(surface.triangle_count(), 8);
    assert!(surface.is_closed());
    assert_eq!(euler_characteristic(&surface), 2);
}

#[test]
fn test_zero_sample_snaps_to_one_vertex() {
    // The middle sample sits exactly on the isovalue
    let grid = padded_grid(2, |_, _, _| 0.0);
    let mut surface = Surface::new();
    let stats = extract(&grid, 0.0, &mut surface).unwrap();

    // All eight cells meet at the snapped point, so every triangle collapses
    assert_eq!(surface.vertex_count(), 1);
    assert!(surface.is_empty());
    assert_eq!(stats.degenerate_triangles, 8);
    assert_eq!(surface.vertices()[0], Point3f::new(1.0, 1.0, 1.0));
}

#[test]
fn test_normals_variant_matches_positions() {
    let grid = create_sphere_volume(Point3f::origin(), 0.55, [12, 12, 12], [2.0, 2.0, 2.0]).unwrap();
    let plain = marching_cubes33(&grid, 0.0).unwrap();
    let shaded = marching_cubes33_with_normals(&grid, 0.0).unwrap();

    assert_eq!(plain.vertices, shaded.vertices);
    assert_eq!(plain.faces, shaded.faces);
    let normals = shaded.normals().unwrap();
    assert_eq!(normals.len(), shaded.vertex_count());

    // Samples grow outwards, so normals face the center
    for (p, n) in shaded.vertices().iter().zip(normals) {
        assert!((n.norm() - 1.0).abs() < 1e-4);
        assert!(n.dot(&p.coords.normalize()) < -0.8);
    }
}

#[test]
fn test_custom_sink_receives_stream() {
    #[derive(Default)]
    struct Counter {
        vertices: usize,
        triangles: Vec<[usize; 3]>,
    }

    impl MeshSink for Counter {
        fn add_vertex(&mut self, _position: Point3f) -> usize {
            self.vertices += 1;
            self.vertices - 1
        }

        fn add_triangle(&mut self, i: usize, j: usize, k: usize) {
            self.triangles.push([i, j, k]);
        }
    }

    let grid = create_sphere_volume(Point3f::origin(), 0.6, [10, 10, 10], [2.0, 2.0, 2.0]).unwrap();
    let mut counter = Counter::default();
    let stats = Mc33::new(Mc33Config::default().with_iso_level(0.05))
        .unwrap()
        .extract(&grid, &mut counter)
        .unwrap();

    let reference = marching_cubes33(&grid, 0.05).unwrap();
    assert_eq!(counter.vertices, reference.vertex_count());
    assert_eq!(counter.triangles, reference.faces);
    assert_eq!(stats.cells, 9 * 9 * 9);
    assert!(stats.active_cells > 0);
}
