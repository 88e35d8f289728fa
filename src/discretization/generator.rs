use super::mesh::TetMesh;
use glam::DVec3;
use std::collections::HashMap;

/// Structured box `[min, max]` split into `nx * ny * nz` cubes, each cut into
/// six tetrahedra along its main diagonal (Kuhn triangulation). Every
/// boundary face is exterior.
///
/// Returns `None` unless `max` exceeds `min` on every axis.
pub fn create_box_mesh(min: DVec3, max: DVec3, divisions: [usize; 3]) -> Option<TetMesh> {
    let extent = max - min;
    if !(extent.is_finite() && extent.min_element() > 0.0) {
        return None;
    }
    let [nx, ny, nz] = divisions.map(|d| d.max(1));
    let h = extent / DVec3::new(nx as f64, ny as f64, nz as f64);

    let id = |i: usize, j: usize, k: usize| i + (nx + 1) * (j + (ny + 1) * k);

    let mut positions = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
    for k in 0..=nz {
        for j in 0..=ny {
            for i in 0..=nx {
                positions.push(min + h * DVec3::new(i as f64, j as f64, k as f64));
            }
        }
    }

    const AXIS_ORDERS: [[usize; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];

    let mut cells = Vec::with_capacity(6 * nx * ny * nz);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                for order in AXIS_ORDERS {
                    let mut corner = [i, j, k];
                    let mut tet = [id(i, j, k); 4];
                    for (slot, axis) in order.iter().enumerate() {
                        corner[*axis] += 1;
                        tet[slot + 1] = id(corner[0], corner[1], corner[2]);
                    }
                    cells.push(tet);
                }
            }
        }
    }

    Some(TetMesh::from_cells(positions, cells))
}

/// Spherical shell between `r_inner` and `r_outer`.
///
/// The surface is an icosphere refined `subdivisions` times; the shell is
/// divided into `layers` radial prism layers and every prism into three
/// tetrahedra. Only the outer sphere is exterior, the inner sphere is
/// insulated.
pub fn create_shell_mesh(
    r_inner: f64,
    r_outer: f64,
    subdivisions: u32,
    layers: usize,
) -> TetMesh {
    let layers = layers.max(1);
    let (surface, triangles) = icosphere(subdivisions);
    let nv = surface.len();

    let mut positions = Vec::with_capacity(nv * (layers + 1));
    for k in 0..=layers {
        let r = r_inner + (r_outer - r_inner) * k as f64 / layers as f64;
        positions.extend(surface.iter().map(|p| *p * r));
    }

    let mut cells = Vec::with_capacity(3 * triangles.len() * layers);
    for tri in &triangles {
        // Sorting by surface index gives every shared prism side the same
        // diagonal from both neighbours.
        let mut s = *tri;
        s.sort_unstable();
        for k in 0..layers {
            let [a, b, c] = s.map(|v| k * nv + v);
            let [a1, b1, c1] = s.map(|v| (k + 1) * nv + v);
            cells.push([a, b, c, c1]);
            cells.push([a, b, b1, c1]);
            cells.push([a, a1, b1, c1]);
        }
    }

    let r_mid = 0.5 * (r_inner + r_outer);
    TetMesh::from_cells(positions, cells).with_exterior(|centroid, _| centroid.length() > r_mid)
}

/// Unit icosphere: vertex positions and triangles.
fn icosphere(subdivisions: u32) -> (Vec<DVec3>, Vec<[usize; 3]>) {
    let t = (1.0 + 5.0_f64.sqrt()) / 2.0;
    let mut vertices: Vec<DVec3> = [
        (-1.0, t, 0.0),
        (1.0, t, 0.0),
        (-1.0, -t, 0.0),
        (1.0, -t, 0.0),
        (0.0, -1.0, t),
        (0.0, 1.0, t),
        (0.0, -1.0, -t),
        (0.0, 1.0, -t),
        (t, 0.0, -1.0),
        (t, 0.0, 1.0),
        (-t, 0.0, -1.0),
        (-t, 0.0, 1.0),
    ]
    .iter()
    .map(|&(x, y, z)| DVec3::new(x, y, z).normalize())
    .collect();

    let mut triangles: Vec<[usize; 3]> = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];

    for _ in 0..subdivisions {
        let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();
        let mut midpoint = |a: usize, b: usize, vertices: &mut Vec<DVec3>| {
            let key = (a.min(b), a.max(b));
            *midpoints.entry(key).or_insert_with(|| {
                vertices.push(((vertices[a] + vertices[b]) * 0.5).normalize());
                vertices.len() - 1
            })
        };

        let mut refined = Vec::with_capacity(triangles.len() * 4);
        for [a, b, c] in triangles {
            let ab = midpoint(a, b, &mut vertices);
            let bc = midpoint(b, c, &mut vertices);
            let ca = midpoint(c, a, &mut vertices);
            refined.push([a, ab, ca]);
            refined.push([b, bc, ab]);
            refined.push([c, ca, bc]);
            refined.push([ab, bc, ca]);
        }
        triangles = refined;
    }

    (vertices, triangles)
}
