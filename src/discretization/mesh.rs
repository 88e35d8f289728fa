use glam::DVec3;

/// The complete computational grid: a conforming tetrahedral mesh.
pub struct TetMesh {
    pub nodes: Vec<Node>,
    pub cells: Vec<Cell>,
    pub faces: Vec<BoundaryFace>,
}

pub struct Node {
    pub position: DVec3,
}

/// A single tetrahedron.
pub struct Cell {
    pub nodes: [usize; 4],
    pub volume: f64,
}

/// A triangle on the boundary of the domain.
pub struct BoundaryFace {
    /// Vertex indices, ordered so that the right-hand normal points out of the domain.
    pub nodes: [usize; 3],
    /// The tetrahedron this face belongs to.
    pub cell: usize,
    pub area: f64,
    /// Outward pointing unit normal.
    pub normal: DVec3,
    /// Exterior faces see the sky and carry the radiative condition.
    /// Other boundary faces are insulated.
    pub exterior: bool,
}

impl TetMesh {
    /// Build the mesh from raw node positions and cell connectivity.
    ///
    /// Cell orientation is normalised to positive volume and the boundary is
    /// extracted as the set of faces owned by exactly one cell. Every boundary
    /// face starts out as exterior.
    pub fn from_cells(positions: Vec<DVec3>, cells: Vec<[usize; 4]>) -> Self {
        let nodes: Vec<Node> = positions
            .into_iter()
            .map(|position| Node { position })
            .collect();

        let cells: Vec<Cell> = cells
            .into_iter()
            .map(|mut c| {
                let mut volume = signed_volume(&nodes, &c);
                if volume < 0.0 {
                    c.swap(2, 3);
                    volume = -volume;
                }
                Cell { nodes: c, volume }
            })
            .collect();

        let faces = extract_boundary(&nodes, &cells);
        Self {
            nodes,
            cells,
            faces,
        }
    }

    /// Restrict the exterior boundary to faces matching `predicate`.
    /// The predicate sees the face centroid and its outward normal.
    pub fn with_exterior<P>(mut self, predicate: P) -> Self
    where
        P: Fn(DVec3, DVec3) -> bool,
    {
        for i in 0..self.faces.len() {
            let centroid = self.face_centroid(i);
            let face = &mut self.faces[i];
            face.exterior = predicate(centroid, face.normal);
        }
        self
    }

    /// Indices of the boundary faces flagged exterior, in mesh order.
    pub fn exterior_boundary_faces(&self) -> Vec<usize> {
        self.faces
            .iter()
            .enumerate()
            .filter(|(_, f)| f.exterior)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn face_centroid(&self, face: usize) -> DVec3 {
        let [a, b, c] = self.faces[face].nodes;
        (self.nodes[a].position + self.nodes[b].position + self.nodes[c].position) / 3.0
    }

    pub fn total_volume(&self) -> f64 {
        self.cells.iter().map(|c| c.volume).sum()
    }

    pub fn exterior_area(&self) -> f64 {
        self.faces
            .iter()
            .filter(|f| f.exterior)
            .map(|f| f.area)
            .sum()
    }
}

fn signed_volume(nodes: &[Node], c: &[usize; 4]) -> f64 {
    let p0 = nodes[c[0]].position;
    let e1 = nodes[c[1]].position - p0;
    let e2 = nodes[c[2]].position - p0;
    let e3 = nodes[c[3]].position - p0;
    e1.dot(e2.cross(e3)) / 6.0
}

/// Local faces of a tetrahedron as (face vertices, opposite vertex).
const LOCAL_FACES: [([usize; 3], usize); 4] = [
    ([1, 2, 3], 0),
    ([0, 2, 3], 1),
    ([0, 1, 3], 2),
    ([0, 1, 2], 3),
];

fn extract_boundary(nodes: &[Node], cells: &[Cell]) -> Vec<BoundaryFace> {
    use std::collections::HashMap;

    // sorted vertex triple -> (owning cell, local face, count)
    let mut seen: HashMap<[usize; 3], (usize, usize, u32)> = HashMap::new();
    for (cell_id, cell) in cells.iter().enumerate() {
        for (local, (verts, _)) in LOCAL_FACES.iter().enumerate() {
            let mut key = [
                cell.nodes[verts[0]],
                cell.nodes[verts[1]],
                cell.nodes[verts[2]],
            ];
            key.sort_unstable();
            seen.entry(key)
                .and_modify(|e| e.2 += 1)
                .or_insert((cell_id, local, 1));
        }
    }

    let mut boundary: Vec<(usize, usize)> = seen
        .values()
        .filter(|(_, _, count)| *count == 1)
        .map(|(cell, local, _)| (*cell, *local))
        .collect();
    // HashMap order is not stable between runs
    boundary.sort_unstable();

    boundary
        .into_iter()
        .map(|(cell_id, local)| {
            let cell = &cells[cell_id];
            let (verts, opposite) = LOCAL_FACES[local];
            let mut tri = [
                cell.nodes[verts[0]],
                cell.nodes[verts[1]],
                cell.nodes[verts[2]],
            ];
            let p0 = nodes[tri[0]].position;
            let mut n = (nodes[tri[1]].position - p0).cross(nodes[tri[2]].position - p0);
            let inward = nodes[cell.nodes[opposite]].position - p0;
            if n.dot(inward) > 0.0 {
                tri.swap(1, 2);
                n = -n;
            }
            let len = n.length();
            BoundaryFace {
                nodes: tri,
                cell: cell_id,
                area: 0.5 * len,
                normal: if len > 0.0 { n / len } else { DVec3::ZERO },
                exterior: true,
            }
        })
        .collect()
}
