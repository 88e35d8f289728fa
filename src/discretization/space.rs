use super::mesh::TetMesh;
use glam::{DMat3, DVec3};
use nalgebra_sparse::{CooMatrix, CsrMatrix};

/// Read-only view of a finite-element space that the time stepper and the
/// boundary assembler depend on.
pub trait FiniteElementSpace {
    fn number_of_dofs(&self) -> usize;

    /// Global stiffness matrix `S_ij = ∫ ∇φ_i · ∇φ_j`.
    fn stiffness_matrix(&self) -> CsrMatrix<f64>;

    /// Global mass matrix `M_ij = ∫ φ_i φ_j`.
    fn mass_matrix(&self) -> CsrMatrix<f64>;

    /// Boundary faces that carry the radiative condition.
    fn exterior_boundary_faces(&self) -> Vec<usize>;

    /// Global dofs of a boundary face, in the order of [`Self::face_basis`].
    fn face_to_dof(&self, face: usize) -> &[usize];

    fn face_area(&self, face: usize) -> f64;

    /// Outward unit normal at barycentric point `bc` of a boundary face.
    fn face_unit_normal(&self, face: usize, bc: &[f64; 3]) -> DVec3;

    /// Values of the face-local basis functions at barycentric point `bc`.
    fn face_basis(&self, bc: &[f64; 3]) -> Vec<f64>;

    /// Physical location of every dof.
    fn interpolation_points(&self) -> Vec<DVec3>;
}

/// Continuous piecewise-linear Lagrange elements on tetrahedra.
/// One dof per mesh node.
pub struct LagrangeP1Space {
    mesh: TetMesh,
}

impl LagrangeP1Space {
    pub fn new(mesh: TetMesh) -> Self {
        Self { mesh }
    }

    pub fn mesh(&self) -> &TetMesh {
        &self.mesh
    }

    /// Gradients of the four barycentric coordinates of a cell.
    fn cell_gradients(&self, cell: usize) -> [DVec3; 4] {
        let c = &self.mesh.cells[cell];
        let p = c.nodes.map(|n| self.mesh.nodes[n].position);
        let jac = DMat3::from_cols(p[1] - p[0], p[2] - p[0], p[3] - p[0]);
        let inv_t = jac.inverse().transpose();
        let (g1, g2, g3) = (inv_t.col(0), inv_t.col(1), inv_t.col(2));
        [-(g1 + g2 + g3), g1, g2, g3]
    }

    fn assemble<F>(&self, local: F) -> CsrMatrix<f64>
    where
        F: Fn(usize, usize, usize) -> f64,
    {
        let n = self.number_of_dofs();
        let mut coo = CooMatrix::new(n, n);
        for (cell_id, cell) in self.mesh.cells.iter().enumerate() {
            for i in 0..4 {
                for j in 0..4 {
                    coo.push(cell.nodes[i], cell.nodes[j], local(cell_id, i, j));
                }
            }
        }
        CsrMatrix::from(&coo)
    }
}

impl FiniteElementSpace for LagrangeP1Space {
    fn number_of_dofs(&self) -> usize {
        self.mesh.nodes.len()
    }

    fn stiffness_matrix(&self) -> CsrMatrix<f64> {
        let grads: Vec<[DVec3; 4]> = (0..self.mesh.cells.len())
            .map(|c| self.cell_gradients(c))
            .collect();
        self.assemble(|c, i, j| self.mesh.cells[c].volume * grads[c][i].dot(grads[c][j]))
    }

    fn mass_matrix(&self) -> CsrMatrix<f64> {
        self.assemble(|c, i, j| {
            let v = self.mesh.cells[c].volume;
            if i == j { v / 10.0 } else { v / 20.0 }
        })
    }

    fn exterior_boundary_faces(&self) -> Vec<usize> {
        self.mesh.exterior_boundary_faces()
    }

    fn face_to_dof(&self, face: usize) -> &[usize] {
        &self.mesh.faces[face].nodes
    }

    fn face_area(&self, face: usize) -> f64 {
        self.mesh.faces[face].area
    }

    // Faces are flat, so the normal does not vary over the face.
    fn face_unit_normal(&self, face: usize, _bc: &[f64; 3]) -> DVec3 {
        self.mesh.faces[face].normal
    }

    fn face_basis(&self, bc: &[f64; 3]) -> Vec<f64> {
        bc.to_vec()
    }

    fn interpolation_points(&self) -> Vec<DVec3> {
        self.mesh.nodes.iter().map(|n| n.position).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretization::generator::create_box_mesh;
    use nalgebra::DVector;

    fn space() -> LagrangeP1Space {
        LagrangeP1Space::new(create_box_mesh(
            DVec3::new(-1.0, 0.0, 0.0),
            DVec3::new(1.0, 1.0, 0.5),
            [3, 2, 2],
        )
        .unwrap())
    }

    #[test]
    fn mass_matrix_integrates_volume() {
        let space = space();
        let m = space.mass_matrix();
        let total: f64 = m.values().iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn stiffness_annihilates_constants_and_is_symmetric() {
        let space = space();
        let s = space.stiffness_matrix();
        let ones = DVector::from_element(space.number_of_dofs(), 1.0);
        let r = &s * &ones;
        assert!(r.amax() < 1e-12);

        for (i, j, v) in s.triplet_iter() {
            let vt = s.get_entry(j, i).map(|e| e.into_value()).unwrap_or(0.0);
            assert!((v - vt).abs() < 1e-12);
        }
    }

    #[test]
    fn stiffness_reproduces_linear_energy() {
        // u = x has |∇u|^2 = 1, so u^T S u = volume
        let space = space();
        let s = space.stiffness_matrix();
        let u = DVector::from_iterator(
            space.number_of_dofs(),
            space.interpolation_points().iter().map(|p| p.x),
        );
        let energy = u.dot(&(&s * &u));
        assert!((energy - 1.0).abs() < 1e-12);
    }
}
