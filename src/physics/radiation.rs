use crate::config::ConfigError;
use crate::discretization::quadrature::TriangleQuadrature;
use crate::discretization::space::FiniteElementSpace;
use crate::physics::BoundaryModel;
use crate::physics::illumination::IlluminationModel;
use glam::DVec3;
use nalgebra::DVector;
use nalgebra_sparse::{CooMatrix, CsrMatrix};

/// Boundary contribution of one Picard iterate: `reaction` is added to the
/// stiffness matrix, `flux` to the right-hand side.
pub struct RadiativeLinearization {
    pub reaction: CsrMatrix<f64>,
    pub flux: DVector<f64>,
}

/// Geometry of one exterior face, fixed for the lifetime of the mesh.
struct FaceGeometry {
    dofs: Vec<usize>,
    area: f64,
    /// Outward unit normal at every quadrature point.
    normals: Vec<DVec3>,
}

/// Radiative surface condition `Φ ∂u/∂n = insolation·mu − u⁴` on the
/// exterior boundary, with the quartic loss linearised as `u_trial³ · u`.
///
/// The weak form is written with `n` the outward normal, so both terms carry
/// a positive sign: `R_ij = ∫ u_trial³ φ_i φ_j / Φ` is added to the stiffness
/// matrix and `b_i = ∫ insolation·mu φ_i / Φ` to the right-hand side. For a
/// non-negative trial field `R` is positive semi-definite and `M + dt(S + R)` is SPD.
pub struct RadiativeBoundary {
    faces: Vec<FaceGeometry>,
    /// Face basis values, `basis[q][i]`.
    basis: Vec<Vec<f64>>,
    weights: Vec<f64>,
    n_dofs: usize,
    illumination: IlluminationModel,
    phi: f64,
    insolation: f64,
}

impl RadiativeBoundary {
    pub fn new<S: FiniteElementSpace>(
        space: &S,
        nq: usize,
        illumination: IlluminationModel,
        phi: f64,
        insolation: f64,
    ) -> Result<Self, ConfigError> {
        if !phi.is_finite() || phi <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "radiation parameter Phi must be finite and positive, got {phi}"
            )));
        }
        if !insolation.is_finite() || insolation < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "insolation must be finite and non-negative, got {insolation}"
            )));
        }
        let quadrature = TriangleQuadrature::new(nq).ok_or_else(|| {
            ConfigError::Invalid(format!("no triangle quadrature of degree {nq}"))
        })?;

        let faces = space
            .exterior_boundary_faces()
            .into_iter()
            .map(|f| FaceGeometry {
                dofs: space.face_to_dof(f).to_vec(),
                area: space.face_area(f),
                normals: quadrature
                    .points
                    .iter()
                    .map(|bc| space.face_unit_normal(f, bc))
                    .collect(),
            })
            .collect();

        Ok(Self {
            faces,
            basis: quadrature.points.iter().map(|bc| space.face_basis(bc)).collect(),
            weights: quadrature.weights,
            n_dofs: space.number_of_dofs(),
            illumination,
            phi,
            insolation,
        })
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Incidence factor `mu` at time `t`, indexed `[face][quadrature point]`.
    pub fn illumination(&self, t: f64) -> Vec<Vec<f64>> {
        self.faces
            .iter()
            .map(|face| self.illumination.incidence(t, &face.normals))
            .collect()
    }

    /// Solar power absorbed by the exterior boundary at time `t`, in units of `Φ`.
    pub fn absorbed_power(&self, t: f64) -> f64 {
        let d = self.illumination.direction_at(t);
        self.faces
            .iter()
            .map(|face| {
                let s: f64 = self
                    .weights
                    .iter()
                    .zip(&face.normals)
                    .map(|(w, n)| w * IlluminationModel::cosine(d, *n))
                    .sum();
                s * face.area
            })
            .sum::<f64>()
            * self.insolation
    }
}

impl BoundaryModel for RadiativeBoundary {
    fn linearize(&self, trial: &DVector<f64>, time: f64) -> RadiativeLinearization {
        let n = self.n_dofs;
        let kappa = 1.0 / self.phi;
        // depends only on time; recomputed here so that the assembly is a pure
        // function of (trial, time)
        let sun = self.illumination.direction_at(time);

        let mut coo = CooMatrix::new(n, n);
        let mut flux = DVector::zeros(n);
        let mut local: Vec<f64> = Vec::new();

        for face in &self.faces {
            let m = face.dofs.len();
            local.clear();
            local.resize(m * m, 0.0);

            for (q, (phi, w)) in self.basis.iter().zip(&self.weights).enumerate() {
                let u: f64 = phi
                    .iter()
                    .zip(&face.dofs)
                    .map(|(p, &dof)| p * trial[dof])
                    .sum();
                let coefficient = kappa * u.powi(3);
                let forcing =
                    kappa * self.insolation * IlluminationModel::cosine(sun, face.normals[q]);
                let wa = w * face.area;

                for i in 0..m {
                    flux[face.dofs[i]] += wa * forcing * phi[i];
                    for j in 0..m {
                        local[i * m + j] += wa * coefficient * phi[i] * phi[j];
                    }
                }
            }

            for i in 0..m {
                for j in 0..m {
                    coo.push(face.dofs[i], face.dofs[j], local[i * m + j]);
                }
            }
        }

        RadiativeLinearization {
            reaction: CsrMatrix::from(&coo),
            flux,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretization::generator::create_box_mesh;
    use crate::discretization::space::LagrangeP1Space;

    fn column() -> LagrangeP1Space {
        // unit square surface at z = 0, only the top is exterior
        let (min, max) = (DVec3::new(0.0, 0.0, -1.0), DVec3::new(1.0, 1.0, 0.0));
        let mesh = create_box_mesh(min, max, [2, 2, 2])
            .unwrap()
            .with_exterior(|_, n| n.z > 0.5);
        LagrangeP1Space::new(mesh)
    }

    fn overhead_sun() -> IlluminationModel {
        IlluminationModel::new(DVec3::Z).unwrap()
    }

    fn radiating(
        space: &LagrangeP1Space,
        nq: usize,
        sun: IlluminationModel,
        phi: f64,
    ) -> RadiativeBoundary {
        let bnd = RadiativeBoundary::new(space, nq, sun, phi, 1.0).unwrap();
        // 2 x 2 squares on top, two triangles each
        assert_eq!(bnd.num_faces(), 8);
        bnd
    }

    #[test]
    fn uniform_field_gives_quartic_loss() {
        let space = column();
        let phi = 2.0;
        let bnd = radiating(&space, 2, overhead_sun(), phi);
        let u = DVector::from_element(space.number_of_dofs(), 1.5);
        let lin = bnd.linearize(&u, 0.0);

        // 1^T R u = ∫ u^4 / Φ over the unit top face
        let ones = DVector::from_element(u.len(), 1.0);
        let loss = ones.dot(&(&lin.reaction * &u));
        assert!((loss - 1.5_f64.powi(4) / phi).abs() < 1e-12);

        // overhead sun: mu = 1 everywhere on the top
        assert!((lin.flux.sum() - 1.0 / phi).abs() < 1e-12);
        assert!((bnd.absorbed_power(0.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn reaction_matrix_is_symmetric() {
        let space = column();
        let bnd = radiating(&space, 4, overhead_sun(), 0.7);
        let u = DVector::from_iterator(
            space.number_of_dofs(),
            space.interpolation_points().iter().map(|p| 1.0 + p.x + 0.3 * p.y),
        );
        let r = bnd.linearize(&u, 0.3).reaction;
        assert!(r.triplet_iter().any(|(i, j, v)| i != j && *v > 0.0));
        for (i, j, v) in r.triplet_iter() {
            let vt = r.get_entry(j, i).map(|e| e.into_value()).unwrap_or(0.0);
            assert!((v - vt).abs() < 1e-14);
        }
    }

    #[test]
    fn dark_side_has_no_forcing() {
        let space = column();
        let sun = IlluminationModel::new(DVec3::NEG_Z).unwrap();
        let bnd = radiating(&space, 2, sun, 1.0);
        let lin = bnd.linearize(&DVector::zeros(space.number_of_dofs()), 1.0);
        assert_eq!(lin.flux.amax(), 0.0);
        assert_eq!(lin.reaction.values().iter().fold(0.0_f64, |a, v| a.max(v.abs())), 0.0);

        // a warm surface still radiates on the night side
        let warm = bnd.linearize(&DVector::from_element(space.number_of_dofs(), 1.0), 1.0);
        assert_eq!(warm.flux.amax(), 0.0);
        let ones = DVector::from_element(space.number_of_dofs(), 1.0);
        assert!((ones.dot(&(&warm.reaction * &ones)) - 1.0).abs() < 1e-12);
        assert_eq!(bnd.absorbed_power(1.0), 0.0);
    }

    #[test]
    fn illumination_follows_rotation() {
        let space = column();
        let sun = IlluminationModel::new(DVec3::new(1.0, 0.0, 1.0)).unwrap();
        let bnd = radiating(&space, 3, sun, 1.0);
        let mu = bnd.illumination(0.0);
        assert_eq!(mu.len(), bnd.num_faces());
        for face in &mu {
            assert!(face.iter().all(|m| (m - 0.5_f64.sqrt()).abs() < 1e-12));
        }
        // the top face sees the same elevation all day
        let later = bnd.illumination(2.0);
        assert!((later[0][0] - mu[0][0]).abs() < 1e-12);
        assert!((bnd.absorbed_power(2.0) - 0.5_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn non_positive_phi_is_a_configuration_error() {
        let space = column();
        assert!(RadiativeBoundary::new(&space, 2, overhead_sun(), 0.0, 1.0).is_err());
        assert!(RadiativeBoundary::new(&space, 2, overhead_sun(), -0.5, 1.0).is_err());
        assert!(RadiativeBoundary::new(&space, 9, overhead_sun(), 1.0, 1.0).is_err());
    }
}
