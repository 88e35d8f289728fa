/// Symmetric quadrature on the reference triangle.
///
/// Points are barycentric coordinates; weights are normalised to sum to one,
/// so an integral over a face is `area * sum(w_q * f(x_q))`.
#[derive(Debug, Clone)]
pub struct TriangleQuadrature {
    pub points: Vec<[f64; 3]>,
    pub weights: Vec<f64>,
}

impl TriangleQuadrature {
    /// Rule exact for polynomials of degree `nq` (1..=4). Returns `None` for
    /// degrees without a tabulated rule.
    pub fn new(nq: usize) -> Option<Self> {
        let rule = match nq {
            1 => Self {
                points: vec![[1.0 / 3.0; 3]],
                weights: vec![1.0],
            },
            2 => {
                let (a, b) = (2.0 / 3.0, 1.0 / 6.0);
                Self {
                    points: vec![[a, b, b], [b, a, b], [b, b, a]],
                    weights: vec![1.0 / 3.0; 3],
                }
            }
            // Dunavant degree 4; also used for degree 3 since the classical
            // 4-point degree 3 rule carries a negative weight.
            3 | 4 => {
                let (a1, b1, w1) = (0.445948490915965, 0.108103018168070, 0.223381589678011);
                let (a2, b2, w2) = (0.091576213509771, 0.816847572980459, 0.109951743655322);
                Self {
                    points: vec![
                        [a1, a1, b1],
                        [a1, b1, a1],
                        [b1, a1, a1],
                        [a2, a2, b2],
                        [a2, b2, a2],
                        [b2, a2, a2],
                    ],
                    weights: vec![w1, w1, w1, w2, w2, w2],
                }
            }
            _ => return None,
        };
        Some(rule)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}
