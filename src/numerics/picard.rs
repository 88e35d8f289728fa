use crate::numerics::linear::LinearSystemBackend;
use crate::numerics::solver::{SolverError, log_iteration};
use crate::numerics::timing::{record_assembly, record_linear_solve};
use crate::physics::BoundaryModel;
use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PicardState {
    Init,
    Iterate,
    Converged,
    MaxIterExceeded,
}

#[derive(Debug, Clone)]
pub struct PicardReport {
    pub iterations: usize,
    /// Max-norm of the update after every iteration.
    pub errors: Vec<f64>,
    pub state: PicardState,
}

impl PicardReport {
    pub fn converged(&self) -> bool {
        self.state == PicardState::Converged
    }

    pub fn final_error(&self) -> f64 {
        self.errors.last().copied().unwrap_or(0.0)
    }
}

/// Fixed-point iteration for one backward Euler step with a radiative
/// boundary:
///
/// ```text
/// (M + dt (S + R(u_k))) u_{k+1} = M u_n + dt b
/// ```
///
/// `R` and `b` are rebuilt from the latest iterate on every pass.
pub struct PicardSolver {
    pub accuracy: f64,
    pub max_iterations: usize,
    pub logging: bool,
}

impl Default for PicardSolver {
    fn default() -> Self {
        Self {
            accuracy: 1e-10,
            max_iterations: 20,
            logging: false,
        }
    }
}

impl PicardSolver {
    /// Advance `current` by `dt` to `time`, writing the result to `next`.
    ///
    /// `trial` is scratch space for the iterate. Hitting the iteration cap is
    /// reported in the returned state, not as an error; `next` then holds the
    /// last iterate.
    #[allow(clippy::too_many_arguments)]
    pub fn step<B: BoundaryModel + ?Sized>(
        &self,
        stiffness: &CsrMatrix<f64>,
        mass: &CsrMatrix<f64>,
        boundary: &B,
        backend: &mut dyn LinearSystemBackend,
        current: &DVector<f64>,
        trial: &mut DVector<f64>,
        next: &mut DVector<f64>,
        time: f64,
        dt: f64,
    ) -> Result<PicardReport, SolverError> {
        let mut state = PicardState::Init;
        let mut errors: Vec<f64> = Vec::new();
        let mut k = 0;

        // time-invariant within the step
        let mass_current = mass * current;
        let mut initial = None;

        loop {
            match state {
                PicardState::Init => {
                    trial.copy_from(current);
                    state = PicardState::Iterate;
                }
                PicardState::Iterate => {
                    let lin = record_assembly(|| boundary.linearize(trial, time));
                    let a = mass + &((stiffness + &lin.reaction) * dt);
                    let rhs = &mass_current + &lin.flux * dt;

                    let x = record_linear_solve(|| backend.solve(&a, &rhs))
                        .map_err(|e| e.at_iteration(k))?;
                    if x.iter().any(|v| !v.is_finite()) {
                        return Err(SolverError::NonFinite { iteration: k });
                    }

                    let error = (&x - &*trial).amax();
                    trial.copy_from(&x);
                    k += 1;

                    let init = *initial.get_or_insert(error);
                    let fraction = if init > 0.0 { error / init } else { 0.0 };
                    let step_percent = errors.last().map_or(0.0, |&prev| {
                        if prev > 0.0 {
                            (prev - error) / prev * 100.0
                        } else {
                            0.0
                        }
                    });
                    log_iteration(
                        k - 1,
                        self.max_iterations,
                        error,
                        fraction,
                        step_percent,
                        init,
                        self.logging,
                    );
                    errors.push(error);

                    if error <= self.accuracy {
                        state = PicardState::Converged;
                    } else if k >= self.max_iterations {
                        eprintln!(
                            "Picard iteration reached the cap of {} iterations with error {:.3e}",
                            self.max_iterations, error
                        );
                        state = PicardState::MaxIterExceeded;
                    }
                }
                PicardState::Converged | PicardState::MaxIterExceeded => {
                    next.copy_from(trial);
                    return Ok(PicardReport {
                        iterations: k,
                        errors,
                        state,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::radiation::RadiativeLinearization;
    use nalgebra_sparse::CooMatrix;

    /// Linear Robin-type law `∂u/∂n = g − h u` on node 0 only.
    struct LinearNode {
        n: usize,
        h: f64,
        g: f64,
    }

    impl BoundaryModel for LinearNode {
        fn linearize(&self, _trial: &DVector<f64>, _time: f64) -> RadiativeLinearization {
            let mut coo = CooMatrix::new(self.n, self.n);
            coo.push(0, 0, self.h);
            let mut flux = DVector::zeros(self.n);
            flux[0] = self.g;
            RadiativeLinearization {
                reaction: CsrMatrix::from(&coo),
                flux,
            }
        }
    }

    struct CountingBackend {
        calls: usize,
    }

    impl LinearSystemBackend for CountingBackend {
        fn solve(&mut self, a: &CsrMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
            self.calls += 1;
            crate::numerics::linear::DirectSolver.solve(a, b)
        }
    }

    fn identity(n: usize) -> CsrMatrix<f64> {
        CsrMatrix::identity(n)
    }

    #[test]
    fn linear_boundary_converges_on_second_pass() {
        let n = 3;
        let zero = CsrMatrix::from(&CooMatrix::<f64>::new(n, n));
        let bc = LinearNode { n, h: 1.0, g: 2.0 };
        let current = DVector::from_element(n, 1.0);
        let (mut trial, mut next) = (DVector::zeros(n), DVector::zeros(n));
        let mut backend = CountingBackend { calls: 0 };

        let report = PicardSolver::default()
            .step(&zero, &identity(n), &bc, &mut backend, &current, &mut trial, &mut next, 0.0, 0.5)
            .unwrap();

        assert_eq!(report.state, PicardState::Converged);
        assert_eq!(report.iterations, 2);
        assert_eq!(backend.calls, 2);
        // (1 + 0.5) u = 1 + 0.5 * 2
        assert!((next[0] - 2.0 / 1.5).abs() < 1e-14);
        assert_eq!(next[1], 1.0);
    }

    #[test]
    fn single_iteration_cap_keeps_last_iterate() {
        let n = 2;
        let zero = CsrMatrix::from(&CooMatrix::<f64>::new(n, n));
        let bc = LinearNode { n, h: 0.0, g: 1.0 };
        let current = DVector::zeros(n);
        let (mut trial, mut next) = (DVector::zeros(n), DVector::zeros(n));
        let mut backend = CountingBackend { calls: 0 };
        let solver = PicardSolver {
            accuracy: 0.0,
            max_iterations: 1,
            logging: false,
        };

        let report = solver
            .step(&zero, &identity(n), &bc, &mut backend, &current, &mut trial, &mut next, 0.0, 0.25)
            .unwrap();

        assert_eq!(report.state, PicardState::MaxIterExceeded);
        assert_eq!(backend.calls, 1);
        assert_eq!(report.errors.len(), 1);
        assert!((next[0] - 0.25).abs() < 1e-15);
        assert_eq!(next, trial);
    }

    #[test]
    fn backend_failure_carries_iteration() {
        struct Failing;
        impl LinearSystemBackend for Failing {
            fn solve(&mut self, _: &CsrMatrix<f64>, _: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
                Err(SolverError::LinearSolveFailed {
                    iteration: 0,
                    reason: "singular".into(),
                })
            }
        }
        let n = 2;
        let bc = LinearNode { n, h: 0.0, g: 0.0 };
        let current = DVector::zeros(n);
        let (mut trial, mut next) = (DVector::zeros(n), DVector::zeros(n));
        let err = PicardSolver::default()
            .step(&identity(n), &identity(n), &bc, &mut Failing, &current, &mut trial, &mut next, 0.0, 1.0)
            .unwrap_err();
        assert!(matches!(err, SolverError::LinearSolveFailed { iteration: 0, .. }));
    }
}
