use crate::numerics::cluster::{ClusterContext, DistributedSolver};
use crate::numerics::solver::SolverError;
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::factorization::CscCholesky;
use nalgebra_sparse::{CscMatrix, CsrMatrix};

/// Solves `A x = b` for the symmetric positive definite Picard matrix.
///
/// Under a [`ClusterContext`] the solve is collective: every participant must
/// call `solve` once per Picard iteration, whatever its local state, or the
/// others block forever at the next barrier.
pub trait LinearSystemBackend {
    fn solve(&mut self, a: &CsrMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>, SolverError>;
}

pub(crate) fn check_dimensions(a: &CsrMatrix<f64>, b: &DVector<f64>) -> Result<(), SolverError> {
    if a.nrows() != a.ncols() || a.nrows() != b.len() {
        return Err(SolverError::DimensionMismatch {
            rows: a.nrows(),
            cols: a.ncols(),
            rhs: b.len(),
        });
    }
    Ok(())
}

/// Local sparse Cholesky factorisation, refactored on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectSolver;

impl LinearSystemBackend for DirectSolver {
    fn solve(&mut self, a: &CsrMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
        check_dimensions(a, b)?;
        if a.values().iter().chain(b.iter()).any(|v| !v.is_finite()) {
            return Err(SolverError::LinearSolveFailed {
                iteration: 0,
                reason: "system contains non-finite entries".to_string(),
            });
        }

        let csc = CscMatrix::from(a);
        let factor = CscCholesky::factor(&csc).map_err(|e| SolverError::LinearSolveFailed {
            iteration: 0,
            reason: e.to_string(),
        })?;
        let rhs = DMatrix::from_column_slice(b.len(), 1, b.as_slice());
        let x = factor.solve(&rhs);
        Ok(DVector::from_column_slice(x.as_slice()))
    }
}

/// Pick the backend from the presence of a cluster context.
pub fn select_backend<'a>(
    ctx: Option<&'a mut dyn ClusterContext>,
) -> Box<dyn LinearSystemBackend + 'a> {
    match ctx {
        Some(ctx) => Box::new(DistributedSolver::new(ctx)),
        None => Box::new(DirectSolver),
    }
}
