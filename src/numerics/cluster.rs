//! Collective linear solves across cooperating participants.
//!
//! Participants run the same program in lockstep. The coordinator registers
//! the assembled system, everyone enters [`ClusterContext::run`] together,
//! and the solution is handed back to all of them with
//! [`ClusterContext::broadcast`].
use crate::numerics::linear::{LinearSystemBackend, check_dimensions};
use crate::numerics::solver::SolverError;
use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;
use std::ops::Range;
use std::sync::{Arc, Barrier, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Owns the centralised matrix and right-hand side.
    Coordinator,
    Participant,
}

/// Phases of a collective solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveJob {
    /// Prepare the preconditioner for the registered matrix.
    Factorize,
    /// Solve with the registered right-hand side, reusing the last factorisation.
    Solve,
    FactorizeAndSolve,
}

/// Synchronous SPMD solver context.
///
/// Every method except [`role`](Self::role) and [`size`](Self::size) may
/// block until all participants reach the same call.
pub trait ClusterContext {
    fn role(&self) -> Role;

    fn size(&self) -> usize;

    /// Register the matrix. Only meaningful on the coordinator.
    fn set_centralized_sparse(&mut self, a: &CsrMatrix<f64>);

    /// Register the right-hand side. Only meaningful on the coordinator.
    fn set_rhs(&mut self, b: &DVector<f64>);

    /// Collective. On success the coordinator's right-hand side has been
    /// overwritten by the solution.
    fn run(&mut self, job: SolveJob) -> Result<(), SolverError>;

    /// Take the solution left by the last `run` on the coordinator.
    fn take_rhs(&mut self) -> Option<DVector<f64>>;

    /// Collective. The coordinator passes `Some`, the others `None`; all
    /// receive the coordinator's vector.
    fn broadcast(&mut self, x: Option<DVector<f64>>) -> Result<DVector<f64>, SolverError>;
}

/// [`LinearSystemBackend`] over a cluster context.
pub struct DistributedSolver<'a, C: ClusterContext + ?Sized> {
    ctx: &'a mut C,
}

impl<'a, C: ClusterContext + ?Sized> DistributedSolver<'a, C> {
    pub fn new(ctx: &'a mut C) -> Self {
        Self { ctx }
    }
}

impl<C: ClusterContext + ?Sized> LinearSystemBackend for DistributedSolver<'_, C> {
    fn solve(&mut self, a: &CsrMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
        let coordinator = self.ctx.role() == Role::Coordinator;
        if coordinator {
            self.ctx.set_centralized_sparse(a);
            self.ctx.set_rhs(b);
        }
        self.ctx.run(SolveJob::FactorizeAndSolve)?;
        let x = if coordinator { self.ctx.take_rhs() } else { None };
        self.ctx.broadcast(x)
    }
}

struct Shared {
    size: usize,
    barrier: Barrier,
    matrix: Mutex<Option<Arc<CsrMatrix<f64>>>>,
    rhs: Mutex<Option<DVector<f64>>>,
    product: Mutex<DVector<f64>>,
    broadcast: Mutex<Option<DVector<f64>>>,
}

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, SolverError> {
    m.lock()
        .map_err(|_| SolverError::Cluster("a participant panicked".to_string()))
}

/// In-process cluster: one handle per thread, sharing a barrier.
///
/// The solve job is a Jacobi-preconditioned conjugate gradient in which each
/// participant computes the matrix-vector product for its own block of rows.
/// All other arithmetic is replicated, so every participant follows the same
/// branch and leaves the solve at the same iteration.
pub struct ThreadCluster {
    rank: usize,
    shared: Arc<Shared>,
    tolerance: f64,
    max_iterations: usize,
    factorized: Option<(Arc<CsrMatrix<f64>>, DVector<f64>)>,
    solution: Option<DVector<f64>>,
}

impl ThreadCluster {
    /// Create `size` connected handles. Rank 0 is the coordinator.
    pub fn new(size: usize) -> Vec<ThreadCluster> {
        let size = size.max(1);
        let shared = Arc::new(Shared {
            size,
            barrier: Barrier::new(size),
            matrix: Mutex::new(None),
            rhs: Mutex::new(None),
            product: Mutex::new(DVector::zeros(0)),
            broadcast: Mutex::new(None),
        });
        (0..size)
            .map(|rank| ThreadCluster {
                rank,
                shared: Arc::clone(&shared),
                tolerance: 1e-12,
                max_iterations: 10_000,
                factorized: None,
                solution: None,
            })
            .collect()
    }

    /// Relative residual at which the conjugate gradient stops.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    fn rows(&self, n: usize) -> Range<usize> {
        let size = self.shared.size;
        (self.rank * n / size)..((self.rank + 1) * n / size)
    }

    fn factorize(matrix: Arc<CsrMatrix<f64>>) -> Result<(Arc<CsrMatrix<f64>>, DVector<f64>), SolverError> {
        if matrix.nrows() != matrix.ncols() {
            return Err(SolverError::DimensionMismatch {
                rows: matrix.nrows(),
                cols: matrix.ncols(),
                rhs: matrix.nrows(),
            });
        }
        let mut inv_diag = DVector::zeros(matrix.nrows());
        for (i, row) in matrix.row_iter().enumerate() {
            let d = row
                .col_indices()
                .iter()
                .zip(row.values())
                .find(|(j, _)| **j == i)
                .map(|(_, v)| *v)
                .unwrap_or(0.0);
            if !(d.is_finite() && d > 0.0) {
                return Err(SolverError::Cluster(format!(
                    "diagonal entry {i} is {d}, matrix is not positive definite"
                )));
            }
            inv_diag[i] = 1.0 / d;
        }
        Ok((matrix, inv_diag))
    }

    /// Collective `q = A p`, each participant filling its own rows.
    fn product(&self, a: &CsrMatrix<f64>, p: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
        let n = p.len();
        {
            let mut q = lock(&self.shared.product)?;
            if q.len() != n {
                *q = DVector::zeros(n);
            }
            for i in self.rows(n) {
                let row = a.row(i);
                q[i] = row
                    .col_indices()
                    .iter()
                    .zip(row.values())
                    .map(|(&j, v)| v * p[j])
                    .sum();
            }
        }
        self.shared.barrier.wait();
        let q = lock(&self.shared.product)?.clone();
        self.shared.barrier.wait();
        Ok(q)
    }

    fn pcg(
        &self,
        a: &CsrMatrix<f64>,
        inv_diag: &DVector<f64>,
        b: &DVector<f64>,
    ) -> Result<DVector<f64>, SolverError> {
        let n = b.len();
        let mut x = DVector::zeros(n);
        let b_norm = b.norm();
        if b_norm == 0.0 {
            return Ok(x);
        }
        if !b_norm.is_finite() {
            return Err(SolverError::Cluster("right-hand side is not finite".to_string()));
        }

        let mut r = b.clone();
        let mut z = r.component_mul(inv_diag);
        let mut p = z.clone();
        let mut rz = r.dot(&z);

        for _ in 0..self.max_iterations.max(n) {
            let q = self.product(a, &p)?;
            let pq = p.dot(&q);
            if !(pq > 0.0) {
                return Err(SolverError::Cluster(format!(
                    "conjugate gradient breakdown (p.Ap = {pq:e})"
                )));
            }
            let alpha = rz / pq;
            x.axpy(alpha, &p, 1.0);
            r.axpy(-alpha, &q, 1.0);
            if r.norm() <= self.tolerance * b_norm {
                return Ok(x);
            }
            z = r.component_mul(inv_diag);
            let rz_next = r.dot(&z);
            p = &z + &p * (rz_next / rz);
            rz = rz_next;
        }
        Err(SolverError::Cluster(format!(
            "conjugate gradient did not reach {:e} in {} iterations",
            self.tolerance,
            self.max_iterations.max(n)
        )))
    }
}

impl ClusterContext for ThreadCluster {
    fn role(&self) -> Role {
        if self.rank == 0 {
            Role::Coordinator
        } else {
            Role::Participant
        }
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn set_centralized_sparse(&mut self, a: &CsrMatrix<f64>) {
        if self.rank == 0
            && let Ok(mut slot) = self.shared.matrix.lock()
        {
            *slot = Some(Arc::new(a.clone()));
        }
    }

    fn set_rhs(&mut self, b: &DVector<f64>) {
        if self.rank == 0
            && let Ok(mut slot) = self.shared.rhs.lock()
        {
            *slot = Some(b.clone());
        }
    }

    fn run(&mut self, job: SolveJob) -> Result<(), SolverError> {
        // coordinator has registered its data
        self.shared.barrier.wait();
        let matrix = lock(&self.shared.matrix)?.clone();
        let rhs = lock(&self.shared.rhs)?.clone();
        self.shared.barrier.wait();

        if matches!(job, SolveJob::Factorize | SolveJob::FactorizeAndSolve) {
            let matrix =
                matrix.ok_or_else(|| SolverError::Cluster("no matrix registered".to_string()))?;
            self.factorized = Some(Self::factorize(matrix)?);
        }
        if matches!(job, SolveJob::Solve | SolveJob::FactorizeAndSolve) {
            let (a, inv_diag) = self
                .factorized
                .as_ref()
                .ok_or_else(|| SolverError::Cluster("solve requested before factorisation".to_string()))?;
            let b = rhs.ok_or_else(|| SolverError::Cluster("no right-hand side registered".to_string()))?;
            check_dimensions(a, &b)?;
            let x = self.pcg(a, inv_diag, &b)?;
            if self.rank == 0 {
                self.solution = Some(x);
            }
        }
        Ok(())
    }

    fn take_rhs(&mut self) -> Option<DVector<f64>> {
        self.solution.take()
    }

    fn broadcast(&mut self, x: Option<DVector<f64>>) -> Result<DVector<f64>, SolverError> {
        if self.rank == 0 {
            *lock(&self.shared.broadcast)? = x;
        }
        self.shared.barrier.wait();
        let received = lock(&self.shared.broadcast)?.clone();
        self.shared.barrier.wait();
        received.ok_or_else(|| SolverError::Cluster("coordinator broadcast nothing".to_string()))
    }
}
