use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("linear solve failed in Picard iteration {iteration}: {reason}")]
    LinearSolveFailed { iteration: usize, reason: String },
    #[error("non-finite temperature in Picard iteration {iteration}")]
    NonFinite { iteration: usize },
    #[error("collective solve failed: {0}")]
    Cluster(String),
    #[error("dimension mismatch: matrix is {rows}x{cols}, right-hand side has {rhs} rows")]
    DimensionMismatch { rows: usize, cols: usize, rhs: usize },
}

impl SolverError {
    /// Attach the Picard iteration to errors raised below the Picard loop.
    pub(crate) fn at_iteration(self, iteration: usize) -> Self {
        match self {
            SolverError::LinearSolveFailed { reason, .. } => {
                SolverError::LinearSolveFailed { iteration, reason }
            }
            SolverError::NonFinite { .. } => SolverError::NonFinite { iteration },
            SolverError::Cluster(reason) => SolverError::LinearSolveFailed {
                iteration,
                reason: format!("collective solve: {reason}"),
            },
            other => other,
        }
    }
}

pub(crate) fn log_iteration(
    i: usize,
    max_iter: usize,
    error: f64,
    fraction: f64,
    step_percent: f64,
    init: f64,
    logging: bool,
) {
    if !logging {
        return;
    }
    if i == 0 {
        println!("{i:>4} | {error:>8.3e} | {fraction:>8.3e} | {step_percent:>6.2}% | {init:>8.3e}");
    } else {
        print!("\x1B[1F\x1B[2K");
        println!(
            "{i:>4}/{max_iter} | {error:>8.3e} | {fraction:>9.3e} | {step_percent:>6.2}% | {init:>8.3e}"
        );
    }
    io::stdout().flush().ok();
}

/// Write the per-step Picard history as `step,iterations,error,converged`.
pub fn write_hist_to_file<P: AsRef<Path>>(
    path: P,
    history: &[(usize, usize, f64, bool)],
) -> io::Result<()> {
    let mut file = File::create(path)?;
    writeln!(file, "step,iterations,error,converged")?;
    for (step, iters, err, converged) in history {
        writeln!(file, "{step},{iters},{err},{converged}")?;
    }
    Ok(())
}
