use super::params::PlanetParams;
use crate::config::{ConfigError, SimulationConfig};
use crate::discretization::space::FiniteElementSpace;
use crate::error::{SimulationError, SimulationResult};
use crate::numerics::cluster::ClusterContext;
use crate::numerics::linear::select_backend;
use crate::numerics::picard::{PicardReport, PicardSolver};
use crate::numerics::solver::write_hist_to_file;
use crate::numerics::timeline::UniformTimeLine;
use crate::numerics::timing::{finalize_and_print, record_step, reset_timing};
use crate::physics::illumination::IlluminationModel;
use crate::physics::radiation::RadiativeBoundary;
use crate::processing::snapshot::{OutputMessage, Snapshot};
use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;
use std::path::Path;
use std::sync::mpsc::Sender;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarchState {
    Running,
    Stopped,
}

/// Outcome of one time step.
#[derive(Debug, Clone)]
pub struct StepRecord {
    /// Time level reached by the step.
    pub level: usize,
    pub time: f64,
    pub iterations: usize,
    pub error: f64,
    pub converged: bool,
}

/// Backward Euler time marching for heat conduction in a rotating body with
/// a radiative surface, one Picard loop per step.
pub struct PlanetHeatSimulator<S: FiniteElementSpace> {
    space: S,
    params: PlanetParams,
    config: SimulationConfig,
    stiffness: CsrMatrix<f64>,
    mass: CsrMatrix<f64>,
    boundary: RadiativeBoundary,
    picard: PicardSolver,
    timeline: UniformTimeLine,
    current: DVector<f64>,
    next: DVector<f64>,
    trial: DVector<f64>,
    history: Vec<StepRecord>,
}

impl<S: FiniteElementSpace> PlanetHeatSimulator<S> {
    pub fn new(space: S, params: PlanetParams, config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        params.validate()?;
        let (t_end, _, nt) = config.normalized_timeline(params.omega)?;

        let illumination = IlluminationModel::new(params.sun_direction())
            .ok_or_else(|| ConfigError::Invalid("sun direction must be non-zero".to_string()))?;
        let boundary =
            RadiativeBoundary::new(&space, config.nq, illumination, params.phi, params.insolation)?;

        let stiffness = space.stiffness_matrix();
        let mass = space.mass_matrix();
        let current = DVector::from_element(space.number_of_dofs(), params.initial_value());

        if config.logging {
            println!(
                "{} dofs, {} radiating faces, {} steps of {:.3e} (normalised)",
                space.number_of_dofs(),
                boundary.num_faces(),
                nt,
                t_end / nt as f64
            );
        }

        Ok(Self {
            picard: PicardSolver {
                accuracy: config.accuracy,
                max_iterations: config.npicard,
                logging: config.logging,
            },
            timeline: UniformTimeLine::new(0.0, t_end, nt),
            next: current.clone(),
            trial: current.clone(),
            current,
            history: Vec::new(),
            space,
            params,
            config,
            stiffness,
            mass,
            boundary,
        })
    }

    /// Replace the uniform initial field by `u`, dimensionless.
    pub fn with_initial_field(mut self, u: DVector<f64>) -> Result<Self, ConfigError> {
        if u.len() != self.current.len() {
            return Err(ConfigError::Invalid(format!(
                "initial field has {} values, the space has {} dofs",
                u.len(),
                self.current.len()
            )));
        }
        self.current.copy_from(&u);
        self.next.copy_from(&u);
        self.trial.copy_from(&u);
        Ok(self)
    }

    pub fn state(&self) -> MarchState {
        if self.timeline.stopped() {
            MarchState::Stopped
        } else {
            MarchState::Running
        }
    }

    pub fn space(&self) -> &S {
        &self.space
    }

    pub fn params(&self) -> &PlanetParams {
        &self.params
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn boundary(&self) -> &RadiativeBoundary {
        &self.boundary
    }

    pub fn timeline(&self) -> &UniformTimeLine {
        &self.timeline
    }

    pub fn history(&self) -> &[StepRecord] {
        &self.history
    }

    /// Dimensionless field at the current time level.
    pub fn current(&self) -> &DVector<f64> {
        &self.current
    }

    /// Current field in kelvin.
    pub fn temperature(&self) -> Vec<f64> {
        self.current.iter().map(|u| u * self.params.tss).collect()
    }

    fn snapshot(&self) -> Snapshot {
        let level = self.timeline.current;
        Snapshot {
            label: Snapshot::label(&self.config.output, level),
            level,
            time: self.timeline.current_time_level(),
            temperature: self.temperature(),
        }
    }

    /// March to the end of the timeline.
    ///
    /// With a cluster context the linear solves are collective, and every
    /// participant must call `run` with the same configuration. Snapshots are
    /// sent to `output` when given: the initial level, every `step`-th level
    /// and the final level, followed by one [`OutputMessage::EndOfStream`].
    pub fn run(
        &mut self,
        ctx: Option<&mut dyn ClusterContext>,
        output: Option<&Sender<OutputMessage>>,
    ) -> SimulationResult<()> {
        reset_timing();
        let start = Instant::now();
        if self.config.logging
            && let Some(c) = ctx.as_deref()
        {
            println!("Linear solves shared by {} participants", c.size());
        }
        let mut backend = select_backend(ctx);
        let mut output = output;

        if output.is_some() {
            emit(&mut output, self.snapshot());
        }

        while !self.timeline.stopped() {
            let step = self.timeline.current;
            let time = self.timeline.next_time_level();
            let dt = self.timeline.current_time_step_length();

            let report: PicardReport = self
                .picard
                .step(
                    &self.stiffness,
                    &self.mass,
                    &self.boundary,
                    backend.as_mut(),
                    &self.current,
                    &mut self.trial,
                    &mut self.next,
                    time,
                    dt,
                )
                .map_err(|source| SimulationError::StepFailed { step, source })?;

            self.current.copy_from(&self.next);
            self.timeline.advance();
            record_step();

            let level = self.timeline.current;
            if self.config.logging {
                println!(
                    "Step {:>4} | t = {:.4e} | dt = {:.3e} | iters = {} | err = {:.3e}",
                    level,
                    time,
                    dt,
                    report.iterations,
                    report.final_error()
                );
            }
            self.history.push(StepRecord {
                level,
                time,
                iterations: report.iterations,
                error: report.final_error(),
                converged: report.converged(),
            });

            if output.is_some() && (level % self.config.step == 0 || self.timeline.stopped()) {
                emit(&mut output, self.snapshot());
            }
        }

        if let Some(tx) = output {
            let _ = tx.send(OutputMessage::EndOfStream);
        }
        finalize_and_print(start.elapsed());
        Ok(())
    }

    /// Write the per-step Picard history as CSV.
    pub fn write_history<P: AsRef<Path>>(&self, path: P) -> SimulationResult<()> {
        let rows: Vec<_> = self
            .history
            .iter()
            .map(|r| (r.level, r.iterations, r.error, r.converged))
            .collect();
        write_hist_to_file(path, &rows)?;
        Ok(())
    }
}

/// Send a snapshot, dropping the sender if the consumer has gone away.
fn emit(output: &mut Option<&Sender<OutputMessage>>, snapshot: Snapshot) {
    let failed = match output {
        Some(tx) => tx.send(OutputMessage::Snapshot(snapshot)).is_err(),
        None => false,
    };
    if failed {
        eprintln!("snapshot consumer disconnected, no further output is sent");
        *output = None;
    }
}
