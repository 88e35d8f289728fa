use crate::discretization::mesh::TetMesh;
use crate::discretization::space::FiniteElementSpace;
use crate::models::planet::PlanetHeatSimulator;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

pub struct SimulationSummary {
    // Mesh info
    pub num_cells: usize,
    pub num_nodes: usize,
    pub num_boundary_faces: usize,
    pub num_radiating_faces: usize,
    pub volume: f64,
    pub exterior_area: f64,
    pub min_cell_volume: f64,
    pub max_cell_volume: f64,

    // Nondimensional parameters
    pub omega: f64,
    pub tss: f64,
    pub theta: f64,
    pub phi: f64,
    pub insolation: f64,

    // Timeline (normalised)
    pub t_end: f64,
    pub dt: f64,
    pub nt: usize,

    // Picard statistics
    pub steps: usize,
    pub total_iterations: usize,
    pub capped_steps: usize,
    pub max_final_error: f64,

    // Surface temperature at the last level [K]
    pub surface_min: f64,
    pub surface_max: f64,
    pub surface_mean: f64,
    /// Solar power absorbed at the last level, in units of `Φ`.
    pub absorbed_power: f64,

    pub max_solution_diff: Option<f64>,
    pub mean_solution_diff: Option<f64>,
}

impl SimulationSummary {
    pub fn from_simulation<S: FiniteElementSpace>(
        mesh: &TetMesh,
        sim: &PlanetHeatSimulator<S>,
    ) -> Self {
        let volumes: Vec<f64> = mesh.cells.iter().map(|c| c.volume).collect();
        let params = sim.params();
        let timeline = sim.timeline();
        let history = sim.history();

        let space = sim.space();
        let surface: BTreeSet<usize> = space
            .exterior_boundary_faces()
            .into_iter()
            .flat_map(|f| space.face_to_dof(f).to_vec())
            .collect();
        let temperature = sim.temperature();
        let surface_t: Vec<f64> = surface.iter().map(|&d| temperature[d]).collect();

        Self {
            num_cells: mesh.cells.len(),
            num_nodes: mesh.nodes.len(),
            num_boundary_faces: mesh.faces.len(),
            num_radiating_faces: sim.boundary().num_faces(),
            volume: mesh.total_volume(),
            exterior_area: mesh.exterior_area(),
            min_cell_volume: volumes.iter().cloned().fold(f64::INFINITY, f64::min),
            max_cell_volume: volumes.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            omega: params.omega,
            tss: params.tss,
            theta: params.theta,
            phi: params.phi,
            insolation: params.insolation,
            t_end: timeline.t1,
            dt: timeline.dt,
            nt: timeline.nt,
            steps: history.len(),
            total_iterations: history.iter().map(|r| r.iterations).sum(),
            capped_steps: history.iter().filter(|r| !r.converged).count(),
            max_final_error: history.iter().map(|r| r.error).fold(0.0, f64::max),
            surface_min: surface_t.iter().cloned().fold(f64::INFINITY, f64::min),
            surface_max: surface_t.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            surface_mean: surface_t.iter().sum::<f64>() / surface_t.len().max(1) as f64,
            absorbed_power: sim.boundary().absorbed_power(timeline.current_time_level()),
            max_solution_diff: None,
            mean_solution_diff: None,
        }
    }

    /// Record how far two runs of the same problem ended apart.
    pub fn add_comparison(&mut self, a: &[f64], b: &[f64]) {
        let diffs: Vec<f64> = a.iter().zip(b).map(|(x, y)| (x - y).abs()).collect();
        self.max_solution_diff = Some(diffs.iter().cloned().fold(0.0, f64::max));
        self.mean_solution_diff = Some(diffs.iter().sum::<f64>() / diffs.len().max(1) as f64);
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut file = File::create(path)?;

        writeln!(file, "{}", "=".repeat(60))?;
        writeln!(file, "PLANET HEAT CONDUCTION SUMMARY")?;
        writeln!(file, "{}", "=".repeat(60))?;
        writeln!(file)?;

        writeln!(file, "MESH STATISTICS")?;
        writeln!(file, "{}", "-".repeat(60))?;
        writeln!(file, "Number of cells:     {}", self.num_cells)?;
        writeln!(file, "Number of nodes:     {}", self.num_nodes)?;
        writeln!(
            file,
            "Boundary faces:      {} ({} radiating)",
            self.num_boundary_faces, self.num_radiating_faces
        )?;
        writeln!(file, "Volume:              {:.6e}", self.volume)?;
        writeln!(file, "Radiating area:      {:.6e}", self.exterior_area)?;
        writeln!(
            file,
            "Cell volume:         {:.6e} to {:.6e}",
            self.min_cell_volume, self.max_cell_volume
        )?;
        writeln!(file)?;

        writeln!(file, "NORMALIZATION SCALES")?;
        writeln!(file, "{}", "-".repeat(60))?;
        writeln!(file, "Spin rate (omega):   {:.6e} rad/s", self.omega)?;
        writeln!(file, "Subsolar T (Tss):    {:.3} K", self.tss)?;
        writeln!(file, "Initial T (theta):   {:.3} K", self.theta)?;
        writeln!(file, "Phi:                 {:.6e}", self.phi)?;
        writeln!(file, "Insolation scale:    {:.3}", self.insolation)?;
        writeln!(file)?;

        writeln!(file, "TIMELINE")?;
        writeln!(file, "{}", "-".repeat(60))?;
        writeln!(
            file,
            "End time:            {:.6e} ({:.3} rotations)",
            self.t_end,
            self.t_end / std::f64::consts::TAU
        )?;
        writeln!(file, "Step length:         {:.6e}", self.dt)?;
        writeln!(file, "Steps:               {} of {}", self.steps, self.nt)?;
        writeln!(file)?;

        writeln!(file, "PICARD ITERATION")?;
        writeln!(file, "{}", "-".repeat(60))?;
        writeln!(file, "Total iterations:    {}", self.total_iterations)?;
        writeln!(
            file,
            "Per step:            {:.2}",
            self.total_iterations as f64 / self.steps.max(1) as f64
        )?;
        writeln!(file, "Capped steps:        {}", self.capped_steps)?;
        writeln!(file, "Max final update:    {:.6e}", self.max_final_error)?;
        writeln!(file)?;

        writeln!(file, "SURFACE TEMPERATURE")?;
        writeln!(file, "{}", "-".repeat(60))?;
        writeln!(file, "Min:                 {:.3} K", self.surface_min)?;
        writeln!(file, "Max:                 {:.3} K", self.surface_max)?;
        writeln!(file, "Mean:                {:.3} K", self.surface_mean)?;
        writeln!(file, "Absorbed power:      {:.6e}", self.absorbed_power)?;
        writeln!(file)?;

        if let (Some(max_diff), Some(mean_diff)) = (self.max_solution_diff, self.mean_solution_diff)
        {
            writeln!(file, "RUN COMPARISON")?;
            writeln!(file, "{}", "-".repeat(60))?;
            writeln!(file, "Max difference:      {:.6e} K", max_diff)?;
            writeln!(file, "Mean difference:     {:.6e} K", mean_diff)?;
            writeln!(file)?;
        }

        writeln!(file, "{}", "=".repeat(60))?;

        Ok(())
    }

    pub fn print_to_console(&self) {
        println!("\n{}", "=".repeat(60));
        println!("SIMULATION SUMMARY");
        println!("{}", "=".repeat(60));
        println!(
            "Mesh:          {} cells, {} nodes, {} radiating faces",
            self.num_cells, self.num_nodes, self.num_radiating_faces
        );
        println!("Tss / Phi:     {:.2} K / {:.4}", self.tss, self.phi);
        println!(
            "Picard:        {} iterations over {} steps, {} capped",
            self.total_iterations, self.steps, self.capped_steps
        );
        println!(
            "Surface T:     {:.2} .. {:.2} K (mean {:.2} K)",
            self.surface_min, self.surface_max, self.surface_mean
        );
        if let Some(max_diff) = self.max_solution_diff {
            println!("Max diff:      {:.3e} K", max_diff);
        }
        println!("{}\n", "=".repeat(60));
    }
}
