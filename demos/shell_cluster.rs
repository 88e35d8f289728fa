use planet_thermal_rs::config::SimulationConfig;
use planet_thermal_rs::discretization::generator::create_shell_mesh;
use planet_thermal_rs::discretization::space::{FiniteElementSpace, LagrangeP1Space};
use planet_thermal_rs::models::planet::{PhysicalParams, PlanetHeatSimulator, PlanetParams};
use planet_thermal_rs::numerics::cluster::{ClusterContext, Role, ThreadCluster};
use planet_thermal_rs::processing::snapshot::spawn_csv_consumer;
use planet_thermal_rs::processing::summary::SimulationSummary;
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

const PARTICIPANTS: usize = 3;
const CG_TOLERANCE: f64 = 1e-13;

fn build(params: &PlanetParams, config: &SimulationConfig) -> PlanetHeatSimulator<LagrangeP1Space> {
    let space = LagrangeP1Space::new(create_shell_mesh(8.0, 10.0, 1, 4));
    PlanetHeatSimulator::new(space, params.clone(), config.clone())
        .expect("Failed to set up the simulation")
}

fn main() {
    fs::create_dir_all("output/cluster").expect("Failed to create cluster output directory");

    let params = PlanetParams::from_physical(&PhysicalParams::default(), true)
        .expect("Invalid physical parameters");
    let config = SimulationConfig {
        duration_days: 0.25,
        dt_seconds: 1800.0,
        step: 2,
        accuracy: 1e-9,
        npicard: 25,
        output: "cluster_".to_string(),
        ..Default::default()
    };

    println!("Shell Cluster Run ({PARTICIPANTS} participants)");
    println!("==================================");

    let (tx, rx) = mpsc::channel();
    let points = build(&params, &config).space().interpolation_points();
    let consumer = spawn_csv_consumer(rx, points, PathBuf::from("output/cluster/snapshots"));

    let workers: Vec<_> = ThreadCluster::new(PARTICIPANTS)
        .into_iter()
        .map(|ctx| {
            let mut ctx = ctx.with_tolerance(CG_TOLERANCE);
            let (params, config) = (params.clone(), config.clone());
            let tx = (ctx.role() == Role::Coordinator).then(|| tx.clone());
            thread::spawn(move || {
                let mut sim = build(&params, &config);
                let result = sim.run(Some(&mut ctx), tx.as_ref()).map(|_| sim.temperature());
                (ctx.rank(), result)
            })
        })
        .collect();
    drop(tx);

    let mut fields = Vec::new();
    for worker in workers {
        match worker.join().expect("Participant panicked") {
            (_, Ok(t)) => fields.push(t),
            (rank, Err(e)) => {
                eprintln!("Participant {rank} failed: {e}");
                return;
            }
        }
    }
    match consumer.join().expect("Snapshot writer panicked") {
        Ok(n) => println!("{n} snapshots saved to output/cluster/snapshots"),
        Err(e) => eprintln!("Snapshot writer failed: {e}"),
    }

    println!("Running local reference...");
    let mut local = build(&params, &config);
    local.run(None, None).expect("Local run failed");

    let mut summary = SimulationSummary::from_simulation(local.space().mesh(), &local);
    summary.add_comparison(&fields[0], &local.temperature());
    summary
        .write_to_file("output/cluster/simulation_summary.txt")
        .expect("Failed to write summary");
    summary.print_to_console();
}
