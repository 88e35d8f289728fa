use planet_thermal_rs::config::SimulationConfig;
use planet_thermal_rs::discretization::generator::create_shell_mesh;
use planet_thermal_rs::discretization::space::{FiniteElementSpace, LagrangeP1Space};
use planet_thermal_rs::models::planet::{PhysicalParams, PlanetHeatSimulator, PlanetParams};
use planet_thermal_rs::processing::csv_writer;
use planet_thermal_rs::processing::snapshot::spawn_csv_consumer;
use planet_thermal_rs::processing::summary::SimulationSummary;
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc;

fn main() {
    fs::create_dir_all("output/main").expect("Failed to create output directory");

    let params = PlanetParams::from_physical(&PhysicalParams::default(), true)
        .expect("Invalid physical parameters");
    let config = SimulationConfig {
        duration_days: 1.0,
        dt_seconds: 900.0,
        step: 4,
        accuracy: 1e-8,
        npicard: 30,
        logging: true,
        ..Default::default()
    };

    // lengths are in units of the diurnal skin depth
    let mesh = create_shell_mesh(14.0, 20.0, 2, 6);
    let space = LagrangeP1Space::new(mesh);
    let points = space.interpolation_points();

    let mut sim =
        PlanetHeatSimulator::new(space, params, config).expect("Failed to set up the simulation");

    let (tx, rx) = mpsc::channel();
    let consumer = spawn_csv_consumer(rx, points.clone(), PathBuf::from("output/main/snapshots"));

    if let Err(e) = sim.run(None, Some(&tx)) {
        eprintln!("Simulation failed: {e}");
    }
    drop(tx);

    match consumer.join() {
        Ok(Ok(n)) => println!("{n} snapshots saved to output/main/snapshots"),
        Ok(Err(e)) => eprintln!("Snapshot writer failed: {e}"),
        Err(_) => eprintln!("Snapshot writer panicked"),
    }

    csv_writer::write_nodal_field(
        "output/main/temperature_final.csv",
        &points,
        "T",
        &sim.temperature(),
    )
    .expect("Failed to write final temperature");
    sim.write_history("output/main/picard_history.csv")
        .expect("Failed to write Picard history");

    let summary = SimulationSummary::from_simulation(sim.space().mesh(), &sim);
    summary
        .write_to_file("output/main/simulation_summary.txt")
        .expect("Failed to write summary");
    summary.print_to_console();

    println!("Summary saved to output/main/simulation_summary.txt");
}
