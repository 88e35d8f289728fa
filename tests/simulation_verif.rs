use nalgebra::DVector;
use planet_thermal_rs::config::SimulationConfig;
use planet_thermal_rs::discretization::generator::create_shell_mesh;
use planet_thermal_rs::discretization::space::{FiniteElementSpace, LagrangeP1Space};
use planet_thermal_rs::models::planet::{MarchState, PlanetHeatSimulator, PlanetParams};
use planet_thermal_rs::numerics::cluster::{ClusterContext, Role, ThreadCluster};
use planet_thermal_rs::processing::snapshot::{OutputMessage, Snapshot, spawn_csv_consumer};
use planet_thermal_rs::processing::summary::SimulationSummary;
use std::f64::consts::TAU;
use std::sync::mpsc;
use std::thread;

const DAY: f64 = 86_400.0;

fn params() -> PlanetParams {
    PlanetParams {
        omega: TAU / DAY,
        tss: 390.0,
        theta: 250.0,
        phi: 0.6,
        sun_direction: [1.0, 0.0, 0.2],
        insolation: 1.0,
    }
}

fn space() -> LagrangeP1Space {
    LagrangeP1Space::new(create_shell_mesh(3.0, 4.0, 1, 2))
}

fn drain(rx: mpsc::Receiver<OutputMessage>) -> (Vec<Snapshot>, usize) {
    let mut snapshots = Vec::new();
    let mut sentinels = 0;
    for message in rx.try_iter() {
        match message {
            OutputMessage::Snapshot(s) => snapshots.push(s),
            OutputMessage::EndOfStream => sentinels += 1,
        }
    }
    (snapshots, sentinels)
}

#[test]
fn two_time_levels_give_two_snapshots_and_one_sentinel() {
    let config = SimulationConfig {
        npicard: 1,
        accuracy: 0.0,
        step: 1,
        duration_days: 1.0,
        dt_seconds: DAY,
        ..Default::default()
    };
    let space = space();
    let n = space.number_of_dofs();
    let initial = DVector::from_fn(n, |i, _| 0.5 + 0.01 * (i % 7) as f64);
    let mut sim = PlanetHeatSimulator::new(space, params(), config)
        .unwrap()
        .with_initial_field(initial.clone())
        .unwrap();
    assert_eq!(sim.timeline().nt, 1);

    let (tx, rx) = mpsc::channel();
    sim.run(None, Some(&tx)).unwrap();
    let (snapshots, sentinels) = drain(rx);

    assert_eq!(snapshots.len(), 2);
    assert_eq!(sentinels, 1);
    assert_eq!(snapshots[0].level, 0);
    assert_eq!(snapshots[0].label, "temperature_0000000000");
    assert_eq!(snapshots[1].label, "temperature_0000000001");
    for (t, u) in snapshots[0].temperature.iter().zip(initial.iter()) {
        assert_eq!(*t, u * 390.0);
    }
    assert_eq!(sim.history().len(), 1);
    assert_eq!(sim.history()[0].iterations, 1);
    assert!(!sim.history()[0].converged);
    assert_eq!(sim.state(), MarchState::Stopped);
}

#[test]
fn stride_and_final_level_are_emitted() {
    let config = SimulationConfig {
        step: 2,
        duration_days: 1.0,
        dt_seconds: DAY / 5.0,
        output: "T_".to_string(),
        ..Default::default()
    };
    let mut sim = PlanetHeatSimulator::new(space(), params(), config).unwrap();
    let (tx, rx) = mpsc::channel();
    sim.run(None, Some(&tx)).unwrap();
    let (snapshots, sentinels) = drain(rx);

    let levels: Vec<usize> = snapshots.iter().map(|s| s.level).collect();
    assert_eq!(levels, vec![0, 2, 4, 5]);
    assert_eq!(sentinels, 1);
    assert_eq!(snapshots[3].label, "T_0000000005");
    assert!((snapshots[3].time - TAU).abs() < 1e-9);
}

#[test]
fn runs_without_a_consumer() {
    let config = SimulationConfig {
        duration_days: 0.5,
        dt_seconds: 3600.0,
        ..Default::default()
    };
    let mut sim = PlanetHeatSimulator::new(space(), params(), config).unwrap();
    assert_eq!(sim.state(), MarchState::Running);
    sim.run(None, None).unwrap();
    assert_eq!(sim.history().len(), 12);
    assert!(sim.temperature().iter().all(|t| t.is_finite() && *t > 0.0));
}

#[test]
fn cold_dark_body_stays_cold() {
    let p = PlanetParams {
        theta: 0.0,
        insolation: 0.0,
        ..params()
    };
    let config = SimulationConfig {
        duration_days: 0.25,
        dt_seconds: 3600.0,
        ..Default::default()
    };
    let mut sim = PlanetHeatSimulator::new(space(), p, config).unwrap();
    sim.run(None, None).unwrap();
    assert!(sim.temperature().iter().all(|t| *t == 0.0));
    assert!(sim.history().iter().all(|r| r.converged && r.iterations == 1));
}

#[test]
fn lit_hemisphere_is_warmer() {
    let config = SimulationConfig {
        duration_days: 0.25,
        dt_seconds: 1800.0,
        ..Default::default()
    };
    let mut sim = PlanetHeatSimulator::new(space(), params(), config).unwrap();
    sim.run(None, None).unwrap();

    // after a quarter turn the Sun sits over -y
    let points = sim.space().interpolation_points();
    let t = sim.temperature();
    let surface = |sign: f64| {
        let v: Vec<f64> = points
            .iter()
            .zip(&t)
            .filter(|(p, _)| p.length() > 3.99 && sign * p.y > 3.0)
            .map(|(_, t)| *t)
            .collect();
        v.iter().sum::<f64>() / v.len() as f64
    };
    assert!(surface(-1.0) > surface(1.0));
}

#[test]
fn cluster_run_matches_local_run() {
    let config = SimulationConfig {
        duration_days: 0.125,
        dt_seconds: 1800.0,
        accuracy: 1e-10,
        ..Default::default()
    };

    let mut local = PlanetHeatSimulator::new(space(), params(), config.clone()).unwrap();
    local.run(None, None).unwrap();
    let expected = local.temperature();

    let (tx, rx) = mpsc::channel();
    let workers: Vec<_> = ThreadCluster::new(3)
        .into_iter()
        .map(|mut ctx| {
            let config = config.clone();
            let tx = (ctx.role() == Role::Coordinator).then(|| tx.clone());
            thread::spawn(move || {
                let mut sim = PlanetHeatSimulator::new(space(), params(), config).unwrap();
                sim.run(Some(&mut ctx), tx.as_ref()).unwrap();
                sim.temperature()
            })
        })
        .collect();
    drop(tx);
    let fields: Vec<Vec<f64>> = workers.into_iter().map(|w| w.join().unwrap()).collect();

    for field in &fields {
        assert_eq!(field, &fields[0]);
    }
    for (a, b) in fields[0].iter().zip(&expected) {
        assert!((a - b).abs() < 1e-6, "{a} vs {b}");
    }
    let (snapshots, sentinels) = drain(rx);
    assert_eq!(snapshots.len(), 7);
    assert_eq!(sentinels, 1);
}

#[test]
fn configuration_files_drive_a_run() {
    let dir = tempfile::tempdir().unwrap();
    let run = dir.path().join("run.json");
    let body = dir.path().join("body.json");
    std::fs::write(&run, r#"{ "T": 0.1, "DT": 2880.0, "step": 3, "output": "f_" }"#).unwrap();
    std::fs::write(&body, serde_json::to_string(&params()).unwrap()).unwrap();

    let config = SimulationConfig::from_file(&run).unwrap();
    let p = PlanetParams::from_file(&body).unwrap();
    let space = space();
    let points = space.interpolation_points();
    let mut sim = PlanetHeatSimulator::new(space, p, config).unwrap();

    let (tx, rx) = mpsc::channel();
    let out = dir.path().join("snapshots");
    let consumer = spawn_csv_consumer(rx, points, out.clone());
    sim.run(None, Some(&tx)).unwrap();

    // levels 0, 3 and the final level 3
    assert_eq!(consumer.join().unwrap().unwrap(), 2);
    assert!(out.join("f_0000000003.csv").exists());

    let history = dir.path().join("picard.csv");
    sim.write_history(&history).unwrap();
    assert_eq!(std::fs::read_to_string(history).unwrap().lines().count(), 4);

    let summary = SimulationSummary::from_simulation(sim.space().mesh(), &sim);
    assert_eq!(summary.steps, 3);
    assert!(summary.surface_min <= summary.surface_mean);
    assert!(summary.surface_mean <= summary.surface_max);
    assert!(summary.absorbed_power > 0.0);
    let report = dir.path().join("summary.txt");
    summary.write_to_file(&report).unwrap();
    assert!(std::fs::read_to_string(report).unwrap().contains("PICARD ITERATION"));
}
