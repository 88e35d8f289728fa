use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use glam::DVec3;
use nalgebra::DVector;
use planet_thermal_rs::discretization::generator::create_shell_mesh;
use planet_thermal_rs::discretization::space::{FiniteElementSpace, LagrangeP1Space};
use planet_thermal_rs::numerics::linear::DirectSolver;
use planet_thermal_rs::numerics::picard::PicardSolver;
use planet_thermal_rs::physics::BoundaryModel;
use planet_thermal_rs::physics::illumination::IlluminationModel;
use planet_thermal_rs::physics::radiation::RadiativeBoundary;

fn subdivisions() -> Vec<u32> {
    vec![1, 2, 3]
}

fn setup(subdivisions: u32) -> (LagrangeP1Space, RadiativeBoundary) {
    let space = LagrangeP1Space::new(create_shell_mesh(8.0, 10.0, subdivisions, 4));
    let sun = IlluminationModel::new(DVec3::new(1.0, 0.0, 0.1)).unwrap();
    let boundary = RadiativeBoundary::new(&space, 3, sun, 0.8, 1.0).unwrap();
    (space, boundary)
}

fn bench_boundary_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("boundary_assembly");
    for &sub in &subdivisions() {
        let (space, boundary) = setup(sub);
        let u = DVector::from_element(space.number_of_dofs(), 0.7);
        group.bench_with_input(BenchmarkId::from_parameter(sub), &sub, |b, &_| {
            b.iter(|| boundary.linearize(&u, 0.3));
        });
    }
    group.finish();
}

fn bench_operator_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("operator_assembly");
    for &sub in &subdivisions() {
        let (space, _) = setup(sub);
        group.bench_with_input(BenchmarkId::from_parameter(sub), &sub, |b, &_| {
            b.iter(|| (space.stiffness_matrix(), space.mass_matrix()));
        });
    }
    group.finish();
}

fn bench_picard_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("picard_step");
    group.sample_size(10);
    for &sub in &subdivisions() {
        let (space, boundary) = setup(sub);
        let (s, m) = (space.stiffness_matrix(), space.mass_matrix());
        let n = space.number_of_dofs();
        let current = DVector::from_element(n, 0.7);
        let solver = PicardSolver {
            accuracy: 1e-10,
            max_iterations: 20,
            logging: false,
        };
        group.bench_with_input(BenchmarkId::from_parameter(sub), &sub, |b, &_| {
            b.iter_batched(
                || (DVector::zeros(n), DVector::zeros(n)),
                |(mut trial, mut next)| {
                    solver
                        .step(&s, &m, &boundary, &mut DirectSolver, &current, &mut trial, &mut next, 0.2, 0.1)
                        .unwrap()
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_boundary_assembly,
    bench_operator_assembly,
    bench_picard_step
);
criterion_main!(benches);
