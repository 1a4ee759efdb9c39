//! Performance benchmarks for compiled reaction-diffusion systems
//!
//! The workload is a cubic grid of compartments with Fickian diffusion of
//! one species and a reversible binding reaction in every cell.
//!
//! # What We're Measuring
//!
//! 1. **Derivative evaluation**: one call of `rhs(t, q, dq)`.
//!    Cost should scale linearly with the number of rate terms.
//! 2. **Compilation**: `Model::flatten` followed by `OdeSystem::new`.
//!    Dominated by Ficks geometry and builder construction.
//! 3. **Integration**: RK4 against RK45 over the same span.
//!
//! # Running Benchmarks
//!
//! ```bash
//! cargo bench --bench rhs_performance
//!
//! # with the Rayon branch of the derivative
//! cargo bench --bench rhs_performance --features parallel
//!
//! # only the derivative group
//! cargo bench --bench rhs_performance "Derivative"
//! ```
//!
//! # Understanding Results
//!
//! ```text
//! Derivative Evaluation/8     time: [41.2 µs 41.5 µs 41.8 µs]
//!                             thrpt: [36.7 Melem/s ...]
//! ```
//!
//! With `--features parallel`, sizes above the parallel threshold should
//! show a throughput jump; sizes below it should match the sequential run.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::time::Duration;

use rxn_rs::network::{CompartmentArray3D, Connection, FicksConnection, Model, Reaction, Species};
use rxn_rs::solver::{OdeModel, RK4Solver, RK45Solver, SolverConfiguration};
use rxn_rs::system::{OdeSystem, StateAmount};
use rxn_rs::units::{self, UnitContext};

// =================================================================================================
// Workload
// =================================================================================================

/// Cubic `n × n × n` grid of 10 nm cells, periodic in x and y
fn grid_model(n: usize) -> Model {
    let ctx = UnitContext::default();
    let nm = units::NANOMETER;
    let edges: Vec<_> = (0..=n).map(|i| (10.0 * i as f64) * nm).collect();

    let d = 1e-6 * (units::CENTIMETER.powi(2) / units::SECOND);
    let ficks = FicksConnection::new(&ctx, [("drug", d)]).unwrap();

    let mut array =
        CompartmentArray3D::new(&ctx, "grid", &edges, &edges, &edges, Connection::Ficks(ficks), [true, true, false])
            .unwrap();

    let binding =
        Reaction::from_internal("binding", &[Species::new("drug")], &[Species::new("bound")], &[1], &[1], 1.0, 0.5)
            .unwrap();
    array.add_rxn_to_array(&binding);

    Model::new([array], []).unwrap()
}

fn grid_system(n: usize) -> OdeSystem {
    let model = grid_model(n);
    let mut system = OdeSystem::from_model(&model, UnitContext::default()).unwrap();
    let drug = system.state().select_species("drug");
    system.set_q(&drug, StateAmount::Count(100.0)).unwrap();
    system
}

// =================================================================================================
// Benchmark Functions
// =================================================================================================

/// One derivative evaluation for grids of increasing size
///
/// | n  | compartments | state size |
/// |----|--------------|------------|
/// | 4  | 64           | 128        |
/// | 8  | 512          | 1024       |
/// | 12 | 1728         | 3456       |
/// | 16 | 4096         | 8192       |
///
/// The 16³ grid is above the default parallel threshold.
fn benchmark_derivative(c: &mut Criterion) {
    let mut group = c.benchmark_group("Derivative Evaluation");

    for n in [4usize, 8, 12, 16] {
        let system = grid_system(n);
        let q: Vec<f64> = system.state().q_val().iter().copied().collect();
        let mut dq = vec![0.0; q.len()];

        group.throughput(Throughput::Elements(q.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                system.rhs(black_box(0.0), black_box(&q), &mut dq);
                black_box(&dq);
            });
        });
    }

    group.finish();
}

/// Flattening plus builder construction
fn benchmark_compilation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Model Compilation");
    group.sample_size(20);

    for n in [4usize, 8, 12] {
        let model = grid_model(n);
        group.throughput(Throughput::Elements((n * n * n) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &model, |b, model| {
            b.iter(|| OdeSystem::from_model(black_box(model), UnitContext::default()).unwrap());
        });
    }

    group.finish();
}

/// Fixed-step RK4 against adaptive RK45 on the 6³ grid
///
/// Exchange between neighboring cells runs at about 1e6 s⁻¹ at this D,
/// which bounds the stable RK4 step near 2e-7 s.
fn benchmark_solver_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("Solver Comparison");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(10));

    let system = grid_system(6);
    let span = (0.0, 2e-4);

    let fixed = SolverConfiguration::fixed_step(2000).with_save_every(100);
    group.bench_function("Runge-Kutta 4 (2000 steps)", |b| {
        b.iter(|| {
            let mut run = system.clone();
            run.propagate(black_box(span), &RK4Solver::new(), &fixed).unwrap()
        });
    });

    let adaptive = SolverConfiguration::adaptive(1e-6, 1e-6).with_save_every(100);
    group.bench_function("Dormand-Prince (rtol 1e-6)", |b| {
        b.iter(|| {
            let mut run = system.clone();
            run.propagate(black_box(span), &RK45Solver::new(), &adaptive).unwrap()
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_derivative, benchmark_compilation, benchmark_solver_comparison);
criterion_main!(benches);
