//! Integration tests: network + ODE system + solvers
//!
//! These tests verify that compiled systems obey the rate laws and the
//! conservation properties of the networks they come from.

use rxn_rs::network::{BoundingBox, Compartment, FicksConnection, Model, Reaction, Species};
use rxn_rs::output::{CsvConfig, CsvExporter, Exporter};
use rxn_rs::solver::{EulerSolver, RK4Solver, RK45Solver, Solver, SolverConfiguration, SolverType};
use rxn_rs::system::{OdeSystem, StateAmount};
use rxn_rs::units::{self, UnitContext};
use rxn_rs::Error;

mod common;
use common::{binding, relative_error, single_reaction_model, slab, two_box_model};

// =================================================================================================
// Rate laws
// =================================================================================================

#[test]
fn test_first_order_rate() {
    let decay = Reaction::from_internal("decay", &[Species::new("A")], &[Species::new("B")], &[1], &[1], 0.3, 0.0)
        .unwrap();
    let model = single_reaction_model("box", 2.0, decay);
    let mut system = OdeSystem::from_model(&model, UnitContext::default()).unwrap();

    system.set_q(&[0], StateAmount::Count(100.0)).unwrap();
    let dq = system.current_derivative();

    // first order: independent of volume
    assert!((dq[0] + 30.0).abs() < 1e-12);
    assert!((dq[1] - 30.0).abs() < 1e-12);
}

#[test]
fn test_second_order_rate_scales_with_volume() {
    let model = single_reaction_model("box", 2.0, binding(0.1, 0.0));
    let mut system = OdeSystem::from_model(&model, UnitContext::default()).unwrap();

    system.set_q(&[0], StateAmount::Count(10.0)).unwrap();
    system.set_q(&[1], StateAmount::Count(20.0)).unwrap();
    let dq = system.current_derivative();

    // k/V · A · B = 0.1 / 2 · 10 · 20
    assert!((dq[0] + 10.0).abs() < 1e-12);
    assert!((dq[1] + 10.0).abs() < 1e-12);
    assert!((dq[2] - 10.0).abs() < 1e-12);
}

#[test]
fn test_binding_conserves_mass() {
    let model = single_reaction_model("cell", 1.0, binding(0.01, 0.5));
    let mut system = OdeSystem::from_model(&model, UnitContext::default()).unwrap();
    system.set_q(&[0], StateAmount::Count(200.0)).unwrap();
    system.set_q(&[1], StateAmount::Count(100.0)).unwrap();

    let config = SolverConfiguration::adaptive(1e-8, 1e-8);
    let result = system.propagate((0.0, 20.0), &RK45Solver::new(), &config).unwrap();

    let total_a = result.sum_over(&[0, 2]).unwrap();
    let total_b = result.sum_over(&[1, 2]).unwrap();
    for (a, b) in total_a.iter().zip(&total_b) {
        assert!((a - 200.0).abs() < 1e-6, "A + C drifted to {a}");
        assert!((b - 100.0).abs() < 1e-6, "B + C drifted to {b}");
    }

    // equilibrium: kf/V · A · B = kr · C
    let q = system.state().q_val();
    let forward = 0.01 * q[0] * q[1];
    let reverse = 0.5 * q[2];
    assert!(relative_error(forward, reverse) < 1e-4);
}

// =================================================================================================
// Transport
// =================================================================================================

#[test]
fn test_two_box_diffusion_relaxes_with_analytic_time_constant() {
    // V = 1 L, k = 0.5 L/s → the difference decays as exp(-2k t / V)
    let model = two_box_model(1.0, 0.5);
    let mut system = OdeSystem::from_model(&model, UnitContext::default()).unwrap();
    system.set_q(&[0], StateAmount::Count(1000.0)).unwrap();

    let config = SolverConfiguration::fixed_step(200);
    let result = system.propagate((0.0, 1.0), &RK4Solver::new(), &config).unwrap();

    let expected_left = 500.0 + 500.0 * (-1.0f64).exp();
    let q = &result.final_state;
    assert!(relative_error(q[0], expected_left) < 1e-8);
    assert!((q[0] + q[1] - 1000.0).abs() < 1e-9);
}

#[test]
fn test_ficks_boxes_relax_with_geometry_derived_rate() {
    let ctx = UnitContext::default();

    // two 10 nm cubes side by side along x
    let side = 1e-7;
    let left = BoundingBox::from_internal("left", [0.0; 3], [side; 3]).unwrap();
    let right = BoundingBox::from_internal("right", [side, 0.0, 0.0], [2.0 * side, side, side]).unwrap();
    let mut model = Model::new(
        [],
        [
            Compartment::with_bounds("left", left).unwrap(),
            Compartment::with_bounds("right", right).unwrap(),
        ],
    )
    .unwrap();

    let d = 1e-5 * (units::CENTIMETER.powi(2) / units::SECOND);
    let ficks = FicksConnection::new(&ctx, [("drug", d)]).unwrap();
    model.connect("left", "right", ficks.into()).unwrap();

    // k = D·A/Δx with D = 1e-7 dm²/s, A = side², Δx = side
    let k = 1e-7 * side * side / side;
    let volume = side * side * side;
    let flat = model.flatten().unwrap();
    let (k_out, k_in) = flat.connection("left", "right").unwrap().rates("drug").unwrap();
    assert!(relative_error(k_out, k) < 1e-9);
    assert!(relative_error(k_in, k) < 1e-9);

    let mut system = OdeSystem::new(flat, ctx).unwrap();
    let q_left = system.state().index_of("left", "drug").unwrap();
    let q_right = system.state().index_of("right", "drug").unwrap();
    system.set_q(&[q_left], StateAmount::Count(1000.0)).unwrap();

    // 2k/V = 2e7 s⁻¹
    let config = SolverConfiguration::fixed_step(1000);
    let result = system.propagate((0.0, 1e-7), &RK4Solver::new(), &config).unwrap();

    let decay = 2.0 * k / volume;
    for (t, q) in result.time_points.iter().zip(&result.trajectory) {
        let expected = 500.0 + 500.0 * (-decay * t).exp();
        assert!(relative_error(q[q_left], expected) < 1e-8, "left = {} at t = {t}", q[q_left]);
        assert!((q[q_left] + q[q_right] - 1000.0).abs() < 1e-9);
    }
}

#[test]
fn test_unequal_volumes_equilibrate_to_equal_concentration() {
    let left = Compartment::from_internal("left", 1.0).unwrap();
    let right = Compartment::from_internal("right", 3.0).unwrap();
    let mut model = Model::new([], [left, right]).unwrap();
    let conn = rxn_rs::network::IsotropicConnection::from_internal([("A", 2.0)]).unwrap();
    model.connect("left", "right", conn.into()).unwrap();

    let mut system = OdeSystem::from_model(&model, UnitContext::default()).unwrap();
    system.set_q(&[0], StateAmount::Count(400.0)).unwrap();

    let config = SolverConfiguration::adaptive(1e-9, 1e-9);
    system.propagate((0.0, 50.0), &RK45Solver::new(), &config).unwrap();

    let q = system.state().q_val();
    assert!((q[0] - 100.0).abs() < 1e-4);
    assert!((q[1] - 300.0).abs() < 1e-4);
}

#[test]
fn test_ficks_column_conserves_and_spreads() {
    let ctx = UnitContext::default();
    let model = Model::new([slab(&ctx, "slab", 4, 10.0, 1e-5)], []).unwrap();
    let mut system = OdeSystem::from_model(&model, ctx).unwrap();

    let first = system.state().index_of("slab-0_0_0", "drug").unwrap();
    system.set_q(&[first], StateAmount::Count(1000.0)).unwrap();

    // rate/V = 1e-14 / 1e-21 = 1e7 s⁻¹
    let config = SolverConfiguration::adaptive(1e-8, 1e-6);
    let result = system.propagate((0.0, 1e-5), &RK45Solver::new(), &config).unwrap();

    let drug = system.state().select_species("drug");
    assert_eq!(drug.len(), 4);
    let totals = result.sum_over(&drug).unwrap();
    assert!(totals.iter().all(|t| (t - 1000.0).abs() < 1e-6));

    for &i in &drug {
        assert!((system.state().q_val()[i] - 250.0).abs() < 1e-3);
    }
}

// =================================================================================================
// State
// =================================================================================================

#[test]
fn test_set_q_concentration_round_trip() {
    let ctx = UnitContext::default();
    let mut cell = Compartment::new(&ctx, "cell", 1.0 * units::FEMTOLITER).unwrap();
    cell.add_reaction(binding(1.0, 1.0));
    let model = Model::new([], [cell]).unwrap();
    let mut system = OdeSystem::from_model(&model, ctx).unwrap();

    system
        .set_q(&[0], StateAmount::Concentration(1.0 * units::MICROMOLAR))
        .unwrap();
    system
        .set_q(&[1], StateAmount::MolarAmount(1e-21 * units::MOLE))
        .unwrap();

    // 1 µM · 1 fL · N_A
    let expected = 1e-6 * 1e-15 * units::AVOGADRO;
    let q = system.state().q_val();
    assert!(relative_error(q[0], expected) < 1e-12);
    assert!(relative_error(q[1], expected) < 1e-12);
}

#[test]
fn test_set_q_rejects_out_of_range_without_changes() {
    let mut system = OdeSystem::from_model(&two_box_model(1.0, 0.5), UnitContext::default()).unwrap();
    let before = system.state().q_val().clone();

    let err = system.set_q(&[0, 7], StateAmount::Count(5.0)).unwrap_err();
    assert!(matches!(err, Error::StateIndexOutOfRange { index: 7, size: 2 }));
    assert_eq!(system.state().q_val(), &before);
}

#[test]
fn test_failed_propagation_keeps_state() {
    let mut system = OdeSystem::from_model(&two_box_model(1.0, 0.5), UnitContext::default()).unwrap();
    system.set_q(&[0], StateAmount::Count(10.0)).unwrap();
    let before = system.state().q_val().clone();

    // fixed-step configuration handed to an adaptive method
    let err = system
        .propagate((0.0, 1.0), &RK45Solver::new(), &SolverConfiguration::fixed_step(10))
        .unwrap_err();
    assert!(matches!(err, Error::Solver(_)));
    assert_eq!(system.state().q_val(), &before);

    let tight = SolverConfiguration::new(SolverType::Adaptive {
        rtol: 1e-10,
        atol: 1e-10,
        initial_step: Some(1e-3),
        min_step: 0.0,
        max_step: 1e-3,
        max_steps: 5,
    });
    assert!(system.propagate((0.0, 1.0), &RK45Solver::new(), &tight).is_err());
    assert_eq!(system.state().q_val(), &before);
}

#[test]
fn test_solvers_agree_on_the_same_system() {
    let model = single_reaction_model("cell", 1.0, binding(0.02, 0.1));
    let mut reference = OdeSystem::from_model(&model, UnitContext::default()).unwrap();
    reference.set_q(&[0, 1], StateAmount::Count(50.0)).unwrap();
    let mut other = reference.clone();

    let adaptive = SolverConfiguration::adaptive(1e-10, 1e-10);
    let a = reference.propagate((0.0, 5.0), &RK45Solver::new(), &adaptive).unwrap();
    let b = other
        .propagate((0.0, 5.0), &RK4Solver::new(), &SolverConfiguration::fixed_step(2000))
        .unwrap();

    for i in 0..3 {
        assert!((a.final_state[i] - b.final_state[i]).abs() < 1e-6);
    }

    let mut coarse = OdeSystem::from_model(&model, UnitContext::default()).unwrap();
    coarse.set_q(&[0, 1], StateAmount::Count(50.0)).unwrap();
    let c = coarse
        .propagate((0.0, 5.0), &EulerSolver::new(), &SolverConfiguration::fixed_step(20_000))
        .unwrap();
    assert!((a.final_state[2] - c.final_state[2]).abs() < 1e-2);
    assert_eq!(EulerSolver::new().name(), "Forward Euler");
}

// =================================================================================================
// Export
// =================================================================================================

#[test]
fn test_species_sums_export_to_csv() {
    let mut system = OdeSystem::from_model(&two_box_model(1.0, 0.5), UnitContext::default()).unwrap();
    system.set_q(&[0], StateAmount::Count(1000.0)).unwrap();
    let result = system
        .propagate((0.0, 2.0), &RK4Solver::new(), &SolverConfiguration::fixed_step(100))
        .unwrap();

    let state = system.state();
    let columns = [
        ("A total", state.select_species("A")),
        ("A left", state.select_compartment("left")),
    ];

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("species.csv");
    CsvExporter::new(CsvConfig::default().precision(3))
        .export_sums(&result, &columns, Some(11), &path)
        .unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "Time (s),A total,A left");
    assert_eq!(lines.len(), 12);
    assert_eq!(lines[1], "0.000,1000.000,1000.000");
    assert!(lines[11].starts_with("2.000,1000.000,"));
}
