//! Common utilities for integration tests

#![allow(dead_code)]

use rxn_rs::network::{
    CompartmentArray3D, Compartment, Connection, FicksConnection, IsotropicConnection, Model, Reaction, Species,
};
use rxn_rs::units::{self, UnitContext};

/// Compute relative error: |actual - expected| / |expected|
pub fn relative_error(actual: f64, expected: f64) -> f64 {
    if expected.abs() < 1e-10 {
        (actual - expected).abs()
    } else {
        (actual - expected).abs() / expected.abs()
    }
}

/// Two well-mixed boxes of `volume` L joined by an isotropic connection
/// carrying species "A" at `k` L/s
pub fn two_box_model(volume: f64, k: f64) -> Model {
    let left = Compartment::from_internal("left", volume).unwrap();
    let right = Compartment::from_internal("right", volume).unwrap();
    let mut model = Model::new([], [left, right]).unwrap();

    let conn = IsotropicConnection::from_internal([("A", k)]).unwrap();
    model.connect("left", "right", conn.into()).unwrap();
    model
}

/// A single compartment of `volume` L holding one reaction
pub fn single_reaction_model(id: &str, volume: f64, reaction: Reaction) -> Model {
    let mut compartment = Compartment::from_internal(id, volume).unwrap();
    compartment.add_reaction(reaction);
    Model::new([], [compartment]).unwrap()
}

/// A + B ⇌ C with constants already in internal units
pub fn binding(kf: f64, kr: f64) -> Reaction {
    Reaction::from_internal(
        "binding",
        &[Species::new("A"), Species::new("B")],
        &[Species::new("C")],
        &[1, 1],
        &[1],
        kf,
        kr,
    )
    .unwrap()
}

/// A column of `n_z` cubic cells of side `side_nm` stacked along z, with
/// Fickian diffusion of "drug" at `d_cm2_s` cm²/s between neighbors
pub fn slab(ctx: &UnitContext, id: &str, n_z: usize, side_nm: f64, d_cm2_s: f64) -> CompartmentArray3D {
    let nm = units::NANOMETER;
    let single = [0.0 * nm, side_nm * nm];
    let z: Vec<_> = (0..=n_z).map(|k| (k as f64 * side_nm) * nm).collect();

    let d = d_cm2_s * (units::CENTIMETER.powi(2) / units::SECOND);
    let ficks = FicksConnection::new(ctx, [("drug", d)]).unwrap();

    CompartmentArray3D::new(ctx, id, &single, &single, &z, Connection::Ficks(ficks), [false, false, false]).unwrap()
}
