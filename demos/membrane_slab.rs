//! Membrane slab with receptors under a layer of solvent
//!
//! Geometry, 100 nm × 100 nm periodic in x and y:
//!
//! ```text
//!   z = 25 nm  ┌──────────────────────┐
//!              │  bulk (6 layers)     │  drug starts in the top layer
//!   z =  1 nm  ├──────────────────────┤  anisotropic slab ↔ bulk exchange
//!              │  upper slab          │  drug + receptor ⇌ complex
//!   z =  0 nm  ├──────────────────────┤  isotropic membrane crossing
//!              │  lower slab          │
//!   z = -1 nm  └──────────────────────┘
//! ```
//!
//! Run with:
//!
//! ```bash
//! cargo run --release --example membrane_slab
//! ```
//!
//! Writes `membrane_output/membrane.dot` and `membrane_output/membrane.csv`.

use std::error::Error;
use std::fs;
use std::path::Path;
use std::time::Instant;

use rxn_rs::network::{
    AnisotropicConnection, CompartmentArray3D, Connection, FicksConnection, IsotropicConnection, JoinSide, Model,
    Reaction, Species,
};
use rxn_rs::output::{CsvConfig, CsvExporter, CsvMetadata, Exporter};
use rxn_rs::solver::{RK45Solver, Solver, SolverConfiguration};
use rxn_rs::system::{OdeSystem, StateAmount};
use rxn_rs::units::{self, Quantity, UnitContext};

fn nm_edges(values: impl IntoIterator<Item = f64>) -> Vec<Quantity> {
    values.into_iter().map(|v| v * units::NANOMETER).collect()
}

fn main() -> Result<(), Box<dyn Error>> {
    let ctx = UnitContext::default();
    let output_dir = Path::new("membrane_output");
    fs::create_dir_all(output_dir)?;

    // ====== Species and reactions ======

    let drug = Species::new("drug");
    let receptor = Species::new("receptor");
    let complex = Species::new("complex");

    let binding = Reaction::new(
        "binding",
        &[drug.clone(), receptor.clone()],
        &[complex.clone()],
        &[1, 1],
        &[1],
        Some(1e6 * (units::LITER / (units::MOLE * units::SECOND))),
        Some(0.1 * (units::DIMENSIONLESS / units::SECOND)),
        &ctx,
    )?;

    // ====== Slabs ======

    let xy = nm_edges((0..=10).map(|i| -50.0 + 10.0 * i as f64));
    let in_slab = FicksConnection::new(&ctx, [("drug", 1e-8 * (units::CENTIMETER.powi(2) / units::SECOND))])?;

    let mut lower_slab = CompartmentArray3D::new(
        &ctx,
        "lower_slab",
        &xy,
        &xy,
        &nm_edges([-1.0, 0.0]),
        Connection::Ficks(in_slab.clone()),
        [true, true, false],
    )?;
    let mut upper_slab = CompartmentArray3D::new(
        &ctx,
        "upper_slab",
        &xy,
        &xy,
        &nm_edges([0.0, 1.0]),
        Connection::Ficks(in_slab),
        [true, true, false],
    )?;
    upper_slab.add_rxn_to_array(&binding);

    let crossing = IsotropicConnection::new(&ctx, [("drug", 1e-18 * (units::LITER / units::SECOND))])?;
    lower_slab.join3d(&mut upper_slab, crossing.into(), JoinSide::ZPlus)?;

    // ====== Bulk ======

    let bulk_to_bulk = FicksConnection::new(&ctx, [("drug", 1e-5 * (units::CENTIMETER.powi(2) / units::SECOND))])?;
    let mut bulk = CompartmentArray3D::new(
        &ctx,
        "bulk",
        &xy,
        &xy,
        &nm_edges((0..=6).map(|k| 1.0 + 4.0 * k as f64)),
        Connection::Ficks(bulk_to_bulk),
        [true, true, false],
    )?;

    // seen from the bulk: slow entry into the slab, fast release
    let volumetric = units::LITER / units::SECOND;
    let slab_to_bulk = AnisotropicConnection::new(&ctx, [("drug", (1e-19 * volumetric, 1e-15 * volumetric))])?;
    bulk.join3d(&mut upper_slab, slab_to_bulk.into(), JoinSide::ZMinus)?;

    // ====== Model ======

    let model = Model::new([lower_slab, upper_slab, bulk], [])?;
    let flat = model.flatten()?;
    fs::write(output_dir.join("membrane.dot"), flat.to_dot())?;

    let mut system = OdeSystem::new(flat, ctx)?;
    println!(
        "Model: {} compartments, {} state variables",
        system.model().len(),
        system.state().size()
    );

    // ====== Initial conditions ======

    let top_layer = system.unit_context().length(&(22.0 * units::NANOMETER))?;
    let drug_on_top = system
        .state()
        .select_where(|e| e.species == drug.id() && e.position.is_some_and(|p| p[2] > top_layer));
    system.set_q(&drug_on_top, StateAmount::Concentration(1e-2 * units::MOLAR))?;

    let receptors = system.state().select_species(receptor.id());
    system.set_q(&receptors, StateAmount::Concentration(1e-2 * units::MOLAR))?;

    // ====== Integrate ======

    let solver = RK45Solver::new();
    let config = SolverConfiguration::adaptive(1e-6, 1e-9).with_save_every(50);

    println!("Integrating with {} ...", solver.name());
    let start = Instant::now();
    let result = system.propagate((0.0, 1e-4), &solver, &config)?;
    println!("Done in {:.2?}: {} stored points", start.elapsed(), result.len());

    for key in ["accepted steps", "rejected steps", "function evaluations"] {
        if let Some(value) = result.metadata.get(key) {
            println!("  {key}: {value}");
        }
    }

    // ====== Export ======

    let state = system.state();
    let drug_in = |prefix: &'static str| {
        state.select_where(move |e| e.species == "drug" && e.compartment.starts_with(prefix))
    };
    let columns = [
        ("drug (bulk)", drug_in("bulk-")),
        ("drug (upper slab)", drug_in("upper_slab-")),
        ("drug (lower slab)", drug_in("lower_slab-")),
        ("complex", state.select_species(complex.id())),
    ];

    let mut metadata = CsvMetadata::from_result("membrane slab", &result);
    metadata.add_custom("Compartments", system.model().len().to_string());
    let exporter = CsvExporter::new(CsvConfig::default().precision(4).with_metadata(metadata));

    let csv_path = output_dir.join("membrane.csv");
    exporter.export_sums(&result, &columns, Some(200), &csv_path)?;
    println!("Wrote {}", csv_path.display());

    Ok(())
}
