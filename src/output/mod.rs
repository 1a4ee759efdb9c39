//! Output module for simulation results
//!
//! ```text
//! output/
//! ├── mod.rs
//! └── export/             ← Data export
//!     ├── mod.rs          ← Exporter trait
//!     └── csv.rs
//! ```
//!
//! Export functions accept plain `&[f64]` slices or a
//! [`SimulationResult`](crate::solver::SimulationResult) plus state indices
//! taken from [`State`](crate::system::State) selections.

pub mod export;

pub use export::{export_series_csv, CsvConfig, CsvError, CsvExporter, CsvMetadata, Exporter};
