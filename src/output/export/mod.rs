//! Export module for simulation results.
//!
//! # Architecture
//!
//! The [`Exporter`] trait abstracts the export format. Each format is an
//! independent implementation in its own sub-module.
//!
//! | Format  | Module    |
//! |---------|-----------|
//! | CSV     | [`csv`]   |
//!
//! # Usage example
//!
//! ```rust,ignore
//! use rxn_rs::output::export::{CsvExporter, Exporter};
//!
//! let exporter = CsvExporter::default();
//!
//! // One column per species, summed over every compartment
//! let columns = [("A", state.select_species("A")), ("B", state.select_species("B"))];
//! exporter.export_sums(&result, &columns, None, "species.csv".as_ref())?;
//!
//! // Downsampled to 500 points
//! exporter.export_sums(&result, &columns, Some(500), "species_light.csv".as_ref())?;
//! ```

pub mod csv;

pub use csv::{export_series_csv, CsvConfig, CsvError, CsvExporter, CsvMetadata};

use std::path::Path;

use crate::solver::SimulationResult;

/// Abstraction trait for all export formats.
///
/// Each format manages its own errors via the associated type.
pub trait Exporter {
    /// Error type specific to this export format.
    type Error: std::error::Error;

    /// Export a time column and labelled value columns.
    fn export_series(
        &self,
        time: &[f64],
        columns: &[Vec<f64>],
        labels: &[&str],
        path: &Path,
    ) -> Result<(), Self::Error>;

    /// Export labelled sums over state indices of a trajectory.
    ///
    /// A column with a single index is a plain selection. With
    /// `n_points = Some(n)` the trajectory is uniformly downsampled to about
    /// `n` points, always keeping the first and the last.
    fn export_sums(
        &self,
        result: &SimulationResult,
        columns: &[(&str, Vec<usize>)],
        n_points: Option<usize>,
        path: &Path,
    ) -> Result<(), Self::Error>;
}

/// Row indices kept when downsampling `len` rows to `n_points`
pub(crate) fn downsample_indices(len: usize, n_points: Option<usize>) -> Vec<usize> {
    match n_points {
        Some(n) if n < len && len > 1 => {
            let n = n.max(2);
            let mut keep: Vec<usize> = (0..n)
                .map(|k| ((k * (len - 1)) as f64 / (n - 1) as f64).round() as usize)
                .collect();
            keep.dedup();
            keep
        }
        _ => (0..len).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downsample_keeps_all_without_limit() {
        assert_eq!(downsample_indices(4, None), vec![0, 1, 2, 3]);
        assert_eq!(downsample_indices(4, Some(10)), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_downsample_keeps_first_and_last() {
        assert_eq!(downsample_indices(5, Some(3)), vec![0, 2, 4]);
        assert_eq!(downsample_indices(100, Some(1)), vec![0, 99]);

        let keep = downsample_indices(1001, Some(7));
        assert_eq!(keep.len(), 7);
        assert_eq!(keep.first(), Some(&0));
        assert_eq!(keep.last(), Some(&1000));
    }
}
