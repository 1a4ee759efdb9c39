//! CSV export of simulation time series
//!
//! Writes a time column followed by one column per series. Columns usually
//! come from a trajectory: a single state variable (selection) or the sum
//! over several state variables (e.g. every compartment holding a species).
//!
//! # Quick Examples
//!
//! ## Minimal Export
//!
//! ```rust,ignore
//! use rxn_rs::output::export::export_series_csv;
//!
//! let time = vec![0.0, 1.0, 2.0];
//! let a = vec![100.0, 60.0, 36.0];
//!
//! export_series_csv(&time, &[a], &["A"], "decay.csv", None)?;
//! ```
//!
//! **Output** (`decay.csv`):
//! ```csv
//! Time (s),A
//! 0.000000,100.000000
//! 1.000000,60.000000
//! 2.000000,36.000000
//! ```
//!
//! ## From a trajectory, with metadata
//!
//! ```rust,ignore
//! use rxn_rs::output::export::{CsvConfig, CsvExporter, CsvMetadata, Exporter};
//!
//! let config = CsvConfig::default().with_metadata(CsvMetadata::from_result("membrane slab", &result));
//! let columns = [("A bulk", state.select_compartment("bulk")), ("A total", state.select_species("A"))];
//!
//! CsvExporter::new(config).export_sums(&result, &columns, Some(500), "slab.csv")?;
//! ```
//!
//! **Output** (`slab.csv`):
//! ```csv
//! # Reaction-Diffusion Simulation Data
//! # Generated: 2026-02-11T15:30:00+00:00
//! # Model: membrane slab
//! # Solver: Dormand-Prince (RK45)
//! # Total Time: 10 s
//! #
//! Time (s),A bulk,A total
//! ...
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use crate::output::export::{downsample_indices, Exporter};
use crate::solver::SimulationResult;

// =============================================================================
// Errors
// =============================================================================

/// Errors raised while exporting CSV files
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("empty data: time and value series must not be empty")]
    EmptyData,

    #[error("{columns} value columns but {labels} labels")]
    LabelCountMismatch { columns: usize, labels: usize },

    #[error("column '{label}' has {found} values but there are {expected} time points")]
    LengthMismatch {
        label: String,
        found: usize,
        expected: usize,
    },

    #[error("NaN or Inf detected in column '{0}'")]
    NonFinite(String),

    #[error(transparent)]
    Selection(#[from] crate::error::Error),

    #[error("failed to write CSV file: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Configuration Structures
// =============================================================================

/// Configuration for CSV export
///
/// # Example
///
/// ```rust
/// use rxn_rs::output::export::CsvConfig;
///
/// let config = CsvConfig::european().precision(10);
/// assert_eq!(config.delimiter, ';');
/// assert_eq!(config.precision, 10);
/// ```
#[derive(Debug, Clone)]
pub struct CsvConfig {
    /// Column delimiter (default: ',')
    pub delimiter: char,

    /// Decimal separator (default: '.')
    pub decimal_separator: char,

    /// Number of decimal places for floating-point values (default: 6)
    pub precision: usize,

    /// Include metadata header comments (default: false)
    pub include_metadata: bool,

    /// Metadata to include in header
    pub metadata: Option<CsvMetadata>,

    /// Header of the time column (default: "Time (s)")
    pub time_header: String,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            decimal_separator: '.',
            precision: 6,
            include_metadata: false,
            metadata: None,
            time_header: "Time (s)".to_string(),
        }
    }
}

impl CsvConfig {
    /// European CSV format (semicolon delimiter, comma decimal separator)
    pub fn european() -> Self {
        Self {
            delimiter: ';',
            decimal_separator: ',',
            ..Default::default()
        }
    }

    /// 12 decimal places
    pub fn high_precision() -> Self {
        Self {
            precision: 12,
            ..Default::default()
        }
    }

    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    pub fn time_header(mut self, header: impl Into<String>) -> Self {
        self.time_header = header.into();
        self
    }

    /// Enable the metadata header
    pub fn with_metadata(mut self, metadata: CsvMetadata) -> Self {
        self.include_metadata = true;
        self.metadata = Some(metadata);
        self
    }
}

/// Metadata for CSV header comments
///
/// Only fields that are set appear in the header.
#[derive(Debug, Clone, Default)]
pub struct CsvMetadata {
    pub model_name: Option<String>,
    pub solver_name: Option<String>,

    /// Integrated time span (seconds)
    pub total_time: Option<f64>,

    /// Number of stored time points
    pub time_points: Option<usize>,

    /// Additional `key: value` lines
    pub custom: Vec<(String, String)>,
}

impl CsvMetadata {
    /// Fill solver name, span and point count from a simulation result
    pub fn from_result(model: &str, result: &SimulationResult) -> Self {
        let total_time = match (result.time_points.first(), result.time_points.last()) {
            (Some(t0), Some(t1)) => Some(t1 - t0),
            _ => None,
        };
        Self {
            model_name: Some(model.to_string()),
            solver_name: result.metadata.get("solver").cloned(),
            total_time,
            time_points: Some(result.len()),
            custom: Vec::new(),
        }
    }

    pub fn add_custom(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.custom.push((key.into(), value.into()));
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn write_metadata_header(out: &mut impl Write, metadata: &CsvMetadata) -> std::io::Result<()> {
    writeln!(out, "# Reaction-Diffusion Simulation Data")?;
    writeln!(out, "# Generated: {}", chrono::Utc::now().to_rfc3339())?;

    if let Some(model) = &metadata.model_name {
        writeln!(out, "# Model: {}", model)?;
    }
    if let Some(solver) = &metadata.solver_name {
        writeln!(out, "# Solver: {}", solver)?;
    }
    if let Some(total_time) = metadata.total_time {
        writeln!(out, "# Total Time: {} s", total_time)?;
    }
    if let Some(n) = metadata.time_points {
        writeln!(out, "# Time Points: {}", n)?;
    }
    for (key, value) in &metadata.custom {
        writeln!(out, "# {}: {}", key, value)?;
    }

    writeln!(out, "#")
}

/// Format number with configured precision and decimal separator
fn format_number(value: f64, config: &CsvConfig) -> String {
    let formatted = format!("{:.prec$}", value, prec = config.precision);
    if config.decimal_separator != '.' {
        formatted.replace('.', &config.decimal_separator.to_string())
    } else {
        formatted
    }
}

fn validate(time: &[f64], columns: &[Vec<f64>], labels: &[&str]) -> Result<(), CsvError> {
    if time.is_empty() || columns.is_empty() {
        return Err(CsvError::EmptyData);
    }
    if columns.len() != labels.len() {
        return Err(CsvError::LabelCountMismatch {
            columns: columns.len(),
            labels: labels.len(),
        });
    }
    if time.iter().any(|t| !t.is_finite()) {
        return Err(CsvError::NonFinite("time".to_string()));
    }
    for (column, label) in columns.iter().zip(labels) {
        if column.len() != time.len() {
            return Err(CsvError::LengthMismatch {
                label: label.to_string(),
                found: column.len(),
                expected: time.len(),
            });
        }
        if column.iter().any(|v| !v.is_finite()) {
            return Err(CsvError::NonFinite(label.to_string()));
        }
    }
    Ok(())
}

// =============================================================================
// Export Functions
// =============================================================================

/// Export a time series table to CSV
///
/// # Errors
///
/// - [`CsvError::EmptyData`], [`CsvError::LabelCountMismatch`],
///   [`CsvError::LengthMismatch`], [`CsvError::NonFinite`] on invalid data
///   (no file is created)
/// - [`CsvError::Io`] on file errors
pub fn export_series_csv(
    time: &[f64],
    columns: &[Vec<f64>],
    labels: &[&str],
    output_path: impl AsRef<Path>,
    configuration: Option<&CsvConfig>,
) -> Result<(), CsvError> {
    // ============================= Validation =============================

    validate(time, columns, labels)?;

    let binding = CsvConfig::default();
    let configuration = configuration.unwrap_or(&binding);

    // ============================= Open File ==============================

    let mut out = BufWriter::new(File::create(output_path)?);

    // ============================= Write Metadata =========================

    if configuration.include_metadata
        && let Some(metadata) = &configuration.metadata
    {
        write_metadata_header(&mut out, metadata)?;
    }

    // ============================= Write Header ===========================

    write!(out, "{}", configuration.time_header)?;
    for label in labels {
        write!(out, "{}{}", configuration.delimiter, label)?;
    }
    writeln!(out)?;

    // ============================= Write Data =============================

    for (i, t) in time.iter().enumerate() {
        write!(out, "{}", format_number(*t, configuration))?;
        for column in columns {
            write!(out, "{}{}", configuration.delimiter, format_number(column[i], configuration))?;
        }
        writeln!(out)?;
    }

    out.flush()?;
    Ok(())
}

// =============================================================================
// Exporter
// =============================================================================

/// CSV implementation of [`Exporter`]
#[derive(Debug, Clone, Default)]
pub struct CsvExporter {
    config: CsvConfig,
}

impl CsvExporter {
    pub fn new(config: CsvConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CsvConfig {
        &self.config
    }
}

impl Exporter for CsvExporter {
    type Error = CsvError;

    fn export_series(
        &self,
        time: &[f64],
        columns: &[Vec<f64>],
        labels: &[&str],
        path: &Path,
    ) -> Result<(), Self::Error> {
        export_series_csv(time, columns, labels, path, Some(&self.config))
    }

    fn export_sums(
        &self,
        result: &SimulationResult,
        columns: &[(&str, Vec<usize>)],
        n_points: Option<usize>,
        path: &Path,
    ) -> Result<(), Self::Error> {
        if result.is_empty() {
            return Err(CsvError::EmptyData);
        }

        let keep = downsample_indices(result.len(), n_points);
        let time: Vec<f64> = keep.iter().map(|&i| result.time_points[i]).collect();

        let mut values = Vec::with_capacity(columns.len());
        for (_, indices) in columns {
            let sums = result.sum_over(indices)?;
            values.push(keep.iter().map(|&i| sums[i]).collect::<Vec<f64>>());
        }
        let labels: Vec<&str> = columns.iter().map(|(label, _)| *label).collect();

        self.export_series(&time, &values, &labels, path)
    }
}

// =================================================================================================
// Tests
// =================================================================================================
