//! Error types for model construction, flattening and simulation.
//!
//! Errors are grouped by source: structural problems in the compartment
//! graph, geometric problems while deriving diffusion rates, unit/dimension
//! mismatches, malformed input data, and integration failures reported by a
//! [`Solver`](crate::solver::Solver).

use thiserror::Error;

use crate::solver::SolverError;
use crate::units::Dimension;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while building or simulating a reaction-diffusion network.
#[derive(Debug, Error)]
pub enum Error {
    /// Two compartments resolve to the same fully-qualified ID.
    #[error("duplicate compartment ID in model ({0})")]
    DuplicateCompartment(String),

    /// Two arrays share the same array ID.
    #[error("duplicate array ID in model ({0})")]
    DuplicateArray(String),

    /// Connections refer to compartments that are not part of the model.
    #[error("the following compartments are referred to in connections, but missing from the model: {}", .0.join(", "))]
    MissingCompartments(Vec<String>),

    /// A compartment ID was named explicitly but does not exist.
    #[error("compartment '{0}' is not in the model")]
    UnknownCompartment(String),

    /// An array was added with a periodicity different from the model's.
    #[error("adding array with incompatible periodicity to model ({existing:?}) ({found:?})")]
    IncompatiblePeriodicity {
        existing: [bool; 3],
        found: [bool; 3],
    },

    /// An array was added with a different box length along a periodic axis.
    #[error("adding array with different size along periodic axis {axis} ({existing} dm) ({found} dm)")]
    PeriodicBoxMismatch {
        axis: usize,
        existing: f64,
        found: f64,
    },

    /// Two arrays cannot be joined face to face.
    #[error("cannot join array '{first}' with array '{second}': {detail}")]
    IncompatibleArrays {
        first: String,
        second: String,
        detail: String,
    },

    /// The two directions of a connection disagree.
    #[error("asymmetric connection between '{from}' and '{to}' for species '{species}': {detail}")]
    AsymmetricConnection {
        from: String,
        to: String,
        species: String,
        detail: String,
    },

    /// No single adjoining face could be found between two compartments.
    #[error("unable to determine adjoining face for compartments '{first}' and '{second}': {detail}")]
    NoAdjoiningFace {
        first: String,
        second: String,
        detail: String,
    },

    /// A Ficks connection was resolved without area or distance.
    #[error("Ficks connection is not ready to be resolved (surface area: {surface_area:?}, distance: {distance:?})")]
    UnresolvedGeometry {
        surface_area: Option<f64>,
        distance: Option<f64>,
    },

    /// Geometry is needed but the compartment has no bounding box.
    #[error("compartment '{0}' has no bounding box; surface area and distance cannot be derived")]
    MissingGeometry(String),

    /// A physical quantity has an unexpected dimension.
    #[error("{quantity} should have dimension {expected}, got {found}")]
    Dimension {
        quantity: String,
        expected: Dimension,
        found: Dimension,
    },

    /// Invalid connection data.
    #[error("malformed connection data for species '{species}': {detail}")]
    MalformedConnection { species: String, detail: String },

    /// Invalid reaction definition.
    #[error("invalid reaction '{reaction}': {detail}")]
    InvalidReaction { reaction: String, detail: String },

    /// Invalid compartment or array geometry.
    #[error("invalid geometry for '{id}': {detail}")]
    InvalidGeometry { id: String, detail: String },

    /// A state index outside of the state vector.
    #[error("state index {index} out of range for state of size {size}")]
    StateIndexOutOfRange { index: usize, size: usize },

    /// The integrator failed.
    #[error(transparent)]
    Solver(#[from] SolverError),
}
