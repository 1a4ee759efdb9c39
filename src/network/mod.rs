//! Declarative reaction-diffusion networks
//!
//! # Structure
//!
//! - [`species`]: species and mass-action reactions
//! - [`connection`]: transport laws between compartments
//! - [`compartment`]: well-mixed volumes
//! - [`array`]: regular 3-D grids of compartments
//! - [`model`]: compartment graphs and flattening
//! - [`graph`]: petgraph projection of a flat model
//!
//! # Workflow
//!
//! ```text
//! Species, Reaction, Connection
//!        │
//!        ▼
//! Compartment / CompartmentArray3D ──▶ Model ──flatten()──▶ FlatModel
//! ```

pub mod array;
pub mod compartment;
pub mod connection;
pub mod graph;
pub mod model;
pub mod species;

pub use array::{CompartmentArray3D, JoinSide};
pub use compartment::{grid_id, qualified_id, BoundingBox, Compartment};
pub use connection::{
    AnisotropicConnection, Connection, FicksConnection, IsotropicConnection, ResolvedConnection, SpeciesRates,
};
pub use graph::{CompartmentNode, TransportEdge};
pub use model::{CompartmentSelection, FlatModel, Model, TransportTable};
pub use species::{Reaction, Species};
