//! rxn-rs: Compartmental Reaction-Diffusion Networks
//!
//! Spatially-resolved chemical kinetics as a graph of well-mixed
//! compartments connected by transport pathways, compiled into a flat
//! system of ordinary differential equations.
//!
//! # Architecture
//!
//! rxn-rs is built on two core principles:
//!
//! 1. **Separation of Network and Numerics**
//!    - The network describes compartments, reactions and connections (what to solve)
//!    - Numerical solvers provide methods (how to solve)
//!
//! 2. **Explicit units**
//!    - Every physical input is a dimensioned [`Quantity`](units::Quantity)
//!    - Conversion into internal units goes through a [`UnitContext`](units::UnitContext)
//!
//! # Pipeline
//!
//! ```text
//! Model ──flatten()──▶ FlatModel ──▶ OdeSystem (State + DerivFuncBuilders) ──propagate()──▶ SimulationResult
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use rxn_rs::prelude::*;
//! use rxn_rs::units;
//!
//! # fn main() -> rxn_rs::Result<()> {
//! let ctx = UnitContext::default();
//!
//! // A + B ⇌ C in a single 1 fL compartment
//! let binding = Reaction::new(
//!     "binding",
//!     &[Species::new("A"), Species::new("B")],
//!     &[Species::new("C")],
//!     &[1, 1],
//!     &[1],
//!     Some(1e6 * (units::LITER / (units::MOLE * units::SECOND))),
//!     Some(1e-2 * (units::DIMENSIONLESS / units::SECOND)),
//!     &ctx,
//! )?;
//!
//! let mut cell = Compartment::new(&ctx, "cell", 1.0 * units::FEMTOLITER)?;
//! cell.add_reaction(binding);
//!
//! let model = Model::new([], [cell])?;
//! let mut system = OdeSystem::from_model(&model, ctx)?;
//!
//! let a_and_b = [0, 1];
//! system.set_q(&a_and_b, StateAmount::Concentration(1.0 * units::MICROMOLAR))?;
//!
//! let config = SolverConfiguration::adaptive(1e-8, 1e-6);
//! let result = system.propagate((0.0, 10.0), &RK45Solver::new(), &config)?;
//!
//! // A + C is conserved
//! let total = result.sum_over(&[0, 2])?;
//! assert!((total[0] - total[total.len() - 1]).abs() < 1e-3);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`units`]: dimensioned quantities and the internal unit system
//! - [`network`]: species, reactions, connections, compartments, arrays, models
//! - [`system`]: state vector, derivative builders, ODE system
//! - [`solver`]: numerical integrators
//! - [`output`]: CSV export of trajectories
//! - [`error`]: crate error type

pub mod error;
pub mod network;
pub mod output;
pub mod solver;
pub mod system;
pub mod units;

pub use error::{Error, Result};

pub mod prelude {
    //! Convenient imports for common usage
    //!
    //! ```rust
    //! use rxn_rs::prelude::*;
    //! ```
    pub use crate::error::{Error, Result};
    pub use crate::network::{
        AnisotropicConnection, BoundingBox, Compartment, CompartmentArray3D, CompartmentSelection, Connection,
        FicksConnection, FlatModel, IsotropicConnection, JoinSide, Model, Reaction, Species,
    };
    pub use crate::solver::{
        EulerSolver, OdeModel, RK4Solver, RK45Solver, Scenario, SimulationResult, Solver, SolverConfiguration,
        SolverType,
    };
    pub use crate::system::{OdeSystem, State, StateAmount};
    pub use crate::units::{Quantity, UnitContext};
}
