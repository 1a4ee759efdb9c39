//! From a flat model to an integrable ODE system
//!
//! - [`state`]: flat state vector with (compartment, species, position) metadata
//! - [`deriv`]: per-variable source/sink term lists
//! - [`ode`]: [`OdeSystem`], which owns the model, the state and the
//!   compiled right-hand side
//!
//! ```text
//! FlatModel ──▶ State (index assignment) ──▶ DerivFuncBuilder × N ──▶ rhs(t, q)
//! ```

pub mod deriv;
pub mod ode;
pub mod state;

pub use deriv::{DerivFuncBuilder, RateTerm};
pub use ode::{OdeSystem, StateAmount};
pub use state::{State, StateEntry};
