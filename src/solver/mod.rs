//! Numerical solvers
//!
//! This module provides the time integrators used to advance a reaction
//! network. A solver applies a numerical method to the right-hand side
//! provided by an [`OdeModel`] within a specific [`Scenario`].
//!
//! # Core Concepts
//!
//! The solver architecture separates concerns into three layers:
//!
//! 1. **Scenario** (`Scenario`) - WHAT to solve
//!    - ODE model (right-hand side)
//!    - Initial state and time span
//!
//! 2. **Configuration** (`SolverConfiguration`) - HOW to solve
//!    - Solver type (fixed step or adaptive)
//!    - Numerical parameters (steps, tolerances, step bounds)
//!    - Trajectory thinning
//!
//! 3. **Solver** (`Solver` trait) - The numerical method
//!    - Applies the numerical scheme
//!    - Returns the trajectory
//!    - Independent of chemistry
//!
//! # Module Organization
//!
//! - **`traits`**: `OdeModel`, `Solver`, `SolverType`, `SolverConfiguration`,
//!   `SimulationResult`, `SolverError`
//! - **`scenario`**: problem definition
//! - **`methods`**: `EulerSolver`, `RK4Solver`, `RK45Solver`
//!
//! # Quick Start Example
//!
//! ```rust
//! use nalgebra::DVector;
//! use rxn_rs::solver::{OdeModel, RK4Solver, Scenario, Solver, SolverConfiguration};
//!
//! /// dq/dt = -q
//! struct Decay;
//!
//! impl OdeModel for Decay {
//!     fn dimension(&self) -> usize { 1 }
//!     fn rhs(&self, _t: f64, q: &[f64], dq: &mut [f64]) { dq[0] = -q[0]; }
//! }
//!
//! let scenario = Scenario::new(&Decay, DVector::from_vec(vec![1.0]), (0.0, 1.0));
//! let config = SolverConfiguration::fixed_step(100);
//! let result = RK4Solver::new().solve(&scenario, &config).unwrap();
//!
//! assert!((result.final_state[0] - (-1.0f64).exp()).abs() < 1e-8);
//! ```
//!
//! # Choosing a Solver
//!
//! | Method | Order | Evals/Step | Step |
//! |--------|-------|------------|------|
//! | Euler  | 1     | 1          | fixed |
//! | RK4    | 4     | 4          | fixed |
//! | RK45   | 5(4)  | 6 (FSAL)   | adaptive |
//!
//! Reaction-diffusion networks often mix fast binding with slow diffusion;
//! the adaptive RK45 solver is the default choice for them.
//!
//! # Error Handling
//!
//! All solvers return `Result<SimulationResult, SolverError>`. Common errors:
//! - Invalid configuration (zero steps, non-positive tolerances)
//! - Invalid scenario (dimension mismatch, reversed time span)
//! - Numerical instability (NaN or Inf in the state)
//! - Step limits (`max_steps` exceeded, step size underflow)

// =================================================================================================
// Module Declarations
// =================================================================================================
mod methods;
mod scenario;
mod traits;

// =================================================================================================
// Parallel Execution Threshold
// =================================================================================================
//
// Size of the state vector above which one derivative evaluation is split
// across Rayon workers. Changeable at runtime; Relaxed ordering, the value
// only selects a code path.
// =================================================================================================

use std::sync::atomic::{AtomicUsize, Ordering};

/// Default number of state variables above which a right-hand side
/// evaluation is split across Rayon workers.
const DEFAULT_PARALLEL_THRESHOLD: usize = 4096;

/// Runtime-configurable parallel-execution threshold.
///
/// Read via [`parallel_threshold()`], written via [`set_parallel_threshold()`].
static PARALLEL_THRESHOLD: AtomicUsize = AtomicUsize::new(DEFAULT_PARALLEL_THRESHOLD);

/// Return the current parallel-execution threshold.
///
/// [`OdeSystem`](crate::system::OdeSystem) evaluates its derivative
/// sequentially when the state has fewer entries than this value, and
/// switches to Rayon when it has more, but only when the crate is compiled
/// with the `parallel` feature.
///
/// # Example
///
/// ```rust
/// use rxn_rs::solver::parallel_threshold;
///
/// assert!(parallel_threshold() > 0);
/// ```
pub fn parallel_threshold() -> usize {
    PARALLEL_THRESHOLD.load(Ordering::Relaxed)
}

/// Set the parallel-execution threshold to a new value.
///
/// # Panics
///
/// Panics when `threshold == 0`.
///
/// # Example
///
/// ```rust
/// use rxn_rs::solver::{parallel_threshold, set_parallel_threshold};
///
/// let previous = parallel_threshold();
/// set_parallel_threshold(2048);
/// assert_eq!(parallel_threshold(), 2048);
///
/// // Restore so other tests are not affected.
/// set_parallel_threshold(previous);
/// ```
pub fn set_parallel_threshold(threshold: usize) {
    assert!(threshold > 0, "parallel threshold must be at least 1");
    PARALLEL_THRESHOLD.store(threshold, Ordering::Relaxed);
}

#[cfg(test)]
static THRESHOLD_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// RAII guard that saves the current threshold on construction and restores
/// it on drop.
///
/// Only compiled in test builds. Guards are serialised through a mutex so
/// that tests running in parallel never observe each other's threshold.
///
/// ```rust,ignore
/// let _guard = crate::solver::ThresholdGuard::save(50);
/// // threshold is now 50 …
/// // … and is automatically restored when _guard is dropped.
/// ```
#[cfg(test)]
pub(crate) struct ThresholdGuard {
    previous: usize,
    _lock: std::sync::MutexGuard<'static, ()>,
}

#[cfg(test)]
impl ThresholdGuard {
    /// Set the threshold to `new_value` and return a guard that will
    /// restore the previous value on drop.
    pub(crate) fn save(new_value: usize) -> Self {
        let lock = THRESHOLD_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = parallel_threshold();
        set_parallel_threshold(new_value);
        Self { previous, _lock: lock }
    }
}

#[cfg(test)]
impl Drop for ThresholdGuard {
    fn drop(&mut self) {
        PARALLEL_THRESHOLD.store(self.previous, Ordering::Relaxed);
    }
}

// =================================================================================================
// Public Re-exports
// =================================================================================================

pub use methods::{EulerSolver, RK4Solver, RK45Solver};
pub use scenario::Scenario;
pub use traits::{OdeModel, SimulationResult, Solver, SolverConfiguration, SolverError, SolverType};

// =================================================================================================
// Helper Functions
// =================================================================================================

/// Check a state for NaN or Inf values
///
/// Non-finite values indicate numerical instability (step too large) or a
/// broken right-hand side.
///
/// ```rust,ignore
/// validate_state(&state, 42, t)?;  // Validates state at step 42
/// ```
pub(crate) fn validate_state(state: &[f64], step: usize, time: f64) -> Result<(), SolverError> {
    match state.iter().position(|x| !x.is_finite()) {
        Some(index) => Err(SolverError::NonFinite { index, step, time }),
        None => Ok(()),
    }
}

// =================================================================================================
// Tests
// =================================================================================================
