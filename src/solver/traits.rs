//! Numerical solver traits and types
//!
//! # Design
//!
//! - [`OdeModel`] is the right-hand side `dq/dt = f(t, q)`
//! - [`SolverType`] defines the kind of time stepping and carries its parameters
//! - [`SolverConfiguration`] wraps a `SolverType` with output options
//! - [`SimulationResult`] holds the trajectory plus metadata
//!
//! Solvers never mutate the model or the initial state.

use std::collections::HashMap;

use nalgebra::DVector;
use thiserror::Error;

use crate::error::Error;
use crate::solver::Scenario;

// =================================================================================================
// ODE model
// =================================================================================================

/// Right-hand side of an ODE system `dq/dt = f(t, q)`
///
/// Implementations must be pure: the same `(t, q)` always yields the same
/// derivative and no state is kept between calls.
pub trait OdeModel {
    /// Number of state variables
    fn dimension(&self) -> usize;

    /// Evaluate `f(t, q)` into `dq`
    ///
    /// `q` and `dq` both have length [`dimension`](Self::dimension).
    fn rhs(&self, t: f64, q: &[f64], dq: &mut [f64]);

    /// Model name, used in diagnostics
    fn name(&self) -> &str {
        "ODE model"
    }
}

// =================================================================================================
// Errors
// =================================================================================================

/// Errors raised by time integrators
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("invalid solver configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("{solver} does not support {solver_type} configurations")]
    Unsupported {
        solver: &'static str,
        solver_type: &'static str,
    },

    #[error(
        "non-finite value in state index {index} at step {step} (t = {time:e}); \
         this indicates numerical instability, try a smaller time step"
    )]
    NonFinite { index: usize, step: usize, time: f64 },

    #[error("exceeded {max_steps} steps at t = {time:e} before reaching t = {t_end:e}")]
    MaxStepsExceeded { max_steps: usize, time: f64, t_end: f64 },

    #[error("step size {step_size:e} fell below the minimum at t = {time:e}")]
    StepSizeUnderflow { step_size: f64, time: f64 },
}

// =================================================================================================
// Solver type
// =================================================================================================

/// Time-stepping strategy and its parameters
///
/// # Examples
///
/// ```rust
/// use rxn_rs::solver::SolverType;
///
/// let fixed = SolverType::FixedStep { time_steps: 1000 };
/// assert!(fixed.validate().is_ok());
///
/// let adaptive = SolverType::Adaptive {
///     rtol: 1e-6,
///     atol: 1e-3,
///     initial_step: None,
///     min_step: 1e-18,
///     max_step: f64::INFINITY,
///     max_steps: 100_000,
/// };
/// assert!(adaptive.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum SolverType {
    /// Fixed number of equal steps over the time span
    ///
    /// Used by: Euler, RK4
    FixedStep { time_steps: usize },

    /// Error-controlled steps
    ///
    /// Used by: RK45 (Dormand–Prince)
    ///
    /// # Parameters
    /// - `rtol`, `atol`: relative and absolute tolerances on each state variable
    /// - `initial_step`: first trial step (`None` picks 1e-3 of the span)
    /// - `min_step`, `max_step`: step-size bounds
    /// - `max_steps`: attempt limit, accepted and rejected steps included
    Adaptive {
        rtol: f64,
        atol: f64,
        initial_step: Option<f64>,
        min_step: f64,
        max_step: f64,
        max_steps: usize,
    },
}

impl SolverType {
    /// Get name identifier
    pub fn name(&self) -> &'static str {
        match self {
            SolverType::FixedStep { .. } => "FixedStep",
            SolverType::Adaptive { .. } => "Adaptive",
        }
    }

    /// Validate that parameters are meaningful
    pub fn validate(&self) -> Result<(), SolverError> {
        let invalid = |msg: &str| Err(SolverError::InvalidConfiguration(msg.to_string()));
        match self {
            SolverType::FixedStep { time_steps } => {
                if *time_steps == 0 {
                    return invalid("time_steps must be greater than 0");
                }
                Ok(())
            }
            SolverType::Adaptive {
                rtol,
                atol,
                initial_step,
                min_step,
                max_step,
                max_steps,
            } => {
                if !rtol.is_finite() || *rtol <= 0.0 {
                    return invalid("rtol must be finite and > 0");
                }
                if !atol.is_finite() || *atol <= 0.0 {
                    return invalid("atol must be finite and > 0");
                }
                if let Some(h0) = initial_step
                    && (!h0.is_finite() || *h0 <= 0.0)
                {
                    return invalid("initial_step must be finite and > 0");
                }
                if !min_step.is_finite() || *min_step < 0.0 {
                    return invalid("min_step must be finite and >= 0");
                }
                if max_step.is_nan() || *max_step <= *min_step {
                    return invalid("max_step must be greater than min_step");
                }
                if *max_steps == 0 {
                    return invalid("max_steps must be greater than 0");
                }
                Ok(())
            }
        }
    }
}

// =================================================================================================
// Solver configuration
// =================================================================================================

/// Configuration for a numerical solver
///
/// # Examples
///
/// ```rust
/// use rxn_rs::solver::SolverConfiguration;
///
/// let config = SolverConfiguration::fixed_step(10_000).with_save_every(100);
/// assert!(config.validate().is_ok());
///
/// let config = SolverConfiguration::adaptive(1e-6, 1e-3);
/// assert_eq!(config.solver_type.name(), "Adaptive");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SolverConfiguration {
    /// Type of solver and its parameters
    pub solver_type: SolverType,

    /// Store every n-th step in the trajectory (the final state is always stored)
    pub save_every: usize,
}

impl SolverConfiguration {
    /// Create a new configuration with a given solver type
    pub fn new(solver_type: SolverType) -> Self {
        Self {
            solver_type,
            save_every: 1,
        }
    }

    /// Create a fixed-step configuration
    pub fn fixed_step(time_steps: usize) -> Self {
        Self::new(SolverType::FixedStep { time_steps })
    }

    /// Create an adaptive configuration with default step bounds
    pub fn adaptive(rtol: f64, atol: f64) -> Self {
        Self::new(SolverType::Adaptive {
            rtol,
            atol,
            initial_step: None,
            min_step: 0.0,
            max_step: f64::INFINITY,
            max_steps: 100_000,
        })
    }

    /// Thin the stored trajectory
    pub fn with_save_every(mut self, save_every: usize) -> Self {
        self.save_every = save_every;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), SolverError> {
        if self.save_every == 0 {
            return Err(SolverError::InvalidConfiguration(
                "save_every must be greater than 0".to_string(),
            ));
        }
        self.solver_type.validate()
    }
}

// =================================================================================================
// Simulation result
// =================================================================================================

/// Trajectory produced by a solver
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationResult {
    /// Stored time points, starting with the initial time
    pub time_points: Vec<f64>,

    /// State at each stored time point
    pub trajectory: Vec<DVector<f64>>,

    /// State at the end of the time span
    pub final_state: DVector<f64>,

    /// Diagnostics (solver name, step counts, ...)
    pub metadata: HashMap<String, String>,
}

impl SimulationResult {
    pub fn new(time_points: Vec<f64>, trajectory: Vec<DVector<f64>>, final_state: DVector<f64>) -> Self {
        Self {
            time_points,
            trajectory,
            final_state,
            metadata: HashMap::new(),
        }
    }

    pub fn add_metadata(&mut self, key: &str, value: &str) {
        self.metadata.insert(key.to_string(), value.to_string());
    }

    /// Number of stored time points
    pub fn len(&self) -> usize {
        self.time_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_points.is_empty()
    }

    /// Values of the given state indices at every stored time point
    ///
    /// Row `n` holds the selected values at `time_points[n]`.
    pub fn selection(&self, indices: &[usize]) -> Result<Vec<Vec<f64>>, Error> {
        self.check_indices(indices)?;
        Ok(self
            .trajectory
            .iter()
            .map(|q| indices.iter().map(|&i| q[i]).collect())
            .collect())
    }

    /// Sum of the given state indices at every stored time point
    pub fn sum_over(&self, indices: &[usize]) -> Result<Vec<f64>, Error> {
        self.check_indices(indices)?;
        Ok(self
            .trajectory
            .iter()
            .map(|q| indices.iter().map(|&i| q[i]).sum())
            .collect())
    }

    fn check_indices(&self, indices: &[usize]) -> Result<(), Error> {
        let size = self.final_state.len();
        match indices.iter().find(|&&i| i >= size) {
            Some(&index) => Err(Error::StateIndexOutOfRange { index, size }),
            None => Ok(()),
        }
    }
}

// =================================================================================================
// Solver trait
// =================================================================================================

/// A numerical time integrator
///
/// Implementors read the model and initial state from the [`Scenario`] and
/// the stepping parameters from the [`SolverConfiguration`].
pub trait Solver {
    fn solve(&self, scenario: &Scenario, config: &SolverConfiguration) -> Result<SimulationResult, SolverError>;

    fn name(&self) -> &'static str;
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_step_validation() {
        assert!(SolverType::FixedStep { time_steps: 10 }.validate().is_ok());
        assert!(matches!(
            SolverType::FixedStep { time_steps: 0 }.validate(),
            Err(SolverError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_adaptive_validation() {
        let base = SolverConfiguration::adaptive(1e-6, 1e-9);
        assert!(base.validate().is_ok());

        assert!(SolverConfiguration::adaptive(0.0, 1e-9).validate().is_err());
        assert!(SolverConfiguration::adaptive(1e-6, f64::NAN).validate().is_err());

        let mut config = base.clone();
        config.solver_type = SolverType::Adaptive {
            rtol: 1e-6,
            atol: 1e-9,
            initial_step: Some(-1.0),
            min_step: 0.0,
            max_step: 1.0,
            max_steps: 10,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_every_zero_is_rejected() {
        let config = SolverConfiguration::fixed_step(10).with_save_every(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_result_selection_and_sum() {
        let trajectory = vec![DVector::from_vec(vec![1.0, 2.0, 3.0]), DVector::from_vec(vec![4.0, 5.0, 6.0])];
        let result = SimulationResult::new(vec![0.0, 1.0], trajectory.clone(), trajectory[1].clone());

        assert_eq!(result.selection(&[0, 2]).unwrap(), vec![vec![1.0, 3.0], vec![4.0, 6.0]]);
        assert_eq!(result.sum_over(&[1, 2]).unwrap(), vec![5.0, 11.0]);
        assert!(matches!(
            result.sum_over(&[3]),
            Err(Error::StateIndexOutOfRange { index: 3, size: 3 })
        ));
    }

    #[test]
    fn test_metadata() {
        let mut result = SimulationResult::new(vec![0.0], vec![DVector::zeros(1)], DVector::zeros(1));
        result.add_metadata("solver", "test");
        assert_eq!(result.metadata["solver"], "test");
        assert_eq!(result.len(), 1);
    }
}
