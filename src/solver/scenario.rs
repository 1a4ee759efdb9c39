//! Simulation scenario definition
//!
//! A scenario combines an ODE model with its initial state and time span.

use nalgebra::DVector;

use crate::solver::{OdeModel, SolverError};

/// Simulation scenario
///
/// Defines a specific case to integrate:
/// - ODE model (right-hand side)
/// - Initial state
/// - Time span `(t_start, t_end)`
///
/// The same scenario can be solved with different numerical methods.
pub struct Scenario<'a> {
    /// Right-hand side
    pub model: &'a dyn OdeModel,

    /// State at `t_span.0`
    pub initial_state: DVector<f64>,

    /// Integration interval
    pub t_span: (f64, f64),
}

impl<'a> Scenario<'a> {
    /// Create a scenario
    pub fn new(model: &'a dyn OdeModel, initial_state: DVector<f64>, t_span: (f64, f64)) -> Self {
        Self {
            model,
            initial_state,
            t_span,
        }
    }

    /// Check dimensions, time span and initial values
    pub fn validate(&self) -> Result<(), SolverError> {
        let (t0, t1) = self.t_span;
        if !t0.is_finite() || !t1.is_finite() {
            return Err(SolverError::InvalidScenario("time span must be finite".to_string()));
        }
        if t1 < t0 {
            return Err(SolverError::InvalidScenario(format!(
                "time span must be increasing, got ({t0}, {t1})"
            )));
        }
        if self.initial_state.len() != self.model.dimension() {
            return Err(SolverError::InvalidScenario(format!(
                "initial state has {} entries but model '{}' has dimension {}",
                self.initial_state.len(),
                self.model.name(),
                self.model.dimension()
            )));
        }
        if let Some(index) = self.initial_state.iter().position(|q| !q.is_finite()) {
            return Err(SolverError::InvalidScenario(format!(
                "initial state is not finite at index {index}"
            )));
        }
        Ok(())
    }

    /// Length of the time span
    pub fn duration(&self) -> f64 {
        self.t_span.1 - self.t_span.0
    }

    /// Get model name
    pub fn get_model_name(&self) -> &str {
        self.model.name()
    }
}

impl std::fmt::Debug for Scenario<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.get_model_name())
            .field("dimension", &self.model.dimension())
            .field("t_span", &self.t_span)
            .finish()
    }
}

// ================================================================================================
// Tests
// ================================================================================================
