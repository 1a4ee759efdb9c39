//! Forward Euler numerical solver
//!
//! # Mathematical Background
//!
//! The Forward Euler method is the simplest explicit time-stepping scheme
//! for ordinary differential equations `dq/dt = f(t, q)`:
//!
//! ```text
//! q_{n+1} = q_n + dt * f(t_n, q_n)
//! ```
//!
//! # Characteristics
//!
//! - **Order**: First-order accurate (error ~ O(dt))
//! - **Stability**: Conditionally stable, `|1 + λ·dt| ≤ 1` for `dq/dt = λq`
//! - **Complexity**: 1 function evaluation per step
//!
//! For a diffusive connection between two compartments of volume `V` and
//! rate constant `k`, the fastest mode has `λ = -2k/V`, so `dt < V/k` is
//! required for stability.

use crate::solver::methods::TrajectoryRecorder;
use crate::solver::{Scenario, SimulationResult, Solver, SolverConfiguration, SolverError, SolverType, validate_state};

// =================================================================================================
// Forward Euler Solver
// =================================================================================================

/// Forward Euler time-stepping solver
///
/// # Algorithm
///
/// 1. Start with initial state q_0
/// 2. For each time step n = 0, 1, 2, ..., N-1:
///    - Evaluate the right-hand side: k = f(t_n, q_n)
///    - Update state: q_{n+1} = q_n + dt * k
///    - Store trajectory point (every `save_every` steps)
/// 3. Return trajectory
///
/// # Example
///
/// ```rust
/// use rxn_rs::solver::{EulerSolver, Solver};
///
/// let solver = EulerSolver::new();
/// assert_eq!(solver.name(), "Forward Euler");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct EulerSolver;

impl EulerSolver {
    /// Create a new Forward Euler solver
    pub fn new() -> Self {
        Self
    }
}

impl Solver for EulerSolver {
    fn solve(&self, scenario: &Scenario, config: &SolverConfiguration) -> Result<SimulationResult, SolverError> {
        // ====== Step 1: Validation ======

        config.validate()?;
        scenario.validate()?;

        let time_steps = match &config.solver_type {
            SolverType::FixedStep { time_steps } => *time_steps,
            other => {
                return Err(SolverError::Unsupported {
                    solver: self.name(),
                    solver_type: other.name(),
                });
            }
        };

        // ====== Step 2: Setup ======

        let (t0, t1) = scenario.t_span;
        let dt = (t1 - t0) / (time_steps as f64);

        let mut state: Vec<f64> = scenario.initial_state.iter().copied().collect();
        let mut derivative = vec![0.0; state.len()];
        let mut recorder = TrajectoryRecorder::new(config.save_every, time_steps / config.save_every, t0, &state);

        // ====== Step 3: Time Integration ======

        for step in 0..time_steps {
            let t = t0 + dt * step as f64;

            scenario.model.rhs(t, &state, &mut derivative);
            for (q, dq) in state.iter_mut().zip(&derivative) {
                *q += dt * dq;
            }

            // t_{n+1} computed from the index to avoid accumulating rounding errors
            let t_next = t0 + (step as f64 + 1.0) * dt;
            validate_state(&state, step + 1, t_next)?;
            recorder.record(step + 1, t_next, &state);
        }

        // ====== Step 4: Build Result ======

        let mut result = recorder.finish(t1, &state);
        result.add_metadata("solver", self.name());
        result.add_metadata("time steps", &time_steps.to_string());
        result.add_metadata("dt", &dt.to_string());
        result.add_metadata("total time", &(t1 - t0).to_string());

        Ok(result)
    }

    fn name(&self) -> &'static str {
        "Forward Euler"
    }
}

// =================================================================================================
// Tests
// =================================================================================================
