//! Numerical methods for integrating reaction networks
//!
//! This module contains concrete implementations of the [`Solver`](crate::solver::Solver) trait.
//!
//! # Available Methods
//!
//! ## Fixed-Step Methods
//!
//! - **[`EulerSolver`]**: Forward Euler method
//!   - Order: First-order O(dt)
//!   - Cost: 1 function evaluation per step
//!   - Use: quick checks, very smooth problems
//!
//! - **[`RK4Solver`]**: Classical fourth-order Runge-Kutta
//!   - Order: Fourth-order O(dt⁴)
//!   - Cost: 4 function evaluations per step
//!   - Use: non-stiff problems with a known time scale
//!
//! ## Adaptive Methods
//!
//! - **[`RK45Solver`]**: Dormand–Prince 5(4) with embedded error estimate
//!   - Cost: 6 function evaluations per accepted step (first same as last)
//!   - Use: default choice, time scales unknown or spread over decades
//!
//! # Design
//!
//! Each solver is stateless and can be reused for multiple simulations. All
//! stage buffers are allocated once per `solve` call; the step loop itself
//! does not allocate except to store trajectory points.

mod euler;
mod rk4;
mod rk45;

pub use euler::EulerSolver;
pub use rk4::RK4Solver;
pub use rk45::RK45Solver;

use nalgebra::DVector;

use crate::solver::SimulationResult;

/// Collects trajectory points, keeping every `save_every`-th step
pub(crate) struct TrajectoryRecorder {
    save_every: usize,
    time_points: Vec<f64>,
    trajectory: Vec<DVector<f64>>,
}

impl TrajectoryRecorder {
    /// Start a trajectory at the initial state
    pub(crate) fn new(save_every: usize, capacity: usize, t0: f64, initial: &[f64]) -> Self {
        let mut time_points = Vec::with_capacity(capacity + 1);
        let mut trajectory = Vec::with_capacity(capacity + 1);
        time_points.push(t0);
        trajectory.push(DVector::from_column_slice(initial));
        Self {
            save_every: save_every.max(1),
            time_points,
            trajectory,
        }
    }

    /// Record the state reached after `step` steps (1-based) if due
    pub(crate) fn record(&mut self, step: usize, t: f64, state: &[f64]) {
        if step % self.save_every == 0 {
            self.time_points.push(t);
            self.trajectory.push(DVector::from_column_slice(state));
        }
    }

    /// Close the trajectory, making sure the final state is stored
    pub(crate) fn finish(mut self, t_end: f64, state: &[f64]) -> SimulationResult {
        let final_state = DVector::from_column_slice(state);
        if self.time_points.last() != Some(&t_end) {
            self.time_points.push(t_end);
            self.trajectory.push(final_state.clone());
        }
        SimulationResult::new(self.time_points, self.trajectory, final_state)
    }
}
