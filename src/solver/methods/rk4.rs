//! Runge-Kutta 4 (RK4) numerical solver
//!
//! # Mathematical Background
//!
//! The classical fourth-order Runge-Kutta method uses a weighted average of
//! four slope estimates:
//!
//! ```text
//! k₁ = f(tₙ, qₙ)
//! k₂ = f(tₙ + dt/2, qₙ + dt/2 * k₁)
//! k₃ = f(tₙ + dt/2, qₙ + dt/2 * k₂)
//! k₄ = f(tₙ + dt, qₙ + dt * k₃)
//!
//! qₙ₊₁ = qₙ + dt/6 * (k₁ + 2k₂ + 2k₃ + k₄)
//! ```
//!
//! # Characteristics
//!
//! - **Order**: Fourth-order accurate (error ~ O(dt⁴))
//! - **Stability**: Stable for `|R(λ·dt)| ≤ 1`, about 2.78× the Euler limit
//! - **Complexity**: 4 function evaluations per step
//! - **Memory**: four stage buffers plus one scratch state
//!
//! # When NOT to Use
//!
//! - Time scales unknown or spread over many decades → use [`RK45Solver`](super::RK45Solver)
//! - Very stiff binding kinetics → step count explodes, consider rescaling the network
//!
//! # Comparison with Euler
//!
//! | Method | Order | Evals/Step | Typical dt | Error |
//! |--------|-------|------------|------------|-------|
//! | Euler  | 1     | 1          | Small      | O(dt) |
//! | RK4    | 4     | 4          | Moderate   | O(dt⁴)|

use crate::solver::methods::TrajectoryRecorder;
use crate::solver::{Scenario, SimulationResult, Solver, SolverConfiguration, SolverError, SolverType, validate_state};

// =================================================================================================
// RK4 Solver
// =================================================================================================

/// Classical fourth-order Runge-Kutta solver
///
/// # Algorithm
///
/// 1. Start with initial state q₀
/// 2. For each time step n = 0, 1, 2, ..., N-1:
///    - **Stage 1**: k₁ = f(tₙ, qₙ), slope at beginning of interval
///    - **Stage 2**: k₂ = f(tₙ + dt/2, qₙ + dt/2·k₁), midpoint slope using k₁
///    - **Stage 3**: k₃ = f(tₙ + dt/2, qₙ + dt/2·k₂), midpoint slope using k₂
///    - **Stage 4**: k₄ = f(tₙ + dt, qₙ + dt·k₃), end slope using k₃
///    - **Update**: qₙ₊₁ = qₙ + dt/6·(k₁ + 2k₂ + 2k₃ + k₄)
/// 3. Return trajectory
///
/// Halving dt reduces the global error by a factor of about 16.
///
/// # Example
///
/// ```rust
/// use nalgebra::DVector;
/// use rxn_rs::solver::{OdeModel, RK4Solver, Scenario, Solver, SolverConfiguration};
///
/// struct Growth;
/// impl OdeModel for Growth {
///     fn dimension(&self) -> usize { 1 }
///     fn rhs(&self, _t: f64, _q: &[f64], dq: &mut [f64]) { dq[0] = 5.0; }
/// }
///
/// let scenario = Scenario::new(&Growth, DVector::zeros(1), (0.0, 1.0));
/// let result = RK4Solver::new()
///     .solve(&scenario, &SolverConfiguration::fixed_step(10))
///     .unwrap();
///
/// assert!((result.final_state[0] - 5.0).abs() < 1e-12);
/// assert_eq!(result.metadata["function evaluations"], "40");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RK4Solver;

impl RK4Solver {
    /// Create a new RK4 solver
    pub fn new() -> Self {
        Self
    }
}

impl Solver for RK4Solver {
    fn solve(&self, scenario: &Scenario, config: &SolverConfiguration) -> Result<SimulationResult, SolverError> {
        // ====== Step 1: Validation ======

        config.validate()?;
        scenario.validate()?;

        // RK4 is dedicated to fixed-step time evolution
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
        let half_dt = 0.5 * dt;

        let n = scenario.initial_state.len();
        let mut state: Vec<f64> = scenario.initial_state.iter().copied().collect();
        let mut stage = vec![0.0; n];
        let mut k1 = vec![0.0; n];
        let mut k2 = vec![0.0; n];
        let mut k3 = vec![0.0; n];
        let mut k4 = vec![0.0; n];

        let mut recorder = TrajectoryRecorder::new(config.save_every, time_steps / config.save_every, t0, &state);

        // ====== Step 3: Time Integration ======

        for step in 0..time_steps {
            let t = t0 + dt * step as f64;

            // ====== RK4 Stages ======

            scenario.model.rhs(t, &state, &mut k1);

            axpy(&mut stage, &state, half_dt, &k1);
            scenario.model.rhs(t + half_dt, &stage, &mut k2);

            axpy(&mut stage, &state, half_dt, &k2);
            scenario.model.rhs(t + half_dt, &stage, &mut k3);

            axpy(&mut stage, &state, dt, &k3);
            scenario.model.rhs(t + dt, &stage, &mut k4);

            // ====== RK4 Update ======

            // Simpson weights: endpoints 1/6, midpoints 1/3
            for i in 0..n {
                state[i] += dt / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
            }

            // ====== Storage ======

            // t_{n+1} from the index, not by accumulating dt
            let t_next = t0 + (step as f64 + 1.0) * dt;
            validate_state(&state, step + 1, t_next)?;
            recorder.record(step + 1, t_next, &state);
        }

        // ====== Step 4: Build Result ======

        let mut result = recorder.finish(t1, &state);
        result.add_metadata("solver", "Runge-Kutta 4");
        result.add_metadata("time steps", &time_steps.to_string());
        result.add_metadata("dt", &dt.to_string());
        result.add_metadata("total time", &(t1 - t0).to_string());
        result.add_metadata("function evaluations", &(4 * time_steps).to_string());

        Ok(result)
    }

    fn name(&self) -> &'static str {
        "Runge Kutta (RK4)"
    }
}

/// `out = base + scale * direction`
fn axpy(out: &mut [f64], base: &[f64], scale: f64, direction: &[f64]) {
    for ((o, b), d) in out.iter_mut().zip(base).zip(direction) {
        *o = b + scale * d;
    }
}

// =================================================================================================
// Tests
// =================================================================================================
