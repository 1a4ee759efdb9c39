//! Dormand–Prince 5(4) adaptive solver
//!
//! # Mathematical Background
//!
//! An explicit seven-stage Runge-Kutta pair. The fifth-order solution
//! advances the state (local extrapolation) and the difference with the
//! embedded fourth-order solution estimates the local error. The last stage
//! is evaluated at the new state, so it doubles as the first stage of the
//! next step (FSAL).
//!
//! # Step-size control
//!
//! ```text
//! sc_i  = atol + rtol * max(|q_i|, |q_new_i|)
//! err   = sqrt( mean( (e_i / sc_i)² ) )
//! h_new = h * clamp(0.9 * err^(-1/5), 0.2, 5)
//! ```
//!
//! A step is accepted when `err ≤ 1`.

use crate::solver::methods::TrajectoryRecorder;
use crate::solver::{Scenario, SimulationResult, Solver, SolverConfiguration, SolverError, SolverType, validate_state};

// ====== Butcher tableau ======

const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

// Fifth-order weights
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// Embedded fourth-order weights
const BS1: f64 = 5179.0 / 57600.0;
const BS3: f64 = 7571.0 / 16695.0;
const BS4: f64 = 393.0 / 640.0;
const BS5: f64 = -92097.0 / 339200.0;
const BS6: f64 = 187.0 / 2100.0;
const BS7: f64 = 1.0 / 40.0;

// Error weights
const E1: f64 = B1 - BS1;
const E3: f64 = B3 - BS3;
const E4: f64 = B4 - BS4;
const E5: f64 = B5 - BS5;
const E6: f64 = B6 - BS6;
const E7: f64 = -BS7;

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

// =================================================================================================
// RK45 Solver
// =================================================================================================

/// Adaptive Dormand–Prince solver
///
/// Only accepts [`SolverType::Adaptive`] configurations. `save_every` counts
/// accepted steps, so stored time points are not evenly spaced.
///
/// # Example
///
/// ```rust
/// use nalgebra::DVector;
/// use rxn_rs::solver::{OdeModel, RK45Solver, Scenario, Solver, SolverConfiguration};
///
/// struct Decay;
/// impl OdeModel for Decay {
///     fn dimension(&self) -> usize { 1 }
///     fn rhs(&self, _t: f64, q: &[f64], dq: &mut [f64]) { dq[0] = -2.0 * q[0]; }
/// }
///
/// let scenario = Scenario::new(&Decay, DVector::from_element(1, 1.0), (0.0, 3.0));
/// let result = RK45Solver::new()
///     .solve(&scenario, &SolverConfiguration::adaptive(1e-8, 1e-12))
///     .unwrap();
///
/// assert!((result.final_state[0] - (-6.0f64).exp()).abs() < 1e-7);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RK45Solver;

impl RK45Solver {
    /// Create a new Dormand–Prince solver
    pub fn new() -> Self {
        Self
    }
}

impl Solver for RK45Solver {
    fn solve(&self, scenario: &Scenario, config: &SolverConfiguration) -> Result<SimulationResult, SolverError> {
        // ====== Step 1: Validation ======

        config.validate()?;
        scenario.validate()?;

        let (rtol, atol, initial_step, min_step, max_step, max_steps) = match &config.solver_type {
            SolverType::Adaptive {
                rtol,
                atol,
                initial_step,
                min_step,
                max_step,
                max_steps,
            } => (*rtol, *atol, *initial_step, *min_step, *max_step, *max_steps),
            other => {
                return Err(SolverError::Unsupported {
                    solver: self.name(),
                    solver_type: other.name(),
                });
            }
        };

        // ====== Step 2: Setup ======

        let (t0, t1) = scenario.t_span;
        let span = t1 - t0;
        let model = scenario.model;

        let n = scenario.initial_state.len();
        let mut q: Vec<f64> = scenario.initial_state.iter().copied().collect();
        let mut recorder = TrajectoryRecorder::new(config.save_every, 64, t0, &q);

        if span == 0.0 {
            let mut result = recorder.finish(t1, &q);
            result.add_metadata("solver", self.name());
            result.add_metadata("accepted steps", "0");
            return Ok(result);
        }

        let mut h = match initial_step {
            Some(h0) => h0.min(span),
            None => (span * 1e-3).max(min_step).min(max_step).min(span),
        };

        let mut k1 = vec![0.0; n];
        let mut k2 = vec![0.0; n];
        let mut k3 = vec![0.0; n];
        let mut k4 = vec![0.0; n];
        let mut k5 = vec![0.0; n];
        let mut k6 = vec![0.0; n];
        let mut k7 = vec![0.0; n];
        let mut stage = vec![0.0; n];
        let mut q_new = vec![0.0; n];

        let mut t = t0;
        let mut accepted = 0usize;
        let mut rejected = 0usize;
        let mut evaluations = 1usize;

        model.rhs(t, &q, &mut k1);

        // ====== Step 3: Time Integration ======

        let mut attempts = 0usize;
        while t < t1 {
            if attempts == max_steps {
                return Err(SolverError::MaxStepsExceeded { max_steps, time: t, t_end: t1 });
            }
            attempts += 1;

            // Land exactly on t1
            let last = h >= t1 - t;
            if last {
                h = t1 - t;
            }

            // ====== Stages ======

            for i in 0..n {
                stage[i] = q[i] + h * A21 * k1[i];
            }
            model.rhs(t + C2 * h, &stage, &mut k2);

            for i in 0..n {
                stage[i] = q[i] + h * (A31 * k1[i] + A32 * k2[i]);
            }
            model.rhs(t + C3 * h, &stage, &mut k3);

            for i in 0..n {
                stage[i] = q[i] + h * (A41 * k1[i] + A42 * k2[i] + A43 * k3[i]);
            }
            model.rhs(t + C4 * h, &stage, &mut k4);

            for i in 0..n {
                stage[i] = q[i] + h * (A51 * k1[i] + A52 * k2[i] + A53 * k3[i] + A54 * k4[i]);
            }
            model.rhs(t + C5 * h, &stage, &mut k5);

            for i in 0..n {
                stage[i] = q[i] + h * (A61 * k1[i] + A62 * k2[i] + A63 * k3[i] + A64 * k4[i] + A65 * k5[i]);
            }
            model.rhs(t + h, &stage, &mut k6);

            for i in 0..n {
                q_new[i] = q[i] + h * (B1 * k1[i] + B3 * k3[i] + B4 * k4[i] + B5 * k5[i] + B6 * k6[i]);
            }
            model.rhs(t + h, &q_new, &mut k7);
            evaluations += 6;

            // ====== Error estimate ======

            let mut err_norm = 0.0;
            for i in 0..n {
                let e = h * (E1 * k1[i] + E3 * k3[i] + E4 * k4[i] + E5 * k5[i] + E6 * k6[i] + E7 * k7[i]);
                let sc = atol + rtol * q[i].abs().max(q_new[i].abs());
                err_norm += (e / sc) * (e / sc);
            }
            if n > 0 {
                err_norm = (err_norm / n as f64).sqrt();
            }

            // NaN or overflow in a trial step is treated as a very large error
            let err_norm = if err_norm.is_finite() { err_norm } else { f64::INFINITY };

            if err_norm <= 1.0 {
                // ====== Accept ======

                t = if last { t1 } else { t + h };
                q.copy_from_slice(&q_new);
                std::mem::swap(&mut k1, &mut k7);
                accepted += 1;

                validate_state(&q, accepted, t)?;
                recorder.record(accepted, t, &q);
            } else {
                rejected += 1;
            }

            let factor = if err_norm == 0.0 {
                MAX_FACTOR
            } else {
                (SAFETY * err_norm.powf(-0.2)).clamp(MIN_FACTOR, MAX_FACTOR)
            };
            let h_next = (h * factor).min(max_step);

            if err_norm > 1.0 && (h_next < min_step || t + h_next == t) {
                return Err(SolverError::StepSizeUnderflow { step_size: h_next, time: t });
            }
            h = h_next.max(min_step);
        }

        // ====== Step 4: Build Result ======

        let mut result = recorder.finish(t1, &q);
        result.add_metadata("solver", self.name());
        result.add_metadata("accepted steps", &accepted.to_string());
        result.add_metadata("rejected steps", &rejected.to_string());
        result.add_metadata("function evaluations", &evaluations.to_string());
        result.add_metadata("rtol", &rtol.to_string());
        result.add_metadata("atol", &atol.to_string());
        result.add_metadata("total time", &span.to_string());

        Ok(result)
    }

    fn name(&self) -> &'static str {
        "Dormand-Prince (RK45)"
    }
}

// =================================================================================================
// Tests
// =================================================================================================
