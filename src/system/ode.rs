//! Deterministic ODE system over a flat model
//!
//! # Model equations
//!
//! For a state variable `q_i` (species `s` in compartment `c` of volume `V_c`):
//!
//! **Reactions of `c`**, mass action with count-based rate constants:
//!
//! | `s` is a | forward (`kf`) | reverse (`kr`) |
//! |----------|----------------|----------------|
//! | reactant | sink           | source         |
//! | product  | source         | sink           |
//!
//! The rate of an order-`n` side is `k / V_c^(n-1)` times the product of
//! the counts on that side, each species repeated by its coefficient.
//!
//! **Connections of `c`** carrying `s`, with rate pair `(k_out, k_in)` in L/s:
//!
//! ```text
//! sink   = k_out / V_c        · q_i
//! source = k_in  / V_neighbor · q_j      (j = s in the neighbor)
//! ```
//!
//! The builders are computed once in [`OdeSystem::new`]; evaluating the
//! right-hand side only walks the prebuilt term lists.

use nalgebra::DVector;

use crate::error::{Error, Result};
use crate::network::{Compartment, FlatModel, Model, Reaction};
use crate::solver::{OdeModel, Scenario, SimulationResult, Solver, SolverConfiguration};
use crate::system::deriv::{DerivFuncBuilder, RateTerm};
use crate::system::state::State;
use crate::units::{Dimension, Quantity, UnitContext};

// =================================================================================================
// StateAmount
// =================================================================================================

/// Amount of a species used to set state values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateAmount {
    /// Number of molecules
    Count(f64),

    /// Amount of substance, converted with `count = n · N_A`
    MolarAmount(Quantity),

    /// Concentration, converted with `count = c · V · N_A` using the volume
    /// of each target compartment
    Concentration(Quantity),
}

impl StateAmount {
    /// Classify a quantity by its dimension
    ///
    /// # Errors
    ///
    /// [`Error::Dimension`] unless the quantity is dimensionless, an amount
    /// or a concentration.
    pub fn from_quantity(quantity: Quantity) -> Result<Self> {
        let dimension = quantity.dimension();
        if dimension == Dimension::DIMENSIONLESS {
            Ok(Self::Count(quantity.to_si()))
        } else if dimension == Dimension::AMOUNT {
            Ok(Self::MolarAmount(quantity))
        } else if dimension == Dimension::CONCENTRATION {
            Ok(Self::Concentration(quantity))
        } else {
            Err(Error::Dimension {
                quantity: "state amount".to_string(),
                expected: Dimension::CONCENTRATION,
                found: dimension,
            })
        }
    }
}

// =================================================================================================
// OdeSystem
// =================================================================================================

/// A flat model, its state and the compiled right-hand side
///
/// # Example
///
/// ```rust
/// use rxn_rs::network::{Compartment, IsotropicConnection, Model};
/// use rxn_rs::solver::{RK45Solver, SolverConfiguration};
/// use rxn_rs::system::{OdeSystem, StateAmount};
/// use rxn_rs::units::UnitContext;
///
/// let mut model = Model::new(
///     [],
///     [Compartment::from_internal("left", 1.0).unwrap(), Compartment::from_internal("right", 1.0).unwrap()],
/// ).unwrap();
/// model.connect("left", "right", IsotropicConnection::from_internal([("A", 0.5)]).unwrap().into()).unwrap();
///
/// let mut system = OdeSystem::from_model(&model, UnitContext::default()).unwrap();
/// let left = system.state().index_of("left", "A").unwrap();
/// system.set_q(&[left], StateAmount::Count(1000.0)).unwrap();
///
/// system.propagate((0.0, 50.0), &RK45Solver::new(), &SolverConfiguration::adaptive(1e-8, 1e-6)).unwrap();
/// assert!((system.state().q_val()[left] - 500.0).abs() < 1e-3);
/// ```
#[derive(Debug, Clone)]
pub struct OdeSystem {
    model: FlatModel,
    ctx: UnitContext,
    state: State,
    dqdt: Vec<DerivFuncBuilder>,
}

impl OdeSystem {
    /// Build the state and every derivative builder for a flat model
    ///
    /// # Errors
    ///
    /// [`Error::AsymmetricConnection`] if a connection carries a species
    /// the neighbor does not hold.
    pub fn new(model: FlatModel, ctx: UnitContext) -> Result<Self> {
        let state = State::from_flat(&model);

        // ====== Step 1: One builder per state variable ======

        let mut dqdt = Vec::with_capacity(state.size());
        for i in 0..state.size() {
            dqdt.push(build_dqdt(&model, &state, i)?);
        }

        let n_terms: usize = dqdt.iter().map(DerivFuncBuilder::n_terms).sum();
        log::debug!(
            "ODE system built: {} compartments, {} state variables, {} rate terms",
            model.len(),
            state.size(),
            n_terms
        );

        Ok(Self { model, ctx, state, dqdt })
    }

    /// Flatten `model` and build the system
    pub fn from_model(model: &Model, ctx: UnitContext) -> Result<Self> {
        Self::new(model.flatten()?, ctx)
    }

    pub fn model(&self) -> &FlatModel {
        &self.model
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn unit_context(&self) -> &UnitContext {
        &self.ctx
    }

    /// Derivative builders, one per state variable
    pub fn builders(&self) -> &[DerivFuncBuilder] {
        &self.dqdt
    }

    /// Set the state at `indices` to `amount`
    ///
    /// # Errors
    ///
    /// - [`Error::StateIndexOutOfRange`] for an index outside the state
    /// - [`Error::Dimension`] for a quantity of the wrong dimension
    ///
    /// The state is unchanged on error.
    pub fn set_q(&mut self, indices: &[usize], amount: StateAmount) -> Result<()> {
        let size = self.state.size();
        if let Some(&index) = indices.iter().find(|&&i| i >= size) {
            return Err(Error::StateIndexOutOfRange { index, size });
        }

        match amount {
            StateAmount::Count(count) => {
                for &i in indices {
                    self.state.set(i, count);
                }
            }
            StateAmount::MolarAmount(n) => {
                let count = self.ctx.to_internal(&n, Dimension::AMOUNT, "molar amount")?;
                for &i in indices {
                    self.state.set(i, count);
                }
            }
            StateAmount::Concentration(c) => {
                let per_liter = self.ctx.to_internal(&c, Dimension::CONCENTRATION, "concentration")?;
                for &i in indices {
                    let volume = self.volume_at(i)?;
                    self.state.set(i, per_liter * volume);
                }
            }
        }
        Ok(())
    }

    /// Set the state from a dimensioned quantity, see [`StateAmount::from_quantity`]
    pub fn set_q_quantity(&mut self, indices: &[usize], quantity: Quantity) -> Result<()> {
        self.set_q(indices, StateAmount::from_quantity(quantity)?)
    }

    fn volume_at(&self, index: usize) -> Result<f64> {
        let id = &self.state.compartments()[index];
        self.model
            .compartment(id)
            .map(Compartment::volume)
            .ok_or_else(|| Error::UnknownCompartment(id.clone()))
    }

    /// Evaluate `dq/dt` at the current state
    pub fn current_derivative(&self) -> DVector<f64> {
        let mut dq = DVector::zeros(self.state.size());
        self.rhs(0.0, self.state.q_val().as_slice(), dq.as_mut_slice());
        dq
    }

    /// Integrate over `t_interval` starting from the current state
    ///
    /// On success the state is replaced by the final state of the
    /// trajectory. On error the state is left untouched.
    pub fn propagate(
        &mut self,
        t_interval: (f64, f64),
        solver: &dyn Solver,
        config: &SolverConfiguration,
    ) -> Result<SimulationResult> {
        let result = {
            let scenario = Scenario::new(&*self, self.state.q_val().clone(), t_interval);
            solver.solve(&scenario, config)?
        };

        log::debug!(
            "propagated {:?} with {}: {} stored points",
            t_interval,
            solver.name(),
            result.len()
        );

        self.state.set_q_val(result.final_state.clone())?;
        Ok(result)
    }
}

impl OdeModel for OdeSystem {
    fn dimension(&self) -> usize {
        self.state.size()
    }

    fn rhs(&self, t: f64, q: &[f64], dq: &mut [f64]) {
        // Each output entry reads q only, so entries are independent.
        #[cfg(feature = "parallel")]
        if dq.len() > crate::solver::parallel_threshold() {
            use rayon::prelude::*;

            dq.par_iter_mut()
                .zip(self.dqdt.par_iter())
                .for_each(|(d, builder)| *d = builder.deriv(q, t));
            return;
        }

        for (d, builder) in dq.iter_mut().zip(&self.dqdt) {
            *d = builder.deriv(q, t);
        }
    }

    fn name(&self) -> &str {
        "ODE system"
    }
}

// =================================================================================================
// Builder construction
// =================================================================================================

/// Source and sink terms for state variable `i`
fn build_dqdt(model: &FlatModel, state: &State, i: usize) -> Result<DerivFuncBuilder> {
    let c_id = state.compartments()[i].as_str();
    let s = state.species()[i].as_str();

    let Some(compartment) = model.compartment(c_id) else {
        return Err(Error::UnknownCompartment(c_id.to_string()));
    };
    let volume = compartment.volume();

    let mut sources = Vec::new();
    let mut sinks = Vec::new();

    // ====== Reactions ======

    for rxn in compartment.reactions() {
        let as_reactant = rxn.reactant_coefficient(s);
        let as_product = rxn.product_coefficient(s);
        if as_reactant == 0 && as_product == 0 {
            continue;
        }

        let forward = side_term(state, c_id, volume, rxn, true, rxn.kf());
        let reverse = side_term(state, c_id, volume, rxn, false, rxn.kr());

        // both sides are visited, so a catalyst's terms cancel
        if as_reactant > 0 {
            if let Some((rate, indices)) = &forward {
                sinks.push(RateTerm::new(*rate, indices.clone()));
            }
            if let Some((rate, indices)) = &reverse {
                sources.push(RateTerm::new(*rate, indices.clone()));
            }
        }
        if as_product > 0 {
            if let Some((rate, indices)) = forward {
                sources.push(RateTerm::new(rate, indices));
            }
            if let Some((rate, indices)) = reverse {
                sinks.push(RateTerm::new(rate, indices));
            }
        }
    }

    // ====== Connections ======

    for (neighbor_id, conn) in model.neighbors(c_id) {
        let Some((k_out, k_in)) = conn.rates(s) else {
            continue;
        };
        let (Some(neighbor), Some(j)) = (model.compartment(neighbor_id), state.index_of(neighbor_id, s)) else {
            return Err(Error::AsymmetricConnection {
                from: c_id.to_string(),
                to: neighbor_id.to_string(),
                species: s.to_string(),
                detail: "species is not present in the neighbor".to_string(),
            });
        };

        sinks.push(RateTerm::transport(k_out / volume, i));
        sources.push(RateTerm::transport(k_in / neighbor.volume(), j));
    }

    Ok(DerivFuncBuilder::new(sources, sinks))
}

/// Rate `k / V^(n-1)` and index list of one side of a reaction, `None` when `k == 0`
fn side_term(
    state: &State,
    compartment: &str,
    volume: f64,
    rxn: &Reaction,
    forward: bool,
    k: f64,
) -> Option<(f64, Vec<usize>)> {
    if k <= 0.0 {
        return None;
    }

    let (species, stoich) = if forward {
        (rxn.reactants(), rxn.stoich_r())
    } else {
        (rxn.products(), rxn.stoich_p())
    };

    let mut indices = Vec::new();
    for (x, &n) in species.iter().zip(stoich) {
        // every reaction species is part of the compartment's state
        let j = state.index_of(compartment, x.id())?;
        indices.extend(std::iter::repeat_n(j, n as usize));
    }

    let order = indices.len() as i32;
    let rate = if order > 1 { k / volume.powi(order - 1) } else { k };
    Some((rate, indices))
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{CompartmentSelection, IsotropicConnection, Species};
    use crate::solver::{RK4Solver, RK45Solver, SolverError};
    use crate::units::{self, AVOGADRO};
    use approx::assert_relative_eq;

    fn single(volume: f64, rxn: Reaction) -> OdeSystem {
        let model = Model::new([], [Compartment::from_internal("cell", volume).unwrap()]).unwrap();
        let mut flat = model.flatten().unwrap();
        flat.add_rxn(&rxn, CompartmentSelection::All).unwrap();
        OdeSystem::new(flat, UnitContext::default()).unwrap()
    }

    fn binding(kf: f64, kr: f64) -> Reaction {
        Reaction::from_internal(
            "bind",
            &[Species::new("A"), Species::new("B")],
            &[Species::new("C")],
            &[1, 1],
            &[1],
            kf,
            kr,
        )
        .unwrap()
    }

    #[test]
    fn test_first_order_rate_is_unchanged() {
        let decay = Reaction::from_internal("decay", &[Species::new("A")], &[Species::new("B")], &[1], &[1], 0.3, 0.0)
            .unwrap();
        let system = single(5.0, decay);

        let sink = &system.builders()[0].sinks()[0];
        assert_eq!(sink.rate(), 0.3);
        assert_eq!(sink.indices(), &[0]);
        assert_eq!(system.builders()[1].sources()[0].rate(), 0.3);
    }

    #[test]
    fn test_second_order_rate_is_divided_by_volume() {
        let system = single(4.0, binding(2.0, 0.5));

        // A: sink kf/V [A, B], source kr [C]
        let a = &system.builders()[0];
        assert_eq!(a.sinks()[0].rate(), 0.5);
        assert_eq!(a.sinks()[0].indices(), &[0, 1]);
        assert_eq!(a.sources()[0].rate(), 0.5);
        assert_eq!(a.sources()[0].indices(), &[2]);

        // C: source kf/V, sink kr
        let c = &system.builders()[2];
        assert_eq!(c.sources()[0].indices(), &[0, 1]);
        assert_eq!(c.sinks()[0].indices(), &[2]);
    }

    #[test]
    fn test_zero_rate_constant_adds_no_term() {
        let system = single(1.0, binding(1.0, 0.0));
        assert_eq!(system.builders()[0].n_terms(), 1);
        assert_eq!(system.builders()[2].n_terms(), 1);
    }

    #[test]
    fn test_dimerization_repeats_the_reactant_index() {
        // 2A → B
        let dimer =
            Reaction::from_internal("dimer", &[Species::new("A")], &[Species::new("B")], &[2], &[1], 1.0, 0.0).unwrap();
        let mut system = single(2.0, dimer);
        system.set_q(&[0], StateAmount::Count(10.0)).unwrap();

        let sink = &system.builders()[0].sinks()[0];
        assert_eq!(sink.rate(), 0.5);
        assert_eq!(sink.indices(), &[0, 0]);

        // kf/V · A² = 0.5 · 100 for both A and B
        let dq = system.current_derivative();
        assert_relative_eq!(dq[0], -50.0);
        assert_relative_eq!(dq[1], 50.0);
    }

    #[test]
    fn test_catalyst_is_unchanged() {
        // A + E → B + E
        let catalysis = Reaction::from_internal(
            "catalysis",
            &[Species::new("A"), Species::new("E")],
            &[Species::new("B"), Species::new("E")],
            &[1, 1],
            &[1, 1],
            3.0,
            0.0,
        )
        .unwrap();
        let mut system = single(1.5, catalysis);

        // reactants first, then products: [A, E, B]
        assert_eq!(system.state().species(), &["A", "E", "B"]);
        system.set_q(&[0], StateAmount::Count(8.0)).unwrap();
        system.set_q(&[1], StateAmount::Count(5.0)).unwrap();

        let e = &system.builders()[1];
        assert_eq!(e.sinks().len(), 1);
        assert_eq!(e.sources().len(), 1);

        let dq = system.current_derivative();
        assert_eq!(dq[1], 0.0);
        // kf/V · A · E = 2 · 40
        assert_relative_eq!(dq[0], -80.0);
        assert_relative_eq!(dq[2], 80.0);
    }

    #[test]
    fn test_set_q_conversions() {
        let mut system = single(2.0, binding(1.0, 1.0));

        system.set_q(&[0], StateAmount::Count(42.0)).unwrap();
        assert_eq!(system.state().q_val()[0], 42.0);

        system.set_q(&[1], StateAmount::MolarAmount(1e-3 * units::MOLE)).unwrap();
        assert_relative_eq!(system.state().q_val()[1], 1e-3 * AVOGADRO, max_relative = 1e-12);

        // count = c · V · N_A
        system
            .set_q(&[2], StateAmount::Concentration(1e-6 * units::MOLAR))
            .unwrap();
        assert_relative_eq!(system.state().q_val()[2], 1e-6 * 2.0 * AVOGADRO, max_relative = 1e-12);
    }

    #[test]
    fn test_set_q_rejects_bad_input_without_change() {
        let mut system = single(1.0, binding(1.0, 1.0));
        system.set_q(&[0, 1], StateAmount::Count(5.0)).unwrap();

        let err = system.set_q(&[0, 9], StateAmount::Count(1.0)).unwrap_err();
        assert!(matches!(err, Error::StateIndexOutOfRange { index: 9, size: 3 }));

        let err = system
            .set_q(&[0], StateAmount::Concentration(1.0 * units::MOLE))
            .unwrap_err();
        assert!(matches!(err, Error::Dimension { .. }));

        assert!(matches!(
            StateAmount::from_quantity(1.0 * units::LITER),
            Err(Error::Dimension { .. })
        ));
        assert_eq!(system.state().q_val()[0], 5.0);
    }

    #[test]
    fn test_from_quantity_dispatch() {
        assert!(matches!(
            StateAmount::from_quantity(3.0 * units::DIMENSIONLESS),
            Ok(StateAmount::Count(c)) if c == 3.0
        ));
        assert!(matches!(
            StateAmount::from_quantity(1.0 * units::MICROMOLAR),
            Ok(StateAmount::Concentration(_))
        ));
    }

    #[test]
    fn test_transport_terms_use_both_volumes() {
        let mut model = Model::new(
            [],
            [
                Compartment::from_internal("a", 2.0).unwrap(),
                Compartment::from_internal("b", 4.0).unwrap(),
            ],
        )
        .unwrap();
        model
            .connect("a", "b", IsotropicConnection::from_internal([("X", 8.0)]).unwrap().into())
            .unwrap();
        let system = OdeSystem::from_model(&model, UnitContext::default()).unwrap();

        let a = &system.builders()[0];
        assert_eq!(a.sinks()[0].rate(), 4.0);
        assert_eq!(a.sources()[0].rate(), 2.0);
        assert_eq!(a.sources()[0].indices(), &[1]);
    }

    #[test]
    fn test_propagate_updates_state() {
        let mut system = single(1.0, binding(0.0, 1.0));
        system.set_q(&[2], StateAmount::Count(100.0)).unwrap();

        let result = system
            .propagate((0.0, 1.0), &RK4Solver::new(), &SolverConfiguration::fixed_step(1000))
            .unwrap();

        assert_relative_eq!(system.state().q_val()[2], 100.0 * (-1.0f64).exp(), max_relative = 1e-9);
        assert_eq!(result.final_state, *system.state().q_val());
    }

    #[test]
    fn test_failed_propagate_leaves_state_untouched() {
        let mut system = single(1.0, binding(0.0, 1.0));
        system.set_q(&[2], StateAmount::Count(100.0)).unwrap();
        let before = system.state().q_val().clone();

        let err = system
            .propagate((0.0, 1.0), &RK45Solver::new(), &SolverConfiguration::fixed_step(10))
            .unwrap_err();

        assert!(matches!(err, Error::Solver(SolverError::Unsupported { .. })));
        assert_eq!(*system.state().q_val(), before);
    }

    #[test]
    fn test_parallel_and_sequential_rhs_agree() {
        let mut system = single(3.0, binding(2.0, 0.7));
        system.set_q(&[0, 1, 2], StateAmount::Count(11.0)).unwrap();

        let sequential = system.current_derivative();
        let parallel = {
            let _guard = crate::solver::ThresholdGuard::save(1);
            system.current_derivative()
        };
        assert_eq!(sequential, parallel);
    }
}
