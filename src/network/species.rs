//! Chemical species and reversible mass-action reactions

use crate::error::{Error, Result};
use crate::units::{Dimension, Quantity, UnitContext};

/// A chemical species
///
/// Species carry no state. Their name is their ID and is used as the key
/// in reactions, connections and the state index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Species {
    name: String,
}

impl Species {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Species ID (identical to its name)
    pub fn id(&self) -> &str {
        &self.name
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Reversible mass-action reaction
///
/// ```text
/// n₁ R₁ + n₂ R₂ + …  ⇌  m₁ P₁ + m₂ P₂ + …
///                  kf, kr
/// ```
///
/// Rate constants are stored in internal units: an order-`n` constant is in
/// `L^(n-1) / (count^(n-1) · s)`. A zero rate constant means that direction
/// of the reaction is absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    id: String,
    reactants: Vec<Species>,
    products: Vec<Species>,
    stoich_r: Vec<u32>,
    stoich_p: Vec<u32>,
    kf: f64,
    kr: f64,
}

impl Reaction {
    /// Create a reaction from dimensioned rate constants
    ///
    /// `kf` must have the dimension of a mass-action constant of order
    /// `Σ stoich_r`, `kr` of order `Σ stoich_p`. `None` disables that
    /// direction.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidReaction`] when coefficient lists and species lists
    ///   differ in length, a coefficient is zero, a side is empty, or a rate
    ///   constant is negative or not finite
    /// - [`Error::Dimension`] when a rate constant has the wrong dimension
    ///
    /// # Example
    ///
    /// ```rust
    /// use rxn_rs::network::{Reaction, Species};
    /// use rxn_rs::units::{self, UnitContext};
    ///
    /// let ctx = UnitContext::default();
    /// let drug = Species::new("drug");
    /// let receptor = Species::new("receptor");
    /// let complex = Species::new("complex");
    ///
    /// let binding = Reaction::new(
    ///     "binding",
    ///     &[drug, receptor],
    ///     &[complex],
    ///     &[1, 1],
    ///     &[1],
    ///     Some(1e6 * (units::LITER / (units::MOLE * units::SECOND))),
    ///     Some(0.1 * (units::DIMENSIONLESS / units::SECOND)),
    ///     &ctx,
    /// ).unwrap();
    /// assert_eq!(binding.forward_order(), 2);
    /// ```
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        reactants: &[Species],
        products: &[Species],
        stoich_r: &[u32],
        stoich_p: &[u32],
        kf: Option<Quantity>,
        kr: Option<Quantity>,
        ctx: &UnitContext,
    ) -> Result<Self> {
        let id = id.into();
        let order_r: u32 = stoich_r.iter().sum();
        let order_p: u32 = stoich_p.iter().sum();

        let kf = match kf {
            Some(q) => ctx.to_internal(&q, Dimension::mass_action(order_r), &format!("forward rate constant of '{id}'"))?,
            None => 0.0,
        };
        let kr = match kr {
            Some(q) => ctx.to_internal(&q, Dimension::mass_action(order_p), &format!("reverse rate constant of '{id}'"))?,
            None => 0.0,
        };

        Self::from_internal(id, reactants, products, stoich_r, stoich_p, kf, kr)
    }

    /// Create a reaction whose rate constants are already in internal units
    pub fn from_internal(
        id: impl Into<String>,
        reactants: &[Species],
        products: &[Species],
        stoich_r: &[u32],
        stoich_p: &[u32],
        kf: f64,
        kr: f64,
    ) -> Result<Self> {
        let id = id.into();
        let invalid = |detail: String| Error::InvalidReaction { reaction: id.clone(), detail };

        if reactants.len() != stoich_r.len() {
            return Err(invalid(format!(
                "{} reactants but {} reactant coefficients",
                reactants.len(),
                stoich_r.len()
            )));
        }
        if products.len() != stoich_p.len() {
            return Err(invalid(format!(
                "{} products but {} product coefficients",
                products.len(),
                stoich_p.len()
            )));
        }
        if reactants.is_empty() || products.is_empty() {
            return Err(invalid("reactant and product lists must not be empty".to_string()));
        }
        if stoich_r.iter().chain(stoich_p.iter()).any(|&n| n == 0) {
            return Err(invalid("stoichiometric coefficients must be positive".to_string()));
        }
        for (label, k) in [("kf", kf), ("kr", kr)] {
            if !k.is_finite() || k < 0.0 {
                return Err(invalid(format!("{label} must be finite and >= 0, got {k}")));
            }
        }

        Ok(Self {
            id,
            reactants: reactants.to_vec(),
            products: products.to_vec(),
            stoich_r: stoich_r.to_vec(),
            stoich_p: stoich_p.to_vec(),
            kf,
            kr,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn reactants(&self) -> &[Species] {
        &self.reactants
    }

    pub fn products(&self) -> &[Species] {
        &self.products
    }

    pub fn stoich_r(&self) -> &[u32] {
        &self.stoich_r
    }

    pub fn stoich_p(&self) -> &[u32] {
        &self.stoich_p
    }

    /// Forward rate constant (internal units)
    pub fn kf(&self) -> f64 {
        self.kf
    }

    /// Reverse rate constant (internal units)
    pub fn kr(&self) -> f64 {
        self.kr
    }

    /// Total reactant stoichiometry
    pub fn forward_order(&self) -> u32 {
        self.stoich_r.iter().sum()
    }

    /// Total product stoichiometry
    pub fn reverse_order(&self) -> u32 {
        self.stoich_p.iter().sum()
    }

    /// Net number of `species` consumed by one forward event (reactant side)
    pub fn reactant_coefficient(&self, species: &str) -> u32 {
        coefficient(&self.reactants, &self.stoich_r, species)
    }

    /// Net number of `species` produced by one forward event (product side)
    pub fn product_coefficient(&self, species: &str) -> u32 {
        coefficient(&self.products, &self.stoich_p, species)
    }

    /// Species IDs in first-appearance order (reactants then products)
    pub fn species_ids(&self) -> impl Iterator<Item = &str> {
        self.reactants.iter().chain(self.products.iter()).map(|s| s.id())
    }
}

fn coefficient(species_list: &[Species], stoich: &[u32], species: &str) -> u32 {
    species_list
        .iter()
        .zip(stoich)
        .filter(|(s, _)| s.id() == species)
        .map(|(_, &n)| n)
        .sum()
}

// =================================================================================================
// Tests
// =================================================================================================
