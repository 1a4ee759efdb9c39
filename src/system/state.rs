//! Flat state vector and its index bookkeeping
//!
//! One state variable exists for every (compartment, species) pair where the
//! species appears in the compartment, either through a reaction or through
//! a connection. Positions are deterministic:
//!
//! 1. compartments in flat-model insertion order
//! 2. inside a compartment, species in first-appearance order: reactants of
//!    every reaction, products of every reaction, then connection species
//!
//! Values are counts (number of molecules).

use indexmap::IndexMap;
use nalgebra::DVector;

use crate::error::{Error, Result};
use crate::network::FlatModel;

/// Metadata of one state variable
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateEntry<'a> {
    pub index: usize,
    pub compartment: &'a str,
    pub species: &'a str,
    /// Center of the compartment bounding box, if it has one
    pub position: Option<[f64; 3]>,
}

/// Flat vector of per-(compartment, species) counts with parallel metadata
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    q_val: DVector<f64>,
    compartment: Vec<String>,
    species: Vec<String>,
    position: Vec<Option<[f64; 3]>>,
    index: IndexMap<String, IndexMap<String, usize>>,
}

impl State {
    /// Assign state positions for every species in every compartment
    ///
    /// All values start at zero.
    pub fn from_flat(model: &FlatModel) -> Self {
        let mut compartment = Vec::new();
        let mut species = Vec::new();
        let mut position = Vec::new();
        let mut index: IndexMap<String, IndexMap<String, usize>> = IndexMap::new();

        for (id, c) in model.compartments() {
            let row = index.entry(id.clone()).or_default();
            for s in c.species_ids() {
                row.insert(s.clone(), compartment.len());
                compartment.push(id.clone());
                species.push(s);
                position.push(c.position());
            }
        }

        log::debug!(
            "state built: {} variables over {} compartments",
            compartment.len(),
            index.len()
        );

        Self {
            q_val: DVector::zeros(compartment.len()),
            compartment,
            species,
            position,
            index,
        }
    }

    /// Number of state variables
    pub fn size(&self) -> usize {
        self.q_val.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q_val.is_empty()
    }

    /// Current values (counts)
    pub fn q_val(&self) -> &DVector<f64> {
        &self.q_val
    }

    /// Replace all values at once
    ///
    /// # Errors
    ///
    /// [`Error::StateIndexOutOfRange`] if `q_val` does not have [`size`](Self::size) entries.
    pub fn set_q_val(&mut self, q_val: DVector<f64>) -> Result<()> {
        if q_val.len() != self.size() {
            return Err(Error::StateIndexOutOfRange {
                index: q_val.len(),
                size: self.size(),
            });
        }
        self.q_val = q_val;
        Ok(())
    }

    pub(crate) fn set(&mut self, index: usize, value: f64) {
        self.q_val[index] = value;
    }

    /// Compartment ID of every state variable
    pub fn compartments(&self) -> &[String] {
        &self.compartment
    }

    /// Species ID of every state variable
    pub fn species(&self) -> &[String] {
        &self.species
    }

    /// Nested lookup `index[compartment][species] → position`
    pub fn index(&self) -> &IndexMap<String, IndexMap<String, usize>> {
        &self.index
    }

    /// Position of `species` in `compartment`
    pub fn index_of(&self, compartment: &str, species: &str) -> Option<usize> {
        self.index.get(compartment)?.get(species).copied()
    }

    /// Metadata of a single state variable
    pub fn entry(&self, index: usize) -> Option<StateEntry<'_>> {
        Some(StateEntry {
            index,
            compartment: self.compartment.get(index)?,
            species: self.species.get(index)?,
            position: *self.position.get(index)?,
        })
    }

    /// Iterate over the metadata of every state variable
    pub fn entries(&self) -> impl Iterator<Item = StateEntry<'_>> {
        (0..self.size()).filter_map(|i| self.entry(i))
    }

    /// Indices holding `species`, in state order
    pub fn select_species(&self, species: &str) -> Vec<usize> {
        self.select_where(|e| e.species == species)
    }

    /// Indices belonging to `compartment`, in state order
    pub fn select_compartment(&self, compartment: &str) -> Vec<usize> {
        self.index
            .get(compartment)
            .map(|row| row.values().copied().collect())
            .unwrap_or_default()
    }

    /// Indices whose metadata satisfies `predicate`
    ///
    /// ```rust,ignore
    /// // all "A" molecules in the upper half of the box
    /// let upper = state.select_where(|e| e.species == "A" && e.position.is_some_and(|p| p[2] > 5.0));
    /// ```
    pub fn select_where(&self, predicate: impl Fn(&StateEntry<'_>) -> bool) -> Vec<usize> {
        self.entries().filter(|e| predicate(e)).map(|e| e.index).collect()
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{
        BoundingBox, Compartment, CompartmentSelection, IsotropicConnection, Model, Reaction, Species,
    };

    fn two_box_model() -> FlatModel {
        let a = Compartment::with_bounds("a", BoundingBox::from_internal("a", [0.0; 3], [1.0; 3]).unwrap()).unwrap();
        let b = Compartment::with_bounds(
            "b",
            BoundingBox::from_internal("b", [1.0, 0.0, 0.0], [2.0, 1.0, 1.0]).unwrap(),
        )
        .unwrap();
        let mut model = Model::new([], [a, b]).unwrap();
        model
            .connect("a", "b", IsotropicConnection::from_internal([("D", 1.0)]).unwrap().into())
            .unwrap();

        let mut flat = model.flatten().unwrap();
        let rxn = Reaction::from_internal(
            "bind",
            &[Species::new("A"), Species::new("B")],
            &[Species::new("C")],
            &[1, 1],
            &[1],
            1.0,
            0.5,
        )
        .unwrap();
        flat.add_rxn(&rxn, CompartmentSelection::Only(vec!["a".to_string()])).unwrap();
        flat
    }

    #[test]
    fn test_state_order_follows_first_appearance() {
        let state = State::from_flat(&two_box_model());

        assert_eq!(state.size(), 5);
        assert_eq!(state.species(), &["A", "B", "C", "D", "D"]);
        assert_eq!(state.compartments(), &["a", "a", "a", "a", "b"]);
        assert_eq!(state.index_of("a", "C"), Some(2));
        assert_eq!(state.index_of("b", "D"), Some(4));
        assert_eq!(state.index_of("b", "A"), None);
        assert!(state.q_val().iter().all(|&q| q == 0.0));
    }

    #[test]
    fn test_selection_helpers() {
        let state = State::from_flat(&two_box_model());

        assert_eq!(state.select_species("D"), vec![3, 4]);
        assert_eq!(state.select_compartment("a"), vec![0, 1, 2, 3]);
        assert!(state.select_compartment("missing").is_empty());

        let right_half = state.select_where(|e| e.position.is_some_and(|p| p[0] > 1.0));
        assert_eq!(right_half, vec![4]);
    }

    #[test]
    fn test_entry_metadata() {
        let state = State::from_flat(&two_box_model());
        let entry = state.entry(4).unwrap();
        assert_eq!(entry.compartment, "b");
        assert_eq!(entry.species, "D");
        assert_eq!(entry.position, Some([1.5, 0.5, 0.5]));
        assert!(state.entry(5).is_none());
    }

    #[test]
    fn test_set_q_val_checks_length() {
        let mut state = State::from_flat(&two_box_model());
        assert!(state.set_q_val(DVector::from_element(5, 2.0)).is_ok());
        assert_eq!(state.q_val()[3], 2.0);
        assert!(matches!(
            state.set_q_val(DVector::zeros(2)),
            Err(Error::StateIndexOutOfRange { index: 2, size: 5 })
        ));
    }
}
