//! Well-mixed compartments
//!
//! A compartment is a unit volume where all species are assumed to be
//! perfectly mixed. It holds its reactions and, keyed by neighbor ID, the
//! connections through which species move to adjacent compartments.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::network::connection::Connection;
use crate::network::species::Reaction;
use crate::units::{Quantity, UnitContext};

// =================================================================================================
// Bounding box
// =================================================================================================

/// Axis-aligned box in internal length units (dm)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Lower corner `[x, y, z]`
    pub min: [f64; 3],

    /// Upper corner `[x, y, z]`
    pub max: [f64; 3],
}

impl BoundingBox {
    /// Create a box from per-axis `(min, max)` lengths
    ///
    /// # Errors
    ///
    /// - [`Error::Dimension`] if a bound is not a length
    /// - [`Error::InvalidGeometry`] if `max <= min` on some axis
    pub fn new(ctx: &UnitContext, id: &str, ranges: [(Quantity, Quantity); 3]) -> Result<Self> {
        let mut min = [0.0; 3];
        let mut max = [0.0; 3];
        for (axis, (lo, hi)) in ranges.iter().enumerate() {
            min[axis] = ctx.length(lo)?;
            max[axis] = ctx.length(hi)?;
        }
        Self::from_internal(id, min, max)
    }

    /// Create a box from corners already in dm
    pub fn from_internal(id: &str, min: [f64; 3], max: [f64; 3]) -> Result<Self> {
        for axis in 0..3 {
            if !min[axis].is_finite() || !max[axis].is_finite() || max[axis] <= min[axis] {
                return Err(Error::InvalidGeometry {
                    id: id.to_string(),
                    detail: format!(
                        "axis {axis} must satisfy min < max, got [{}, {}]",
                        min[axis], max[axis]
                    ),
                });
            }
        }
        Ok(Self { min, max })
    }

    /// Edge lengths `[dx, dy, dz]`
    pub fn extent(&self) -> [f64; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    pub fn center(&self) -> [f64; 3] {
        [
            0.5 * (self.min[0] + self.max[0]),
            0.5 * (self.min[1] + self.max[1]),
            0.5 * (self.min[2] + self.max[2]),
        ]
    }

    /// Box volume in L
    pub fn volume(&self) -> f64 {
        let [dx, dy, dz] = self.extent();
        dx * dy * dz
    }

    /// Area of the faces perpendicular to `axis` (dm²)
    pub fn face_area(&self, axis: usize) -> f64 {
        let e = self.extent();
        e[(axis + 1) % 3] * e[(axis + 2) % 3]
    }
}

// =================================================================================================
// Compartment
// =================================================================================================

/// Fully-qualified compartment ID as used in a flat model
///
/// ```rust
/// use rxn_rs::network::qualified_id;
///
/// assert_eq!(qualified_id(Some("bulk"), "0_0_1"), "bulk-0_0_1");
/// assert_eq!(qualified_id(None, "cell"), "cell");
/// ```
pub fn qualified_id(array_id: Option<&str>, id: &str) -> String {
    match array_id {
        Some(array_id) => format!("{array_id}-{id}"),
        None => id.to_string(),
    }
}

/// Local ID of a grid cell, `i_j_k`
pub fn grid_id(index: [usize; 3]) -> String {
    format!("{}_{}_{}", index[0], index[1], index[2])
}

/// A well-mixed volume with reactions and connections to its neighbors
#[derive(Debug, Clone, PartialEq)]
pub struct Compartment {
    id: String,
    array_id: Option<String>,
    array_index: Option<[usize; 3]>,
    volume: f64,
    bounds: Option<BoundingBox>,
    reactions: Vec<Reaction>,
    connections: IndexMap<String, Connection>,
}

impl Compartment {
    /// Create a standalone compartment from a volume
    ///
    /// # Example
    ///
    /// ```rust
    /// use rxn_rs::network::Compartment;
    /// use rxn_rs::units::{self, UnitContext};
    ///
    /// let ctx = UnitContext::default();
    /// let cell = Compartment::new(&ctx, "cell", 2.0 * units::FEMTOLITER).unwrap();
    /// assert!((cell.volume() - 2e-15).abs() < 1e-27);
    /// ```
    pub fn new(ctx: &UnitContext, id: impl Into<String>, volume: Quantity) -> Result<Self> {
        let volume = ctx.volume(&volume)?;
        Self::from_internal(id, volume)
    }

    /// Create a compartment whose volume (L) is already in internal units
    pub fn from_internal(id: impl Into<String>, volume: f64) -> Result<Self> {
        let id = id.into();
        if !volume.is_finite() || volume <= 0.0 {
            return Err(Error::InvalidGeometry {
                id,
                detail: format!("volume must be positive and finite, got {volume} L"),
            });
        }
        Ok(Self {
            id,
            array_id: None,
            array_index: None,
            volume,
            bounds: None,
            reactions: Vec::new(),
            connections: IndexMap::new(),
        })
    }

    /// Create a compartment from its bounding box; the volume is the box volume
    pub fn with_bounds(id: impl Into<String>, bounds: BoundingBox) -> Result<Self> {
        let mut compartment = Self::from_internal(id, bounds.volume())?;
        compartment.bounds = Some(bounds);
        Ok(compartment)
    }

    pub(crate) fn set_array_position(&mut self, array_id: &str, index: [usize; 3]) {
        self.array_id = Some(array_id.to_string());
        self.array_index = Some(index);
    }

    /// Rename to the fully-qualified ID and detach from the parent array
    pub(crate) fn into_flat(mut self) -> Self {
        self.id = self.qualified_id();
        self.array_id = None;
        self
    }

    /// Local ID (`i_j_k` for array members)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// `{array_id}-{id}` for array members, the bare ID otherwise
    pub fn qualified_id(&self) -> String {
        qualified_id(self.array_id.as_deref(), &self.id)
    }

    pub fn array_id(&self) -> Option<&str> {
        self.array_id.as_deref()
    }

    /// `[i, j, k]` grid index inside the parent array
    pub fn array_index(&self) -> Option<[usize; 3]> {
        self.array_index
    }

    /// Volume in L
    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn bounds(&self) -> Option<&BoundingBox> {
        self.bounds.as_ref()
    }

    /// Geometric center in dm, if the compartment has a bounding box
    pub fn position(&self) -> Option<[f64; 3]> {
        self.bounds.map(|b| b.center())
    }

    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    pub fn connections(&self) -> &IndexMap<String, Connection> {
        &self.connections
    }

    pub fn add_reaction(&mut self, reaction: Reaction) {
        self.reactions.push(reaction);
    }

    /// Connect this compartment to `neighbor_id`
    ///
    /// The reverse connection must be installed on the neighbor separately
    /// (see [`Model::connect`](crate::network::Model::connect)). When a
    /// connection to `neighbor_id` already exists it is replaced, with a
    /// warning if `warn_overwrite` is set.
    pub fn connect(&mut self, neighbor_id: impl Into<String>, connection: Connection, warn_overwrite: bool) {
        let neighbor_id = neighbor_id.into();
        if let Some(old) = self.connections.insert(neighbor_id.clone(), connection)
            && warn_overwrite
        {
            log::warn!(
                "overwriting connection {} -> {} (previous species: {:?})",
                self.id,
                neighbor_id,
                old.species()
            );
        }
    }

    /// Species IDs in first-appearance order: reaction reactants, reaction
    /// products, then connection species
    pub fn species_ids(&self) -> Vec<String> {
        let mut seen: IndexMap<String, ()> = IndexMap::new();
        for rxn in &self.reactions {
            for s in rxn.reactants() {
                seen.entry(s.id().to_string()).or_insert(());
            }
        }
        for rxn in &self.reactions {
            for s in rxn.products() {
                seen.entry(s.id().to_string()).or_insert(());
            }
        }
        for conn in self.connections.values() {
            for s in conn.species() {
                seen.entry(s.to_string()).or_insert(());
            }
        }
        seen.into_keys().collect()
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::connection::IsotropicConnection;
    use crate::network::species::Species;
    use crate::units;
    use approx::assert_relative_eq;

    fn unit_box() -> BoundingBox {
        BoundingBox::from_internal("box", [0.0, 0.0, 0.0], [1.0, 2.0, 3.0]).unwrap()
    }

    #[test]
    fn test_bounding_box_geometry() {
        let b = unit_box();
        assert_eq!(b.extent(), [1.0, 2.0, 3.0]);
        assert_eq!(b.center(), [0.5, 1.0, 1.5]);
        assert_relative_eq!(b.volume(), 6.0);
        assert_relative_eq!(b.face_area(0), 6.0);
        assert_relative_eq!(b.face_area(1), 3.0);
        assert_relative_eq!(b.face_area(2), 2.0);
    }

    #[test]
    fn test_bounding_box_from_quantities() {
        let ctx = UnitContext::default();
        let nm = units::NANOMETER;
        let b = BoundingBox::new(&ctx, "b", [(0.0 * nm, 10.0 * nm), (0.0 * nm, 10.0 * nm), (0.0 * nm, 10.0 * nm)])
            .unwrap();
        // 10 nm = 1e-7 dm → (1e-7)^3 L
        assert_relative_eq!(b.volume(), 1e-21, max_relative = 1e-10);
    }

    #[test]
    fn test_degenerate_box_is_rejected() {
        let err = BoundingBox::from_internal("flat", [0.0, 0.0, 0.0], [1.0, 0.0, 1.0]).unwrap_err();
        assert!(matches!(err, Error::InvalidGeometry { ref id, .. } if id == "flat"));
    }

    #[test]
    fn test_non_positive_volume_is_rejected() {
        assert!(Compartment::from_internal("c", 0.0).is_err());
        assert!(Compartment::from_internal("c", f64::NAN).is_err());
    }

    #[test]
    fn test_with_bounds_uses_box_volume() {
        let c = Compartment::with_bounds("c", unit_box()).unwrap();
        assert_relative_eq!(c.volume(), 6.0);
        assert_eq!(c.position(), Some([0.5, 1.0, 1.5]));
    }

    #[test]
    fn test_qualified_id_of_array_member() {
        let mut c = Compartment::from_internal(grid_id([1, 0, 2]), 1.0).unwrap();
        assert_eq!(c.qualified_id(), "1_0_2");
        c.set_array_position("bulk", [1, 0, 2]);
        assert_eq!(c.qualified_id(), "bulk-1_0_2");

        let flat = c.into_flat();
        assert_eq!(flat.id(), "bulk-1_0_2");
        assert_eq!(flat.array_id(), None);
        assert_eq!(flat.array_index(), Some([1, 0, 2]));
    }

    #[test]
    fn test_connect_replaces_existing() {
        let mut c = Compartment::from_internal("a", 1.0).unwrap();
        c.connect("b", IsotropicConnection::from_internal([("X", 1.0)]).unwrap().into(), true);
        c.connect("b", IsotropicConnection::from_internal([("X", 2.0)]).unwrap().into(), true);
        assert_eq!(c.connections().len(), 1);
        assert_eq!(c.connections()["b"].resolved().unwrap().rates("X"), Some((2.0, 2.0)));
    }

    #[test]
    fn test_species_first_appearance_order() {
        let mut c = Compartment::from_internal("a", 1.0).unwrap();
        let rxn = Reaction::from_internal(
            "r",
            &[Species::new("B"), Species::new("A")],
            &[Species::new("C")],
            &[1, 1],
            &[1],
            1.0,
            0.0,
        )
        .unwrap();
        c.add_reaction(rxn);
        c.connect("n", IsotropicConnection::from_internal([("D", 1.0), ("A", 1.0)]).unwrap().into(), false);

        assert_eq!(c.species_ids(), vec!["B", "A", "C", "D"]);
    }
}
