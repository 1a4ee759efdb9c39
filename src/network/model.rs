//! Compartment graphs and their flattened form
//!
//! A [`Model`] holds standalone compartments and compartment arrays. It must
//! be lowered into a [`FlatModel`] before it can be simulated:
//!
//! 1. every compartment is copied into one namespace under its
//!    fully-qualified ID (`{array_id}-{i}_{j}_{k}` or the bare ID)
//! 2. every connection target is checked to exist
//! 3. every Ficks connection is resolved into rate constants, deriving the
//!    adjoining surface area and the minimum-image center distance from
//!    compartment geometry when they are not given
//! 4. every connection is checked against its reverse
//!
//! Flattening never mutates the source model and either returns a complete
//! flat model or an error.

use indexmap::{IndexMap, IndexSet};

use crate::error::{Error, Result};
use crate::network::array::CompartmentArray3D;
use crate::network::compartment::Compartment;
use crate::network::connection::{Connection, FicksConnection, IsotropicConnection, ResolvedConnection};
use crate::network::species::Reaction;

/// Relative tolerance for geometric contact and rate symmetry
const TOLERANCE: f64 = 1e-9;

/// Resolved transport table: `from → to → rates`
pub type TransportTable = IndexMap<String, IndexMap<String, ResolvedConnection>>;

// =================================================================================================
// Model
// =================================================================================================

/// A graph of compartments and compartment arrays
///
/// All arrays must share the same periodicity. Along periodic axes their box
/// lengths must agree; along non-periodic axes the box lengths add up, as
/// arrays are assumed to be stacked.
#[derive(Debug, Clone, Default)]
pub struct Model {
    arrays: IndexMap<String, CompartmentArray3D>,
    compartments: IndexMap<String, Compartment>,
    periodic: Option<[bool; 3]>,
    box_len: Option<[f64; 3]>,
}

impl Model {
    /// Build a model from arrays and standalone compartments
    pub fn new(
        arrays: impl IntoIterator<Item = CompartmentArray3D>,
        compartments: impl IntoIterator<Item = Compartment>,
    ) -> Result<Self> {
        let mut model = Self::default();
        for array in arrays {
            model.add_array(array)?;
        }
        for compartment in compartments {
            model.add_compartment(compartment)?;
        }
        Ok(model)
    }

    /// Add a compartment array
    ///
    /// # Errors
    ///
    /// - [`Error::IncompatiblePeriodicity`] if the array's periodicity
    ///   differs from the model's
    /// - [`Error::PeriodicBoxMismatch`] if its box length differs along a
    ///   periodic axis
    /// - [`Error::DuplicateArray`] if an array with the same ID exists
    ///
    /// The model is unchanged on error.
    pub fn add_array(&mut self, array: CompartmentArray3D) -> Result<()> {
        let found_periodic = array.periodic();
        let found_len = array.box_len();

        if let Some(existing) = self.periodic
            && existing != found_periodic
        {
            return Err(Error::IncompatiblePeriodicity {
                existing,
                found: found_periodic,
            });
        }

        let box_len = match self.box_len {
            None => found_len,
            Some(mut box_len) => {
                for axis in 0..3 {
                    if box_len[axis] == found_len[axis] {
                        continue;
                    }
                    if found_periodic[axis] {
                        return Err(Error::PeriodicBoxMismatch {
                            axis,
                            existing: box_len[axis],
                            found: found_len[axis],
                        });
                    }
                    // stacked arrays
                    box_len[axis] += found_len[axis];
                }
                box_len
            }
        };

        if self.arrays.contains_key(array.id()) {
            return Err(Error::DuplicateArray(array.id().to_string()));
        }

        self.periodic = Some(found_periodic);
        self.box_len = Some(box_len);
        self.arrays.insert(array.id().to_string(), array);
        Ok(())
    }

    /// Add a standalone compartment
    pub fn add_compartment(&mut self, compartment: Compartment) -> Result<()> {
        if self.compartments.contains_key(compartment.id()) {
            return Err(Error::DuplicateCompartment(compartment.id().to_string()));
        }
        self.compartments.insert(compartment.id().to_string(), compartment);
        Ok(())
    }

    /// Connect two compartments of the model, addressed by qualified ID
    ///
    /// `first` holds `connection`, `second` holds its reverse. Existing
    /// connections between the two are replaced with a warning.
    pub fn connect(&mut self, first: &str, second: &str, connection: Connection) -> Result<()> {
        for id in [first, second] {
            if self.compartment_mut(id).is_none() {
                return Err(Error::UnknownCompartment(id.to_string()));
            }
        }

        let reversed = connection.reverse();
        if let Some(c) = self.compartment_mut(first) {
            c.connect(second, connection, true);
        }
        if let Some(c) = self.compartment_mut(second) {
            c.connect(first, reversed, true);
        }
        Ok(())
    }

    fn compartment_mut(&mut self, qualified: &str) -> Option<&mut Compartment> {
        if let Some(c) = self.compartments.get_mut(qualified) {
            return Some(c);
        }
        self.arrays.values_mut().find_map(|array| array.find_mut(qualified))
    }

    pub fn arrays(&self) -> &IndexMap<String, CompartmentArray3D> {
        &self.arrays
    }

    pub fn compartments(&self) -> &IndexMap<String, Compartment> {
        &self.compartments
    }

    /// Mutable access to a standalone compartment
    pub fn compartment_mut_by_id(&mut self, id: &str) -> Option<&mut Compartment> {
        self.compartments.get_mut(id)
    }

    /// Mutable access to an array
    pub fn array_mut(&mut self, id: &str) -> Option<&mut CompartmentArray3D> {
        self.arrays.get_mut(id)
    }

    /// Shared periodicity (all `false` without arrays)
    pub fn periodic(&self) -> [bool; 3] {
        self.periodic.unwrap_or([false; 3])
    }

    /// Box extents in dm (zero without arrays)
    pub fn box_len(&self) -> [f64; 3] {
        self.box_len.unwrap_or([0.0; 3])
    }

    /// Lower the model into a [`FlatModel`] with all connections resolved
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateCompartment`] for clashing qualified IDs
    /// - [`Error::MissingCompartments`] listing every missing connection target
    /// - geometric errors while resolving Ficks connections
    /// - [`Error::AsymmetricConnection`] if a connection disagrees with its reverse
    pub fn flatten(&self) -> Result<FlatModel> {
        let periodic = self.periodic();
        let box_len = self.box_len();

        // ====== Step 1: One namespace ======

        let mut compartments: IndexMap<String, Compartment> = IndexMap::new();
        let members = self
            .compartments
            .values()
            .cloned()
            .chain(self.arrays.values().flat_map(|a| a.compartments().iter().cloned()));
        for compartment in members {
            let flat = compartment.into_flat();
            if compartments.contains_key(flat.id()) {
                return Err(Error::DuplicateCompartment(flat.id().to_string()));
            }
            compartments.insert(flat.id().to_string(), flat);
        }

        // ====== Step 2: Referential integrity ======

        let missing = missing_references(&compartments);
        if !missing.is_empty() {
            return Err(Error::MissingCompartments(missing));
        }

        // ====== Step 3: Concrete connections ======

        let mut transport: TransportTable = compartments
            .keys()
            .map(|id| (id.clone(), IndexMap::new()))
            .collect();
        let mut pending: Vec<(String, String, FicksConnection)> = Vec::new();

        for (id, compartment) in &compartments {
            for (neighbor, conn) in compartment.connections() {
                match conn {
                    Connection::Ficks(ficks) => pending.push((id.clone(), neighbor.clone(), ficks.clone())),
                    other => {
                        if let (Some(resolved), Some(row)) = (other.resolved(), transport.get_mut(id)) {
                            row.insert(neighbor.clone(), resolved);
                        }
                    }
                }
            }
        }

        // ====== Step 4: Ficks connections ======

        let geometry = Geometry { periodic, box_len };
        for (id, neighbor, ficks) in &pending {
            let (Some(c1), Some(c2)) = (compartments.get(id), compartments.get(neighbor)) else {
                continue;
            };
            let resolved = geometry.resolve_ficks(c1, c2, ficks)?;

            // geometry-derived rates replace both directions silently
            for (from, to) in [(id, neighbor), (neighbor, id)] {
                if let Some(row) = transport.get_mut(from) {
                    row.insert(to.clone(), ResolvedConnection::from(resolved.clone()));
                }
                if let Some(c) = compartments.get_mut(from) {
                    c.connect(to.clone(), Connection::Isotropic(resolved.clone()), false);
                }
            }
        }

        // ====== Step 5: Symmetry ======

        check_symmetry(&transport)?;

        log::debug!(
            "flattened model: {} compartments ({} from {} arrays), {} directed connections, {} Ficks resolved",
            compartments.len(),
            compartments.len() - self.compartments.len(),
            self.arrays.len(),
            transport.values().map(IndexMap::len).sum::<usize>(),
            pending.len()
        );

        Ok(FlatModel {
            compartments,
            transport,
            periodic,
            box_len,
        })
    }
}

/// Every connection target that is not a key of `compartments`, in order of
/// first reference
fn missing_references(compartments: &IndexMap<String, Compartment>) -> Vec<String> {
    let mut missing = IndexSet::new();
    for compartment in compartments.values() {
        for neighbor in compartment.connections().keys() {
            if !compartments.contains_key(neighbor) {
                missing.insert(neighbor.clone());
            }
        }
    }
    missing.into_iter().collect()
}

fn check_symmetry(transport: &TransportTable) -> Result<()> {
    for (from, row) in transport {
        for (to, conn) in row {
            let asymmetric = |species: &str, detail: String| Error::AsymmetricConnection {
                from: from.clone(),
                to: to.clone(),
                species: species.to_string(),
                detail,
            };

            let Some(reverse) = transport.get(to).and_then(|r| r.get(from)) else {
                let species = conn.species_rates().keys().next().map(String::as_str).unwrap_or("");
                return Err(asymmetric(species, format!("no connection from '{to}' back to '{from}'")));
            };

            for (species, &(k_out, k_in)) in conn.species_rates() {
                let Some((rev_out, rev_in)) = reverse.rates(species) else {
                    return Err(asymmetric(species, "species missing from the reverse connection".to_string()));
                };
                if !close(k_out, rev_in) || !close(k_in, rev_out) {
                    return Err(asymmetric(
                        species,
                        format!("({k_out}, {k_in}) is not mirrored by ({rev_out}, {rev_in})"),
                    ));
                }
            }
        }
    }
    Ok(())
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= TOLERANCE * a.abs().max(b.abs())
}

// =================================================================================================
// Geometry
// =================================================================================================

/// Periodic box used to derive Ficks geometry
struct Geometry {
    periodic: [bool; 3],
    box_len: [f64; 3],
}

impl Geometry {
    fn resolve_ficks(
        &self,
        c1: &Compartment,
        c2: &Compartment,
        ficks: &FicksConnection,
    ) -> Result<IsotropicConnection> {
        let surface_area = match ficks.surface_area() {
            Some(_) => None,
            None => Some(self.adjoining_area(c1, c2)?),
        };
        let distance = match ficks.ic_distance() {
            Some(_) => None,
            None => Some(self.min_image_distance(c1, c2)?),
        };
        ficks.bind_geometry(surface_area, distance).resolve()
    }

    /// Image shifts to consider along `axis`
    fn shifts(&self, axis: usize) -> Vec<f64> {
        if self.periodic[axis] {
            vec![0.0, self.box_len[axis], -self.box_len[axis]]
        } else {
            vec![0.0]
        }
    }

    /// Minimum face area across the single axis on which the boxes touch
    fn adjoining_area(&self, c1: &Compartment, c2: &Compartment) -> Result<f64> {
        let b1 = c1.bounds().ok_or_else(|| Error::MissingGeometry(c1.id().to_string()))?;
        let b2 = c2.bounds().ok_or_else(|| Error::MissingGeometry(c2.id().to_string()))?;
        let (e1, e2) = (b1.extent(), b2.extent());

        let touches = |axis: usize| {
            let tol = TOLERANCE * e1[axis].max(e2[axis]);
            self.shifts(axis).iter().any(|s| {
                (b1.max[axis] - (b2.min[axis] + s)).abs() <= tol || (b1.min[axis] - (b2.max[axis] + s)).abs() <= tol
            })
        };
        let overlaps = |axis: usize| {
            let tol = TOLERANCE * e1[axis].max(e2[axis]);
            self.shifts(axis).iter().any(|s| {
                let overlap = b1.max[axis].min(b2.max[axis] + s) - b1.min[axis].max(b2.min[axis] + s);
                overlap > tol
            })
        };

        let candidates: Vec<usize> = (0..3)
            .filter(|&axis| touches(axis) && (0..3).filter(|&o| o != axis).all(|o| overlaps(o)))
            .collect();

        match candidates.as_slice() {
            [axis] => Ok(b1.face_area(*axis).min(b2.face_area(*axis))),
            [] => Err(Error::NoAdjoiningFace {
                first: c1.id().to_string(),
                second: c2.id().to_string(),
                detail: format!("boxes {b1:?} and {b2:?} share no face"),
            }),
            many => Err(Error::NoAdjoiningFace {
                first: c1.id().to_string(),
                second: c2.id().to_string(),
                detail: format!("boxes touch along several axes {many:?}"),
            }),
        }
    }

    /// Center-to-center distance, wrapped per periodic axis
    fn min_image_distance(&self, c1: &Compartment, c2: &Compartment) -> Result<f64> {
        let p1 = c1.position().ok_or_else(|| Error::MissingGeometry(c1.id().to_string()))?;
        let p2 = c2.position().ok_or_else(|| Error::MissingGeometry(c2.id().to_string()))?;

        let mut sum = 0.0;
        for axis in 0..3 {
            let mut d = p1[axis] - p2[axis];
            if self.periodic[axis] {
                let len = self.box_len[axis];
                if 2.0 * d < -len {
                    d += len;
                } else if 2.0 * d > len {
                    d -= len;
                }
            }
            sum += d * d;
        }
        Ok(sum.sqrt())
    }
}

// =================================================================================================
// FlatModel
// =================================================================================================

/// Compartments to which [`FlatModel::add_rxn`] applies a reaction
#[derive(Debug, Clone, PartialEq)]
pub enum CompartmentSelection {
    All,
    Only(Vec<String>),
}

/// A flat set of compartments with concrete transport rate constants
///
/// Keys are fully-qualified compartment IDs. The transport table holds only
/// [`ResolvedConnection`]s and is symmetric: for every `a → b` entry there
/// is a `b → a` entry with swapped rates.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatModel {
    compartments: IndexMap<String, Compartment>,
    transport: TransportTable,
    periodic: [bool; 3],
    box_len: [f64; 3],
}

impl FlatModel {
    pub fn compartments(&self) -> &IndexMap<String, Compartment> {
        &self.compartments
    }

    pub fn compartment(&self, id: &str) -> Option<&Compartment> {
        self.compartments.get(id)
    }

    pub fn len(&self) -> usize {
        self.compartments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compartments.is_empty()
    }

    pub fn transport(&self) -> &TransportTable {
        &self.transport
    }

    /// Resolved connection from `from` to `to`, as seen from `from`
    pub fn connection(&self, from: &str, to: &str) -> Option<&ResolvedConnection> {
        self.transport.get(from)?.get(to)
    }

    /// Neighbors of `id` with the connection seen from `id`
    pub fn neighbors<'a>(&'a self, id: &str) -> impl Iterator<Item = (&'a str, &'a ResolvedConnection)> + 'a {
        self.transport
            .get(id)
            .into_iter()
            .flat_map(|row| row.iter().map(|(to, conn)| (to.as_str(), conn)))
    }

    pub fn periodic(&self) -> [bool; 3] {
        self.periodic
    }

    pub fn box_len(&self) -> [f64; 3] {
        self.box_len
    }

    /// Connection targets that are not part of the model
    ///
    /// Always empty for a model produced by [`Model::flatten`].
    pub fn find_missing_compartments(&self) -> Vec<String> {
        missing_references(&self.compartments)
    }

    /// Add a reaction to a selection of compartments
    ///
    /// # Errors
    ///
    /// [`Error::UnknownCompartment`] if a selected ID does not exist; no
    /// compartment is modified in that case.
    pub fn add_rxn(&mut self, reaction: &Reaction, selection: CompartmentSelection) -> Result<()> {
        match selection {
            CompartmentSelection::All => {
                for compartment in self.compartments.values_mut() {
                    compartment.add_reaction(reaction.clone());
                }
            }
            CompartmentSelection::Only(ids) => {
                if let Some(unknown) = ids.iter().find(|id| !self.compartments.contains_key(id.as_str())) {
                    return Err(Error::UnknownCompartment(unknown.clone()));
                }
                for id in &ids {
                    if let Some(compartment) = self.compartments.get_mut(id) {
                        compartment.add_reaction(reaction.clone());
                    }
                }
            }
        }
        Ok(())
    }
}

// =================================================================================================
// Tests
// =================================================================================================
