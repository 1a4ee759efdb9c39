//! Regular 3-D grids of compartments
//!
//! A [`CompartmentArray3D`] is built from per-axis bin edges. Every cell is
//! a [`Compartment`] with a bounding box, and nearest neighbors are connected
//! with one shared connection template. Periodic axes wrap around, so the
//! first and last layer along such an axis are neighbors too.
//!
//! ```text
//!   x_edges:  e₀   e₁   e₂   e₃          cells along x: 0, 1, 2
//!             |----|----|----|           periodic x: 2 ↔ 0 connected
//! ```
//!
//! Member IDs are `i_j_k`; once flattened they become `{array_id}-{i}_{j}_{k}`.

use ndarray::Array3;

use crate::error::{Error, Result};
use crate::network::compartment::{grid_id, qualified_id, BoundingBox, Compartment};
use crate::network::connection::Connection;
use crate::network::species::Reaction;
use crate::units::{Quantity, UnitContext};

/// Relative tolerance used when comparing bin edges of two arrays
const EDGE_TOLERANCE: f64 = 1e-9;

/// Face of an array along which another array is appended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinSide {
    XMinus,
    XPlus,
    YMinus,
    YPlus,
    ZMinus,
    ZPlus,
}

impl JoinSide {
    /// Axis perpendicular to the face (0 = x, 1 = y, 2 = z)
    pub fn axis(&self) -> usize {
        match self {
            JoinSide::XMinus | JoinSide::XPlus => 0,
            JoinSide::YMinus | JoinSide::YPlus => 1,
            JoinSide::ZMinus | JoinSide::ZPlus => 2,
        }
    }

    /// True for the high-coordinate face
    pub fn is_plus(&self) -> bool {
        matches!(self, JoinSide::XPlus | JoinSide::YPlus | JoinSide::ZPlus)
    }
}

impl std::str::FromStr for JoinSide {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "x-" => Ok(JoinSide::XMinus),
            "x+" => Ok(JoinSide::XPlus),
            "y-" => Ok(JoinSide::YMinus),
            "y+" => Ok(JoinSide::YPlus),
            "z-" => Ok(JoinSide::ZMinus),
            "z+" => Ok(JoinSide::ZPlus),
            other => Err(format!("unknown join side '{other}', expected one of x-, x+, y-, y+, z-, z+")),
        }
    }
}

/// A regular grid of compartments sharing one nearest-neighbor connection
#[derive(Debug, Clone)]
pub struct CompartmentArray3D {
    array_id: String,
    edges: [Vec<f64>; 3],
    periodic: [bool; 3],
    compartments: Array3<Compartment>,
}

impl CompartmentArray3D {
    /// Build the grid from dimensioned bin edges
    ///
    /// Each axis needs at least two edges (one bin); edges must be strictly
    /// increasing.
    ///
    /// # Example
    ///
    /// ```rust
    /// use rxn_rs::network::{CompartmentArray3D, IsotropicConnection};
    /// use rxn_rs::units::{self, UnitContext};
    ///
    /// let ctx = UnitContext::default();
    /// let nm = units::NANOMETER;
    /// let edges: Vec<_> = [0.0, 10.0, 20.0].iter().map(|&e| e * nm).collect();
    /// let conn = IsotropicConnection::new(&ctx, [("A", 1e-20 * (units::LITER / units::SECOND))]).unwrap();
    ///
    /// let array = CompartmentArray3D::new(
    ///     &ctx, "grid", &edges, &edges, &[0.0 * nm, 5.0 * nm], conn.into(), [true, true, false],
    /// ).unwrap();
    /// assert_eq!(array.shape(), [2, 2, 1]);
    /// ```
    pub fn new(
        ctx: &UnitContext,
        array_id: impl Into<String>,
        x_edges: &[Quantity],
        y_edges: &[Quantity],
        z_edges: &[Quantity],
        connection: Connection,
        periodic: [bool; 3],
    ) -> Result<Self> {
        let convert = |edges: &[Quantity]| -> Result<Vec<f64>> { edges.iter().map(|e| ctx.length(e)).collect() };
        let edges = [convert(x_edges)?, convert(y_edges)?, convert(z_edges)?];
        Self::from_internal(array_id, edges, connection, periodic)
    }

    /// Build the grid from bin edges already in dm
    pub fn from_internal(
        array_id: impl Into<String>,
        edges: [Vec<f64>; 3],
        connection: Connection,
        periodic: [bool; 3],
    ) -> Result<Self> {
        let array_id = array_id.into();

        // ====== Step 1: Validate edges ======

        for (axis, axis_edges) in edges.iter().enumerate() {
            if axis_edges.len() < 2 {
                return Err(Error::InvalidGeometry {
                    id: array_id,
                    detail: format!("axis {axis} needs at least 2 bin edges, got {}", axis_edges.len()),
                });
            }
            if axis_edges.windows(2).any(|w| !(w[1] > w[0]) || !w[0].is_finite() || !w[1].is_finite()) {
                return Err(Error::InvalidGeometry {
                    id: array_id,
                    detail: format!("bin edges along axis {axis} must be finite and strictly increasing"),
                });
            }
        }

        // ====== Step 2: Build cells ======

        let shape = [edges[0].len() - 1, edges[1].len() - 1, edges[2].len() - 1];
        let mut cells = Vec::with_capacity(shape[0] * shape[1] * shape[2]);
        for i in 0..shape[0] {
            for j in 0..shape[1] {
                for k in 0..shape[2] {
                    let index = [i, j, k];
                    let local_id = grid_id(index);
                    let bounds = BoundingBox::from_internal(
                        &local_id,
                        [edges[0][i], edges[1][j], edges[2][k]],
                        [edges[0][i + 1], edges[1][j + 1], edges[2][k + 1]],
                    )?;
                    let mut compartment = Compartment::with_bounds(local_id, bounds)?;
                    compartment.set_array_position(&array_id, index);
                    cells.push(compartment);
                }
            }
        }

        let compartments = Array3::from_shape_vec((shape[0], shape[1], shape[2]), cells).map_err(|e| {
            Error::InvalidGeometry {
                id: array_id.clone(),
                detail: e.to_string(),
            }
        })?;

        let mut array = Self {
            array_id,
            edges,
            periodic,
            compartments,
        };

        // ====== Step 3: Nearest-neighbor connections ======

        array.connect_neighbors(&connection);

        Ok(array)
    }

    /// Connect every cell to its ±1 neighbor on each axis
    ///
    /// The `+` direction holds `connection`, the `-` direction its reverse,
    /// so anisotropic templates stay consistent across the grid.
    fn connect_neighbors(&mut self, connection: &Connection) {
        let shape = self.shape();
        let reversed = connection.reverse();

        for i in 0..shape[0] {
            for j in 0..shape[1] {
                for k in 0..shape[2] {
                    let index = [i, j, k];
                    for axis in 0..3 {
                        for (step_up, conn) in [(true, connection), (false, &reversed)] {
                            let Some(neighbor) = self.neighbor(index, axis, step_up) else {
                                continue;
                            };
                            let neighbor_id = qualified_id(Some(&self.array_id), &grid_id(neighbor));
                            let cell = &mut self.compartments[index];
                            // with two periodic cells both directions reach the same neighbor
                            if !cell.connections().contains_key(&neighbor_id) {
                                cell.connect(neighbor_id, conn.clone(), false);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Neighbor index along `axis`, wrapping on periodic axes
    fn neighbor(&self, index: [usize; 3], axis: usize, step_up: bool) -> Option<[usize; 3]> {
        let n = self.shape()[axis];
        let pos = index[axis];
        let next = match (step_up, self.periodic[axis]) {
            (true, _) if pos + 1 < n => pos + 1,
            (true, true) => 0,
            (false, _) if pos > 0 => pos - 1,
            (false, true) => n - 1,
            _ => return None,
        };
        if next == pos {
            return None;
        }
        let mut neighbor = index;
        neighbor[axis] = next;
        Some(neighbor)
    }

    pub fn id(&self) -> &str {
        &self.array_id
    }

    /// Number of cells along each axis
    pub fn shape(&self) -> [usize; 3] {
        let (nx, ny, nz) = self.compartments.dim();
        [nx, ny, nz]
    }

    pub fn periodic(&self) -> [bool; 3] {
        self.periodic
    }

    /// Bin edges along `axis` (dm)
    pub fn edges(&self, axis: usize) -> &[f64] {
        &self.edges[axis]
    }

    /// Total extent along each axis (dm)
    pub fn box_len(&self) -> [f64; 3] {
        std::array::from_fn(|axis| {
            let e = &self.edges[axis];
            e[e.len() - 1] - e[0]
        })
    }

    pub fn compartment(&self, index: [usize; 3]) -> Option<&Compartment> {
        self.compartments.get(index)
    }

    pub fn compartments(&self) -> &Array3<Compartment> {
        &self.compartments
    }

    /// Add a reaction to every member of the array
    pub fn add_rxn_to_array(&mut self, reaction: &Reaction) {
        for compartment in self.compartments.iter_mut() {
            compartment.add_reaction(reaction.clone());
        }
    }

    /// Join `other` face to face on the given side of this array
    ///
    /// The face layer of `self` on `side` is connected cell by cell to the
    /// opposite face layer of `other`. Cells of `self` hold `connection`,
    /// cells of `other` hold its reverse.
    ///
    /// # Errors
    ///
    /// [`Error::IncompatibleArrays`] when the arrays share an ID or their
    /// bins differ along the two axes parallel to the face.
    pub fn join3d(&mut self, other: &mut CompartmentArray3D, connection: Connection, side: JoinSide) -> Result<()> {
        let incompatible = |detail: String| Error::IncompatibleArrays {
            first: self.array_id.clone(),
            second: other.array_id.clone(),
            detail,
        };

        if self.array_id == other.array_id {
            return Err(incompatible("an array cannot be joined to itself".to_string()));
        }

        let axis = side.axis();
        let (self_shape, other_shape) = (self.shape(), other.shape());
        for parallel in (0..3).filter(|&a| a != axis) {
            if self_shape[parallel] != other_shape[parallel] {
                return Err(incompatible(format!(
                    "{} bins along axis {parallel} vs {}",
                    self_shape[parallel], other_shape[parallel]
                )));
            }
            let matching = self.edges[parallel]
                .iter()
                .zip(&other.edges[parallel])
                .all(|(a, b)| (a - b).abs() <= EDGE_TOLERANCE * a.abs().max(b.abs()).max(f64::MIN_POSITIVE));
            if !matching {
                return Err(incompatible(format!("bin edges differ along axis {parallel}")));
            }
        }

        let (self_layer, other_layer) = if side.is_plus() {
            (self_shape[axis] - 1, 0)
        } else {
            (0, other_shape[axis] - 1)
        };
        let reversed = connection.reverse();

        // iterate over the face: the two axes parallel to it
        let (a1, a2) = match axis {
            0 => (1, 2),
            1 => (0, 2),
            _ => (0, 1),
        };
        for u in 0..self_shape[a1] {
            for v in 0..self_shape[a2] {
                let mut self_index = [0; 3];
                self_index[axis] = self_layer;
                self_index[a1] = u;
                self_index[a2] = v;

                let mut other_index = self_index;
                other_index[axis] = other_layer;

                let self_id = qualified_id(Some(&self.array_id), &grid_id(self_index));
                let other_id = qualified_id(Some(&other.array_id), &grid_id(other_index));

                self.compartments[self_index].connect(other_id, connection.clone(), true);
                other.compartments[other_index].connect(self_id, reversed.clone(), true);
            }
        }

        log::debug!(
            "joined array '{}' to side {:?} of array '{}'",
            other.array_id,
            side,
            self.array_id
        );
        Ok(())
    }

    /// Member addressed by its fully-qualified ID (`{array_id}-{i}_{j}_{k}`)
    pub(crate) fn find_mut(&mut self, qualified: &str) -> Option<&mut Compartment> {
        let local = qualified.strip_prefix(self.array_id.as_str())?.strip_prefix('-')?;
        let mut parts = local.split('_').map(|p| p.parse::<usize>().ok());
        let index = [parts.next()??, parts.next()??, parts.next()??];
        if parts.next().is_some() {
            return None;
        }
        self.compartments.get_mut(index)
    }
}

// =================================================================================================
// Tests
// =================================================================================================
