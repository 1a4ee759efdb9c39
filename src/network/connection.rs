//! Transport laws between compartments
//!
//! A connection governs transport of one or more species between two
//! compartments. When the transport is first order:
//!
//! ```text
//! dn₁/dt = -k₁₂ · n₁/V₁ + k₂₁ · n₂/V₂
//! dn₂/dt = -k₂₁ · n₂/V₂ + k₁₂ · n₁/V₁
//! ```
//!
//! where `nX` is the count of a species in compartment X, `VX` its volume
//! and `kAB` a rate constant in volume/time. All rate constants are held
//! internally in L/s, as `(k_out, k_in)` pairs seen from the compartment that
//! owns the connection.
//!
//! | Variant | Rates | Resolved? |
//! |---------|-------|-----------|
//! | [`Connection::Isotropic`] | `k_out == k_in` | yes |
//! | [`Connection::Anisotropic`] | explicit `(k_out, k_in)` | yes |
//! | [`Connection::Ficks`] | diffusion constants + geometry | no, see [`FicksConnection::resolve`] |

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::units::{Dimension, Quantity, UnitContext};

/// Per-species `(k_out, k_in)` rate constants in L/s
pub type SpeciesRates = IndexMap<String, (f64, f64)>;

fn check_rate(species: &str, k: f64) -> Result<()> {
    if !k.is_finite() || k < 0.0 {
        return Err(Error::MalformedConnection {
            species: species.to_string(),
            detail: format!("rate constants must be finite and >= 0, got {k}"),
        });
    }
    Ok(())
}

// =================================================================================================
// Isotropic
// =================================================================================================

/// Connection whose rate constant is the same in both directions
#[derive(Debug, Clone, PartialEq)]
pub struct IsotropicConnection {
    species_rates: SpeciesRates,
}

impl IsotropicConnection {
    /// Create from one volumetric rate constant (volume/time) per species
    ///
    /// # Example
    ///
    /// ```rust
    /// use rxn_rs::network::IsotropicConnection;
    /// use rxn_rs::units::{self, UnitContext};
    ///
    /// let ctx = UnitContext::default();
    /// let conn = IsotropicConnection::new(&ctx, [("drug", 1e-5 * (units::LITER / units::SECOND))]).unwrap();
    /// let (k_out, k_in) = conn.species_rates()["drug"];
    /// assert_eq!(k_out, k_in);
    /// assert!((k_out - 1e-5).abs() < 1e-18);
    /// ```
    pub fn new<S: Into<String>>(
        ctx: &UnitContext,
        rates: impl IntoIterator<Item = (S, Quantity)>,
    ) -> Result<Self> {
        let mut internal = IndexMap::new();
        for (species, k) in rates {
            let species = species.into();
            let k = ctx.to_internal(&k, Dimension::VOLUMETRIC_RATE, &format!("transport rate of '{species}'"))?;
            internal.insert(species, k);
        }
        Self::from_internal(internal)
    }

    /// Create from rate constants already in L/s
    pub fn from_internal<S: Into<String>>(rates: impl IntoIterator<Item = (S, f64)>) -> Result<Self> {
        let mut species_rates = IndexMap::new();
        for (species, k) in rates {
            let species = species.into();
            check_rate(&species, k)?;
            species_rates.insert(species, (k, k));
        }
        Ok(Self { species_rates })
    }

    pub fn species_rates(&self) -> &SpeciesRates {
        &self.species_rates
    }
}

// =================================================================================================
// Anisotropic
// =================================================================================================

/// Connection with explicit, direction-dependent rate constants
///
/// Each species maps to `(k_out, k_in)` as seen from the compartment owning
/// the connection. Care must be taken to apply it in the right direction:
/// the neighbor holds the [`reverse`](Self::reverse)d connection.
#[derive(Debug, Clone, PartialEq)]
pub struct AnisotropicConnection {
    species_rates: SpeciesRates,
}

impl AnisotropicConnection {
    /// Create from `(k_out, k_in)` volumetric rate pairs
    pub fn new<S: Into<String>>(
        ctx: &UnitContext,
        rates: impl IntoIterator<Item = (S, (Quantity, Quantity))>,
    ) -> Result<Self> {
        let mut internal = Vec::new();
        for (species, (k_out, k_in)) in rates {
            let species = species.into();
            let what = format!("transport rate of '{species}'");
            let k_out = ctx.to_internal(&k_out, Dimension::VOLUMETRIC_RATE, &what)?;
            let k_in = ctx.to_internal(&k_in, Dimension::VOLUMETRIC_RATE, &what)?;
            internal.push((species, (k_out, k_in)));
        }
        Self::from_internal(internal)
    }

    /// Create from `(k_out, k_in)` pairs already in L/s
    pub fn from_internal<S: Into<String>>(rates: impl IntoIterator<Item = (S, (f64, f64))>) -> Result<Self> {
        let mut species_rates = IndexMap::new();
        for (species, (k_out, k_in)) in rates {
            let species = species.into();
            check_rate(&species, k_out)?;
            check_rate(&species, k_in)?;
            species_rates.insert(species, (k_out, k_in));
        }
        Ok(Self { species_rates })
    }

    /// The same connection seen from the other compartment
    pub fn reverse(&self) -> Self {
        Self {
            species_rates: self
                .species_rates
                .iter()
                .map(|(s, &(k_out, k_in))| (s.clone(), (k_in, k_out)))
                .collect(),
        }
    }

    pub fn species_rates(&self) -> &SpeciesRates {
        &self.species_rates
    }
}

// =================================================================================================
// Ficks
// =================================================================================================

/// Diffusive connection derived from Fick's first law
///
/// ```text
/// F_net = D · A · ΔC / Δx = F₂₁ - F₁₂
/// F₁₂   = D · A · C₁ / Δx = C₁ · k₁₂
/// ```
///
/// so both directions share `k = D · A / Δx` (L/s). `A` is the adjoining
/// surface area and `Δx` the distance between compartment centers. When
/// either is left unset it is derived from compartment geometry during
/// [`Model::flatten`](crate::network::Model::flatten).
#[derive(Debug, Clone, PartialEq)]
pub struct FicksConnection {
    species_d_constants: IndexMap<String, f64>,
    surface_area: Option<f64>,
    ic_distance: Option<f64>,
}

impl FicksConnection {
    /// Create from one diffusion constant (length²/time) per species
    ///
    /// # Example
    ///
    /// ```rust
    /// use rxn_rs::network::FicksConnection;
    /// use rxn_rs::units::{self, UnitContext};
    ///
    /// let ctx = UnitContext::default();
    /// let d = 1e-5 * (units::CENTIMETER.powi(2) / units::SECOND);
    /// let conn = FicksConnection::new(&ctx, [("drug", d)]).unwrap();
    /// assert!(!conn.is_ready());
    /// ```
    pub fn new<S: Into<String>>(
        ctx: &UnitContext,
        d_constants: impl IntoIterator<Item = (S, Quantity)>,
    ) -> Result<Self> {
        let mut species_d_constants = IndexMap::new();
        for (species, d) in d_constants {
            let species = species.into();
            let d = ctx.to_internal(&d, Dimension::DIFFUSIVITY, &format!("diffusion constant of '{species}'"))?;
            check_rate(&species, d)?;
            species_d_constants.insert(species, d);
        }
        Ok(Self {
            species_d_constants,
            surface_area: None,
            ic_distance: None,
        })
    }

    /// Set the adjoining surface area explicitly
    pub fn with_surface_area(mut self, ctx: &UnitContext, area: Quantity) -> Result<Self> {
        self.surface_area = Some(ctx.to_internal(&area, Dimension::AREA, "surface area")?);
        Ok(self)
    }

    /// Set the center-to-center distance explicitly
    pub fn with_distance(mut self, ctx: &UnitContext, distance: Quantity) -> Result<Self> {
        self.ic_distance = Some(ctx.length(&distance)?);
        Ok(self)
    }

    /// Diffusion constants in dm²/s
    pub fn d_constants(&self) -> &IndexMap<String, f64> {
        &self.species_d_constants
    }

    /// Surface area in dm², if bound
    pub fn surface_area(&self) -> Option<f64> {
        self.surface_area
    }

    /// Center-to-center distance in dm, if bound
    pub fn ic_distance(&self) -> Option<f64> {
        self.ic_distance
    }

    /// True once both surface area and distance are bound
    pub fn is_ready(&self) -> bool {
        self.surface_area.is_some() && self.ic_distance.is_some()
    }

    /// Copy with the missing geometry filled in; already bound values win
    pub(crate) fn bind_geometry(&self, surface_area: Option<f64>, ic_distance: Option<f64>) -> Self {
        Self {
            species_d_constants: self.species_d_constants.clone(),
            surface_area: self.surface_area.or(surface_area),
            ic_distance: self.ic_distance.or(ic_distance),
        }
    }

    /// Convert into an [`IsotropicConnection`] with `k = D·A/Δx` per species
    ///
    /// # Errors
    ///
    /// [`Error::UnresolvedGeometry`] when area or distance is unbound.
    pub fn resolve(&self) -> Result<IsotropicConnection> {
        let (Some(area), Some(distance)) = (self.surface_area, self.ic_distance) else {
            return Err(Error::UnresolvedGeometry {
                surface_area: self.surface_area,
                distance: self.ic_distance,
            });
        };

        if !(distance > 0.0) || !(area > 0.0) {
            return Err(Error::UnresolvedGeometry {
                surface_area: Some(area),
                distance: Some(distance),
            });
        }

        IsotropicConnection::from_internal(
            self.species_d_constants
                .iter()
                .map(|(s, &d)| (s.clone(), d * area / distance)),
        )
    }
}

// =================================================================================================
// Connection
// =================================================================================================

/// Any transport law between two compartments
#[derive(Debug, Clone, PartialEq)]
pub enum Connection {
    Isotropic(IsotropicConnection),
    Anisotropic(AnisotropicConnection),
    Ficks(FicksConnection),
}

impl Connection {
    /// The same connection seen from the other compartment
    pub fn reverse(&self) -> Self {
        match self {
            Connection::Anisotropic(conn) => Connection::Anisotropic(conn.reverse()),
            other => other.clone(),
        }
    }

    /// False for pending Ficks connections
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Connection::Ficks(_))
    }

    /// Species transported by this connection, in insertion order
    pub fn species(&self) -> Vec<&str> {
        match self {
            Connection::Isotropic(c) => c.species_rates.keys().map(String::as_str).collect(),
            Connection::Anisotropic(c) => c.species_rates.keys().map(String::as_str).collect(),
            Connection::Ficks(c) => c.species_d_constants.keys().map(String::as_str).collect(),
        }
    }

    /// Concrete rates, `None` while the connection is pending
    pub fn resolved(&self) -> Option<ResolvedConnection> {
        match self {
            Connection::Isotropic(c) => Some(ResolvedConnection::new(c.species_rates.clone())),
            Connection::Anisotropic(c) => Some(ResolvedConnection::new(c.species_rates.clone())),
            Connection::Ficks(_) => None,
        }
    }
}

impl From<IsotropicConnection> for Connection {
    fn from(value: IsotropicConnection) -> Self {
        Connection::Isotropic(value)
    }
}

impl From<AnisotropicConnection> for Connection {
    fn from(value: AnisotropicConnection) -> Self {
        Connection::Anisotropic(value)
    }
}

impl From<FicksConnection> for Connection {
    fn from(value: FicksConnection) -> Self {
        Connection::Ficks(value)
    }
}

/// Concrete per-species `(k_out, k_in)` rate constants (L/s)
///
/// This is the only connection type a [`FlatModel`](crate::network::FlatModel)
/// stores, so a pending Ficks connection can never reach the derivative
/// builder.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConnection {
    species_rates: SpeciesRates,
}

impl ResolvedConnection {
    pub(crate) fn new(species_rates: SpeciesRates) -> Self {
        Self { species_rates }
    }

    pub fn species_rates(&self) -> &SpeciesRates {
        &self.species_rates
    }

    /// `(k_out, k_in)` for one species
    pub fn rates(&self, species: &str) -> Option<(f64, f64)> {
        self.species_rates.get(species).copied()
    }

    pub fn reverse(&self) -> Self {
        Self {
            species_rates: self
                .species_rates
                .iter()
                .map(|(s, &(k_out, k_in))| (s.clone(), (k_in, k_out)))
                .collect(),
        }
    }
}

impl From<IsotropicConnection> for ResolvedConnection {
    fn from(value: IsotropicConnection) -> Self {
        Self::new(value.species_rates)
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units;
    use approx::assert_relative_eq;

    #[test]
    fn test_isotropic_is_symmetric() {
        let conn = IsotropicConnection::from_internal([("A", 2.0), ("B", 3.0)]).unwrap();
        assert_eq!(conn.species_rates()["A"], (2.0, 2.0));
        assert_eq!(conn.species_rates()["B"], (3.0, 3.0));
    }

    #[test]
    fn test_isotropic_rejects_first_order_units() {
        let ctx = UnitContext::default();
        let err = IsotropicConnection::new(&ctx, [("A", 1e-5 * (units::DIMENSIONLESS / units::SECOND))])
            .unwrap_err();
        assert!(matches!(err, Error::Dimension { .. }));
    }

    #[test]
    fn test_anisotropic_reverse_swaps_pair() {
        let conn = AnisotropicConnection::from_internal([("drug", (1e-5, 1e-1))]).unwrap();
        let rev = conn.reverse();
        assert_eq!(rev.species_rates()["drug"], (1e-1, 1e-5));
        assert_eq!(rev.reverse(), conn);
    }

    #[test]
    fn test_negative_rate_is_malformed() {
        let err = AnisotropicConnection::from_internal([("drug", (1.0, -1.0))]).unwrap_err();
        assert!(matches!(err, Error::MalformedConnection { ref species, .. } if species == "drug"));
    }

    #[test]
    fn test_ficks_resolve_needs_geometry() {
        let ctx = UnitContext::default();
        let d = 1e-5 * (units::CENTIMETER.powi(2) / units::SECOND);
        let conn = FicksConnection::new(&ctx, [("A", d)]).unwrap();
        assert!(matches!(conn.resolve(), Err(Error::UnresolvedGeometry { .. })));

        let conn = conn.with_surface_area(&ctx, 1.0 * units::NANOMETER.powi(2)).unwrap();
        assert!(conn.resolve().is_err());
    }

    #[test]
    fn test_ficks_resolve_rate() {
        // D = 1e-5 cm²/s = 1e-7 dm²/s, A = 100 nm² = 1e-14 dm², dx = 10 nm = 1e-7 dm
        // k = 1e-7 * 1e-14 / 1e-7 = 1e-14 L/s
        let ctx = UnitContext::default();
        let d = 1e-5 * (units::CENTIMETER.powi(2) / units::SECOND);
        let conn = FicksConnection::new(&ctx, [("A", d)])
            .unwrap()
            .with_surface_area(&ctx, 100.0 * units::NANOMETER.powi(2))
            .unwrap()
            .with_distance(&ctx, 10.0 * units::NANOMETER)
            .unwrap();

        let iso = conn.resolve().unwrap();
        let (k_out, k_in) = iso.species_rates()["A"];
        assert_relative_eq!(k_out, 1e-14, max_relative = 1e-10);
        assert_relative_eq!(k_in, 1e-14, max_relative = 1e-10);
    }

    #[test]
    fn test_bind_geometry_keeps_explicit_values() {
        let ctx = UnitContext::default();
        let d = 1.0 * (units::DECIMETER.powi(2) / units::SECOND);
        let conn = FicksConnection::new(&ctx, [("A", d)])
            .unwrap()
            .with_distance(&ctx, 2.0 * units::DECIMETER)
            .unwrap();
        let bound = conn.bind_geometry(Some(3.0), Some(100.0));
        assert_eq!(bound.surface_area(), Some(3.0));
        assert_relative_eq!(bound.ic_distance().unwrap(), 2.0, max_relative = 1e-12);
    }

    #[test]
    fn test_connection_resolved_only_for_concrete_variants() {
        let iso: Connection = IsotropicConnection::from_internal([("A", 1.0)]).unwrap().into();
        assert!(iso.is_resolved());
        assert_eq!(iso.resolved().unwrap().rates("A"), Some((1.0, 1.0)));

        let ctx = UnitContext::default();
        let d = 1.0 * (units::DECIMETER.powi(2) / units::SECOND);
        let ficks: Connection = FicksConnection::new(&ctx, [("A", d)]).unwrap().into();
        assert!(!ficks.is_resolved());
        assert!(ficks.resolved().is_none());
        assert_eq!(ficks.species(), vec!["A"]);
    }
}
