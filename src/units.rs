//! Dimensioned quantities and unit conversion
//!
//! Every user-facing physical value (volumes, lengths, rate constants,
//! diffusion constants, concentrations) enters the crate as a [`Quantity`]:
//! a magnitude paired with a [`Unit`]. Units know their SI scale factor and
//! their [`Dimension`] (exponents of length, time and amount of substance).
//!
//! Conversion into the internal unit system is always explicit and goes
//! through a [`UnitContext`]:
//!
//! | Dimension | Internal unit |
//! |-----------|---------------|
//! | length    | decimeter (so that volume is in liters) |
//! | time      | second |
//! | amount    | count (molecules), 1 mol = N_A counts |
//!
//! With this choice a transport rate constant `D·A/Δx` comes out directly in
//! L/s, a volume in L and a concentration in counts/L.
//!
//! # Example
//!
//! ```rust
//! use rxn_rs::units::{self, Dimension, UnitContext};
//!
//! let ctx = UnitContext::default();
//! let d = 1e-5 * (units::CENTIMETER.powi(2) / units::SECOND);
//!
//! // 1e-5 cm²/s = 1e-7 dm²/s
//! let internal = ctx.to_internal(&d, Dimension::DIFFUSIVITY, "diffusion constant").unwrap();
//! assert!((internal - 1e-7).abs() < 1e-20);
//! ```

use std::fmt;
use std::ops::{Div, Mul};

use crate::error::{Error, Result};

/// Avogadro constant (mol⁻¹), CODATA 2018 exact value
pub const AVOGADRO: f64 = 6.02214076e23;

/// Internal length unit expressed in meters (1 dm)
const INTERNAL_LENGTH_IN_METERS: f64 = 0.1;

// =================================================================================================
// Dimension
// =================================================================================================

/// Exponents of the three base dimensions used by reaction-diffusion models
///
/// Mass, temperature and current never appear in the models this crate
/// builds, so they are not tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dimension {
    /// Exponent of length
    pub length: i8,

    /// Exponent of time
    pub time: i8,

    /// Exponent of amount of substance
    pub amount: i8,
}

impl Dimension {
    pub const DIMENSIONLESS: Dimension = Dimension::new(0, 0, 0);
    pub const LENGTH: Dimension = Dimension::new(1, 0, 0);
    pub const AREA: Dimension = Dimension::new(2, 0, 0);
    pub const VOLUME: Dimension = Dimension::new(3, 0, 0);
    pub const TIME: Dimension = Dimension::new(0, 1, 0);
    pub const AMOUNT: Dimension = Dimension::new(0, 0, 1);
    pub const CONCENTRATION: Dimension = Dimension::new(-3, 0, 1);
    pub const DIFFUSIVITY: Dimension = Dimension::new(2, -1, 0);
    pub const VOLUMETRIC_RATE: Dimension = Dimension::new(3, -1, 0);
    pub const FREQUENCY: Dimension = Dimension::new(0, -1, 0);

    /// Create a dimension from its exponents
    pub const fn new(length: i8, time: i8, amount: i8) -> Self {
        Self { length, time, amount }
    }

    /// Dimension of a mass-action rate constant of the given order
    ///
    /// An order-`n` rate constant has units of `concentration^(1-n) / time`,
    /// e.g. 1/s for `n = 1` and L/(mol·s) for `n = 2`.
    pub fn mass_action(order: u32) -> Self {
        let extra = order.saturating_sub(1) as i8;
        Self::new(3 * extra, -1, -extra)
    }

    /// Raise every exponent by an integer power
    pub const fn powi(self, n: i8) -> Self {
        Self::new(self.length * n, self.time * n, self.amount * n)
    }
}

impl Mul for Dimension {
    type Output = Dimension;

    fn mul(self, rhs: Self) -> Self::Output {
        Dimension::new(
            self.length + rhs.length,
            self.time + rhs.time,
            self.amount + rhs.amount,
        )
    }
}

impl Div for Dimension {
    type Output = Dimension;

    fn div(self, rhs: Self) -> Self::Output {
        Dimension::new(
            self.length - rhs.length,
            self.time - rhs.time,
            self.amount - rhs.amount,
        )
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Dimension::DIMENSIONLESS {
            return write!(f, "[dimensionless]");
        }

        let parts: Vec<String> = [("L", self.length), ("T", self.time), ("N", self.amount)]
            .iter()
            .filter(|(_, exp)| *exp != 0)
            .map(|(symbol, exp)| {
                if *exp == 1 {
                    symbol.to_string()
                } else {
                    format!("{symbol}^{exp}")
                }
            })
            .collect();

        write!(f, "[{}]", parts.join(" "))
    }
}

// =================================================================================================
// Unit
// =================================================================================================

/// A unit of measurement: SI scale factor plus dimension
///
/// Units compose with `*`, `/` and [`powi`](Unit::powi):
///
/// ```rust
/// use rxn_rs::units::{self, Dimension};
///
/// let per_molar_per_second = units::LITER / (units::MOLE * units::SECOND);
/// assert_eq!(per_molar_per_second.dimension(), Dimension::mass_action(2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unit {
    si_factor: f64,
    dimension: Dimension,
}

impl Unit {
    /// Create a unit from its value in SI base units (m, s, mol)
    pub const fn new(si_factor: f64, dimension: Dimension) -> Self {
        Self { si_factor, dimension }
    }

    /// Scale factor to SI base units
    pub fn si_factor(&self) -> f64 {
        self.si_factor
    }

    /// Dimension of the unit
    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// Integer power of the unit
    pub fn powi(self, n: i8) -> Self {
        Self::new(self.si_factor.powi(n as i32), self.dimension.powi(n))
    }
}

impl Mul for Unit {
    type Output = Unit;

    fn mul(self, rhs: Self) -> Self::Output {
        Unit::new(self.si_factor * rhs.si_factor, self.dimension * rhs.dimension)
    }
}

impl Div for Unit {
    type Output = Unit;

    fn div(self, rhs: Self) -> Self::Output {
        Unit::new(self.si_factor / rhs.si_factor, self.dimension / rhs.dimension)
    }
}

impl Mul<Unit> for f64 {
    type Output = Quantity;

    fn mul(self, rhs: Unit) -> Self::Output {
        Quantity::new(self, rhs)
    }
}

pub const DIMENSIONLESS: Unit = Unit::new(1.0, Dimension::DIMENSIONLESS);

pub const METER: Unit = Unit::new(1.0, Dimension::LENGTH);
pub const DECIMETER: Unit = Unit::new(1e-1, Dimension::LENGTH);
pub const CENTIMETER: Unit = Unit::new(1e-2, Dimension::LENGTH);
pub const MILLIMETER: Unit = Unit::new(1e-3, Dimension::LENGTH);
pub const MICROMETER: Unit = Unit::new(1e-6, Dimension::LENGTH);
pub const NANOMETER: Unit = Unit::new(1e-9, Dimension::LENGTH);
pub const ANGSTROM: Unit = Unit::new(1e-10, Dimension::LENGTH);

pub const LITER: Unit = Unit::new(1e-3, Dimension::VOLUME);
pub const MILLILITER: Unit = Unit::new(1e-6, Dimension::VOLUME);
pub const MICROLITER: Unit = Unit::new(1e-9, Dimension::VOLUME);
pub const FEMTOLITER: Unit = Unit::new(1e-18, Dimension::VOLUME);

pub const SECOND: Unit = Unit::new(1.0, Dimension::TIME);
pub const MILLISECOND: Unit = Unit::new(1e-3, Dimension::TIME);
pub const MICROSECOND: Unit = Unit::new(1e-6, Dimension::TIME);
pub const NANOSECOND: Unit = Unit::new(1e-9, Dimension::TIME);
pub const MINUTE: Unit = Unit::new(60.0, Dimension::TIME);

pub const MOLE: Unit = Unit::new(1.0, Dimension::AMOUNT);
pub const MILLIMOLE: Unit = Unit::new(1e-3, Dimension::AMOUNT);
pub const MICROMOLE: Unit = Unit::new(1e-6, Dimension::AMOUNT);
pub const NANOMOLE: Unit = Unit::new(1e-9, Dimension::AMOUNT);

/// mol/L
pub const MOLAR: Unit = Unit::new(1e3, Dimension::CONCENTRATION);
pub const MILLIMOLAR: Unit = Unit::new(1.0, Dimension::CONCENTRATION);
pub const MICROMOLAR: Unit = Unit::new(1e-3, Dimension::CONCENTRATION);
pub const NANOMOLAR: Unit = Unit::new(1e-6, Dimension::CONCENTRATION);

// =================================================================================================
// Quantity
// =================================================================================================

/// A magnitude with a unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantity {
    pub magnitude: f64,
    pub unit: Unit,
}

impl Quantity {
    pub const fn new(magnitude: f64, unit: Unit) -> Self {
        Self { magnitude, unit }
    }

    /// Dimension of the quantity
    pub fn dimension(&self) -> Dimension {
        self.unit.dimension()
    }

    /// Magnitude expressed in SI base units (m, s, mol)
    pub fn to_si(&self) -> f64 {
        self.magnitude * self.unit.si_factor()
    }
}

impl Mul<f64> for Quantity {
    type Output = Quantity;

    fn mul(self, rhs: f64) -> Self::Output {
        Quantity::new(self.magnitude * rhs, self.unit)
    }
}

impl Mul for Quantity {
    type Output = Quantity;

    fn mul(self, rhs: Self) -> Self::Output {
        Quantity::new(self.magnitude * rhs.magnitude, self.unit * rhs.unit)
    }
}

impl Div for Quantity {
    type Output = Quantity;

    fn div(self, rhs: Self) -> Self::Output {
        Quantity::new(self.magnitude / rhs.magnitude, self.unit / rhs.unit)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} × {} SI {}", self.magnitude, self.unit.si_factor(), self.dimension())
    }
}

// =================================================================================================
// Unit context
// =================================================================================================

/// Conversion context into the internal unit system (dm, s, counts)
///
/// Every function that accepts a [`Quantity`] takes a `&UnitContext`, so the
/// conversion target is never implicit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitContext {
    avogadro: f64,
}

impl Default for UnitContext {
    fn default() -> Self {
        Self { avogadro: AVOGADRO }
    }
}

impl UnitContext {
    /// Context with a custom Avogadro constant (counts per mole)
    ///
    /// Useful to work directly in moles (`avogadro = 1.0`).
    pub fn with_avogadro(avogadro: f64) -> Self {
        Self { avogadro }
    }

    /// Counts per mole used by this context
    pub fn avogadro(&self) -> f64 {
        self.avogadro
    }

    /// Convert a quantity into internal units, checking its dimension
    ///
    /// `what` names the converted value in the error message.
    ///
    /// # Errors
    ///
    /// [`Error::Dimension`] when `quantity` does not have dimension `expected`.
    pub fn to_internal(&self, quantity: &Quantity, expected: Dimension, what: &str) -> Result<f64> {
        let found = quantity.dimension();
        if found != expected {
            return Err(Error::Dimension {
                quantity: what.to_string(),
                expected,
                found,
            });
        }

        let length_scale = (1.0 / INTERNAL_LENGTH_IN_METERS).powi(found.length as i32);
        let amount_scale = self.avogadro.powi(found.amount as i32);

        Ok(quantity.to_si() * length_scale * amount_scale)
    }

    /// Convert a length into decimeters
    pub fn length(&self, quantity: &Quantity) -> Result<f64> {
        self.to_internal(quantity, Dimension::LENGTH, "length")
    }

    /// Convert a volume into liters
    pub fn volume(&self, quantity: &Quantity) -> Result<f64> {
        self.to_internal(quantity, Dimension::VOLUME, "volume")
    }
}

// =================================================================================================
// Tests
// =================================================================================================
