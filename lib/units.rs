#![allow(non_upper_case_globals)]

//! Unit conventions for the kinetic-energy prefactor and the time-evolution
//! phase.
//!
//! All solver functions work with a pair (*ħ*, *m*). The default is the
//! atomic-unit convention *ħ* = *m* = 1; any other choice must be supplied as
//! a consistent pair through [`Units::new`].
//!
//! Concrete physical constants are taken from NIST.

use std::{ f64::consts::PI, hash::{ Hash, Hasher } };
use serde::{ Deserialize, Serialize };
use crate::error::ConfigError;

/// Planck constant (kg m^2 s^-1)
pub const h: f64 = 6.62607015e-34;
//             +/- 0 (exact)

/// reduced Planck constant (kg m^2 s^-1)
pub const hbar: f64 = h / 2.0 / PI;
//                +/- 0 (exact)

/// electron mass (kg)
pub const me: f64 = 9.1093837015e-31;
//              +/- 0.0000000028e-31

/// unified atomic mass unit (kg)
pub const mu: f64 = 1.66053906660e-27;
//              +/- 0.00000000050e-27

/// Bohr radius (m)
pub const a0: f64 = 5.29177210903e-11;
//              +/- 0.00000000080e-11

/// Hartree energy (J) = 2\*Rinf\*h\*c
pub const Eh: f64 = 4.3597447222071e-18;
//              +/- 0.0000000000085e-18

/// The (*ħ*, *m*) pair that fixes the kinetic-energy prefactor *ħ*²/2*m* and
/// the evolution phase *E* *t*/*ħ*.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Units {
    /// Reduced Planck constant.
    pub hbar: f64,
    /// Particle mass.
    pub mass: f64,
}

impl Default for Units {
    fn default() -> Self { Self::atomic() }
}

impl Hash for Units {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hbar.to_bits().hash(state);
        self.mass.to_bits().hash(state);
    }
}

impl Units {
    /// Atomic-unit convention, *ħ* = *m* = 1.
    pub const fn atomic() -> Self { Self { hbar: 1.0, mass: 1.0 } }

    /// Construct from an explicit (*ħ*, *m*) pair, both of which must be
    /// positive and finite.
    pub fn new(hbar_: f64, mass: f64) -> Result<Self, ConfigError> {
        let units = Self { hbar: hbar_, mass };
        units.validate()?;
        Ok(units)
    }

    /// Construct SI units for a particle of mass `mass` (kg).
    pub fn mks(mass: f64) -> Result<Self, ConfigError> {
        Self::new(hbar, mass)
    }

    /// Construct SI units for a particle whose mass is given in unified atomic
    /// mass units.
    pub fn mks_amu(mass: f64) -> Result<Self, ConfigError> {
        Self::new(hbar, mass * mu)
    }

    /// Check that both constants are positive and finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_positive("hbar", self.hbar)?;
        ConfigError::check_positive("mass", self.mass)?;
        Ok(())
    }

    /// Kinetic-energy prefactor *ħ*²/2*m*.
    pub fn kinetic(&self) -> f64 { self.hbar.powi(2) / 2.0 / self.mass }

    /// Energy of the ground state of a box of side `length` in `d` dimensions,
    /// *d* (*ħ*²/2*m*) (*π*/*L*)².
    pub fn box_energy(&self, length: f64, d: usize) -> f64 {
        d as f64 * self.kinetic() * (PI / length).powi(2)
    }

    /// Characteristic length of a harmonic trap with angular frequency `w`,
    /// √(*ħ*/*m* *ω*).
    pub fn oscillator_length(&self, w: f64) -> f64 {
        (self.hbar / self.mass / w).sqrt()
    }
}
