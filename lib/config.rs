//! TOML-deserializable descriptions of a complete simulation.
//!
//! ```toml
//! n_states = 10
//!
//! [grid]
//! dimension = 1
//! bounds = [[-10.0, 10.0]]
//! n_points = 1000
//! boundary = "dirichlet"   # or "periodic"
//!
//! [potential]
//! kind = "harmonic"
//! stiffness = 1.0
//!
//! [units]                  # optional; ħ = m = 1 by default
//! hbar = 1.0
//! mass = 1.0
//!
//! [solver]                 # optional; "auto" by default
//! method = "shift_invert"
//! krylov_dim = 40
//!
//! [packet]                 # optional initial condition
//! center = [1.0]
//! width = 0.5
//! momentum = [2.0]
//! ```

use std::path::Path;
use serde::{ Deserialize, Serialize };
use crate::{
    grid::{ Boundary, Dim, Grid, GridResult },
    potential::{ ConfigResult, Potential, PotentialFn },
    solve::{ Method, XResult },
    timedep::{ WavePacket, make_wave_packet },
    units::Units,
};

/// Grid section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// 1 or 2.
    pub dimension: Dim,
    /// Inclusive `[min, max]` per axis.
    pub bounds: Vec<(f64, f64)>,
    /// Points per axis, including the edges.
    pub n_points: usize,
    #[serde(default)]
    pub boundary: Boundary,
}

impl GridConfig {
    /// Construct the described grid.
    pub fn build(&self) -> GridResult<Grid> {
        Grid::new(self.dimension, &self.bounds, self.n_points, self.boundary)
    }
}

/// Initial Gaussian wave packet section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PacketConfig {
    pub center: Vec<f64>,
    pub width: f64,
    /// Zero along every axis if omitted.
    #[serde(default)]
    pub momentum: Vec<f64>,
}

impl PacketConfig {
    /// Construct the described wave packet on `grid`.
    pub fn build(&self, grid: &Grid) -> XResult<WavePacket> {
        let momentum: Vec<f64>
            = if self.momentum.is_empty() {
                vec![0.0; grid.dim().n()]
            } else {
                self.momentum.clone()
            };
        make_wave_packet(grid, &self.center, self.width, &momentum)
    }
}

/// Top-level simulation description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub grid: GridConfig,
    pub potential: Potential,
    pub n_states: usize,
    #[serde(default)]
    pub units: Units,
    #[serde(default)]
    pub solver: Method,
    #[serde(default)]
    pub packet: Option<PacketConfig>,
}

impl SimConfig {
    /// Parse from a TOML string.
    pub fn from_toml_str(s: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(s)?;
        config.units.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn from_file<P>(path: P) -> ConfigResult<Self>
    where P: AsRef<Path>
    {
        let s = std::fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    /// Build the grid and validated potential.
    pub fn build(&self) -> XResult<(Grid, PotentialFn)> {
        let grid = self.grid.build()?;
        let potential = PotentialFn::new(self.potential.clone(), grid.dim())?;
        Ok((grid, potential))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ error::{ ConfigError, XError }, solve::LanczosOptions };

    const HARMONIC: &str = r#"
        n_states = 6

        [grid]
        dimension = 1
        bounds = [[-10.0, 10.0]]
        n_points = 401

        [potential]
        kind = "harmonic"
        stiffness = 2.0

        [packet]
        center = [1.0]
        width = 0.5
    "#;

    #[test]
    fn minimal_config() {
        let config = SimConfig::from_toml_str(HARMONIC).unwrap();
        assert_eq!(config.n_states, 6);
        assert_eq!(config.grid.dimension, Dim::One);
        assert_eq!(config.grid.boundary, Boundary::Dirichlet);
        assert_eq!(config.units, Units::atomic());
        assert!(config.solver.is_auto());
        assert_eq!(
            config.potential,
            Potential::Harmonic { stiffness: [2.0; 2], center: [0.0, 0.0] },
        );
        let (grid, _) = config.build().unwrap();
        assert_eq!(grid.n_unknowns(), 399);
        let packet = config.packet.as_ref().unwrap().build(&grid).unwrap();
        assert!((packet.norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn solver_section() {
        let s = r#"
            n_states = 4

            [grid]
            dimension = 2
            bounds = [[0.0, 1.0], [0.0, 1.0]]
            n_points = 31
            boundary = "periodic"

            [potential]
            kind = "circular_well"
            radius = 0.4
            center = [0.5, 0.5]

            [units]
            mass = 2.0

            [solver]
            method = "shift_invert"
            krylov_dim = 40
            epsilon = 1e-9
        "#;
        let config = SimConfig::from_toml_str(s).unwrap();
        assert_eq!(config.grid.boundary, Boundary::Periodic);
        assert_eq!(config.units.hbar, 1.0);
        assert_eq!(config.units.mass, 2.0);
        assert_eq!(
            config.solver,
            Method::ShiftInvert(LanczosOptions {
                krylov_dim: Some(40),
                epsilon: 1e-9,
                ..LanczosOptions::default()
            }),
        );
        assert!(config.build().is_ok());
    }

    #[test]
    fn rejections() {
        let bad_dim = HARMONIC.replace("dimension = 1", "dimension = 3");
        assert!(matches!(
            SimConfig::from_toml_str(&bad_dim),
            Err(ConfigError::Parse(_))
        ));
        let morse_2d = r#"
            n_states = 2
            [grid]
            dimension = 2
            bounds = [[0.0, 1.0], [0.0, 1.0]]
            n_points = 11
            [potential]
            kind = "morse"
            depth = 1.0
            a = 1.0
        "#;
        let config = SimConfig::from_toml_str(morse_2d).unwrap();
        assert!(matches!(
            config.build(),
            Err(XError::Config(ConfigError::Unsupported { .. }))
        ));
        let bad_units = HARMONIC.replace("n_states = 6", "n_states = 6\n[units]\nhbar = -1.0\n");
        assert!(SimConfig::from_toml_str(&bad_units).is_err());
        assert!(matches!(
            SimConfig::from_file("/nonexistent/gridspace.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}
