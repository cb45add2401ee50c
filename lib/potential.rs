//! Library of potentials, each a pure function of position.
//!
//! A [`Potential`] is a closed set of kinds with their parameters; it is
//! checked against a dimensionality once, when a [`PotentialFn`] is built, and
//! never again during evaluation.
//!
//! Confinement by an "infinite" well is provided by the Dirichlet boundary of
//! the grid, not by the potential: inside the well region the potential is
//! `depth` (zero by default), and the finite `wall` value only applies to
//! points of the domain that fall outside a well narrower than the domain. For finite potentials
//! (barrier, double well, Morse) on a Dirichlet grid, the domain edge acts as
//! an additional hard wall that is not present in the unbounded problem; this
//! is an approximation inherent to the finite grid.
//!
//! ```
//! use gridspace::{ build_grid, potential::{ Potential, build_potential } };
//!
//! let grid = build_grid(1, &[(-5.0, 5.0)], 101).unwrap();
//! let v = build_potential(Potential::harmonic(1.0), 1).unwrap();
//! let samples = v.sample(&grid).unwrap();
//! assert_eq!(samples.len(), 99);
//! assert!((samples[49] - 0.0).abs() < 1e-12);
//!
//! // Morse potentials only exist in 1D
//! assert!(build_potential(Potential::morse(10.0, 1.0, 0.0), 2).is_err());
//! ```

use std::{ fmt, hash::{ Hash, Hasher } };
use ndarray as nd;
use serde::{ Deserialize, Serialize };
use crate::{
    Arr1,
    error::ConfigError,
    grid::{ Dim, Grid },
};

pub type ConfigResult<T> = Result<T, ConfigError>;

pub(crate) const DEF_WALL: f64 = 1e6;

fn def_wall() -> f64 { DEF_WALL }

fn def_width() -> [f64; 2] { [f64::INFINITY; 2] }

fn def_one() -> f64 { 1.0 }

fn def_one_xy() -> [f64; 2] { [1.0; 2] }

// accept either a single value applied to every axis or one value per axis
fn per_axis<'de, D>(deserializer: D) -> Result<[f64; 2], D::Error>
where D: serde::Deserializer<'de>
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PerAxis {
        Both(f64),
        Each([f64; 2]),
    }

    match PerAxis::deserialize(deserializer)? {
        PerAxis::Both(v) => Ok([v; 2]),
        PerAxis::Each(v) => Ok(v),
    }
}

/// Tag identifying the kind of a [`Potential`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PotentialKind {
    InfiniteWell,
    Barrier,
    Harmonic,
    DoubleWell,
    Morse,
    CircularWell,
}

impl PotentialKind {
    /// Return `true` if the kind is defined in `dim`.
    pub fn supports(self, dim: Dim) -> bool {
        match self {
            Self::Morse => dim == Dim::One,
            Self::CircularWell => dim == Dim::Two,
            _ => true,
        }
    }
}

impl fmt::Display for PotentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InfiniteWell => "infinite_well",
            Self::Barrier => "barrier",
            Self::Harmonic => "harmonic",
            Self::DoubleWell => "double_well",
            Self::Morse => "morse",
            Self::CircularWell => "circular_well",
        };
        f.write_str(name)
    }
}

/// Coordinate axis along which a 2D double well is split.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    #[default]
    X,
    Y,
}

/// A potential kind together with its parameters.
///
/// Coordinates not used by a kind in 1D (e.g. `center[1]`) are ignored.
/// Per-axis parameters (`width` of an infinite well, `stiffness` of a harmonic
/// trap) may be given in TOML either as a single number or as `[x, y]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Potential {
    /// `depth` inside a rectangular region of sides `width` about `center`,
    /// `wall` outside.
    InfiniteWell {
        #[serde(default = "def_width", deserialize_with = "per_axis")]
        width: [f64; 2],
        #[serde(default)]
        center: [f64; 2],
        #[serde(default)]
        depth: f64,
        #[serde(default = "def_wall")]
        wall: f64,
    },
    /// `height` on a slab of thickness `width` about `x = position`, zero
    /// elsewhere.
    Barrier {
        height: f64,
        width: f64,
        #[serde(default)]
        position: f64,
    },
    /// ½ Σ k<sub>i</sub> (r<sub>i</sub> - center<sub>i</sub>)², with one
    /// spring constant per axis.
    Harmonic {
        #[serde(default = "def_one_xy", deserialize_with = "per_axis")]
        stiffness: [f64; 2],
        #[serde(default)]
        center: [f64; 2],
    },
    /// Two zero-potential wells spanning `width` in total, separated by a
    /// central barrier of `barrier_width` and `barrier_height`, with `base`
    /// everywhere else.
    DoubleWell {
        #[serde(default = "def_one")]
        base: f64,
        width: f64,
        barrier_width: f64,
        barrier_height: f64,
        #[serde(default)]
        axis: Axis,
    },
    /// D (1 - exp(-a (x - r_e)))²; 1D only.
    ///
    /// The exponential overflows once a (r_e - x) exceeds ~709, so the domain
    /// must not extend that far to the left of `r_e`; sampling such a domain
    /// fails with [`ConfigError::NonFinite`].
    Morse {
        depth: f64,
        a: f64,
        #[serde(default)]
        r_e: f64,
    },
    /// `depth` inside a disk of `radius` about `center`, `wall` outside; 2D
    /// only.
    CircularWell {
        radius: f64,
        #[serde(default)]
        center: [f64; 2],
        #[serde(default)]
        depth: f64,
        #[serde(default = "def_wall")]
        wall: f64,
    },
}

impl Potential {
    /// Infinite well covering the whole domain, so that confinement comes
    /// only from the grid boundary.
    pub fn infinite_well() -> Self {
        Self::InfiniteWell {
            width: [f64::INFINITY; 2],
            center: [0.0; 2],
            depth: 0.0,
            wall: DEF_WALL,
        }
    }

    /// Centered rectangular well of sides `width` with zero potential inside.
    pub fn rect_well(width: [f64; 2]) -> Self {
        Self::InfiniteWell { width, center: [0.0; 2], depth: 0.0, wall: DEF_WALL }
    }

    /// Centered isotropic harmonic oscillator with spring constant
    /// `stiffness`.
    pub fn harmonic(stiffness: f64) -> Self {
        Self::Harmonic { stiffness: [stiffness; 2], center: [0.0; 2] }
    }

    /// Centered harmonic oscillator with a separate spring constant along each
    /// axis.
    pub fn anisotropic_harmonic(stiffness: [f64; 2]) -> Self {
        Self::Harmonic { stiffness, center: [0.0; 2] }
    }

    /// Centered barrier.
    pub fn barrier(height: f64, width: f64) -> Self {
        Self::Barrier { height, width, position: 0.0 }
    }

    /// Symmetric double well split along x.
    pub fn double_well(
        base: f64,
        width: f64,
        barrier_width: f64,
        barrier_height: f64,
    ) -> Self
    {
        Self::DoubleWell {
            base, width, barrier_width, barrier_height, axis: Axis::X,
        }
    }

    /// Morse potential.
    pub fn morse(depth: f64, a: f64, r_e: f64) -> Self {
        Self::Morse { depth, a, r_e }
    }

    /// Centered circular well with zero potential inside.
    pub fn circular_well(radius: f64) -> Self {
        Self::CircularWell {
            radius, center: [0.0; 2], depth: 0.0, wall: DEF_WALL,
        }
    }

    /// Get the kind tag.
    pub fn kind(&self) -> PotentialKind {
        match self {
            Self::InfiniteWell { .. } => PotentialKind::InfiniteWell,
            Self::Barrier { .. } => PotentialKind::Barrier,
            Self::Harmonic { .. } => PotentialKind::Harmonic,
            Self::DoubleWell { .. } => PotentialKind::DoubleWell,
            Self::Morse { .. } => PotentialKind::Morse,
            Self::CircularWell { .. } => PotentialKind::CircularWell,
        }
    }

    /// Flatten all numeric parameters, in declaration order.
    pub fn params(&self) -> Vec<f64> {
        match *self {
            Self::InfiniteWell { width, center, depth, wall }
                => vec![width[0], width[1], center[0], center[1], depth, wall],
            Self::Barrier { height, width, position }
                => vec![height, width, position],
            Self::Harmonic { stiffness, center }
                => vec![stiffness[0], stiffness[1], center[0], center[1]],
            Self::DoubleWell { base, width, barrier_width, barrier_height, axis }
                => vec![
                    base, width, barrier_width, barrier_height,
                    if axis == Axis::X { 0.0 } else { 1.0 },
                ],
            Self::Morse { depth, a, r_e } => vec![depth, a, r_e],
            Self::CircularWell { radius, center, depth, wall }
                => vec![radius, center[0], center[1], depth, wall],
        }
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> ConfigResult<()> {
        match *self {
            Self::InfiniteWell { width, center, depth, wall } => {
                for w in width.into_iter() {
                    if !(w > 0.0) {
                        return Err(ConfigError::BadParam { name: "width", value: w });
                    }
                }
                ConfigError::check_finite("center", center[0])?;
                ConfigError::check_finite("center", center[1])?;
                ConfigError::check_finite("depth", depth)?;
                ConfigError::check_finite("wall", wall)?;
            },
            Self::Barrier { height, width, position } => {
                ConfigError::check_finite("height", height)?;
                ConfigError::check_positive("width", width)?;
                ConfigError::check_finite("position", position)?;
            },
            Self::Harmonic { stiffness, center } => {
                for k in stiffness.into_iter() {
                    ConfigError::check_finite("stiffness", k)?;
                    if k < 0.0 {
                        return Err(ConfigError::BadParam {
                            name: "stiffness", value: k });
                    }
                }
                ConfigError::check_finite("center", center[0])?;
                ConfigError::check_finite("center", center[1])?;
            },
            Self::DoubleWell { base, width, barrier_width, barrier_height, .. } => {
                ConfigError::check_finite("base", base)?;
                ConfigError::check_positive("width", width)?;
                ConfigError::check_positive("barrier_width", barrier_width)?;
                ConfigError::check_finite("barrier_height", barrier_height)?;
                if barrier_width >= width {
                    return Err(ConfigError::BadParam {
                        name: "barrier_width", value: barrier_width });
                }
            },
            Self::Morse { depth, a, r_e } => {
                ConfigError::check_finite("depth", depth)?;
                ConfigError::check_positive("a", a)?;
                ConfigError::check_finite("r_e", r_e)?;
            },
            Self::CircularWell { radius, center, depth, wall } => {
                ConfigError::check_positive("radius", radius)?;
                ConfigError::check_finite("center", center[0])?;
                ConfigError::check_finite("center", center[1])?;
                ConfigError::check_finite("depth", depth)?;
                ConfigError::check_finite("wall", wall)?;
            },
        }
        Ok(())
    }

    // `r` holds one coordinate per axis
    fn eval<S>(&self, r: &Arr1<S>) -> f64
    where S: nd::Data<Elem = f64>
    {
        match *self {
            Self::InfiniteWell { width, center, depth, wall } => {
                let inside
                    = r.iter().zip(center).zip(width)
                    .all(|((rk, ck), wk)| (rk - ck).abs() <= wk / 2.0);
                if inside { depth } else { wall }
            },
            Self::Barrier { height, width, position } => {
                if (r[0] - position).abs() <= width / 2.0 { height } else { 0.0 }
            },
            Self::Harmonic { stiffness, center } => {
                0.5 * r.iter().zip(center).zip(stiffness)
                    .map(|((rk, ck), kk)| kk * (rk - ck).powi(2))
                    .sum::<f64>()
            },
            Self::DoubleWell { base, width, barrier_width, barrier_height, axis } => {
                let s
                    = match axis {
                        Axis::X => r[0],
                        Axis::Y => r[1],
                    }
                    .abs();
                if s < barrier_width / 2.0 {
                    barrier_height
                } else if s <= width / 2.0 {
                    0.0
                } else {
                    base
                }
            },
            Self::Morse { depth, a, r_e } => {
                depth * (1.0 - (-a * (r[0] - r_e)).exp()).powi(2)
            },
            Self::CircularWell { radius, center, depth, wall } => {
                let r2
                    = r.iter().zip(center)
                    .map(|(rk, ck)| (rk - ck).powi(2))
                    .sum::<f64>();
                if r2 <= radius.powi(2) { depth } else { wall }
            },
        }
    }
}

impl Hash for Potential {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        self.params().into_iter().for_each(|p| p.to_bits().hash(state));
    }
}

/// A [`Potential`] validated for a particular dimensionality.
#[derive(Clone, Debug, PartialEq, Hash)]
pub struct PotentialFn {
    potential: Potential,
    dim: Dim,
}

impl PotentialFn {
    /// Validate `potential`'s parameters and its applicability to `dim`.
    pub fn new(potential: Potential, dim: Dim) -> ConfigResult<Self> {
        let kind = potential.kind();
        if !kind.supports(dim) {
            return Err(ConfigError::Unsupported { kind, dim });
        }
        potential.validate()?;
        if let Potential::DoubleWell { axis: Axis::Y, .. } = potential {
            if dim == Dim::One {
                return Err(ConfigError::BadParam { name: "axis", value: 1.0 });
            }
        }
        Ok(Self { potential, dim })
    }

    /// Get the underlying potential.
    pub fn potential(&self) -> &Potential { &self.potential }

    /// Get the dimensionality.
    pub fn dim(&self) -> Dim { self.dim }

    /// Evaluate at a single point, given as one coordinate per axis.
    ///
    /// *Panics if `r` has fewer coordinates than the dimensionality*.
    pub fn eval<S>(&self, r: &Arr1<S>) -> f64
    where S: nd::Data<Elem = f64>
    {
        assert!(r.len() >= self.dim.n(), "potential::PotentialFn::eval: too few coordinates");
        self.potential.eval(r)
    }

    /// Evaluate over all unknowns of a grid.
    pub fn sample(&self, grid: &Grid) -> ConfigResult<nd::Array1<f64>> {
        if grid.dim() != self.dim {
            return Err(ConfigError::DimMismatch {
                expected: self.dim, got: grid.dim() });
        }
        let coords = grid.interior_coords();
        let values: nd::Array1<f64>
            = nd::Zip::from(coords.rows())
            .par_map_collect(|r| self.potential.eval(&r));
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(ConfigError::NonFinite { kind: self.potential.kind(), index });
        }
        Ok(values)
    }
}

/// Build a validated potential for dimension `dim` (1 or 2).
pub fn build_potential(potential: Potential, dim: usize)
    -> ConfigResult<PotentialFn>
{
    PotentialFn::new(potential, Dim::try_from(dim)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(v: &PotentialFn, r: &[f64]) -> f64 {
        v.eval(&nd::ArrayView1::from(r))
    }

    #[test]
    fn dimension_rules() {
        assert!(matches!(
            build_potential(Potential::morse(1.0, 1.0, 0.0), 2),
            Err(ConfigError::Unsupported { kind: PotentialKind::Morse, dim: Dim::Two })
        ));
        assert!(matches!(
            build_potential(Potential::circular_well(1.0), 1),
            Err(ConfigError::Unsupported { kind: PotentialKind::CircularWell, .. })
        ));
        assert!(build_potential(Potential::harmonic(1.0), 3).is_err());
        assert!(build_potential(Potential::harmonic(1.0), 2).is_ok());
    }

    #[test]
    fn bad_params() {
        assert!(build_potential(Potential::barrier(1.0, -1.0), 1).is_err());
        assert!(build_potential(Potential::double_well(1.0, 1.0, 2.0, 1.0), 1)
            .is_err());
        assert!(build_potential(Potential::morse(1.0, 0.0, 0.0), 1).is_err());
        assert!(build_potential(Potential::harmonic(f64::NAN), 1).is_err());
    }

    #[test]
    fn evaluators() {
        let v = build_potential(Potential::harmonic(2.0), 2).unwrap();
        assert_eq!(at(&v, &[1.0, 2.0]), 5.0);

        let v = build_potential(Potential::infinite_well(), 1).unwrap();
        assert_eq!(at(&v, &[1e3]), 0.0);
        let v = build_potential(
            Potential::InfiniteWell {
                width: [1.0; 2], center: [0.0; 2], depth: 0.0, wall: 50.0 },
            1,
        ).unwrap();
        assert_eq!(at(&v, &[0.4]), 0.0);
        assert_eq!(at(&v, &[0.6]), 50.0);

        let v = build_potential(Potential::double_well(9.0, 4.0, 1.0, 3.0), 1)
            .unwrap();
        assert_eq!(at(&v, &[0.0]), 3.0);
        assert_eq!(at(&v, &[-1.0]), 0.0);
        assert_eq!(at(&v, &[2.5]), 9.0);

        let v = build_potential(Potential::morse(10.0, 1.0, 0.5), 1).unwrap();
        assert_eq!(at(&v, &[0.5]), 0.0);

        let v = build_potential(Potential::circular_well(1.0), 2).unwrap();
        assert_eq!(at(&v, &[0.5, 0.5]), 0.0);
        assert_eq!(at(&v, &[1.0, 1.0]), DEF_WALL);
    }

    #[test]
    fn per_axis_params() {
        let v = build_potential(Potential::anisotropic_harmonic([1.0, 4.0]), 2)
            .unwrap();
        assert_eq!(at(&v, &[1.0, 1.0]), 2.5);
        // only the x spring constant acts in 1D
        let v = build_potential(Potential::anisotropic_harmonic([1.0, 4.0]), 1)
            .unwrap();
        assert_eq!(at(&v, &[2.0]), 2.0);

        let v = build_potential(
            Potential::InfiniteWell {
                width: [2.0, 1.0], center: [0.0, 0.5], depth: -3.0, wall: 40.0 },
            2,
        ).unwrap();
        assert_eq!(at(&v, &[0.9, 0.5]), -3.0);
        assert_eq!(at(&v, &[0.0, 1.1]), 40.0);
        assert_eq!(at(&v, &[1.1, 0.5]), 40.0);

        assert_ne!(
            Potential::anisotropic_harmonic([1.0, 2.0]).params(),
            Potential::anisotropic_harmonic([2.0, 1.0]).params(),
        );
        assert!(build_potential(Potential::rect_well([1.0, 0.0]), 2).is_err());
        assert!(build_potential(Potential::anisotropic_harmonic([1.0, -1.0]), 2)
            .is_err());
    }

    #[test]
    fn y_axis_double_well_needs_2d() {
        let split_y = Potential::DoubleWell {
            base: 9.0,
            width: 4.0,
            barrier_width: 1.0,
            barrier_height: 3.0,
            axis: Axis::Y,
        };
        assert!(matches!(
            build_potential(split_y.clone(), 1),
            Err(ConfigError::BadParam { name: "axis", .. })
        ));
        let v = build_potential(split_y, 2).unwrap();
        assert_eq!(at(&v, &[2.5, 0.0]), 3.0);
        assert_eq!(at(&v, &[0.0, 2.5]), 9.0);
    }

    #[test]
    fn morse_overflow_rejected() {
        let grid = crate::grid::build_grid(1, &[(-800.0, 10.0)], 101).unwrap();
        let v = build_potential(Potential::morse(10.0, 1.0, 0.0), 1).unwrap();
        assert!(matches!(
            v.sample(&grid),
            Err(ConfigError::NonFinite { kind: PotentialKind::Morse, .. })
        ));
        let grid = crate::grid::build_grid(1, &[(-5.0, 10.0)], 101).unwrap();
        assert!(v.sample(&grid).is_ok());
    }

    #[test]
    fn sample_checks_dim() {
        let grid = crate::grid::build_grid(2, &[(0.0, 1.0), (0.0, 1.0)], 5)
            .unwrap();
        let v1 = build_potential(Potential::harmonic(1.0), 1).unwrap();
        assert!(matches!(
            v1.sample(&grid),
            Err(ConfigError::DimMismatch { .. })
        ));
        let v2 = build_potential(Potential::harmonic(1.0), 2).unwrap();
        assert_eq!(v2.sample(&grid).unwrap().len(), 9);
    }

    #[test]
    fn deserialize_tagged() {
        let v: Potential = toml::from_str(
            "kind = \"double_well\"\nwidth = 4.0\nbarrier_width = 0.5\n\
            barrier_height = 5.0\naxis = \"y\""
        ).unwrap();
        let w: Potential = toml::from_str(
            "kind = \"harmonic\"\nstiffness = [1.0, 4.0]"
        ).unwrap();
        assert_eq!(w, Potential::anisotropic_harmonic([1.0, 4.0]));
        let w: Potential = toml::from_str(
            "kind = \"infinite_well\"\nwidth = 2.0\ndepth = -1.0"
        ).unwrap();
        assert_eq!(
            w,
            Potential::InfiniteWell {
                width: [2.0; 2], center: [0.0; 2], depth: -1.0, wall: DEF_WALL },
        );
        assert_eq!(
            v,
            Potential::DoubleWell {
                base: 1.0,
                width: 4.0,
                barrier_width: 0.5,
                barrier_height: 5.0,
                axis: Axis::Y,
            }
        );
    }
}
