//! Collection of all error types.
//!
//! All errors derive [`thiserror::Error`], making them composable when allowed
//! and compatible with application code using [`anyhow`][anyhow].
//!
//! [anyhow]: https://crates.io/crates/anyhow

use ndarray as nd;
use ndarray_linalg::error::LinalgError;
use thiserror::Error;
use crate::{ grid::Dim, potential::PotentialKind };

/// Returned when an operation requiring equal-length arrays encounters arrays
/// with unequal length.
#[derive(Debug, Error)]
#[error("encountered arrays with incompatible lengths; got {0} and {1}")]
pub struct LengthError(pub usize, pub usize);

impl LengthError {
    pub(crate) fn check<S, A, T, B>(
        a: &nd::ArrayBase<S, nd::Ix1>,
        b: &nd::ArrayBase<T, nd::Ix1>,
    ) -> Result<(), Self>
    where
        S: nd::Data<Elem = A>,
        T: nd::Data<Elem = B>,
    {
        Self::check_len(a.len(), b.len())
    }

    pub(crate) fn check_len(na: usize, nb: usize) -> Result<(), Self> {
        (na == nb).then_some(()).ok_or(Self(na, nb))
    }
}

/// Returned from [`Grid`][crate::grid::Grid] constructors.
#[derive(Debug, Error)]
pub enum GridError {
    /// Returned when fewer than 3 points per axis are requested.
    #[error("grids need at least 3 points per axis; got {0}")]
    TooFewPoints(usize),

    /// Returned when an axis has `max <= min` or non-finite bounds.
    #[error("axis bounds must be finite with min < max; got ({0}, {1})")]
    BadBounds(f64, f64),

    /// Returned when 2D axis lengths differ, which would give unequal spacing.
    #[error("all axes must share the same spacing; got lengths {0} and {1}")]
    NonSquare(f64, f64),

    /// [`LengthError`]
    #[error("bounds length error: {0}")]
    Length(#[from] LengthError),
}

/// Returned when a potential, dimension, or other configuration item is
/// invalid.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Returned when a potential kind is used outside its dimensionality.
    #[error("potential {kind} is not defined in {dim}")]
    Unsupported { kind: PotentialKind, dim: Dim },

    /// Returned when a potential built for one dimensionality is sampled on a
    /// grid of another.
    #[error("potential is defined in {expected} but the grid is {got}")]
    DimMismatch { expected: Dim, got: Dim },

    /// Returned when a dimension other than 1 or 2 is requested.
    #[error("dimension must be 1 or 2; got {0}")]
    BadDimension(usize),

    /// Returned when a numeric parameter is out of range.
    #[error("bad value for parameter `{name}`: {value}")]
    BadParam { name: &'static str, value: f64 },

    /// Returned when a potential evaluates to a non-finite value somewhere on
    /// the grid.
    #[error("potential {kind} is not finite at unknown {index}")]
    NonFinite { kind: PotentialKind, index: usize },

        /// Returned when a configuration file fails to parse.
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Returned when a configuration file can't be read.
    #[error("config read error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub(crate) fn check_positive(name: &'static str, value: f64)
        -> Result<(), Self>
    {
        (value.is_finite() && value > 0.0).then_some(())
            .ok_or(Self::BadParam { name, value })
    }

    pub(crate) fn check_finite(name: &'static str, value: f64)
        -> Result<(), Self>
    {
        value.is_finite().then_some(())
            .ok_or(Self::BadParam { name, value })
    }
}

/// Returned when an iterative method runs out of budget before reaching its
/// tolerance.
#[derive(Debug, Error)]
pub enum ConvergenceError {
    /// The restarted Lanczos iteration failed to converge the requested
    /// eigenpairs.
    #[error(
        "eigensolver did not converge: {requested} states requested with \
        subspace size {subspace}; best residual {residual:.3e}"
    )]
    Eigen { requested: usize, subspace: usize, residual: f64 },

    /// The inner shift-invert linear solve failed to converge.
    #[error(
        "shift-invert linear solve did not converge after {iters} iterations; \
        relative residual {residual:.3e}"
    )]
    LinearSolve { iters: usize, residual: f64 },
}

/// Returned from grid construction, Hamiltonian assembly and eigensolver
/// functions.
#[derive(Debug, Error)]
pub enum XError {
    /// Returned when a non-positive `epsilon` value is encountered.
    #[error("epsilon values must be greater than 0; got {0}")]
    BadEpsilon(f64),

    /// Returned when a zero `maxiters` value is encountered.
    #[error("maxiters must be greater than 0; got {0}")]
    BadMaxiters(usize),

    /// Returned when the requested number of states is zero or not less than
    /// the Hamiltonian's order.
    #[error("number of states must be in 1..{order}; got {k}")]
    BadStates { k: usize, order: usize },

    /// Returned when a wavefunction has zero norm and cannot be normalized.
    #[error("cannot normalize a wavefunction with zero norm")]
    ZeroNorm,

    /// [`LengthError`]
    #[error("array length error: {0}")]
    Length(#[from] LengthError),

    /// [`GridError`]
    #[error("grid error: {0}")]
    Grid(#[from] GridError),

    /// [`ConfigError`]
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// [`ConvergenceError`]
    #[error("convergence error: {0}")]
    Convergence(#[from] ConvergenceError),

    /// [`TError`]
    #[error("time evolution error: {0}")]
    Time(#[from] TError),

    /// [`LinalgError`].
    #[error("linalg error: {0}")]
    Linalg(#[from] LinalgError),
}

impl XError {
    pub(crate) fn check_epsilon(epsilon: f64) -> Result<(), Self> {
        (epsilon > 0.0).then_some(()).ok_or(Self::BadEpsilon(epsilon))
    }

    pub(crate) fn check_maxiters(maxiters: usize) -> Result<(), Self> {
        (maxiters != 0).then_some(()).ok_or(Self::BadMaxiters(maxiters))
    }

    pub(crate) fn check_states(k: usize, order: usize) -> Result<(), Self> {
        (k > 0 && k < order).then_some(()).ok_or(Self::BadStates { k, order })
    }
}

/// Returned from time evolution functions.
#[derive(Debug, Error)]
pub enum TError {
    /// Returned when a wavefunction, coefficient set, or grid does not match
    /// the eigenbasis it is used with.
    #[error("array length error: {0}")]
    Length(#[from] LengthError),

    /// Returned when momentum-space quantities are requested off a 1D grid.
    #[error("momentum-space densities are only computed in 1D; got {0}")]
    NotOneDim(Dim),
}
