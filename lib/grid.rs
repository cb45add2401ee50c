//! Uniform coordinate grids and the second-order finite-difference Laplacian.
//!
//! The set of *unknowns* on a grid depends on the [`Boundary`] policy. Under
//! [`Boundary::Dirichlet`] the edge points carry ψ = 0 and are excluded, so an
//! axis of `N` points contributes `N - 2` unknowns. Under
//! [`Boundary::Periodic`] the last point is identified with the first and an
//! axis contributes `N - 1` unknowns.
//!
//! In two dimensions the unknowns are flattened in row-major order with the x
//! axis slowest: the unknown at interior indices `(i, j)` sits at `i * m + j`,
//! where `m` is the number of unknowns per axis.

use std::{ fmt, hash::{ Hash, Hasher } };
use ndarray as nd;
use num_traits::Zero;
use serde::{ Deserialize, Serialize };
use crate::{
    Arr1,
    error::{ ConfigError, GridError, LengthError },
    solve::XResult,
    sparse::CsrMatrix,
};

pub type GridResult<T> = Result<T, GridError>;

/// Spatial dimensionality.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum Dim {
    One,
    Two,
}

impl Dim {
    /// Get the number of axes.
    pub fn n(self) -> usize {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

impl TryFrom<usize> for Dim {
    type Error = ConfigError;

    fn try_from(d: usize) -> Result<Self, Self::Error> {
        match d {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            _ => Err(ConfigError::BadDimension(d)),
        }
    }
}

impl From<Dim> for usize {
    fn from(d: Dim) -> Self { d.n() }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}D", self.n())
    }
}

/// Boundary policy for the edges of the domain.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    /// ψ = 0 on the domain edges; edge points are not unknowns.
    #[default]
    Dirichlet,
    /// The domain wraps around; the last point on each axis coincides with
    /// the first.
    Periodic,
}

/// A uniform coordinate grid in one or two dimensions.
///
/// Every axis has the same number of points and the same spacing.
#[derive(Clone, Debug)]
pub struct Grid {
    dim: Dim,
    n: usize,
    bounds: Vec<(f64, f64)>,
    h: f64,
    boundary: Boundary,
    axes: Vec<nd::Array1<f64>>,
}

impl PartialEq for Grid {
    fn eq(&self, other: &Self) -> bool {
        self.dim == other.dim
            && self.n == other.n
            && self.bounds == other.bounds
            && self.boundary == other.boundary
    }
}

impl Hash for Grid {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.dim.hash(state);
        self.n.hash(state);
        self.boundary.hash(state);
        self.bounds.iter()
            .for_each(|(a, b)| { a.to_bits().hash(state); b.to_bits().hash(state); });
    }
}

impl Grid {
    /// Create a new grid from per-axis `(min, max)` bounds (inclusive) and a
    /// per-axis point count.
    ///
    /// Fails if `n_points < 3`, if any axis has bad bounds, if the number of
    /// bounds doesn't match `dim`, or if axes have different lengths.
    pub fn new(
        dim: Dim,
        bounds: &[(f64, f64)],
        n_points: usize,
        boundary: Boundary,
    ) -> GridResult<Self>
    {
        if n_points < 3 { return Err(GridError::TooFewPoints(n_points)); }
        LengthError::check_len(bounds.len(), dim.n())?;
        for &(a, b) in bounds.iter() {
            if !(a.is_finite() && b.is_finite() && a < b) {
                return Err(GridError::BadBounds(a, b));
            }
        }
        let len0 = bounds[0].1 - bounds[0].0;
        for &(a, b) in bounds.iter().skip(1) {
            let len = b - a;
            if (len - len0).abs() > 1e-12 * len0 {
                return Err(GridError::NonSquare(len0, len));
            }
        }
        let h = len0 / (n_points - 1) as f64;
        let axes: Vec<nd::Array1<f64>>
            = bounds.iter()
            .map(|&(a, b)| nd::Array1::linspace(a, b, n_points))
            .collect();
        Ok(Self { dim, n: n_points, bounds: bounds.to_vec(), h, boundary, axes })
    }

    /// Get the dimensionality.
    pub fn dim(&self) -> Dim { self.dim }

    /// Get the number of points per axis.
    pub fn n_points(&self) -> usize { self.n }

    /// Get the axis bounds.
    pub fn bounds(&self) -> &[(f64, f64)] { &self.bounds }

    /// Get the grid spacing.
    pub fn spacing(&self) -> f64 { self.h }

    /// Get the length of each axis.
    pub fn length(&self) -> f64 { self.bounds[0].1 - self.bounds[0].0 }

    /// Get the boundary policy.
    pub fn boundary(&self) -> Boundary { self.boundary }

    /// Get the quadrature weight of a single grid cell, *h*<sup>*d*</sup>.
    pub fn cell_volume(&self) -> f64 { self.h.powi(self.dim.n() as i32) }

    /// Get the full coordinate array for an axis.
    ///
    /// *Panics if `axis` is not less than the number of axes*.
    pub fn axis(&self, axis: usize) -> &nd::Array1<f64> { &self.axes[axis] }

    // index range of unknowns along each axis
    fn interior_range(&self) -> std::ops::Range<usize> {
        match self.boundary {
            Boundary::Dirichlet => 1..self.n - 1,
            Boundary::Periodic => 0..self.n - 1,
        }
    }

    /// Get the coordinates of the unknowns along an axis.
    ///
    /// *Panics if `axis` is not less than the number of axes*.
    pub fn interior_axis(&self, axis: usize) -> nd::ArrayView1<'_, f64> {
        let r = self.interior_range();
        self.axes[axis].slice(nd::s![r.start..r.end])
    }

    /// Get the number of unknowns per axis.
    pub fn n_axis_unknowns(&self) -> usize { self.interior_range().len() }

    /// Get the total number of unknowns, i.e. the order of the Laplacian.
    pub fn n_unknowns(&self) -> usize {
        self.n_axis_unknowns().pow(self.dim.n() as u32)
    }

    /// Get the coordinates of all unknowns as an array of shape
    /// `(n_unknowns, d)`.
    pub fn interior_coords(&self) -> nd::Array2<f64> {
        let m = self.n_axis_unknowns();
        match self.dim {
            Dim::One => {
                let x = self.interior_axis(0);
                nd::Array2::from_shape_fn((m, 1), |(k, _)| x[k])
            },
            Dim::Two => {
                let x = self.interior_axis(0);
                let y = self.interior_axis(1);
                nd::Array2::from_shape_fn(
                    (m * m, 2),
                    |(k, ax)| if ax == 0 { x[k / m] } else { y[k % m] },
                )
            },
        }
    }

    /// Build the second-order central-difference Laplacian over the unknowns.
    ///
    /// In 2D the operator is the sum of the 1D stencil applied along each axis
    /// independently, stored sparsely.
    pub fn laplacian(&self) -> CsrMatrix {
        let m = self.n_axis_unknowns();
        let d = self.dim.n();
        let order = self.n_unknowns();
        let c = self.h.powi(2).recip();
        let periodic = self.boundary == Boundary::Periodic;
        let mut triplets: Vec<(usize, usize, f64)>
            = Vec::with_capacity(order * (2 * d + 1));
        // axis 0 has stride m^(d - 1); the last axis has stride 1
        for ax in 0..d {
            let stride = m.pow((d - 1 - ax) as u32);
            for k in 0..order {
                let i = (k / stride) % m;
                triplets.push((k, k, -2.0 * c));
                if i > 0 {
                    triplets.push((k, k - stride, c));
                } else if periodic {
                    triplets.push((k, k + (m - 1) * stride, c));
                }
                if i < m - 1 {
                    triplets.push((k, k + stride, c));
                } else if periodic {
                    triplets.push((k, k - (m - 1) * stride, c));
                }
            }
        }
        CsrMatrix::from_triplets(order, order, triplets)
    }

    /// Place a vector over the unknowns back onto the full grid, with shape
    /// `[N]` in 1D or `[N, N]` in 2D.
    ///
    /// Dirichlet edge points are set to zero; under periodic boundaries the
    /// last point on each axis copies the first.
    pub fn embed<S, A>(&self, u: &Arr1<S>) -> Result<nd::ArrayD<A>, LengthError>
    where
        S: nd::Data<Elem = A>,
        A: Clone + Zero,
    {
        LengthError::check_len(u.len(), self.n_unknowns())?;
        let n = self.n;
        let m = self.n_axis_unknowns();
        let r = self.interior_range();
        // map a full-grid index to an unknown index along one axis
        let to_unknown = |i: usize| -> Option<usize> {
            match self.boundary {
                Boundary::Dirichlet => {
                    r.contains(&i).then(|| i - r.start)
                },
                Boundary::Periodic => Some(i % m),
            }
        };
        let full: nd::ArrayD<A>
            = match self.dim {
                Dim::One => {
                    nd::ArrayD::from_shape_fn(nd::IxDyn(&[n]), |ix| {
                        to_unknown(ix[0])
                            .map(|i| u[i].clone())
                            .unwrap_or_else(A::zero)
                    })
                },
                Dim::Two => {
                    nd::ArrayD::from_shape_fn(nd::IxDyn(&[n, n]), |ix| {
                        to_unknown(ix[0]).zip(to_unknown(ix[1]))
                            .map(|(i, j)| u[i * m + j].clone())
                            .unwrap_or_else(A::zero)
                    })
                },
            };
        Ok(full)
    }
}

/// Build a Dirichlet grid, discarding the Laplacian.
///
/// See [`discretize`].
pub fn build_grid(dim: usize, bounds: &[(f64, f64)], n_points: usize)
    -> XResult<Grid>
{
    let dim = Dim::try_from(dim)?;
    Ok(Grid::new(dim, bounds, n_points, Boundary::Dirichlet)?)
}

/// Build a grid along with its Laplacian operator.
pub fn discretize(
    dim: Dim,
    bounds: &[(f64, f64)],
    n_points: usize,
    boundary: Boundary,
) -> GridResult<(Grid, CsrMatrix)>
{
    let grid = Grid::new(dim, bounds, n_points, boundary)?;
    let lap = grid.laplacian();
    Ok((grid, lap))
}
