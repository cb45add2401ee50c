//! Assembly of the discretized Hamiltonian,
//! ```text
//!      ħ²
//! H = --- (-∇²) + diag(V)
//!     2 m
//! ```
//! from a finite-difference Laplacian and potential samples on the same set of
//! unknowns.

use ndarray as nd;
use crate::{
    Arr1,
    error::LengthError,
    grid::Grid,
    potential::PotentialFn,
    solve::XResult,
    sparse::CsrMatrix,
    units::Units,
};

/// Build *H* = −(*ħ*²/2*m*) `laplacian` + diag(`potential_values`).
///
/// Fails if `laplacian` is not square or if `potential_values` does not have
/// one entry per row of `laplacian`.
pub fn build_hamiltonian<S>(
    laplacian: &CsrMatrix,
    potential_values: &Arr1<S>,
    units: Units,
) -> XResult<CsrMatrix>
where S: nd::Data<Elem = f64>
{
    let (nrows, ncols) = laplacian.shape();
    LengthError::check_len(nrows, ncols)?;
    LengthError::check_len(nrows, potential_values.len())?;
    units.validate()?;
    let H = laplacian.scaled(-units.kinetic()).plus_diag(potential_values)?;
    Ok(H)
}

/// Sample `potential` on `grid` and assemble the Hamiltonian over the grid's
/// unknowns.
///
/// The potential is checked against the grid before anything is assembled.
pub fn grid_hamiltonian(grid: &Grid, potential: &PotentialFn, units: Units)
    -> XResult<(CsrMatrix, nd::Array1<f64>)>
{
    let V = potential.sample(grid)?;
    let H = build_hamiltonian(&grid.laplacian(), &V, units)?;
    Ok((H, V))
}
