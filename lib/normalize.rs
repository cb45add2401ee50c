//! Normalization and sign fixing of raw eigenpairs.
//!
//! Eigensolvers return eigenvectors with arbitrary scale and sign. After
//! [`normalize`], each state satisfies Σ |ψ|² *h*<sup>*d*</sup> = 1 and its
//! first element with magnitude above `1e-3 max|ψ|` is positive, so that
//! repeated solves of the same problem give identical states.

use std::cmp::Ordering;
use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    Arr1,
    error::LengthError,
    solve::Eigenpair,
    units::Units,
    utils::{ wf_dot, wf_renormalize },
};

/// Relative magnitude above which an element may fix the sign of a state.
pub const SIGN_THRESHOLD: f64 = 1e-3;

/// An ordered, orthonormal set of stationary states over the unknowns of a
/// grid.
///
/// States are stored as the rows of a `k × M` array. Once built, an
/// `Eigenbasis` is never modified and can be shared freely between threads.
#[derive(Clone, Debug, PartialEq)]
pub struct Eigenbasis {
    energies: nd::Array1<f64>,
    states: nd::Array2<f64>,
    cell_volume: f64,
    units: Units,
}

impl Eigenbasis {
    /// Number of states.
    pub fn len(&self) -> usize { self.energies.len() }

    /// Return `true` if there are no states.
    pub fn is_empty(&self) -> bool { self.energies.is_empty() }

    /// Number of grid unknowns per state.
    pub fn n_unknowns(&self) -> usize { self.states.ncols() }

    /// Energies in ascending order.
    pub fn energies(&self) -> nd::ArrayView1<'_, f64> { self.energies.view() }

    /// Energy of the `n`-th state.
    ///
    /// *Panics if `n` is out of bounds*.
    pub fn energy(&self, n: usize) -> f64 { self.energies[n] }

    /// All states, one per row.
    pub fn states(&self) -> nd::ArrayView2<'_, f64> { self.states.view() }

    /// The `n`-th state.
    ///
    /// *Panics if `n` is out of bounds*.
    pub fn state(&self, n: usize) -> nd::ArrayView1<'_, f64> {
        self.states.row(n)
    }

    /// Quadrature weight *h*<sup>*d*</sup> of the grid the basis lives on.
    pub fn cell_volume(&self) -> f64 { self.cell_volume }

    /// Units used to compute the energies.
    pub fn units(&self) -> Units { self.units }

    /// Replace the units attached to the basis.
    pub fn with_units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }

    /// Compute the quadrature inner product ⟨ψ<sub>*n*</sub>|*φ*⟩ with an
    /// arbitrary complex wavefunction over the same unknowns.
    pub fn inner<S>(&self, n: usize, phi: &Arr1<S>) -> Result<C64, LengthError>
    where S: nd::Data<Elem = C64>
    {
        LengthError::check_len(self.n_unknowns(), phi.len())?;
        let psi_n: nd::Array1<C64> = self.state(n).mapv(C64::from);
        Ok(wf_dot(&psi_n, phi, self.cell_volume))
    }

    /// Compute the matrix of inner products between all states, which is the
    /// identity up to the solver tolerance.
    pub fn gram(&self) -> nd::Array2<f64> {
        let mut g = self.states.dot(&self.states.t());
        g *= self.cell_volume;
        g
    }

    /// Form the superposition Σ *c*<sub>*n*</sub> ψ<sub>*n*</sub>.
    pub fn reconstruct<S>(&self, coeffs: &Arr1<S>)
        -> Result<nd::Array1<C64>, LengthError>
    where S: nd::Data<Elem = C64>
    {
        LengthError::check_len(self.len(), coeffs.len())?;
        let mut psi: nd::Array1<C64> = nd::Array1::zeros(self.n_unknowns());
        coeffs.iter().zip(self.states.rows())
            .for_each(|(cn, psi_n)| {
                psi.iter_mut().zip(psi_n)
                    .for_each(|(pk, qk)| { *pk += *cn * *qk; });
            });
        Ok(psi)
    }
}

// flip `q` so that its first significant element is positive
fn fix_sign<S>(q: &mut nd::ArrayBase<S, nd::Ix1>)
where S: nd::DataMut<Elem = f64>
{
    let max = q.iter().fold(0.0_f64, |acc, qk| acc.max(qk.abs()));
    let first
        = q.iter()
        .find(|qk| qk.abs() > SIGN_THRESHOLD * max)
        .copied();
    if first.is_some_and(|qk| qk < 0.0) {
        q.mapv_inplace(|qk| -qk);
    }
}

/// Normalize and sign-fix a set of eigenpairs, returning them as an
/// [`Eigenbasis`] sorted by ascending energy.
///
/// The returned basis carries atomic [`Units`]; attach others with
/// [`Eigenbasis::with_units`].
///
/// *Panics if the eigenvectors have unequal lengths*.
pub fn normalize(mut eigenpairs: Vec<Eigenpair>, cell_volume: f64) -> Eigenbasis {
    eigenpairs.sort_by(|l, r| l.cmp_energy(r).unwrap_or(Ordering::Equal));
    let m = eigenpairs.first().map(|p| p.wf.len()).unwrap_or(0);
    let mut energies: nd::Array1<f64> = nd::Array1::zeros(eigenpairs.len());
    let mut states: nd::Array2<f64> = nd::Array2::zeros((eigenpairs.len(), m));
    let iter
        = eigenpairs.into_iter()
        .zip(energies.iter_mut().zip(states.rows_mut()));
    for (Eigenpair { e, mut wf }, (en, mut row)) in iter {
        assert_eq!(wf.len(), m, "normalize: unequal eigenvector lengths");
        wf_renormalize(&mut wf, cell_volume);
        fix_sign(&mut wf);
        *en = e;
        row.assign(&wf);
    }
    Eigenbasis { energies, states, cell_volume, units: Units::default() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs() -> Vec<Eigenpair> {
        vec![
            Eigenpair { e: 2.0, wf: nd::array![0.0, 0.0, -3.0] },
            Eigenpair { e: 1.0, wf: nd::array![-1e-5, 2.0, 0.0] },
        ]
    }

    #[test]
    fn sorted_and_normalized() {
        let basis = normalize(pairs(), 0.25);
        assert_eq!(basis.len(), 2);
        assert_eq!(basis.energies(), nd::array![1.0, 2.0]);
        for n in 0..2 {
            let norm: f64 = basis.state(n).iter().map(|q| q * q).sum::<f64>() * 0.25;
            assert!((norm - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn sign_convention() {
        let basis = normalize(pairs(), 1.0);
        // the tiny first element of the ground state is below threshold
        assert!(basis.state(0)[0] < 0.0);
        assert!(basis.state(0)[1] > 0.0);
        assert!(basis.state(1)[2] > 0.0);

        let flipped: Vec<Eigenpair>
            = pairs().into_iter()
            .map(|Eigenpair { e, wf }| Eigenpair { e, wf: -wf })
            .collect();
        assert_eq!(normalize(flipped, 1.0), basis);
    }

    #[test]
    fn reconstruct_and_inner() {
        let basis = normalize(pairs(), 1.0);
        let c = nd::array![C64::new(0.0, 1.0), C64::new(2.0, 0.0)];
        let psi = basis.reconstruct(&c).unwrap();
        let c0 = basis.inner(0, &psi).unwrap();
        assert!((c0 - c[0]).norm() < 1e-9);
        assert!(basis.reconstruct(&nd::array![C64::new(1.0, 0.0)]).is_err());
    }
}
