//! Provides functions to compute solutions to the time-dependent Schrödinger
//! equation by expansion in a precomputed [`Eigenbasis`].
//!
//! An initial wavefunction ψ₀ is [projected][project] onto the basis,
//! ```text
//! cₙ = Σ ψₙ ψ₀ h^d
//! ```
//! after which the state at any time is a closed-form sum,
//! ```text
//! ψ(t) = Σ cₙ exp(-i Eₙ t / ħ) ψₙ
//! ```
//! There is no internal clock: every time value is evaluated independently, so
//! results do not depend on the order (or concurrency) of the calls. Accuracy
//! is bounded by truncation of the basis and is not checked here; the debug log
//! reports the probability Σ |cₙ|² captured by the basis at projection.
//!
//! In all 2D arrays, the first (or zero-th) axis indexes time.

use std::f64::consts::TAU;
use ndarray as nd;
use num_complex::Complex64 as C64;
use rayon::prelude::*;
use crate::{
    Arr1,
    error::{ ConfigError, LengthError, TError, XError },
    grid::{ Dim, Grid },
    normalize::Eigenbasis,
    solve::XResult,
    utils::{ fft, fft_freq, fft_shift, wf_norm, wf_renormalize },
};

pub type TResult<T> = Result<T, TError>;

/// A complex wavefunction over the unknowns of a grid, optionally tagged with
/// the time at which it was evaluated.
#[derive(Clone, Debug, PartialEq)]
pub struct WavePacket {
    psi: nd::Array1<C64>,
    t: Option<f64>,
    cell_volume: f64,
}

impl WavePacket {
    /// Wrap raw values with no time tag.
    pub fn new(psi: nd::Array1<C64>, cell_volume: f64) -> Self {
        Self { psi, t: None, cell_volume }
    }

    /// Attach a time tag.
    pub fn with_time(mut self, t: f64) -> Self {
        self.t = Some(t);
        self
    }

    /// Get the wavefunction values.
    pub fn psi(&self) -> nd::ArrayView1<'_, C64> { self.psi.view() }

    /// Get the time tag, if any.
    pub fn time(&self) -> Option<f64> { self.t }

    /// Get the quadrature weight of the underlying grid.
    pub fn cell_volume(&self) -> f64 { self.cell_volume }

    /// Take the wavefunction values.
    pub fn into_psi(self) -> nd::Array1<C64> { self.psi }

    /// Compute the probability density |ψ|².
    pub fn density(&self) -> nd::Array1<f64> { self.psi.mapv(|q| q.norm_sqr()) }

    /// Compute the total probability Σ |ψ|² *h*<sup>*d*</sup>.
    pub fn norm(&self) -> f64 { wf_norm(&self.psi, self.cell_volume) }

    /// Compute the expectation value of each position coordinate, given the
    /// grid the packet lives on.
    pub fn position(&self, grid: &Grid) -> TResult<nd::Array1<f64>> {
        LengthError::check_len(self.psi.len(), grid.n_unknowns())?;
        let rho = self.density();
        let coords = grid.interior_coords();
        let mean: nd::Array1<f64> = coords.t().dot(&rho) * self.cell_volume;
        Ok(mean)
    }

    /// Compute the momentum-space probability density of a 1D packet,
    /// returning wavenumbers in ascending order alongside the density,
    /// normalized so that Σ |φ(*k*)|² Δ*k* equals [`norm`][Self::norm].
    pub fn momentum_density(&self, grid: &Grid)
        -> TResult<(nd::Array1<f64>, nd::Array1<f64>)>
    {
        if grid.dim() != Dim::One {
            return Err(TError::NotOneDim(grid.dim()));
        }
        LengthError::check_len(self.psi.len(), grid.n_unknowns())?;
        let h = grid.spacing();
        let k = fft_shift(&(fft_freq(self.psi.len(), h) * TAU));
        let scale = h.powi(2) / TAU;
        let rho = fft_shift(&fft(&self.psi).mapv(|f| f.norm_sqr() * scale));
        Ok((k, rho))
    }
}

/// Construct a normalized Gaussian wave packet on the unknowns of a grid,
/// ```text
/// ψ(r) ∝ exp(-|r - r₀|² / 2 w²) exp(i k·r)
/// ```
/// where `center` and `momentum` give one component per axis.
pub fn make_wave_packet(
    grid: &Grid,
    center: &[f64],
    width: f64,
    momentum: &[f64],
) -> XResult<WavePacket>
{
    let d = grid.dim().n();
    LengthError::check_len(center.len(), d)?;
    LengthError::check_len(momentum.len(), d)?;
    ConfigError::check_positive("width", width)?;
    center.iter().chain(momentum)
        .try_for_each(|x| ConfigError::check_finite("wave packet", *x))?;
    let coords = grid.interior_coords();
    let mut psi: nd::Array1<C64>
        = nd::Zip::from(coords.rows())
        .par_map_collect(|r| {
            r.iter().zip(center).zip(momentum)
                .map(|((x, x0), k)| {
                    let g = (-(x - x0).powi(2) / (2.0 * width.powi(2))).exp();
                    g * C64::cis(k * x)
                })
                .product()
        });
    let norm = wf_renormalize(&mut psi, grid.cell_volume());
    if norm == 0.0 || !norm.is_finite() { return Err(XError::ZeroNorm); }
    Ok(WavePacket::new(psi, grid.cell_volume()))
}

/// Compute the expansion coefficients of a wavefunction in an eigenbasis.
pub fn project(basis: &Eigenbasis, wave_packet: &WavePacket)
    -> TResult<nd::Array1<C64>>
{
    LengthError::check_len(basis.n_unknowns(), wave_packet.psi.len())?;
    let dv = basis.cell_volume();
    let coeffs: Vec<C64>
        = (0..basis.len()).into_par_iter()
        .map(|n| {
            basis.state(n).iter().zip(&wave_packet.psi)
                .fold(C64::from(0.0), |acc, (qk, pk)| acc + *qk * *pk)
                * dv
        })
        .collect();
    let coeffs = nd::Array1::from_vec(coeffs);
    let captured: f64 = coeffs.iter().map(|c| c.norm_sqr()).sum();
    log::debug!(
        "timedep::project: {} states capture probability {captured:.6} of {:.6}",
        basis.len(),
        wave_packet.norm(),
    );
    Ok(coeffs)
}

// Σ cₙ exp(-i Eₙ t / ħ) ψₙ without length checks
fn superpose<S>(basis: &Eigenbasis, coeffs: &Arr1<S>, t: f64)
    -> nd::Array1<C64>
where S: nd::Data<Elem = C64>
{
    let hbar = basis.units().hbar;
    let mut psi: nd::Array1<C64> = nd::Array1::zeros(basis.n_unknowns());
    coeffs.iter().zip(basis.energies()).zip(basis.states().rows())
        .for_each(|((cn, En), psi_n)| {
            let a = *cn * C64::cis(-En * t / hbar);
            psi.iter_mut().zip(psi_n)
                .for_each(|(pk, qk)| { *pk += a * *qk; });
        });
    psi
}

/// Evaluate the state with expansion coefficients `coeffs` at time `t`.
///
/// This is a pure function of `t`.
pub fn evaluate<S>(basis: &Eigenbasis, coeffs: &Arr1<S>, t: f64)
    -> TResult<WavePacket>
where S: nd::Data<Elem = C64>
{
    LengthError::check_len(basis.len(), coeffs.len())?;
    let psi = superpose(basis, coeffs, t);
    Ok(WavePacket::new(psi, basis.cell_volume()).with_time(t))
}

/// Project `wave_packet` onto `basis` and evaluate the result at each of
/// `times`, in parallel.
pub fn evolve(basis: &Eigenbasis, wave_packet: &WavePacket, times: &[f64])
    -> TResult<Vec<WavePacket>>
{
    let coeffs = project(basis, wave_packet)?;
    times.par_iter()
        .map(|t| evaluate(basis, &coeffs, *t))
        .collect()
}

/// Like [`evolve`], but starting from expansion coefficients and stacking the
/// results into an array with time on the first axis.
pub fn evolve_array<S, T>(basis: &Eigenbasis, coeffs: &Arr1<S>, times: &Arr1<T>)
    -> TResult<nd::Array2<C64>>
where
    S: nd::Data<Elem = C64> + Sync,
    T: nd::Data<Elem = f64>,
{
    LengthError::check_len(basis.len(), coeffs.len())?;
    let mut q: nd::Array2<C64>
        = nd::Array2::zeros((times.len(), basis.n_unknowns()));
    nd::Zip::from(q.rows_mut()).and(times)
        .par_for_each(|mut qk, tk| {
            qk.assign(&superpose(basis, coeffs, *tk));
        });
    Ok(q)
}

/// Lazy, restartable sequence of [`WavePacket`]s over a fixed set of times.
///
/// Each item is computed on demand from the same coefficients; calling
/// [`restart`][Self::restart] or cloning the iterator replays the sequence
/// exactly.
#[derive(Clone, Debug)]
pub struct Snapshots<'a> {
    basis: &'a Eigenbasis,
    coeffs: nd::Array1<C64>,
    times: &'a [f64],
    cur: usize,
}

impl<'a> Snapshots<'a> {
    /// Create a new sequence.
    pub fn new(basis: &'a Eigenbasis, coeffs: nd::Array1<C64>, times: &'a [f64])
        -> TResult<Self>
    {
        LengthError::check_len(basis.len(), coeffs.len())?;
        Ok(Self { basis, coeffs, times, cur: 0 })
    }

    /// Return to the first time value.
    pub fn restart(&mut self) { self.cur = 0; }

    /// Get the expansion coefficients in use.
    pub fn coeffs(&self) -> nd::ArrayView1<'_, C64> { self.coeffs.view() }
}

impl<'a> Iterator for Snapshots<'a> {
    type Item = WavePacket;

    fn next(&mut self) -> Option<Self::Item> {
        let t = *self.times.get(self.cur)?;
        self.cur += 1;
        let psi = superpose(self.basis, &self.coeffs, t);
        Some(WavePacket::new(psi, self.basis.cell_volume()).with_time(t))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.times.len() - self.cur;
        (n, Some(n))
    }
}

impl<'a> ExactSizeIterator for Snapshots<'a> { }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        grid::{ Boundary, build_grid },
        potential::{ Potential, build_potential },
        solve::solve,
    };

    fn harmonic_basis() -> (Grid, Eigenbasis) {
        let grid = build_grid(1, &[(-8.0, 8.0)], 321).unwrap();
        let v = build_potential(Potential::harmonic(1.0), 1).unwrap();
        let basis = solve(&grid, &v, 30).unwrap();
        (grid, basis)
    }

    #[test]
    fn packet_is_normalized() {
        let grid = build_grid(2, &[(-4.0, 4.0), (-4.0, 4.0)], 41).unwrap();
        let wp = make_wave_packet(&grid, &[0.5, -0.5], 0.8, &[1.0, 0.0])
            .unwrap();
        assert!((wp.norm() - 1.0).abs() < 1e-12);
        assert!(wp.time().is_none());
        let r = wp.position(&grid).unwrap();
        assert!((r[0] - 0.5).abs() < 1e-3);
        assert!((r[1] + 0.5).abs() < 1e-3);
    }

    #[test]
    fn packet_rejects_bad_input() {
        let grid = build_grid(1, &[(-4.0, 4.0)], 41).unwrap();
        assert!(matches!(
            make_wave_packet(&grid, &[0.0], 0.0, &[0.0]),
            Err(XError::Config(ConfigError::BadParam { name: "width", .. }))
        ));
        assert!(matches!(
            make_wave_packet(&grid, &[0.0, 0.0], 1.0, &[0.0]),
            Err(XError::Length(_))
        ));
        assert!(matches!(
            make_wave_packet(&grid, &[1e6], 1.0, &[0.0]),
            Err(XError::ZeroNorm)
        ));
    }

    #[test]
    fn ground_state_is_stationary() {
        let (grid, basis) = harmonic_basis();
        let psi0 = basis.state(0).mapv(C64::from);
        let wp = WavePacket::new(psi0, grid.cell_volume());
        let coeffs = project(&basis, &wp).unwrap();
        assert!((coeffs[0].norm() - 1.0).abs() < 1e-9);
        assert!(coeffs.iter().skip(1).all(|c| c.norm() < 1e-9));
        let later = evaluate(&basis, &coeffs, 3.7).unwrap();
        let rho0 = wp.density();
        let rho1 = later.density();
        assert!(rho0.iter().zip(&rho1).all(|(a, b)| (a - b).abs() < 1e-9));
    }

    #[test]
    fn norm_is_preserved() {
        let (grid, basis) = harmonic_basis();
        let wp = make_wave_packet(&grid, &[1.0], 1.0, &[0.5]).unwrap();
        let times: Vec<f64> = (0..20).map(|k| 0.4 * k as f64).collect();
        let snaps = evolve(&basis, &wp, &times).unwrap();
        assert_eq!(snaps.len(), times.len());
        for (s, t) in snaps.iter().zip(&times) {
            assert_eq!(s.time(), Some(*t));
            assert!((s.norm() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn order_independent() {
        let (grid, basis) = harmonic_basis();
        let wp = make_wave_packet(&grid, &[-1.0], 0.9, &[0.0]).unwrap();
        let coeffs = project(&basis, &wp).unwrap();
        let direct = evaluate(&basis, &coeffs, 0.0).unwrap();
        let _ = evaluate(&basis, &coeffs, 12.5).unwrap();
        let again = evaluate(&basis, &coeffs, 0.0).unwrap();
        assert_eq!(direct, again);
        let recon = basis.reconstruct(&coeffs).unwrap();
        assert!(direct.psi().iter().zip(&recon).all(|(a, b)| (a - b).norm() < 1e-12));

        let times = [0.0, 1.0, 2.0];
        let arr = evolve_array(&basis, &coeffs, &nd::arr1(&times)).unwrap();
        let mut snaps = Snapshots::new(&basis, coeffs.clone(), &times).unwrap();
        assert_eq!(snaps.len(), 3);
        let first: Vec<WavePacket> = snaps.by_ref().collect();
        snaps.restart();
        let second: Vec<WavePacket> = snaps.collect();
        assert_eq!(first, second);
        for (row, s) in arr.rows().into_iter().zip(&first) {
            assert!(row.iter().zip(&s.psi()).all(|(a, b)| (a - b).norm() < 1e-12));
        }
    }

    #[test]
    fn oscillation_period() {
        // a displaced packet in a harmonic trap returns after one period
        let (grid, basis) = harmonic_basis();
        let wp = make_wave_packet(&grid, &[1.5], 1.0, &[0.0]).unwrap();
        let coeffs = project(&basis, &wp).unwrap();
        let half = evaluate(&basis, &coeffs, TAU / 2.0).unwrap();
        let full = evaluate(&basis, &coeffs, TAU).unwrap();
        assert!((half.position(&grid).unwrap()[0] + 1.5).abs() < 2e-2);
        assert!((full.position(&grid).unwrap()[0] - 1.5).abs() < 2e-2);
    }

    #[test]
    fn momentum_density_1d_only() {
        let grid = build_grid(1, &[(-10.0, 10.0)], 401).unwrap();
        let wp = make_wave_packet(&grid, &[0.0], 1.0, &[2.0]).unwrap();
        let (k, rho) = wp.momentum_density(&grid).unwrap();
        let dk = k[1] - k[0];
        assert!((rho.sum() * dk - 1.0).abs() < 1e-9);
        let kmean: f64 = k.iter().zip(&rho).map(|(k, r)| k * r).sum::<f64>() * dk;
        assert!((kmean - 2.0).abs() < 1e-3);

        let grid2 = crate::grid::Grid::new(
            Dim::Two, &[(0.0, 1.0), (0.0, 1.0)], 11, Boundary::Dirichlet)
            .unwrap();
        let wp2 = make_wave_packet(&grid2, &[0.5, 0.5], 0.2, &[0.0, 0.0])
            .unwrap();
        assert!(matches!(wp2.momentum_density(&grid2), Err(TError::NotOneDim(Dim::Two))));
    }
}
