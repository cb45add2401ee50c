//! Functions to compute the lowest eigenpairs of a discretized Hamiltonian.
//!
//! Two methods are provided:
//! - [`solve_dense`]: a direct Hermitian eigensolver on the densified matrix,
//!   suited to the small matrices of one-dimensional grids.
//! - [`solve_shift_invert`]: a restarted block Lanczos iteration with full
//!   reorthogonalization, applied to the shift-inverted operator (*H* −
//!   *σ*)⁻¹ with *σ* below the spectrum. Each application of the operator is a
//!   Jacobi-preconditioned conjugate gradient solve, so only sparse
//!   matrix-vector products with *H* are ever needed.
//!
//! Neither method fixes the sign or normalization of the returned
//! eigenvectors; see [`normalize`][crate::normalize].
//!
//! ```
//! use gridspace::{ build_grid, potential::{ Potential, build_potential }, solve };
//!
//! let grid = build_grid(1, &[(0.0, 1.0)], 202).unwrap();
//! let v = build_potential(Potential::infinite_well(), 1).unwrap();
//! let basis = solve::solve(&grid, &v, 3).unwrap();
//! let e1 = std::f64::consts::PI.powi(2) / 2.0;
//! assert!((basis.energy(0) / e1 - 1.0).abs() < 1e-3);
//! assert!((basis.energy(1) / e1 - 4.0).abs() < 1e-2);
//! ```

use std::{ cmp, hash::{ Hash, Hasher } };
use ndarray as nd;
use ndarray_linalg::{ self as la, EighInto };
use rand::{ Rng, SeedableRng, rngs::StdRng };
use serde::{ Deserialize, Serialize };
use crate::{
    Arr1,
    error::{ ConvergenceError, XError },
    grid::{ Dim, Grid },
    hamiltonian::grid_hamiltonian,
    normalize::{ Eigenbasis, normalize },
    potential::PotentialFn,
    sparse::CsrMatrix,
    units::Units,
    DEF_MAXITERS,
};

pub type XResult<T> = Result<T, XError>;

/// Relative tolerance on the Ritz residuals of the shift-inverted operator.
pub const DEF_LANCZOS_EPSILON: f64 = 1e-10;

/// Relative tolerance on the residual of each inner linear solve.
pub const DEF_CG_EPSILON: f64 = 1e-12;

/// Default maximum number of thick restarts.
pub const DEF_MAX_RESTARTS: usize = 200;

/// Largest order for which [`Method::Auto`] picks the dense solver when no
/// grid is available.
pub const DENSE_MAX_ORDER: usize = 2000;

// relative norm below which a new Krylov direction is considered linearly
// dependent on the current basis
const BREAKDOWN: f64 = 1e-10;

/// A single eigenpair of a Hamiltonian.
///
/// This struct is usually only returned by a solver function; you probably
/// won't ever instantiate it yourself. The eigenvector is over the unknowns of
/// the grid, with the solver's own (arbitrary) sign and normalization.
#[derive(Clone, Debug)]
pub struct Eigenpair {
    /// Energy
    pub e: f64,
    /// Eigenvector
    pub wf: nd::Array1<f64>,
}

impl Eigenpair {
    /// Compare two `Eigenpair`s by their energy.
    pub fn cmp_energy(&self, other: &Self) -> Option<cmp::Ordering> {
        self.e.partial_cmp(&other.e)
    }
}

/// Parameters for [`solve_shift_invert`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanczosOptions {
    /// Shift *σ*, which must lie below the lowest eigenvalue (default: a
    /// Gershgorin lower bound, or an estimate from the potential when solving
    /// through [`solve_with`]).
    pub shift: Option<f64>,
    /// Maximum dimension of the Krylov subspace before a restart (default:
    /// `max(2k + 2b, 20)`).
    pub krylov_dim: Option<usize>,
    /// Number of vectors per block (default: `min(k, 4)`).
    pub block_size: Option<usize>,
    /// Maximum number of restarts (default: `200`).
    pub max_restarts: usize,
    /// Relative residual bound for each Ritz pair (default: `1e-10`).
    pub epsilon: f64,
    /// Relative residual bound for the inner linear solves (default:
    /// `1e-12`).
    pub cg_epsilon: Option<f64>,
    /// Maximum number of conjugate gradient iterations per linear solve
    /// (default: `order + 1000`).
    pub cg_maxiters: Option<usize>,
    /// Seed for the starting block.
    pub seed: u64,
}

impl Default for LanczosOptions {
    fn default() -> Self {
        Self {
            shift: None,
            krylov_dim: None,
            block_size: None,
            max_restarts: DEF_MAX_RESTARTS,
            epsilon: DEF_LANCZOS_EPSILON,
            cg_epsilon: None,
            cg_maxiters: None,
            seed: 10546,
        }
    }
}

impl Hash for LanczosOptions {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.shift.map(f64::to_bits).hash(state);
        self.krylov_dim.hash(state);
        self.block_size.hash(state);
        self.max_restarts.hash(state);
        self.epsilon.to_bits().hash(state);
        self.cg_epsilon.map(f64::to_bits).hash(state);
        self.cg_maxiters.hash(state);
        self.seed.hash(state);
    }
}

/// Solving method selector and parameters.
#[derive(Clone, Debug, Default, PartialEq, Hash, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Method {
    /// Use [`Dense`][Self::Dense] for one-dimensional grids and
    /// [`ShiftInvert`][Self::ShiftInvert] for two-dimensional ones.
    #[default]
    Auto,
    /// Use the [dense Hermitian eigensolver][solve_dense].
    Dense,
    /// Use the [shift-invert Lanczos method][solve_shift_invert].
    ShiftInvert(LanczosOptions),
}

impl Method {
    /// Return `true` if `self` is `Auto`.
    pub fn is_auto(&self) -> bool { matches!(self, Self::Auto) }

    /// Return `true` if `self` is `Dense`.
    pub fn is_dense(&self) -> bool { matches!(self, Self::Dense) }

    /// Return `true` if `self` is `ShiftInvert`.
    pub fn is_shift_invert(&self) -> bool {
        matches!(self, Self::ShiftInvert(..))
    }

    // replace `Auto` with a concrete method
    fn resolve_with(&self, dense: bool) -> Self {
        match self {
            Self::Auto if dense => Self::Dense,
            Self::Auto => Self::ShiftInvert(LanczosOptions::default()),
            m => m.clone(),
        }
    }

    // `Auto` is dense in 1D
    fn resolve(&self, dim: Dim) -> Self { self.resolve_with(dim == Dim::One) }

    // `Auto` is dense up to `DENSE_MAX_ORDER`
    fn resolve_order(&self, order: usize) -> Self {
        self.resolve_with(order <= DENSE_MAX_ORDER)
    }
}

/// Compute the `k` lowest eigenpairs of `H` by full diagonalization of its
/// dense form.
///
/// Fails if `k` is zero or not less than the order of `H`.
pub fn solve_dense(H: &CsrMatrix, k: usize) -> XResult<Vec<Eigenpair>> {
    XError::check_states(k, H.order())?;
    let (evals, evecs): (nd::Array1<f64>, nd::Array2<f64>)
        = H.to_dense().eigh_into(la::UPLO::Lower)?;
    let pairs: Vec<Eigenpair>
        = evals.into_iter().zip(evecs.columns())
        .take(k)
        .map(|(e, v)| Eigenpair { e, wf: v.to_owned() })
        .collect();
    Ok(pairs)
}

// the operator (H - σ)⁻¹, applied by preconditioned conjugate gradient
struct ShiftInverse<'a> {
    H: &'a CsrMatrix,
    sigma: f64,
    inv_diag: nd::Array1<f64>,
    epsilon: f64,
    maxiters: usize,
}

impl<'a> ShiftInverse<'a> {
    fn new(H: &'a CsrMatrix, sigma: f64, epsilon: f64, maxiters: usize)
        -> Self
    {
        let inv_diag
            = H.diagonal()
            .mapv(|d| if d - sigma > 0.0 { (d - sigma).recip() } else { 1.0 });
        Self { H, sigma, inv_diag, epsilon, maxiters }
    }

    fn shifted_dot<S>(&self, x: &Arr1<S>) -> nd::Array1<f64>
    where S: nd::Data<Elem = f64>
    {
        let mut y = self.H.dot(x);
        y.scaled_add(-self.sigma, x);
        y
    }

    fn apply<S>(&self, b: &Arr1<S>) -> Result<nd::Array1<f64>, ConvergenceError>
    where S: nd::Data<Elem = f64>
    {
        let bnorm = b.dot(b).sqrt();
        let mut x: nd::Array1<f64> = nd::Array1::zeros(b.len());
        if bnorm == 0.0 { return Ok(x); }
        let mut r: nd::Array1<f64> = b.to_owned();
        let mut z: nd::Array1<f64> = &r * &self.inv_diag;
        let mut p: nd::Array1<f64> = z.clone();
        let mut rz: f64 = r.dot(&z);
        let mut res: f64 = 1.0;
        for iter in 0..self.maxiters {
            let ap = self.shifted_dot(&p);
            let pap = p.dot(&ap);
            if pap <= 0.0 {
                // H - σ is not positive definite; σ is above the spectrum
                return Err(ConvergenceError::LinearSolve { iters: iter, residual: res });
            }
            let alpha = rz / pap;
            x.scaled_add(alpha, &p);
            r.scaled_add(-alpha, &ap);
            res = r.dot(&r).sqrt() / bnorm;
            if res <= self.epsilon { return Ok(x); }
            z = &r * &self.inv_diag;
            let rz_new = r.dot(&z);
            let beta = rz_new / rz;
            rz = rz_new;
            p *= beta;
            p += &z;
        }
        Err(ConvergenceError::LinearSolve { iters: self.maxiters, residual: res })
    }
}

// lower bound on the spectrum of a symmetric matrix by Gershgorin's theorem
fn gershgorin_lower(H: &CsrMatrix) -> f64 {
    let mut centers: Vec<f64> = vec![0.0; H.order()];
    let mut radii: Vec<f64> = vec![0.0; H.order()];
    H.iter().for_each(|(r, c, v)| {
        if r == c { centers[r] += v; } else { radii[r] += v.abs(); }
    });
    centers.into_iter().zip(radii)
        .map(|(c, r)| c - r)
        .fold(f64::INFINITY, f64::min)
}

/// Estimate a shift just below the ground state energy of `H`, from the
/// minimum of the potential and the ground state energy of a free particle in
/// a box the size of the grid:
/// ```text
/// σ = min(V) - d (ħ²/2m) (π/L)² / 2
/// ```
/// `H - σ` is always positive definite for Dirichlet and periodic grids.
pub fn default_shift<S>(grid: &Grid, V: &Arr1<S>, units: Units) -> f64
where S: nd::Data<Elem = f64>
{
    let vmin = V.iter().copied().fold(f64::INFINITY, f64::min);
    vmin - 0.5 * units.box_energy(grid.length(), grid.dim().n())
}

// orthogonalize `v` against `basis` (two passes) and normalize it, returning
// `false` if `v` is numerically dependent on `basis`
fn orthonormalize(v: &mut nd::Array1<f64>, basis: &[nd::Array1<f64>]) -> bool {
    let norm0 = v.dot(v).sqrt();
    if norm0 == 0.0 { return false; }
    for _ in 0..2 {
        for q in basis.iter() {
            let c = q.dot(v);
            v.scaled_add(-c, q);
        }
    }
    let norm = v.dot(v).sqrt();
    if norm <= BREAKDOWN * norm0 { return false; }
    *v /= norm;
    true
}

// Σ_j c[j] vs[j]
fn combine<S>(vs: &[nd::Array1<f64>], c: &Arr1<S>) -> nd::Array1<f64>
where S: nd::Data<Elem = f64>
{
    let mut out: nd::Array1<f64> = nd::Array1::zeros(vs[0].len());
    vs.iter().zip(c).for_each(|(v, ck)| { out.scaled_add(*ck, v); });
    out
}

fn random_vec(rng: &mut StdRng, n: usize) -> nd::Array1<f64> {
    (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

// grow the basis `q` (with images `aq`) block by block until it reaches
// `m_max` vectors, starting from the candidate block `cand`
#[allow(clippy::too_many_arguments)]
fn expand(
    op: &ShiftInverse,
    q: &mut Vec<nd::Array1<f64>>,
    aq: &mut Vec<nd::Array1<f64>>,
    mut cand: Vec<nd::Array1<f64>>,
    m_max: usize,
    block: usize,
    rng: &mut StdRng,
) -> XResult<()>
{
    let n = op.H.order();
    let mut refills: usize = 0;
    while q.len() < m_max {
        let mut next: Vec<nd::Array1<f64>> = Vec::with_capacity(block);
        for mut v in cand.into_iter() {
            if q.len() >= m_max { break; }
            if !orthonormalize(&mut v, q) { continue; }
            let av = op.apply(&v)?;
            q.push(v);
            aq.push(av.clone());
            next.push(av);
        }
        if next.is_empty() {
            // the basis spans an invariant subspace; continue from fresh
            // random directions
            if q.len() >= n || refills >= n { break; }
            refills += 1;
            next = (0..block).map(|_| random_vec(rng, n)).collect();
        }
        cand = next;
    }
    Ok(())
}

/// Compute the `k` lowest eigenpairs of a symmetric `H` by a thick-restarted
/// block Lanczos iteration on (*H* − *σ*)⁻¹.
///
/// The shift *σ* must lie strictly below the lowest eigenvalue of `H`; if
/// `opts.shift` is `None`, a Gershgorin lower bound is used, which is always
/// valid but may converge slowly.
///
/// Fails if `k` is zero or not less than the order of `H`, or with
/// [`ConvergenceError`] if the requested pairs are not converged within
/// `opts.max_restarts` restarts or an inner linear solve fails.
pub fn solve_shift_invert(H: &CsrMatrix, k: usize, opts: &LanczosOptions)
    -> XResult<Vec<Eigenpair>>
{
    let n = H.order();
    XError::check_states(k, n)?;
    XError::check_epsilon(opts.epsilon)?;
    let cg_epsilon = opts.cg_epsilon.unwrap_or(DEF_CG_EPSILON);
    XError::check_epsilon(cg_epsilon)?;
    let cg_maxiters = opts.cg_maxiters.unwrap_or(n + DEF_MAXITERS);
    XError::check_maxiters(cg_maxiters)?;

    let sigma
        = opts.shift.unwrap_or_else(|| {
            let g = gershgorin_lower(H);
            let sigma = g - 1e-3 * (1.0 + g.abs());
            log::warn!(
                "solve::solve_shift_invert: no shift given; using Gershgorin \
                bound {sigma:.6e}"
            );
            sigma
        });
    let block = opts.block_size.unwrap_or(k.min(4)).clamp(1, n);
    let m_max
        = opts.krylov_dim.unwrap_or((2 * k + 2 * block).max(20))
        .max(k + 1)
        .min(n);
    // Ritz vectors kept across a restart
    let keep = (k + block).min(m_max.saturating_sub(block)).max(k);

    let op = ShiftInverse::new(H, sigma, cg_epsilon, cg_maxiters);
    let mut rng = StdRng::seed_from_u64(opts.seed);
    let mut q: Vec<nd::Array1<f64>> = Vec::with_capacity(m_max);
    let mut aq: Vec<nd::Array1<f64>> = Vec::with_capacity(m_max);
    let mut cand: Vec<nd::Array1<f64>>
        = (0..block).map(|_| random_vec(&mut rng, n)).collect();
    let mut max_res: f64 = f64::INFINITY;

    for restart in 0..=opts.max_restarts {
        expand(&op, &mut q, &mut aq, cand, m_max, block, &mut rng)?;
        let m = q.len();
        if m < k {
            return Err(ConvergenceError::Eigen {
                requested: k, subspace: m, residual: max_res }.into());
        }

        // Rayleigh-Ritz on the projected operator
        let mut T: nd::Array2<f64>
            = nd::Array2::from_shape_fn((m, m), |(i, j)| q[i].dot(&aq[j]));
        let Tt = T.t().to_owned();
        T += &Tt;
        T *= 0.5;
        let (theta, s): (nd::Array1<f64>, nd::Array2<f64>)
            = T.eigh_into(la::UPLO::Lower)?;

        // largest θ ↔ lowest energy
        let l = keep.min(m);
        let order: Vec<usize> = (0..m).rev().take(l).collect();
        let x: Vec<nd::Array1<f64>>
            = order.iter().map(|&j| combine(&q, &s.column(j))).collect();
        let ax: Vec<nd::Array1<f64>>
            = order.iter().map(|&j| combine(&aq, &s.column(j))).collect();
        let resid: Vec<nd::Array1<f64>>
            = order.iter().zip(x.iter().zip(&ax))
            .map(|(&j, (xj, axj))| {
                let mut r = axj.clone();
                r.scaled_add(-theta[j], xj);
                r
            })
            .collect();
        let rel_res: Vec<f64>
            = order.iter().zip(&resid)
            .map(|(&j, r)| r.dot(r).sqrt() / theta[j].abs())
            .collect();
        max_res = rel_res.iter().take(k).copied().fold(0.0, f64::max);
        log::debug!(
            "solve::solve_shift_invert: restart {restart}: subspace {m}, \
            max relative residual {max_res:.3e}"
        );

        if max_res <= opts.epsilon || m >= n {
            let pairs: Vec<Eigenpair>
                = order.iter().zip(x)
                .take(k)
                .map(|(&j, wf)| Eigenpair { e: sigma + theta[j].recip(), wf })
                .collect();
            return Ok(pairs);
        }
        if restart == opts.max_restarts { break; }

        // thick restart: keep the wanted Ritz vectors, continue from the
        // residuals of the unconverged ones
        let mut unconverged: Vec<usize>
            = (0..k).filter(|&i| rel_res[i] > opts.epsilon).collect();
        unconverged.extend(k..l);
        cand = unconverged.into_iter().take(block)
            .map(|i| resid[i].clone())
            .collect();
        q = x;
        aq = ax;
    }
    Err(ConvergenceError::Eigen { requested: k, subspace: m_max, residual: max_res }.into())
}

/// Compute the `k` lowest eigenpairs of `H` with a given method.
///
/// [`Method::Auto`] is resolved from the order of `H`: dense up to
/// [`DENSE_MAX_ORDER`], shift-invert above.
pub fn solve_hamiltonian(H: &CsrMatrix, k: usize, method: &Method)
    -> XResult<Vec<Eigenpair>>
{
    match method.resolve_order(H.order()) {
        Method::ShiftInvert(opts) => solve_shift_invert(H, k, &opts),
        _ => solve_dense(H, k),
    }
}

/// Master solving function: sample `potential` on `grid`, assemble the
/// Hamiltonian, compute `n_states` eigenpairs with `method` and normalize
/// them.
///
/// For [`Method::ShiftInvert`] without an explicit shift, the shift is
/// estimated by [`default_shift`].
pub fn solve_with(
    grid: &Grid,
    potential: &PotentialFn,
    n_states: usize,
    units: Units,
    method: &Method,
) -> XResult<Eigenbasis>
{
    let (H, V) = grid_hamiltonian(grid, potential, units)?;
    XError::check_states(n_states, H.order())?;
    let method
        = match method.resolve(grid.dim()) {
            Method::ShiftInvert(mut opts) => {
                opts.shift.get_or_insert_with(|| default_shift(grid, &V, units));
                Method::ShiftInvert(opts)
            },
            m => m,
        };
    let pairs = solve_hamiltonian(&H, n_states, &method)?;
    Ok(normalize(pairs, grid.cell_volume()).with_units(units))
}

/// Compute the `n_states` lowest normalized eigenpairs of `potential` on
/// `grid`, with *ħ* = *m* = 1 and the method chosen by dimensionality.
pub fn solve(grid: &Grid, potential: &PotentialFn, n_states: usize)
    -> XResult<Eigenbasis>
{
    solve_with(grid, potential, n_states, Units::default(), &Method::Auto)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ grid::{ Boundary, build_grid }, potential::{ Potential, build_potential } };

    fn box_2d(n: usize) -> (Grid, CsrMatrix) {
        let grid = Grid::new(
            Dim::Two, &[(0.0, 1.0), (0.0, 1.0)], n, Boundary::Dirichlet)
            .unwrap();
        let v = build_potential(Potential::infinite_well(), 2).unwrap();
        let (H, _) = grid_hamiltonian(&grid, &v, Units::default()).unwrap();
        (grid, H)
    }

    #[test]
    fn rejects_bad_k() {
        let (_, H) = box_2d(5);
        assert!(matches!(solve_dense(&H, 0), Err(XError::BadStates { .. })));
        assert!(matches!(solve_dense(&H, 9), Err(XError::BadStates { k: 9, order: 9 })));
        assert!(matches!(
            solve_shift_invert(&H, 9, &LanczosOptions::default()),
            Err(XError::BadStates { .. })
        ));
    }

    #[test]
    fn shift_invert_matches_dense() {
        let (_, H) = box_2d(12);
        let dense = solve_dense(&H, 6).unwrap();
        let sparse = solve_shift_invert(&H, 6, &LanczosOptions::default())
            .unwrap();
        for (d, s) in dense.iter().zip(&sparse) {
            assert!((d.e - s.e).abs() < 1e-8 * d.e.abs(), "{} vs {}", d.e, s.e);
        }
    }

    #[test]
    fn eigenvalues_sorted() {
        let (_, H) = box_2d(16);
        let pairs = solve_shift_invert(&H, 8, &LanczosOptions::default())
            .unwrap();
        assert!(pairs.iter().zip(pairs.iter().skip(1)).all(|(a, b)| a.e <= b.e));
    }

    #[test]
    fn reports_nonconvergence() {
        let (_, H) = box_2d(41);
        let opts = LanczosOptions {
            shift: Some(0.0),
            krylov_dim: Some(8),
            block_size: Some(4),
            max_restarts: 0,
            epsilon: 1e-14,
            ..LanczosOptions::default()
        };
        match solve_shift_invert(&H, 4, &opts) {
            Err(XError::Convergence(ConvergenceError::Eigen { requested, subspace, residual })) => {
                assert_eq!(requested, 4);
                assert_eq!(subspace, 8);
                assert!(residual > 1e-14);
            },
            other => panic!("expected convergence error, got {other:?}"),
        }
    }

    #[test]
    fn shift_above_spectrum_fails_inner_solve() {
        let (_, H) = box_2d(12);
        let opts = LanczosOptions { shift: Some(1e4), ..LanczosOptions::default() };
        assert!(matches!(
            solve_shift_invert(&H, 2, &opts),
            Err(XError::Convergence(ConvergenceError::LinearSolve { .. }))
        ));
    }

    #[test]
    fn auto_is_dense_in_1d() {
        assert!(Method::Auto.resolve(Dim::One).is_dense());
        assert!(Method::Auto.resolve(Dim::Two).is_shift_invert());
        assert!(Method::Auto.resolve_order(DENSE_MAX_ORDER).is_dense());
        assert!(Method::Auto.resolve_order(DENSE_MAX_ORDER + 1).is_shift_invert());
        assert!(Method::Dense.resolve_order(DENSE_MAX_ORDER + 1).is_dense());
        let grid = build_grid(1, &[(-5.0, 5.0)], 101).unwrap();
        let v = build_potential(Potential::harmonic(1.0), 1).unwrap();
        let basis = solve(&grid, &v, 2).unwrap();
        assert!((basis.energy(0) - 0.5).abs() < 1e-2);
    }
}
