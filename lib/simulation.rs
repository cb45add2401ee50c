//! Higher-level constructs tying a grid, a potential, and its eigenbasis into a
//! single analysis session, with memoization of eigenbases.
//!
//! Eigen-decomposition is by far the most expensive step of the pipeline, so
//! [`Context`] keeps an [`EigenCache`] keyed by a hash of everything that
//! determines a basis: grid parameters, potential kind and parameters, number
//! of states, units, and solver method. The cache is the only shared mutable
//! state; everything it hands out is an immutable [`Arc<Eigenbasis>`].
//!
//! ```
//! use gridspace::{ build_grid, potential::{ Potential, build_potential } };
//! use gridspace::simulation::Context;
//!
//! let ctx = Context::default();
//! let grid = build_grid(1, &[(-8.0, 8.0)], 201).unwrap();
//! let v = build_potential(Potential::harmonic(1.0), 1).unwrap();
//! let a = ctx.solve(&grid, &v, 5).unwrap();
//! let b = ctx.solve(&grid, &v, 5).unwrap();
//! assert!(std::sync::Arc::ptr_eq(&a, &b));
//! assert_eq!(ctx.cache().len(), 1);
//! ```

use std::{
    collections::hash_map::DefaultHasher,
    hash::{ Hash, Hasher },
    sync::Arc,
};
use dashmap::DashMap;
use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    config::SimConfig,
    grid::Grid,
    normalize::Eigenbasis,
    potential::PotentialFn,
    solve::{ Method, XResult, solve_with },
    timedep::{ Snapshots, TResult, WavePacket, evaluate, project },
    units::Units,
};

/// Hash of a complete eigenproblem description.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey(u64);

impl CacheKey {
    /// Compute the key for a problem.
    pub fn new(
        grid: &Grid,
        potential: &PotentialFn,
        n_states: usize,
        units: Units,
        method: &Method,
    ) -> Self
    {
        let mut hasher = DefaultHasher::new();
        grid.hash(&mut hasher);
        potential.hash(&mut hasher);
        n_states.hash(&mut hasher);
        units.hash(&mut hasher);
        method.hash(&mut hasher);
        Self(hasher.finish())
    }
}

/// Concurrency-safe store of computed eigenbases.
///
/// Lookups and inserts may happen from any number of threads. A basis is
/// computed without holding any lock on the map, so two threads missing on
/// the same key may both compute it; the first to insert wins and both
/// receive that copy.
#[derive(Clone, Debug, Default)]
pub struct EigenCache {
    map: Arc<DashMap<CacheKey, Arc<Eigenbasis>>>,
}

impl EigenCache {
    /// Create a new, empty cache.
    pub fn new() -> Self { Self::default() }

    /// Number of stored bases.
    pub fn len(&self) -> usize { self.map.len() }

    /// Return `true` if nothing is stored.
    pub fn is_empty(&self) -> bool { self.map.is_empty() }

    /// Look up a basis.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<Eigenbasis>> {
        self.map.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Return the stored basis for `key`, computing and inserting it with `f`
    /// on a miss. Errors from `f` are returned without touching the cache.
    pub fn get_or_try_insert_with<F, E>(&self, key: CacheKey, f: F)
        -> Result<Arc<Eigenbasis>, E>
    where F: FnOnce() -> Result<Eigenbasis, E>
    {
        if let Some(basis) = self.get(&key) {
            log::debug!("simulation::EigenCache: hit {:016x}", key.0);
            return Ok(basis);
        }
        log::info!("simulation::EigenCache: miss {:016x}; solving", key.0);
        let basis = Arc::new(f()?);
        let stored
            = self.map.entry(key)
            .or_insert(basis)
            .value()
            .clone();
        log::info!(
            "simulation::EigenCache: stored {:016x} ({} entries)",
            key.0,
            self.map.len(),
        );
        Ok(stored)
    }

    /// Remove everything.
    pub fn clear(&self) { self.map.clear(); }
}

/// Execution context carrying the eigenbasis cache and solver settings.
///
/// Cloning a `Context` shares its cache.
#[derive(Clone, Debug, Default)]
pub struct Context {
    cache: EigenCache,
    units: Units,
    method: Method,
}

impl Context {
    /// Create a new context with its own empty cache.
    pub fn new(units: Units, method: Method) -> Self {
        Self { cache: EigenCache::new(), units, method }
    }

    /// Get the cache.
    pub fn cache(&self) -> &EigenCache { &self.cache }

    /// Get the units.
    pub fn units(&self) -> Units { self.units }

    /// Get the solver method.
    pub fn method(&self) -> &Method { &self.method }

    /// Compute, or fetch from the cache, the `n_states` lowest normalized
    /// eigenstates of `potential` on `grid`.
    pub fn solve(&self, grid: &Grid, potential: &PotentialFn, n_states: usize)
        -> XResult<Arc<Eigenbasis>>
    {
        let key = CacheKey::new(grid, potential, n_states, self.units, &self.method);
        self.cache.get_or_try_insert_with(key, || {
            solve_with(grid, potential, n_states, self.units, &self.method)
        })
    }
}

/// A grid, potential, and eigenbasis, plus the expansion coefficients of an
/// initial state once one has been chosen.
#[derive(Clone, Debug)]
pub struct Simulation {
    grid: Arc<Grid>,
    potential: PotentialFn,
    basis: Arc<Eigenbasis>,
    coeffs: Option<nd::Array1<C64>>,
}

impl Simulation {
    /// Solve for (or fetch) the eigenbasis of a problem through `ctx`.
    pub fn new(
        ctx: &Context,
        grid: Grid,
        potential: PotentialFn,
        n_states: usize,
    ) -> XResult<Self>
    {
        let basis = ctx.solve(&grid, &potential, n_states)?;
        Ok(Self { grid: Arc::new(grid), potential, basis, coeffs: None })
    }

    /// Build everything described by a configuration. The context's units and
    /// method are overridden by the configuration's; its cache is shared.
    ///
    /// If the configuration has a `[packet]` section, the packet is projected
    /// onto the basis as the initial state.
    pub fn from_config(ctx: &Context, config: &SimConfig) -> XResult<Self> {
        let (grid, potential) = config.build()?;
        let ctx = Context {
            cache: ctx.cache.clone(),
            units: config.units,
            method: config.solver.clone(),
        };
        let sim = Self::new(&ctx, grid, potential, config.n_states)?;
        match &config.packet {
            Some(packet) => {
                let wp = packet.build(&sim.grid)?;
                Ok(sim.with_initial(&wp)?)
            },
            None => Ok(sim),
        }
    }

    /// Set the initial state by projecting `wave_packet` onto the basis.
    pub fn with_initial(mut self, wave_packet: &WavePacket) -> TResult<Self> {
        self.coeffs = Some(project(&self.basis, wave_packet)?);
        Ok(self)
    }

    /// Get the grid.
    pub fn grid(&self) -> &Grid { &self.grid }

    /// Get the potential.
    pub fn potential(&self) -> &PotentialFn { &self.potential }

    /// Get the eigenbasis.
    pub fn basis(&self) -> &Eigenbasis { &self.basis }

    /// Get the expansion coefficients of the initial state, if set.
    pub fn coeffs(&self) -> Option<nd::ArrayView1<'_, C64>> {
        self.coeffs.as_ref().map(|c| c.view())
    }

    // coefficients of the initial state, or the ground state if none is set
    fn coeffs_or_ground(&self) -> nd::Array1<C64> {
        self.coeffs.clone()
            .unwrap_or_else(|| {
                let mut c = nd::Array1::zeros(self.basis.len());
                c[0] = C64::from(1.0);
                c
            })
    }

    /// Evaluate the state at time `t`. Without an initial state, the ground
    /// state is evolved.
    pub fn state_at(&self, t: f64) -> TResult<WavePacket> {
        evaluate(&self.basis, &self.coeffs_or_ground(), t)
    }

    /// Get a lazy, restartable sequence of states at `times`.
    pub fn snapshots<'a>(&'a self, times: &'a [f64]) -> TResult<Snapshots<'a>> {
        Snapshots::new(&self.basis, self.coeffs_or_ground(), times)
    }

    /// Evaluate the state at each of `times`, in parallel.
    pub fn evolve(&self, times: &[f64]) -> TResult<Vec<WavePacket>> {
        use rayon::prelude::*;
        let coeffs = self.coeffs_or_ground();
        times.par_iter()
            .map(|t| evaluate(&self.basis, &coeffs, *t))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        grid::build_grid,
        potential::{ Potential, build_potential },
        timedep::make_wave_packet,
    };

    fn problem() -> (Grid, PotentialFn) {
        let grid = build_grid(1, &[(-8.0, 8.0)], 201).unwrap();
        let v = build_potential(Potential::harmonic(1.0), 1).unwrap();
        (grid, v)
    }

    #[test]
    fn keys_distinguish_problems() {
        let (grid, v) = problem();
        let u = Units::default();
        let m = Method::Auto;
        let k0 = CacheKey::new(&grid, &v, 4, u, &m);
        assert_eq!(k0, CacheKey::new(&grid, &v, 4, u, &m));
        assert_ne!(k0, CacheKey::new(&grid, &v, 5, u, &m));
        let v2 = build_potential(Potential::harmonic(2.0), 1).unwrap();
        assert_ne!(k0, CacheKey::new(&grid, &v2, 4, u, &m));
        assert_ne!(k0, CacheKey::new(&grid, &v, 4, u, &Method::Dense));
        let grid2 = build_grid(1, &[(-8.0, 8.0)], 203).unwrap();
        assert_ne!(k0, CacheKey::new(&grid2, &v, 4, u, &m));
    }

    #[test]
    fn cache_shared_across_threads() {
        let ctx = Context::default();
        let (grid, v) = problem();
        let (ctx_ref, grid_ref, v_ref) = (&ctx, &grid, &v);
        let bases: Vec<Arc<Eigenbasis>>
            = std::thread::scope(|s| {
                let handles: Vec<_>
                    = (0..4)
                    .map(move |_| {
                        s.spawn(move || ctx_ref.solve(grid_ref, v_ref, 4).unwrap())
                    })
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).collect()
            });
        assert_eq!(ctx.cache().len(), 1);
        let stored = ctx.cache().get(&CacheKey::new(&grid, &v, 4, ctx.units(), ctx.method()))
            .unwrap();
        assert!(bases.iter().all(|b| Arc::ptr_eq(b, &stored)));
    }

    #[test]
    fn failed_solve_not_cached() {
        let ctx = Context::default();
        let (grid, v) = problem();
        assert!(ctx.solve(&grid, &v, grid.n_unknowns()).is_err());
        assert!(ctx.cache().is_empty());
    }

    #[test]
    fn simulation_session() {
        let ctx = Context::default();
        let (grid, v) = problem();
        let wp = make_wave_packet(&grid, &[1.0], 1.0, &[0.0]).unwrap();
        let sim = Simulation::new(&ctx, grid, v, 20).unwrap()
            .with_initial(&wp)
            .unwrap();
        assert!(sim.coeffs().is_some());
        let s0 = sim.state_at(0.0).unwrap();
        assert!((s0.norm() - 1.0).abs() < 1e-6);
        let times = [0.0, 0.5, 1.0];
        let evolved = sim.evolve(&times).unwrap();
        let lazy: Vec<WavePacket> = sim.snapshots(&times).unwrap().collect();
        assert_eq!(evolved, lazy);
        assert_eq!(evolved[0], s0);
    }
}
