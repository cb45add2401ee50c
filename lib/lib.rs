#![allow(dead_code, non_snake_case)]

//! Provides functions and higher-level constructs for the finite-difference
//! solution of the time-independent Schrödinger equation in one and two
//! dimensions, and for time evolution of wave packets by expansion in the
//! resulting eigenstates.
//!
//! The pipeline runs strictly downstream:
//! - [`grid`]: uniform grids and the sparse second-order Laplacian
//! - [`potential`]: a closed set of potential kinds, validated against the
//!   grid's dimensionality on construction
//! - [`hamiltonian`]: assembly of *H* = -(*ħ*²/2*m*) ∇² + *V*
//! - [`solve`]: lowest eigenpairs, by dense diagonalization (1D) or
//!   shift-invert block Lanczos (2D)
//! - [`normalize`]: quadrature normalization and a fixed sign convention
//! - [`timedep`]: projection of initial states and evaluation at arbitrary
//!   times
//! - [`simulation`]: an explicit execution context with a concurrency-safe
//!   eigenbasis cache
//!
//! Problems can also be described in TOML; see [`config`].
//!
//! ```
//! use gridspace::{ build_grid, build_potential, solve, make_wave_packet, evolve };
//! use gridspace::potential::Potential;
//!
//! let grid = build_grid(1, &[(-8.0, 8.0)], 401).unwrap();
//! let v = build_potential(Potential::harmonic(1.0), 1).unwrap();
//! let basis = solve(&grid, &v, 20).unwrap();
//! assert!((basis.energy(0) - 0.5).abs() < 1e-3);
//!
//! let wp = make_wave_packet(&grid, &[1.0], 1.0, &[0.0]).unwrap();
//! let states = evolve(&basis, &wp, &[0.0, 1.0, 2.0]).unwrap();
//! assert!(states.iter().all(|s| (s.norm() - 1.0).abs() < 1e-6));
//! ```
//!
//! See [`docs`] for theoretical background.

pub mod error;
pub mod units;
pub mod sparse;
pub mod grid;
pub mod potential;
pub mod hamiltonian;
pub mod solve;
pub mod normalize;
pub mod timedep;
pub mod simulation;
pub mod config;
pub mod utils;

pub mod docs;

pub use crate::{
    grid::build_grid,
    potential::build_potential,
    solve::solve,
    timedep::{ evolve, make_wave_packet },
};

pub(crate) const DEF_MAXITERS: usize = 1000;

pub type Arr1<S> = ndarray::ArrayBase<S, ndarray::Ix1>;
