//! Theoretical background.
//!
//! # Contents
//! - [Background](#background)
//! - [Boundaries and truncation](#boundaries-and-truncation)
//! - [Units](#units)
//! - [Shift-invert iteration](#shift-invert-iteration)
//! - [Time dependence](#time-dependence)
//!
//! # Background
//! Stationary states of a particle of mass *m* in a conservative potential
//! *V* are the eigenpairs of the Hamiltonian
//! ```text
//!      ħ²
//! H = --- (-∇²) + V(r)
//!     2 m
//! ```
//! Placing the problem on a uniform grid with spacing *h* and replacing the
//! second derivative along each axis by the three-point central difference
//! ```text
//! ∂²f    f[i + 1] - 2 f[i] + f[i - 1]
//! --- ≈ ----------------------------- + O(h²)
//! ∂x²               h²
//! ```
//! turns *H* into a real symmetric matrix whose eigenpairs approximate those of
//! the continuous operator. In two dimensions the Laplacian is the sum of the
//! one-dimensional stencils along *x* and *y*, which gives the familiar
//! five-point stencil. This sum is assembled directly in sparse form rather than
//! as a Kronecker product of dense matrices, so memory stays proportional to
//! the number of unknowns *M* (*M* = (*N* - 2)² for a Dirichlet grid of
//! *N* × *N* points) instead of *M*².
//!
//! The discretization error in each eigenvalue is *O*(*h*²). For the lowest
//! states of a box of side *L*,
//! ```text
//!         ħ² π² n²          π² n² h²
//! E[n] = --------- (1 - ----------- + ...)
//!         2 m L²             12 L²
//! ```
//! so the discrete spectrum approaches the continuous one from below.
//!
//! Integrals are replaced by sums weighted by the cell volume *h*<sup>*d*</sup>,
//! ```text
//! ⟨f|g⟩ = Σ conj(f[i]) g[i] h^d
//! ```
//! which is also the trapezoidal rule on the full grid, because the omitted
//! edge points carry zero weight under Dirichlet boundaries. With this inner
//! product the eigenvectors of the symmetric matrix are orthonormal, and
//! Σ |ψ|² *h*<sup>*d*</sup> = 1 is the discrete analogue of ∫ |ψ|² d*V* = 1.
//!
//! # Boundaries and truncation
//! Under Dirichlet boundaries the wavefunction is forced to zero on the edge
//! of the domain, so every problem is solved inside an implicit infinite box.
//! For confining potentials (a well that covers the domain, or a harmonic trap
//! whose ground-state size is well below the domain size) this is exact up to
//! exponentially small tails. For finite potentials such as barriers, double
//! wells, and Morse potentials, the hard wall at the domain edge is an
//! artificial truncation of the true unbounded problem: continuum states become
//! discrete box states, and any state with significant weight near the edge
//! feels the wall. This is an inherent modeling approximation of a finite
//! grid, and is not corrected for; enlarge the domain until the states of
//! interest are insensitive to it.
//!
//! Under periodic boundaries the last point of each axis is identified with
//! the first and the stencil wraps around, describing a particle on a ring
//! (1D) or torus (2D). The free spectrum is then doubly degenerate above the
//! ground state, which the block iteration described below handles without
//! special treatment.
//!
//! # Units
//! By default *ħ* = *m* = 1, so that energies are measured in units of
//! *ħ*²/*m* *a*² and times in units of *m* *a*²/*ħ* for whatever length *a* the
//! grid coordinates are measured in. Both constants can be set explicitly
//! through [`Units`][crate::units::Units], in which case the kinetic prefactor
//! becomes *ħ*²/2*m* and the evolution phase becomes *E* *t*/*ħ*.
//!
//! # Shift-invert iteration
//! On a two-dimensional grid, *H* has order (*N* - 2)², far too large to
//! diagonalize densely, but only the lowest few eigenpairs are needed. These
//! are the eigenpairs of largest magnitude of the shifted inverse
//! ```text
//!                 1
//! A = (H - σ)⁻¹,  θ = -----
//!                 E - σ
//! ```
//! for any shift *σ* below the ground state energy, and Krylov methods converge
//! fastest to exactly the largest-magnitude part of a spectrum. The shift is
//! placed below the minimum of the potential by half the ground-state energy
//! of a free particle in the grid's box, which guarantees that *H* - *σ* is
//! positive definite. Each application of *A* is then a linear solve with a
//! symmetric positive-definite sparse matrix, done with the conjugate gradient
//! method and diagonal (Jacobi) preconditioning, which copes well with the
//! large diagonal entries produced by high potential walls.
//!
//! The outer iteration is a block Lanczos method with full
//! reorthogonalization and thick restarts[^1]: a basis *Q* of the Krylov
//! space is grown block by block up to a maximum dimension, the projected
//! matrix *Q*ᵀ *A* *Q* is diagonalized (Rayleigh-Ritz), and the basis is
//! restarted from the best Ritz vectors plus the residuals of those not yet
//! converged. A pair (θ, *x*) is accepted when
//! ```text
//! ‖A x - θ x‖ ≤ ε |θ|
//! ```
//! Working with blocks rather than single vectors allows degenerate
//! eigenvalues (common in symmetric 2D potentials) to be resolved fully.
//!
//! # Time dependence
//! Since *H* is time-independent, the time-dependent Schrödinger equation
//! ```text
//!   ∂ψ
//! i -- = H ψ / ħ
//!   ∂t
//! ```
//! is solved exactly in the eigenbasis. Projecting an initial state gives
//! ```text
//! c[n] = ⟨ψ[n]|ψ(0)⟩
//! ```
//! and the state at any later (or earlier) time is
//! ```text
//! ψ(t) = Σ c[n] exp(-i E[n] t / ħ) ψ[n]
//! ```
//! Each time value is evaluated independently of every other, without
//! stepping, so there is no accumulation of error and no dependence on the
//! order in which times are requested. The only approximation is truncation of
//! the sum to the *k* computed states; the fraction Σ |*c*[*n*]|² of the
//! initial probability captured by the basis measures its effect, and the norm
//! of ψ(*t*) is exactly this fraction at all times.
//!
//! [^1]: K. Wu and H. Simon, "Thick-restart Lanczos method for large symmetric
//! eigenvalue problems." SIAM J. Matrix Anal. Appl. **22** 2 602-616 (2000).
