//! Grid-quadrature inner products and FFT helpers.
//!
//! All integrals over the unknowns of a grid use the same rule: a plain sum of
//! pointwise values weighted by the cell volume `dv` = *h*<sup>*d*</sup>.
//! Under Dirichlet boundaries the excluded edge points carry ψ = 0, so this is
//! also the trapezoidal rule over the full grid.

use ndarray::{ self as nd, Ix1, concatenate };
use ndarray_linalg::Scalar;
use num_traits::Zero;
use rustfft as fft;
use num_complex::Complex64 as C64;

/// Calculate the squared norm Σ |q|² `dv` of a wavefunction.
pub fn wf_norm<S, A>(q: &nd::ArrayBase<S, Ix1>, dv: A::Real) -> A::Real
where
    S: nd::Data<Elem = A>,
    A: Scalar,
{
    q.iter()
        .fold(A::Real::zero(), |acc, qk| acc + qk.square())
        * dv
}

/// Calculate the inner product Σ conj(q) p `dv` of two wavefunctions.
///
/// *Panics if the arrays have unequal lengths*.
pub fn wf_dot<S, T, A>(
    q: &nd::ArrayBase<S, Ix1>,
    p: &nd::ArrayBase<T, Ix1>,
    dv: A::Real,
) -> A
where
    S: nd::Data<Elem = A>,
    T: nd::Data<Elem = A>,
    A: Scalar,
{
    assert_eq!(q.len(), p.len(), "utils::wf_dot: unequal lengths");
    q.iter().zip(p)
        .fold(A::zero(), |acc, (qk, pk)| acc + qk.conj() * *pk)
        * A::from_real(dv)
}

/// Renormalize a wavefunction in place, returning its original norm
/// (not squared).
///
/// The wavefunction is left unchanged if its norm is zero.
pub fn wf_renormalize<S, A>(q: &mut nd::ArrayBase<S, Ix1>, dv: A::Real)
    -> A::Real
where
    S: nd::DataMut<Elem = A>,
    A: Scalar,
{
    let norm = wf_norm(q, dv).sqrt();
    if norm > A::Real::zero() {
        let norm_a = A::from_real(norm);
        q.iter_mut().for_each(|qk| { *qk /= norm_a; });
    }
    norm
}

/// Generate an array of frequency-space coordinates to accompany a FFT of `n`
/// points for sampling interval `dx`.
pub fn fft_freq(n: usize, dx: f64) -> nd::Array1<f64> {
    let npos = if n % 2 == 0 { n / 2 } else { (n + 1) / 2 };
    let fp: nd::Array1<f64>
        = (0..npos)
        .map(|k| k as f64 / (n as f64 * dx))
        .collect();
    let fm: nd::Array1<f64>
        = (1..n - npos + 1).rev()
        .map(|k| -(k as f64) / (n as f64 * dx))
        .collect();
    concatenate!(nd::Axis(0), fp, fm)
}

/// Perform the one-dimensional, complex-valued FFT.
pub fn fft<S>(x: &nd::ArrayBase<S, Ix1>) -> nd::Array1<C64>
where S: nd::Data<Elem = C64>
{
    let n: usize = x.len();
    let mut f: Vec<C64> = x.to_vec();
    let mut plan = fft::FftPlanner::new();
    let fft_plan = plan.plan_fft_forward(n);
    fft_plan.process(&mut f);
    nd::Array1::from_vec(f)
}

/// Return a copy of `x` with indices shifted to map super-Nyquist frequency
/// components to negative frequencies.
pub fn fft_shift<S, A>(x: &nd::ArrayBase<S, Ix1>) -> nd::Array1<A>
where
    S: nd::Data<Elem = A>,
    A: Clone,
{
    let n = x.len();
    let (p, m)
        = if n % 2 == 0 {
            x.view().split_at(nd::Axis(0), n / 2)
        } else {
            x.view().split_at(nd::Axis(0), n / 2 + 1)
        };
    concatenate!(nd::Axis(0), m.into_owned(), p.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn norm_and_dot() {
        let q = nd::array![C64::new(1.0, 1.0), C64::new(0.0, 2.0)];
        assert!((wf_norm(&q, 0.5) - 3.0).abs() < 1e-15);
        let d = wf_dot(&q, &q, 0.5);
        assert!((d - C64::new(3.0, 0.0)).norm() < 1e-15);

        let mut r: nd::Array1<f64> = nd::array![3.0, 4.0];
        let n = wf_renormalize(&mut r, 1.0);
        assert!((n - 5.0).abs() < 1e-15);
        assert!((wf_norm(&r, 1.0) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn freq_layout() {
        let f = fft_freq(4, 0.5);
        assert_eq!(f, nd::array![0.0, 0.5, -1.0, -0.5]);
        let f = fft_freq(5, 1.0);
        assert_eq!(f.len(), 5);
        assert!((f[2] - 0.4).abs() < 1e-15);
        assert!((f[3] + 0.4).abs() < 1e-15);
        let sh = fft_shift(&f);
        assert!(sh.iter().zip(sh.iter().skip(1)).all(|(a, b)| a < b));
    }

    #[test]
    fn fft_of_constant() {
        let x: nd::Array1<C64> = nd::Array1::from_elem(8, C64::new(1.0, 0.0));
        let f = fft(&x);
        assert!((f[0] - C64::new(8.0, 0.0)).norm() < 1e-12);
        assert!(f.iter().skip(1).all(|fk| fk.norm() < 1e-12));
    }
}
