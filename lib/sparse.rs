//! Compressed sparse row (CSR) storage for the real, square operators built by
//! [`grid`][crate::grid] and [`hamiltonian`][crate::hamiltonian].

use ndarray as nd;
use crate::{ Arr1, error::LengthError };

/// A real matrix in compressed sparse row format.
///
/// Column indices within each row are sorted and unique.
#[derive(Clone, Debug, PartialEq)]
pub struct CsrMatrix {
    nrows: usize,
    ncols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f64>,
}

impl CsrMatrix {
    /// Assemble from `(row, col, value)` triplets. Duplicate entries are
    /// summed.
    ///
    /// *Panics if any index is out of bounds*.
    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        mut triplets: Vec<(usize, usize, f64)>,
    ) -> Self
    {
        assert!(
            triplets.iter().all(|(r, c, _)| *r < nrows && *c < ncols),
            "sparse::CsrMatrix::from_triplets: index out of bounds"
        );
        triplets.sort_unstable_by_key(|(r, c, _)| (*r, *c));
        let mut indptr: Vec<usize> = vec![0; nrows + 1];
        let mut indices: Vec<usize> = Vec::with_capacity(triplets.len());
        let mut data: Vec<f64> = Vec::with_capacity(triplets.len());
        let mut last: Option<(usize, usize)> = None;
        for (r, c, v) in triplets.into_iter() {
            if last == Some((r, c)) {
                if let Some(d) = data.last_mut() { *d += v; }
            } else {
                indices.push(c);
                data.push(v);
                indptr[r + 1] += 1;
                last = Some((r, c));
            }
        }
        for i in 0..nrows { indptr[i + 1] += indptr[i]; }
        Self { nrows, ncols, indptr, indices, data }
    }

    /// Create a diagonal matrix.
    pub fn from_diag<S>(diag: &Arr1<S>) -> Self
    where S: nd::Data<Elem = f64>
    {
        let n = diag.len();
        Self {
            nrows: n,
            ncols: n,
            indptr: (0..=n).collect(),
            indices: (0..n).collect(),
            data: diag.to_vec(),
        }
    }

    /// Get the `(rows, columns)` shape.
    pub fn shape(&self) -> (usize, usize) { (self.nrows, self.ncols) }

    /// Return `true` if the matrix is square.
    pub fn is_square(&self) -> bool { self.nrows == self.ncols }

    /// Get the number of rows, which is the order of a square matrix.
    pub fn order(&self) -> usize { self.nrows }

    /// Get the number of stored entries.
    pub fn nnz(&self) -> usize { self.data.len() }

    /// Iterate over the stored `(row, col, value)` entries in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.nrows)
            .flat_map(move |r| {
                (self.indptr[r]..self.indptr[r + 1])
                    .map(move |k| (r, self.indices[k], self.data[k]))
            })
    }

    /// Get a single element, returning zero for entries not stored.
    pub fn get(&self, r: usize, c: usize) -> f64 {
        if r >= self.nrows { return 0.0; }
        let row = &self.indices[self.indptr[r]..self.indptr[r + 1]];
        row.binary_search(&c)
            .map(|k| self.data[self.indptr[r] + k])
            .unwrap_or(0.0)
    }

    /// Get the main diagonal.
    pub fn diagonal(&self) -> nd::Array1<f64> {
        (0..self.nrows.min(self.ncols)).map(|i| self.get(i, i)).collect()
    }

    /// Compute the matrix-vector product `self · x`.
    ///
    /// *Panics if `x` does not have length equal to the number of columns*.
    pub fn dot<S>(&self, x: &Arr1<S>) -> nd::Array1<f64>
    where S: nd::Data<Elem = f64>
    {
        assert_eq!(x.len(), self.ncols, "sparse::CsrMatrix::dot: bad length");
        (0..self.nrows)
            .map(|r| {
                (self.indptr[r]..self.indptr[r + 1])
                    .map(|k| self.data[k] * x[self.indices[k]])
                    .sum::<f64>()
            })
            .collect()
    }

    /// Return a copy of `self` with every entry multiplied by `a`.
    pub fn scaled(&self, a: f64) -> Self {
        let mut new = self.clone();
        new.data.iter_mut().for_each(|d| { *d *= a; });
        new
    }

    /// Return `self + diag(d)`.
    pub fn plus_diag<S>(&self, d: &Arr1<S>) -> Result<Self, LengthError>
    where S: nd::Data<Elem = f64>
    {
        LengthError::check_len(self.nrows, d.len())?;
        LengthError::check_len(self.ncols, d.len())?;
        let triplets: Vec<(usize, usize, f64)>
            = self.iter()
            .chain(d.iter().enumerate().map(|(i, di)| (i, i, *di)))
            .collect();
        Ok(Self::from_triplets(self.nrows, self.ncols, triplets))
    }

    /// Return the transpose.
    pub fn transpose(&self) -> Self {
        let triplets: Vec<(usize, usize, f64)>
            = self.iter().map(|(r, c, v)| (c, r, v)).collect();
        Self::from_triplets(self.ncols, self.nrows, triplets)
    }

    /// Return `true` if `self` equals its own transpose to within a relative
    /// tolerance `rtol`, measured against the largest stored magnitude.
    pub fn is_symmetric(&self, rtol: f64) -> bool {
        if !self.is_square() { return false; }
        let scale
            = self.data.iter().fold(0.0_f64, |acc, d| acc.max(d.abs()));
        self.iter()
            .all(|(r, c, v)| (v - self.get(c, r)).abs() <= rtol * scale)
    }

    /// Convert to a dense array.
    pub fn to_dense(&self) -> nd::Array2<f64> {
        let mut dense: nd::Array2<f64>
            = nd::Array2::zeros((self.nrows, self.ncols));
        self.iter().for_each(|(r, c, v)| { dense[[r, c]] = v; });
        dense
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triplets_sum_duplicates() {
        let a = CsrMatrix::from_triplets(
            3, 3, vec![(2, 0, 1.0), (0, 0, 1.0), (0, 0, 2.5), (1, 2, -1.0)]);
        assert_eq!(a.nnz(), 3);
        assert_eq!(a.get(0, 0), 3.5);
        assert_eq!(a.get(1, 2), -1.0);
        assert_eq!(a.get(1, 1), 0.0);
        assert_eq!(a.get(2, 0), 1.0);
    }

    #[test]
    fn dot_matches_dense() {
        let a = CsrMatrix::from_triplets(
            2, 3, vec![(0, 0, 1.0), (0, 2, 2.0), (1, 1, -3.0)]);
        let x = nd::array![1.0, 2.0, 3.0];
        assert_eq!(a.dot(&x), a.to_dense().dot(&x));
    }

    #[test]
    fn plus_diag_and_symmetry() {
        let a = CsrMatrix::from_triplets(
            2, 2, vec![(0, 1, 1.0), (1, 0, 1.0)]);
        let b = a.plus_diag(&nd::array![4.0, 5.0]).unwrap();
        assert_eq!(b.diagonal(), nd::array![4.0, 5.0]);
        assert!(b.is_symmetric(1e-12));
        assert!(a.plus_diag(&nd::array![1.0]).is_err());
        let c = CsrMatrix::from_triplets(2, 2, vec![(0, 1, 1.0)]);
        assert!(!c.is_symmetric(1e-12));
        assert_eq!(c.transpose().get(1, 0), 1.0);
    }
}
