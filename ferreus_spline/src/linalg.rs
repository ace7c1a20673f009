/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements Givens rotations and an upper-triangular band matrix for row-wise least squares.
//
// Created on: 15 Nov 2025     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Banded QR primitives.
//!
//! Observation rows are reduced one at a time into an upper-triangular band
//! matrix with Givens rotations. The rotations applied to each row are returned
//! so that any number of right-hand sides can be reduced afterwards, independently
//! of each other and of the triangle.

use crate::error::SolveError;
use faer::Mat;

/// A single plane rotation applied between a new row and row `col` of the triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Rotation {
    pub col: usize,
    pub cos: f64,
    pub sin: f64,
}

/// Computes the rotation that annihilates `pivot` against the non-negative
/// diagonal value `diag`.
///
/// Returns `(cos, sin, r)` where `r` is the new diagonal value. The hypotenuse
/// is formed from the ratio of the smaller to the larger magnitude so it cannot
/// overflow.
#[inline]
pub(crate) fn givens_rotation(pivot: f64, diag: f64) -> (f64, f64, f64) {
    let store = pivot.abs();
    let r = if store >= diag {
        store * (1.0 + (diag / pivot) * (diag / pivot)).sqrt()
    } else {
        diag * (1.0 + (pivot / diag) * (pivot / diag)).sqrt()
    };

    (diag / r, pivot / r, r)
}

/// Applies a rotation to the pair (`row`, `tri`), where `row` belongs to the
/// incoming observation and `tri` to the triangle.
#[inline]
pub(crate) fn rotate(cos: f64, sin: f64, row: &mut f64, tri: &mut f64) {
    let a = *row;
    let b = *tri;
    *tri = cos * b + sin * a;
    *row = cos * a - sin * b;
}

/// Reduces one right-hand side entry through recorded rotations.
///
/// `value` is the entry belonging to the incoming row and `rhs` holds the
/// already reduced right-hand side of the triangle. Returns the residual left
/// in the row after all rotations.
#[inline]
pub(crate) fn apply_rotations(rotations: &[Rotation], value: f64, rhs: &mut [f64]) -> f64 {
    let mut xi = value;
    for rot in rotations {
        rotate(rot.cos, rot.sin, &mut xi, &mut rhs[rot.col]);
    }
    xi
}

/// Upper-triangular band matrix.
///
/// Row `i` stores the entries of columns `i..i + bandwidth` of the full matrix,
/// so element `(i, 0)` is the diagonal.
#[derive(Debug, Clone)]
pub(crate) struct BandedTriangle {
    band: Mat<f64>,
}

impl BandedTriangle {
    /// Creates an empty `n x n` triangle with the given bandwidth.
    pub fn zeros(n: usize, bandwidth: usize) -> Self {
        Self {
            band: Mat::zeros(n, bandwidth),
        }
    }

    /// Copies the triangle into storage with a larger bandwidth, padding with zeros.
    pub fn widened(&self, bandwidth: usize) -> Self {
        let current = self.bandwidth();
        let band = Mat::from_fn(self.size(), bandwidth.max(current), |i, j| {
            if j < current { self.band[(i, j)] } else { 0.0 }
        });
        Self { band }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.band.nrows()
    }

    #[inline]
    pub fn bandwidth(&self) -> usize {
        self.band.ncols()
    }

    /// Sum of the diagonal entries.
    pub fn trace(&self) -> f64 {
        (0..self.size()).fold(0.0, |acc, i| acc + self.band[(i, 0)])
    }

    /// Reduces an observation row into the triangle.
    ///
    /// `row[i]` is the entry in column `first_col + i`. Rows must arrive in
    /// non-decreasing `first_col` order, which guarantees the triangle has no
    /// fill beyond the row's last column. Zero pivots are skipped.
    pub fn rotate_observation(&mut self, first_col: usize, row: &mut [f64]) -> Vec<Rotation> {
        let width = row.len();
        let mut rotations = Vec::with_capacity(width);

        for i in 0..width {
            let pivot = row[i];
            if pivot == 0.0 {
                continue;
            }

            let j = first_col + i;
            let (cos, sin, r) = givens_rotation(pivot, self.band[(j, 0)]);
            self.band[(j, 0)] = r;
            rotations.push(Rotation { col: j, cos, sin });

            for i1 in (i + 1)..width {
                rotate(cos, sin, &mut row[i1], &mut self.band[(j, i1 - i)]);
            }
        }

        rotations
    }

    /// Reduces a full-bandwidth row whose first non-zero lies in column
    /// `first_col`, eliminating one column per step and shifting the row left
    /// after each step. The reduction runs through to the last column.
    pub fn rotate_shifted(&mut self, first_col: usize, row: &mut [f64]) -> Vec<Rotation> {
        let n = self.size();
        let k1 = self.bandwidth() - 1;
        let mut rotations = Vec::with_capacity(n - first_col);

        for j in first_col..n {
            let pivot = row[0];
            if pivot != 0.0 {
                let (cos, sin, r) = givens_rotation(pivot, self.band[(j, 0)]);
                self.band[(j, 0)] = r;
                rotations.push(Rotation { col: j, cos, sin });

                if j + 1 == n {
                    break;
                }

                let i2 = k1.min(n - 1 - j);
                for i in 0..i2 {
                    rotate(cos, sin, &mut row[i + 1], &mut self.band[(j, i + 1)]);
                    row[i] = row[i + 1];
                }
                row[i2] = 0.0;
            } else {
                if j + 1 == n {
                    break;
                }
                let i2 = k1.min(n - 1 - j);
                for i in 0..i2 {
                    row[i] = row[i + 1];
                }
                row[i2] = 0.0;
            }
        }

        rotations
    }

    /// Fails if any diagonal entry is not finite or is negligible relative to the
    /// largest diagonal entry.
    pub fn check_rank(&self) -> Result<(), SolveError> {
        let max_diag = (0..self.size()).fold(0.0f64, |acc, i| acc.max(self.band[(i, 0)].abs()));
        let threshold = max_diag * f64::EPSILON;

        for i in 0..self.size() {
            let d = self.band[(i, 0)];
            if !d.is_finite() || d.abs() <= threshold {
                return Err(SolveError::SingularSystem { column: i });
            }
        }

        Ok(())
    }

    /// Solves `R x = rhs` by back substitution.
    pub fn back_substitute(&self, rhs: &[f64]) -> Vec<f64> {
        let n = self.size();
        let bw = self.bandwidth();
        let mut x = vec![0.0; n];
        if n == 0 {
            return x;
        }

        x[n - 1] = rhs[n - 1] / self.band[(n - 1, 0)];
        for i in (0..n - 1).rev() {
            let below = (bw - 1).min(n - 1 - i);
            let mut store = rhs[i];
            for l in 1..=below {
                store -= x[i + l] * self.band[(i, l)];
            }
            x[i] = store / self.band[(i, 0)];
        }

        x
    }

    /// Expands the band into a dense upper-triangular matrix.
    #[cfg(test)]
    pub fn to_dense(&self) -> Mat<f64> {
        let n = self.size();
        let bw = self.bandwidth();
        Mat::from_fn(n, n, |i, j| {
            if j >= i && j - i < bw { self.band[(i, j - i)] } else { 0.0 }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use equator::assert;
    use faer::{prelude::Solve, utils::approx::*, Side};

    /// Deterministic banded observation matrix with `width` non-zeros per row.
    fn make_banded_rows(m: usize, n: usize, width: usize) -> Vec<(usize, Vec<f64>)> {
        (0..m)
            .map(|r| {
                let first = (r * (n - width + 1)) / m;
                let row = (0..width)
                    .map(|i| {
                        let x = (r as f64 + 1.0) * (i as f64 + 2.0);
                        1.0 + 0.5 * x.sin()
                    })
                    .collect();
                (first, row)
            })
            .collect()
    }

    #[test]
    fn givens_rotation_annihilates_pivot() {
        for (pivot, diag) in [(3.0, 4.0), (-2.0, 0.5), (1e-200, 1e-200), (5.0, 0.0)] {
            let (c, s, r) = givens_rotation(pivot, diag);
            assert!((c * c + s * s - 1.0).abs() < 1e-14);
            let mut row = pivot;
            let mut tri = diag;
            rotate(c, s, &mut row, &mut tri);
            assert!(row.abs() <= 1e-14 * r.max(1.0));
            assert!((tri - r).abs() <= 1e-14 * r.max(1e-300));
        }
    }

    #[test]
    fn back_substitution_matches_dense_triangle() {
        let n = 8;
        let bw = 4;
        let mut tri = BandedTriangle::zeros(n, bw);
        for i in 0..n {
            for j in 0..bw {
                tri.band[(i, j)] = if j == 0 { 2.0 + i as f64 } else { 0.3 * (i + j) as f64 };
            }
        }

        let x_true: Vec<f64> = (0..n).map(|i| (i as f64 * 0.7).cos()).collect();
        let dense = tri.to_dense();
        let rhs: Vec<f64> = (0..n)
            .map(|i| (0..n).map(|j| dense[(i, j)] * x_true[j]).sum())
            .collect();

        let x = tri.back_substitute(&rhs);
        for i in 0..n {
            assert!((x[i] - x_true[i]).abs() < 1e-13);
        }
    }

    #[test]
    fn row_reduction_reproduces_normal_equations() {
        let (m, n, width) = (30, 9, 4);
        let rows = make_banded_rows(m, n, width);

        let mut tri = BandedTriangle::zeros(n, width);
        let mut z = vec![0.0; n];
        let mut dense = Mat::<f64>::zeros(m, n);
        let mut b = Mat::<f64>::zeros(m, 1);

        for (r, (first, row)) in rows.iter().enumerate() {
            for (i, v) in row.iter().enumerate() {
                dense[(r, first + i)] = *v;
            }
            b[(r, 0)] = (r as f64 * 0.3).sin();

            let mut work = row.clone();
            let rotations = tri.rotate_observation(*first, &mut work);
            apply_rotations(&rotations, b[(r, 0)], &mut z);
        }

        assert!(tri.check_rank().is_ok());
        let x = tri.back_substitute(&z);
        let x = Mat::from_fn(n, 1, |i, _| x[i]);

        let normal = dense.transpose() * &dense;
        let rhs = dense.transpose() * &b;
        let x_ref = normal.llt(Side::Lower).unwrap().solve(&rhs);

        let approx_eq = CwiseMat(ApproxEq::eps() * 1.0e5 * (n as f64));
        assert!(&x ~ &x_ref);
    }

    #[test]
    fn shifted_rows_extend_the_factorization() {
        let (m, n, width) = (25, 7, 3);
        let rows = make_banded_rows(m, n, width);

        let mut tri = BandedTriangle::zeros(n, width);
        let mut z = vec![0.0; n];
        let mut dense = Mat::<f64>::zeros(m + n - width, n);
        let mut b = Mat::<f64>::zeros(m + n - width, 1);

        for (r, (first, row)) in rows.iter().enumerate() {
            for (i, v) in row.iter().enumerate() {
                dense[(r, first + i)] = *v;
            }
            b[(r, 0)] = 1.0 + r as f64 * 0.1;
            let mut work = row.clone();
            let rotations = tri.rotate_observation(*first, &mut work);
            apply_rotations(&rotations, b[(r, 0)], &mut z);
        }

        // Penalty rows span one column more than the observation rows.
        let mut wide = tri.widened(width + 1);
        for p in 0..(n - width) {
            let row: Vec<f64> = (0..=width).map(|i| 0.25 * (i as f64 + 1.0) - 0.6).collect();
            for (i, v) in row.iter().enumerate() {
                dense[(m + p, p + i)] = *v;
            }
            let mut work = row.clone();
            let rotations = wide.rotate_shifted(p, &mut work);
            apply_rotations(&rotations, 0.0, &mut z);
        }

        let x = wide.back_substitute(&z);
        let x = Mat::from_fn(n, 1, |i, _| x[i]);

        let normal = dense.transpose() * &dense;
        let rhs = dense.transpose() * &b;
        let x_ref = normal.llt(Side::Lower).unwrap().solve(&rhs);

        let approx_eq = CwiseMat(ApproxEq::eps() * 1.0e5 * (n as f64));
        assert!(&x ~ &x_ref);
    }

    #[test]
    fn rank_check_flags_untouched_columns() {
        let mut tri = BandedTriangle::zeros(4, 2);
        let mut row = vec![1.0, 1.0];
        tri.rotate_observation(0, &mut row);
        let mut row = vec![1.0, 2.0];
        tri.rotate_observation(1, &mut row);

        match tri.check_rank() {
            Err(SolveError::SingularSystem { column }) => assert_eq!(column, 2),
            Ok(()) => panic!("expected a singular system"),
            Err(other) => panic!("expected a singular system, got {other}"),
        }
    }
}
