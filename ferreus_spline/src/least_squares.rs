/////////////////////////////////////////////////////////////////////////////////////////////
//
// Solves the weighted least-squares spline problem for a fixed knot vector.
//
// Created on: 15 Nov 2025     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Weighted least-squares spline solver.
//!
//! Each data point contributes one observation row with `k + 1` non-zero B-spline
//! values. Rows are reduced into an upper-triangular band matrix of bandwidth
//! `k + 1` as they arrive, so the full `m x n` design matrix is never formed and
//! the cost is `O(m k^2)`. The triangle is shared by every dimension; only the
//! right-hand sides differ, and those are reduced and back-substituted in parallel.

use crate::{
    basis,
    error::SolveError,
    linalg::{self, BandedTriangle, Rotation},
    model::MAX_DEGREE,
};
use faer::Mat;
use rayon::prelude::*;

/// Result of a least-squares solve on a fixed knot vector.
#[derive(Debug, Clone)]
pub struct LeastSquaresFit {
    /// `(n - k - 1) x dim`, one column per dimension.
    coefficients: Mat<f64>,

    /// Weighted residual sum of squares `sum_i (w_i |x_i - s(u_i)|)^2`.
    fp: f64,

    /// Triangularised observation matrix.
    pub(crate) triangle: BandedTriangle,

    /// Reduced right-hand side of each dimension.
    pub(crate) reduced_rhs: Vec<Vec<f64>>,

    /// Unweighted non-zero basis values of each data point, `m x (k + 1)`.
    pub(crate) basis_values: Mat<f64>,

    /// Index of the first coefficient touched by each data point.
    pub(crate) first_coefficient: Vec<usize>,
}

impl LeastSquaresFit {
    #[inline]
    pub fn coefficients(&self) -> &Mat<f64> {
        &self.coefficients
    }

    #[inline]
    pub fn fp(&self) -> f64 {
        self.fp
    }

    pub fn into_coefficients(self) -> Mat<f64> {
        self.coefficients
    }
}

/// Computes the B-spline coefficients minimising the weighted squared residual
/// for the given knots.
///
/// # Parameters
/// - `points`: `m x dim` data, one row per point.
/// - `weights`: one positive weight per point.
/// - `u`: strictly increasing parameter values inside `[knots[k], knots[n-k-1]]`.
/// - `knots`: clamped knot vector of length `n`.
/// - `degree`: spline degree `k`.
///
/// # Errors
/// - [`SolveError::InvalidInput`] if the degree exceeds [`MAX_DEGREE`], the
///   weight or parameter count differs from the number of points, or there are
///   fewer than `2 * (k + 1)` knots.
/// - [`SolveError::SingularSystem`] if some B-spline has too little data in its
///   support for the coefficients to be determined.
pub fn solve(
    points: &Mat<f64>,
    weights: &[f64],
    u: &[f64],
    knots: &[f64],
    degree: usize,
) -> Result<LeastSquaresFit, SolveError> {
    let m = points.nrows();
    let dim = points.ncols();
    let k1 = degree + 1;

    if degree > MAX_DEGREE {
        return Err(SolveError::InvalidInput {
            reason: "degree exceeds the supported maximum",
        });
    }
    if weights.len() != m || u.len() != m {
        return Err(SolveError::InvalidInput {
            reason: "one weight and one parameter value are required per point",
        });
    }
    if knots.len() < 2 * k1 {
        return Err(SolveError::InvalidInput {
            reason: "at least 2 * (degree + 1) knots are required",
        });
    }

    let nk1 = knots.len() - k1;

    let mut triangle = BandedTriangle::zeros(nk1, k1);
    let mut basis_values = Mat::<f64>::zeros(m, k1);
    let mut first_coefficient = Vec::with_capacity(m);
    let mut rotations: Vec<Vec<Rotation>> = Vec::with_capacity(m);

    let mut h = vec![0.0; k1];
    let mut l = degree;
    for it in 0..m {
        let ui = u[it];
        let wi = weights[it];

        while l + 1 < nk1 && ui >= knots[l + 1] {
            l += 1;
        }

        basis::nonzero_basis(knots, degree, ui, l, &mut h);
        for i in 0..k1 {
            basis_values[(it, i)] = h[i];
            h[i] *= wi;
        }

        first_coefficient.push(l - degree);
        rotations.push(triangle.rotate_observation(l - degree, &mut h));
    }

    triangle.check_rank()?;

    let per_dim: Vec<(Vec<f64>, Vec<f64>, Vec<f64>)> = (0..dim)
        .into_par_iter()
        .map(|d| {
            let mut z = vec![0.0; nk1];
            let residuals: Vec<f64> = (0..m)
                .map(|it| linalg::apply_rotations(&rotations[it], points[(it, d)] * weights[it], &mut z))
                .collect();
            let c = triangle.back_substitute(&z);
            (z, residuals, c)
        })
        .collect();

    // Summed point by point in a fixed order so the result is independent of
    // how the dimensions were scheduled.
    let mut fp = 0.0;
    for it in 0..m {
        for (_, residuals, _) in per_dim.iter() {
            fp += residuals[it] * residuals[it];
        }
    }

    let coefficients = Mat::from_fn(nk1, dim, |i, j| per_dim[j].2[i]);
    let reduced_rhs = per_dim.into_iter().map(|(z, _, _)| z).collect();

    Ok(LeastSquaresFit {
        coefficients,
        fp,
        triangle,
        reduced_rhs,
        basis_values,
        first_coefficient,
    })
}

/// Value of column `d` of the spline at data point `it`, from the stored basis values.
#[inline]
pub(crate) fn spline_value(fit: &LeastSquaresFit, coefficients: &Mat<f64>, it: usize, d: usize) -> f64 {
    let start = fit.first_coefficient[it];
    let mut fac = 0.0;
    for j in 0..fit.basis_values.ncols() {
        fac += coefficients[(start + j, d)] * fit.basis_values[(it, j)];
    }
    fac
}
