/////////////////////////////////////////////////////////////////////////////////////////////
//
// Evaluates non-zero B-spline basis functions and knot interval lookups on a knot vector.
//
// Created on: 15 Nov 2025     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! B-spline basis helpers shared by the solver, the knot placement engine and
//! the evaluator.

use faer::Mat;

/// Returns the index `l` of the knot interval `knots[l] <= x < knots[l + 1]`,
/// restricted to the non-empty intervals `degree..=knots.len() - degree - 2`.
///
/// Values below the domain map to the first interval and values at or above the
/// right end of the domain map to the last interval, so the last interval is
/// closed on both sides.
pub(crate) fn find_interval(knots: &[f64], degree: usize, x: f64) -> usize {
    let last = knots.len() - degree - 2;
    let idx = knots.partition_point(|&t| t <= x);
    idx.saturating_sub(1).clamp(degree, last)
}

/// As [`find_interval`], but starts from a previous interval and walks forward
/// when the queries arrive in ascending order.
#[inline]
pub(crate) fn find_interval_from(knots: &[f64], degree: usize, x: f64, hint: usize) -> usize {
    let last = knots.len() - degree - 2;
    let mut l = hint.clamp(degree, last);

    if x < knots[l] && l > degree {
        return find_interval(knots, degree, x);
    }
    while l < last && x >= knots[l + 1] {
        l += 1;
    }
    l
}

/// Evaluates the `degree + 1` B-splines that are non-zero on interval `l` at `x`.
///
/// Uses the stable Cox-de Boor recurrence. Requires `knots[l] <= x < knots[l + 1]`
/// for exact results; values outside the interval give the polynomial
/// continuation of that piece. Coincident knots produce zero contributions.
pub(crate) fn nonzero_basis(knots: &[f64], degree: usize, x: f64, l: usize, h: &mut [f64]) {
    let mut hh = [0.0f64; 6];

    h[0] = 1.0;
    for j in 1..=degree {
        hh[..j].copy_from_slice(&h[..j]);
        h[0] = 0.0;
        for i in 1..=j {
            let li = l + i;
            let lj = li - j;
            if knots[li] == knots[lj] {
                h[i] = 0.0;
                continue;
            }
            let f = hh[i - 1] / (knots[li] - knots[lj]);
            h[i - 1] += f * (knots[li] - x);
            h[i] = f * (x - knots[lj]);
        }
    }
}

/// Discontinuity jumps of the `degree`-th derivative of the B-splines at the
/// interior knots.
///
/// Row `r` holds the `degree + 2` jumps at interior knot `knots[r + degree + 1]`,
/// for the B-splines `r..r + degree + 2`. The jumps are scaled by the number of
/// knot intervals over the domain length raised to the degree, so the rows are
/// independent of the parameter scale.
pub(crate) fn derivative_jumps(knots: &[f64], degree: usize) -> Mat<f64> {
    let n = knots.len();
    let k1 = degree + 1;
    let k2 = degree + 2;
    let nk1 = n - k1;
    let num_intervals = nk1 - degree;
    let num_rows = n - 2 * k1;

    let fac = num_intervals as f64 / (knots[nk1] - knots[degree]);
    let mut jumps = Mat::<f64>::zeros(num_rows, k2);
    let mut h = vec![0.0; 2 * k1];

    for r in 0..num_rows {
        let l = r + k1;
        for j in 0..k1 {
            h[j] = knots[l] - knots[l - k1 + j];
            h[k1 + j] = knots[l] - knots[l + j + 1];
        }

        for j in 0..k2 {
            let mut prod = h[j];
            for i in 1..=degree {
                prod = prod * h[j + i] * fac;
            }
            jumps[(r, j)] = (knots[r + j + k1] - knots[r + j]) / prod;
        }
    }

    jumps
}
