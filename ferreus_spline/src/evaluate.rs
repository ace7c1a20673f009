/////////////////////////////////////////////////////////////////////////////////////////////
//
// Evaluates fitted B-spline curves with de Boor's algorithm under an extrapolation policy.
//
// Created on: 15 Nov 2025     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{basis, error::EvalError, model::BSplineModel};
use faer::Mat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Number of query parameters handled by a single parallel task.
const EVAL_CHUNK_SIZE: usize = 1024;

/// What to do with query parameters outside the model domain.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtrapolationPolicy {
    /// Fail with [`EvalError::EvaluationDomainError`].
    Reject,

    /// Clip the parameter into the domain before evaluating.
    ClampToEndpoint,

    /// Continue the polynomial piece of the nearest boundary interval.
    #[default]
    PolynomialExtension,
}

/// Evaluates `model` at each query parameter.
///
/// Returns a `(queries x dim)` matrix. Queries need not be sorted, but ascending
/// queries are located incrementally rather than by a fresh search. Chunks of
/// queries are evaluated in parallel; each query is independent, so the result
/// does not depend on the thread count.
pub fn evaluate(
    model: &BSplineModel,
    parameters: &[f64],
    policy: ExtrapolationPolicy,
) -> Result<Mat<f64>, EvalError> {
    let dim = model.dim();

    let chunks = parameters
        .par_chunks(EVAL_CHUNK_SIZE)
        .map(|chunk| evaluate_chunk(model, chunk, policy))
        .collect::<Result<Vec<_>, _>>()?;
    let values = chunks.concat();

    Ok(Mat::from_fn(parameters.len(), dim, |i, j| values[i * dim + j]))
}

/// Evaluates a run of queries serially, reusing the interval found for the
/// previous query as the starting point of the next search.
fn evaluate_chunk(
    model: &BSplineModel,
    chunk: &[f64],
    policy: ExtrapolationPolicy,
) -> Result<Vec<f64>, EvalError> {
    let dim = model.dim();
    let degree = model.degree();
    let knots = model.knots();
    let coefficients = model.coefficients();

    let mut out = Vec::with_capacity(chunk.len() * dim);
    let mut scratch = [0.0f64; 6];
    let mut hint = degree;

    for &q in chunk {
        let x = resolve_parameter(model, q, policy)?;
        hint = basis::find_interval_from(knots, degree, x, hint);
        for j in 0..dim {
            out.push(de_boor(knots, degree, coefficients, j, hint, x, &mut scratch));
        }
    }

    Ok(out)
}

/// Applies the extrapolation policy to a single query parameter.
fn resolve_parameter(
    model: &BSplineModel,
    q: f64,
    policy: ExtrapolationPolicy,
) -> Result<f64, EvalError> {
    let (lower, upper) = model.domain();
    let outside = q < lower || q > upper;

    if !q.is_finite() || (outside && policy == ExtrapolationPolicy::Reject) {
        return Err(EvalError::EvaluationDomainError {
            parameter: q,
            lower,
            upper,
        });
    }

    Ok(match policy {
        ExtrapolationPolicy::ClampToEndpoint => q.clamp(lower, upper),
        _ => q,
    })
}

/// de Boor's recurrence for column `col` of the coefficients on interval `l`.
///
/// Blends the `degree + 1` local coefficients pairwise `degree` times.
#[inline]
fn de_boor(
    knots: &[f64],
    degree: usize,
    coefficients: &Mat<f64>,
    col: usize,
    l: usize,
    x: f64,
    d: &mut [f64; 6],
) -> f64 {
    for r in 0..=degree {
        d[r] = coefficients[(l - degree + r, col)];
    }

    for r in 1..=degree {
        for i in (r..=degree).rev() {
            let left = knots[l - degree + i];
            let right = knots[l + 1 + i - r];
            let span = right - left;
            let alpha = if span == 0.0 { 0.0 } else { (x - left) / span };
            d[i] = (1.0 - alpha) * d[i - 1] + alpha * d[i];
        }
    }

    d[degree]
}
