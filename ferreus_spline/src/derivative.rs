/////////////////////////////////////////////////////////////////////////////////////////////
//
// Builds reduced-degree derivative splines and evaluates them.
//
// Created on: 15 Nov 2025     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{
    error::EvalError,
    evaluate::{self, ExtrapolationPolicy},
    model::BSplineModel,
};
use faer::Mat;

/// Builds the spline of the `order`-th derivative of `model`.
///
/// Each pass differences consecutive coefficients, scales them by the current
/// degree over the knot span, and drops one knot from each end. A zero knot span
/// gives a zero coefficient. The derived model keeps the domain of `model`.
pub fn derivative_model(model: &BSplineModel, order: usize) -> Result<BSplineModel, EvalError> {
    let degree = model.degree();
    if order == 0 || order > degree {
        return Err(EvalError::DerivativeOrderError { order, degree });
    }

    let dim = model.dim();
    let mut knots = model.knots().to_vec();
    let mut columns: Vec<Vec<f64>> = (0..dim)
        .map(|j| model.coefficients().col(j).iter().copied().collect())
        .collect();

    for pass in 0..order {
        let kk = degree - pass;
        let ak = kk as f64;

        for c in columns.iter_mut() {
            for i in 0..c.len() - 1 {
                let span = knots[i + 1 + kk] - knots[i + 1];
                c[i] = if span > 0.0 { ak * (c[i + 1] - c[i]) / span } else { 0.0 };
            }
            c.pop();
        }

        knots.pop();
        knots.remove(0);
    }

    let rows = columns[0].len();
    let coefficients = Mat::from_fn(rows, dim, |i, j| columns[j][i]);

    Ok(BSplineModel::from_parts(degree - order, knots, coefficients))
}

/// Evaluates the `order`-th derivative of `model` at each query parameter.
///
/// Requires `1 <= order <= degree`. The derivative spline is built once per call
/// and then evaluated with [`evaluate::evaluate`].
pub fn differentiate(
    model: &BSplineModel,
    parameters: &[f64],
    order: usize,
    policy: ExtrapolationPolicy,
) -> Result<Mat<f64>, EvalError> {
    let derived = derivative_model(model, order)?;
    evaluate::evaluate(&derived, parameters, policy)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `p(u) = u^3 - 2u` on [0, 2]. Without interior knots the B-splines are the
    /// Bernstein polynomials in `s = u / 2`, and `p = 8s^3 - 4s`.
    fn polynomial_model() -> BSplineModel {
        let bern = [0.0, -4.0 / 3.0, -8.0 / 3.0, 4.0];
        let knots = vec![0.0, 0.0, 0.0, 0.0, 2.0, 2.0, 2.0, 2.0];
        let coefficients = Mat::from_fn(4, 1, |i, _| bern[i]);
        BSplineModel::new(3, knots, coefficients).unwrap()
    }

    #[test]
    fn derivatives_of_a_cubic_are_exact() {
        let model = polynomial_model();
        let query = [0.0, 0.3, 1.0, 1.7, 2.0];

        let values = model.evaluate(&query, ExtrapolationPolicy::Reject).unwrap();
        let d1 = differentiate(&model, &query, 1, ExtrapolationPolicy::Reject).unwrap();
        let d2 = differentiate(&model, &query, 2, ExtrapolationPolicy::Reject).unwrap();
        let d3 = differentiate(&model, &query, 3, ExtrapolationPolicy::Reject).unwrap();

        for (i, &u) in query.iter().enumerate() {
            assert!((values[(i, 0)] - (u * u * u - 2.0 * u)).abs() < 1e-12);
            assert!((d1[(i, 0)] - (3.0 * u * u - 2.0)).abs() < 1e-12);
            assert!((d2[(i, 0)] - 6.0 * u).abs() < 1e-12);
            assert!((d3[(i, 0)] - 6.0).abs() < 1e-12);
        }
    }

    #[test]
    fn derived_model_drops_one_knot_per_end_per_order() {
        let knots = vec![0.0, 0.0, 0.0, 0.0, 0.25, 0.5, 0.75, 1.0, 1.0, 1.0, 1.0];
        let coefficients = Mat::from_fn(7, 2, |i, j| (i + j) as f64);
        let model = BSplineModel::new(3, knots, coefficients).unwrap();

        let d2 = derivative_model(&model, 2).unwrap();
        assert_eq!(d2.degree(), 1);
        assert_eq!(d2.knots(), &[0.0, 0.0, 0.25, 0.5, 0.75, 1.0, 1.0]);
        assert_eq!(d2.coefficients().nrows(), 5);
        assert_eq!(d2.domain(), model.domain());
    }

    #[test]
    fn derivative_order_is_validated() {
        let model = polynomial_model();
        for order in [0, 4] {
            assert!(matches!(
                differentiate(&model, &[0.5], order, ExtrapolationPolicy::Reject),
                Err(EvalError::DerivativeOrderError { degree: 3, .. })
            ));
        }
    }
}
