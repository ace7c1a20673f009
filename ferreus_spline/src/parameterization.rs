/////////////////////////////////////////////////////////////////////////////////////////////
//
// Assigns curve parameter values to ordered input points.
//
// Created on: 15 Nov 2025     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{error::FitError, spline_config::Parameterization};
use faer::Mat;

/// Computes parameter values for the rows of `points`.
///
/// Both modes map the first point to `0` and the last point to exactly `1`.
pub(crate) fn compute_parameters(
    points: &Mat<f64>,
    mode: Parameterization,
) -> Result<Vec<f64>, FitError> {
    let m = points.nrows();
    if m < 2 {
        return Err(FitError::InvalidParameterization {
            index: 0,
            reason: "at least two points are required to parameterise a curve",
        });
    }

    let u = match mode {
        Parameterization::ChordLength => chord_length(points)?,
        Parameterization::Uniform => (0..m).map(|i| i as f64 / (m - 1) as f64).collect(),
    };

    validate_parameters(&u)?;
    Ok(u)
}

/// Cumulative chord length normalised to `[0, 1]`.
fn chord_length(points: &Mat<f64>) -> Result<Vec<f64>, FitError> {
    let m = points.nrows();
    let mut u = vec![0.0; m];

    for i in 1..m {
        let dist: f64 = points
            .row(i)
            .iter()
            .zip(points.row(i - 1).iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        u[i] = u[i - 1] + dist.sqrt();
    }

    let total = u[m - 1];
    if !(total > 0.0) || !total.is_finite() {
        return Err(FitError::InvalidParameterization {
            index: m - 1,
            reason: "total chord length must be positive and finite",
        });
    }

    for v in u.iter_mut().skip(1) {
        *v /= total;
    }
    u[m - 1] = 1.0;

    Ok(u)
}

/// Checks that parameter values are finite and strictly increasing.
pub(crate) fn validate_parameters(u: &[f64]) -> Result<(), FitError> {
    if u.len() < 2 {
        return Err(FitError::InvalidParameterization {
            index: 0,
            reason: "at least two parameter values are required",
        });
    }

    for (i, v) in u.iter().enumerate() {
        if !v.is_finite() {
            return Err(FitError::InvalidParameterization {
                index: i,
                reason: "parameter value is not finite",
            });
        }
        if i > 0 && u[i - 1] >= *v {
            return Err(FitError::InvalidParameterization {
                index: i,
                reason: "parameter values must be strictly increasing",
            });
        }
    }

    Ok(())
}
