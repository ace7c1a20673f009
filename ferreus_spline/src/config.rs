/////////////////////////////////////////////////////////////////////////////////////////////
//
// Declares the tuning parameters of the knot placement and smoothing iterations.
//
// Created on: 15 Nov 2025     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Declares the tuning parameters of the knot placement and smoothing iterations.
use serde::{Deserialize, Serialize};

#[doc = include_str!("../docs/fit_params.md")]
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct FitParams {
    /// Relative tolerance on the smoothing factor. A fit is accepted once
    /// `|fp - s| < tolerance * s`.
    pub tolerance: f64,

    /// Maximum number of smoothing parameter iterations once the knots are fixed.
    pub max_iterations: usize,

    /// Optional cap on the total number of knots. `None` allows growth up to
    /// the interpolation knot count `m + k + 1`.
    pub max_knots: Option<usize>,
}

impl FitParams {
    /// Returns a new [`FitParamsBuilder`] populated with the defaults.
    pub fn builder() -> FitParamsBuilder {
        FitParamsBuilder::new()
    }
}

impl Default for FitParams {
    fn default() -> Self {
        FitParams::builder().build()
    }
}

/// A convenience builder for constructing a [`FitParams`] instance.
///
/// The builder should be called via the [`FitParams::builder`] method.
///
/// See [`FitParams`] for details on each field.
#[derive(Debug, Clone, Copy)]
pub struct FitParamsBuilder {
    pub tolerance: f64,
    pub max_iterations: usize,
    pub max_knots: Option<usize>,
}

impl FitParamsBuilder {
    fn new() -> Self {
        Self {
            tolerance: 1.0E-3,
            max_iterations: 20,
            max_knots: None,
        }
    }

    /// Sets the relative tolerance on the smoothing factor.
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the maximum number of smoothing parameter iterations.
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Caps the total number of knots.
    pub fn max_knots(mut self, max_knots: usize) -> Self {
        self.max_knots = Some(max_knots);
        self
    }

    /// Builds and returns a [`FitParams`] instance.
    pub fn build(self) -> FitParams {
        FitParams {
            tolerance: self.tolerance,
            max_iterations: self.max_iterations,
            max_knots: self.max_knots,
        }
    }
}
