/////////////////////////////////////////////////////////////////////////////////////////////
//
// Specifies degree, smoothing factor, and parameterization options for configuring spline fits.
//
// Created on: 15 Nov 2025     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Specifies degree, smoothing factor, and parameterization options for configuring spline fits.
use serde::{Deserialize, Serialize};

/// Default smoothing factor used when none is supplied.
pub const DEFAULT_SMOOTHING_FACTOR: f64 = 1.0E-3;

/// Default spline degree (cubic).
pub const DEFAULT_DEGREE: usize = 3;

/// Defines how curve parameter values are assigned to the input points.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parameterization {
    /// Parameters proportional to the cumulative distance between consecutive
    /// points, normalised to `[0, 1]`.
    #[default]
    ChordLength,

    /// Equally spaced parameters on `[0, 1]`.
    Uniform,
}

/// A convenience builder for constructing a [`SplineSettings`] instance.
///
/// The builder should be called via the [`SplineSettings::builder`] method.
///
/// See [`SplineSettings`] for details on each field.
#[derive(Debug, Clone, Copy)]
pub struct SplineSettingsBuilder {
    pub degree: usize,
    pub smoothing_factor: f64,
    pub parameterization: Parameterization,
}

impl SplineSettingsBuilder {
    /// Creates a new instance of the [`SplineSettingsBuilder`].
    fn new() -> Self {
        Self {
            degree: DEFAULT_DEGREE,
            smoothing_factor: DEFAULT_SMOOTHING_FACTOR,
            parameterization: Parameterization::default(),
        }
    }

    /// Sets the spline degree.
    pub fn degree(mut self, degree: usize) -> Self {
        self.degree = degree;
        self
    }

    /// Sets the smoothing factor. `0.0` requests an interpolating curve.
    pub fn smoothing_factor(mut self, smoothing_factor: f64) -> Self {
        self.smoothing_factor = smoothing_factor;
        self
    }

    pub fn parameterization(mut self, parameterization: Parameterization) -> Self {
        self.parameterization = parameterization;
        self
    }

    /// Builds and returns an instance of [`SplineSettings`] from the values
    /// defined in the builder.
    pub fn build(self) -> SplineSettings {
        SplineSettings {
            degree: self.degree,
            smoothing_factor: self.smoothing_factor,
            parameterization: self.parameterization,
        }
    }
}

#[doc = include_str!("../docs/spline_settings.md")]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplineSettings {
    /// Polynomial degree of each spline piece, `0..=5`.
    pub degree: usize,

    /// Upper bound on the weighted residual sum of squares. A value of `0.0`
    /// forces the curve through every point. Larger values give smoother
    /// curves with fewer knots.
    pub smoothing_factor: f64,

    /// How parameter values are assigned to the input points.
    pub parameterization: Parameterization,
}

impl SplineSettings {
    /// Returns a new [`SplineSettingsBuilder`] populated with the defaults.
    pub fn builder() -> SplineSettingsBuilder {
        SplineSettingsBuilder::new()
    }
}

impl Default for SplineSettings {
    fn default() -> Self {
        SplineSettings::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_to_smoothing_cubic() {
        let settings = SplineSettings::default();
        assert_eq!(settings.degree, 3);
        assert_eq!(settings.smoothing_factor, DEFAULT_SMOOTHING_FACTOR);
        assert_eq!(settings.parameterization, Parameterization::ChordLength);
    }

    #[test]
    fn settings_round_trip_through_json() {
        let settings = SplineSettings::builder()
            .degree(5)
            .smoothing_factor(0.25)
            .parameterization(Parameterization::Uniform)
            .build();
        let text = serde_json::to_string(&settings).unwrap();
        let back: SplineSettings = serde_json::from_str(&text).unwrap();
        assert_eq!(settings, back);
    }
}
