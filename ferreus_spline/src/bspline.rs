/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the high-level builder and wrapper for fitting and querying spline curves.
//
// Created on: 15 Nov 2025     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{
    config::FitParams,
    error::{EvalError, FitError, ModelIOResult},
    evaluate::ExtrapolationPolicy,
    knots::{self, FitInput, FitStatus},
    model::BSplineModel,
    progress::{ProgressMsg, ProgressSink},
    spline_config::SplineSettings,
};
use faer::Mat;
use std::{path::Path, sync::Arc, time::Instant};

/// A convenience builder for fitting a [`BSplineCurve`].
///
/// The builder should be called via the [`BSplineCurve::builder`] method.
///
/// See [`BSplineCurve`] for details on each field.
pub struct BSplineCurveBuilder {
    points: Mat<f64>,
    settings: SplineSettings,
    weights: Option<Vec<f64>>,
    parameters: Option<Vec<f64>>,
    params: FitParams,
    progress_callback: Option<Arc<dyn ProgressSink>>,
}

impl BSplineCurveBuilder {
    fn new(points: Mat<f64>, settings: SplineSettings) -> Self {
        Self {
            points,
            settings,
            weights: None,
            parameters: None,
            params: FitParams::default(),
            progress_callback: None,
        }
    }

    /// Sets one positive weight per point. Defaults to all ones.
    pub fn weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Supplies the parameter value of each point instead of computing them
    /// from the point geometry. Values must be finite and strictly increasing.
    pub fn parameters(mut self, parameters: Vec<f64>) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Sets custom knot placement and smoothing iteration parameters.
    pub fn params(mut self, params: FitParams) -> Self {
        self.params = params;
        self
    }

    /// Optional callback for reporting fitting progress.
    pub fn progress_callback(mut self, progress_callback: Arc<dyn ProgressSink>) -> Self {
        self.progress_callback = Some(progress_callback);
        self
    }

    /// Validates the inputs and fits the curve.
    pub fn build(self) -> Result<BSplineCurve, FitError> {
        BSplineCurve::new(
            self.points,
            self.settings,
            self.weights,
            self.parameters,
            self.params,
            self.progress_callback,
        )
    }
}

/// A smoothing spline curve fitted to a sequence of points.
///
/// Holds the fitted [`BSplineModel`] together with the parameter values assigned
/// to the input points and the diagnostics of the fit. The model is shared, so
/// clones and concurrent queries are cheap.
#[derive(Debug, Clone)]
pub struct BSplineCurve {
    model: Arc<BSplineModel>,

    /// Parameter value of each input point.
    parameters: Vec<f64>,

    /// Weighted residual sum of squares of the fit.
    fp: f64,

    status: FitStatus,

    /// Settings the curve was fitted with.
    pub settings: SplineSettings,

    /// Knot placement and smoothing iteration parameters the curve was fitted with.
    pub params: FitParams,
}

impl BSplineCurve {
    /// Creates a new [`BSplineCurveBuilder`] for the given `m x dim` points
    /// (one row per point) and settings.
    ///
    /// This is the way to fit a curve.
    pub fn builder(points: Mat<f64>, settings: SplineSettings) -> BSplineCurveBuilder {
        BSplineCurveBuilder::new(points, settings)
    }

    fn new(
        points: Mat<f64>,
        settings: SplineSettings,
        weights: Option<Vec<f64>>,
        parameters: Option<Vec<f64>>,
        params: FitParams,
        progress_callback: Option<Arc<dyn ProgressSink>>,
    ) -> Result<Self, FitError> {
        let fit_start = Instant::now();

        let num_points = points.nrows();
        let input = FitInput::new(points, weights, parameters, &settings)?;
        let outcome = knots::fit(input, &params, progress_callback.as_ref())?;

        if let Some(sink) = &progress_callback {
            sink.emit(ProgressMsg::Message {
                message: format!(
                    "Fitted {} points in {:.2?}",
                    num_points,
                    fit_start.elapsed()
                ),
            });
        }

        Ok(Self {
            model: Arc::new(outcome.model),
            parameters: outcome.parameters,
            fp: outcome.fp,
            status: outcome.status,
            settings,
            params,
        })
    }

    #[inline]
    pub fn model(&self) -> &BSplineModel {
        &self.model
    }

    /// Parameter value assigned to each input point.
    #[inline]
    pub fn parameters(&self) -> &[f64] {
        &self.parameters
    }

    /// Weighted residual sum of squares of the fit.
    #[inline]
    pub fn fp(&self) -> f64 {
        self.fp
    }

    #[inline]
    pub fn num_knots(&self) -> usize {
        self.model.num_knots()
    }

    #[inline]
    pub fn status(&self) -> FitStatus {
        self.status
    }

    /// Evaluates the curve at each query parameter. Returns one row per query.
    pub fn evaluate(
        &self,
        parameters: &[f64],
        policy: ExtrapolationPolicy,
    ) -> Result<Mat<f64>, EvalError> {
        self.model.evaluate(parameters, policy)
    }

    /// Evaluates the `order`-th derivative of the curve at each query parameter.
    pub fn differentiate(
        &self,
        parameters: &[f64],
        order: usize,
        policy: ExtrapolationPolicy,
    ) -> Result<Mat<f64>, EvalError> {
        self.model.differentiate(parameters, order, policy)
    }

    /// Saves the fitted model. See [`BSplineModel::save_model`].
    pub fn save_model<P: AsRef<Path>>(&self, path: P) -> ModelIOResult<()> {
        self.model.save_model(path)
    }
}
