/////////////////////////////////////////////////////////////////////////////////////////////
//
// Exposes the public API and high-level documentation for smoothing spline curve fitting.
//
// Created on: 15 Nov 2025     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Smoothing parametric B-spline curve fitting.
//!
//! Given an ordered sequence of points in up to ten dimensions, this crate fits a
//! parametric B-spline curve that passes close to the points, with the closeness
//! controlled by a single **smoothing factor** `s`:
//!
//! <div>
//! $$
//! \sum_i \left( w_i \, \lVert \mathbf{x}_i - \mathbf{s}(u_i) \rVert \right)^2 \le s
//! $$
//! </div>
//!
//! Among all splines that satisfy the constraint, the one with the smallest
//! discontinuities of its highest derivative at the knots is returned. The knots
//! are not supplied by the caller. They are placed adaptively, starting from a
//! single polynomial piece and adding knots where the residual is largest `1`.
//!
//! - `s = 0` gives an interpolating spline.
//! - A large `s` gives the least-squares polynomial.
//!
//! All least-squares work is done on banded triangular systems built with Givens
//! rotations, so a fit with `m` points and `n` knots costs `O(m k^2)` per knot set.
//!
//! Check out the examples directory in the repository for more examples of usage.
//!
//! # Features
//! - Degrees 0 to 5, points in 1 to 10 dimensions
//! - Chord-length or uniform parameterisation, or caller-supplied parameters
//! - Per-point weights
//! - Evaluation and derivatives of any order up to the degree, in parallel
//! - Versioned JSON persistence of fitted models
//! - Built on [`faer`](https://docs.rs/faer/latest/faer/) for linear algebra, avoiding complex build dependencies
//!
//! # Examples
//!
//! ```
//! use ferreus_spline::{
//!     BSplineCurve, CurveTestFunctions, ExtrapolationPolicy,
//!     spline_config::SplineSettings,
//! };
//!
//! // A hand-digitised closed loop of 22 points in the plane
//! let points = CurveTestFunctions::closed_loop();
//!
//! // Cubic smoothing spline with a chord-length parameterisation
//! let settings = SplineSettings::builder().smoothing_factor(0.2).build();
//!
//! // Place the knots and fit the curve
//! let curve = BSplineCurve::builder(points, settings).build()?;
//!
//! // Evaluate the curve and its tangent at a few parameter values
//! let query = [0.0, 0.3, 0.5, 1.0];
//! let values = curve.evaluate(&query, ExtrapolationPolicy::Reject)?;
//! let tangents = curve.differentiate(&query, 1, ExtrapolationPolicy::Reject)?;
//!
//! assert_eq!(values.nrows(), 4);
//! assert_eq!(tangents.ncols(), 2);
//! assert!((curve.fp() - 0.2).abs() < 0.2 * 1.0e-3);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # References
//! 1.  P. Dierckx. Algorithms for smoothing data with periodic and parametric
//!     splines. Computer Graphics and Image Processing, 20:171-184, 1982.
//! 2.  P. Dierckx. Curve and Surface Fitting with Splines. Oxford University Press, 1993.
//! 3.  C. de Boor. On calculating with B-splines. J. Approximation Theory, 6:50-62, 1972.
//! 4.  M. G. Cox. The numerical evaluation of B-splines. J. Inst. Maths Applics, 10:134-149, 1972.
pub mod spline_config;

mod common;

mod basis;

mod bspline;

mod linalg;

mod least_squares;

mod parameterization;

mod knots;

mod evaluate;

mod derivative;

mod model;

pub mod progress;

pub mod config;

pub mod error;

mod curve_test_functions;

pub use {
    bspline::{BSplineCurve, BSplineCurveBuilder},
    common::{generate_random_points, linspace},
    curve_test_functions::CurveTestFunctions,
    derivative::{derivative_model, differentiate},
    error::{ConvergenceReason, EvalError, FitError, ModelIOError, SolveError},
    evaluate::{ExtrapolationPolicy, evaluate},
    knots::{FitInput, FitOutcome, FitStatus, fit},
    least_squares::{LeastSquaresFit, solve},
    model::{BSplineModel, MAX_DEGREE, MAX_DIMENSION},
};
