/////////////////////////////////////////////////////////////////////////////////////////////
//
// Declares the error types raised while fitting, solving, evaluating and persisting splines.
//
// Created on: 15 Nov 2025     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Error types for spline fitting, evaluation and model persistence.

use std::{
    error::Error,
    fmt, io,
    path::PathBuf,
};

/// Reason attached to a [`FitError::ConvergenceFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceReason {
    /// The knot cap was reached before the residual dropped to the smoothing factor.
    KnotLimit,

    /// The smoothing parameter search used all of its iterations.
    IterationLimit,

    /// The smoothing parameter search stopped making progress, usually because the
    /// tolerance is too small for the requested smoothing factor.
    ToleranceTooSmall,
}

impl fmt::Display for ConvergenceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvergenceReason::KnotLimit => write!(f, "knot limit reached"),
            ConvergenceReason::IterationLimit => write!(f, "iteration limit reached"),
            ConvergenceReason::ToleranceTooSmall => write!(f, "tolerance too small"),
        }
    }
}

/// Errors raised while constructing a fitted spline.
///
/// Input validation errors are returned before any numerical work begins.
/// No partially fitted model is ever returned alongside an error.
#[derive(Debug, Clone, PartialEq)]
pub enum FitError {
    /// Spline degree outside `0..=5`.
    InvalidDegree { degree: usize },

    /// Point dimension outside `1..=10`.
    InvalidDimension { dim: usize },

    /// Not enough points for the requested degree (`m <= k`).
    InsufficientPoints { num_points: usize, degree: usize },

    /// Number of weights does not match the number of points.
    WeightCountMismatch { num_weights: usize, num_points: usize },

    /// A weight is zero, negative or not finite.
    InvalidWeights { index: usize, weight: f64 },

    /// The smoothing factor is negative or not finite.
    InvalidSmoothingFactor { smoothing_factor: f64 },

    /// Parameter values are not strictly increasing, or could not be derived
    /// from the points.
    InvalidParameterization { index: usize, reason: &'static str },

    /// A fit tuning parameter is out of range.
    InvalidParams { reason: &'static str },

    /// The requested knot cap cannot hold a valid spline.
    InvalidKnotCap { max_knots: usize, min_knots: usize },

    /// The smoothing constraint could not be satisfied. Reports the best residual
    /// reached and the knot count it was reached with.
    ConvergenceFailure {
        fp: f64,
        num_knots: usize,
        smoothing_factor: f64,
        reason: ConvergenceReason,
    },

    /// The banded least-squares system is rank deficient for the current knots.
    SingularSystem { column: usize },

    /// The fitted representation failed model validation.
    InvalidModel { reason: String },
}

impl fmt::Display for FitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitError::InvalidDegree { degree } => {
                write!(f, "invalid spline degree {} (expected 0..=5)", degree)
            }
            FitError::InvalidDimension { dim } => {
                write!(f, "invalid point dimension {} (expected 1..=10)", dim)
            }
            FitError::InsufficientPoints { num_points, degree } => write!(
                f,
                "{} points are not enough for a degree {} spline (need at least {})",
                num_points,
                degree,
                degree + 1
            ),
            FitError::WeightCountMismatch {
                num_weights,
                num_points,
            } => write!(
                f,
                "got {} weights for {} points",
                num_weights, num_points
            ),
            FitError::InvalidWeights { index, weight } => {
                write!(f, "weight {} at index {} must be positive", weight, index)
            }
            FitError::InvalidSmoothingFactor { smoothing_factor } => write!(
                f,
                "smoothing factor {} must be finite and non-negative",
                smoothing_factor
            ),
            FitError::InvalidParameterization { index, reason } => {
                write!(f, "invalid parameter value at index {}: {}", index, reason)
            }
            FitError::InvalidParams { reason } => write!(f, "invalid fit parameters: {}", reason),
            FitError::InvalidKnotCap {
                max_knots,
                min_knots,
            } => write!(
                f,
                "knot cap {} is below the minimum of {} knots",
                max_knots, min_knots
            ),
            FitError::ConvergenceFailure {
                fp,
                num_knots,
                smoothing_factor,
                reason,
            } => write!(
                f,
                "fit did not converge ({}): residual {:e} with {} knots, target {:e}",
                reason, fp, num_knots, smoothing_factor
            ),
            FitError::SingularSystem { column } => {
                write!(f, "least-squares system is singular at column {}", column)
            }
            FitError::InvalidModel { reason } => write!(f, "invalid spline model: {}", reason),
        }
    }
}

impl Error for FitError {}

/// Numerical failure raised by the banded least-squares solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveError {
    /// A diagonal entry of the triangularised system vanished.
    SingularSystem { column: usize },

    /// The degree, array lengths or knot count do not describe a valid system.
    InvalidInput { reason: &'static str },
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveError::SingularSystem { column } => {
                write!(f, "least-squares system is singular at column {}", column)
            }
            SolveError::InvalidInput { reason } => {
                write!(f, "invalid least-squares input: {}", reason)
            }
        }
    }
}

impl Error for SolveError {}

impl From<SolveError> for FitError {
    fn from(value: SolveError) -> Self {
        match value {
            SolveError::SingularSystem { column } => FitError::SingularSystem { column },
            SolveError::InvalidInput { reason } => FitError::InvalidParams { reason },
        }
    }
}

/// Errors raised while evaluating or differentiating a fitted model.
///
/// These are local to a single call and never affect the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EvalError {
    /// A query parameter lies outside the model domain (or is not finite).
    EvaluationDomainError { parameter: f64, lower: f64, upper: f64 },

    /// The derivative order is outside `1..=degree`.
    DerivativeOrderError { order: usize, degree: usize },
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::EvaluationDomainError {
                parameter,
                lower,
                upper,
            } => write!(
                f,
                "parameter {} lies outside the domain [{}, {}]",
                parameter, lower, upper
            ),
            EvalError::DerivativeOrderError { order, degree } => write!(
                f,
                "derivative order {} is invalid for a degree {} spline (expected 1..={})",
                order, degree, degree
            ),
        }
    }
}

impl Error for EvalError {}

pub(crate) type ModelIOResult<T> = std::result::Result<T, ModelIOError>;

/// Errors that can occur when saving or loading a [`crate::BSplineModel`].
///
/// Wraps lower-level I/O and JSON serialization issues as well as format/version
/// validation failures. Models that parse but violate the knot/coefficient
/// invariants are reported as [`ModelIOError::Parse`].
#[derive(Debug)]
pub enum ModelIOError {
    /// Failed to create the target file before writing a model.
    Create { path: PathBuf, source: io::Error },

    /// Failed to open an existing model file for reading.
    Open { path: PathBuf, source: io::Error },

    /// Failed to flush buffered output when finishing a write.
    Flush { path: PathBuf, source: io::Error },

    /// Error serializing the in-memory model to JSON.
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Error parsing JSON when reading a model from disk.
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The JSON `format` field does not match the expected model format.
    FormatMismatch {
        path: PathBuf,
        found: String,
        expected: &'static str,
    },

    /// The JSON `version` field does not match the supported version.
    VersionMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
}

impl fmt::Display for ModelIOError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelIOError::Create { path, source } => {
                write!(f, "creating {}: {}", path.display(), source)
            }
            ModelIOError::Open { path, source } => {
                write!(f, "opening {}: {}", path.display(), source)
            }
            ModelIOError::Flush { path, source } => {
                write!(f, "flushing {}: {}", path.display(), source)
            }
            ModelIOError::Serialize { path, source } => {
                write!(f, "serializing JSON to {}: {}", path.display(), source)
            }
            ModelIOError::Parse { path, source } => {
                write!(f, "parsing JSON in {}: {}", path.display(), source)
            }
            ModelIOError::FormatMismatch {
                path,
                found,
                expected,
            } => write!(
                f,
                "unsupported format {:?} (expected {:?}) in {}",
                found,
                expected,
                path.display()
            ),
            ModelIOError::VersionMismatch {
                path,
                found,
                expected,
            } => write!(
                f,
                "unsupported version {} (expected {}) in {}",
                found,
                expected,
                path.display()
            ),
        }
    }
}

impl Error for ModelIOError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ModelIOError::Create { source, .. }
            | ModelIOError::Open { source, .. }
            | ModelIOError::Flush { source, .. } => Some(source),
            ModelIOError::Serialize { source, .. } | ModelIOError::Parse { source, .. } => {
                Some(source)
            }
            ModelIOError::FormatMismatch { .. } | ModelIOError::VersionMismatch { .. } => None,
        }
    }
}
