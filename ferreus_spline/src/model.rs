/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines the immutable fitted B-spline model, its validation, and JSON persistence.
//
// Created on: 15 Nov 2025     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{
    derivative,
    error::{EvalError, FitError, ModelIOError, ModelIOResult},
    evaluate::{self, ExtrapolationPolicy},
};
use faer::Mat;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Highest supported spline degree.
pub const MAX_DEGREE: usize = 5;

/// Highest supported point dimension.
pub const MAX_DIMENSION: usize = 10;

#[doc = include_str!("../docs/bspline_model.md")]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ModelLayout", into = "ModelLayout")]
pub struct BSplineModel {
    degree: usize,
    knots: Vec<f64>,
    /// `(n - k - 1) x dim`, one column per dimension.
    coefficients: Mat<f64>,
}

impl BSplineModel {
    /// Creates a model from a clamped knot vector and a coefficient matrix with
    /// one column per dimension.
    ///
    /// ### Validation
    /// - `degree` in `0..=5` and `1..=10` coefficient columns.
    /// - At least `2k + 2` finite, non-decreasing knots.
    /// - First and last knot values repeated exactly `k + 1` times.
    /// - Interior knots repeated at most `k` times (once for `k = 0`).
    /// - `n - k - 1` rows of finite coefficients.
    pub fn new(degree: usize, knots: Vec<f64>, coefficients: Mat<f64>) -> Result<Self, FitError> {
        validate(degree, &knots, &coefficients)?;
        Ok(Self::from_parts(degree, knots, coefficients))
    }

    /// Assembles a model whose invariants are guaranteed by the caller.
    pub(crate) fn from_parts(degree: usize, knots: Vec<f64>, coefficients: Mat<f64>) -> Self {
        Self {
            degree,
            knots,
            coefficients,
        }
    }

    #[inline]
    pub fn degree(&self) -> usize {
        self.degree
    }

    #[inline]
    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    #[inline]
    pub fn coefficients(&self) -> &Mat<f64> {
        &self.coefficients
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.coefficients.ncols()
    }

    #[inline]
    pub fn num_knots(&self) -> usize {
        self.knots.len()
    }

    /// Parameter range over which the representation is authoritative,
    /// `[knots[k], knots[n - k - 1]]`.
    #[inline]
    pub fn domain(&self) -> (f64, f64) {
        (
            self.knots[self.degree],
            self.knots[self.knots.len() - self.degree - 1],
        )
    }

    /// Evaluates the curve at each query parameter. Returns one row per query.
    ///
    /// See [`evaluate::evaluate`].
    pub fn evaluate(
        &self,
        parameters: &[f64],
        policy: ExtrapolationPolicy,
    ) -> Result<Mat<f64>, EvalError> {
        evaluate::evaluate(self, parameters, policy)
    }

    /// Evaluates the `order`-th derivative of the curve at each query parameter.
    ///
    /// See [`derivative::differentiate`].
    pub fn differentiate(
        &self,
        parameters: &[f64],
        order: usize,
        policy: ExtrapolationPolicy,
    ) -> Result<Mat<f64>, EvalError> {
        derivative::differentiate(self, parameters, order, policy)
    }

    /// Returns the degree `k - order` model of the `order`-th derivative.
    pub fn derivative(&self, order: usize) -> Result<BSplineModel, EvalError> {
        derivative::derivative_model(self, order)
    }

    /// Save this model to a **JSON envelope** `{ format, version, degree, dim, knots, coefficients }`.
    ///
    /// Coefficients are written as one flat array, dimension by dimension.
    ///
    /// ### Errors
    /// - Returns `ModelIOError::{Create, Serialize, Flush}` on I/O or serialization
    ///   failures.
    ///
    /// ### Example
    /// ```no_run
    /// # use ferreus_spline::BSplineModel;
    /// # let model: BSplineModel = unimplemented!();
    /// model.save_model("curve_model.json")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn save_model<P: AsRef<Path>>(&self, path: P) -> ModelIOResult<()> {
        let path_ref = path.as_ref();
        let file = File::create(path_ref).map_err(|e| ModelIOError::Create {
            path: path_ref.to_path_buf(),
            source: e,
        })?;
        let mut w = BufWriter::new(file);

        let env = JsonEnvelopeRef {
            format: JSON_FORMAT_NAME,
            version: JSON_VERSION,
            model: self,
        };

        serde_json::to_writer_pretty(&mut w, &env).map_err(|e| ModelIOError::Serialize {
            path: path_ref.to_path_buf(),
            source: e,
        })?;
        w.flush().map_err(|e| ModelIOError::Flush {
            path: path_ref.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }

    /// Load a model from a versioned **JSON envelope**, validating format, version
    /// and the knot/coefficient invariants.
    ///
    /// ### Errors
    /// - Returns `ModelIOError::{Open, Parse, FormatMismatch, VersionMismatch}` as appropriate.
    ///
    /// ### Example
    /// ```no_run
    /// # use ferreus_spline::BSplineModel;
    /// let model = BSplineModel::load_model("curve_model.json")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_model<P: AsRef<Path>>(path: P) -> ModelIOResult<Self> {
        let path_ref = path.as_ref();

        let file = File::open(path_ref).map_err(|e| ModelIOError::Open {
            path: path_ref.to_path_buf(),
            source: e,
        })?;
        let reader = BufReader::new(file);

        let env: JsonEnvelopeOwned<Self> =
            serde_json::from_reader(reader).map_err(|e| ModelIOError::Parse {
                path: path_ref.to_path_buf(),
                source: e,
            })?;

        // Validate envelope
        if env.format != JSON_FORMAT_NAME {
            return Err(ModelIOError::FormatMismatch {
                path: path_ref.to_path_buf(),
                found: env.format,
                expected: JSON_FORMAT_NAME,
            });
        }

        if env.version != JSON_VERSION {
            return Err(ModelIOError::VersionMismatch {
                path: path_ref.to_path_buf(),
                found: env.version,
                expected: JSON_VERSION,
            });
        }

        Ok(env.model)
    }
}

fn invalid(reason: String) -> FitError {
    FitError::InvalidModel { reason }
}

fn validate(degree: usize, knots: &[f64], coefficients: &Mat<f64>) -> Result<(), FitError> {
    if degree > MAX_DEGREE {
        return Err(FitError::InvalidDegree { degree });
    }

    let dim = coefficients.ncols();
    if !(1..=MAX_DIMENSION).contains(&dim) {
        return Err(FitError::InvalidDimension { dim });
    }

    let n = knots.len();
    let k1 = degree + 1;
    if n < 2 * k1 {
        return Err(invalid(format!(
            "{} knots are fewer than the {} required for degree {}",
            n,
            2 * k1,
            degree
        )));
    }

    if let Some(i) = knots.iter().position(|t| !t.is_finite()) {
        return Err(invalid(format!("knot {} is not finite", i)));
    }
    if let Some(i) = (1..n).find(|&i| knots[i] < knots[i - 1]) {
        return Err(invalid(format!("knots decrease at index {}", i)));
    }

    let (start, end) = (knots[degree], knots[n - k1]);
    if !(start < end) {
        return Err(invalid("the knot vector spans an empty domain".to_string()));
    }
    if knots[0] != start || knots[k1] == start || knots[n - 1] != end || knots[n - k1 - 1] == end
    {
        return Err(invalid(format!(
            "end knots must be repeated exactly {} times",
            k1
        )));
    }

    let max_interior = degree.max(1);
    let mut run = 0;
    for i in k1..(n - k1) {
        run = if i > k1 && knots[i] == knots[i - 1] { run + 1 } else { 1 };
        if run > max_interior {
            return Err(invalid(format!(
                "interior knot {} is repeated more than {} times",
                knots[i], max_interior
            )));
        }
    }

    if coefficients.nrows() != n - k1 {
        return Err(invalid(format!(
            "expected {} coefficients per dimension, found {}",
            n - k1,
            coefficients.nrows()
        )));
    }
    for j in 0..dim {
        if coefficients.col(j).iter().any(|c| !c.is_finite()) {
            return Err(invalid(format!("coefficients of dimension {} are not finite", j)));
        }
    }

    Ok(())
}

/// Flat persisted layout of a [`BSplineModel`].
#[derive(Serialize, Deserialize)]
struct ModelLayout {
    degree: usize,
    dim: usize,
    knots: Vec<f64>,
    coefficients: Vec<f64>,
}

impl From<BSplineModel> for ModelLayout {
    fn from(model: BSplineModel) -> Self {
        let dim = model.dim();
        let coefficients = (0..dim)
            .flat_map(|j| model.coefficients.col(j).iter().copied().collect::<Vec<_>>())
            .collect();

        ModelLayout {
            degree: model.degree,
            dim,
            knots: model.knots,
            coefficients,
        }
    }
}

impl TryFrom<ModelLayout> for BSplineModel {
    type Error = FitError;

    fn try_from(layout: ModelLayout) -> Result<Self, Self::Error> {
        if !(1..=MAX_DIMENSION).contains(&layout.dim) {
            return Err(FitError::InvalidDimension { dim: layout.dim });
        }
        if layout.coefficients.len() % layout.dim != 0 {
            return Err(invalid(format!(
                "{} coefficients cannot be split into {} dimensions",
                layout.coefficients.len(),
                layout.dim
            )));
        }

        let rows = layout.coefficients.len() / layout.dim;
        let coefficients = Mat::from_fn(rows, layout.dim, |i, j| layout.coefficients[j * rows + i]);

        BSplineModel::new(layout.degree, layout.knots, coefficients)
    }
}

const JSON_FORMAT_NAME: &str = "ferreus_spline.json";
const JSON_VERSION: u32 = 1;

/// Borrowing envelope for SAVE.
#[derive(Serialize)]
struct JsonEnvelopeRef<'a, T: ?Sized> {
    format: &'static str,
    version: u32,
    #[serde(flatten)]
    model: &'a T,
}

/// Owning envelope for LOAD (generic over the concrete model).
#[derive(Deserialize)]
struct JsonEnvelopeOwned<T> {
    format: String,
    version: u32,
    #[serde(flatten)]
    model: T,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve_test_functions::CurveTestFunctions;
    use crate::{BSplineCurve, spline_config::SplineSettings};

    fn cubic_model() -> BSplineModel {
        let knots = vec![0.0, 0.0, 0.0, 0.0, 0.3, 0.6, 1.0, 1.0, 1.0, 1.0];
        let coefficients = Mat::from_fn(6, 2, |i, j| (i as f64 + 1.0) * (j as f64 + 0.5));
        BSplineModel::new(3, knots, coefficients).unwrap()
    }

    #[test]
    fn domain_spans_the_clamped_ends() {
        let model = cubic_model();
        assert_eq!(model.domain(), (0.0, 1.0));
        assert_eq!(model.dim(), 2);
        assert_eq!(model.num_knots(), 10);
    }

    #[test]
    fn validation_rejects_broken_models() {
        let good = cubic_model();
        let coefs = good.coefficients().clone();

        // Too few end knots.
        let knots = vec![0.0, 0.0, 0.0, 0.3, 0.6, 1.0, 1.0, 1.0, 1.0];
        assert!(BSplineModel::new(3, knots, Mat::zeros(5, 2)).is_err());

        // Decreasing knots.
        let knots = vec![0.0, 0.0, 0.0, 0.0, 0.6, 0.3, 1.0, 1.0, 1.0, 1.0];
        assert!(BSplineModel::new(3, knots, coefs.clone()).is_err());

        // Interior multiplicity above the degree.
        let knots = vec![0.0, 0.0, 0.0, 0.5, 0.5, 0.5, 1.0, 1.0, 1.0];
        assert!(BSplineModel::new(2, knots, Mat::zeros(6, 1)).is_err());

        // Wrong coefficient count.
        assert!(BSplineModel::new(3, good.knots().to_vec(), Mat::zeros(5, 2)).is_err());

        // Unsupported degree.
        assert!(matches!(
            BSplineModel::new(6, good.knots().to_vec(), coefs),
            Err(FitError::InvalidDegree { degree: 6 })
        ));
    }

    #[test]
    fn save_then_load_preserves_evaluation() {
        let points = CurveTestFunctions::closed_loop();
        let settings = SplineSettings::builder().smoothing_factor(0.2).build();
        let curve = BSplineCurve::builder(points, settings).build().unwrap();
        let model = curve.model();

        let path = std::env::temp_dir().join(format!(
            "ferreus_spline_roundtrip_{}.json",
            std::process::id()
        ));
        model.save_model(&path).unwrap();
        let loaded = BSplineModel::load_model(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded.degree(), model.degree());
        assert_eq!(loaded.knots(), model.knots());

        let query: Vec<f64> = (0..=50).map(|i| i as f64 / 50.0).collect();
        let before = model.evaluate(&query, ExtrapolationPolicy::Reject).unwrap();
        let after = loaded.evaluate(&query, ExtrapolationPolicy::Reject).unwrap();
        for i in 0..query.len() {
            for j in 0..2 {
                assert_eq!(before[(i, j)].to_bits(), after[(i, j)].to_bits());
            }
        }
    }

    #[test]
    fn load_rejects_foreign_format() {
        let path = std::env::temp_dir().join(format!(
            "ferreus_spline_foreign_{}.json",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"{"format":"other.json","version":1,"degree":1,"dim":1,"knots":[0,0,1,1],"coefficients":[0,1]}"#,
        )
        .unwrap();
        let result = BSplineModel::load_model(&path);
        let _ = std::fs::remove_file(&path);

        assert!(matches!(result, Err(ModelIOError::FormatMismatch { .. })));
    }

    #[test]
    fn load_rejects_inconsistent_layout() {
        let path = std::env::temp_dir().join(format!(
            "ferreus_spline_invalid_{}.json",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"{"format":"ferreus_spline.json","version":1,"degree":1,"dim":1,"knots":[0,0,1,1],"coefficients":[0,1,2]}"#,
        )
        .unwrap();
        let result = BSplineModel::load_model(&path);
        let _ = std::fs::remove_file(&path);

        assert!(matches!(result, Err(ModelIOError::Parse { .. })));
    }
}
