/////////////////////////////////////////////////////////////////////////////////////////////
//
// Places knots and selects the smoothing parameter for smoothing parametric spline fits.
//
// Created on: 15 Nov 2025     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Knot placement engine.
//!
//! A fit runs in two phases.
//!
//! 1. **Knot growth.** Starting from the least-squares polynomial (no interior
//!    knots), knots are added at data parameters inside the knot intervals that
//!    carry the largest share of the residual until the residual `fp` drops below
//!    the smoothing factor `s`, the curve interpolates the data, or the knot cap
//!    is reached.
//! 2. **Smoothing.** With the knots fixed, the spline minimising
//!    `p * fp + (sum of squared k-th derivative jumps at the interior knots)` is
//!    computed for a sequence of `p`, chosen by rational interpolation until
//!    `fp(p) = s` within the tolerance.
//!
//! With `s = 0` the knots are placed for interpolation directly.

use crate::{
    basis,
    config::FitParams,
    error::{ConvergenceReason, FitError},
    least_squares::{self, LeastSquaresFit},
    linalg::{self, Rotation},
    model::{BSplineModel, MAX_DEGREE, MAX_DIMENSION},
    parameterization,
    progress::{ProgressMsg, ProgressSink, progress_from_misfit},
    spline_config::SplineSettings,
};
use faer::Mat;
use rayon::prelude::*;
use std::sync::Arc;

// Step factors used when the smoothing parameter is not yet bracketed.
const CON1: f64 = 0.1;
const CON9: f64 = 0.9;
const CON4: f64 = 0.04;

/// Validated input of a single fit. Consumed by [`fit`].
///
/// [`FitInput::new`] is the only way to build one, so every input reaching
/// [`fit`] has passed validation.
///
/// ```compile_fail
/// use ferreus_spline::FitInput;
///
/// let input = FitInput {
///     points: faer::Mat::zeros(10, 2),
///     weights: vec![1.0; 3],
///     parameters: vec![0.0; 10],
///     degree: 3,
///     smoothing_factor: 0.0,
/// };
/// ```
#[derive(Debug, Clone)]
pub struct FitInput {
    /// `m x dim` points, one row per point.
    points: Mat<f64>,

    /// One positive weight per point.
    weights: Vec<f64>,

    /// Strictly increasing parameter value of each point.
    parameters: Vec<f64>,

    degree: usize,

    smoothing_factor: f64,
}

impl FitInput {
    /// Validates the raw inputs and derives parameter values.
    ///
    /// `weights` defaults to all ones. When `parameters` is `None` they are
    /// computed from the points with `settings.parameterization`; supplied
    /// parameters may span any finite interval, which becomes the domain.
    ///
    /// All checks run before any numerical work.
    pub fn new(
        points: Mat<f64>,
        weights: Option<Vec<f64>>,
        parameters: Option<Vec<f64>>,
        settings: &SplineSettings,
    ) -> Result<Self, FitError> {
        let degree = settings.degree;
        let smoothing_factor = settings.smoothing_factor;
        let m = points.nrows();
        let dim = points.ncols();

        if degree > MAX_DEGREE {
            return Err(FitError::InvalidDegree { degree });
        }
        if !(1..=MAX_DIMENSION).contains(&dim) {
            return Err(FitError::InvalidDimension { dim });
        }
        if m <= degree {
            return Err(FitError::InsufficientPoints {
                num_points: m,
                degree,
            });
        }

        let weights = match weights {
            Some(w) => {
                if w.len() != m {
                    return Err(FitError::WeightCountMismatch {
                        num_weights: w.len(),
                        num_points: m,
                    });
                }
                if let Some((index, &weight)) =
                    w.iter().enumerate().find(|(_, w)| !(**w > 0.0) || !w.is_finite())
                {
                    return Err(FitError::InvalidWeights { index, weight });
                }
                w
            }
            None => vec![1.0; m],
        };

        if !(smoothing_factor >= 0.0) || !smoothing_factor.is_finite() {
            return Err(FitError::InvalidSmoothingFactor { smoothing_factor });
        }

        if let Some(index) = (0..m).find(|&i| points.row(i).iter().any(|v| !v.is_finite())) {
            return Err(FitError::InvalidParameterization {
                index,
                reason: "point coordinates must be finite",
            });
        }

        let parameters = match parameters {
            Some(u) => {
                if u.len() != m {
                    return Err(FitError::InvalidParameterization {
                        index: u.len().min(m),
                        reason: "one parameter value is required per point",
                    });
                }
                parameterization::validate_parameters(&u)?;
                u
            }
            None => parameterization::compute_parameters(&points, settings.parameterization)?,
        };

        Ok(Self {
            points,
            weights,
            parameters,
            degree,
            smoothing_factor,
        })
    }

    #[inline]
    pub fn points(&self) -> &Mat<f64> {
        &self.points
    }

    #[inline]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    #[inline]
    pub fn parameters(&self) -> &[f64] {
        &self.parameters
    }

    #[inline]
    pub fn degree(&self) -> usize {
        self.degree
    }

    #[inline]
    pub fn smoothing_factor(&self) -> f64 {
        self.smoothing_factor
    }
}

/// How a successful fit terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitStatus {
    /// `|fp - s| < tolerance * s`.
    Converged,

    /// The knots reached the interpolation count `m + k + 1`.
    Interpolating,

    /// The least-squares polynomial already satisfies `fp <= s`.
    Polynomial,

    /// The smoothing parameter search stopped early with `fp < s`, so the
    /// smoothing constraint holds but is not tight.
    BelowTarget,
}

/// Result of a successful [`fit`].
#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub model: BSplineModel,

    /// Parameter values of the input points.
    pub parameters: Vec<f64>,

    /// Weighted residual sum of squares of the returned model.
    pub fp: f64,

    pub status: FitStatus,
}

/// Fits a smoothing spline curve to `input`.
///
/// # Errors
/// - [`FitError::InvalidKnotCap`] if `params.max_knots` cannot hold the fit.
/// - [`FitError::SingularSystem`] if a least-squares round is rank deficient.
/// - [`FitError::ConvergenceFailure`] if `fp <= s` could not be reached, with the
///   best residual and knot count achieved.
pub fn fit(
    input: FitInput,
    params: &FitParams,
    progress: Option<&Arc<dyn ProgressSink>>,
) -> Result<FitOutcome, FitError> {
    let FitInput {
        points,
        weights,
        parameters,
        degree,
        smoothing_factor,
    } = input;

    if !(params.tolerance > 0.0) || !params.tolerance.is_finite() {
        return Err(FitError::InvalidParams {
            reason: "tolerance must be positive and finite",
        });
    }
    if params.max_iterations == 0 {
        return Err(FitError::InvalidParams {
            reason: "at least one smoothing iteration is required",
        });
    }

    let m = points.nrows();
    let k1 = degree + 1;
    let nmin = 2 * k1;
    let nmax = m + k1;

    let nest = match params.max_knots {
        Some(cap) => {
            let required = if smoothing_factor == 0.0 { nmax } else { nmin };
            if cap < required {
                return Err(FitError::InvalidKnotCap {
                    max_knots: cap,
                    min_knots: required,
                });
            }
            cap.min(nmax)
        }
        None => nmax,
    };

    let engine = KnotPlacement {
        points: &points,
        weights: &weights,
        u: &parameters,
        degree,
        s: smoothing_factor,
        acc: params.tolerance * smoothing_factor,
        nmin,
        nmax,
        nest,
        max_iterations: params.max_iterations,
        progress,
    };

    let (knots, coefficients, fp, status) = engine.run()?;
    let model = BSplineModel::new(degree, knots, coefficients)?;

    if let Some(sink) = progress {
        sink.emit(ProgressMsg::Message {
            message: format!(
                "Fitted degree {} spline with {} knots ({:?}), residual {:e}",
                degree,
                model.num_knots(),
                status,
                fp
            ),
        });
    }

    Ok(FitOutcome {
        model,
        parameters,
        fp,
        status,
    })
}

/// Knots, coefficients, residual and status of a finished fit.
type Finished = (Vec<f64>, Mat<f64>, f64, FitStatus);
type EngineResult = Result<Finished, FitError>;

struct KnotPlacement<'a> {
    points: &'a Mat<f64>,
    weights: &'a [f64],
    u: &'a [f64],
    degree: usize,
    s: f64,
    acc: f64,
    nmin: usize,
    nmax: usize,
    nest: usize,
    max_iterations: usize,
    progress: Option<&'a Arc<dyn ProgressSink>>,
}

/// How the knot growth phase ended.
enum Growth {
    Finished(Finished),

    /// The residual dropped below `s`; the state is handed to the smoothing phase.
    Smooth(GrowthResult),
}

struct GrowthResult {
    knots: Vec<f64>,
    fit: LeastSquaresFit,
    fp0: f64,
    fpms: f64,
    polynomial: bool,
}

impl KnotPlacement<'_> {
    fn run(&self) -> EngineResult {
        let growth = match self.grow()? {
            Growth::Finished(done) => return Ok(done),
            Growth::Smooth(growth) => growth,
        };

        if growth.polynomial {
            let fp = growth.fit.fp();
            return Ok((
                growth.knots,
                growth.fit.into_coefficients(),
                fp,
                FitStatus::Polynomial,
            ));
        }

        self.smooth(growth)
    }

    /// Full knot vector with clamped ends around `interior`.
    fn full_knots(&self, interior: &[f64]) -> Vec<f64> {
        let k1 = self.degree + 1;
        let (ub, ue) = (self.u[0], self.u[self.u.len() - 1]);

        let mut knots = Vec::with_capacity(interior.len() + 2 * k1);
        knots.extend(std::iter::repeat_n(ub, k1));
        knots.extend_from_slice(interior);
        knots.extend(std::iter::repeat_n(ue, k1));
        knots
    }

    /// Interior knots of the interpolating spline: at the data parameters for odd
    /// degree and midway between them for even degree.
    fn interpolation_interior(&self) -> Vec<f64> {
        let m = self.u.len();
        let count = m - self.degree - 1;
        let k3 = self.degree / 2;

        (0..count)
            .map(|l| {
                if self.degree % 2 == 1 {
                    self.u[l + k3 + 1]
                } else {
                    (self.u[l + k3 + 1] + self.u[l + k3]) * 0.5
                }
            })
            .collect()
    }

    fn grow(&self) -> Result<Growth, FitError> {
        let m = self.u.len();

        let mut interior = if self.s == 0.0 {
            self.interpolation_interior()
        } else {
            Vec::new()
        };

        let mut nrdata = vec![m.saturating_sub(2)];
        let mut nplus = 0usize;
        let mut fpold = 0.0;
        let mut fp0 = 0.0;
        let mut last: Option<GrowthResult> = None;

        for iteration in 0..m {
            let n = interior.len() + self.nmin;
            let polynomial = n == self.nmin;

            let knots = self.full_knots(&interior);
            let fit = least_squares::solve(self.points, self.weights, self.u, &knots, self.degree)?;
            let fp = fit.fp();
            if polynomial {
                fp0 = fp;
            }

            if let Some(sink) = self.progress {
                sink.emit(ProgressMsg::KnotsInserted {
                    iteration,
                    num_knots: n,
                    residual: fp,
                });
            }

            let fpms = fp - self.s;
            if fpms.abs() < self.acc {
                let status = if polynomial {
                    FitStatus::Polynomial
                } else {
                    FitStatus::Converged
                };
                return Ok(Growth::Finished((knots, fit.into_coefficients(), fp, status)));
            }
            if fpms < 0.0 {
                return Ok(Growth::Smooth(GrowthResult {
                    knots,
                    fit,
                    fp0,
                    fpms,
                    polynomial,
                }));
            }
            if n == self.nmax {
                return Ok(Growth::Finished((
                    knots,
                    fit.into_coefficients(),
                    fp,
                    FitStatus::Interpolating,
                )));
            }
            if n == self.nest {
                return Err(self.failure(fp, n, ConvergenceReason::KnotLimit));
            }

            // Number of knots to add this round: one after the polynomial, then
            // grown from the observed rate of decrease of fp.
            if polynomial {
                nplus = 1;
            } else {
                let mut npl1 = (nplus * 2) as i64;
                if fpold - fp > self.acc {
                    npl1 = (nplus as f64 * fpms / (fpold - fp)) as i64;
                }
                let grow = npl1.max((nplus / 2) as i64).max(1) as usize;
                nplus = (nplus * 2).min(grow);
            }
            fpold = fp;

            let mut fpint = self.interval_residuals(&fit, fit.coefficients(), interior.len() + 1);

            let mut inserted = 0;
            for _ in 0..nplus {
                if !insert_knot(self.u, &mut interior, &mut fpint, &mut nrdata) {
                    break;
                }
                inserted += 1;

                let n = interior.len() + self.nmin;
                if n == self.nmax {
                    interior = self.interpolation_interior();
                    break;
                }
                if n == self.nest {
                    break;
                }
            }

            // No interval holds interior data any more. Fall back to the
            // interpolation knots unless the cap keeps us below them.
            if inserted == 0 {
                if self.nest < self.nmax {
                    return Err(self.failure(fp, n, ConvergenceReason::KnotLimit));
                }
                interior = self.interpolation_interior();
            }

            last = Some(GrowthResult {
                knots,
                fit,
                fp0,
                fpms,
                polynomial,
            });
        }

        // Round limit reached: smooth on the last knot set.
        match last {
            Some(growth) => Ok(Growth::Smooth(growth)),
            None => Err(self.failure(f64::INFINITY, self.nmin, ConvergenceReason::KnotLimit)),
        }
    }

    /// Weighted residual of each knot interval. A point at the left end of an
    /// interval contributes half its residual to each neighbouring interval.
    fn interval_residuals(
        &self,
        fit: &LeastSquaresFit,
        coefficients: &Mat<f64>,
        nrint: usize,
    ) -> Vec<f64> {
        let m = self.u.len();
        let dim = self.points.ncols();

        let mut fpint = vec![0.0; nrint];
        let mut fpart = 0.0;
        let mut i = 0;
        let mut current = fit.first_coefficient[0];

        for it in 0..m {
            let new = fit.first_coefficient[it] != current;
            current = fit.first_coefficient[it];

            let mut term = 0.0;
            for d in 0..dim {
                let fac = least_squares::spline_value(fit, coefficients, it, d);
                let r = self.weights[it] * (fac - self.points[(it, d)]);
                term += r * r;
            }

            fpart += term;
            if new {
                let store = term * 0.5;
                fpint[i] = fpart - store;
                i += 1;
                fpart = store;
            }
        }
        fpint[nrint - 1] = fpart;

        fpint
    }

    /// Smoothing phase: find `p` with `fp(p) = s` on the fixed knot set.
    fn smooth(&self, growth: GrowthResult) -> EngineResult {
        let GrowthResult {
            knots,
            fit,
            fp0,
            fpms,
            ..
        } = growth;

        let k1 = self.degree + 1;
        let k2 = k1 + 1;
        let n = knots.len();
        let nk1 = n - k1;
        let n8 = n - self.nmin;
        let dim = self.points.ncols();

        let jumps = basis::derivative_jumps(&knots, self.degree);

        let mut p1 = 0.0;
        let mut f1 = fp0 - self.s;
        let mut p3 = -1.0;
        let mut f3 = fpms;
        let mut p = nk1 as f64 / fit.triangle.trace();
        let mut ich1 = false;
        let mut ich3 = false;
        let start_misfit = fpms.abs();

        for iter in 1..=self.max_iterations {
            let pinv = 1.0 / p;

            // Rotate the penalty rows, scaled by 1/p, into a copy of the triangle.
            let mut g = fit.triangle.widened(k2);
            let mut h = vec![0.0; k2];
            let rotations: Vec<Vec<Rotation>> = (0..n8)
                .map(|r| {
                    for j in 0..k2 {
                        h[j] = jumps[(r, j)] * pinv;
                    }
                    g.rotate_shifted(r, &mut h)
                })
                .collect();

            let columns: Vec<Vec<f64>> = (0..dim)
                .into_par_iter()
                .map(|d| {
                    let mut c = fit.reduced_rhs[d].clone();
                    for rots in rotations.iter() {
                        linalg::apply_rotations(rots, 0.0, &mut c);
                    }
                    g.back_substitute(&c)
                })
                .collect();
            let coefficients = Mat::from_fn(nk1, dim, |i, j| columns[j][i]);

            let mut fp = 0.0;
            for it in 0..self.u.len() {
                let mut term = 0.0;
                for d in 0..dim {
                    let r = least_squares::spline_value(&fit, &coefficients, it, d)
                        - self.points[(it, d)];
                    term += r * r;
                }
                fp += term * (self.weights[it] * self.weights[it]);
            }

            let fpms = fp - self.s;

            if let Some(sink) = self.progress {
                sink.emit(ProgressMsg::SmoothingIteration {
                    iter,
                    smoothing_parameter: p,
                    residual: fp,
                    progress: progress_from_misfit(fpms.abs(), start_misfit, self.acc),
                });
            }

            if fpms.abs() < self.acc {
                return Ok((knots, coefficients, fp, FitStatus::Converged));
            }
            if iter == self.max_iterations {
                return self.accept_or_fail(knots, coefficients, fp, ConvergenceReason::IterationLimit);
            }

            let p2 = p;
            let f2 = fpms;

            if !ich3 {
                if f2 - f3 <= self.acc {
                    // p is too large.
                    p3 = p2;
                    f3 = f2;
                    p *= CON4;
                    if p <= p1 {
                        p = p1 * CON9 + p2 * CON1;
                    }
                    continue;
                }
                if f2 < 0.0 {
                    ich3 = true;
                }
            }

            if !ich1 {
                if f1 - f2 <= self.acc {
                    // p is too small.
                    p1 = p2;
                    f1 = f2;
                    p /= CON4;
                    if p3 >= 0.0 && p >= p3 {
                        p = p2 * CON1 + p3 * CON9;
                    }
                    continue;
                }
                if f2 > 0.0 {
                    ich1 = true;
                }
            }

            if f2 >= f1 || f2 <= f3 {
                return self.accept_or_fail(
                    knots,
                    coefficients,
                    fp,
                    ConvergenceReason::ToleranceTooSmall,
                );
            }

            p = rational_step(&mut p1, &mut f1, p2, f2, &mut p3, &mut f3);
        }

        Err(self.failure(f64::INFINITY, n, ConvergenceReason::IterationLimit))
    }

    /// Keeps an early-terminated smoothing result if it still satisfies `fp <= s`.
    fn accept_or_fail(
        &self,
        knots: Vec<f64>,
        coefficients: Mat<f64>,
        fp: f64,
        reason: ConvergenceReason,
    ) -> EngineResult {
        if fp <= self.s {
            if let Some(sink) = self.progress {
                sink.emit(ProgressMsg::Message {
                    message: format!(
                        "Smoothing stopped early ({}), keeping residual {:e} below {:e}",
                        reason, fp, self.s
                    ),
                });
            }
            return Ok((knots, coefficients, fp, FitStatus::BelowTarget));
        }

        Err(self.failure(fp, knots.len(), reason))
    }

    fn failure(&self, fp: f64, num_knots: usize, reason: ConvergenceReason) -> FitError {
        FitError::ConvergenceFailure {
            fp,
            num_knots,
            smoothing_factor: self.s,
            reason,
        }
    }
}

/// Inserts one knot into the interval with the largest residual share that
/// still has interior data points.
///
/// The knot is placed on the middle interior data parameter of that interval, and
/// the interval's residual and data count are split between the two halves in
/// proportion to the data on each side. Returns `false` when no interval can be
/// split.
fn insert_knot(
    u: &[f64],
    interior: &mut Vec<f64>,
    fpint: &mut Vec<f64>,
    nrdata: &mut Vec<usize>,
) -> bool {
    let mut number = None;
    let mut maxpt = 0;
    let mut maxbeg = 0;
    let mut fpmax = 0.0;
    let mut jbegin = 0;

    for j in 0..fpint.len() {
        let jpoint = nrdata[j];
        if fpint[j] > fpmax && jpoint != 0 {
            fpmax = fpint[j];
            number = Some(j);
            maxpt = jpoint;
            maxbeg = jbegin;
        }
        jbegin += jpoint + 1;
    }

    let Some(number) = number else {
        return false;
    };

    let ihalf = maxpt / 2 + 1;
    let am = maxpt as f64;

    nrdata[number] = ihalf - 1;
    nrdata.insert(number + 1, maxpt - ihalf);

    fpint[number] = fpmax * (nrdata[number] as f64) / am;
    fpint.insert(number + 1, fpmax * (nrdata[number + 1] as f64) / am);

    interior.insert(number, u[maxbeg + ihalf]);

    true
}

/// Rational interpolation step for the root of `f(p) = 0` through
/// `(p1, f1)`, `(p2, f2)`, `(p3, f3)`, where `p3 < 0` stands for infinity.
///
/// Updates the bracket so that `f1 > 0` and `f3 < 0` around the new estimate.
fn rational_step(
    p1: &mut f64,
    f1: &mut f64,
    p2: f64,
    f2: f64,
    p3: &mut f64,
    f3: &mut f64,
) -> f64 {
    let p = if *p3 > 0.0 {
        let h1 = *f1 * (f2 - *f3);
        let h2 = f2 * (*f3 - *f1);
        let h3 = *f3 * (*f1 - f2);
        -(*p1 * p2 * h3 + p2 * *p3 * h1 + *p3 * *p1 * h2) / (*p1 * h1 + p2 * h2 + *p3 * h3)
    } else {
        (*p1 * (*f1 - *f3) * f2 - p2 * (f2 - *f3) * *f1) / ((*f1 - f2) * *f3)
    };

    if f2 < 0.0 {
        *p3 = p2;
        *f3 = f2;
    } else {
        *p1 = p2;
        *f1 = f2;
    }

    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        curve_test_functions::CurveTestFunctions,
        evaluate::{self, ExtrapolationPolicy},
        progress::closure_sink,
        spline_config::Parameterization,
    };
    use std::sync::Mutex;

    fn loop_fit(s: f64) -> FitOutcome {
        let settings = SplineSettings::builder().smoothing_factor(s).build();
        let input = FitInput::new(CurveTestFunctions::closed_loop(), None, None, &settings).unwrap();
        fit(input, &FitParams::default(), None).unwrap()
    }

    #[test]
    fn closed_loop_calibration() {
        let outcome = loop_fit(0.2);
        let values = evaluate::evaluate(&outcome.model, &[0.3], ExtrapolationPolicy::default())
            .unwrap();

        assert!((values[(0, 0)] - 11.946815183056724).abs() < 1e-9);
        assert!((values[(0, 1)] - 6.417278208932581).abs() < 1e-9);
        assert!((outcome.fp - 0.2).abs() < 0.2 * 1e-3);
    }

    #[test]
    fn zero_smoothing_interpolates() {
        let points = CurveTestFunctions::closed_loop();
        let outcome = loop_fit(0.0);

        assert_eq!(outcome.status, FitStatus::Interpolating);
        assert_eq!(outcome.model.num_knots(), points.nrows() + 4);

        let values =
            evaluate::evaluate(&outcome.model, &outcome.parameters, ExtrapolationPolicy::Reject)
                .unwrap();
        for i in 0..points.nrows() {
            for j in 0..2 {
                assert!((values[(i, j)] - points[(i, j)]).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn even_degree_interpolation_uses_midpoint_knots() {
        let points = CurveTestFunctions::lissajous(15);
        let settings = SplineSettings::builder()
            .degree(2)
            .smoothing_factor(0.0)
            .parameterization(Parameterization::Uniform)
            .build();
        let input = FitInput::new(points.clone(), None, None, &settings).unwrap();
        let outcome = fit(input, &FitParams::default(), None).unwrap();

        let knots = outcome.model.knots();
        assert_eq!(knots.len(), 15 + 3);
        let u = &outcome.parameters;
        assert!((knots[3] - 0.5 * (u[1] + u[2])).abs() < 1e-15);

        let values =
            evaluate::evaluate(&outcome.model, u, ExtrapolationPolicy::Reject).unwrap();
        for i in 0..points.nrows() {
            for j in 0..2 {
                assert!((values[(i, j)] - points[(i, j)]).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn piecewise_constant_smoothing_reaches_target() {
        let m = CurveTestFunctions::closed_loop().nrows();

        for s in [1.0e-6, 0.01] {
            let settings = SplineSettings::builder().degree(0).smoothing_factor(s).build();
            let input =
                FitInput::new(CurveTestFunctions::closed_loop(), None, None, &settings).unwrap();
            let outcome = fit(input, &FitParams::default(), None).unwrap();

            assert!(outcome.model.num_knots() <= m + 1);
            assert!(outcome.fp <= s * (1.0 + 1.0e-3));
            assert!(matches!(
                outcome.status,
                FitStatus::Converged | FitStatus::BelowTarget | FitStatus::Interpolating
            ));
        }
    }

    #[test]
    fn smoothing_is_monotonic_in_s() {
        let factors = [0.0, 0.2, 1.0, 1.0e4];
        let outcomes: Vec<FitOutcome> = factors.iter().map(|&s| loop_fit(s)).collect();

        for pair in outcomes.windows(2) {
            assert!(pair[1].model.num_knots() <= pair[0].model.num_knots());
            assert!(pair[1].fp >= pair[0].fp);
        }

        let loosest = outcomes.last().unwrap();
        assert_eq!(loosest.status, FitStatus::Polynomial);
        assert_eq!(loosest.model.num_knots(), 8);
    }

    #[test]
    fn fits_are_bitwise_deterministic() {
        let a = loop_fit(0.2);
        let b = loop_fit(0.2);

        assert_eq!(a.model.knots().len(), b.model.knots().len());
        for (x, y) in a.model.knots().iter().zip(b.model.knots()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
        let (ca, cb) = (a.model.coefficients(), b.model.coefficients());
        for i in 0..ca.nrows() {
            for j in 0..ca.ncols() {
                assert_eq!(ca[(i, j)].to_bits(), cb[(i, j)].to_bits());
            }
        }
        assert_eq!(a.fp.to_bits(), b.fp.to_bits());
    }

    #[test]
    fn knots_stay_simple_and_on_data() {
        let outcome = loop_fit(0.05);
        let model = &outcome.model;
        let k = model.degree();
        let knots = model.knots();
        let interior = &knots[k + 1..knots.len() - k - 1];

        for w in interior.windows(2) {
            assert!(w[0] < w[1]);
        }
        for t in interior {
            assert!(outcome.parameters.iter().any(|u| u == t));
        }
    }

    #[test]
    fn validation_errors() {
        let settings = SplineSettings::default();

        let few = Mat::from_fn(3, 2, |i, j| (i + j) as f64);
        assert!(matches!(
            FitInput::new(few, None, None, &settings),
            Err(FitError::InsufficientPoints { num_points: 3, degree: 3 })
        ));

        let points = CurveTestFunctions::closed_loop();
        let mut weights = vec![1.0; points.nrows()];
        weights[5] = 0.0;
        assert!(matches!(
            FitInput::new(points.clone(), Some(weights), None, &settings),
            Err(FitError::InvalidWeights { index: 5, .. })
        ));

        let negative = vec![-1.0; points.nrows()];
        assert!(matches!(
            FitInput::new(points.clone(), Some(negative), None, &settings),
            Err(FitError::InvalidWeights { index: 0, .. })
        ));

        let high = SplineSettings::builder().degree(6).build();
        assert!(matches!(
            FitInput::new(points.clone(), None, None, &high),
            Err(FitError::InvalidDegree { degree: 6 })
        ));

        let negative_s = SplineSettings::builder().smoothing_factor(-1.0).build();
        assert!(matches!(
            FitInput::new(points.clone(), None, None, &negative_s),
            Err(FitError::InvalidSmoothingFactor { .. })
        ));

        let wide = Mat::<f64>::zeros(10, 11);
        assert!(matches!(
            FitInput::new(wide, None, None, &settings),
            Err(FitError::InvalidDimension { dim: 11 })
        ));

        let backwards: Vec<f64> = (0..points.nrows()).rev().map(|i| i as f64).collect();
        assert!(matches!(
            FitInput::new(points, None, Some(backwards), &settings),
            Err(FitError::InvalidParameterization { .. })
        ));
    }

    #[test]
    fn validated_input_is_read_only() {
        let points = CurveTestFunctions::closed_loop();
        let m = points.nrows();
        let settings = SplineSettings::builder().degree(2).smoothing_factor(0.5).build();
        let input = FitInput::new(points, None, None, &settings).unwrap();

        assert_eq!(input.points().nrows(), m);
        assert_eq!(input.weights(), vec![1.0; m].as_slice());
        assert_eq!(input.parameters().len(), m);
        assert_eq!(input.parameters()[0], 0.0);
        assert_eq!(input.parameters()[m - 1], 1.0);
        assert_eq!(input.degree(), 2);
        assert_eq!(input.smoothing_factor(), 0.5);
    }

    #[test]
    fn knot_cap_reports_convergence_failure() {
        let settings = SplineSettings::builder().smoothing_factor(1e-6).build();
        let input = FitInput::new(CurveTestFunctions::closed_loop(), None, None, &settings).unwrap();
        let params = FitParams::builder().max_knots(10).build();

        match fit(input, &params, None) {
            Err(FitError::ConvergenceFailure {
                num_knots, reason, fp, ..
            }) => {
                assert_eq!(num_knots, 10);
                assert_eq!(reason, ConvergenceReason::KnotLimit);
                assert!(fp > 1e-6);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn tuning_parameters_are_validated() {
        let settings = SplineSettings::default();
        for params in [
            FitParams::builder().tolerance(0.0).build(),
            FitParams::builder().max_iterations(0).build(),
        ] {
            let input =
                FitInput::new(CurveTestFunctions::closed_loop(), None, None, &settings).unwrap();
            assert!(matches!(
                fit(input, &params, None),
                Err(FitError::InvalidParams { .. })
            ));
        }
    }

    #[test]
    fn knot_cap_below_minimum_is_rejected() {
        let settings = SplineSettings::default();
        let input = FitInput::new(CurveTestFunctions::closed_loop(), None, None, &settings).unwrap();
        let params = FitParams::builder().max_knots(5).build();
        assert!(matches!(
            fit(input, &params, None),
            Err(FitError::InvalidKnotCap { max_knots: 5, min_knots: 8 })
        ));
    }

    #[test]
    fn progress_reports_each_round() {
        let rounds = Arc::new(Mutex::new(Vec::new()));
        let rounds_clone = Arc::clone(&rounds);
        let (sink, handle) = closure_sink(1024, move |msg| {
            if let ProgressMsg::KnotsInserted { num_knots, .. } = msg {
                rounds_clone.lock().unwrap().push(num_knots);
            }
        });

        let settings = SplineSettings::builder().smoothing_factor(0.2).build();
        let input = FitInput::new(CurveTestFunctions::closed_loop(), None, None, &settings).unwrap();
        fit(input, &FitParams::default(), Some(&sink)).unwrap();
        drop(sink);
        handle.join().unwrap();

        let rounds = rounds.lock().unwrap();
        assert_eq!(rounds[0], 8);
        for w in rounds.windows(2) {
            assert!(w[1] > w[0]);
        }
    }

    #[test]
    fn rational_step_interpolates_a_linear_function() {
        // f(p) = 1 - p has its root at p = 1.
        let (mut p1, mut f1) = (0.0, 1.0);
        let (mut p3, mut f3) = (3.0, -2.0);
        let p = rational_step(&mut p1, &mut f1, 0.5, 0.5, &mut p3, &mut f3);
        assert!((p - 1.0).abs() < 1e-12);
        assert_eq!((p1, f1), (0.5, 0.5));
    }
}
