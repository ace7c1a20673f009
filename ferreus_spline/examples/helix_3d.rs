/////////////////////////////////////////////////////////////////////////////////////////////
//
// Example 3D smoothing of a noisy helix with progress reporting and tangent evaluation.
//
// Created on: 15 Nov 2025     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

use ferreus_spline::{
    BSplineCurve, CurveTestFunctions, ExtrapolationPolicy, linspace,
    config::FitParams,
    progress::{ProgressMsg, ProgressSink, closure_sink},
    spline_config::SplineSettings,
};
use std::sync::Arc;

/// Generates a callback closure_sink
fn get_callback_sink() -> Arc<dyn ProgressSink> {
    let (sink, _listener) = closure_sink(256, |msg| match msg {
        ProgressMsg::KnotsInserted {
            iteration,
            num_knots,
            residual,
        } => {
            println!(
                "Round: {:>3}    Knots: {:>4}    {:>.5E}",
                iteration, num_knots, residual
            );
        }
        ProgressMsg::SmoothingIteration {
            iter,
            smoothing_parameter,
            residual,
            progress,
        } => {
            println!(
                "Iteration: {:>3}    p = {:>.5E}    {:>.5E}    {:>.1}%",
                iter,
                smoothing_parameter,
                residual,
                progress * 100.0
            );
        }
        ProgressMsg::Message { message } => {
            println!("{}", message);
        }
    });

    sink
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let num_points = 400;
    let noise = 0.01;

    // Three turns of a unit helix with uniform noise on every coordinate
    let helix = CurveTestFunctions::helix(num_points, 3.0);
    let points = CurveTestFunctions::add_noise(&helix, noise, 42);

    // Weighting every point by 1 / sigma puts a good smoothing factor near m
    let sigma = noise / 3.0f64.sqrt();
    let weights = vec![1.0 / sigma; num_points];

    let settings = SplineSettings::builder()
        .smoothing_factor(num_points as f64)
        .build();

    let params = FitParams::builder().max_iterations(40).build();

    let curve = BSplineCurve::builder(points, settings)
        .weights(weights)
        .params(params)
        .progress_callback(get_callback_sink())
        .build()?;

    // Unit tangents along the fitted curve
    let (a, b) = curve.model().domain();
    let query = linspace(a, b, 9);
    let positions = curve.evaluate(&query, ExtrapolationPolicy::Reject)?;
    let tangents = curve.differentiate(&query, 1, ExtrapolationPolicy::Reject)?;

    for (i, u) in query.iter().enumerate() {
        let norm = (0..3)
            .map(|j| tangents[(i, j)] * tangents[(i, j)])
            .sum::<f64>()
            .sqrt();
        println!(
            "u = {:.3}    ({:>7.4}, {:>7.4}, {:>7.4})    t = ({:>7.4}, {:>7.4}, {:>7.4})",
            u,
            positions[(i, 0)],
            positions[(i, 1)],
            positions[(i, 2)],
            tangents[(i, 0)] / norm,
            tangents[(i, 1)] / norm,
            tangents[(i, 2)] / norm,
        );
    }

    Ok(())
}
