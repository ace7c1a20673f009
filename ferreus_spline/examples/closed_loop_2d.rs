/////////////////////////////////////////////////////////////////////////////////////////////
//
// Example 2D smoothing of a hand-digitised closed loop over a range of smoothing factors.
//
// Created on: 15 Nov 2025     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

use ferreus_spline::{
    BSplineCurve, CurveTestFunctions, ExtrapolationPolicy, linspace,
    spline_config::SplineSettings,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 22 points around a closed loop, first and last points coincide
    let points = CurveTestFunctions::closed_loop();

    println!("{:<10} {:<8} {:<14} {:<12}", "s", "knots", "fp", "status");
    println!("{}", "-".repeat(46));

    for s in [0.0, 0.05, 0.2, 1.0, 5.0, 100.0] {
        let settings = SplineSettings::builder().smoothing_factor(s).build();
        let curve = BSplineCurve::builder(points.clone(), settings).build()?;

        println!(
            "{:<10} {:<8} {:<14.6E} {:<12?}",
            s,
            curve.num_knots(),
            curve.fp(),
            curve.status()
        );
    }

    // Sample the s = 0.2 curve densely and report its length
    let settings = SplineSettings::builder().smoothing_factor(0.2).build();
    let curve = BSplineCurve::builder(points, settings).build()?;

    let (a, b) = curve.model().domain();
    let samples = curve.evaluate(&linspace(a, b, 501), ExtrapolationPolicy::Reject)?;

    let length: f64 = (1..samples.nrows())
        .map(|i| {
            let dx = samples[(i, 0)] - samples[(i - 1, 0)];
            let dy = samples[(i, 1)] - samples[(i - 1, 1)];
            (dx * dx + dy * dy).sqrt()
        })
        .sum();

    println!("\nLength of the s = 0.2 curve: {:.4}", length);

    curve.save_model("closed_loop_model.json")?;

    Ok(())
}
