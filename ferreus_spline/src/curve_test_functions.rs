/////////////////////////////////////////////////////////////////////////////////////////////
//
// Provides reproducible test curves for validating and demonstrating spline fitting.
//
// Created on: 15 Nov 2025     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

use faer::Mat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

const CLOSED_LOOP: [[f64; 2]; 22] = [
    [1.889, 7.100],
    [4.164, 7.100],
    [5.743, 7.100],
    [8.439, 7.100],
    [9.876, 7.100],
    [11.000, 7.000],
    [12.200, 6.313],
    [12.750, 4.444],
    [12.500, 3.000],
    [11.000, 1.900],
    [9.793, 1.800],
    [6.906, 1.800],
    [4.836, 1.800],
    [3.530, 1.800],
    [1.553, 1.800],
    [0.100, 2.094],
    [-0.900, 3.446],
    [-1.100, 4.115],
    [-1.000, 5.221],
    [-0.250, 6.586],
    [0.800, 7.000],
    [1.889, 7.100],
];

/// Struct that implements various planar and spatial curves for testing spline fitting.
pub struct CurveTestFunctions;

impl CurveTestFunctions {
    /// A hand-digitised closed planar loop of 22 points. The first and last
    /// points coincide.
    pub fn closed_loop() -> Mat<f64> {
        Mat::from_fn(CLOSED_LOOP.len(), 2, |i, j| CLOSED_LOOP[i][j])
    }

    /// Circular helix sampled at `n` equally spaced angles:
    /// <div>
    /// $$
    /// (x, y, z) = (\cos\theta,\ \sin\theta,\ \theta / 2\pi), \quad \theta \in [0, 2\pi\,\mathrm{turns}]
    /// $$
    /// </div>
    pub fn helix(n: usize, turns: f64) -> Mat<f64> {
        let span = 2.0 * PI * turns;
        Mat::from_fn(n, 3, |i, j| {
            let theta = span * i as f64 / (n.max(2) - 1) as f64;
            match j {
                0 => theta.cos(),
                1 => theta.sin(),
                _ => theta / (2.0 * PI),
            }
        })
    }

    /// Lissajous figure `(sin(3t + pi/2), sin(2t))` sampled at `n` points on `t in [0, pi]`.
    pub fn lissajous(n: usize) -> Mat<f64> {
        Mat::from_fn(n, 2, |i, j| {
            let t = PI * i as f64 / (n.max(2) - 1) as f64;
            match j {
                0 => (3.0 * t + 0.5 * PI).sin(),
                _ => (2.0 * t).sin(),
            }
        })
    }

    /// Adds uniform noise in `[-amplitude, amplitude)` to every coordinate.
    pub fn add_noise(points: &Mat<f64>, amplitude: f64, seed: u64) -> Mat<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        Mat::from_fn(points.nrows(), points.ncols(), |i, j| {
            points[(i, j)] + amplitude * rng.random_range(-1.0..1.0)
        })
    }
}
