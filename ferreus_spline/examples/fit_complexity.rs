// Simple complexity test - fit time should grow roughly linearly with the number of points
// Run with: cargo run --example fit_complexity --release

use ferreus_spline::{BSplineCurve, CurveTestFunctions, spline_config::SplineSettings};
use std::time::Instant;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Simple Complexity Test ===\n");

    let test_sizes = vec![1000, 2000, 4000, 8000, 16000];
    let noise = 0.01;

    println!(
        "{:<10} {:<8} {:<12} {:<15}",
        "N", "Knots", "Time(s)", "Time/N (us)"
    );
    println!("{}", "-".repeat(45));

    for n in test_sizes {
        let points = CurveTestFunctions::add_noise(&CurveTestFunctions::helix(n, 5.0), noise, 42);

        // Expected residual of the noise alone
        let s = n as f64 * 3.0 * noise * noise / 3.0;
        let settings = SplineSettings::builder().smoothing_factor(s).build();

        let start = Instant::now();
        let curve = BSplineCurve::builder(points, settings).build()?;
        let elapsed = start.elapsed().as_secs_f64();

        println!(
            "{:<10} {:<8} {:<12.3} {:<15.3}",
            n,
            curve.num_knots(),
            elapsed,
            elapsed / n as f64 * 1e6
        );
    }

    println!("\nIf the rightmost column stays roughly constant, complexity is O(N)");

    Ok(())
}
