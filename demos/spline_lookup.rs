//! Spline lookup strategies.
//!
//! Fits ln(x) on a logarithmically spaced table and compares the three
//! bracketing strategies on the same queries.
//!
//! Run with:
//!   cargo run --example spline_lookup

use spline_ode::{Boundary, Lookup, Spline, SplineError};
use std::time::Instant;

fn main() -> Result<(), SplineError> {
    let n = 200;
    let x: Vec<f64> = (0..n)
        .map(|i| 10f64.powf(-2.0 + 6.0 * i as f64 / (n - 1) as f64))
        .collect();
    let y: Vec<f64> = x.iter().map(|v| v.ln()).collect();

    // d/dx ln x = 1/x at both ends
    let start = Boundary::Clamped(1.0 / x[0]);
    let end = Boundary::Clamped(1.0 / x[n - 1]);

    let log = Spline::new(&x, &y, start, end, Lookup::UniformLogarithmic, "ln (log lookup)")?;
    let arbitrary = Spline::new(&x, &y, start, end, Lookup::Arbitrary, "ln (binary search)")?;

    println!("ln(x) on {} knots over [{:e}, {:e}]", n, x[0], x[n - 1]);
    for q in [0.015, 0.5, 3.0, 42.0, 9000.0] {
        println!(
            "  x = {q:>8}  spline = {:>12.8}  exact = {:>12.8}  bracket = {:?}",
            log.value_at(q)?,
            q.ln(),
            log.bracket(q)
        );
    }

    let queries: Vec<f64> = (0..1_000_000)
        .map(|i| 10f64.powf(-2.0 + 6.0 * i as f64 / 999_999.0))
        .collect();
    for spline in [&log, &arbitrary] {
        let t0 = Instant::now();
        let sum: f64 = spline.values_at(&queries)?.iter().sum();
        println!(
            "  {:<20} {:>8.2?} for {} queries (checksum {sum:.6})",
            spline.label(),
            t0.elapsed(),
            queries.len()
        );
    }

    // Outside the table the boundary cubic is extended
    let q = 2e4;
    println!(
        "  extrapolated at {q:e}: {:.6} (inside domain: {})",
        log.value_at(q)?,
        log.contains(q)
    );

    // A table with a repeated abscissa is rejected up front
    match Spline::natural(&[0.0, 1.0, 1.0], &[0.0, 1.0, 2.0], Lookup::Arbitrary, "bad") {
        Ok(_) => println!("  repeated abscissa accepted?"),
        Err(e) => println!("  {e}"),
    }
    Ok(())
}
