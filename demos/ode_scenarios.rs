//! Adaptive integration onto a fixed output grid.
//!
//! Solves dy/dx = -2xy on [0, 1] and the coupled system y1' = y2, y2' = 1,
//! then prints both tables next to the closed-form solutions.
//!
//! The coupled run is verbose; show its per-step log with:
//!   RUST_LOG=info cargo run --example ode_scenarios

use spline_ode::{OdeSolver, OdeSystem, Precision};

/// Constant acceleration: y1' = y2, y2' = 1
///
/// State vector: [position, velocity]
struct ConstantAcceleration;

impl OdeSystem for ConstantAcceleration {
    fn rhs(&self, _x: f64, y: &[f64], dydx: &mut [f64]) {
        dydx[0] = y[1];
        dydx[1] = 1.0;
    }
}

fn main() {
    env_logger::init();

    let gaussian = |x: f64, y: &[f64], dydx: &mut [f64]| dydx[0] = -2.0 * x * y[0];

    let mut solver = OdeSolver::new(20, 1, gaussian);
    solver.set_initial_conditions(0.0, 1.0, &[1.0]);
    solver.set_precision(Precision::new(1e-10, 1e-6, 0.0));
    if let Err(e) = solver.solve() {
        eprintln!("gaussian: {e}");
        return;
    }

    println!("dy/dx = -2xy, y(0) = 1");
    println!("  {:>8}  {:>20}  {:>10}", "x", "y", "error");
    let y = solver.y_values(0).unwrap_or_default();
    for (&x, &v) in solver.x_values().iter().zip(y) {
        let exact = (-x * x).exp();
        println!("  {x:>8.5}  {v:>20.15}  {:>10.2e}", (v - exact).abs());
    }
    println!(
        "  {} accepted, {} rejected, {} evaluations",
        solver.stats.accepted_steps, solver.stats.rejected_steps, solver.stats.fn_evals
    );
    println!();

    let mut solver = OdeSolver::new(10, 2, ConstantAcceleration);
    solver.set_initial_conditions(0.0, 1.0, &[1.0, 1.0]);
    solver.set_precision(Precision::new(1e-20, 1e-12, 0.0));
    solver.set_verbose(true);
    let solution = match solver.solve() {
        Ok(()) => solver.solution(),
        Err(e) => {
            eprintln!("constant acceleration: {e}");
            return;
        }
    };
    let Some(solution) = solution else { return };

    println!("y1' = y2, y2' = 1, y(0) = [1, 1], epsilon = 1e-20");
    for (i, &x) in solution.x.iter().enumerate() {
        let (y1, y2) = (solution.y[0][i], solution.y[1][i]);
        println!(
            "  x = {x:.4}  y1 = {y1:.16}  (err {:.1e})  y2 = {y2:.16}  (err {:.1e})",
            (y1 - (1.0 + x + 0.5 * x * x)).abs(),
            (y2 - (1.0 + x)).abs()
        );
    }
    println!(
        "  {} accepted, {} rejected",
        solver.stats.accepted_steps, solver.stats.rejected_steps
    );

    // Asking for 1e-30 with a step floor fails instead of returning noise
    let mut solver = OdeSolver::new(20, 1, gaussian);
    solver.set_initial_conditions(0.0, 1.0, &[1.0]);
    solver.set_precision(Precision::new(1e-30, 1e-3, 1e-4));
    match solver.solve() {
        Ok(()) => println!("\nunexpected success at epsilon = 1e-30"),
        Err(e) => println!("\nepsilon = 1e-30, h_min = 1e-4: {e}"),
    }
}
