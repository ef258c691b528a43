use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use spline_ode::{Lookup, OdeSolver, OdeSystem, Precision, Spline};

/// y1' = y2, y2' = 1 (2-state)
struct ConstantAcceleration;

impl OdeSystem for ConstantAcceleration {
    fn rhs(&self, _x: f64, y: &[f64], dydx: &mut [f64]) {
        dydx[0] = y[1];
        dydx[1] = 1.0;
    }
}

fn gaussian(x: f64, y: &[f64], dydx: &mut [f64]) {
    dydx[0] = -2.0 * x * y[0];
}

fn bench_spline_lookup(c: &mut Criterion) {
    let n = 1024;
    let linear: Vec<f64> = (0..n).map(|i| 1.0 + i as f64 * 0.01).collect();
    let logarithmic: Vec<f64> = (0..n).map(|i| (i as f64 * 0.01).exp()).collect();
    let queries: Vec<f64> = (0..1000).map(|i| 1.0 + i as f64 * 0.0101).collect();

    let mut group = c.benchmark_group("spline_value_at");
    for (name, x, lookup) in [
        ("uniform_linear", &linear, Lookup::UniformLinear),
        ("uniform_logarithmic", &logarithmic, Lookup::UniformLogarithmic),
        ("arbitrary", &linear, Lookup::Arbitrary),
    ] {
        let y: Vec<f64> = x.iter().map(|v| v.ln()).collect();
        let spline = Spline::natural(x, &y, lookup, name).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(name), &spline, |b, spline| {
            b.iter(|| {
                queries
                    .iter()
                    .map(|&q| spline.value_at(black_box(q)).unwrap())
                    .sum::<f64>()
            })
        });
    }
    group.finish();
}

fn bench_spline_build(c: &mut Criterion) {
    let x: Vec<f64> = (0..1024).map(|i| i as f64 * 0.01).collect();
    let y: Vec<f64> = x.iter().map(|v| v.sin()).collect();

    c.bench_function("spline_build_1024", |b| {
        b.iter(|| {
            Spline::natural(black_box(&x), black_box(&y), Lookup::UniformLinear, "sin").unwrap()
        })
    });
}

fn bench_gaussian_20_points(c: &mut Criterion) {
    c.bench_function("gaussian_20_points", |b| {
        b.iter(|| {
            let mut solver = OdeSolver::new(20, 1, gaussian);
            solver.set_initial_conditions(0.0, 1.0, black_box(&[1.0]));
            solver.solve().unwrap();
            solver.stats.accepted_steps
        })
    });
}

fn bench_constant_acceleration_tight(c: &mut Criterion) {
    c.bench_function("constant_acceleration_eps_1e-20", |b| {
        b.iter(|| {
            let mut solver = OdeSolver::new(10, 2, ConstantAcceleration);
            solver.set_initial_conditions(0.0, 1.0, black_box(&[1.0, 1.0]));
            solver.set_precision(Precision::new(1e-20, 1e-12, 0.0));
            solver.solve().unwrap();
            solver.stats.accepted_steps
        })
    });
}

criterion_group!(
    benches,
    bench_spline_lookup,
    bench_spline_build,
    bench_gaussian_20_points,
    bench_constant_acceleration_tight
);
criterion_main!(benches);
