use criterion::{criterion_group, criterion_main, Criterion};
use mirrorcal::simulate::normal_pdf;
use mirrorcal::{
    run_surface_calibration, simulate_response_curve, BasinHoppingConfig, Domain, PeakSearch,
    QuadraticFit, ResponseCurve, SearchConfig, SurfaceCalibrationConfig,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::hint::black_box;

fn bench_simulate(c: &mut Criterion) {
    c.bench_function("simulate_1000x100", |b| {
        let mut rng = StdRng::seed_from_u64(1);
        b.iter(|| black_box(simulate_response_curve(0.8, 0.05, 100, 1000, &mut rng).unwrap()));
    });
}

fn bench_search(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(2);
    let noisy = simulate_response_curve(0.8, 0.05, 1000, 1000, &mut rng).unwrap();
    let clean =
        ResponseCurve::from_density(|x| normal_pdf(x, 0.8, 0.05), 1000, Domain::UNIT).unwrap();
    let search = PeakSearch::new(SearchConfig::default()).unwrap();

    c.bench_function("search_noisy_1000_iterations", |b| {
        b.iter(|| black_box(search.search(&noisy).unwrap()));
    });
    c.bench_function("search_clean_1000_iterations", |b| {
        b.iter(|| black_box(search.search(&clean).unwrap()));
    });

    let converging = PeakSearch::new(SearchConfig {
        convergence_tol: Some(1e-9),
        ..SearchConfig::default()
    })
    .unwrap();
    c.bench_function("search_clean_converged", |b| {
        b.iter(|| black_box(converging.search(&clean).unwrap()));
    });
}

fn bench_fit(c: &mut Criterion) {
    let xs: Vec<f64> = (0..10).map(|i| 0.72 + 0.016 * i as f64).collect();
    let ys: Vec<f64> = xs.iter().map(|&x| normal_pdf(x, 0.8, 0.05)).collect();
    c.bench_function("quadratic_fit_10", |b| {
        b.iter(|| black_box(QuadraticFit::fit(&xs, &ys).unwrap().peak().unwrap()));
    });
}

fn bench_surface(c: &mut Criterion) {
    let cfg = SurfaceCalibrationConfig {
        hopping: BasinHoppingConfig {
            iterations: 20,
            seed: Some(3),
            ..BasinHoppingConfig::default()
        },
        ..SurfaceCalibrationConfig::default()
    };
    c.bench_function("basin_hopping_20_hops", |b| {
        b.iter(|| black_box(run_surface_calibration(&cfg).unwrap()));
    });
}

criterion_group!(benches, bench_simulate, bench_search, bench_fit, bench_surface);
criterion_main!(benches);
