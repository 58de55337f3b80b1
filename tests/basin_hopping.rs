use mirrorcal::basin::{minimize_local, LocalConfig};
use mirrorcal::{BasinHopping, BasinHoppingConfig, GaussianSurface, Objective};

/// Two Gaussian wells; the deeper one sits at (0.75, 0.25).
struct TwoWells;

impl Objective for TwoWells {
    fn dim(&self) -> usize {
        2
    }

    fn eval(&self, x: &[f64]) -> f64 {
        let shallow = GaussianSurface {
            mu_x: 0.25,
            mu_y: 0.75,
            sigma_x: 0.1,
            sigma_y: 0.1,
            amplitude: 0.5,
        };
        let deep = GaussianSurface {
            mu_x: 0.75,
            mu_y: 0.25,
            sigma_x: 0.1,
            sigma_y: 0.1,
            amplitude: 1.0,
        };
        shallow.eval(x) + deep.eval(x)
    }
}

#[test]
fn broad_well_is_located() {
    let surface = GaussianSurface {
        sigma_x: 0.2,
        sigma_y: 0.2,
        ..GaussianSurface::default()
    };
    let hopper = BasinHopping::new(BasinHoppingConfig {
        iterations: 30,
        seed: Some(5),
        ..BasinHoppingConfig::default()
    });
    let result = hopper.minimize(&surface, &[0.2, 0.8]).unwrap();
    assert!((result.x[0] - 0.4).abs() < 1e-4, "x {:?}", result.x);
    assert!((result.x[1] - 0.6).abs() < 1e-4, "x {:?}", result.x);
    assert_eq!(result.hops, 30);
}

#[test]
fn escapes_the_shallow_well() {
    let hopper = BasinHopping::new(BasinHoppingConfig {
        iterations: 100,
        seed: Some(13),
        ..BasinHoppingConfig::default()
    });
    let result = hopper.minimize(&TwoWells, &[0.25, 0.75]).unwrap();
    assert!((result.x[0] - 0.75).abs() < 1e-2, "x {:?}", result.x);
    assert!((result.x[1] - 0.25).abs() < 1e-2, "x {:?}", result.x);
    assert!(result.value < -0.9);
}

#[test]
fn results_stay_inside_bounds() {
    let surface = GaussianSurface {
        mu_x: 1.3,
        mu_y: 0.5,
        sigma_x: 0.3,
        sigma_y: 0.3,
        amplitude: 1.0,
    };
    let hopper = BasinHopping::new(BasinHoppingConfig {
        iterations: 20,
        seed: Some(2),
        ..BasinHoppingConfig::default()
    });
    let result = hopper.minimize(&surface, &[0.5, 0.5]).unwrap();
    assert!(result.x.iter().all(|&v| (0.0..=1.0).contains(&v)));
}

#[test]
fn zero_temperature_accepts_only_improvements() {
    let hopper = BasinHopping::new(BasinHoppingConfig {
        iterations: 25,
        temperature: 0.0,
        seed: Some(8),
        ..BasinHoppingConfig::default()
    });
    let result = hopper
        .minimize(&GaussianSurface::default(), &[0.4, 0.6])
        .unwrap();
    assert!(result.accepted < result.hops);
    assert!((result.value + 1.0).abs() < 1e-9);
}

#[test]
fn local_solver_handles_unbounded_problem() {
    let surface = GaussianSurface {
        sigma_x: 0.2,
        sigma_y: 0.2,
        ..GaussianSurface::default()
    };
    let min = minimize_local(&surface, &[0.3, 0.7], None, &LocalConfig::default()).unwrap();
    assert!((min.x[0] - 0.4).abs() < 1e-5);
    assert!((min.x[1] - 0.6).abs() < 1e-5);
}
