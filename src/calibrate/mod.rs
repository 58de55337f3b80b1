//! End-to-end calibration runs.
//!
//! A run simulates a noisy response curve, searches it for the peak and
//! reports the estimate against the known truth. [`calibrate_curve`] skips
//! the simulation for curves that come from real measurements.

pub mod trials;

use crate::basin::{BasinHopping, BasinHoppingConfig};
use crate::curve::{Domain, ResponseCurve};
use crate::search::{PeakEstimate, PeakSearch, SearchConfig, SearchOutcome};
use crate::simulate::{ResponseSimulator, SimulatorConfig};
use crate::surface::GaussianSurface;
use crate::trace::{trace_event, trace_span};
use crate::util::{MirrorCalError, MirrorCalResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
pub use trials::{run_trials, TrialSummary, DEFAULT_TRIAL_TOLERANCE};

/// Parameters of a simulated 1D calibration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CalibrationConfig {
    /// True peak position.
    pub mu: f64,
    /// Spread of the simulated response.
    pub sigma: f64,
    /// Simulated samples per histogram bin.
    pub samples_per_bin: usize,
    /// Histogram bins over `[0, 1]`.
    pub num_bins: usize,
    /// Peak search settings.
    pub search: SearchConfig,
    /// Seed for reproducible runs; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            mu: 0.8,
            sigma: 0.05,
            samples_per_bin: 1000,
            num_bins: 1000,
            search: SearchConfig::default(),
            seed: None,
        }
    }
}

impl CalibrationConfig {
    /// Simulator settings implied by this configuration.
    pub fn simulator(&self) -> SimulatorConfig {
        SimulatorConfig {
            mu: self.mu,
            sigma: self.sigma,
            samples_per_bin: self.samples_per_bin,
            num_bins: self.num_bins,
            domain: Domain::UNIT,
        }
    }
}

/// Outcome of one calibration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CalibrationReport {
    /// Estimated peak position.
    pub estimate: PeakEstimate,
    /// Reference position.
    pub truth: f64,
    /// `100 * (1 - estimate / truth)`.
    pub relative_error_percent: f64,
    /// Search details.
    pub outcome: SearchOutcome,
}

impl CalibrationReport {
    fn new(outcome: SearchOutcome, truth: f64) -> Self {
        Self {
            estimate: outcome.estimate,
            truth,
            relative_error_percent: relative_error_percent(outcome.estimate, truth),
            outcome,
        }
    }

    /// Absolute distance between estimate and truth.
    pub fn abs_error(&self) -> f64 {
        (self.estimate - self.truth).abs()
    }
}

/// Signed relative error in percent; positive when the estimate is low.
pub fn relative_error_percent(estimate: f64, truth: f64) -> f64 {
    100.0 * (1.0 - estimate / truth)
}

/// Runs a simulated calibration seeded from `cfg.seed`.
pub fn run_calibration(cfg: &CalibrationConfig) -> MirrorCalResult<CalibrationReport> {
    let mut rng = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    run_calibration_with_rng(cfg, &mut rng)
}

/// Runs a simulated calibration drawing samples from `rng`.
pub fn run_calibration_with_rng<R: Rng + ?Sized>(
    cfg: &CalibrationConfig,
    rng: &mut R,
) -> MirrorCalResult<CalibrationReport> {
    let _span = trace_span!("calibration", mu = cfg.mu, sigma = cfg.sigma).entered();
    let search = PeakSearch::new(cfg.search)?;
    let simulator = ResponseSimulator::new(cfg.simulator())?;
    let curve = simulator.simulate(rng)?;
    let outcome = search.search(&curve)?;
    let report = CalibrationReport::new(outcome, cfg.mu);
    trace_event!(
        "calibration_done",
        estimate = report.estimate,
        truth = report.truth,
        relative_error_percent = report.relative_error_percent
    );
    Ok(report)
}

/// Searches a caller-supplied curve and reports against `truth`.
pub fn calibrate_curve(
    curve: &ResponseCurve,
    truth: f64,
    search_cfg: &SearchConfig,
) -> MirrorCalResult<CalibrationReport> {
    if !truth.is_finite() || truth == 0.0 {
        return Err(MirrorCalError::InvalidArgument(
            "truth must be finite and non-zero",
        ));
    }
    let outcome = PeakSearch::new(*search_cfg)?.search(curve)?;
    Ok(CalibrationReport::new(outcome, truth))
}

/// Parameters of a 2D surface calibration.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceCalibrationConfig {
    /// Simulated response surface.
    pub surface: GaussianSurface,
    /// Starting mirror position `(x, y)`.
    pub initial_guess: [f64; 2],
    /// Global minimizer settings.
    pub hopping: BasinHoppingConfig,
}

impl Default for SurfaceCalibrationConfig {
    fn default() -> Self {
        Self {
            surface: GaussianSurface::default(),
            initial_guess: [0.2, 0.8],
            hopping: BasinHoppingConfig::default(),
        }
    }
}

/// Outcome of a 2D surface calibration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceReport {
    /// Estimated optimum `(x, y)`.
    pub estimate: [f64; 2],
    /// True optimum `(x, y)`.
    pub truth: [f64; 2],
    /// Per-axis absolute error.
    pub abs_error: [f64; 2],
    /// Objective value at the estimate.
    pub value: f64,
    /// Accepted hops.
    pub accepted: usize,
    /// Local solves that failed.
    pub local_failures: usize,
}

/// Locates the optimum of the simulated 2D surface with basin-hopping.
pub fn run_surface_calibration(cfg: &SurfaceCalibrationConfig) -> MirrorCalResult<SurfaceReport> {
    cfg.surface.validate()?;
    let _span = trace_span!(
        "surface_calibration",
        mu_x = cfg.surface.mu_x,
        mu_y = cfg.surface.mu_y
    )
    .entered();
    let result = BasinHopping::new(cfg.hopping.clone()).minimize(&cfg.surface, &cfg.initial_guess)?;
    let estimate = [result.x[0], result.x[1]];
    let truth = cfg.surface.peak();
    Ok(SurfaceReport {
        estimate,
        truth,
        abs_error: [
            (estimate[0] - truth[0]).abs(),
            (estimate[1] - truth[1]).abs(),
        ],
        value: result.value,
        accepted: result.accepted,
        local_failures: result.local_failures,
    })
}
