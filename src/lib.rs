//! MirrorCal locates the optimal position of a scanning mirror from noisy
//! simulated measurements.
//!
//! The 1D path bins Gaussian samples into a response histogram and finds its
//! peak with an adaptive-window quadratic search. The 2D path minimizes a
//! Gaussian response surface with basin-hopping. Trials can run in parallel
//! via the `rayon` feature; `image-io` adds PNG histogram output.

pub mod basin;
pub mod calibrate;
pub mod curve;
#[cfg(feature = "image-io")]
pub mod io;
pub mod refine;
pub mod search;
pub mod simulate;
pub mod surface;
mod trace;
pub mod util;

pub use basin::{BasinHopping, BasinHoppingConfig, BasinHoppingResult};
pub use calibrate::{
    calibrate_curve, run_calibration, run_calibration_with_rng, run_surface_calibration,
    run_trials, CalibrationConfig, CalibrationReport, SurfaceCalibrationConfig, SurfaceReport,
    TrialSummary,
};
pub use curve::{Domain, ResponseCurve};
pub use refine::QuadraticFit;
pub use search::{
    search_peak, EstimateRule, IterationRecord, PeakEstimate, PeakSearch, SearchConfig,
    SearchOutcome, SearchWindow, Termination,
};
pub use simulate::{simulate_response_curve, ResponseSimulator, SimulatorConfig};
pub use surface::{GaussianSurface, Objective};
pub use util::{MirrorCalError, MirrorCalResult};
