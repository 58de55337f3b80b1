//! Repeated independent calibrations.
//!
//! Trial `i` is seeded with `base_seed + i`, so the sequential and the
//! `rayon` paths produce identical reports in the same order.

use super::{run_calibration_with_rng, CalibrationConfig, CalibrationReport};
use crate::trace::{trace_event, trace_span};
use crate::util::{MirrorCalError, MirrorCalResult};
use rand::rngs::StdRng;
use rand::SeedableRng;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Absolute error below which a trial counts as a success.
pub const DEFAULT_TRIAL_TOLERANCE: f64 = 0.01;

/// Reports of a batch of trials.
#[derive(Clone, Debug, PartialEq)]
pub struct TrialSummary {
    /// One report per trial, in seed order.
    pub reports: Vec<CalibrationReport>,
}

impl TrialSummary {
    /// Number of trials.
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    /// Returns true when no trial ran.
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Mean absolute error over all trials.
    pub fn mean_abs_error(&self) -> f64 {
        if self.reports.is_empty() {
            return 0.0;
        }
        self.reports.iter().map(CalibrationReport::abs_error).sum::<f64>()
            / self.reports.len() as f64
    }

    /// Largest absolute error.
    pub fn max_abs_error(&self) -> f64 {
        self.reports
            .iter()
            .map(CalibrationReport::abs_error)
            .fold(0.0, f64::max)
    }

    /// Fraction of trials whose absolute error is at most `tolerance`.
    pub fn fraction_within(&self, tolerance: f64) -> f64 {
        if self.reports.is_empty() {
            return 0.0;
        }
        let hits = self
            .reports
            .iter()
            .filter(|r| r.abs_error() <= tolerance)
            .count();
        hits as f64 / self.reports.len() as f64
    }
}

fn run_trial(cfg: &CalibrationConfig, seed: u64) -> MirrorCalResult<CalibrationReport> {
    let mut rng = StdRng::seed_from_u64(seed);
    run_calibration_with_rng(cfg, &mut rng)
}

/// Runs `trials` seeded calibrations of `cfg`.
///
/// `cfg.seed` is ignored in favor of `base_seed + i`.
pub fn run_trials(
    cfg: &CalibrationConfig,
    trials: usize,
    base_seed: u64,
) -> MirrorCalResult<TrialSummary> {
    if trials == 0 {
        return Err(MirrorCalError::InvalidArgument("trials must be positive"));
    }
    let _span = trace_span!("trials", trials = trials, base_seed = base_seed).entered();

    #[cfg(feature = "rayon")]
    let reports = (0..trials)
        .into_par_iter()
        .map(|i| run_trial(cfg, base_seed.wrapping_add(i as u64)))
        .collect::<MirrorCalResult<Vec<_>>>()?;

    #[cfg(not(feature = "rayon"))]
    let reports = (0..trials)
        .map(|i| run_trial(cfg, base_seed.wrapping_add(i as u64)))
        .collect::<MirrorCalResult<Vec<_>>>()?;

    let summary = TrialSummary { reports };
    trace_event!(
        "trials_done",
        trials = summary.len(),
        mean_abs_error = summary.mean_abs_error(),
        max_abs_error = summary.max_abs_error()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::run_trials;
    use crate::calibrate::CalibrationConfig;
    use crate::MirrorCalError;

    fn small_config() -> CalibrationConfig {
        let mut cfg = CalibrationConfig {
            mu: 0.5,
            samples_per_bin: 200,
            num_bins: 500,
            ..CalibrationConfig::default()
        };
        cfg.search.iterations = 200;
        cfg
    }

    #[test]
    fn rejects_zero_trials() {
        let err = run_trials(&small_config(), 0, 1).unwrap_err();
        assert!(matches!(err, MirrorCalError::InvalidArgument(_)));
    }

    #[test]
    fn trials_are_reproducible() {
        let a = run_trials(&small_config(), 3, 42).unwrap();
        let b = run_trials(&small_config(), 3, 42).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        assert!(a.max_abs_error() >= a.mean_abs_error());
        assert_eq!(a.fraction_within(1.0), 1.0);
    }
}
