//! Simulated mirror response curves.
//!
//! The simulator stands in for a physical scan: every bin is a mirror
//! position, and the response is the normalized density of normally
//! distributed samples (laser pulses) that land in that bin. Samples outside
//! the scan domain are discarded, which models a bounded mirror range whose
//! optimum need not sit in the middle.

pub mod histogram;

use crate::curve::{Domain, ResponseCurve};
use crate::trace::{trace_event, trace_span};
use crate::util::{MirrorCalError, MirrorCalResult};
use histogram::Histogram;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Parameters of a simulated scan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulatorConfig {
    /// True peak position (mean of the sampled normal distribution).
    pub mu: f64,
    /// Spread of the response (standard deviation).
    pub sigma: f64,
    /// Samples drawn per bin; total draws are `samples_per_bin * num_bins`.
    pub samples_per_bin: usize,
    /// Number of histogram bins (mirror positions).
    pub num_bins: usize,
    /// Scan range the histogram covers.
    pub domain: Domain,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            mu: 0.8,
            sigma: 0.05,
            samples_per_bin: 1000,
            num_bins: 1000,
            domain: Domain::UNIT,
        }
    }
}

/// Validated response simulator.
#[derive(Clone, Debug)]
pub struct ResponseSimulator {
    cfg: SimulatorConfig,
    normal: Normal<f64>,
    total_samples: usize,
}

impl ResponseSimulator {
    /// Validates `cfg` and prepares the sampling distribution.
    pub fn new(cfg: SimulatorConfig) -> MirrorCalResult<Self> {
        if cfg.num_bins == 0 {
            return Err(MirrorCalError::InvalidArgument("num_bins must be positive"));
        }
        if cfg.samples_per_bin == 0 {
            return Err(MirrorCalError::InvalidArgument(
                "samples_per_bin must be positive",
            ));
        }
        if !cfg.mu.is_finite() {
            return Err(MirrorCalError::InvalidArgument("mu must be finite"));
        }
        if !cfg.sigma.is_finite() || cfg.sigma <= 0.0 {
            return Err(MirrorCalError::InvalidArgument(
                "sigma must be finite and positive",
            ));
        }
        let domain = Domain::new(cfg.domain.min, cfg.domain.max)?;
        let total_samples = cfg
            .samples_per_bin
            .checked_mul(cfg.num_bins)
            .ok_or(MirrorCalError::InvalidArgument(
                "samples_per_bin * num_bins overflows",
            ))?;
        let normal = Normal::new(cfg.mu, cfg.sigma)
            .map_err(|_| MirrorCalError::InvalidArgument("invalid normal distribution"))?;
        Ok(Self {
            cfg: SimulatorConfig { domain, ..cfg },
            normal,
            total_samples,
        })
    }

    /// Returns the validated configuration.
    pub fn config(&self) -> &SimulatorConfig {
        &self.cfg
    }

    /// Total number of samples drawn per simulation.
    pub fn total_samples(&self) -> usize {
        self.total_samples
    }

    /// Draws samples from `rng` and returns the binned density curve.
    pub fn simulate<R: Rng + ?Sized>(&self, rng: &mut R) -> MirrorCalResult<ResponseCurve> {
        let _span = trace_span!(
            "simulate",
            bins = self.cfg.num_bins,
            samples = self.total_samples
        )
        .entered();

        let mut hist = Histogram::new(self.cfg.num_bins, self.cfg.domain)?;
        for _ in 0..self.total_samples {
            hist.insert(self.normal.sample(rng));
        }

        trace_event!(
            "simulated_histogram",
            in_range = hist.in_range(),
            discarded = hist.discarded()
        );
        hist.into_density_curve()
    }
}

/// Simulates a response curve over `[0, 1]`.
///
/// Draws `samples_per_bin * num_bins` samples from `N(mu, sigma)` and bins
/// them into `num_bins` equal-width bins.
pub fn simulate_response_curve<R: Rng + ?Sized>(
    mu: f64,
    sigma: f64,
    samples_per_bin: usize,
    num_bins: usize,
    rng: &mut R,
) -> MirrorCalResult<ResponseCurve> {
    ResponseSimulator::new(SimulatorConfig {
        mu,
        sigma,
        samples_per_bin,
        num_bins,
        domain: Domain::UNIT,
    })?
    .simulate(rng)
}

/// Normal probability density, used for noise-free reference curves.
pub fn normal_pdf(x: f64, mu: f64, sigma: f64) -> f64 {
    let z = (x - mu) / sigma;
    (-0.5 * z * z).exp() / (sigma * (2.0 * std::f64::consts::PI).sqrt())
}

#[cfg(test)]
mod tests {
    use super::{normal_pdf, simulate_response_curve, ResponseSimulator, SimulatorConfig};
    use crate::MirrorCalError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn rejects_zero_bins() {
        let err = ResponseSimulator::new(SimulatorConfig {
            num_bins: 0,
            ..SimulatorConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, MirrorCalError::InvalidArgument(_)));
    }

    #[test]
    fn rejects_non_positive_sigma() {
        let mut rng = StdRng::seed_from_u64(1);
        for sigma in [0.0, -0.1, f64::NAN] {
            let err = simulate_response_curve(0.5, sigma, 10, 10, &mut rng).unwrap_err();
            assert!(matches!(err, MirrorCalError::InvalidArgument(_)));
        }
    }

    #[test]
    fn rejects_overflowing_sample_count() {
        let err = ResponseSimulator::new(SimulatorConfig {
            samples_per_bin: usize::MAX,
            num_bins: 2,
            ..SimulatorConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, MirrorCalError::InvalidArgument(_)));
    }

    #[test]
    fn peak_bin_tracks_mean() {
        let mut rng = StdRng::seed_from_u64(7);
        let curve = simulate_response_curve(0.3, 0.05, 200, 100, &mut rng).unwrap();
        let peak = curve.position(curve.argmax()).unwrap();
        assert!((peak - 0.3).abs() < 0.05, "peak at {peak}");
    }

    #[test]
    fn pdf_peaks_at_mean() {
        let sigma = 0.05;
        let expected = 1.0 / (sigma * (2.0 * std::f64::consts::PI).sqrt());
        assert!((normal_pdf(0.8, 0.8, sigma) - expected).abs() < 1e-9);
        assert!(normal_pdf(0.7, 0.8, sigma) < normal_pdf(0.75, 0.8, sigma));
    }
}
