//! Basin-hopping global minimization.
//!
//! Each hop displaces the current point by a uniform random step, runs a
//! bounded L-BFGS solve from there, and accepts the new local minimum with
//! the Metropolis rule `exp(-(f_new - f_old) / T)`. The step size adapts
//! every `adapt_interval` hops to steer the acceptance rate towards
//! `target_accept_rate`. The best minimum seen is tracked separately from
//! the current walker.

pub mod local;

use crate::surface::Objective;
use crate::trace::{trace_debug, trace_event, trace_span, trace_warn};
use crate::util::{MirrorCalError, MirrorCalResult};
pub use local::{minimize_local, LocalConfig, LocalMinimum};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Basin-hopping parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct BasinHoppingConfig {
    /// Number of hops after the initial local solve.
    pub iterations: usize,
    /// Initial half-width of the uniform displacement.
    pub step_size: f64,
    /// Metropolis temperature; zero accepts only improvements.
    pub temperature: f64,
    /// Hops between step-size updates; zero disables adaptation.
    pub adapt_interval: usize,
    /// Acceptance rate the step-size update aims for.
    pub target_accept_rate: f64,
    /// Multiplicative step-size update factor in `(0, 1)`.
    pub step_factor: f64,
    /// Optional box constraints, one `(lo, hi)` pair per parameter.
    pub bounds: Option<Vec<(f64, f64)>>,
    /// Inner solver settings.
    pub local: LocalConfig,
    /// Seed for reproducible runs; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for BasinHoppingConfig {
    fn default() -> Self {
        Self {
            iterations: 100,
            step_size: 0.5,
            temperature: 1.0,
            adapt_interval: 50,
            target_accept_rate: 0.5,
            step_factor: 0.9,
            bounds: Some(vec![(0.0, 1.0), (0.0, 1.0)]),
            local: LocalConfig::default(),
            seed: None,
        }
    }
}

impl BasinHoppingConfig {
    /// Checks the configuration against a problem of dimension `dim`.
    pub fn validate(&self, dim: usize) -> MirrorCalResult<()> {
        if !self.step_size.is_finite() || self.step_size <= 0.0 {
            return Err(MirrorCalError::InvalidArgument(
                "step_size must be finite and positive",
            ));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(MirrorCalError::InvalidArgument(
                "temperature must be finite and non-negative",
            ));
        }
        if !(self.target_accept_rate > 0.0 && self.target_accept_rate < 1.0) {
            return Err(MirrorCalError::InvalidArgument(
                "target_accept_rate must lie in (0, 1)",
            ));
        }
        if !(self.step_factor > 0.0 && self.step_factor < 1.0) {
            return Err(MirrorCalError::InvalidArgument(
                "step_factor must lie in (0, 1)",
            ));
        }
        if self.local.max_iters == 0 || self.local.history == 0 {
            return Err(MirrorCalError::InvalidArgument(
                "local solver needs positive max_iters and history",
            ));
        }
        if let Some(bounds) = &self.bounds {
            if bounds.len() != dim {
                return Err(MirrorCalError::InvalidArgument(
                    "bounds must have one entry per parameter",
                ));
            }
            if bounds
                .iter()
                .any(|&(lo, hi)| !lo.is_finite() || !hi.is_finite() || hi <= lo)
            {
                return Err(MirrorCalError::InvalidArgument(
                    "each bound must be finite with lo < hi",
                ));
            }
        }
        Ok(())
    }
}

/// Outcome of a basin-hopping run.
#[derive(Clone, Debug, PartialEq)]
pub struct BasinHoppingResult {
    /// Best parameters found.
    pub x: Vec<f64>,
    /// Objective value at `x`.
    pub value: f64,
    /// Hops performed.
    pub hops: usize,
    /// Hops whose local minimum was accepted.
    pub accepted: usize,
    /// Local solves that failed; their hops were rejected.
    pub local_failures: usize,
    /// Step size after the last adaptation.
    pub step_size: f64,
}

/// Stochastic global minimizer.
#[derive(Clone, Debug)]
pub struct BasinHopping {
    cfg: BasinHoppingConfig,
}

impl BasinHopping {
    /// Creates a minimizer with `cfg`; validation happens per problem.
    pub fn new(cfg: BasinHoppingConfig) -> Self {
        Self { cfg }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &BasinHoppingConfig {
        &self.cfg
    }

    /// Minimizes `objective` from `x0`, seeding from the config.
    pub fn minimize<O: Objective + ?Sized>(
        &self,
        objective: &O,
        x0: &[f64],
    ) -> MirrorCalResult<BasinHoppingResult> {
        let mut rng = match self.cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        self.minimize_with_rng(objective, x0, &mut rng)
    }

    /// Minimizes `objective` from `x0` drawing randomness from `rng`.
    pub fn minimize_with_rng<O: Objective + ?Sized, R: Rng + ?Sized>(
        &self,
        objective: &O,
        x0: &[f64],
        rng: &mut R,
    ) -> MirrorCalResult<BasinHoppingResult> {
        let cfg = &self.cfg;
        let dim = objective.dim();
        if x0.len() != dim {
            return Err(MirrorCalError::InvalidArgument(
                "initial guess has the wrong dimension",
            ));
        }
        if x0.iter().any(|v| !v.is_finite()) {
            return Err(MirrorCalError::InvalidArgument(
                "initial guess must be finite",
            ));
        }
        cfg.validate(dim)?;

        let _span = trace_span!("basin_hopping", hops = cfg.iterations, dim = dim).entered();

        let bounds = cfg.bounds.as_deref();
        let mut local_failures = 0usize;
        let mut current = match self.local_solve(objective, x0, &mut local_failures) {
            Some(min) => min,
            None => {
                let x = local::clamp_to_bounds(x0, bounds);
                let value = objective.eval(&x);
                if !value.is_finite() {
                    return Err(MirrorCalError::Optimizer(
                        "objective is not finite at the initial guess".to_string(),
                    ));
                }
                LocalMinimum {
                    x,
                    value,
                    iterations: 0,
                }
            }
        };
        let mut best = current.clone();
        let mut step = cfg.step_size;
        let mut accepted = 0usize;

        for hop in 0..cfg.iterations {
            let trial_start: Vec<f64> = current
                .x
                .iter()
                .map(|&v| v + rng.random_range(-step..=step))
                .collect();
            let trial_start = local::clamp_to_bounds(&trial_start, bounds);
            if let Some(trial) = self.local_solve(objective, &trial_start, &mut local_failures) {
                let accept = metropolis(current.value, trial.value, cfg.temperature, rng);
                trace_debug!(
                    "basin_hop",
                    hop = hop,
                    trial_value = trial.value,
                    current_value = current.value,
                    accepted = accept
                );
                if trial.value < best.value {
                    best = trial.clone();
                }
                if accept {
                    current = trial;
                    accepted += 1;
                }
            }

            if cfg.adapt_interval > 0 && (hop + 1) % cfg.adapt_interval == 0 {
                let rate = accepted as f64 / (hop + 1) as f64;
                if rate > cfg.target_accept_rate {
                    step /= cfg.step_factor;
                } else {
                    step *= cfg.step_factor;
                }
                trace_debug!("basin_step_adapted", step = step, accept_rate = rate);
            }
        }

        trace_event!(
            "basin_hopping_done",
            value = best.value,
            accepted = accepted,
            local_failures = local_failures
        );
        Ok(BasinHoppingResult {
            x: best.x,
            value: best.value,
            hops: cfg.iterations,
            accepted,
            local_failures,
            step_size: step,
        })
    }

    /// Runs one bounded local solve; failures are counted and logged.
    fn local_solve<O: Objective + ?Sized>(
        &self,
        objective: &O,
        start: &[f64],
        failures: &mut usize,
    ) -> Option<LocalMinimum> {
        match minimize_local(objective, start, self.cfg.bounds.as_deref(), &self.cfg.local) {
            Ok(min) => Some(min),
            Err(err) => {
                *failures += 1;
                let reason = err.to_string();
                trace_warn!(
                    "local_solve_failed",
                    failures = *failures,
                    reason = reason.as_str()
                );
                None
            }
        }
    }
}

/// Metropolis acceptance test for a move from `old` to `new`.
fn metropolis<R: Rng + ?Sized>(old: f64, new: f64, temperature: f64, rng: &mut R) -> bool {
    if new < old {
        return true;
    }
    if temperature == 0.0 {
        return false;
    }
    let weight = (-(new - old) / temperature).exp();
    weight >= rng.random::<f64>()
}
