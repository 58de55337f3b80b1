//! Adaptive quadratic peak search over a response curve.
//!
//! Each iteration samples a handful of points inside the current
//! [`SearchWindow`], estimates the peak, and re-centers the window on that
//! estimate with bounds expressed as a fraction of the estimated position.
//! The first iteration takes the best sampled point (the peak may sit far
//! from the middle of the scan); later iterations take the vertex of a
//! least-squares parabola through the samples.

pub mod window;

use crate::curve::ResponseCurve;
use crate::refine::QuadraticFit;
use crate::trace::{trace_debug, trace_event, trace_span};
use crate::util::math::argmax;
use crate::util::{MirrorCalError, MirrorCalResult};
pub use window::SearchWindow;

/// Estimated peak position, in the curve's position units.
pub type PeakEstimate = f64;

/// Search parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchConfig {
    /// Iteration budget (must be at least one).
    pub iterations: usize,
    /// Points sampled per iteration (at least three).
    pub samples_per_iteration: usize,
    /// Lower window bound as a fraction of the estimated position.
    pub expand_min: f64,
    /// Upper window bound as a fraction of the estimated position.
    pub expand_max: f64,
    /// Stop once consecutive refined estimates differ by at most this much.
    pub convergence_tol: Option<f64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            samples_per_iteration: 10,
            expand_min: 0.90,
            expand_max: 1.10,
            convergence_tol: None,
        }
    }
}

impl SearchConfig {
    /// Checks the configuration, failing fast on unusable values.
    pub fn validate(&self) -> MirrorCalResult<()> {
        if self.iterations == 0 {
            return Err(MirrorCalError::InvalidArgument(
                "iterations must be at least 1",
            ));
        }
        if self.samples_per_iteration < window::MIN_WINDOW_POINTS {
            return Err(MirrorCalError::InvalidArgument(
                "samples_per_iteration must be at least 3",
            ));
        }
        if !self.expand_min.is_finite() || self.expand_min <= 0.0 {
            return Err(MirrorCalError::InvalidArgument(
                "expand_min must be finite and positive",
            ));
        }
        if !self.expand_max.is_finite() || self.expand_max <= self.expand_min {
            return Err(MirrorCalError::InvalidArgument(
                "expand_max must be finite and greater than expand_min",
            ));
        }
        if let Some(tol) = self.convergence_tol {
            if !tol.is_finite() || tol <= 0.0 {
                return Err(MirrorCalError::InvalidArgument(
                    "convergence_tol must be finite and positive",
                ));
            }
        }
        Ok(())
    }
}

/// How an iteration produced its estimate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EstimateRule {
    /// Best sampled point on the first iteration.
    Bootstrap,
    /// Vertex of the fitted parabola.
    Quadratic,
    /// Best sampled point after a degenerate fit.
    MaxObserved,
}

/// Why the search stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// All iterations ran.
    BudgetExhausted,
    /// Successive estimates agreed within the tolerance.
    Converged,
    /// The re-centered window became too narrow to sample.
    WindowCollapsed,
}

impl Termination {
    /// Short label for logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Termination::BudgetExhausted => "budget_exhausted",
            Termination::Converged => "converged",
            Termination::WindowCollapsed => "window_collapsed",
        }
    }
}

/// Snapshot of one search iteration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IterationRecord {
    /// Zero-based iteration number.
    pub iteration: usize,
    /// Window the samples were drawn from.
    pub window: SearchWindow,
    /// Number of sampled points.
    pub samples: usize,
    /// Estimate produced by this iteration.
    pub estimate: PeakEstimate,
    /// Rule that produced the estimate.
    pub rule: EstimateRule,
}

/// Result of a completed search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchOutcome {
    /// Final peak estimate.
    pub estimate: PeakEstimate,
    /// Iterations actually executed.
    pub iterations: usize,
    /// Window used by the last iteration.
    pub window: SearchWindow,
    /// Stop reason.
    pub termination: Termination,
}

/// Iterative adaptive-window quadratic peak search.
///
/// The search is stateless between calls; the same curve and configuration
/// always produce the same outcome.
#[derive(Clone, Debug)]
pub struct PeakSearch {
    cfg: SearchConfig,
}

impl PeakSearch {
    /// Creates a search after validating `cfg`.
    pub fn new(cfg: SearchConfig) -> MirrorCalResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.cfg
    }

    /// Runs the search on `curve`.
    pub fn search(&self, curve: &ResponseCurve) -> MirrorCalResult<SearchOutcome> {
        self.run(curve, None)
    }

    /// Runs the search and also returns one record per executed iteration.
    pub fn search_with_trace(
        &self,
        curve: &ResponseCurve,
    ) -> MirrorCalResult<(SearchOutcome, Vec<IterationRecord>)> {
        let mut records = Vec::with_capacity(self.cfg.iterations.min(4096));
        let outcome = self.run(curve, Some(&mut records))?;
        Ok((outcome, records))
    }

    fn run(
        &self,
        curve: &ResponseCurve,
        mut records: Option<&mut Vec<IterationRecord>>,
    ) -> MirrorCalResult<SearchOutcome> {
        let cfg = &self.cfg;
        let _span = trace_span!(
            "peak_search",
            points = curve.len(),
            iterations = cfg.iterations
        )
        .entered();

        let samples = cfg.samples_per_iteration;
        let mut window = match SearchWindow::full(curve.len(), samples) {
            Ok(window) => window,
            Err(MirrorCalError::DegenerateWindow { .. }) => {
                return Ok(bootstrap_only(curve, records));
            }
            Err(err) => return Err(err),
        };
        let mut estimate = f64::NAN;
        let mut executed = 0usize;
        let mut termination = Termination::BudgetExhausted;

        for iteration in 0..cfg.iterations {
            let indices = window.sample_indices(samples);
            let xs: Vec<f64> = indices.iter().map(|&i| curve.positions()[i]).collect();
            let ys: Vec<f64> = indices.iter().map(|&i| curve.responses()[i]).collect();

            let (next, rule) = if iteration == 0 {
                (max_observed(&xs, &ys)?, EstimateRule::Bootstrap)
            } else {
                match QuadraticFit::fit(&xs, &ys).and_then(|fit| fit.peak()) {
                    Ok(vertex) => (vertex, EstimateRule::Quadratic),
                    Err(
                        MirrorCalError::DegenerateWindow { .. }
                        | MirrorCalError::NumericDegeneracy { .. },
                    ) => (max_observed(&xs, &ys)?, EstimateRule::MaxObserved),
                    Err(err) => return Err(err),
                }
            };

            let previous = estimate;
            estimate = next;
            executed = iteration + 1;

            trace_debug!(
                "search_iteration",
                iteration = iteration,
                min_index = window.min_index(),
                max_index = window.max_index(),
                estimate = estimate
            );
            if let Some(records) = records.as_deref_mut() {
                records.push(IterationRecord {
                    iteration,
                    window,
                    samples: indices.len(),
                    estimate,
                    rule,
                });
            }

            if let Some(tol) = cfg.convergence_tol {
                if iteration > 0 && (estimate - previous).abs() <= tol {
                    termination = Termination::Converged;
                    break;
                }
            }
            if executed == cfg.iterations {
                break;
            }

            match window.recentered(curve, estimate, cfg.expand_min, cfg.expand_max, samples) {
                Ok(next_window) => window = next_window,
                Err(MirrorCalError::DegenerateWindow { .. }) => {
                    termination = Termination::WindowCollapsed;
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        trace_event!(
            "search_done",
            estimate = estimate,
            iterations = executed,
            termination = termination.as_str()
        );
        Ok(SearchOutcome {
            estimate,
            iterations: executed,
            window,
            termination,
        })
    }
}

/// Runs a search with the given parameters and returns only the estimate.
pub fn search_peak(
    curve: &ResponseCurve,
    iterations: usize,
    samples_per_iteration: usize,
    expand_min: f64,
    expand_max: f64,
) -> MirrorCalResult<PeakEstimate> {
    let search = PeakSearch::new(SearchConfig {
        iterations,
        samples_per_iteration,
        expand_min,
        expand_max,
        convergence_tol: None,
    })?;
    Ok(search.search(curve)?.estimate)
}

/// Single bootstrap pass over a curve with fewer than three points.
fn bootstrap_only(
    curve: &ResponseCurve,
    records: Option<&mut Vec<IterationRecord>>,
) -> SearchOutcome {
    let window = SearchWindow::short(curve.len());
    let estimate = curve.positions()[curve.argmax()];
    trace_event!("search_short_curve", points = curve.len(), estimate = estimate);
    if let Some(records) = records {
        records.push(IterationRecord {
            iteration: 0,
            window,
            samples: curve.len(),
            estimate,
            rule: EstimateRule::Bootstrap,
        });
    }
    SearchOutcome {
        estimate,
        iterations: 1,
        window,
        termination: Termination::WindowCollapsed,
    }
}

fn max_observed(xs: &[f64], ys: &[f64]) -> MirrorCalResult<f64> {
    argmax(ys)
        .map(|k| xs[k])
        .ok_or(MirrorCalError::DegenerateWindow { points: 0 })
}

#[cfg(test)]
mod tests {
    use super::{EstimateRule, PeakSearch, SearchConfig, Termination};
    use crate::curve::{Domain, ResponseCurve};
    use crate::MirrorCalError;

    fn parabola_curve(peak: f64, n: usize) -> ResponseCurve {
        ResponseCurve::from_density(|x| (1.0 - 4.0 * (x - peak).powi(2)).max(0.0), n, Domain::UNIT)
            .unwrap()
    }

    #[test]
    fn rejects_zero_iterations() {
        let err = PeakSearch::new(SearchConfig {
            iterations: 0,
            ..SearchConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, MirrorCalError::InvalidArgument(_)));
    }

    #[test]
    fn rejects_inverted_expansion() {
        let err = PeakSearch::new(SearchConfig {
            expand_min: 1.1,
            expand_max: 0.9,
            ..SearchConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, MirrorCalError::InvalidArgument(_)));
    }

    #[test]
    fn single_iteration_is_bootstrap() {
        let curve = parabola_curve(0.55, 1000);
        let search = PeakSearch::new(SearchConfig {
            iterations: 1,
            ..SearchConfig::default()
        })
        .unwrap();
        let (outcome, records) = search.search_with_trace(&curve).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rule, EstimateRule::Bootstrap);
        assert_eq!(outcome.estimate, curve.position(500).unwrap());
        assert_eq!(outcome.termination, Termination::BudgetExhausted);
    }

    #[test]
    fn refines_parabola_vertex() {
        let curve = parabola_curve(0.55, 1000);
        let search = PeakSearch::new(SearchConfig {
            iterations: 5,
            ..SearchConfig::default()
        })
        .unwrap();
        let (outcome, records) = search.search_with_trace(&curve).unwrap();
        assert!(records[1..]
            .iter()
            .all(|r| r.rule == EstimateRule::Quadratic));
        assert!((outcome.estimate - 0.55).abs() < 1e-9);
    }

    #[test]
    fn convergence_tolerance_stops_early() {
        let curve = parabola_curve(0.55, 1000);
        let search = PeakSearch::new(SearchConfig {
            iterations: 1000,
            convergence_tol: Some(1e-9),
            ..SearchConfig::default()
        })
        .unwrap();
        let outcome = search.search(&curve).unwrap();
        assert_eq!(outcome.termination, Termination::Converged);
        assert!(outcome.iterations < 10);
    }

    #[test]
    fn convex_samples_fall_back_to_max_observed() {
        let curve =
            ResponseCurve::from_density(|x| if x > 0.4 { 1.0 } else { 0.5 }, 200, Domain::UNIT)
                .unwrap();
        let search = PeakSearch::new(SearchConfig {
            iterations: 3,
            ..SearchConfig::default()
        })
        .unwrap();
        let (outcome, records) = search.search_with_trace(&curve).unwrap();
        assert_eq!(records[1].rule, EstimateRule::MaxObserved);
        assert_eq!(records[1].estimate, curve.position(80).unwrap());
        assert!(outcome.estimate.is_finite());
    }

    #[test]
    fn peak_at_origin_collapses_window() {
        let curve =
            ResponseCurve::from_density(|x| (-x / 0.01).exp(), 1000, Domain::UNIT).unwrap();
        let search = PeakSearch::new(SearchConfig::default()).unwrap();
        let outcome = search.search(&curve).unwrap();
        assert_eq!(outcome.termination, Termination::WindowCollapsed);
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.estimate, curve.position(0).unwrap());
    }
}
