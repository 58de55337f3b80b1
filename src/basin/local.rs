//! Bounded L-BFGS local minimization via argmin.
//!
//! Box constraints are handled by clamping parameters before every
//! evaluation and zeroing gradient components that would push further past
//! an active bound.

use crate::surface::Objective;
use crate::util::{MirrorCalError, MirrorCalResult};
use argmin::core::{CostFunction, Executor, Gradient, State};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;

/// Settings for the inner quasi-Newton solve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalConfig {
    /// Iteration cap per local solve.
    pub max_iters: u64,
    /// Number of correction pairs kept by L-BFGS.
    pub history: usize,
    /// Gradient-norm convergence tolerance.
    pub tol_grad: f64,
    /// Relative cost-change convergence tolerance.
    pub tol_cost: f64,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            max_iters: 100,
            history: 10,
            tol_grad: 1e-8,
            tol_cost: 1e-12,
        }
    }
}

/// Point returned by a local solve.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalMinimum {
    /// Minimizer, inside the bounds.
    pub x: Vec<f64>,
    /// Objective value at `x`.
    pub value: f64,
    /// Solver iterations used.
    pub iterations: u64,
}

struct BoundedProblem<'a, O: ?Sized> {
    objective: &'a O,
    bounds: Option<&'a [(f64, f64)]>,
}

impl<O: Objective + ?Sized> BoundedProblem<'_, O> {
    fn clamp(&self, params: &[f64]) -> Vec<f64> {
        clamp_to_bounds(params, self.bounds)
    }
}

impl<O: Objective + ?Sized> CostFunction for BoundedProblem<'_, O> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, params: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        Ok(self.objective.eval(&self.clamp(params)))
    }
}

impl<O: Objective + ?Sized> Gradient for BoundedProblem<'_, O> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, params: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
        let clamped = self.clamp(params);
        let mut grad = self.objective.gradient(&clamped);
        if let Some(bounds) = self.bounds {
            const EPS: f64 = 1e-12;
            for ((g, &x), &(lo, hi)) in grad.iter_mut().zip(clamped.iter()).zip(bounds.iter()) {
                if (x <= lo + EPS && *g > 0.0) || (x >= hi - EPS && *g < 0.0) {
                    *g = 0.0;
                }
            }
        }
        Ok(grad)
    }
}

/// Clamps each coordinate into its `(lo, hi)` interval.
pub(crate) fn clamp_to_bounds(params: &[f64], bounds: Option<&[(f64, f64)]>) -> Vec<f64> {
    match bounds {
        Some(bounds) => params
            .iter()
            .zip(bounds.iter())
            .map(|(&v, &(lo, hi))| v.clamp(lo, hi))
            .collect(),
        None => params.to_vec(),
    }
}

/// Minimizes `objective` from `x0` with L-BFGS and a More-Thuente line search.
pub fn minimize_local<O: Objective + ?Sized>(
    objective: &O,
    x0: &[f64],
    bounds: Option<&[(f64, f64)]>,
    cfg: &LocalConfig,
) -> MirrorCalResult<LocalMinimum> {
    let start = clamp_to_bounds(x0, bounds);
    let problem = BoundedProblem { objective, bounds };

    let linesearch = MoreThuenteLineSearch::new();
    let solver = LBFGS::new(linesearch, cfg.history)
        .with_tolerance_grad(cfg.tol_grad)
        .map_err(|e| MirrorCalError::Optimizer(e.to_string()))?
        .with_tolerance_cost(cfg.tol_cost)
        .map_err(|e| MirrorCalError::Optimizer(e.to_string()))?;

    let res = Executor::new(problem, solver)
        .configure(|state| state.param(start.clone()).max_iters(cfg.max_iters))
        .run()
        .map_err(|e| MirrorCalError::Optimizer(e.to_string()))?;

    let state = res.state();
    let iterations = state.get_iter();
    let x = match state.get_best_param() {
        Some(best) => clamp_to_bounds(best, bounds),
        None => start,
    };
    let value = objective.eval(&x);
    if !value.is_finite() {
        return Err(MirrorCalError::Optimizer(
            "local minimum has a non-finite objective value".to_string(),
        ));
    }
    Ok(LocalMinimum {
        x,
        value,
        iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::{clamp_to_bounds, minimize_local, LocalConfig};
    use crate::surface::{GaussianSurface, Objective};

    struct Bowl;

    impl Objective for Bowl {
        fn dim(&self) -> usize {
            2
        }

        fn eval(&self, x: &[f64]) -> f64 {
            (x[0] - 0.3).powi(2) + 2.0 * (x[1] - 0.7).powi(2)
        }

        fn gradient(&self, x: &[f64]) -> Vec<f64> {
            vec![2.0 * (x[0] - 0.3), 4.0 * (x[1] - 0.7)]
        }
    }

    #[test]
    fn finds_bowl_minimum() {
        let min = minimize_local(&Bowl, &[0.9, 0.1], None, &LocalConfig::default()).unwrap();
        assert!((min.x[0] - 0.3).abs() < 1e-5);
        assert!((min.x[1] - 0.7).abs() < 1e-5);
    }

    #[test]
    fn clamps_into_bounds() {
        let bounds = [(0.0, 1.0), (0.2, 0.4)];
        assert_eq!(
            clamp_to_bounds(&[1.5, 0.1], Some(&bounds)),
            vec![1.0, 0.2]
        );
        assert_eq!(clamp_to_bounds(&[1.5, 0.1], None), vec![1.5, 0.1]);
    }

    #[test]
    fn descends_gaussian_well_from_its_flank() {
        let surface = GaussianSurface::default();
        let min = minimize_local(&surface, &[0.45, 0.55], None, &LocalConfig::default()).unwrap();
        assert!((min.x[0] - 0.4).abs() < 1e-4);
        assert!((min.x[1] - 0.6).abs() < 1e-4);
    }
}
