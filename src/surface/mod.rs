//! Closed-form response surfaces for two-axis mirror calibration.

use crate::util::{MirrorCalError, MirrorCalResult};

/// Scalar objective over a parameter vector, minimized by [`crate::basin`].
pub trait Objective {
    /// Number of parameters.
    fn dim(&self) -> usize;

    /// Evaluates the objective at `x`.
    fn eval(&self, x: &[f64]) -> f64;

    /// Gradient at `x`; defaults to central differences.
    fn gradient(&self, x: &[f64]) -> Vec<f64> {
        let mut probe = x.to_vec();
        let mut grad = vec![0.0; x.len()];
        for i in 0..x.len() {
            let h = 1e-7 * x[i].abs().max(1.0);
            probe[i] = x[i] + h;
            let f_plus = self.eval(&probe);
            probe[i] = x[i] - h;
            let f_minus = self.eval(&probe);
            probe[i] = x[i];
            grad[i] = (f_plus - f_minus) / (2.0 * h);
        }
        grad
    }
}

/// Negated 2D Gaussian response, so the optimal mirror position is a minimum.
///
/// `f(x, y) = -amplitude * exp(-((x - mu_x)^2 / (2 sigma_x^2) + (y - mu_y)^2 / (2 sigma_y^2)))`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GaussianSurface {
    pub mu_x: f64,
    pub mu_y: f64,
    pub sigma_x: f64,
    pub sigma_y: f64,
    pub amplitude: f64,
}

impl Default for GaussianSurface {
    fn default() -> Self {
        Self {
            mu_x: 0.4,
            mu_y: 0.6,
            sigma_x: 0.05,
            sigma_y: 0.05,
            amplitude: 1.0,
        }
    }
}

impl GaussianSurface {
    /// Rejects non-finite centers and non-positive spreads or amplitude.
    pub fn validate(&self) -> MirrorCalResult<()> {
        if !self.mu_x.is_finite() || !self.mu_y.is_finite() {
            return Err(MirrorCalError::InvalidArgument(
                "surface center must be finite",
            ));
        }
        if !(self.sigma_x.is_finite() && self.sigma_x > 0.0)
            || !(self.sigma_y.is_finite() && self.sigma_y > 0.0)
        {
            return Err(MirrorCalError::InvalidArgument(
                "surface sigmas must be finite and positive",
            ));
        }
        if !self.amplitude.is_finite() || self.amplitude <= 0.0 {
            return Err(MirrorCalError::InvalidArgument(
                "surface amplitude must be finite and positive",
            ));
        }
        Ok(())
    }

    /// Simulated measurement at `(x, y)`.
    pub fn measure(&self, x: f64, y: f64) -> f64 {
        -self.amplitude * (-self.exponent(x, y)).exp()
    }

    /// True optimum.
    pub fn peak(&self) -> [f64; 2] {
        [self.mu_x, self.mu_y]
    }

    fn exponent(&self, x: f64, y: f64) -> f64 {
        let dx = x - self.mu_x;
        let dy = y - self.mu_y;
        dx * dx / (2.0 * self.sigma_x * self.sigma_x) + dy * dy / (2.0 * self.sigma_y * self.sigma_y)
    }
}

impl Objective for GaussianSurface {
    fn dim(&self) -> usize {
        2
    }

    fn eval(&self, x: &[f64]) -> f64 {
        self.measure(x[0], x[1])
    }

    fn gradient(&self, x: &[f64]) -> Vec<f64> {
        // d/dx of -A exp(-q) is A exp(-q) * dq/dx.
        let weight = self.amplitude * (-self.exponent(x[0], x[1])).exp();
        vec![
            weight * (x[0] - self.mu_x) / (self.sigma_x * self.sigma_x),
            weight * (x[1] - self.mu_y) / (self.sigma_y * self.sigma_y),
        ]
    }
}
