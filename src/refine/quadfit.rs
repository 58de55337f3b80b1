//! Least-squares quadratic fitting for peak refinement.
//!
//! Positions are mapped onto `[-1, 1]` before solving the normal equations,
//! which keeps the system well conditioned when the samples span a narrow
//! window far from the origin. Coefficients are converted back to the
//! input position units afterwards.

use crate::util::{MirrorCalError, MirrorCalResult};

/// Relative size below which the curvature term counts as zero.
const CURVATURE_EPS: f64 = 1e-10;

/// Best-fit quadratic `c0 + c1 * x + c2 * x^2`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadraticFit {
    /// Constant term.
    pub c0: f64,
    /// Linear term.
    pub c1: f64,
    /// Quadratic term.
    pub c2: f64,
    // Coefficients in the normalized coordinate, used for conditioning checks.
    scaled: [f64; 3],
}

impl QuadraticFit {
    /// Fits a quadratic to `(xs[i], ys[i])` in the least-squares sense.
    ///
    /// Requires at least three distinct positions; otherwise returns
    /// `DegenerateWindow`.
    pub fn fit(xs: &[f64], ys: &[f64]) -> MirrorCalResult<Self> {
        if xs.len() != ys.len() {
            return Err(MirrorCalError::LengthMismatch {
                positions: xs.len(),
                responses: ys.len(),
            });
        }
        if xs.iter().chain(ys.iter()).any(|v| !v.is_finite()) {
            return Err(MirrorCalError::InvalidArgument(
                "quadratic fit inputs must be finite",
            ));
        }
        let distinct = count_distinct(xs);
        if distinct < 3 {
            return Err(MirrorCalError::DegenerateWindow { points: distinct });
        }

        let (lo, hi) = xs
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
                (lo.min(x), hi.max(x))
            });
        let mid = 0.5 * (lo + hi);
        let half = 0.5 * (hi - lo);

        // Normal equations in u = (x - mid) / half.
        let mut pow_sums = [0.0f64; 5];
        let mut rhs = [0.0f64; 3];
        for (&x, &y) in xs.iter().zip(ys.iter()) {
            let u = (x - mid) / half;
            let mut p = 1.0;
            for k in 0..5 {
                pow_sums[k] += p;
                if k < 3 {
                    rhs[k] += p * y;
                }
                p *= u;
            }
        }
        let mut m = [[0.0f64; 3]; 3];
        for (r, row) in m.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = pow_sums[r + c];
            }
        }
        let a = solve3(m, rhs).ok_or(MirrorCalError::DegenerateWindow { points: distinct })?;

        let c2 = a[2] / (half * half);
        let c1 = a[1] / half - 2.0 * a[2] * mid / (half * half);
        let c0 = a[0] - a[1] * mid / half + a[2] * mid * mid / (half * half);

        Ok(Self {
            c0,
            c1,
            c2,
            scaled: a,
        })
    }

    /// Evaluates the quadratic at `x`.
    pub fn eval(&self, x: f64) -> f64 {
        self.c0 + x * (self.c1 + x * self.c2)
    }

    /// Returns the extremum `-c1 / (2 c2)`.
    ///
    /// Fails with `NumericDegeneracy` when the curvature is negligible
    /// relative to the other terms or the vertex is not finite.
    pub fn vertex(&self) -> MirrorCalResult<f64> {
        let scale = self
            .scaled
            .iter()
            .fold(0.0f64, |acc, v| acc.max(v.abs()));
        if scale == 0.0 || self.scaled[2].abs() <= CURVATURE_EPS * scale {
            return Err(MirrorCalError::NumericDegeneracy { c2: self.c2 });
        }
        let vertex = -self.c1 / (2.0 * self.c2);
        if !vertex.is_finite() {
            return Err(MirrorCalError::NumericDegeneracy { c2: self.c2 });
        }
        Ok(vertex)
    }

    /// Returns the vertex only if the parabola opens downward.
    pub fn peak(&self) -> MirrorCalResult<f64> {
        let vertex = self.vertex()?;
        if self.c2 >= 0.0 {
            return Err(MirrorCalError::NumericDegeneracy { c2: self.c2 });
        }
        Ok(vertex)
    }
}

fn count_distinct(xs: &[f64]) -> usize {
    let mut sorted = xs.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    sorted.len()
}

/// Solves a 3x3 system with partial pivoting.
fn solve3(mut m: [[f64; 3]; 3], mut b: [f64; 3]) -> Option<[f64; 3]> {
    let norm = m
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0f64, |acc, v| acc.max(v.abs()));
    let tiny = norm * 1e-14;
    for col in 0..3 {
        let pivot = (col..3).max_by(|&i, &j| m[i][col].abs().total_cmp(&m[j][col].abs()))?;
        if m[pivot][col].abs() <= tiny {
            return None;
        }
        m.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..3 {
            let factor = m[row][col] / m[col][col];
            for k in col..3 {
                m[row][k] -= factor * m[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = [0.0f64; 3];
    for row in (0..3).rev() {
        let mut acc = b[row];
        for k in row + 1..3 {
            acc -= m[row][k] * x[k];
        }
        x[row] = acc / m[row][row];
    }
    Some(x)
}
