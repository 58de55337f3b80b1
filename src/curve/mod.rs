//! Sampled response curves.
//!
//! A `ResponseCurve` pairs ascending scan positions with the measured (or
//! simulated) response at each position. Curves are validated on construction
//! and immutable afterwards; the peak search only ever reads them.

use crate::util::math::{argmax, nearest_index};
use crate::util::{MirrorCalError, MirrorCalResult};

/// Closed scan interval `[min, max]` covered by a curve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Domain {
    /// Lower edge of the scan range.
    pub min: f64,
    /// Upper edge of the scan range.
    pub max: f64,
}

impl Domain {
    /// The normalized mirror range `[0, 1]`.
    pub const UNIT: Domain = Domain { min: 0.0, max: 1.0 };

    /// Creates a domain, rejecting empty or non-finite ranges.
    pub fn new(min: f64, max: f64) -> MirrorCalResult<Self> {
        if !min.is_finite() || !max.is_finite() {
            return Err(MirrorCalError::InvalidArgument(
                "domain bounds must be finite",
            ));
        }
        if max <= min {
            return Err(MirrorCalError::InvalidArgument(
                "domain max must exceed domain min",
            ));
        }
        Ok(Self { min, max })
    }

    /// Returns `max - min`.
    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    /// Returns `true` if `x` lies inside the closed interval.
    pub fn contains(&self, x: f64) -> bool {
        x >= self.min && x <= self.max
    }

    /// Returns the `num_bins + 1` equally spaced bin edges.
    pub fn bin_edges(&self, num_bins: usize) -> Vec<f64> {
        let n = num_bins as f64;
        (0..=num_bins)
            .map(|i| {
                if i == num_bins {
                    self.max
                } else {
                    self.min + self.width() * (i as f64 / n)
                }
            })
            .collect()
    }

    /// Returns the midpoints of `num_bins` equal-width bins.
    pub fn bin_midpoints(&self, num_bins: usize) -> Vec<f64> {
        let edges = self.bin_edges(num_bins);
        edges
            .windows(2)
            .map(|pair| pair[0] + (pair[1] - pair[0]) / 2.0)
            .collect()
    }
}

impl Default for Domain {
    fn default() -> Self {
        Self::UNIT
    }
}

/// Ordered `(position, response)` samples of a mirror scan.
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseCurve {
    positions: Vec<f64>,
    responses: Vec<f64>,
}

impl ResponseCurve {
    /// Creates a curve from matching position and response buffers.
    ///
    /// Positions must be finite and strictly ascending; responses must be
    /// finite and non-negative.
    pub fn new(positions: Vec<f64>, responses: Vec<f64>) -> MirrorCalResult<Self> {
        if positions.len() != responses.len() {
            return Err(MirrorCalError::LengthMismatch {
                positions: positions.len(),
                responses: responses.len(),
            });
        }
        if positions.is_empty() {
            return Err(MirrorCalError::InvalidArgument("curve must not be empty"));
        }
        if positions.iter().any(|p| !p.is_finite()) {
            return Err(MirrorCalError::InvalidArgument(
                "curve positions must be finite",
            ));
        }
        if positions.windows(2).any(|pair| pair[1] <= pair[0]) {
            return Err(MirrorCalError::InvalidArgument(
                "curve positions must be strictly ascending",
            ));
        }
        if responses.iter().any(|r| !r.is_finite() || *r < 0.0) {
            return Err(MirrorCalError::InvalidArgument(
                "curve responses must be finite and non-negative",
            ));
        }
        Ok(Self {
            positions,
            responses,
        })
    }

    /// Builds a noise-free curve by evaluating `density` at bin midpoints.
    pub fn from_density<F>(density: F, num_bins: usize, domain: Domain) -> MirrorCalResult<Self>
    where
        F: Fn(f64) -> f64,
    {
        if num_bins == 0 {
            return Err(MirrorCalError::InvalidArgument("num_bins must be positive"));
        }
        let positions = domain.bin_midpoints(num_bins);
        let responses = positions.iter().map(|&x| density(x)).collect();
        Self::new(positions, responses)
    }

    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Always `false`; construction rejects empty curves.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Returns the scan positions in ascending order.
    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    /// Returns the responses aligned with [`positions`](Self::positions).
    pub fn responses(&self) -> &[f64] {
        &self.responses
    }

    /// Returns the position at `idx`.
    pub fn position(&self, idx: usize) -> Option<f64> {
        self.positions.get(idx).copied()
    }

    /// Returns the response at `idx`.
    pub fn response(&self, idx: usize) -> Option<f64> {
        self.responses.get(idx).copied()
    }

    /// Iterates over `(position, response)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.positions
            .iter()
            .copied()
            .zip(self.responses.iter().copied())
    }

    /// Index of the position closest to `target`, lowest index on ties.
    pub fn nearest_index(&self, target: f64) -> usize {
        nearest_index(&self.positions, target).unwrap_or(0)
    }

    /// Index of the largest response, first occurrence on ties.
    pub fn argmax(&self) -> usize {
        argmax(&self.responses).unwrap_or(0)
    }

    /// Average spacing between neighbouring positions.
    ///
    /// Single-sample curves report a width of zero.
    pub fn bin_width(&self) -> f64 {
        let n = self.positions.len();
        if n < 2 {
            return 0.0;
        }
        (self.positions[n - 1] - self.positions[0]) / (n - 1) as f64
    }

    /// Riemann sum of the responses using [`bin_width`](Self::bin_width).
    pub fn integral(&self) -> f64 {
        self.responses.iter().sum::<f64>() * self.bin_width()
    }
}
