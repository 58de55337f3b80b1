//! Index windows for the adaptive peak search.

use crate::curve::ResponseCurve;
use crate::util::{MirrorCalError, MirrorCalResult};

/// Fewest indices a window may hold; a quadratic needs three points.
pub const MIN_WINDOW_POINTS: usize = 3;

/// Half-open index range `[min_index, max_index)` plus the sampling stride.
///
/// Windows are values: every search iteration produces a new one from the
/// previous window and the current estimate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchWindow {
    min_index: usize,
    max_index: usize,
    step: usize,
}

impl SearchWindow {
    /// Creates a window and derives its step from `samples_per_iteration`.
    ///
    /// The step is `floor(width / samples_per_iteration)`, clamped to one.
    pub fn new(
        min_index: usize,
        max_index: usize,
        samples_per_iteration: usize,
    ) -> MirrorCalResult<Self> {
        if samples_per_iteration == 0 {
            return Err(MirrorCalError::InvalidArgument(
                "samples_per_iteration must be positive",
            ));
        }
        let width = max_index.saturating_sub(min_index);
        if width < MIN_WINDOW_POINTS {
            return Err(MirrorCalError::DegenerateWindow { points: width });
        }
        Ok(Self {
            min_index,
            max_index,
            step: (width / samples_per_iteration).max(1),
        })
    }

    /// Covers every index of a curve with `len` samples.
    pub fn full(len: usize, samples_per_iteration: usize) -> MirrorCalResult<Self> {
        Self::new(0, len, samples_per_iteration)
    }

    /// Unit-step window over a curve too short for [`SearchWindow::full`].
    pub(crate) fn short(len: usize) -> Self {
        Self {
            min_index: 0,
            max_index: len.max(1),
            step: 1,
        }
    }

    /// First index in the window.
    pub fn min_index(&self) -> usize {
        self.min_index
    }

    /// One past the last index in the window.
    pub fn max_index(&self) -> usize {
        self.max_index
    }

    /// Stride between sampled indices.
    pub fn step(&self) -> usize {
        self.step
    }

    /// Number of indices covered.
    pub fn width(&self) -> usize {
        self.max_index - self.min_index
    }

    /// Indices sampled in one iteration.
    ///
    /// Strides from `min_index` by `step` and keeps at most
    /// `samples_per_iteration` indices below `max_index`. The last index is
    /// pulled back by one when it stays above its predecessor.
    pub fn sample_indices(&self, samples_per_iteration: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = (self.min_index..self.max_index)
            .step_by(self.step)
            .take(samples_per_iteration)
            .collect();
        let n = indices.len();
        if n >= 2 && indices[n - 1] - 1 > indices[n - 2] {
            indices[n - 1] -= 1;
        }
        indices
    }

    /// Re-centers the window around `estimate`.
    ///
    /// The new bounds are the curve indices nearest to `expand_min` and
    /// `expand_max` times the position closest to `estimate`. The result is
    /// never wider than `self`: excess indices are trimmed from the side
    /// farther from the center. Fails with `DegenerateWindow` when fewer than
    /// [`MIN_WINDOW_POINTS`] indices remain.
    pub fn recentered(
        &self,
        curve: &ResponseCurve,
        estimate: f64,
        expand_min: f64,
        expand_max: f64,
        samples_per_iteration: usize,
    ) -> MirrorCalResult<Self> {
        let center = curve.nearest_index(estimate);
        let center_pos = curve.positions()[center];
        let a = curve.nearest_index(expand_min * center_pos);
        let b = curve.nearest_index(expand_max * center_pos);
        let (mut lo, mut hi) = if a <= b { (a, b) } else { (b, a) };

        let limit = self.width();
        while hi - lo > limit {
            if center.saturating_sub(lo) > hi.saturating_sub(center) {
                lo += 1;
            } else {
                hi -= 1;
            }
        }

        Self::new(lo, hi, samples_per_iteration)
    }
}

#[cfg(test)]
mod tests {
    use super::SearchWindow;
    use crate::curve::{Domain, ResponseCurve};
    use crate::MirrorCalError;

    fn flat_curve(n: usize) -> ResponseCurve {
        ResponseCurve::from_density(|_| 1.0, n, Domain::UNIT).unwrap()
    }

    #[test]
    fn full_window_step() {
        let window = SearchWindow::full(1000, 10).unwrap();
        assert_eq!(window.step(), 100);
        assert_eq!(window.width(), 1000);
    }

    #[test]
    fn step_clamps_to_one() {
        let window = SearchWindow::new(10, 14, 10).unwrap();
        assert_eq!(window.step(), 1);
        assert_eq!(window.sample_indices(10), vec![10, 11, 12, 13]);
    }

    #[test]
    fn sampling_pulls_last_index_back() {
        let window = SearchWindow::full(1000, 10).unwrap();
        let indices = window.sample_indices(10);
        assert_eq!(indices.len(), 10);
        assert_eq!(indices[0], 0);
        assert_eq!(indices[8], 800);
        assert_eq!(indices[9], 899);
    }

    #[test]
    fn sampling_caps_count() {
        let window = SearchWindow::new(0, 29, 10).unwrap();
        assert_eq!(window.step(), 2);
        let indices = window.sample_indices(10);
        assert_eq!(indices.len(), 10);
        assert_eq!(indices[9], 17);
    }

    #[test]
    fn collapsed_window_is_rejected() {
        assert_eq!(
            SearchWindow::new(5, 7, 10).unwrap_err(),
            MirrorCalError::DegenerateWindow { points: 2 }
        );
        assert_eq!(
            SearchWindow::new(7, 5, 10).unwrap_err(),
            MirrorCalError::DegenerateWindow { points: 0 }
        );
    }

    #[test]
    fn recenter_uses_relative_bounds() {
        let curve = flat_curve(1000);
        let window = SearchWindow::full(1000, 10).unwrap();
        let next = window.recentered(&curve, 0.8003, 0.9, 1.1, 10).unwrap();
        assert_eq!(next.min_index(), 720);
        assert_eq!(next.max_index(), 880);
        assert_eq!(next.step(), 16);
    }

    #[test]
    fn recenter_never_widens() {
        let curve = flat_curve(1000);
        let narrow = SearchWindow::new(400, 450, 10).unwrap();
        let next = narrow.recentered(&curve, 0.8003, 0.9, 1.1, 10).unwrap();
        assert_eq!(next.width(), 50);
        assert_eq!(next.min_index(), 775);
        assert_eq!(next.max_index(), 825);
    }

    #[test]
    fn short_window_covers_every_index() {
        let window = SearchWindow::short(2);
        assert_eq!(window.step(), 1);
        assert_eq!(window.sample_indices(10), vec![0, 1]);
        assert_eq!(SearchWindow::short(1).sample_indices(10), vec![0]);
    }

    #[test]
    fn recenter_near_origin_collapses() {
        let curve = flat_curve(1000);
        let window = SearchWindow::full(1000, 10).unwrap();
        let err = window.recentered(&curve, 0.0, 0.9, 1.1, 10).unwrap_err();
        assert!(matches!(err, MirrorCalError::DegenerateWindow { .. }));
    }
}
