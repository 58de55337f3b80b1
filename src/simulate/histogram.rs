//! Fixed-range equal-width histogram with density normalization.

use crate::curve::{Domain, ResponseCurve};
use crate::util::{MirrorCalError, MirrorCalResult};

/// Counts samples into equal-width bins over a closed domain.
///
/// Every bin is half-open `[left, right)` except the last, which also
/// includes the domain's upper edge. Samples outside the domain (and NaN) are
/// counted as discarded.
#[derive(Clone, Debug)]
pub struct Histogram {
    domain: Domain,
    counts: Vec<u64>,
    in_range: usize,
    discarded: usize,
}

impl Histogram {
    /// Creates an empty histogram with `num_bins` bins.
    pub fn new(num_bins: usize, domain: Domain) -> MirrorCalResult<Self> {
        if num_bins == 0 {
            return Err(MirrorCalError::InvalidArgument("num_bins must be positive"));
        }
        Ok(Self {
            domain,
            counts: vec![0; num_bins],
            in_range: 0,
            discarded: 0,
        })
    }

    /// Adds one sample.
    pub fn insert(&mut self, x: f64) {
        if !self.domain.contains(x) {
            self.discarded += 1;
            return;
        }
        let n = self.counts.len();
        let rel = (x - self.domain.min) / self.domain.width();
        let bin = ((rel * n as f64) as usize).min(n - 1);
        self.counts[bin] += 1;
        self.in_range += 1;
    }

    /// Raw per-bin counts.
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Number of samples that landed inside the domain.
    pub fn in_range(&self) -> usize {
        self.in_range
    }

    /// Number of samples outside the domain.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Converts counts into a density curve over the bin midpoints.
    ///
    /// Densities are `count / (in_range * bin_width)`, so the curve integrates
    /// to one over the domain.
    pub fn into_density_curve(self) -> MirrorCalResult<ResponseCurve> {
        if self.in_range == 0 {
            return Err(MirrorCalError::EmptyHistogram {
                samples: self.discarded,
            });
        }
        let num_bins = self.counts.len();
        let edges = self.domain.bin_edges(num_bins);
        let total = self.in_range as f64;
        let responses = self
            .counts
            .iter()
            .zip(edges.windows(2))
            .map(|(&count, pair)| count as f64 / (total * (pair[1] - pair[0])))
            .collect();
        ResponseCurve::new(self.domain.bin_midpoints(num_bins), responses)
    }
}

#[cfg(test)]
mod tests {
    use super::Histogram;
    use crate::curve::Domain;
    use crate::MirrorCalError;

    #[test]
    fn upper_edge_lands_in_last_bin() {
        let mut hist = Histogram::new(4, Domain::UNIT).unwrap();
        for x in [0.0, 0.24, 0.25, 0.99, 1.0, 1.01, -0.01, f64::NAN] {
            hist.insert(x);
        }
        assert_eq!(hist.counts(), &[2, 1, 0, 2]);
        assert_eq!(hist.in_range(), 5);
        assert_eq!(hist.discarded(), 3);
    }

    #[test]
    fn density_integrates_to_one() {
        let mut hist = Histogram::new(5, Domain::UNIT).unwrap();
        for x in [0.1, 0.1, 0.3, 0.5, 0.9, 2.0] {
            hist.insert(x);
        }
        let curve = hist.into_density_curve().unwrap();
        let integral: f64 = curve.responses().iter().map(|r| r * 0.2).sum();
        assert!((integral - 1.0).abs() < 1e-12);
        assert!((curve.response(0).unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn all_samples_outside_is_an_error() {
        let mut hist = Histogram::new(3, Domain::UNIT).unwrap();
        hist.insert(5.0);
        hist.insert(-5.0);
        assert_eq!(
            hist.into_density_curve().unwrap_err(),
            MirrorCalError::EmptyHistogram { samples: 2 }
        );
    }
}
