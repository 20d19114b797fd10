// Small numeric kernels shared by the aggregators.

use statrs::statistics::Statistics;

/// Running (weighted) mean. Unweighted means use a weight of 1.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct MeanAcc {
    pub sum: f64,
    pub weight: f64,
    pub count: usize,
}

impl MeanAcc {
    pub fn push(&mut self, x: f64, w: f64) {
        self.sum += x * w;
        self.weight += w;
        self.count += 1;
    }

    /// None when nothing (or only zero weight) was accumulated.
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 || self.weight == 0.0 || !self.weight.is_finite() {
            None
        } else {
            Some(self.sum / self.weight)
        }
    }
}

/// Numerator / denominator, 0 when the denominator is not positive.
pub(crate) fn ratio(num: f64, denom: f64) -> f64 {
    if denom > 0.0 && denom.is_finite() {
        num / denom
    } else {
        0.0
    }
}

/// Mean of the finite values, None if there is none.
pub(crate) fn row_mean<I: Iterator<Item = Option<f64>>>(values: I) -> Option<f64> {
    let mut acc = MeanAcc::default();
    for x in values.flatten().filter(|x| x.is_finite()) {
        acc.push(x, 1.0);
    }
    acc.mean()
}

/// Pearson correlation of two paired series.
///
/// None with fewer than 2 pairs, or if one of the series is constant.
pub(crate) fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() < 2 || xs.len() != ys.len() {
        return None;
    }
    let sx = xs.std_dev();
    let sy = ys.std_dev();
    if !(sx > 0.0 && sy > 0.0) {
        return None;
    }
    let r = xs.covariance(ys) / (sx * sy);
    if r.is_finite() {
        Some(r.clamp(-1.0, 1.0))
    } else {
        None
    }
}
