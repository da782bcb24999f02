use serde::{Deserialize, Serialize};

/// Anything that can be fed to [`correlation`]. Booleans count as 0/1.
pub trait Sample: Copy {
    fn value(self) -> f64;
}

impl Sample for f64 {
    fn value(self) -> f64 {
        self
    }
}

impl Sample for i64 {
    fn value(self) -> f64 {
        self as f64
    }
}

impl Sample for u32 {
    fn value(self) -> f64 {
        self as f64
    }
}

impl Sample for usize {
    fn value(self) -> f64 {
        self as f64
    }
}

impl Sample for bool {
    fn value(self) -> f64 {
        if self {
            1.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    pub coefficient: f64,
    pub sample_size: usize,
}

impl Correlation {
    pub fn between<X: Sample, Y: Sample>(xs: &[X], ys: &[Y]) -> Self {
        let sample_size = if xs.len() == ys.len() { xs.len() } else { 0 };
        Self {
            coefficient: correlation(xs, ys),
            sample_size,
        }
    }

    pub fn strength(&self) -> f64 {
        self.coefficient.abs()
    }
}

/// Pearson coefficient in `[-1, 1]`.
///
/// Returns 0 for empty or mismatched inputs, fewer than two samples, or a
/// constant series.
pub fn correlation<X: Sample, Y: Sample>(xs: &[X], ys: &[Y]) -> f64 {
    if xs.len() != ys.len() || xs.len() < 2 {
        return 0.0;
    }

    let xs: Vec<f64> = xs.iter().map(|x| x.value()).collect();
    let ys: Vec<f64> = ys.iter().map(|y| y.value()).collect();
    let mean_x = mean(&xs);
    let mean_y = mean(&ys);

    let mut numerator = 0.0;
    let mut denom_x = 0.0;
    let mut denom_y = 0.0;

    for (x, y) in xs.iter().zip(ys.iter()) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        numerator += dx * dy;
        denom_x += dx * dx;
        denom_y += dy * dy;
    }

    if denom_x <= 0.0 || denom_y <= 0.0 {
        return 0.0;
    }

    let coefficient = numerator / (denom_x.sqrt() * denom_y.sqrt());
    if coefficient.is_nan() {
        return 0.0;
    }
    coefficient.max(-1.0).min(1.0)
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

pub fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    percentile(&sorted, 0.5)
}

/// Linear-interpolated percentile of an ascending slice, `p` in `[0, 1]`.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = p.max(0.0).min(1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

/// Integer percentages for `counts` that always sum to exactly 100
/// (largest-remainder apportionment). All zeros when the total is zero.
pub fn whole_percentages(counts: &[usize]) -> Vec<u32> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return vec![0; counts.len()];
    }

    let exact: Vec<f64> = counts
        .iter()
        .map(|count| *count as f64 * 100.0 / total as f64)
        .collect();
    let mut shares: Vec<u32> = exact.iter().map(|value| value.floor() as u32).collect();
    let assigned: u32 = shares.iter().sum();

    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|a, b| {
        let rem_a = exact[*a] - exact[*a].floor();
        let rem_b = exact[*b] - exact[*b].floor();
        rem_b.total_cmp(&rem_a).then(a.cmp(b))
    });
    for idx in order.into_iter().take(100u32.saturating_sub(assigned) as usize) {
        shares[idx] += 1;
    }
    shares
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates() {
        let sorted = [10.0, 20.0, 30.0, 40.0];
        assert!((percentile(&sorted, 0.5) - 25.0).abs() < 1e-9);
        assert!((percentile(&sorted, 0.0) - 10.0).abs() < 1e-9);
        assert!((percentile(&sorted, 1.0) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn whole_percentages_handle_thirds() {
        let shares = whole_percentages(&[1, 1, 1]);
        assert_eq!(shares.iter().sum::<u32>(), 100);
        assert_eq!(shares, vec![34, 33, 33]);
    }

    #[test]
    fn whole_percentages_handle_half_remainders() {
        let shares = whole_percentages(&[101, 99, 0]);
        assert_eq!(shares.iter().sum::<u32>(), 100);
    }

    #[test]
    fn constant_series_has_no_correlation() {
        assert_eq!(correlation(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), 0.0);
    }
}
