use crate::core::window::QuantileGrid;
use crate::types::{HandoffError, HandoffResult, Reflectance};

/// Empirical quantile with linear interpolation between order statistics.
///
/// `sorted` is ascending and non-empty, `p` lies in [0, 1].
fn quantile_sorted(sorted: &[Reflectance], p: f64) -> Reflectance {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }

    let h = (n - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let weight = h - lo as f64;

    sorted[lo] + weight * (sorted[hi] - sorted[lo])
}

/// Quantiles of `values` at each probability, positionally aligned
pub fn quantiles(values: &[Reflectance], probabilities: &[f64]) -> HandoffResult<Vec<Reflectance>> {
    if values.is_empty() {
        return Err(HandoffError::EmptySample);
    }
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(HandoffError::InvalidValue(*bad));
    }
    if let Some(bad) = probabilities
        .iter()
        .find(|p| !p.is_finite() || !(0.0..=1.0).contains(*p))
    {
        return Err(HandoffError::InvalidProbability(*bad));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    Ok(probabilities
        .iter()
        .map(|&p| quantile_sorted(&sorted, p))
        .collect())
}

/// Summarize a band column on a pair's quantile grid
pub fn summarize(values: &[Reflectance], grid: QuantileGrid) -> HandoffResult<Vec<Reflectance>> {
    quantiles(values, &grid.probabilities())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_median_interpolation() {
        let odd = quantiles(&[1.0, 2.0, 3.0, 4.0, 5.0], &[0.5]).unwrap();
        assert_relative_eq!(odd[0], 3.0);

        let even = quantiles(&[1.0, 2.0, 3.0, 4.0], &[0.5]).unwrap();
        assert_relative_eq!(even[0], 2.5);
    }

    #[test]
    fn test_unsorted_input_and_extremes() {
        let values = [4.0, 1.0, 3.0, 2.0];
        let q = quantiles(&values, &[0.0, 0.25, 1.0]).unwrap();
        assert_relative_eq!(q[0], 1.0);
        assert_relative_eq!(q[1], 1.75);
        assert_relative_eq!(q[2], 4.0);
    }

    #[test]
    fn test_single_value() {
        let q = summarize(&[0.042], QuantileGrid::FivePercent).unwrap();
        assert_eq!(q.len(), 19);
        assert!(q.iter().all(|&v| v == 0.042));
    }

    #[test]
    fn test_grid_length_follows_grid() {
        let values: Vec<f64> = (0..2000).map(|i| i as f64 * 1e-4).collect();
        assert_eq!(summarize(&values, QuantileGrid::Percent).unwrap().len(), 99);
        assert_eq!(summarize(&values, QuantileGrid::FivePercent).unwrap().len(), 19);
    }

    #[test]
    fn test_invalid_samples() {
        assert!(matches!(quantiles(&[], &[0.5]), Err(HandoffError::EmptySample)));
        assert!(matches!(
            quantiles(&[0.1, f64::NAN], &[0.5]),
            Err(HandoffError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_invalid_probabilities_are_rejected() {
        let values = [1.0, 2.0, 3.0];
        assert!(matches!(
            quantiles(&values, &[0.5, f64::NAN]),
            Err(HandoffError::InvalidProbability(p)) if p.is_nan()
        ));
        assert!(matches!(
            quantiles(&values, &[1.5]),
            Err(HandoffError::InvalidProbability(p)) if p == 1.5
        ));
        assert!(matches!(
            quantiles(&values, &[-0.01]),
            Err(HandoffError::InvalidProbability(_))
        ));
        assert!(matches!(
            quantiles(&[], &[f64::NAN]),
            Err(HandoffError::EmptySample)
        ));

        let bounds = quantiles(&values, &[0.0, 1.0]).unwrap();
        assert_relative_eq!(bounds[0], 1.0);
        assert_relative_eq!(bounds[1], 3.0);
    }
}
