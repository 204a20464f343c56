//! Rolling volume baseline and price-change predicates
//!
//! The volume baseline is computed over the whole history window, which by the
//! time it is evaluated already contains the current observation. Including
//! the current value inflates the baseline, so the anomaly test is slightly
//! conservative.

use statrs::statistics::Statistics;

use crate::error::StatsError;
use crate::history::HistoryWindow;

/// Mean and population standard deviation of a volume window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeBaseline {
    pub mean: f64,
    pub std_dev: f64,
}

impl VolumeBaseline {
    /// Volume above which an observation counts as anomalous
    pub fn threshold(&self, threshold_std_devs: f64) -> f64 {
        self.mean + threshold_std_devs * self.std_dev
    }
}

/// Mean and population standard deviation (divide by N)
pub fn mean_and_std_dev(values: &[f64]) -> Result<(f64, f64), StatsError> {
    if values.is_empty() {
        return Err(StatsError::InsufficientData);
    }

    let mean = values.iter().mean();
    let std_dev = values.iter().population_std_dev();
    Ok((mean, std_dev))
}

/// Baseline over a window, or `None` when the window has fewer than two entries
pub fn volume_baseline(window: &HistoryWindow) -> Option<VolumeBaseline> {
    if window.len() <= 1 {
        return None;
    }

    let volumes = window.volumes();
    mean_and_std_dev(&volumes)
        .ok()
        .map(|(mean, std_dev)| VolumeBaseline { mean, std_dev })
}

/// True when `current_volume` is strictly above `mean + k * std_dev`
pub fn is_volume_anomalous(
    window: &HistoryWindow,
    current_volume: f64,
    threshold_std_devs: f64,
) -> bool {
    match volume_baseline(window) {
        Some(baseline) => current_volume > baseline.threshold(threshold_std_devs),
        None => false,
    }
}

/// Percentage change from `previous_close` to `current_price`
pub fn price_change_pct(previous_close: f64, current_price: f64) -> Result<f64, StatsError> {
    if previous_close == 0.0 {
        return Err(StatsError::DivisionByZero);
    }
    Ok((current_price - previous_close) / previous_close * 100.0)
}

/// True when the absolute change exceeds `threshold_pct`.
///
/// A zero previous close yields `false` rather than an error.
pub fn is_price_change_significant(
    previous_close: f64,
    current_price: f64,
    threshold_pct: f64,
) -> bool {
    price_change_pct(previous_close, current_price)
        .map(|change| change.abs() > threshold_pct)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SymbolObservation;
    use approx::assert_relative_eq;

    fn window_of(volumes: &[f64], capacity: usize) -> HistoryWindow {
        let mut window = HistoryWindow::new(capacity);
        for (i, &v) in volumes.iter().enumerate() {
            window.push(SymbolObservation::new(i as i64, v));
        }
        window
    }

    #[test]
    fn test_mean_and_std_dev_population() {
        let (mean, std_dev) = mean_and_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_relative_eq!(mean, 5.0, epsilon = 1e-9);
        assert_relative_eq!(std_dev, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_mean_and_std_dev_empty() {
        assert_eq!(mean_and_std_dev(&[]), Err(StatsError::InsufficientData));
    }

    #[test]
    fn test_short_windows_never_anomalous() {
        let empty = HistoryWindow::new(7);
        assert!(!is_volume_anomalous(&empty, 1e12, 2.0));

        let single = window_of(&[10.0], 7);
        assert!(!is_volume_anomalous(&single, 1e12, 0.0));
    }

    #[test]
    fn test_flat_window_not_anomalous_at_mean() {
        let window = window_of(&[50.0; 7], 7);
        assert!(!is_volume_anomalous(&window, 50.0, 2.0));
        // Zero std dev: anything strictly above the mean triggers
        assert!(is_volume_anomalous(&window, 50.000001, 2.0));
    }

    #[test]
    fn test_spike_included_in_window_triggers() {
        let window = window_of(&[10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 100.0], 7);
        let baseline = volume_baseline(&window).unwrap();

        assert_relative_eq!(baseline.mean, 160.0 / 7.0, epsilon = 1e-9);
        // sqrt((6 * (90/7)^2 + (540/7)^2) / 7)
        let expected_std = ((6.0 * (90.0f64 / 7.0).powi(2) + (540.0f64 / 7.0).powi(2)) / 7.0).sqrt();
        assert_relative_eq!(baseline.std_dev, expected_std, epsilon = 1e-9);
        assert!(baseline.threshold(2.0) < 100.0);
        assert!(baseline.threshold(2.0) > 85.0);

        assert!(is_volume_anomalous(&window, 100.0, 2.0));
        assert!(!is_volume_anomalous(&window, 100.0, 3.0));
    }

    #[test]
    fn test_price_change_significance() {
        assert!(is_price_change_significant(100.0, 106.0, 5.0));
        assert!(!is_price_change_significant(100.0, 104.0, 5.0));
        assert!(is_price_change_significant(100.0, 94.0, 5.0));
        assert!(!is_price_change_significant(100.0, 100.0, 0.0));
    }

    #[test]
    fn test_price_change_zero_previous_close() {
        assert_eq!(price_change_pct(0.0, 10.0), Err(StatsError::DivisionByZero));
        assert!(!is_price_change_significant(0.0, 10.0, 5.0));
    }

    #[test]
    fn test_price_change_pct_sign() {
        assert_relative_eq!(price_change_pct(200.0, 190.0).unwrap(), -5.0, epsilon = 1e-12);
    }
}
