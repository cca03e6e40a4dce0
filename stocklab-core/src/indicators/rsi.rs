//! Relative Strength Index (RSI).
//!
//! Uses Wilder smoothing of average gains and average losses.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Lookback: period.
//! Edge cases: avg_loss == 0 → RSI = 100; avg_gain == 0 → RSI = 0.

use super::Indicator;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("RSI_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, values: &[f64]) -> Vec<f64> {
        let n = values.len();
        let mut result = vec![f64::NAN; n];

        if n < self.period + 1 {
            return result;
        }

        // changes[0] has no predecessor; NaN on either side stays NaN
        let mut changes = vec![f64::NAN; n];
        for (i, pair) in values.windows(2).enumerate() {
            changes[i + 1] = pair[1] - pair[0];
        }

        // Seed: average gain and average loss over first `period` changes
        let mut avg_gain = 0.0;
        let mut avg_loss = 0.0;
        for &ch in &changes[1..=self.period] {
            if ch.is_nan() {
                return result;
            }
            if ch > 0.0 {
                avg_gain += ch;
            } else {
                avg_loss -= ch;
            }
        }
        avg_gain /= self.period as f64;
        avg_loss /= self.period as f64;

        // First RSI value
        result[self.period] = compute_rsi(avg_gain, avg_loss);

        // Wilder smoothing for subsequent values
        let alpha = 1.0 / self.period as f64;
        for i in (self.period + 1)..n {
            // NaN taints the remainder
            if changes[i].is_nan() {
                return result;
            }

            let gain = if changes[i] > 0.0 { changes[i] } else { 0.0 };
            let loss = if changes[i] < 0.0 { -changes[i] } else { 0.0 };

            avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
            avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;

            result[i] = compute_rsi(avg_gain, avg_loss);
        }

        result
    }
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0 // no movement
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::assert_approx;

    #[test]
    fn monotonic_series_saturate() {
        let up = Rsi::new(3).compute(&[100.0, 101.0, 102.0, 103.0, 104.0, 105.0]);
        let down = Rsi::new(3).compute(&[105.0, 104.0, 103.0, 102.0, 101.0, 100.0]);
        assert_approx(up[3], 100.0, 1e-6);
        assert_approx(down[5], 0.0, 1e-6);
    }

    #[test]
    fn flat_series_is_neutral() {
        let result = Rsi::new(2).compute(&[7.0, 7.0, 7.0, 7.0]);
        assert_approx(result[3], 50.0, 1e-9);
    }

    #[test]
    fn seed_value() {
        // changes +0.34, -0.25, -0.48: avg gain 0.34/3, avg loss 0.73/3
        let result = Rsi::new(3).compute(&[44.0, 44.34, 44.09, 43.61, 44.33]);
        assert!(result[..3].iter().all(|v| v.is_nan()));
        assert_approx(result[3], 100.0 - 100.0 / (1.0 + 0.34 / 0.73), 1e-9);
    }

    #[test]
    fn wilder_smoothing_step() {
        // seed gains 2/2, losses 0 -> then a loss of 1 with alpha 1/2
        let result = Rsi::new(2).compute(&[10.0, 11.0, 12.0, 11.0]);
        // avg_gain = 0.5, avg_loss = 0.5
        assert_approx(result[3], 50.0, 1e-9);
    }

    #[test]
    fn stays_within_bounds() {
        let result = Rsi::new(3).compute(&[100.0, 105.0, 98.0, 110.0, 95.0, 115.0, 90.0, 120.0]);
        for (i, &v) in result.iter().enumerate() {
            if !v.is_nan() {
                assert!((0.0..=100.0).contains(&v), "RSI out of bounds at row {i}: {v}");
            }
        }
    }

    #[test]
    fn nan_in_seed_window() {
        let result = Rsi::new(3).compute(&[100.0, 101.0, f64::NAN, 103.0, 104.0]);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn name_and_lookback() {
        assert_eq!(Rsi::new(14).name(), "RSI_14");
        assert_eq!(Rsi::new(14).lookback(), 14);
    }
}
