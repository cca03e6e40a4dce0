//! Rolling sample standard deviation (divide by N - 1).
//!
//! Lookback: period - 1. Any `NaN` in the window gives `NaN`.

use super::Indicator;

#[derive(Debug, Clone)]
pub struct RollingStd {
    period: usize,
    name: String,
}

impl RollingStd {
    pub fn new(period: usize) -> Self {
        assert!(period >= 2, "rolling std period must be >= 2");
        Self {
            period,
            name: format!("STD_{period}"),
        }
    }
}

impl Indicator for RollingStd {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, values: &[f64]) -> Vec<f64> {
        let n = values.len();
        let mut result = vec![f64::NAN; n];

        if n < self.period {
            return result;
        }

        for (i, window) in values.windows(self.period).enumerate() {
            if window.iter().any(|v| v.is_nan()) {
                continue;
            }
            let mean = window.iter().sum::<f64>() / self.period as f64;
            let variance = window
                .iter()
                .map(|v| {
                    let diff = v - mean;
                    diff * diff
                })
                .sum::<f64>()
                / (self.period - 1) as f64;
            result[i + self.period - 1] = variance.sqrt();
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn sample_std_known_values() {
        // window [2,4,4,4,5,5,7,9]: mean 5, sum sq dev 32, sample var 32/7
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let result = RollingStd::new(8).compute(&values);
        assert!(result[6].is_nan());
        assert_approx(result[7], (32.0_f64 / 7.0).sqrt(), DEFAULT_EPSILON);
    }

    #[test]
    fn rolls_over_window() {
        let result = RollingStd::new(2).compute(&[1.0, 3.0, 3.0]);
        assert!(result[0].is_nan());
        assert_approx(result[1], 2.0_f64.sqrt(), DEFAULT_EPSILON);
        assert_approx(result[2], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn warmup_input_extends_warmup() {
        let result = RollingStd::new(3).compute(&[f64::NAN, f64::NAN, 1.0, 2.0, 3.0]);
        assert!(result[..4].iter().all(|v| v.is_nan()));
        assert_approx(result[4], 1.0, DEFAULT_EPSILON);
    }

    #[test]
    fn name_and_lookback() {
        let std = RollingStd::new(20);
        assert_eq!(std.name(), "STD_20");
        assert_eq!(std.lookback(), 19);
    }
}
