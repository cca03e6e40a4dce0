//! Moving Average Convergence/Divergence.
//!
//! Three lines (separate Indicator instances):
//! - MACD: EMA(fast) - EMA(slow)
//! - Signal: EMA(signal) of the MACD line
//! - Histogram: MACD - Signal
//!
//! Lookback: slow - 1 for the MACD line, slow + signal - 2 for the others.

use super::ema::ema_of_series;
use super::Indicator;

/// Which MACD line to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdLine {
    Macd,
    Signal,
    Histogram,
}

#[derive(Debug, Clone)]
pub struct Macd {
    line: MacdLine,
    fast: usize,
    slow: usize,
    signal: usize,
}

impl Macd {
    pub fn new(line: MacdLine, fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast >= 1 && signal >= 1, "MACD periods must be >= 1");
        assert!(fast < slow, "MACD fast period must be below slow period");
        Self {
            line,
            fast,
            slow,
            signal,
        }
    }

    /// All three lines with the given periods, in MACD, signal, histogram order.
    pub fn lines(fast: usize, slow: usize, signal: usize) -> [Macd; 3] {
        [MacdLine::Macd, MacdLine::Signal, MacdLine::Histogram]
            .map(|line| Macd::new(line, fast, slow, signal))
    }

    fn macd_line(&self, values: &[f64]) -> Vec<f64> {
        let fast = ema_of_series(values, self.fast);
        let slow = ema_of_series(values, self.slow);
        fast.iter().zip(&slow).map(|(f, s)| f - s).collect()
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        match self.line {
            MacdLine::Macd => "MACD",
            MacdLine::Signal => "MACD_Signal",
            MacdLine::Histogram => "MACD_Hist",
        }
    }

    fn lookback(&self) -> usize {
        match self.line {
            MacdLine::Macd => self.slow - 1,
            MacdLine::Signal | MacdLine::Histogram => self.slow + self.signal - 2,
        }
    }

    fn compute(&self, values: &[f64]) -> Vec<f64> {
        let macd = self.macd_line(values);
        if self.line == MacdLine::Macd {
            return macd;
        }

        let signal = ema_of_series(&macd, self.signal);
        match self.line {
            MacdLine::Signal => signal,
            _ => macd.iter().zip(&signal).map(|(m, s)| m - s).collect(),
        }
    }
}
