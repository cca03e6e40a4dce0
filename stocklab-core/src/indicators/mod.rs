//! Technical indicators over named table columns.
//!
//! Every indicator is a pure function from one numeric series to another of
//! the same length, with `NaN` during warmup. [`apply`] reads a source column
//! by name and writes the result as `{source}_{indicator name}`, so existing
//! columns are never touched; rerunning an indicator replaces its own column.
//!
//! Multi-series indicators (MACD, Bollinger) are exposed as separate named
//! instances per line, keeping the single-series `Indicator` trait unchanged.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod pipeline;
pub mod returns;
pub mod rsi;
pub mod sma;
pub mod stddev;

pub use bollinger::{Bollinger, BollingerBand};
pub use ema::{ema_of_series, Ema};
pub use macd::{Macd, MacdLine};
pub use pipeline::{IndicatorPipeline, IndicatorSettings, SettingsError};
pub use returns::{cumulative_returns, returns};
pub use rsi::Rsi;
pub use sma::Sma;
pub use stddev::RollingStd;

use crate::domain::{PriceTable, TableError};

/// Trait for indicators.
///
/// The output has the same length as the input and the first `lookback()`
/// values are `f64::NAN`. No output value at row t may depend on input rows
/// after t.
pub trait Indicator: Send + Sync {
    /// Column suffix (e.g. "MA_20", "RSI_14").
    fn name(&self) -> &str;

    /// Number of rows needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    fn compute(&self, values: &[f64]) -> Vec<f64>;
}

/// Name of the column `indicator` writes when applied to `source`.
pub fn output_name(source: &str, indicator: &dyn Indicator) -> String {
    format!("{source}_{}", indicator.name())
}

/// Compute `indicator` over `source` and store it in `table`.
///
/// Returns the name of the written column.
pub fn apply(
    table: &mut PriceTable,
    indicator: &dyn Indicator,
    source: &str,
) -> Result<String, TableError> {
    let values = indicator.compute(table.require(source)?);
    let name = output_name(source, indicator);
    table.insert_column(name.clone(), values)?;
    Ok(name)
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CLOSE;
    use chrono::NaiveDate;

    fn table(closes: &[f64]) -> PriceTable {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates = (0..closes.len())
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect();
        PriceTable::new(dates)
            .with_column(CLOSE, closes.to_vec())
            .unwrap()
    }

    #[test]
    fn apply_writes_prefixed_column() {
        let mut t = table(&[1.0, 2.0, 3.0]);
        let name = apply(&mut t, &Sma::new(2), CLOSE).unwrap();
        assert_eq!(name, "Close_MA_2");
        let ma = t.column(&name).unwrap();
        assert!(ma[0].is_nan());
        assert_approx(ma[2], 2.5, DEFAULT_EPSILON);
        assert_eq!(t.column(CLOSE).unwrap(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn reapplying_replaces_own_column() {
        let mut t = table(&[1.0, 2.0, 3.0]);
        apply(&mut t, &Sma::new(2), CLOSE).unwrap();
        apply(&mut t, &Sma::new(2), CLOSE).unwrap();
        assert_eq!(t.width(), 2);
    }

    #[test]
    fn apply_requires_source_column() {
        let mut t = table(&[1.0]);
        assert!(matches!(
            apply(&mut t, &Rsi::new(14), "Missing"),
            Err(TableError::MissingColumn(_))
        ));
    }

    /// Truncating the input never changes earlier outputs.
    #[test]
    fn no_lookahead() {
        let series: Vec<f64> = (0..80).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let indicators: Vec<Box<dyn Indicator>> = vec![
            Box::new(Sma::new(5)),
            Box::new(Ema::new(5)),
            Box::new(Macd::new(MacdLine::Signal, 5, 10, 4)),
            Box::new(RollingStd::new(5)),
            Box::new(Bollinger::upper(5, 2.0)),
            Box::new(Rsi::new(5)),
        ];
        for ind in &indicators {
            let full = ind.compute(&series);
            let truncated = ind.compute(&series[..50]);
            for i in 0..50 {
                if full[i].is_nan() {
                    assert!(truncated[i].is_nan(), "{} at {i}", ind.name());
                } else {
                    assert_approx(truncated[i], full[i], 1e-9);
                }
            }
        }
    }
}
