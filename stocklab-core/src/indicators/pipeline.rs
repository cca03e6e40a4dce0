//! Indicator pipeline: returns, returns moving average, default metric battery.

use super::{apply, Bollinger, Ema, Indicator, Macd, RollingStd, Rsi, Sma};
use crate::domain::{PriceTable, TableError, CLOSE, RETURNS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Windows and multipliers for the default battery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorSettings {
    pub ma_windows: Vec<usize>,
    pub ema_windows: Vec<usize>,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    /// Moving average whose volatility is measured (`Close_MA_{std_ma_window}`).
    pub std_ma_window: usize,
    pub std_window: usize,
    pub bollinger_period: usize,
    pub bollinger_multiplier: f64,
    pub rsi_period: usize,
    pub returns_ma_window: usize,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            ma_windows: vec![20, 50],
            ema_windows: vec![12, 26],
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            std_ma_window: 20,
            std_window: 20,
            bollinger_period: 20,
            bollinger_multiplier: 2.0,
            rsi_period: 14,
            returns_ma_window: 20,
        }
    }
}

impl IndicatorSettings {
    /// Reject windows the indicators cannot be built with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> SettingsError {
            SettingsError::Invalid {
                field,
                reason: reason.into(),
            }
        }

        if self.ma_windows.contains(&0) {
            return Err(invalid("ma_windows", "windows must be positive"));
        }
        if self.ema_windows.contains(&0) {
            return Err(invalid("ema_windows", "windows must be positive"));
        }
        let positive = [
            ("macd_fast", self.macd_fast),
            ("macd_signal", self.macd_signal),
            ("std_ma_window", self.std_ma_window),
            ("bollinger_period", self.bollinger_period),
            ("rsi_period", self.rsi_period),
            ("returns_ma_window", self.returns_ma_window),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(invalid(field, "must be positive"));
            }
        }
        if self.macd_fast >= self.macd_slow {
            return Err(invalid(
                "macd_fast",
                format!(
                    "fast period {} must be below slow period {}",
                    self.macd_fast, self.macd_slow
                ),
            ));
        }
        if self.std_window < 2 {
            return Err(invalid("std_window", "must be at least 2"));
        }
        if !self.bollinger_multiplier.is_finite() || self.bollinger_multiplier < 0.0 {
            return Err(invalid(
                "bollinger_multiplier",
                "must be a non-negative number",
            ));
        }
        Ok(())
    }
}

/// Runs the indicator stages in a fixed order over an owned table.
#[derive(Debug, Clone, Default)]
pub struct IndicatorPipeline {
    settings: IndicatorSettings,
}

impl IndicatorPipeline {
    pub fn new(settings: IndicatorSettings) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &IndicatorSettings {
        &self.settings
    }

    /// Returns, then its moving average, then the default battery.
    pub fn run(&self, table: PriceTable) -> Result<PriceTable, TableError> {
        let table = self.returns(table)?;
        let table = self.returns_ma(table)?;
        self.default_metrics(table)
    }

    pub fn returns(&self, table: PriceTable) -> Result<PriceTable, TableError> {
        super::returns(table)
    }

    /// Append `Returns_MA_{window}`.
    pub fn returns_ma(&self, mut table: PriceTable) -> Result<PriceTable, TableError> {
        apply(&mut table, &Sma::new(self.settings.returns_ma_window), RETURNS)?;
        Ok(table)
    }

    /// Moving averages, EMAs, MACD, the rolling std of a moving average,
    /// Bollinger bands and RSI, all against `Close`, in that order.
    pub fn default_metrics(&self, mut table: PriceTable) -> Result<PriceTable, TableError> {
        let s = &self.settings;
        let before = table.width();

        for &window in &s.ma_windows {
            apply(&mut table, &Sma::new(window), CLOSE)?;
        }
        for &window in &s.ema_windows {
            apply(&mut table, &Ema::new(window), CLOSE)?;
        }
        for line in Macd::lines(s.macd_fast, s.macd_slow, s.macd_signal) {
            apply(&mut table, &line, CLOSE)?;
        }

        let std_source = Sma::new(s.std_ma_window);
        let std_source_name = super::output_name(CLOSE, &std_source);
        if !table.has_column(&std_source_name) {
            apply(&mut table, &std_source, CLOSE)?;
        }
        apply(&mut table, &RollingStd::new(s.std_window), &std_source_name)?;

        apply(
            &mut table,
            &Bollinger::upper(s.bollinger_period, s.bollinger_multiplier),
            CLOSE,
        )?;
        apply(
            &mut table,
            &Bollinger::lower(s.bollinger_period, s.bollinger_multiplier),
            CLOSE,
        )?;
        apply(&mut table, &Rsi::new(s.rsi_period), CLOSE)?;

        tracing::debug!(
            columns_added = table.width().saturating_sub(before),
            rows = table.height(),
            "default metrics computed"
        );
        Ok(table)
    }

    /// Every column name `run` writes, in write order.
    pub fn output_columns(&self) -> Vec<String> {
        let s = &self.settings;
        let mut names = vec![
            RETURNS.to_string(),
            super::output_name(RETURNS, &Sma::new(s.returns_ma_window)),
        ];
        let close: Vec<Box<dyn Indicator>> = s
            .ma_windows
            .iter()
            .map(|&w| Box::new(Sma::new(w)) as Box<dyn Indicator>)
            .chain(
                s.ema_windows
                    .iter()
                    .map(|&w| Box::new(Ema::new(w)) as Box<dyn Indicator>),
            )
            .chain(
                Macd::lines(s.macd_fast, s.macd_slow, s.macd_signal)
                    .into_iter()
                    .map(|l| Box::new(l) as Box<dyn Indicator>),
            )
            .collect();
        names.extend(close.iter().map(|i| super::output_name(CLOSE, i.as_ref())));

        let std_source_name = super::output_name(CLOSE, &Sma::new(s.std_ma_window));
        if !names.contains(&std_source_name) {
            names.push(std_source_name.clone());
        }
        names.push(super::output_name(&std_source_name, &RollingStd::new(s.std_window)));
        names.push(super::output_name(
            CLOSE,
            &Bollinger::upper(s.bollinger_period, s.bollinger_multiplier),
        ));
        names.push(super::output_name(
            CLOSE,
            &Bollinger::lower(s.bollinger_period, s.bollinger_multiplier),
        ));
        names.push(super::output_name(CLOSE, &Rsi::new(s.rsi_period)));
        names
    }
}
