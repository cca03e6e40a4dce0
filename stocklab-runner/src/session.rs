//! Single-stock session: wires together fetch, cleaning, and indicators.
//!
//! Two workflows:
//! - `new_analysis()`: fetch the full window, clean, compute indicators.
//! - `update()`: fetch again, append after the rows already held, and rerun
//!   the same pipeline over the concatenation.
//!
//! The session only replaces its table once a workflow has fully succeeded;
//! on error the previous table is still there.

use chrono::NaiveDate;
use thiserror::Error;

use stocklab_core::clean::{normalize_calendar, repair_unit_jumps, CalendarError, RepairError};
use stocklab_core::data::{fetch_table, resolve_start, DataError, DataProvider, YahooProvider};
use stocklab_core::domain::{PriceTable, TableError, Ticker, CANONICAL_COLUMNS};
use stocklab_core::indicators::IndicatorPipeline;

use crate::config::{ConfigError, SessionConfig};

/// Errors from the session workflows.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] DataError),
    #[error("repair failed: {0}")]
    Repair(#[from] RepairError),
    #[error("calendar normalization failed: {0}")]
    Calendar(#[from] CalendarError),
    #[error("table error: {0}")]
    Table(#[from] TableError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// One stock's price history and the workflows that produce it.
pub struct StockSession {
    ticker: Ticker,
    start_date: Option<NaiveDate>,
    table: PriceTable,
    provider: Box<dyn DataProvider>,
    config: SessionConfig,
    pipeline: IndicatorPipeline,
}

impl std::fmt::Debug for StockSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockSession")
            .field("ticker", &self.ticker)
            .field("start_date", &self.start_date)
            .field("rows", &self.table.height())
            .field("provider", &self.provider.name())
            .finish()
    }
}

impl StockSession {
    /// Create a session. `ticker` is in the internal form (`BARC_L`) and is
    /// normalized once here. `table` seeds the session for a later `update()`.
    pub fn new(
        ticker: &str,
        start_date: Option<NaiveDate>,
        table: Option<PriceTable>,
        provider: Box<dyn DataProvider>,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let pipeline =
            IndicatorPipeline::new(config.indicators.clone()).map_err(ConfigError::from)?;
        let ticker = Ticker::normalize(ticker);
        tracing::debug!(ticker = %ticker, provider = provider.name(), "session created");
        Ok(Self {
            ticker,
            start_date,
            table: table.unwrap_or_default(),
            provider,
            pipeline,
            config,
        })
    }

    /// Session backed by Yahoo Finance, configured from `config.provider`.
    pub fn with_yahoo(
        ticker: &str,
        start_date: Option<NaiveDate>,
        table: Option<PriceTable>,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let provider = YahooProvider::new(config.provider.clone())?;
        Self::new(ticker, start_date, table, Box::new(provider), config)
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn table(&self) -> &PriceTable {
        &self.table
    }

    pub fn into_table(self) -> PriceTable {
        self.table
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Fetch `[start, today]` and replace the held table with the raw result.
    pub fn download(&mut self) -> Result<&PriceTable, SessionError> {
        self.download_until(today())
    }

    /// Like [`StockSession::download`] with an explicit end date.
    pub fn download_until(&mut self, end: NaiveDate) -> Result<&PriceTable, SessionError> {
        self.table = self.fetch(end)?;
        Ok(&self.table)
    }

    /// Optional cleaning, then returns, returns MA and the default metrics.
    pub fn process(&self, table: PriceTable, clean: bool) -> Result<PriceTable, SessionError> {
        let table = if clean {
            let (table, repair) = repair_unit_jumps(table)?;
            let (table, calendar) = normalize_calendar(table)?;
            tracing::debug!(
                ticker = %self.ticker,
                corrections = repair.total_corrections(),
                rows_inserted = calendar.rows_inserted,
                "table cleaned"
            );
            table
        } else {
            table
        };
        Ok(self.pipeline.run(table)?)
    }

    /// Run [`StockSession::process`] over the held table.
    pub fn pre_process(&mut self, clean: bool) -> Result<&PriceTable, SessionError> {
        self.table = self.process(self.table.clone(), clean)?;
        Ok(&self.table)
    }

    /// Fetch the full window, clean it and compute every indicator.
    pub fn new_analysis(&mut self) -> Result<&PriceTable, SessionError> {
        self.new_analysis_until(today())
    }

    pub fn new_analysis_until(&mut self, end: NaiveDate) -> Result<&PriceTable, SessionError> {
        let fetched = self.fetch(end)?;
        self.table = self.process(fetched, true)?;
        tracing::info!(ticker = %self.ticker, rows = self.table.height(), "new analysis complete");
        Ok(&self.table)
    }

    /// Fetch again, append the fresh rows after the held ones and rerun the
    /// pipeline. Indicator columns are recomputed over the whole history.
    pub fn update(&mut self) -> Result<&PriceTable, SessionError> {
        self.update_until(today())
    }

    pub fn update_until(&mut self, end: NaiveDate) -> Result<&PriceTable, SessionError> {
        let fresh = self.fetch(end)?;
        let old_rows = self.table.height();
        let fresh_rows = fresh.height();

        let combined = concat_for_update(self.table.clone(), fresh)?;
        tracing::debug!(
            ticker = %self.ticker,
            old_rows,
            fresh_rows,
            combined_rows = combined.height(),
            "history concatenated"
        );

        self.table = self.process(combined, true)?;
        tracing::info!(ticker = %self.ticker, rows = self.table.height(), "update complete");
        Ok(&self.table)
    }

    fn fetch(&self, end: NaiveDate) -> Result<PriceTable, DataError> {
        let start = resolve_start(self.start_date, end, self.config.lookback_days);
        fetch_table(self.provider.as_ref(), &self.ticker, start, end)
    }
}

/// Old rows (canonical columns only) followed by every fresh row.
///
/// Nothing is de-duplicated here: `N` old and `M` fresh rows give `N + M`.
/// An old table without columns contributes nothing.
pub fn concat_for_update(old: PriceTable, fresh: PriceTable) -> Result<PriceTable, TableError> {
    if old.width() == 0 {
        return Ok(fresh);
    }
    old.select(&CANONICAL_COLUMNS)?.concat(fresh)
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use stocklab_core::domain::{CLOSE, RETURNS};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn canonical(start: &str, n: usize, close: f64) -> PriceTable {
        let dates = (0..n)
            .map(|i| d(start) + Duration::days(i as i64))
            .collect();
        let mut t = PriceTable::new(dates);
        for name in CANONICAL_COLUMNS {
            t.insert_column(name, vec![close; n]).unwrap();
        }
        t
    }

    #[test]
    fn concat_strips_derived_columns_and_keeps_all_rows() {
        let old = canonical("2024-01-01", 4, 100.0)
            .with_column(RETURNS, vec![1.0; 4])
            .unwrap();
        let fresh = canonical("2024-01-03", 3, 101.0);

        let combined = concat_for_update(old, fresh).unwrap();
        assert_eq!(combined.height(), 7);
        assert!(!combined.has_column(RETURNS));
        assert_eq!(combined.column(CLOSE).unwrap()[4], 101.0);
    }

    #[test]
    fn concat_onto_empty_session_is_fresh() {
        let fresh = canonical("2024-01-03", 3, 101.0);
        let combined = concat_for_update(PriceTable::default(), fresh.clone()).unwrap();
        assert_eq!(combined, fresh);
    }

    #[test]
    fn concat_requires_canonical_old_columns() {
        let old = PriceTable::new(vec![d("2024-01-01")])
            .with_column(CLOSE, vec![1.0])
            .unwrap();
        assert!(matches!(
            concat_for_update(old, canonical("2024-01-02", 1, 1.0)),
            Err(TableError::MissingColumn(_))
        ));
    }
}
