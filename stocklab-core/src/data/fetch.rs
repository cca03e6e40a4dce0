//! Fetch boundary: provider bars in, canonical `PriceTable` out.

use super::provider::{DataError, DataProvider, RawBar};
use crate::domain::{PriceTable, Ticker, ADJUSTED_CLOSE, CLOSE, HIGH, LOW, OPEN, VOLUME};
use chrono::{Duration, NaiveDate};

/// Default history window when no start date is given (roughly five years).
pub const DEFAULT_LOOKBACK_DAYS: i64 = 1825;

/// Start of the fetch window: the explicit date, or `today - lookback_days`.
pub fn resolve_start(start: Option<NaiveDate>, today: NaiveDate, lookback_days: i64) -> NaiveDate {
    start.unwrap_or_else(|| today - Duration::days(lookback_days))
}

/// Fetch `[start, end]` for `ticker` and build the canonical six-column table.
///
/// Rows come back sorted ascending by date. An empty provider answer is an error.
pub fn fetch_table(
    provider: &dyn DataProvider,
    ticker: &Ticker,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PriceTable, DataError> {
    if start > end {
        return Err(DataError::InvalidRange { start, end });
    }

    let result = provider.fetch(ticker.as_str(), start, end)?;
    let mut bars = result.bars;
    if bars.is_empty() {
        return Err(DataError::EmptyResponse {
            symbol: ticker.to_string(),
        });
    }
    bars.sort_by_key(|b| b.date);

    let table = bars_to_table(&bars)?;
    tracing::info!(
        ticker = %ticker,
        provider = provider.name(),
        rows = table.height(),
        %start,
        %end,
        "fetched price history"
    );
    Ok(table)
}

/// Map bars onto `Open, High, Low, Close, AdjustedClose, Volume` in that order.
fn bars_to_table(bars: &[RawBar]) -> Result<PriceTable, DataError> {
    let field = |f: fn(&RawBar) -> f64| bars.iter().map(f).collect::<Vec<f64>>();

    let dates = bars.iter().map(|b| b.date).collect();
    let columns: [(&str, Vec<f64>); 6] = [
        (OPEN, field(|b| b.open)),
        (HIGH, field(|b| b.high)),
        (LOW, field(|b| b.low)),
        (CLOSE, field(|b| b.close)),
        (ADJUSTED_CLOSE, field(|b| b.adj_close)),
        (VOLUME, field(|b| b.volume)),
    ];

    let mut table = PriceTable::new(dates);
    for (name, values) in columns {
        table
            .insert_column(name, values)
            .map_err(|e| DataError::Other(e.to_string()))?;
    }
    Ok(table)
}
