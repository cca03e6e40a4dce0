//! Yahoo Finance data provider.
//!
//! Fetches daily OHLCV bars from Yahoo's v8 chart API and maps HTTP failures
//! onto `DataError`. Retries are off unless configured.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.

use super::provider::{DataError, DataProvider, DataSource, FetchResult, RawBar};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

/// HTTP settings for the Yahoo provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Extra attempts after the first failure. Zero means a single request.
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            timeout_secs: 30,
            max_retries: 0,
            retry_delay_ms: 500,
        }
    }
}

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    settings: ProviderSettings,
}

impl YahooProvider {
    pub fn new(settings: ProviderSettings) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, settings })
    }

    /// Build the chart API URL for a symbol and date range.
    fn chart_url(base_url: &str, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
            .timestamp()
            + 86_399;
        format!(
            "{base_url}/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval=1d\
             &includeAdjustedClose=true"
        )
    }

    /// Parse the chart API response into RawBars.
    ///
    /// All six fields must be present in the payload; a missing series is a
    /// schema mismatch, not a row of NaNs.
    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Vec<RawBar>, DataError> {
        let result = resp.chart.result.ok_or_else(|| {
            if let Some(err) = resp.chart.error {
                if err.code == "Not Found" {
                    DataError::SymbolNotFound {
                        symbol: symbol.to_string(),
                    }
                } else {
                    DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
                }
            } else {
                DataError::ResponseFormatChanged("empty result with no error".into())
            }
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        let timestamps = data.timestamp.ok_or_else(|| DataError::EmptyResponse {
            symbol: symbol.to_string(),
        })?;

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let missing = |field: &str| DataError::SchemaMismatch {
            symbol: symbol.to_string(),
            field: field.to_string(),
        };
        let open = quote.open.ok_or_else(|| missing("open"))?;
        let high = quote.high.ok_or_else(|| missing("high"))?;
        let low = quote.low.ok_or_else(|| missing("low"))?;
        let close = quote.close.ok_or_else(|| missing("close"))?;
        let volume = quote.volume.ok_or_else(|| missing("volume"))?;
        let adj_close = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose)
            .ok_or_else(|| missing("adjclose"))?;

        let cell = |series: &[Option<f64>], i: usize| series.get(i).copied().flatten();

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let row = [
                cell(&open, i),
                cell(&high, i),
                cell(&low, i),
                cell(&close, i),
                cell(&adj_close, i),
                cell(&volume, i),
            ];

            // Skip rows where every field is empty (holidays/non-trading days)
            if row.iter().all(Option::is_none) {
                continue;
            }

            let [open, high, low, close, adj_close, volume] = row.map(|v| v.unwrap_or(f64::NAN));
            bars.push(RawBar {
                date,
                open,
                high,
                low,
                close,
                adj_close,
                volume,
            });
        }

        if bars.is_empty() {
            return Err(DataError::EmptyResponse {
                symbol: symbol.to_string(),
            });
        }

        Ok(bars)
    }

    /// Execute the HTTP request, retrying transient failures up to `max_retries` times.
    fn fetch_with_retry(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawBar>, DataError> {
        let url = Self::chart_url(&self.settings.base_url, symbol, start, end);
        let base_delay = Duration::from_millis(self.settings.retry_delay_ms);
        let mut last_error = None;

        for attempt in 0..=self.settings.max_retries {
            if attempt > 0 {
                let delay = base_delay * 2u32.pow(attempt - 1);
                tracing::debug!(symbol, attempt, ?delay, "retrying Yahoo request");
                std::thread::sleep(delay);
            }

            match self.client.get(&url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(DataError::SymbolNotFound {
                            symbol: symbol.to_string(),
                        });
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        last_error = Some(DataError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if status == reqwest::StatusCode::UNAUTHORIZED
                        || status == reqwest::StatusCode::FORBIDDEN
                    {
                        return Err(DataError::AuthenticationRequired(format!(
                            "Yahoo Finance refused the request (HTTP {status})"
                        )));
                    }

                    if !status.is_success() {
                        last_error = Some(DataError::Other(format!("HTTP {status} for {symbol}")));
                        continue;
                    }

                    let chart: ChartResponse = resp.json().map_err(|e| {
                        DataError::ResponseFormatChanged(format!(
                            "failed to parse response for {symbol}: {e}"
                        ))
                    })?;

                    return Self::parse_response(symbol, chart);
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(DataError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let bars = self.fetch_with_retry(symbol, start, end)?;
        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars,
            source: DataSource::YahooFinance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART_JSON: &str = r#"{
        "chart": {
            "result": [{
                "timestamp": [1704182400, 1704268800, 1704355200, 1704441600],
                "indicators": {
                    "quote": [{
                        "open":   [150.2, null, 1.52, 151.0],
                        "high":   [152.0, null, 1.55, 153.1],
                        "low":    [149.8, null, 1.50, 150.2],
                        "close":  [151.0, null, 1.53, 152.4],
                        "volume": [1200000, null, 980000, 1100000]
                    }],
                    "adjclose": [{ "adjclose": [140.1, null, 1.42, 141.5] }]
                }
            }],
            "error": null
        }
    }"#;

    fn parse(json: &str) -> Result<Vec<RawBar>, DataError> {
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        YahooProvider::parse_response("BARC.L", resp)
    }

    #[test]
    fn parses_bars_and_skips_empty_rows() {
        let bars = parse(CHART_JSON).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[0].adj_close, 140.1);
        assert_eq!(bars[0].volume, 1_200_000.0);
        // The pence/pound defect is passed through untouched; repair happens later.
        assert_eq!(bars[1].close, 1.53);
        assert_eq!(bars[2].date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
    }

    #[test]
    fn partial_row_keeps_nan_for_missing_fields() {
        let json = CHART_JSON.replace("[151.0, null, 1.53, 152.4]", "[null, null, 1.53, 152.4]");
        let bars = parse(&json).unwrap();
        assert!(bars[0].close.is_nan());
        assert_eq!(bars[0].open, 150.2);
    }

    #[test]
    fn missing_adjclose_is_schema_mismatch() {
        let json = CHART_JSON.replace(
            r#""adjclose": [{ "adjclose": [140.1, null, 1.42, 141.5] }]"#,
            r#""adjclose": null"#,
        );
        match parse(&json) {
            Err(DataError::SchemaMismatch { field, .. }) => assert_eq!(field, "adjclose"),
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn missing_quote_series_is_schema_mismatch() {
        let json = CHART_JSON.replace(r#""volume": [1200000, null, 980000, 1100000]"#, r#""volume": null"#);
        assert!(matches!(
            parse(&json),
            Err(DataError::SchemaMismatch { field, .. }) if field == "volume"
        ));
    }

    #[test]
    fn not_found_error_maps_to_symbol_not_found() {
        let json = r#"{"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found"}}}"#;
        assert!(matches!(parse(json), Err(DataError::SymbolNotFound { .. })));
    }

    #[test]
    fn no_timestamps_is_empty_response() {
        let json = r#"{"chart": {"result": [{"indicators": {"quote": [{}], "adjclose": null}}], "error": null}}"#;
        assert!(matches!(parse(json), Err(DataError::EmptyResponse { .. })));
    }

    #[test]
    fn chart_url_covers_whole_end_day() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let url = YahooProvider::chart_url(DEFAULT_BASE_URL, "BARC.L", start, end);
        assert!(url.starts_with("https://query2.finance.yahoo.com/v8/finance/chart/BARC.L?"));
        assert!(url.contains("period1=1704153600"));
        assert!(url.contains("period2=1704326399"));
        assert!(url.contains("interval=1d"));
    }

    #[test]
    fn default_settings_do_not_retry() {
        let settings = ProviderSettings::default();
        assert_eq!(settings.max_retries, 0);
        assert_eq!(settings.timeout_secs, 30);
    }
}
