//! Market-data acquisition

pub mod fetch;
pub mod provider;
pub mod yahoo;

pub use fetch::{fetch_table, resolve_start, DEFAULT_LOOKBACK_DAYS};
pub use provider::{DataError, DataProvider, DataSource, FetchResult, RawBar, StaticProvider};
pub use yahoo::{ProviderSettings, YahooProvider};
