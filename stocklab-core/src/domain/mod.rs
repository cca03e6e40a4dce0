//! Domain types: the price table and the normalized ticker.

pub mod table;
pub mod ticker;

pub use table::{
    PriceTable, TableError, ADJUSTED_CLOSE, CANONICAL_COLUMNS, CLOSE, DATE, HIGH, LOW, OPEN,
    PRICE_COLUMNS, RETURNS, VOLUME,
};
pub use ticker::Ticker;
