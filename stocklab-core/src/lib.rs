//! StockLab Core: price acquisition, cleaning and indicators for a single stock.
//!
//! This crate contains:
//! - Domain types (`Ticker`, `PriceTable`)
//! - The market-data provider seam and the Yahoo Finance backend
//! - Unit-jump repair and business-day calendar normalization
//! - Indicators and the fixed-order indicator pipeline
//!
//! Every stage takes the table by value and returns it, so exactly one owner
//! holds the data at any point.

pub mod clean;
pub mod data;
pub mod domain;
pub mod indicators;
