//! StockLab Runner: single-stock session orchestration.
//!
//! This crate builds on `stocklab-core` to provide:
//! - `SessionConfig`, loaded from TOML with defaults for every field
//! - `StockSession`, running the new-analysis and incremental-update workflows

pub mod config;
pub mod session;

pub use config::{ConfigError, SessionConfig};
pub use session::{concat_for_update, SessionError, StockSession};
