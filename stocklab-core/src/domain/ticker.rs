//! Ticker: provider-facing stock identifier.
//!
//! Internal identifiers are stored in a database-safe form (`BARC_L`, `VOD2_L`).
//! The market-data provider expects the exchange suffix after a dot and no
//! embedded digits (`BARC.L`, `VOD.L`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator used by internal (database-safe) identifiers.
pub const DB_SEPARATOR: char = '_';

/// Exchange-suffix separator expected by the provider.
pub const PROVIDER_SEPARATOR: char = '.';

/// Normalized, immutable ticker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ticker(String);

impl Ticker {
    /// Map an internal identifier onto the provider format.
    ///
    /// Every `_` becomes `.` and every numeric character (any script) is
    /// removed. Never fails.
    pub fn normalize(raw: &str) -> Self {
        let symbol = raw
            .chars()
            .filter(|c| !c.is_numeric())
            .map(|c| if c == DB_SEPARATOR { PROVIDER_SEPARATOR } else { c })
            .collect();
        Self(symbol)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Ticker {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
