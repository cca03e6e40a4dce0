//! Unit-jump repair.
//!
//! Some feeds switch between pounds and pence (or any 100x sub-unit) without
//! notice. A single left-to-right pass over each price column detects the
//! jumps from the ratio of consecutive values and rescales the offending side:
//!
//! - `next / current < 0.1`: the next value dropped into the small unit, so it
//!   is multiplied by 100 (forward fix).
//! - `next / current > 10`: everything up to and including `current` was in
//!   the small unit, so that whole prefix is multiplied by 100 (backtrack).
//!
//! Later comparisons see earlier corrections, so corrections can cascade.
//! Missing (`NaN`) cells are stepped over: each value is compared with the
//! last valid value before it.

use crate::domain::{PriceTable, TableError, PRICE_COLUMNS};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

/// Scale between the large and small currency unit.
pub const CORRECTION_FACTOR: f64 = 100.0;

/// Ratios strictly below this trigger a forward fix.
pub const DROP_THRESHOLD: f64 = 0.1;

/// Ratios strictly above this trigger a backtracking repair.
pub const JUMP_THRESHOLD: f64 = 10.0;

#[derive(Debug, Error)]
pub enum RepairError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error("column '{column}' has non-positive value {value} on {date}")]
    NonPositiveValue {
        column: String,
        date: NaiveDate,
        value: f64,
    },

    #[error("column '{column}' has non-finite value {value} on {date}")]
    NonFiniteValue {
        column: String,
        date: NaiveDate,
        value: f64,
    },

    #[error("backtracking repair of '{column}' failed at row {row}")]
    Backtrack { column: String, row: usize },
}

/// Corrections applied to a single column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnRepair {
    pub column: String,
    pub forward_fixes: usize,
    pub backtracks: usize,
    /// Total cells multiplied, counting a cell once per rescale.
    pub cells_rescaled: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub columns: Vec<ColumnRepair>,
}

impl RepairReport {
    /// Forward fixes plus backtracks over every column.
    pub fn total_corrections(&self) -> usize {
        self.columns
            .iter()
            .map(|c| c.forward_fixes + c.backtracks)
            .sum()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnRepair> {
        self.columns.iter().find(|c| c.column == name)
    }
}

/// Repair 100x unit jumps in `Open`, `High`, `Low`, `Close` and `AdjustedClose`.
///
/// `Volume` and derived columns are left alone. All five columns are repaired
/// into scratch buffers first; the table is only updated once every column
/// succeeded, so an error never leaves a partially corrected table behind.
///
/// Missing cells (`NaN`) never trigger a correction. Zero, negative and
/// infinite prices are rejected before any work is done.
pub fn repair_unit_jumps(mut table: PriceTable) -> Result<(PriceTable, RepairReport), RepairError> {
    let mut repaired = Vec::with_capacity(PRICE_COLUMNS.len());
    let mut report = RepairReport::default();

    for name in PRICE_COLUMNS {
        let values = table.require(name)?;
        validate(name, table.dates(), values)?;

        let mut scratch = values.to_vec();
        let stats = repair_column(name, &mut scratch)?;
        if stats.forward_fixes + stats.backtracks > 0 {
            tracing::debug!(
                column = name,
                forward_fixes = stats.forward_fixes,
                backtracks = stats.backtracks,
                cells_rescaled = stats.cells_rescaled,
                "unit jumps repaired"
            );
        }
        report.columns.push(stats);
        repaired.push((name, scratch));
    }

    for (name, values) in repaired {
        table.insert_column(name, values)?;
    }

    Ok((table, report))
}

fn validate(column: &str, dates: &[NaiveDate], values: &[f64]) -> Result<(), RepairError> {
    for (&date, &value) in dates.iter().zip(values) {
        if value.is_nan() {
            continue;
        }
        if value.is_infinite() {
            return Err(RepairError::NonFiniteValue {
                column: column.to_string(),
                date,
                value,
            });
        }
        if value <= 0.0 {
            return Err(RepairError::NonPositiveValue {
                column: column.to_string(),
                date,
                value,
            });
        }
    }
    Ok(())
}

/// Single pass over one column. Mutates `values` in place.
fn repair_column(column: &str, values: &mut [f64]) -> Result<ColumnRepair, RepairError> {
    let mut stats = ColumnRepair {
        column: column.to_string(),
        ..ColumnRepair::default()
    };

    let mut anchor: Option<usize> = None;
    for i in 0..values.len() {
        if values[i].is_nan() {
            continue;
        }
        if let Some(prev) = anchor {
            let ratio = values[i] / values[prev];
            if ratio < DROP_THRESHOLD {
                values[i] *= CORRECTION_FACTOR;
                stats.forward_fixes += 1;
                stats.cells_rescaled += 1;
            } else if ratio > JUMP_THRESHOLD {
                backtrack(values, prev).ok_or_else(|| RepairError::Backtrack {
                    column: column.to_string(),
                    row: prev,
                })?;
                stats.backtracks += 1;
                stats.cells_rescaled += prev + 1;
            }
        }
        anchor = Some(i);
    }

    Ok(stats)
}

/// Rescale rows `0..=through`.
fn backtrack(values: &mut [f64], through: usize) -> Option<()> {
    let prefix = values.get_mut(..=through)?;
    for v in prefix {
        *v *= CORRECTION_FACTOR;
    }
    Some(())
}
