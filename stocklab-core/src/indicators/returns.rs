//! Cumulative returns: the growth of one unit held since the first row.

use crate::domain::{PriceTable, TableError, ADJUSTED_CLOSE, RETURNS};

/// `cumprod(1 + pct_change(values))` with the first entry forced to 1.
///
/// Each change is measured against the last valid value, so a missing cell
/// holds the running level and the growth across it is kept. Rows before the
/// first valid value after row 0 are `NaN`.
pub fn cumulative_returns(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut level = 1.0;
    let mut last_valid: Option<f64> = None;

    for (i, &v) in values.iter().enumerate() {
        let prev = last_valid;
        if !v.is_nan() {
            last_valid = Some(v);
        }
        if i == 0 {
            out.push(1.0);
            continue;
        }
        match prev {
            None => out.push(f64::NAN),
            Some(_) if v.is_nan() => out.push(level),
            Some(p) => {
                level *= v / p;
                out.push(level);
            }
        }
    }

    out
}

/// Write the cumulative returns of `AdjustedClose` to the `Returns` column.
///
/// An existing `Returns` column is overwritten where it stands, so rerunning
/// on a processed table gives the same table.
pub fn returns(mut table: PriceTable) -> Result<PriceTable, TableError> {
    let values = cumulative_returns(table.require(ADJUSTED_CLOSE)?);
    table.insert_column(RETURNS, values)?;
    Ok(table)
}
