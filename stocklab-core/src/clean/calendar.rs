//! Business-day calendar normalization.
//!
//! Reindexes a table onto every Monday–Friday between its first and last
//! date and fills the gaps column-wise by linear interpolation over calendar
//! days. Weekend rows are dropped before interpolating, so they never serve as
//! anchors.

use crate::domain::{PriceTable, TableError};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("calendar normalization needs at least 2 distinct dates, got {rows}")]
    TooFewRows { rows: usize },

    #[error("no weekdays between {first} and {last}")]
    NoWeekdays { first: NaiveDate, last: NaiveDate },

    #[error("column '{column}' has no weekday values to interpolate from")]
    EmptyColumn { column: String },

    #[error(transparent)]
    Table(#[from] TableError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CalendarReport {
    pub input_rows: usize,
    pub output_rows: usize,
    /// Rows discarded because a later row carried the same date.
    pub duplicates_collapsed: usize,
    pub weekend_rows_dropped: usize,
    pub rows_inserted: usize,
    /// Interior cells filled by interpolation.
    pub cells_interpolated: usize,
    /// Leading or trailing cells filled with the nearest known value.
    pub edge_cells_held: usize,
}

pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Every weekday in `[first, last]`.
pub fn weekdays_between(first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
    first
        .iter_days()
        .take_while(|d| *d <= last)
        .filter(|d| is_weekday(*d))
        .collect()
}

/// Normalize `table` onto the business-day calendar spanning its dates.
///
/// Rows are sorted by date first. When a date occurs more than once the last
/// occurrence wins. Leading and trailing gaps (nothing to interpolate
/// between) hold the nearest known value.
pub fn normalize_calendar(table: PriceTable) -> Result<(PriceTable, CalendarReport), CalendarError> {
    let mut report = CalendarReport {
        input_rows: table.height(),
        ..CalendarReport::default()
    };

    // date -> row of its last occurrence
    let mut rows: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for (row, &date) in table.dates().iter().enumerate() {
        rows.insert(date, row);
    }
    report.duplicates_collapsed = table.height() - rows.len();
    if report.duplicates_collapsed > 0 {
        tracing::warn!(
            duplicates = report.duplicates_collapsed,
            "duplicate dates collapsed, keeping last occurrence"
        );
    }

    let (first, last) = match (rows.keys().next(), rows.keys().next_back()) {
        (Some(&first), Some(&last)) if rows.len() >= 2 => (first, last),
        _ => return Err(CalendarError::TooFewRows { rows: rows.len() }),
    };

    let weekend_rows: Vec<NaiveDate> = rows.keys().copied().filter(|d| !is_weekday(*d)).collect();
    report.weekend_rows_dropped = weekend_rows.len();
    for date in &weekend_rows {
        rows.remove(date);
    }

    let calendar = weekdays_between(first, last);
    if calendar.is_empty() {
        return Err(CalendarError::NoWeekdays { first, last });
    }
    report.output_rows = calendar.len();
    report.rows_inserted = calendar.len() - rows.len();

    let source_rows: Vec<Option<usize>> = calendar.iter().map(|d| rows.get(d).copied()).collect();
    let x: Vec<f64> = calendar
        .iter()
        .map(|d| (*d - first).num_days() as f64)
        .collect();

    let names: Vec<String> = table.column_names().map(String::from).collect();
    let mut out = PriceTable::new(calendar);
    for name in names {
        let src = table.require(&name)?;
        let mut values: Vec<f64> = source_rows
            .iter()
            .map(|row| row.map_or(f64::NAN, |r| src[r]))
            .collect();

        let filled = interpolate(&x, &mut values).ok_or_else(|| CalendarError::EmptyColumn {
            column: name.clone(),
        })?;
        report.cells_interpolated += filled.interior;
        report.edge_cells_held += filled.edges;
        out.insert_column(name, values)?;
    }

    if report.edge_cells_held > 0 {
        tracing::warn!(
            cells = report.edge_cells_held,
            "leading/trailing gaps held at nearest value"
        );
    }
    tracing::debug!(
        input_rows = report.input_rows,
        output_rows = report.output_rows,
        rows_inserted = report.rows_inserted,
        weekend_rows_dropped = report.weekend_rows_dropped,
        cells_interpolated = report.cells_interpolated,
        "calendar normalized"
    );

    Ok((out, report))
}

struct Filled {
    interior: usize,
    edges: usize,
}

/// Fill `NaN`s in `y` by linear interpolation over `x`.
///
/// Returns `None` when `y` holds no finite value at all.
fn interpolate(x: &[f64], y: &mut [f64]) -> Option<Filled> {
    let known: Vec<usize> = (0..y.len()).filter(|&i| !y[i].is_nan()).collect();
    let (&head, &tail) = (known.first()?, known.last()?);
    let mut filled = Filled {
        interior: 0,
        edges: 0,
    };

    let (first, last) = (y[head], y[tail]);
    y[..head].fill(first);
    y[tail + 1..].fill(last);
    filled.edges = head + (y.len() - tail - 1);

    for pair in known.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if b - a < 2 {
            continue;
        }
        let slope = (y[b] - y[a]) / (x[b] - x[a]);
        for i in a + 1..b {
            y[i] = y[a] + slope * (x[i] - x[a]);
            filled.interior += 1;
        }
    }

    Some(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CLOSE, VOLUME};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn table(rows: &[(&str, f64)]) -> PriceTable {
        PriceTable::new(rows.iter().map(|(date, _)| d(date)).collect())
            .with_column(CLOSE, rows.iter().map(|(_, v)| *v).collect())
            .unwrap()
    }

    #[test]
    fn inserts_missing_weekdays_and_interpolates_by_calendar_day() {
        // Thu, Mon: Fri is missing and sits 1 of 4 calendar days along.
        let (t, report) = normalize_calendar(table(&[("2024-01-04", 100.0), ("2024-01-08", 140.0)])).unwrap();
        assert_eq!(t.dates(), &[d("2024-01-04"), d("2024-01-05"), d("2024-01-08")]);
        assert_eq!(t.column(CLOSE).unwrap(), &[100.0, 110.0, 140.0]);
        assert_eq!(report.rows_inserted, 1);
        assert_eq!(report.cells_interpolated, 1);
    }

    #[test]
    fn weekend_rows_are_dropped() {
        let (t, report) = normalize_calendar(table(&[
            ("2024-01-05", 10.0),
            ("2024-01-06", 99.0),
            ("2024-01-08", 20.0),
        ]))
        .unwrap();
        assert_eq!(t.dates(), &[d("2024-01-05"), d("2024-01-08")]);
        assert_eq!(t.column(CLOSE).unwrap(), &[10.0, 20.0]);
        assert_eq!(report.weekend_rows_dropped, 1);
        assert_eq!(report.rows_inserted, 0);
    }

    #[test]
    fn weekend_edges_are_held_at_nearest_weekday() {
        // Sun .. Tue .. Sat: Mon and Wed-Fri have no anchor on one side.
        let (t, report) = normalize_calendar(table(&[
            ("2024-01-07", 1.0),
            ("2024-01-09", 5.0),
            ("2024-01-13", 9.0),
        ]))
        .unwrap();
        assert_eq!(t.height(), 5);
        assert!(t.column(CLOSE).unwrap().iter().all(|v| *v == 5.0));
        assert_eq!(report.edge_cells_held, 4);
    }

    #[test]
    fn unsorted_input_is_sorted_and_last_duplicate_wins() {
        let (t, report) = normalize_calendar(table(&[
            ("2024-01-03", 30.0),
            ("2024-01-02", 20.0),
            ("2024-01-03", 33.0),
        ]))
        .unwrap();
        assert_eq!(t.dates(), &[d("2024-01-02"), d("2024-01-03")]);
        assert_eq!(t.column(CLOSE).unwrap(), &[20.0, 33.0]);
        assert_eq!(report.duplicates_collapsed, 1);
    }

    #[test]
    fn interior_nan_is_interpolated() {
        let (t, _) = normalize_calendar(table(&[
            ("2024-01-01", 1.0),
            ("2024-01-02", f64::NAN),
            ("2024-01-03", 3.0),
        ]))
        .unwrap();
        assert_eq!(t.column(CLOSE).unwrap(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn every_column_is_normalized() {
        let t = table(&[("2024-01-01", 1.0), ("2024-01-03", 3.0)])
            .with_column(VOLUME, vec![100.0, 300.0])
            .unwrap();
        let (t, _) = normalize_calendar(t).unwrap();
        assert_eq!(t.column(VOLUME).unwrap(), &[100.0, 200.0, 300.0]);
    }

    #[test]
    fn degenerate_inputs_are_rejected() {
        assert!(matches!(
            normalize_calendar(PriceTable::default()),
            Err(CalendarError::TooFewRows { rows: 0 })
        ));
        assert!(matches!(
            normalize_calendar(table(&[("2024-01-02", 1.0)])),
            Err(CalendarError::TooFewRows { rows: 1 })
        ));
        assert!(matches!(
            normalize_calendar(table(&[("2024-01-02", 1.0), ("2024-01-02", 2.0)])),
            Err(CalendarError::TooFewRows { rows: 1 })
        ));
        assert!(matches!(
            normalize_calendar(table(&[("2024-01-06", 1.0), ("2024-01-07", 2.0)])),
            Err(CalendarError::NoWeekdays { .. })
        ));
    }

    #[test]
    fn all_nan_column_is_rejected() {
        let t = table(&[("2024-01-01", f64::NAN), ("2024-01-02", f64::NAN)]);
        assert!(matches!(
            normalize_calendar(t),
            Err(CalendarError::EmptyColumn { column }) if column == CLOSE
        ));
    }
}
