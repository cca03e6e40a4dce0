//! PriceTable: the date-indexed table every pipeline stage works on.
//!
//! Columns are addressed by name only. Stages take the table by value and
//! hand back a new one, so exactly one owner holds it at any point.

use chrono::{Datelike, NaiveDate};
use polars::prelude::{Column as FrameColumn, DataFrame, DataType, NamedFrom, PolarsError, Series};
use thiserror::Error;

pub const OPEN: &str = "Open";
pub const HIGH: &str = "High";
pub const LOW: &str = "Low";
pub const CLOSE: &str = "Close";
pub const ADJUSTED_CLOSE: &str = "AdjustedClose";
pub const VOLUME: &str = "Volume";
pub const RETURNS: &str = "Returns";

/// Name of the index column in a polars frame.
pub const DATE: &str = "Date";

/// Canonical provider columns, in fetch order.
pub const CANONICAL_COLUMNS: [&str; 6] = [OPEN, HIGH, LOW, CLOSE, ADJUSTED_CLOSE, VOLUME];

/// Canonical columns holding prices (everything except volume).
pub const PRICE_COLUMNS: [&str; 5] = [OPEN, HIGH, LOW, CLOSE, ADJUSTED_CLOSE];

/// `NaiveDate::num_days_from_ce` of 1970-01-01 (polars `Date` is days since epoch).
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("column '{column}' has {actual} rows, table has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("cannot concatenate tables with different columns: {left:?} vs {right:?}")]
    ColumnMismatch {
        left: Vec<String>,
        right: Vec<String>,
    },

    #[error("frame conversion failed: {0}")]
    Frame(String),
}

impl From<PolarsError> for TableError {
    fn from(err: PolarsError) -> Self {
        TableError::Frame(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct NamedColumn {
    name: String,
    values: Vec<f64>,
}

/// Ordered, date-indexed table of named `f64` columns.
///
/// Missing cells are `f64::NAN`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    columns: Vec<NamedColumn>,
}

impl PriceTable {
    /// Empty table over the given index.
    pub fn new(dates: Vec<NaiveDate>) -> Self {
        Self {
            dates,
            columns: Vec::new(),
        }
    }

    /// Builder form of [`PriceTable::insert_column`].
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<Self, TableError> {
        self.insert_column(name, values)?;
        Ok(self)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.dates.len()
    }

    /// Number of columns (the date index is not counted).
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Like [`PriceTable::column`], but a missing column is an error.
    pub fn require(&self, name: &str) -> Result<&[f64], TableError> {
        self.column(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    /// Insert a column, replacing any existing column with the same name in place.
    pub fn insert_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), TableError> {
        let name = name.into();
        if values.len() != self.height() {
            return Err(TableError::LengthMismatch {
                column: name,
                expected: self.height(),
                actual: values.len(),
            });
        }
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.values = values,
            None => self.columns.push(NamedColumn { name, values }),
        }
        Ok(())
    }

    /// Remove every listed column that exists. Absent names are ignored.
    ///
    /// Returns how many columns were removed.
    pub fn drop_columns(&mut self, names: &[&str]) -> usize {
        let before = self.columns.len();
        self.columns.retain(|c| !names.contains(&c.name.as_str()));
        before - self.columns.len()
    }

    /// New table holding only the listed columns, in the listed order.
    pub fn select(&self, names: &[&str]) -> Result<PriceTable, TableError> {
        let mut out = PriceTable::new(self.dates.clone());
        for name in names {
            out.insert_column(*name, self.require(name)?.to_vec())?;
        }
        Ok(out)
    }

    /// Append `other`'s rows after this table's rows.
    ///
    /// Rows are not de-duplicated or re-sorted; the result has
    /// `self.height() + other.height()` rows. Both tables must carry the same
    /// column names. An empty table with no columns concatenates as identity.
    pub fn concat(self, other: PriceTable) -> Result<PriceTable, TableError> {
        if self.is_empty() && self.width() == 0 {
            return Ok(other);
        }
        if other.is_empty() && other.width() == 0 {
            return Ok(self);
        }

        let mut left: Vec<String> = self.column_names().map(String::from).collect();
        let mut right: Vec<String> = other.column_names().map(String::from).collect();
        left.sort();
        right.sort();
        if left != right {
            return Err(TableError::ColumnMismatch { left, right });
        }

        let PriceTable { mut dates, columns } = self;
        dates.extend_from_slice(&other.dates);

        let mut merged = Vec::with_capacity(columns.len());
        for mut column in columns {
            column.values.extend_from_slice(other.require(&column.name)?);
            merged.push(column);
        }

        Ok(PriceTable {
            dates,
            columns: merged,
        })
    }

    /// Convert into a polars frame: a `Date` column followed by one `Float64`
    /// column per table column.
    pub fn to_frame(&self) -> Result<DataFrame, TableError> {
        let days: Vec<i32> = self
            .dates
            .iter()
            .map(|d| d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
            .collect();
        let date = Series::new(DATE.into(), days).cast(&DataType::Date)?;

        let mut frame_columns = Vec::with_capacity(self.width() + 1);
        frame_columns.push(FrameColumn::from(date));
        for column in &self.columns {
            let series = Series::new(column.name.as_str().into(), column.values.as_slice());
            frame_columns.push(FrameColumn::from(series));
        }

        Ok(DataFrame::new(frame_columns)?)
    }

    /// Build a table from a polars frame with a `Date` column.
    ///
    /// Every other column is cast to `Float64`; nulls become `NaN`.
    pub fn from_frame(frame: &DataFrame) -> Result<PriceTable, TableError> {
        let date_column = frame
            .column(DATE)
            .map_err(|_| TableError::MissingColumn(DATE.to_string()))?;
        let day_numbers = date_column.cast(&DataType::Int32)?;

        let mut dates = Vec::with_capacity(frame.height());
        for day in day_numbers.i32()?.into_iter() {
            let day = day.ok_or_else(|| TableError::Frame("null date in index".into()))?;
            let date = NaiveDate::from_num_days_from_ce_opt(day + UNIX_EPOCH_DAYS_FROM_CE)
                .ok_or_else(|| TableError::Frame(format!("date out of range: {day}")))?;
            dates.push(date);
        }

        let mut table = PriceTable::new(dates);
        for column in frame.get_columns() {
            let name = column.name().as_str();
            if name == DATE {
                continue;
            }
            let floats = column.cast(&DataType::Float64)?;
            let values: Vec<f64> = floats
                .f64()?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect();
            table.insert_column(name, values)?;
        }

        Ok(table)
    }
}
