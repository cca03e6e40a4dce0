//! Cleaning stages: unit-jump repair and business-day calendar normalization.

pub mod calendar;
pub mod repair;

pub use calendar::{is_weekday, normalize_calendar, weekdays_between, CalendarError, CalendarReport};
pub use repair::{
    repair_unit_jumps, ColumnRepair, RepairError, RepairReport, CORRECTION_FACTOR, DROP_THRESHOLD,
    JUMP_THRESHOLD,
};
