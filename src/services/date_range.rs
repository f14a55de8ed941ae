//! Calendar date range expansion
//!
//! Works on `NaiveDate` only, so month/year rollover and DST shifts
//! cannot produce gaps or duplicated days.

use chrono::NaiveDate;

use crate::defaults::MAX_RANGE_DAYS;
use crate::error::DateRangeError;

/// Reject a range whose start falls after its end
pub fn ensure_ordered(start: NaiveDate, end: NaiveDate) -> Result<(), DateRangeError> {
    if start > end {
        return Err(DateRangeError::InvalidRange { start, end });
    }
    Ok(())
}

/// Inclusive day count of a validated range
pub fn span_days(start: NaiveDate, end: NaiveDate) -> Result<i64, DateRangeError> {
    ensure_ordered(start, end)?;

    let days = (end - start).num_days() + 1;
    if days > MAX_RANGE_DAYS {
        return Err(DateRangeError::RangeTooLarge {
            days,
            max: MAX_RANGE_DAYS,
        });
    }

    Ok(days)
}

/// Every calendar date from `start` to `end` inclusive, ascending
pub fn expand(start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>, DateRangeError> {
    let days = span_days(start, end)?;
    Ok(start.iter_days().take(days as usize).collect())
}
