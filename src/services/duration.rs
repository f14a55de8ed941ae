//! Working duration derived from an activity log
//!
//! Measures only the first start/stop pair of the day: the first entry
//! with the start status, and the next entry after it whose status is
//! anything else.

use std::fmt;

use chrono::NaiveTime;

use crate::defaults::{INSUFFICIENT_DATA, START_STATUS};
use crate::error::DurationError;
use crate::types::Activity;

/// Elapsed wall-clock time between two times of day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed {
    pub minutes: i64,
    pub seconds: i64,
}

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} minutes {} seconds", self.minutes, self.seconds)
    }
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

/// Locate the (start, stop) pair in log order
fn find_pair(activities: &[Activity]) -> Option<(&Activity, &Activity)> {
    let start_idx = activities.iter().position(|a| a.status == START_STATUS)?;
    let stop = activities[start_idx + 1..]
        .iter()
        .find(|a| a.status != START_STATUS)?;
    Some((&activities[start_idx], stop))
}

/// Elapsed time from the first start event to the following stop event.
///
/// Both times are read as times of day on the same reference date, so the
/// result never depends on the calendar date and stays below 24h.
pub fn working_duration(activities: &[Activity]) -> Result<Elapsed, DurationError> {
    let (start, stop) = find_pair(activities)
        .ok_or(DurationError::InsufficientData("no start/stop event pair"))?;

    let start_time = parse_time(&start.time)
        .ok_or(DurationError::InsufficientData("unreadable start time"))?;
    let stop_time = parse_time(&stop.time)
        .ok_or(DurationError::InsufficientData("unreadable stop time"))?;

    let diff_ms = (stop_time - start_time).num_milliseconds();
    if diff_ms < 0 {
        return Err(DurationError::InsufficientData("stop event precedes start event"));
    }

    Ok(Elapsed {
        minutes: diff_ms / 60_000,
        seconds: ((diff_ms % 60_000) as f64 / 1000.0).round() as i64,
    })
}

/// Display text for the report summary
pub fn describe_working_duration(activities: &[Activity]) -> String {
    match working_duration(activities) {
        Ok(elapsed) => elapsed.to_string(),
        Err(_) => INSUFFICIENT_DATA.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn act(status: &str, time: &str) -> Activity {
        Activity {
            time: time.to_string(),
            location: String::new(),
            status: status.to_string(),
        }
    }

    #[test]
    fn test_duration_uses_first_non_start_after_start() {
        let log = vec![
            act(START_STATUS, "09:00:00"),
            act("moving", "09:05:00"),
            act("ending", "09:20:00"),
        ];
        assert_eq!(working_duration(&log).unwrap(), Elapsed { minutes: 5, seconds: 0 });
    }

    #[test]
    fn test_duration_skips_repeated_start_events() {
        let log = vec![
            act("moving", "07:50:00"),
            act(START_STATUS, "08:00:00"),
            act(START_STATUS, "08:10:00"),
            act("ending", "10:30:45"),
        ];
        assert_eq!(working_duration(&log).unwrap(), Elapsed { minutes: 150, seconds: 45 });
    }

    #[test]
    fn test_duration_measures_only_first_pair() {
        let log = vec![
            act(START_STATUS, "08:00:00"),
            act("ending", "09:00:00"),
            act(START_STATUS, "13:00:00"),
            act("ending", "17:00:00"),
        ];
        assert_eq!(working_duration(&log).unwrap(), Elapsed { minutes: 60, seconds: 0 });
    }

    #[test]
    fn test_duration_without_start_is_insufficient() {
        let log = vec![act("moving", "09:00:00"), act("ending", "10:00:00")];
        assert!(matches!(
            working_duration(&log),
            Err(DurationError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_duration_without_stop_is_insufficient() {
        let log = vec![act(START_STATUS, "09:00:00"), act(START_STATUS, "09:30:00")];
        assert!(working_duration(&log).is_err());
        assert!(working_duration(&[]).is_err());
    }

    #[test]
    fn test_duration_rejects_stop_before_start() {
        let log = vec![act(START_STATUS, "18:00:00"), act("ending", "07:00:00")];
        assert!(working_duration(&log).is_err());
    }

    #[test]
    fn test_duration_rounds_fractional_seconds() {
        let log = vec![act(START_STATUS, "09:00:00"), act("moving", "09:01:30.600")];
        assert_eq!(working_duration(&log).unwrap(), Elapsed { minutes: 1, seconds: 31 });
    }

    #[test]
    fn test_describe_working_duration() {
        let log = vec![act(START_STATUS, "09:00:00"), act("moving", "09:05:07")];
        assert_eq!(describe_working_duration(&log), "5 minutes 7 seconds");
        assert_eq!(describe_working_duration(&[]), "Insufficient data");
    }
}
