//! Turns a coarse time-of-day token into an instant.
//!
//! Only the half of the day is understood: anything containing "am" anchors
//! to 00:00 UTC and anything containing "pm" to 12:00 UTC, both on the
//! calendar date of the reference instant. "9am" therefore means midnight
//! today, and a result already in the past is still returned.

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};

use crate::error::{ApiError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayPeriod {
    Am,
    Pm,
}

impl DayPeriod {
    fn parse(token: &str) -> Option<Self> {
        let lowered = token.to_lowercase();
        // "am" wins when a token somehow carries both.
        if lowered.contains("am") {
            Some(Self::Am)
        } else if lowered.contains("pm") {
            Some(Self::Pm)
        } else {
            None
        }
    }

    fn anchor_hour(self) -> i64 {
        match self {
            Self::Am => 0,
            Self::Pm => 12,
        }
    }
}

pub fn normalize(token: &str, reference_now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let period =
        DayPeriod::parse(token).ok_or_else(|| ApiError::InvalidTimeToken(token.to_string()))?;

    let midnight = reference_now.date_naive().and_time(NaiveTime::MIN).and_utc();
    Ok(midnight + TimeDelta::hours(period.anchor_hour()))
}
