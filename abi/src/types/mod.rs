use std::ops::Bound;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::types::PgRange;

use crate::{Error, ValidationReason};

mod reservation;
mod reservation_query;
mod reservation_request;
mod reservation_status;
mod transition;

pub use reservation::Reservation;
pub use reservation_query::{ReservationQuery, ReservationQueryBuilder};
pub use reservation_request::{ReservationRequest, ReservationUpdate};
pub use reservation_status::ReservationStatus;
pub use transition::Transition;

/// A half-open interval `[start, end)` of occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeSpan {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, Error> {
        validate_range(Some(&start), Some(&end))?;
        Ok(Self { start, end })
    }

    /// `[s1, e1)` and `[s2, e2)` overlap iff `s1 < e2 && e1 > s2`; touching edges do not
    pub fn overlaps(&self, other: &TimeSpan) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

pub fn validate_range(
    start: Option<&DateTime<Utc>>,
    end: Option<&DateTime<Utc>>,
) -> Result<(), Error> {
    let start = start.ok_or(Error::validation(
        "check_in",
        ValidationReason::CheckInRequired,
    ))?;
    let end = end.ok_or(Error::validation(
        "check_out",
        ValidationReason::CheckOutRequired,
    ))?;
    if start >= end {
        return Err(Error::validation(
            "check_in",
            ValidationReason::CheckInNotBeforeCheckOut,
        ));
    }
    Ok(())
}

impl From<TimeSpan> for PgRange<DateTime<Utc>> {
    fn from(span: TimeSpan) -> Self {
        PgRange {
            start: Bound::Included(span.start),
            end: Bound::Excluded(span.end),
        }
    }
}

impl TryFrom<PgRange<DateTime<Utc>>> for TimeSpan {
    type Error = Error;

    fn try_from(range: PgRange<DateTime<Utc>>) -> Result<Self, Self::Error> {
        let f = |b: Bound<DateTime<Utc>>| match b {
            Bound::Included(v) => Some(v),
            Bound::Excluded(v) => Some(v),
            Bound::Unbounded => None,
        };
        let start = f(range.start);
        let end = f(range.end);
        validate_range(start.as_ref(), end.as_ref())?;
        match (start, end) {
            (Some(start), Some(end)) => Ok(Self { start, end }),
            _ => Err(Error::Unknown),
        }
    }
}
