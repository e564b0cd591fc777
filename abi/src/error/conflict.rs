use std::fmt;

use chrono::{DateTime, Utc};

use crate::TimeSpan;

/// The interval a caller asked for on a resource that is already occupied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationConflict {
    pub resource_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReservationConflict {
    pub fn new(resource_id: impl Into<String>, span: &TimeSpan) -> Self {
        Self {
            resource_id: resource_id.into(),
            start: span.start,
            end: span.end,
        }
    }
}

impl fmt::Display for ReservationConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "resource {} is not available for [{}, {})",
            self.resource_id,
            self.start.to_rfc3339(),
            self.end.to_rfc3339()
        )
    }
}
