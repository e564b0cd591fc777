use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Transition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    CheckedIn,
    CheckedOut,
    Cancelled,
}

impl ReservationStatus {
    /// Statuses that occupy the resource. A pending reservation blocks as well, so the
    /// window between reserve and confirm cannot be double-booked.
    pub fn is_active(self) -> bool {
        match self {
            Self::Pending | Self::Confirmed | Self::CheckedIn => true,
            Self::CheckedOut | Self::Cancelled => false,
        }
    }

    /// Resolve `op` against the transition table and return the status the reservation
    /// ends up in. `Update` keeps the current status; `Delete` keeps `Cancelled` until
    /// the record is removed.
    pub fn apply(self, op: Transition) -> Result<Self, Error> {
        use ReservationStatus::*;
        use Transition::*;

        let next = match (self, op) {
            (Pending, Confirm) => Confirmed,
            (Confirmed, CheckIn) => CheckedIn,
            (CheckedIn, CheckOut) => CheckedOut,
            (Pending | Confirmed, Cancel) => Cancelled,
            (status @ (Pending | Confirmed), Update) => status,
            (Cancelled, Delete) => Cancelled,
            (status, op) => return Err(Error::InvalidTransition { op, status }),
        };
        Ok(next)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::CheckedIn => "checked_in",
            Self::CheckedOut => "checked_out",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "checked_in" => Ok(Self::CheckedIn),
            "checked_out" => Ok(Self::CheckedOut),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(Error::Unknown),
        }
    }
}
