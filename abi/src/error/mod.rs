use std::fmt;

use sqlx::postgres::PgDatabaseError;
use thiserror::Error;

use crate::{ReservationId, ReservationStatus, Transition};

mod conflict;
pub use conflict::ReservationConflict;

/// postgres error code raised when an exclusion constraint rejects a row
pub(crate) const EXCLUSION_VIOLATION: &str = "23P01";

#[derive(Error, Debug)]
pub enum Error {
    #[error("sqlx error: {0}")]
    DbError(sqlx::Error),

    #[error("Failed to read configuration file")]
    ConfigReadError,

    #[error("Failed to parse configuration file")]
    ConfigParseError,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid {field}: {reason}")]
    Validation {
        field: &'static str,
        reason: ValidationReason,
    },

    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("conflict reservation: {0}")]
    ConflictReservation(ReservationConflict),

    #[error("cannot {op} a reservation in status {status}")]
    InvalidTransition {
        op: Transition,
        status: ReservationStatus,
    },

    #[error("reservation {0} was modified concurrently")]
    Concurrency(ReservationId),

    #[error("Reservation error")]
    Unknown,
}

/// Stable reason codes for validation failures, one per pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationReason {
    ResourceIdRequired,
    UserIdRequired,
    CheckInRequired,
    CheckOutRequired,
    CheckInNotBeforeCheckOut,
    CheckInInPast,
    PriceNotPositive,
    PriceTooPrecise,
    PriceTooLarge,
    DurationExceeded { max_days: i64 },
    CheckInTooEarly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Reservation,
    Resource,
}

impl Error {
    pub fn validation(field: &'static str, reason: ValidationReason) -> Self {
        Self::Validation { field, reason }
    }

    pub fn reservation_not_found(id: ReservationId) -> Self {
        Self::NotFound {
            kind: EntityKind::Reservation,
            id: id.to_string(),
        }
    }

    pub fn resource_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: EntityKind::Resource,
            id: id.into(),
        }
    }

    /// only a lost optimistic write is worth running again
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Concurrency(_))
    }

    /// true when the database rejected a row through the reservation exclusion constraint
    pub fn is_exclusion_violation(e: &sqlx::Error) -> bool {
        match e {
            sqlx::Error::Database(e) => {
                let err: &PgDatabaseError = e.downcast_ref();
                err.code() == EXCLUSION_VIOLATION
            }
            _ => false,
        }
    }
}

impl ValidationReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ResourceIdRequired => "resource_id_required",
            Self::UserIdRequired => "user_id_required",
            Self::CheckInRequired => "check_in_required",
            Self::CheckOutRequired => "check_out_required",
            Self::CheckInNotBeforeCheckOut => "check_in_not_before_check_out",
            Self::CheckInInPast => "check_in_in_past",
            Self::PriceNotPositive => "price_not_positive",
            Self::PriceTooPrecise => "price_too_precise",
            Self::PriceTooLarge => "price_too_large",
            Self::DurationExceeded { .. } => "duration_exceeded",
            Self::CheckInTooEarly => "check_in_too_early",
        }
    }
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DurationExceeded { max_days } => {
                write!(f, "{} (max {} days)", self.code(), max_days)
            }
            _ => f.write_str(self.code()),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reservation => f.write_str("reservation"),
            Self::Resource => f.write_str("resource"),
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            // sqlx errors are not comparable
            (Self::DbError(_), Self::DbError(_)) => true,
            (Self::ConfigReadError, Self::ConfigReadError) => true,
            (Self::ConfigParseError, Self::ConfigParseError) => true,
            (Self::InvalidConfig(v1), Self::InvalidConfig(v2)) => v1 == v2,
            (
                Self::Validation {
                    field: f1,
                    reason: r1,
                },
                Self::Validation {
                    field: f2,
                    reason: r2,
                },
            ) => f1 == f2 && r1 == r2,
            (Self::NotFound { kind: k1, id: i1 }, Self::NotFound { kind: k2, id: i2 }) => {
                k1 == k2 && i1 == i2
            }
            (Self::ConflictReservation(v1), Self::ConflictReservation(v2)) => v1 == v2,
            (
                Self::InvalidTransition {
                    op: o1,
                    status: s1,
                },
                Self::InvalidTransition {
                    op: o2,
                    status: s2,
                },
            ) => o1 == o2 && s1 == s2,
            (Self::Concurrency(v1), Self::Concurrency(v2)) => v1 == v2,
            (Self::Unknown, Self::Unknown) => true,
            _ => false,
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::DbError(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_codes_should_be_distinct() {
        let reasons = [
            ValidationReason::ResourceIdRequired,
            ValidationReason::UserIdRequired,
            ValidationReason::CheckInRequired,
            ValidationReason::CheckOutRequired,
            ValidationReason::CheckInNotBeforeCheckOut,
            ValidationReason::CheckInInPast,
            ValidationReason::PriceNotPositive,
            ValidationReason::PriceTooPrecise,
            ValidationReason::PriceTooLarge,
            ValidationReason::DurationExceeded { max_days: 30 },
            ValidationReason::CheckInTooEarly,
        ];
        let mut codes: Vec<_> = reasons.iter().map(|r| r.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), reasons.len());
    }

    #[test]
    fn only_concurrency_error_should_be_retryable() {
        assert!(Error::Concurrency(1).is_retryable());
        assert!(!Error::reservation_not_found(1).is_retryable());
        assert!(!Error::InvalidTransition {
            op: Transition::Confirm,
            status: ReservationStatus::Confirmed,
        }
        .is_retryable());
    }

    #[test]
    fn error_messages_should_name_the_problem() {
        let err = Error::validation("price", ValidationReason::PriceNotPositive);
        assert_eq!(err.to_string(), "Invalid price: price_not_positive");

        let err = Error::InvalidTransition {
            op: Transition::Cancel,
            status: ReservationStatus::CheckedOut,
        };
        assert_eq!(
            err.to_string(),
            "cannot cancel a reservation in status checked_out"
        );
    }
}
