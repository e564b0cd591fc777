mod config;
mod error;
mod types;
mod validation;

pub use config::{
    Config, DbConfig, RetryConfig, RulesConfig, MAX_RESERVATION_DAYS, MAX_WINDOW_HOURS,
};
pub use error::{EntityKind, Error, ReservationConflict, ValidationReason};
pub use types::*;
pub use validation::{ReservationRules, Validated};

pub type ReservationId = i64;

/// validate the data structure, raise error if invalid
pub trait Validator {
    fn validate(&self) -> Result<(), Error>;
}
