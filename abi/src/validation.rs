use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::{
    validate_range, Error, ReservationRequest, ReservationStatus, RulesConfig, TimeSpan,
    ValidationReason, Validator,
};

/// decimal places the `price` column keeps
const PRICE_SCALE: u32 = 2;

/// largest amount `NUMERIC(12, 2)` holds
fn max_price() -> Decimal {
    Decimal::new(999_999_999_999, PRICE_SCALE)
}

/// Booking limits, resolved from `RulesConfig` into durations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationRules {
    pub max_duration: Duration,
    pub grace_period: Duration,
    pub early_check_in: Duration,
}

/// The parts of a request the pipeline proved present and in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validated {
    pub span: TimeSpan,
    pub price: Decimal,
}

impl Default for ReservationRules {
    fn default() -> Self {
        Self::resolve(&RulesConfig::default())
    }
}

/// Limits outside the configured bounds are rejected before any duration is built.
impl TryFrom<&RulesConfig> for ReservationRules {
    type Error = Error;

    fn try_from(config: &RulesConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self::resolve(config))
    }
}

impl ReservationRules {
    // callers guarantee `config` is within bounds
    fn resolve(config: &RulesConfig) -> Self {
        Self {
            max_duration: Duration::days(config.max_reservation_days),
            grace_period: Duration::hours(config.check_in_grace_period_hours),
            early_check_in: Duration::hours(config.check_in_early_window_hours),
        }
    }

    /// Run the checks in their fixed order and stop at the first failure.
    ///
    /// `status` is the status the reservation has (or will have); the "check-in not in
    /// the past" rule only applies while it is `Pending`, so confirmed or historical
    /// records stay valid when they are edited later.
    pub fn validate(
        &self,
        req: &ReservationRequest,
        status: ReservationStatus,
        now: DateTime<Utc>,
    ) -> Result<Validated, Error> {
        if req.resource_id.trim().is_empty() {
            return Err(Error::validation(
                "resource_id",
                ValidationReason::ResourceIdRequired,
            ));
        }
        if req.user_id.trim().is_empty() {
            return Err(Error::validation("user_id", ValidationReason::UserIdRequired));
        }

        validate_range(req.start.as_ref(), req.end.as_ref())?;
        let span = match (req.start, req.end) {
            (Some(start), Some(end)) => TimeSpan { start, end },
            _ => return Err(Error::Unknown),
        };

        let cutoff = now.checked_sub_signed(self.grace_period);
        if status == ReservationStatus::Pending && cutoff.map_or(false, |c| span.start < c) {
            return Err(Error::validation("check_in", ValidationReason::CheckInInPast));
        }

        let price = match req.price {
            Some(price) if price > Decimal::ZERO => price,
            _ => {
                return Err(Error::validation(
                    "price",
                    ValidationReason::PriceNotPositive,
                ))
            }
        };
        if price.normalize().scale() > PRICE_SCALE {
            return Err(Error::validation("price", ValidationReason::PriceTooPrecise));
        }
        if price > max_price() {
            return Err(Error::validation("price", ValidationReason::PriceTooLarge));
        }

        if span.duration() > self.max_duration {
            return Err(Error::validation(
                "check_out",
                ValidationReason::DurationExceeded {
                    max_days: self.max_duration.num_days(),
                },
            ));
        }

        Ok(Validated { span, price })
    }

    /// check-in is allowed from `early_check_in` before the scheduled start onwards
    pub fn check_in_window(
        &self,
        span: &TimeSpan,
        now: DateTime<Utc>,
    ) -> Result<(), Error> {
        let opens = span.start.checked_sub_signed(self.early_check_in);
        if opens.map_or(false, |opens| now < opens) {
            return Err(Error::validation(
                "check_in",
                ValidationReason::CheckInTooEarly,
            ));
        }
        Ok(())
    }
}
