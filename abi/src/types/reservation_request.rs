use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Reservation;

/// Caller input for a new booking. Fields stay optional so that the validation
/// pipeline, not deserialization, decides what is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRequest {
    pub resource_id: String,
    pub user_id: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub price: Option<Decimal>,
    pub note: Option<String>,
}

/// Changes to a still-cancellable reservation. `None` keeps the current value; an empty
/// `note` clears the stored one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationUpdate {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub price: Option<Decimal>,
    pub note: Option<String>,
}

impl ReservationRequest {
    pub fn new(
        uid: impl Into<String>,
        rid: impl Into<String>,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        price: Decimal,
    ) -> Self {
        Self {
            resource_id: rid.into(),
            user_id: uid.into(),
            start: Some(start.with_timezone(&Utc)),
            end: Some(end.with_timezone(&Utc)),
            price: Some(price),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// The request that results from applying `changes` on top of `rsvp`; identity
    /// fields always come from the stored reservation.
    pub fn merged(rsvp: &Reservation, changes: &ReservationUpdate) -> Self {
        Self {
            resource_id: rsvp.resource_id.clone(),
            user_id: rsvp.user_id.clone(),
            start: Some(changes.start.unwrap_or(rsvp.start)),
            end: Some(changes.end.unwrap_or(rsvp.end)),
            price: Some(changes.price.unwrap_or(rsvp.price)),
            note: match changes.note.as_deref() {
                Some("") => None,
                Some(note) => Some(note.to_string()),
                None => rsvp.note.clone(),
            },
        }
    }
}

impl ReservationUpdate {
    pub fn dates(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Self {
        Self {
            start: Some(start.with_timezone(&Utc)),
            end: Some(end.with_timezone(&Utc)),
            ..Default::default()
        }
    }

    pub fn price(price: Decimal) -> Self {
        Self {
            price: Some(price),
            ..Default::default()
        }
    }
}
