use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::{Reservation, ReservationStatus};

/// Listing filter; every set field must match, unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(default, setter(into, strip_option))]
pub struct ReservationQuery {
    pub resource_id: Option<String>,
    pub user_id: Option<String>,
    pub status: Option<ReservationStatus>,
}

impl ReservationQuery {
    pub fn by_resource(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: Some(resource_id.into()),
            ..Default::default()
        }
    }

    pub fn by_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Default::default()
        }
    }

    pub fn by_status(status: ReservationStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn matches(&self, rsvp: &Reservation) -> bool {
        self.resource_id
            .as_deref()
            .map_or(true, |rid| rsvp.resource_id == rid)
            && self.user_id.as_deref().map_or(true, |uid| rsvp.user_id == uid)
            && self.status.map_or(true, |status| rsvp.status == status)
    }
}
