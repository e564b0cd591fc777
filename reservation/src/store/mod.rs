//! Storage and resource-lookup ports used by the reservation manager.

mod memory;
mod postgres;

use abi::{Error, Reservation, ReservationId, ReservationQuery, TimeSpan};
use async_trait::async_trait;

pub use memory::{MemoryDirectory, MemoryStore};
pub use postgres::{PgResourceDirectory, PgStore};

/// Persistence contract for reservations.
///
/// Implementations must reject a write that would make two active reservations of the
/// same resource overlap with `Error::ConflictReservation`, atomically with the write
/// itself. Writes to an existing row are conditional on `version`; a stale version
/// yields `Error::Concurrency`.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// insert a new reservation and return it with its assigned id
    async fn save(&self, rsvp: Reservation) -> Result<Reservation, Error>;
    async fn find_by_id(&self, id: ReservationId) -> Result<Option<Reservation>, Error>;
    async fn find_by_resource(&self, resource_id: &str) -> Result<Vec<Reservation>, Error>;
    /// reservations of the resource, in any status, whose span overlaps `span`
    async fn find_overlapping(
        &self,
        resource_id: &str,
        span: &TimeSpan,
    ) -> Result<Vec<Reservation>, Error>;
    async fn query(&self, query: &ReservationQuery) -> Result<Vec<Reservation>, Error>;
    /// overwrite the row if it is still at `rsvp.version`; the returned copy carries the
    /// bumped version
    async fn update(&self, rsvp: Reservation) -> Result<Reservation, Error>;
    async fn delete(&self, id: ReservationId, version: i64) -> Result<(), Error>;
}

/// Lookup of bookable resources owned by another service.
#[async_trait]
pub trait ResourceDirectory: Send + Sync {
    async fn exists(&self, resource_id: &str) -> Result<bool, Error>;
}
