mod availability;
mod manager;
mod retry;
mod store;

use std::sync::Arc;

use abi::{
    Error, Reservation, ReservationId, ReservationQuery, ReservationRequest, ReservationRules,
    ReservationStatus, ReservationUpdate, RetryConfig,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use availability::Availability;
pub use retry::retry_with_backoff;
pub use store::{
    MemoryDirectory, MemoryStore, PgResourceDirectory, PgStore, ReservationStore,
    ResourceDirectory,
};

/// source of "now" for the time-dependent guards
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct ReservationManager {
    store: Arc<dyn ReservationStore>,
    directory: Arc<dyn ResourceDirectory>,
    rules: ReservationRules,
    retry: RetryConfig,
    clock: Clock,
}

#[async_trait]
pub trait Rsvp {
    /// make a reservation, always in `pending` status
    async fn reserve(&self, req: ReservationRequest) -> Result<Reservation, Error>;
    /// pending -> confirmed
    async fn confirm(&self, id: ReservationId) -> Result<Reservation, Error>;
    /// confirmed -> checked_in, no earlier than the configured window before start
    async fn check_in(&self, id: ReservationId) -> Result<Reservation, Error>;
    /// checked_in -> checked_out
    async fn check_out(&self, id: ReservationId) -> Result<Reservation, Error>;
    /// pending/confirmed -> cancelled
    async fn cancel(
        &self,
        id: ReservationId,
        reason: Option<String>,
    ) -> Result<Reservation, Error>;
    /// change dates, price or note of a reservation that can still be cancelled
    async fn update(
        &self,
        id: ReservationId,
        changes: ReservationUpdate,
    ) -> Result<Reservation, Error>;
    /// delete a cancelled reservation
    async fn delete(&self, id: ReservationId) -> Result<(), Error>;
    /// get a reservation by id
    async fn get(&self, id: ReservationId) -> Result<Reservation, Error>;
    /// query reservations
    async fn query(&self, query: ReservationQuery) -> Result<Vec<Reservation>, Error>;
    /// every reservation ever made for a resource
    async fn list_by_resource(&self, resource_id: &str) -> Result<Vec<Reservation>, Error>;
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Reservation>, Error>;
    async fn list_by_status(&self, status: ReservationStatus) -> Result<Vec<Reservation>, Error>;
    async fn list_all(&self) -> Result<Vec<Reservation>, Error>;
    /// reservations of a resource that currently occupy it
    async fn list_active_by_resource(&self, resource_id: &str) -> Result<Vec<Reservation>, Error>;
    /// whether `[start, end)` is free on the resource, optionally ignoring one reservation
    async fn is_available(
        &self,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<ReservationId>,
    ) -> Result<bool, Error>;
    /// like `is_available`, but reports which reservations block the window
    async fn availability(
        &self,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<ReservationId>,
    ) -> Result<Availability, Error>;
}
