use std::path::Path;

use abi::{
    Config, Error, Reservation, ReservationId, ReservationQuery, ReservationRequest,
    ReservationStatus, ReservationUpdate,
};
use anyhow::bail;
use chrono::{DateTime, Utc};
use reservation::{Availability, ReservationManager, Rsvp};
use tracing::{info, instrument};

/// Caller-facing reservation operations on top of a `ReservationManager`.
pub struct RsvpService {
    manager: ReservationManager,
}

impl RsvpService {
    pub fn new(manager: ReservationManager) -> Self {
        Self { manager }
    }

    pub async fn from_config(config: &Config) -> Result<Self, anyhow::Error> {
        Ok(Self::new(ReservationManager::from_config(config).await?))
    }

    #[instrument(
        skip(self, request),
        fields(resource_id = %request.resource_id, user_id = %request.user_id)
    )]
    pub async fn create_reservation(
        &self,
        request: ReservationRequest,
    ) -> Result<Reservation, Error> {
        self.manager.reserve(request).await
    }

    pub async fn get_reservation(&self, id: ReservationId) -> Result<Reservation, Error> {
        self.manager.get(id).await
    }

    pub async fn list_by_resource(&self, resource_id: &str) -> Result<Vec<Reservation>, Error> {
        self.manager.list_by_resource(resource_id).await
    }

    pub async fn list_by_requester(&self, user_id: &str) -> Result<Vec<Reservation>, Error> {
        self.manager.list_by_user(user_id).await
    }

    pub async fn list_by_status(
        &self,
        status: ReservationStatus,
    ) -> Result<Vec<Reservation>, Error> {
        self.manager.list_by_status(status).await
    }

    /// general listing; every filter left unset matches everything
    pub async fn query_reservations(
        &self,
        query: ReservationQuery,
    ) -> Result<Vec<Reservation>, Error> {
        self.manager.query(query).await
    }

    #[instrument(skip(self))]
    pub async fn check_availability(
        &self,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Availability, Error> {
        self.manager.availability(resource_id, start, end, None).await
    }

    #[instrument(skip(self))]
    pub async fn confirm_reservation(&self, id: ReservationId) -> Result<Reservation, Error> {
        self.manager.confirm(id).await
    }

    #[instrument(skip(self))]
    pub async fn check_in(&self, id: ReservationId) -> Result<Reservation, Error> {
        self.manager.check_in(id).await
    }

    #[instrument(skip(self))]
    pub async fn check_out(&self, id: ReservationId) -> Result<Reservation, Error> {
        self.manager.check_out(id).await
    }

    #[instrument(skip(self))]
    pub async fn cancel_reservation(
        &self,
        id: ReservationId,
        reason: Option<String>,
    ) -> Result<Reservation, Error> {
        self.manager.cancel(id, reason).await
    }

    #[instrument(skip(self, changes))]
    pub async fn update_reservation(
        &self,
        id: ReservationId,
        changes: ReservationUpdate,
    ) -> Result<Reservation, Error> {
        self.manager.update(id, changes).await
    }

    #[instrument(skip(self))]
    pub async fn delete_reservation(&self, id: ReservationId) -> Result<(), Error> {
        self.manager.delete(id).await
    }
}

/// Locate the config file: RESERVATION_CONFIG first, then "./reservation.yml",
/// "~/.config/reservation.yml" and "/etc/reservation.yml".
pub fn config_path() -> Result<String, anyhow::Error> {
    if let Ok(filename) = std::env::var("RESERVATION_CONFIG") {
        return Ok(filename);
    }
    let home = shellexpand::tilde("~/.config/reservation.yml");
    let candidates = ["./reservation.yml", &*home, "/etc/reservation.yml"];
    match candidates.iter().find(|p| Path::new(p).exists()) {
        Some(p) => Ok(p.to_string()),
        None => bail!("no config file found"),
    }
}

/// Connect, migrate and keep the service up until ctrl-c.
pub async fn start_service(config: &Config) -> Result<(), anyhow::Error> {
    let svc = RsvpService::from_config(config).await?;
    let active = svc
        .query_reservations(ReservationQuery::default())
        .await?
        .into_iter()
        .filter(|r| r.status.is_active())
        .count();
    info!(
        host = %config.db.host,
        dbname = %config.db.dbname,
        active,
        "reservation service ready"
    );
    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    Ok(())
}
