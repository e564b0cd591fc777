use std::sync::Arc;

use abi::{
    Config, Error, Reservation, ReservationConflict, ReservationId, ReservationQuery,
    ReservationRequest, ReservationRules, ReservationStatus, ReservationUpdate, RetryConfig,
    TimeSpan, Transition, Validated,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::{
    availability::{self, Availability},
    retry_with_backoff, Clock, PgResourceDirectory, PgStore, ReservationManager,
    ReservationStore, ResourceDirectory, Rsvp,
};

#[async_trait]
impl Rsvp for ReservationManager {
    async fn reserve(&self, req: ReservationRequest) -> Result<Reservation, Error> {
        let now = self.now();
        let Validated { span, price } =
            self.rules
                .validate(&req, ReservationStatus::Pending, now)?;

        if !self.directory.exists(&req.resource_id).await? {
            return Err(Error::resource_not_found(&req.resource_id));
        }
        self.ensure_available(&req.resource_id, &span, None).await?;

        let rsvp = Reservation::new_pending(req.user_id, req.resource_id, span, price, req.note, now);
        let rsvp = self.store.save(rsvp).await?;
        info!(id = rsvp.id, resource_id = %rsvp.resource_id, user_id = %rsvp.user_id, "reservation created");
        Ok(rsvp)
    }

    async fn confirm(&self, id: ReservationId) -> Result<Reservation, Error> {
        self.transition(id, Transition::Confirm, None).await
    }

    async fn check_in(&self, id: ReservationId) -> Result<Reservation, Error> {
        self.transition(id, Transition::CheckIn, None).await
    }

    async fn check_out(&self, id: ReservationId) -> Result<Reservation, Error> {
        self.transition(id, Transition::CheckOut, None).await
    }

    async fn cancel(
        &self,
        id: ReservationId,
        reason: Option<String>,
    ) -> Result<Reservation, Error> {
        self.transition(id, Transition::Cancel, reason).await
    }

    async fn update(
        &self,
        id: ReservationId,
        changes: ReservationUpdate,
    ) -> Result<Reservation, Error> {
        let changes = &changes;
        let rsvp = retry_with_backoff(
            &self.retry,
            move || async move {
                let mut rsvp = self.fetch(id).await?;
                let status = rsvp.status.apply(Transition::Update)?;

                let req = ReservationRequest::merged(&rsvp, changes);
                let now = self.now();
                let Validated { span, price } = self.rules.validate(&req, status, now)?;
                if span != rsvp.span() {
                    self.ensure_available(&rsvp.resource_id, &span, Some(rsvp.id))
                        .await?;
                }

                rsvp.start = span.start;
                rsvp.end = span.end;
                rsvp.price = price;
                rsvp.note = req.note;
                rsvp.updated_at = now;
                self.store.update(rsvp).await
            },
            Error::is_retryable,
            Transition::Update.as_str(),
        )
        .await?;
        info!(id, version = rsvp.version, "reservation updated");
        Ok(rsvp)
    }

    async fn delete(&self, id: ReservationId) -> Result<(), Error> {
        retry_with_backoff(
            &self.retry,
            move || async move {
                let rsvp = self.fetch(id).await?;
                rsvp.status.apply(Transition::Delete)?;
                self.store.delete(rsvp.id, rsvp.version).await
            },
            Error::is_retryable,
            Transition::Delete.as_str(),
        )
        .await?;
        info!(id, "reservation deleted");
        Ok(())
    }

    async fn get(&self, id: ReservationId) -> Result<Reservation, Error> {
        self.fetch(id).await
    }

    async fn query(&self, query: ReservationQuery) -> Result<Vec<Reservation>, Error> {
        self.store.query(&query).await
    }

    async fn list_by_resource(&self, resource_id: &str) -> Result<Vec<Reservation>, Error> {
        self.store.find_by_resource(resource_id).await
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Reservation>, Error> {
        self.store.query(&ReservationQuery::by_user(user_id)).await
    }

    async fn list_by_status(&self, status: ReservationStatus) -> Result<Vec<Reservation>, Error> {
        self.store.query(&ReservationQuery::by_status(status)).await
    }

    async fn list_all(&self) -> Result<Vec<Reservation>, Error> {
        self.store.query(&ReservationQuery::default()).await
    }

    async fn list_active_by_resource(&self, resource_id: &str) -> Result<Vec<Reservation>, Error> {
        let rsvps = self.store.find_by_resource(resource_id).await?;
        Ok(rsvps.into_iter().filter(|r| r.status.is_active()).collect())
    }

    async fn is_available(
        &self,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<ReservationId>,
    ) -> Result<bool, Error> {
        let report = self.availability(resource_id, start, end, exclude).await?;
        Ok(report.is_available())
    }

    async fn availability(
        &self,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<ReservationId>,
    ) -> Result<Availability, Error> {
        let span = TimeSpan::new(start, end)?;
        availability::check(self.store.as_ref(), resource_id, &span, exclude).await
    }
}

impl ReservationManager {
    pub fn new(store: Arc<dyn ReservationStore>, directory: Arc<dyn ResourceDirectory>) -> Self {
        Self {
            store,
            directory,
            rules: ReservationRules::default(),
            retry: RetryConfig::default(),
            clock: Arc::new(Utc::now),
        }
    }

    /// postgres-backed manager using the limits from `config`; pending migrations are
    /// applied before it is returned
    pub async fn from_config(config: &Config) -> Result<Self, Error> {
        let store = PgStore::from_config(&config.db).await?;
        store.migrate().await?;
        let directory = PgResourceDirectory::new(store.pool().clone());
        Ok(Self::new(Arc::new(store), Arc::new(directory))
            .with_rules(ReservationRules::try_from(&config.rules)?)
            .with_retry(config.retry.clone()))
    }

    pub fn with_rules(mut self, rules: ReservationRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    async fn fetch(&self, id: ReservationId) -> Result<Reservation, Error> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::reservation_not_found(id))
    }

    async fn ensure_available(
        &self,
        resource_id: &str,
        span: &TimeSpan,
        exclude: Option<ReservationId>,
    ) -> Result<(), Error> {
        let report = availability::check(self.store.as_ref(), resource_id, span, exclude).await?;
        if !report.is_available() {
            warn!(resource_id, blocking = ?report.blocking, "requested window is taken");
            return Err(Error::ConflictReservation(ReservationConflict::new(
                resource_id,
                span,
            )));
        }
        Ok(())
    }

    /// fetch, guard and write one status change, re-running the whole sequence when the
    /// write loses a race
    async fn transition(
        &self,
        id: ReservationId,
        op: Transition,
        reason: Option<String>,
    ) -> Result<Reservation, Error> {
        let reason = reason.as_deref();
        let rsvp = retry_with_backoff(
            &self.retry,
            move || async move {
                let mut rsvp = self.fetch(id).await?;
                let next = rsvp.status.apply(op)?;
                let now = self.now();
                if op == Transition::CheckIn {
                    self.rules.check_in_window(&rsvp.span(), now)?;
                }
                if op == Transition::Cancel {
                    rsvp.cancel_reason = reason.map(str::to_string);
                }
                rsvp.status = next;
                rsvp.updated_at = now;
                self.store.update(rsvp).await
            },
            Error::is_retryable,
            op.as_str(),
        )
        .await?;
        info!(id, op = %op, status = %rsvp.status, "reservation transitioned");
        Ok(rsvp)
    }
}
