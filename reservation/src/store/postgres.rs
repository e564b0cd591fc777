use abi::{
    DbConfig, Error, Reservation, ReservationConflict, ReservationId, ReservationQuery, TimeSpan,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    postgres::{types::PgRange, PgPoolOptions},
    PgPool, Postgres, QueryBuilder,
};
use tracing::debug;

use super::{ReservationStore, ResourceDirectory};

const COLUMNS: &str = "id, resource_id, user_id, timespan, price, status::text AS status, \
                       note, cancel_reason, version, created_at, updated_at";

/// Reservation store backed by `rsvp.reservations`. Overlaps between active
/// reservations are refused by the table's exclusion constraint.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn from_config(config: &DbConfig) -> Result<Self, Error> {
        let pool = PgPoolOptions::default()
            .max_connections(config.max_connections)
            .connect(&config.url())
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// apply the bundled schema migrations
    pub async fn migrate(&self) -> Result<(), Error> {
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await
            .map_err(sqlx::Error::from)?;
        Ok(())
    }
}

fn write_error(e: sqlx::Error, rsvp: &Reservation) -> Error {
    if Error::is_exclusion_violation(&e) {
        debug!(resource_id = %rsvp.resource_id, "exclusion constraint rejected write");
        return Error::ConflictReservation(ReservationConflict::new(
            rsvp.resource_id.clone(),
            &rsvp.span(),
        ));
    }
    e.into()
}

#[async_trait]
impl ReservationStore for PgStore {
    async fn save(&self, rsvp: Reservation) -> Result<Reservation, Error> {
        let timespan: PgRange<DateTime<Utc>> = rsvp.span().into();
        let sql = format!(
            r#"
            INSERT INTO rsvp.reservations
                (resource_id, user_id, timespan, price, status, note, cancel_reason,
                 version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5::rsvp.reservation_status, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            COLUMNS
        );
        sqlx::query_as::<_, Reservation>(&sql)
            .bind(&rsvp.resource_id)
            .bind(&rsvp.user_id)
            .bind(timespan)
            .bind(rsvp.price)
            .bind(rsvp.status.as_str())
            .bind(&rsvp.note)
            .bind(&rsvp.cancel_reason)
            .bind(rsvp.version)
            .bind(rsvp.created_at)
            .bind(rsvp.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| write_error(e, &rsvp))
    }

    async fn find_by_id(&self, id: ReservationId) -> Result<Option<Reservation>, Error> {
        let sql = format!("SELECT {} FROM rsvp.reservations WHERE id = $1", COLUMNS);
        let rsvp = sqlx::query_as::<_, Reservation>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(rsvp)
    }

    async fn find_by_resource(&self, resource_id: &str) -> Result<Vec<Reservation>, Error> {
        self.query(&ReservationQuery::by_resource(resource_id)).await
    }

    async fn find_overlapping(
        &self,
        resource_id: &str,
        span: &TimeSpan,
    ) -> Result<Vec<Reservation>, Error> {
        let timespan: PgRange<DateTime<Utc>> = (*span).into();
        let sql = format!(
            "SELECT {} FROM rsvp.reservations WHERE resource_id = $1 AND timespan && $2 ORDER BY id",
            COLUMNS
        );
        let rsvps = sqlx::query_as::<_, Reservation>(&sql)
            .bind(resource_id)
            .bind(timespan)
            .fetch_all(&self.pool)
            .await?;
        Ok(rsvps)
    }

    async fn query(&self, query: &ReservationQuery) -> Result<Vec<Reservation>, Error> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM rsvp.reservations WHERE TRUE",
            COLUMNS
        ));
        if let Some(rid) = &query.resource_id {
            builder.push(" AND resource_id = ").push_bind(rid.clone());
        }
        if let Some(uid) = &query.user_id {
            builder.push(" AND user_id = ").push_bind(uid.clone());
        }
        if let Some(status) = query.status {
            builder
                .push(" AND status = ")
                .push_bind(status.as_str())
                .push("::rsvp.reservation_status");
        }
        builder.push(" ORDER BY id");

        let rsvps = builder
            .build_query_as::<Reservation>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rsvps)
    }

    async fn update(&self, rsvp: Reservation) -> Result<Reservation, Error> {
        let timespan: PgRange<DateTime<Utc>> = rsvp.span().into();
        let sql = format!(
            r#"
            UPDATE rsvp.reservations
            SET timespan = $3, price = $4, status = $5::rsvp.reservation_status,
                note = $6, cancel_reason = $7, updated_at = $8, version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING {}
            "#,
            COLUMNS
        );
        let updated = sqlx::query_as::<_, Reservation>(&sql)
            .bind(rsvp.id)
            .bind(rsvp.version)
            .bind(timespan)
            .bind(rsvp.price)
            .bind(rsvp.status.as_str())
            .bind(&rsvp.note)
            .bind(&rsvp.cancel_reason)
            .bind(rsvp.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| write_error(e, &rsvp))?;
        updated.ok_or(Error::Concurrency(rsvp.id))
    }

    async fn delete(&self, id: ReservationId, version: i64) -> Result<(), Error> {
        let result = sqlx::query("DELETE FROM rsvp.reservations WHERE id = $1 AND version = $2")
            .bind(id)
            .bind(version)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::Concurrency(id));
        }
        Ok(())
    }
}

/// Resource lookup against `rsvp.resources`.
#[derive(Debug, Clone)]
pub struct PgResourceDirectory {
    pool: PgPool,
}

impl PgResourceDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResourceDirectory for PgResourceDirectory {
    async fn exists(&self, resource_id: &str) -> Result<bool, Error> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM rsvp.resources WHERE id = $1)",
        )
        .bind(resource_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
