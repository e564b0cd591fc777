use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{
    postgres::{types::PgRange, PgRow},
    FromRow, Row,
};

use crate::{ReservationId, ReservationStatus, TimeSpan};

/// A persisted booking of one resource. `id` is `0` until storage assigns one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub resource_id: String,
    pub user_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub price: Decimal,
    pub status: ReservationStatus,
    pub note: Option<String>,
    pub cancel_reason: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn new_pending(
        uid: impl Into<String>,
        rid: impl Into<String>,
        span: TimeSpan,
        price: Decimal,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            resource_id: rid.into(),
            user_id: uid.into(),
            start: span.start,
            end: span.end,
            price,
            status: ReservationStatus::Pending,
            note,
            cancel_reason: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn span(&self) -> TimeSpan {
        TimeSpan {
            start: self.start,
            end: self.end,
        }
    }

    /// true when `self` occupies `span` on the same resource
    pub fn blocks(&self, resource_id: &str, span: &TimeSpan) -> bool {
        self.resource_id == resource_id && self.status.is_active() && self.span().overlaps(span)
    }

    pub fn belongs_to(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

impl FromRow<'_, PgRow> for Reservation {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let range: PgRange<DateTime<Utc>> = row.try_get("timespan")?;
        let span = TimeSpan::try_from(range).map_err(|e| sqlx::Error::ColumnDecode {
            index: "timespan".into(),
            source: Box::new(e),
        })?;

        let status: String = row.try_get("status")?;
        let status = status
            .parse::<ReservationStatus>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "status".into(),
                source: Box::new(e),
            })?;

        Ok(Self {
            id: row.try_get("id")?,
            resource_id: row.try_get("resource_id")?,
            user_id: row.try_get("user_id")?,
            start: span.start,
            end: span.end,
            price: row.try_get("price")?,
            status,
            note: row.try_get("note")?,
            cancel_reason: row.try_get("cancel_reason")?,
            version: row.try_get("version")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
