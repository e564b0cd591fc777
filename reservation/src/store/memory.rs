use std::collections::{BTreeMap, HashSet};

use abi::{Error, Reservation, ReservationConflict, ReservationId, ReservationQuery, TimeSpan};
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ReservationStore, ResourceDirectory};

/// In-process reservation store for tests and single-node setups.
///
/// One lock guards every row, so the overlap check and the write it protects happen as
/// a single step, the same guarantee the postgres exclusion constraint gives.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    rows: BTreeMap<ReservationId, Reservation>,
    last_id: ReservationId,
}

impl Inner {
    fn ensure_free(&self, rsvp: &Reservation) -> Result<(), Error> {
        if !rsvp.status.is_active() {
            return Ok(());
        }
        let span = rsvp.span();
        let taken = self
            .rows
            .values()
            .any(|other| other.id != rsvp.id && other.blocks(&rsvp.resource_id, &span));
        if taken {
            return Err(Error::ConflictReservation(ReservationConflict::new(
                rsvp.resource_id.clone(),
                &span,
            )));
        }
        Ok(())
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn save(&self, mut rsvp: Reservation) -> Result<Reservation, Error> {
        let mut inner = self.inner.write().await;
        rsvp.id = 0;
        inner.ensure_free(&rsvp)?;
        inner.last_id += 1;
        rsvp.id = inner.last_id;
        inner.rows.insert(rsvp.id, rsvp.clone());
        Ok(rsvp)
    }

    async fn find_by_id(&self, id: ReservationId) -> Result<Option<Reservation>, Error> {
        Ok(self.inner.read().await.rows.get(&id).cloned())
    }

    async fn find_by_resource(&self, resource_id: &str) -> Result<Vec<Reservation>, Error> {
        self.query(&ReservationQuery::by_resource(resource_id)).await
    }

    async fn find_overlapping(
        &self,
        resource_id: &str,
        span: &TimeSpan,
    ) -> Result<Vec<Reservation>, Error> {
        let inner = self.inner.read().await;
        Ok(inner
            .rows
            .values()
            .filter(|r| r.resource_id == resource_id && r.span().overlaps(span))
            .cloned()
            .collect())
    }

    async fn query(&self, query: &ReservationQuery) -> Result<Vec<Reservation>, Error> {
        let inner = self.inner.read().await;
        Ok(inner
            .rows
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect())
    }

    async fn update(&self, mut rsvp: Reservation) -> Result<Reservation, Error> {
        let mut inner = self.inner.write().await;
        let current = inner
            .rows
            .get(&rsvp.id)
            .ok_or(Error::Concurrency(rsvp.id))?;
        if current.version != rsvp.version {
            return Err(Error::Concurrency(rsvp.id));
        }
        inner.ensure_free(&rsvp)?;
        rsvp.version += 1;
        inner.rows.insert(rsvp.id, rsvp.clone());
        Ok(rsvp)
    }

    async fn delete(&self, id: ReservationId, version: i64) -> Result<(), Error> {
        let mut inner = self.inner.write().await;
        match inner.rows.get(&id) {
            Some(current) if current.version == version => {
                inner.rows.remove(&id);
                Ok(())
            }
            _ => Err(Error::Concurrency(id)),
        }
    }
}

/// Fixed set of known resource ids.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    resources: RwLock<HashSet<String>>,
}

impl MemoryDirectory {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            resources: RwLock::new(ids.into_iter().map(Into::into).collect()),
        }
    }

    pub async fn add(&self, id: impl Into<String>) {
        self.resources.write().await.insert(id.into());
    }
}

#[async_trait]
impl ResourceDirectory for MemoryDirectory {
    async fn exists(&self, resource_id: &str) -> Result<bool, Error> {
        Ok(self.resources.read().await.contains(resource_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abi::ReservationStatus;
    use rust_decimal_macros::dec;

    fn rsvp(rid: &str, start: &str, end: &str) -> Reservation {
        let span = TimeSpan::new(start.parse().unwrap(), end.parse().unwrap()).unwrap();
        Reservation::new_pending(
            "alice",
            rid,
            span,
            dec!(120),
            None,
            "2024-01-01T00:00:00Z".parse().unwrap(),
        )
    }

    #[tokio::test]
    async fn save_should_assign_increasing_ids() {
        let store = MemoryStore::new();
        let r1 = store
            .save(rsvp("room-1", "2024-01-10T14:00:00Z", "2024-01-12T14:00:00Z"))
            .await
            .unwrap();
        let r2 = store
            .save(rsvp("room-2", "2024-01-10T14:00:00Z", "2024-01-12T14:00:00Z"))
            .await
            .unwrap();
        assert_eq!(r1.id, 1);
        assert_eq!(r2.id, 2);
        assert_eq!(store.find_by_id(1).await.unwrap(), Some(r1));
    }

    #[tokio::test]
    async fn save_overlapping_active_reservation_should_conflict() {
        let store = MemoryStore::new();
        store
            .save(rsvp("room-1", "2024-01-10T14:00:00Z", "2024-01-12T14:00:00Z"))
            .await
            .unwrap();
        let err = store
            .save(rsvp("room-1", "2024-01-11T10:00:00Z", "2024-01-13T10:00:00Z"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConflictReservation(_)));

        // adjacent window is free
        store
            .save(rsvp("room-1", "2024-01-12T14:00:00Z", "2024-01-13T10:00:00Z"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn stale_version_should_be_rejected() {
        let store = MemoryStore::new();
        let saved = store
            .save(rsvp("room-1", "2024-01-10T14:00:00Z", "2024-01-12T14:00:00Z"))
            .await
            .unwrap();

        let mut first = saved.clone();
        first.status = ReservationStatus::Confirmed;
        let first = store.update(first).await.unwrap();
        assert_eq!(first.version, 2);

        let mut second = saved.clone();
        second.status = ReservationStatus::Cancelled;
        assert_eq!(
            store.update(second).await.unwrap_err(),
            Error::Concurrency(saved.id)
        );
        assert_eq!(
            store.delete(saved.id, saved.version).await.unwrap_err(),
            Error::Concurrency(saved.id)
        );
        store.delete(saved.id, first.version).await.unwrap();
        assert_eq!(store.find_by_id(saved.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn find_overlapping_should_return_all_statuses() {
        let store = MemoryStore::new();
        let saved = store
            .save(rsvp("room-1", "2024-01-10T14:00:00Z", "2024-01-12T14:00:00Z"))
            .await
            .unwrap();
        let mut cancelled = saved.clone();
        cancelled.status = ReservationStatus::Cancelled;
        store.update(cancelled).await.unwrap();

        let span = TimeSpan::new(
            "2024-01-11T00:00:00Z".parse().unwrap(),
            "2024-01-11T12:00:00Z".parse().unwrap(),
        )
        .unwrap();
        let found = store.find_overlapping("room-1", &span).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(store
            .find_overlapping("room-2", &span)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn directory_should_know_added_resources() {
        let directory = MemoryDirectory::new(["room-1"]);
        assert!(directory.exists("room-1").await.unwrap());
        assert!(!directory.exists("room-2").await.unwrap());
        directory.add("room-2").await;
        assert!(directory.exists("room-2").await.unwrap());
    }
}
