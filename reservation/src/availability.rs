use abi::{Error, ReservationId, TimeSpan};

use crate::ReservationStore;

/// Outcome of checking a window on a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    pub resource_id: String,
    pub span: TimeSpan,
    /// active reservations that overlap the window
    pub blocking: Vec<ReservationId>,
}

impl Availability {
    pub fn is_available(&self) -> bool {
        self.blocking.is_empty()
    }
}

/// Look up overlap candidates in storage, keep the ones that still occupy the resource
/// and drop `exclude` (the reservation being moved, if any).
pub(crate) async fn check(
    store: &dyn ReservationStore,
    resource_id: &str,
    span: &TimeSpan,
    exclude: Option<ReservationId>,
) -> Result<Availability, Error> {
    let blocking = store
        .find_overlapping(resource_id, span)
        .await?
        .into_iter()
        .filter(|r| Some(r.id) != exclude && r.blocks(resource_id, span))
        .map(|r| r.id)
        .collect();

    Ok(Availability {
        resource_id: resource_id.to_string(),
        span: *span,
        blocking,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use abi::{Reservation, ReservationStatus};
    use rust_decimal_macros::dec;

    fn span(start: &str, end: &str) -> TimeSpan {
        TimeSpan::new(start.parse().unwrap(), end.parse().unwrap()).unwrap()
    }

    async fn seeded() -> (MemoryStore, Reservation) {
        let store = MemoryStore::new();
        let rsvp = Reservation::new_pending(
            "alice",
            "room-1",
            span("2024-01-10T14:00:00Z", "2024-01-12T14:00:00Z"),
            dec!(200),
            None,
            "2024-01-01T00:00:00Z".parse().unwrap(),
        );
        let rsvp = store.save(rsvp).await.unwrap();
        (store, rsvp)
    }

    #[tokio::test]
    async fn overlapping_active_reservation_should_block() {
        let (store, rsvp) = seeded().await;
        let window = span("2024-01-11T10:00:00Z", "2024-01-13T10:00:00Z");
        let report = check(&store, "room-1", &window, None).await.unwrap();
        assert!(!report.is_available());
        assert_eq!(report.blocking, vec![rsvp.id]);
    }

    #[tokio::test]
    async fn adjacent_window_should_be_available() {
        let (store, _) = seeded().await;
        let window = span("2024-01-12T14:00:00Z", "2024-01-14T14:00:00Z");
        assert!(check(&store, "room-1", &window, None)
            .await
            .unwrap()
            .is_available());
    }

    #[tokio::test]
    async fn excluded_reservation_should_not_block_itself() {
        let (store, rsvp) = seeded().await;
        let window = span("2024-01-11T10:00:00Z", "2024-01-13T10:00:00Z");
        assert!(check(&store, "room-1", &window, Some(rsvp.id))
            .await
            .unwrap()
            .is_available());
    }

    #[tokio::test]
    async fn finished_reservations_should_not_block() {
        let (store, rsvp) = seeded().await;
        let mut done = rsvp.clone();
        done.status = ReservationStatus::CheckedOut;
        store.update(done).await.unwrap();

        let window = span("2024-01-11T10:00:00Z", "2024-01-13T10:00:00Z");
        assert!(check(&store, "room-1", &window, None)
            .await
            .unwrap()
            .is_available());
    }

    #[tokio::test]
    async fn repeated_checks_should_agree() {
        let (store, _) = seeded().await;
        let window = span("2024-01-11T10:00:00Z", "2024-01-13T10:00:00Z");
        let first = check(&store, "room-1", &window, None).await.unwrap();
        let second = check(&store, "room-1", &window, None).await.unwrap();
        assert_eq!(first, second);
    }
}
