use std::sync::{Arc, Mutex};

use abi::{
    Error, ReservationConflict, ReservationQueryBuilder, ReservationRequest, ReservationStatus,
    ReservationUpdate, Transition, ValidationReason,
};
use chrono::{DateTime, Utc};
use reservation::{MemoryDirectory, MemoryStore, ReservationManager};
use reservation_service::RsvpService;
use rust_decimal_macros::dec;

fn at(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn service(now: Arc<Mutex<DateTime<Utc>>>) -> RsvpService {
    let directory = MemoryDirectory::new(["ocean-101", "garden-202"]);
    let manager = ReservationManager::new(Arc::new(MemoryStore::new()), Arc::new(directory))
        .with_clock(Arc::new(move || *now.lock().unwrap()));
    RsvpService::new(manager)
}

fn request(uid: &str, rid: &str, start: &str, end: &str) -> ReservationRequest {
    ReservationRequest::new(
        uid,
        rid,
        start.parse().unwrap(),
        end.parse().unwrap(),
        dec!(240),
    )
}

#[tokio::test]
async fn reservation_lifecycle_should_work() {
    let now = Arc::new(Mutex::new(at("2024-03-01T09:00:00Z")));
    let svc = service(now.clone());

    let rsvp = svc
        .create_reservation(
            request(
                "alice",
                "ocean-101",
                "2024-03-10T15:00:00+01:00",
                "2024-03-13T11:00:00+01:00",
            )
            .with_note("arriving by train"),
        )
        .await
        .unwrap();
    assert_eq!(rsvp.status, ReservationStatus::Pending);
    assert_eq!(rsvp.start, at("2024-03-10T14:00:00Z"));

    // a second guest cannot take an overlapping window
    let err = svc
        .create_reservation(request(
            "bob",
            "ocean-101",
            "2024-03-12T15:00:00+01:00",
            "2024-03-14T11:00:00+01:00",
        ))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        Error::ConflictReservation(ReservationConflict {
            resource_id: "ocean-101".into(),
            start: at("2024-03-12T14:00:00Z"),
            end: at("2024-03-14T10:00:00Z"),
        })
    );

    svc.confirm_reservation(rsvp.id).await.unwrap();
    *now.lock().unwrap() = at("2024-03-10T13:00:00Z");
    svc.check_in(rsvp.id).await.unwrap();
    *now.lock().unwrap() = at("2024-03-13T09:30:00Z");
    let done = svc.check_out(rsvp.id).await.unwrap();
    assert_eq!(done.status, ReservationStatus::CheckedOut);
    assert_eq!(done.note.as_deref(), Some("arriving by train"));

    let err = svc.delete_reservation(rsvp.id).await.unwrap_err();
    assert_eq!(
        err,
        Error::InvalidTransition {
            op: Transition::Delete,
            status: ReservationStatus::CheckedOut,
        }
    );
}

#[tokio::test]
async fn cancelled_reservation_can_be_rebooked_and_deleted() {
    let now = Arc::new(Mutex::new(at("2024-03-01T09:00:00Z")));
    let svc = service(now);

    let first = svc
        .create_reservation(request(
            "alice",
            "garden-202",
            "2024-04-01T14:00:00Z",
            "2024-04-03T10:00:00Z",
        ))
        .await
        .unwrap();
    let cancelled = svc
        .cancel_reservation(first.id, Some("flight cancelled".into()))
        .await
        .unwrap();
    assert_eq!(cancelled.cancel_reason.as_deref(), Some("flight cancelled"));

    let availability = svc
        .check_availability("garden-202", at("2024-04-02T00:00:00Z"), at("2024-04-04T00:00:00Z"))
        .await
        .unwrap();
    assert!(availability.is_available());

    let second = svc
        .create_reservation(request(
            "bob",
            "garden-202",
            "2024-04-02T14:00:00Z",
            "2024-04-04T10:00:00Z",
        ))
        .await
        .unwrap();

    svc.delete_reservation(first.id).await.unwrap();
    assert_eq!(
        svc.get_reservation(first.id).await.unwrap_err(),
        Error::reservation_not_found(first.id)
    );

    let remaining = svc.list_by_resource("garden-202").await.unwrap();
    assert_eq!(remaining, vec![second]);
}

#[tokio::test]
async fn invalid_requests_should_be_rejected_with_reason() {
    let now = Arc::new(Mutex::new(at("2024-03-01T09:00:00Z")));
    let svc = service(now);

    let mut req = request("alice", "ocean-101", "2024-03-10T15:00:00Z", "2024-03-10T15:00:00Z");
    let err = svc.create_reservation(req.clone()).await.unwrap_err();
    assert_eq!(
        err,
        Error::validation("check_in", ValidationReason::CheckInNotBeforeCheckOut)
    );

    req.end = Some(at("2024-05-10T15:00:00Z"));
    let err = svc.create_reservation(req.clone()).await.unwrap_err();
    assert_eq!(
        err,
        Error::validation(
            "check_out",
            ValidationReason::DurationExceeded { max_days: 30 }
        )
    );

    req.end = Some(at("2024-03-11T15:00:00Z"));
    req.resource_id = "penthouse".into();
    let err = svc.create_reservation(req).await.unwrap_err();
    assert_eq!(err, Error::resource_not_found("penthouse"));
}

#[tokio::test]
async fn listings_should_follow_requester_and_status() {
    let now = Arc::new(Mutex::new(at("2024-03-01T09:00:00Z")));
    let svc = service(now);

    let a = svc
        .create_reservation(request(
            "alice",
            "ocean-101",
            "2024-03-10T14:00:00Z",
            "2024-03-12T10:00:00Z",
        ))
        .await
        .unwrap();
    let b = svc
        .create_reservation(request(
            "bob",
            "garden-202",
            "2024-03-10T14:00:00Z",
            "2024-03-12T10:00:00Z",
        ))
        .await
        .unwrap();
    svc.confirm_reservation(b.id).await.unwrap();

    let alice = svc.list_by_requester("alice").await.unwrap();
    assert_eq!(alice.len(), 1);
    assert!(alice[0].belongs_to("alice"));

    let pending = svc.list_by_status(ReservationStatus::Pending).await.unwrap();
    assert_eq!(pending, vec![a]);

    let query = ReservationQueryBuilder::default()
        .user_id("bob")
        .status(ReservationStatus::Confirmed)
        .build()
        .unwrap();
    let confirmed = svc.query_reservations(query).await.unwrap();
    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0].id, b.id);
}

#[tokio::test]
async fn update_should_move_reservation_to_free_window() {
    let now = Arc::new(Mutex::new(at("2024-03-01T09:00:00Z")));
    let svc = service(now);

    let rsvp = svc
        .create_reservation(request(
            "alice",
            "ocean-101",
            "2024-03-10T14:00:00Z",
            "2024-03-12T10:00:00Z",
        ))
        .await
        .unwrap();

    let moved = svc
        .update_reservation(
            rsvp.id,
            ReservationUpdate {
                start: Some(at("2024-03-20T14:00:00Z")),
                end: Some(at("2024-03-22T10:00:00Z")),
                price: Some(dec!(199.99)),
                note: Some("sea view please".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.start, at("2024-03-20T14:00:00Z"));
    assert_eq!(moved.price, dec!(199.99));
    assert_eq!(moved.version, rsvp.version + 1);

    let old_window = svc
        .check_availability("ocean-101", at("2024-03-10T14:00:00Z"), at("2024-03-12T10:00:00Z"))
        .await
        .unwrap();
    assert!(old_window.is_available());
    let new_window = svc
        .check_availability("ocean-101", at("2024-03-21T00:00:00Z"), at("2024-03-21T12:00:00Z"))
        .await
        .unwrap();
    assert_eq!(new_window.blocking, vec![rsvp.id]);
}
