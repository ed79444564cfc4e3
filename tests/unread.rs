//! Unread Count Tests
//!
//! Covers the unread endpoint and the polling badge.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::app;
use penpal::app::unread::{UnreadBadge, UnreadCounter};
use penpal::domain::user::Role;

#[tokio::test]
async fn unread_count_spans_matches_and_reports_interval() {
    let app = app().await;
    let prisoner = app.create_user(Role::Prisoner, "Paul", None);
    let first = app.create_user(Role::Partner, "Xena", None);
    let second = app.create_user(Role::Partner, "Yara", None);
    let first_match = app.accepted_match(&prisoner, &first).await;
    let second_match = app.accepted_match(&prisoner, &second).await;

    app.send(first_match, &first, &prisoner, "one").await;
    app.send(second_match, &second, &prisoner, "two").await;
    app.send(second_match, &prisoner, &second, "reply").await;

    let resp = app
        .get("/messages/unread-count", Some(&prisoner.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["count"], 2);
    assert_eq!(resp.json()["poll_interval_seconds"], 30);

    let counter = UnreadCounter::new(app.state.stores.clone());
    assert_eq!(
        counter
            .count_unread_in_match(prisoner.id, second_match)
            .await
            .unwrap(),
        1
    );
    assert_eq!(app.unread_count(&second).await, 1);
}

#[tokio::test]
async fn badge_follows_the_latest_count() {
    let app = app().await;
    let prisoner = app.create_user(Role::Prisoner, "Paul", None);
    let partner = app.create_user(Role::Partner, "Xena", None);
    let match_id = app.accepted_match(&prisoner, &partner).await;

    let counter = UnreadCounter::new(app.state.stores.clone());
    let badge = UnreadBadge::spawn(counter, prisoner.id, Duration::from_millis(10));
    let mut updates = badge.subscribe();
    assert_eq!(badge.current(), 0);

    let message = app.send(match_id, &partner, &prisoner, "Hello").await;
    tokio::time::timeout(Duration::from_secs(2), updates.wait_for(|count| *count == 1))
        .await
        .expect("badge did not observe the new message")
        .unwrap();
    assert_eq!(badge.current(), 1);

    app.post(
        &format!("/messages/{}/read", message["id"].as_str().unwrap()),
        Some(&prisoner.access_token),
    )
    .await;
    tokio::time::timeout(Duration::from_secs(2), updates.wait_for(|count| *count == 0))
        .await
        .expect("badge did not observe the read")
        .unwrap();

    badge.stop();
}

#[tokio::test]
async fn dropping_the_badge_stops_polling() {
    let app = app().await;
    let prisoner = app.create_user(Role::Prisoner, "Paul", None);
    let partner = app.create_user(Role::Partner, "Xena", None);
    let match_id = app.accepted_match(&prisoner, &partner).await;

    let counter = UnreadCounter::new(app.state.stores.clone());
    let badge = UnreadBadge::spawn(counter, prisoner.id, Duration::from_millis(10));
    let mut updates = badge.subscribe();
    drop(badge);

    // The sender goes away with the aborted task.
    tokio::time::timeout(Duration::from_secs(2), async {
        while updates.changed().await.is_ok() {}
    })
    .await
    .expect("poller kept running after drop");

    app.send(match_id, &partner, &prisoner, "Hello").await;
    assert_eq!(*updates.borrow(), 0);
}
