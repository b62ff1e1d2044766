//! Timing, ordering and teardown behavior of the mounted desk.

mod common;

use std::sync::Arc;
use std::time::Duration;

use clinic_desk_core::desk::{RefreshOutcome, StatSource, StatsOutcome, STATS_FAILED};
use clinic_desk_core::notify::NotificationQueue;
use clinic_desk_core::{AutoConfirm, DeskConfig, DeskServices, FrontDesk};
use clinic_desk_push::{PushEvent, PushHub};
use common::{flaky_store, new_patient, seed_patients, FlakyApi, Op};

async fn mount_with(api: Arc<FlakyApi>, hub: &PushHub, poll: Duration) -> FrontDesk {
    let config = DeskConfig::new("http://127.0.0.1:8000/api/")
        .unwrap()
        .with_poll_interval(poll)
        .unwrap();
    FrontDesk::mount(
        api,
        hub,
        &config,
        DeskServices::new(Arc::new(AutoConfirm(true))),
    )
    .await
}

// =========================================================================
// LiveSync
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_periodic_refresh_stops_after_teardown() {
    let (store, api) = flaky_store();
    let hub = PushHub::default();
    let desk = mount_with(api.clone(), &hub, Duration::from_secs(4)).await;
    assert!(desk.directory().view().patients.is_empty());

    seed_patients(&store, 2);
    tokio::time::sleep(Duration::from_millis(4_100)).await;
    assert_eq!(desk.directory().view().patients.len(), 2);
    assert_eq!(desk.stats().snapshot().new_patients_today, 2);

    desk.teardown();
    let calls = api.calls(Op::ListPatients);

    seed_patients(&store, 5);
    tokio::time::sleep(Duration::from_secs(40)).await;
    assert_eq!(api.calls(Op::ListPatients), calls);
    assert_eq!(desk.directory().view().patients.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_background_refresh_never_shows_loading() {
    let (_, api) = flaky_store();
    let hub = PushHub::default();
    let desk = mount_with(api.clone(), &hub, Duration::from_secs(4)).await;

    api.delay_next_patients(Duration::from_secs(2));
    tokio::time::sleep(Duration::from_millis(5_000)).await;
    assert!(!desk.directory().view().loading);
}

#[tokio::test(start_paused = true)]
async fn test_visible_refresh_holds_loading_flag() {
    let (_, api) = flaky_store();
    let hub = PushHub::default();
    let desk = mount_with(api.clone(), &hub, Duration::from_secs(60)).await;

    let observe = async {
        tokio::time::sleep(Duration::from_millis(300)).await;
        desk.directory().view().loading
    };
    let (outcome, loading_midway) = tokio::join!(desk.directory().refresh(1, "", false), observe);

    assert_eq!(outcome, RefreshOutcome::Applied);
    assert!(loading_midway);
    assert!(!desk.directory().view().loading);
}

#[tokio::test(start_paused = true)]
async fn test_visit_update_refreshes_stats_immediately() {
    let (store, api) = flaky_store();
    let hub = PushHub::default();
    let desk = mount_with(api, &hub, Duration::from_secs(60)).await;

    seed_patients(&store, 1);
    hub.publish(PushEvent::VisitUpdated);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(desk.stats().snapshot().new_patients_today, 1);
    // Push events only trigger the dashboard
    assert!(desk.directory().view().patients.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_page_change_rearms_timer() {
    let (store, api) = flaky_store();
    seed_patients(&store, 15);
    let hub = PushHub::default();
    let desk = mount_with(api.clone(), &hub, Duration::from_secs(4)).await;

    tokio::time::sleep(Duration::from_secs(3)).await;
    desk.next_page().await;
    let calls = api.calls(Op::ListPatients);

    // The old schedule would have fired at 4s
    tokio::time::sleep(Duration::from_millis(2_000)).await;
    assert_eq!(api.calls(Op::ListPatients), calls);

    // One tick reads the page and today's new-patient count
    tokio::time::sleep(Duration::from_millis(2_100)).await;
    assert_eq!(api.calls(Op::ListPatients), calls + 2);
    assert_eq!(desk.directory().view().page.page(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_search_in_flight_survives_tick() {
    let (store, api) = flaky_store();
    seed_patients(&store, 12);
    let hub = PushHub::default();
    let desk = mount_with(api.clone(), &hub, Duration::from_secs(4)).await;

    // The tick lands at 4.5s while the search is still waiting on the server
    tokio::time::sleep(Duration::from_millis(3_500)).await;
    api.delay_next_patients(Duration::from_secs(1));
    let outcome = desk.directory().search("Patient 003").await;

    // The tick reloaded the search the operator asked for and finished first
    assert_eq!(outcome, RefreshOutcome::Superseded);
    let view = desk.directory().view();
    assert_eq!(view.search, "Patient 003");
    assert_eq!(view.patients.len(), 1);

    tokio::time::sleep(Duration::from_secs(10)).await;
    let view = desk.directory().view();
    assert_eq!(view.search, "Patient 003");
    assert_eq!(view.patients.len(), 1);
    assert_eq!(desk.directory().current_query(), (1, "Patient 003".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_search_rearms_when_issued() {
    let (store, api) = flaky_store();
    seed_patients(&store, 12);
    let hub = PushHub::default();
    let desk = mount_with(api.clone(), &hub, Duration::from_secs(4)).await;

    tokio::time::sleep(Duration::from_millis(3_500)).await;
    api.delay_next_patients(Duration::from_secs(1));
    let outcome = desk.search("Patient 003").await;

    assert_eq!(outcome, RefreshOutcome::Applied);
    assert_eq!(desk.directory().view().search, "Patient 003");
    let calls = api.calls(Op::ListPatients);

    // Re-armed at 4s, so nothing fires until 8s
    tokio::time::sleep(Duration::from_millis(2_900)).await;
    assert_eq!(api.calls(Op::ListPatients), calls);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(api.calls(Op::ListPatients), calls + 2);
    let view = desk.directory().view();
    assert_eq!(view.search, "Patient 003");
    assert_eq!(view.patients.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_search_falls_back_to_shown_query() {
    let (store, api) = flaky_store();
    seed_patients(&store, 12);
    let hub = PushHub::default();
    let desk = mount_with(api.clone(), &hub, Duration::from_secs(60)).await;

    api.fail(Op::ListPatients);
    let outcome = desk.directory().search("Patient 003").await;
    api.heal(Op::ListPatients);

    assert_eq!(outcome, RefreshOutcome::Failed);
    assert_eq!(desk.directory().current_query(), (1, String::new()));
    assert_eq!(desk.directory().view().patients.len(), 10);
}

// =========================================================================
// Ordering
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_stale_response_is_discarded() {
    let (store, api) = flaky_store();
    let hub = PushHub::default();
    let desk = mount_with(api.clone(), &hub, Duration::from_secs(60)).await;

    api.delay_next_patients(Duration::from_secs(5));
    let slow = desk.directory().refresh(1, "", true);
    let fast = async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        store.register(&new_patient("Late Arrival", "9555500000")).unwrap();
        desk.directory().refresh(1, "", true).await
    };
    let (slow, fast) = tokio::join!(slow, fast);

    assert_eq!(slow, RefreshOutcome::Superseded);
    assert_eq!(fast, RefreshOutcome::Applied);
    assert_eq!(desk.directory().view().patients.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_completion_after_teardown_is_ignored() {
    let (store, api) = flaky_store();
    let hub = PushHub::default();
    let desk = mount_with(api.clone(), &hub, Duration::from_secs(60)).await;

    seed_patients(&store, 2);
    api.delay_next_patients(Duration::from_secs(5));
    let pending = desk.directory().refresh(1, "", true);
    let unmount = async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        desk.teardown();
    };
    let (outcome, _) = tokio::join!(pending, unmount);

    assert_eq!(outcome, RefreshOutcome::Superseded);
    assert!(desk.directory().view().patients.is_empty());
    assert!(desk.notices().current().is_none());
}

// =========================================================================
// Stats merge
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_failed_source_keeps_last_value() {
    let (store, api) = flaky_store();
    seed_patients(&store, 2);
    let hub = PushHub::default();
    let desk = mount_with(api.clone(), &hub, Duration::from_secs(60)).await;
    assert_eq!(desk.stats().snapshot().new_patients_today, 2);

    api.fail(Op::ListPatients);
    seed_patients_from(&store, 2, 3);

    let outcome = desk.stats().refresh().await;
    assert_eq!(
        outcome,
        StatsOutcome::Applied {
            failed: vec![StatSource::NewPatients]
        }
    );
    assert_eq!(desk.stats().snapshot().new_patients_today, 2);
    // One failing source is logged, not announced
    assert!(desk.notices().current().is_none());

    api.heal(Op::ListPatients);
    desk.stats().refresh().await;
    assert_eq!(desk.stats().snapshot().new_patients_today, 5);
}

#[tokio::test(start_paused = true)]
async fn test_transient_failure_is_retried() {
    let (_, api) = flaky_store();
    let hub = PushHub::default();
    let desk = mount_with(api.clone(), &hub, Duration::from_secs(60)).await;
    let before = api.calls(Op::ListInvoices);

    api.fail_times(Op::ListInvoices, 1);
    let outcome = desk.stats().refresh().await;

    assert_eq!(outcome, StatsOutcome::Applied { failed: vec![] });
    assert_eq!(api.calls(Op::ListInvoices), before + 2);
}

#[tokio::test(start_paused = true)]
async fn test_total_failure_is_announced() {
    let (_, api) = flaky_store();
    let hub = PushHub::default();
    let desk = mount_with(api.clone(), &hub, Duration::from_secs(60)).await;
    let refreshed_at = desk.stats().snapshot().refreshed_at;

    api.fail(Op::ListPatients);
    api.fail(Op::ListVisits);
    api.fail(Op::ListInvoices);

    let StatsOutcome::Applied { failed } = desk.stats().refresh().await else {
        panic!("refresh should not be superseded");
    };
    assert_eq!(failed.len(), 4);
    assert_eq!(desk.notices().current().unwrap().message, STATS_FAILED);
    assert_eq!(desk.stats().snapshot().refreshed_at, refreshed_at);
}

fn seed_patients_from(store: &clinic_desk_core::LocalStore, start: usize, count: usize) {
    for i in start..start + count {
        store
            .register(&new_patient(&format!("Patient {:03}", i), &format!("92{:08}", i)))
            .unwrap();
    }
}

// =========================================================================
// Notifications
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_newer_notification_replaces_older() {
    let notices = NotificationQueue::new(Duration::from_secs(4));

    notices.error("first");
    tokio::time::sleep(Duration::from_secs(3)).await;
    notices.success("second");
    assert_eq!(notices.current().unwrap().message, "second");

    // The first timer would have expired here
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    assert_eq!(notices.current().unwrap().message, "second");

    tokio::time::sleep(Duration::from_millis(3_000)).await;
    assert!(notices.current().is_none());
}
