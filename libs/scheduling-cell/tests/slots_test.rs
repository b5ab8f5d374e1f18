use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scheduling_cell::models::AvailabilityWindow;
use scheduling_cell::services::slots::{slots_for_window, SlotResolver};
use shared_database::StoreClient;
use shared_utils::test_utils::{MockStoreRows, TestConfig, TestUser};

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn window(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> AvailabilityWindow {
    AvailabilityWindow {
        avail_id: 1,
        doctor_id: 10,
        date,
        start_time: start,
        end_time: end,
    }
}

fn tomorrow() -> NaiveDate {
    Utc::now().date_naive() + Duration::days(1)
}

fn resolver_for(mock_server: &MockServer) -> SlotResolver {
    let config = TestConfig::with_store_url(&mock_server.uri()).to_app_config();
    SlotResolver::with_store(Arc::new(StoreClient::new(&config)))
}

// ==============================================================================
// PURE WINDOW WALK
// ==============================================================================

#[test]
fn four_hour_window_dices_into_eight_slots() {
    let date = tomorrow();
    let slots = slots_for_window(&window(date, t(8, 0), t(12, 0)), &HashSet::new());

    assert_eq!(slots.len(), 8);
    assert_eq!(slots[0].start_time, t(8, 0));
    assert_eq!(slots[0].end_time, t(8, 30));
    assert_eq!(slots[7].start_time, t(11, 30));
    assert_eq!(slots[7].end_time, t(12, 0));
    assert!(slots.iter().all(|s| s.start_time < t(12, 0)));
}

#[test]
fn partial_trailing_interval_is_dropped() {
    let date = tomorrow();
    // 08:00-09:15 fits two whole slots; the trailing 15 minutes emit nothing
    let slots = slots_for_window(&window(date, t(8, 0), t(9, 15)), &HashSet::new());

    assert_eq!(slots.len(), 2);
    assert_eq!(slots[1].end_time, t(9, 0));
}

#[test]
fn window_shorter_than_one_slot_yields_nothing() {
    let date = tomorrow();
    let slots = slots_for_window(&window(date, t(8, 0), t(8, 25)), &HashSet::new());
    assert!(slots.is_empty());
}

#[test]
fn booked_time_marks_exactly_that_slot() {
    let date = tomorrow();
    let occupied: HashSet<_> = [(date, t(8, 0))].into_iter().collect();

    let slots = slots_for_window(&window(date, t(8, 0), t(10, 0)), &occupied);

    assert_eq!(slots.len(), 4);
    assert!(slots[0].is_booked);
    assert!(slots[1..].iter().all(|s| !s.is_booked));
}

#[test]
fn window_touching_midnight_terminates() {
    let date = tomorrow();
    let slots = slots_for_window(
        &window(date, t(23, 0), NaiveTime::from_hms_opt(23, 59, 59).unwrap()),
        &HashSet::new(),
    );
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].start_time, t(23, 0));
}

// ==============================================================================
// RESOLVER AGAINST MOCK STORE
// ==============================================================================

#[tokio::test]
async fn no_declared_availability_yields_empty_map() {
    let mock_server = MockServer::start().await;
    let doctor = TestUser::doctor(10);
    let token = doctor.token(&TestConfig::default().jwt_secret);

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&mock_server)
        .await;

    let resolver = resolver_for(&mock_server);
    let slots = resolver.resolve_slots(10, 7, &token).await.unwrap();

    assert!(slots.is_empty());
}

#[tokio::test]
async fn resolver_sorts_windows_regardless_of_store_order() {
    let mock_server = MockServer::start().await;
    let doctor = TestUser::doctor(10);
    let token = doctor.token(&TestConfig::default().jwt_secret);

    let day = tomorrow().to_string();
    // Store hands back the afternoon window first
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availability"))
        .and(query_param("doctor_id", "eq.10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            MockStoreRows::availability(2, 10, &day, "14:00:00", "15:00:00"),
            MockStoreRows::availability(1, 10, &day, "09:00:00", "10:00:00"),
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&mock_server)
        .await;

    let resolver = resolver_for(&mock_server);
    let by_date = resolver.resolve_slots(10, 7, &token).await.unwrap();

    let slots = &by_date[&tomorrow()];
    assert_eq!(slots.len(), 4);
    assert_eq!(slots[0].start_time, t(9, 0));
    assert_eq!(slots[1].start_time, t(9, 30));
    assert_eq!(slots[2].start_time, t(14, 0));
    assert_eq!(slots[3].start_time, t(14, 30));
}

#[tokio::test]
async fn booked_appointment_shows_up_as_occupied() {
    let mock_server = MockServer::start().await;
    let doctor = TestUser::doctor(10);
    let token = doctor.token(&TestConfig::default().jwt_secret);

    let day = tomorrow().to_string();
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            MockStoreRows::availability(1, 10, &day, "08:00:00", "09:00:00"),
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "eq.Booked"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            MockStoreRows::appointment(500, 20, 10, &day, "08:00:00", "Booked"),
        ])))
        .mount(&mock_server)
        .await;

    let resolver = resolver_for(&mock_server);
    let by_date = resolver.resolve_slots(10, 7, &token).await.unwrap();

    let slots = &by_date[&tomorrow()];
    assert_eq!(slots.len(), 2);
    assert!(slots[0].is_booked);
    assert!(!slots[1].is_booked);
}

#[tokio::test]
async fn resolution_is_idempotent_without_intervening_writes() {
    let mock_server = MockServer::start().await;
    let doctor = TestUser::doctor(10);
    let token = doctor.token(&TestConfig::default().jwt_secret);

    let day = tomorrow().to_string();
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            MockStoreRows::availability(1, 10, &day, "09:00:00", "11:00:00"),
        ])))
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(2)
        .mount(&mock_server)
        .await;

    let resolver = resolver_for(&mock_server);
    let first = resolver.resolve_slots(10, 7, &token).await.unwrap();
    let second = resolver.resolve_slots(10, 7, &token).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn zero_day_window_is_rejected_before_any_request() {
    let mock_server = MockServer::start().await;
    let doctor = TestUser::doctor(10);
    let token = doctor.token(&TestConfig::default().jwt_secret);

    let resolver = resolver_for(&mock_server);
    let result = resolver.resolve_slots(10, 0, &token).await;

    assert!(result.is_err());
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}
