use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scheduling_cell::router::scheduling_routes;
use shared_utils::test_utils::{MockStoreRows, TestConfig, TestUser};

fn test_app(mock_server: &MockServer) -> (Router, TestConfig) {
    let config = TestConfig::with_store_url(&mock_server.uri());
    (scheduling_routes(config.to_arc()), config)
}

fn tomorrow_str() -> String {
    (Utc::now().date_naive() + Duration::days(1)).to_string()
}

#[tokio::test]
async fn slots_require_authentication() {
    let mock_server = MockServer::start().await;
    let (app, _) = test_app(&mock_server);

    let request = Request::builder()
        .method("GET")
        .uri("/doctors/10/slots")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn patient_books_a_slot_over_http() {
    let mock_server = MockServer::start().await;
    let (app, config) = test_app(&mock_server);
    let token = TestUser::patient(20).token(&config.jwt_secret);

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockStoreRows::appointment(500, 20, 10, &tomorrow_str(), "09:00:00", "Booked"),
        ])))
        .mount(&mock_server)
        .await;

    let body = json!({
        "patient_id": 20,
        "doctor_id": 10,
        "date": tomorrow_str(),
        "time": "09:00:00",
    });

    let request = Request::builder()
        .method("POST")
        .uri("/appointments")
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json_response["success"], true);
    assert_eq!(json_response["appointment"]["app_id"], 500);
}

#[tokio::test]
async fn patient_cannot_book_for_another_patient() {
    let mock_server = MockServer::start().await;
    let (app, config) = test_app(&mock_server);
    let token = TestUser::patient(20).token(&config.jwt_secret);

    let body = json!({
        "patient_id": 77,
        "doctor_id": 10,
        "date": tomorrow_str(),
        "time": "09:00:00",
    });

    let request = Request::builder()
        .method("POST")
        .uri("/appointments")
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn taken_slot_answers_conflict() {
    let mock_server = MockServer::start().await;
    let (app, config) = test_app(&mock_server);
    let token = TestUser::patient(20).token(&config.jwt_secret);

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreRows::appointment(400, 99, 10, &tomorrow_str(), "09:00:00", "Booked"),
        ])))
        .mount(&mock_server)
        .await;

    let body = json!({
        "patient_id": 20,
        "doctor_id": 10,
        "date": tomorrow_str(),
        "time": "09:00:00",
    });

    let request = Request::builder()
        .method("POST")
        .uri("/appointments")
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn only_doctors_declare_availability() {
    let mock_server = MockServer::start().await;
    let (app, config) = test_app(&mock_server);
    let token = TestUser::patient(20).token(&config.jwt_secret);

    let body = json!({
        "date": tomorrow_str(),
        "start_time": "09:00:00",
        "end_time": "12:00:00",
    });

    let request = Request::builder()
        .method("POST")
        .uri("/availability")
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn doctor_declares_availability_over_http() {
    let mock_server = MockServer::start().await;
    let (app, config) = test_app(&mock_server);
    let token = TestUser::doctor(10).token(&config.jwt_secret);

    Mock::given(method("POST"))
        .and(path("/rest/v1/doctor_availability"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockStoreRows::availability(1, 10, &tomorrow_str(), "09:00:00", "12:00:00"),
        ])))
        .mount(&mock_server)
        .await;

    let body = json!({
        "date": tomorrow_str(),
        "start_time": "09:00:00",
        "end_time": "12:00:00",
    });

    let request = Request::builder()
        .method("POST")
        .uri("/availability")
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn inverted_window_answers_bad_request() {
    let mock_server = MockServer::start().await;
    let (app, config) = test_app(&mock_server);
    let token = TestUser::doctor(10).token(&config.jwt_secret);

    let body = json!({
        "date": tomorrow_str(),
        "start_time": "12:00:00",
        "end_time": "09:00:00",
    });

    let request = Request::builder()
        .method("POST")
        .uri("/availability")
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}
