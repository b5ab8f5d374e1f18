use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scheduling_cell::models::{RecordTreatmentRequest, SchedulingError};
use scheduling_cell::services::treatment::TreatmentService;
use shared_utils::test_utils::{MockStoreRows, TestConfig, TestUser};

fn service_for(mock_server: &MockServer) -> TreatmentService {
    let config = TestConfig::with_store_url(&mock_server.uri()).to_app_config();
    TreatmentService::new(&config)
}

fn doctor_token() -> String {
    TestUser::doctor(10).token(&TestConfig::default().jwt_secret)
}

fn request() -> RecordTreatmentRequest {
    RecordTreatmentRequest {
        diagnosis: "Seasonal flu".to_string(),
        prescription: "Rest and fluids".to_string(),
        notes: None,
    }
}

fn booked_appointment_row() -> serde_json::Value {
    let day = (Utc::now().date_naive() + Duration::days(1)).to_string();
    MockStoreRows::appointment(500, 20, 10, &day, "09:00:00", "Booked")
}

#[tokio::test]
async fn recording_a_treatment_completes_the_appointment() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            booked_appointment_row(),
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/treatments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!([
            MockStoreRows::treatment(900, 500),
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("app_id", "eq.500"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
            "app_id": 500, "patient_id": 20, "doctor_id": 10,
            "date": (Utc::now().date_naive() + Duration::days(1)).to_string(),
            "time": "09:00:00", "status": "Completed"
        }])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let treatment = service
        .record_treatment(10, 500, &request(), &doctor_token())
        .await
        .unwrap();

    assert_eq!(treatment.treatment_id, 900);
    assert_eq!(treatment.app_id, 500);
}

#[tokio::test]
async fn treatment_by_a_different_doctor_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            booked_appointment_row(),
        ])))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let result = service
        .record_treatment(11, 500, &request(), &doctor_token())
        .await;

    assert_matches!(result, Err(SchedulingError::NotFoundOrUnauthorized));
}

#[tokio::test]
async fn duplicate_treatment_maps_to_already_recorded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            booked_appointment_row(),
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/treatments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"treatments_app_id_key\""
        })))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let result = service
        .record_treatment(10, 500, &request(), &doctor_token())
        .await;

    assert_matches!(result, Err(SchedulingError::TreatmentAlreadyRecorded));
}

#[tokio::test]
async fn failed_completion_rolls_the_treatment_back() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            booked_appointment_row(),
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/treatments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!([
            MockStoreRows::treatment(900, 500),
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(500).set_body_string("store down"))
        .mount(&mock_server)
        .await;

    // The compensating delete must target the treatment row just created
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/treatments"))
        .and(query_param("treatment_id", "eq.900"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let result = service
        .record_treatment(10, 500, &request(), &doctor_token())
        .await;

    assert_matches!(result, Err(SchedulingError::Store(_)));
}
