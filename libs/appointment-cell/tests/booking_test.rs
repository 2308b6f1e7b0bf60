use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use serde_json::json;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{body_partial_json, header, method, path};

use appointment_cell::models::*;
use appointment_cell::services::booking::{AppointmentGateway, BookingService, SupabaseAppointmentGateway};
use clinic_discovery_cell::models::{FacilityRecord, FacilitySource};
use shared_utils::test_utils::{MockUpstreamResponses, TestConfig};

fn heart_centre() -> FacilityRecord {
    let mut record = FacilityRecord::new(FacilitySource::Registered, "c-1", "Amae Heart Centre");
    record.specialty = "Cardiology".to_string();
    record
}

fn scenario_b_form() -> BookingForm {
    BookingForm {
        requested_date: Some("2024-06-01".to_string()),
        requested_time: Some("14:00".to_string()),
        reason_text: Some(String::new()),
    }
}

async fn open_draft(service: &BookingService, record: &FacilityRecord) -> BookingRequest {
    match service.open(record).await {
        FacilitySelection::Book { booking } => booking,
        other => panic!("expected a booking draft, got {:?}", other),
    }
}

/// Gateway that never answers.
struct HangingGateway;

/// Gateway that rejects every booking after a short delay.
struct SlowRejectingGateway;

#[async_trait]
impl AppointmentGateway for SlowRejectingGateway {
    async fn create_appointment(&self, _: &BookingRequest, _: Option<&str>) -> Result<String, BookingError> {
        tokio::time::sleep(Duration::from_millis(300)).await;
        Err(BookingError::Gateway("Clinic is fully booked".to_string()))
    }
}

#[async_trait]
impl AppointmentGateway for HangingGateway {
    async fn create_appointment(&self, _: &BookingRequest, _: Option<&str>) -> Result<String, BookingError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok("never".to_string())
    }
}

#[tokio::test]
async fn test_scenario_b_submission_is_confirmed() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({
            "clinic_id": "c-1",
            "appointment_date": "2024-06-01",
            "appointment_time": "14:00",
            "reason": ""
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockUpstreamResponses::appointment_created("c-1")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = BookingService::new(&config);
    let draft = open_draft(&service, &heart_centre()).await;
    service.update(draft.id, scenario_b_form()).await.unwrap();

    let submitted = service.submit(draft.id, None).await.unwrap();

    assert_eq!(submitted.status, BookingStatus::Confirmed);
    let confirmation = submitted.confirmation.unwrap();
    assert_eq!(confirmation.redirect_to, "/dashboard");
    assert!(!confirmation.appointment_id.is_empty());

    // the modal is done with a confirmed booking
    assert_matches!(service.get(draft.id).await, Err(BookingError::NotFound));
}

#[tokio::test]
async fn test_gateway_error_is_kept_verbatim_and_resubmission_works() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(
            MockUpstreamResponses::error_response("This time slot is no longer available", "23505"),
        ))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockUpstreamResponses::appointment_created("c-1")
        ])))
        .mount(&mock_server)
        .await;

    let service = BookingService::new(&config);
    let draft = open_draft(&service, &heart_centre()).await;
    service.update(draft.id, scenario_b_form()).await.unwrap();

    let failed = service.submit(draft.id, None).await.unwrap();
    assert_eq!(failed.status, BookingStatus::Failed);
    assert_eq!(failed.last_error.as_deref(), Some("This time slot is no longer available"));
    assert_eq!(failed.requested_date, "2024-06-01");
    assert_eq!(failed.requested_time, "14:00");

    let retried = service.submit(draft.id, None).await.unwrap();
    assert_eq!(retried.status, BookingStatus::Confirmed);
    assert_eq!(retried.last_error, None);
}

#[tokio::test]
async fn test_user_token_is_forwarded_to_gateway() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(header("Authorization", "Bearer patient-jwt"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": 42 }])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway = SupabaseAppointmentGateway::new(&config);
    let mut request = BookingRequest::draft_for(&heart_centre());
    request.requested_date = "2024-06-01".to_string();
    request.requested_time = "09:30".to_string();

    let id = gateway.create_appointment(&request, Some("patient-jwt")).await.unwrap();
    assert_eq!(id, "42");
}

#[tokio::test]
async fn test_empty_representation_is_a_failure() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let gateway = SupabaseAppointmentGateway::new(&config);
    let result = gateway.create_appointment(&BookingRequest::draft_for(&heart_centre()), None).await;

    assert_matches!(result, Err(BookingError::Gateway(_)));
}

#[tokio::test]
async fn test_hung_gateway_times_out_into_failed() {
    let config = TestConfig::default().to_app_config();
    let config = shared_config::AppConfig {
        booking_timeout_secs: 1,
        ..config
    };

    let service = BookingService::with_gateway(&config, Arc::new(HangingGateway));
    let draft = open_draft(&service, &heart_centre()).await;
    service.update(draft.id, scenario_b_form()).await.unwrap();

    let result = service.submit(draft.id, None).await.unwrap();

    assert_eq!(result.status, BookingStatus::Failed);
    assert!(result.last_error.unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_validation_failure_makes_no_gateway_call() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": "x" }])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = BookingService::new(&config);
    let draft = open_draft(&service, &heart_centre()).await;
    service.update(draft.id, BookingForm {
        requested_date: Some("2024-06-01".to_string()),
        ..BookingForm::default()
    }).await.unwrap();

    let result = service.submit(draft.id, None).await;

    assert_matches!(result, Err(BookingError::Validation(_)));
    assert_eq!(service.get(draft.id).await.unwrap().status, BookingStatus::Draft);
}

#[tokio::test]
async fn test_close_while_submitting_is_rejected() {
    let config = TestConfig::default().to_app_config();
    let service = Arc::new(BookingService::with_gateway(&config, Arc::new(HangingGateway)));
    let draft = open_draft(&service, &heart_centre()).await;
    service.update(draft.id, scenario_b_form()).await.unwrap();

    let submitting = service.clone();
    let id = draft.id;
    let task = tokio::spawn(async move { submitting.submit(id, None).await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(service.get(id).await.unwrap().status, BookingStatus::Submitting);
    assert_matches!(service.close(id).await, Err(BookingError::StillSubmitting));

    let finished = task.await.unwrap().unwrap();
    assert_eq!(finished.status, BookingStatus::Failed);

    service.close(id).await.unwrap();
    assert_matches!(service.get(id).await, Err(BookingError::NotFound));
}

#[tokio::test]
async fn test_abandoned_submission_still_records_outcome() {
    let config = TestConfig::default().to_app_config();
    let service = Arc::new(BookingService::with_gateway(&config, Arc::new(SlowRejectingGateway)));
    let draft = open_draft(&service, &heart_centre()).await;
    service.update(draft.id, scenario_b_form()).await.unwrap();

    let submitting = service.clone();
    let id = draft.id;
    let caller = tokio::spawn(async move { submitting.submit(id, None).await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    caller.abort();
    assert_eq!(service.get(id).await.unwrap().status, BookingStatus::Submitting);

    tokio::time::sleep(Duration::from_millis(500)).await;
    let settled = service.get(id).await.unwrap();
    assert_eq!(settled.status, BookingStatus::Failed);
    assert_eq!(settled.last_error.as_deref(), Some("Clinic is fully booked"));

    service.update(id, BookingForm::default()).await.unwrap();
    service.close(id).await.unwrap();
}

#[tokio::test]
async fn test_idle_drafts_are_evicted_when_another_opens() {
    let config = shared_config::AppConfig {
        idle_ttl_secs: 1,
        ..TestConfig::default().to_app_config()
    };
    let service = BookingService::with_gateway(&config, Arc::new(HangingGateway));

    let stale = open_draft(&service, &heart_centre()).await;
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let fresh = open_draft(&service, &heart_centre()).await;

    assert_matches!(service.get(stale.id).await, Err(BookingError::NotFound));
    assert_eq!(service.get(fresh.id).await.unwrap().status, BookingStatus::Draft);
}

#[tokio::test]
async fn test_non_registered_selection_creates_no_draft() {
    let config = TestConfig::default().to_app_config();
    let service = BookingService::with_gateway(&config, Arc::new(HangingGateway));

    for source in [FacilitySource::AiSearch, FacilitySource::PlacesSearch] {
        let record = FacilityRecord::new(source, "x-1", "Some Clinic");
        assert_matches!(service.open(&record).await, FacilitySelection::Contact { .. });
    }

    assert!(service.store().is_empty().await);
}
