use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::{
    appointment_routes, AppointmentError, AppointmentService, CreateAppointmentRequest,
    UpdateAppointmentRequest, AppointmentStatus,
};
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn next_monday() -> NaiveDate {
    let mut date = Utc::now().date_naive() + Duration::days(7);
    while date.weekday() != Weekday::Mon {
        date += Duration::days(1);
    }
    date
}

fn ten_thirty() -> NaiveTime {
    NaiveTime::from_hms_opt(10, 30, 0).unwrap()
}

fn ymd(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

async fn mount_employee(mock_server: &MockServer, id: Uuid, role: &str) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/employees"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::employee_response(&id.to_string(), "jdoe", role)
        ])))
        .mount(mock_server)
        .await;
}

async fn mount_patient(mock_server: &MockServer, id: Uuid) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": id }])))
        .mount(mock_server)
        .await;
}

async fn mount_slot(mock_server: &MockServer, date: NaiveDate, rows: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("appointment_date", format!("eq.{}", ymd(date))))
        .and(query_param("appointment_time", "eq.10:30:00"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_booking_rejected_when_doctor_is_taken() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());
    let (doctor_id, patient_id) = (Uuid::new_v4(), Uuid::new_v4());
    let date = next_monday();

    mount_employee(&mock_server, doctor_id, "doctor").await;
    mount_patient(&mock_server, patient_id).await;
    mount_slot(&mock_server, date, json!([
        MockSupabaseResponses::appointment_response(
            &Uuid::new_v4().to_string(),
            &Uuid::new_v4().to_string(),
            &doctor_id.to_string(),
            &ymd(date),
            "10:30:00",
        )
    ])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let result = AppointmentService::new(&config).create(CreateAppointmentRequest {
        patient_id,
        doctor_id,
        appointment_date: date,
        appointment_time: ten_thirty(),
    }, Utc::now().naive_utc()).await;

    assert_matches!(result, Err(AppointmentError::Conflicts(messages)) if messages.len() == 1);
}

#[tokio::test]
async fn test_booking_is_created_scheduled() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());
    let (doctor_id, patient_id) = (Uuid::new_v4(), Uuid::new_v4());
    let appointment_id = Uuid::new_v4();
    let date = next_monday();

    mount_employee(&mock_server, doctor_id, "doctor").await;
    mount_patient(&mock_server, patient_id).await;
    mount_slot(&mock_server, date, json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({ "status": "scheduled", "appointment_time": "10:30:00" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                &appointment_id.to_string(),
                &patient_id.to_string(),
                &doctor_id.to_string(),
                &ymd(date),
                "10:30:00",
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let appointment = AppointmentService::new(&config).create(CreateAppointmentRequest {
        patient_id,
        doctor_id,
        appointment_date: date,
        appointment_time: ten_thirty(),
    }, Utc::now().naive_utc()).await.unwrap();

    assert_eq!(appointment.id, appointment_id);
    assert_eq!(appointment.status, AppointmentStatus::Scheduled);
}

#[tokio::test]
async fn test_weekend_booking_never_reaches_store() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());
    let saturday = next_monday() + Duration::days(5);

    let result = AppointmentService::new(&config).create(CreateAppointmentRequest {
        patient_id: Uuid::new_v4(),
        doctor_id: Uuid::new_v4(),
        appointment_date: saturday,
        appointment_time: ten_thirty(),
    }, Utc::now().naive_utc()).await;

    assert_matches!(result, Err(AppointmentError::Invalid(errors)) if errors.len() == 1);
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_booking_with_nurse_as_doctor_is_rejected() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());
    let (nurse_id, patient_id) = (Uuid::new_v4(), Uuid::new_v4());

    mount_employee(&mock_server, nurse_id, "nurse").await;
    mount_patient(&mock_server, patient_id).await;

    let result = AppointmentService::new(&config).create(CreateAppointmentRequest {
        patient_id,
        doctor_id: nurse_id,
        appointment_date: next_monday(),
        appointment_time: ten_thirty(),
    }, Utc::now().naive_utc()).await;

    assert_matches!(result, Err(AppointmentError::DoctorNotFound));
}

#[tokio::test]
async fn test_update_excludes_itself_from_conflicts() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());
    let (doctor_id, patient_id, appointment_id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let date = next_monday();
    let row = MockSupabaseResponses::appointment_response(
        &appointment_id.to_string(),
        &patient_id.to_string(),
        &doctor_id.to_string(),
        &ymd(date),
        "10:30:00",
    );

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row.clone()])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("neq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut completed = row.clone();
    completed["status"] = json!("completed");
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({ "status": "completed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([completed])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let updated = AppointmentService::new(&config).update(
        appointment_id,
        UpdateAppointmentRequest {
            status: Some(AppointmentStatus::Completed),
            ..Default::default()
        },
        Utc::now().naive_utc(),
    ).await.unwrap();

    assert_eq!(updated.status, AppointmentStatus::Completed);
    assert_eq!(updated.patient_id, patient_id);
}

#[tokio::test]
async fn test_cancelled_weekend_appointment_cannot_be_rescheduled_in_place() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());
    let appointment_id = Uuid::new_v4();

    // Saturday evening, already in the past.
    let mut row = MockSupabaseResponses::appointment_response(
        &appointment_id.to_string(),
        &Uuid::new_v4().to_string(),
        &Uuid::new_v4().to_string(),
        "2025-03-01",
        "22:00:00",
    );
    row["status"] = json!("cancelled");

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let result = AppointmentService::new(&config).update(
        appointment_id,
        UpdateAppointmentRequest {
            status: Some(AppointmentStatus::Scheduled),
            ..Default::default()
        },
        Utc::now().naive_utc(),
    ).await;

    assert_matches!(result, Err(AppointmentError::Invalid(errors)) if errors.len() == 3);
}

#[tokio::test]
async fn test_only_scheduled_appointments_can_be_cancelled() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());
    let appointment_id = Uuid::new_v4();

    let mut row = MockSupabaseResponses::appointment_response(
        &appointment_id.to_string(),
        &Uuid::new_v4().to_string(),
        &Uuid::new_v4().to_string(),
        "2024-03-04",
        "09:00:00",
    );
    row["status"] = json!("completed");

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(&mock_server)
        .await;

    let result = AppointmentService::new(&config).cancel(appointment_id).await;
    assert_matches!(result, Err(AppointmentError::CannotCancel(AppointmentStatus::Completed)));
}

#[tokio::test]
async fn test_doctor_history_requires_a_doctor() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());
    let nurse_id = Uuid::new_v4();

    mount_employee(&mock_server, nurse_id, "nurse").await;

    let result = AppointmentService::new(&config).doctor_history(nurse_id).await;
    assert_matches!(result, Err(AppointmentError::DoctorNotFound));
}

#[tokio::test]
async fn test_router_answers_conflicts_with_422() {
    let mock_server = MockServer::start().await;
    let config = Arc::new(TestConfig::with_store_url(&mock_server.uri()));
    let nurse = TestUser::nurse("nurse@clinic.test");
    let token = JwtTestUtils::create_test_token(&nurse, &config.session_jwt_secret, Some(1));
    let (doctor_id, patient_id) = (Uuid::new_v4(), Uuid::new_v4());
    let date = next_monday();

    mount_employee(&mock_server, doctor_id, "doctor").await;
    mount_patient(&mock_server, patient_id).await;
    mount_slot(&mock_server, date, json!([
        MockSupabaseResponses::appointment_response(
            &Uuid::new_v4().to_string(),
            &patient_id.to_string(),
            &doctor_id.to_string(),
            &ymd(date),
            "10:30:00",
        )
    ])).await;

    let body = json!({
        "patient_id": patient_id,
        "doctor_id": doctor_id,
        "appointment_date": ymd(date),
        "appointment_time": "10:30:00"
    });

    let response = appointment_routes(config)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["errors"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_router_conflict_check_is_read_only() {
    let mock_server = MockServer::start().await;
    let config = Arc::new(TestConfig::with_store_url(&mock_server.uri()));
    let doctor = TestUser::doctor("doc@clinic.test");
    let token = JwtTestUtils::create_test_token(&doctor, &config.session_jwt_secret, Some(1));
    let date = next_monday();

    mount_slot(&mock_server, date, json!([])).await;

    let uri = format!(
        "/conflicts/check?patient_id={}&doctor_id={}&date={}&time=10:30:00",
        Uuid::new_v4(),
        doctor.uuid(),
        ymd(date)
    );

    let response = appointment_routes(config)
        .oneshot(
            Request::builder()
                .uri(uri)
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["has_conflict"], false);
}

#[tokio::test]
async fn test_router_rejects_material_manager_and_anonymous() {
    let test_config = TestConfig::default();
    let manager = TestUser::material_manager("stock@clinic.test");
    let token = JwtTestUtils::create_test_token(&manager, &test_config.jwt_secret, Some(1));

    let forbidden = appointment_routes(test_config.to_arc())
        .oneshot(
            Request::builder()
                .uri("/")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let anonymous = appointment_routes(test_config.to_arc())
        .oneshot(Request::builder().uri("/history").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
}
