use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use patient_cell::{
    patient_routes, CreatePatientRequest, PatientError, PatientSearchQuery, PatientService, Sex,
};
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};
use shared_utils::upload::FileUpload;

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn new_patient(record: Option<FileUpload>) -> CreatePatientRequest {
    CreatePatientRequest {
        last_name: "Durand".to_string(),
        first_name: "Paul".to_string(),
        birth_date: NaiveDate::from_ymd_opt(1980, 6, 15).unwrap(),
        sex: Sex::Male,
        record,
    }
}

fn pdf_record() -> FileUpload {
    FileUpload {
        file_name: "record.pdf".to_string(),
        content_type: "application/pdf".to_string(),
        data: "data:application/pdf;base64,JVBERi0xLjQ=".to_string(),
    }
}

#[tokio::test]
async fn test_create_with_record_stores_public_url() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());
    let patient_id = Uuid::new_v4().to_string();

    Mock::given(method("POST"))
        .and(path_regex("^/storage/v1/object/clinic-files/patients/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": "ok" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut with_record = MockSupabaseResponses::patient_response(&patient_id);
    with_record["record_url"] = json!("http://store/record.pdf");
    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .and(body_partial_json(json!({ "last_name": "Durand", "sex": "male" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([with_record])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let patient = PatientService::new(&config)
        .create_patient(new_patient(Some(pdf_record())), today())
        .await
        .unwrap();

    assert_eq!(patient.record_url.as_deref(), Some("http://store/record.pdf"));

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].url.path().starts_with("/storage/v1/object/clinic-files/patients/"));

    // The row is inserted with the id its record was filed under.
    let insert: Value = serde_json::from_slice(&requests[1].body).unwrap();
    let row_id = insert["id"].as_str().unwrap();
    let record_url = insert["record_url"].as_str().unwrap();
    assert!(record_url.contains(&format!("/storage/v1/object/public/clinic-files/patients/{}/", row_id)));
}

#[tokio::test]
async fn test_failed_record_upload_creates_no_patient() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());

    Mock::given(method("POST"))
        .and(path_regex("^/storage/v1/object/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("bucket unavailable"))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let result = PatientService::new(&config)
        .create_patient(new_patient(Some(pdf_record())), today())
        .await;

    assert_matches!(result, Err(PatientError::Storage(_)));
}

#[tokio::test]
async fn test_bad_record_is_rejected_before_insert() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());

    let result = PatientService::new(&config)
        .create_patient(new_patient(Some(FileUpload {
            file_name: "record.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            data: "%%%".to_string(),
        })), today())
        .await;

    assert_matches!(result, Err(PatientError::InvalidRecord(_)));
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_search_by_name() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("or", r#"(last_name.ilike."*dur*",first_name.ilike."*dur*")"#))
        .and(query_param("sex", "eq.male"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_response(&Uuid::new_v4().to_string())
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let patients = PatientService::new(&config)
        .search_patients(&PatientSearchQuery {
            name: Some(" dur ".to_string()),
            sex: Some(Sex::Male),
        })
        .await
        .unwrap();

    assert_eq!(patients.len(), 1);
    assert_eq!(patients[0].last_name, "Durand");
}

#[tokio::test]
async fn test_search_term_with_comma_stays_one_filter_value() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param(
            "or",
            r#"(last_name.ilike."*Martin, Anne*",first_name.ilike."*Martin, Anne*")"#,
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let patients = PatientService::new(&config)
        .search_patients(&PatientSearchQuery {
            name: Some("Martin, Anne".to_string()),
            sex: None,
        })
        .await
        .unwrap();

    assert!(patients.is_empty());
}

#[tokio::test]
async fn test_delete_unknown_patient() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let result = PatientService::new(&config).delete_patient(Uuid::new_v4()).await;
    assert_matches!(result, Err(PatientError::NotFound));
}

#[tokio::test]
async fn test_router_returns_patient_with_age() {
    let mock_server = MockServer::start().await;
    let config = Arc::new(TestConfig::with_store_url(&mock_server.uri()));
    let doctor = TestUser::doctor("doc@clinic.test");
    let token = JwtTestUtils::create_test_token(&doctor, &config.session_jwt_secret, Some(1));
    let patient_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", format!("eq.{}", patient_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_response(&patient_id)
        ])))
        .mount(&mock_server)
        .await;

    let response = patient_routes(config)
        .oneshot(
            Request::builder()
                .uri(format!("/{}", patient_id))
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["first_name"], "Paul");
    assert!(json["age"].as_u64().unwrap() >= 43);
}

#[tokio::test]
async fn test_router_rejects_invalid_form_with_422() {
    let test_config = TestConfig::default();
    let nurse = TestUser::nurse("nurse@clinic.test");
    let token = JwtTestUtils::create_test_token(&nurse, &test_config.jwt_secret, Some(1));

    let body = json!({
        "last_name": "",
        "first_name": "Paul",
        "birth_date": "1980-06-15",
        "sex": "female"
    });

    let response = patient_routes(test_config.to_arc())
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
}

#[tokio::test]
async fn test_router_forbids_material_manager() {
    let test_config = TestConfig::default();
    let manager = TestUser::material_manager("stock@clinic.test");
    let token = JwtTestUtils::create_test_token(&manager, &test_config.jwt_secret, Some(1));

    let response = patient_routes(test_config.to_arc())
        .oneshot(
            Request::builder()
                .uri("/")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
