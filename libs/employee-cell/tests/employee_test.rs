use assert_matches::assert_matches;
use tokio_test::assert_ok;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use employee_cell::{
    employee_routes, CreateEmployeeRequest, EmployeeError, EmployeeSearchQuery, EmployeeService,
    EmployeeSort, NotificationPreferencesRequest, Role, UpdateEmployeeRequest,
};
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};
use shared_utils::upload::FileUpload;

fn create_request(login: &str) -> CreateEmployeeRequest {
    CreateEmployeeRequest {
        last_name: "Martin".to_string(),
        first_name: "Claire".to_string(),
        role: Role::Doctor,
        login: login.to_string(),
        password: "Str0ng-pass".to_string(),
        email: format!("{}@clinic.test", login),
        phone: Some("+21612345678".to_string()),
        hire_date: NaiveDate::from_ymd_opt(2022, 3, 1).unwrap(),
        service: "Cardiology".to_string(),
        state: None,
        photo: None,
    }
}

fn png_photo() -> FileUpload {
    FileUpload {
        file_name: "portrait.png".to_string(),
        content_type: "image/png".to_string(),
        data: "data:image/png;base64,iVBORw0KGgo=".to_string(),
    }
}

#[tokio::test]
async fn test_create_employee_hashes_password() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());
    let id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/employees"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/employees"))
        .and(body_partial_json(json!({ "login": "cmartin", "state": "active" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::employee_response(&id, "cmartin", "doctor")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = EmployeeService::new(&config);
    let employee = assert_ok!(service.create(create_request("cmartin")).await);

    assert_eq!(employee.id.to_string(), id);
    assert_eq!(employee.role, Role::Doctor);

    let requests = mock_server.received_requests().await.unwrap();
    let post = requests.iter().find(|r| r.method.as_str() == "POST").unwrap();
    let body: Value = serde_json::from_slice(&post.body).unwrap();
    assert!(body["password"].as_str().unwrap().starts_with("$argon2"));
}

#[tokio::test]
async fn test_create_employee_rejects_taken_login() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/employees"))
        .and(query_param("login", "eq.cmartin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::employee_response(&Uuid::new_v4().to_string(), "cmartin", "nurse")
        ])))
        .mount(&mock_server)
        .await;

    let service = EmployeeService::new(&config);
    let result = service.create(create_request("cmartin")).await;

    assert_matches!(result, Err(EmployeeError::LoginTaken { login }) if login == "cmartin");
}

#[tokio::test]
async fn test_create_employee_reports_all_field_errors() {
    let config = TestConfig::default().to_app_config();
    let mut request = create_request("x");
    request.first_name = "C1aire".to_string();
    request.phone = Some("42".to_string());

    let service = EmployeeService::new(&config);
    let result = service.create(request).await;

    assert_matches!(result, Err(EmployeeError::Invalid(errors)) if errors.len() == 2);
}

#[tokio::test]
async fn test_search_builds_filters_and_order() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/employees"))
        .and(query_param("role", "eq.nurse"))
        .and(query_param("state", "eq.active"))
        .and(query_param("order", "hire_date.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::employee_response(&Uuid::new_v4().to_string(), "nurse1", "nurse")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = EmployeeService::new(&config);
    let employees = service.search(&EmployeeSearchQuery {
        q: None,
        role: Some(Role::Nurse),
        state: Some(employee_cell::EmployeeState::Active),
        sort: Some(EmployeeSort::HireDateAsc),
    }).await.unwrap();

    assert_eq!(employees.len(), 1);
}

#[tokio::test]
async fn test_search_term_with_comma_is_quoted() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());
    let term = r#""*Martin, Anne*""#;

    Mock::given(method("GET"))
        .and(path("/rest/v1/employees"))
        .and(query_param(
            "or",
            format!(
                "(last_name.ilike.{t},first_name.ilike.{t},email.ilike.{t},login.ilike.{t})",
                t = term
            ),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let employees = EmployeeService::new(&config).search(&EmployeeSearchQuery {
        q: Some("Martin, Anne".to_string()),
        role: None,
        state: None,
        sort: None,
    }).await.unwrap();

    assert!(employees.is_empty());
}

#[tokio::test]
async fn test_create_employee_uploads_photo_before_insert() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/employees"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path_regex("^/storage/v1/object/clinic-files/employees/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": "ok" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/employees"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::employee_response(&Uuid::new_v4().to_string(), "cmartin", "doctor")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut request = create_request("cmartin");
    request.photo = Some(png_photo());
    assert_ok!(EmployeeService::new(&config).create(request).await);

    let requests = mock_server.received_requests().await.unwrap();
    let upload_at = requests.iter().position(|r| r.url.path().starts_with("/storage/")).unwrap();
    let insert_at = requests.iter().position(|r| r.url.path() == "/rest/v1/employees" && r.method.as_str() == "POST").unwrap();
    assert!(upload_at < insert_at);

    let insert: Value = serde_json::from_slice(&requests[insert_at].body).unwrap();
    let row_id = insert["id"].as_str().unwrap();
    assert!(insert["photo_url"]
        .as_str()
        .unwrap()
        .contains(&format!("/storage/v1/object/public/clinic-files/employees/{}/", row_id)));
}

#[tokio::test]
async fn test_update_replaces_photo_and_deletes_the_old_one() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());
    let id = Uuid::new_v4();
    let old_url = format!("{}/storage/v1/object/public/clinic-files/employees/{}/old.png", mock_server.uri(), id);

    let mut current = MockSupabaseResponses::employee_response(&id.to_string(), "cmartin", "doctor");
    current["photo_url"] = json!(old_url);
    Mock::given(method("GET"))
        .and(path("/rest/v1/employees"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([current.clone()])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path_regex(format!("^/storage/v1/object/clinic-files/employees/{}/", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": "ok" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut updated = current.clone();
    updated["photo_url"] = json!("http://store/new.png");
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/employees"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([updated])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(format!("/storage/v1/object/clinic-files/employees/{}/old.png", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let employee = EmployeeService::new(&config)
        .update(id, UpdateEmployeeRequest {
            photo: Some(png_photo()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(employee.photo_url.as_deref(), Some("http://store/new.png"));
}

#[tokio::test]
async fn test_non_image_photo_is_rejected_before_any_request() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());

    let mut request = create_request("cmartin");
    request.photo = Some(FileUpload {
        file_name: "notes.txt".to_string(),
        content_type: "text/plain".to_string(),
        data: "aGVsbG8=".to_string(),
    });

    let result = EmployeeService::new(&config).create(request).await;

    assert_matches!(result, Err(EmployeeError::InvalidPhoto(_)));
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_notification_preferences_reject_admins() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());
    let id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/employees"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::employee_response(&id.to_string(), "boss", "admin")
        ])))
        .mount(&mock_server)
        .await;

    let service = EmployeeService::new(&config);
    let result = service.update_notification_preferences(id, NotificationPreferencesRequest {
        notification_enabled: false,
        notification_interval_hours: 12,
    }).await;

    assert_matches!(result, Err(EmployeeError::NotificationsUnavailable));

    let result = service.update_notification_preferences(id, NotificationPreferencesRequest {
        notification_enabled: true,
        notification_interval_hours: 0,
    }).await;

    assert_matches!(result, Err(EmployeeError::Invalid(_)));
}

#[tokio::test]
async fn test_router_requires_token() {
    let config = TestConfig::default().to_arc();
    let app = employee_routes(config);

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_router_forbids_non_admins() {
    let test_config = TestConfig::default();
    let app = employee_routes(test_config.to_arc());
    let nurse = TestUser::nurse("nurse@clinic.test");
    let token = JwtTestUtils::create_test_token(&nurse, &test_config.jwt_secret, Some(1));

    let response = app
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

#[tokio::test]
async fn test_router_exports_csv_for_admin() {
    let mock_server = MockServer::start().await;
    let config = std::sync::Arc::new(TestConfig::with_store_url(&mock_server.uri()));
    let admin = TestUser::admin("admin@clinic.test");
    let token = JwtTestUtils::create_test_token(&admin, &config.session_jwt_secret, Some(1));

    Mock::given(method("GET"))
        .and(path("/rest/v1/employees"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::employee_response(&Uuid::new_v4().to_string(), "cmartin", "doctor")
        ])))
        .mount(&mock_server)
        .await;

    let response = employee_routes(config)
        .oneshot(
            Request::builder()
                .uri("/export?sort=name_asc")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/csv; charset=utf-8"
    );

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.starts_with("Last name,First name,Role"));
    assert!(text.contains("Martin,Claire,Doctor,cmartin"));
}
