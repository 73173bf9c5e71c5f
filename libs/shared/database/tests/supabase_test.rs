use reqwest::Method;
use serde_json::{json, Value};
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, header, query_param};

use shared_config::AppConfig;
use shared_database::SupabaseClient;

fn config_for(server: &MockServer) -> AppConfig {
    AppConfig {
        supabase_url: server.uri(),
        supabase_anon_key: "anon-key".to_string(),
        supabase_service_key: "service-key".to_string(),
        ..AppConfig::default()
    }
}

#[tokio::test]
async fn test_request_sends_store_key_when_no_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/materials"))
        .and(query_param("state", "eq.in_service"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer service-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1 }])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = SupabaseClient::new(&config_for(&mock_server));
    let rows: Vec<Value> = client
        .request(Method::GET, "/rest/v1/materials?state=eq.in_service", None, None)
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_request_maps_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/loans"))
        .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
        .mount(&mock_server)
        .await;

    let client = SupabaseClient::new(&config_for(&mock_server));
    let result: anyhow::Result<Vec<Value>> = client
        .request(Method::GET, "/rest/v1/loans", None, None)
        .await;

    let message = result.unwrap_err().to_string();
    assert!(message.contains("Resource not found"));
}

#[tokio::test]
async fn test_execute_ignores_empty_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/alerts"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = SupabaseClient::new(&config_for(&mock_server));
    client
        .execute(Method::DELETE, "/rest/v1/alerts?resolved=eq.false", None, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_upload_object_returns_public_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/storage/v1/object/clinic-files/patients/abc.pdf"))
        .and(header("content-type", "application/pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": "ok" })))
        .mount(&mock_server)
        .await;

    let client = SupabaseClient::new(&config_for(&mock_server));
    let url = client
        .upload_object("patients/abc.pdf", b"%PDF".to_vec(), "application/pdf")
        .await
        .unwrap();

    assert_eq!(
        url,
        format!("{}/storage/v1/object/public/clinic-files/patients/abc.pdf", mock_server.uri())
    );
}

#[tokio::test]
async fn test_delete_object_by_public_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/storage/v1/object/clinic-files/employees/photo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = SupabaseClient::new(&config_for(&mock_server));
    let url = format!("{}/storage/v1/object/public/clinic-files/employees/photo.png", mock_server.uri());

    let object_path = client.object_path_of(&url).unwrap();
    assert_eq!(object_path, "employees/photo.png");
    assert_eq!(client.object_path_of("https://elsewhere.test/photo.png"), None);

    client.delete_object(object_path).await.unwrap();
}

#[test]
fn test_ilike_term_is_quoted_and_encoded() {
    assert_eq!(SupabaseClient::ilike_term("dur"), "%22%2Adur%2A%22");
    assert_eq!(
        urlencoding::decode(&SupabaseClient::ilike_term(r#"Martin, "Anne""#)).unwrap(),
        r#""*Martin, \"Anne\"*""#
    );
}
