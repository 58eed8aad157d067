//! `ApiClient` over real HTTP against a mock backend.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use ferry_auth::{MemoryCredentialStore, SessionGate, UnauthorizedBus};
use ferry_client::{ApiClient, ApiError, FileUpload};
use ferry_core::TaskStatus;
use ferry_settings::ApiSettings;
use parking_lot::Mutex;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, timeout_ms: u64) -> ApiClient {
    let gate = Arc::new(SessionGate::new(
        Arc::new(MemoryCredentialStore::new()),
        UnauthorizedBus::new(),
    ));
    gate.set_session("secret").unwrap();
    let api = ApiSettings {
        base_url: server.uri(),
        request_timeout_ms: timeout_ms,
        ..ApiSettings::default()
    };
    ApiClient::from_settings(gate, &api).unwrap()
}

#[tokio::test]
async fn task_list_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/system/api/tasks.php"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "tasks": [
                {"id": 1, "title": "Printer", "status_code": "OPENED", "priority": "HIGH"},
                {"task_id": "2", "title": "Badge", "status": "review"},
            ],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tasks = client(&server, 5_000).list_tasks().await.unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[1].status_code, Some(TaskStatus::Review));
}

#[tokio::test]
async fn unauthorized_response_forces_logout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/get-contacts.php"))
        .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
        .mount(&server)
        .await;

    let client = client(&server, 5_000);
    let reasons: Arc<Mutex<Vec<String>>> = Arc::default();
    let _sub = {
        let reasons = Arc::clone(&reasons);
        client
            .gate()
            .subscribe(move |r| reasons.lock().push(r.to_string()))
    };

    let err = client.contacts().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(reasons.lock().len(), 1);
    assert!(!client.gate().is_authenticated());
}

#[tokio::test]
async fn status_update_sends_put_with_query() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/system/api/tasks.php"))
        .and(query_param("id", "5"))
        .and(query_param("action", "status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server, 5_000)
        .update_status(5, TaskStatus::Completed)
        .await
        .unwrap();
}

#[tokio::test]
async fn upload_is_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/system/api/upload.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server, 5_000)
        .upload_task_file(
            3,
            FileUpload {
                file_name: "invoice.pdf".into(),
                mime: None,
                bytes: b"%PDF-1.4".to_vec(),
            },
        )
        .await
        .unwrap();

    let received = &server.received_requests().await.unwrap()[0];
    let body = String::from_utf8_lossy(&received.body);
    assert!(body.contains("name=\"task_id\""));
    assert!(body.to_ascii_lowercase().contains("content-type: application/pdf"));
}

#[tokio::test]
async fn slow_backend_times_out_as_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "tasks": []}))
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;

    let err = client(&server, 100).list_tasks().await.unwrap_err();
    assert_matches!(err, ApiError::Transport(_));
    assert_eq!(err.user_message("fallback"), "request timed out");
}
