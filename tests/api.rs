//! API endpoint integration tests

use std::io::Write;
use std::sync::Arc;

use alex_gateway::api::ApiServerBuilder;
use alex_gateway::{AnswerResult, HttpBackend, KnowledgeSource, session::Backend};
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use tempfile::NamedTempFile;
use tower::ServiceExt;

mod common;
use common::{MockGateway, TRAFFIC_STOP};

const BOUNDARY: &str = "alex-test-boundary";

fn knowledge_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

/// Build a test API router, with or without a gateway
fn build_test_router(knowledge: &NamedTempFile, gateway: Option<Arc<MockGateway>>) -> axum::Router {
    let mut builder = ApiServerBuilder::new(KnowledgeSource::new(knowledge.path()), 0);
    if let Some(gateway) = gateway {
        builder = builder.gateway(gateway);
    }
    builder.build().router()
}

fn json_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn multipart_post(field: &str, file_name: Option<&str>, data: &[u8]) -> Request<Body> {
    let disposition = match file_name {
        Some(name) => format!("form-data; name=\"{field}\"; filename=\"{name}\""),
        None => format!("form-data; name=\"{field}\""),
    };

    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Disposition: {disposition}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: audio/webm\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/transcribe")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let knowledge = knowledge_file("<p>procedures</p>");
    let app = build_test_router(&knowledge, None);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_ready_endpoint() {
    let knowledge = knowledge_file("<p>procedures</p>");
    let app = build_test_router(&knowledge, Some(MockGateway::new()));

    let response = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["checks"]["gateway"]["status"], "ok");
    assert_eq!(json["checks"]["knowledge"]["status"], "ok");
}

#[tokio::test]
async fn test_ready_degraded_without_credential() {
    let knowledge = knowledge_file("<p>procedures</p>");
    let app = build_test_router(&knowledge, None);

    let response = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let json = json_body(response).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["checks"]["gateway"]["status"], "fail");
}

#[tokio::test]
async fn test_missing_credential_rejects_every_proxy() {
    let knowledge = knowledge_file("<p>procedures</p>");
    let requests = [
        json_post("/api/ask", &format!(r#"{{"question": "{TRAFFIC_STOP}"}}"#)),
        multipart_post("audio", Some("clip.webm"), b"audio"),
        json_post("/api/tts", r#"{"text": "hello"}"#),
        // Credential is checked before the body
        json_post("/api/ask", "not json"),
    ];

    for request in requests {
        let app = build_test_router(&knowledge, None);
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = json_body(response).await;
        assert_eq!(json["error"], "Missing OPENAI_API_KEY");
    }
}

#[tokio::test]
async fn test_ask_rejects_missing_question() {
    let knowledge = knowledge_file("<p>procedures</p>");
    let gateway = MockGateway::new();

    for body in [r#"{}"#, r#"{"question": "   "}"#, r#"{"question": 42}"#, "nope"] {
        let app = build_test_router(&knowledge, Some(gateway.clone()));
        let response = app.oneshot(json_post("/api/ask", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        let json = json_body(response).await;
        assert_eq!(json["error"], "Missing 'question' string");
    }

    assert_eq!(gateway.calls.ask(), 0);
}

#[tokio::test]
async fn test_ask_answers_from_fresh_knowledge() {
    let knowledge = knowledge_file("<h1>Traffic stops</h1><p>Activate emergency lights.</p>");
    let gateway = MockGateway::new();
    let app = build_test_router(&knowledge, Some(gateway.clone()));

    let response = app
        .oneshot(json_post(
            "/api/ask",
            &format!(r#"{{"question": "  {TRAFFIC_STOP}  "}}"#),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    let result = AnswerResult::from_value(json).unwrap();
    assert_eq!(result.steps.len(), 2);

    assert_eq!(gateway.seen_question.lock().unwrap().as_deref(), Some(TRAFFIC_STOP));
    assert!(
        gateway
            .seen_knowledge
            .lock()
            .unwrap()
            .as_deref()
            .unwrap()
            .contains("Activate emergency lights.")
    );
}

#[tokio::test]
async fn test_ask_fails_when_knowledge_missing() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = MockGateway::new();
    let app = ApiServerBuilder::new(KnowledgeSource::new(dir.path().join("missing.html")), 0)
        .gateway(gateway.clone())
        .build()
        .router();

    let response = app
        .oneshot(json_post("/api/ask", r#"{"question": "anything"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json_body(response).await["error"].is_string());
    assert_eq!(gateway.calls.ask(), 0);
}

#[tokio::test]
async fn test_tts_returns_uncached_mp3() {
    let knowledge = knowledge_file("<p>procedures</p>");
    let gateway = MockGateway::new();
    let app = build_test_router(&knowledge, Some(gateway.clone()));

    let response = app
        .oneshot(json_post("/api/tts", r#"{"text": "  Step 1. Stay calm.  "}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"mp3:Step 1. Stay calm.");
}

#[tokio::test]
async fn test_tts_rejects_blank_text() {
    let knowledge = knowledge_file("<p>procedures</p>");
    let gateway = MockGateway::new();

    for body in [r#"{"text": ""}"#, r#"{"text": " \n "}"#, r#"{}"#] {
        let app = build_test_router(&knowledge, Some(gateway.clone()));
        let response = app.oneshot(json_post("/api/tts", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Missing 'text' string");
    }

    assert_eq!(gateway.calls.speak(), 0);
}

#[tokio::test]
async fn test_transcribe_multipart_upload() {
    let knowledge = knowledge_file("<p>procedures</p>");
    let gateway = MockGateway::new();
    let app = build_test_router(&knowledge, Some(gateway.clone()));

    let response = app
        .oneshot(multipart_post("audio", Some("clip.webm"), b"0123456789"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["text"], "heard 10 bytes");
    assert_eq!(gateway.calls.transcribe(), 1);
}

#[tokio::test]
async fn test_transcribe_requires_audio_file() {
    let knowledge = knowledge_file("<p>procedures</p>");
    let gateway = MockGateway::new();

    let requests = [
        multipart_post("recording", Some("clip.webm"), b"data"),
        multipart_post("audio", None, b"data"),
        multipart_post("audio", Some("clip.webm"), b""),
        json_post("/api/transcribe", r#"{"audio": "data"}"#),
    ];

    for request in requests {
        let app = build_test_router(&knowledge, Some(gateway.clone()));
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["error"],
            "Expected form field 'audio' as a file"
        );
    }

    assert_eq!(gateway.calls.transcribe(), 0);
}

#[tokio::test]
async fn test_http_backend_against_running_server() {
    let knowledge = knowledge_file("<p>Activate emergency lights.</p>");
    let gateway = MockGateway::new();
    let server = ApiServerBuilder::new(KnowledgeSource::new(knowledge.path()), 0)
        .gateway(gateway.clone())
        .build();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(server.serve(listener));

    let backend = HttpBackend::new(format!("http://{addr}"));

    let result = backend.ask(TRAFFIC_STOP).await.unwrap();
    assert_eq!(result.title.as_deref(), Some("Traffic Stop Procedure"));

    let audio = backend.speak("Step 1.").await.unwrap();
    assert_eq!(audio, b"mp3:Step 1.");

    let text = backend
        .transcribe(alex_gateway::AudioClip::wav(vec![0; 64]))
        .await
        .unwrap();
    assert_eq!(text, "heard 64 bytes");

    handle.abort();
}
