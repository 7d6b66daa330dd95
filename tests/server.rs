//! HTTP tests: drive the axum router in-process with `axum_test::TestServer`.

#![cfg(feature = "server")]

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use edgequake_img2diagram::server::build_router;
use edgequake_img2diagram::{DiagramConfig, ServerConfig};
use serde_json::{json, Value};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

fn png_part() -> Part {
    Part::bytes(PNG_BYTES.to_vec())
        .file_name("sketch.png")
        .mime_type("image/png")
}

fn test_server(config: DiagramConfig) -> TestServer {
    let router = build_router(config, &ServerConfig::default()).unwrap();
    TestServer::new(router).unwrap()
}

async fn model_replying(content: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 5 }
        })))
        .mount(&server)
        .await;
    server
}

fn config_for(server: &MockServer) -> DiagramConfig {
    DiagramConfig::builder()
        .api_key("sk-test")
        .api_base(format!("{}/v1", server.uri()))
        .build()
        .unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let server = test_server(DiagramConfig::default());
    let response = server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "ok");
}

#[tokio::test]
async fn missing_image_is_400() {
    let server = test_server(DiagramConfig::default());
    let response = server
        .post("/api/diagram")
        .multipart(MultipartForm::new().add_text("diagramType", "mermaid"))
        .expect_failure()
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>(), json!({ "error": "Please select an image file" }));
}

#[tokio::test]
async fn non_image_upload_is_400() {
    let server = test_server(DiagramConfig::default());
    let text = Part::bytes(b"hello".to_vec())
        .file_name("notes.txt")
        .mime_type("text/plain");
    let response = server
        .post("/api/diagram")
        .multipart(MultipartForm::new().add_part("image", text))
        .expect_failure()
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "File must be an image");
}

#[tokio::test]
async fn non_multipart_body_is_rejected() {
    let server = test_server(DiagramConfig::default());
    let response = server
        .post("/api/diagram")
        .json(&json!({}))
        .expect_failure()
        .await;

    assert!(response.status_code().is_client_error());
    let body = response.json::<Value>();
    assert!(body["error"].is_string());
    assert!(body.get("success").is_none());
}

#[tokio::test]
async fn oversized_upload_is_413_with_error_body() {
    let limits = ServerConfig {
        max_upload_bytes: 1024,
        ..ServerConfig::default()
    };
    let router = build_router(DiagramConfig::default(), &limits).unwrap();
    let server = TestServer::new(router).unwrap();

    let big = Part::bytes(vec![0u8; 4096])
        .file_name("huge.png")
        .mime_type("image/png");
    let response = server
        .post("/api/diagram")
        .multipart(MultipartForm::new().add_part("image", big))
        .expect_failure()
        .await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    let body = response.json::<Value>();
    assert!(body["error"].is_string(), "got: {body}");
    assert!(body.get("success").is_none());
}

#[tokio::test]
async fn missing_key_is_500_with_message() {
    let server = test_server(DiagramConfig::default());
    let response = server
        .post("/api/diagram")
        .multipart(MultipartForm::new().add_part("image", png_part()))
        .expect_failure()
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json::<Value>(), json!({ "error": "OpenAI API key not configured" }));
}

#[tokio::test]
async fn upstream_failure_is_502() {
    let model = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "error": { "message": "overloaded" } })),
        )
        .mount(&model)
        .await;

    let server = test_server(config_for(&model));
    let response = server
        .post("/api/diagram")
        .multipart(MultipartForm::new().add_part("image", png_part()))
        .expect_failure()
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    assert_eq!(response.json::<Value>()["error"], "OpenAI API error: overloaded");
}

#[tokio::test]
async fn success_defaults_to_plantuml() {
    let model = model_replying("```plantuml\n@startuml\nA -> B\n@enduml\n```").await;

    let server = test_server(config_for(&model));
    let response = server
        .post("/api/diagram")
        .multipart(MultipartForm::new().add_part("image", png_part()))
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["success"], true);
    assert!(body.get("error").is_none());
    assert_eq!(body["diagramType"], "plantuml");
    assert_eq!(body["diagramText"], "@startuml\nA -> B\n@enduml");
    assert_eq!(body["fileName"], "sketch.png");
    assert_eq!(body["fileType"], "image/png");
    assert_eq!(body["fileSize"], PNG_BYTES.len());
    assert_eq!(body["inputTokens"], 10);
    assert_eq!(body["outputTokens"], 5);
    assert!(body["durationMs"].is_u64());
    assert!(body["diagramImageUrl"]
        .as_str()
        .unwrap()
        .starts_with("https://www.plantuml.com/plantuml/svg/"));
}

#[tokio::test]
async fn dialect_field_selects_renderer() {
    let model = model_replying("```mermaid\ngraph TD;A-->B;\n```").await;

    let server = test_server(config_for(&model));
    let response = server
        .post("/api/diagram")
        .multipart(
            MultipartForm::new()
                .add_part("image", png_part())
                .add_text("diagramType", "mermaid"),
        )
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["diagramType"], "mermaid");
    assert_eq!(body["diagramImageUrl"], "https://mermaid.ink/img/Z3JhcGggVEQ7QS0tPkI7");
}

#[tokio::test]
async fn dialect_alias_and_unknown_values() {
    let model = model_replying("A.method() { return }").await;
    let server = test_server(config_for(&model));

    let body = server
        .post("/api/diagram")
        .multipart(
            MultipartForm::new()
                .add_text("dialect", "zenuml")
                .add_part("image", png_part()),
        )
        .await
        .json::<Value>();
    assert_eq!(body["diagramType"], "zenuml");
    assert!(body["diagramImageUrl"]
        .as_str()
        .unwrap()
        .starts_with("https://zenuml.com/api/png/"));

    let body = server
        .post("/api/diagram")
        .multipart(
            MultipartForm::new()
                .add_part("image", png_part())
                .add_text("diagramType", "graphviz"),
        )
        .await
        .json::<Value>();
    assert_eq!(body["diagramType"], "plantuml");
}
