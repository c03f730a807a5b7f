mod common;

use axum::http::StatusCode;
use common::{
    build_pdf, chat_request, state_with_config, test_config, test_state, upload_request,
};
use http_body_util::BodyExt;
use hire_power::build_router;
use tower::ServiceExt;

async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    resp.into_body().collect().await.unwrap().to_bytes().to_vec()
}

#[tokio::test]
async fn upload_writes_identical_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _) = test_state(dir.path(), 4);
    let router = build_router(state);

    let resp = router.oneshot(upload_request("r.pdf", b"hello")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(std::fs::read(dir.path().join("r.pdf")).unwrap(), b"hello");
}

#[tokio::test]
async fn upload_same_name_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _) = test_state(dir.path(), 4);
    let router = build_router(state);

    let first = router
        .clone()
        .oneshot(upload_request("r.pdf", b"first version"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::NO_CONTENT);
    let second = router
        .oneshot(upload_request("r.pdf", b"second"))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::NO_CONTENT);

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["r.pdf"]);
    assert_eq!(std::fs::read(dir.path().join("r.pdf")).unwrap(), b"second");
}

#[tokio::test]
async fn upload_strips_directories_from_name() {
    let dir = tempfile::tempdir().unwrap();
    let upload_dir = dir.path().join("cvs");
    let (state, _) = test_state(&upload_dir, 4);
    let router = build_router(state);

    let resp = router
        .oneshot(upload_request("../escape.pdf", b"x"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(upload_dir.join("escape.pdf").exists());
    assert!(!dir.path().join("escape.pdf").exists());
}

#[tokio::test]
async fn upload_accepts_long_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _) = test_state(dir.path(), 4);
    let router = build_router(state);
    let name = format!("{}.pdf", "a".repeat(240));

    let resp = router.oneshot(upload_request(&name, b"resume")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(std::fs::read(dir.path().join(&name)).unwrap(), b"resume");
}

#[tokio::test]
async fn oversized_upload_is_payload_too_large() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), 4);
    config.server.max_upload_size = 1024;
    let (state, _) = state_with_config(config);
    let router = build_router(state);

    let resp = router
        .oneshot(upload_request("big.pdf", &vec![b'x'; 8192]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert!(json["error"].is_string());
    assert!(!dir.path().join("big.pdf").exists());
}

#[tokio::test]
async fn chat_with_empty_corpus_streams_text() {
    let dir = tempfile::tempdir().unwrap();
    let (state, chat) = test_state(dir.path(), 4);
    let router = build_router(state);

    let resp = router
        .oneshot(chat_request(r#"{"messages":[{"role":"user","content":"Hi"}]}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()["content-type"],
        "text/plain; charset=utf-8"
    );
    let text = String::from_utf8(body_bytes(resp).await).unwrap();
    assert_eq!(text, "Hello, I can help.");

    let answers = chat.answer_prompts();
    assert_eq!(answers.len(), 1);
    assert!(answers[0].contains("<context>\n  \n</context>"));
}

#[tokio::test]
async fn chat_without_messages_is_an_error_and_server_keeps_serving() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _) = test_state(dir.path(), 4);
    let router = build_router(state);

    for body in [r#"{}"#, r#"{"messages":[]}"#, "not json"] {
        let resp = router.clone().oneshot(chat_request(body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {body}");
        let json: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
        assert!(json["error"].is_string());
    }

    let resp = router
        .oneshot(chat_request(r#"{"messages":[{"role":"user","content":"Hi"}]}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn chat_fails_on_non_pdf_in_corpus() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("alice.pdf"), build_pdf("Alice Rust")).unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"plain text").unwrap();
    let (state, chat) = test_state(dir.path(), 4);
    let router = build_router(state);

    let resp = router
        .oneshot(chat_request(r#"{"messages":[{"role":"user","content":"Hi"}]}"#))
        .await
        .unwrap();
    assert!(resp.status().is_server_error());
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert!(json["error"].as_str().unwrap().contains("notes.txt"));
    assert!(chat.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn repeated_chat_retrieves_same_context() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("alice.pdf"), build_pdf("Alice Rust developer")).unwrap();
    std::fs::write(dir.path().join("bob.pdf"), build_pdf("Bob Python developer")).unwrap();
    std::fs::write(dir.path().join("carol.pdf"), build_pdf("Carol Java developer")).unwrap();
    let (state, chat) = test_state(dir.path(), 1);
    let router = build_router(state);

    let body = r#"{"messages":[
        {"role":"user","content":"Hi"},
        {"role":"assistant","content":"Hello"},
        {"role":"user","content":"Who knows Rust?"}
    ]}"#;
    for _ in 0..2 {
        let resp = router.clone().oneshot(chat_request(body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        body_bytes(resp).await;
    }

    let answers = chat.answer_prompts();
    assert_eq!(answers.len(), 2);
    assert_eq!(answers[0], answers[1]);
    assert!(answers[0].contains("Alice"));
    assert!(!answers[0].contains("Bob"));
    assert!(answers[0].contains("Human: Hi\nAssistant: Hello"));
}

#[tokio::test]
async fn documents_lists_uploads() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _) = test_state(dir.path(), 4);
    let router = build_router(state);

    router
        .clone()
        .oneshot(upload_request("b.pdf", b"bb"))
        .await
        .unwrap();
    router
        .clone()
        .oneshot(upload_request("a.pdf", b"a"))
        .await
        .unwrap();

    let resp = router
        .oneshot(
            axum::http::Request::get("/api/documents")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(
        json,
        serde_json::json!([{"name": "a.pdf", "size": 1}, {"name": "b.pdf", "size": 2}])
    );
}

#[tokio::test]
async fn index_page_and_health() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _) = test_state(dir.path(), 4);
    let router = build_router(state);

    let resp = router
        .clone()
        .oneshot(axum::http::Request::get("/").body(axum::body::Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(resp).await).unwrap();
    assert!(html.contains("/api/chat"));
    // a failed turn must not leave an unanswered user message behind
    assert!(html.contains("messages.pop()"));

    let resp = router
        .oneshot(axum::http::Request::get("/health").body(axum::body::Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(body_bytes(resp).await, b"OK");
}
