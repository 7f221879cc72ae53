//! Gemini gateway tests against a canned local HTTP responder, plus one
//! live call that only runs when GEMINI_API_KEY is available.
//!
//! The live test loads `.env.local` with dotenvy, same as the binary.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use ui_refine_lib::llm::{build_request, GeminiProvider, ReviewProvider};
use ui_refine_lib::{AnalysisError, AnalysisRecord, NewAnalysis};

/// 1×1 transparent PNG.
const TINY_PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

fn record(code: Option<&str>) -> AnalysisRecord {
    AnalysisRecord::pending(
        NewAnalysis {
            screen_name: "Signup".to_string(),
            url: Some("https://example.com/signup".to_string()),
            code_snippet: code.map(str::to_string),
            ..Default::default()
        },
        Some(TINY_PNG.to_string()),
    )
}

fn provider(base_url: &str) -> GeminiProvider {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    GeminiProvider::new(Some("test-key".to_string()), "gemini-test")
        .with_client(client)
        .with_base_url(base_url)
}

/// Serve exactly one request with a fixed response. The join handle yields
/// the raw request text.
async fn serve_once(status_line: &'static str, body: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        request
    });
    (format!("http://{}", addr), handle)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let len = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + len {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[tokio::test]
async fn success_returns_report_and_sends_ordered_parts() {
    let body = serde_json::json!({
        "candidates": [{"content": {"parts": [{"text": "Looks good"}]}}],
        "usageMetadata": {"promptTokenCount": 300, "candidatesTokenCount": 3}
    })
    .to_string();
    let (base, server) = serve_once("200 OK", body).await;

    let request = build_request(&record(Some("<form/>"))).unwrap();
    let report = provider(&base).analyze(&request).await.unwrap();
    assert_eq!(report, "Looks good");

    let raw = server.await.unwrap();
    assert!(raw.starts_with("POST /v1beta/models/gemini-test:generateContent"));
    assert!(raw.to_lowercase().contains("x-goog-api-key: test-key"));

    let body_start = raw.find("\r\n\r\n").unwrap() + 4;
    let sent: serde_json::Value = serde_json::from_str(&raw[body_start..]).unwrap();
    let parts = sent["contents"][0]["parts"].as_array().unwrap();
    assert_eq!(parts.len(), 3);
    assert!(parts[0]["text"].as_str().unwrap().contains("Signup"));
    assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
    assert!(parts[2]["text"].as_str().unwrap().contains("<form/>"));
}

#[tokio::test]
async fn rejected_key_is_auth_error() {
    let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#;
    let (base, _server) = serve_once("400 Bad Request", body.to_string()).await;

    let request = build_request(&record(None)).unwrap();
    let err = provider(&base).analyze(&request).await.unwrap_err();
    assert_eq!(err, AnalysisError::Auth);
}

#[tokio::test]
async fn unknown_model_is_provider_error() {
    let body = r#"{"error":{"code":404,"message":"models/gemini-test is not found for API version v1beta","status":"NOT_FOUND"}}"#;
    let (base, _server) = serve_once("404 Not Found", body.to_string()).await;

    let request = build_request(&record(None)).unwrap();
    match provider(&base).analyze(&request).await.unwrap_err() {
        AnalysisError::Provider(msg) => assert!(msg.contains("gemini-test")),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn no_text_is_empty_response() {
    let body = serde_json::json!({"candidates": [{"content": {"parts": []}}]}).to_string();
    let (base, _server) = serve_once("200 OK", body).await;

    let request = build_request(&record(None)).unwrap();
    let err = provider(&base).analyze(&request).await.unwrap_err();
    assert_eq!(err, AnalysisError::EmptyResponse);
}

#[tokio::test]
async fn refused_connection_is_network_error() {
    // Bind then drop to get a port with nothing listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let request = build_request(&record(None)).unwrap();
    let err = provider(&format!("http://{}", addr))
        .analyze(&request)
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::Network(_)), "got {:?}", err);
}

fn load_env() {
    let env_path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env.local");
    if env_path.exists() {
        dotenvy::from_path(&env_path).expect("Failed to load .env.local");
        eprintln!("[TEST] Loaded .env.local");
    }
}

#[tokio::test]
async fn live_gemini_review() {
    load_env();
    let key = std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty());
    let Some(key) = key else {
        eprintln!("SKIP: No GEMINI_API_KEY");
        return;
    };

    let provider = GeminiProvider::new(Some(key), ui_refine_lib::llm::gemini::GEMINI_MODEL);
    let request = build_request(&record(None)).unwrap();
    let start = std::time::Instant::now();
    let report = provider.analyze(&request).await.unwrap();
    eprintln!(
        "[TEST] Live review: {} chars in {}ms",
        report.len(),
        start.elapsed().as_millis()
    );
    assert!(!report.trim().is_empty());
}
