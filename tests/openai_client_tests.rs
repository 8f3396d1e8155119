use apiforge::ai::{CompletionRequest, LanguageModel, OpenAiClient, ProviderError};
use serde_json::{json, Value};
use std::io::Read;
use std::sync::mpsc;
use std::thread;
use tiny_http::{Header, Response, Server};

/// What the mock completions endpoint saw.
struct Captured {
    method: String,
    url: String,
    authorization: Option<String>,
    body: Value,
}

/// Serve exactly one request with `status` and `body`, then stop.
fn serve_once(status: u16, body: &'static str) -> (String, mpsc::Receiver<Captured>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let mut request = server.recv().unwrap();
        let mut raw = String::new();
        request.as_reader().read_to_string(&mut raw).unwrap();
        let authorization = request
            .headers()
            .iter()
            .find(|h| h.field.equiv("Authorization"))
            .map(|h| h.value.as_str().to_string());
        tx.send(Captured {
            method: request.method().to_string(),
            url: request.url().to_string(),
            authorization,
            body: serde_json::from_str(&raw).unwrap_or(Value::Null),
        })
        .unwrap();

        let header = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap();
        let response = Response::from_string(body)
            .with_status_code(status)
            .with_header(header);
        let _ = request.respond(response);
    });

    (format!("http://{addr}/v1/"), rx)
}

fn client(base_url: &str) -> OpenAiClient {
    OpenAiClient::new("sk-test", base_url, "gpt-4o-mini").unwrap()
}

#[tokio::test]
async fn test_chat_completion_round_trip() {
    let (base_url, seen) = serve_once(
        200,
        r#"{"choices": [{"message": {"role": "assistant", "content": "{\"ok\": true}"}}]}"#,
    );
    let request = CompletionRequest::new("Describe a todo API")
        .with_system("You design APIs")
        .json()
        .with_temperature(0.2)
        .with_max_tokens(500);

    let completion = client(&base_url).complete(request).await.unwrap();
    assert_eq!(completion.text, r#"{"ok": true}"#);

    let captured = seen.recv().unwrap();
    assert_eq!(captured.method, "POST");
    assert_eq!(captured.url, "/v1/chat/completions");
    assert_eq!(captured.authorization.as_deref(), Some("Bearer sk-test"));
    assert_eq!(captured.body["model"], "gpt-4o-mini");
    assert_eq!(captured.body["max_tokens"], 500);
    assert_eq!(captured.body["response_format"], json!({"type": "json_object"}));
    assert_eq!(
        captured.body["messages"],
        json!([
            {"role": "system", "content": "You design APIs"},
            {"role": "user", "content": "Describe a todo API"}
        ])
    );
}

#[tokio::test]
async fn test_text_request_omits_response_format() {
    let (base_url, seen) = serve_once(200, r#"{"choices": [{"message": {"content": "hello"}}]}"#);
    client(&base_url)
        .complete(CompletionRequest::new("Say hello"))
        .await
        .unwrap();

    let captured = seen.recv().unwrap();
    assert!(captured.body.get("response_format").is_none());
    assert_eq!(captured.body["messages"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_unauthorized_maps_to_auth() {
    let (base_url, _seen) = serve_once(401, r#"{"error": {"message": "bad key"}}"#);
    let err = client(&base_url)
        .complete(CompletionRequest::new("x"))
        .await
        .unwrap_err();
    assert_eq!(err, ProviderError::Auth);
}

#[tokio::test]
async fn test_too_many_requests_maps_to_rate_limited() {
    let (base_url, _seen) = serve_once(429, r#"{"error": {"message": "slow down"}}"#);
    let err = client(&base_url)
        .complete(CompletionRequest::new("x"))
        .await
        .unwrap_err();
    assert_eq!(err, ProviderError::RateLimited);
}

#[tokio::test]
async fn test_server_error_keeps_status() {
    let (base_url, _seen) = serve_once(502, "{}");
    let err = client(&base_url)
        .complete(CompletionRequest::new("x"))
        .await
        .unwrap_err();
    assert_eq!(err, ProviderError::Status { status: 502 });
}

#[tokio::test]
async fn test_missing_content_is_empty_response() {
    let (base_url, _seen) = serve_once(200, r#"{"choices": []}"#);
    let err = client(&base_url)
        .complete(CompletionRequest::new("x"))
        .await
        .unwrap_err();
    assert_eq!(err, ProviderError::EmptyResponse);
}

#[tokio::test]
async fn test_non_json_body_is_decode_error() {
    let (base_url, _seen) = serve_once(200, "<html>gateway</html>");
    let err = client(&base_url)
        .complete(CompletionRequest::new("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Decode(_)));
}
