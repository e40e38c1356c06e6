//! HTTP response sanitization and truncation tests.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use adbrain::http::HttpTimeouts;
use adbrain::providers::openai::OpenAiProvider;
use adbrain::providers::{
    check_http_response, CompletionRequest, LlmProvider, Message, ProviderError,
};

async fn serve_once(status_line: &str, body: &str) -> String {
    let listener_result = TcpListener::bind("127.0.0.1:0").await;
    assert!(listener_result.is_ok());
    let listener = match listener_result {
        Ok(listener) => listener,
        Err(err) => panic!("listener should bind: {err}"),
    };

    let addr_result = listener.local_addr();
    assert!(addr_result.is_ok());
    let addr = match addr_result {
        Ok(addr) => addr,
        Err(err) => panic!("listener should expose local addr: {err}"),
    };

    let status_line_owned = status_line.to_owned();
    let body_owned = body.to_owned();
    tokio::spawn(async move {
        let accepted = listener.accept().await;
        if let Ok((mut socket, _)) = accepted {
            let mut read_buf = [0_u8; 4096];
            let _ = socket.read(&mut read_buf).await;

            let response = format!(
                "HTTP/1.1 {status_line_owned}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body_owned}",
                body_owned.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
        }
    });

    format!("http://{addr}")
}

fn plan_request() -> CompletionRequest {
    CompletionRequest {
        messages: vec![Message::user("{}")],
        system: Some("policy".to_owned()),
        max_tokens: None,
        temperature: Some(0.0),
        json_response: true,
    }
}

#[tokio::test]
async fn check_http_response_redacts_token_like_values() {
    let raw_token = "sk-abcdefghijklmnopqrstuvwxyz1234";
    let body = format!("invalid key {raw_token}");
    let url = serve_once("401 Unauthorized", &body).await;

    let response_result = reqwest::get(url).await;
    assert!(response_result.is_ok());
    let response = match response_result {
        Ok(response) => response,
        Err(err) => panic!("request should complete: {err}"),
    };

    let checked = check_http_response(response).await;
    assert!(checked.is_err());

    let err = match checked {
        Ok(_) => panic!("response should fail on non-success status"),
        Err(err) => err,
    };

    match err {
        ProviderError::HttpStatus { status, body } => {
            assert_eq!(status, 401);
            assert!(!body.contains(raw_token));
            assert!(body.contains("[REDACTED]"));
        }
        other => panic!("expected http status error, got: {other}"),
    }
}

#[tokio::test]
async fn check_http_response_truncates_long_error_body() {
    let body = "x".repeat(400);
    let url = serve_once("500 Internal Server Error", &body).await;

    let response_result = reqwest::get(url).await;
    assert!(response_result.is_ok());
    let response = match response_result {
        Ok(response) => response,
        Err(err) => panic!("request should complete: {err}"),
    };

    match check_http_response(response).await {
        Err(ProviderError::HttpStatus { body, .. }) => {
            assert!(body.len() < 400);
            assert!(body.ends_with("...[truncated]"));
        }
        Err(other) => panic!("expected http status error, got: {other}"),
        Ok(_) => panic!("response should fail on non-success status"),
    }
}

#[tokio::test]
async fn check_http_response_returns_success_body() {
    let url = serve_once("200 OK", "{\"ok\":true}").await;
    let response = match reqwest::get(url).await {
        Ok(response) => response,
        Err(err) => panic!("request should complete: {err}"),
    };

    match check_http_response(response).await {
        Ok(body) => assert_eq!(body, "{\"ok\":true}"),
        Err(err) => panic!("2xx should pass: {err}"),
    }
}

#[tokio::test]
async fn provider_completes_against_local_endpoint() {
    let reply = r#"{"model":"gpt-test","choices":[{"message":{"content":"{\"actions\":[]}"}}],"usage":{"prompt_tokens":3,"completion_tokens":4}}"#;
    let base = serve_once("200 OK", reply).await;
    let provider = OpenAiProvider::new(
        "gpt-test".to_owned(),
        "sk-test".to_owned(),
        &base,
        HttpTimeouts::default(),
    );

    let response = match provider.complete(plan_request()).await {
        Ok(response) => response,
        Err(err) => panic!("completion should succeed: {err}"),
    };
    assert_eq!(response.text, "{\"actions\":[]}");
    assert_eq!(response.usage.input_tokens, 3);
    assert_eq!(provider.model_id(), "gpt-test");
}

#[tokio::test]
async fn provider_without_key_is_unavailable() {
    let provider = OpenAiProvider::new(
        "gpt-test".to_owned(),
        String::new(),
        "http://127.0.0.1:9",
        HttpTimeouts::default(),
    );

    match provider.complete(plan_request()).await {
        Err(ProviderError::Unavailable(_)) => {}
        Err(other) => panic!("expected unavailable, got: {other}"),
        Ok(_) => panic!("completion without a key should fail"),
    }
}
