//! Executor submission over HTTP.

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use adbrain::actions::{Action, CampaignStatus};
use adbrain::executor::{ActionBatch, BatchAccount, Executor, ExecutorError, HttpExecutor};
use adbrain::http::HttpTimeouts;

/// Accept one request, capture it, and answer with `status_line` and `body`.
async fn serve_capture(status_line: &str, body: &str) -> (String, oneshot::Receiver<String>) {
    let listener = match TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(err) => panic!("listener should bind: {err}"),
    };
    let addr = match listener.local_addr() {
        Ok(addr) => addr,
        Err(err) => panic!("listener should expose local addr: {err}"),
    };

    let (tx, rx) = oneshot::channel();
    let status_line_owned = status_line.to_owned();
    let body_owned = body.to_owned();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status_line_owned}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body_owned}",
                body_owned.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = tx.send(request);
        }
    });

    (format!("http://{addr}"), rx)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0_u8; 4096];
    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some((head, body)) = text.split_once("\r\n\r\n") {
            let length = head
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if body.len() >= length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn sample_batch() -> ActionBatch {
    ActionBatch {
        idempotency_key: "think-20250101-0900-abc123".to_owned(),
        source: "n8n".to_owned(),
        account: BatchAccount {
            user_account_id: "u1".to_owned(),
        },
        actions: vec![
            Action::PauseCampaign {
                campaign_id: "C1".to_owned(),
                status: CampaignStatus::Paused,
            },
            Action::UpdateAdSetDailyBudget {
                adset_id: "A1".to_owned(),
                daily_budget: 2500,
            },
        ],
    }
}

#[tokio::test]
async fn submit_posts_camel_case_batch_to_actions_path() {
    let (base, captured) = serve_capture("200 OK", r#"{"accepted":2}"#).await;
    let executor = HttpExecutor::new(&format!("{base}/"), HttpTimeouts::default());

    let reply = match executor.submit(&sample_batch()).await {
        Ok(reply) => reply,
        Err(err) => panic!("submit should complete: {err}"),
    };
    assert!(reply.is_success());
    assert_eq!(reply.json(), json!({"accepted": 2}));

    let request = captured.await.expect("request should be captured");
    assert!(request.starts_with("POST /api/agent/actions HTTP/1.1"));
    let (_, body) = request
        .split_once("\r\n\r\n")
        .expect("request should have a body");
    let sent: Value = serde_json::from_str(body).expect("body should be JSON");
    assert_eq!(
        sent,
        json!({
            "idempotencyKey": "think-20250101-0900-abc123",
            "source": "n8n",
            "account": {"userAccountId": "u1"},
            "actions": [
                {"type": "PauseCampaign", "params": {"campaign_id": "C1", "status": "PAUSED"}},
                {"type": "UpdateAdSetDailyBudget", "params": {"adset_id": "A1", "daily_budget": 2500}}
            ]
        })
    );
}

#[tokio::test]
async fn non_success_status_is_returned_not_raised() {
    let (base, _captured) = serve_capture("409 Conflict", "duplicate key").await;
    let executor = HttpExecutor::new(&base, HttpTimeouts::default());

    let reply = executor
        .submit(&sample_batch())
        .await
        .expect("a reply was received");
    assert_eq!(reply.status, 409);
    assert!(!reply.is_success());
    assert_eq!(reply.json(), json!({"raw": "duplicate key"}));
}

#[tokio::test]
async fn unconfigured_executor_refuses_to_submit() {
    let executor = HttpExecutor::new("", HttpTimeouts::default());
    assert!(executor.endpoint().is_none());
    assert!(matches!(
        executor.submit(&sample_batch()).await,
        Err(ExecutorError::NotConfigured)
    ));
}
