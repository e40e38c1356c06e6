//! Report delivery against a local Bot API stand-in.

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use url::Url;

use adbrain::telegram::{Destination, MessagingChannel, MessagingError, TelegramNotifier};

const CHAT_NOT_FOUND: &str =
    r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#;

async fn serve_capture(status_line: &str, body: &str) -> (Url, oneshot::Receiver<String>) {
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
            let mut buf = Vec::new();
            let mut chunk = [0_u8; 4096];
            loop {
                let n = match socket.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => n,
                };
                buf.extend_from_slice(&chunk[..n]);
                if request_complete(&buf) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status_line_owned}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body_owned}",
                body_owned.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
        }
    });

    let url = Url::parse(&format!("http://{addr}")).expect("local url should parse");
    (url, rx)
}

fn request_complete(buf: &[u8]) -> bool {
    let text = String::from_utf8_lossy(buf);
    let Some((head, body)) = text.split_once("\r\n\r\n") else {
        return false;
    };
    let length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    body.len() >= length
}

#[tokio::test]
async fn sends_escaped_html_with_the_account_token() {
    let (api_url, captured) = serve_capture("400 Bad Request", CHAT_NOT_FOUND).await;
    let notifier =
        TelegramNotifier::new(Some("999999:fallback-token".to_owned())).with_api_url(api_url);
    let destination = Destination {
        chat_id: Some("4242".to_owned()),
        bot_token: Some("123456:account-token".to_owned()),
    };

    let result = notifier.deliver(&destination, "CPL <high> & rising").await;
    assert!(matches!(result, Err(MessagingError::Api(_))));

    let request = captured.await.expect("request should be captured");
    let request_line = request.lines().next().unwrap_or_default();
    assert!(request_line.contains("/bot123456:account-token/"));
    assert!(request_line.to_ascii_lowercase().contains("sendmessage"));

    let (_, body) = request
        .split_once("\r\n\r\n")
        .expect("request should have a body");
    let sent: Value = serde_json::from_str(body).expect("body should be JSON");
    assert_eq!(sent["chat_id"], 4242);
    assert_eq!(sent["text"], "CPL &lt;high&gt; &amp; rising");
    assert_eq!(sent["parse_mode"], "HTML");
}

#[tokio::test]
async fn falls_back_to_the_shared_token() {
    let (api_url, captured) = serve_capture("400 Bad Request", CHAT_NOT_FOUND).await;
    let notifier =
        TelegramNotifier::new(Some("999999:fallback-token".to_owned())).with_api_url(api_url);
    let destination = Destination {
        chat_id: Some("4242".to_owned()),
        bot_token: None,
    };

    let _ = notifier.deliver(&destination, "report").await;
    let request = captured.await.expect("request should be captured");
    assert!(request
        .lines()
        .next()
        .unwrap_or_default()
        .contains("/bot999999:fallback-token/"));
}

#[tokio::test]
async fn channel_username_is_sent_as_is() {
    let (api_url, captured) = serve_capture("400 Bad Request", CHAT_NOT_FOUND).await;
    let notifier =
        TelegramNotifier::new(Some("999999:fallback-token".to_owned())).with_api_url(api_url);
    let destination = Destination {
        chat_id: Some("@campaign_reports".to_owned()),
        bot_token: None,
    };

    let result = notifier.deliver(&destination, "report").await;
    assert!(matches!(result, Err(MessagingError::Api(_))));

    let request = captured.await.expect("request should be captured");
    let (_, body) = request
        .split_once("\r\n\r\n")
        .expect("request should have a body");
    let sent: Value = serde_json::from_str(body).expect("body should be JSON");
    assert_eq!(sent["chat_id"], "@campaign_reports");
}

#[tokio::test]
async fn no_token_anywhere_skips_delivery() {
    let notifier = TelegramNotifier::new(Some("   ".to_owned()));
    let destination = Destination {
        chat_id: Some("4242".to_owned()),
        bot_token: None,
    };
    assert!(matches!(
        notifier.deliver(&destination, "report").await,
        Ok(false)
    ));
}

#[test]
fn destination_debug_redacts_the_token() {
    let destination = Destination {
        chat_id: Some("4242".to_owned()),
        bot_token: Some("123456:secret".to_owned()),
    };
    let debug = format!("{destination:?}");
    assert!(debug.contains("4242"));
    assert!(!debug.contains("secret"));
}
