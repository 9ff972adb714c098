// tests/telegram.rs
// Runs the sink against a local HTTP listener that answers from a script, one
// response per connection. Retry waits are real (at most a few seconds).
use std::sync::Arc;
use std::time::{Duration, Instant};

use feed_sentinel::notify::{Destination, NotificationEnvelope, NotificationSink, TelegramSink};
use feed_sentinel::SendError;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const OK: (u16, &str) = (200, r#"{"ok":true,"result":{}}"#);
const BAD_GATEWAY: (u16, &str) = (502, r#"{"ok":false}"#);

/// Answers the first `script.len()` connections in order, then stops listening.
/// Returns the base URL and the request lines received so far.
async fn scripted_api(script: Vec<(u16, &'static str)>) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let requests = Arc::new(Mutex::new(Vec::new()));
    let log = requests.clone();
    tokio::spawn(async move {
        for (status, body) in script {
            let (mut stream, _) = listener.accept().await.unwrap();
            let line = read_request(&mut stream).await;
            log.lock().push(line);
            let rsp = format!(
                "HTTP/1.1 {status} Scripted\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(rsp.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;
        }
    });
    (base, requests)
}

/// Reads one full request (head and body) and returns its request line.
async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let Some(head_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
        let body_len = head
            .lines()
            .filter_map(|l| l.split_once(':'))
            .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buf.len() >= head_end + 4 + body_len {
            return head.lines().next().unwrap_or_default().to_string();
        }
    }
    String::from_utf8_lossy(&buf).lines().next().unwrap_or_default().to_string()
}

fn envelope() -> NotificationEnvelope {
    NotificationEnvelope {
        destination: Destination::new("-100200", Some(7)),
        text: "<b>CVE-2025-0001</b>".into(),
    }
}

#[tokio::test]
async fn server_error_is_retried_until_delivered() {
    let (base, requests) = scripted_api(vec![BAD_GATEWAY, OK]).await;
    let sink = TelegramSink::new("123:abc".into()).with_api_url(base);

    let start = Instant::now();
    sink.send(&envelope()).await.unwrap();

    let requests = requests.lock();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].starts_with("POST /bot123:abc/sendMessage"));
    assert!(start.elapsed() >= Duration::from_millis(500), "first backoff step");
}

#[tokio::test]
async fn default_is_three_attempts_then_the_error() {
    // A fourth attempt would hit a closed port and surface as a transport error.
    let (base, requests) = scripted_api(vec![BAD_GATEWAY, BAD_GATEWAY, BAD_GATEWAY]).await;
    let sink = TelegramSink::new("123:abc".into()).with_api_url(base);

    let start = Instant::now();
    let err = sink.send(&envelope()).await.unwrap_err();

    assert!(matches!(err, SendError::Api(ref d) if d.starts_with("HTTP 502")), "{err}");
    assert_eq!(requests.lock().len(), 3);
    assert!(start.elapsed() >= Duration::from_millis(1500), "500ms then 1s");
}

#[tokio::test]
async fn rate_limit_waits_retry_after_then_resends() {
    let (base, requests) = scripted_api(vec![
        (429, r#"{"ok":false,"error_code":429,"parameters":{"retry_after":1}}"#),
        OK,
    ])
    .await;
    let sink = TelegramSink::new("123:abc".into()).with_api_url(base);

    let start = Instant::now();
    sink.send(&envelope()).await.unwrap();

    assert_eq!(requests.lock().len(), 2);
    assert!(start.elapsed() >= Duration::from_secs(1));
}

#[tokio::test]
async fn client_error_is_not_retried() {
    let (base, requests) = scripted_api(vec![(
        400,
        r#"{"ok":false,"description":"Bad Request: chat not found"}"#,
    )])
    .await;
    let sink = TelegramSink::new("123:abc".into()).with_api_url(base);

    let err = sink.send(&envelope()).await.unwrap_err();
    assert_eq!(err.to_string(), "messaging API error: Bad Request: chat not found");
    assert_eq!(requests.lock().len(), 1);
}

#[tokio::test]
async fn transport_errors_do_not_reveal_the_token() {
    let sink = TelegramSink::new("123:SECRETTOKEN".into())
        .with_api_url("http://127.0.0.1:1")
        .with_retries(1);

    let err = sink.send(&envelope()).await.unwrap_err();

    assert!(matches!(err, SendError::Http(_)));
    assert!(!err.to_string().contains("SECRETTOKEN"), "{err}");
    assert!(!format!("{err:?}").contains("SECRETTOKEN"));
}
