//! HTTP tests for OllamaClient against a mock Ollama server

use futures_util::StreamExt;
use ollamastream::types::{ChatRequest, GenerateRequest, Message};
use ollamastream::{CallbackClient, ModelService, OllamaClient, StreamError};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ndjson(lines: &[serde_json::Value]) -> String {
    lines.iter().map(|line| format!("{}\n", line)).collect()
}

fn client_for(server: &MockServer) -> OllamaClient {
    OllamaClient::with_config(&server.uri(), Duration::from_secs(5), Duration::from_secs(5)).unwrap()
}

/// Consume a request's head and body so closing the socket stays clean
async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut received = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            return;
        }
        received.extend_from_slice(&buf[..n]);

        let Some(head_end) = received.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&received[..head_end]).to_ascii_lowercase();
        let body_len: usize = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|len| len.trim().parse().ok())
            .unwrap_or(0);
        if received.len() >= head_end + 4 + body_len {
            return;
        }
    }
}

/// Serve one chunked NDJSON response, pausing `gap` before each line.
/// Returns the base URL.
async fn slow_server(lines: Vec<serde_json::Value>, gap: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;

        let head = "HTTP/1.1 200 OK\r\ncontent-type: application/x-ndjson\r\ntransfer-encoding: chunked\r\n\r\n";
        socket.write_all(head.as_bytes()).await.unwrap();
        for line in lines {
            tokio::time::sleep(gap).await;
            let line = format!("{}\n", line);
            let frame = format!("{:x}\r\n{}\r\n", line.len(), line);
            if socket.write_all(frame.as_bytes()).await.is_err() {
                return;
            }
        }
        let _ = socket.write_all(b"0\r\n\r\n").await;
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn test_pull_streams_progress_chunks() {
    let server = MockServer::start().await;

    let body = ndjson(&[
        serde_json::json!({"status": "pulling manifest"}),
        serde_json::json!({"status": "pulling 6a07", "digest": "sha256:6a07", "total": 100, "completed": 40}),
        serde_json::json!({"status": "success"}),
    ]);
    Mock::given(method("POST"))
        .and(path("/api/pull"))
        .and(body_partial_json(serde_json::json!({"name": "llama3.1:8b", "stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
        .mount(&server)
        .await;

    let client = CallbackClient::new(Arc::new(client_for(&server))).unwrap();
    let statuses = client
        .pull_model("llama3.1:8b", |_| Ok(()), &CancellationToken::new())
        .await
        .expect("pull");

    assert_eq!(statuses.len(), 3);
    assert_eq!(statuses[1].percent(), Some(40.0));
    assert!(statuses[2].is_success());
}

#[tokio::test]
async fn test_chat_collects_content_fragments() {
    let server = MockServer::start().await;

    let body = ndjson(&[
        serde_json::json!({"model": "m", "created_at": "2024-07-01T10:00:00Z", "message": {"role": "assistant", "content": ""}, "done": false}),
        serde_json::json!({"model": "m", "created_at": "2024-07-01T10:00:01Z", "message": {"role": "assistant", "content": "hello"}, "done": false}),
        serde_json::json!({"model": "m", "created_at": "2024-07-01T10:00:02Z", "done": true, "done_reason": "stop"}),
    ]);
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(serde_json::json!({"model": "m", "stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
        .mount(&server)
        .await;

    let client = CallbackClient::new(Arc::new(client_for(&server))).unwrap();
    let request = ChatRequest::new("m", vec![Message::user("hi")]);
    let text = client
        .chat(request, |_| Ok(()), &CancellationToken::new())
        .await
        .expect("chat");

    assert_eq!(text, vec!["hello"]);
}

#[tokio::test]
async fn test_generate_forwards_context_and_returns_final_context() {
    let server = MockServer::start().await;

    let body = ndjson(&[
        serde_json::json!({"model": "m", "response": "4", "done": false}),
        serde_json::json!({"model": "m", "response": "", "done": true, "context": [9, 10]}),
    ]);
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(serde_json::json!({"prompt": "2+2?", "context": [1, 2]})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
        .mount(&server)
        .await;

    let service = client_for(&server);
    let request = GenerateRequest::new("m", "2+2?").with_context(Some(ollamastream::types::ConversationContext(vec![1, 2])));
    let chunks: Vec<_> = service
        .generate(request, CancellationToken::new())
        .await
        .expect("open")
        .collect()
        .await;

    assert_eq!(chunks.len(), 2);
    let last = chunks.into_iter().last().unwrap().unwrap();
    assert_eq!(last.context.map(|c| c.0), Some(vec![9, 10]));
}

#[tokio::test]
async fn test_mid_stream_error_line_fails_task() {
    let server = MockServer::start().await;

    let body = ndjson(&[
        serde_json::json!({"model": "m", "response": "par", "done": false}),
        serde_json::json!({"error": "model runner has unexpectedly stopped"}),
    ]);
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
        .mount(&server)
        .await;

    let client = CallbackClient::new(Arc::new(client_for(&server))).unwrap();
    let err = client
        .generate_prompt("p", None, |_| Ok(()), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        StreamError::OllamaApiError(msg) => assert!(msg.contains("unexpectedly stopped")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_truncated_body_is_a_streaming_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{\"response\":\"a\"}\n{\"resp", "application/x-ndjson"))
        .mount(&server)
        .await;

    let client = CallbackClient::new(Arc::new(client_for(&server))).unwrap();
    let err = client
        .generate_prompt("p", None, |_| Ok(()), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, StreamError::StreamingError(_)));
}

#[tokio::test]
async fn test_malformed_chunk_is_a_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{\"response\":5}\n", "application/x-ndjson"))
        .mount(&server)
        .await;

    let client = CallbackClient::new(Arc::new(client_for(&server))).unwrap();
    let err = client
        .generate_prompt("p", None, |_| Ok(()), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, StreamError::JsonParseError(_)));
}

#[tokio::test]
async fn test_http_error_status_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/pull"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .pull_model("llama3.1:8b", CancellationToken::new())
        .await
        .err()
        .unwrap();

    match err {
        StreamError::OllamaApiError(msg) => {
            assert!(msg.contains("500"));
            assert!(msg.contains("boom"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_delete_maps_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/delete"))
        .and(body_partial_json(serde_json::json!({"name": "ghost"})))
        .respond_with(ResponseTemplate::new(404).set_body_string("{\"error\":\"model 'ghost' not found\"}"))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/delete"))
        .and(body_partial_json(serde_json::json!({"name": "llama3.1:8b"})))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = CallbackClient::new(Arc::new(client_for(&server))).unwrap();

    client
        .delete_model("llama3.1:8b", &CancellationToken::new())
        .await
        .expect("delete");

    let err = client
        .delete_model("ghost", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StreamError::ModelNotFound(ref name) if name == "ghost"));
}

#[tokio::test]
async fn test_health_check_against_mock() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"version": "0.3.0"})))
        .mount(&server)
        .await;

    assert!(client_for(&server).health_check().await.unwrap());
}

#[tokio::test]
async fn test_slow_stream_outlives_request_timeout() {
    let lines = (0..5)
        .map(|i| {
            let done = i == 4;
            serde_json::json!({"model": "m", "response": i.to_string(), "done": done})
        })
        .collect();
    let url = slow_server(lines, Duration::from_millis(300)).await;

    // Whole stream takes about 1.5s; no single read waits longer than 300ms
    let service = OllamaClient::with_config(&url, Duration::from_secs(1), Duration::from_secs(60)).unwrap();
    let client = CallbackClient::new(Arc::new(service)).unwrap();
    let text = client
        .generate_prompt("count", None, |_| Ok(()), &CancellationToken::new())
        .await
        .expect("slow but healthy stream");

    assert_eq!(text, vec!["0", "1", "2", "3", "4"]);
}

#[tokio::test]
async fn test_silent_stream_hits_idle_timeout() {
    let lines = vec![
        serde_json::json!({"model": "m", "response": "a", "done": false}),
        serde_json::json!({"model": "m", "response": "b", "done": true}),
    ];
    let url = slow_server(lines, Duration::from_millis(800)).await;

    let service = OllamaClient::with_config(&url, Duration::from_millis(300), Duration::from_secs(60)).unwrap();
    let client = CallbackClient::new(Arc::new(service)).unwrap();
    let err = client
        .generate_prompt("p", None, |_| Ok(()), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, StreamError::StreamingError(ref msg) if msg.contains("No data received")));
}
