//! Integration tests for the generate client
//!
//! Runs the client against a wiremock server speaking the Ollama protocol.

use ollama_ime::streaming::{ClientSettings, OllamaClient, StreamPolicy};
use ollama_ime::types::{CompletionRequest, GenerateRequest, GenerationOptions, OptionValue};
use ollama_ime::ClientError;
use serde_json::json;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ndjson(lines: &[&str]) -> String {
    let mut body = lines.join("\n");
    body.push('\n');
    body
}

fn client_for(server: &MockServer) -> OllamaClient {
    OllamaClient::with_config(&server.uri(), "llama3.2").unwrap()
}

fn chunk(data: &str) -> Vec<u8> {
    format!("{:x}\r\n{}\r\n", data.len(), data).into_bytes()
}

/// Serve one chunked generate response over a raw socket
///
/// Sends `first`, then writes `filler` every 20ms (or stays silent when it is
/// `None`). The receiver reports whether a write failed, i.e. whether the
/// client closed the connection.
async fn spawn_streaming_server(
    first: &'static str,
    filler: Option<&'static str>,
) -> (String, oneshot::Receiver<bool>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (closed_tx, closed_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = vec![0u8; 8192];
        let _ = socket.read(&mut request).await;

        let mut head = b"HTTP/1.1 200 OK\r\ncontent-type: application/x-ndjson\r\ntransfer-encoding: chunked\r\n\r\n".to_vec();
        head.extend(chunk(first));
        socket.write_all(&head).await.unwrap();

        for _ in 0..250 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let Some(filler) = filler else { continue };
            let written = match socket.write_all(&chunk(filler)).await {
                Ok(()) => socket.flush().await,
                Err(e) => Err(e),
            };
            if written.is_err() {
                let _ = closed_tx.send(true);
                return;
            }
        }
        let _ = closed_tx.send(false);
    });

    (format!("http://{}", addr), closed_rx)
}

async fn mount_generate(server: &MockServer, body: String) {
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn streaming_generate_sends_expected_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "model": "llama3.2",
            "prompt": "日本の四季",
            "stream": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(ndjson(&[
            r#"{"response":"春","done":false}"#,
            r#"{"response":"\n夏","done":true}"#,
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let lines = client_for(&server).generate_lines("日本の四季").await.unwrap();
    assert_eq!(lines, vec!["春", "夏"]);
}

#[tokio::test]
async fn streaming_generate_stops_at_first_done() {
    let server = MockServer::start().await;
    mount_generate(
        &server,
        ndjson(&[
            r#"{"response":"A","done":false}"#,
            r#"{"response":"B","done":true}"#,
            r#"{"response":"C","done":false}"#,
        ]),
    )
    .await;

    let result = client_for(&server)
        .generate(&GenerateRequest::streaming("llama3.2", "x"))
        .await
        .unwrap();
    assert_eq!(result.text, "AB");
    assert!(result.completed);
}

#[tokio::test]
async fn streaming_generate_skips_malformed_line() {
    let server = MockServer::start().await;
    mount_generate(
        &server,
        ndjson(&[
            r#"{"response":"A","done":false}"#,
            "not-json",
            r#"{"response":"B","done":true}"#,
        ]),
    )
    .await;

    let result = client_for(&server)
        .generate(&GenerateRequest::streaming("llama3.2", "x"))
        .await
        .unwrap();
    assert_eq!(result.text, "AB");
    assert_eq!(result.skipped, 1);
}

#[tokio::test]
async fn streaming_generate_without_done_keeps_text() {
    let server = MockServer::start().await;
    // No trailing newline: the last line is flushed at end of body
    mount_generate(&server, r#"{"response":"X","done":false}"#.to_string()).await;

    let lines = client_for(&server).generate_lines("x").await.unwrap();
    assert_eq!(lines, vec!["X"]);
}

#[tokio::test]
async fn strict_policy_rejects_stream_without_done() {
    let server = MockServer::start().await;
    mount_generate(&server, ndjson(&[r#"{"response":"X","done":false}"#])).await;

    let client = client_for(&server).with_policy(StreamPolicy::strict());
    let err = client.generate_lines("x").await.unwrap_err();
    assert!(matches!(err, ClientError::IncompleteStream { .. }));
}

#[tokio::test]
async fn empty_stream_is_no_response_for_lines() {
    let server = MockServer::start().await;
    mount_generate(&server, String::new()).await;

    let client = client_for(&server);
    let result = client
        .generate(&GenerateRequest::streaming("llama3.2", "x"))
        .await
        .unwrap();
    assert_eq!(result.text, "");

    let err = client.generate_lines("x").await.unwrap_err();
    assert!(matches!(err, ClientError::NoResponse));
}

#[tokio::test]
async fn streaming_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"error": "model 'nope' not found"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server).generate_lines("x").await.unwrap_err();
    match err {
        ClientError::UnexpectedStatus { status, body } => {
            assert_eq!(status.as_u16(), 404);
            assert!(body.contains("not found"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn options_are_sent_with_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "options": {"temperature": 0.2, "num_predict": 16}
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(ndjson(&[r#"{"response":"ok","done":true}"#])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut options = GenerationOptions::new();
    options.insert("temperature".to_string(), OptionValue::Float(0.2));
    options.insert("num_predict".to_string(), OptionValue::Integer(16));

    let client = client_for(&server).with_options(options);
    assert_eq!(client.generate_lines("x").await.unwrap(), vec!["ok"]);
}

#[tokio::test]
async fn completion_joins_prompt_and_target() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "qwen2.5:3b",
            "prompt": "Convert:\nかんじ",
            "stream": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(ndjson(&[
            r#"{"response":"漢字\n","done":false}"#,
            r#"{"response":"感じ","done":false}"#,
            r#"{"done":true}"#,
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let request = CompletionRequest::new("Convert:", "かんじ").with_model("qwen2.5:3b");
    let lines = client_for(&server).complete(&request).await.unwrap();
    assert_eq!(lines, vec!["漢字", "感じ"]);
}

#[tokio::test]
async fn transform_trims_single_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({"stream": false})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"response": "  hello world  ", "done": true})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let text = client_for(&server).transform_text("x").await.unwrap();
    assert_eq!(text, "hello world");
}

#[tokio::test]
async fn transform_falls_back_to_raw_body() {
    let server = MockServer::start().await;
    mount_generate(&server, "plain text reply".to_string()).await;

    let text = client_for(&server).transform_text("x").await.unwrap();
    assert_eq!(text, "plain text reply");
}

#[tokio::test]
async fn transform_blank_response_is_no_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"response": " \n ", "done": true})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server).transform_text("x").await.unwrap_err();
    assert!(matches!(err, ClientError::NoResponse));
}

#[tokio::test]
async fn transform_error_status_is_connection_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client_for(&server).transform_text("x").await.unwrap_err();
    assert!(err.is_connection_error());
}

#[tokio::test]
async fn invalid_base_url_never_connects() {
    let err = OllamaClient::from_settings(ClientSettings {
        base_url: Some("localhost:11434".to_string()),
        ..ClientSettings::default()
    })
    .unwrap_err();
    assert!(matches!(err, ClientError::Parse { .. }));
}

#[tokio::test]
async fn delayed_headers_hit_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(ndjson(&[r#"{"response":"late","done":true}"#]))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = OllamaClient::from_settings(ClientSettings {
        base_url: Some(server.uri()),
        request_timeout: Some(Duration::from_millis(300)),
        ..ClientSettings::default()
    })
    .unwrap();
    let err = client.generate_lines("x").await.unwrap_err();
    assert!(err.is_connection_error(), "{:?}", err);
}

#[tokio::test]
async fn stalled_stream_is_connection_error() {
    let (url, _closed) =
        spawn_streaming_server("{\"response\":\"par\",\"done\":false}\n", None).await;
    let client = OllamaClient::from_settings(ClientSettings {
        base_url: Some(url),
        request_timeout: Some(Duration::from_secs(1)),
        ..ClientSettings::default()
    })
    .unwrap();

    let outcome = tokio::time::timeout(Duration::from_secs(10), client.generate_lines("x"))
        .await
        .unwrap();
    match outcome {
        Err(ClientError::Connection(_)) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn slow_stream_outlives_request_timeout() {
    // chunks arrive every 20ms for longer than the timeout; only `done` ends it
    let (url, _closed) = spawn_streaming_server(
        "{\"response\":\"a\",\"done\":false}\n",
        Some("{\"response\":\"\",\"done\":false}\n"),
    )
    .await;
    let client = OllamaClient::from_settings(ClientSettings {
        base_url: Some(url),
        request_timeout: Some(Duration::from_millis(200)),
        ..ClientSettings::default()
    })
    .unwrap();

    let outcome =
        tokio::time::timeout(Duration::from_millis(600), client.generate_lines("x")).await;
    assert!(outcome.is_err(), "stream ended early: {:?}", outcome);
}

#[tokio::test]
async fn abandoned_request_closes_connection() {
    let (url, closed) = spawn_streaming_server(
        "{\"response\":\"a\",\"done\":false}\n",
        Some("{\"response\":\"b\",\"done\":false}\n"),
    )
    .await;
    let client = OllamaClient::with_config(&url, "llama3.2").unwrap();

    let outcome =
        tokio::time::timeout(Duration::from_millis(200), client.generate_lines("x")).await;
    assert!(outcome.is_err());

    let closed = tokio::time::timeout(Duration::from_secs(5), closed)
        .await
        .unwrap()
        .unwrap();
    assert!(closed);
}

#[tokio::test]
async fn done_fragment_closes_connection() {
    let (url, closed) = spawn_streaming_server(
        "{\"response\":\"A\",\"done\":true}\n",
        Some("{\"response\":\"more\",\"done\":false}\n"),
    )
    .await;
    let client = OllamaClient::with_config(&url, "llama3.2").unwrap();

    assert_eq!(client.generate_lines("x").await.unwrap(), vec!["A"]);

    let closed = tokio::time::timeout(Duration::from_secs(5), closed)
        .await
        .unwrap()
        .unwrap();
    assert!(closed);
}

#[tokio::test]
async fn concurrent_calls_are_independent() {
    let server = MockServer::start().await;
    mount_generate(&server, ndjson(&[r#"{"response":"gen","done":true}"#])).await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{"name": "llama3.2"}]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let (lines, models) = tokio::join!(client.generate_lines("x"), client.list_models());
    assert_eq!(lines.unwrap(), vec!["gen"]);
    assert_eq!(models.unwrap(), vec!["llama3.2"]);
}
