//! HTTP transport for the Ollama API
//!
//! Provides the two request shapes the client needs:
//! - Streaming POST: status inspected once, body exposed as a [`LineStream`]
//! - One-shot GET/POST: whole body returned, status must be 200
//!
//! The configured timeout bounds a whole one-shot request. On the streaming
//! path it bounds the wait for headers and for each body chunk instead, so a
//! long generation that keeps producing output is never cut off.

use super::lines::LineStream;
use crate::config::ConnectionTarget;
use crate::errors::{ClientError, Result};
use bytes::Bytes;
use futures_util::stream::{self, Stream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::debug;

/// Connect timeout for every request (5 seconds)
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on error bodies quoted in errors
const MAX_ERROR_BODY: usize = 512;

/// Open streaming response
#[derive(Debug)]
pub struct StreamSession {
    /// Status observed on the response headers
    pub status: StatusCode,
    /// Lazily read body lines
    pub lines: LineStream,
}

impl StreamSession {
    /// Fail on any status other than 200, quoting the error body
    pub async fn require_success(self) -> Result<LineStream> {
        if self.status == StatusCode::OK {
            return Ok(self.lines);
        }

        let mut body = Vec::new();
        let mut lines = self.lines;
        while let Some(Ok(line)) = lines.next().await {
            body.extend_from_slice(&line);
            if body.len() > MAX_ERROR_BODY {
                break;
            }
        }
        lines.close();

        Err(ClientError::UnexpectedStatus {
            status: self.status,
            body: truncate_body(&body),
        })
    }
}

/// HTTP session shared by all calls of a client
///
/// Cloning is cheap: the underlying connection pool is reference counted.
#[derive(Debug, Clone)]
pub struct TransportSession {
    client: Client,
    timeout: Option<Duration>,
}

impl TransportSession {
    /// Build a session with an optional request timeout
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(ClientError::Http)?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// POST a JSON body and expose the response as lines
    pub async fn open(
        &self,
        target: &ConnectionTarget,
        path: &str,
        body: Vec<u8>,
    ) -> Result<StreamSession> {
        let url = target.endpoint(path)?;
        debug!(url = url.as_str(), bytes = body.len(), "opening stream");

        let send = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send();
        let response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, send).await.map_err(|_| {
                ClientError::Connection(format!("No response headers within {:?}", limit))
            })?,
            None => send.await,
        }
        .map_err(|e| ClientError::connection("Failed to send request", e))?;

        let status = response.status();
        debug!(%status, "stream opened");

        Ok(StreamSession {
            status,
            lines: LineStream::from_chunks(body_chunks(response, self.timeout)),
        })
    }

    /// POST a JSON body and read the whole response
    pub async fn post_once(
        &self,
        target: &ConnectionTarget,
        path: &str,
        body: Vec<u8>,
    ) -> Result<Bytes> {
        let url = target.endpoint(path)?;
        debug!(url = url.as_str(), bytes = body.len(), "POST");

        let response = self
            .with_timeout(self.client.post(url))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| ClientError::connection("Failed to send request", e))?;

        read_success_body(response).await
    }

    /// GET a path and read the whole response
    pub async fn get_once(&self, target: &ConnectionTarget, path: &str) -> Result<Bytes> {
        let url = target.endpoint(path)?;
        debug!(url = url.as_str(), "GET");

        let response = self
            .with_timeout(self.client.get(url))
            .send()
            .await
            .map_err(|e| ClientError::connection("Failed to connect to Ollama", e))?;

        read_success_body(response).await
    }

    fn with_timeout(&self, request: RequestBuilder) -> RequestBuilder {
        match self.timeout {
            Some(limit) => request.timeout(limit),
            None => request,
        }
    }
}

/// Body chunks, failing when the server sends nothing for `idle`
fn body_chunks(
    response: Response,
    idle: Option<Duration>,
) -> impl Stream<Item = Result<Bytes>> + Send + 'static {
    stream::unfold(Box::pin(response.bytes_stream()), move |mut body| async move {
        let next = match idle {
            Some(limit) => match tokio::time::timeout(limit, body.next()).await {
                Ok(next) => next,
                Err(_) => {
                    let err = ClientError::Connection(format!(
                        "No data received for {:?} while streaming",
                        limit
                    ));
                    return Some((Err(err), body));
                }
            },
            None => body.next().await,
        };
        next.map(|chunk| {
            let chunk =
                chunk.map_err(|e| ClientError::connection("Failed to read response body", e));
            (chunk, body)
        })
    })
}

async fn read_success_body(response: Response) -> Result<Bytes> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| ClientError::connection("Failed to read response body", e))?;

    if status != StatusCode::OK {
        return Err(ClientError::UnexpectedStatus {
            status,
            body: truncate_body(&body),
        });
    }

    Ok(body)
}

fn truncate_body(body: &[u8]) -> String {
    let end = body.len().min(MAX_ERROR_BODY);
    String::from_utf8_lossy(&body[..end]).trim().to_string()
}
