//! Incremental line framing for newline-delimited JSON bodies
//!
//! Network chunks do not respect line boundaries. The buffer keeps the
//! partial tail of the last chunk and emits complete lines as they appear:
//! - Delimiter: `\n`, with a trailing `\r` stripped
//! - Buffer: 1MB maximum per line; longer lines are reported and discarded
//! - End of body: the unterminated tail is flushed as a final line

use crate::errors::{ClientError, Result};
use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Maximum length of a single line (1MB)
pub const MAX_LINE_BYTES: usize = 1_048_576;

/// Accumulates chunks and splits them into lines
#[derive(Debug)]
pub struct LineBuffer {
    buffer: BytesMut,
    max_line_bytes: usize,
    /// Inside an over-long line, dropping bytes until the next `\n`
    discarding: bool,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::with_capacity(MAX_LINE_BYTES)
    }

    /// Create buffer with a custom per-line limit
    pub fn with_capacity(max_line_bytes: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            max_line_bytes,
            discarding: false,
        }
    }

    /// Append a chunk and return every line it completes, in order
    ///
    /// An over-long line appears once as a [`ClientError::Streaming`] item;
    /// its remaining bytes are dropped up to the next newline.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<Bytes>> {
        let mut lines = Vec::new();
        let mut chunk = chunk;

        if self.discarding {
            match chunk.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    chunk = &chunk[pos + 1..];
                    self.discarding = false;
                }
                None => return lines,
            }
        }

        self.buffer.extend_from_slice(chunk);
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line = self.buffer.split_to(pos + 1);
            line.truncate(pos);
            if line.len() > self.max_line_bytes {
                lines.push(Err(self.overflow(line.len())));
            } else {
                lines.push(Ok(strip_cr(line.freeze())));
            }
        }

        if self.buffer.len() > self.max_line_bytes {
            let size = self.buffer.len();
            self.buffer.clear();
            self.discarding = true;
            lines.push(Err(self.overflow(size)));
        }

        lines
    }

    /// Take the unterminated remainder at end of body
    pub fn finish(&mut self) -> Option<Bytes> {
        self.discarding = false;
        if self.buffer.is_empty() {
            return None;
        }
        Some(strip_cr(self.buffer.split().freeze()))
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    fn overflow(&self, size: usize) -> ClientError {
        ClientError::Streaming(format!(
            "Line exceeds maximum of {} bytes ({} buffered)",
            self.max_line_bytes, size
        ))
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_cr(line: Bytes) -> Bytes {
    match line.last() {
        Some(b'\r') => line.slice(..line.len() - 1),
        _ => line,
    }
}

type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Lazy stream of raw lines read from a response body
///
/// Owns the body; dropping or closing it releases the connection.
pub struct LineStream {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>,
}

impl LineStream {
    /// Frame a stream of body chunks into lines
    pub fn from_chunks<S>(chunks: S) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self::with_limit(chunks, MAX_LINE_BYTES)
    }

    pub fn with_limit<S>(chunks: S, max_line_bytes: usize) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        let state = (
            Box::pin(chunks) as ChunkStream,
            LineBuffer::with_capacity(max_line_bytes),
            false,
        );

        let lines = stream::unfold(state, |(mut chunks, mut buffer, finished)| async move {
            if finished {
                return None;
            }
            match chunks.next().await {
                Some(Ok(chunk)) => {
                    let items = buffer.push(&chunk);
                    Some((stream::iter(items), (chunks, buffer, false)))
                }
                Some(Err(e)) => Some((stream::iter(vec![Err(e)]), (chunks, buffer, false))),
                None => {
                    let tail: Vec<Result<Bytes>> = buffer.finish().into_iter().map(Ok).collect();
                    Some((stream::iter(tail), (chunks, buffer, true)))
                }
            }
        })
        .flatten();

        Self {
            inner: Box::pin(lines),
        }
    }

    /// Stream over already-split lines, mainly for tests and replays
    pub fn from_lines<I, L>(lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Bytes>,
    {
        let items: Vec<Result<Bytes>> = lines.into_iter().map(|l| Ok(l.into())).collect();
        Self {
            inner: Box::pin(stream::iter(items)),
        }
    }

    /// Stop reading and release the underlying connection
    pub fn close(self) {
        drop(self);
    }
}

impl Stream for LineStream {
    type Item = Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl std::fmt::Debug for LineStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineStream").finish_non_exhaustive()
    }
}
