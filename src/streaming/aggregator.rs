//! Fragment aggregation for streamed generate responses
//!
//! Consumes raw lines and produces one [`AggregatedResult`]. Individual bad
//! lines never abort a generation: empty lines, non-UTF-8 lines, over-long
//! lines and lines that fail to decode are counted and skipped. A failed
//! connection does abort it. The first `done: true`
//! fragment ends consumption; the stream is dropped at that point so the
//! connection is released even if the server keeps sending.

use super::codec::decode_fragment;
use crate::errors::{ClientError, Result};
use crate::types::AggregatedResult;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tracing::{debug, warn};

/// What to do when the body ends before a terminal fragment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamPolicy {
    /// Treat a missing `done: true` as an error instead of finalizing
    pub require_done: bool,
}

impl StreamPolicy {
    /// Finalize with whatever text arrived
    pub fn lenient() -> Self {
        Self {
            require_done: false,
        }
    }

    /// Fail with [`ClientError::IncompleteStream`] when `done` never arrives
    pub fn strict() -> Self {
        Self { require_done: true }
    }
}

/// Mutable accumulator behind [`aggregate`]
#[derive(Debug, Default)]
pub struct Aggregator {
    result: AggregatedResult,
}

/// Outcome of feeding one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    /// Line decoded, keep reading
    Continue,
    /// Line skipped, keep reading
    Skipped,
    /// Terminal fragment seen, stop reading
    Done,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw line
    pub fn feed(&mut self, line: &[u8]) -> LineOutcome {
        let Ok(text) = std::str::from_utf8(line) else {
            debug!(bytes = line.len(), "skipping non-UTF-8 line");
            self.result.skipped += 1;
            return LineOutcome::Skipped;
        };
        if text.trim().is_empty() {
            self.result.skipped += 1;
            return LineOutcome::Skipped;
        }

        match decode_fragment(text.as_bytes()) {
            Ok(fragment) => {
                self.result.fragments += 1;
                if let Some(piece) = &fragment.response {
                    self.result.text.push_str(piece);
                }
                if fragment.done {
                    self.result.completed = true;
                    LineOutcome::Done
                } else {
                    LineOutcome::Continue
                }
            }
            Err(e) => {
                debug!(error = %e, "skipping undecodable line");
                self.result.skipped += 1;
                LineOutcome::Skipped
            }
        }
    }

    /// Count a line the framer already rejected
    pub fn skip(&mut self) {
        self.result.skipped += 1;
    }

    /// Text accumulated so far
    pub fn text(&self) -> &str {
        &self.result.text
    }

    /// Close aggregation and apply the end-of-stream policy
    pub fn finalize(self, policy: StreamPolicy) -> Result<AggregatedResult> {
        if !self.result.completed && policy.require_done {
            return Err(ClientError::IncompleteStream {
                partial: self.result.text,
            });
        }
        Ok(self.result)
    }
}

/// Drain `lines` into a finalized result
///
/// Over-long lines ([`ClientError::Streaming`]) are skipped. Any other error
/// item means the body could not be read and is returned as is; text
/// received before it is discarded.
pub async fn aggregate<S>(lines: S, policy: StreamPolicy) -> Result<AggregatedResult>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    let mut lines = lines;
    let mut aggregator = Aggregator::new();

    while let Some(item) = lines.next().await {
        match item {
            Ok(line) => {
                if aggregator.feed(&line) == LineOutcome::Done {
                    break;
                }
            }
            Err(ClientError::Streaming(reason)) => {
                debug!(%reason, "skipping over-long line");
                aggregator.skip();
            }
            Err(e) => {
                warn!(error = %e, received = aggregator.text().len(), "stream interrupted");
                return Err(e);
            }
        }
    }
    drop(lines);

    let result = aggregator.finalize(policy)?;
    debug!(
        fragments = result.fragments,
        skipped = result.skipped,
        completed = result.completed,
        "stream finalized"
    );
    Ok(result)
}
