//! Server-sent event relay.
//!
//! The chat route forwards the main server's SSE stream to its own client.
//! Upstream `data:` lines are re-emitted as `data: ...\n\n` frames; other
//! lines (comments, `event:` fields, blanks) are dropped. The relay stops
//! after `[DONE]`.

use futures::StreamExt;
use reqwest::Response;
use subserver_core::error::ProviderError;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

/// One relayed SSE frame or the end marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    Data(String),
    Done,
}

impl SseFrame {
    /// Wire form of the frame.
    pub fn encode(&self) -> String {
        match self {
            Self::Data(data) => format!("data: {data}\n\n"),
            Self::Done => "data: [DONE]\n\n".to_string(),
        }
    }
}

/// Classify one upstream line.
pub fn parse_line(line: &str) -> Option<SseFrame> {
    let data = line.strip_prefix("data: ")?;
    if data.trim() == "[DONE]" {
        Some(SseFrame::Done)
    } else {
        Some(SseFrame::Data(data.to_string()))
    }
}

/// Splits an incoming byte stream into complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes and drain every complete line (without `\r\n`).
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));
        let mut lines = Vec::new();
        while let Some(line_end) = self.buffer.find('\n') {
            let line = self.buffer[..line_end].trim_end_matches('\r').to_string();
            self.buffer.drain(..=line_end);
            lines.push(line);
        }
        lines
    }

    /// Whatever is left once the stream ends.
    pub fn finish(self) -> Option<String> {
        let rest = self.buffer.trim_end_matches('\r');
        (!rest.is_empty()).then(|| rest.to_string())
    }
}

/// Relay an upstream SSE response as encoded frames.
///
/// Spawns a reader task; the returned stream ends after `[DONE]`, when the
/// upstream closes, or when the consumer is dropped.
pub fn relay(response: Response) -> ReceiverStream<Result<String, ProviderError>> {
    let (tx, rx) = tokio::sync::mpsc::channel(64);

    tokio::spawn(async move {
        let mut byte_stream = response.bytes_stream();
        let mut lines = LineBuffer::new();

        while let Some(chunk) = byte_stream.next().await {
            let bytes = match chunk {
                Ok(b) => b,
                Err(e) => {
                    warn!(error = %e, "Upstream stream interrupted");
                    let _ = tx.send(Err(ProviderError::Network(e.to_string()))).await;
                    return;
                }
            };

            for line in lines.push(&bytes) {
                let Some(frame) = parse_line(&line) else {
                    continue;
                };
                let done = frame == SseFrame::Done;
                if tx.send(Ok(frame.encode())).await.is_err() {
                    return; // receiver dropped
                }
                if done {
                    debug!("Upstream stream finished");
                    return;
                }
            }
        }

        if let Some(frame) = lines.finish().as_deref().and_then(parse_line) {
            let _ = tx.send(Ok(frame.encode())).await;
        }
    });

    ReceiverStream::new(rx)
}
