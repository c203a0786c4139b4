//! Server-sent events decoder.
//!
//! Converts a raw byte stream into [`SseFrame`] values. Handles partial
//! lines across chunks, `\r\n` line endings, comment (heartbeat) lines and
//! multi-line `data:` fields. Events without data are not emitted.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::stream::Stream;

use super::{ByteStream, ConnectionError};

/// Longest line accepted before the connection is considered broken.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// The last event id seen on this stream, if any.
    pub id: Option<String>,
    /// All `data:` lines of the event joined with `\n`.
    pub data: String,
    /// The most recent `retry:` value sent by the server.
    pub retry: Option<Duration>,
}

/// Stream adapter that turns feed bytes into [`SseFrame`]s.
pub struct SseStream {
    inner: ByteStream,
    buffer: Vec<u8>,
    data: Vec<String>,
    last_id: Option<String>,
    retry: Option<Duration>,
}

impl SseStream {
    pub fn new(inner: ByteStream) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
            data: Vec::new(),
            last_id: None,
            retry: None,
        }
    }

    /// Consume complete lines from the buffer until an event is dispatched.
    ///
    /// Consumed bytes are drained once per call.
    fn next_frame(&mut self) -> Option<SseFrame> {
        let mut consumed = 0;
        let mut frame = None;

        while let Some(offset) = self.buffer[consumed..].iter().position(|b| *b == b'\n') {
            let end = consumed + offset;
            let raw = &self.buffer[consumed..end];
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            consumed = end + 1;

            if raw.is_empty() {
                if self.data.is_empty() {
                    continue;
                }
                frame = Some(SseFrame {
                    id: self.last_id.clone(),
                    data: std::mem::take(&mut self.data).join("\n"),
                    retry: self.retry,
                });
                break;
            }

            let line = String::from_utf8_lossy(raw).into_owned();
            self.apply_field(&line);
        }

        self.buffer.drain(..consumed);
        frame
    }

    fn apply_field(&mut self, line: &str) {
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => self.data.push(value.to_string()),
            "id" if !value.contains('\0') => self.last_id = Some(value.to_string()),
            "retry" => {
                if let Ok(millis) = value.parse::<u64>() {
                    self.retry = Some(Duration::from_millis(millis));
                }
            }
            _ => {}
        }
    }
}

impl Stream for SseStream {
    type Item = Result<SseFrame, ConnectionError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(frame) = this.next_frame() {
                return Poll::Ready(Some(Ok(frame)));
            }
            if this.buffer.len() > MAX_LINE_BYTES {
                this.buffer.clear();
                return Poll::Ready(Some(Err(ConnectionError::Interrupted(format!(
                    "line longer than {MAX_LINE_BYTES} bytes"
                )))));
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => this.buffer.extend_from_slice(&bytes),
                Poll::Ready(Some(Err(e))) => return Poll::Ready(Some(Err(e))),
                // An event not terminated by a blank line is discarded.
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
