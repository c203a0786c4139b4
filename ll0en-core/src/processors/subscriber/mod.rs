//! StreamSubscriber processor.
//!
//! The StreamSubscriber is responsible for:
//! - Holding a long-lived server-sent events connection to the happenings feed
//! - Decoding each record into a `RawEvent` and handing it to the consumer callback
//! - Skipping malformed records
//! - Reconnecting after any disconnect, resuming from the last event id
//!
//! The callback runs on the subscriber's task and gates the next record, so
//! it must only classify and spawn; it must never wait on the network.

mod sse;

pub use sse::{SseFrame, SseStream};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::{BoxStream, Stream};
use ll0en_sdk::objects::HappeningPayload;
use reqwest::Client;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{Instant, Sleep};
use tracing::{debug, info, warn};
use url::Url;

use crate::events::RawEvent;

/// Highest backoff exponent (2^6 = 64 seconds between attempts).
const MAX_BACKOFF_EXPONENT: u32 = 6;

/// Shortest wait between connection attempts, whatever the server asks for.
pub const MIN_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Reconnect when the feed has sent nothing, not even a heartbeat, for this long.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(15 * 60);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw feed bytes as delivered by a [`FeedSource`].
pub type ByteStream = BoxStream<'static, Result<Bytes, ConnectionError>>;

/// Errors on the feed connection.
///
/// Only [`ConnectionError::Url`] and [`ConnectionError::Setup`] are fatal,
/// and only before the first connection attempt; everything else triggers a
/// reconnect.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("invalid feed url: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to build feed http client: {0}")]
    Setup(#[source] reqwest::Error),

    #[error("feed request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed responded with status {0}")]
    Status(u16),

    #[error("feed stream interrupted: {0}")]
    Interrupted(String),

    #[error("feed silent for {0:?}")]
    Idle(Duration),
}

/// A feed record whose payload could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed happening payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Something the subscriber can (re)connect to.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Open a new connection, resuming after `last_event_id` when given.
    async fn connect(&self, last_event_id: Option<&str>) -> Result<ByteStream, ConnectionError>;
}

#[async_trait]
impl<T: FeedSource + ?Sized> FeedSource for Arc<T> {
    async fn connect(&self, last_event_id: Option<&str>) -> Result<ByteStream, ConnectionError> {
        (**self).connect(last_event_id).await
    }
}

/// The NationStates happenings feed over HTTP.
pub struct HttpFeedSource {
    http: Client,
    url: Url,
}

impl HttpFeedSource {
    /// Prepare a feed connection. Fails only if the URL or client is unusable.
    pub fn new(url: &str, user_agent: &str) -> Result<Self, ConnectionError> {
        let url = Url::parse(url)?;
        let http = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(ConnectionError::Setup)?;

        Ok(Self { http, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn connect(&self, last_event_id: Option<&str>) -> Result<ByteStream, ConnectionError> {
        let mut request = self
            .http
            .get(self.url.clone())
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");

        if let Some(id) = last_event_id {
            request = request.header("Last-Event-ID", id);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ConnectionError::Status(status.as_u16()));
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ConnectionError::from))
            .boxed())
    }
}

/// Byte stream that fails with [`ConnectionError::Idle`] once no chunk has
/// arrived for `timeout`. Any chunk counts, including comment heartbeats.
struct IdleGuard {
    inner: ByteStream,
    timeout: Duration,
    deadline: Pin<Box<Sleep>>,
}

impl IdleGuard {
    fn new(inner: ByteStream, timeout: Duration) -> Self {
        Self {
            inner,
            timeout,
            deadline: Box::pin(tokio::time::sleep(timeout)),
        }
    }
}

impl Stream for IdleGuard {
    type Item = Result<Bytes, ConnectionError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        match this.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(bytes))) => {
                this.deadline.as_mut().reset(Instant::now() + this.timeout);
                Poll::Ready(Some(Ok(bytes)))
            }
            Poll::Pending => match this.deadline.as_mut().poll(cx) {
                Poll::Ready(()) => Poll::Ready(Some(Err(ConnectionError::Idle(this.timeout)))),
                Poll::Pending => Poll::Pending,
            },
            other => other,
        }
    }
}

/// Why a single connection ended.
enum StreamEnd {
    Shutdown,
    Closed,
    Idle,
    Interrupted(ConnectionError),
}

/// Keeps one feed subscription alive until shutdown.
pub struct StreamSubscriber<S> {
    source: S,
    last_event_id: Option<String>,
    server_retry: Option<Duration>,
    idle_timeout: Duration,
}

impl<S: FeedSource> StreamSubscriber<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            last_event_id: None,
            server_retry: None,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// Override how long a silent connection is kept before reconnecting.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Run the subscription until `shutdown_rx` turns `true` (or its sender
    /// is dropped).
    ///
    /// Events are passed to `on_event` one at a time, in feed order.
    pub async fn run<F>(mut self, mut on_event: F, mut shutdown_rx: watch::Receiver<bool>)
    where
        F: FnMut(RawEvent) + Send,
    {
        info!("StreamSubscriber started");
        let mut attempt: u32 = 0;

        loop {
            let connected = tokio::select! {
                biased;

                _ = wait_for_shutdown(&mut shutdown_rx) => break,

                result = self.source.connect(self.last_event_id.as_deref()) => result,
            };

            match connected {
                Ok(stream) => {
                    info!(last_event_id = ?self.last_event_id, "Connected to feed");
                    match self
                        .consume(stream, &mut on_event, &mut shutdown_rx, &mut attempt)
                        .await
                    {
                        StreamEnd::Shutdown => break,
                        StreamEnd::Closed => warn!("Feed closed by server"),
                        StreamEnd::Idle => {
                            // The connection itself was healthy; start backoff over.
                            attempt = 0;
                            warn!(
                                idle_secs = self.idle_timeout.as_secs(),
                                "Feed silent for too long"
                            );
                        }
                        StreamEnd::Interrupted(e) => warn!(error = %e, "Feed stream interrupted"),
                    }
                }
                Err(e) => {
                    warn!(error = %e, attempt = attempt, "Failed to connect to feed");
                }
            }

            let delay = next_reconnect_delay(self.server_retry, attempt);
            attempt = attempt.saturating_add(1);
            info!(delay_ms = delay.as_millis() as u64, "Reconnecting to feed");

            tokio::select! {
                biased;

                _ = wait_for_shutdown(&mut shutdown_rx) => break,

                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!("StreamSubscriber shutdown complete");
    }

    async fn consume<F>(
        &mut self,
        stream: ByteStream,
        on_event: &mut F,
        shutdown_rx: &mut watch::Receiver<bool>,
        attempt: &mut u32,
    ) -> StreamEnd
    where
        F: FnMut(RawEvent) + Send,
    {
        let mut frames = SseStream::new(IdleGuard::new(stream, self.idle_timeout).boxed());

        loop {
            let next = tokio::select! {
                biased;

                _ = wait_for_shutdown(shutdown_rx) => return StreamEnd::Shutdown,

                next = frames.next() => next,
            };

            match next {
                Some(Ok(frame)) => {
                    *attempt = 0;
                    if frame.retry.is_some() {
                        self.server_retry = frame.retry;
                    }
                    if frame.id.is_some() {
                        self.last_event_id = frame.id.clone();
                    }

                    match decode_event(&frame) {
                        Ok(event) => {
                            debug!(event = %event.text, "Received happening");
                            on_event(event);
                        }
                        Err(e) => {
                            warn!(
                                error = %e,
                                data = %truncate(&frame.data, 200),
                                "Skipping malformed feed record"
                            );
                        }
                    }
                }
                Some(Err(ConnectionError::Idle(_))) => return StreamEnd::Idle,
                Some(Err(e)) => return StreamEnd::Interrupted(e),
                None => return StreamEnd::Closed,
            }
        }
    }
}

/// Subscribe to `feed_url` and feed every happening to `on_event` until shutdown.
///
/// Returns an error only when the subscription cannot be set up at all.
pub async fn subscribe<F>(
    feed_url: &str,
    user_agent: &str,
    on_event: F,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<(), ConnectionError>
where
    F: FnMut(RawEvent) + Send,
{
    let source = HttpFeedSource::new(feed_url, user_agent)?;
    info!(url = %source.url(), "Subscribing to happenings feed");

    StreamSubscriber::new(source).run(on_event, shutdown_rx).await;
    Ok(())
}

/// Decode the JSON payload of one feed record.
pub fn decode_event(frame: &SseFrame) -> Result<RawEvent, DecodeError> {
    let payload: HappeningPayload = serde_json::from_str(&frame.data)?;
    Ok(RawEvent {
        text: payload.text,
        id: frame.id.clone(),
    })
}

/// Delay before reconnect attempt number `attempt` (0-based).
///
/// Uses exponential backoff: 2^attempt seconds, capped at 64 seconds.
pub fn reconnect_delay(attempt: u32) -> Duration {
    Duration::from_secs(2u64.pow(attempt.min(MAX_BACKOFF_EXPONENT)))
}

/// Delay before the next connection attempt.
///
/// A server-sent `retry:` applies to the first attempt after a healthy
/// connection, never below [`MIN_RECONNECT_DELAY`]. Once attempts fail,
/// the exponential backoff takes over whenever it is longer.
pub fn next_reconnect_delay(server_retry: Option<Duration>, attempt: u32) -> Duration {
    let backoff = reconnect_delay(attempt);
    match server_retry {
        Some(retry) if attempt == 0 => retry.max(MIN_RECONNECT_DELAY),
        Some(retry) => retry.max(backoff),
        None => backoff,
    }
}

async fn wait_for_shutdown(shutdown_rx: &mut watch::Receiver<bool>) {
    while !*shutdown_rx.borrow_and_update() {
        if shutdown_rx.changed().await.is_err() {
            return;
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
