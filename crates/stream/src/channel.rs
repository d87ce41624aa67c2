//! One resilient server-push connection with named-event dispatch.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU32, Ordering},
};

use {
    futures::StreamExt,
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use crate::{
    config::{ChannelConfig, ReconnectPolicy, TokenPlacement},
    error::{Error, Result},
    sse::SseDecoder,
};

const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";

/// Connection lifecycle state, readable at any time via
/// [`StreamChannel::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    /// Created but never opened.
    Idle,
    /// Connection attempt in flight.
    Connecting,
    /// Live connection, frames flowing.
    Open,
    /// Last attempt failed. Transient while the retry budget lasts,
    /// terminal once it is exhausted.
    Erroring,
    /// Deliberately torn down.
    Closed,
}

/// Events delivered to the channel's consumer, in network arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The connection opened (or re-opened) successfully.
    Opened,
    /// One recognized named frame with its raw JSON payload.
    Frame { name: String, data: String },
    /// A transport-level failure; a reconnect is scheduled unless the retry
    /// budget is exhausted.
    Error(String),
    /// The retry budget is spent. The channel stays in terminal
    /// [`ChannelStatus::Erroring`] until explicitly re-opened.
    RetriesExhausted { attempts: u32 },
    /// The channel was closed by its consumer.
    Closed,
}

#[derive(Debug)]
struct Shared {
    status: Mutex<ChannelStatus>,
    attempt: AtomicU32,
}

impl Shared {
    fn status(&self) -> ChannelStatus {
        self.status.lock().map(|g| *g).unwrap_or(ChannelStatus::Closed)
    }

    /// Status writes from a worker are dropped once its token is cancelled,
    /// so a superseded worker can never clobber the state of its successor.
    fn set_status(&self, cancel: &CancellationToken, status: ChannelStatus) {
        if cancel.is_cancelled() {
            return;
        }
        if let Ok(mut guard) = self.status.lock() {
            *guard = status;
        }
    }

    fn force_status(&self, status: ChannelStatus) {
        if let Ok(mut guard) = self.status.lock() {
            *guard = status;
        }
    }
}

/// Everything one spawned worker needs, snapshotted at open time.
#[derive(Debug, Clone)]
struct WorkerContext {
    endpoint: String,
    auth_token: String,
    recognized_events: Arc<[String]>,
    token_placement: TokenPlacement,
    reconnect: ReconnectPolicy,
}

/// One resilient server-push connection to one backend endpoint.
///
/// At most one live underlying connection exists per instance: opening
/// always cancels the previous worker first, and every teardown path
/// (explicit [`close`](Self::close), re-open, token refresh, drop) cancels
/// the worker token, which also aborts a pending backoff sleep.
pub struct StreamChannel {
    client: reqwest::Client,
    endpoint: String,
    recognized_events: Arc<[String]>,
    token_placement: TokenPlacement,
    reconnect: ReconnectPolicy,
    auth_token: Mutex<String>,
    shared: Arc<Shared>,
    event_tx: mpsc::UnboundedSender<ChannelEvent>,
    worker: Mutex<Option<CancellationToken>>,
}

impl StreamChannel {
    /// Create a channel from its config. Fails if the auth token is empty;
    /// the channel must never open without a credential.
    pub fn new(
        config: ChannelConfig,
        event_tx: mpsc::UnboundedSender<ChannelEvent>,
    ) -> Result<Self> {
        if config.auth_token.is_empty() {
            return Err(Error::MissingToken);
        }

        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint,
            recognized_events: config.recognized_events.into(),
            token_placement: config.token_placement,
            reconnect: config.reconnect,
            auth_token: Mutex::new(config.auth_token),
            shared: Arc::new(Shared {
                status: Mutex::new(ChannelStatus::Idle),
                attempt: AtomicU32::new(0),
            }),
            event_tx,
            worker: Mutex::new(None),
        })
    }

    /// Open the connection. No-op while already connecting or open with the
    /// same parameters; any other state (including terminal error after an
    /// exhausted retry budget) starts a fresh worker with a fresh retry
    /// budget.
    pub fn open(&self) {
        match self.shared.status() {
            ChannelStatus::Connecting | ChannelStatus::Open => {
                debug!(
                    endpoint = %self.endpoint,
                    "open ignored: channel already connecting or open"
                );
                return;
            },
            _ => {},
        }

        self.cancel_worker();
        self.shared.attempt.store(0, Ordering::SeqCst);
        self.shared.force_status(ChannelStatus::Connecting);

        let cancel = CancellationToken::new();
        if let Ok(mut slot) = self.worker.lock() {
            *slot = Some(cancel.clone());
        }

        let ctx = WorkerContext {
            endpoint: self.endpoint.clone(),
            auth_token: self
                .auth_token
                .lock()
                .map(|t| t.clone())
                .unwrap_or_default(),
            recognized_events: Arc::clone(&self.recognized_events),
            token_placement: self.token_placement,
            reconnect: self.reconnect,
        };

        info!(endpoint = %ctx.endpoint, "opening stream channel");
        tokio::spawn(connection_loop(
            self.client.clone(),
            ctx,
            Arc::clone(&self.shared),
            self.event_tx.clone(),
            cancel,
        ));
    }

    /// Close the connection and cancel any pending reconnect timer.
    /// Idempotent: closing an already-closed channel does nothing.
    pub fn close(&self) {
        let cancel = self.worker.lock().ok().and_then(|mut slot| slot.take());
        match cancel {
            Some(token) => {
                token.cancel();
                self.shared.force_status(ChannelStatus::Closed);
                let _ = self.event_tx.send(ChannelEvent::Closed);
                debug!(endpoint = %self.endpoint, "stream channel closed");
            },
            None => {
                debug!(endpoint = %self.endpoint, "close ignored: channel not open");
            },
        }
    }

    /// Swap in a fresh credential. An unchanged token is a no-op; a changed
    /// one re-opens a live (or terminally erroring) channel so the new
    /// credential is attached at connect time.
    pub fn update_token(&self, auth_token: &str) {
        if auth_token.is_empty() {
            warn!(endpoint = %self.endpoint, "ignoring empty auth token");
            return;
        }

        let changed = self
            .auth_token
            .lock()
            .map(|mut current| {
                if *current == auth_token {
                    false
                } else {
                    *current = auth_token.to_string();
                    true
                }
            })
            .unwrap_or(false);

        if !changed {
            return;
        }

        match self.shared.status() {
            ChannelStatus::Connecting | ChannelStatus::Open | ChannelStatus::Erroring => {
                info!(endpoint = %self.endpoint, "auth token changed, re-opening channel");
                self.close();
                self.open();
            },
            ChannelStatus::Idle | ChannelStatus::Closed => {},
        }
    }

    /// The update channels are strictly server → client; this exists for
    /// interface parity with bidirectional connection managers and drops
    /// the payload.
    pub fn send(&self, _payload: &str) {}

    pub fn status(&self) -> ChannelStatus {
        self.shared.status()
    }

    /// Consecutive error-triggered retries since the last successful open.
    pub fn attempt(&self) -> u32 {
        self.shared.attempt.load(Ordering::SeqCst)
    }

    fn cancel_worker(&self) {
        if let Ok(mut slot) = self.worker.lock()
            && let Some(token) = slot.take()
        {
            token.cancel();
        }
    }
}

impl Drop for StreamChannel {
    fn drop(&mut self) {
        self.cancel_worker();
    }
}

/// Reconnect loop: run one connection, back off on failure, stop when the
/// retry budget is spent or the worker is cancelled.
async fn connection_loop(
    client: reqwest::Client,
    ctx: WorkerContext,
    shared: Arc<Shared>,
    event_tx: mpsc::UnboundedSender<ChannelEvent>,
    cancel: CancellationToken,
) {
    loop {
        shared.set_status(&cancel, ChannelStatus::Connecting);

        let err = match run_connection(&client, &ctx, &shared, &event_tx, &cancel).await {
            // Cancelled: close()/open() already settled the status.
            Ok(()) => return,
            Err(err) => err,
        };

        if cancel.is_cancelled() {
            return;
        }

        shared.set_status(&cancel, ChannelStatus::Erroring);
        warn!(endpoint = %ctx.endpoint, error = %err, "stream connection error");
        let _ = event_tx.send(ChannelEvent::Error(err.to_string()));

        let attempt = shared.attempt.load(Ordering::SeqCst);
        if attempt >= ctx.reconnect.max_attempts {
            error!(
                endpoint = %ctx.endpoint,
                attempts = attempt,
                "max reconnection attempts reached"
            );
            let _ = event_tx.send(ChannelEvent::RetriesExhausted { attempts: attempt });
            // Terminal: stays Erroring until an explicit re-open.
            return;
        }

        let delay = ctx.reconnect.delay_for(attempt);
        shared.attempt.fetch_add(1, Ordering::SeqCst);
        info!(
            endpoint = %ctx.endpoint,
            delay_ms = delay.as_millis() as u64,
            attempt = attempt + 1,
            "reconnecting after delay"
        );

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {},
        }
    }
}

/// Single connection attempt: connect, then decode and dispatch frames
/// until the stream breaks or the worker is cancelled. `Ok(())` means
/// cancelled; every other exit is a transport error.
async fn run_connection(
    client: &reqwest::Client,
    ctx: &WorkerContext,
    shared: &Arc<Shared>,
    event_tx: &mpsc::UnboundedSender<ChannelEvent>,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut request = client
        .get(&ctx.endpoint)
        .header("Accept", EVENT_STREAM_CONTENT_TYPE);
    request = match ctx.token_placement {
        TokenPlacement::Header => {
            request.header("Authorization", format!("Bearer {}", ctx.auth_token))
        },
        TokenPlacement::Query => request.query(&[("token", ctx.auth_token.as_str())]),
    };

    let response = tokio::select! {
        _ = cancel.cancelled() => return Ok(()),
        response = request.send() => response?,
    };

    if !response.status().is_success() {
        return Err(Error::Connection(format!(
            "HTTP {} from {}",
            response.status(),
            ctx.endpoint
        )));
    }
    if !response_is_event_stream(&response) {
        return Err(Error::Connection(format!(
            "unexpected content type from {}",
            ctx.endpoint
        )));
    }

    shared.attempt.store(0, Ordering::SeqCst);
    shared.set_status(cancel, ChannelStatus::Open);
    info!(endpoint = %ctx.endpoint, "stream channel open");
    let _ = event_tx.send(ChannelEvent::Opened);

    let mut decoder = SseDecoder::new();
    let mut body = response.bytes_stream();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            chunk = body.next() => match chunk {
                Some(Ok(bytes)) => {
                    for frame in decoder.feed(&bytes) {
                        if ctx.recognized_events.iter().any(|name| *name == frame.name) {
                            let _ = event_tx.send(ChannelEvent::Frame {
                                name: frame.name,
                                data: frame.data,
                            });
                        } else {
                            debug!(
                                endpoint = %ctx.endpoint,
                                event = %frame.name,
                                "ignoring unrecognized event"
                            );
                        }
                    }
                },
                Some(Err(e)) => {
                    return Err(Error::Connection(format!("event stream failed: {e}")));
                },
                None => {
                    return Err(Error::Connection("server closed the event stream".into()));
                },
            },
        }
    }
}

fn response_is_event_stream(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            ct.split(';')
                .next()
                .is_some_and(|base| base.trim() == EVENT_STREAM_CONTENT_TYPE)
        })
        .unwrap_or(false)
}
