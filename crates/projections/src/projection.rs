//! Generic channel-plus-reducer machinery shared by all projections.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use {
    tokio::sync::mpsc,
    tracing::{debug, warn},
};

use liveboard_stream::{ChannelConfig, ChannelEvent, ChannelStatus, StreamChannel};

use crate::error::Result;

/// Folds recognized named frames into typed state.
///
/// Implementations never mutate the previous state: each update returns a
/// fresh `Arc`, so identity comparison detects change.
pub trait Reducer: Send + Sync + 'static {
    type State: Send + Sync + 'static;

    /// Endpoint path appended to the backend base URL.
    fn path(&self) -> &'static str;

    /// Event names the underlying channel should dispatch.
    fn recognized(&self) -> &'static [&'static str];

    /// Fold one frame into the next state. `Ok(None)` leaves the current
    /// state untouched; `Err` marks the frame malformed (it is dropped and
    /// logged, the connection is unaffected).
    fn apply(
        &self,
        prev: Option<&Arc<Self::State>>,
        name: &str,
        data: &str,
    ) -> liveboard_protocol::Result<Option<Arc<Self::State>>>;
}

/// Snapshot handed to UI consumers: the `{state, is_connected, error}`
/// contract.
#[derive(Debug, Clone)]
pub struct ProjectionView<S> {
    /// `None` until the first frame populates the projection.
    pub state: Option<Arc<S>>,
    pub is_connected: bool,
    /// Latest transport error message, cleared by a successful open.
    pub error: Option<String>,
}

type Listener<S> = Arc<dyn Fn(&Arc<S>) + Send + Sync>;

/// Handle for one registered listener. Dropping it (or calling
/// [`unsubscribe`](Self::unsubscribe)) removes the listener.
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

struct ProjectionShared<S> {
    state: Mutex<Option<Arc<S>>>,
    connected: AtomicBool,
    error: Mutex<Option<String>>,
    listeners: Mutex<HashMap<u64, Listener<S>>>,
    next_listener_id: AtomicU64,
}

impl<S> ProjectionShared<S> {
    fn new() -> Self {
        Self {
            state: Mutex::new(None),
            connected: AtomicBool::new(false),
            error: Mutex::new(None),
            listeners: Mutex::new(HashMap::new()),
            next_listener_id: AtomicU64::new(0),
        }
    }

    fn set_error(&self, message: Option<String>) {
        if let Ok(mut guard) = self.error.lock() {
            *guard = message;
        }
    }
}

/// One typed live channel: a [`StreamChannel`] plus the reducer that turns
/// its frames into state. Each instance exclusively owns its connection.
pub struct Projection<R: Reducer> {
    channel: StreamChannel,
    shared: Arc<ProjectionShared<R::State>>,
}

impl<R: Reducer> Projection<R> {
    /// Open the channel against `base_url` and start reducing. The token
    /// must be non-empty.
    pub fn spawn(reducer: R, base_url: &str, auth_token: &str) -> Result<Self> {
        let endpoint = format!("{}{}", base_url.trim_end_matches('/'), reducer.path());
        let config = ChannelConfig::new(endpoint, auth_token, reducer.recognized());
        Self::spawn_with_config(reducer, config)
    }

    /// Like [`spawn`](Self::spawn) but with full control over the channel
    /// config (reconnect policy, token placement). The recognized-event set
    /// always comes from the reducer.
    pub fn spawn_with_config(reducer: R, mut config: ChannelConfig) -> Result<Self> {
        config.recognized_events = reducer
            .recognized()
            .iter()
            .map(|s| (*s).to_string())
            .collect();

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let channel = StreamChannel::new(config, event_tx)?;
        channel.open();

        let shared = Arc::new(ProjectionShared::new());
        tokio::spawn(reduce_loop(reducer, event_rx, Arc::clone(&shared)));

        Ok(Self { channel, shared })
    }

    pub fn view(&self) -> ProjectionView<R::State> {
        ProjectionView {
            state: self.state(),
            is_connected: self.is_connected(),
            error: self.error(),
        }
    }

    /// Current state, `None` until first populated.
    pub fn state(&self) -> Option<Arc<R::State>> {
        self.shared.state.lock().ok().and_then(|guard| guard.clone())
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    pub fn error(&self) -> Option<String> {
        self.shared.error.lock().ok().and_then(|guard| guard.clone())
    }

    pub fn status(&self) -> ChannelStatus {
        self.channel.status()
    }

    /// Register a listener invoked after every state replacement.
    ///
    /// Listeners must not subscribe or unsubscribe from inside the
    /// callback.
    pub fn subscribe(
        &self,
        listener: impl Fn(&Arc<R::State>) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.shared.next_listener_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut listeners) = self.shared.listeners.lock() {
            listeners.insert(id, Arc::new(listener));
        }

        let weak = Arc::downgrade(&self.shared);
        Subscription {
            remove: Some(Box::new(move || {
                if let Some(shared) = weak.upgrade()
                    && let Ok(mut listeners) = shared.listeners.lock()
                {
                    listeners.remove(&id);
                }
            })),
        }
    }

    /// Tear down the connection, cancelling any pending reconnect in the
    /// same step.
    pub fn close(&self) {
        self.channel.close();
    }

    /// Swap in a fresh credential; a changed token re-opens the channel.
    pub fn update_token(&self, auth_token: &str) {
        self.channel.update_token(auth_token);
    }
}

async fn reduce_loop<R: Reducer>(
    reducer: R,
    mut events: mpsc::UnboundedReceiver<ChannelEvent>,
    shared: Arc<ProjectionShared<R::State>>,
) {
    while let Some(event) = events.recv().await {
        match event {
            ChannelEvent::Opened => {
                shared.connected.store(true, Ordering::SeqCst);
                shared.set_error(None);
            },
            ChannelEvent::Frame { name, data } => {
                let prev = shared.state.lock().ok().and_then(|guard| guard.clone());
                match reducer.apply(prev.as_ref(), &name, &data) {
                    Ok(Some(next)) => {
                        if let Ok(mut guard) = shared.state.lock() {
                            *guard = Some(Arc::clone(&next));
                        }
                        notify(&shared, &next);
                    },
                    Ok(None) => {},
                    Err(e) => {
                        warn!(event = %name, error = %e, "dropping malformed frame");
                    },
                }
            },
            ChannelEvent::Error(message) => {
                shared.connected.store(false, Ordering::SeqCst);
                shared.set_error(Some(message));
            },
            ChannelEvent::RetriesExhausted { attempts } => {
                shared.connected.store(false, Ordering::SeqCst);
                shared.set_error(Some(format!(
                    "max reconnection attempts reached after {attempts} failures"
                )));
            },
            ChannelEvent::Closed => {
                shared.connected.store(false, Ordering::SeqCst);
            },
        }
    }
    debug!("projection reduce loop ended");
}

fn notify<S>(shared: &ProjectionShared<S>, next: &Arc<S>) {
    let listeners: Vec<Listener<S>> = shared
        .listeners
        .lock()
        .map(|guard| guard.values().cloned().collect())
        .unwrap_or_default();
    for listener in listeners {
        listener(next);
    }
}
