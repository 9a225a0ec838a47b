//! WebSocket push connection with reconnection.

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, StreamExt};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use chainviz_telemetry::component::TRANSPORT;

use crate::config::TransportConfig;
use crate::domain::{
    Channel, ConnectionState, SubscriptionAction, SubscriptionRequest, TransportError,
    TransportEvent,
};
use crate::ports::inbound::TransportChannel;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// State shared between the handle and the connection task.
struct Shared {
    config: TransportConfig,
    ws_url: String,
    event_tx: mpsc::Sender<TransportEvent>,
    state_tx: watch::Sender<ConnectionState>,
    channels: Mutex<BTreeSet<Channel>>,
}

impl Shared {
    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(component = TRANSPORT, from = %previous, to = %state, "Connection state changed");
        }
    }
}

/// How a single connected session ended.
enum SessionEnd {
    Shutdown,
    Lost(String),
}

/// Push connection to the indexing service.
///
/// Frames are forwarded as [`TransportEvent::Frame`] on the sender given to
/// [`WsTransport::new`]. A dropped connection emits
/// [`TransportEvent::Disconnected`] and is retried with exponential backoff
/// until `max_reconnect_attempts` is exhausted, after which the state
/// becomes [`ConnectionState::Failed`].
pub struct WsTransport {
    shared: Arc<Shared>,
    control_tx: Option<mpsc::UnboundedSender<SubscriptionRequest>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl WsTransport {
    /// Create a transport. Nothing is opened until [`TransportChannel::connect`].
    pub fn new(
        config: TransportConfig,
        event_tx: mpsc::Sender<TransportEvent>,
    ) -> Result<Self, TransportError> {
        for warning in config.validate()? {
            warn!(component = TRANSPORT, "{}", warning);
        }

        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let shared = Shared {
            ws_url: config.ws_url(),
            config,
            event_tx,
            state_tx,
            channels: Mutex::new(BTreeSet::new()),
        };

        Ok(Self {
            shared: Arc::new(shared),
            control_tx: None,
            shutdown_tx: None,
            task: None,
        })
    }

    /// Push endpoint this transport dials.
    #[must_use]
    pub fn ws_url(&self) -> &str {
        &self.shared.ws_url
    }

    /// Channels that will be replayed after a reconnect.
    #[must_use]
    pub fn active_channels(&self) -> Vec<Channel> {
        self.shared.channels.lock().iter().copied().collect()
    }

    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn send_control(&self, request: SubscriptionRequest) -> Result<(), TransportError> {
        match &self.control_tx {
            Some(tx) if self.is_running() => tx
                .send(request)
                .map_err(|_| TransportError::Send("connection task stopped".to_string())),
            // Replayed on the next connect.
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl TransportChannel for WsTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.is_running() {
            return Ok(());
        }

        self.shared.set_state(ConnectionState::Connecting);
        let stream = match open(&self.shared.ws_url, &self.shared.config).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(component = TRANSPORT, url = %self.shared.ws_url, error = %e, "Connect failed");
                self.shared.set_state(ConnectionState::Failed);
                return Err(e);
            }
        };
        info!(component = TRANSPORT, url = %self.shared.ws_url, "Connected");

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(connection_loop(
            Arc::clone(&self.shared),
            stream,
            control_rx,
            shutdown_rx,
        ));

        self.control_tx = Some(control_tx);
        self.shutdown_tx = Some(shutdown_tx);
        self.task = Some(task);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(mut task) = self.task.take() {
            let grace = self.shared.config.timeout();
            if tokio::time::timeout(grace, &mut task).await.is_err() {
                warn!(component = TRANSPORT, "Connection task did not stop in time, aborting");
                task.abort();
            }
        }
        self.control_tx = None;
        self.shared.set_state(ConnectionState::Disconnected);
        Ok(())
    }

    async fn subscribe(&self, channel: Channel) -> Result<(), TransportError> {
        let added = self.shared.channels.lock().insert(channel);
        if added {
            debug!(component = TRANSPORT, %channel, "Subscribing");
            self.send_control(SubscriptionRequest::subscribe(channel))?;
        }
        Ok(())
    }

    async fn unsubscribe(&self, channel: Channel) -> Result<(), TransportError> {
        let removed = self.shared.channels.lock().remove(&channel);
        if removed {
            debug!(component = TRANSPORT, %channel, "Unsubscribing");
            self.send_control(SubscriptionRequest::unsubscribe(channel))?;
        }
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn open(url: &str, config: &TransportConfig) -> Result<WsStream, TransportError> {
    let timeout = config.timeout();
    match tokio::time::timeout(timeout, connect_async(url)).await {
        Ok(Ok((stream, _response))) => Ok(stream),
        Ok(Err(e)) => Err(TransportError::Connect(e.to_string())),
        Err(_) => Err(TransportError::Timeout(timeout)),
    }
}

/// Runs sessions back to back until shutdown or reconnection gives up.
async fn connection_loop(
    shared: Arc<Shared>,
    first: WsStream,
    mut control_rx: mpsc::UnboundedReceiver<SubscriptionRequest>,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    let mut stream = Some(first);
    let mut attempts = 0u32;

    loop {
        if let Some(ws) = stream.take() {
            match run_session(&shared, ws, &mut control_rx, &mut shutdown_rx).await {
                SessionEnd::Shutdown => {
                    shared.set_state(ConnectionState::Disconnected);
                    return;
                }
                SessionEnd::Lost(reason) => {
                    warn!(component = TRANSPORT, %reason, "Connection lost");
                    shared.set_state(ConnectionState::Disconnected);
                    if shared
                        .event_tx
                        .send(TransportEvent::Disconnected(reason))
                        .await
                        .is_err()
                    {
                        return;
                    }
                    attempts = 0;
                }
            }
        }

        attempts += 1;
        if attempts > shared.config.max_reconnect_attempts {
            error!(
                component = TRANSPORT,
                attempts = shared.config.max_reconnect_attempts,
                "Reconnection failed, giving up"
            );
            shared.set_state(ConnectionState::Failed);
            return;
        }

        let delay = shared.config.backoff_delay(attempts);
        debug!(component = TRANSPORT, attempt = attempts, ?delay, "Reconnecting");
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown_rx.recv() => {
                shared.set_state(ConnectionState::Disconnected);
                return;
            }
        }

        shared.set_state(ConnectionState::Connecting);
        let opened = tokio::select! {
            result = open(&shared.ws_url, &shared.config) => result,
            _ = shutdown_rx.recv() => {
                shared.set_state(ConnectionState::Disconnected);
                return;
            }
        };
        match opened {
            Ok(ws) => {
                info!(component = TRANSPORT, attempt = attempts, "Reconnected");
                stream = Some(ws);
            }
            Err(e) => {
                warn!(component = TRANSPORT, attempt = attempts, error = %e, "Reconnect attempt failed");
            }
        }
    }
}

async fn run_session(
    shared: &Shared,
    stream: WsStream,
    control_rx: &mut mpsc::UnboundedReceiver<SubscriptionRequest>,
    shutdown_rx: &mut mpsc::Receiver<()>,
) -> SessionEnd {
    let (mut write, mut read) = stream.split();

    // Channels this session has told the server about. Requests queued
    // while offline may repeat what the replay already sent.
    let mut subscribed: BTreeSet<Channel> = shared.channels.lock().clone();
    for channel in subscribed.iter().copied() {
        if let Err(e) = send_request(&mut write, SubscriptionRequest::subscribe(channel)).await {
            return SessionEnd::Lost(e.to_string());
        }
    }
    shared.set_state(ConnectionState::Connected);

    loop {
        tokio::select! {
            biased;

            _ = shutdown_rx.recv() => {
                let _ = write.send(Message::Close(None)).await;
                return SessionEnd::Shutdown;
            }
            Some(request) = control_rx.recv() => {
                let changed = match request.action {
                    SubscriptionAction::Subscribe => subscribed.insert(request.channel),
                    SubscriptionAction::Unsubscribe => subscribed.remove(&request.channel),
                };
                if !changed {
                    debug!(component = TRANSPORT, channel = %request.channel, "Skipping repeated control frame");
                } else if let Err(e) = send_request(&mut write, request).await {
                    return SessionEnd::Lost(e.to_string());
                }
            }
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let frame = TransportEvent::Frame(text.as_str().to_owned());
                        if shared.event_tx.send(frame).await.is_err() {
                            // Nobody is listening anymore.
                            return SessionEnd::Shutdown;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) => {
                        return SessionEnd::Lost("closed by server".to_string());
                    }
                    Some(Ok(Message::Binary(_))) => {
                        debug!(component = TRANSPORT, "Ignoring binary frame");
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return SessionEnd::Lost(e.to_string()),
                    None => return SessionEnd::Lost("stream ended".to_string()),
                }
            }
        }
    }
}

async fn send_request<S>(write: &mut S, request: SubscriptionRequest) -> Result<(), TransportError>
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let json = serde_json::to_string(&request).map_err(|e| TransportError::Send(e.to_string()))?;
    write
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| TransportError::Send(e.to_string()))
}
