//! WebSocket client for server-pushed schedule updates.
//!
//! The server speaks a small JSON protocol on `/ws/schedule`:
//! a greeting (`connected`), keepalive replies (`pong`), and
//! `schedule_update` messages. A `refresh_all` update carries the
//! complete current schedule set; every other action is a coarse
//! change signal telling the client to re-fetch its own scope.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::models::ScheduleEntry;

/// Buffer size for the update channel; pushes are rare and small.
const UPDATE_BUFFER_SIZE: usize = 32;

/// Give up reconnecting after this many consecutive failures.
const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Base reconnect delay; multiplied by the attempt number.
const RECONNECT_DELAY_SECS: u64 = 3;

/// What a server push means for the client.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveUpdate {
    /// The complete current schedule set; replace local state after
    /// filtering by scope and group.
    RefreshAll(Vec<ScheduleEntry>),
    /// Something changed server-side; the payload does not say what.
    /// Re-fetch the active scope from the network.
    Invalidated,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum WireMessage {
    #[serde(rename = "connected")]
    Connected {
        #[serde(default)]
        connection_count: Option<i64>,
    },
    #[serde(rename = "pong")]
    Pong,
    #[serde(rename = "schedule_update")]
    ScheduleUpdate {
        action: String,
        #[serde(default)]
        all_schedules: Option<Vec<ScheduleEntry>>,
    },
}

/// Map a wire message to the update the engine should act on, if any.
fn interpret(message: WireMessage) -> Option<LiveUpdate> {
    match message {
        WireMessage::Connected { connection_count } => {
            debug!(connection_count, "Live channel greeting received");
            None
        }
        WireMessage::Pong => None,
        WireMessage::ScheduleUpdate {
            action,
            all_schedules,
        } => {
            debug!(action, "Schedule update received");
            let schedules = all_schedules.unwrap_or_default();
            if action == "refresh_all" && !schedules.is_empty() {
                Some(LiveUpdate::RefreshAll(schedules))
            } else {
                Some(LiveUpdate::Invalidated)
            }
        }
    }
}

/// WebSocket client with idempotent connect and bounded automatic
/// reconnection.
///
/// Updates arrive on the receiver returned by `new`. Dropping the
/// receiver stops the reader; `disconnect` tears the socket down and
/// suppresses reconnection (used on view teardown so sockets do not
/// leak across navigations).
pub struct LiveChannel {
    url: String,
    connected: Arc<AtomicBool>,
    connecting: Arc<AtomicBool>,
    manually_disconnected: Arc<AtomicBool>,
    reconnect_attempts: Arc<AtomicU32>,
    updates_tx: mpsc::Sender<LiveUpdate>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LiveChannel {
    pub fn new(url: String) -> (Self, mpsc::Receiver<LiveUpdate>) {
        let (tx, rx) = mpsc::channel(UPDATE_BUFFER_SIZE);
        let channel = Self {
            url,
            connected: Arc::new(AtomicBool::new(false)),
            connecting: Arc::new(AtomicBool::new(false)),
            manually_disconnected: Arc::new(AtomicBool::new(false)),
            reconnect_attempts: Arc::new(AtomicU32::new(0)),
            updates_tx: tx,
            task: Mutex::new(None),
        };
        (channel, rx)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Open the connection unless one is already open or opening.
    /// Safe to call from every mount/visibility/online trigger; only
    /// the first call starts a connection.
    pub fn connect(&self) {
        if self.connected.load(Ordering::SeqCst) {
            debug!("Live channel already connected");
            return;
        }
        if self.connecting.swap(true, Ordering::SeqCst) {
            debug!("Live channel already connecting, ignoring duplicate call");
            return;
        }

        self.manually_disconnected.store(false, Ordering::SeqCst);
        self.reconnect_attempts.store(0, Ordering::SeqCst);

        let url = self.url.clone();
        let connected = Arc::clone(&self.connected);
        let connecting = Arc::clone(&self.connecting);
        let manual = Arc::clone(&self.manually_disconnected);
        let attempts = Arc::clone(&self.reconnect_attempts);
        let tx = self.updates_tx.clone();

        let handle = tokio::spawn(async move {
            Self::run_connection(url, connected, connecting, manual, attempts, tx).await;
        });

        let mut task = self.task_slot();
        if let Some(old) = task.replace(handle) {
            // A finished task from a previous connection cycle.
            old.abort();
        }
    }

    /// Close the connection and stop reconnecting.
    pub fn disconnect(&self) {
        self.manually_disconnected.store(true, Ordering::SeqCst);
        if let Some(handle) = self.task_slot().take() {
            handle.abort();
        }
        self.connected.store(false, Ordering::SeqCst);
        self.connecting.store(false, Ordering::SeqCst);
        info!("Live channel disconnected");
    }

    fn task_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Connection lifecycle: connect, read until the stream ends,
    /// then retry with a linearly growing delay until the attempt cap
    /// or a manual disconnect.
    async fn run_connection(
        url: String,
        connected: Arc<AtomicBool>,
        connecting: Arc<AtomicBool>,
        manual: Arc<AtomicBool>,
        attempts: Arc<AtomicU32>,
        tx: mpsc::Sender<LiveUpdate>,
    ) {
        loop {
            debug!(url = %url, "Connecting live channel");
            match connect_async(url.as_str()).await {
                Ok((mut ws, _response)) => {
                    connecting.store(false, Ordering::SeqCst);
                    connected.store(true, Ordering::SeqCst);
                    attempts.store(0, Ordering::SeqCst);
                    info!("Live channel connected");

                    while let Some(message) = ws.next().await {
                        match message {
                            Ok(Message::Text(text)) => {
                                let wire: WireMessage = match serde_json::from_str(&text) {
                                    Ok(wire) => wire,
                                    Err(e) => {
                                        warn!(error = %e, "Unparseable live message, ignoring");
                                        continue;
                                    }
                                };
                                if let Some(update) = interpret(wire) {
                                    if tx.send(update).await.is_err() {
                                        // Receiver gone: the engine shut down.
                                        connected.store(false, Ordering::SeqCst);
                                        return;
                                    }
                                }
                            }
                            Ok(Message::Ping(payload)) => {
                                if let Err(e) = ws.send(Message::Pong(payload)).await {
                                    warn!(error = %e, "Failed to answer ping");
                                    break;
                                }
                            }
                            Ok(Message::Close(_)) => break,
                            Ok(_) => {}
                            Err(e) => {
                                warn!(error = %e, "Live channel read error");
                                break;
                            }
                        }
                    }

                    connected.store(false, Ordering::SeqCst);
                    info!("Live channel closed");
                }
                Err(e) => {
                    connecting.store(false, Ordering::SeqCst);
                    warn!(error = %e, "Live channel connection failed");
                }
            }

            if manual.load(Ordering::SeqCst) {
                return;
            }
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt > MAX_RECONNECT_ATTEMPTS {
                error!("Live channel reconnect attempts exhausted");
                return;
            }
            let delay = Duration::from_secs(RECONNECT_DELAY_SECS * u64::from(attempt));
            debug!(
                attempt,
                max = MAX_RECONNECT_ATTEMPTS,
                delay_secs = delay.as_secs(),
                "Scheduling live channel reconnect"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

impl Drop for LiveChannel {
    fn drop(&mut self) {
        if let Some(handle) = self.task_slot().take() {
            handle.abort();
        }
    }
}
