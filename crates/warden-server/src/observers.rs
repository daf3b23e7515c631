//! WebSocket observer hub.
//!
//! Observers connect to `/socket` and receive a greeting, one roster message
//! per monitored channel, and from then on every event and state snapshot the
//! engine broadcasts. Observers never send commands; inbound frames other
//! than pings are ignored.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info, warn};

use warden_core::{Broadcaster, MemberIdentity, ObserverMessage, VoiceDirectory};

use crate::http::AppState;

// ---------------------------------------------------------------------------
// Hub
// ---------------------------------------------------------------------------

/// Fan-out of observer messages to every connected socket.
///
/// An observer that disconnects (or stops draining its queue) is skipped and
/// pruned; one bad observer never fails a broadcast.
#[derive(Default)]
pub struct ObserverHub {
    next_id: AtomicU64,
    observers: RwLock<HashMap<u64, mpsc::Sender<String>>>,
}

impl ObserverHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer; returns its id and the outbound message queue.
    pub async fn register(&self) -> (u64, mpsc::Receiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(64);
        self.observers.write().await.insert(id, tx);
        (id, rx)
    }

    pub async fn unregister(&self, id: u64) {
        self.observers.write().await.remove(&id);
    }

    pub async fn count(&self) -> usize {
        self.observers.read().await.len()
    }
}

#[async_trait]
impl Broadcaster for ObserverHub {
    async fn broadcast(&self, message: ObserverMessage) {
        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "unserializable observer message");
                return;
            }
        };

        let mut dead = Vec::new();
        {
            let observers = self.observers.read().await;
            for (id, tx) in observers.iter() {
                if tx.try_send(json.clone()).is_err() {
                    if tx.is_closed() {
                        dead.push(*id);
                    } else {
                        // Queue full: the observer is alive but slow. Drop
                        // this message for it rather than stall the fan-out.
                        debug!(observer = id, "observer queue full, dropping message");
                    }
                }
            }
        }
        if !dead.is_empty() {
            let mut observers = self.observers.write().await;
            for id in dead {
                observers.remove(&id);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Connection handling
// ---------------------------------------------------------------------------

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();

    // Greet and sync before joining the fan-out so the first frames an
    // observer sees are HELLO and the rosters, never a stray update.
    if send_message(&mut sink, &ObserverMessage::Hello).await.is_err() {
        return;
    }
    for session in state.registry.sessions() {
        let channel = session.channel();
        let members = match state.directory.list_occupants(channel).await {
            Ok(occupants) => occupants
                .iter()
                .map(|o| o.identity())
                .collect::<Vec<MemberIdentity>>(),
            Err(e) => {
                warn!(channel = %channel, error = %e, "roster sync failed for new observer");
                continue;
            }
        };
        let roster = ObserverMessage::Roster {
            channel: channel.clone(),
            members,
        };
        if send_message(&mut sink, &roster).await.is_err() {
            return;
        }
    }

    let (id, mut outbound) = state.hub.register().await;
    info!(observer = id, "observer connected");

    loop {
        tokio::select! {
            Some(json) = outbound.recv() => {
                if sink.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }

            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(observer = id, error = %e, "observer socket error");
                        break;
                    }
                    // Observers have nothing to say; drop other frames.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.hub.unregister(id).await;
    info!(observer = id, "observer disconnected");
}

async fn send_message(
    sink: &mut SplitSink<WebSocket, Message>,
    message: &ObserverMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(message).map_err(axum::Error::new)?;
    sink.send(Message::Text(json)).await
}
