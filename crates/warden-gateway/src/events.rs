//! Event-stream client with auto-reconnect.
//!
//! Maintains the WebSocket connection to the directory's event stream,
//! decodes wire events into `DirectoryEvent`s, and forwards them to the
//! router. Reconnects with exponential backoff; role changes refresh the
//! REST client's role cache before being forwarded.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use warden_core::{ChannelId, DirectoryEvent, MemberId, MemberIdentity, VoiceFlags};

use crate::config::GatewayConfig;
use crate::rest::RestDirectory;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// Events as they appear on the directory's stream.
#[derive(Debug, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    OccupantJoined {
        channel_id: String,
        member_id: String,
        display_name: String,
    },
    OccupantLeft {
        channel_id: String,
        member_id: String,
    },
    VoiceState {
        channel_id: String,
        member_id: String,
        muted: bool,
        deafened: bool,
    },
    RolesChanged {
        member_id: String,
        before: Vec<String>,
        after: Vec<String>,
    },
    /// Anything this client does not understand; skipped without failing
    /// the stream.
    #[serde(other)]
    Unknown,
}

fn decode(text: &str) -> Option<DirectoryEvent> {
    let wire: WireEvent = match serde_json::from_str(text) {
        Ok(wire) => wire,
        Err(e) => {
            debug!(error = %e, "undecodable event frame");
            return None;
        }
    };
    match wire {
        WireEvent::OccupantJoined {
            channel_id,
            member_id,
            display_name,
        } => Some(DirectoryEvent::OccupantJoined {
            channel: ChannelId::new(channel_id),
            member: MemberIdentity {
                id: MemberId::new(member_id),
                name: display_name,
            },
        }),
        WireEvent::OccupantLeft {
            channel_id,
            member_id,
        } => Some(DirectoryEvent::OccupantLeft {
            channel: ChannelId::new(channel_id),
            member: MemberId::new(member_id),
        }),
        WireEvent::VoiceState {
            channel_id,
            member_id,
            muted,
            deafened,
        } => Some(DirectoryEvent::VoiceStateChanged {
            channel: ChannelId::new(channel_id),
            member: MemberId::new(member_id),
            flags: VoiceFlags { muted, deafened },
        }),
        WireEvent::RolesChanged {
            member_id,
            before,
            after,
        } => Some(DirectoryEvent::RolesChanged {
            member: MemberId::new(member_id),
            before,
            after,
        }),
        WireEvent::Unknown => None,
    }
}

// ---------------------------------------------------------------------------
// Connection loop
// ---------------------------------------------------------------------------

/// Maintain the event-stream connection until shutdown or until the router
/// side goes away.
pub async fn event_stream_loop(
    config: GatewayConfig,
    directory: Arc<RestDirectory>,
    events: mpsc::Sender<DirectoryEvent>,
    shutdown: CancellationToken,
) {
    let mut reconnect_delay = config.reconnect_delay_secs;

    loop {
        if shutdown.is_cancelled() {
            return;
        }

        let url = config.events_ws_url();
        info!(url = %url.split('?').next().unwrap_or(""), "connecting to directory event stream");

        match tokio::time::timeout(CONNECT_TIMEOUT, tokio_tungstenite::connect_async(&url))
            .await
        {
            Ok(Ok((ws_stream, _))) => {
                reconnect_delay = config.reconnect_delay_secs;
                let (mut write, mut read) = ws_stream.split();

                loop {
                    tokio::select! {
                        _ = shutdown.cancelled() => {
                            let _ = write.send(WsMessage::Close(None)).await;
                            return;
                        }
                        frame = read.next() => match frame {
                            Some(Ok(WsMessage::Text(text))) => {
                                let Some(event) = decode(&text) else { continue };
                                if let DirectoryEvent::RolesChanged { member, after, .. } = &event {
                                    directory.update_roles(member, after.clone()).await;
                                }
                                if events.send(event).await.is_err() {
                                    // Router gone; nothing left to feed.
                                    return;
                                }
                            }
                            Some(Ok(WsMessage::Ping(data))) => {
                                let _ = write.send(WsMessage::Pong(data)).await;
                            }
                            Some(Ok(WsMessage::Close(_))) | None => {
                                info!("directory event stream closed");
                                break;
                            }
                            Some(Err(e)) => {
                                warn!(error = %e, "event stream error");
                                break;
                            }
                            _ => {}
                        }
                    }
                }
            }
            Ok(Err(e)) => {
                error!(error = %e, "failed to connect to directory event stream");
            }
            Err(_elapsed) => {
                error!("event stream connection timed out");
            }
        }

        info!(delay = reconnect_delay, "reconnecting to event stream");
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(Duration::from_secs(reconnect_delay)) => {}
        }
        reconnect_delay = (reconnect_delay * 2).min(config.max_reconnect_delay_secs);
    }
}
