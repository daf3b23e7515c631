//! Dispatches inbound directory events to the owning channel sessions.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::directory::DirectoryEvent;
use crate::registry::SessionRegistry;

/// Routes directory events to sessions and triggers reconciliation passes.
pub struct EventRouter {
    registry: Arc<SessionRegistry>,
}

impl EventRouter {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Drain the event stream until it closes.
    pub async fn run(self, mut events: mpsc::Receiver<DirectoryEvent>) {
        while let Some(event) = events.recv().await {
            self.dispatch(event).await;
        }
        debug!("directory event stream closed");
    }

    async fn dispatch(&self, event: DirectoryEvent) {
        match event {
            DirectoryEvent::OccupantJoined { channel, member } => {
                match self.registry.get(&channel) {
                    Ok(session) => session.occupant_joined(member).await,
                    Err(_) => debug!(channel = %channel, "join in unmonitored channel"),
                }
            }
            DirectoryEvent::OccupantLeft { channel, member } => {
                match self.registry.get(&channel) {
                    Ok(session) => session.occupant_left(member).await,
                    Err(_) => debug!(channel = %channel, "leave in unmonitored channel"),
                }
            }
            DirectoryEvent::VoiceStateChanged { member, .. } => {
                // Passes re-read every occupant's flags from the directory,
                // so these carry nothing to act on.
                debug!(member = %member, "ignoring voice state change");
            }
            DirectoryEvent::RolesChanged {
                member,
                before,
                after,
            } => {
                if role_sets_equal(&before, &after) {
                    debug!(member = %member, "role update without role change");
                    return;
                }
                // Resync every session the member currently occupies; role
                // changes are not tied to a single channel.
                for session in self.registry.sessions() {
                    if session.is_occupant(&member).await {
                        session.reconcile().await;
                    }
                }
            }
        }
    }
}

/// Order-insensitive comparison; the directory does not guarantee stable
/// role ordering.
fn role_sets_equal(before: &[String], after: &[String]) -> bool {
    let before: HashSet<&str> = before.iter().map(String::as_str).collect();
    let after: HashSet<&str> = after.iter().map(String::as_str).collect();
    before == after
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::VoiceFlags;
    use crate::ids::{ChannelId, MemberId};
    use crate::protocol::{MemberIdentity, ObserverMessage};
    use crate::session::ChannelSession;
    use crate::testutil::{FakeBroadcaster, FakeDirectory};
    use tokio_util::sync::CancellationToken;

    struct Fixture {
        directory: Arc<FakeDirectory>,
        broadcaster: Arc<FakeBroadcaster>,
        registry: Arc<SessionRegistry>,
    }

    async fn fixture() -> Fixture {
        let directory = Arc::new(FakeDirectory::new());
        let broadcaster = Arc::new(FakeBroadcaster::new());
        let session = Arc::new(ChannelSession::new(
            ChannelId::new("lobby"),
            directory.clone(),
            broadcaster.clone(),
            CancellationToken::new(),
        ));
        directory.put_occupant("x", VoiceFlags::default());
        session.prime().await.unwrap();

        let mut registry = SessionRegistry::new();
        registry.insert(session);
        Fixture {
            directory,
            broadcaster,
            registry: Arc::new(registry),
        }
    }

    async fn route(registry: Arc<SessionRegistry>, events: Vec<DirectoryEvent>) {
        let (tx, rx) = mpsc::channel(16);
        for event in events {
            tx.send(event).await.unwrap();
        }
        drop(tx);
        EventRouter::new(registry).run(rx).await;
    }

    #[tokio::test]
    async fn join_is_announced_and_reconciled() {
        let f = fixture().await;
        route(
            f.registry,
            vec![DirectoryEvent::OccupantJoined {
                channel: ChannelId::new("lobby"),
                member: MemberIdentity {
                    id: MemberId::new("x"),
                    name: "X".into(),
                },
            }],
        )
        .await;

        let messages = f.broadcaster.messages();
        assert!(matches!(messages[0], ObserverMessage::Joined { .. }));
        assert_eq!(f.broadcaster.state_update_count(), 1);
    }

    #[tokio::test]
    async fn events_for_unmonitored_channels_are_dropped() {
        let f = fixture().await;
        route(
            f.registry,
            vec![DirectoryEvent::OccupantLeft {
                channel: ChannelId::new("elsewhere"),
                member: MemberId::new("x"),
            }],
        )
        .await;

        assert!(f.broadcaster.messages().is_empty());
    }

    #[tokio::test]
    async fn voice_state_changes_are_ignored() {
        let f = fixture().await;
        route(
            f.registry,
            vec![DirectoryEvent::VoiceStateChanged {
                channel: ChannelId::new("lobby"),
                member: MemberId::new("x"),
                flags: VoiceFlags {
                    muted: true,
                    deafened: false,
                },
            }],
        )
        .await;

        assert!(f.broadcaster.messages().is_empty());
        assert_eq!(f.directory.attempt_count(), 0);
    }

    #[tokio::test]
    async fn reordered_roles_do_not_trigger_a_pass() {
        let f = fixture().await;
        route(
            f.registry,
            vec![DirectoryEvent::RolesChanged {
                member: MemberId::new("x"),
                before: vec!["a".into(), "b".into()],
                after: vec!["b".into(), "a".into()],
            }],
        )
        .await;

        assert_eq!(f.broadcaster.state_update_count(), 0);
    }

    #[tokio::test]
    async fn role_change_for_an_occupant_triggers_a_pass() {
        let f = fixture().await;
        route(
            f.registry,
            vec![DirectoryEvent::RolesChanged {
                member: MemberId::new("x"),
                before: vec![],
                after: vec!["commentator".into()],
            }],
        )
        .await;

        assert_eq!(f.broadcaster.state_update_count(), 1);
    }

    #[tokio::test]
    async fn role_change_for_a_non_occupant_is_dropped() {
        let f = fixture().await;
        route(
            f.registry,
            vec![DirectoryEvent::RolesChanged {
                member: MemberId::new("stranger"),
                before: vec![],
                after: vec!["commentator".into()],
            }],
        )
        .await;

        assert_eq!(f.broadcaster.state_update_count(), 0);
    }

    #[test]
    fn role_set_comparison_ignores_order_and_duplicates() {
        assert!(role_sets_equal(
            &["a".into(), "b".into()],
            &["b".into(), "a".into(), "a".into()]
        ));
        assert!(!role_sets_equal(&["a".into()], &["a".into(), "b".into()]));
    }
}
