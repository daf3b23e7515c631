//! Per-channel reconciliation engine.
//!
//! A [`ChannelSession`] owns the game phase for one monitored voice channel
//! and keeps every occupant's server-side mute/deafen flags in step with it.
//! All phase state lives under a single async mutex held for the whole of a
//! reconciliation pass, so concurrently-triggered passes serialize per
//! session and a pass can never observe a half-applied command.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::broadcast::Broadcaster;
use crate::commentators::resolve_commentators;
use crate::desire::{desired_flags, PhaseView};
use crate::directory::{Correction, DirectoryError, VoiceDirectory, VoiceFlags};
use crate::ids::{ChannelId, MemberId};
use crate::protocol::{MemberIdentity, ObserverMessage, StateSnapshot};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Mutable game state for one channel, guarded by the session's mutex.
#[derive(Debug, Default)]
struct GameState {
    game_running: bool,
    is_meeting: bool,
    /// Members killed in-game. Not pruned on leave; a member may rejoin
    /// while dead. Cleared only by `unkill` and `reset`.
    dead: HashSet<MemberId>,
    /// Derived cache, fully recomputed at the start of every pass.
    commentators: HashSet<MemberId>,
    /// The engine's view of the directory's flags, refreshed from the
    /// directory at the start of every pass and advanced optimistically as
    /// corrections succeed.
    last_known: HashMap<MemberId, VoiceFlags>,
}

impl GameState {
    fn phase(&self) -> PhaseView {
        PhaseView {
            game_running: self.game_running,
            is_meeting: self.is_meeting,
        }
    }

    fn snapshot(&self) -> StateSnapshot {
        let mut dead: Vec<MemberId> = self.dead.iter().cloned().collect();
        dead.sort();
        let mut commentators: Vec<MemberId> = self.commentators.iter().cloned().collect();
        commentators.sort();
        StateSnapshot {
            game_running: self.game_running,
            is_meeting: self.is_meeting,
            dead,
            commentators,
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Reconciliation engine for one monitored voice channel.
///
/// Created once at startup and alive for the process lifetime; `reset`
/// returns the phase to defaults without destroying the session.
pub struct ChannelSession {
    channel: ChannelId,
    state: Mutex<GameState>,
    directory: Arc<dyn VoiceDirectory>,
    broadcaster: Arc<dyn Broadcaster>,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for ChannelSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSession")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

impl ChannelSession {
    pub fn new(
        channel: ChannelId,
        directory: Arc<dyn VoiceDirectory>,
        broadcaster: Arc<dyn Broadcaster>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            channel,
            state: Mutex::new(GameState::default()),
            directory,
            broadcaster,
            shutdown,
        }
    }

    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    /// Load the initial occupant snapshot so the engine starts with an
    /// accurate membership view. Called once at startup, before any pass.
    pub async fn prime(&self) -> Result<usize, DirectoryError> {
        let occupants = self.directory.list_occupants(&self.channel).await?;
        let mut state = self.state.lock().await;
        state.last_known = occupants.iter().map(|o| (o.id.clone(), o.flags)).collect();
        info!(channel = %self.channel, occupants = occupants.len(), "session primed");
        Ok(occupants.len())
    }

    // -- commands -----------------------------------------------------------

    pub async fn start_game(&self) -> StateSnapshot {
        self.command(|state| state.game_running = true).await
    }

    pub async fn start_meeting(&self) -> StateSnapshot {
        self.command(|state| state.is_meeting = true).await
    }

    pub async fn end_meeting(&self) -> StateSnapshot {
        self.command(|state| state.is_meeting = false).await
    }

    /// Mark a member dead. Killing an already-dead member is a no-op.
    pub async fn kill(&self, member: MemberId) -> StateSnapshot {
        self.command(move |state| {
            state.dead.insert(member);
        })
        .await
    }

    /// Revive a member. Unkilling a member that is not dead is a no-op.
    pub async fn unkill(&self, member: MemberId) -> StateSnapshot {
        self.command(move |state| {
            state.dead.remove(&member);
        })
        .await
    }

    /// Return the phase to defaults: nobody dead, no game, no meeting.
    pub async fn reset(&self) -> StateSnapshot {
        self.command(|state| {
            state.dead.clear();
            state.game_running = false;
            state.is_meeting = false;
        })
        .await
    }

    /// Current snapshot without triggering a pass.
    pub async fn state(&self) -> StateSnapshot {
        self.state.lock().await.snapshot()
    }

    /// Whether the member is in the engine's current membership view.
    pub async fn is_occupant(&self, member: &MemberId) -> bool {
        self.state.lock().await.last_known.contains_key(member)
    }

    // -- events -------------------------------------------------------------

    /// A member joined the channel: announce it, then reconcile so the new
    /// occupant immediately receives the correct audio state.
    pub async fn occupant_joined(&self, member: MemberIdentity) {
        self.broadcaster
            .broadcast(ObserverMessage::Joined {
                channel: self.channel.clone(),
                member,
            })
            .await;
        self.reconcile().await;
    }

    /// A member left the channel: announce it, then reconcile to cover
    /// leave events racing other state.
    pub async fn occupant_left(&self, member: MemberId) {
        self.broadcaster
            .broadcast(ObserverMessage::Left {
                channel: self.channel.clone(),
                member,
            })
            .await;
        self.reconcile().await;
    }

    /// Run a reconciliation pass with no phase change.
    pub async fn reconcile(&self) -> StateSnapshot {
        let mut state = self.state.lock().await;
        self.run_pass(&mut state).await
    }

    // -- internals ----------------------------------------------------------

    /// Apply a phase mutation and immediately reconcile. Holding the lock
    /// across both makes command-then-pass atomic with respect to any other
    /// trigger on this session.
    async fn command(&self, mutate: impl FnOnce(&mut GameState)) -> StateSnapshot {
        let mut state = self.state.lock().await;
        mutate(&mut state);
        self.run_pass(&mut state).await
    }

    /// One full reconciliation pass: refresh membership and flags, recompute
    /// commentators, diff desired state per occupant, apply the corrections
    /// best-effort, broadcast the snapshot.
    async fn run_pass(&self, state: &mut GameState) -> StateSnapshot {
        match self.directory.list_occupants(&self.channel).await {
            Ok(occupants) => {
                state.last_known = occupants.iter().map(|o| (o.id.clone(), o.flags)).collect();
                state.commentators =
                    resolve_commentators(self.directory.as_ref(), &occupants).await;

                let phase = state.phase();
                let corrections: Vec<Correction> = occupants
                    .iter()
                    .filter_map(|occupant| {
                        let desired = desired_flags(
                            phase,
                            state.dead.contains(&occupant.id),
                            state.commentators.contains(&occupant.id),
                        );
                        Correction::diff(&occupant.id, occupant.flags, desired)
                    })
                    .collect();

                for correction in corrections {
                    if self.shutdown.is_cancelled() {
                        debug!(channel = %self.channel, "shutting down, abandoning remaining corrections");
                        break;
                    }
                    match self
                        .directory
                        .apply_correction(&correction.member, &correction)
                        .await
                    {
                        Ok(()) => {
                            if let Some(flags) = state.last_known.get_mut(&correction.member) {
                                *flags = correction.applied_to(*flags);
                            }
                        }
                        Err(e) => {
                            // last_known stays put so the next pass retries.
                            warn!(
                                channel = %self.channel,
                                member = %correction.member,
                                error = %e,
                                "correction failed"
                            );
                        }
                    }
                }
            }
            Err(e) => {
                // Phase and dead set are engine-owned and still accurate, so
                // the snapshot below is broadcast regardless; only the
                // corrections are skipped until the directory comes back.
                warn!(channel = %self.channel, error = %e, "occupant refresh failed, skipping corrections");
            }
        }

        let snapshot = state.snapshot();
        self.broadcaster
            .broadcast(ObserverMessage::StateUpdate {
                channel: self.channel.clone(),
                state: snapshot.clone(),
            })
            .await;
        snapshot
    }
}
