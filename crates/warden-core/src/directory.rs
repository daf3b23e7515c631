//! The external voice directory capability: membership, roles, and
//! per-occupant audio corrections.
//!
//! The engine never talks to the directory service directly; it goes through
//! the [`VoiceDirectory`] trait so the adapter (and test fakes) can be swapped
//! out freely.

use async_trait::async_trait;

use crate::ids::{ChannelId, MemberId};
use crate::protocol::MemberIdentity;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Server-side mute/deafen flags for one occupant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoiceFlags {
    pub muted: bool,
    pub deafened: bool,
}

/// One entry of a channel's current membership as reported by the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occupant {
    pub id: MemberId,
    pub display_name: String,
    pub flags: VoiceFlags,
}

impl Occupant {
    pub fn identity(&self) -> MemberIdentity {
        MemberIdentity {
            id: self.id.clone(),
            name: self.display_name.clone(),
        }
    }
}

/// A minimal corrective action against one occupant's audio state.
///
/// Only fields that differ from the directory's current state are set;
/// a correction with both fields unset is never constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    pub member: MemberId,
    pub mute: Option<bool>,
    pub deafen: Option<bool>,
}

impl Correction {
    /// Diff `desired` against `current`. Returns `None` when the occupant is
    /// already in the desired state.
    pub fn diff(member: &MemberId, current: VoiceFlags, desired: VoiceFlags) -> Option<Self> {
        let mute = (current.muted != desired.muted).then_some(desired.muted);
        let deafen = (current.deafened != desired.deafened).then_some(desired.deafened);
        if mute.is_none() && deafen.is_none() {
            return None;
        }
        Some(Self {
            member: member.clone(),
            mute,
            deafen,
        })
    }

    /// The flags an occupant ends up with once this correction lands.
    pub fn applied_to(&self, mut flags: VoiceFlags) -> VoiceFlags {
        if let Some(muted) = self.mute {
            flags.muted = muted;
        }
        if let Some(deafened) = self.deafen {
            flags.deafened = deafened;
        }
        flags
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures talking to the directory service. All variants are non-fatal to
/// the engine; the next pass retries.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory lookup failed: {0}")]
    Lookup(String),

    #[error("correction apply failed: {0}")]
    Apply(String),
}

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// Read/write access to the directory service's view of a voice channel.
#[async_trait]
pub trait VoiceDirectory: Send + Sync {
    /// Current membership of a channel with each occupant's audio flags.
    async fn list_occupants(&self, channel: &ChannelId)
        -> Result<Vec<Occupant>, DirectoryError>;

    /// Role names assigned to a member. Implementations resolve through a
    /// cache first and fetch on miss.
    async fn member_roles(&self, member: &MemberId) -> Result<Vec<String>, DirectoryError>;

    /// Apply a mute/deafen correction to one occupant.
    async fn apply_correction(
        &self,
        member: &MemberId,
        correction: &Correction,
    ) -> Result<(), DirectoryError>;
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Inbound notifications from the directory's event stream.
#[derive(Debug, Clone)]
pub enum DirectoryEvent {
    OccupantJoined {
        channel: ChannelId,
        member: MemberIdentity,
    },
    OccupantLeft {
        channel: ChannelId,
        member: MemberId,
    },
    /// An occupant's own mute/deafen flags changed. The engine re-reads flags
    /// at the start of every pass, so these carry no extra information.
    VoiceStateChanged {
        channel: ChannelId,
        member: MemberId,
        flags: VoiceFlags,
    },
    /// A member's role set changed (not tied to any one channel).
    RolesChanged {
        member: MemberId,
        before: Vec<String>,
        after: Vec<String>,
    },
}
