//! Core engine keeping a voice channel's mute/deafen state in step with an
//! externally refereed social-deduction game.
//!
//! The engine owns per-channel game phase (running/meeting/dead set), derives
//! the desired audio state for every occupant, and applies only the necessary
//! corrections through an abstract [`VoiceDirectory`]. State snapshots and
//! join/leave events are pushed to observers through an abstract
//! [`Broadcaster`]. Concrete adapters for both live outside this crate.

pub mod broadcast;
pub mod commentators;
pub mod desire;
pub mod directory;
pub mod errors;
pub mod ids;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod session;

#[cfg(test)]
pub(crate) mod testutil;

pub use broadcast::Broadcaster;
pub use directory::{
    Correction, DirectoryError, DirectoryEvent, Occupant, VoiceDirectory, VoiceFlags,
};
pub use errors::CommandError;
pub use ids::{ChannelId, MemberId};
pub use protocol::{MemberIdentity, ObserverMessage, StateSnapshot};
pub use registry::SessionRegistry;
pub use router::EventRouter;
pub use session::ChannelSession;
