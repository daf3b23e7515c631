//! JSON messages pushed to connected observers.
//!
//! The transport is handled elsewhere; these types only define the payloads.
//! Every message carries a `kind` tag so observers can dispatch without
//! knowing the full set.

use serde::{Deserialize, Serialize};

use crate::ids::{ChannelId, MemberId};

/// Identity fields shown to observers for roster and join events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberIdentity {
    pub id: MemberId,
    pub name: String,
}

/// Broadcastable projection of a channel's game-phase state.
///
/// Also the result type of every control command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub game_running: bool,
    pub is_meeting: bool,
    pub dead: Vec<MemberId>,
    pub commentators: Vec<MemberId>,
}

/// Messages fanned out to connected observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ObserverMessage {
    /// Greeting sent to every newly-connected observer.
    #[serde(rename = "HELLO")]
    Hello,

    /// Full roster of one channel, sent after the greeting so late joiners
    /// get context without waiting for the next organic event.
    #[serde(rename = "Channel/ROSTER")]
    Roster {
        channel: ChannelId,
        members: Vec<MemberIdentity>,
    },

    #[serde(rename = "Channel/JOINED")]
    Joined {
        channel: ChannelId,
        member: MemberIdentity,
    },

    #[serde(rename = "Channel/LEFT")]
    Left {
        channel: ChannelId,
        member: MemberId,
    },

    #[serde(rename = "State/UPDATE")]
    StateUpdate {
        channel: ChannelId,
        state: StateSnapshot,
    },
}
