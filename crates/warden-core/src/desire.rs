//! Desired audio state as a pure function of game phase and occupant status.
//!
//! While the game runs outside a meeting, living players are silenced so they
//! coordinate in-game only; dead players may talk freely among themselves.
//! Once a meeting starts the roles flip: the living discuss, the dead are
//! silenced so they cannot leak to the living. Commentators are always
//! exempt, and an idle channel forces nothing on anyone.

use crate::directory::VoiceFlags;

/// The phase inputs that determine an occupant's desired audio state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseView {
    pub game_running: bool,
    pub is_meeting: bool,
}

/// Desired mute/deafen flags for one occupant.
///
/// Total over all inputs; `is_meeting` without `game_running` behaves as
/// idle so raw command misuse cannot produce a distinct audio state.
pub fn desired_flags(phase: PhaseView, dead: bool, commentator: bool) -> VoiceFlags {
    if commentator || !phase.game_running {
        return VoiceFlags::default();
    }
    let silenced = if phase.is_meeting { dead } else { !dead };
    VoiceFlags {
        muted: silenced,
        deafened: silenced,
    }
}
