use crate::ids::ChannelId;

/// Failures surfaced to a control-surface caller. Nothing here mutates
/// session state.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("invalid command argument: {0}")]
    Validation(String),

    #[error("no active session for channel {0}")]
    UnknownChannel(ChannelId),
}
