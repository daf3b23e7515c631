//! Registry of monitored channel sessions.

use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::CommandError;
use crate::ids::ChannelId;
use crate::session::ChannelSession;

/// All monitored channel sessions, keyed by external channel id.
///
/// Built once at startup from configuration and shared by handle; there is
/// no deletion path, sessions live for the process lifetime.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<ChannelId, Arc<ChannelSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, session: Arc<ChannelSession>) {
        self.sessions.insert(session.channel().clone(), session);
    }

    pub fn get(&self, channel: &ChannelId) -> Result<&Arc<ChannelSession>, CommandError> {
        self.sessions
            .get(channel)
            .ok_or_else(|| CommandError::UnknownChannel(channel.clone()))
    }

    pub fn contains(&self, channel: &ChannelId) -> bool {
        self.sessions.contains_key(channel)
    }

    pub fn sessions(&self) -> impl Iterator<Item = &Arc<ChannelSession>> {
        self.sessions.values()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
