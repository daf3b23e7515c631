//! In-memory fakes shared by this crate's tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::broadcast::Broadcaster;
use crate::directory::{Correction, DirectoryError, Occupant, VoiceDirectory, VoiceFlags};
use crate::ids::{ChannelId, MemberId};
use crate::protocol::ObserverMessage;

/// Directory fake backed by plain maps. Successful corrections take effect on
/// the stored occupants, so consecutive passes observe their own writes the
/// way they would against the real service.
#[derive(Default)]
pub(crate) struct FakeDirectory {
    occupants: Mutex<Vec<Occupant>>,
    roles: Mutex<HashMap<MemberId, Vec<String>>>,
    attempts: Mutex<Vec<Correction>>,
    failing_roles: Mutex<HashSet<MemberId>>,
    failing_applies: Mutex<HashSet<MemberId>>,
    fail_listing: Mutex<bool>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_occupant(&self, id: &str, flags: VoiceFlags) {
        let mut occupants = self.occupants.lock().unwrap();
        let member = MemberId::new(id);
        if let Some(existing) = occupants.iter_mut().find(|o| o.id == member) {
            existing.flags = flags;
        } else {
            occupants.push(Occupant {
                id: member,
                display_name: id.to_string(),
                flags,
            });
        }
    }

    pub fn remove_occupant(&self, id: &str) {
        let member = MemberId::new(id);
        self.occupants.lock().unwrap().retain(|o| o.id != member);
    }

    pub fn set_roles(&self, id: &str, roles: Vec<String>) {
        self.roles.lock().unwrap().insert(MemberId::new(id), roles);
    }

    pub fn fail_roles_for(&self, id: &str) {
        self.failing_roles.lock().unwrap().insert(MemberId::new(id));
    }

    pub fn fail_apply_for(&self, id: &str) {
        self.failing_applies.lock().unwrap().insert(MemberId::new(id));
    }

    pub fn clear_apply_failures(&self) {
        self.failing_applies.lock().unwrap().clear();
    }

    pub fn set_fail_listing(&self, fail: bool) {
        *self.fail_listing.lock().unwrap() = fail;
    }

    /// All corrections attempted, including failed ones, in order.
    pub fn attempts(&self) -> Vec<Correction> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    pub fn flags_of(&self, id: &str) -> Option<VoiceFlags> {
        let member = MemberId::new(id);
        self.occupants
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.id == member)
            .map(|o| o.flags)
    }
}

#[async_trait]
impl VoiceDirectory for FakeDirectory {
    async fn list_occupants(
        &self,
        _channel: &ChannelId,
    ) -> Result<Vec<Occupant>, DirectoryError> {
        if *self.fail_listing.lock().unwrap() {
            return Err(DirectoryError::Lookup("listing unavailable".into()));
        }
        Ok(self.occupants.lock().unwrap().clone())
    }

    async fn member_roles(&self, member: &MemberId) -> Result<Vec<String>, DirectoryError> {
        if self.failing_roles.lock().unwrap().contains(member) {
            return Err(DirectoryError::Lookup(format!("no role data for {member}")));
        }
        Ok(self
            .roles
            .lock()
            .unwrap()
            .get(member)
            .cloned()
            .unwrap_or_default())
    }

    async fn apply_correction(
        &self,
        member: &MemberId,
        correction: &Correction,
    ) -> Result<(), DirectoryError> {
        self.attempts.lock().unwrap().push(correction.clone());
        if self.failing_applies.lock().unwrap().contains(member) {
            return Err(DirectoryError::Apply(format!("edit rejected for {member}")));
        }
        let mut occupants = self.occupants.lock().unwrap();
        if let Some(occupant) = occupants.iter_mut().find(|o| o.id == *member) {
            occupant.flags = correction.applied_to(occupant.flags);
        }
        Ok(())
    }
}

/// Broadcaster fake that records every message.
#[derive(Default)]
pub(crate) struct FakeBroadcaster {
    messages: Mutex<Vec<ObserverMessage>>,
}

impl FakeBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<ObserverMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<ObserverMessage> {
        self.messages.lock().unwrap().last().cloned()
    }

    pub fn state_update_count(&self) -> usize {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| matches!(m, ObserverMessage::StateUpdate { .. }))
            .count()
    }
}

#[async_trait]
impl Broadcaster for FakeBroadcaster {
    async fn broadcast(&self, message: ObserverMessage) {
        self.messages.lock().unwrap().push(message);
    }
}
