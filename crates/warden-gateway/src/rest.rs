//! REST client for the voice directory service.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use warden_core::{
    ChannelId, Correction, DirectoryError, MemberId, Occupant, VoiceDirectory, VoiceFlags,
};

use crate::config::GatewayConfig;

// ---------------------------------------------------------------------------
// Wire DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct OccupantDto {
    id: String,
    display_name: String,
    muted: bool,
    deafened: bool,
}

impl From<OccupantDto> for Occupant {
    fn from(dto: OccupantDto) -> Self {
        Occupant {
            id: MemberId::new(dto.id),
            display_name: dto.display_name,
            flags: VoiceFlags {
                muted: dto.muted,
                deafened: dto.deafened,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct RolesDto {
    roles: Vec<String>,
}

/// PATCH body for a voice-state edit; unset fields are left out entirely so
/// the service only touches what the correction names.
#[derive(Debug, Serialize)]
struct VoiceEditDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    muted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deafened: Option<bool>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// `VoiceDirectory` implementation over the directory's REST API.
///
/// Role lookups go through an in-memory cache first and fetch on miss; the
/// event-stream client refreshes the cache when it sees a role change.
pub struct RestDirectory {
    config: GatewayConfig,
    http: reqwest::Client,
    role_cache: RwLock<HashMap<MemberId, Vec<String>>>,
}

impl RestDirectory {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::builder()
                .connect_timeout(std::time::Duration::from_secs(10))
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("failed to build HTTP client"),
            role_cache: RwLock::new(HashMap::new()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
    }

    /// Replace a member's cached roles with fresh data from the event stream.
    pub async fn update_roles(&self, member: &MemberId, roles: Vec<String>) {
        self.role_cache.write().await.insert(member.clone(), roles);
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
    ) -> Result<T, DirectoryError> {
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.config.token)
            .send()
            .await
            .map_err(|e| DirectoryError::Lookup(e.to_string()))?;
        if !response.status().is_success() {
            return Err(DirectoryError::Lookup(format!(
                "{url}: HTTP {}",
                response.status()
            )));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| DirectoryError::Lookup(e.to_string()))
    }
}

#[async_trait]
impl VoiceDirectory for RestDirectory {
    async fn list_occupants(
        &self,
        channel: &ChannelId,
    ) -> Result<Vec<Occupant>, DirectoryError> {
        let url = self.url(&format!("channels/{channel}/occupants"));
        let occupants: Vec<OccupantDto> = self.fetch_json(url).await?;
        Ok(occupants.into_iter().map(Occupant::from).collect())
    }

    async fn member_roles(&self, member: &MemberId) -> Result<Vec<String>, DirectoryError> {
        if let Some(roles) = self.role_cache.read().await.get(member) {
            return Ok(roles.clone());
        }
        debug!(member = %member, "role cache miss");
        let url = self.url(&format!("members/{member}/roles"));
        let dto: RolesDto = self.fetch_json(url).await?;
        self.role_cache
            .write()
            .await
            .insert(member.clone(), dto.roles.clone());
        Ok(dto.roles)
    }

    async fn apply_correction(
        &self,
        member: &MemberId,
        correction: &Correction,
    ) -> Result<(), DirectoryError> {
        let url = self.url(&format!("members/{member}/voice"));
        let body = VoiceEditDto {
            muted: correction.mute,
            deafened: correction.deafen,
        };
        let response = self
            .http
            .patch(&url)
            .bearer_auth(&self.config.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| DirectoryError::Apply(e.to_string()))?;
        if !response.status().is_success() {
            return Err(DirectoryError::Apply(format!(
                "{url}: HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}
