use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use pathway_collab::{RealtimeBackend, RealtimeError, RealtimeUser, RoomToken};

const DEFAULT_BASE_URL: &str = "https://api.liveblocks.io/v2";

/// A [RealtimeBackend] implementation against the Liveblocks REST API.
/// The provider owns presence and the conflict-resolving storage; this
/// client only creates rooms and issues access tokens.
pub struct LiveblocksBackend {
    client: reqwest::Client,
    secret_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

impl LiveblocksBackend {
    pub fn new(secret_key: &str) -> Self {
        Self::with_base_url(secret_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(secret_key: &str, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key: secret_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl RealtimeBackend for LiveblocksBackend {
    async fn create_room(
        &self,
        room_id: &str,
        initial_storage: &serde_json::Value,
    ) -> Result<(), RealtimeError> {
        let body = json!({
            "id": room_id,
            "defaultAccesses": ["room:write"],
            "initialStorage": initial_storage,
        });

        let response = self
            .client
            .post(format!("{}/rooms", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RealtimeError(e.to_string()))?;

        let status = response.status();

        // The room already existing is fine, any other failure isn't
        if !status.is_success() && status != reqwest::StatusCode::CONFLICT {
            let body = response.text().await.unwrap_or_default();
            return Err(RealtimeError(format!("{status}: {body}")));
        }

        Ok(())
    }

    async fn authorize(
        &self,
        room_id: &str,
        user: &RealtimeUser,
    ) -> Result<RoomToken, RealtimeError> {
        let body = json!({
            "userId": user.id,
            "userInfo": { "name": user.name },
        });

        let response = self
            .client
            .post(format!("{}/rooms/{room_id}/authorize", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RealtimeError(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RealtimeError(format!("{status}: {body}")));
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| RealtimeError(e.to_string()))?;

        Ok(RoomToken {
            token: parsed.token,
        })
    }
}
