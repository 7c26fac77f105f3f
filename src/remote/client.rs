/// HTTP client for the avatar service.
///
/// One authenticated endpoint for fetching and saving the avatar, plus raw
/// image GETs for previews and thumbnails. reqwest errors are flattened to
/// strings here because they travel inside cloneable iced messages.
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use serde_json::Value;

use crate::error::EditorError;
use crate::state::avatar::AvatarState;

/// The avatar-builder endpoint; GET fetches, POST saves.
const AVATAR_ENDPOINT: &str =
    "https://us-east-1-bitmoji.api.snapchat.com/api/avatar-builder-v3/avatar";

/// Header carrying the user's token on authenticated calls.
const TOKEN_HEADER: &str = "Bitmoji-Token";

#[derive(Debug, Clone, Default)]
pub struct SyncClient {
    http: Client,
}

impl SyncClient {
    pub fn new() -> SyncClient {
        SyncClient {
            http: Client::new(),
        }
    }

    /// Fetch the avatar's current configuration.
    pub async fn fetch_avatar(&self, token: &str) -> Result<AvatarState, EditorError> {
        let response = self
            .http
            .get(AVATAR_ENDPOINT)
            .header(TOKEN_HEADER, token)
            .header(ACCEPT, "application/json, text/plain, */*")
            .header(USER_AGENT, "Mozilla/5.0")
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(EditorError::Remote(format!(
                "avatar fetch returned {}",
                response.status()
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| EditorError::RemoteSchema(format!("avatar body is not JSON: {}", e)))?;

        AvatarState::from_remote(&payload)
    }

    /// Push the edited avatar back. On success the caller advances the
    /// session version and fetches the confirmation image.
    pub async fn save_avatar(&self, token: &str, avatar: &AvatarState) -> Result<(), EditorError> {
        let response = self
            .http
            .post(AVATAR_ENDPOINT)
            .header(TOKEN_HEADER, token)
            .header(ACCEPT, "application/json, text/plain, */*")
            .header(USER_AGENT, "Mozilla/5.0")
            .json(&avatar.save_payload())
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(EditorError::Remote(format!(
                "avatar save returned {}",
                response.status()
            )));
        }

        Ok(())
    }

    /// GET raw image bytes. Callers degrade to "no image" on failure rather
    /// than propagating it.
    pub async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, EditorError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(EditorError::Remote(format!(
                "image fetch returned {}",
                response.status()
            )));
        }

        let bytes = response.bytes().await.map_err(transport_error)?;
        Ok(bytes.to_vec())
    }
}

fn transport_error(err: reqwest::Error) -> EditorError {
    EditorError::Remote(err.to_string())
}
