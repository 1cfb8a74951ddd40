use std::fmt;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{RelayError, Result};
use crate::helpers::time::now_i64;
use crate::utils::constants::ROOM_GRACE_SECS;

/// A room ready to join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedRoom {
    pub room_name: String,
    pub join_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecordingSummary {
    pub id: String,
    #[serde(default)]
    pub room_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub start_ts: Option<i64>,
    #[serde(default)]
    pub duration: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecordingLink {
    pub download_link: String,
    #[serde(default)]
    pub expires: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RoomResponse {
    name: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct MeetingTokenResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct RecordingList {
    #[serde(default)]
    data: Vec<RecordingSummary>,
}

#[derive(Debug, Serialize)]
struct CreateRoomBody<'a> {
    name: &'a str,
    privacy: &'a str,
    properties: serde_json::Value,
}

/// HTTP client for the video conferencing / cloud recording provider.
#[derive(Clone)]
pub struct RecordingClient {
    client: Client,
    base_url: String,
    api_key: String,
    room_privacy: String,
}

impl RecordingClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration, room_privacy: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| RelayError::Config(format!("recording http client: {}", err)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
            room_privacy: room_privacy.to_owned(),
        })
    }

    /// Create a recordable room that expires after `minutes` (plus grace),
    /// then a meeting token for the candidate, and combine them into a join URL.
    pub async fn create_room(&self, sid: &str, minutes: u32, candidate_name: &str) -> Result<CreatedRoom> {
        let exp = now_i64() + i64::from(minutes) * 60 + ROOM_GRACE_SECS;
        let name = room_name_for(sid);

        let body = CreateRoomBody {
            name: &name,
            privacy: &self.room_privacy,
            properties: json!({
                "exp": exp,
                "enable_recording": "cloud",
                "eject_at_room_exp": true,
            }),
        };
        let room: RoomResponse = self.send_json(self.request(Method::POST, "/rooms").json(&body)).await?;

        let token_body = json!({
            "properties": {
                "room_name": room.name,
                "user_name": candidate_name,
                "exp": exp,
                "is_owner": false,
                "start_cloud_recording": true,
            }
        });
        let token: MeetingTokenResponse = self
            .send_json(self.request(Method::POST, "/meeting-tokens").json(&token_body))
            .await?;

        debug!(room_name = %room.name, minutes, "room created");
        Ok(CreatedRoom {
            join_url: format!("{}?t={}", room.url, token.token),
            room_name: room.name,
        })
    }

    /// Most recent recording of a room, if the provider has one yet.
    pub async fn latest_recording(&self, room_name: &str) -> Result<Option<RecordingSummary>> {
        let request = self
            .request(Method::GET, "/recordings")
            .query(&[("room_name", room_name), ("limit", "1")]);
        let list: RecordingList = self.send_json(request).await?;
        Ok(list.data.into_iter().next())
    }

    /// Time-limited download link for a finished recording.
    pub async fn recording_link(&self, recording_id: &str) -> Result<RecordingLink> {
        let url = self.access_link_url(recording_id)?;
        let request = self.client.request(Method::GET, url).bearer_auth(&self.api_key);
        self.send_json(request).await
    }

    /// `<base>/recordings/<id>/access-link` with the id escaped as one path segment.
    fn access_link_url(&self, recording_id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|err| RelayError::Config(format!("recording base url: {}", err)))?;
        url.path_segments_mut()
            .map_err(|_| RelayError::Config("recording base url cannot hold a path".to_string()))?
            .pop_if_empty()
            .extend(["recordings", recording_id, "access-link"]);
        Ok(url)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("recording provider returned {}: {}", status, body);
            return Err(RelayError::UpstreamFailure(format!("recording provider returned {}", status)));
        }
        Ok(response.json::<T>().await?)
    }
}

impl fmt::Debug for RecordingClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("room_privacy", &self.room_privacy)
            .finish()
    }
}

/// `mis-<sid>-<random>`: lowercase alphanumerics and dashes, bounded length.
pub fn room_name_for(sid: &str) -> String {
    let mut slug: String = sid
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .take(24)
        .collect();
    slug = slug.trim_matches('-').to_owned();
    if slug.is_empty() {
        slug.push_str("session");
    }
    let suffix = Uuid::new_v4().simple().to_string();
    format!("mis-{}-{}", slug, &suffix[..8])
}
