//! Spotify Web API player client
//!
//! Thin request/response wrapper for the five playback operations. Every
//! call takes the bearer token as an explicit parameter; the client never
//! reads the credential store, which keeps it pure and testable.
//!
//! Status contract: 200 success with JSON body (the write ops may answer
//! with an empty 200 or 204), 204 on the read ops means no active session,
//! 401 means the token was rejected, anything else is unexpected for this
//! cycle.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;

use crate::error::RemoteError;

const API_BASE: &str = "https://api.spotify.com/v1";

/// One poll's worth of remote playback truth
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub track_id: String,
    pub track_name: String,
    pub artist_name: String,
    pub artwork_url: String,
    pub is_playing: bool,
    pub progress_ms: u64,
    pub duration_ms: u64,
}

/// The five playback operations against the remote player
#[async_trait]
pub trait PlayerApi: Send + Sync {
    /// Fetch the currently playing track. `Ok(None)` is the legitimate
    /// "no active session" outcome (204), not an error.
    async fn fetch_current(&self, token: &str) -> Result<Option<PlaybackSnapshot>, RemoteError>;

    /// Lightweight playing/paused probe without full metadata
    async fn fetch_transport_state(&self, token: &str) -> Result<bool, RemoteError>;

    async fn set_playing(&self, token: &str, desired: bool) -> Result<(), RemoteError>;

    async fn skip_next(&self, token: &str) -> Result<(), RemoteError>;

    async fn skip_previous(&self, token: &str) -> Result<(), RemoteError>;
}

// ---- Response models ----

#[derive(Debug, Deserialize)]
struct CurrentlyPlayingBody {
    item: Option<TrackItem>,
    is_playing: bool,
    progress_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TrackItem {
    id: Option<String>,
    name: String,
    duration_ms: u64,
    artists: Vec<ArtistRef>,
    album: AlbumRef,
}

#[derive(Debug, Deserialize)]
struct ArtistRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AlbumRef {
    images: Vec<ImageRef>,
}

#[derive(Debug, Deserialize)]
struct ImageRef {
    url: String,
    width: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TransportBody {
    is_playing: bool,
}

/// Pick the second-smallest image variant: big enough to look good on the
/// panel, small enough to fetch quickly.
fn pick_artwork_url(images: &[ImageRef]) -> Option<&str> {
    let mut by_size: Vec<&ImageRef> = images.iter().collect();
    by_size.sort_by_key(|img| img.width.unwrap_or(0));
    by_size
        .get(1)
        .or_else(|| by_size.first())
        .map(|img| img.url.as_str())
}

/// Convert a parsed 200 body into a snapshot.
///
/// Strict by design: a track that is "loaded" must carry an id, a positive
/// duration, and artwork. Anything less fails the cycle as malformed rather
/// than pushing placeholder values to the screen.
fn snapshot_from_body(body: CurrentlyPlayingBody) -> Result<Option<PlaybackSnapshot>, RemoteError> {
    let item = match body.item {
        Some(item) => item,
        // 200 with a null item happens for ads and restricted content;
        // treat it like an idle session.
        None => return Ok(None),
    };

    let track_id = item.id.ok_or(RemoteError::MalformedResponse)?;
    if item.duration_ms == 0 {
        return Err(RemoteError::MalformedResponse);
    }

    let artwork_url = pick_artwork_url(&item.album.images)
        .ok_or(RemoteError::MalformedResponse)?
        .to_string();

    let artist_name = item
        .artists
        .first()
        .map(|a| a.name.clone())
        .ok_or(RemoteError::MalformedResponse)?;

    let progress_ms = body.progress_ms.unwrap_or(0).min(item.duration_ms);

    Ok(Some(PlaybackSnapshot {
        track_id,
        track_name: item.name,
        artist_name,
        artwork_url,
        is_playing: body.is_playing,
        progress_ms,
        duration_ms: item.duration_ms,
    }))
}

/// reqwest-backed player client
pub struct SpotifyClient {
    client: Client,
    base_url: String,
}

impl SpotifyClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: API_BASE.to_string(),
        }
    }

    /// Issue one of the empty-bodied write operations and map its status
    async fn send_command(
        &self,
        method: Method,
        path: &str,
        token: &str,
    ) -> Result<(), RemoteError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .request(method, &url)
            .bearer_auth(token)
            .header("Content-Length", "0")
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED => Err(RemoteError::Unauthorized),
            s => Err(RemoteError::Unexpected(s.as_u16())),
        }
    }
}

#[async_trait]
impl PlayerApi for SpotifyClient {
    async fn fetch_current(&self, token: &str) -> Result<Option<PlaybackSnapshot>, RemoteError> {
        let url = format!("{}/me/player/currently-playing", self.base_url);
        let response = self.client.get(&url).bearer_auth(token).send().await?;

        match response.status() {
            StatusCode::OK => {
                let body: CurrentlyPlayingBody = response
                    .json()
                    .await
                    .map_err(|_| RemoteError::MalformedResponse)?;
                snapshot_from_body(body)
            }
            StatusCode::NO_CONTENT => Ok(None),
            StatusCode::UNAUTHORIZED => Err(RemoteError::Unauthorized),
            s => Err(RemoteError::Unexpected(s.as_u16())),
        }
    }

    async fn fetch_transport_state(&self, token: &str) -> Result<bool, RemoteError> {
        let url = format!("{}/me/player", self.base_url);
        let response = self.client.get(&url).bearer_auth(token).send().await?;

        match response.status() {
            StatusCode::OK => {
                let body: TransportBody = response
                    .json()
                    .await
                    .map_err(|_| RemoteError::MalformedResponse)?;
                Ok(body.is_playing)
            }
            StatusCode::NO_CONTENT => Err(RemoteError::NoActiveSession),
            StatusCode::UNAUTHORIZED => Err(RemoteError::Unauthorized),
            s => Err(RemoteError::Unexpected(s.as_u16())),
        }
    }

    async fn set_playing(&self, token: &str, desired: bool) -> Result<(), RemoteError> {
        let path = if desired {
            "/me/player/play"
        } else {
            "/me/player/pause"
        };
        self.send_command(Method::PUT, path, token).await
    }

    async fn skip_next(&self, token: &str) -> Result<(), RemoteError> {
        self.send_command(Method::POST, "/me/player/next", token)
            .await
    }

    async fn skip_previous(&self, token: &str) -> Result<(), RemoteError> {
        self.send_command(Method::POST, "/me/player/previous", token)
            .await
    }
}
