//! Configuration loading
//!
//! Reads a TOML config file for credentials and cadences. Secrets can also
//! be supplied through environment variables, which take precedence over the
//! file so a config checked into a device image never needs to hold them.

use anyhow::Context;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use std::{env, fs};

/// Default poll cadence: the original device refreshed every 5 seconds
const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;

/// Default progress interpolation cadence
const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 1000;

/// Default HTTP timeout. Must stay well under the poll interval so a
/// stalled request fails fast instead of starving the progress tick.
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 3000;

#[derive(Debug, Clone)]
pub struct Config {
    pub spotify: SpotifyConfig,
    pub cadence: CadenceConfig,
    pub paths: PathsConfig,
}

/// Spotify application credentials
#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub struct CadenceConfig {
    pub poll_interval: Duration,
    pub progress_interval: Duration,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct PathsConfig {
    /// Directory holding the persisted access token
    pub token_dir: PathBuf,
    /// Single artwork slot, overwritten on track change
    pub artwork_file: PathBuf,
}

impl Config {
    /// Load config from the first candidate file found, then apply env
    /// overrides. A missing file is fine when all secrets come from the
    /// environment.
    pub fn load() -> anyhow::Result<Self> {
        let mut candidates = Vec::new();

        if let Ok(current_dir) = env::current_dir() {
            candidates.push(current_dir.join("spotify-frame.toml"));
            candidates.push(current_dir.join("config.toml"));
        }
        if let Ok(exe) = env::current_exe() {
            if let Some(dir) = exe.parent() {
                candidates.push(dir.join("spotify-frame.toml"));
            }
        }

        let mut doc = ConfigDocument::default();
        for path in candidates {
            if path.exists() {
                let data = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                doc = toml::from_str(&data)
                    .with_context(|| format!("Failed to parse config: {}", path.display()))?;
                tracing::info!("Loaded config from {}", path.display());
                break;
            }
        }

        Config::from_document(doc)
    }

    fn from_document(doc: ConfigDocument) -> anyhow::Result<Self> {
        let spotify = SpotifyConfig {
            client_id: env_or("SPOTIFY_CLIENT_ID", doc.spotify.client_id)
                .context("spotify client_id not configured")?,
            client_secret: env_or("SPOTIFY_CLIENT_SECRET", doc.spotify.client_secret)
                .context("spotify client_secret not configured")?,
            refresh_token: env_or("SPOTIFY_REFRESH_TOKEN", doc.spotify.refresh_token)
                .context("spotify refresh_token not configured")?,
        };

        let cadence = CadenceConfig {
            poll_interval: Duration::from_millis(
                doc.cadence.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
            progress_interval: Duration::from_millis(
                doc.cadence
                    .progress_interval_ms
                    .unwrap_or(DEFAULT_PROGRESS_INTERVAL_MS),
            ),
            request_timeout: Duration::from_millis(
                doc.cadence
                    .request_timeout_ms
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
            ),
        };

        let state_dir = doc
            .paths
            .state_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".spotify-frame"));

        let paths = PathsConfig {
            token_dir: state_dir.clone(),
            artwork_file: state_dir.join("albumArt.jpg"),
        };

        Ok(Config {
            spotify,
            cadence,
            paths,
        })
    }
}

/// Environment variable wins over the config file value
fn env_or(var: &str, file_value: Option<String>) -> Option<String> {
    env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .or(file_value.filter(|v| !v.is_empty()))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    spotify: SpotifySection,
    #[serde(default)]
    cadence: CadenceSection,
    #[serde(default)]
    paths: PathsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SpotifySection {
    client_id: Option<String>,
    client_secret: Option<String>,
    refresh_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CadenceSection {
    poll_interval_ms: Option<u64>,
    progress_interval_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PathsSection {
    state_dir: Option<String>,
}
