//! Spotify frame controller
//!
//! Mirrors and controls Spotify playback on a dedicated display: polls the
//! Web API on a fixed cadence, pushes track metadata, artwork, and an
//! interpolated progress bar to the screen, and forwards user intents
//! (previous / play-pause / next) as remote commands.

mod artwork;
mod auth;
mod config;
mod display;
mod engine;
mod error;
mod spotify;
mod store;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::artwork::{ArtworkCache, HttpArtworkFetcher};
use crate::auth::TokenRefresher;
use crate::config::Config;
use crate::display::{Intent, TermScreen};
use crate::engine::SyncEngine;
use crate::spotify::SpotifyClient;
use crate::store::TokenStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::load()?;

    // A stalled request must fail fast rather than starve the progress tick
    let client = reqwest::Client::builder()
        .timeout(config.cadence.request_timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let store = TokenStore::open(&config.paths.token_dir)
        .context("Failed to open the token store directory")?;
    let refresher = TokenRefresher::new(client.clone(), config.spotify.clone());
    let player = SpotifyClient::new(client.clone());
    let fetcher = HttpArtworkFetcher::new(client);
    let artwork = ArtworkCache::new(fetcher, config.paths.artwork_file.clone());
    let screen = TermScreen::new();

    let mut engine = SyncEngine::new(player, refresher, store, artwork, screen);

    if let Err(e) = engine.ensure_token().await {
        // Not fatal: the first poll's 401 path refreshes again
        tracing::warn!("Could not obtain an initial access token: {e}");
    }

    let (intent_tx, mut intent_rx) = mpsc::channel::<Intent>(8);
    tokio::spawn(read_intents(intent_tx));

    tracing::info!(
        "Polling every {:?}, interpolating every {:?} (enter = play/pause, n = next, p = previous)",
        config.cadence.poll_interval,
        config.cadence.progress_interval
    );

    let mut poll = tokio::time::interval(config.cadence.poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut progress = tokio::time::interval(config.cadence.progress_interval);
    progress.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // One task owns all playback state; the ticks and the intent channel
    // are serialized through this select loop.
    loop {
        tokio::select! {
            _ = poll.tick() => {
                let outcome = engine.on_poll_tick().await;
                tracing::debug!("Poll cycle finished: {:?}", outcome);
            }
            _ = progress.tick() => {
                engine.on_progress_tick();
            }
            // Branch disables itself if stdin closes; polling continues
            Some(intent) = intent_rx.recv() => {
                tracing::info!("User intent: {:?}", intent);
                let outcome = engine.handle_intent(intent).await;
                tracing::debug!("Command cycle finished: {:?}", outcome);
            }
        }
    }
}

/// Read keyboard input and forward recognized intents to the engine loop
async fn read_intents(tx: mpsc::Sender<Intent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        match display::intent_from_key(&line) {
            Some(intent) => {
                if tx.send(intent).await.is_err() {
                    break;
                }
            }
            None => tracing::info!("Unknown key {:?} (enter = play/pause, n = next, p = previous)", line.trim()),
        }
    }
}
