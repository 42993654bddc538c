//! Playback sync engine
//!
//! Owns the local playback state and runs the poll/reconciliation cycle:
//! fetch the remote snapshot (refreshing the token once on a 401), detect
//! which of the two transitions happened (track changed, play state
//! changed) and apply each side effect exactly once. The two deltas are
//! evaluated independently; coupling them drops updates when only one
//! field moved.
//!
//! A separate higher-frequency tick interpolates playback progress between
//! polls without touching the network.

use std::time::{Duration, Instant};

use crate::artwork::{ArtworkCache, ArtworkFetcher};
use crate::auth::RefreshTokens;
use crate::display::{Intent, Screen};
use crate::error::RemoteError;
use crate::spotify::{PlaybackSnapshot, PlayerApi};
use crate::store::TokenStore;

/// Last-rendered values. A field is updated iff the matching render side
/// effect was issued in the same reconciliation pass, so these never drift
/// from what is on screen. `None` is the startup sentinel.
#[derive(Debug, Default)]
struct LocalPlaybackState {
    last_track_id: Option<String>,
    last_is_playing: Option<bool>,
}

/// Client-side estimate of the playback position between polls
#[derive(Debug, Default)]
struct ProgressEstimate {
    estimated_ms: u64,
    duration_ms: u64,
}

impl ProgressEstimate {
    /// Snap back to remote truth on a successful poll
    fn reset(&mut self, progress_ms: u64, duration_ms: u64) {
        self.estimated_ms = progress_ms.min(duration_ms);
        self.duration_ms = duration_ms;
    }

    /// Linear extrapolation, clamped at the track duration
    fn advance(&mut self, elapsed: Duration) {
        self.estimated_ms = self
            .estimated_ms
            .saturating_add(elapsed.as_millis() as u64)
            .min(self.duration_ms);
    }

    fn percent(&self) -> u8 {
        if self.duration_ms == 0 {
            0
        } else {
            (self.estimated_ms * 100 / self.duration_ms) as u8
        }
    }
}

/// What one poll cycle amounted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Snapshot received and reconciled against local state
    Reconciled {
        track_changed: bool,
        play_changed: bool,
    },
    /// No active session, a valid "nothing to show" state, not an error
    Quiescent,
    /// Token refresh failed, or the refreshed token was rejected again.
    /// No further retry until the next scheduled tick.
    AuthFailed,
    /// Transport/unexpected/malformed failure; the next tick retries
    TransientError,
}

pub struct SyncEngine<P, R, F, S> {
    player: P,
    refresher: R,
    store: TokenStore,
    artwork: ArtworkCache<F>,
    screen: S,
    local: LocalPlaybackState,
    progress: ProgressEstimate,
    last_progress_tick: Option<Instant>,
}

impl<P, R, F, S> SyncEngine<P, R, F, S>
where
    P: PlayerApi,
    R: RefreshTokens,
    F: ArtworkFetcher,
    S: Screen,
{
    pub fn new(player: P, refresher: R, store: TokenStore, artwork: ArtworkCache<F>, screen: S) -> Self {
        Self {
            player,
            refresher,
            store,
            artwork,
            screen,
            local: LocalPlaybackState::default(),
            progress: ProgressEstimate::default(),
            last_progress_tick: None,
        }
    }

    /// Obtain and persist an initial access token when none is stored yet
    pub async fn ensure_token(&mut self) -> Result<(), crate::error::AuthError> {
        if self.store.has_token() {
            tracing::debug!("Using persisted access token");
            return Ok(());
        }

        tracing::info!("No stored access token, requesting a new one");
        let token = self.refresher.refresh().await?;
        if let Err(e) = self.store.save(&token) {
            // Non-fatal: the next 401 triggers another refresh
            tracing::warn!("Failed to persist access token: {e}");
        }
        Ok(())
    }

    /// One scheduled poll cycle: Idle -> Fetching -> {Reconciling |
    /// AuthRetrying | Quiescent} -> Idle
    pub async fn on_poll_tick(&mut self) -> CycleOutcome {
        match self.fetch_with_auth_retry().await {
            Ok(Some(snapshot)) => self.reconcile(snapshot).await,
            Ok(None) => {
                tracing::debug!("No active playback session");
                CycleOutcome::Quiescent
            }
            Err(RemoteError::Unauthorized) => {
                tracing::warn!("Authorization failed after token refresh");
                CycleOutcome::AuthFailed
            }
            Err(e) => {
                tracing::warn!("Poll cycle failed: {e}");
                CycleOutcome::TransientError
            }
        }
    }

    /// Fetch the current snapshot, recovering from a rejected token exactly
    /// once: refresh, persist, retry. A second 401 propagates.
    async fn fetch_with_auth_retry(
        &mut self,
    ) -> Result<Option<PlaybackSnapshot>, RemoteError> {
        let token = self.store.load();
        match self.player.fetch_current(&token).await {
            Err(RemoteError::Unauthorized) => {
                tracing::info!("Access token rejected, refreshing");
                let fresh = self.refresher.refresh().await.map_err(|e| {
                    tracing::warn!("Token refresh failed: {e}");
                    RemoteError::Unauthorized
                })?;
                if let Err(e) = self.store.save(&fresh) {
                    tracing::warn!("Failed to persist refreshed token: {e}");
                }
                // Retry with the fresh token even if persisting it failed
                self.player.fetch_current(&fresh).await
            }
            other => other,
        }
    }

    /// Apply the snapshot's deltas against local state. The two transitions
    /// are independent and each fires its side effects at most once.
    async fn reconcile(&mut self, snapshot: PlaybackSnapshot) -> CycleOutcome {
        let track_changed = self.local.last_track_id.as_deref() != Some(snapshot.track_id.as_str());
        let play_changed = self.local.last_is_playing != Some(snapshot.is_playing);

        // Runs every successful poll, not just on a track change: the URL
        // key makes the already-cached case a no-op, and a failed fetch
        // keeps the key unchanged so the same URL retries here next cycle
        // even though the track no longer reads as changed.
        match self.artwork.ensure(&snapshot.artwork_url).await {
            Ok(Some(decoded)) => self.screen.show_artwork(&decoded),
            Ok(None) => {}
            // Artwork failure does not fail the cycle
            Err(e) => tracing::warn!("Artwork update failed: {e}"),
        }

        if track_changed {
            tracing::info!(
                "Track changed: {} by {}",
                snapshot.track_name,
                snapshot.artist_name
            );
            self.screen
                .set_track(&snapshot.track_name, &snapshot.artist_name);
            self.local.last_track_id = Some(snapshot.track_id.clone());
        }

        if play_changed {
            tracing::info!(
                "Transport changed: {}",
                if snapshot.is_playing { "playing" } else { "paused" }
            );
            self.screen.set_play_state(snapshot.is_playing);
            self.local.last_is_playing = Some(snapshot.is_playing);
        }

        // Remote truth resets the estimate on every successful poll,
        // whether or not anything else changed.
        self.progress
            .reset(snapshot.progress_ms, snapshot.duration_ms);

        CycleOutcome::Reconciled {
            track_changed,
            play_changed,
        }
    }

    /// Dispatch a user intent, then re-poll immediately so the view
    /// reflects the remote's authoritative response rather than a local
    /// guess.
    pub async fn handle_intent(&mut self, intent: Intent) -> CycleOutcome {
        match intent {
            Intent::Previous => self.previous().await,
            Intent::PlayPause => self.toggle_play_pause().await,
            Intent::Next => self.next().await,
        }
    }

    pub async fn previous(&mut self) -> CycleOutcome {
        let token = self.store.load();
        if let Err(e) = self.player.skip_previous(&token).await {
            tracing::warn!("Skip-previous failed: {e}");
        }
        self.on_poll_tick().await
    }

    pub async fn next(&mut self) -> CycleOutcome {
        let token = self.store.load();
        if let Err(e) = self.player.skip_next(&token).await {
            tracing::warn!("Skip-next failed: {e}");
        }
        self.on_poll_tick().await
    }

    /// Toggle based on the last rendered play state; before the first
    /// successful poll, fall back to the lightweight transport probe.
    pub async fn toggle_play_pause(&mut self) -> CycleOutcome {
        let token = self.store.load();
        let currently_playing = match self.local.last_is_playing {
            Some(playing) => playing,
            None => match self.player.fetch_transport_state(&token).await {
                Ok(playing) => playing,
                Err(RemoteError::NoActiveSession) => false,
                Err(e) => {
                    tracing::warn!("Transport probe failed: {e}");
                    false
                }
            },
        };

        if let Err(e) = self.player.set_playing(&token, !currently_playing).await {
            tracing::warn!("Play/pause command failed: {e}");
        }
        self.on_poll_tick().await
    }

    /// Progress interpolation tick. No I/O; pushes only the percentage.
    pub fn on_progress_tick(&mut self) {
        let now = Instant::now();
        let elapsed = self
            .last_progress_tick
            .map(|t| now.duration_since(t))
            .unwrap_or_default();
        self.last_progress_tick = Some(now);
        self.advance_progress(elapsed);
    }

    fn advance_progress(&mut self, elapsed: Duration) {
        // A paused position does not move; the estimate only extrapolates
        // while the last rendered state is "playing".
        if self.local.last_is_playing == Some(true) {
            self.progress.advance(elapsed);
        }
        self.screen.set_progress_percent(self.progress.percent());
    }
}
