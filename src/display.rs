//! Presentation boundary
//!
//! The screen is a pure consumer of the view model: title/artist text, a
//! play/pause icon, a progress percentage, and the decoded artwork. User
//! taps come back as `Intent` events with no business logic attached.
//!
//! The shipped implementation is a terminal stand-in for the device's touch
//! panel: it draws the view model as log lines and a text progress bar, and
//! maps keyboard input to the three intents.

use image::{DynamicImage, GenericImageView};
use std::io::{self, Write};

/// User intents emitted by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Previous,
    PlayPause,
    Next,
}

/// Render sink for the view model
pub trait Screen: Send {
    fn set_track(&mut self, title: &str, artist: &str);
    fn set_play_state(&mut self, playing: bool);
    fn set_progress_percent(&mut self, percent: u8);
    fn show_artwork(&mut self, image: &DynamicImage);
}

/// Map a line of keyboard input to an intent.
/// Bare enter (or space) toggles play/pause, like tapping the center button.
pub fn intent_from_key(key: &str) -> Option<Intent> {
    match key.trim() {
        "p" | "prev" => Some(Intent::Previous),
        "n" | "next" => Some(Intent::Next),
        "" | "space" => Some(Intent::PlayPause),
        _ => None,
    }
}

const PROGRESS_BAR_WIDTH: usize = 30;

/// Terminal screen implementation
pub struct TermScreen {
    playing: bool,
}

impl TermScreen {
    pub fn new() -> Self {
        Self { playing: false }
    }
}

impl Default for TermScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl Screen for TermScreen {
    fn set_track(&mut self, title: &str, artist: &str) {
        tracing::info!("Now playing: {} by {}", title, artist);
    }

    fn set_play_state(&mut self, playing: bool) {
        self.playing = playing;
        tracing::info!("Transport: {}", if playing { "playing" } else { "paused" });
    }

    fn set_progress_percent(&mut self, percent: u8) {
        let filled = (percent as usize * PROGRESS_BAR_WIDTH) / 100;
        let icon = if self.playing { ">" } else { "|" };
        print!(
            "\r{} [{}{}] {:3}%",
            icon,
            "=".repeat(filled.min(PROGRESS_BAR_WIDTH)),
            " ".repeat(PROGRESS_BAR_WIDTH - filled.min(PROGRESS_BAR_WIDTH)),
            percent
        );
        let _ = io::stdout().flush();
    }

    fn show_artwork(&mut self, image: &DynamicImage) {
        let (width, height) = image.dimensions();
        tracing::info!("Artwork updated ({}x{})", width, height);
    }
}
