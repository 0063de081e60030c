use serde::{Deserialize, Serialize};

use crate::track::{Track, ThemeColors};

/// Messages sent from the UI to the player core.
#[derive(Debug, Clone)]
pub enum Command {
    TogglePause,
    Next,
    Prev,
    /// Play this track now, whatever the current mode.
    SelectTrack { track: Track },
    /// Volume on the 0–100 scale.
    Volume { value: u8 },
    SeekTo { seconds: f64 },
    /// The track reached its end (media driver or a seek past the end).
    TrackEnded,
    ToggleRepeat,
    ToggleAutoplay,
    /// Like or unlike the current track.
    ToggleLike,
    RemoveLiked { id: String },
}

/// Detailed playback status: reflects actual mpv state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub enum PlaybackStatus {
    #[default]
    Idle, // nothing loaded / explicitly stopped
    Loading, // loadfile sent, waiting for file-loaded
    Playing,
    Paused,
    Error, // media failed to load or play
}

/// Health of the mpv process as observed by the core.
///
/// Transitions:
///   Absent -> Starting -> Running -> Dead -> Starting ...
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub enum MpvHealth {
    /// mpv process does not exist yet (before first use).
    #[default]
    Absent,
    /// Process is spawning / socket not yet available.
    Starting,
    /// Socket connected, IPC responding normally.
    Running,
    /// Process exited or socket closed.
    Dead,
}

impl MpvHealth {
    /// Short label for badges / status bar (≤5 chars).
    pub fn badge_label(&self) -> Option<&str> {
        match self {
            MpvHealth::Absent => None,
            MpvHealth::Starting => Some("INIT"),
            MpvHealth::Running => None,
            MpvHealth::Dead => Some("DEAD"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-visible message raised by the core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

/// Full snapshot of the player.  `rev` is a monotonically increasing counter
/// incremented every time the core publishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    #[serde(default)]
    pub rev: u64,
    pub current: Track,
    pub is_playing: bool,
    pub status: PlaybackStatus,
    pub elapsed_secs: f64,
    pub duration_secs: f64,
    /// 0–100.
    pub volume: u8,
    pub repeat: bool,
    pub autoplay: bool,
    pub liked: Vec<Track>,
    /// Upcoming autoplay tracks, head first.
    pub queue: Vec<Track>,
    pub history_len: usize,
    pub loading_next: bool,
    /// Background tint roles extracted from the current artwork.
    pub theme: ThemeColors,
    #[serde(default)]
    pub mpv_health: MpvHealth,
}

impl Default for PlayerState {
    fn default() -> Self {
        let current = Track::default_track();
        let theme = current.colors.clone();
        Self {
            rev: 0,
            current,
            is_playing: false,
            status: PlaybackStatus::Idle,
            elapsed_secs: 0.0,
            duration_secs: 0.0,
            volume: 70,
            repeat: false,
            autoplay: true,
            liked: Vec::new(),
            queue: Vec::new(),
            history_len: 0,
            loading_next: false,
            theme,
            mpv_health: MpvHealth::Absent,
        }
    }
}

impl PlayerState {
    /// Elapsed / total × 100, clamped.  Zero while the duration is unknown.
    pub fn progress_percent(&self) -> f64 {
        if !self.duration_secs.is_finite() || self.duration_secs <= 0.0 {
            return 0.0;
        }
        (self.elapsed_secs / self.duration_secs * 100.0).clamp(0.0, 100.0)
    }

    pub fn is_current_liked(&self) -> bool {
        self.liked.iter().any(|t| t.id == self.current.id)
    }
}
