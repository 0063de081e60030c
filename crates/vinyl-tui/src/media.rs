//! Media driver: one playable element behind `MediaBackend`.
//!
//! The driver keeps the element's readiness, the caller's play intent and
//! the last known position. Loading a URL clears readiness; when the element
//! reports `Ready` and the intent is "playing", playback starts without a
//! second toggle. Play/pause requests are issued as numbered
//! [`PlaybackIntent`]s; a failure whose number was superseded by a later
//! load or toggle is dropped.
//!
//! Events are tied to their load: each successful load waits for its own
//! `start-file`, and everything mpv reports before that belongs to an
//! earlier file and is dropped. An end or error unloads the element.

use std::future::Future;

use tokio::sync::mpsc;
use tracing::debug;

use crate::mpv::{MpvEvent, MpvHandle, MpvProcess, OBS_DURATION, OBS_TIME_POS};

/// External seeks closer than this to the element's position are ignored.
pub const SEEK_TOLERANCE: f64 = 0.5;

pub trait MediaBackend: Clone + Send + Sync + 'static {
    fn load(&self, url: &str) -> impl Future<Output = anyhow::Result<()>> + Send;
    fn set_pause(&self, paused: bool) -> impl Future<Output = anyhow::Result<()>> + Send;
    /// 0.0–1.0.
    fn set_volume(&self, volume: f32) -> impl Future<Output = anyhow::Result<()>> + Send;
    fn seek_to(&self, seconds: f64) -> impl Future<Output = anyhow::Result<()>> + Send;
}

impl MediaBackend for MpvHandle {
    async fn load(&self, url: &str) -> anyhow::Result<()> {
        self.load_stream(url).await
    }

    async fn set_pause(&self, paused: bool) -> anyhow::Result<()> {
        MpvHandle::set_pause(self, paused).await
    }

    async fn set_volume(&self, volume: f32) -> anyhow::Result<()> {
        MpvHandle::set_volume(self, volume).await
    }

    async fn seek_to(&self, seconds: f64) -> anyhow::Result<()> {
        MpvHandle::seek_to(self, seconds).await
    }
}

/// Starts (or reattaches to) whatever process serves a [`MediaBackend`].
pub trait MediaHost: Send + 'static {
    type Backend: MediaBackend;

    /// Connect a backend whose raw events go to `events`.
    fn connect(
        &mut self,
        events: mpsc::Sender<MpvEvent>,
    ) -> impl Future<Output = anyhow::Result<Self::Backend>> + Send;

    fn is_alive(&mut self, backend: &Self::Backend) -> impl Future<Output = bool> + Send;

    fn shutdown(&mut self) -> impl Future<Output = ()> + Send;
}

impl MediaHost for MpvProcess {
    type Backend = MpvHandle;

    async fn connect(&mut self, events: mpsc::Sender<MpvEvent>) -> anyhow::Result<MpvHandle> {
        let handle = match self.try_reconnect(events.clone()).await {
            Some(h) => h,
            None => self.spawn_and_connect(events).await?,
        };
        handle.observe_properties().await;
        Ok(handle)
    }

    /// A reattached mpv is not our child, so ping it instead.
    async fn is_alive(&mut self, handle: &MpvHandle) -> bool {
        if self.owns_process() {
            self.process_alive()
        } else {
            handle.ping().await.is_ok()
        }
    }

    async fn shutdown(&mut self) {
        self.kill().await;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    TimeUpdate { position: f64, duration: f64 },
    Ended,
    Ready,
    Error(String),
}

/// A play or pause request in flight.
pub struct PlaybackIntent<B> {
    seq: u64,
    play: bool,
    backend: B,
}

#[derive(Debug)]
pub struct PlayOutcome {
    pub seq: u64,
    pub result: anyhow::Result<()>,
}

impl<B: MediaBackend> PlaybackIntent<B> {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub async fn run(self) -> PlayOutcome {
        let result = self.backend.set_pause(!self.play).await;
        PlayOutcome {
            seq: self.seq,
            result,
        }
    }
}

pub struct MediaDriver<B> {
    backend: Option<B>,
    ready: bool,
    want_playing: bool,
    position: f64,
    duration: f64,
    volume: f32,
    intent_seq: u64,
    /// Loads issued whose `start-file` has not been seen yet.
    pending_starts: u32,
}

impl<B: MediaBackend> MediaDriver<B> {
    pub fn new(volume: u8) -> Self {
        Self {
            backend: None,
            ready: false,
            want_playing: false,
            position: 0.0,
            duration: 0.0,
            volume: volume_scale(volume),
            intent_seq: 0,
            pending_starts: 0,
        }
    }

    pub fn attach(&mut self, backend: B) {
        self.backend = Some(backend);
        self.ready = false;
        self.pending_starts = 0;
    }

    pub fn detach(&mut self) {
        self.backend = None;
        self.ready = false;
        self.pending_starts = 0;
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// Replace the source. Readiness is cleared until the element reports
    /// `Ready`; any outstanding intent is superseded.
    pub async fn load(&mut self, url: &str) -> anyhow::Result<()> {
        self.ready = false;
        self.position = 0.0;
        self.duration = 0.0;
        self.intent_seq += 1;
        let Some(backend) = self.backend.as_ref() else {
            anyhow::bail!("media element not available");
        };
        backend.load(url).await?;
        self.pending_starts += 1;
        backend.set_volume(self.volume).await?;
        Ok(())
    }

    /// Record the play intent. Returns an intent to run only when the
    /// element is ready to honour it.
    pub fn set_playing(&mut self, playing: bool) -> Option<PlaybackIntent<B>> {
        self.want_playing = playing;
        self.intent_seq += 1;
        if !self.ready {
            return None;
        }
        let backend = self.backend.clone()?;
        Some(PlaybackIntent {
            seq: self.intent_seq,
            play: playing,
            backend,
        })
    }

    /// Called on `Ready`. Starts playback if the intent was already "playing".
    pub fn on_ready(&mut self) -> Option<PlaybackIntent<B>> {
        self.ready = true;
        if self.want_playing {
            self.set_playing(true)
        } else {
            None
        }
    }

    /// `Some(reason)` when a failure must be surfaced; superseded failures
    /// and successes yield `None`.
    pub fn resolve_play(&self, outcome: PlayOutcome) -> Option<String> {
        match outcome.result {
            Ok(()) => None,
            Err(e) if outcome.seq != self.intent_seq => {
                debug!("media: superseded intent {} failed: {}", outcome.seq, e);
                None
            }
            Err(e) => Some(e.to_string()),
        }
    }

    /// Seek only when `target` is more than [`SEEK_TOLERANCE`] away from
    /// the known position. Returns whether a seek was issued.
    pub async fn sync_position(&mut self, target: f64) -> anyhow::Result<bool> {
        if (self.position - target).abs() <= SEEK_TOLERANCE {
            return Ok(false);
        }
        self.position = target;
        if let Some(backend) = self.backend.as_ref() {
            backend.seek_to(target).await?;
        }
        Ok(true)
    }

    pub async fn set_volume(&mut self, volume: u8) -> anyhow::Result<()> {
        self.volume = volume_scale(volume);
        if let Some(backend) = self.backend.as_ref() {
            backend.set_volume(self.volume).await?;
        }
        Ok(())
    }

    /// Map a raw mpv message onto a media event, tracking position and
    /// duration on the way. Messages from before the latest load's
    /// `start-file` are dropped.
    pub fn translate(&mut self, event: &MpvEvent) -> Option<MediaEvent> {
        let name = event.event_name()?;
        if name == "start-file" {
            self.pending_starts = self.pending_starts.saturating_sub(1);
            return None;
        }
        if self.pending_starts > 0 {
            debug!("media: dropping {} from an earlier load", name);
            return None;
        }

        if let Some((id, data)) = event.as_property_change() {
            match id {
                OBS_TIME_POS => self.position = data.as_f64()?,
                OBS_DURATION => self.duration = data.as_f64()?,
                _ => return None,
            }
            return Some(MediaEvent::TimeUpdate {
                position: self.position,
                duration: self.duration,
            });
        }

        let media = match name {
            "file-loaded" => MediaEvent::Ready,
            "end-file" => match event.end_reason()? {
                "eof" => MediaEvent::Ended,
                "error" => MediaEvent::Error(
                    event
                        .file_error()
                        .unwrap_or("media failed to load")
                        .to_string(),
                ),
                _ => return None,
            },
            _ => return None,
        };
        if media != MediaEvent::Ready {
            // mpv --idle unloads the file: nothing is cued any more.
            self.ready = false;
            self.want_playing = false;
        }
        Some(media)
    }
}

/// 0–100 → 0.0–1.0.
pub fn volume_scale(volume: u8) -> f32 {
    f32::from(volume.min(100)) / 100.0
}
