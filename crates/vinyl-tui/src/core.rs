/// PlayerCore: single-owner event loop for all mutable playback state.
///
/// Everything that wants to change playback sends a `PlayerEvent` here:
/// key presses (as `Command`s), raw mpv events, finished play intents,
/// recommendation fetches and palette extractions. The core owns the
/// `Navigator`, the media driver and the media host (mpv in production);
/// no other task touches them.
///
/// After every mutation the core writes a fresh `PlayerState` into the
/// `StateManager` and broadcasts `StateUpdated`. User-facing messages go out
/// as `BroadcastMessage::Notice`.
///
/// Network work runs in spawned tasks that report back through the same
/// channel, tagged with a fetch token or a poster URL, so late results can be
/// recognised and dropped.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use vinyl_proto::catalog::CatalogClient;
use vinyl_proto::config::Config;
use vinyl_proto::liked::LikedStore;
use vinyl_proto::protocol::{Command, MpvHealth, Notice, PlaybackStatus, PlayerState};
use vinyl_proto::recommend::{fetch_recommendations, Recommendations};
use vinyl_proto::state::StateManager;
use vinyl_proto::track::{ThemeColors, Track};

use crate::media::{MediaDriver, MediaEvent, MediaHost, PlayOutcome, PlaybackIntent};
use crate::mpv::MpvEvent;
use crate::navigation::{FetchToken, Navigator, Step};
use crate::palette::{self, Palette};
use crate::BroadcastMessage;

const HEARTBEAT: Duration = Duration::from_secs(10);

/// All inputs into the core loop.
#[derive(Debug)]
pub enum PlayerEvent {
    Command(Command),
    Mpv(MpvEvent),
    PlayOutcome(PlayOutcome),
    RecommendationsReady {
        token: FetchToken,
        recs: Recommendations,
    },
    PaletteReady {
        url: String,
        palette: Palette,
    },
    /// Liveness check for the mpv process.
    HeartbeatTick,
    /// The UI is quitting; kill mpv and stop.
    Shutdown,
}

pub struct PlayerCore<H: MediaHost> {
    config: Config,
    state_manager: Arc<StateManager>,
    catalog: Arc<CatalogClient>,
    http: reqwest::Client,
    liked_store: LikedStore,
    liked: Vec<Track>,
    nav: Navigator,
    host: H,
    backend: Option<H::Backend>,
    mpv_health: MpvHealth,
    driver: MediaDriver<H::Backend>,
    event_tx: mpsc::Sender<PlayerEvent>,
    broadcast_tx: broadcast::Sender<BroadcastMessage>,
    is_playing: bool,
    status: PlaybackStatus,
    elapsed: f64,
    duration: f64,
    volume: u8,
    theme: ThemeColors,
    palette_cache: HashMap<String, ThemeColors>,
    /// Poster the current theme belongs to (or is being extracted for).
    last_poster: Option<String>,
}

impl<H: MediaHost> PlayerCore<H> {
    pub fn new(
        config: Config,
        host: H,
        catalog: Arc<CatalogClient>,
        broadcast_tx: broadcast::Sender<BroadcastMessage>,
        event_tx: mpsc::Sender<PlayerEvent>,
    ) -> Self {
        let liked_store = LikedStore::new(config.paths.liked_file.clone());
        let liked = liked_store.list();
        info!("PlayerCore: {} liked tracks from {:?}", liked.len(), liked_store.path());

        let mut nav = Navigator::new(config.playback.autoplay, config.playback.repeat);
        nav.initialize(&liked);

        let volume = config.playback.default_volume.min(100);
        let theme = nav.current().colors.clone();
        let state_manager = Arc::new(StateManager::new(PlayerState {
            current: nav.current().clone(),
            volume,
            repeat: nav.repeat(),
            autoplay: nav.autoplay(),
            liked: liked.clone(),
            theme: theme.clone(),
            ..PlayerState::default()
        }));

        Self {
            http: reqwest::Client::new(),
            host,
            driver: MediaDriver::new(volume),
            config,
            state_manager,
            catalog,
            liked_store,
            liked,
            nav,
            backend: None,
            mpv_health: MpvHealth::Absent,
            event_tx,
            broadcast_tx,
            is_playing: false,
            status: PlaybackStatus::Idle,
            elapsed: 0.0,
            duration: 0.0,
            volume,
            theme,
            palette_cache: HashMap::new(),
            last_poster: None,
        }
    }

    pub fn state_manager(&self) -> Arc<StateManager> {
        Arc::clone(&self.state_manager)
    }

    /// Run until `Shutdown` or until every sender is gone (UI exited).
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<PlayerEvent>) -> anyhow::Result<()> {
        info!("PlayerCore: starting event loop");

        let heartbeat_tx = self.event_tx.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(HEARTBEAT).await;
                if heartbeat_tx.send(PlayerEvent::HeartbeatTick).await.is_err() {
                    break;
                }
            }
        });

        // Cue the startup track paused so the first play is instant.
        let current = self.nav.current().clone();
        self.load_track(current, false).await;

        while let Some(evt) = event_rx.recv().await {
            if !self.handle_event(evt).await {
                break;
            }
        }

        info!("PlayerCore: event loop finished");
        self.host.shutdown().await;
        Ok(())
    }

    /// Apply one event. `false` once the loop should stop.
    async fn handle_event(&mut self, evt: PlayerEvent) -> bool {
        match evt {
            PlayerEvent::Shutdown => {
                info!("PlayerCore: shutdown requested");
                return false;
            }
            PlayerEvent::Command(cmd) => {
                debug!("PlayerCore: command {:?}", cmd);
                if let Err(e) = self.handle_command(cmd).await {
                    error!("PlayerCore: command error: {:#}", e);
                }
            }
            PlayerEvent::Mpv(evt) => self.handle_mpv_event(evt).await,
            PlayerEvent::PlayOutcome(outcome) => {
                if let Some(reason) = self.driver.resolve_play(outcome) {
                    self.playback_error(&reason).await;
                }
            }
            PlayerEvent::RecommendationsReady { token, recs } => {
                debug!("PlayerCore: {} recommendations for {:?}", recs.tracks.len(), token);
                let step = self.nav.complete_fetch(token, recs);
                let empty = matches!(step, Step::Notice(_));
                self.apply_step(step).await;
                // Nothing follows a track that already ended.
                if empty && !self.driver.is_ready() && self.status != PlaybackStatus::Loading {
                    self.halt();
                }
                self.publish().await;
            }
            PlayerEvent::PaletteReady { url, palette } => self.on_palette(url, palette).await,
            PlayerEvent::HeartbeatTick => self.heartbeat().await,
        }
        true
    }

    async fn handle_command(&mut self, cmd: Command) -> anyhow::Result<()> {
        match cmd {
            Command::TogglePause => {
                let playing = !self.is_playing;
                self.set_playing(playing).await;
            }
            Command::Next => {
                let step = self.nav.next(&self.liked);
                self.apply_step(step).await;
            }
            Command::Prev => {
                let step = self.nav.previous(&self.liked);
                self.apply_step(step).await;
            }
            Command::SelectTrack { track } => {
                let step = self.nav.select_track(track);
                self.apply_step(step).await;
            }
            Command::TrackEnded => self.track_ended().await,
            Command::Volume { value } => {
                self.volume = value.min(100);
                self.publish().await;
                self.driver.set_volume(self.volume).await?;
            }
            Command::SeekTo { seconds } => self.seek_to(seconds).await?,
            Command::ToggleRepeat => {
                let notice = self.nav.toggle_repeat();
                self.notify(notice);
            }
            Command::ToggleAutoplay => {
                let notice = self.nav.toggle_autoplay();
                self.notify(notice);
            }
            Command::ToggleLike => self.toggle_like(),
            Command::RemoveLiked { id } => {
                if self.liked_store.remove(&id) {
                    self.liked = self.liked_store.list();
                    self.notify(Notice::info("Removed from liked songs"));
                }
            }
        }
        self.publish().await;
        Ok(())
    }

    // ── navigation ────────────────────────────────────────────────────────────

    async fn apply_step(&mut self, step: Step) {
        match step {
            Step::Play { track, notice } => {
                if let Some(n) = notice {
                    self.notify(n);
                }
                self.load_track(track, true).await;
            }
            Step::Restart => {
                let current = self.nav.current().clone();
                self.load_track(current, true).await;
            }
            Step::Stop => {
                // mpv unloads the file at EOF; re-cue it paused at zero.
                let current = self.nav.current().clone();
                self.load_track(current, false).await;
            }
            Step::Fetch(req) => {
                let catalog = Arc::clone(&self.catalog);
                let tx = self.event_tx.clone();
                tokio::spawn(async move {
                    let recs = fetch_recommendations(catalog.as_ref(), &req.seed, &req.played).await;
                    let _ = tx
                        .send(PlayerEvent::RecommendationsReady {
                            token: req.token,
                            recs,
                        })
                        .await;
                });
            }
            Step::Notice(n) => self.notify(n),
            Step::Ignored => {}
        }
    }

    async fn track_ended(&mut self) {
        let step = self.nav.on_track_ended(&self.liked);
        let stops = matches!(step, Step::Notice(_) | Step::Ignored);
        self.apply_step(step).await;
        if stops {
            self.halt();
        }
    }

    /// Stop after an end that nothing follows: a still-cued track pauses, an
    /// unloaded one shows as idle until the next play reloads it.
    fn halt(&mut self) {
        self.is_playing = false;
        let intent = self.driver.set_playing(false);
        if self.driver.is_ready() {
            self.status = PlaybackStatus::Paused;
            self.spawn_intent(intent);
        } else if self.status != PlaybackStatus::Error {
            self.status = PlaybackStatus::Idle;
        }
    }

    // ── playback ──────────────────────────────────────────────────────────────

    /// Point the media element at `track` and record the play intent.
    async fn load_track(&mut self, track: Track, play: bool) {
        self.elapsed = 0.0;
        self.duration = 0.0;
        self.is_playing = play;
        self.request_palette(&track);

        let Some(url) = track.audio_url.clone() else {
            self.playback_error(&format!("no audio stream for {}", track.title)).await;
            return;
        };

        if !self.ensure_backend().await {
            self.playback_error("mpv is not available").await;
            return;
        }

        self.status = PlaybackStatus::Loading;
        self.publish().await;

        info!("PlayerCore: loading {} ({})", track.label(), track.id);
        if let Err(e) = self.driver.load(&url).await {
            self.playback_error(&format!("{:#}", e)).await;
            return;
        }
        // Not ready yet: this only records the intent.
        let intent = self.driver.set_playing(play);
        self.spawn_intent(intent);
    }

    async fn set_playing(&mut self, playing: bool) {
        self.is_playing = playing;
        if playing && !self.driver.is_ready() && self.status != PlaybackStatus::Loading {
            // Nothing cued (mpv died, or a previous load failed): start over.
            let current = self.nav.current().clone();
            self.load_track(current, true).await;
            return;
        }
        if self.driver.is_ready() {
            self.status = if playing {
                PlaybackStatus::Playing
            } else {
                PlaybackStatus::Paused
            };
        }
        let intent = self.driver.set_playing(playing);
        self.spawn_intent(intent);
    }

    fn spawn_intent(&self, intent: Option<PlaybackIntent<H::Backend>>) {
        let Some(intent) = intent else {
            return;
        };
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let outcome = intent.run().await;
            let _ = tx.send(PlayerEvent::PlayOutcome(outcome)).await;
        });
    }

    async fn seek_to(&mut self, seconds: f64) -> anyhow::Result<()> {
        if !(self.duration > 0.0) {
            debug!("PlayerCore: seek ignored, duration unknown");
            return Ok(());
        }
        if seconds >= self.duration {
            self.track_ended().await;
            return Ok(());
        }
        self.elapsed = seconds.max(0.0);
        self.publish().await;
        self.driver.sync_position(self.elapsed).await?;
        Ok(())
    }

    async fn playback_error(&mut self, reason: &str) {
        warn!("PlayerCore: playback error: {}", reason);
        self.status = PlaybackStatus::Error;
        self.is_playing = false;
        let _ = self.driver.set_playing(false);
        self.notify(Notice::error(format!("Audio Error: {}", reason)));
        self.publish().await;
    }

    // ── likes ────────────────────────────────────────────────────────────────

    fn toggle_like(&mut self) {
        let current = self.nav.current().clone();
        if self.liked_store.is_liked(&current) {
            self.liked_store.remove(&current.id);
            self.notify(Notice::info(format!("Removed {} from liked songs", current.title)));
        } else {
            self.liked_store.add(&current);
            self.notify(Notice::success(format!("Added {} to liked songs", current.title)));
        }
        self.liked = self.liked_store.list();
    }

    // ── theming ──────────────────────────────────────────────────────────────

    fn request_palette(&mut self, track: &Track) {
        if self.last_poster.as_deref() == Some(track.poster.as_str()) {
            return;
        }
        self.last_poster = Some(track.poster.clone());

        if let Some(theme) = self.palette_cache.get(&track.poster) {
            self.theme = theme.clone();
            return;
        }

        let http = self.http.clone();
        let tx = self.event_tx.clone();
        let url = track.poster.clone();
        let timeout = Duration::from_secs(self.config.theme.palette_timeout_secs);
        tokio::spawn(async move {
            let palette = palette::extract(&http, &url, timeout).await;
            let _ = tx.send(PlayerEvent::PaletteReady { url, palette }).await;
        });
    }

    async fn on_palette(&mut self, url: String, palette: Palette) {
        let theme = palette.theme();
        // Fallbacks are not cached so a later visit can retry.
        if !palette.is_fallback() {
            self.palette_cache.insert(url.clone(), theme.clone());
        }
        if self.last_poster.as_deref() == Some(url.as_str()) {
            self.theme = theme;
            self.publish().await;
        } else {
            debug!("PlayerCore: palette for {} arrived after track change", url);
        }
    }

    // ── mpv ──────────────────────────────────────────────────────────────────

    async fn handle_mpv_event(&mut self, evt: MpvEvent) {
        let Some(media) = self.driver.translate(&evt) else {
            return;
        };
        match media {
            MediaEvent::TimeUpdate { position, duration } => {
                self.elapsed = position;
                self.duration = duration;
                self.publish().await;
            }
            MediaEvent::Ready => {
                debug!("PlayerCore: media ready");
                let intent = self.driver.on_ready();
                self.status = if self.is_playing {
                    PlaybackStatus::Playing
                } else {
                    PlaybackStatus::Paused
                };
                self.spawn_intent(intent);
                self.publish().await;
            }
            MediaEvent::Ended => {
                info!("PlayerCore: track ended");
                self.track_ended().await;
                self.publish().await;
            }
            MediaEvent::Error(reason) => self.playback_error(&reason).await,
        }
    }

    async fn set_mpv_health(&mut self, health: MpvHealth) {
        if self.mpv_health != health {
            info!("PlayerCore: mpv health {:?} → {:?}", self.mpv_health, health);
            self.mpv_health = health;
            self.publish().await;
        }
    }

    /// Connect the media backend unless one is attached.
    async fn ensure_backend(&mut self) -> bool {
        if self.backend.is_some() {
            return true;
        }

        // One forwarder per connection.
        let (mpv_tx, mut mpv_rx) = mpsc::channel::<MpvEvent>(64);
        let core_tx = self.event_tx.clone();
        tokio::spawn(async move {
            while let Some(evt) = mpv_rx.recv().await {
                if core_tx.send(PlayerEvent::Mpv(evt)).await.is_err() {
                    break;
                }
            }
        });

        self.set_mpv_health(MpvHealth::Starting).await;
        let backend = match self.host.connect(mpv_tx).await {
            Ok(b) => b,
            Err(e) => {
                warn!("PlayerCore: failed to start mpv: {:#}", e);
                self.set_mpv_health(MpvHealth::Dead).await;
                return false;
            }
        };

        self.driver.attach(backend.clone());
        if let Err(e) = self.driver.set_volume(self.volume).await {
            warn!("PlayerCore: initial volume failed: {:#}", e);
        }
        self.backend = Some(backend);
        self.set_mpv_health(MpvHealth::Running).await;
        true
    }

    async fn heartbeat(&mut self) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };
        if self.host.is_alive(backend).await {
            return;
        }
        warn!("PlayerCore: heartbeat: mpv is gone");
        self.backend = None;
        self.driver.detach();
        if self.is_playing {
            self.status = PlaybackStatus::Error;
            self.is_playing = false;
        }
        self.set_mpv_health(MpvHealth::Dead).await;
        self.notify(Notice::warning("mpv stopped, press space to restart playback"));
        self.publish().await;
    }

    // ── publishing ───────────────────────────────────────────────────────────

    fn notify(&self, notice: Notice) {
        debug!("PlayerCore: notice {:?}", notice);
        let _ = self.broadcast_tx.send(BroadcastMessage::Notice(notice));
    }

    async fn publish(&self) {
        let current = self.nav.current().clone();
        let queue = self.nav.queue();
        let history_len = self.nav.history().len();
        let loading_next = self.nav.is_loading();
        let repeat = self.nav.repeat();
        let autoplay = self.nav.autoplay();
        self.state_manager
            .update(|s| {
                s.current = current;
                s.is_playing = self.is_playing;
                s.status = self.status.clone();
                s.elapsed_secs = self.elapsed;
                s.duration_secs = self.duration;
                s.volume = self.volume;
                s.repeat = repeat;
                s.autoplay = autoplay;
                s.liked = self.liked.clone();
                s.queue = queue;
                s.history_len = history_len;
                s.loading_next = loading_next;
                s.theme = self.theme.clone();
                s.mpv_health = self.mpv_health.clone();
            })
            .await;
        let _ = self.broadcast_tx.send(BroadcastMessage::StateUpdated);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::testing::{mpv, FakeBackend};
    use crate::mpv::{OBS_DURATION, OBS_TIME_POS};
    use image::{ImageFormat, Rgba, RgbaImage};
    use serde_json::json;
    use std::io::Cursor;

    /// Nothing listens here, so catalog and cover requests fail at once.
    const DEAD_HOST: &str = "http://127.0.0.1:9";

    struct FakeHost {
        backend: FakeBackend,
    }

    impl MediaHost for FakeHost {
        type Backend = FakeBackend;

        async fn connect(&mut self, _events: mpsc::Sender<MpvEvent>) -> anyhow::Result<FakeBackend> {
            Ok(self.backend.clone())
        }

        async fn is_alive(&mut self, _backend: &FakeBackend) -> bool {
            true
        }

        async fn shutdown(&mut self) {}
    }

    struct Harness {
        core: PlayerCore<FakeHost>,
        backend: FakeBackend,
        events: mpsc::Receiver<PlayerEvent>,
        broadcasts: broadcast::Receiver<BroadcastMessage>,
        _dir: tempfile::TempDir,
    }

    impl Harness {
        fn new(liked: &[Track], autoplay: bool, repeat: bool) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let mut config = Config::default();
            config.paths.liked_file = dir.path().join("liked.json");
            config.playback.autoplay = autoplay;
            config.playback.repeat = repeat;
            config.catalog.base_url = DEAD_HOST.to_string();
            config.catalog.request_timeout_secs = 2;

            let store = LikedStore::new(config.paths.liked_file.clone());
            for track in liked {
                store.add(track);
            }

            let backend = FakeBackend::default();
            let (broadcast_tx, broadcasts) = broadcast::channel(1024);
            let (event_tx, events) = mpsc::channel(256);
            let catalog = Arc::new(CatalogClient::new(&config.catalog));
            let host = FakeHost {
                backend: backend.clone(),
            };
            let core = PlayerCore::new(config, host, catalog, broadcast_tx, event_tx);
            Self {
                core,
                backend,
                events,
                broadcasts,
                _dir: dir,
            }
        }

        async fn command(&mut self, cmd: Command) {
            assert!(self.core.handle_event(PlayerEvent::Command(cmd)).await);
        }

        async fn mpv_event(&mut self, raw: serde_json::Value) {
            self.core.handle_event(PlayerEvent::Mpv(mpv(raw))).await;
        }

        async fn progress(&mut self, position: f64, duration: f64) {
            self.mpv_event(json!({"event": "property-change", "id": OBS_DURATION, "data": duration}))
                .await;
            self.mpv_event(json!({"event": "property-change", "id": OBS_TIME_POS, "data": position}))
                .await;
        }

        /// Select `track` and let mpv report it started and loaded.
        async fn play(&mut self, track: Track) {
            self.command(Command::SelectTrack { track }).await;
            self.mpv_event(json!({"event": "start-file"})).await;
            self.mpv_event(json!({"event": "file-loaded"})).await;
            self.settle().await;
        }

        /// Handle what spawned tasks report until the channel goes quiet.
        async fn settle(&mut self) {
            while let Ok(Some(evt)) =
                tokio::time::timeout(Duration::from_millis(100), self.events.recv()).await
            {
                self.core.handle_event(evt).await;
            }
        }

        async fn await_recommendations(&mut self) {
            loop {
                let evt = tokio::time::timeout(Duration::from_secs(10), self.events.recv())
                    .await
                    .expect("recommendation fetch finished")
                    .expect("core channel open");
                let done = matches!(evt, PlayerEvent::RecommendationsReady { .. });
                self.core.handle_event(evt).await;
                if done {
                    return;
                }
            }
        }

        async fn state(&self) -> PlayerState {
            self.core.state_manager.get_state().await
        }

        fn notices(&mut self) -> Vec<String> {
            let mut out = Vec::new();
            loop {
                match self.broadcasts.try_recv() {
                    Ok(BroadcastMessage::Notice(n)) => out.push(n.message),
                    Ok(BroadcastMessage::StateUpdated) => {}
                    Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                    Err(_) => return out,
                }
            }
        }
    }

    fn t(id: &str) -> Track {
        Track {
            id: id.to_string(),
            title: format!("Song {id}"),
            artist: "Artist".to_string(),
            album: "Album".to_string(),
            duration: "3:00".to_string(),
            poster: String::new(),
            audio_url: Some(format!("https://media.test/{id}.mp4")),
            colors: ThemeColors::default(),
        }
    }

    fn load_of(id: &str) -> String {
        format!("load https://media.test/{id}.mp4")
    }

    fn solid(color: Rgba<u8>) -> Palette {
        let img = RgbaImage::from_pixel(8, 8, color);
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        palette::palette_from_bytes(&out.into_inner()).unwrap()
    }

    fn eof() -> serde_json::Value {
        json!({"event": "end-file", "reason": "eof"})
    }

    #[tokio::test]
    async fn test_play_waits_for_file_loaded() {
        let mut h = Harness::new(&[], false, false);
        h.command(Command::SelectTrack { track: t("a") }).await;
        assert_eq!(h.state().await.status, PlaybackStatus::Loading);
        assert_eq!(h.backend.count("pause false"), 0);

        h.mpv_event(json!({"event": "start-file"})).await;
        h.mpv_event(json!({"event": "file-loaded"})).await;
        h.settle().await;
        let state = h.state().await;
        assert_eq!(state.status, PlaybackStatus::Playing);
        assert!(state.is_playing);
        assert_eq!(h.backend.count("pause false"), 1);
        assert!(h.notices().contains(&"Now playing: Song a by Artist".to_string()));
    }

    #[tokio::test]
    async fn test_repeat_restart_resets_elapsed() {
        let mut h = Harness::new(&[], false, true);
        h.play(t("a")).await;
        h.progress(42.0, 180.0).await;
        assert_eq!(h.state().await.elapsed_secs, 42.0);

        h.mpv_event(eof()).await;
        let state = h.state().await;
        assert_eq!(state.current.id, "a");
        assert_eq!(state.elapsed_secs, 0.0);
        assert_eq!(state.duration_secs, 0.0);
        assert!(state.is_playing);
        assert_eq!(h.backend.count(&load_of("a")), 2);
    }

    #[tokio::test]
    async fn test_stop_recues_paused_at_zero() {
        let mut h = Harness::new(&[], false, false);
        h.play(t("a")).await;
        h.progress(170.0, 180.0).await;

        h.mpv_event(eof()).await;
        let state = h.state().await;
        assert_eq!(state.elapsed_secs, 0.0);
        assert!(!state.is_playing);
        assert_eq!(h.backend.count(&load_of("a")), 2);

        h.mpv_event(json!({"event": "start-file"})).await;
        h.mpv_event(json!({"event": "file-loaded"})).await;
        h.settle().await;
        assert_eq!(h.state().await.status, PlaybackStatus::Paused);
        assert_eq!(h.backend.count("pause false"), 1);
    }

    #[tokio::test]
    async fn test_seek_needs_duration_and_past_end_advances() {
        let mut h = Harness::new(&[t("a"), t("b")], false, false);
        h.play(t("a")).await;

        h.command(Command::SeekTo { seconds: 30.0 }).await;
        assert_eq!(h.backend.count("seek"), 0);

        h.progress(10.0, 180.0).await;
        h.command(Command::SeekTo { seconds: 60.0 }).await;
        assert!(h.backend.calls().contains(&"seek 60".to_string()));
        assert_eq!(h.state().await.elapsed_secs, 60.0);

        h.command(Command::SeekTo { seconds: 180.0 }).await;
        let state = h.state().await;
        assert_eq!(state.current.id, "b");
        assert_eq!(state.elapsed_secs, 0.0);
        assert_eq!(h.backend.count(&load_of("b")), 1);
        assert!(h.core.nav.played().contains("a"));
    }

    #[tokio::test]
    async fn test_media_error_forces_pause_and_play_reloads() {
        let mut h = Harness::new(&[], false, false);
        h.play(t("a")).await;
        assert!(h.state().await.is_playing);
        h.notices();

        h.mpv_event(json!({"event": "end-file", "reason": "error", "file_error": "loading failed"}))
            .await;
        let state = h.state().await;
        assert!(!state.is_playing);
        assert_eq!(state.status, PlaybackStatus::Error);
        assert!(h.notices().contains(&"Audio Error: loading failed".to_string()));

        h.command(Command::TogglePause).await;
        assert_eq!(h.backend.count("pause false"), 1);
        assert_eq!(h.backend.count(&load_of("a")), 2);
        assert_eq!(h.state().await.status, PlaybackStatus::Loading);
    }

    #[tokio::test]
    async fn test_rejected_play_forces_pause() {
        let mut h = Harness::new(&[], false, false);
        *h.backend.fail_pause.lock().unwrap() = true;
        h.play(t("a")).await;

        let state = h.state().await;
        assert!(!state.is_playing);
        assert_eq!(state.status, PlaybackStatus::Error);
        assert!(h.notices().contains(&"Audio Error: not allowed".to_string()));
    }

    #[tokio::test]
    async fn test_end_without_recommendations_goes_idle() {
        let mut h = Harness::new(&[], true, false);
        h.play(t("a")).await;

        h.mpv_event(eof()).await;
        assert!(h.state().await.loading_next);
        h.await_recommendations().await;

        let state = h.state().await;
        assert!(!state.loading_next);
        assert!(!state.is_playing);
        assert_eq!(state.status, PlaybackStatus::Idle);
        assert!(h.notices().contains(&"No more recommendations available".to_string()));

        // mpv is idle: play has to load the track again.
        h.command(Command::TogglePause).await;
        assert_eq!(h.backend.count("pause false"), 1);
        assert_eq!(h.backend.count(&load_of("a")), 2);
    }

    #[tokio::test]
    async fn test_end_during_fetch_goes_idle() {
        let mut h = Harness::new(&[], true, false);
        h.play(t("a")).await;
        h.command(Command::Next).await;
        assert!(h.state().await.loading_next);

        h.mpv_event(eof()).await;
        let state = h.state().await;
        assert!(!state.is_playing);
        assert_eq!(state.status, PlaybackStatus::Idle);
        assert!(h.core.nav.played().contains("a"));
    }

    #[tokio::test]
    async fn test_end_of_previous_file_does_not_skip_new_track() {
        let mut h = Harness::new(&[t("a"), t("b"), t("c")], false, false);
        h.play(t("a")).await;
        h.command(Command::SelectTrack { track: t("b") }).await;

        // Queued for "a" before mpv switched files.
        h.mpv_event(eof()).await;
        h.mpv_event(json!({"event": "file-loaded"})).await;
        let state = h.state().await;
        assert_eq!(state.current.id, "b");
        assert_eq!(state.status, PlaybackStatus::Loading);
        assert_eq!(h.backend.count(&load_of("c")), 0);
        assert!(!h.core.nav.played().contains("a"));
    }

    #[tokio::test]
    async fn test_like_toggle_resyncs_liked_list() {
        let mut h = Harness::new(&[t("a")], false, false);
        assert_eq!(h.state().await.current.id, "a");

        h.command(Command::ToggleLike).await;
        assert!(h.state().await.liked.is_empty());
        assert!(h.notices().contains(&"Removed Song a from liked songs".to_string()));

        h.command(Command::ToggleLike).await;
        let liked: Vec<String> = h.state().await.liked.into_iter().map(|t| t.id).collect();
        assert_eq!(liked, vec!["a"]);
        assert!(h.notices().contains(&"Added Song a to liked songs".to_string()));

        h.command(Command::RemoveLiked { id: "a".to_string() }).await;
        assert!(h.state().await.liked.is_empty());
        assert_eq!(h.core.liked_store.list(), Vec::<Track>::new());
    }

    #[tokio::test]
    async fn test_late_palette_is_cached_but_not_applied() {
        let mut h = Harness::new(&[], false, false);
        let mut a = t("a");
        a.poster = format!("{DEAD_HOST}/a.jpg");
        let mut b = t("b");
        b.poster = format!("{DEAD_HOST}/b.jpg");

        h.command(Command::SelectTrack { track: a.clone() }).await;
        h.command(Command::SelectTrack { track: b }).await;
        let before = h.state().await.theme;

        let red = solid(Rgba([200, 40, 40, 255]));
        h.core
            .handle_event(PlayerEvent::PaletteReady {
                url: a.poster.clone(),
                palette: red.clone(),
            })
            .await;
        assert_eq!(h.state().await.theme, before);

        h.command(Command::SelectTrack { track: a }).await;
        assert_eq!(h.state().await.theme, red.theme());
    }

    #[tokio::test]
    async fn test_shutdown_stops_the_loop() {
        let mut h = Harness::new(&[], false, false);
        assert!(!h.core.handle_event(PlayerEvent::Shutdown).await);
    }
}
