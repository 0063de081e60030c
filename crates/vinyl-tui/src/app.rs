//! App: component-based UI event loop.
//!
//! - `App` owns the components and `AppState`.
//! - A `tokio::mpsc` channel carries `AppMessage`s in from background tasks
//!   (terminal input, core broadcasts, search results).
//! - Components return `Vec<Action>`; App dispatches each Action.
//! - Commands for the player core go out as `PlayerEvent::Command`.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Paragraph},
    Terminal,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use vinyl_proto::catalog::CatalogClient;
use vinyl_proto::protocol::{Command, Notice, PlayerState};
use vinyl_proto::state::StateManager;
use vinyl_proto::track::Track;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    components::{
        help_overlay::HelpOverlay, liked_sidebar::LikedSidebar, now_playing::NowPlaying,
        search_modal::SearchModal,
    },
    core::PlayerEvent,
    keymap::{map_key, KeyContext},
    theme::{backgrounds, style_muted},
    widgets::toast::ToastManager,
    BroadcastMessage,
};

/// Quiet period after the last keystroke before a search is sent.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(400);
const SIDEBAR_WIDTH: u16 = 38;

// ── Internal event bus ────────────────────────────────────────────────────────

enum AppMessage {
    Event(Event),
    StateUpdated(PlayerState),
    Notice(Notice),
    SearchResults(u64, Vec<Track>),
}

/// Holds the latest query until it has been quiet for `SEARCH_DEBOUNCE`.
#[derive(Debug, Default)]
pub struct SearchDebounce {
    pending: Option<(u64, String, Instant)>,
}

impl SearchDebounce {
    pub fn schedule(&mut self, seq: u64, query: String, now: Instant) {
        self.pending = Some((seq, query, now));
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Take the pending query once it is due.
    pub fn due(&mut self, now: Instant) -> Option<(u64, String)> {
        match self.pending {
            Some((_, _, at)) if now.duration_since(at) >= SEARCH_DEBOUNCE => {
                self.pending.take().map(|(seq, query, _)| (seq, query))
            }
            _ => None,
        }
    }
}

pub struct App {
    state: AppState,
    state_manager: Arc<StateManager>,
    cmd_tx: mpsc::Sender<PlayerEvent>,
    catalog: Arc<CatalogClient>,
    msg_tx: Option<mpsc::Sender<AppMessage>>,

    now_playing: NowPlaying,
    liked_sidebar: LikedSidebar,
    search_modal: SearchModal,
    help_overlay: HelpOverlay,
    toast: ToastManager,

    search: SearchDebounce,
    should_quit: bool,
}

impl App {
    pub fn new(
        cmd_tx: mpsc::Sender<PlayerEvent>,
        state_manager: Arc<StateManager>,
        catalog: Arc<CatalogClient>,
    ) -> Self {
        Self {
            state: AppState::default(),
            state_manager,
            cmd_tx,
            catalog,
            msg_tx: None,
            now_playing: NowPlaying::new(),
            liked_sidebar: LikedSidebar::new(),
            search_modal: SearchModal::new(),
            help_overlay: HelpOverlay::new(),
            toast: ToastManager::new(),
            search: SearchDebounce::default(),
            should_quit: false,
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(mut self, mut broadcast_rx: broadcast::Receiver<BroadcastMessage>) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        let (tx, mut rx) = mpsc::channel::<AppMessage>(1024);
        self.msg_tx = Some(tx.clone());
        self.state.player = self.state_manager.get_state().await;

        // ── Background task: keyboard events ──────────────────────────────────
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Background task: broadcast receiver (PlayerCore → AppMessage) ─────
        let bc_tx = tx.clone();
        let bc_state_manager = Arc::clone(&self.state_manager);
        tokio::spawn(async move {
            loop {
                let msg = match broadcast_rx.recv().await {
                    Ok(BroadcastMessage::StateUpdated) => {
                        AppMessage::StateUpdated(bc_state_manager.get_state().await)
                    }
                    Ok(BroadcastMessage::Notice(notice)) => AppMessage::Notice(notice),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("broadcast receiver lagged by {} messages", n);
                        AppMessage::StateUpdated(bc_state_manager.get_state().await)
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if bc_tx.send(msg).await.is_err() {
                    break;
                }
            }
        });

        // Toast expiry, disc animation and search debounce.
        let mut ui_tick = tokio::time::interval(Duration::from_millis(100));
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            terminal.draw(|f| self.draw(f))?;

            tokio::select! {
                Some(msg) = rx.recv() => {
                    self.handle_message(msg).await;
                    // Drain whatever else is queued before the next frame.
                    while let Ok(next) = rx.try_recv() {
                        self.handle_message(next).await;
                    }
                }
                _ = ui_tick.tick() => self.on_tick().await,
            }

            if self.should_quit {
                break;
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        info!("app: quitting");
        let _ = self.cmd_tx.send(PlayerEvent::Shutdown).await;
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        Ok(())
    }

    async fn handle_message(&mut self, msg: AppMessage) {
        match msg {
            AppMessage::Event(Event::Key(key)) => {
                for action in self.handle_key(key) {
                    self.dispatch(action).await;
                }
            }
            AppMessage::Event(_) => {}
            AppMessage::StateUpdated(player) => {
                if player.rev < self.state.player.rev {
                    return;
                }
                if player.loading_next {
                    self.toast.spinner("Finding recommendations");
                } else {
                    self.toast.dismiss_spinner();
                }
                self.state.player = player;
            }
            AppMessage::Notice(notice) => {
                self.toast.notice(&notice);
                self.state.log_notice(notice);
            }
            AppMessage::SearchResults(seq, tracks) => {
                self.dispatch(Action::SearchResults(seq, tracks)).await;
            }
        }
    }

    async fn on_tick(&mut self) {
        self.toast.tick();
        if self.state.player.is_playing {
            self.state.spin_frame = self.state.spin_frame.wrapping_add(1);
        }
        if let Some((seq, query)) = self.search.due(Instant::now()) {
            self.spawn_search(seq, query);
        }
        let actions = self.search_modal.tick(&self.state);
        for action in actions {
            self.dispatch(action).await;
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return vec![Action::Quit];
        }
        if self.state.show_help {
            return self.help_overlay.handle_key(key, &self.state);
        }
        if self.state.show_search {
            return self.search_modal.handle_key(key, &self.state);
        }

        let ctx = KeyContext {
            input_focused: self.state.input_focused(),
            elapsed: self.state.player.elapsed_secs,
            duration: self.state.player.duration_secs,
            volume: self.state.player.volume,
        };
        if let Some(action) = map_key(key, &ctx) {
            return vec![action];
        }
        if self.state.show_sidebar {
            return self.liked_sidebar.handle_key(key, &self.state);
        }
        vec![]
    }

    async fn dispatch(&mut self, action: Action) {
        let secondary: Vec<Action> = {
            let s = &self.state;
            let mut out = Vec::new();
            out.extend(self.now_playing.on_action(&action, s));
            out.extend(self.liked_sidebar.on_action(&action, s));
            out.extend(self.search_modal.on_action(&action, s));
            out.extend(self.help_overlay.on_action(&action, s));
            out
        };

        self.apply_action(action).await;

        for a in secondary {
            self.apply_action(a).await;
        }
    }

    async fn apply_action(&mut self, action: Action) {
        match &action {
            Action::SearchResults(..) | Action::SearchChanged { .. } => {}
            _ => debug!("apply_action: {:?}", action),
        }
        match action {
            Action::SendCommand(cmd) => self.send_cmd(cmd).await,
            Action::OpenSearch => {
                self.state.show_search = true;
            }
            Action::CloseSearch => {
                self.state.show_search = false;
                self.search.cancel();
            }
            Action::SearchChanged { seq, query } => {
                self.search.schedule(seq, query, Instant::now());
            }
            Action::SearchResults(..) => {}
            Action::ToggleSidebar => {
                self.state.show_sidebar = !self.state.show_sidebar;
            }
            Action::ToggleHelp => {
                self.state.show_help = !self.state.show_help;
            }
            Action::Quit => {
                self.should_quit = true;
            }
        }
    }

    fn spawn_search(&self, seq: u64, query: String) {
        let Some(tx) = self.msg_tx.clone() else {
            return;
        };
        let catalog = Arc::clone(&self.catalog);
        tokio::spawn(async move {
            let tracks = catalog.search(&query).await;
            debug!("search #{} {:?}: {} results", seq, query, tracks.len());
            let _ = tx.send(AppMessage::SearchResults(seq, tracks)).await;
        });
    }

    async fn send_cmd(&self, cmd: Command) {
        if self.cmd_tx.send(PlayerEvent::Command(cmd)).await.is_err() {
            warn!("app: player core is gone");
        }
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        let area = frame.area();
        let (primary, _, _) = backgrounds(&self.state.player.theme);
        frame.render_widget(Block::default().style(Style::default().bg(primary)), area);

        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(area);

        let sidebar_w = if self.state.show_sidebar { SIDEBAR_WIDTH } else { 0 };
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(sidebar_w)])
            .split(outer[0]);

        let focused = self.focused();
        let player_focused = focused == self.now_playing.id();
        self.now_playing.draw(frame, body[0], player_focused, &self.state);
        if self.state.show_sidebar {
            let sidebar_focused = focused == self.liked_sidebar.id();
            self.liked_sidebar.draw(frame, body[1], sidebar_focused, &self.state);
        }

        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                " space play/pause · , . prev/next · ctrl+k search · p liked · ? help · q quit",
                style_muted(),
            ))),
            outer[1],
        );

        if self.state.show_search {
            let modal_focused = focused == self.search_modal.id();
            self.search_modal.draw(frame, area, modal_focused, &self.state);
        }
        if self.state.show_help {
            let help_focused = focused == self.help_overlay.id();
            self.help_overlay.draw(frame, area, help_focused, &self.state);
        }

        // Toasts are the topmost layer.
        self.toast.draw(frame, area);
    }

    /// The component that receives keys the global keymap leaves alone.
    fn focused(&self) -> ComponentId {
        if self.state.show_help {
            ComponentId::HelpOverlay
        } else if self.state.show_search {
            ComponentId::SearchModal
        } else if self.state.show_sidebar {
            ComponentId::LikedSidebar
        } else {
            ComponentId::NowPlaying
        }
    }
}
