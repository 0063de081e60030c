//! AppState: shared read-only data passed to all components during
//! render/event handling. Only the App event-loop writes to it.

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use vinyl_proto::protocol::{Notice, PlayerState};

/// Notices kept for the help overlay's "recent" section.
pub const NOTICE_LOG_CAP: usize = 50;

#[derive(Debug, Clone)]
pub struct LoggedNotice {
    pub at: DateTime<Local>,
    pub notice: Notice,
}

#[derive(Debug, Default)]
pub struct AppState {
    /// Latest snapshot published by the player core.
    pub player: PlayerState,

    // ── UI mode ─────────────────────────────────────────────────────────────
    pub show_sidebar: bool,
    pub show_search: bool,
    pub show_help: bool,

    /// Increments every UI tick while playing; drives the disc animation.
    pub spin_frame: u64,
    pub notices: VecDeque<LoggedNotice>,
}

impl AppState {
    pub fn log_notice(&mut self, notice: Notice) {
        self.notices.push_back(LoggedNotice {
            at: Local::now(),
            notice,
        });
        while self.notices.len() > NOTICE_LOG_CAP {
            self.notices.pop_front();
        }
    }

    /// True while a text input owns the keyboard.
    pub fn input_focused(&self) -> bool {
        self.show_search
    }
}
