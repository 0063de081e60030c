//! Action enum: every user intent the UI can raise.

use vinyl_proto::protocol::Command;
use vinyl_proto::track::Track;

/// Unique identifier for a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    NowPlaying,
    LikedSidebar,
    SearchModal,
    HelpOverlay,
}

/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone)]
pub enum Action {
    /// Forward to the player core.
    SendCommand(Command),

    // ── Search ───────────────────────────────────────────────────────────────
    OpenSearch,
    CloseSearch,
    /// The query text changed; the App debounces and runs the search.
    SearchChanged { seq: u64, query: String },
    /// Results for the search with this sequence number.
    SearchResults(u64, Vec<Track>),

    // ── UI toggles ───────────────────────────────────────────────────────────
    ToggleSidebar,
    ToggleHelp,

    Quit,
}
