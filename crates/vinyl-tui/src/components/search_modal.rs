//! SearchModal: catalog search popup opened with Ctrl+K.
//!
//! Every edit bumps a sequence number; the App debounces the query and
//! answers with `Action::SearchResults(seq, ..)`. Results for anything but
//! the latest sequence are dropped.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};
use vinyl_proto::protocol::Command;
use vinyl_proto::track::Track;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    components::help_overlay::centered_rect,
    theme::{style_border, style_muted, style_secondary, style_selected, C_BG, C_PRIMARY},
    widgets::search_input::{InputAction, SearchInput},
};

pub struct SearchModal {
    input: SearchInput,
    results: Vec<Track>,
    selected: usize,
    seq: u64,
    searching: bool,
    list_state: ListState,
}

impl SearchModal {
    pub fn new() -> Self {
        Self {
            input: SearchInput::new("search songs, artists, albums"),
            results: Vec::new(),
            selected: 0,
            seq: 0,
            searching: false,
            list_state: ListState::default(),
        }
    }

    fn reset(&mut self) {
        self.input.clear();
        self.results.clear();
        self.selected = 0;
        self.searching = false;
        // Anything still in flight is now stale.
        self.seq += 1;
    }
}

impl Default for SearchModal {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for SearchModal {
    fn id(&self) -> ComponentId {
        ComponentId::SearchModal
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        match key.code {
            KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
                return vec![];
            }
            KeyCode::Down => {
                if self.selected + 1 < self.results.len() {
                    self.selected += 1;
                }
                return vec![];
            }
            _ => {}
        }
        match self.input.handle_key(key) {
            InputAction::Cancelled => vec![Action::CloseSearch],
            InputAction::Confirmed => match self.results.get(self.selected) {
                Some(track) => vec![
                    Action::SendCommand(Command::SelectTrack {
                        track: track.clone(),
                    }),
                    Action::CloseSearch,
                ],
                None => vec![],
            },
            InputAction::Changed(query) => {
                self.seq += 1;
                self.selected = 0;
                if query.trim().is_empty() {
                    self.results.clear();
                    self.searching = false;
                    return vec![];
                }
                self.searching = true;
                vec![Action::SearchChanged {
                    seq: self.seq,
                    query,
                }]
            }
            InputAction::None => vec![],
        }
    }

    fn on_action(&mut self, action: &Action, _state: &AppState) -> Vec<Action> {
        match action {
            Action::OpenSearch | Action::CloseSearch => self.reset(),
            Action::SearchResults(seq, tracks) if *seq == self.seq => {
                self.results = tracks.clone();
                self.selected = 0;
                self.searching = false;
            }
            _ => {}
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, _state: &AppState) {
        let popup = centered_rect(70, 20.min(area.height), area);
        frame.render_widget(Clear, popup);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(style_border(focused))
            .title(Span::styled(" search ", Style::default().fg(C_PRIMARY)))
            .style(Style::default().bg(C_BG));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Min(0)])
            .split(inner);

        self.input.draw(frame, rows[0]);

        if self.results.is_empty() {
            let hint = if self.searching {
                " searching…"
            } else if self.input.text().trim().is_empty() {
                " type to search · enter plays · esc closes"
            } else {
                " no results"
            };
            frame.render_widget(Paragraph::new(Line::from(Span::styled(hint, style_muted()))), rows[2]);
            return;
        }

        let items: Vec<ListItem> = self
            .results
            .iter()
            .map(|t| {
                ListItem::new(Line::from(vec![
                    Span::styled(t.title.clone(), Style::default().fg(C_PRIMARY)),
                    Span::styled(format!("  {} · {} · {}", t.artist, t.album, t.duration), style_secondary()),
                ]))
            })
            .collect();
        self.list_state.select(Some(self.selected));
        frame.render_stateful_widget(
            List::new(items).highlight_style(style_selected()).highlight_symbol("▶ "),
            rows[2],
            &mut self.list_state,
        );
    }
}
