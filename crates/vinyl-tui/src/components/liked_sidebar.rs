//! LikedSidebar: the liked-songs playlist.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};
use vinyl_proto::protocol::Command;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{style_border, style_muted, style_secondary, style_selected, C_LIKED, C_PLAYING, C_PRIMARY},
};

pub struct LikedSidebar {
    selected: usize,
    list_state: ListState,
}

impl LikedSidebar {
    pub fn new() -> Self {
        Self {
            selected: 0,
            list_state: ListState::default(),
        }
    }

    fn clamp(&mut self, len: usize) {
        self.selected = self.selected.min(len.saturating_sub(1));
    }
}

impl Default for LikedSidebar {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for LikedSidebar {
    fn id(&self) -> ComponentId {
        ComponentId::LikedSidebar
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        let liked = &state.player.liked;
        self.clamp(liked.len());
        match key.code {
            KeyCode::Char('j') => {
                if self.selected + 1 < liked.len() {
                    self.selected += 1;
                }
                vec![]
            }
            KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
                vec![]
            }
            KeyCode::Enter => match liked.get(self.selected) {
                Some(track) => vec![Action::SendCommand(Command::SelectTrack {
                    track: track.clone(),
                })],
                None => vec![],
            },
            KeyCode::Char('d') => match liked.get(self.selected) {
                Some(track) => vec![Action::SendCommand(Command::RemoveLiked {
                    id: track.id.clone(),
                })],
                None => vec![],
            },
            _ => vec![],
        }
    }

    fn on_action(&mut self, action: &Action, state: &AppState) -> Vec<Action> {
        if let Action::ToggleSidebar = action {
            // Open on the playing track when it is liked.
            if let Some(idx) = state
                .player
                .liked
                .iter()
                .position(|t| t.id == state.player.current.id)
            {
                self.selected = idx;
            }
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let liked = &state.player.liked;
        self.clamp(liked.len());

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(style_border(focused))
            .title(Span::styled(format!(" ♥ liked ({}) ", liked.len()), Style::default().fg(C_LIKED)));

        if liked.is_empty() {
            let empty = ratatui::widgets::Paragraph::new(Line::from(Span::styled(
                " No songs in playlist",
                style_muted(),
            )))
            .block(block);
            frame.render_widget(empty, area);
            return;
        }

        let current_id = &state.player.current.id;
        let items: Vec<ListItem> = liked
            .iter()
            .map(|t| {
                let marker = if &t.id == current_id { "▶ " } else { "  " };
                let title_style = if &t.id == current_id {
                    Style::default().fg(C_PLAYING)
                } else {
                    Style::default().fg(C_PRIMARY)
                };
                ListItem::new(vec![
                    Line::from(vec![Span::styled(marker, title_style), Span::styled(t.title.clone(), title_style)]),
                    Line::from(Span::styled(format!("  {} · {}", t.artist, t.duration), style_secondary())),
                ])
            })
            .collect();

        self.list_state.select(Some(self.selected));
        let list = List::new(items).block(block).highlight_style(style_selected());
        frame.render_stateful_widget(list, area, &mut self.list_state);
    }
}
