//! NowPlaying: the main player surface: spinning disc, track details,
//! progress and control state, tinted with the artwork palette.

use std::f64::consts::TAU;

use ratatui::crossterm::event::KeyEvent;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use vinyl_proto::protocol::{PlaybackStatus, PlayerState};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{
        backgrounds, style_muted, style_secondary, C_DISC, C_DISC_GROOVE, C_ERROR, C_LIKED, C_LOADING,
        C_PLAYING, C_PRIMARY,
    },
    widgets::progress_bar::draw_progress,
};

/// Radians the disc turns per UI tick.
const SPIN_STEP: f64 = 0.35;
/// Angular width of the glare on the disc.
const GLARE_ARC: f64 = 0.7;
const LABEL_RADIUS: f64 = 0.32;
const SPINDLE_RADIUS: f64 = 0.12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscCell {
    Empty,
    Vinyl,
    Glare,
    Label,
    Spindle,
}

/// Classify one cell of a `w`×`h` disc. Cells are about twice as tall as
/// they are wide, so x is halved to keep the disc round.
pub fn disc_cell(x: u16, y: u16, w: u16, h: u16, phase: f64) -> DiscCell {
    let cx = f64::from(w) / 2.0;
    let cy = f64::from(h) / 2.0;
    let dx = (f64::from(x) + 0.5 - cx) / cx;
    let dy = (f64::from(y) + 0.5 - cy) / cy;
    let r = (dx * dx + dy * dy).sqrt();
    if r > 1.0 {
        return DiscCell::Empty;
    }
    if r < SPINDLE_RADIUS {
        return DiscCell::Spindle;
    }
    if r < LABEL_RADIUS {
        return DiscCell::Label;
    }
    let angle = (dy.atan2(dx) - phase).rem_euclid(TAU);
    if angle < GLARE_ARC {
        DiscCell::Glare
    } else {
        DiscCell::Vinyl
    }
}

fn status_label(player: &PlayerState) -> Span<'static> {
    if let Some(badge) = player.mpv_health.badge_label() {
        return Span::styled(format!("mpv {}", badge), Style::default().fg(C_ERROR));
    }
    match player.status {
        PlaybackStatus::Playing => Span::styled("▶ playing", Style::default().fg(C_PLAYING)),
        PlaybackStatus::Paused => Span::styled("⏸ paused", style_secondary()),
        PlaybackStatus::Loading => Span::styled("… loading", Style::default().fg(C_LOADING)),
        PlaybackStatus::Error => Span::styled("✗ error", Style::default().fg(C_ERROR)),
        PlaybackStatus::Idle => Span::styled("■ stopped", style_muted()),
    }
}

fn toggle_span(label: &str, on: bool) -> Span<'static> {
    let style = if on {
        Style::default().fg(C_PLAYING).add_modifier(Modifier::BOLD)
    } else {
        style_muted()
    };
    Span::styled(format!("{} {}", label, if on { "on" } else { "off" }), style)
}

pub struct NowPlaying;

impl NowPlaying {
    pub fn new() -> Self {
        Self
    }

    fn draw_disc(&self, frame: &mut Frame, area: Rect, state: &AppState, accent: Color) {
        let phase = state.spin_frame as f64 * SPIN_STEP;
        let lines: Vec<Line> = (0..area.height)
            .map(|y| {
                let spans: Vec<Span> = (0..area.width)
                    .map(|x| match disc_cell(x, y, area.width, area.height, phase) {
                        DiscCell::Empty => Span::raw(" "),
                        DiscCell::Vinyl => Span::styled("█", Style::default().fg(C_DISC)),
                        DiscCell::Glare => Span::styled("█", Style::default().fg(C_DISC_GROOVE)),
                        DiscCell::Label => Span::styled("█", Style::default().fg(accent)),
                        DiscCell::Spindle => Span::styled("●", Style::default().fg(C_DISC).bg(accent)),
                    })
                    .collect();
                Line::from(spans)
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_details(&self, frame: &mut Frame, area: Rect, state: &AppState) {
        let player = &state.player;
        let track = &player.current;

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(0),
                Constraint::Length(1), // title
                Constraint::Length(1), // artist
                Constraint::Length(1), // album
                Constraint::Length(1),
                Constraint::Length(1), // status
                Constraint::Length(1), // progress
                Constraint::Length(1), // controls
                Constraint::Length(1), // up next
                Constraint::Min(0),
            ])
            .split(area);

        let liked = if player.is_current_liked() {
            Span::styled("  ♥", Style::default().fg(C_LIKED))
        } else {
            Span::styled("  ♡", style_muted())
        };
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(
                    track.title.clone(),
                    Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
                ),
                liked,
            ])),
            rows[1],
        );
        frame.render_widget(Paragraph::new(Span::styled(track.artist.clone(), style_secondary())), rows[2]);
        frame.render_widget(Paragraph::new(Span::styled(track.album.clone(), style_muted())), rows[3]);

        frame.render_widget(Paragraph::new(Line::from(status_label(player))), rows[5]);

        draw_progress(
            frame,
            rows[6],
            player.progress_percent(),
            player.elapsed_secs,
            player.duration_secs,
        );

        let sep = || Span::styled("   ", Style::default());
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                toggle_span("autoplay", player.autoplay),
                sep(),
                toggle_span("repeat", player.repeat),
                sep(),
                Span::styled(format!("vol {}%", player.volume), style_secondary()),
            ])),
            rows[7],
        );

        let next = if player.loading_next {
            Some(Span::styled("finding what's next…", Style::default().fg(C_LOADING)))
        } else if player.autoplay {
            player
                .queue
                .first()
                .map(|t| Span::styled(format!("up next: {}", t.label()), style_muted()))
        } else {
            None
        };
        if let Some(span) = next {
            frame.render_widget(Paragraph::new(Line::from(span)), rows[8]);
        }
    }
}

impl Default for NowPlaying {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for NowPlaying {
    fn id(&self) -> ComponentId {
        ComponentId::NowPlaying
    }

    fn handle_key(&mut self, _key: KeyEvent, _state: &AppState) -> Vec<Action> {
        vec![]
    }

    fn on_action(&mut self, _action: &Action, _state: &AppState) -> Vec<Action> {
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, _focused: bool, state: &AppState) {
        let (primary, secondary, accent) = backgrounds(&state.player.theme);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(accent))
            .style(Style::default().bg(primary));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let disc_h = inner.height.saturating_sub(2).min(16);
        let disc_w = disc_h * 2;
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(disc_w),
                Constraint::Length(3),
                Constraint::Min(20),
                Constraint::Length(2),
            ])
            .split(inner);

        let disc_area = Rect {
            y: cols[1].y + (cols[1].height.saturating_sub(disc_h)) / 2,
            height: disc_h,
            ..cols[1]
        };
        self.draw_disc(frame, disc_area, state, secondary);
        self.draw_details(frame, cols[3], state);
    }
}
