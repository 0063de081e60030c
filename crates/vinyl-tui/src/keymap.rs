//! Global keyboard shortcuts.
//!
//! `map_key` turns a key press into an action given a little playback
//! context. Every shortcut is suppressed while a text input has focus.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use vinyl_proto::protocol::Command;

use crate::action::Action;

pub const VOLUME_STEP: u8 = 5;
pub const SEEK_STEP: f64 = 5.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct KeyContext {
    pub input_focused: bool,
    pub elapsed: f64,
    pub duration: f64,
    pub volume: u8,
}

pub fn map_key(key: KeyEvent, ctx: &KeyContext) -> Option<Action> {
    if key.kind == KeyEventKind::Release || ctx.input_focused {
        return None;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let send = |cmd| Some(Action::SendCommand(cmd));

    match key.code {
        KeyCode::Char('k') | KeyCode::Char('K') if ctrl => Some(Action::OpenSearch),
        KeyCode::Char('c') if ctrl => Some(Action::Quit),
        _ if ctrl => None,

        KeyCode::Char(' ') => send(Command::TogglePause),
        KeyCode::Up => send(Command::Volume {
            value: ctx.volume.saturating_add(VOLUME_STEP).min(100),
        }),
        KeyCode::Down => send(Command::Volume {
            value: ctx.volume.saturating_sub(VOLUME_STEP),
        }),
        KeyCode::Left if ctx.duration > 0.0 => send(Command::SeekTo {
            seconds: (ctx.elapsed - SEEK_STEP).max(0.0),
        }),
        KeyCode::Right if ctx.duration > 0.0 => {
            let target = ctx.elapsed + SEEK_STEP;
            if target >= ctx.duration {
                send(Command::TrackEnded)
            } else {
                send(Command::SeekTo { seconds: target })
            }
        }
        KeyCode::Char(',') => send(Command::Prev),
        KeyCode::Char('.') => send(Command::Next),
        KeyCode::Char('a') | KeyCode::Char('A') => send(Command::ToggleAutoplay),
        KeyCode::Char('l') => send(Command::ToggleLike),
        KeyCode::Char('r') => send(Command::ToggleRepeat),
        KeyCode::Char('p') => Some(Action::ToggleSidebar),
        KeyCode::Char('?') => Some(Action::ToggleHelp),
        KeyCode::Char('q') => Some(Action::Quit),
        _ => None,
    }
}
