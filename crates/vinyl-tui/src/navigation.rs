//! Playback navigation: what plays next or previous.
//!
//! `Navigator` is synchronous and does no I/O. Each transition returns a
//! [`Step`] that the core turns into media commands, notices or a spawned
//! recommendation fetch. The liked list is owned by the liked store and
//! passed in per call.
//!
//! With autoplay off, next/previous walk the liked list circularly. With
//! autoplay on they walk a queue/history pair; an empty queue triggers a
//! recommendation fetch. Only one fetch is outstanding at a time, and a
//! fetch result is dropped if the current track changed since it started.
//!
//! Invariant: neither the queue nor the history holds the current track.

use std::collections::VecDeque;

use tracing::debug;
use vinyl_proto::protocol::Notice;
use vinyl_proto::recommend::{PlayedSet, Recommendations};
use vinyl_proto::track::Track;

/// Identifies the generation a recommendation fetch was started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchToken(u64);

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub token: FetchToken,
    pub seed: Track,
    pub played: PlayedSet,
}

#[derive(Debug, Clone)]
pub enum Step {
    /// Load and play this track from the start.
    Play { track: Track, notice: Option<Notice> },
    /// Replay the current track from zero.
    Restart,
    /// Pause and rewind to zero.
    Stop,
    /// Fetch recommendations, then call [`Navigator::complete_fetch`].
    Fetch(FetchRequest),
    /// Nothing changes; tell the user why.
    Notice(Notice),
    /// Nothing changes.
    Ignored,
}

#[derive(Debug)]
pub struct Navigator {
    current: Track,
    autoplay: bool,
    repeat: bool,
    queue: VecDeque<Track>,
    history: Vec<Track>,
    played: PlayedSet,
    loading: Option<FetchToken>,
    generation: u64,
    initialized: bool,
}

impl Navigator {
    pub fn new(autoplay: bool, repeat: bool) -> Self {
        Self {
            current: Track::default_track(),
            autoplay,
            repeat,
            queue: VecDeque::new(),
            history: Vec::new(),
            played: PlayedSet::new(),
            loading: None,
            generation: 0,
            initialized: false,
        }
    }

    pub fn current(&self) -> &Track {
        &self.current
    }

    pub fn autoplay(&self) -> bool {
        self.autoplay
    }

    pub fn repeat(&self) -> bool {
        self.repeat
    }

    pub fn queue(&self) -> Vec<Track> {
        self.queue.iter().cloned().collect()
    }

    pub fn history(&self) -> &[Track] {
        &self.history
    }

    pub fn played(&self) -> &PlayedSet {
        &self.played
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Adopt the first liked track as current, once per session.
    pub fn initialize(&mut self, liked: &[Track]) -> Option<&Track> {
        if self.initialized {
            return None;
        }
        self.initialized = true;
        let first = liked.first()?.clone();
        self.set_current(first);
        Some(&self.current)
    }

    pub fn toggle_autoplay(&mut self) -> Notice {
        self.autoplay = !self.autoplay;
        Notice::info(if self.autoplay {
            "Autoplay enabled"
        } else {
            "Autoplay disabled"
        })
    }

    pub fn toggle_repeat(&mut self) -> Notice {
        self.repeat = !self.repeat;
        Notice::info(if self.repeat { "Repeat on" } else { "Repeat off" })
    }

    pub fn next(&mut self, liked: &[Track]) -> Step {
        if self.loading.is_some() {
            debug!("navigation: next ignored, fetch in flight");
            return Step::Ignored;
        }
        if self.autoplay {
            return self.autoplay_advance();
        }
        self.liked_step(liked, 1)
    }

    pub fn previous(&mut self, liked: &[Track]) -> Step {
        if !self.autoplay {
            return self.liked_step(liked, -1);
        }
        let Some(prev) = self.history.pop() else {
            return Step::Notice(Notice::info("No previous songs in autoplay history"));
        };
        let notice = Notice::info(format!("Previous: {}", prev.label()));
        self.queue.push_front(self.current.clone());
        self.set_current(prev.clone());
        Step::Play {
            track: prev,
            notice: Some(notice),
        }
    }

    /// Natural end of the current track.
    pub fn on_track_ended(&mut self, liked: &[Track]) -> Step {
        if self.repeat {
            return Step::Restart;
        }
        self.played.insert(&self.current.id);
        if self.loading.is_some() {
            debug!("navigation: ended ignored, fetch in flight");
            return Step::Ignored;
        }

        if liked.len() > 1 {
            self.history.push(self.current.clone());
            return self.liked_step(liked, 1);
        }
        if self.autoplay {
            return self.autoplay_advance();
        }
        Step::Stop
    }

    /// Play `track` now, whatever the mode.
    pub fn select_track(&mut self, track: Track) -> Step {
        let notice = Notice::success(format!("Now playing: {}", track.label()));
        self.set_current(track.clone());
        Step::Play {
            track,
            notice: Some(notice),
        }
    }

    /// Apply a finished recommendation fetch.
    pub fn complete_fetch(&mut self, token: FetchToken, recs: Recommendations) -> Step {
        if self.loading != Some(token) {
            debug!("navigation: dropping stale recommendations {:?}", token);
            return Step::Ignored;
        }
        self.loading = None;

        if let Some(trimmed) = recs.trimmed_played {
            self.played = trimmed;
        }

        let mut tracks = recs.tracks.into_iter();
        let Some(first) = tracks.next() else {
            return Step::Notice(Notice::info("No more recommendations available"));
        };

        self.history.push(self.current.clone());
        self.queue = tracks.collect();
        let notice = Notice::info(format!("Next: {}", first.label()));
        self.set_current(first.clone());
        Step::Play {
            track: first,
            notice: Some(notice),
        }
    }

    /// The autoplay branch shared by `next` and `on_track_ended`.
    fn autoplay_advance(&mut self) -> Step {
        if let Some(head) = self.queue.pop_front() {
            self.history.push(self.current.clone());
            let notice = Notice::info(format!("Next: {}", head.label()));
            self.set_current(head.clone());
            return Step::Play {
                track: head,
                notice: Some(notice),
            };
        }

        // History is extended only when a result is adopted, so a failed
        // fetch leaves the current track out of it.
        let token = FetchToken(self.generation);
        self.loading = Some(token);
        Step::Fetch(FetchRequest {
            token,
            seed: self.current.clone(),
            played: self.played.clone(),
        })
    }

    fn liked_step(&mut self, liked: &[Track], delta: isize) -> Step {
        if liked.is_empty() {
            return Step::Notice(Notice::info("No songs in playlist"));
        }
        let len = liked.len() as isize;
        let idx = match liked.iter().position(|t| t.id == self.current.id) {
            Some(i) => (i as isize + delta).rem_euclid(len),
            // Off-list current: forward starts at the head, backward at the tail.
            None if delta > 0 => 0,
            None => len - 1,
        };
        let track = liked[idx as usize].clone();
        let verb = if delta > 0 { "Next" } else { "Previous" };
        let notice = Notice::info(format!("{}: {}", verb, track.title));
        self.set_current(track.clone());
        Step::Play {
            track,
            notice: Some(notice),
        }
    }

    fn set_current(&mut self, track: Track) {
        self.queue.retain(|t| t.id != track.id);
        self.history.retain(|t| t.id != track.id);
        self.current = track;
        self.generation += 1;
        // A fetch started for the previous track is now stale.
        self.loading = None;
    }
}
