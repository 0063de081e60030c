//! Autoplay recommendation policy.
//!
//! Candidates come from three catalog queries: suggestions for the seed
//! track, other songs by the same artist and, only when those two yield fewer
//! than [`TRENDING_FLOOR`] tracks, a trending search. The merged list is
//! deduplicated (first occurrence wins), stripped of the seed and of
//! already-played ids, and capped at [`MAX_CANDIDATES`].

use std::collections::{HashSet, VecDeque};
use std::future::Future;

use tracing::debug;

use crate::track::Track;

pub const MAX_CANDIDATES: usize = 8;
pub const TRENDING_FLOOR: usize = 10;
/// Below this many candidates the played-set may be relaxed.
pub const MIN_CANDIDATES: usize = 3;
/// The played-set is only relaxed once it holds more than this many ids.
pub const RELAX_THRESHOLD: usize = 20;
/// How many recent ids survive a relaxation.
pub const RELAX_KEEP: usize = 10;
/// Hard bound on the played-set regardless of fetch outcomes.
pub const PLAYED_CAP: usize = 500;

/// Ids already surfaced this session, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayedSet {
    order: VecDeque<String>,
    ids: HashSet<String>,
}

impl PlayedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id`. Re-inserting a known id keeps its original position.
    pub fn insert(&mut self, id: &str) {
        if self.ids.insert(id.to_string()) {
            self.order.push_back(id.to_string());
        }
        if self.order.len() > PLAYED_CAP {
            self.retain_recent(PLAYED_CAP);
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Keep only the `n` most recently inserted ids.
    pub fn retain_recent(&mut self, n: usize) {
        while self.order.len() > n {
            if let Some(old) = self.order.pop_front() {
                self.ids.remove(&old);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for PlayedSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = PlayedSet::new();
        for id in iter {
            set.insert(id.as_ref());
        }
        set
    }
}

/// The catalog queries the policy needs. Implementations degrade failures to
/// empty lists.
pub trait RecommendationSource: Send + Sync {
    fn recommendations(&self, id: &str) -> impl Future<Output = Vec<Track>> + Send;
    fn artist_tracks(&self, artist: &str) -> impl Future<Output = Vec<Track>> + Send;
    fn trending(&self) -> impl Future<Output = Vec<Track>> + Send;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recommendations {
    pub tracks: Vec<Track>,
    /// Set when the played-set had to be shrunk to find enough candidates.
    /// The caller adopts it in place of its own set.
    pub trimmed_played: Option<PlayedSet>,
}

pub async fn fetch_recommendations<S: RecommendationSource>(
    source: &S,
    seed: &Track,
    played: &PlayedSet,
) -> Recommendations {
    let mut merged = source.recommendations(&seed.id).await;
    merged.extend(source.artist_tracks(&seed.artist).await);

    if merged.len() < TRENDING_FLOOR {
        merged.extend(source.trending().await);
    }

    let result = select_candidates(&seed.id, merged, played);
    debug!(
        "recommend: seed={} candidates={} trimmed={}",
        seed.id,
        result.tracks.len(),
        result.trimmed_played.is_some()
    );
    result
}

/// Dedupe, filter and cap a merged candidate list.
pub fn select_candidates(seed_id: &str, merged: Vec<Track>, played: &PlayedSet) -> Recommendations {
    let mut seen = HashSet::new();
    let unique: Vec<Track> = merged
        .into_iter()
        .filter(|t| seen.insert(t.id.clone()))
        .filter(|t| t.id != seed_id)
        .collect();

    let fresh = |played: &PlayedSet| -> Vec<Track> {
        unique
            .iter()
            .filter(|t| !played.contains(&t.id))
            .take(MAX_CANDIDATES)
            .cloned()
            .collect()
    };

    let tracks = fresh(played);
    if tracks.len() < MIN_CANDIDATES && played.len() > RELAX_THRESHOLD {
        let mut trimmed = played.clone();
        trimmed.retain_recent(RELAX_KEEP);
        return Recommendations {
            tracks: fresh(&trimmed),
            trimmed_played: Some(trimmed),
        };
    }

    Recommendations {
        tracks,
        trimmed_played: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn t(id: &str) -> Track {
        Track {
            id: id.to_string(),
            title: id.to_uppercase(),
            artist: "Artist".to_string(),
            ..Track::default_track()
        }
    }

    fn ids(tracks: &[Track]) -> Vec<&str> {
        tracks.iter().map(|t| t.id.as_str()).collect()
    }

    #[derive(Default)]
    struct FakeSource {
        by_id: HashMap<String, Vec<Track>>,
        by_artist: Vec<Track>,
        trending: Vec<Track>,
        trending_calls: Mutex<usize>,
    }

    impl RecommendationSource for FakeSource {
        async fn recommendations(&self, id: &str) -> Vec<Track> {
            self.by_id.get(id).cloned().unwrap_or_default()
        }

        async fn artist_tracks(&self, _artist: &str) -> Vec<Track> {
            self.by_artist.clone()
        }

        async fn trending(&self) -> Vec<Track> {
            *self.trending_calls.lock().unwrap() += 1;
            self.trending.clone()
        }
    }

    #[test]
    fn test_played_set_keeps_first_position() {
        let mut set: PlayedSet = ["a", "b", "c"].into_iter().collect();
        set.insert("a");
        set.retain_recent(2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["b", "c"]);
        assert!(!set.contains("a"));
    }

    #[test]
    fn test_played_set_hard_cap() {
        let mut set = PlayedSet::new();
        for i in 0..PLAYED_CAP + 25 {
            set.insert(&format!("id{i}"));
        }
        assert_eq!(set.len(), PLAYED_CAP);
        assert!(!set.contains("id0"));
        assert!(set.contains(&format!("id{}", PLAYED_CAP + 24)));
    }

    #[test]
    fn test_select_dedupes_first_wins_and_drops_seed() {
        let mut dup = t("b");
        dup.title = "second copy".to_string();
        let merged = vec![t("seed"), t("b"), dup, t("c")];
        let out = select_candidates("seed", merged, &PlayedSet::new());
        assert_eq!(ids(&out.tracks), vec!["b", "c"]);
        assert_eq!(out.tracks[0].title, "B");
        assert!(out.trimmed_played.is_none());
    }

    #[test]
    fn test_select_filters_played_and_caps() {
        let merged: Vec<Track> = (0..20).map(|i| t(&format!("t{i}"))).collect();
        let played: PlayedSet = ["t0", "t2"].into_iter().collect();
        let out = select_candidates("seed", merged, &played);
        assert_eq!(out.tracks.len(), MAX_CANDIDATES);
        assert!(out.tracks.iter().all(|t| !played.contains(&t.id)));
        assert_eq!(out.tracks[0].id, "t1");
    }

    #[test]
    fn test_select_relaxes_large_played_set() {
        // 25 played ids; every candidate except one was played long ago.
        let played: PlayedSet = (0..25).map(|i| format!("p{i}")).collect();
        let merged = vec![t("p0"), t("p1"), t("p24"), t("fresh")];
        let out = select_candidates("seed", merged, &played);

        let trimmed = out.trimmed_played.expect("played-set should be trimmed");
        assert_eq!(trimmed.len(), RELAX_KEEP);
        assert_eq!(ids(&out.tracks), vec!["p0", "p1", "fresh"]);
        assert!(out.tracks.iter().all(|t| !trimmed.contains(&t.id)));
    }

    #[test]
    fn test_select_small_played_set_is_not_relaxed() {
        let played: PlayedSet = ["a", "b"].into_iter().collect();
        let out = select_candidates("seed", vec![t("a"), t("b")], &played);
        assert!(out.tracks.is_empty());
        assert!(out.trimmed_played.is_none());
    }

    #[tokio::test]
    async fn test_fetch_skips_trending_when_enough() {
        let source = FakeSource {
            by_id: HashMap::from([(
                "seed".to_string(),
                (0..6).map(|i| t(&format!("r{i}"))).collect(),
            )]),
            by_artist: (0..5).map(|i| t(&format!("a{i}"))).collect(),
            trending: vec![t("hot")],
            ..Default::default()
        };
        let out = fetch_recommendations(&source, &t("seed"), &PlayedSet::new()).await;
        assert_eq!(*source.trending_calls.lock().unwrap(), 0);
        assert_eq!(out.tracks.len(), MAX_CANDIDATES);
        assert_eq!(out.tracks[0].id, "r0");
        assert_eq!(out.tracks[6].id, "a0");
    }

    #[tokio::test]
    async fn test_fetch_falls_back_to_trending() {
        let source = FakeSource {
            by_id: HashMap::from([("seed".to_string(), vec![t("r0")])]),
            by_artist: vec![t("seed"), t("r0")],
            trending: vec![t("hot"), t("r0")],
            ..Default::default()
        };
        let out = fetch_recommendations(&source, &t("seed"), &PlayedSet::new()).await;
        assert_eq!(*source.trending_calls.lock().unwrap(), 1);
        assert_eq!(ids(&out.tracks), vec!["r0", "hot"]);
    }

    #[tokio::test]
    async fn test_fetch_with_failing_source_is_empty() {
        let source = FakeSource::default();
        let out = fetch_recommendations(&source, &t("seed"), &PlayedSet::new()).await;
        assert!(out.tracks.is_empty());
    }
}
