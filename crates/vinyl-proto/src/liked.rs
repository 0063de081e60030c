//! Liked-songs store: an ordered list of full `Track` records kept in one
//! JSON file.
//!
//! Every mutation is read-modify-write over the whole list. The new list is
//! written to a sibling temp file and renamed over the target, so a reader
//! never sees a half-written file. A missing or unparsable file reads as the
//! empty list.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::track::Track;

#[derive(Debug, Clone)]
pub struct LikedStore {
    path: PathBuf,
}

impl LikedStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Liked tracks in insertion order, unique by id.
    pub fn list(&self) -> Vec<Track> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("liked: cannot read {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };

        let tracks: Vec<Track> = match serde_json::from_str(&content) {
            Ok(t) => t,
            Err(e) => {
                warn!("liked: {} is not a track list ({}), treating as empty", self.path.display(), e);
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        tracks
            .into_iter()
            .filter(|t| seen.insert(t.id.clone()))
            .collect()
    }

    pub fn is_liked(&self, track: &Track) -> bool {
        self.list().iter().any(|t| t.id == track.id)
    }

    /// Append `track` unless its id is already present. Returns whether the
    /// list changed.
    pub fn add(&self, track: &Track) -> bool {
        let mut tracks = self.list();
        if tracks.iter().any(|t| t.id == track.id) {
            return false;
        }
        tracks.push(track.clone());
        self.write(&tracks);
        true
    }

    /// Drop the track with `id`. An empty result is stored as-is.
    pub fn remove(&self, id: &str) -> bool {
        let mut tracks = self.list();
        let before = tracks.len();
        tracks.retain(|t| t.id != id);
        if tracks.len() == before {
            return false;
        }
        self.write(&tracks);
        true
    }

    fn write(&self, tracks: &[Track]) {
        if let Err(e) = self.try_write(tracks) {
            warn!("liked: failed to persist {}: {:#}", self.path.display(), e);
        }
    }

    fn try_write(&self, tracks: &[Track]) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(tracks)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!("liked: wrote {} tracks to {}", tracks.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            title: format!("Song {id}"),
            artist: "Someone".to_string(),
            ..Track::default_track()
        }
    }

    fn store() -> (tempfile::TempDir, LikedStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LikedStore::new(dir.path().join("liked.json"));
        (dir, store)
    }

    #[test]
    fn test_missing_file_is_empty() {
        let (_dir, store) = store();
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let (_dir, store) = store();
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(store.list().is_empty());
        // Still writable afterwards.
        assert!(store.add(&track("a")));
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_add_then_remove_membership() {
        let (_dir, store) = store();
        let a = track("a");
        assert!(!store.is_liked(&a));
        assert!(store.add(&a));
        assert!(store.is_liked(&a));
        assert!(store.remove("a"));
        assert!(!store.is_liked(&a));
    }

    #[test]
    fn test_add_is_idempotent_and_ordered() {
        let (_dir, store) = store();
        store.add(&track("a"));
        store.add(&track("b"));
        assert!(!store.add(&track("a")));
        let ids: Vec<_> = store.list().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_remove_last_leaves_empty_list() {
        let (_dir, store) = store();
        store.add(&track("a"));
        store.remove("a");
        assert!(store.list().is_empty());
        let raw = std::fs::read_to_string(store.path()).unwrap();
        let parsed: Vec<Track> = serde_json::from_str(&raw).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_duplicate_ids_on_disk_are_collapsed() {
        let (_dir, store) = store();
        let list = vec![track("a"), track("b"), track("a")];
        std::fs::write(store.path(), serde_json::to_string(&list).unwrap()).unwrap();
        let ids: Vec<_> = store.list().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let (_dir, store) = store();
        store.add(&track("a"));
        assert!(!store.remove("zzz"));
        assert_eq!(store.list().len(), 1);
    }
}
