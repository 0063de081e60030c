//! Track model shared by the catalog, the liked store and the player core.

use serde::{Deserialize, Serialize};

/// Fallback theme roles used before any artwork has been sampled.
pub const DEFAULT_PRIMARY: &str = "#1a1a2e";
pub const DEFAULT_SECONDARY: &str = "#16213e";
pub const DEFAULT_ACCENT: &str = "#533483";

/// Three named background roles derived from a track's artwork.
/// Colors are stored as `#rrggbb` strings so the persisted layout stays
/// readable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThemeColors {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
}

impl Default for ThemeColors {
    fn default() -> Self {
        Self {
            primary: DEFAULT_PRIMARY.to_string(),
            secondary: DEFAULT_SECONDARY.to_string(),
            accent: DEFAULT_ACCENT.to_string(),
        }
    }
}

/// A playable song record.  Tracks are never mutated in place: a re-fetch
/// replaces the whole value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Display duration, "M:SS".
    pub duration: String,
    /// Cover art URL.
    pub poster: String,
    #[serde(default, rename = "audioUrl", skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub colors: ThemeColors,
}

impl Track {
    /// "Title by Artist", used in notices.
    pub fn label(&self) -> String {
        format!("{} by {}", self.title, self.artist)
    }

    /// The track the player starts on before the liked list is consulted.
    pub fn default_track() -> Self {
        Self {
            id: "JkNTq6Kh".to_string(),
            title: "I Wanna Be Yours (Violin)".to_string(),
            artist: "Dramatic Violin".to_string(),
            album: "I Wanna Be Yours (Violin)".to_string(),
            duration: "2:01".to_string(),
            poster: "https://c.saavncdn.com/915/I-Wanna-Be-Yours-Violin-Unknown-2023-20250108075659-500x500.jpg"
                .to_string(),
            audio_url: Some(
                "https://aac.saavncdn.com/915/ac73938eb6ed3d2dffa1b88e7eacc34d_320.mp4".to_string(),
            ),
            colors: ThemeColors {
                primary: "#1a1a1a".to_string(),
                secondary: "#2d2d2d".to_string(),
                accent: "#6a1b9a".to_string(),
            },
        }
    }
}

/// Format whole seconds as "M:SS".  Zero or unknown lengths render as "0:00".
pub fn format_duration(seconds: Option<u64>) -> String {
    match seconds {
        None | Some(0) => "0:00".to_string(),
        Some(s) => format!("{}:{:02}", s / 60, s % 60),
    }
}

/// Format a playback position (fractional seconds) as "M:SS".
pub fn format_clock(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }
    format_duration(Some(seconds.floor() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(None), "0:00");
        assert_eq!(format_duration(Some(0)), "0:00");
        assert_eq!(format_duration(Some(121)), "2:01");
        assert_eq!(format_duration(Some(59)), "0:59");
        assert_eq!(format_duration(Some(3600)), "60:00");
    }

    #[test]
    fn test_format_clock_handles_nan() {
        assert_eq!(format_clock(f64::NAN), "0:00");
        assert_eq!(format_clock(-3.0), "0:00");
        assert_eq!(format_clock(65.9), "1:05");
    }

    #[test]
    fn test_track_json_layout() {
        let track = Track::default_track();
        let json = serde_json::to_value(&track).unwrap();
        assert_eq!(json["id"], "JkNTq6Kh");
        assert!(json.get("audioUrl").is_some());
        assert_eq!(json["colors"]["accent"], "#6a1b9a");
    }

    #[test]
    fn test_track_without_colors_parses() {
        let raw = r#"{"id":"a","title":"t","artist":"r","album":"l","duration":"1:00","poster":""}"#;
        let track: Track = serde_json::from_str(raw).unwrap();
        assert_eq!(track.audio_url, None);
        assert_eq!(track.colors, ThemeColors::default());
    }
}
