//! Song catalog client (JioSaavn-compatible REST API).
//!
//! Every public query degrades to an empty result: HTTP failures, non-2xx
//! statuses, `success: false` envelopes and undecodable bodies are logged
//! and swallowed here so callers only ever see "nothing found".

use std::time::Duration;

use rand::seq::SliceRandom;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::CatalogConfig;
use crate::recommend::RecommendationSource;
use crate::track::{format_duration, ThemeColors, Track};

/// Result cap for artist and trending searches.
const SIDE_QUERY_LIMIT: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("catalog returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("catalog reported failure")]
    Unsuccessful,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    #[serde(default)]
    results: Vec<WireSong>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSong {
    id: String,
    name: String,
    duration: Option<u64>,
    #[serde(default)]
    album: WireAlbum,
    #[serde(default)]
    artists: WireArtists,
    #[serde(default)]
    image: Vec<WireLink>,
    #[serde(default)]
    download_url: Vec<WireLink>,
}

#[derive(Debug, Default, Deserialize)]
struct WireAlbum {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireArtists {
    #[serde(default)]
    primary: Vec<WireArtist>,
}

#[derive(Debug, Deserialize)]
struct WireArtist {
    name: String,
}

/// Image or audio variant: `{quality, url}`.
#[derive(Debug, Deserialize)]
struct WireLink {
    quality: String,
    url: String,
}

#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    trending_queries: Vec<String>,
}

impl CatalogClient {
    pub fn new(config: &CatalogConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            trending_queries: config.trending_queries.clone(),
        }
    }

    /// Free-text song search.
    pub async fn search(&self, query: &str) -> Vec<Track> {
        self.search_songs(query, None).await
    }

    pub async fn track_by_id(&self, id: &str) -> Option<Track> {
        let url = format!("{}/songs/{}", self.base_url, id);
        match self.get_json::<Vec<WireSong>>(&url, &[]).await {
            Ok(songs) => songs.into_iter().next().map(transform),
            Err(e) => {
                warn!("catalog: track {} unavailable: {}", id, e);
                None
            }
        }
    }

    pub async fn suggestions(&self, id: &str) -> Vec<Track> {
        let url = format!("{}/songs/{}/suggestions", self.base_url, id);
        match self.get_json::<Vec<WireSong>>(&url, &[]).await {
            Ok(songs) => songs.into_iter().map(transform).collect(),
            Err(e) => {
                warn!("catalog: suggestions for {} failed: {}", id, e);
                Vec::new()
            }
        }
    }

    pub async fn by_artist(&self, artist: &str) -> Vec<Track> {
        self.search_songs(artist, Some(SIDE_QUERY_LIMIT)).await
    }

    /// Search with one of the configured popular queries, picked at random.
    pub async fn trending_songs(&self) -> Vec<Track> {
        let query = self
            .trending_queries
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| "trending".to_string());
        self.search_songs(&query, Some(SIDE_QUERY_LIMIT)).await
    }

    async fn search_songs(&self, query: &str, limit: Option<usize>) -> Vec<Track> {
        let url = format!("{}/search/songs", self.base_url);
        let limit_str = limit.map(|l| l.to_string());
        let mut params = vec![("query", query)];
        if let Some(l) = limit_str.as_deref() {
            params.push(("limit", l));
        }

        match self.get_json::<SearchData>(&url, &params).await {
            Ok(data) => data
                .results
                .into_iter()
                .take(limit.unwrap_or(usize::MAX))
                .map(transform)
                .collect(),
            Err(e) => {
                warn!("catalog: search {:?} failed: {}", query, e);
                Vec::new()
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<T, CatalogError> {
        debug!("catalog: GET {}", url);
        let response = self.http.get(url).query(params).send().await?;
        if !response.status().is_success() {
            return Err(CatalogError::Status(response.status()));
        }
        let envelope: Envelope<T> = response.json().await?;
        match envelope {
            Envelope {
                success: true,
                data: Some(data),
            } => Ok(data),
            _ => Err(CatalogError::Unsuccessful),
        }
    }
}

impl RecommendationSource for CatalogClient {
    async fn recommendations(&self, id: &str) -> Vec<Track> {
        self.suggestions(id).await
    }

    async fn artist_tracks(&self, artist: &str) -> Vec<Track> {
        self.by_artist(artist).await
    }

    async fn trending(&self) -> Vec<Track> {
        self.trending_songs().await
    }
}

fn transform(song: WireSong) -> Track {
    let poster = pick_quality(&song.image, &["500x500", "150x150"])
        .or_else(|| song.image.first())
        .map(|l| l.url.clone())
        .unwrap_or_default();

    let audio_url = pick_quality(&song.download_url, &["320kbps"])
        .or_else(|| song.download_url.last())
        .map(|l| l.url.clone());

    let artist = song
        .artists
        .primary
        .first()
        .map(|a| a.name.as_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("Unknown Artist");

    let album = song
        .album
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .unwrap_or("Unknown Album");

    Track {
        id: song.id,
        title: decode_html_entities(&song.name),
        artist: decode_html_entities(artist),
        album: decode_html_entities(album),
        duration: format_duration(song.duration),
        poster,
        audio_url,
        colors: ThemeColors::default(),
    }
}

fn pick_quality<'a>(links: &'a [WireLink], preferred: &[&str]) -> Option<&'a WireLink> {
    preferred
        .iter()
        .find_map(|q| links.iter().find(|l| l.quality == *q))
}

/// Decode the HTML entities the catalog leaves in text fields.
pub fn decode_html_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&rest[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code);
    }
    let c = match name {
        "amp" => '&',
        "quot" => '"',
        "apos" => '\'',
        "lt" => '<',
        "gt" => '>',
        "nbsp" => '\u{a0}',
        _ => return None,
    };
    Some(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(quality: &str, url: &str) -> WireLink {
        WireLink {
            quality: quality.to_string(),
            url: url.to_string(),
        }
    }

    fn song() -> WireSong {
        WireSong {
            id: "abc".to_string(),
            name: "Tum Hi Ho".to_string(),
            duration: Some(262),
            album: WireAlbum {
                name: Some("Aashiqui 2".to_string()),
            },
            artists: WireArtists {
                primary: vec![WireArtist {
                    name: "Arijit Singh".to_string(),
                }],
            },
            image: vec![link("50x50", "s"), link("150x150", "m"), link("500x500", "l")],
            download_url: vec![link("96kbps", "lo"), link("320kbps", "hi"), link("160kbps", "mid")],
        }
    }

    #[test]
    fn test_decode_named_and_numeric_entities() {
        assert_eq!(decode_html_entities("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(decode_html_entities("&quot;Hi&quot; &#39;there&#x27;"), "\"Hi\" 'there'");
        assert_eq!(decode_html_entities("plain"), "plain");
    }

    #[test]
    fn test_decode_leaves_unknown_entities() {
        assert_eq!(decode_html_entities("R&B"), "R&B");
        assert_eq!(decode_html_entities("a &bogus; b"), "a &bogus; b");
        assert_eq!(decode_html_entities("trailing &"), "trailing &");
    }

    #[test]
    fn test_transform_prefers_large_image_and_320kbps() {
        let track = transform(song());
        assert_eq!(track.poster, "l");
        assert_eq!(track.audio_url.as_deref(), Some("hi"));
        assert_eq!(track.duration, "4:22");
        assert_eq!(track.colors, ThemeColors::default());
    }

    #[test]
    fn test_transform_fallbacks() {
        let mut s = song();
        s.image = vec![link("50x50", "s")];
        s.download_url = vec![link("96kbps", "lo"), link("160kbps", "mid")];
        s.artists.primary.clear();
        s.album.name = None;
        s.duration = None;
        let track = transform(s);
        assert_eq!(track.poster, "s");
        assert_eq!(track.audio_url.as_deref(), Some("mid"));
        assert_eq!(track.artist, "Unknown Artist");
        assert_eq!(track.album, "Unknown Album");
        assert_eq!(track.duration, "0:00");
    }

    #[test]
    fn test_transform_without_media() {
        let mut s = song();
        s.image.clear();
        s.download_url.clear();
        let track = transform(s);
        assert_eq!(track.poster, "");
        assert_eq!(track.audio_url, None);
    }

    #[test]
    fn test_wire_song_parses_camel_case() {
        let raw = r#"{
            "id": "x1",
            "name": "Kesariya &amp; More",
            "duration": null,
            "album": {"name": null},
            "artists": {"primary": [{"name": "Pritam"}]},
            "image": [{"quality": "500x500", "url": "img"}],
            "downloadUrl": [{"quality": "320kbps", "url": "aud"}]
        }"#;
        let track = transform(serde_json::from_str(raw).unwrap());
        assert_eq!(track.title, "Kesariya & More");
        assert_eq!(track.album, "Unknown Album");
        assert_eq!(track.audio_url.as_deref(), Some("aud"));
    }
}
