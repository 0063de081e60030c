mod common;

use common::mock_catalog::{config_for, spawn_mock_catalog};
use vinyl_proto::catalog::CatalogClient;
use vinyl_proto::recommend::{fetch_recommendations, PlayedSet};

async fn client() -> CatalogClient {
    let base = spawn_mock_catalog().await;
    CatalogClient::new(&config_for(&base))
}

#[tokio::test]
async fn search_maps_and_decodes_results() {
    let client = client().await;
    let tracks = client.search("hello world").await;

    assert_eq!(tracks.len(), 2);
    let first = &tracks[0];
    assert_eq!(first.id, "s1");
    assert_eq!(first.title, "hello world \"one\"");
    assert_eq!(first.artist, "Artist & Friends");
    assert_eq!(first.album, "Album & Co");
    assert_eq!(first.duration, "3:05");
    assert_eq!(first.poster, "https://img.test/s1-500.jpg");
    assert_eq!(first.audio_url.as_deref(), Some("https://aud.test/s1_320.mp4"));
}

#[tokio::test]
async fn failures_degrade_to_empty() {
    let client = client().await;
    assert!(client.search("broken").await.is_empty());
    assert!(client.search("refused").await.is_empty());
    assert!(client.search("garbage").await.is_empty());
    assert!(client.suggestions("lonely").await.is_empty());
    assert!(client.track_by_id("missing").await.is_none());
}

#[tokio::test]
async fn side_queries_are_capped_at_ten() {
    let client = client().await;
    assert_eq!(client.search("many").await.len(), 15);
    assert_eq!(client.by_artist("many").await.len(), 10);
    assert_eq!(client.trending_songs().await.len(), 10);
}

#[tokio::test]
async fn track_by_id_returns_first_record() {
    let client = client().await;
    let track = client.track_by_id("xyz").await.expect("track should exist");
    assert_eq!(track.id, "xyz");
    assert_eq!(track.title, "Found");
}

#[tokio::test]
async fn unreachable_catalog_is_empty() {
    let client = CatalogClient::new(&config_for("http://127.0.0.1:9/api"));
    assert!(client.search("anything").await.is_empty());
    assert!(client.trending_songs().await.is_empty());
}

#[tokio::test]
async fn recommendations_merge_over_http() {
    let client = client().await;
    let seed = client.track_by_id("seed").await.expect("seed track");
    let mut played = PlayedSet::new();
    played.insert("r2");

    let recs = fetch_recommendations(&client, &seed, &played).await;
    let ids: Vec<_> = recs.tracks.iter().map(|t| t.id.as_str()).collect();

    // suggestions first, then the artist search ("Someone" -> default branch),
    // played and seed ids removed, capped at 8.
    assert_eq!(ids[0], "r1");
    assert!(!ids.contains(&"r2"));
    assert!(!ids.contains(&"seed"));
    assert!(ids.len() <= 8);
}
