#![allow(dead_code)]

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::net::TcpListener;
use vinyl_proto::config::CatalogConfig;

pub fn song(id: &str, name: &str, artist: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "duration": 185,
        "album": {"name": "Album &amp; Co"},
        "artists": {"primary": [{"name": artist}]},
        "image": [
            {"quality": "50x50", "url": format!("https://img.test/{id}-50.jpg")},
            {"quality": "150x150", "url": format!("https://img.test/{id}-150.jpg")},
            {"quality": "500x500", "url": format!("https://img.test/{id}-500.jpg")}
        ],
        "downloadUrl": [
            {"quality": "96kbps", "url": format!("https://aud.test/{id}_96.mp4")},
            {"quality": "320kbps", "url": format!("https://aud.test/{id}_320.mp4")}
        ]
    })
}

async fn search(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    let query = params.get("query").cloned().unwrap_or_default();
    match query.as_str() {
        "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        "refused" => Json(json!({"success": false, "data": null})).into_response(),
        "garbage" => "not json at all".into_response(),
        "many" => {
            let results: Vec<Value> = (0..15)
                .map(|i| song(&format!("m{i}"), &format!("Many {i}"), "Crowd"))
                .collect();
            Json(json!({"success": true, "data": {"results": results}})).into_response()
        }
        _ => Json(json!({
            "success": true,
            "data": {"results": [
                song("s1", &format!("{query} &quot;one&quot;"), "Artist &amp; Friends"),
                song("s2", "Second", "Artist")
            ]}
        }))
        .into_response(),
    }
}

async fn song_by_id(Path(id): Path<String>) -> impl IntoResponse {
    if id == "missing" {
        return Json(json!({"success": true, "data": []}));
    }
    Json(json!({"success": true, "data": [song(&id, "Found", "Someone")]}))
}

async fn suggestions(Path(id): Path<String>) -> impl IntoResponse {
    if id == "lonely" {
        return (StatusCode::NOT_FOUND, "no such song").into_response();
    }
    Json(json!({
        "success": true,
        "data": [song("r1", "Rec One", "Someone"), song("r2", "Rec Two", "Else")]
    }))
    .into_response()
}

/// Serve a fake catalog on an ephemeral port and return its base URL.
pub async fn spawn_mock_catalog() -> String {
    let app = Router::new()
        .route("/api/search/songs", get(search))
        .route("/api/songs/:id", get(song_by_id))
        .route("/api/songs/:id/suggestions", get(suggestions));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock catalog");
    let addr = listener.local_addr().expect("mock catalog address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}/api")
}

pub fn config_for(base_url: &str) -> CatalogConfig {
    CatalogConfig {
        base_url: base_url.to_string(),
        request_timeout_secs: 5,
        trending_queries: vec!["many".to_string()],
    }
}
