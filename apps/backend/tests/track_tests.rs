//! Integration tests for the fetch, search, similar and health endpoints.

mod common;

use common::{kkbox_track, track, track_url, Fixture, TestApp};
use serde_json::Value;
use track_affinity::{Album, Artist, SimpleTrack};

fn with_popularity(mut t: track_affinity::Track, popularity: u32) -> track_affinity::Track {
    t.popularity = Some(popularity);
    t
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;

    let response = app.server().get("/healthz").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["spotify"], "enabled");
    assert_eq!(body["services"]["lastfm"], "disabled");
    assert_eq!(body["services"]["youtube_music"], "disabled");
    assert_eq!(body["services"]["redis"], "disabled");
}

// =============================================================================
// Fetch
// =============================================================================

#[tokio::test]
async fn test_fetch_track() {
    let mut fixture = Fixture::default();
    fixture
        .spotify
        .add_track(track("T", "Seed Song", "artist-a", "A", Some("JPAB12345678")));
    let app = TestApp::with_fixture(fixture).await;

    let response = app
        .server()
        .get("/v1/track/fetch")
        .add_query_param("url", track_url("T"))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], 200);
    assert_eq!(body["result"]["id"], "T");
    assert_eq!(body["result"]["isrc"], "JPAB12345678");
    assert_eq!(body["result"]["artists"][0]["name"], "A");
    assert_eq!(body["result"]["album"]["id"], "album-T");
}

#[tokio::test]
async fn test_fetch_track_accepts_query_string_and_locale() {
    let mut fixture = Fixture::default();
    fixture
        .spotify
        .add_track(track("T", "Seed Song", "artist-a", "A", None));
    let app = TestApp::with_fixture(fixture).await;

    let response = app
        .server()
        .get("/v1/track/fetch")
        .add_query_param("url", "https://open.spotify.com/intl-ja/track/T?si=abc")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["result"]["id"], "T");
}

#[tokio::test]
async fn test_fetch_missing_track() {
    let app = TestApp::new().await;

    let response = app
        .server()
        .get("/v1/track/fetch")
        .add_query_param("url", track_url("nope"))
        .await;

    response.assert_status_not_found();
    let body: Value = response.json();
    assert_eq!(body["code"], "TRACK_NOT_FOUND");
}

#[tokio::test]
async fn test_fetch_track_with_artist_url() {
    let app = TestApp::new().await;

    let response = app
        .server()
        .get("/v1/track/fetch")
        .add_query_param("url", "https://open.spotify.com/artist/abc123")
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["code"], "DIFFERENT_SPOTIFY_URL");
}

#[tokio::test]
async fn test_fetch_artist() {
    let mut fixture = Fixture::default();
    fixture.spotify.artists.insert(
        "artist-a".to_string(),
        Artist {
            id: "artist-a".to_string(),
            name: "A".to_string(),
            url: "https://open.spotify.com/artist/artist-a".to_string(),
            followers: Some(4200),
            genres: vec!["anime".to_string()],
            ..Default::default()
        },
    );
    let app = TestApp::with_fixture(fixture).await;

    let response = app
        .server()
        .get("/v1/artist/fetch")
        .add_query_param("url", "https://open.spotify.com/artist/artist-a")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["result"]["name"], "A");
    assert_eq!(body["result"]["followers"], "4200");
    assert_eq!(body["result"]["genres"][0], "anime");
}

#[tokio::test]
async fn test_fetch_album() {
    let mut fixture = Fixture::default();
    fixture.spotify.albums.insert(
        "album-1".to_string(),
        Album {
            id: "album-1".to_string(),
            name: "First Album".to_string(),
            release_date: "2021-03-03".to_string(),
            tracks: vec![
                SimpleTrack {
                    id: "s1".to_string(),
                    name: "Intro".to_string(),
                    track_number: 1,
                    ..Default::default()
                },
                SimpleTrack {
                    id: "s2".to_string(),
                    name: "Second".to_string(),
                    track_number: 2,
                    ..Default::default()
                },
            ],
            upc: Some("4988000000000".to_string()),
            ..Default::default()
        },
    );
    let app = TestApp::with_fixture(fixture).await;

    let response = app
        .server()
        .get("/v1/album/fetch")
        .add_query_param("url", "https://open.spotify.com/album/album-1")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["result"]["name"], "First Album");
    assert_eq!(body["result"]["upc"], "4988000000000");
    let listing = body["result"]["tracks"]["items"].as_array().unwrap();
    assert_eq!(listing.len(), 2);
    assert_eq!(listing[1]["name"], "Second");
}

// =============================================================================
// Search
// =============================================================================

#[tokio::test]
async fn test_search_tracks() {
    let mut fixture = Fixture::default();
    fixture.spotify.searches.insert(
        "yoasobi".to_string(),
        vec![
            track("t1", "夜に駆ける", "artist-y", "YOASOBI", None),
            track("t2", "群青", "artist-y", "YOASOBI", None),
        ],
    );
    let app = TestApp::with_fixture(fixture).await;

    let response = app
        .server()
        .get("/v1/track/search")
        .add_query_param("q", "  yoasobi ")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let found = body["result"]["items"].as_array().unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0]["id"], "t1");
}

#[tokio::test]
async fn test_search_empty_query() {
    let app = TestApp::new().await;

    let response = app
        .server()
        .get("/v1/track/search")
        .add_query_param("q", "   ")
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["status"], 400);
    assert_eq!(body["code"], "EMPTY_QUERY");

    let response = app.server().get("/v1/track/search").await;
    response.assert_status_bad_request();
}

// =============================================================================
// Similar
// =============================================================================

#[tokio::test]
async fn test_similar_sorted_by_popularity() {
    let mut fixture = Fixture::default();
    fixture
        .spotify
        .add_track(track("T", "Seed Song", "artist-a", "A", Some("JPAB12345678")));
    fixture.spotify.add_track(with_popularity(
        track("low", "Quiet", "artist-b", "B", Some("JPAB00000001")),
        10,
    ));
    fixture.spotify.add_track(with_popularity(
        track("high", "Loud", "artist-c", "C", Some("JPAB00000002")),
        80,
    ));
    fixture.kkbox.by_isrc.insert(
        "JPAB12345678".to_string(),
        kkbox_track("kk-seed", "Seed Song", "A", Some("JPAB12345678")),
    );
    fixture.kkbox.related.insert(
        "kk-seed".to_string(),
        vec![
            kkbox_track("kk1", "Quiet", "B", Some("JPAB00000001")),
            // Listing without ISRC; the detail lookup fills it in
            kkbox_track("kk2", "Loud", "C", None),
            // Resolves back to the seed
            kkbox_track("kk3", "Seed Song", "A", Some("JPAB12345678")),
        ],
    );
    fixture.kkbox.details.insert(
        "kk2".to_string(),
        kkbox_track("kk2", "Loud", "C", Some("JPAB00000002")),
    );
    let app = TestApp::with_fixture(fixture).await;

    let response = app
        .server()
        .get("/v1/track/similar")
        .add_query_param("url", track_url("T"))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let ids: Vec<&str> = body["result"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["high", "low"]);
}

#[tokio::test]
async fn test_similar_seed_without_isrc() {
    let mut fixture = Fixture::default();
    fixture
        .spotify
        .add_track(track("T", "Seed Song", "artist-a", "A", None));
    let app = TestApp::with_fixture(fixture).await;

    let response = app
        .server()
        .get("/v1/track/similar")
        .add_query_param("url", track_url("T"))
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["code"], "ISRC_NOT_FOUND");
}

#[tokio::test]
async fn test_similar_seed_unknown_to_kkbox() {
    let mut fixture = Fixture::default();
    fixture
        .spotify
        .add_track(track("T", "Seed Song", "artist-a", "A", Some("JPAB12345678")));
    let app = TestApp::with_fixture(fixture).await;

    let response = app
        .server()
        .get("/v1/track/similar")
        .add_query_param("url", track_url("T"))
        .await;

    response.assert_status_not_found();
    let body: Value = response.json();
    assert_eq!(body["code"], "TRACK_NOT_FOUND");
}
