//! Integration tests for the recommendation endpoint.

mod common;

use common::{kkbox_track, track, track_url, video, FakeLastFm, FakeYtMusic, Fixture, TestApp};
use crossfade::services::catalog::{DeezerTrack, LastFmTrack, MusicBrainzRecording};
use crossfade::services::RecommendSettings;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const SEED_ISRC: &str = "JPAB12345678";
const I1: &str = "JPAB00000001";
const I2: &str = "JPAB00000002";

/// Seed "T" by artist "A", known to KKBOX as "kk-seed".
fn seeded_fixture(seed_name: &str) -> Fixture {
    let mut fixture = Fixture::default();
    fixture
        .spotify
        .add_track(track("T", seed_name, "artist-a", "A", Some(SEED_ISRC)));
    fixture.kkbox.by_isrc.insert(
        SEED_ISRC.to_string(),
        kkbox_track("kk-seed", seed_name, "A", Some(SEED_ISRC)),
    );
    fixture
}

fn items(body: &Value) -> &Vec<Value> {
    body["result"]["items"]
        .as_array()
        .expect("items should be an array")
}

fn ids(body: &Value) -> Vec<String> {
    items(body)
        .iter()
        .map(|item| item["id"].as_str().unwrap_or_default().to_string())
        .collect()
}

fn reasons(item: &Value) -> Vec<String> {
    item["match_reasons"]
        .as_array()
        .expect("match_reasons should be an array")
        .iter()
        .filter_map(|r| r.as_str().map(str::to_string))
        .collect()
}

fn assert_descending(body: &Value) {
    let scores: Vec<f64> = items(body)
        .iter()
        .map(|item| item["final_score"].as_f64().unwrap())
        .collect();
    assert!(
        scores.windows(2).all(|w| w[0] >= w[1]),
        "scores should be non-increasing: {:?}",
        scores
    );
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_happy_path_balanced() {
    let mut fixture = seeded_fixture("Seed Song");
    fixture.kkbox.related.insert(
        "kk-seed".to_string(),
        vec![
            kkbox_track("kk1", "Song One", "B", Some(I1)),
            kkbox_track("kk2", "Song Two", "C", Some(I2)),
        ],
    );
    fixture
        .spotify
        .add_track(track("t1", "Song One", "artist-b", "B", Some(I1)));
    fixture
        .spotify
        .add_track(track("t2", "Song Two", "artist-c", "C", Some(I2)));
    fixture.spotify.set_genres("artist-c", &["anime"]);

    fixture.deezer.add(SEED_ISRC, 175.0, 240, -8.0);
    fixture.deezer.add(I1, 180.0, 250, -7.5);
    fixture.deezer.add(I2, 120.0, 200, -9.0);

    fixture.musicbrainz.add_recording(SEED_ISRC, &["anime"], None);
    fixture.musicbrainz.add_recording(I1, &["anime", "j-pop"], None);

    let settings = RecommendSettings {
        candidate_musicbrainz_tags: true,
        ..Default::default()
    };
    let app = TestApp::with_settings(fixture, settings).await;

    let body = app.recommend("T", Some("balanced")).await;

    assert_eq!(body["status"], 200);
    assert_eq!(body["result"]["mode"], "balanced");
    assert_eq!(body["result"]["seed_track"]["id"], "T");
    assert_eq!(body["result"]["seed_features"]["bpm"], 175.0);

    let found = items(&body);
    assert_eq!(found.len(), 2);
    assert!(!ids(&body).contains(&"T".to_string()));
    for item in found {
        assert!(
            reasons(item).contains(&"same_tag:anime".to_string()),
            "missing same_tag:anime in {:?}",
            reasons(item)
        );
        assert_eq!(item["genre_bonus"], 2.0);
    }
    assert_descending(&body);
}

#[tokio::test]
async fn test_kkbox_miss_gives_empty_result() {
    let mut fixture = Fixture::default();
    fixture
        .spotify
        .add_track(track("T", "Seed Song", "artist-a", "A", Some(SEED_ISRC)));
    let app = TestApp::with_fixture(fixture).await;

    let body = app.recommend("T", None).await;

    assert_eq!(body["status"], 200);
    assert!(items(&body).is_empty());
}

#[tokio::test]
async fn test_seed_without_isrc_gives_empty_result() {
    let mut fixture = Fixture::default();
    fixture
        .spotify
        .add_track(track("T", "Seed Song", "artist-a", "A", None));
    let app = TestApp::with_fixture(fixture).await;

    let body = app.recommend("T", None).await;

    assert!(items(&body).is_empty());
    assert_eq!(app.spotify_isrc_lookups(), 0);
}

#[tokio::test]
async fn test_genre_filter_drops_unrelated_group() {
    let mut fixture = seeded_fixture("Seed Song");
    fixture.musicbrainz.add_recording(SEED_ISRC, &["anime"], None);
    fixture.kkbox.related.insert(
        "kk-seed".to_string(),
        vec![
            kkbox_track("kk1", "Dance Number", "K", Some(I1)),
            kkbox_track("kk2", "Opening Theme", "O", Some(I2)),
        ],
    );
    fixture
        .spotify
        .add_track(track("kpop", "Dance Number", "artist-k", "K", Some(I1)));
    fixture
        .spotify
        .add_track(track("anime", "Opening Theme", "artist-o", "O", Some(I2)));
    fixture.spotify.set_genres("artist-k", &["k-pop"]);
    fixture.spotify.set_genres("artist-o", &["anime"]);
    let app = TestApp::with_fixture(fixture).await;

    let body = app.recommend("T", None).await;

    assert_eq!(ids(&body), vec!["anime"]);
    assert_eq!(items(&body)[0]["genre_bonus"], 2.0);
}

#[tokio::test]
async fn test_franchise_bonus() {
    let mut fixture = seeded_fixture("ラブライブ! メドレー");
    fixture.kkbox.related.insert(
        "kk-seed".to_string(),
        vec![kkbox_track("kk1", "Love Live! Days", "Muse", Some(I1))],
    );
    fixture
        .spotify
        .add_track(track("t1", "Love Live! Days", "artist-m", "Muse", Some(I1)));
    let app = TestApp::with_fixture(fixture).await;

    let body = app.recommend("T", None).await;

    let found = items(&body);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["genre_bonus"], 2.0);
    assert!(reasons(&found[0]).contains(&"same_series:Love Live".to_string()));
}

// =============================================================================
// Pipeline properties
// =============================================================================

#[tokio::test]
async fn test_seed_excluded_and_results_deduplicated() {
    let mut fixture = seeded_fixture("Seed Song");
    fixture.kkbox.related.insert(
        "kk-seed".to_string(),
        vec![
            kkbox_track("kk-dup-seed", "Seed Song", "A", Some(SEED_ISRC)),
            kkbox_track("kk1", "Song One", "B", Some(I1)),
            kkbox_track("kk-noisrc", "Seed Song (Live)", "A", None),
        ],
    );
    fixture
        .spotify
        .add_track(track("t1", "Song One", "artist-b", "B", Some(I1)));
    // The name search for the live version lands on the seed itself
    let seed = track("T", "Seed Song", "artist-a", "A", Some(SEED_ISRC));
    fixture
        .spotify
        .searches
        .insert("track:Seed Song Live artist:A".to_string(), vec![seed]);

    fixture.lastfm = Some(FakeLastFm {
        similar: vec![LastFmTrack {
            name: "Song One".to_string(),
            artist_name: "B".to_string(),
            match_score: 0.9,
            ..Default::default()
        }],
        ..Default::default()
    });
    fixture.spotify.searches.insert(
        "track:Song One artist:B".to_string(),
        vec![track("t1", "Song One", "artist-b", "B", Some(I1))],
    );
    let app = TestApp::with_fixture(fixture).await;

    let body = app.recommend("T", None).await;

    assert_eq!(ids(&body), vec!["t1"]);
}

#[tokio::test]
async fn test_seed_features_fall_back_to_search_and_recording() {
    let mut fixture = seeded_fixture("Seed Song");
    fixture.musicbrainz.add_recording(SEED_ISRC, &[], None);
    fixture.musicbrainz.by_mbid.insert(
        format!("rec-{}", SEED_ISRC),
        MusicBrainzRecording {
            mbid: format!("rec-{}", SEED_ISRC),
            tags: vec!["anime".to_string()],
            ..Default::default()
        },
    );
    fixture.deezer.searches.insert(
        "Seed Song|A".to_string(),
        DeezerTrack {
            bpm: 150.0,
            duration: 240,
            ..Default::default()
        },
    );
    let app = TestApp::with_fixture(fixture).await;

    let body = app.recommend("T", None).await;

    let seed = &body["result"]["seed_features"];
    assert_eq!(seed["bpm"], 150.0);
    assert_eq!(seed["duration_seconds"], 240);
    assert_eq!(seed["tags"][0], "anime");
}

#[tokio::test]
async fn test_limit_is_applied() {
    let mut fixture = seeded_fixture("Seed Song");
    let related: Vec<_> = (1..=5)
        .map(|i| {
            let isrc = format!("JPAB0000001{}", i);
            fixture.spotify.add_track(track(
                &format!("t{}", i),
                &format!("Song {}", i),
                &format!("artist-{}", i),
                &format!("Artist {}", i),
                Some(&isrc),
            ));
            kkbox_track(&format!("kk{}", i), &format!("Song {}", i), "X", Some(&isrc))
        })
        .collect();
    fixture.kkbox.related.insert("kk-seed".to_string(), related);
    let app = TestApp::with_fixture(fixture).await;

    let response = app
        .server()
        .get("/v1/track/recommend")
        .add_query_param("url", track_url("T"))
        .add_query_param("limit", "2")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(items(&body).len(), 2);

    let response = app
        .server()
        .get("/v1/track/recommend")
        .add_query_param("url", track_url("T"))
        .add_query_param("limit", "lots")
        .await;
    let body: Value = response.json();
    assert_eq!(items(&body).len(), 5);
}

#[tokio::test]
async fn test_unknown_mode_is_balanced() {
    let app = TestApp::with_fixture(seeded_fixture("Seed Song")).await;

    let body = app.recommend("T", Some("whatever")).await;
    assert_eq!(body["result"]["mode"], "balanced");

    let body = app.recommend("T", Some("related")).await;
    assert_eq!(body["result"]["mode"], "related");
}

#[tokio::test]
async fn test_seed_without_isrc_skips_deezer() {
    let mut fixture = Fixture::default();
    fixture
        .spotify
        .add_track(track("T", "Seed Song", "artist-a", "A", None));
    fixture.deezer.searches.insert(
        "Seed Song|A".to_string(),
        DeezerTrack {
            bpm: 150.0,
            ..Default::default()
        },
    );
    let app = TestApp::with_fixture(fixture).await;

    let body = app.recommend("T", None).await;

    assert!(body["result"]["seed_features"].is_null());
}

// =============================================================================
// Sources
// =============================================================================

fn lastfm_similar(name: &str, artist: &str) -> FakeLastFm {
    FakeLastFm {
        similar: vec![LastFmTrack {
            name: name.to_string(),
            artist_name: artist.to_string(),
            match_score: 0.8,
            ..Default::default()
        }],
        ..Default::default()
    }
}

#[tokio::test]
async fn test_failing_source_does_not_fail_request() {
    let mut fixture = seeded_fixture("Seed Song");
    fixture.kkbox.failing = true;
    fixture.lastfm = Some(lastfm_similar("Song One", "B"));
    fixture.spotify.searches.insert(
        "track:Song One artist:B".to_string(),
        vec![track("t1", "Song One", "artist-b", "B", Some(I1))],
    );
    let app = TestApp::with_fixture(fixture).await;

    let body = app.recommend("T", None).await;

    assert_eq!(ids(&body), vec!["t1"]);
}

#[tokio::test(start_paused = true)]
async fn test_slow_source_keeps_other_candidates() {
    let mut fixture = seeded_fixture("Seed Song");
    fixture.kkbox.related.insert(
        "kk-seed".to_string(),
        vec![kkbox_track("kk1", "Song One", "B", Some(I1))],
    );
    fixture
        .spotify
        .add_track(track("t1", "Song One", "artist-b", "B", Some(I1)));
    fixture.lastfm = Some(FakeLastFm {
        delay: Some(Duration::from_secs(60)),
        ..lastfm_similar("Song Two", "C")
    });
    fixture.spotify.searches.insert(
        "track:Song Two artist:C".to_string(),
        vec![track("t2", "Song Two", "artist-c", "C", Some(I2))],
    );
    let settings = RecommendSettings {
        timeout: Duration::from_secs(5),
        ..Default::default()
    };
    let app = TestApp::with_settings(fixture, settings).await;

    let body = app.recommend("T", None).await;

    assert_eq!(ids(&body), vec!["t1"]);
}

#[tokio::test(start_paused = true)]
async fn test_slow_musicbrainz_tags_keep_other_features() {
    let mut fixture = seeded_fixture("Seed Song");
    fixture.kkbox.related.insert(
        "kk-seed".to_string(),
        vec![
            kkbox_track("kk1", "Song One", "B", Some(I1)),
            kkbox_track("kk2", "Song Two", "C", Some(I2)),
        ],
    );
    fixture
        .spotify
        .add_track(track("t1", "Song One", "artist-b", "B", Some(I1)));
    fixture
        .spotify
        .add_track(track("t2", "Song Two", "artist-c", "C", Some(I2)));
    fixture.spotify.set_genres("artist-c", &["anime"]);
    fixture.deezer.add(SEED_ISRC, 175.0, 240, -8.0);
    fixture.deezer.add(I1, 178.0, 245, -8.0);
    fixture.musicbrainz.add_recording(I1, &["j-pop"], None);
    fixture.musicbrainz.add_recording(I2, &["j-pop"], None);
    for isrc in [I1, I2] {
        fixture
            .musicbrainz
            .slow_isrcs
            .insert(isrc.to_string(), Duration::from_secs(60));
    }
    let settings = RecommendSettings {
        timeout: Duration::from_secs(5),
        candidate_musicbrainz_tags: true,
        ..Default::default()
    };
    let app = TestApp::with_settings(fixture, settings).await;

    let body = app.recommend("T", None).await;

    let found = items(&body);
    assert_eq!(found.len(), 2);
    let t1 = found.iter().find(|item| item["id"] == "t1").unwrap();
    let t2 = found.iter().find(|item| item["id"] == "t2").unwrap();
    assert_eq!(t1["audio_features"]["bpm"], 178.0);
    assert_eq!(t2["audio_features"]["tags"][0], "anime");
    // The MusicBrainz tags never arrived
    assert!(t1["audio_features"]["tags"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_musicbrainz_artist_source() {
    let mut fixture = seeded_fixture("Seed Song");
    fixture
        .musicbrainz
        .add_recording(SEED_ISRC, &[], Some("mb-artist-a"));
    let recording = |title: &str, isrc: Option<&str>| MusicBrainzRecording {
        mbid: format!("rec-{}", title),
        title: title.to_string(),
        isrc: isrc.map(str::to_string),
        artist_name: "A".to_string(),
        ..Default::default()
    };
    fixture.musicbrainz.artist_recordings.insert(
        "mb-artist-a".to_string(),
        vec![
            recording("Seed Song", Some(SEED_ISRC)),
            recording("Album Cut", Some(I1)),
            recording("Unreleased", None),
        ],
    );
    fixture
        .spotify
        .add_track(track("t1", "Album Cut", "artist-a", "A", Some(I1)));
    fixture.spotify.searches.insert(
        "track:Unreleased artist:A".to_string(),
        vec![track("t9", "Unreleased", "artist-a", "A", None)],
    );
    let app = TestApp::with_fixture(fixture).await;

    let body = app.recommend("T", None).await;

    assert_eq!(ids(&body), vec!["t1"]);
    assert!(reasons(&items(&body)[0]).contains(&"same_artist".to_string()));
}

#[tokio::test]
async fn test_ytmusic_source() {
    let mut fixture = seeded_fixture("Seed Song");
    let mut ytmusic = FakeYtMusic::default();
    ytmusic.searches.insert(
        "A Seed Song".to_string(),
        vec![video("v-seed", "Seed Song", "A"), video("v-other", "Other", "Z")],
    );
    ytmusic.similar.insert(
        "v-seed".to_string(),
        vec![
            video("v-seed", "Seed Song Remaster", "A"),
            video("v1", "Song One", "B"),
        ],
    );
    let ytmusic = Arc::new(ytmusic);
    fixture.ytmusic = Some(Arc::clone(&ytmusic));

    fixture.spotify.searches.insert(
        "track:Song One artist:B".to_string(),
        vec![track("t1", "Song One", "artist-b", "B", Some(I1))],
    );
    fixture.spotify.searches.insert(
        "track:Seed Song Remaster artist:A".to_string(),
        vec![track("remaster", "Seed Song Remaster", "artist-a", "A", Some(I2))],
    );
    let app = TestApp::with_fixture(fixture).await;

    let body = app.recommend("T", None).await;

    assert_eq!(ids(&body), vec!["t1"]);
    let calls = ytmusic.search_calls.lock().unwrap().clone();
    assert_eq!(calls, vec![("A Seed Song".to_string(), 1)]);
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_unknown_seed_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .server()
        .get("/v1/track/recommend")
        .add_query_param("url", track_url("missing"))
        .await;

    response.assert_status_not_found();
    let body: Value = response.json();
    assert_eq!(body["status"], 404);
    assert_eq!(body["code"], "TRACK_NOT_FOUND");
}

#[tokio::test]
async fn test_seed_fetch_failure_is_service_unavailable() {
    let mut fixture = Fixture::default();
    fixture.spotify.unavailable = true;
    let app = TestApp::with_fixture(fixture).await;

    let response = app
        .server()
        .get("/v1/track/recommend")
        .add_query_param("url", track_url("T"))
        .await;

    response.assert_status_service_unavailable();
    let body: Value = response.json();
    assert_eq!(body["code"], "SOMETHING_API_ERROR");
}

#[tokio::test]
async fn test_invalid_urls() {
    let app = TestApp::new().await;

    for (url, code) in [
        ("", "EMPTY_PARAM"),
        ("https://example.com/track/abc", "NOT_SPOTIFY_URL"),
        ("https://open.spotify.com/album/abc123", "DIFFERENT_SPOTIFY_URL"),
        ("https://open.spotify.com/track/", "INVALID_URL"),
    ] {
        let response = app
            .server()
            .get("/v1/track/recommend")
            .add_query_param("url", url)
            .await;

        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["code"], code, "url {:?}", url);
    }
}
