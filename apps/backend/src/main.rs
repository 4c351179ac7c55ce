use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crossfade::config::Config;
use crossfade::error::{AppError, Result};
use crossfade::services::catalog::{LastFmCatalog, YouTubeMusicCatalog};
use crossfade::services::{
    Catalogs, DeezerClient, KkboxClient, LastFmClient, MusicBrainzClient, RecommendService,
    RecommendSettings, RedisTokenStore, SpotifyClient, TokenCache, TokenStore, YouTubeMusicClient,
};
use crossfade::{api, AppState};

fn init_tracing() {
    // RUST_LOG controls log levels.
    // Default: debug for our crate, info for axum, warn for dependencies
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("crossfade=debug,tower_http=debug,axum=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Shared token store, when Redis is configured and reachable.
async fn connect_token_store(config: &Config) -> Option<Arc<dyn TokenStore>> {
    let url = config.redis_url()?;

    match RedisTokenStore::connect_shared(&url).await {
        Ok(store) => {
            tracing::info!("Redis token store connected");
            Some(store)
        }
        Err(e) => {
            tracing::warn!("Redis unavailable, tokens are cached in memory only: {}", e);
            None
        }
    }
}

/// Build every catalog client. Only the optional ones may be missing.
fn build_catalogs(config: &Config, cache: &Arc<TokenCache>) -> Result<Catalogs> {
    let missing = |name: &str| AppError::Internal(format!("{} credentials missing", name));

    let spotify = SpotifyClient::new_shared(
        config.spotify.client_id.as_deref().ok_or_else(|| missing("Spotify"))?,
        config.spotify.client_secret.as_deref().ok_or_else(|| missing("Spotify"))?,
        Arc::clone(cache),
    )?;

    let kkbox = KkboxClient::new_shared(
        config.kkbox.client_id.as_deref().ok_or_else(|| missing("KKBOX"))?,
        config.kkbox.client_secret.as_deref().ok_or_else(|| missing("KKBOX"))?,
        Arc::clone(cache),
    )?;

    let deezer = DeezerClient::new_shared()?;

    let musicbrainz = MusicBrainzClient::new_shared(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        &config.musicbrainz.contact,
        config.musicbrainz.rate_limit_ms,
    )?;

    let lastfm: Option<Arc<dyn LastFmCatalog>> = match config.lastfm.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => match LastFmClient::new_shared(key) {
            Ok(client) => {
                tracing::info!("Last.fm client initialized");
                Some(client)
            }
            Err(e) => {
                tracing::error!("Failed to create Last.fm client: {}", e);
                None
            }
        },
        _ => None,
    };

    let ytmusic: Option<Arc<dyn YouTubeMusicCatalog>> = match config.ytmusic.base_url.as_deref() {
        Some(url) if !url.trim().is_empty() => match YouTubeMusicClient::new_shared(url) {
            Ok(client) => {
                tracing::info!("YouTube Music sidecar client initialized");
                Some(client)
            }
            Err(e) => {
                tracing::error!("Failed to create YouTube Music client: {}", e);
                None
            }
        },
        _ => None,
    };

    Ok(Catalogs {
        spotify,
        kkbox,
        deezer,
        musicbrainz,
        lastfm,
        ytmusic,
    })
}

#[tokio::main]
async fn main() {
    // Initialize tracing first so we can log configuration loading
    init_tracing();

    tracing::info!("Starting crossfade v{}", env!("CARGO_PKG_VERSION"));

    let config = match Config::load() {
        Ok(cfg) => {
            tracing::info!("Configuration loaded successfully");
            tracing::debug!("Config: {:?}", cfg);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = config.require_credentials() {
        tracing::error!("{}", e);
        std::process::exit(1);
    }

    let token_cache = TokenCache::new_shared(connect_token_store(&config).await);

    let catalogs = match build_catalogs(&config, &token_cache) {
        Ok(catalogs) => catalogs,
        Err(e) => {
            tracing::error!("Failed to create catalog clients: {}", e);
            std::process::exit(1);
        }
    };

    let recommend_service = RecommendService::new_shared(
        catalogs.clone(),
        RecommendSettings::from(&config.recommend),
    );

    let addr = config.server_addr();

    let state = AppState {
        config: Arc::new(config),
        catalogs,
        token_cache,
        recommend_service,
        start_time: std::time::Instant::now(),
    };

    let app = api::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("crossfade listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
