//! Application services for the crossfade backend.

pub mod cache;
pub mod catalog;
pub mod recommend;

pub use cache::{RedisTokenStore, TokenCache, TokenStore};
pub use catalog::{
    Catalogs, DeezerClient, KkboxClient, LastFmClient, MusicBrainzClient, SpotifyClient,
    YouTubeMusicClient,
};
pub use recommend::{RecommendResult, RecommendService, RecommendSettings};
