//! OAuth2 client-credentials flow shared by Spotify and KKBOX.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::{status_error, transport_error};
use crate::error::{AppError, Result};
use crate::services::cache::TokenCache;

/// Token endpoint response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds
    pub expires_in: u64,
}

/// Client credentials for one catalog, cached under `cache_key`.
pub struct ClientCredentials {
    service: &'static str,
    cache_key: &'static str,
    token_url: String,
    client_id: String,
    client_secret: String,
    cache: Arc<TokenCache>,
}

impl ClientCredentials {
    pub fn new(
        service: &'static str,
        cache_key: &'static str,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        cache: Arc<TokenCache>,
    ) -> Result<Self> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();

        if client_id.trim().is_empty() || client_secret.trim().is_empty() {
            return Err(AppError::Internal(format!(
                "{} client id and secret cannot be empty",
                service
            )));
        }

        Ok(Self {
            service,
            cache_key,
            token_url: token_url.into(),
            client_id,
            client_secret,
            cache,
        })
    }

    pub fn set_token_url(&mut self, token_url: impl Into<String>) {
        self.token_url = token_url.into();
    }

    /// Cached token, or a fresh one from the token endpoint.
    pub async fn token(&self, client: &Client) -> Result<String> {
        let cached = self.cache.get(self.cache_key).await;
        if !cached.is_empty() {
            return Ok(cached);
        }

        tracing::debug!(service = %self.service, "Requesting access token");

        let response = client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| transport_error(self.service, "token", e))?;

        if !response.status().is_success() {
            return Err(status_error(self.service, "token", &response));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            AppError::ServiceUnavailable(format!(
                "Failed to parse {} token response: {}",
                self.service, e
            ))
        })?;

        self.cache
            .save(
                self.cache_key,
                &token.access_token,
                Duration::from_secs(token.expires_in),
            )
            .await;

        Ok(token.access_token)
    }

    /// Send a bearer-authenticated request.
    ///
    /// A 401 or 400 invalidates the cached token and the request is sent once
    /// more with a fresh one.
    pub async fn send<F>(&self, client: &Client, path: &str, build: F) -> Result<Response>
    where
        F: Fn(&str) -> RequestBuilder,
    {
        let token = self.token(client).await?;
        let response = build(&token)
            .send()
            .await
            .map_err(|e| transport_error(self.service, path, e))?;

        if !is_auth_failure(response.status()) {
            return Ok(response);
        }

        tracing::warn!(
            service = %self.service,
            status = %response.status(),
            "Access token rejected, refreshing"
        );
        self.cache.invalidate(self.cache_key).await;

        let token = self.token(client).await?;
        build(&token)
            .send()
            .await
            .map_err(|e| transport_error(self.service, path, e))
    }
}

fn is_auth_failure(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::BAD_REQUEST
}
