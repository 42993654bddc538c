//! Access token refresh
//!
//! Exchanges the long-lived refresh token for a new short-lived access token
//! against the accounts token endpoint. One network call, no retry; the
//! retry policy belongs to the sync engine.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::SpotifyConfig;
use crate::error::AuthError;

const TOKEN_ENDPOINT: &str = "https://accounts.spotify.com/api/token";

/// Obtains a fresh access token from the long-lived refresh credential
#[async_trait]
pub trait RefreshTokens: Send + Sync {
    async fn refresh(&self) -> Result<String, AuthError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

pub struct TokenRefresher {
    client: Client,
    credentials: SpotifyConfig,
}

impl TokenRefresher {
    pub fn new(client: Client, credentials: SpotifyConfig) -> Self {
        Self {
            client,
            credentials,
        }
    }
}

#[async_trait]
impl RefreshTokens for TokenRefresher {
    /// Exchange the refresh token for a new access token
    async fn refresh(&self) -> Result<String, AuthError> {
        tracing::info!("Refreshing access token");

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", self.credentials.refresh_token.as_str()),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
        ];

        let response = self
            .client
            .post(TOKEN_ENDPOINT)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Token endpoint rejected refresh: {}", status);
            return Err(AuthError::RemoteRejected(status.as_u16()));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|_| AuthError::RemoteRejected(status.as_u16()))?;

        match body.access_token {
            Some(token) if !token.is_empty() => {
                tracing::info!("Access token refreshed");
                Ok(token)
            }
            _ => Err(AuthError::RemoteRejected(status.as_u16())),
        }
    }
}
