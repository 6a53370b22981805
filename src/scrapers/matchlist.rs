//! Match-list provider client.
//!
//! One POST per tick against the provider's matchList endpoint. The response
//! is `{ "data": [raw-match, ...] }`; a body without `data` is malformed and
//! fails the whole tick. Normalization is field renaming only, handled by the
//! serde model on `Match`.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::{Config, Match};

#[derive(Debug, Clone, Deserialize)]
pub struct MatchListResponse {
    pub data: Vec<Match>,
}

#[derive(Clone)]
pub struct MatchListClient {
    client: Client,
    url: String,
    origin: String,
}

impl MatchListClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::AUTHORIZATION,
                    format!("Bearer {}", config.matchlist_token)
                        .parse()
                        .context("Invalid matchlist API token")?,
                );
                headers.insert(
                    reqwest::header::ACCEPT,
                    reqwest::header::HeaderValue::from_static("application/json"),
                );
                headers
            })
            .build()
            .context("Failed to build MatchListClient")?;

        Ok(Self {
            client,
            url: config.matchlist_url.clone(),
            origin: config.matchlist_origin.clone(),
        })
    }

    /// Fetch the current list of ongoing matches.
    pub async fn fetch_ongoing(&self) -> Result<Vec<Match>> {
        let resp = self
            .client
            .post(&self.url)
            .header(reqwest::header::ORIGIN, &self.origin)
            .json(&serde_json::json!({}))
            .send()
            .await
            .context("matchList request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("matchList {}: {}", status, text));
        }

        let body = resp.text().await.context("matchList body read failed")?;
        debug!(body_len = body.len(), "matchList response received");

        let parsed: MatchListResponse = serde_json::from_str(&body)
            .map_err(|e| {
                warn!(
                    error = %e,
                    body_preview = %body.chars().take(500).collect::<String>(),
                    "matchList JSON parse failed"
                );
                e
            })
            .context("invalid matchList response")?;

        Ok(parsed.data)
    }
}
