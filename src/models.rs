use serde::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One ongoing match as published to subscribers.
///
/// Field names stay camelCase on the wire so the upstream payload and the
/// frontend contract line up without a mapping layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    #[serde(deserialize_with = "de_string")]
    pub event_id: String,
    pub match_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_date: Option<String>,
    #[serde(deserialize_with = "de_string")]
    pub market_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_iframe: Option<String>,
}

/// Cached odds for a single market. The four price sequences are opaque
/// upstream JSON; we cache and forward them without interpreting prices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OddsEntry {
    pub match_name: String,
    pub match_odds: Vec<Value>,
    pub fancy_markets: Vec<Value>,
    pub commission_fancy: Vec<Value>,
    pub no_commission_fancy: Vec<Value>,
}

/// Events pushed to WebSocket subscribers, framed as
/// `{"type": "updateMatches" | "updateOdds", "data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WsEvent {
    #[serde(rename = "updateMatches")]
    UpdateMatches(Vec<Match>),
    #[serde(rename = "updateOdds")]
    UpdateOdds(HashMap<String, OddsEntry>),
}

// Upstream ids arrive as strings or bare numbers depending on the provider's mood.
fn de_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    match v {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub allowed_origin: String,
    pub matchlist_url: String,
    pub matchlist_token: String,
    pub matchlist_origin: String,
    pub odds_url: String,
    pub match_poll_ms: u64,
    pub odds_poll_ms: u64,
    pub upstream_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .unwrap_or(5000);

        let allowed_origin = std::env::var("ALLOWED_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let matchlist_url = std::env::var("MATCHLIST_API_URL")
            .unwrap_or_else(|_| "https://api.btx99.com/v1/sports/matchList".to_string());

        let matchlist_token = std::env::var("MATCHLIST_API_TOKEN").unwrap_or_default();

        // The provider rejects requests without a browser-looking Origin header.
        let matchlist_origin = std::env::var("MATCHLIST_ORIGIN")
            .unwrap_or_else(|_| "https://btx99.com".to_string());

        let odds_url = std::env::var("ODDS_API_URL")
            .unwrap_or_else(|_| "https://oddsapi.winx777.com/v2/api/oddsData".to_string());

        let match_poll_ms = std::env::var("MATCH_POLL_MS")
            .unwrap_or_else(|_| "1000".to_string())
            .parse()
            .unwrap_or(1000);

        let odds_poll_ms = std::env::var("ODDS_POLL_MS")
            .unwrap_or_else(|_| "1000".to_string())
            .parse()
            .unwrap_or(1000);

        let upstream_timeout_secs = std::env::var("UPSTREAM_TIMEOUT_SECS")
            .unwrap_or_else(|_| "8".to_string())
            .parse()
            .unwrap_or(8);

        Ok(Self {
            port,
            allowed_origin,
            matchlist_url,
            matchlist_token,
            matchlist_origin,
            odds_url,
            match_poll_ms,
            odds_poll_ms,
            upstream_timeout_secs,
        })
    }
}
