//! Per-market odds provider client.
//!
//! One GET per market id per tick. A response without `result` is a miss (the
//! market has no odds right now), not a failure; missing sub-arrays default to
//! empty so a thin response still produces a complete entry.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::models::{Config, OddsEntry};

#[derive(Debug, Clone, Deserialize)]
pub struct OddsResponse {
    #[serde(default)]
    pub result: Option<MarketOdds>,
}

/// Raw odds payload for one market, as the provider shapes it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketOdds {
    #[serde(default)]
    pub team_data: Vec<Value>,
    #[serde(default)]
    pub session: Vec<Value>,
    #[serde(default)]
    pub commission_fancy_data: Vec<Value>,
    #[serde(default)]
    pub no_commission_fancy_data: Vec<Value>,
}

/// Build the cached entry for a market, resolving the display name from the
/// tick's match view. Markets the list no longer explains get a synthesized
/// label rather than an empty one.
pub fn build_entry(market_id: &str, odds: MarketOdds, match_refs: &[(String, String)]) -> OddsEntry {
    let match_name = match_refs
        .iter()
        .find(|(id, _)| id == market_id)
        .map(|(_, name)| name.clone())
        .unwrap_or_else(|| format!("Market {market_id}"));

    OddsEntry {
        match_name,
        match_odds: odds.team_data,
        fancy_markets: odds.session,
        commission_fancy: odds.commission_fancy_data,
        no_commission_fancy: odds.no_commission_fancy_data,
    }
}

#[derive(Clone)]
pub struct OddsClient {
    client: Client,
    url: String,
}

impl OddsClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .build()
            .context("Failed to build OddsClient")?;

        Ok(Self {
            client,
            url: config.odds_url.clone(),
        })
    }

    /// Fetch odds for one market. `Ok(None)` means the provider answered but
    /// carried no `result` for this market.
    pub async fn fetch_market_odds(&self, market_id: &str) -> Result<Option<MarketOdds>> {
        let resp = self
            .client
            .get(&self.url)
            .query(&[("market_id", market_id)])
            .send()
            .await
            .with_context(|| format!("oddsData request failed for market {market_id}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "oddsData market {} {}: {}",
                market_id,
                status,
                text
            ));
        }

        let parsed: OddsResponse = resp
            .json()
            .await
            .with_context(|| format!("invalid oddsData response for market {market_id}"))?;

        Ok(parsed.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn refs() -> Vec<(String, String)> {
        vec![
            ("1.1".to_string(), "A v B".to_string()),
            ("1.2".to_string(), "C v D".to_string()),
        ]
    }

    #[test]
    fn entry_takes_name_from_match_view() {
        let entry = build_entry("1.2", MarketOdds::default(), &refs());
        assert_eq!(entry.match_name, "C v D");
    }

    #[test]
    fn entry_falls_back_to_synthesized_label() {
        let entry = build_entry("1.9", MarketOdds::default(), &refs());
        assert_eq!(entry.match_name, "Market 1.9");
    }

    #[test]
    fn entry_maps_all_four_sequences() {
        let odds: MarketOdds = serde_json::from_value(json!({
            "team_data": [{"runner": "A", "back": 1.9, "lay": 1.92}],
            "session": [{"name": "10 over runs"}],
            "commission_fancy_data": [{"name": "fall of wicket"}],
            "no_commission_fancy_data": []
        }))
        .unwrap();

        let entry = build_entry("1.1", odds, &refs());
        assert_eq!(entry.match_odds.len(), 1);
        assert_eq!(entry.fancy_markets.len(), 1);
        assert_eq!(entry.commission_fancy.len(), 1);
        assert!(entry.no_commission_fancy.is_empty());
    }

    #[test]
    fn missing_sub_arrays_default_to_empty() {
        let resp: OddsResponse =
            serde_json::from_str(r#"{"result": {"team_data": [{"back": 2.0}]}}"#).unwrap();
        let odds = resp.result.unwrap();
        assert_eq!(odds.team_data.len(), 1);
        assert!(odds.session.is_empty());
        assert!(odds.commission_fancy_data.is_empty());
        assert!(odds.no_commission_fancy_data.is_empty());
    }

    #[test]
    fn response_without_result_is_a_miss() {
        let resp: OddsResponse = serde_json::from_str(r#"{"status": 200}"#).unwrap();
        assert!(resp.result.is_none());
    }
}
