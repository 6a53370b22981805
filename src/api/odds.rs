//! Pull-based query routes over the cached snapshot.
//!
//! Everything here is a pure read of the store; the pollers are the only
//! writers. Unknown and missing market ids share one 404 body, matching what
//! the frontend already expects.

use axum::{
    extract::{Query, State as AxumState},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::models::OddsEntry;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct OddsQuery {
    pub market_id: Option<String>,
}

fn no_odds_available() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "No odds available" })),
    )
}

/// Latest cached odds for one market.
pub async fn get_market_odds(
    Query(params): Query<OddsQuery>,
    AxumState(state): AxumState<AppState>,
) -> Result<Json<OddsEntry>, (StatusCode, Json<Value>)> {
    let market_id = params
        .market_id
        .filter(|id| !id.is_empty())
        .ok_or_else(no_odds_available)?;

    state
        .store
        .get_odds(&market_id)
        .map(Json)
        .ok_or_else(no_odds_available)
}

pub fn api_router() -> Router<AppState> {
    Router::new().route("/api/odds", get(get_market_odds))
}
