//! OddsFeed - live sports odds relay
//!
//! Two timer-driven pollers fetch ongoing matches and per-market odds from the
//! upstream providers, cache the latest snapshot in memory, and fan updates out
//! to WebSocket subscribers. A small REST surface serves point lookups.

mod api;
mod models;
mod scrapers;
mod store;

use anyhow::{Context, Result};
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    http::{HeaderValue, Method},
    response::Response,
    routing::get,
    Router,
};
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpListener, sync::broadcast, time::interval};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    models::{Config, Match, WsEvent},
    scrapers::{odds_api, MatchListClient, OddsClient},
    store::SnapshotStore,
};

/// Application state shared across all handlers and pollers
#[derive(Clone)]
struct AppState {
    store: Arc<SnapshotStore>,
    events: broadcast::Sender<WsEvent>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::from_env()?;

    info!("🚀 OddsFeed starting");
    if config.matchlist_token.trim().is_empty() {
        warn!("⚠️  MATCHLIST_API_TOKEN is empty - the match-list provider will likely reject us");
    }

    let store = Arc::new(SnapshotStore::new());
    let (events_tx, _events_rx) = broadcast::channel::<WsEvent>(1000);

    let matchlist = MatchListClient::new(&config)?;
    let odds = OddsClient::new(&config)?;

    // The two pollers run on independent timers; each failure is logged and
    // swallowed so a bad tick never takes the process down.
    tokio::spawn(match_polling(
        matchlist,
        store.clone(),
        events_tx.clone(),
        config.match_poll_ms,
    ));
    tokio::spawn(odds_polling(
        odds,
        store.clone(),
        events_tx.clone(),
        config.odds_poll_ms,
    ));

    let app_state = AppState {
        store,
        events: events_tx,
    };

    // Single allowed browser origin for both REST and the WebSocket upgrade.
    let cors = CorsLayer::new()
        .allow_origin(
            config
                .allowed_origin
                .parse::<HeaderValue>()
                .context("Invalid ALLOWED_ORIGIN")?,
        )
        .allow_methods([Method::GET, Method::POST])
        .allow_credentials(true);

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(websocket_handler))
        .merge(api::api_router())
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("🎯 API server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Initialize tracing with env-filter overrides
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oddsfeed_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Poll the match-list provider and replace the cached match list wholesale.
///
/// A failed tick leaves the store untouched and emits nothing; the next tick
/// is the retry policy.
async fn match_polling(
    client: MatchListClient,
    store: Arc<SnapshotStore>,
    events: broadcast::Sender<WsEvent>,
    poll_ms: u64,
) {
    info!("📋 Starting match-list poller ({poll_ms}ms interval)");
    let mut ticker = interval(Duration::from_millis(poll_ms));

    loop {
        ticker.tick().await;
        apply_match_tick(client.fetch_ongoing().await, &store, &events);
    }
}

/// Apply one match-list fetch outcome to the store and announce it.
///
/// A failed fetch leaves the previous match list (and its odds) untouched and
/// emits nothing; subscribers simply see no update until the next good tick.
fn apply_match_tick(
    outcome: Result<Vec<Match>>,
    store: &SnapshotStore,
    events: &broadcast::Sender<WsEvent>,
) {
    match outcome {
        Ok(matches) => {
            let evicted = store.replace_matches(matches.clone());
            if evicted > 0 {
                debug!(evicted, "evicted odds entries for ended markets");
            }
            let _ = events.send(WsEvent::UpdateMatches(matches));
        }
        Err(e) => {
            warn!("Match list fetch failed (will retry next tick): {e:#}");
        }
    }
}

/// Poll the odds provider once per known market, sequentially.
///
/// The tick works against a point-in-time view of the match list, so a
/// concurrent match replacement cannot tear the id/name pairing mid-loop.
/// Each request has its own failure boundary; failures are aggregated and the
/// remaining markets still update. Sequential fetching bounds the load we put
/// on the provider and is fine while the live match count stays small.
async fn odds_polling(
    client: OddsClient,
    store: Arc<SnapshotStore>,
    events: broadcast::Sender<WsEvent>,
    poll_ms: u64,
) {
    info!("📊 Starting odds poller ({poll_ms}ms interval)");
    let mut ticker = interval(Duration::from_millis(poll_ms));

    loop {
        ticker.tick().await;

        let match_refs = store.match_refs();
        if match_refs.is_empty() {
            continue;
        }

        let mut updated = 0usize;
        let mut failures = 0usize;

        for (market_id, _) in &match_refs {
            match client.fetch_market_odds(market_id).await {
                Ok(Some(odds)) => {
                    let entry = odds_api::build_entry(market_id, odds, &match_refs);
                    store.upsert_odds(market_id.clone(), entry);
                    updated += 1;
                }
                Ok(None) => {
                    debug!(market_id = %market_id, "odds response carried no result");
                }
                Err(e) => {
                    failures += 1;
                    debug!(market_id = %market_id, error = %e, "odds fetch failed");
                }
            }
        }

        if failures > 0 {
            warn!(
                failures,
                total = match_refs.len(),
                "odds tick finished with failed markets"
            );
        }

        // Nothing fresh this tick means nothing to announce.
        if updated > 0 {
            let _ = events.send(WsEvent::UpdateOdds(store.odds_map()));
        }
    }
}

/// WebSocket handler for live match and odds streaming
async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// The pair of frames a subscriber receives the moment it connects, so late
/// joiners see the current snapshot instead of waiting for the next tick.
fn initial_events(store: &SnapshotStore) -> [WsEvent; 2] {
    let snapshot = store.snapshot();
    [
        WsEvent::UpdateMatches(snapshot.matches),
        WsEvent::UpdateOdds(snapshot.odds),
    ]
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let mut rx = state.events.subscribe();
    info!("Client connected");

    for event in initial_events(&state.store) {
        let msg = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        if socket.send(Message::Text(msg)).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            // Forward poller updates to this client
            Ok(event) = rx.recv() => {
                let msg = serde_json::to_string(&event)
                    .unwrap_or_else(|e| {
                        warn!("Failed to serialize ws event: {}", e);
                        "{}".to_string()
                    });
                if socket.send(Message::Text(msg)).await.is_err() {
                    break;
                }
            }
            // Handle incoming messages from client
            Some(Ok(msg)) = socket.recv() => {
                match msg {
                    Message::Text(text) => {
                        if text == "ping" {
                            let _ = socket.send(Message::Text("pong".to_string())).await;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            else => break,
        }
    }

    info!("Client disconnected");
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OddsFeed operational"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OddsEntry;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn mk_match(event_id: &str, market_id: &str, name: &str) -> Match {
        Match {
            event_id: event_id.to_string(),
            match_name: name.to_string(),
            match_date: None,
            market_id: market_id.to_string(),
            score_iframe: None,
        }
    }

    #[test]
    fn successful_match_tick_replaces_and_announces() {
        let store = SnapshotStore::new();
        let (events, mut rx) = broadcast::channel::<WsEvent>(16);

        apply_match_tick(Ok(vec![mk_match("1", "1.1", "A v B")]), &store, &events);

        assert_eq!(store.match_refs().len(), 1);
        match rx.try_recv().unwrap() {
            WsEvent::UpdateMatches(matches) => assert_eq!(matches[0].market_id, "1.1"),
            other => panic!("expected updateMatches, got {other:?}"),
        }
    }

    #[test]
    fn failed_match_tick_leaves_store_and_emits_nothing() {
        let store = SnapshotStore::new();
        store.replace_matches(vec![mk_match("1", "1.1", "A v B")]);
        store.upsert_odds(
            "1.1".to_string(),
            OddsEntry {
                match_name: "A v B".to_string(),
                ..Default::default()
            },
        );
        let before = store.snapshot();

        let (events, mut rx) = broadcast::channel::<WsEvent>(16);
        apply_match_tick(Err(anyhow::anyhow!("connection refused")), &store, &events);

        let after = store.snapshot();
        assert_eq!(before.matches, after.matches);
        assert_eq!(before.odds, after.odds);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn health_endpoint_responds() {
        let app = Router::new().route("/health", get(health_check));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"OddsFeed operational");
    }

    #[test]
    fn initial_events_reflect_current_store() {
        let store = SnapshotStore::new();
        store.replace_matches(vec![Match {
            event_id: "1".to_string(),
            match_name: "A v B".to_string(),
            match_date: None,
            market_id: "1.1".to_string(),
            score_iframe: None,
        }]);
        store.upsert_odds(
            "1.1".to_string(),
            OddsEntry {
                match_name: "A v B".to_string(),
                ..Default::default()
            },
        );

        let [matches_event, odds_event] = initial_events(&store);
        match matches_event {
            WsEvent::UpdateMatches(matches) => {
                assert_eq!(matches.len(), 1);
                assert_eq!(matches[0].market_id, "1.1");
            }
            other => panic!("expected updateMatches, got {other:?}"),
        }
        match odds_event {
            WsEvent::UpdateOdds(odds) => {
                assert_eq!(odds.len(), 1);
                assert_eq!(odds["1.1"].match_name, "A v B");
            }
            other => panic!("expected updateOdds, got {other:?}"),
        }
    }

    #[test]
    fn initial_events_on_empty_store_are_empty_payloads() {
        let store = SnapshotStore::new();
        let [matches_event, odds_event] = initial_events(&store);
        assert!(matches!(matches_event, WsEvent::UpdateMatches(ref m) if m.is_empty()));
        assert!(matches!(odds_event, WsEvent::UpdateOdds(ref o) if o.is_empty()));
    }
}
