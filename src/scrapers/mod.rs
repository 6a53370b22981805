pub mod matchlist; // Upstream match-list provider (bearer-authenticated POST)
pub mod odds_api; // Per-market odds provider (plain GET)

pub use matchlist::MatchListClient;
pub use odds_api::OddsClient;
