pub mod client;
pub mod normalize;
pub mod params;
pub mod wire;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use client::{ApiError, ApiResult, SportsApi};
pub use normalize::{normalize, normalize_all, normalize_in, records_from_standings};
pub use params::{ParamValue, RequestParams};

// ---------------------------------------------------------------------------
// View models handed to the screens, independent of the wire format
// ---------------------------------------------------------------------------

/// A game as the scoreboard screens consume it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewGame {
    pub id: u64,
    pub home: TeamLine,
    pub away: TeamLine,
    pub status: GameStatus,
    /// Halftime is folded into `InProgress`; this keeps it distinguishable.
    pub is_halftime: bool,
    pub clock: Option<String>,  // only while InProgress
    pub period: Option<String>, // only while InProgress
    pub home_score: Option<u16>, // None iff Scheduled
    pub away_score: Option<u16>,
    pub start_time: Option<DateTime<Utc>>,
    pub time: String, // "7:30 PM"
    pub is_playoffs: bool,
    pub stage: Option<u8>,
    pub home_linescore: Option<Vec<String>>,
    pub away_linescore: Option<Vec<String>>,
    pub periods: Option<PeriodsProgress>,
}

impl ViewGame {
    pub fn is_live(&self) -> bool {
        self.status == GameStatus::InProgress
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamLine {
    pub id: Option<u64>,
    pub name: String,
    pub code: String, // "LAL"
    pub logo: Option<String>,
    pub record: String, // "31-12" or "-"
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    #[default]
    Scheduled,
    InProgress,
    Final,
}

impl GameStatus {
    pub fn label(&self) -> &'static str {
        match self {
            GameStatus::Scheduled => "Scheduled",
            GameStatus::InProgress => "In Progress",
            GameStatus::Final => "Final",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeriodsProgress {
    pub current: Option<u8>,
    pub total: Option<u8>,
    pub end_of_period: bool,
}

/// Win/loss counts for one team. Either side may be unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeamRecord {
    pub wins: Option<u32>,
    pub losses: Option<u32>,
}

impl TeamRecord {
    pub fn new(wins: u32, losses: u32) -> Self {
        Self { wins: Some(wins), losses: Some(losses) }
    }

    /// "{wins}-{losses}", or "-" unless both counts are known.
    pub fn display(&self) -> String {
        match (self.wins, self.losses) {
            (Some(w), Some(l)) => format!("{w}-{l}"),
            _ => "-".to_owned(),
        }
    }
}

/// Team records keyed by the stringified numeric team id.
pub type RecordsMap = HashMap<String, TeamRecord>;

// ---------------------------------------------------------------------------
// Odds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OddsEvent {
    #[serde(default)]
    pub id: String,
    pub commence_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub home_team: String,
    #[serde(default)]
    pub away_team: String,
    #[serde(default)]
    pub bookmakers: Vec<Bookmaker>,
}

impl OddsEvent {
    /// First bookmaker's price for `team` in the given market, if quoted.
    pub fn price_for(&self, market: &str, team: &str) -> Option<f64> {
        self.bookmakers
            .iter()
            .flat_map(|b| b.markets.iter())
            .filter(|m| m.key == market)
            .flat_map(|m| m.outcomes.iter())
            .find(|o| o.name == team)
            .map(|o| o.price)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Bookmaker {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub title: String,
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub markets: Vec<Market>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Market {
    #[serde(default)]
    pub key: String, // "h2h", "spreads", "totals"
    #[serde(default)]
    pub outcomes: Vec<Outcome>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Outcome {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: f64,
    pub point: Option<f64>,
}

// ---------------------------------------------------------------------------
// Social
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: u64,
    #[serde(default)]
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_following: bool,
}

/// Game preview copy served as `{ "content": "..." }`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GamePreview {
    pub game_id: String,
    pub content: String,
}
