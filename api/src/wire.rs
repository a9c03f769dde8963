//! Raw wire types for the upstream basketball feed and the backend's response
//! envelopes. These map to the view models via `normalize.rs`.
use crate::{OddsEvent, UserProfile};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// `{ "response": [...] }`, used by most list endpoints.
#[derive(Debug, Deserialize)]
pub struct ResponseEnvelope<T> {
    pub response: Option<Vec<T>>,
}

/// `{ "games": [...] }` from the weekly schedule endpoint.
#[derive(Debug, Deserialize)]
pub struct GamesEnvelope<T> {
    pub games: Option<Vec<T>>,
}

/// `{ "content": "..." }`: preview copy.
#[derive(Debug, Deserialize)]
pub struct ContentEnvelope {
    pub content: Option<String>,
}

/// Error body; the backend uses either field name.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message
            .or(self.error)
            .filter(|m| !m.trim().is_empty())
    }
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowRequest {
    pub follower_id: u64,
    pub followee_id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowResponse {
    pub is_following: bool,
}

pub type OddsResponse = ResponseEnvelope<OddsEvent>;
pub type SuggestionsResponse = ResponseEnvelope<UserProfile>;

// ---------------------------------------------------------------------------
// Games
// ---------------------------------------------------------------------------

// Every field below goes through `lenient`: a value of the wrong JSON type
// reads as absent, so only a non-object item can fail to decode.

#[derive(Debug, Deserialize, Default, Clone)]
pub struct RawGame {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub date: Option<RawDate>,
    #[serde(default, deserialize_with = "lenient")]
    pub stage: Option<u8>,
    #[serde(default, deserialize_with = "lenient")]
    pub playoffs: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<RawStatus>,
    #[serde(default, deserialize_with = "lenient")]
    pub periods: Option<RawPeriods>,
    #[serde(default, deserialize_with = "lenient")]
    pub teams: Option<RawTeams>,
    #[serde(default, deserialize_with = "lenient")]
    pub scores: Option<RawScores>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct RawDate {
    #[serde(default, deserialize_with = "lenient")]
    pub start: Option<String>, // ISO 8601
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct RawStatus {
    #[serde(default, deserialize_with = "lenient")]
    pub long: Option<String>, // "Scheduled", "In Play", "Halftime", "Finished"
    #[serde(default, deserialize_with = "lenient")]
    pub clock: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub halftime: Option<bool>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct RawPeriods {
    #[serde(default, deserialize_with = "lenient")]
    pub current: Option<u8>,
    #[serde(default, deserialize_with = "lenient")]
    pub total: Option<u8>,
    #[serde(default, rename = "endOfPeriod", deserialize_with = "lenient")]
    pub end_of_period: Option<bool>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct RawTeams {
    #[serde(default, deserialize_with = "lenient")]
    pub home: Option<RawTeam>,
    #[serde(default, deserialize_with = "lenient")]
    pub visitors: Option<RawTeam>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct RawTeam {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub nickname: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub logo: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct RawScores {
    #[serde(default, deserialize_with = "lenient")]
    pub home: Option<RawTeamScore>,
    #[serde(default, deserialize_with = "lenient")]
    pub visitors: Option<RawTeamScore>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct RawTeamScore {
    #[serde(default, deserialize_with = "lenient")]
    pub points: Option<u16>,
    /// The feed sends quarter scores as strings, occasionally as numbers.
    #[serde(default, deserialize_with = "lenient_linescore")]
    pub linescore: Option<Vec<String>>,
}

/// Any value that does not decode as `T` (including `null`) becomes `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_linescore<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let serde_json::Value::Array(values) = value else {
        return Ok(None);
    };
    Ok(Some(
        values
            .into_iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            })
            .collect(),
    ))
}

// ---------------------------------------------------------------------------
// Standings
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct StandingRow {
    #[serde(default, deserialize_with = "lenient")]
    pub team: Option<StandingTeam>,
    #[serde(default, deserialize_with = "lenient")]
    pub win: Option<StandingCount>,
    #[serde(default, deserialize_with = "lenient")]
    pub loss: Option<StandingCount>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct StandingTeam {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct StandingCount {
    #[serde(default, deserialize_with = "lenient")]
    pub total: Option<u32>,
}
