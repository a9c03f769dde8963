use crate::params::RequestParams;
use crate::wire::{
    ContentEnvelope, ErrorBody, FollowRequest, FollowResponse, GamesEnvelope, OddsResponse,
    ResponseEnvelope, StandingRow, SuggestionsResponse,
};
use crate::{GamePreview, OddsEvent, UserProfile};
use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;

pub use reqwest::StatusCode;

pub type ApiResult<T> = Result<T, ApiError>;

pub const API_URL_VAR: &str = "COURTSIDE_API_URL";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const FALLBACK_MESSAGE: &str = "Something went wrong. Please try again.";

/// Client for the scores backend. Cheap to clone; clones share a connection pool.
#[derive(Debug, Clone)]
pub struct SportsApi {
    client: Client,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug)]
pub enum ApiError {
    Config(String),
    Network(reqwest::Error, String),
    Server { status: StatusCode, message: Option<String>, url: String },
    Parsing(String, String),
    Other(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Config(msg) => write!(f, "Configuration error: {msg}"),
            ApiError::Network(e, url) => write!(f, "Network error for {url}: {e}"),
            ApiError::Server { status, message, url } => match message {
                Some(m) => write!(f, "Server error {status} for {url}: {m}"),
                None => write!(f, "Server error {status} for {url}"),
            },
            ApiError::Parsing(e, url) => write!(f, "Parse error for {url}: {e}"),
            ApiError::Other(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Text shown in place of the data view: the server's own message when it
    /// sent one, otherwise a generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Server { message: Some(m), .. } => m.clone(),
            _ => FALLBACK_MESSAGE.to_owned(),
        }
    }
}

impl SportsApi {
    /// A blank base URL, or an HTTP client that cannot be built, is a
    /// configuration error.
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        let base_url: String = base_url.into();
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ApiError::Config("base URL is empty".into()));
        }
        let client = Client::builder()
            .user_agent(concat!("courtside/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Config(format!("building HTTP client: {e}")))?;
        Ok(Self { client, base_url: base_url.to_owned(), timeout: DEFAULT_TIMEOUT })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Historical odds snapshots. Requires `date`; `team1`, `team2` and
    /// `timestamp` narrow the result when defined.
    pub async fn historical_odds(&self, params: &RequestParams) -> ApiResult<Vec<OddsEvent>> {
        let raw: OddsResponse = self.get("/odds/historical", params, &[]).await?;
        Ok(raw.response.unwrap_or_default())
    }

    /// Raw games for a day, left as JSON values so the normalizer can decode
    /// them item by item.
    pub async fn games(&self, params: &RequestParams) -> ApiResult<Vec<serde_json::Value>> {
        let raw: ResponseEnvelope<serde_json::Value> = self.get("/games", params, &[]).await?;
        Ok(raw.response.unwrap_or_default())
    }

    /// Games for the week starting at `date`, served under `games`.
    pub async fn weekly_games(&self, params: &RequestParams) -> ApiResult<Vec<serde_json::Value>> {
        let raw: GamesEnvelope<serde_json::Value> = self.get("/games/weekly", params, &[]).await?;
        Ok(raw.games.unwrap_or_default())
    }

    pub async fn team_games(&self, params: &RequestParams) -> ApiResult<Vec<serde_json::Value>> {
        let team_id = path_segment(params, "teamId")?;
        let path = format!("/teams/{team_id}/games");
        let raw: ResponseEnvelope<serde_json::Value> = self.get(&path, params, &["teamId"]).await?;
        Ok(raw.response.unwrap_or_default())
    }

    pub async fn standings(&self, params: &RequestParams) -> ApiResult<Vec<StandingRow>> {
        let raw: ResponseEnvelope<StandingRow> = self.get("/standings", params, &[]).await?;
        Ok(raw.response.unwrap_or_default())
    }

    pub async fn game_preview(&self, params: &RequestParams) -> ApiResult<GamePreview> {
        let game_id = path_segment(params, "gameId")?;
        let path = format!("/games/{game_id}/preview");
        let raw: ContentEnvelope = self.get(&path, params, &["gameId"]).await?;
        let content = raw
            .content
            .ok_or_else(|| ApiError::Parsing("missing `content`".into(), self.url(&path)))?;
        Ok(GamePreview { game_id, content })
    }

    pub async fn follow_suggestions(&self, params: &RequestParams) -> ApiResult<Vec<UserProfile>> {
        let user_id = path_segment(params, "userId")?;
        let path = format!("/users/{user_id}/suggestions");
        let raw: SuggestionsResponse = self.get(&path, params, &["userId"]).await?;
        Ok(raw.response.unwrap_or_default())
    }

    /// Flip the follow relationship; returns the server's authoritative state.
    pub async fn toggle_follow(&self, follower_id: u64, followee_id: u64) -> ApiResult<bool> {
        let url = self.url("/follow/toggle");
        debug!("POST {url} ({follower_id} -> {followee_id})");
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&FollowRequest { follower_id, followee_id })
            .send()
            .await
            .map_err(|e| ApiError::Network(e, url.clone()))?;
        let body: FollowResponse = Self::read_json(response, &url).await?;
        Ok(body.is_following)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &RequestParams,
        path_fields: &[&str],
    ) -> ApiResult<T> {
        let url = self.url(path);
        let query = params.query_pairs(path_fields);
        debug!("GET {url} {query:?}");

        let response = self
            .client
            .get(&url)
            .query(&query)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ApiError::Network(e, url.clone()))?;

        Self::read_json(response, &url).await
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response, url: &str) -> ApiResult<T> {
        let status = response.status();
        if !status.is_success() {
            // The error body is best effort; many failures carry none.
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(ErrorBody::into_message);
            return Err(ApiError::Server { status, message, url: url.to_owned() });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(e, url.to_owned()))?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Parsing(e.to_string(), url.to_owned()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

fn path_segment(params: &RequestParams, key: &str) -> ApiResult<String> {
    params
        .get(key)
        .map(|v| v.to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Other(format!("missing required parameter `{key}`")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn api(server: &mockito::ServerGuard) -> SportsApi {
        SportsApi::new(server.url()).unwrap()
    }

    #[tokio::test]
    async fn historical_odds_sends_only_defined_fields() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/odds/historical")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("date".into(), "2025-01-01".into()),
                Matcher::UrlEncoded("team1".into(), "Los Angeles Lakers".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"response":[{"id":"evt1","home_team":"Los Angeles Lakers","away_team":"Boston Celtics",
                    "bookmakers":[{"key":"dk","title":"DraftKings","markets":[{"key":"h2h","outcomes":[
                    {"name":"Los Angeles Lakers","price":-150},{"name":"Boston Celtics","price":130}]}]}]}]}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let params = RequestParams::new()
            .with("date", "2025-01-01")
            .with("team1", "Los Angeles Lakers")
            .with_opt::<&str>("team2", None);
        let odds = api(&server).historical_odds(&params).await.unwrap();

        assert_eq!(odds.len(), 1);
        assert_eq!(odds[0].price_for("h2h", "Boston Celtics"), Some(130.0));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn weekly_games_read_the_games_field() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/games/weekly")
            .match_query(Matcher::UrlEncoded("date".into(), "2025-01-06".into()))
            .with_status(200)
            .with_body(r#"{"games":[{"id":1},{"id":2}]}"#)
            .create_async()
            .await;

        let params = RequestParams::new().with("date", "2025-01-06");
        let games = api(&server).weekly_games(&params).await.unwrap();
        assert_eq!(games.len(), 2);
    }

    #[tokio::test]
    async fn missing_results_field_is_an_empty_list() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/games")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let params = RequestParams::new().with("date", "2025-01-01");
        assert!(api(&server).games(&params).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn team_games_put_the_team_in_the_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/teams/17/games")
            .match_query(Matcher::UrlEncoded("season".into(), "2024".into()))
            .with_status(200)
            .with_body(r#"{"response":[{"id":9}]}"#)
            .create_async()
            .await;

        let params = RequestParams::new().with("teamId", 17u64).with("season", 2024i64);
        let games = api(&server).team_games(&params).await.unwrap();
        assert_eq!(games.len(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_message_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/games")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body(r#"{"message":"Upstream quota exceeded"}"#)
            .create_async()
            .await;

        let params = RequestParams::new().with("date", "2025-01-01");
        let err = api(&server).games(&params).await.unwrap_err();
        assert!(matches!(err, ApiError::Server { status, .. } if status == StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(err.user_message(), "Upstream quota exceeded");
    }

    #[tokio::test]
    async fn error_without_body_uses_fallback() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/games")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let params = RequestParams::new().with("date", "2025-01-01");
        let err = api(&server).games(&params).await.unwrap_err();
        assert_eq!(err.user_message(), FALLBACK_MESSAGE);
    }

    #[tokio::test]
    async fn preview_requires_content() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/games/42/preview")
            .with_status(200)
            .with_body(r#"{"content":"Lakers host the Celtics."}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/games/43/preview")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let ok = api(&server)
            .game_preview(&RequestParams::new().with("gameId", "42"))
            .await
            .unwrap();
        assert_eq!(ok.content, "Lakers host the Celtics.");
        assert_eq!(ok.game_id, "42");

        let missing = api(&server)
            .game_preview(&RequestParams::new().with("gameId", "43"))
            .await;
        assert!(matches!(missing, Err(ApiError::Parsing(..))));
    }

    #[tokio::test]
    async fn toggle_follow_posts_ids() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/follow/toggle")
            .match_body(Matcher::Json(serde_json::json!({ "followerId": 1, "followeeId": 7 })))
            .with_status(200)
            .with_body(r#"{"isFollowing":true}"#)
            .create_async()
            .await;

        assert!(api(&server).toggle_follow(1, 7).await.unwrap());
        mock.assert_async().await;
    }

    #[test]
    fn blank_base_url_is_a_config_error() {
        assert!(matches!(SportsApi::new("   "), Err(ApiError::Config(_))));
        assert!(matches!(SportsApi::new("/"), Err(ApiError::Config(_))));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let api = SportsApi::new(" http://localhost:3000/ ").unwrap();
        assert_eq!(api.base_url(), "http://localhost:3000");
    }
}
