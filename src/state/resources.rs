//! Backend lists the screens load through [`FetchHook`](crate::state::fetch::FetchHook).

use crate::state::fetch::Resource;
use courtside_api::wire::StandingRow;
use courtside_api::{
    ApiResult, GamePreview, OddsEvent, RecordsMap, RequestParams, SportsApi, UserProfile, ViewGame,
    normalize_all,
};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use std::sync::Arc;

/// Odds snapshots for a date, optionally narrowed by `team1`, `team2` and
/// `timestamp`.
pub struct HistoricalOdds {
    api: SportsApi,
}

impl HistoricalOdds {
    pub fn new(api: SportsApi) -> Self {
        Self { api }
    }
}

impl Resource for HistoricalOdds {
    type Item = OddsEvent;

    fn name(&self) -> &'static str {
        "historical_odds"
    }

    fn required(&self) -> &'static [&'static str] {
        &["date"]
    }

    fn fetch(&self, params: &RequestParams) -> BoxFuture<'static, ApiResult<Vec<OddsEvent>>> {
        let api = self.api.clone();
        let params = params.clone();
        async move { api.historical_odds(&params).await }.boxed()
    }
}

/// Which games endpoint a [`Games`] resource reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamesFeed {
    /// `/games`, keyed by `date`.
    Daily,
    /// `/games/weekly`, keyed by the week's first `date`.
    Weekly,
    /// `/teams/{teamId}/games`.
    Team,
}

/// Normalized games from one of the game feeds. Team records, when supplied,
/// fill in the "W-L" line on each side.
pub struct Games {
    api: SportsApi,
    feed: GamesFeed,
    records: Option<Arc<RecordsMap>>,
}

impl Games {
    pub fn new(api: SportsApi, feed: GamesFeed) -> Self {
        Self { api, feed, records: None }
    }

    pub fn daily(api: SportsApi) -> Self {
        Self::new(api, GamesFeed::Daily)
    }

    pub fn weekly(api: SportsApi) -> Self {
        Self::new(api, GamesFeed::Weekly)
    }

    pub fn for_team(api: SportsApi) -> Self {
        Self::new(api, GamesFeed::Team)
    }

    pub fn with_records(mut self, records: RecordsMap) -> Self {
        self.records = Some(Arc::new(records));
        self
    }
}

impl Resource for Games {
    type Item = ViewGame;

    fn name(&self) -> &'static str {
        match self.feed {
            GamesFeed::Daily => "games",
            GamesFeed::Weekly => "weekly_games",
            GamesFeed::Team => "team_games",
        }
    }

    fn required(&self) -> &'static [&'static str] {
        match self.feed {
            GamesFeed::Daily | GamesFeed::Weekly => &["date"],
            GamesFeed::Team => &["teamId"],
        }
    }

    fn fetch(&self, params: &RequestParams) -> BoxFuture<'static, ApiResult<Vec<ViewGame>>> {
        let api = self.api.clone();
        let params = params.clone();
        let records = self.records.clone();
        let feed = self.feed;
        async move {
            let raw = match feed {
                GamesFeed::Daily => api.games(&params).await?,
                GamesFeed::Weekly => api.weekly_games(&params).await?,
                GamesFeed::Team => api.team_games(&params).await?,
            };
            Ok(normalize_all(raw, records.as_deref()))
        }
        .boxed()
    }
}

/// League standings for a `season`; feed them to
/// [`records_from_standings`](courtside_api::records_from_standings).
pub struct Standings {
    api: SportsApi,
}

impl Standings {
    pub fn new(api: SportsApi) -> Self {
        Self { api }
    }
}

impl Resource for Standings {
    type Item = StandingRow;

    fn name(&self) -> &'static str {
        "standings"
    }

    fn required(&self) -> &'static [&'static str] {
        &["season"]
    }

    fn fetch(&self, params: &RequestParams) -> BoxFuture<'static, ApiResult<Vec<StandingRow>>> {
        let api = self.api.clone();
        let params = params.clone();
        async move { api.standings(&params).await }.boxed()
    }
}

/// Preview copy for a single `gameId`, as a one-element list.
pub struct GamePreviews {
    api: SportsApi,
}

impl GamePreviews {
    pub fn new(api: SportsApi) -> Self {
        Self { api }
    }
}

impl Resource for GamePreviews {
    type Item = GamePreview;

    fn name(&self) -> &'static str {
        "game_preview"
    }

    fn required(&self) -> &'static [&'static str] {
        &["gameId"]
    }

    fn fetch(&self, params: &RequestParams) -> BoxFuture<'static, ApiResult<Vec<GamePreview>>> {
        let api = self.api.clone();
        let params = params.clone();
        async move { Ok(vec![api.game_preview(&params).await?]) }.boxed()
    }
}

/// Users suggested to `userId`, each carrying its follow state.
pub struct FollowSuggestions {
    api: SportsApi,
}

impl FollowSuggestions {
    pub fn new(api: SportsApi) -> Self {
        Self { api }
    }
}

impl Resource for FollowSuggestions {
    type Item = UserProfile;

    fn name(&self) -> &'static str {
        "follow_suggestions"
    }

    fn required(&self) -> &'static [&'static str] {
        &["userId"]
    }

    fn fetch(&self, params: &RequestParams) -> BoxFuture<'static, ApiResult<Vec<UserProfile>>> {
        let api = self.api.clone();
        let params = params.clone();
        async move { api.follow_suggestions(&params).await }.boxed()
    }
}
