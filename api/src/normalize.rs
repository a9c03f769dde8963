use crate::wire::{RawGame, RawTeam, RawTeamScore, StandingRow};
use crate::{GameStatus, PeriodsProgress, RecordsMap, TeamLine, TeamRecord, ViewGame};
use chrono::{DateTime, Local, TimeZone, Utc};
use log::warn;
use std::fmt::Display;

// ---------------------------------------------------------------------------
// Mapping: raw game feed → ViewGame
// ---------------------------------------------------------------------------

/// Map a raw game into the view model, formatting times in the local zone.
///
/// Total: every missing nested field degrades to `None`, `"-"`, `0` or
/// `false`, so a single bad item never aborts a batch.
pub fn normalize(raw: &RawGame, records: Option<&RecordsMap>) -> ViewGame {
    normalize_in(raw, records, &Local)
}

/// [`normalize`] with an explicit time zone for the `time` field.
pub fn normalize_in<Tz>(raw: &RawGame, records: Option<&RecordsMap>, tz: &Tz) -> ViewGame
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let (status, is_halftime) = map_status(raw);

    let teams = raw.teams.as_ref();
    let home_team = teams.and_then(|t| t.home.as_ref());
    let away_team = teams.and_then(|t| t.visitors.as_ref());

    let scores = raw.scores.as_ref();
    let home_score = scores.and_then(|s| s.home.as_ref());
    let away_score = scores.and_then(|s| s.visitors.as_ref());

    let (home_points, away_points) = if status == GameStatus::Scheduled {
        (None, None)
    } else {
        (
            Some(home_score.and_then(|s| s.points).unwrap_or(0)),
            Some(away_score.and_then(|s| s.points).unwrap_or(0)),
        )
    };

    let (clock, period) = if status == GameStatus::InProgress {
        (
            raw.status.as_ref().and_then(|s| s.clock.clone()),
            raw.periods
                .as_ref()
                .and_then(|p| p.current)
                .map(|p| p.to_string()),
        )
    } else {
        (None, None)
    };

    let start_time = raw
        .date
        .as_ref()
        .and_then(|d| d.start.as_deref())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    let time = start_time
        .map(|dt| dt.with_timezone(tz).format("%-I:%M %p").to_string())
        .unwrap_or_default();

    let periods = raw.periods.as_ref().map(|p| PeriodsProgress {
        current: p.current,
        total: p.total,
        end_of_period: p.end_of_period.unwrap_or(false),
    });

    ViewGame {
        id: raw.id.unwrap_or_default(),
        home: map_team(home_team, records),
        away: map_team(away_team, records),
        status,
        is_halftime,
        clock,
        period,
        home_score: home_points,
        away_score: away_points,
        start_time,
        time,
        is_playoffs: raw.playoffs.unwrap_or(false),
        stage: raw.stage,
        home_linescore: home_score.and_then(linescore),
        away_linescore: away_score.and_then(linescore),
        periods,
    }
}

/// Decode and normalize a batch of JSON items one by one. Mistyped fields read
/// as absent; an item that is not an object is skipped with a warning.
pub fn normalize_all(items: Vec<serde_json::Value>, records: Option<&RecordsMap>) -> Vec<ViewGame> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value::<RawGame>(item) {
            Ok(raw) => Some(normalize(&raw, records)),
            Err(e) => {
                warn!("skipping malformed game at index {i}: {e}");
                None
            }
        })
        .collect()
}

/// Build a records map from standings rows; rows without a team id are dropped.
pub fn records_from_standings(rows: &[StandingRow]) -> RecordsMap {
    rows.iter()
        .filter_map(|row| {
            let id = row.team.as_ref()?.id?;
            let record = TeamRecord {
                wins: row.win.as_ref().and_then(|w| w.total),
                losses: row.loss.as_ref().and_then(|l| l.total),
            };
            Some((id.to_string(), record))
        })
        .collect()
}

fn map_status(raw: &RawGame) -> (GameStatus, bool) {
    let long = raw.status.as_ref().and_then(|s| s.long.as_deref());
    let status = match long {
        Some("In Play") => GameStatus::InProgress,
        Some("Finished") | Some("Final") => GameStatus::Final,
        _ => GameStatus::Scheduled,
    };

    let is_halftime = raw.status.as_ref().and_then(|s| s.halftime).unwrap_or(false)
        || long == Some("Halftime");

    if is_halftime {
        (GameStatus::InProgress, true)
    } else {
        (status, false)
    }
}

fn map_team(team: Option<&RawTeam>, records: Option<&RecordsMap>) -> TeamLine {
    let Some(team) = team else {
        return TeamLine { record: "-".to_owned(), ..Default::default() };
    };

    let record = team
        .id
        .and_then(|id| records?.get(&id.to_string()))
        .map(TeamRecord::display)
        .unwrap_or_else(|| "-".to_owned());

    TeamLine {
        id: team.id,
        name: team
            .name
            .clone()
            .or_else(|| team.nickname.clone())
            .unwrap_or_default(),
        code: team.code.clone().unwrap_or_default(),
        logo: team.logo.clone(),
        record,
    }
}

fn linescore(score: &RawTeamScore) -> Option<Vec<String>> {
    score.linescore.clone()
}
