use anyhow::{Context, anyhow};
use chrono::{Datelike, Local, NaiveDate};
use courtside::state::refresher::LIVE_REFRESH;
use courtside::state::resources::{GamePreviews, Games, HistoricalOdds, Standings};
use courtside::{AppSettings, FetchHook, FetchState, PeriodicRefresher, Resource, ResponseCache};
use courtside_api::{GameStatus, OddsEvent, RequestParams, ViewGame, records_from_standings};
use log::{LevelFilter, warn};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Scores { date: String, watch: bool },
    Week { date: String },
    Odds { date: String, team1: Option<String>, team2: Option<String> },
    Preview { game_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Some(command) = handle_cli_args() else {
        return Ok(());
    };

    better_panic::install();

    let settings = AppSettings::load().context("loading settings")?;
    setup_logging(settings.log_level);

    let api = settings.api().context("building API client")?;
    let capacity = settings.cache_capacity;

    match command {
        Command::Scores { date, watch } => {
            let standings = FetchHook::mount(Standings::new(api.clone()), ResponseCache::from_capacity(capacity));
            standings.set_params(RequestParams::new().with("season", season_for(&date)));
            let records = match settle(&standings).await {
                Ok(rows) => records_from_standings(&rows),
                Err(e) => {
                    warn!("standings unavailable, records will show '-': {e}");
                    Default::default()
                }
            };

            let games = Games::daily(api).with_records(records);
            let hook = Arc::new(FetchHook::mount(games, ResponseCache::from_capacity(capacity)));
            hook.set_params(RequestParams::new().with("date", date.as_str()));
            print_games(&date, &settle(&hook).await?);

            if watch {
                PeriodicRefresher::new(hook, LIVE_REFRESH)
                    .run(|state| match (&state.data, &state.error) {
                        (_, Some(message)) => warn!("refresh failed: {message}"),
                        (Some(games), None) => print_games(&date, games),
                        (None, None) => {}
                    })
                    .await;
            }
        }
        Command::Week { date } => {
            let hook = FetchHook::mount(Games::weekly(api), ResponseCache::from_capacity(capacity));
            hook.set_params(RequestParams::new().with("date", date.as_str()));
            print_games(&format!("week of {date}"), &settle(&hook).await?);
        }
        Command::Odds { date, team1, team2 } => {
            let hook = FetchHook::mount(HistoricalOdds::new(api), ResponseCache::from_capacity(capacity));
            hook.set_params(
                RequestParams::new()
                    .with("date", date.as_str())
                    .with_opt("team1", team1)
                    .with_opt("team2", team2),
            );
            for event in settle(&hook).await? {
                println!("{}", format_odds(&event));
            }
        }
        Command::Preview { game_id } => {
            let hook = FetchHook::mount(GamePreviews::new(api), ResponseCache::from_capacity(capacity));
            hook.set_params(RequestParams::new().with("gameId", game_id.as_str()));
            for preview in settle(&hook).await? {
                println!("{}", preview.content);
            }
        }
    }

    Ok(())
}

/// Wait for the hook's request and turn its state into a result.
async fn settle<R: Resource>(hook: &FetchHook<R>) -> anyhow::Result<Vec<R::Item>> {
    let FetchState { data, error, .. } = hook.settled().await;
    match (data, error) {
        (_, Some(message)) => Err(anyhow!(message)),
        (Some(items), None) => Ok(items),
        (None, None) => Ok(Vec::new()),
    }
}

fn handle_cli_args() -> Option<Command> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match parse_args(&args) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{message}\n\n{}", usage_text());
            std::process::exit(2);
        }
    }
}

fn parse_args(args: &[String]) -> Result<Option<Command>, String> {
    let today = || Local::now().date_naive().format("%Y-%m-%d").to_string();
    let date_arg = |arg: Option<&String>| -> Result<String, String> {
        match arg {
            Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .map(|_| d.clone())
                .map_err(|_| format!("Invalid date: {d} (expected YYYY-MM-DD)")),
            None => Ok(today()),
        }
    };

    let Some(first) = args.first() else {
        return Ok(Some(Command::Scores { date: today(), watch: false }));
    };

    let command = match first.as_str() {
        "-h" | "--help" => {
            println!("{}", usage_text());
            return Ok(None);
        }
        "-V" | "--version" => {
            println!("courtside {}", env!("CARGO_PKG_VERSION"));
            return Ok(None);
        }
        "scores" => {
            let watch = args.iter().any(|a| a == "--watch");
            let rest: Vec<&String> = args[1..].iter().filter(|a| *a != "--watch").collect();
            Command::Scores { date: date_arg(rest.first().copied())?, watch }
        }
        "week" => Command::Week { date: date_arg(args.get(1))? },
        "odds" => Command::Odds {
            date: date_arg(args.get(1))?,
            team1: args.get(2).cloned(),
            team2: args.get(3).cloned(),
        },
        "preview" => Command::Preview {
            game_id: args.get(1).cloned().ok_or("preview needs a GAME_ID")?,
        },
        other => return Err(format!("Unknown argument: {other}")),
    };
    Ok(Some(command))
}

fn usage_text() -> &'static str {
    "courtside - scores, odds and previews from the courtside backend

Usage:
  courtside [scores [DATE] [--watch]]
  courtside week [DATE]
  courtside odds DATE [TEAM1] [TEAM2]
  courtside preview GAME_ID
  courtside --help
  courtside --version

DATE is YYYY-MM-DD and defaults to today. --watch refreshes scores every 30s.

Environment:
  COURTSIDE_API_URL          Backend base URL (required)
  COURTSIDE_TIMEOUT_SECS     Request timeout in seconds (default 10)
  COURTSIDE_CACHE_CAPACITY   Cached responses per list, 0 = unbounded (default 128)
  COURTSIDE_LOG              Log level (default warn; RUST_LOG overrides)"
}

fn setup_logging(level: Option<LevelFilter>) {
    let default = level.unwrap_or(LevelFilter::Warn).to_string().to_lowercase();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Season label for a date: the season that tips off in October.
fn season_for(date: &str) -> i32 {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap_or_else(|_| Local::now().date_naive());
    if date.month() >= 10 { date.year() } else { date.year() - 1 }
}

fn print_games(title: &str, games: &[ViewGame]) {
    println!("{title}");
    if games.is_empty() {
        println!("  no games");
    }
    for game in games {
        println!("  {}", format_game(game));
    }
}

fn format_game(game: &ViewGame) -> String {
    let side = |code: &str, record: &str, score: Option<u16>| match score {
        Some(s) => format!("{code} ({record}) {s}"),
        None => format!("{code} ({record})"),
    };
    let matchup = format!(
        "{} @ {}",
        side(&game.away.code, &game.away.record, game.away_score),
        side(&game.home.code, &game.home.record, game.home_score),
    );

    let status = match game.status {
        GameStatus::Scheduled => game.time.clone(),
        GameStatus::InProgress if game.is_halftime => "Halftime".to_owned(),
        GameStatus::InProgress => match (&game.period, &game.clock) {
            (Some(p), Some(c)) => format!("Q{p} {c}"),
            (Some(p), None) => format!("Q{p}"),
            _ => GameStatus::InProgress.label().to_owned(),
        },
        GameStatus::Final => GameStatus::Final.label().to_owned(),
    };

    format!("{matchup}  {status}")
}

fn format_odds(event: &OddsEvent) -> String {
    let price = |team: &str| {
        event
            .price_for("h2h", team)
            .map(|p| format!("{p:+}"))
            .unwrap_or_else(|| "-".to_owned())
    };
    format!(
        "{} {} @ {} {}",
        event.away_team,
        price(&event.away_team),
        event.home_team,
        price(&event.home_team)
    )
}
