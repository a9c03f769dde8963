use courtside_api::client::{API_URL_VAR, DEFAULT_TIMEOUT};
use courtside_api::{ApiResult, SportsApi};
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const TIMEOUT_VAR: &str = "COURTSIDE_TIMEOUT_SECS";
pub const CACHE_CAPACITY_VAR: &str = "COURTSIDE_CACHE_CAPACITY";
pub const LOG_LEVEL_VAR: &str = "COURTSIDE_LOG";
pub const DEFAULT_CACHE_CAPACITY: usize = 128;

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub api_url: String,
    pub timeout: Duration,
    /// `None` keeps every response for the life of the process.
    pub cache_capacity: Option<usize>,
    pub log_level: Option<LevelFilter>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SettingsError {
    Missing(&'static str),
    Invalid { var: &'static str, value: String },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Missing(var) => write!(f, "{var} must be set"),
            SettingsError::Invalid { var, value } => write!(f, "invalid value for {var}: {value:?}"),
        }
    }
}

impl std::error::Error for SettingsError {}

impl AppSettings {
    /// Read settings from the process environment.
    pub fn load() -> Result<Self, SettingsError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let api_url = get(API_URL_VAR).ok_or(SettingsError::Missing(API_URL_VAR))?;

        let timeout = match get(TIMEOUT_VAR) {
            Some(v) => Duration::from_secs(parse(TIMEOUT_VAR, &v)?),
            None => DEFAULT_TIMEOUT,
        };

        let cache_capacity = match get(CACHE_CAPACITY_VAR) {
            Some(v) => match parse::<usize>(CACHE_CAPACITY_VAR, &v)? {
                0 => None,
                n => Some(n),
            },
            None => Some(DEFAULT_CACHE_CAPACITY),
        };

        let log_level = get(LOG_LEVEL_VAR)
            .map(|v| parse::<LevelFilter>(LOG_LEVEL_VAR, &v))
            .transpose()?;

        Ok(Self { api_url, timeout, cache_capacity, log_level })
    }

    pub fn api(&self) -> ApiResult<SportsApi> {
        Ok(SportsApi::new(&self.api_url)?.with_timeout(self.timeout))
    }
}

fn parse<T: FromStr>(var: &'static str, value: &str) -> Result<T, SettingsError> {
    value
        .parse()
        .map_err(|_| SettingsError::Invalid { var, value: value.to_owned() })
}
