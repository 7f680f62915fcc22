//! Configuration for valuation runs

use crate::error::{Result, ValuationError};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

/// Configuration for valuation runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationConfig {
    /// First date of the daily close history used for the perpetuity growth rate
    pub history_start: NaiveDate,

    /// Window of the ticker's prices used for the beta regression
    pub capm_start: NaiveDate,
    pub capm_end: NaiveDate,

    /// First date of the T-Bill series; the last close is the risk-free rate
    pub risk_free_start: NaiveDate,

    /// First date of the market index series
    pub market_start: NaiveDate,

    /// Symbol quoting the 3-month T-Bill yield in percent
    pub risk_free_symbol: String,

    /// Symbol of the market proxy index
    pub market_index_symbol: String,

    /// Number of most recent annual periods used for averages and forecasts
    pub statement_periods: usize,

    /// Add the risk-free rate on top of the CAPM cost of equity
    pub stack_risk_free_rate: bool,

    /// "Today" for open-ended history windows; `None` means the local date
    pub as_of: Option<NaiveDate>,

    /// Maximum number of attempts per ticker when rate limited
    pub max_attempts: u32,

    /// Fixed wait between rate-limited attempts
    pub retry_wait: Duration,

    /// Request timeout duration
    pub request_timeout: Duration,

    /// Outbound request budget for the data provider
    pub requests_per_minute: u32,

    /// How long fetched daily histories are reused within a session
    pub history_cache_ttl: Duration,

    /// CSV file with a `Symbol` column listing the ranked tickers
    pub ranking_path: PathBuf,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            history_start: ymd(2000, 1, 1),
            capm_start: ymd(2022, 1, 1),
            capm_end: ymd(2025, 1, 1),
            risk_free_start: ymd(2022, 12, 1),
            market_start: ymd(2022, 1, 1),
            risk_free_symbol: "^IRX".to_string(),
            market_index_symbol: "^IXIC".to_string(),
            statement_periods: 4,
            stack_risk_free_rate: true,
            as_of: None,
            max_attempts: 3,
            retry_wait: Duration::from_secs(30),
            request_timeout: Duration::from_secs(30),
            requests_per_minute: 60,
            history_cache_ttl: Duration::from_secs(3600), // 1 hour
            ranking_path: PathBuf::from("ranking/dow30_ranking.csv"),
        }
    }
}

impl ValuationConfig {
    /// Create a new configuration builder
    pub fn builder() -> ValuationConfigBuilder {
        ValuationConfigBuilder::default()
    }

    /// Apply `DCF_*` environment overrides
    pub fn with_env(mut self) -> Result<Self> {
        if let Some(secs) = env_number::<u64>("DCF_RETRY_WAIT_SECS")? {
            self.retry_wait = Duration::from_secs(secs);
        }
        if let Some(attempts) = env_number::<u32>("DCF_MAX_ATTEMPTS")? {
            self.max_attempts = attempts;
        }
        if let Some(rpm) = env_number::<u32>("DCF_REQUESTS_PER_MINUTE")? {
            self.requests_per_minute = rpm;
        }
        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(ValuationError::Config(
                "max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.requests_per_minute == 0 {
            return Err(ValuationError::Config(
                "requests_per_minute must be greater than 0".to_string(),
            ));
        }

        if self.statement_periods == 0 {
            return Err(ValuationError::Config(
                "statement_periods must be greater than 0".to_string(),
            ));
        }

        if self.capm_start >= self.capm_end {
            return Err(ValuationError::Config(format!(
                "CAPM window is empty: {} to {}",
                self.capm_start, self.capm_end
            )));
        }

        Ok(())
    }

    /// The date open-ended windows run up to
    pub fn today(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Local::now().date_naive())
    }
}

fn env_number<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ValuationError::Config(format!("{name} is not a valid number: {raw}"))),
        Err(_) => Ok(None),
    }
}

/// Builder for ValuationConfig
#[derive(Debug, Default)]
pub struct ValuationConfigBuilder {
    capm_window: Option<(NaiveDate, NaiveDate)>,
    statement_periods: Option<usize>,
    stack_risk_free_rate: Option<bool>,
    as_of: Option<NaiveDate>,
    max_attempts: Option<u32>,
    retry_wait: Option<Duration>,
    request_timeout: Option<Duration>,
    requests_per_minute: Option<u32>,
    ranking_path: Option<PathBuf>,
}

impl ValuationConfigBuilder {
    /// Set the beta regression window
    pub fn capm_window(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.capm_window = Some((start, end));
        self
    }

    /// Set the number of annual periods used
    pub fn statement_periods(mut self, periods: usize) -> Self {
        self.statement_periods = Some(periods);
        self
    }

    /// Choose whether the risk-free rate is added on top of the CAPM result
    pub fn stack_risk_free_rate(mut self, stack: bool) -> Self {
        self.stack_risk_free_rate = Some(stack);
        self
    }

    /// Pin "today"
    pub fn as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    /// Set maximum attempts
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Set the wait between rate-limited attempts
    pub fn retry_wait(mut self, duration: Duration) -> Self {
        self.retry_wait = Some(duration);
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set the outbound request budget
    pub fn requests_per_minute(mut self, rpm: u32) -> Self {
        self.requests_per_minute = Some(rpm);
        self
    }

    /// Set the ranking CSV location
    pub fn ranking_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ranking_path = Some(path.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ValuationConfig> {
        let defaults = ValuationConfig::default();
        let (capm_start, capm_end) = self
            .capm_window
            .unwrap_or((defaults.capm_start, defaults.capm_end));

        let config = ValuationConfig {
            capm_start,
            capm_end,
            statement_periods: self.statement_periods.unwrap_or(defaults.statement_periods),
            stack_risk_free_rate: self
                .stack_risk_free_rate
                .unwrap_or(defaults.stack_risk_free_rate),
            as_of: self.as_of.or(defaults.as_of),
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts),
            retry_wait: self.retry_wait.unwrap_or(defaults.retry_wait),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            requests_per_minute: self
                .requests_per_minute
                .unwrap_or(defaults.requests_per_minute),
            ranking_path: self.ranking_path.unwrap_or(defaults.ranking_path),
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }
}
