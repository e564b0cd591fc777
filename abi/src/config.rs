use std::fs;

use serde::{Deserialize, Serialize};

use crate::{Error, Validator};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    #[serde(default = "default_pool_size")]
    pub max_connections: u32,
}

/// Booking limits consumed by the validation pipeline and the check-in guard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RulesConfig {
    pub max_reservation_days: i64,
    pub check_in_grace_period_hours: i64,
    pub check_in_early_window_hours: i64,
}

/// How often a write that lost an optimistic-concurrency race is retried.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    /// total attempts, including the first one
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

/// upper bounds for the booking limits, ten years and one year respectively
pub const MAX_RESERVATION_DAYS: i64 = 3650;
pub const MAX_WINDOW_HOURS: i64 = 24 * 365;

fn default_pool_size() -> u32 {
    5
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            max_reservation_days: 30,
            check_in_grace_period_hours: 1,
            check_in_early_window_hours: 2,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 10,
            max_delay_ms: 200,
        }
    }
}

impl Config {
    pub fn load(filename: impl AsRef<std::path::Path>) -> Result<Self, Error> {
        let config = fs::read_to_string(filename.as_ref()).map_err(|_| Error::ConfigReadError)?;
        let config: Self = serde_yaml::from_str(&config).map_err(|_| Error::ConfigParseError)?;
        config.validate()?;
        Ok(config)
    }
}

impl Validator for Config {
    fn validate(&self) -> Result<(), Error> {
        self.rules.validate()?;
        self.retry.validate()
    }
}

impl Validator for RulesConfig {
    fn validate(&self) -> Result<(), Error> {
        if !(1..=MAX_RESERVATION_DAYS).contains(&self.max_reservation_days) {
            return Err(Error::InvalidConfig(format!(
                "max_reservation_days must be between 1 and {}",
                MAX_RESERVATION_DAYS
            )));
        }
        let windows = [
            self.check_in_grace_period_hours,
            self.check_in_early_window_hours,
        ];
        if windows.iter().any(|h| !(0..=MAX_WINDOW_HOURS).contains(h)) {
            return Err(Error::InvalidConfig(format!(
                "hour windows must be between 0 and {}",
                MAX_WINDOW_HOURS
            )));
        }
        Ok(())
    }
}

impl Validator for RetryConfig {
    fn validate(&self) -> Result<(), Error> {
        if self.max_attempts == 0 {
            return Err(Error::InvalidConfig("retry.max_attempts must be at least 1".into()));
        }
        Ok(())
    }
}

impl DbConfig {
    pub fn server_url(&self) -> String {
        if self.password.is_empty() {
            format!("postgres://{}@{}:{}", self.user, self.host, self.port)
        } else {
            format!(
                "postgres://{}:{}@{}:{}",
                self.user, self.password, self.host, self.port
            )
        }
    }

    pub fn url(&self) -> String {
        format!("{}/{}", self.server_url(), self.dbname)
    }
}
