use std::env;

use chrono::Duration;

use crate::error::EngineError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub sweep_interval_secs: u64,
    pub engine: EngineConfig,
}

/// Tunables for the matching and outreach pipeline. The windows and the
/// partial home-time credit are product configuration, not invariants.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub match_window_hours: i64,
    pub response_window_hours: i64,
    pub reminder_interval_hours: i64,
    pub max_reminder_attempts: u32,
    pub cooldown_hours: i64,
    pub partial_home_time_credit: f64,
    pub default_match_limit: u32,
    pub default_contact_limit: u32,
}

impl EngineConfig {
    pub fn match_window(&self) -> Duration {
        Duration::hours(self.match_window_hours)
    }

    pub fn response_window(&self) -> Duration {
        Duration::hours(self.response_window_hours)
    }

    pub fn reminder_interval(&self) -> Duration {
        Duration::hours(self.reminder_interval_hours)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::hours(self.cooldown_hours)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            match_window_hours: 72,
            response_window_hours: 168,
            reminder_interval_hours: 48,
            max_reminder_attempts: 3,
            cooldown_hours: 720,
            partial_home_time_credit: 0.5,
            default_match_limit: 25,
            default_contact_limit: 10,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, EngineError> {
        let _ = dotenvy::dotenv();

        let defaults = EngineConfig::default();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            sweep_interval_secs: parse_or_default("SWEEP_INTERVAL_SECS", 300)?,
            engine: EngineConfig {
                match_window_hours: parse_or_default("MATCH_WINDOW_HOURS", defaults.match_window_hours)?,
                response_window_hours: parse_or_default(
                    "RESPONSE_WINDOW_HOURS",
                    defaults.response_window_hours,
                )?,
                reminder_interval_hours: parse_or_default(
                    "REMINDER_INTERVAL_HOURS",
                    defaults.reminder_interval_hours,
                )?,
                max_reminder_attempts: parse_or_default(
                    "MAX_REMINDER_ATTEMPTS",
                    defaults.max_reminder_attempts,
                )?,
                cooldown_hours: parse_or_default("COOLDOWN_HOURS", defaults.cooldown_hours)?,
                partial_home_time_credit: parse_or_default(
                    "PARTIAL_HOME_TIME_CREDIT",
                    defaults.partial_home_time_credit,
                )?,
                default_match_limit: parse_or_default("DEFAULT_MATCH_LIMIT", defaults.default_match_limit)?,
                default_contact_limit: parse_or_default(
                    "DEFAULT_CONTACT_LIMIT",
                    defaults.default_contact_limit,
                )?,
            },
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, EngineError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| EngineError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
