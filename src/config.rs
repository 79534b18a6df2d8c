use std::env;
use std::str::FromStr;
use thiserror::Error;

use crate::auth::password::DEFAULT_COST;
use crate::auth::registration::DEFAULT_VERIFICATION_TTL_SECS;
use crate::auth::token::DEFAULT_TOKEN_TTL_SECS;
use crate::mailer::DEFAULT_MAIL_API_URL;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} must be a number, got {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

/// bcrypt refuses costs outside this range.
pub const BCRYPT_COST_RANGE: (u32, u32) = (4, 31);
/// Upper bound for either TTL: one week.
pub const MAX_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Credentials for the outbound mail provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

/// Process-wide settings, read once at startup and handed to constructors.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_port: u16,
    pub server_host: String,
    pub jwt_secret: String,
    pub jwt_ttl_secs: i64,
    pub app_base_url: String,
    pub verification_ttl_secs: i64,
    pub sweep_interval_secs: u64,
    pub bcrypt_cost: u32,
    /// `None` when no provider is configured; verification links are then logged.
    pub mail: Option<MailConfig>,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

fn bounded<T>(name: &'static str, default: T, min: T, max: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Copy + Into<i64>,
{
    let value = parsed(name, default)?;
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            name,
            value: value.into(),
            min: min.into(),
            max: max.into(),
        });
    }
    Ok(value)
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mail = match (optional("MAIL_API_KEY"), optional("MAIL_FROM")) {
            (Some(api_key), Some(from)) => Some(MailConfig {
                api_url: optional("MAIL_API_URL")
                    .unwrap_or_else(|| DEFAULT_MAIL_API_URL.to_string()),
                api_key,
                from,
            }),
            _ => None,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            server_port: parsed("SERVER_PORT", 8080)?,
            server_host: optional("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            jwt_secret: required("JWT_SECRET")?,
            jwt_ttl_secs: bounded("JWT_TTL_SECS", DEFAULT_TOKEN_TTL_SECS, 1, MAX_TTL_SECS)?,
            app_base_url: optional("APP_BASE_URL")
                .unwrap_or_else(|| "http://localhost:8080".to_string()),
            verification_ttl_secs: bounded(
                "VERIFICATION_TTL_SECS",
                DEFAULT_VERIFICATION_TTL_SECS,
                1,
                MAX_TTL_SECS,
            )?,
            sweep_interval_secs: bounded("SWEEP_INTERVAL_SECS", 3600u32, 1, u32::MAX)?.into(),
            bcrypt_cost: bounded(
                "BCRYPT_COST",
                DEFAULT_COST,
                BCRYPT_COST_RANGE.0,
                BCRYPT_COST_RANGE.1,
            )?,
            mail,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}
