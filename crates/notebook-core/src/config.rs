//! Runtime configuration read from the environment.

use std::time::Duration;

use tracing::warn;

use crate::defaults;
use crate::error::{Error, Result};

/// Read-only settings consumed by the service layer and the server binary.
#[derive(Debug, Clone)]
pub struct NotebookConfig {
    pub database_url: String,
    pub redis_url: String,
    /// Keep the session token in Redis. When disabled the token lives in
    /// process memory.
    pub redis_enabled: bool,
    pub host: String,
    pub port: u16,
    /// Runes of plain text kept in list-view digests.
    pub digest_length: usize,
    /// Author stamped onto published notes.
    pub default_author: String,
    pub page_size: i64,
    pub pagination_window_size: i64,
    pub token_ttl: Duration,
    /// Argon2 PHC string of the shared login password. Login is refused
    /// while this is unset.
    pub hashed_password: Option<String>,
}

impl Default for NotebookConfig {
    fn default() -> Self {
        Self {
            database_url: defaults::DATABASE_URL.to_string(),
            redis_url: defaults::REDIS_URL.to_string(),
            redis_enabled: true,
            host: defaults::SERVER_HOST.to_string(),
            port: defaults::SERVER_PORT,
            digest_length: defaults::DIGEST_LENGTH,
            default_author: defaults::DEFAULT_AUTHOR.to_string(),
            page_size: defaults::PAGE_SIZE,
            pagination_window_size: defaults::PAGINATION_WINDOW_SIZE,
            token_ttl: Duration::from_secs(defaults::TOKEN_TTL_SECS),
            hashed_password: None,
        }
    }
}

impl NotebookConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `DATABASE_URL` | `postgres://localhost/notebook` | Postgres connection URL |
    /// | `REDIS_URL` | `redis://localhost:6379` | Redis connection URL |
    /// | `REDIS_ENABLED` | `true` | Store the session token in Redis (else in memory) |
    /// | `HOST` | `0.0.0.0` | Bind address |
    /// | `PORT` | `3000` | Bind port |
    /// | `NOTE_DIGEST_LENGTH` | `150` | Digest runes in list views |
    /// | `NOTE_DEFAULT_AUTHOR` | `admin` | Author of published notes |
    /// | `PAGE_SIZE` | `10` | Notes per page |
    /// | `PAGINATION_WINDOW_SIZE` | `5` | Page numbers shown around the current page |
    /// | `TOKEN_TTL_SECS` | `259200` | Session lifetime |
    /// | `AUTH_HASHED_PASSWORD` | unset | Argon2 PHC hash of the login password |
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = Self::default();

        let config = Self {
            database_url: lookup("DATABASE_URL").unwrap_or(base.database_url),
            redis_url: lookup("REDIS_URL").unwrap_or(base.redis_url),
            redis_enabled: lookup("REDIS_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(base.redis_enabled),
            host: lookup("HOST").unwrap_or(base.host),
            port: parse_or(&lookup, "PORT", base.port),
            digest_length: parse_or(&lookup, "NOTE_DIGEST_LENGTH", base.digest_length),
            default_author: lookup("NOTE_DEFAULT_AUTHOR").unwrap_or(base.default_author),
            page_size: parse_or(&lookup, "PAGE_SIZE", base.page_size),
            pagination_window_size: parse_or(
                &lookup,
                "PAGINATION_WINDOW_SIZE",
                base.pagination_window_size,
            ),
            token_ttl: Duration::from_secs(parse_or(
                &lookup,
                "TOKEN_TTL_SECS",
                base.token_ttl.as_secs(),
            )),
            hashed_password: lookup("AUTH_HASHED_PASSWORD").filter(|v| !v.trim().is_empty()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the service cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.page_size <= 0 {
            return Err(Error::Config("PAGE_SIZE must be positive".to_string()));
        }
        if self.pagination_window_size <= 0 {
            return Err(Error::Config(
                "PAGINATION_WINDOW_SIZE must be positive".to_string(),
            ));
        }
        if self.token_ttl.is_zero() {
            return Err(Error::Config("TOKEN_TTL_SECS must be positive".to_string()));
        }
        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "Unparsable configuration value, using default");
            default
        }),
        None => default,
    }
}
