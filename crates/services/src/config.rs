use chrono::Duration;

use habit_core::WindowPolicy;

use crate::error::ConfigError;

pub const DEFAULT_DB_URL: &str = "sqlite:habits.sqlite3";
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 60 * 60 * 24;

/// Runtime settings shared by the services and the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub db_url: String,
    pub window_policy: WindowPolicy,
    /// `None` keeps tokens until they are cleared.
    pub token_ttl: Option<Duration>,
    /// Let the habit listing decide completion for the current calendar period.
    pub server_completion: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            db_url: DEFAULT_DB_URL.to_string(),
            window_policy: WindowPolicy::default(),
            token_ttl: Some(Duration::seconds(DEFAULT_TOKEN_TTL_SECS)),
            server_completion: false,
        }
    }
}

impl TrackerConfig {
    /// Read `HABIT_DB_URL`, `HABIT_WINDOW_POLICY`, `HABIT_TOKEN_TTL_SECS` and
    /// `HABIT_SERVER_COMPLETION`.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`TrackerConfig::from_env`], reading from an arbitrary source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a variable is set to an unusable value.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = lookup("HABIT_DB_URL") {
            let url = url.trim();
            if url.is_empty() {
                return Err(ConfigError::EmptyDbUrl);
            }
            config.db_url = url.to_string();
        }
        if let Some(policy) = lookup("HABIT_WINDOW_POLICY") {
            config.window_policy = policy.parse()?;
        }
        if let Some(raw) = lookup("HABIT_TOKEN_TTL_SECS") {
            config.token_ttl = parse_token_ttl(&raw)?;
        }
        if let Some(raw) = lookup("HABIT_SERVER_COMPLETION") {
            config.server_completion = parse_switch("HABIT_SERVER_COMPLETION", &raw)?;
        }

        Ok(config)
    }
}

/// Whole seconds; `0` disables expiry.
///
/// # Errors
///
/// Returns `ConfigError::InvalidTokenTtl` for anything but a non-negative
/// integer.
pub fn parse_token_ttl(raw: &str) -> Result<Option<Duration>, ConfigError> {
    let secs = raw
        .trim()
        .parse::<u32>()
        .map_err(|_| ConfigError::InvalidTokenTtl {
            raw: raw.to_string(),
        })?;
    Ok((secs > 0).then(|| Duration::seconds(i64::from(secs))))
}

fn parse_switch(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidSwitch {
            key,
            raw: raw.to_string(),
        }),
    }
}
