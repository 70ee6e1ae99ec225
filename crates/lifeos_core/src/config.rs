//! Kernel configuration.
//!
//! # Responsibility
//! - Deserialize `CoreConfig` from TOML, then apply `LIFEOS_*` overrides.
//! - Reject configurations the kernel cannot run safely with.
//!
//! # Invariants
//! - Outside `test`/`local`, the auth token secret carries at least
//!   `MIN_SECRET_CHARS` characters.
//! - `log_level` is always one of the levels `logging` accepts.

use crate::logging::normalize_level;
use crate::model::framework::enum_value::enum_value;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MIN_SECRET_CHARS: usize = 32;

enum_value! {
    pub enum Env("env") {
        Production => "production",
        Staging => "staging",
        Local => "local",
        Test => "test",
    }
}

impl Env {
    pub fn allows_weak_secrets(self) -> bool {
        matches!(self, Self::Local | Self::Test)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value for `{key}`: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Score deltas and the lucky puppy draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub easy: i64,
    pub medium: i64,
    pub hard: i64,
    pub key_multiplier: i64,
    pub big_plan: i64,
    pub lucky_puppy_probability: f64,
    pub lucky_puppy_bonus: i64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            easy: 1,
            medium: 2,
            hard: 5,
            key_multiplier: 2,
            big_plan: 10,
            lucky_puppy_probability: 0.02,
            lucky_puppy_bonus: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcConfig {
    /// Completed work older than this many days is collectable.
    pub completed_age_days: u32,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            completed_age_days: 14,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub fetch_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub env: Env,
    /// Absent paths open in-memory databases.
    pub domain_db: Option<PathBuf>,
    pub search_db: Option<PathBuf>,
    pub use_case_db: Option<PathBuf>,
    pub auth_token_secret: String,
    pub auth_token_ttl_days: u32,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    pub gc: GcConfig,
    pub scoring: ScoringConfig,
    pub sync: SyncConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            env: Env::Local,
            domain_db: None,
            search_db: None,
            use_case_db: None,
            auth_token_secret: String::new(),
            auth_token_ttl_days: 30,
            log_level: crate::logging::default_log_level().to_string(),
            log_dir: None,
            gc: GcConfig::default(),
            scoring: ScoringConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl CoreConfig {
    /// In-memory, test-environment config with a fixed secret.
    pub fn for_tests() -> Self {
        Self {
            env: Env::Test,
            auth_token_secret: "test-secret-test-secret-test-secret".to_string(),
            scoring: ScoringConfig {
                lucky_puppy_probability: 0.0,
                ..ScoringConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validated()
    }

    /// Reads `path`, applies process environment overrides and validates.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw)?;
        config
            .with_env_overrides(|key| std::env::var(key).ok())?
            .validated()
    }

    /// Applies `LIFEOS_*` overrides read through `lookup`.
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(env) = lookup("LIFEOS_ENV") {
            self.env = env.parse().map_err(|err| ConfigError::InvalidValue {
                key: "LIFEOS_ENV",
                reason: format!("{err}"),
            })?;
        }
        if let Some(secret) = lookup("LIFEOS_AUTH_TOKEN_SECRET") {
            self.auth_token_secret = secret;
        }
        if let Some(path) = lookup("LIFEOS_DOMAIN_DB") {
            self.domain_db = non_empty_path(path);
        }
        if let Some(path) = lookup("LIFEOS_SEARCH_DB") {
            self.search_db = non_empty_path(path);
        }
        if let Some(path) = lookup("LIFEOS_USE_CASE_DB") {
            self.use_case_db = non_empty_path(path);
        }
        if let Some(level) = lookup("LIFEOS_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(dir) = lookup("LIFEOS_LOG_DIR") {
            self.log_dir = non_empty_path(dir);
        }
        Ok(self)
    }

    pub fn validated(mut self) -> Result<Self, ConfigError> {
        self.log_level = normalize_level(&self.log_level)
            .map_err(|err| ConfigError::InvalidValue {
                key: "log_level",
                reason: err.to_string(),
            })?
            .to_string();
        if !self.env.allows_weak_secrets() && self.auth_token_secret.chars().count() < MIN_SECRET_CHARS {
            return Err(ConfigError::InvalidValue {
                key: "auth_token_secret",
                reason: format!("must be at least {MIN_SECRET_CHARS} characters in {}", self.env),
            });
        }
        if self.auth_token_ttl_days == 0 {
            return Err(ConfigError::InvalidValue {
                key: "auth_token_ttl_days",
                reason: "must be positive".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.scoring.lucky_puppy_probability) {
            return Err(ConfigError::InvalidValue {
                key: "scoring.lucky_puppy_probability",
                reason: "must be within [0, 1]".to_string(),
            });
        }
        Ok(self)
    }
}

fn non_empty_path(raw: String) -> Option<PathBuf> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, Env};
    use std::collections::HashMap;

    #[test]
    fn toml_fills_missing_sections_with_defaults() {
        let config = CoreConfig::from_toml_str(
            r#"
            env = "test"
            log_level = "WARNING"

            [gc]
            completed_age_days = 7
            "#,
        )
        .expect("config");
        assert_eq!(config.env, Env::Test);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.gc.completed_age_days, 7);
        assert_eq!(config.scoring.hard, 5);
        assert!(config.domain_db.is_none());
    }

    #[test]
    fn production_requires_a_long_secret() {
        let err = CoreConfig::from_toml_str("env = \"production\"\nauth_token_secret = \"short\"")
            .expect_err("weak secret");
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "auth_token_secret",
                ..
            }
        ));
    }

    #[test]
    fn env_overrides_take_precedence() {
        let vars = HashMap::from([
            ("LIFEOS_ENV", "staging"),
            ("LIFEOS_AUTH_TOKEN_SECRET", "0123456789abcdef0123456789abcdef"),
            ("LIFEOS_DOMAIN_DB", "/tmp/domain.sqlite"),
        ]);
        let config = CoreConfig::default()
            .with_env_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .expect("overrides")
            .validated()
            .expect("valid");
        assert_eq!(config.env, Env::Staging);
        assert_eq!(
            config.domain_db.as_deref().and_then(|p| p.to_str()),
            Some("/tmp/domain.sqlite")
        );
    }

    #[test]
    fn unknown_env_is_rejected() {
        let err = CoreConfig::default()
            .with_env_overrides(|key| (key == "LIFEOS_ENV").then(|| "mars".to_string()))
            .expect_err("bad env");
        assert!(matches!(err, ConfigError::InvalidValue { key: "LIFEOS_ENV", .. }));
    }
}
