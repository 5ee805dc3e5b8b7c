//! TOML-based configuration for Strata.
//!
//! Supports a config file (strata.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [translation]
//! dialect = "postgres"
//! strict_function_arguments = false
//!
//! [results]
//! max_fetch_depth = 5
//! default_batch_size = 1
//!
//! [cache]
//! enabled = true
//! max_entries = 1000
//!
//! [connections.dev]
//! driver = "sqlite"
//! url = "${STRATA_DATA_DIR}/dev.sqlite"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::sql::dialect::Dialect;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),

    #[error("Unsupported driver: {0}. Supported: sqlite")]
    UnsupportedDriver(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Settings {
    /// SQL translation behavior.
    pub translation: TranslationSettings,

    /// Result graph construction and row processing.
    pub results: ResultSettings,

    /// Query-results cache.
    pub cache: CacheSettings,

    /// Named database connections.
    pub connections: HashMap<String, ConnectionSettings>,
}

/// SQL translation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TranslationSettings {
    /// Dialect used when a session does not name one.
    pub dialect: Dialect,

    /// Fail translation when a function pattern receives fewer arguments
    /// than it references, instead of logging and rendering best-effort.
    pub strict_function_arguments: bool,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            strict_function_arguments: false,
        }
    }
}

/// Result graph settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResultSettings {
    /// Maximum depth of eager to-one joins; deeper associations are delayed.
    pub max_fetch_depth: usize,

    /// Batch size for entities that do not declare one.
    pub default_batch_size: usize,
}

impl Default for ResultSettings {
    fn default() -> Self {
        Self {
            max_fetch_depth: 5,
            default_batch_size: 1,
        }
    }
}

/// Query-results cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Honor `cacheable` queries.
    pub enabled: bool,

    /// Maximum number of cached result lists before the oldest is evicted.
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1000,
        }
    }
}

/// Supported database drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    /// SQLite (file or in-memory)
    Sqlite,
}

impl Driver {
    /// Parse driver from string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, SettingsError> {
        match s.to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Driver::Sqlite),
            other => Err(SettingsError::UnsupportedDriver(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Driver::Sqlite => "sqlite",
        }
    }

    /// Dialect to render SQL in for this driver.
    pub fn dialect(&self) -> Dialect {
        match self {
            Driver::Sqlite => Dialect::Sqlite,
        }
    }
}

/// Connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionSettings {
    /// Database driver.
    pub driver: String,

    /// Database location (supports ${ENV_VAR} expansion); `:memory:` for
    /// an in-memory database.
    pub url: String,
}

impl ConnectionSettings {
    /// Get the driver type.
    pub fn driver_type(&self) -> Result<Driver, SettingsError> {
        Driver::from_str(&self.driver)
    }

    /// Get the url with environment variables expanded.
    pub fn resolved_url(&self) -> Result<String, SettingsError> {
        expand_env_vars(&self.url)
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `STRATA_CONFIG`
    /// 2. `./strata.toml`
    /// 3. `~/.config/strata/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("STRATA_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("strata.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("strata").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Get a connection by name.
    pub fn get_connection(&self, name: &str) -> Result<&ConnectionSettings, SettingsError> {
        self.connections
            .get(name)
            .ok_or_else(|| SettingsError::ConnectionNotFound(name.to_string()))
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.results.default_batch_size == 0 {
            return Err(SettingsError::InvalidConfig(
                "results.default_batch_size must be at least 1".into(),
            ));
        }
        if self.cache.enabled && self.cache.max_entries == 0 {
            return Err(SettingsError::InvalidConfig(
                "cache.max_entries must be at least 1 when the cache is enabled".into(),
            ));
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }

        let mut var_name = String::new();
        while let Some(&ch) = chars.peek() {
            if braced {
                chars.next();
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            } else if ch.is_alphanumeric() || ch == '_' {
                var_name.push(ch);
                chars.next();
            } else {
                break;
            }
        }

        if var_name.is_empty() && !braced {
            // Just a lone $, keep it
            result.push('$');
            continue;
        }

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars_braces() {
        env::set_var("STRATA_TEST_VAR", "hello");
        assert_eq!(expand_env_vars("${STRATA_TEST_VAR}").unwrap(), "hello");
        assert_eq!(
            expand_env_vars("prefix_${STRATA_TEST_VAR}_suffix").unwrap(),
            "prefix_hello_suffix"
        );
        env::remove_var("STRATA_TEST_VAR");
    }

    #[test]
    fn test_expand_env_vars_no_braces() {
        env::set_var("STRATA_TEST_VAR2", "world");
        assert_eq!(expand_env_vars("$STRATA_TEST_VAR2").unwrap(), "world");
        assert_eq!(expand_env_vars("$STRATA_TEST_VAR2!").unwrap(), "world!");
        assert_eq!(expand_env_vars("cost: $").unwrap(), "cost: $");
        env::remove_var("STRATA_TEST_VAR2");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let result = expand_env_vars("${NONEXISTENT_VAR_12345}");
        assert!(matches!(result, Err(SettingsError::MissingEnvVar(_))));
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[translation]
dialect = "tsql"
strict_function_arguments = true

[results]
max_fetch_depth = 3

[cache]
enabled = false

[connections.dev]
driver = "sqlite"
url = ":memory:"
"#;

        let settings = Settings::from_toml(toml).unwrap();

        assert_eq!(settings.translation.dialect, Dialect::TSql);
        assert!(settings.translation.strict_function_arguments);
        assert_eq!(settings.results.max_fetch_depth, 3);
        assert_eq!(settings.results.default_batch_size, 1);
        assert!(!settings.cache.enabled);

        let dev = settings.get_connection("dev").unwrap();
        assert_eq!(dev.driver_type().unwrap(), Driver::Sqlite);
        assert_eq!(dev.resolved_url().unwrap(), ":memory:");
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();

        assert_eq!(settings.translation.dialect, Dialect::Postgres);
        assert!(!settings.translation.strict_function_arguments);
        assert_eq!(settings.results.max_fetch_depth, 5);
        assert!(settings.cache.enabled);
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        let result = Settings::from_toml("[results]\ndefault_batch_size = 0\n");
        assert!(matches!(result, Err(SettingsError::InvalidConfig(_))));
    }

    #[test]
    fn test_unknown_driver() {
        let conn = ConnectionSettings {
            driver: "oracle".into(),
            url: "x".into(),
        };
        assert!(matches!(
            conn.driver_type(),
            Err(SettingsError::UnsupportedDriver(_))
        ));
    }
}
