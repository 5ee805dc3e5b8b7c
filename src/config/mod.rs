//! Configuration module for Strata.
//!
//! Handles translation, result-processing, cache and connection settings.

mod settings;

pub use settings::{
    expand_env_vars, CacheSettings, ConnectionSettings, Driver, ResultSettings, Settings,
    SettingsError, TranslationSettings,
};
