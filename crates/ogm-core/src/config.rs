//! Configuration management for OGM sessions.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`OGM__<SECTION>__<KEY>`)
//! 2. Config file (`ogm.toml`, optional)
//! 3. Defaults

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default config file prefix; `config` resolves the extension.
pub const DEFAULT_FILE_PREFIX: &str = "ogm";

/// Default environment prefix.
pub const ENV_PREFIX: &str = "OGM";

/// What to do with an object whose type is not registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownTypePolicy {
    /// Log a warning and leave the object out of the save.
    #[default]
    Skip,
    /// Fail the whole save call.
    Fail,
}

/// What to do when a listener returns an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerFailurePolicy {
    /// Stop notifying and fail the save call.
    #[default]
    Propagate,
    /// Log the failure and keep notifying the remaining subjects.
    Isolate,
}

/// Session behaviour settings (`[session]` section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Depth used by `save` when none is given. `-1` is unbounded.
    #[serde(default = "default_depth")]
    pub default_depth: i32,
    #[serde(default)]
    pub unknown_type_policy: UnknownTypePolicy,
    #[serde(default)]
    pub listener_failure_policy: ListenerFailurePolicy,
}

fn default_depth() -> i32 {
    -1
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_depth: default_depth(),
            unknown_type_policy: UnknownTypePolicy::default(),
            listener_failure_policy: ListenerFailurePolicy::default(),
        }
    }
}

impl SessionConfig {
    pub fn load(file_prefix: &str) -> Result<Self> {
        load_section(file_prefix, ENV_PREFIX, "session")
    }
}

/// Load one section of the layered configuration.
///
/// A missing section falls back to `T::default()`; a section that is
/// present but malformed is an error.
pub fn load_section<T>(file_prefix: &str, env_prefix: &str, key: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix(env_prefix)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    match cfg.get::<T>(key) {
        Ok(section) => Ok(section),
        Err(config::ConfigError::NotFound(_)) => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}
