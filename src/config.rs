//! Application-level configuration loading: default match length and the shot catalog.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    scoring::rules::{DEFAULT_BEST_OF, MatchFormat},
    state::catalog::{ShotCatalog, ShotDefinition},
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "PONG_TRACKER_CONFIG_PATH";
/// Loaded matches unused for this long are dropped from memory.
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    default_format: MatchFormat,
    shots: ShotCatalog,
    idle_timeout: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        shots = app_config.shots.len(),
                        best_of = app_config.default_format.best_of(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Match length used when a new match does not specify one.
    pub fn default_format(&self) -> MatchFormat {
        self.default_format
    }

    pub fn shots(&self) -> &ShotCatalog {
        &self.shots
    }

    /// How long a loaded match may stay unused before it is evicted.
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Split into the pieces the application state keeps.
    pub fn into_parts(self) -> (MatchFormat, ShotCatalog) {
        (self.default_format, self.shots)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_format: MatchFormat::default(),
            shots: ShotCatalog::new(default_shots()),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    best_of: Option<u8>,
    #[serde(default)]
    shots: Vec<RawShot>,
    #[serde(default)]
    idle_timeout_secs: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let default_format = match value.best_of {
            None => MatchFormat::default(),
            Some(best_of) => MatchFormat::new(best_of).unwrap_or_else(|| {
                warn!(
                    best_of,
                    fallback = DEFAULT_BEST_OF,
                    "configured best_of is not an odd length; using default"
                );
                MatchFormat::default()
            }),
        };

        let shots = if value.shots.is_empty() {
            default_shots()
        } else {
            value.shots.into_iter().map(Into::into).collect()
        };

        let idle_timeout = match value.idle_timeout_secs {
            Some(0) => {
                warn!("idle_timeout_secs must be positive; using default");
                DEFAULT_IDLE_TIMEOUT
            }
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_IDLE_TIMEOUT,
        };

        Self {
            default_format,
            shots: ShotCatalog::new(shots),
            idle_timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of a single shot entry inside the configuration file.
struct RawShot {
    id: String,
    name: String,
    category: String,
}

impl From<RawShot> for ShotDefinition {
    fn from(value: RawShot) -> Self {
        Self {
            id: value.id,
            name: value.name,
            category: value.category,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in shot catalog shipped with the binary.
fn default_shots() -> Vec<ShotDefinition> {
    [
        ("serve", "Serve", "serve"),
        ("serve_return", "Serve return", "serve"),
        ("loop", "Loop", "attack"),
        ("counter_loop", "Counter loop", "attack"),
        ("drive", "Drive", "attack"),
        ("flick", "Flick", "attack"),
        ("smash", "Smash", "attack"),
        ("push", "Push", "control"),
        ("block", "Block", "control"),
        ("chop", "Chop", "defence"),
        ("lob", "Lob", "defence"),
        ("net", "Net", "error"),
        ("long", "Long", "error"),
    ]
    .into_iter()
    .map(|(id, name, category)| ShotDefinition {
        id: id.into(),
        name: name.into(),
        category: category.into(),
    })
    .collect()
}
