//! Global Ripple configuration.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{RippleError, RippleResult};

static DEFAULT_DATA_PATH: &str = "~/.ripple_events";

const ENV_PREFIX: &str = "RIPPLE";

fn default_data_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_PATH)
}

fn default_search_radius_km() -> f64 {
    50.0
}

fn default_mirror_timeout_secs() -> u64 {
    10
}

/// Global configuration at ~/.config/ripple/config.toml
///
/// Every field may also be set from the environment, e.g.
/// `RIPPLE_DATA_DIR=./data` or `RIPPLE_MIRROR__URL=https://...`.
#[derive(Debug, Deserialize, Clone)]
pub struct RippleConfig {
    #[serde(default = "default_data_path")]
    pub data_dir: PathBuf,

    /// Radius used by proximity listings when the caller gives none.
    #[serde(default = "default_search_radius_km")]
    pub search_radius_km: f64,

    #[serde(default)]
    pub mirror: Option<MirrorConfig>,

    #[serde(default)]
    pub limits: Limits,
}

/// Remote database mirrored after each local write.
#[derive(Debug, Deserialize, Clone)]
pub struct MirrorConfig {
    pub url: String,

    #[serde(default = "default_mirror_timeout_secs")]
    pub timeout_secs: u64,
}

/// Input limits enforced by the managers.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Limits {
    pub max_title_len: usize,
    pub max_description_len: usize,
    pub max_participants: u32,
    pub password_min_length: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_title_len: 100,
            max_description_len: 1000,
            max_participants: 500,
            password_min_length: 6,
        }
    }
}

impl Default for RippleConfig {
    fn default() -> Self {
        RippleConfig {
            data_dir: default_data_path(),
            search_radius_km: default_search_radius_km(),
            mirror: None,
            limits: Limits::default(),
        }
    }
}

impl RippleConfig {
    /// Load from the default config file, creating it on first use.
    pub fn load() -> RippleResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    /// Load from a specific file (missing is fine) plus the environment.
    pub fn load_from(path: &Path) -> RippleResult<Self> {
        Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e| RippleError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| RippleError::Config(e.to_string()))
    }

    pub fn config_path() -> RippleResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| RippleError::Config("Could not determine config directory".into()))?
            .join("ripple");

        Ok(config_dir.join("config.toml"))
    }

    /// The data directory with `~` expanded.
    pub fn data_path(&self) -> PathBuf {
        let full_path_str = shellexpand::tilde(&self.data_dir.to_string_lossy()).into_owned();

        PathBuf::from(full_path_str)
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> RippleResult<()> {
        let contents = format!(
            "\
# ripple configuration

# Where users, events and registrations are stored:
# data_dir = \"{}\"

# Default radius (km) for nearby events:
# search_radius_km = 50.0

# Best-effort remote mirror of every collection:
# [mirror]
# url = \"https://example-default-rtdb.firebaseio.com\"
# timeout_secs = 10

# [limits]
# max_title_len = 100
# max_description_len = 1000
# max_participants = 500
# password_min_length = 6
",
            DEFAULT_DATA_PATH
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RippleError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| RippleError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}
