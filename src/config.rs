use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};

use crate::error::{HubError, IoContext, Result};

pub const DEFAULT_ENDPOINT: &str = "https://api.datature.io/hub";
const HUB_DIR_NAME: &str = ".dataturehub";
const CONFIG_FILE: &str = "config.json";

pub const ENV_CONFIG: &str = "DATATURE_HUB_CONFIG";
pub const ENV_ENDPOINT: &str = "DATATURE_HUB_ENDPOINT";
pub const ENV_HUB_DIR: &str = "DATATURE_HUB_DIR";
pub const ENV_TIMEOUT: &str = "DATATURE_HUB_TIMEOUT_SECS";

/// Settings shared by every handle created from it.
///
/// The registry endpoint lives here rather than in process-wide state, so two
/// configs pointing at different registries can coexist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct HubConfig {
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hub_dir: Option<PathBuf>,
    /// Per-request HTTP timeout; absent or zero means none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    pub progress: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            hub_dir: None,
            timeout_ms: None,
            progress: true,
        }
    }
}

impl HubConfig {
    /// Defaults, then the config file (if any), then environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Like [`HubConfig::load`], but an explicit `path` must exist.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match std::env::var_os(ENV_CONFIG)
                .map(PathBuf::from)
                .or_else(default_config_path)
            {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).io_context(|| format!("read config {}", path.display()))?;
        serde_json::from_slice(&bytes).map_err(|err| HubError::InvalidConfig {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENV_ENDPOINT).filter(|value| !value.is_empty()) {
            self.endpoint = endpoint;
        }
        if let Some(dir) = lookup(ENV_HUB_DIR).filter(|value| !value.is_empty()) {
            self.hub_dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = lookup(ENV_TIMEOUT).filter(|value| !value.is_empty()) {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                HubError::InvalidArgument(format!("{ENV_TIMEOUT} must be whole seconds, got {raw:?}"))
            })?;
            self.timeout_ms = (secs > 0).then(|| secs.saturating_mul(1000));
        }
        Ok(())
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_hub_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.hub_dir = Some(dir.into());
        self
    }

    /// A zero duration clears the timeout; anything else is kept to the
    /// millisecond, rounding sub-millisecond values up.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = if timeout.is_zero() {
            None
        } else {
            Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX).max(1))
        };
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// The hub root, `~/.dataturehub` unless overridden.
    pub fn hub_dir(&self) -> Result<PathBuf> {
        match &self.hub_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_hub_dir(),
        }
    }

    pub(crate) fn http_client(&self) -> Result<reqwest::blocking::Client> {
        // reqwest's blocking client defaults to a 30s timeout; no timeout unless asked.
        reqwest::blocking::Client::builder()
            .user_agent(concat!("datature-hub/", env!("CARGO_PKG_VERSION")))
            .timeout(self.timeout())
            .build()
            .map_err(|err| HubError::transport("create http client", err))
    }
}

pub fn default_hub_dir() -> Result<PathBuf> {
    let dirs = BaseDirs::new().ok_or_else(|| {
        HubError::io(
            "resolve home directory",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no home directory"),
        )
    })?;
    Ok(dirs.home_dir().join(HUB_DIR_NAME))
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("io", "Datature", "DatatureHub").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}
