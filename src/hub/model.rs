use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use reqwest::blocking::Client;

use super::{
    cache::{self, Population, LABEL_MAP_FILE, PIPELINE_CONFIG_FILE, SAVED_MODEL_DIR},
    label_map::{load_label_map, LabelMap},
    pipeline_config::{dims_from_config, InputDimensions},
    progress::{ProgressReporter, SilentProgress, TerminalProgress},
    registry::{RegistryClient, ResolvedSource},
};
use crate::{
    config::HubConfig,
    error::{HubError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelType {
    /// TensorFlow SavedModel bundle.
    #[default]
    Tf,
}

impl FromStr for ModelType {
    type Err = HubError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "TF" | "TENSORFLOW" => Ok(Self::Tf),
            other => Err(HubError::InvalidArgument(format!("invalid model type {other}"))),
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tf => f.write_str("TF"),
        }
    }
}

/// One model key bound to its cache directory under the hub root.
///
/// The registry is consulted once, when the handle is created. The cached
/// input dimensions are computed at most once per handle.
#[derive(Debug)]
pub struct HubModel {
    model_key: String,
    project_secret: Option<String>,
    model_dir: PathBuf,
    source: ResolvedSource,
    client: Client,
    progress: bool,
    dimensions: OnceCell<InputDimensions>,
    populate_lock: Mutex<()>,
}

impl HubModel {
    /// Resolves `model_key` against the configured registry.
    pub fn new(model_key: &str, project_secret: Option<&str>, config: &HubConfig) -> Result<Self> {
        let registry = RegistryClient::from_config(config)?;
        let mut model = Self::with_registry(model_key, project_secret, &registry, &config.hub_dir()?)?;
        model.progress = config.progress;
        Ok(model)
    }

    pub fn with_registry(
        model_key: &str,
        project_secret: Option<&str>,
        registry: &RegistryClient,
        hub_dir: &Path,
    ) -> Result<Self> {
        if model_key.is_empty()
            || model_key == "."
            || model_key == ".."
            || model_key.contains(['/', '\\'])
        {
            return Err(HubError::InvalidArgument(format!(
                "model key {model_key:?} cannot name a cache directory"
            )));
        }
        let source = registry.resolve(model_key, project_secret)?;
        Ok(Self {
            model_key: model_key.to_string(),
            project_secret: project_secret.map(str::to_string),
            model_dir: hub_dir.join(model_key),
            source,
            client: registry.http_client().clone(),
            progress: true,
            dimensions: OnceCell::new(),
            populate_lock: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn model_key(&self) -> &str {
        &self.model_key
    }

    #[must_use]
    pub fn project_secret(&self) -> Option<&str> {
        self.project_secret.as_deref()
    }

    #[must_use]
    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    #[must_use]
    pub fn source(&self) -> &ResolvedSource {
        &self.source
    }

    #[must_use]
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Downloads, verifies and extracts the artifact, replacing any cached copy.
    pub fn download_model(&self, model_type: ModelType, progress: bool) -> Result<PathBuf> {
        match model_type {
            ModelType::Tf => self.populate(true, progress).map(|population| population.dir),
        }
    }

    /// Populates the cache when forced or empty.
    pub fn ensure_downloaded(&self, force: bool, progress: bool) -> Result<Population> {
        self.populate(force, progress)
    }

    pub fn ensure_downloaded_with(
        &self,
        force: bool,
        reporter: &mut dyn ProgressReporter,
    ) -> Result<Population> {
        let _guard = self.populate_lock.lock();
        cache::populate(&self.model_dir, &self.source, &self.client, force, reporter)
    }

    /// Directory of the TensorFlow SavedModel, fetching it first if needed.
    ///
    /// Loading the graph is left to the caller's runtime.
    pub fn saved_model_dir(&self, force: bool, progress: bool) -> Result<PathBuf> {
        let population = self.populate(force, progress)?;
        Ok(population.dir.join(SAVED_MODEL_DIR))
    }

    /// Alias of [`HubModel::saved_model_dir`] under the loader's historical name.
    pub fn load_tf_model(&self, force_download: bool, progress: bool) -> Result<PathBuf> {
        self.saved_model_dir(force_download, progress)
    }

    pub fn load_label_map(&self) -> Result<LabelMap> {
        load_label_map(&self.artifact_path(LABEL_MAP_FILE)?)
    }

    pub fn pipeline_config_path(&self) -> Result<PathBuf> {
        self.artifact_path(PIPELINE_CONFIG_FILE)
    }

    /// Height and width from `pipeline.config`, memoized on success.
    pub fn input_dimensions(&self) -> Result<InputDimensions> {
        self.dimensions
            .get_or_try_init(|| dims_from_config(&self.pipeline_config_path()?))
            .copied()
    }

    fn populate(&self, force: bool, progress: bool) -> Result<Population> {
        if progress && self.progress {
            self.ensure_downloaded_with(force, &mut TerminalProgress::new())
        } else {
            self.ensure_downloaded_with(force, &mut SilentProgress)
        }
    }

    fn artifact_path(&self, file: &'static str) -> Result<PathBuf> {
        if !self.model_dir.exists() {
            return Err(HubError::ModelNotDownloaded {
                model_key: self.model_key.clone(),
                dir: self.model_dir.clone(),
            });
        }
        let path = self.model_dir.join(file);
        if !path.exists() {
            return Err(HubError::ArtifactMissing {
                file,
                dir: self.model_dir.clone(),
            });
        }
        Ok(path)
    }
}
