use std::{
    fs,
    path::{Path, PathBuf},
};

use reqwest::blocking::Client;
use uuid::Uuid;

use super::{
    checksum::{checksums_match, compute_sha256_with_progress},
    download::download_to_file,
    extract::extract_archive,
    progress::{ProgressReporter, Stage},
    registry::ResolvedSource,
};
use crate::error::{HubError, IoContext, Result};

pub const SAVED_MODEL_DIR: &str = "saved_model";
pub const LABEL_MAP_FILE: &str = "label_map.pbtxt";
pub const PIPELINE_CONFIG_FILE: &str = "pipeline.config";

const STAGING_PREFIX: &str = ".model-";
const STAGING_SUFFIX: &str = ".download";

/// Lifecycle of one cache directory while it is being filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Absent,
    Downloading,
    Verifying,
    Extracting,
    Populated,
    Failed,
}

/// Outcome of a population run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Population {
    pub dir: PathBuf,
    /// False when an existing directory was reused without touching the network.
    pub fetched: bool,
}

/// Fills `cache_dir` from `source` unless it already exists and `force` is off.
///
/// Either the directory ends up holding a verified, extracted artifact or it
/// does not exist at all.
pub fn populate(
    cache_dir: &Path,
    source: &ResolvedSource,
    client: &Client,
    force: bool,
    progress: &mut dyn ProgressReporter,
) -> Result<Population> {
    if !force && cache_dir.exists() {
        if !has_staging_leftovers(cache_dir) {
            tracing::debug!(dir = %cache_dir.display(), "reusing cached model");
            return Ok(Population {
                dir: cache_dir.to_path_buf(),
                fetched: false,
            });
        }
        tracing::warn!(
            dir = %cache_dir.display(),
            "cached model was left mid-download, fetching it again"
        );
    }

    tracing::info!(dir = %cache_dir.display(), force, "populating model cache");
    match fill(cache_dir, source, client, progress) {
        Ok(()) => {
            transition(cache_dir, CacheState::Populated);
            tracing::info!(dir = %cache_dir.display(), "model cache populated");
            Ok(Population {
                dir: cache_dir.to_path_buf(),
                fetched: true,
            })
        }
        Err(error) => {
            transition(cache_dir, CacheState::Failed);
            rollback(cache_dir);
            Err(error)
        }
    }
}

fn fill(
    cache_dir: &Path,
    source: &ResolvedSource,
    client: &Client,
    progress: &mut dyn ProgressReporter,
) -> Result<()> {
    // Every file in the directory must come from this archive.
    if cache_dir.exists() {
        fs::remove_dir_all(cache_dir)
            .io_context(|| format!("clear model directory {}", cache_dir.display()))?;
    }
    fs::create_dir_all(cache_dir)
        .io_context(|| format!("create model directory {}", cache_dir.display()))?;
    let staging = cache_dir.join(format!(
        "{STAGING_PREFIX}{}{STAGING_SUFFIX}",
        Uuid::new_v4()
    ));

    transition(cache_dir, CacheState::Downloading);
    download_to_file(client, &source.url, &staging, progress)?;

    transition(cache_dir, CacheState::Verifying);
    let checksum = compute_sha256_with_progress(&staging, progress)?;
    if !checksums_match(&source.expected_checksum, &checksum) {
        return Err(HubError::Integrity {
            expected: source.expected_checksum.clone(),
            actual: checksum,
        });
    }

    transition(cache_dir, CacheState::Extracting);
    progress.begin(Stage::Extracting);
    extract_archive(&staging, cache_dir)?;
    progress.finish(Stage::Extracting);

    fs::remove_file(&staging)
        .io_context(|| format!("remove archive {}", staging.display()))?;
    Ok(())
}

/// A staging archive only survives when a run died before finishing.
fn has_staging_leftovers(cache_dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(cache_dir) else {
        return false;
    };
    entries.filter_map(|entry| entry.ok()).any(|entry| {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        name.starts_with(STAGING_PREFIX) && name.ends_with(STAGING_SUFFIX)
    })
}

fn transition(cache_dir: &Path, state: CacheState) {
    tracing::debug!(dir = %cache_dir.display(), ?state, "cache state");
}

/// Best effort; a failed cleanup is logged and never replaces the original error.
fn rollback(cache_dir: &Path) {
    if let Err(error) = fs::remove_dir_all(cache_dir) {
        if error.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(
                dir = %cache_dir.display(),
                "failed to remove partial model directory: {error}"
            );
        }
    }
    transition(cache_dir, CacheState::Absent);
}
