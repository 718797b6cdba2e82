use std::{io, path::PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HubError>;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("{context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("model {model_key} is not ready to download (registry status: {status})")]
    NotReady { model_key: String, status: String },

    #[error("unexpected registry response: {0}")]
    MalformedResponse(String),

    #[error("checksum of downloaded file ({actual}) does not match the expected value ({expected})")]
    Integrity { expected: String, actual: String },

    #[error("archive {} could not be extracted: {reason}", path.display())]
    CorruptArchive { path: PathBuf, reason: String },

    #[error("the directory for model key {model_key} does not exist ({}); download the model first", dir.display())]
    ModelNotDownloaded { model_key: String, dir: PathBuf },

    #[error("{file} not found in {}; try re-downloading the model with force enabled", dir.display())]
    ArtifactMissing { file: &'static str, dir: PathBuf },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("could not parse {}: {reason}", path.display())]
    InvalidConfig { path: PathBuf, reason: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl HubError {
    pub(crate) fn transport(context: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::CorruptArchive {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// True for both flavours of "artifact not on disk".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ModelNotDownloaded { .. } | Self::ArtifactMissing { .. }
        )
    }
}

/// Attaches a context string to an `io::Result`, the way `anyhow::Context`
/// does for the binary.
pub(crate) trait IoContext<T> {
    fn io_context<C, F>(self, context: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T> IoContext<T> for io::Result<T> {
    fn io_context<C, F>(self, context: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|source| HubError::io(context(), source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_messages_are_distinct() {
        let never = HubError::ModelNotDownloaded {
            model_key: "abc".into(),
            dir: PathBuf::from("/hub/abc"),
        };
        let missing = HubError::ArtifactMissing {
            file: "pipeline.config",
            dir: PathBuf::from("/hub/abc"),
        };
        assert!(never.is_not_found());
        assert!(missing.is_not_found());
        assert!(never.to_string().contains("does not exist"));
        assert!(missing.to_string().contains("force"));
    }

    #[test]
    fn io_context_wraps_source() {
        let result: io::Result<()> = Err(io::Error::new(io::ErrorKind::Other, "boom"));
        let err = result.io_context(|| "create cache dir").unwrap_err();
        assert_eq!(err.to_string(), "create cache dir: boom");
        assert!(!err.is_not_found());
    }
}
