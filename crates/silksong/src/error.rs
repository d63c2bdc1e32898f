use thiserror::Error;

use crate::single_instance::AcquireError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to resolve application paths: {0}")]
    Paths(#[from] silksong_platform::AppPathsError),
    #[error(transparent)]
    Instance(#[from] AcquireError),
    #[error("invalid product id: {0}")]
    InvalidProductId(#[from] silksong_core::QueryError),
    #[error("failed to save settings to {path}: {source}")]
    SettingsSave {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to {action}: {source}")]
    Io {
        action: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
}

impl AppError {
    pub fn settings_save(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::SettingsSave {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn io(action: &'static str, source: std::io::Error) -> Self {
        Self::Io { action, source }
    }
}
