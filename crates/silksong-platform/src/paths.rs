use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_DIR_NAME: &str = "silksong";

/// Environment variable that relocates every application directory under one
/// root.
pub const HOME_OVERRIDE_ENV: &str = "SILKSONG_HOME";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AppPathsError {
    #[error("Could not determine home directory")]
    HomeDirUnavailable,
    #[error("Could not determine config directory")]
    ConfigDirUnavailable,
    #[error("Could not determine cache directory")]
    CacheDirUnavailable,
    #[error("Could not determine data directory")]
    DataDirUnavailable,
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl AppPaths {
    /// Build application paths for the current platform.
    ///
    /// # Errors
    /// Returns an error when a required base directory (for example the user
    /// home/config/cache/data directory) cannot be determined.
    pub fn new() -> Result<Self, AppPathsError> {
        #[cfg(target_os = "macos")]
        {
            let home = dirs::home_dir().ok_or(AppPathsError::HomeDirUnavailable)?;
            Ok(Self {
                config_dir: home.join("Library/Application Support").join(APP_DIR_NAME),
                cache_dir: home.join("Library/Caches").join(APP_DIR_NAME),
                data_dir: home.join("Library/Application Support").join(APP_DIR_NAME),
            })
        }

        #[cfg(not(target_os = "macos"))]
        {
            Ok(Self {
                config_dir: dirs::config_dir()
                    .ok_or(AppPathsError::ConfigDirUnavailable)?
                    .join(APP_DIR_NAME),
                cache_dir: dirs::cache_dir()
                    .ok_or(AppPathsError::CacheDirUnavailable)?
                    .join(APP_DIR_NAME),
                data_dir: dirs::data_dir()
                    .ok_or(AppPathsError::DataDirUnavailable)?
                    .join(APP_DIR_NAME),
            })
        }
    }

    /// Resolve paths, honouring [`HOME_OVERRIDE_ENV`] when it is set to a
    /// non-empty value.
    ///
    /// # Errors
    /// Returns an error when no override is set and [`AppPaths::new`] fails.
    pub fn discover() -> Result<Self, AppPathsError> {
        match std::env::var_os(HOME_OVERRIDE_ENV) {
            Some(root) if !root.is_empty() => Ok(Self::rooted_at(Path::new(&root))),
            _ => Self::new(),
        }
    }

    /// Lay all directories out under a single root.
    #[must_use]
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            config_dir: root.join("config"),
            cache_dir: root.join("cache"),
            data_dir: root.join("data"),
        }
    }

    #[must_use]
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }

    #[must_use]
    pub fn payload_cache_file(&self) -> PathBuf {
        self.cache_dir.join("last_payload.json")
    }

    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("debug.log")
    }

    #[must_use]
    pub fn instance_lock_file(&self) -> PathBuf {
        self.data_dir.join("instance.lock")
    }

    /// Ensure all application directories exist on disk.
    ///
    /// # Errors
    /// Returns an error if any directory cannot be created.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.cache_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::AppPaths;

    #[test]
    fn file_paths_use_expected_filenames() {
        let paths = AppPaths::rooted_at(Path::new("/tmp/silksong-paths-test"));

        assert!(
            paths
                .settings_file()
                .ends_with(Path::new("config").join("settings.json"))
        );
        assert!(
            paths
                .payload_cache_file()
                .ends_with(Path::new("cache").join("last_payload.json"))
        );
        assert!(
            paths
                .log_file()
                .ends_with(Path::new("data").join("debug.log"))
        );
        assert!(
            paths
                .instance_lock_file()
                .ends_with(Path::new("data").join("instance.lock"))
        );
    }

    #[test]
    fn ensure_dirs_creates_all_directories() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let paths = AppPaths::rooted_at(temp_dir.path());

        paths
            .ensure_dirs()
            .expect("ensure_dirs should create application directories");

        assert!(paths.config_dir.is_dir());
        assert!(paths.cache_dir.is_dir());
        assert!(paths.data_dir.is_dir());
    }
}
