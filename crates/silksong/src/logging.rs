#[cfg(debug_assertions)]
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use simplelog::{CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger, WriteLogger};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use silksong_platform::AppPaths;

/// Appends to the log file and reopens it if it was removed underneath us.
struct ReopeningFileWriter {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl ReopeningFileWriter {
    fn new(path: PathBuf) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(Some(file)),
        })
    }

    fn with_file<T>(&self, op: impl FnOnce(&mut File) -> io::Result<T>) -> io::Result<T> {
        let mut guard = self
            .file
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if !self.path.exists() {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            *guard = Some(
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.path)?,
            );
        }

        match guard.as_mut() {
            Some(file) => op(file),
            None => Err(io::Error::other("log file not available")),
        }
    }
}

impl Write for ReopeningFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_file(|file| file.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_file(File::flush)
    }
}

/// Drop the older half of an oversized log, cutting at a line boundary.
/// Returns the number of bytes removed.
fn trim_log_file_if_oversized(log_path: &Path, max_log_size: u64) -> io::Result<u64> {
    let size = match std::fs::metadata(log_path) {
        Ok(metadata) => metadata.len(),
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(error) => return Err(error),
    };
    if size <= max_log_size {
        return Ok(0);
    }

    let contents = std::fs::read(log_path)?;
    let midpoint = contents.len() / 2;
    let cut = contents[midpoint..]
        .iter()
        .position(|&byte| byte == b'\n')
        .map_or(midpoint, |offset| midpoint + offset + 1);
    std::fs::write(log_path, &contents[cut..])?;
    Ok(cut as u64)
}

pub fn init_logging(paths: &AppPaths, debug_enabled: bool, max_log_size: u64) {
    let log_path = paths.log_file();
    let trimmed = trim_log_file_if_oversized(&log_path, max_log_size);

    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .add_filter_allow_str("silksong")
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();

    #[cfg(debug_assertions)]
    loggers.push(TermLogger::new(
        LevelFilter::Debug,
        config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ));

    match ReopeningFileWriter::new(log_path.clone()) {
        Ok(writer) => loggers.push(WriteLogger::new(LevelFilter::Debug, config, writer)),
        Err(error) => eprintln!(
            "silksong: logging to {} disabled: {error}",
            log_path.display()
        ),
    }

    if !loggers.is_empty() {
        let _ = CombinedLogger::init(loggers);
    }

    set_logging_enabled(debug_enabled);

    match trimmed {
        Ok(0) => {}
        Ok(bytes) => log::info!("Trimmed {bytes} bytes from {}", log_path.display()),
        Err(error) => log::warn!("Failed to trim {}: {error}", log_path.display()),
    }

    if debug_enabled {
        log::info!(
            "Debug logging initialized, log file: {}",
            log_path.display()
        );
    }
}

pub fn set_logging_enabled(enabled: bool) {
    if enabled {
        log::set_max_level(log::LevelFilter::Debug);
    } else {
        log::set_max_level(log::LevelFilter::Warn);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::{ReopeningFileWriter, set_logging_enabled, trim_log_file_if_oversized};

    #[test]
    fn writer_recreates_missing_file_on_write() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let log_path = temp_dir.path().join("debug.log");
        let mut writer =
            ReopeningFileWriter::new(log_path.clone()).expect("writer should open log file");

        writer
            .write_all(b"first line\n")
            .expect("initial write should succeed");
        std::fs::remove_file(&log_path).expect("log file should be removable");
        writer
            .write_all(b"second line\n")
            .expect("writer should recreate file after deletion");

        let contents =
            std::fs::read_to_string(&log_path).expect("recreated file should be readable");
        assert_eq!(contents, "second line\n");
    }

    #[test]
    fn writer_creates_missing_parent_directory() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let log_path = temp_dir.path().join("data").join("debug.log");

        let mut writer =
            ReopeningFileWriter::new(log_path.clone()).expect("writer should create parent");
        writer.write_all(b"hello\n").expect("write should succeed");

        assert!(log_path.is_file());
    }

    #[test]
    fn trim_log_file_keeps_recent_half() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let log_path = temp_dir.path().join("debug.log");
        let original = "cycle-1\ncycle-2\ncycle-3\ncycle-4\ncycle-5\n";
        std::fs::write(&log_path, original).expect("test log file should be written");

        let removed = trim_log_file_if_oversized(&log_path, 10).expect("trim should succeed");

        let trimmed =
            std::fs::read_to_string(&log_path).expect("trimmed log file should be readable");
        assert!(trimmed.starts_with("cycle-4\n") || trimmed.starts_with("cycle-3\n"));
        assert!(!trimmed.contains("cycle-1"));
        assert_eq!(removed, (original.len() - trimmed.len()) as u64);
    }

    #[test]
    fn trim_log_file_leaves_small_files_alone() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let log_path = temp_dir.path().join("debug.log");
        std::fs::write(&log_path, "short\n").expect("test log file should be written");

        assert_eq!(
            trim_log_file_if_oversized(&log_path, 1024).expect("trim should succeed"),
            0
        );

        let contents = std::fs::read_to_string(&log_path).expect("log file should be readable");
        assert_eq!(contents, "short\n");
    }

    #[test]
    fn trim_log_file_ignores_missing_file() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let log_path = temp_dir.path().join("absent.log");

        assert_eq!(
            trim_log_file_if_oversized(&log_path, 0).expect("missing log is not an error"),
            0
        );
    }

    #[test]
    fn set_logging_enabled_updates_global_level() {
        set_logging_enabled(true);
        assert_eq!(log::max_level(), log::LevelFilter::Debug);

        set_logging_enabled(false);
        assert_eq!(log::max_level(), log::LevelFilter::Warn);
    }
}
