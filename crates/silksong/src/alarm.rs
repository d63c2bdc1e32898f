use std::io::Write;
use std::process::Stdio;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, info, warn};
use silksong_core::{ReleaseStatus, StatusObserver, StatusUpdate};
use silksong_platform::HideWindow;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlarmError {
    #[error("failed to start alarm command `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to ring terminal bell: {0}")]
    Bell(#[source] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmSound {
    Bell { repeat: u32 },
    Command { program: String, args: Vec<String> },
}

impl AlarmSound {
    /// Pick the sound from the `alarm_command` setting.
    pub fn from_settings(command: Option<&[String]>, repeat: u32) -> Self {
        match command {
            Some([program, args @ ..]) if !program.trim().is_empty() => Self::Command {
                program: program.clone(),
                args: args.to_vec(),
            },
            _ => Self::Bell {
                repeat: repeat.max(1),
            },
        }
    }
}

/// Rings once when the watched product flips to released and falls silent
/// again when the verdict goes back to "not out" or the product changes.
pub struct Alarm {
    sound: AlarmSound,
    bell_out: Mutex<Box<dyn Write + Send>>,
    player: Mutex<Option<tokio::process::Child>>,
    product_id: Mutex<Option<String>>,
    rings: AtomicUsize,
}

impl Alarm {
    pub fn new(sound: AlarmSound) -> Self {
        Self::with_bell_output(sound, Box::new(std::io::stdout()))
    }

    pub fn with_bell_output(sound: AlarmSound, bell_out: Box<dyn Write + Send>) -> Self {
        Self {
            sound,
            bell_out: Mutex::new(bell_out),
            player: Mutex::new(None),
            product_id: Mutex::new(None),
            rings: AtomicUsize::new(0),
        }
    }

    #[cfg(test)]
    fn ring_count(&self) -> usize {
        self.rings.load(Ordering::SeqCst)
    }

    fn ring(&self) -> Result<(), AlarmError> {
        self.silence();
        let count = self.rings.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Alarm ring #{count} with {:?}", self.sound);

        match &self.sound {
            AlarmSound::Bell { repeat } => {
                let mut out = self
                    .bell_out
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                for _ in 0..*repeat {
                    out.write_all(b"\x07").map_err(AlarmError::Bell)?;
                }
                out.flush().map_err(AlarmError::Bell)
            }
            AlarmSound::Command { program, args } => {
                let child = tokio::process::Command::new(program)
                    .args(args)
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .kill_on_drop(true)
                    .hide_window()
                    .spawn()
                    .map_err(|source| AlarmError::Spawn {
                        program: program.clone(),
                        source,
                    })?;
                *self
                    .player
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(child);
                Ok(())
            }
        }
    }

    fn silence(&self) {
        let mut player = self
            .player
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(mut child) = player.take() {
            if let Err(error) = child.start_kill() {
                debug!("Alarm player already finished: {error}");
            }
        }
    }

    fn product_changed(&self, product_id: &str) -> bool {
        let mut current = self
            .product_id
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let changed = current.as_deref().is_some_and(|id| id != product_id);
        if current.as_deref() != Some(product_id) {
            *current = Some(product_id.to_string());
        }
        changed
    }
}

impl StatusObserver for Alarm {
    fn on_status_changed(&self, update: &StatusUpdate) {
        if self.product_changed(&update.product_id) {
            self.silence();
        }

        if update.newly_released {
            info!("Ringing alarm: {} is out", update.display_name);
            if let Err(error) = self.ring() {
                warn!("{error}");
            }
        } else if update.status == (ReleaseStatus::Success { is_out: false }) {
            self.silence();
        }
    }
}

impl Drop for Alarm {
    fn drop(&mut self) {
        self.silence();
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use silksong_core::{ReleaseStatus, StatusObserver, StatusUpdate};

    use super::{Alarm, AlarmSound};

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("buffer lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn update(product_id: &str, status: ReleaseStatus, newly_released: bool) -> StatusUpdate {
        StatusUpdate {
            product_id: product_id.to_string(),
            status,
            display_name: "Silksong".to_string(),
            newly_released,
            checked_at: None,
        }
    }

    #[test]
    fn sound_from_settings_prefers_command() {
        let command = vec!["paplay".to_string(), "alarm.ogg".to_string()];
        assert_eq!(
            AlarmSound::from_settings(Some(command.as_slice()), 3),
            AlarmSound::Command {
                program: "paplay".to_string(),
                args: vec!["alarm.ogg".to_string()],
            }
        );
        assert_eq!(
            AlarmSound::from_settings(Some(&[][..]), 0),
            AlarmSound::Bell { repeat: 1 }
        );
        assert_eq!(
            AlarmSound::from_settings(None, 3),
            AlarmSound::Bell { repeat: 3 }
        );
    }

    #[test]
    fn bell_rings_only_on_release_transition() {
        let buffer = SharedBuffer::default();
        let alarm = Alarm::with_bell_output(
            AlarmSound::Bell { repeat: 2 },
            Box::new(buffer.clone()),
        );

        alarm.on_status_changed(&update("1030300", ReleaseStatus::Loading, false));
        alarm.on_status_changed(&update(
            "1030300",
            ReleaseStatus::Success { is_out: false },
            false,
        ));
        alarm.on_status_changed(&update(
            "1030300",
            ReleaseStatus::Success { is_out: true },
            true,
        ));
        alarm.on_status_changed(&update(
            "1030300",
            ReleaseStatus::Success { is_out: true },
            false,
        ));

        assert_eq!(alarm.ring_count(), 1);
        assert_eq!(*buffer.0.lock().expect("buffer lock"), b"\x07\x07".to_vec());
    }

    #[test]
    fn product_change_is_tracked() {
        let alarm = Alarm::with_bell_output(
            AlarmSound::Bell { repeat: 1 },
            Box::new(SharedBuffer::default()),
        );

        assert!(!alarm.product_changed("1030300"));
        assert!(!alarm.product_changed("1030300"));
        assert!(alarm.product_changed("367520"));
    }

    #[tokio::test]
    async fn missing_alarm_program_is_reported_not_fatal() {
        let alarm = Alarm::with_bell_output(
            AlarmSound::Command {
                program: "silksong-alarm-player-that-does-not-exist".to_string(),
                args: Vec::new(),
            },
            Box::new(SharedBuffer::default()),
        );

        alarm.on_status_changed(&update(
            "1030300",
            ReleaseStatus::Success { is_out: true },
            true,
        ));

        assert_eq!(alarm.ring_count(), 1);
    }
}
