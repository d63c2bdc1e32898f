mod check;
mod config;
mod watch;
mod widget;

use std::process::ExitCode;
use std::sync::Arc;

use log::{debug, warn};
use silksong_core::{ProductQuery, ReleaseStatus, StatusObserver, sanitize_product_id};
use silksong_platform::AppPaths;

use crate::alarm::{Alarm, AlarmSound};
use crate::cli::Command;
use crate::error::AppError;
use crate::settings::AppSettings;

pub async fn run(
    command: Command,
    paths: &AppPaths,
    settings: AppSettings,
) -> Result<ExitCode, AppError> {
    match command {
        Command::Check(args) => check::run(&args, paths, settings).await,
        Command::Watch(args) => watch::run(&args, paths, settings).await,
        Command::Widget(args) => widget::run(&args, paths, &settings).await,
        Command::Config(command) => config::run(command, paths, settings),
    }
}

fn http_client(settings: &AppSettings) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(settings.http_timeout_secs))
        .user_agent(format!("silksong/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
}

/// The product to check: the `--app-id` override if given, else the stored
/// one. The stored display name is only carried over for the stored id.
fn select_query(settings: &AppSettings, app_id: Option<&str>) -> Result<ProductQuery, AppError> {
    let Some(raw) = app_id else {
        return Ok(settings.product_query());
    };

    let query = ProductQuery::new(sanitize_product_id(raw))?;
    if query.product_id() == settings.product_id {
        Ok(query.with_display_name(settings.last_display_name.clone()))
    } else {
        Ok(query)
    }
}

/// The alarm configured in settings, or `None` when it is switched off.
fn alarm_observer(settings: &AppSettings) -> Option<Arc<dyn StatusObserver>> {
    if !settings.alarm_enabled {
        return None;
    }
    let sound = AlarmSound::from_settings(settings.alarm_command.as_deref(), settings.alarm_repeat);
    Some(Arc::new(Alarm::new(sound)))
}

/// 0 when out, 1 when not out, 2 when no verdict could be reached.
fn verdict_exit_status(status: &ReleaseStatus) -> u8 {
    match status {
        ReleaseStatus::Success { is_out: true } => 0,
        ReleaseStatus::Success { is_out: false } => 1,
        ReleaseStatus::Loading | ReleaseStatus::Error { .. } => 2,
    }
}

/// Keep the resolved name so the next start can show it before the first
/// check completes. Failing to save is not worth failing the command.
fn remember_display_name(
    paths: &AppPaths,
    settings: &mut AppSettings,
    product_id: &str,
    display_name: &str,
) {
    if !settings.remember_display_name(product_id, display_name) {
        return;
    }

    let path = paths.settings_file();
    match settings.save_to(&path) {
        Ok(()) => debug!("Remembered display name {display_name:?} for app {product_id}"),
        Err(error) => warn!("{}", AppError::settings_save(&path, error)),
    }
}

#[cfg(test)]
mod tests {
    use silksong_core::ReleaseStatus;

    use super::{alarm_observer, select_query, verdict_exit_status};
    use crate::error::AppError;
    use crate::settings::AppSettings;

    #[test]
    fn stored_product_is_used_without_override() {
        let settings = AppSettings::default();
        let query = select_query(&settings, None).expect("stored query should be valid");

        assert_eq!(query.product_id(), "1030300");
        assert_eq!(query.label(), "Hollow Knight: Silksong");
    }

    #[test]
    fn override_keeps_name_only_for_stored_product() {
        let settings = AppSettings::default();

        let same = select_query(&settings, Some(" 1030300 ")).expect("override should parse");
        assert_eq!(same.label(), "Hollow Knight: Silksong");

        let other = select_query(&settings, Some("367520")).expect("override should parse");
        assert_eq!(other.product_id(), "367520");
        assert_eq!(other.label(), "Unknown");
    }

    #[test]
    fn override_without_digits_is_rejected() {
        let settings = AppSettings::default();
        assert!(matches!(
            select_query(&settings, Some("silksong")),
            Err(AppError::InvalidProductId(_))
        ));
    }

    #[test]
    fn alarm_follows_enabled_setting() {
        let mut settings = AppSettings::default();
        assert!(alarm_observer(&settings).is_some());

        settings.alarm_enabled = false;
        assert!(alarm_observer(&settings).is_none());
    }

    #[test]
    fn exit_status_follows_verdict() {
        assert_eq!(
            verdict_exit_status(&ReleaseStatus::Success { is_out: true }),
            0
        );
        assert_eq!(
            verdict_exit_status(&ReleaseStatus::Success { is_out: false }),
            1
        );
        assert_eq!(
            verdict_exit_status(&ReleaseStatus::Error {
                message: "parse failure".to_string()
            }),
            2
        );
    }
}
