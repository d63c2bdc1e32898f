use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Local;
use log::warn;
use silksong_core::{PollLoop, StatusFetcher, StatusObserver, SteamStoreFetcher, check_once};
use silksong_platform::AppPaths;

use super::{alarm_observer, http_client, select_query};
use crate::cache::CachingFetcher;
use crate::cli::WidgetArgs;
use crate::error::AppError;
use crate::settings::AppSettings;
use crate::widget::{WidgetPrinter, widget_line};

pub(super) async fn run(
    args: &WidgetArgs,
    paths: &AppPaths,
    settings: &AppSettings,
) -> Result<ExitCode, AppError> {
    let query = select_query(settings, None)?;
    let fetcher = CachingFetcher::new(
        SteamStoreFetcher::new(http_client(settings)),
        paths.payload_cache_file(),
    );

    if !args.watch {
        let resolution = check_once(&fetcher, &query).await;
        println!("{}", widget_line(&resolution.status, Local::now()));
        return Ok(ExitCode::SUCCESS);
    }

    let fetcher: Arc<dyn StatusFetcher> = Arc::new(fetcher);
    let observers = widget_observers(settings, Box::new(std::io::stdout()));
    let mut poll = PollLoop::start(fetcher, query, settings.poll_interval(), observers);

    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {error}");
    }

    poll.stop();
    poll.join().await;
    Ok(ExitCode::SUCCESS)
}

/// The widget line printer, plus the alarm so a status-bar widget still rings
/// when the game comes out.
fn widget_observers(
    settings: &AppSettings,
    out: Box<dyn Write + Send>,
) -> Vec<Arc<dyn StatusObserver>> {
    let mut observers: Vec<Arc<dyn StatusObserver>> = vec![Arc::new(WidgetPrinter::new(out))];
    observers.extend(alarm_observer(settings));
    observers
}

#[cfg(test)]
mod tests {
    use super::widget_observers;
    use crate::settings::AppSettings;

    #[test]
    fn watching_widget_rings_unless_alarm_disabled() {
        let mut settings = AppSettings::default();
        assert_eq!(widget_observers(&settings, Box::new(std::io::sink())).len(), 2);

        settings.alarm_enabled = false;
        assert_eq!(widget_observers(&settings, Box::new(std::io::sink())).len(), 1);
    }
}
