use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use silksong_core::{PollLoop, StatusFetcher, StatusObserver, SteamStoreFetcher};
use silksong_platform::AppPaths;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{alarm_observer, http_client, remember_display_name, select_query};
use crate::cache::CachingFetcher;
use crate::cli::WatchArgs;
use crate::error::AppError;
use crate::screen::{ConsoleScreen, WatchInput, parse_watch_input};
use crate::settings::AppSettings;
use crate::single_instance::SingleInstance;

pub(super) async fn run(
    args: &WatchArgs,
    paths: &AppPaths,
    mut settings: AppSettings,
) -> Result<ExitCode, AppError> {
    let _instance = SingleInstance::acquire(&paths.instance_lock_file())?;

    let query = select_query(&settings, args.app_id.as_deref())?;
    let interval = args
        .interval
        .map_or_else(|| settings.poll_interval(), Duration::from_secs);

    let fetcher: Arc<dyn StatusFetcher> = Arc::new(CachingFetcher::new(
        SteamStoreFetcher::new(http_client(&settings)),
        paths.payload_cache_file(),
    ));

    let mut observers: Vec<Arc<dyn StatusObserver>> =
        vec![Arc::new(ConsoleScreen::new(Box::new(std::io::stdout())))];
    if !args.no_alarm
        && let Some(alarm) = alarm_observer(&settings)
    {
        observers.push(alarm);
    } else {
        info!("Alarm disabled");
    }

    println!(
        "Checking every {}s. Enter checks now, an app id switches product, q quits.",
        interval.as_secs()
    );
    info!(
        "Watching app {} every {}s",
        query.product_id(),
        interval.as_secs()
    );

    let mut poll = PollLoop::start(fetcher, query, interval, observers);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(error) = signal {
                    warn!("Failed to listen for Ctrl-C: {error}");
                }
                break;
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match parse_watch_input(&line) {
                    WatchInput::Refresh => poll.refresh_now(),
                    WatchInput::Quit => break,
                    WatchInput::SwitchProduct(raw) => {
                        switch_product(paths, &mut settings, &poll, &raw);
                    }
                    WatchInput::Invalid(text) => {
                        eprintln!("Not an app id: {text:?}. Enter checks now, q quits.");
                    }
                },
                Ok(None) => {
                    info!("Stdin closed, watching until interrupted");
                    stdin_open = false;
                }
                Err(error) => {
                    warn!("Failed to read stdin: {error}");
                    stdin_open = false;
                }
            },
        }
    }

    let latest = poll.latest();
    poll.stop();
    poll.join().await;

    if latest.status.is_terminal() {
        remember_display_name(
            paths,
            &mut settings,
            &latest.product_id,
            &latest.display_name,
        );
    }

    Ok(ExitCode::SUCCESS)
}

fn switch_product(paths: &AppPaths, settings: &mut AppSettings, poll: &PollLoop, raw: &str) {
    let query = match settings.set_product_id(raw) {
        Ok(query) => query,
        Err(error) => {
            eprintln!("{}", AppError::from(error));
            return;
        }
    };

    let path = paths.settings_file();
    if let Err(error) = settings.save_to(&path) {
        warn!("{}", AppError::settings_save(&path, error));
    }

    info!("Switching to app {}", query.product_id());
    poll.update_query(query);
}
