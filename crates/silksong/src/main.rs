mod alarm;
mod app;
mod cache;
mod cli;
mod error;
mod logging;
mod screen;
mod settings;
mod single_instance;
mod widget;

use std::process::ExitCode;

use clap::Parser;
use silksong_platform::AppPaths;

use crate::cli::Cli;
use crate::error::AppError;
use crate::settings::AppSettings;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let paths = match AppPaths::discover() {
        Ok(paths) => paths,
        Err(error) => {
            eprintln!("silksong: {}", AppError::from(error));
            return ExitCode::from(2);
        }
    };
    if let Err(error) = paths.ensure_dirs() {
        eprintln!(
            "silksong: {}",
            AppError::io("create application directories", error)
        );
        return ExitCode::from(2);
    }

    let settings = AppSettings::load_from(&paths.settings_file());
    logging::init_logging(
        &paths,
        cli.debug || settings.debug_logging,
        settings.max_log_size_bytes,
    );
    log::debug!("Starting silksong {}", env!("CARGO_PKG_VERSION"));

    match app::run(cli.selected_command(), &paths, settings).await {
        Ok(code) => code,
        Err(error) => {
            log::error!("{error}");
            eprintln!("silksong: {error}");
            ExitCode::from(2)
        }
    }
}
