use std::process::ExitCode;

use log::info;
use silksong_platform::AppPaths;

use crate::cli::ConfigCommand;
use crate::error::AppError;
use crate::settings::AppSettings;

pub(super) fn run(
    command: ConfigCommand,
    paths: &AppPaths,
    mut settings: AppSettings,
) -> Result<ExitCode, AppError> {
    let path = paths.settings_file();

    match command {
        ConfigCommand::Show => {
            println!("# {}", path.display());
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        ConfigCommand::SetAppId { app_id } => {
            let query = settings.set_product_id(&app_id)?;
            settings
                .save_to(&path)
                .map_err(|error| AppError::settings_save(&path, error))?;
            info!("Stored app id {}", query.product_id());
            println!("Now checking app {} ({})", query.product_id(), query.label());
        }
        ConfigCommand::Reset => {
            AppSettings::default()
                .save_to(&path)
                .map_err(|error| AppError::settings_save(&path, error))?;
            info!("Settings reset to defaults");
            println!("Settings reset to defaults");
        }
    }

    Ok(ExitCode::SUCCESS)
}
