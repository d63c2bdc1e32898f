use std::process::ExitCode;

use chrono::{DateTime, Utc};
use serde::Serialize;
use silksong_core::{ReleaseStatus, StatusFetcher, SteamStoreFetcher, check_once};
use silksong_platform::AppPaths;

use super::{http_client, remember_display_name, select_query, verdict_exit_status};
use crate::cache::{CachingFetcher, OfflineFetcher};
use crate::cli::CheckArgs;
use crate::error::AppError;
use crate::settings::AppSettings;

#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    product_id: &'a str,
    display_name: &'a str,
    #[serde(flatten)]
    status: &'a ReleaseStatus,
    checked_at: DateTime<Utc>,
}

pub(super) async fn run(
    args: &CheckArgs,
    paths: &AppPaths,
    mut settings: AppSettings,
) -> Result<ExitCode, AppError> {
    let query = select_query(&settings, args.app_id.as_deref())?;

    let fetcher: Box<dyn StatusFetcher> = if args.offline {
        Box::new(OfflineFetcher::new(paths.payload_cache_file()))
    } else {
        Box::new(CachingFetcher::new(
            SteamStoreFetcher::new(http_client(&settings)),
            paths.payload_cache_file(),
        ))
    };

    let resolution = check_once(fetcher.as_ref(), &query).await;
    let display_name = resolution
        .display_name
        .as_deref()
        .unwrap_or_else(|| query.label());

    if args.json {
        let report = CheckReport {
            product_id: query.product_id(),
            display_name,
            status: &resolution.status,
            checked_at: Utc::now(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Is {display_name} out?");
        println!("{}", resolution.status);
    }

    if let Some(name) = resolution.display_name.as_deref() {
        remember_display_name(paths, &mut settings, query.product_id(), name);
    }

    Ok(ExitCode::from(verdict_exit_status(&resolution.status)))
}
