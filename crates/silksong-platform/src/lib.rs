mod commands;
mod paths;

pub use commands::HideWindow;
pub use paths::{AppPaths, AppPathsError, HOME_OVERRIDE_ENV};
