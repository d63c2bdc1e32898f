use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "silksong", version)]
#[command(about = "Is Hollow Knight: Silksong out yet? Asks the Steam store", long_about = None)]
pub struct Cli {
    /// Write debug logs to the log file (and stderr in debug builds)
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// `silksong` on its own behaves like `silksong watch`.
    pub fn selected_command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Watch(WatchArgs::default()))
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Check once and print the verdict (exit 0 = out, 1 = not out, 2 = error)
    Check(CheckArgs),
    /// Keep checking and ring the alarm when the game comes out
    Watch(WatchArgs),
    /// Print a one-line status for desktop widgets and status bars
    Widget(WidgetArgs),
    /// Inspect or change the stored settings
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Clone, Default, Args)]
pub struct CheckArgs {
    /// Steam app id to check instead of the stored one
    #[arg(long, value_name = "ID")]
    pub app_id: Option<String>,

    /// Resolve the last cached store payload without touching the network
    #[arg(long)]
    pub offline: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Default, Args)]
pub struct WatchArgs {
    /// Steam app id to watch instead of the stored one
    #[arg(long, value_name = "ID")]
    pub app_id: Option<String>,

    /// Seconds between checks
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,

    /// Do not ring when the game comes out
    #[arg(long)]
    pub no_alarm: bool,
}

#[derive(Debug, Clone, Default, Args)]
pub struct WidgetArgs {
    /// Keep printing a fresh line after every check
    #[arg(long)]
    pub watch: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ConfigCommand {
    /// Print the stored settings and where they live
    Show,
    /// Store a new Steam app id (non-digits are ignored)
    SetAppId {
        #[arg(value_name = "ID")]
        app_id: String,
    },
    /// Restore the default settings
    Reset,
}
