use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "koyomi",
    version,
    about = "Agenda of calendar feeds with locally promoted events"
)]
pub struct Cli {
    /// Configuration file (defaults to ./koyomi.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print feed and note events inside a date range
    Agenda(AgendaArgs),
    /// List configured feeds
    Feeds,
    /// Print the override keys claimed by local notes
    Overrides,
}

#[derive(Debug, Clone, Default, Args)]
pub struct AgendaArgs {
    /// First day to show (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last day to show (YYYY-MM-DD, defaults to a week after --from)
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Ignore cached feed data
    #[arg(long)]
    pub refresh: bool,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}
