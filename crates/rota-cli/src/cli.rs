use clap::{Parser, Subcommand, ValueEnum};
use rota_core::dates::DateOrder;
use rota_core::identity::IdentityMode;
use rota_core::models::ItemKind;
use std::path::PathBuf;

/// Natural-language recurrence parsing and agenda expansion for Rota lists and tasks
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Show what the engine reads from a piece of item text
    Parse(ParseCommand),
    /// Expand items from a data file into an agenda
    Agenda(AgendaCommand),
    /// Preview the next occurrences of a rule string
    Preview(PreviewCommand),
    /// Compute the occurrence hash used by completion and ignore records
    Hash(HashCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct ParseCommand {
    /// The item text to parse
    pub text: String,
    /// Day/month order for ambiguous numeric dates
    #[clap(long, value_enum)]
    pub order: Option<OrderArg>,
    /// Reference instant for relative dates (defaults to now)
    #[clap(long)]
    pub at: Option<String>,
    /// Print JSON instead of a table
    #[clap(long)]
    pub json: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct AgendaCommand {
    /// JSON data file (overrides the configured data_file)
    #[clap(short, long)]
    pub file: Option<PathBuf>,
    /// Window start (e.g. "2025-09-01", "yesterday")
    #[clap(long)]
    pub from: Option<String>,
    /// Window end (e.g. "2025-09-30", "next friday")
    #[clap(long)]
    pub to: Option<String>,
    /// Maximum occurrences per item
    #[clap(long)]
    pub max_per_item: Option<usize>,
    /// Maximum occurrences overall
    #[clap(long)]
    pub max_total: Option<usize>,
    /// Keep ignored occurrences, marked as such
    #[clap(long)]
    pub include_ignored: bool,
    /// Show only the first occurrence of each item
    #[clap(long)]
    pub collapse: bool,
    /// Print JSON instead of a table
    #[clap(long)]
    pub json: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct PreviewCommand {
    /// Rule string, e.g. "FREQ=WEEKLY;INTERVAL=2;BYDAY=MO"
    pub rule: String,
    /// Anchor instant for the rule
    #[clap(long)]
    pub dtstart: String,
    /// Only show occurrences at or after this instant (defaults to dtstart)
    #[clap(long)]
    pub from: Option<String>,
    /// Number of occurrences to show
    #[clap(short = 'n', long, default_value_t = 5)]
    pub count: usize,
}

#[derive(Parser, Debug, Clone)]
pub struct HashCommand {
    /// Item kind
    #[clap(long, value_enum)]
    pub kind: KindArg,
    /// Item id (UUID)
    #[clap(long)]
    pub id: String,
    /// Occurrence instant
    #[clap(long)]
    pub at: String,
    /// Rule string of the occurrence, if recurring
    #[clap(long)]
    pub rule: Option<String>,
    /// Item title
    #[clap(long, default_value = "")]
    pub title: String,
    /// Which inputs take part in the hash (defaults to the configured mode)
    #[clap(long, value_enum)]
    pub mode: Option<ModeArg>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderArg {
    Dmy,
    Mdy,
}

impl From<OrderArg> for DateOrder {
    fn from(arg: OrderArg) -> Self {
        match arg {
            OrderArg::Dmy => DateOrder::Dmy,
            OrderArg::Mdy => DateOrder::Mdy,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindArg {
    List,
    Task,
}

impl From<KindArg> for ItemKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::List => ItemKind::List,
            KindArg::Task => ItemKind::Task,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Stable,
    Content,
}

impl From<ModeArg> for IdentityMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Stable => IdentityMode::Stable,
            ModeArg::Content => IdentityMode::Content,
        }
    }
}
