use std::ffi::OsStr;
use std::path::PathBuf;

use anomscope_view::{Focus, MethodFilter, Selection, TopLimit};
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Json => "json",
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "invalid log format '{other}', expected one of: human, json"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Json => "json",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "invalid output format '{other}', expected one of: table, json"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct ViewArgs {
    #[arg(
        long,
        default_value = "all",
        value_parser = parse_method,
        help = "Detection method filter: all, iqr, or z"
    )]
    pub method: MethodFilter,

    #[arg(long, help = "Keep only rows from this provider state")]
    pub state: Option<String>,

    #[arg(long, help = "Keep only rows with this provider type")]
    pub provider_type: Option<String>,

    #[arg(long, help = "Keep only rows with this place of service")]
    pub place_of_service: Option<String>,

    #[arg(
        long,
        value_parser = parse_limit,
        help = "Rows to show: 10, 20, 50, 100, or 200 (defaults to [view].default_limit)"
    )]
    pub limit: Option<TopLimit>,

    #[arg(
        long,
        default_value = "all",
        value_parser = parse_focus,
        help = "Method subset to present: all, iqr, or z"
    )]
    pub focus: Focus,

    #[arg(
        long,
        default_value = "table",
        value_parser = parse_output_format,
        help = "Output format: table or json"
    )]
    pub output: OutputFormat,
}

impl ViewArgs {
    pub fn selections(&self) -> [Selection; 3] {
        [
            Selection::from_option(self.state.clone()),
            Selection::from_option(self.provider_type.clone()),
            Selection::from_option(self.place_of_service.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct OutputArgs {
    #[arg(
        long,
        default_value = "table",
        value_parser = parse_output_format,
        help = "Output format: table or json"
    )]
    pub output: OutputFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Show the filtered, cost-ordered anomaly view
    View(ViewArgs),
    /// List the values each categorical filter accepts
    Options(OutputArgs),
    /// Show headline statistics from the summary export
    Kpis(OutputArgs),
    /// Print the grouped statistics export, if present
    Groups,
    /// Write a default .anomscope/config.toml
    Init,
}

#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Filter, rank and summarize exported anomaly records")]
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value = ".",
        help = "Workspace root holding .anomscope/config.toml"
    )]
    pub workspace: PathBuf,

    #[arg(
        long,
        global = true,
        help = "Base URL or directory serving summary.json, anomalies.json and top_groups.json"
    )]
    pub source: Option<String>,

    #[arg(
        long,
        global = true,
        default_value = "human",
        value_parser = parse_log_format,
        help = "Log format: human or json"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

pub fn parse_cli() -> Cli {
    let mut args: Vec<_> = std::env::args_os().collect();
    if args.get(1).is_some_and(|arg| arg == OsStr::new("--")) {
        args.remove(1);
    }

    Cli::parse_from(args)
}

fn parse_method(value: &str) -> Result<MethodFilter, String> {
    value.parse()
}

fn parse_focus(value: &str) -> Result<Focus, String> {
    value.parse()
}

fn parse_limit(value: &str) -> Result<TopLimit, String> {
    value.parse()
}

fn parse_output_format(value: &str) -> Result<OutputFormat, String> {
    value.parse()
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    value.parse()
}
