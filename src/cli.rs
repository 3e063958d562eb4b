use std::fmt;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run every stage (fetch, filter, enrich, stats) into a fresh workspace.
    Build(BuildArgs),
    /// Download a user's full anime list.
    Fetch(FetchArgs),
    /// Keep list entries started in a given year.
    Filter(FilterArgs),
    /// Join list entries with per-title metadata.
    Enrich(EnrichArgs),
    /// Aggregate enriched records into a report and charts.
    Stats(StatsArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Json,
    Yaml,
}

impl ReportFormat {
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Json => "report.json",
            Self::Yaml => "report.yaml",
        }
    }
}

/// Endpoint and credential overrides; unset values fall back to the environment.
#[derive(Clone, Default, Args)]
pub struct ApiArgs {
    /// List API base URL (env: ANILYTICS_LIST_BASE_URL).
    #[arg(long)]
    pub list_base_url: Option<String>,

    /// Detail API base URL (env: ANILYTICS_DETAIL_BASE_URL).
    #[arg(long)]
    pub detail_base_url: Option<String>,

    /// List API client id (env: ANILYTICS_CLIENT_ID).
    #[arg(long)]
    pub client_id: Option<String>,

    /// Per-request timeout in seconds (env: ANILYTICS_TIMEOUT_SECS).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: Option<u64>,
}

impl fmt::Debug for ApiArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiArgs")
            .field("list_base_url", &self.list_base_url)
            .field("detail_base_url", &self.detail_base_url)
            .field("client_id", &self.client_id.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// List owner's user name.
    #[arg(long)]
    pub user: String,

    /// Output file path for `list.jsonl`.
    #[arg(long)]
    pub out: String,

    /// Include NSFW titles in the list.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub nsfw: bool,

    /// Overwrite the output if it exists.
    #[arg(long, default_value_t = false)]
    pub force: bool,

    #[command(flatten)]
    pub api: ApiArgs,
}

#[derive(Debug, Args)]
pub struct FilterArgs {
    /// Input path to `list.jsonl`.
    #[arg(long)]
    pub input: String,

    /// Output file path for `filtered.jsonl`.
    #[arg(long)]
    pub out: String,

    /// Year the entries must have been started in.
    #[arg(long, default_value_t = 2024)]
    pub year: i32,

    /// Overwrite the output if it exists.
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct EnrichArgs {
    /// Input path to `filtered.jsonl`.
    #[arg(long)]
    pub input: String,

    /// Output file path for `enriched.jsonl`.
    #[arg(long)]
    pub out: String,

    /// Output file path for per-entity failures (JSONL).
    #[arg(long)]
    pub failures: Option<String>,

    /// Spacing between detail requests (detail API rate limit).
    #[arg(long, default_value_t = 1000)]
    pub delay_ms: u64,

    /// Overwrite the outputs if they exist.
    #[arg(long, default_value_t = false)]
    pub force: bool,

    #[command(flatten)]
    pub api: ApiArgs,
}

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Input path to `enriched.jsonl`.
    #[arg(long)]
    pub input: String,

    /// Output directory for the report and `charts/`.
    #[arg(long)]
    pub out: String,

    /// Year shown in chart titles and the report.
    #[arg(long, default_value_t = 2024)]
    pub year: i32,

    /// Report serialization format.
    #[arg(long, value_enum, default_value_t = ReportFormat::Json)]
    pub format: ReportFormat,

    /// Number of categories kept in each top table.
    #[arg(long, default_value_t = 5)]
    pub top: usize,

    /// Overwrite existing outputs.
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct BuildArgs {
    /// List owner's user name.
    #[arg(long)]
    pub user: String,

    /// Output directory for workspace (list/filtered/enriched/report).
    #[arg(long)]
    pub out: String,

    /// Year the entries must have been started in.
    #[arg(long, default_value_t = 2024)]
    pub year: i32,

    /// Include NSFW titles in the list.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub nsfw: bool,

    /// Spacing between detail requests (detail API rate limit).
    #[arg(long, default_value_t = 1000)]
    pub delay_ms: u64,

    /// Report serialization format.
    #[arg(long, value_enum, default_value_t = ReportFormat::Json)]
    pub format: ReportFormat,

    /// Number of categories kept in each top table.
    #[arg(long, default_value_t = 5)]
    pub top: usize,

    #[command(flatten)]
    pub api: ApiArgs,
}
