use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use subvc_sdk::{SubmissionId, TriggerType, VersionId};

#[derive(Parser)]
#[command(
    name = "subvc",
    about = "Version history for assignment submissions",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Repository root (defaults to the nearest directory containing `.subvc`)
    #[arg(long, global = true)]
    pub repo: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new repository
    Init(InitArgs),
    /// Record a new version of a submission
    Commit(CommitArgs),
    /// List a submission's versions, newest first
    Log(LogArgs),
    /// Show one version and its files
    Show(ShowArgs),
    /// Show the latest version of a submission
    Latest(LatestArgs),
    /// Print a file as stored in a version
    Cat(CatArgs),
    /// Compare two versions
    Diff(DiffArgs),
    /// Check history integrity
    Verify(VerifyArgs),
    /// Remove blobs no version references
    Gc(GcArgs),
    /// Show storage statistics
    Stats,
}

#[derive(Args)]
pub struct InitArgs {
    pub path: Option<PathBuf>,
    #[arg(long)]
    pub snapshot_interval: Option<u32>,
    /// Compress blob payloads at rest
    #[arg(long)]
    pub compress: bool,
}

#[derive(Args)]
pub struct CommitArgs {
    #[arg(short, long)]
    pub submission: SubmissionId,
    #[arg(short, long, default_value = "MANUAL")]
    pub trigger: TriggerType,
    #[arg(short, long)]
    pub author: Option<String>,
    #[arg(short, long)]
    pub message: Option<String>,
    /// Metadata entry as KEY=VALUE
    #[arg(long = "meta", value_parser = parse_key_value)]
    pub metadata: Vec<(String, String)>,
    /// Files or directories to record
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

#[derive(Args)]
pub struct LogArgs {
    #[arg(short, long)]
    pub submission: SubmissionId,
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
    #[arg(long)]
    pub oneline: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    pub version: VersionId,
}

#[derive(Args)]
pub struct LatestArgs {
    #[arg(short, long)]
    pub submission: SubmissionId,
}

#[derive(Args)]
pub struct CatArgs {
    pub version: VersionId,
    pub path: String,
}

#[derive(Args)]
pub struct DiffArgs {
    pub source: VersionId,
    pub target: VersionId,
    /// Only diff this path
    #[arg(long)]
    pub path: Option<String>,
    /// Print the per-file counts without hunks
    #[arg(long)]
    pub stat: bool,
}

#[derive(Args)]
pub struct VerifyArgs {
    /// Check one submission instead of all
    #[arg(short, long)]
    pub submission: Option<SubmissionId>,
}

#[derive(Args)]
pub struct GcArgs {
    /// List what would be removed
    #[arg(long)]
    pub dry_run: bool,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}
