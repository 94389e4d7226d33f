use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "poon",
    about = "Poon - content-addressed, versioned file store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding the repository's objects and version records
    #[arg(long, global = true, default_value = ".poon")]
    pub store: PathBuf,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Snapshot a directory as a new version
    Ingest(IngestArgs),
    /// Print a file at a version
    Cat(CatArgs),
    /// List a directory at a version
    Ls(LsArgs),
    /// Show version history
    Log(LogArgs),
    /// Apply a unified diff as a new version
    Apply(ApplyArgs),
    /// Show the versions at which a file changed
    History(HistoryArgs),
    /// Show a file's changes between two versions
    Diff(DiffArgs),
    /// Verify every stored object
    Fsck(FsckArgs),
    /// Drop the current version
    Rollback(RollbackArgs),
}

#[derive(Args)]
pub struct IngestArgs {
    pub dir: PathBuf,
    #[arg(short, long, default_value = "Snapshot")]
    pub message: String,
    #[arg(long, default_value = "poon")]
    pub author: String,
}

#[derive(Args)]
pub struct CatArgs {
    pub path: String,
    /// Defaults to the current version
    #[arg(long = "at")]
    pub version: Option<i64>,
}

#[derive(Args)]
pub struct LsArgs {
    #[arg(default_value = "")]
    pub path: String,
    #[arg(long = "at")]
    pub version: Option<i64>,
}

#[derive(Args)]
pub struct LogArgs {
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
    #[arg(long)]
    pub oneline: bool,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Patch file, or `-` for stdin
    pub patch: String,
    #[arg(short, long, default_value = "Apply patch")]
    pub message: String,
    #[arg(long, default_value = "poon")]
    pub author: String,
}

#[derive(Args)]
pub struct HistoryArgs {
    pub path: String,
    #[arg(short = 'n', long, default_value = "0")]
    pub limit: usize,
}

#[derive(Args)]
pub struct DiffArgs {
    pub path: String,
    pub from: i64,
    /// Defaults to the current version
    pub to: Option<i64>,
}

#[derive(Args)]
pub struct FsckArgs {}

#[derive(Args)]
pub struct RollbackArgs {}
