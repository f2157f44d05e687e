use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "resumatchd", version, about = "Resume ingestion and position matching service")]
pub struct Cli {
    /// Config file. Defaults to ./resumatch.json when present.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. `info` or `resumatch=debug`. RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the watcher, workers, match scheduler and stats reporter.
    Serve {
        /// Rescore every tagged position on each scheduler cycle.
        #[arg(long)]
        rematch_all: bool,
    },
    /// Tag new positions, then run one matching pass.
    Match {
        #[arg(long)]
        rematch_all: bool,
    },
    /// Tag positions and resumes that have no tag record.
    ScanTags,
    /// Import positions from a JSON array.
    ImportPositions { file: PathBuf },
    /// Reload the tag vocabulary and print its new version.
    ReloadVocab,
    /// Run the startup environment check.
    Check,
    /// Print processing statistics as JSON.
    Stats {
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
}
