use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "saprotect")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " using SHA-1"))]
#[command(about = "Record file hashes and check on changes", long_about = None)]
pub struct Cli {
    /// Integrity store to use instead of the configured one
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Leave out headers, separators and totals
    #[arg(short, long, global = true)]
    pub clean: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Record the hashes of the TARGETs and flag any mismatches found
    #[command(visible_alias = "p")]
    Protect(ProtectArgs),
    /// Resolve hash mismatches on the TARGETs in favor of the old hash
    #[command(visible_alias = "r")]
    RemediateOld(TargetArgs),
    /// Resolve hash mismatches on the TARGETs in favor of the new hash
    #[command(visible_alias = "R")]
    RemediateNew(TargetArgs),
    /// Show files with mismatched hashes
    #[command(visible_alias = "m")]
    ListMismatches {
        /// Print paths without the hash pair
        #[arg(long)]
        paths_only: bool,
    },
    /// Show hashes for all files named FILE in the store
    #[command(visible_alias = "d")]
    ShowDuplicates {
        #[arg(value_name = "FILE")]
        file: String,
    },
    /// Summarize the last scan (default)
    Info,
    /// List previous scan sessions, newest first
    History {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Print every record in the store
    Dump,
}

#[derive(Debug, Args)]
pub struct ProtectArgs {
    /// Only record files not already present in the store
    #[arg(short, long)]
    pub add_only: bool,

    #[arg(value_name = "TARGET", required = true)]
    pub targets: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct TargetArgs {
    #[arg(value_name = "TARGET", required = true)]
    pub targets: Vec<PathBuf>,
}
