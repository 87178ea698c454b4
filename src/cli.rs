use clap::{ArgGroup, Parser};
use clap_complete::Shell;
use std::path::PathBuf;

/// Archive Sweeper - extract ZIP archives, strip OS metadata, flatten nesting
#[derive(Parser, Debug)]
#[command(name = "archive-sweeper")]
#[command(author, version, about, long_about = None)]
#[command(group(
    ArgGroup::new("target")
        .args(["path", "directory"])
        .multiple(false)
))]
pub struct Cli {
    /// Directory to process
    #[arg(value_name = "DIRECTORY")]
    pub path: Option<PathBuf>,

    /// Directory to process (alternative to the positional argument)
    #[arg(short, long, value_name = "PATH")]
    pub directory: Option<PathBuf>,

    /// Only remove OS artifacts; do not extract or reorganize
    #[arg(short = 'c', long)]
    pub clean_only: bool,

    /// Never ask; overwrite existing destinations
    #[arg(short = 'n', long)]
    pub no_confirm: bool,

    /// Report detail: 0 (silent), 1 (summary), 2 (everything)
    #[arg(short, long, value_name = "LEVEL",
          value_parser = clap::value_parser!(u8).range(0..=2))]
    pub verbosity: Option<u8>,

    /// Largest archive accepted without confirmation, in bytes
    #[arg(long, value_name = "BYTES",
          value_parser = clap::value_parser!(u64).range(1..))]
    pub max_size: Option<u64>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Collapse at most one level of nesting per run
    #[arg(long)]
    pub single_pass: bool,

    /// Keep archives after successful extraction
    #[arg(long)]
    pub keep_archives: bool,

    /// Print run statistics as JSON instead of the report
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "debug")]
    pub quiet: bool,

    /// Print shell completions and exit
    #[arg(long, value_enum, value_name = "SHELL", exclusive = true)]
    pub completions: Option<Shell>,
}

impl Cli {
    /// The directory given either positionally or with `--directory`.
    pub fn target(&self) -> Option<&PathBuf> {
        self.path.as_ref().or(self.directory.as_ref())
    }
}
