use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use mentor_engine::config::Mode;

#[derive(Parser)]
#[command(
    name = "mentor",
    about = "Analyze source files for learning moments",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a file or directory and print classified patterns
    Analyze {
        /// File or directory to analyze
        path: PathBuf,

        /// Print machine-readable JSON instead of human output
        #[arg(long)]
        json: bool,

        /// Detection aggressiveness
        #[arg(long, value_enum, default_value = "gentle")]
        mode: ModeArg,

        /// Long-function threshold in logical lines
        #[arg(long)]
        min_function_lines: Option<usize>,

        /// Honor previously persisted dismissals from the cache snapshot
        #[arg(long)]
        use_cache: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Aggressive,
    Gentle,
}

impl From<ModeArg> for Mode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Aggressive => Mode::Aggressive,
            ModeArg::Gentle => Mode::Gentle,
        }
    }
}

/// Default location of the notification cache snapshot.
pub fn default_cache_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("mentor-engine")
        .join("notifications.json")
}
