use crate::output_formats::OutputFormat;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(long, value_parser, default_value_t = false, global = true)]
    pub verbose: bool,

    #[clap(long, value_parser, global = true)]
    pub log: Option<PathBuf>,

    /// Configuration file (defaults to the usual config locations)
    #[clap(long, value_parser, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

/// Per-invocation overrides of the configured filter and cache settings
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Substring selecting the searchable columns
    #[clap(long, value_parser)]
    pub marker: Option<String>,

    #[clap(long, value_parser)]
    pub bonus: Option<f64>,

    #[clap(long, value_parser)]
    pub threshold: Option<f64>,

    /// Score without dropping any record
    #[clap(long, value_parser, default_value_t = false)]
    pub raw: bool,

    #[clap(long, value_parser, default_value_t = false)]
    pub no_cache: bool,

    #[clap(long, value_parser)]
    pub cache_dir: Option<PathBuf>,

    #[clap(long, value_parser, default_value_t = false)]
    pub auto_backtrack: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Narrow a catalog with successive search terms
    Search {
        catalog: PathBuf,

        #[clap(required = true)]
        terms: Vec<String>,

        /// Undo this many terms after applying them
        #[clap(long, value_parser)]
        backtrack: Option<usize>,

        #[clap(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        #[clap(long, value_parser)]
        limit: Option<usize>,

        /// Print counters after the run
        #[clap(long, value_parser, default_value_t = false)]
        metrics: bool,

        #[clap(flatten)]
        filter: FilterArgs,
    },
    /// Show the most frequent keywords of a selection
    Relevant {
        catalog: PathBuf,

        terms: Vec<String>,

        #[clap(short = 'n', long, value_parser, default_value_t = 5)]
        count: usize,

        #[clap(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        #[clap(flatten)]
        filter: FilterArgs,
    },
    /// Filter step by step from a prompt
    Interactive {
        catalog: PathBuf,

        #[clap(flatten)]
        filter: FilterArgs,
    },
    /// Inspect or clear the search cache
    Cache {
        #[clap(subcommand)]
        action: CacheAction,

        #[clap(long, value_parser, global = true)]
        cache_dir: Option<PathBuf>,
    },
    Completions {
        #[clap(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// Remove every cached search result
    Clear,
    /// Print the cache directory
    Path,
    /// Print entry counts
    Stats,
}
