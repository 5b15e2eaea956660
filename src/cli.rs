mod help_text;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Content-hash build stamps driven by compiler depfiles
#[derive(Parser, Debug)]
#[command(
    name = "depstamp",
    version,
    about,
    long_about = help_text::ROOT_LONG_ABOUT,
    after_help = help_text::ROOT_AFTER_HELP
)]
pub struct Cli {
    /// Change to DIRECTORY before doing anything
    #[arg(short = 'C', value_name = "DIRECTORY", global = true)]
    pub directory: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug). Takes precedence over RUST_LOG.
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        conflicts_with = "log_level"
    )]
    pub verbose: u8,

    /// Set an explicit log level. Takes precedence over RUST_LOG.
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Identifies one build action: where its stamp lives, the configuration it
/// is built under, and where its inputs come from.
#[derive(Args, Debug)]
pub struct ActionArgs {
    /// Stamp file recording the last successful build of this action
    #[arg(long, value_name = "FILE")]
    pub stamp: PathBuf,

    /// Build mode, e.g. debug, profile or release
    #[arg(long, value_name = "MODE")]
    pub mode: String,

    /// Target platform; omitted means unspecified
    #[arg(long, value_name = "PLATFORM")]
    pub platform: Option<String>,

    /// Depfile whose inputs belong to this action (repeatable)
    #[arg(long = "depfile", value_name = "DEPFILE")]
    pub depfiles: Vec<PathBuf>,

    /// Additional input files
    #[arg(value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the input paths listed by a depfile, one per line
    Deps {
        #[arg(value_name = "DEPFILE")]
        depfile: PathBuf,
    },

    /// Exit 0 if the stamp matches the current inputs, 1 if a rebuild is needed
    Check {
        #[command(flatten)]
        action: ActionArgs,
    },

    /// Record the current inputs as the action's stamp
    Stamp {
        #[command(flatten)]
        action: ActionArgs,

        /// Print the stamp to stdout instead of writing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate a stamp file and summarize its contents
    Show {
        #[arg(value_name = "STAMP")]
        stamp: PathBuf,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
