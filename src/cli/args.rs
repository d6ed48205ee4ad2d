//! 命令行参数

use std::path::PathBuf;

use adrules_engine::DeclaredType;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};

/// Ad-blocking / DNS filter rule aggregator
#[derive(Parser, Debug)]
#[command(name = "adrules", version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the full fetch → merge → emit pipeline once
    Run {
        /// Configuration file
        #[arg(short, long, default_value = "adrules.toml")]
        config: PathBuf,

        /// Override output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load and validate the configuration, then print the source registry
    Validate {
        /// Configuration file
        #[arg(short, long, default_value = "adrules.toml")]
        config: PathBuf,
    },

    /// Normalize a local rule file and print the canonical rules
    Parse {
        /// Declared syntax of the file (blacklist, whitelist, dns, hosts)
        #[arg(short = 't', long = "type")]
        declared_type: DeclaredType,

        /// Rule file to parse
        file: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
    Compact,
}
