//! Command line interface definition

use clap::{Parser, Subcommand};
use spark_types::OutputFormat;
use std::path::PathBuf;

/// spark - Build orchestrator for fragment transformation pipelines
#[derive(Parser)]
#[command(name = "spark")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build orchestrator for fragment transformation pipelines")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug-level logging on stderr
    #[arg(long, global = true)]
    pub debug_log: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Project manifest to load
    #[arg(long, global = true, value_name = "PATH")]
    pub project: Option<PathBuf>,
}

impl GlobalArgs {
    /// Output format requested on the command line, if any
    pub fn output(&self) -> Option<OutputFormat> {
        self.json.then_some(OutputFormat::Json)
    }
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Build every out-of-date fragment, or a single one
    #[command(alias = "b")]
    Build {
        /// Build only this fragment
        #[arg(short, long, value_name = "ID")]
        fragment: Option<String>,

        /// Pause after every successful stage
        #[arg(long)]
        debug: bool,

        /// Wait for Enter at each pause (implies --debug)
        #[arg(long)]
        step: bool,
    },

    /// List transformers in chain order
    #[command(alias = "ls-pipeline")]
    Pipeline,

    /// List fragments and whether they need a build
    Fragments,
}
