use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::yaml_output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "gototest")]
#[command(about = "Jump between Python code and its unit tests, generating test stubs on demand", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml, global = true)]
    pub format: OutputFormat,

    /// Log navigation decisions to stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Args)]
pub struct Location {
    /// Python source file
    pub file: PathBuf,

    /// 0-based row of the cursor
    #[arg(long, default_value_t = 0)]
    pub row: usize,

    /// Read the file's current text from stdin instead of disk
    #[arg(long)]
    pub stdin: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Locate the counterpart of the declaration at a row
    Goto {
        #[command(flatten)]
        location: Location,
    },

    /// Locate the test of the declaration at a row, generating stubs when missing
    Generate {
        #[command(flatten)]
        location: Location,

        /// Print the resulting test file instead of writing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the declaration tree of a file
    Index {
        /// Python source file
        file: PathBuf,

        /// Read the text from stdin instead of disk
        #[arg(long)]
        stdin: bool,
    },

    /// List declarations that have no test
    Audit {
        /// Project root
        #[arg(long = "root", short = 'd', default_value = ".")]
        root: PathBuf,

        /// Additional directory names to skip
        #[arg(long = "exclude")]
        excludes: Vec<String>,

        /// Do not skip the default directories (.git, __pycache__, virtualenvs, ...)
        #[arg(long)]
        no_defaults: bool,

        /// Stop after this many seconds and report partial results
        #[arg(long)]
        timeout: Option<u64>,
    },
}
