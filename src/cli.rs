// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `taskstream`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskstream",
    version,
    about = "Run a command and relay its output, exit status and signals.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to a task config file (TOML).
    ///
    /// Ignored when a command is given on the command line. Default:
    /// `Taskstream.toml` in the current working directory.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKSTREAM_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Forward our own stdin to the child, line by line.
    #[arg(long)]
    pub stdin: bool,

    /// Treat a non-zero exit status as success and just pass it through.
    #[arg(long)]
    pub allow_nonzero: bool,

    /// Print every lifecycle event instead of relaying raw output.
    #[arg(long)]
    pub events: bool,

    /// Command to run, followed by its arguments.
    #[arg(
        value_name = "CMD",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
