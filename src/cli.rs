// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `forgedag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "forgedag",
    version,
    about = "Resolve and execute distributed build graphs.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the graph manifest (TOML).
    ///
    /// Default: `Forgedag.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Forgedag.toml")]
    pub manifest: String,

    /// Parse, validate and resolve the graph, print it, but execute nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Execute the graph with placeholder artifacts instead of real work,
    /// to validate the wiring end-to-end.
    #[arg(long)]
    pub simulate: bool,

    /// Fire this trigger when it becomes ready (repeatable).
    #[arg(long = "fire", value_name = "TRIGGER")]
    pub fire: Vec<String>,

    /// Fire every trigger as soon as it becomes ready.
    #[arg(long)]
    pub auto_fire: bool,

    /// Agent-local artifact exchange root.
    #[arg(long, value_name = "DIR", default_value = ".forgedag/artifacts")]
    pub artifact_dir: String,

    /// Shared artifact exchange root reachable by other agents.
    #[arg(long, value_name = "DIR")]
    pub shared_dir: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FORGEDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
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
