//! Defines the command-line arguments and subcommands for the runbook CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "runbook",
    version,
    about = "A declarative, resumable test runner with persisted run history."
)]
pub struct RunbookArgs {
    /// State file holding every test's run history.
    #[arg(long, global = true, default_value = "runbook-state.yaml")]
    pub state: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Execute scripts, resuming from persisted state.
    Run {
        /// Script files, or directories to scan for scripts.
        #[arg(required = true)]
        scripts: Vec<PathBuf>,
        /// Print the updated state documents after execution.
        #[arg(long, value_enum, value_name = "FORMAT")]
        output: Option<OutputFormat>,
    },
    /// Show derived statuses, step by step.
    Status {
        /// Test uid; covers every stored test when omitted.
        uid: Option<String>,
    },
    /// Print serialized state, run histories included.
    Results {
        /// Test uid, as shown by `list`; dumps every test when omitted.
        uid: Option<String>,
        /// Document encoding.
        #[arg(long, value_enum, value_name = "FORMAT", default_value = "yaml")]
        output: OutputFormat,
    },
    /// List the tests held in the state file.
    List,
    /// Clear run histories, returning steps to `unknown`.
    Reset {
        /// Test uid; resets every stored test when omitted.
        uid: Option<String>,
    },
    /// List every registered hook identifier.
    Hooks,
}

/// Serialization formats the `--output` flags accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}
