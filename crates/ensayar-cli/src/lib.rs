//! Ensayador: command-line front end for the ensayar test framework
//!
//! ## Usage
//!
//! ```bash
//! ensayador run                      # Run all registered tests
//! ensayador run --smoke --repeat 5   # Smoke suite, five passes
//! ensayador list                     # Print discovered test names
//! ensayador tree                     # Render the test hierarchy
//! ```
//!
//! The binary runs whatever fixtures the linked game code registered
//! into [`ensayar::TestRegistry::global`] before `main` hands over.

#![warn(missing_docs)]

mod commands;
mod config;
mod error;
mod output;
mod runner;
mod tree;

pub use commands::{Cli, ColorArg, Commands, ListArgs, RunArgs, TreeArgs};
pub use config::{init_logging, CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::ProgressPrinter;
pub use runner::TestRunner;
pub use tree::render_tree;
