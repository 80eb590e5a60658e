//! Command-line interface for promforge.
//!
//! - `args`: argument definitions and parsing structures (clap)
//! - `run`: entry point and command dispatch

pub mod args;
mod run;

pub use args::{Cli, Commands, RunArgs};
pub use run::run;
