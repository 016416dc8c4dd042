//! Command-line surface: argument parsing, logging setup and text output

pub mod args;
pub mod logging;
pub mod output;
