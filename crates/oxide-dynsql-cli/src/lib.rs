//! Library side of the `oxide-dynsql` command-line tool.
//!
//! The binary only parses arguments and sets up logging; everything it runs
//! lives in [`commands`] so it can be tested without spawning a process.

pub mod commands;
