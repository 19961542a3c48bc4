//! Common test utilities for CLI command tests.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use oxide_dynsql::SqlContext;
use oxide_dynsql_cli::commands;
use tempfile::TempDir;

/// Writes a file into the directory and returns its path.
pub fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("Failed to write test file");
    path
}

/// A generic-dialect context without fragments.
pub fn context() -> Arc<SqlContext> {
    commands::load_context("generic", &[]).expect("Failed to create context")
}

/// Parses JSON command output.
pub fn json(output: &str) -> serde_json::Value {
    serde_json::from_str(output).unwrap_or_else(|e| panic!("Invalid JSON: {output}\nError: {e}"))
}
