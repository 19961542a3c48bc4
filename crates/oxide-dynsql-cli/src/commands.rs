//! Subcommand implementations.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::ValueEnum;
use oxide_dynsql::dialect;
use oxide_dynsql::params::from_json;
use oxide_dynsql::{DynamicSqlClause, Params, Parser, SqlContext, SqlType};
use oxide_dynsql_sqlx::SqlExecutor;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::{debug, info};

/// Which statement to build from a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Mode {
    /// Query for selects, update for everything else.
    #[default]
    Auto,
    /// Query statement (`= NULL` rewritten to `is null`).
    Query,
    /// Update statement.
    Update,
    /// Count form of a select.
    Count,
    /// Batch statement, the parameters being an array of rows.
    Batch,
}

/// Parses a `key=path` fragment argument.
///
/// # Errors
///
/// Returns a message when the argument has no `=` or an empty key.
pub fn parse_fragment_arg(arg: &str) -> Result<(String, PathBuf), String> {
    match arg.split_once('=') {
        Some((key, path)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected KEY=PATH, got '{arg}'")),
    }
}

/// Creates a context for a dialect name and registers fragment files.
///
/// # Errors
///
/// Returns an error for an unknown dialect, an unreadable fragment file or a
/// fragment that does not parse.
pub fn load_context(
    dialect: &str,
    fragments: &[(String, PathBuf)],
) -> anyhow::Result<Arc<SqlContext>> {
    let Some(dialect) = dialect::by_name(dialect) else {
        bail!("unknown dialect '{dialect}'");
    };
    let ctx = SqlContext::new(dialect);
    for (key, path) in fragments {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading fragment {}", path.display()))?;
        ctx.register_fragment(key, text.trim())
            .with_context(|| format!("registering fragment '{key}'"))?;
        debug!(key = %key, path = %path.display(), "loaded fragment");
    }
    Ok(Arc::new(ctx))
}

/// Reads parameters from inline JSON or a JSON file, NULL when neither is
/// given.
///
/// # Errors
///
/// Returns an error if both are given, the file is unreadable or the JSON is
/// invalid.
pub fn read_params(inline: Option<&str>, file: Option<&Path>) -> anyhow::Result<Value> {
    let text = match (inline, file) {
        (Some(_), Some(_)) => bail!("--params and --params-file are exclusive"),
        (Some(text), None) => text.to_string(),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("reading parameters {}", path.display()))?,
        (None, None) => return Ok(Value::Null),
    };
    serde_json::from_str(&text).context("parsing parameters")
}

/// Reads a template from a file or takes it inline.
///
/// # Errors
///
/// Returns an error if both or neither are given, or the file is unreadable.
pub fn read_template(inline: Option<&str>, file: Option<&Path>) -> anyhow::Result<String> {
    match (inline, file) {
        (Some(_), Some(_)) => bail!("give either a template or --file, not both"),
        (Some(text), None) => Ok(text.to_string()),
        (None, Some(path)) => {
            fs::read_to_string(path).with_context(|| format!("reading template {}", path.display()))
        }
        (None, None) => bail!("no template given"),
    }
}

fn rows(params: Value) -> anyhow::Result<Vec<Box<dyn Params + Send + Sync>>> {
    match params {
        Value::Array(items) => Ok(items.into_iter().map(from_json).collect()),
        Value::Null => Ok(Vec::new()),
        other => bail!("batch parameters must be an array of rows, got {other}"),
    }
}

const fn resolve_mode(mode: Mode, sql_type: SqlType) -> Mode {
    match (mode, sql_type) {
        (Mode::Auto, SqlType::Select) => Mode::Query,
        (Mode::Auto, _) => Mode::Update,
        (mode, _) => mode,
    }
}

/// Builds a template and returns the statement as pretty JSON.
///
/// # Errors
///
/// Returns an error if the template does not parse or cannot be built in the
/// requested mode.
pub fn render(
    ctx: &Arc<SqlContext>,
    template: &str,
    params: Value,
    mode: Mode,
) -> anyhow::Result<String> {
    let clause = DynamicSqlClause::parse(Arc::clone(ctx), template)?;
    let mode = resolve_mode(mode, clause.sql().sql_type());
    debug!(?mode, "rendering template");
    if mode == Mode::Batch {
        let batch = clause.create_batch_statement(&rows(params)?)?;
        return Ok(serde_json::to_string_pretty(&batch)?);
    }
    let params = from_json(params);
    let statement = match mode {
        Mode::Count => clause.create_count_statement(&*params)?,
        Mode::Query => clause.create_query_statement(&*params)?,
        _ => clause.create_update_statement(&*params)?,
    };
    Ok(serde_json::to_string_pretty(&statement)?)
}

/// Splits a script and prepares every statement, one report line each.
///
/// # Errors
///
/// Returns the first statement that fails, with its position.
pub fn check(ctx: &Arc<SqlContext>, script: &str) -> anyhow::Result<Vec<String>> {
    let statements = Parser::new(ctx).split(script)?;
    let mut report = Vec::with_capacity(statements.len());
    for (i, statement) in statements.iter().enumerate() {
        let clause = DynamicSqlClause::parse(Arc::clone(ctx), statement)
            .with_context(|| format!("statement {}", i + 1))?;
        report.push(format!("{}: {:?}", i + 1, clause.sql().sql_type()));
    }
    Ok(report)
}

/// Splits a script into its statements.
///
/// # Errors
///
/// Returns an error if the script cannot be tokenized.
pub fn split(ctx: &SqlContext, script: &str) -> anyhow::Result<Vec<String>> {
    Ok(Parser::new(ctx).split(script)?)
}

/// Builds a template and runs it against a SQLite database.
///
/// Queries report their row count, other statements the affected rows.
///
/// # Errors
///
/// Returns an error if the database is unreachable, or building or running
/// the statement fails.
pub async fn exec(
    ctx: &Arc<SqlContext>,
    database: &str,
    template: &str,
    params: Value,
    mode: Mode,
) -> anyhow::Result<String> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(database)
        .await
        .with_context(|| format!("connecting to {database}"))?;
    let executor = SqlExecutor::new(pool);
    let clause = DynamicSqlClause::parse(Arc::clone(ctx), template)?;
    let output = match resolve_mode(mode, clause.sql().sql_type()) {
        Mode::Batch => {
            let affected = executor.execute_batch(&clause, &rows(params)?).await?;
            format!("{affected} rows affected")
        }
        Mode::Count => {
            let count = executor.fetch_count(&clause, &*from_json(params)).await?;
            count.to_string()
        }
        Mode::Query => {
            let rows = executor.fetch_all(&clause, &*from_json(params)).await?;
            format!("{} rows", rows.len())
        }
        Mode::Update | Mode::Auto => {
            let affected = executor.execute(&clause, &*from_json(params)).await?;
            format!("{affected} rows affected")
        }
    };
    info!(database = %database, "{output}");
    Ok(output)
}
