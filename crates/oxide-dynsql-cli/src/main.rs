//! oxide-dynsql CLI
//!
//! Command-line tool for checking, splitting and rendering dynamic SQL
//! templates.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use oxide_dynsql_cli::commands::{self, Mode};

/// Dynamic SQL templates from the command line.
#[derive(Parser)]
#[command(name = "oxide-dynsql")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// SQL dialect used to quote identifiers.
    #[arg(short, long, env = "DYNSQL_DIALECT", default_value = "generic")]
    dialect: String,

    /// Fragment for `@include(KEY)`, read from PATH. Repeatable.
    #[arg(
        long = "fragment",
        value_name = "KEY=PATH",
        value_parser = commands::parse_fragment_arg
    )]
    fragments: Vec<(String, PathBuf)>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where a template comes from.
#[derive(Args)]
struct TemplateArgs {
    /// Template text.
    template: Option<String>,

    /// Read the template from a file.
    #[arg(short, long)]
    file: Option<PathBuf>,
}

/// Parameters for a build.
#[derive(Args)]
struct ParamArgs {
    /// Parameters as JSON: an object, an array of positional values, or an
    /// array of rows in batch mode.
    #[arg(short, long)]
    params: Option<String>,

    /// Read the parameters from a JSON file.
    #[arg(long)]
    params_file: Option<PathBuf>,

    /// Statement to build.
    #[arg(short, long, value_enum, default_value_t = Mode::Auto)]
    mode: Mode,
}

impl TemplateArgs {
    fn read(&self) -> anyhow::Result<String> {
        commands::read_template(self.template.as_deref(), self.file.as_deref())
    }
}

impl ParamArgs {
    fn read(&self) -> anyhow::Result<serde_json::Value> {
        commands::read_params(self.params.as_deref(), self.params_file.as_deref())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build a template and print the SQL and its arguments as JSON.
    Render {
        #[command(flatten)]
        template: TemplateArgs,

        #[command(flatten)]
        params: ParamArgs,
    },

    /// Parse and prepare every statement of a script.
    Check {
        #[command(flatten)]
        template: TemplateArgs,
    },

    /// Split a script into statements.
    Split {
        #[command(flatten)]
        template: TemplateArgs,
    },

    /// Build a template and run it against a SQLite database.
    Exec {
        /// Database URL.
        #[arg(long, env = "DATABASE_URL", default_value = "sqlite::memory:")]
        database: String,

        #[command(flatten)]
        template: TemplateArgs,

        #[command(flatten)]
        params: ParamArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let ctx = commands::load_context(&cli.dialect, &cli.fragments)?;

    match cli.command {
        Commands::Render { template, params } => {
            let text = template.read()?;
            let values = params.read()?;
            println!("{}", commands::render(&ctx, &text, values, params.mode)?);
        }

        Commands::Check { template } => {
            let text = template.read()?;
            for line in commands::check(&ctx, &text)? {
                println!("{line}");
            }
        }

        Commands::Split { template } => {
            let text = template.read()?;
            for statement in commands::split(&ctx, &text)? {
                println!("{statement};");
            }
        }

        Commands::Exec {
            database,
            template,
            params,
        } => {
            let text = template.read()?;
            let values = params.read()?;
            let output = commands::exec(&ctx, &database, &text, values, params.mode).await?;
            println!("{output}");
        }
    }

    Ok(())
}
