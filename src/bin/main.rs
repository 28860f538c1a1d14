//! hqlc CLI - Explain how HQL queries compile to SQL
//!
//! Usage:
//!   hqlc explain [--metamodel <m.toml>] [--config <hqlc.toml>] [--dialect <dialect>] "<query>"
//!   hqlc check "<query>"
//!
//! Examples:
//!   hqlc explain --metamodel model.toml "from Person p where p.name = :n"
//!   hqlc explain --metamodel model.toml --dialect tsql --output sql "select p.name from Person p"
//!   hqlc check "from Person p where"

use clap::{Parser, Subcommand, ValueEnum};
use hqlc::config::Settings;
use hqlc::hql::HqlParser;
use hqlc::metamodel::Metamodel;
use hqlc::sql::{Dialect, ParameterSlot};
use hqlc::{QueryCompiler, QueryError};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hqlc")]
#[command(about = "hqlc - Compile HQL queries to dialect-specific SQL")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a query and print its SQL and parameter markers
    Explain {
        /// The HQL query
        query: String,

        /// Metamodel definition (TOML); defaults to the configured one
        #[arg(short, long)]
        metamodel: Option<PathBuf>,

        /// Settings file; defaults to HQLC_CONFIG, ./hqlc.toml, then the user config dir
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// SQL dialect to generate (overrides the settings file)
        #[arg(short, long)]
        dialect: Option<DialectArg>,

        /// Output format
        #[arg(short, long, default_value = "verbose")]
        output: OutputFormat,
    },

    /// Check query syntax without a metamodel
    Check {
        /// The HQL query
        query: String,
    },
}

#[derive(Clone, ValueEnum)]
enum DialectArg {
    Ansi,
    Postgres,
    Mysql,
    Tsql,
    Db2,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Ansi => Dialect::Ansi,
            DialectArg::Postgres => Dialect::Postgres,
            DialectArg::Mysql => Dialect::MySql,
            DialectArg::Tsql => Dialect::TSql,
            DialectArg::Db2 => Dialect::Db2,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Output SQL only
    Sql,
    /// Output SQL with dialect, literal policy and parameter markers
    Verbose,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Explain {
            query,
            metamodel,
            config,
            dialect,
            output,
        } => cmd_explain(query, metamodel, config, dialect, output),
        Commands::Check { query } => cmd_check(query),
    }
}

fn cmd_explain(
    query: String,
    metamodel: Option<PathBuf>,
    config: Option<PathBuf>,
    dialect: Option<DialectArg>,
    output: OutputFormat,
) -> ExitCode {
    let settings = match config {
        Some(path) => Settings::from_file(&path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading settings: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let metamodel_path = match metamodel {
        Some(path) => path,
        None => match settings.metamodel_path() {
            Ok(Some(path)) => path,
            Ok(None) => {
                eprintln!("No metamodel given: pass --metamodel or set query.metamodel");
                return ExitCode::FAILURE;
            }
            Err(e) => {
                eprintln!("Error resolving metamodel path: {}", e);
                return ExitCode::FAILURE;
            }
        },
    };

    let model = match Metamodel::from_file(&metamodel_path) {
        Ok(m) => m,
        Err(e) => {
            eprintln!(
                "Error loading metamodel '{}': {}",
                metamodel_path.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    };

    let mut options = settings.compile_options();
    if let Some(dialect) = dialect {
        options = options.with_dialect(dialect.into());
    }

    let compiler = QueryCompiler::new(Arc::new(model), options);
    let plan = match compiler.compile(&query) {
        Ok(plan) => plan,
        Err(QueryError::Syntax(e)) => {
            eprint!("{}", e.report(&query));
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("Compilation error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match output {
        OutputFormat::Sql => {
            println!("{}", plan.sql());
        }
        OutputFormat::Verbose => {
            println!("-- hqlc compiled SQL");
            println!("-- Query: {}", query);
            println!("-- Dialect: {}", options.dialect);
            println!(
                "-- Literal rendering: {}",
                options.effective_literal_rendering()
            );
            println!();
            println!("{}", plan.sql());
            if !plan.slots().is_empty() {
                println!();
                println!("Parameters:");
                for (index, slot) in plan.slots().iter().enumerate() {
                    println!("  {}. {}", index + 1, describe_slot(slot));
                }
            }
        }
    }
    ExitCode::SUCCESS
}

fn describe_slot(slot: &ParameterSlot) -> String {
    match slot {
        ParameterSlot::Query { name, sql_type, .. } => match sql_type {
            Some(sql_type) => format!("{} ({:?})", name, sql_type),
            None => name.to_string(),
        },
        ParameterSlot::Literal { value, sql_type } => {
            format!("literal {} ({:?})", value, sql_type)
        }
    }
}

fn cmd_check(query: String) -> ExitCode {
    match HqlParser::new().parse(&query) {
        Ok(_) => {
            println!("OK: query is syntactically valid");
            ExitCode::SUCCESS
        }
        Err(QueryError::Syntax(e)) => {
            eprint!("{}", e.report(&query));
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
