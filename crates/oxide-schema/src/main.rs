//! oxide-schema CLI
//!
//! Runs prepared statements and table maintenance against a configured
//! connection.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use oxide_db::{ConnectionConfig, Database, DatabaseConfig, Params, Value};
use oxide_schema::SchemaDriver;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Prepared SQL and table maintenance for MySQL and SQLite.
#[derive(Parser)]
#[command(name = "oxide-schema")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file with named connections.
    #[arg(short, long, env = "OXIDE_DB_CONFIG")]
    config: Option<PathBuf>,

    /// DSN used when no configuration file is given (e.g. `sqlite:app.db`).
    #[arg(short, long, env = "OXIDE_DB_DSN", default_value = "sqlite::memory:")]
    dsn: String,

    /// Table prefix used with `--dsn`.
    #[arg(short, long, env = "OXIDE_DB_PREFIX", default_value = "")]
    prefix: String,

    /// Connection name (defaults to the configuration's default).
    #[arg(long)]
    connection: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a statement and print its result.
    Exec {
        /// SQL with `{{table}}` macros and `:name` parameters.
        sql: String,

        /// Parameters as `name=value`; values are parsed as JSON, else taken as text.
        #[arg(value_name = "NAME=VALUE")]
        params: Vec<String>,
    },

    /// Print a statement with its parameters inlined, without executing it.
    Sql {
        /// SQL with `{{table}}` macros and `:name` parameters.
        sql: String,

        /// Parameters as `name=value`.
        #[arg(value_name = "NAME=VALUE")]
        params: Vec<String>,
    },

    /// Drop a table.
    DropTable {
        /// Table name, without prefix.
        name: String,

        /// Do not fail if the table is missing.
        #[arg(long)]
        if_exists: bool,
    },
}

fn parse_params(pairs: &[String]) -> anyhow::Result<Params> {
    let mut params = Params::new();
    for pair in pairs {
        let Some((name, raw)) = pair.split_once('=') else {
            bail!("Parameter '{pair}' is not NAME=VALUE");
        };
        let value = serde_json::from_str::<Value>(raw)
            .ok()
            .filter(|v| !v.is_array() && !v.is_object())
            .unwrap_or_else(|| Value::String(raw.to_string()));
        params.insert(name.trim_start_matches(':').to_string(), value);
    }
    Ok(params)
}

fn load_config(cli: &Cli) -> anyhow::Result<DatabaseConfig> {
    match &cli.config {
        Some(path) => DatabaseConfig::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display())),
        None => {
            let config = DatabaseConfig::default().with_connection(
                "default",
                ConnectionConfig::new(&cli.dsn).table_prefix(&cli.prefix),
            );
            config.validate()?;
            Ok(config)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&cli)?;
    let name = cli
        .connection
        .clone()
        .unwrap_or_else(|| config.default.clone());
    let mut db = Database::new(config);
    let executor = db.connection(&name).await?;

    match cli.command {
        Commands::Exec { sql, params } => {
            let params = parse_params(&params)?;
            let Some(result) = executor.exec(&sql, &params).await? else {
                let error = executor
                    .last_error()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                bail!("Statement failed: {error}");
            };
            for row in &result.rows {
                println!("{}", serde_json::to_string(row)?);
            }
            info!(
                rows = result.rows.len(),
                affected = result.rows_affected,
                last_insert_id = ?result.last_insert_id,
                "Statement executed"
            );
        }

        Commands::Sql { sql, params } => {
            let params = parse_params(&params)?;
            println!("{}", executor.prepare_sql(&sql, &params)?);
        }

        Commands::DropTable { name, if_exists } => {
            let mut schema = SchemaDriver::new(executor);
            if if_exists {
                schema.drop_table_if_exists(&name).await?;
            } else {
                schema.drop_table(&name).await?;
            }
            info!(table = %name, "Table dropped");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_params() {
        let params = parse_params(&[
            String::from("id=5"),
            String::from(":name=alice"),
            String::from("flag=true"),
            String::from("list=[1,2]"),
            String::from("eq=a=b"),
        ])
        .unwrap();
        assert_eq!(params.get("id"), Some(&json!(5)));
        assert_eq!(params.get("name"), Some(&json!("alice")));
        assert_eq!(params.get("flag"), Some(&json!(true)));
        assert_eq!(params.get("list"), Some(&json!("[1,2]")));
        assert_eq!(params.get("eq"), Some(&json!("a=b")));
    }

    #[test]
    fn test_parse_params_rejects_bare_words() {
        assert!(parse_params(&[String::from("oops")]).is_err());
    }
}
