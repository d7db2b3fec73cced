//! pg-table-backup CLI - dependency-aware backup and restore of PostgreSQL tables.

use clap::{Args, Parser, Subcommand};
use pg_table_backup::{BackupError, Config, Overrides, RunResult, Runner};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "pg-table-backup")]
#[command(about = "Dependency-aware backup and restore of PostgreSQL tables")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long, global = true)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text", global = true)]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info", global = true)]
    verbosity: String,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Connection settings that take precedence over the configuration file.
#[derive(Args, Default)]
struct ConnectionArgs {
    /// Override database host
    #[arg(long, global = true)]
    host: Option<String>,

    /// Override database port
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Override database name
    #[arg(long, global = true)]
    database: Option<String>,

    /// Override database user
    #[arg(long, global = true)]
    user: Option<String>,

    /// Override database password
    #[arg(long, global = true)]
    password: Option<String>,

    /// Override schema the tables live in
    #[arg(long, global = true)]
    schema: Option<String>,

    /// Override SSL mode: disable, require, verify-ca, verify-full
    #[arg(long, global = true)]
    ssl_mode: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the tables and everything they depend on to an artifact
    Backup {
        /// Tables to back up (comma-separated)
        #[arg(long, value_delimiter = ',')]
        tables: Option<Vec<String>>,

        /// Artifact to append to
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Truncate the artifact instead of appending
        #[arg(long)]
        overwrite: bool,

        /// Dry run: resolve and print the table order without reading rows
        #[arg(long)]
        dry_run: bool,
    },

    /// Replay an artifact in one transaction
    Restore {
        /// Tables the artifact is expected to cover (comma-separated)
        #[arg(long, value_delimiter = ',')]
        tables: Option<Vec<String>>,

        /// Artifact to read
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Dry run: validate the artifact without executing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Test the database connection
    HealthCheck,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), BackupError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(BackupError::Config)?;

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    let conn = cli.connection;
    let mut overrides = Overrides {
        host: conn.host,
        port: conn.port,
        database: conn.database,
        user: conn.user,
        password: conn.password,
        schema: conn.schema,
        ssl_mode: conn.ssl_mode,
        ..Default::default()
    };

    match cli.command {
        Commands::Backup {
            tables,
            output,
            overwrite,
            dry_run,
        } => {
            overrides.tables = tables;
            overrides.file = output;
            overrides.overwrite = overwrite;

            let runner = Runner::new(config.with_overrides(overrides))?;
            let result = runner.backup(dry_run).await?;
            report(&result, cli.output_json)?;
        }

        Commands::Restore {
            tables,
            input,
            dry_run,
        } => {
            overrides.tables = tables;
            overrides.file = input;

            let runner = Runner::new(config.with_overrides(overrides))?;
            let result = runner.restore(dry_run).await?;
            report(&result, cli.output_json)?;
        }

        Commands::HealthCheck => {
            let runner = Runner::for_health_check(config.with_overrides(overrides))?;
            let result = runner.health_check().await;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                let db = &runner.config().database;
                println!("Health Check Results:");
                println!(
                    "  PostgreSQL {}:{}/{}: {} ({}ms)",
                    db.host,
                    db.port,
                    db.database,
                    if result.connected { "OK" } else { "FAILED" },
                    result.latency_ms
                );
                if let Some(ref version) = result.server_version {
                    println!("    Version: {}", version);
                }
                if let Some(ref err) = result.error {
                    println!("    Error: {}", err);
                }
                println!(
                    "\n  Overall: {}",
                    if result.healthy { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if !result.healthy {
                return Err(BackupError::connection(
                    result.error.unwrap_or_default(),
                    "health check",
                ));
            }
        }
    }

    Ok(())
}

fn report(result: &RunResult, output_json: bool) -> Result<(), BackupError> {
    if output_json {
        println!("{}", result.to_json()?);
        return Ok(());
    }

    let (noun, unit) = match result.command.as_str() {
        "restore" => ("Restore", "Statements"),
        _ => ("Backup", "Rows"),
    };
    if result.dry_run {
        println!("\n{} dry run completed!", noun);
    } else {
        println!("\n{} completed!", noun);
    }
    println!("  Run ID: {}", result.run_id);
    println!("  File: {}", result.file.display());
    println!("  Duration: {:.2}s", result.duration_seconds);
    println!("  Tables: {}", result.tables.len());
    for table in &result.tables {
        match result.dependencies.get(table) {
            Some(deps) if !deps.is_empty() => {
                println!("    {} (depends on {})", table, deps.join(", "))
            }
            _ => println!("    {}", table),
        }
    }
    if !result.dry_run {
        println!("  {}: {}", unit, result.total());
    }
    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("Invalid verbosity '{}'", other)),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("Invalid log format '{}'. Use text or json", other)),
    }

    Ok(())
}
