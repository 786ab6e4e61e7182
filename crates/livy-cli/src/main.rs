mod banner;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use livy_config::{ConfigLoader, StoreConfig};
use livy_db::{MigrationReport, Migrator, SchemaRepository, SqlRepository};
use livy_gateway::{ConfigurationService, GatewayServer};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "livy", version, about = "Key-value configuration service")]
struct Cli {
    /// Load environment variables from this file before reading configuration
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Use a SQLite database file instead of Postgres
    #[arg(long, global = true, env = "LIVY_SQLITE_PATH")]
    sqlite: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run pending migrations, then serve the HTTP API (default)
    Serve,
    /// Run pending migrations and exit
    Migrate,
    /// Show the current schema version
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let env_file = load_env_file(cli.env_file.as_deref())?;
    init_tracing(cli.log_json);
    if let Some(path) = env_file {
        info!("loaded environment from {}", path.display());
    }

    let config = ConfigLoader::from_env()
        .load_with_sqlite(cli.sqlite.clone())
        .context("failed to load configuration")?;
    debug!(?config, "configuration loaded");

    let repo = connect(&config.store).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let report = migrate(&repo).await?;
            banner::print_banner(&config, report.to);
            let service = ConfigurationService::new(repo, config.api.request_timeout());
            GatewayServer::new(config.api, service)
                .run()
                .await
                .context("gateway server failed")?;
        }
        Command::Migrate => {
            let report = migrate(&repo).await?;
            if report.is_noop() {
                println!("schema already at version {}", report.to);
            } else {
                println!(
                    "migrated schema from version {} to {} (applied {:?})",
                    report.from, report.to, report.applied
                );
            }
        }
        Command::Status => status(&repo).await?,
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// An explicit env file must load; otherwise a `.env` in the working
/// directory is picked up when present.
fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>> {
    match path {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("failed to load env file {}", path.display()))?;
            Ok(Some(path.to_path_buf()))
        }
        None => Ok(dotenvy::dotenv().ok()),
    }
}

async fn connect(store: &StoreConfig) -> Result<Arc<SqlRepository>> {
    let store = store.clone();
    let backend = store.backend();
    // The postgres client blocks and drives its own runtime.
    let gateway = tokio::task::spawn_blocking(move || livy_db::connect(&store))
        .await
        .context("storage connect task panicked")?
        .with_context(|| format!("failed to connect to {backend} store"))?;
    info!(backend, "backing store connected");
    Ok(Arc::new(SqlRepository::new(gateway)))
}

async fn migrate(repo: &Arc<SqlRepository>) -> Result<MigrationReport> {
    let migrator = Migrator::new(repo.clone());
    tokio::select! {
        report = migrator.run() => report.context("schema migration failed"),
        _ = tokio::signal::ctrl_c() => anyhow::bail!("schema migration interrupted"),
    }
}

async fn status(repo: &Arc<SqlRepository>) -> Result<()> {
    let migrator = Migrator::new(repo.clone());
    let current = migrator.current_version().await?;
    let applied = if current == 0 {
        Vec::new()
    } else {
        repo.applied_versions().await?
    };
    println!("backend:        {}", repo.backend());
    println!("schema version: {current}");
    println!("latest version: {}", migrator.latest_version());
    println!("recorded:       {applied:?}");
    if current < migrator.latest_version() {
        println!("pending:        {}", migrator.latest_version() - current);
    }
    Ok(())
}
