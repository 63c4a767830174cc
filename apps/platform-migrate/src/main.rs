//! Schema migration CLI for the platform's Postgres store.
//! Thin wrapper around `sqlx::migrate!` pointed at
//! `platform-persistence/migrations`; forward-only, no down migrations.

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

#[derive(Parser)]
#[command(name = "platform-migrate")]
#[command(about = "Apply or inspect database schema migrations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply every pending migration.
    Run,
    /// List applied and pending migrations.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_env_filter(
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
    ).init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .context("connecting to database")?;

    match cli.command {
        Commands::Run => {
            sqlx::migrate!("../../crates/platform-persistence/migrations")
                .run(&pool)
                .await
                .context("running migrations")?;
            tracing::info!("migrations applied");
        }
        Commands::Status => {
            let migrator = sqlx::migrate!("../../crates/platform-persistence/migrations");
            let applied: Vec<_> = sqlx::query_as::<_, (i64,)>("SELECT version FROM _sqlx_migrations ORDER BY version")
                .fetch_all(&pool)
                .await
                .unwrap_or_default();
            let applied_versions: std::collections::HashSet<i64> = applied.into_iter().map(|(v,)| v).collect();
            for migration in migrator.iter() {
                let state = if applied_versions.contains(&(migration.version as i64)) { "applied" } else { "pending" };
                println!("{:>4}  {:<40}  {}", migration.version, migration.description, state);
            }
        }
    }

    Ok(())
}
