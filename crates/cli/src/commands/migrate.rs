//! Database migration command.
//!
//! Applies the migrations embedded from `crates/api/migrations/`.
//!
//! # Environment Variables
//!
//! - `BOOKNEST_DATABASE_URL` - `PostgreSQL` connection string (falls
//!   back to `DATABASE_URL`)

use sqlx::PgPool;
use sqlx::migrate::Migrator;

static MIGRATOR: Migrator = sqlx::migrate!("../api/migrations");

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run (or list, with `dry_run`) the database migrations.
pub async fn run(dry_run: bool) -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    if dry_run {
        for migration in MIGRATOR.iter() {
            tracing::info!(
                version = migration.version,
                description = %migration.description,
                "embedded migration"
            );
        }
        return Ok(());
    }

    let database_url = std::env::var("BOOKNEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| MigrationError::MissingEnvVar("BOOKNEST_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(&database_url).await?;

    tracing::info!("Running migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
