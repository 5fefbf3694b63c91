use anyhow::Context;
use sqlx::{migrate::Migrator, postgres::PgPoolOptions, PgPool};

/// Schema embedded at compile time from `./migrations`.
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Failure of any backing store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("store unavailable: {0:#}")]
    Unavailable(#[from] anyhow::Error),
}

pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("connect to database")?;

    run_migrations(&db).await?;
    Ok(db)
}

/// The server must not start on a schema it cannot bring up to date.
pub async fn run_migrations(db: &PgPool) -> anyhow::Result<()> {
    MIGRATOR.run(db).await.context("run migrations")?;
    tracing::info!(count = MIGRATOR.iter().count(), "migrations applied");
    Ok(())
}
