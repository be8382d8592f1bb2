//! Shared SQLite pool construction for the CLI and the server process.
//! `bib-core`/`bib-index`/`bib-sessions`/`bib-enrich` all take a pool they
//! didn't open themselves (their own tests use `sqlite::memory:` directly);
//! this is the one place that turns a `BIBLIOGRAPHIC_DB_PATH`-style file
//! path into a pool, creating the file if it doesn't exist yet.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

pub async fn open_pool(path: &str) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::new().filename(path).create_if_missing(true);
    let pool = SqlitePoolOptions::new().max_connections(10).connect_with(options).await?;
    Ok(pool)
}
