use std::time::Duration;

use carhaul_core::config::DatabaseConfig;
use sqlx::sqlite::SqlitePoolOptions;

pub type DbPool = sqlx::SqlitePool;

/// Opens a sqlite pool sized from `[database]` config. The sqlite busy
/// handler is given the same window as pool acquisition so a locked
/// database and an exhausted pool time out together.
pub async fn connect(database: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    let timeout = Duration::from_secs(database.timeout_secs.max(1));
    let busy_timeout_ms = timeout.as_millis().min(u128::from(u32::MAX)) as u64;

    SqlitePoolOptions::new()
        .max_connections(database.max_connections.max(1))
        .acquire_timeout(timeout)
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                let busy = format!("PRAGMA busy_timeout = {busy_timeout_ms}");
                sqlx::query(&busy).execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(&database.url)
        .await
}
