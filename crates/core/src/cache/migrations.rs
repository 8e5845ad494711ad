//! Schema migrations for the partition store.
//!
//! Applied versions are recorded in `_migrations`; each run applies only the
//! versions above the recorded maximum, in order, inside one transaction.

use super::Error;
use tokio_rusqlite::{Connection, params};

/// Ordered (version, SQL) pairs.
const MIGRATIONS: &[(i64, &str)] = &[
    (1, include_str!("../../migrations/001_partitions.sql")),
    (2, include_str!("../../migrations/002_registrations.sql")),
];

/// Apply pending migrations. Returns how many were applied.
pub async fn run(conn: &Connection) -> Result<usize, Error> {
    let applied = conn
        .call(|conn| -> Result<usize, Error> {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS _migrations (
                    version INTEGER PRIMARY KEY,
                    applied_at TEXT NOT NULL
                )",
                [],
            )?;

            let tx = conn.transaction()?;
            let current: i64 = tx.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;

            let mut applied = 0;
            for (version, sql) in MIGRATIONS.iter().filter(|(version, _)| *version > current) {
                tx.execute_batch(sql)
                    .map_err(|e| Error::MigrationFailed(format!("version {version}: {e}")))?;
                tx.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                    params![version, chrono::Utc::now().to_rfc3339()],
                )?;
                applied += 1;
            }
            tx.commit()?;
            Ok(applied)
        })
        .await
        .map_err(Error::from)?;

    if applied > 0 {
        tracing::debug!(applied, "applied cache migrations");
    }
    Ok(applied)
}
