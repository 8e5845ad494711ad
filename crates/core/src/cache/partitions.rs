//! Partition lifecycle and registration records.
//!
//! Partitions are created lazily by the first write (or an explicit open),
//! listed by name, and deleted by name. Deleting a partition cascades to
//! its entries.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

/// Summary of one partition.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PartitionInfo {
    pub name: String,
    pub created_at: String,
    pub entry_count: u64,
}

/// Insert the partition row if it is missing. Must run inside the caller's
/// connection closure so that entry writes see the row.
pub(crate) fn ensure_partition(conn: &rusqlite::Connection, name: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
        params![name, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

impl CacheDb {
    /// Open a partition, creating it if it doesn't exist.
    pub async fn open_partition(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                ensure_partition(conn, &name)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Names of all partitions, in creation order.
    pub async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY created_at, name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// All partitions with their entry counts.
    pub async fn list_partitions(&self) -> Result<Vec<PartitionInfo>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<PartitionInfo>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT p.name, p.created_at, COUNT(e.url)
                     FROM partitions p LEFT JOIN entries e ON e.partition = p.name
                     GROUP BY p.name
                     ORDER BY p.created_at, p.name",
                )?;
                let partitions = stmt
                    .query_map([], |row| {
                        Ok(PartitionInfo {
                            name: row.get(0)?,
                            created_at: row.get(1)?,
                            entry_count: row.get::<_, i64>(2)? as u64,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(partitions)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and all of its entries.
    ///
    /// Returns false if no partition had that name.
    pub async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Version tag of the router that last completed installation.
    pub async fn registered_version(&self) -> Result<Option<String>, Error> {
        self.conn
            .call(|conn| -> Result<Option<String>, Error> {
                let version = conn
                    .query_row("SELECT version FROM registrations WHERE id = 1", [], |row| row.get(0))
                    .optional()?;
                Ok(version)
            })
            .await
            .map_err(Error::from)
    }

    /// Record that `version` completed installation, replacing any earlier
    /// record.
    pub async fn record_registration(&self, version: &str) -> Result<(), Error> {
        let version = version.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO registrations (id, version, installed_at) VALUES (1, ?1, ?2)
                     ON CONFLICT(id) DO UPDATE SET
                        version = excluded.version,
                        installed_at = excluded.installed_at",
                    params![version, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Response;
    use http::{HeaderMap, StatusCode};

    #[tokio::test]
    async fn test_open_partition_is_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_partition("eus-static-v1").await.unwrap();
        db.open_partition("eus-static-v1").await.unwrap();

        assert_eq!(db.partition_names().await.unwrap(), vec!["eus-static-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_partition_cascades() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let response = Response::new(StatusCode::OK, HeaderMap::new(), "body");
        db.put_entry("old-cache-v0", "https://app.example/a.js", &response)
            .await
            .unwrap();

        assert!(db.delete_partition("old-cache-v0").await.unwrap());
        assert!(!db.delete_partition("old-cache-v0").await.unwrap());
        assert!(db.partition_names().await.unwrap().is_empty());

        let orphans: i64 = db
            .conn
            .call(|conn| conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn test_list_partitions_counts_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let response = Response::new(StatusCode::OK, HeaderMap::new(), "{}");
        db.open_partition("eus-platform-v1").await.unwrap();
        db.put_entry("eus-api-v1", "https://app.example/api/a", &response)
            .await
            .unwrap();
        db.put_entry("eus-api-v1", "https://app.example/api/b", &response)
            .await
            .unwrap();

        let partitions = db.list_partitions().await.unwrap();
        let api = partitions.iter().find(|p| p.name == "eus-api-v1").unwrap();
        let root = partitions.iter().find(|p| p.name == "eus-platform-v1").unwrap();
        assert_eq!(api.entry_count, 2);
        assert_eq!(root.entry_count, 0);
    }

    #[tokio::test]
    async fn test_registration_record() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert_eq!(db.registered_version().await.unwrap(), None);

        db.record_registration("v1").await.unwrap();
        db.record_registration("v2").await.unwrap();
        assert_eq!(db.registered_version().await.unwrap(), Some("v2".to_string()));
    }
}
