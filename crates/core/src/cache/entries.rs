//! Entry CRUD operations.
//!
//! Entries are keyed by (partition, url). Writes use UPSERT semantics so a
//! URL never has more than one entry per partition, and every write opens
//! the partition first.

use super::connection::CacheDb;
use super::partitions::ensure_partition;
use crate::{Error, Response};
use http::StatusCode;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A cached response as stored in a partition.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    pub partition: String,
    pub url: String,
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl StoredEntry {
    /// Rebuild the captured response.
    pub fn to_response(&self) -> Result<Response, Error> {
        let status = StatusCode::from_u16(self.status_code)
            .map_err(|e| Error::CorruptEntry(format!("{}: {e}", self.url)))?;
        Ok(Response::new(status, Response::headers_from_pairs(&self.headers), self.body.clone()))
    }
}

const UPSERT_ENTRY: &str = "INSERT INTO entries (partition, url, status_code, headers_json, body, stored_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT(partition, url) DO UPDATE SET
        status_code = excluded.status_code,
        headers_json = excluded.headers_json,
        body = excluded.body,
        stored_at = excluded.stored_at";

/// Row values for one entry, computed outside the connection thread.
struct EntryRow {
    url: String,
    status_code: u16,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn new(url: &str, response: &Response) -> Result<Self, Error> {
        let headers_json = serde_json::to_string(&response.header_pairs())
            .map_err(|e| Error::InvalidInput(format!("failed to encode headers: {e}")))?;
        Ok(Self { url: url.to_string(), status_code: response.status.as_u16(), headers_json, body: response.body.to_vec() })
    }

    fn upsert(&self, conn: &rusqlite::Connection, partition: &str, stored_at: &str) -> Result<(), rusqlite::Error> {
        conn.execute(
            UPSERT_ENTRY,
            params![partition, &self.url, self.status_code, &self.headers_json, &self.body, stored_at],
        )?;
        Ok(())
    }
}

impl CacheDb {
    /// Insert or replace the entry for `url` in `partition`.
    pub async fn put_entry(&self, partition: &str, url: &str, response: &Response) -> Result<(), Error> {
        let partition = partition.to_string();
        let row = EntryRow::new(url, response)?;
        let stored_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_partition(&tx, &partition)?;
                row.upsert(&tx, &partition, &stored_at)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Store several entries in one transaction: either all of them land or
    /// none do.
    pub async fn put_entries(&self, partition: &str, entries: &[(String, Response)]) -> Result<(), Error> {
        let partition = partition.to_string();
        let rows = entries
            .iter()
            .map(|(url, response)| EntryRow::new(url, response))
            .collect::<Result<Vec<_>, _>>()?;
        let stored_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_partition(&tx, &partition)?;
                for row in &rows {
                    row.upsert(&tx, &partition, &stored_at)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get the entry for `url` in `partition`.
    ///
    /// Returns None if the partition or the entry doesn't exist.
    pub async fn get_entry(&self, partition: &str, url: &str) -> Result<Option<StoredEntry>, Error> {
        let partition = partition.to_string();
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<Option<StoredEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT partition, url, status_code, headers_json, body, stored_at
                     FROM entries WHERE partition = ?1 AND url = ?2",
                )?;

                let result = stmt.query_row(params![partition, url], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, u16>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Vec<u8>>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                });

                match result {
                    Ok((partition, url, status_code, headers_json, body, stored_at)) => {
                        let headers = serde_json::from_str(&headers_json)
                            .map_err(|e| Error::CorruptEntry(format!("{url}: {e}")))?;
                        Ok(Some(StoredEntry { partition, url, status_code, headers, body, stored_at }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the entry for `url` in `partition`.
    ///
    /// Returns false if there was nothing to delete.
    pub async fn delete_entry(&self, partition: &str, url: &str) -> Result<bool, Error> {
        let partition = partition.to_string();
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted =
                    conn.execute("DELETE FROM entries WHERE partition = ?1 AND url = ?2", params![partition, url])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// URLs stored in `partition`, oldest first.
    pub async fn entry_keys(&self, partition: &str) -> Result<Vec<String>, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE partition = ?1 ORDER BY stored_at, url")?;
                let keys = stmt
                    .query_map(params![partition], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every entry in `partition`, keeping the partition itself.
    ///
    /// Returns the number of deleted entries.
    pub async fn clear_partition(&self, partition: &str) -> Result<u64, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM entries WHERE partition = ?1", params![partition])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
