//! The cache storage interface the router consumes.
//!
//! Hosts that keep responses somewhere other than SQLite implement this
//! trait; [`CacheDb`] is the bundled implementation.

use async_trait::async_trait;

use super::connection::CacheDb;
use crate::{Error, Response};

/// Named-partition response storage.
///
/// Every key is a full request URL. All write methods open the partition
/// first, so callers never need an explicit `open` before writing.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a partition, creating it if it doesn't exist.
    async fn open(&self, partition: &str) -> Result<(), Error>;

    /// Store every entry or none of them.
    async fn add_all(&self, partition: &str, entries: Vec<(String, Response)>) -> Result<(), Error>;

    /// Look up the response stored for `url`.
    async fn match_url(&self, partition: &str, url: &str) -> Result<Option<Response>, Error>;

    /// Insert or replace the response stored for `url`.
    async fn put(&self, partition: &str, url: &str, response: &Response) -> Result<(), Error>;

    /// Returns true if an entry was removed.
    async fn delete(&self, partition: &str, url: &str) -> Result<bool, Error>;

    async fn keys(&self, partition: &str) -> Result<Vec<String>, Error>;

    /// Remove every entry of a partition. Returns the number removed.
    async fn clear(&self, partition: &str) -> Result<u64, Error>;

    async fn partition_names(&self) -> Result<Vec<String>, Error>;

    /// Returns true if a partition was removed.
    async fn delete_partition(&self, partition: &str) -> Result<bool, Error>;

    async fn registered_version(&self) -> Result<Option<String>, Error>;

    async fn record_registration(&self, version: &str) -> Result<(), Error>;
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, partition: &str) -> Result<(), Error> {
        self.open_partition(partition).await
    }

    async fn add_all(&self, partition: &str, entries: Vec<(String, Response)>) -> Result<(), Error> {
        self.put_entries(partition, &entries).await
    }

    async fn match_url(&self, partition: &str, url: &str) -> Result<Option<Response>, Error> {
        self.get_entry(partition, url)
            .await?
            .map(|entry| entry.to_response())
            .transpose()
    }

    async fn put(&self, partition: &str, url: &str, response: &Response) -> Result<(), Error> {
        self.put_entry(partition, url, response).await
    }

    async fn delete(&self, partition: &str, url: &str) -> Result<bool, Error> {
        self.delete_entry(partition, url).await
    }

    async fn keys(&self, partition: &str) -> Result<Vec<String>, Error> {
        self.entry_keys(partition).await
    }

    async fn clear(&self, partition: &str) -> Result<u64, Error> {
        self.clear_partition(partition).await
    }

    async fn partition_names(&self) -> Result<Vec<String>, Error> {
        CacheDb::partition_names(self).await
    }

    async fn delete_partition(&self, partition: &str) -> Result<bool, Error> {
        CacheDb::delete_partition(self, partition).await
    }

    async fn registered_version(&self) -> Result<Option<String>, Error> {
        CacheDb::registered_version(self).await
    }

    async fn record_registration(&self, version: &str) -> Result<(), Error> {
        CacheDb::record_registration(self, version).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, StatusCode};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_storage_through_trait_object() {
        let storage: Arc<dyn CacheStorage> = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let url = "https://app.example/index.html";
        let response = Response::new(StatusCode::OK, HeaderMap::new(), "<html></html>");

        storage.put("eus-static-v1", url, &response).await.unwrap();

        let matched = storage.match_url("eus-static-v1", url).await.unwrap().unwrap();
        assert_eq!(matched, response);
        assert_eq!(storage.keys("eus-static-v1").await.unwrap(), vec![url.to_string()]);
        assert!(storage.match_url("eus-api-v1", url).await.unwrap().is_none());
    }
}
