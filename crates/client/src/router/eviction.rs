//! API partition eviction sweep.
//!
//! Every period the whole API partition is emptied. There is no per-entry
//! age check; an entry written just after a sweep survives until the next.

use std::sync::Arc;
use std::time::Duration;

use eus_offline_core::CacheStorage;

use super::schedule::{RecurringTask, ScheduledTask, Scheduler, TaskFuture};

/// Clear `partition` once. Failures are logged and count as zero removals.
pub async fn sweep(storage: &dyn CacheStorage, partition: &str) -> u64 {
    match storage.clear(partition).await {
        Ok(removed) => {
            tracing::info!(partition, removed, "api cache sweep");
            removed
        }
        Err(e) => {
            tracing::warn!(partition, error = %e, "api cache sweep failed");
            0
        }
    }
}

/// Schedule [`sweep`] of `partition` every `period`.
pub fn schedule_sweep(
    scheduler: &dyn Scheduler, storage: Arc<dyn CacheStorage>, partition: String, period: Duration,
) -> ScheduledTask {
    let task: RecurringTask = Arc::new(move || -> TaskFuture {
        let storage = Arc::clone(&storage);
        let partition = partition.clone();
        Box::pin(async move {
            sweep(storage.as_ref(), &partition).await;
        })
    });
    scheduler.schedule_every(period, task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::schedule::ManualScheduler;
    use eus_offline_core::{CacheDb, Response};
    use http::{HeaderMap, StatusCode};

    const HOUR: Duration = Duration::from_secs(60 * 60);

    fn ok(body: &'static str) -> Response {
        Response::new(StatusCode::OK, HeaderMap::new(), body)
    }

    #[tokio::test]
    async fn test_sweep_clears_only_the_api_partition() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry("eus-api-v1", "http://localhost:3000/api/surveys", &ok("[]"))
            .await
            .unwrap();
        db.put_entry("eus-static-v1", "http://localhost:3000/index.html", &ok("<html>"))
            .await
            .unwrap();

        assert_eq!(sweep(&db, "eus-api-v1").await, 1);
        assert!(db.entry_keys("eus-api-v1").await.unwrap().is_empty());
        assert_eq!(db.entry_keys("eus-static-v1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_scheduled_sweep_fires_after_one_hour() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let storage: Arc<dyn CacheStorage> = Arc::new(db.clone());
        let scheduler = ManualScheduler::new();
        let _sweep = schedule_sweep(&scheduler, storage, "eus-api-v1".into(), HOUR);

        db.put_entry("eus-api-v1", "http://localhost:3000/api/a", &ok("a"))
            .await
            .unwrap();
        db.put_entry("eus-api-v1", "http://localhost:3000/api/b", &ok("b"))
            .await
            .unwrap();

        scheduler.advance(HOUR - Duration::from_secs(1)).await;
        assert_eq!(db.entry_keys("eus-api-v1").await.unwrap().len(), 2);

        scheduler.advance(Duration::from_secs(1)).await;
        assert!(db.entry_keys("eus-api-v1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sweep_of_missing_partition_is_a_noop() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert_eq!(sweep(&db, "eus-api-v1").await, 0);
    }
}
