//! Fire-and-forget scrape jobs, polled by id.
//!
//! ```text
//!  start_job(course) ──register Pending──▶ JobStore ◀──status(id)── pollers
//!        │                                    ▲
//!        └──tokio::spawn── Dispatcher ──Ok──▶ complete(id, tee_times)
//!                                     ──Err─▶ remove(id)
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::booking::Dispatcher;
use crate::db::models::TeeTime;

pub type JobId = Uuid;

#[derive(Debug, Clone)]
enum JobState {
    Pending,
    Complete(Vec<TeeTime>),
}

/// What a poller sees for a job id.
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatus {
    pub found: bool,
    pub complete: bool,
    pub results: Option<Vec<TeeTime>>,
}

impl JobStatus {
    fn not_found() -> Self {
        JobStatus {
            found: false,
            complete: false,
            results: None,
        }
    }
}

/// Thread-safe, in-memory job table. Clones share the same table.
#[derive(Clone, Default)]
pub struct JobStore {
    inner: Arc<RwLock<HashMap<JobId, JobState>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job in the pending state and return its id.
    pub async fn register(&self) -> JobId {
        let id = Uuid::new_v4();
        self.inner.write().await.insert(id, JobState::Pending);
        id
    }

    /// Store results for a pending job. Finished or unknown jobs are left alone.
    pub async fn complete(&self, id: JobId, tee_times: Vec<TeeTime>) {
        let mut inner = self.inner.write().await;
        if let Some(state) = inner.get_mut(&id) {
            if matches!(state, JobState::Pending) {
                *state = JobState::Complete(tee_times);
            }
        }
    }

    pub async fn remove(&self, id: JobId) {
        self.inner.write().await.remove(&id);
    }

    pub async fn status(&self, id: JobId) -> JobStatus {
        match self.inner.read().await.get(&id) {
            None => JobStatus::not_found(),
            Some(JobState::Pending) => JobStatus {
                found: true,
                complete: false,
                results: None,
            },
            Some(JobState::Complete(tee_times)) => JobStatus {
                found: true,
                complete: true,
                results: Some(tee_times.clone()),
            },
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

/// Runs dispatcher calls in the background and records their outcome.
#[derive(Clone)]
pub struct JobRunner {
    store: JobStore,
    dispatcher: Arc<Dispatcher>,
}

impl JobRunner {
    pub fn new(store: JobStore, dispatcher: Arc<Dispatcher>) -> Self {
        JobRunner { store, dispatcher }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Register a job for `course_id` and start scraping it in the background.
    /// Returns as soon as the job is registered.
    pub async fn start_job(&self, course_id: i64) -> JobId {
        let id = self.store.register().await;
        info!("Scrape job {} started for course {}", id, course_id);

        let store = self.store.clone();
        let dispatcher = Arc::clone(&self.dispatcher);
        tokio::spawn(async move {
            match dispatcher.fetch_tee_times(course_id).await {
                Ok(tee_times) => {
                    info!(
                        "Scrape job {} complete: {} tee time(s)",
                        id,
                        tee_times.len()
                    );
                    store.complete(id, tee_times).await;
                }
                Err(e) => {
                    // Pollers see a failed job as unknown.
                    warn!("Scrape job {} failed, removing it: {}", id, e);
                    store.remove(id).await;
                }
            }
        });

        id
    }

    pub async fn status(&self, id: JobId) -> JobStatus {
        self.store.status(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{catalog_with, course, fast_settings, spawn_server};
    use axum::routing::get;
    use axum::Router;
    use std::time::Duration;

    const ONE_TIME: &str = r#"[{"time":"2025-05-18 07:30","course_name":"Pine Hills","available_spots":2,"green_fee":45.00}]"#;

    fn tee_time(time: &str) -> TeeTime {
        TeeTime {
            time: time.to_string(),
            course_name: "Pine Hills".to_string(),
            available_spots: 4,
            green_fee: 40.0,
        }
    }

    /// Poll until the job leaves the pending state (or give up after 5s).
    async fn wait_until_settled(runner: &JobRunner, id: JobId) -> JobStatus {
        for _ in 0..100 {
            let status = runner.status(id).await;
            if !status.found || status.complete {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("job {id} never settled");
    }

    async fn slow_foreup_server() -> String {
        let app = Router::new()
            .route("/booking", get(|| async { "booking" }))
            .route(
                "/api/teetimes",
                get(|| async {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    ONE_TIME
                }),
            );
        spawn_server(app).await
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let store = JobStore::new();
        assert_eq!(store.status(Uuid::new_v4()).await, JobStatus::not_found());
    }

    #[tokio::test]
    async fn test_register_complete_lifecycle() {
        let store = JobStore::new();
        let id = store.register().await;
        let pending = store.status(id).await;
        assert!(pending.found && !pending.complete && pending.results.is_none());

        store.complete(id, vec![tee_time("7:30 AM")]).await;
        let done = store.status(id).await;
        assert!(done.found && done.complete);
        assert_eq!(done.results, Some(vec![tee_time("7:30 AM")]));
    }

    #[tokio::test]
    async fn test_complete_is_final() {
        let store = JobStore::new();
        let id = store.register().await;
        store.complete(id, vec![tee_time("7:30 AM")]).await;
        store.complete(id, vec![]).await;
        assert_eq!(store.status(id).await.results, Some(vec![tee_time("7:30 AM")]));
    }

    #[tokio::test]
    async fn test_complete_on_removed_job_does_not_resurrect_it() {
        let store = JobStore::new();
        let id = store.register().await;
        store.remove(id).await;
        store.complete(id, vec![tee_time("7:30 AM")]).await;
        assert!(!store.status(id).await.found);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_ids_are_unique_under_concurrent_registration() {
        let store = JobStore::new();
        let handles: Vec<_> = (0..64)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.register().await })
            })
            .collect();
        let mut ids = Vec::new();
        for h in handles {
            ids.push(h.await.unwrap());
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 64);
        assert_eq!(store.len().await, 64);
    }

    #[tokio::test]
    async fn test_start_job_is_pending_then_complete_with_sync_results() {
        let base = slow_foreup_server().await;
        let dispatcher = Arc::new(Dispatcher::new(
            catalog_with(&[course(1, "foreup", &base)]),
            fast_settings(),
        ));
        let runner = JobRunner::new(JobStore::new(), dispatcher.clone());

        let id = runner.start_job(1).await;
        let first = runner.status(id).await;
        assert!(first.found);
        assert!(!first.complete);
        assert!(first.results.is_none());

        let done = wait_until_settled(&runner, id).await;
        assert!(done.found && done.complete);

        let sync = dispatcher.fetch_tee_times(1).await.unwrap();
        assert_eq!(done.results, Some(sync));
    }

    #[tokio::test]
    async fn test_failed_job_is_removed() {
        let runner = JobRunner::new(
            JobStore::new(),
            Arc::new(Dispatcher::new(catalog_with(&[]), fast_settings())),
        );
        let id = runner.start_job(404).await;
        let settled = wait_until_settled(&runner, id).await;
        assert!(!settled.found);
        assert_eq!(runner.store().len().await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_jobs_do_not_interfere() {
        let base = slow_foreup_server().await;
        let dispatcher = Arc::new(Dispatcher::new(
            catalog_with(&[course(1, "foreup", &base), course(2, "foreup", &base)]),
            fast_settings(),
        ));
        let runner = JobRunner::new(JobStore::new(), dispatcher);

        let ids = [
            runner.start_job(1).await,
            runner.start_job(2).await,
            runner.start_job(3).await, // not in catalog
        ];
        let results = [
            wait_until_settled(&runner, ids[0]).await,
            wait_until_settled(&runner, ids[1]).await,
            wait_until_settled(&runner, ids[2]).await,
        ];
        assert!(results[0].complete);
        assert!(results[1].complete);
        assert!(!results[2].found);
        assert_eq!(runner.store().len().await, 2);
    }
}
