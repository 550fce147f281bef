//! Orchestrates reindex jobs across tenants: one job id covers one or more
//! `app_id`s, each app_id runs at most once at a time process-wide, and a
//! semaphore bounds how many app_ids rebuild concurrently.

use std::collections::HashMap;
use std::sync::{
    Arc,
    Mutex,
};

use chrono::Utc;
use errors::ErrorMetadata;
use serde::Serialize;
use tokio::sync::Semaphore;

use crate::engine::{
    Progress,
    ReindexOptions,
    Reindexer,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Queued,
    Running,
    Done,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobItemSnapshot {
    pub app_id: String,
    pub status: ItemStatus,
    pub total: i64,
    pub processed: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub id: String,
    pub status: JobStatus,
    pub created_timestamp: i64,
    pub started_timestamp: i64,
    pub completed_timestamp: i64,
    pub app_ids: Vec<String>,
    pub items: Vec<JobItemSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

struct JobItem {
    status: ItemStatus,
    total: i64,
    processed: i64,
    error: Option<String>,
}

struct JobState {
    id: String,
    status: JobStatus,
    created_at: i64,
    started_at: i64,
    ended_at: i64,
    app_ids: Vec<String>,
    items: HashMap<String, JobItem>,
    error: Option<String>,
}

struct Inner {
    jobs: HashMap<String, JobState>,
    running_app_ids: HashMap<String, String>,
}

pub struct Manager {
    reindexer: Arc<Reindexer>,
    semaphore: Arc<Semaphore>,
    ids: catalog_store::IdGenerator,
    state: Arc<Mutex<Inner>>,
}

impl Manager {
    pub fn new(reindexer: Reindexer, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            reindexer: Arc::new(reindexer),
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            ids: catalog_store::IdGenerator::new(),
            state: Arc::new(Mutex::new(Inner {
                jobs: HashMap::new(),
                running_app_ids: HashMap::new(),
            })),
        }
    }

    pub async fn list_app_ids(&self) -> anyhow::Result<Vec<String>> {
        self.reindexer.discover_app_ids().await
    }

    pub fn start_rebuild(&self, app_ids: Vec<String>, opts: ReindexOptions) -> anyhow::Result<JobSnapshot> {
        let normalized = normalize_app_ids(app_ids)?;
        if normalized.is_empty() {
            anyhow::bail!(ErrorMetadata::invalid_argument("AppIdsRequired", "app_ids required"));
        }

        let job_id = self.ids.next_id()?;
        let snapshot = {
            let mut state = self.state.lock().expect("reindex manager mutex poisoned");
            for app_id in &normalized {
                if let Some(existing) = state.running_app_ids.get(app_id) {
                    anyhow::bail!(ErrorMetadata::invalid_argument(
                        "ReindexAlreadyRunning",
                        format!("app_id {app_id} already running (job {existing})")
                    ));
                }
            }

            let now = now_millis();
            let mut items = HashMap::new();
            for app_id in &normalized {
                items.insert(
                    app_id.clone(),
                    JobItem {
                        status: ItemStatus::Queued,
                        total: 0,
                        processed: 0,
                        error: None,
                    },
                );
                state.running_app_ids.insert(app_id.clone(), job_id.clone());
            }

            let job = JobState {
                id: job_id.clone(),
                status: JobStatus::Running,
                created_at: now,
                started_at: now,
                ended_at: 0,
                app_ids: normalized.clone(),
                items,
                error: None,
            };
            let snapshot = snapshot_of(&job);
            state.jobs.insert(job_id.clone(), job);
            snapshot
        };

        self.spawn_job(job_id, normalized, opts);
        Ok(snapshot)
    }

    pub fn get_job(&self, id: &str) -> Option<JobSnapshot> {
        let state = self.state.lock().expect("reindex manager mutex poisoned");
        state.jobs.get(id).map(snapshot_of)
    }

    fn spawn_job(&self, job_id: String, app_ids: Vec<String>, opts: ReindexOptions) {
        let reindexer = self.reindexer.clone();
        let semaphore = self.semaphore.clone();
        let manager_state = self.clone_handles();

        tokio::spawn(async move {
            let mut tasks = Vec::with_capacity(app_ids.len());
            for app_id in app_ids {
                let reindexer = reindexer.clone();
                let semaphore = semaphore.clone();
                let state = manager_state.clone();
                let job_id = job_id.clone();
                let opts = opts.clone();
                tasks.push(tokio::spawn(async move {
                    let _permit = semaphore.acquire().await.expect("semaphore never closed");
                    state.set_item_status(&job_id, &app_id, ItemStatus::Running);

                    let state_for_progress = state.clone();
                    let job_id_for_progress = job_id.clone();
                    let app_id_for_progress = app_id.clone();
                    let result = reindexer
                        .rebuild(&app_id, opts, move |progress: Progress| {
                            state_for_progress.update_item_progress(&job_id_for_progress, &app_id_for_progress, progress);
                        })
                        .await;

                    match &result {
                        Ok(()) => state.set_item_status(&job_id, &app_id, ItemStatus::Done),
                        Err(error) => {
                            state.set_item_error(&job_id, &app_id, error.to_string());
                            state.set_item_status(&job_id, &app_id, ItemStatus::Failed);
                        }
                    }
                    state.clear_running(&app_id);
                    result.is_err()
                }));
            }

            let mut has_error = false;
            for task in tasks {
                if task.await.unwrap_or(true) {
                    has_error = true;
                }
            }

            manager_state.finish_job(&job_id, has_error);
        });
    }

    fn clone_handles(&self) -> ManagerStateHandle {
        ManagerStateHandle {
            state: self.state.clone(),
        }
    }
}

#[derive(Clone)]
struct ManagerStateHandle {
    state: Arc<Mutex<Inner>>,
}

impl ManagerStateHandle {
    fn set_item_status(&self, job_id: &str, app_id: &str, status: ItemStatus) {
        let mut state = self.state.lock().expect("reindex manager mutex poisoned");
        if let Some(item) = state.jobs.get_mut(job_id).and_then(|job| job.items.get_mut(app_id)) {
            item.status = status;
        }
    }

    fn set_item_error(&self, job_id: &str, app_id: &str, message: String) {
        let mut state = self.state.lock().expect("reindex manager mutex poisoned");
        if let Some(job) = state.jobs.get_mut(job_id) {
            if job.error.is_none() {
                job.error = Some(message.clone());
            }
            if let Some(item) = job.items.get_mut(app_id) {
                item.error = Some(message);
            }
        }
    }

    fn update_item_progress(&self, job_id: &str, app_id: &str, progress: Progress) {
        let mut state = self.state.lock().expect("reindex manager mutex poisoned");
        if let Some(item) = state.jobs.get_mut(job_id).and_then(|job| job.items.get_mut(app_id)) {
            if progress.total > 0 {
                item.total = progress.total;
            }
            item.processed = progress.processed;
        }
    }

    fn clear_running(&self, app_id: &str) {
        let mut state = self.state.lock().expect("reindex manager mutex poisoned");
        state.running_app_ids.remove(app_id);
    }

    fn finish_job(&self, job_id: &str, has_error: bool) {
        let mut state = self.state.lock().expect("reindex manager mutex poisoned");
        if let Some(job) = state.jobs.get_mut(job_id) {
            job.ended_at = now_millis();
            job.status = if has_error {
                if job.error.is_none() {
                    job.error = Some("one or more app_id failed".to_string());
                }
                JobStatus::Failed
            } else {
                JobStatus::Done
            };
        }
    }
}

fn snapshot_of(job: &JobState) -> JobSnapshot {
    let items = job
        .app_ids
        .iter()
        .filter_map(|app_id| {
            job.items.get(app_id).map(|item| JobItemSnapshot {
                app_id: app_id.clone(),
                status: item.status,
                total: item.total,
                processed: item.processed,
                error: item.error.clone(),
            })
        })
        .collect();

    JobSnapshot {
        id: job.id.clone(),
        status: job.status,
        created_timestamp: job.created_at,
        started_timestamp: job.started_at,
        completed_timestamp: job.ended_at,
        app_ids: job.app_ids.clone(),
        items,
        error: job.error.clone(),
    }
}

fn normalize_app_ids(app_ids: Vec<String>) -> anyhow::Result<Vec<String>> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(app_ids.len());
    for raw in app_ids {
        let app_id = raw.trim().to_string();
        if app_id.is_empty() {
            continue;
        }
        catalog_store::naming::validate_app_id(&app_id)?;
        if seen.insert(app_id.clone()) {
            out.push(app_id);
        }
    }
    out.sort();
    Ok(out)
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_app_ids_dedupes_trims_and_sorts() {
        let out = normalize_app_ids(vec![
            " beta ".to_string(),
            "alpha".to_string(),
            "alpha".to_string(),
            "".to_string(),
            "   ".to_string(),
        ])
        .unwrap();
        assert_eq!(out, vec!["alpha".to_string(), "beta".to_string()]);
    }

    #[test]
    fn normalize_app_ids_rejects_invalid_app_id() {
        let err = normalize_app_ids(vec!["not valid!".to_string()]).unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn start_rebuild_rejects_empty_app_ids() {
        let mut config = deadpool_postgres::Config::new();
        config.dbname = Some("catalog_test".to_string());
        let pool = config
            .create_pool(None, deadpool_postgres::tokio_postgres::NoTls)
            .expect("pool config is valid even without connecting");
        let search = catalog_search::SearchClient::new(catalog_search::SearchClientConfig {
            base_url: "http://localhost:9999".to_string(),
            user: None,
            password: None,
            page_token_secret: Vec::new(),
        })
        .expect("client config is valid");
        let manager = Manager::new(Reindexer::new(pool, Arc::new(search)), 2);
        let err = manager.start_rebuild(vec![], ReindexOptions::default()).unwrap_err();
        assert!(err.to_string().contains("app_ids"));
    }
}
