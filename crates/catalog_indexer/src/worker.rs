//! Per-tenant outbox worker: leases a batch, classifies each event, applies
//! it to the search index in one bulk call, then acks or fails the batch.

use std::sync::Arc;
use std::time::Duration;

use catalog_model::{
    OutboxEvent,
    OutboxEventType,
};
use catalog_search::{
    index_name_for,
    BulkAction,
    SearchClient,
};
use catalog_store::Store;
use errors::ErrorMetadataAnyhowExt;
use tokio::sync::watch;

use crate::doc::map_asset_doc;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub app_id: String,
    pub worker_id: String,
    pub batch_size: i64,
    pub lock_timeout: Duration,
    pub poll_interval: Duration,
}

impl WorkerConfig {
    pub fn normalized(mut self) -> Self {
        if self.batch_size <= 0 {
            self.batch_size = 100;
        }
        if self.lock_timeout.is_zero() {
            self.lock_timeout = Duration::from_secs(60);
        }
        if self.poll_interval.is_zero() {
            self.poll_interval = Duration::from_secs(1);
        }
        self
    }
}

pub struct Worker {
    store: Arc<Store>,
    search: Arc<SearchClient>,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(store: Arc<Store>, search: Arc<SearchClient>, config: WorkerConfig) -> Self {
        Self {
            store,
            search,
            config: config.normalized(),
        }
    }

    /// Runs the lease/apply/ack loop until `shutdown` is signalled. Always
    /// finishes whatever batch it's currently processing before returning;
    /// it never starts a new lease once shutdown is observed.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                return;
            }

            let events = match self
                .store
                .lock_outbox_batch(
                    &self.config.app_id,
                    &self.config.worker_id,
                    self.config.batch_size,
                    self.config.lock_timeout,
                )
                .await
            {
                Ok(events) => events,
                Err(error) => {
                    tracing::warn!(app_id = %self.config.app_id, %error, "failed to lock outbox batch");
                    self.sleep_or_shutdown(&mut shutdown).await;
                    continue;
                }
            };

            if events.is_empty() {
                self.sleep_or_shutdown(&mut shutdown).await;
                continue;
            }

            let (success, failed) = self.process_batch(events).await;
            if !success.is_empty() {
                if let Err(error) = self.store.mark_outbox_processed(&self.config.app_id, &success).await {
                    tracing::warn!(app_id = %self.config.app_id, %error, "failed to mark outbox events processed");
                }
            }
            if !failed.is_empty() {
                if let Err(error) = self
                    .store
                    .mark_outbox_failed(&self.config.app_id, &self.config.worker_id, &failed)
                    .await
                {
                    tracing::warn!(app_id = %self.config.app_id, %error, "failed to mark outbox events failed");
                }
            }
        }
    }

    async fn sleep_or_shutdown(&self, shutdown: &mut watch::Receiver<bool>) {
        tokio::select! {
            _ = tokio::time::sleep(self.config.poll_interval) => {}
            _ = shutdown.changed() => {}
        }
    }

    async fn process_batch(&self, events: Vec<OutboxEvent>) -> (Vec<i64>, Vec<i64>) {
        let mut actions = Vec::with_capacity(events.len());
        let mut pre_failed = Vec::new();

        for event in &events {
            match OutboxEventType::parse(&event.event_type) {
                Some(OutboxEventType::AssetUpsert) => {
                    match self
                        .store
                        .get_asset(&self.config.app_id, &event.team_id, &event.aggregate_id)
                        .await
                    {
                        Ok(asset) => actions.push((event.event_id, BulkAction::Index {
                            id: event.aggregate_id.clone(),
                            doc: map_asset_doc(&asset),
                        })),
                        Err(error) if error.is_not_found() => actions.push((event.event_id, BulkAction::Delete {
                            id: event.aggregate_id.clone(),
                        })),
                        Err(error) => {
                            tracing::warn!(event_id = event.event_id, %error, "failed to load asset for indexing");
                            pre_failed.push(event.event_id);
                        }
                    }
                }
                Some(OutboxEventType::AssetDelete) => actions.push((event.event_id, BulkAction::Delete {
                    id: event.aggregate_id.clone(),
                })),
                None => {
                    tracing::warn!(event_id = event.event_id, event_type = %event.event_type, "unknown outbox event type");
                    pre_failed.push(event.event_id);
                }
            }
        }

        if actions.is_empty() {
            return (Vec::new(), pre_failed);
        }

        let index = index_name_for(&self.config.app_id);
        let event_ids: Vec<i64> = actions.iter().map(|(id, _)| *id).collect();
        let bulk_actions: Vec<BulkAction> = actions.into_iter().map(|(_, action)| action).collect();

        let failed_indices = match self.search.bulk_apply(&index, &bulk_actions).await {
            Ok(failed) => failed,
            Err(error) => {
                tracing::warn!(app_id = %self.config.app_id, %error, "bulk apply failed");
                let mut all_failed = pre_failed;
                all_failed.extend(event_ids);
                return (Vec::new(), all_failed);
            }
        };

        let failed_set: std::collections::HashSet<usize> = failed_indices.into_iter().collect();
        let mut success = Vec::with_capacity(event_ids.len());
        let mut failed = pre_failed;
        for (idx, event_id) in event_ids.into_iter().enumerate() {
            if failed_set.contains(&idx) {
                failed.push(event_id);
            } else {
                success.push(event_id);
            }
        }
        (success, failed)
    }
}
