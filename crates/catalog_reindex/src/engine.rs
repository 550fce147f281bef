//! Full index rebuild: optional index delete/create, then a keyset-paginated
//! scan of every asset with its tag relations, bulk-applied to the search
//! backend a page at a time.

use std::sync::Arc;

use anyhow::Context;
use catalog_search::{
    index_name_for,
    BulkAction,
    SearchClient,
};
use catalog_store::naming::table_name;
use deadpool_postgres::Pool;
use errors::ErrorMetadata;
use serde_json::json;

const DEFAULT_BATCH_SIZE: i64 = 500;
const MAX_BATCH_SIZE: i64 = 2000;

#[derive(Debug, Clone, Default)]
pub struct ReindexOptions {
    pub batch_size: i64,
    pub delete_index: bool,
    pub create_index: bool,
    pub refresh: bool,
}

impl ReindexOptions {
    fn normalized(mut self) -> Self {
        if self.batch_size <= 0 {
            self.batch_size = DEFAULT_BATCH_SIZE;
        }
        if self.batch_size > MAX_BATCH_SIZE {
            self.batch_size = MAX_BATCH_SIZE;
        }
        self
    }
}

#[derive(Debug, Clone)]
pub struct Progress {
    pub app_id: String,
    pub total: i64,
    pub processed: i64,
    pub done: bool,
}

struct AssetRow {
    id: String,
    team_id: String,
    name: String,
    asset_type: String,
    status: String,
    created_timestamp: i64,
    updated_timestamp: i64,
}

pub struct Reindexer {
    pool: Pool,
    search: Arc<SearchClient>,
}

impl Reindexer {
    pub fn new(pool: Pool, search: Arc<SearchClient>) -> Self {
        Self { pool, search }
    }

    pub async fn discover_app_ids(&self) -> anyhow::Result<Vec<String>> {
        catalog_store::Store::new(self.pool.clone()).list_app_ids().await
    }

    pub async fn rebuild(
        &self,
        app_id: &str,
        opts: ReindexOptions,
        mut progress: impl FnMut(Progress),
    ) -> anyhow::Result<()> {
        catalog_store::naming::validate_app_id(app_id)?;
        let opts = opts.normalized();
        let index = index_name_for(app_id);

        if opts.delete_index {
            self.search.delete_index(&index).await?;
        }
        if opts.create_index {
            self.search.create_index(&index).await?;
        }

        let total = self.count_assets(app_id).await?;
        progress(Progress {
            app_id: app_id.to_string(),
            total,
            processed: 0,
            done: false,
        });

        let mut last_updated = 0i64;
        let mut last_id = String::new();
        let mut processed = 0i64;

        loop {
            let assets = self
                .load_assets(app_id, last_updated, &last_id, opts.batch_size)
                .await?;
            if assets.is_empty() {
                break;
            }

            let tag_map = self.load_tags(app_id, &assets).await?;
            let actions: Vec<BulkAction> = assets
                .iter()
                .map(|asset| BulkAction::Index {
                    id: asset.id.clone(),
                    doc: json!({
                        "asset_id": asset.id,
                        "team_id": asset.team_id,
                        "name": asset.name,
                        "tag_ids": tag_map.get(&asset.id).cloned().unwrap_or_default(),
                        "asset_type": asset.asset_type,
                        "status": asset.status,
                        "created_timestamp": asset.created_timestamp,
                        "updated_timestamp": asset.updated_timestamp,
                    }),
                })
                .collect();

            let failed = self.search.bulk_apply(&index, &actions).await?;
            if !failed.is_empty() {
                anyhow::bail!(ErrorMetadata::transient(
                    "ReindexBulkFailed",
                    format!("bulk failed items: {}", failed.len())
                ));
            }

            let last = assets.last().expect("checked non-empty above");
            last_updated = last.updated_timestamp;
            last_id = last.id.clone();
            processed += assets.len() as i64;
            progress(Progress {
                app_id: app_id.to_string(),
                total,
                processed,
                done: false,
            });
        }

        if opts.refresh {
            self.search.refresh_index(&index).await?;
        }
        progress(Progress {
            app_id: app_id.to_string(),
            total,
            processed,
            done: true,
        });
        Ok(())
    }

    async fn count_assets(&self, app_id: &str) -> anyhow::Result<i64> {
        let table = table_name(app_id, "data_assets_v2")?;
        let client = self.pool.get().await.context("acquiring connection")?;
        let row = client
            .query_one(&format!(r#"SELECT COUNT(1) FROM {table} WHERE is_deleted=false"#), &[])
            .await
            .context("counting assets")?;
        Ok(row.get(0))
    }

    async fn load_assets(
        &self,
        app_id: &str,
        last_updated: i64,
        last_id: &str,
        limit: i64,
    ) -> anyhow::Result<Vec<AssetRow>> {
        let table = table_name(app_id, "data_assets_v2")?;
        let client = self.pool.get().await.context("acquiring connection")?;

        let rows = if last_updated > 0 && !last_id.is_empty() {
            client
                .query(
                    &format!(
                        r#"SELECT id, team_id, name, asset_type, status, created_timestamp, updated_timestamp FROM {table}
                          WHERE is_deleted=false AND (updated_timestamp < $1 OR (updated_timestamp = $1 AND id < $2))
                          ORDER BY updated_timestamp DESC, id DESC LIMIT $3"#
                    ),
                    &[&last_updated, &last_id, &limit],
                )
                .await
        } else {
            client
                .query(
                    &format!(
                        r#"SELECT id, team_id, name, asset_type, status, created_timestamp, updated_timestamp FROM {table}
                          WHERE is_deleted=false ORDER BY updated_timestamp DESC, id DESC LIMIT $1"#
                    ),
                    &[&limit],
                )
                .await
        }
        .context("loading assets page")?;

        Ok(rows
            .iter()
            .map(|row| AssetRow {
                id: row.get(0),
                team_id: row.get(1),
                name: row.get(2),
                asset_type: row.get(3),
                status: row.get(4),
                created_timestamp: row.get(5),
                updated_timestamp: row.get(6),
            })
            .collect())
    }

    async fn load_tags(
        &self,
        app_id: &str,
        assets: &[AssetRow],
    ) -> anyhow::Result<std::collections::HashMap<String, Vec<String>>> {
        if assets.is_empty() {
            return Ok(std::collections::HashMap::new());
        }
        let rel_table = table_name(app_id, "data_asset_tag_relations_v2")?;
        let ids: Vec<String> = assets.iter().map(|asset| asset.id.clone()).collect();

        let client = self.pool.get().await.context("acquiring connection")?;
        let rows = client
            .query(
                &format!(
                    r#"SELECT asset_id, array_agg(tag_id) FROM {rel_table} WHERE is_deleted=false AND asset_id = ANY($1) GROUP BY asset_id"#
                ),
                &[&ids],
            )
            .await
            .context("loading asset tag relations")?;

        Ok(rows
            .iter()
            .map(|row| (row.get::<_, String>(0), row.get::<_, Vec<String>>(1)))
            .collect())
    }
}
