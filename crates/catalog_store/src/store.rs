use std::time::Duration;

use anyhow::Context;
use catalog_model::{
    Asset,
    OutboxEvent,
    OutboxEventType,
    Tag,
    View,
};
use chrono::Utc;
use deadpool_postgres::Pool;
use errors::ErrorMetadata;
use serde_json::Value;
use tokio_postgres::types::ToSql;
use tokio_postgres::Transaction;

use crate::id::IdGenerator;
use crate::list_token::ListToken;
use crate::naming::{
    table_name,
    OUTBOX_TABLE_SUFFIX,
};
use crate::patch::{
    AssetPatch,
    ViewPatch,
};

pub const DEFAULT_LIST_LIMIT: i64 = 20;
pub const MAX_LIST_LIMIT: i64 = 200;

pub struct Store {
    pool: Pool,
    ids: IdGenerator,
}

impl Store {
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            ids: IdGenerator::new(),
        }
    }

    pub async fn ping(&self) -> anyhow::Result<()> {
        let client = self.pool.get().await.context("acquiring connection")?;
        client
            .execute("SELECT 1", &[])
            .await
            .context("ping query")?;
        Ok(())
    }

    pub async fn create_asset(
        &self,
        app_id: &str,
        team_id: &str,
        mut asset: Asset,
        tag_ids: Vec<String>,
    ) -> anyhow::Result<String> {
        require_non_empty(team_id, "TeamIdRequired", "team_id required")?;
        let assets_table = table_name(app_id, "data_assets_v2")?;
        let rel_table = table_name(app_id, "data_asset_tag_relations_v2")?;

        if asset.id.is_empty() {
            asset.id = self.ids.next_id()?;
        }
        asset.team_id = team_id.to_string();
        let now = now_millis();
        if asset.created_timestamp == 0 {
            asset.created_timestamp = now;
        }
        if asset.updated_timestamp == 0 {
            asset.updated_timestamp = now;
        }
        if asset.status.is_empty() {
            asset.status = "draft".to_string();
        }
        if asset.primary_content.is_null() {
            anyhow::bail!(ErrorMetadata::invalid_argument(
                "PrimaryContentRequired",
                "primary_content required"
            ));
        }

        let mut client = self.pool.get().await.context("acquiring connection")?;
        let tx = client
            .transaction()
            .await
            .context("beginning transaction")?;

        let insert_sql = format!(
            r#"INSERT INTO {assets_table}
              (id, team_id, creator_user_id, name, asset_type, primary_content, properties, files, media, thumbnail, keywords, status, extra, created_timestamp, updated_timestamp, is_deleted)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,false)"#
        );
        tx.execute(
            &insert_sql,
            &[
                &asset.id,
                &asset.team_id,
                &asset.creator_user_id,
                &asset.name,
                &asset.asset_type,
                &asset.primary_content,
                &asset.properties,
                &asset.files,
                &asset.media,
                &asset.thumbnail,
                &asset.keywords,
                &asset.status,
                &asset.extra,
                &asset.created_timestamp,
                &asset.updated_timestamp,
            ],
        )
        .await
        .context("inserting asset")?;

        let tag_ids = normalize_tag_ids(tag_ids);
        if !tag_ids.is_empty() {
            let insert_rel_sql = format!(
                r#"INSERT INTO {rel_table} (id, team_id, asset_id, tag_id, created_timestamp, updated_timestamp, is_deleted) VALUES ($1,$2,$3,$4,$5,$6,false)"#
            );
            for tag_id in &tag_ids {
                let rel_id = self.ids.next_id()?;
                tx.execute(
                    &insert_rel_sql,
                    &[&rel_id, &team_id, &asset.id, tag_id, &now, &now],
                )
                .await
                .context("inserting asset tag relation")?;
            }
        }

        insert_outbox_event(&tx, app_id, team_id, &asset.id, OutboxEventType::AssetUpsert).await?;

        tx.commit().await.context("committing transaction")?;
        Ok(asset.id)
    }

    pub async fn update_asset(
        &self,
        app_id: &str,
        team_id: &str,
        asset_id: &str,
        patch: AssetPatch,
    ) -> anyhow::Result<()> {
        require_non_empty(asset_id, "AssetIdRequired", "asset_id required")?;
        require_non_empty(team_id, "TeamIdRequired", "team_id required")?;
        if patch.is_empty() {
            anyhow::bail!(ErrorMetadata::invalid_argument("NoUpdates", "no updates"));
        }
        let assets_table = table_name(app_id, "data_assets_v2")?;

        let mut set_parts: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn ToSql + Sync + Send>> = Vec::new();
        let mut idx = 1i32;

        macro_rules! set_col {
            ($col:expr, $value:expr) => {{
                set_parts.push(format!("\"{}\"=${}", $col, idx));
                params.push(Box::new($value));
                idx += 1;
            }};
        }

        if let Some(name) = patch.name {
            set_col!("name", name);
        }
        if let Some(asset_type) = patch.asset_type {
            set_col!("asset_type", asset_type);
        }
        if let Some(primary_content) = patch.primary_content {
            set_col!("primary_content", primary_content);
        }
        if let Some(properties) = patch.properties {
            set_col!("properties", properties);
        }
        if let Some(files) = patch.files {
            set_col!("files", files);
        }
        if let Some(media) = patch.media {
            set_col!("media", media);
        }
        if let Some(thumbnail) = patch.thumbnail {
            set_col!("thumbnail", thumbnail);
        }
        if let Some(keywords) = patch.keywords {
            set_col!("keywords", keywords);
        }
        if let Some(status) = patch.status {
            set_col!("status", status);
        }
        if let Some(extra) = patch.extra {
            set_col!("extra", extra);
        }

        let now = now_millis();
        set_parts.push(format!("\"updated_timestamp\"=${idx}"));
        params.push(Box::new(now));
        idx += 1;
        let team_id_idx = idx;
        params.push(Box::new(team_id.to_string()));
        idx += 1;
        let asset_id_idx = idx;
        params.push(Box::new(asset_id.to_string()));

        let query = format!(
            r#"UPDATE {assets_table} SET {} WHERE "team_id"=${team_id_idx} AND "id"=${asset_id_idx} AND "is_deleted"=false"#,
            set_parts.join(", ")
        );
        let params_ref: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p.as_ref() as &(dyn ToSql + Sync)).collect();

        let mut client = self.pool.get().await.context("acquiring connection")?;
        let tx = client
            .transaction()
            .await
            .context("beginning transaction")?;
        let rows_affected = tx
            .execute(&query, &params_ref)
            .await
            .context("updating asset")?;
        if rows_affected == 0 {
            anyhow::bail!(ErrorMetadata::not_found("AssetNotFound", "asset not found"));
        }

        insert_outbox_event(&tx, app_id, team_id, asset_id, OutboxEventType::AssetUpsert).await?;
        tx.commit().await.context("committing transaction")?;
        Ok(())
    }

    pub async fn delete_asset(&self, app_id: &str, team_id: &str, asset_id: &str) -> anyhow::Result<()> {
        require_non_empty(asset_id, "AssetIdRequired", "asset_id required")?;
        let assets_table = table_name(app_id, "data_assets_v2")?;

        let mut client = self.pool.get().await.context("acquiring connection")?;
        let tx = client
            .transaction()
            .await
            .context("beginning transaction")?;

        let now = now_millis();
        let rows_affected = tx
            .execute(
                &format!(
                    r#"UPDATE {assets_table} SET "is_deleted"=true, "updated_timestamp"=$1 WHERE "team_id"=$2 AND "id"=$3 AND "is_deleted"=false"#
                ),
                &[&now, &team_id, &asset_id],
            )
            .await
            .context("deleting asset")?;
        if rows_affected == 0 {
            anyhow::bail!(ErrorMetadata::not_found("AssetNotFound", "asset not found"));
        }

        insert_outbox_event(&tx, app_id, team_id, asset_id, OutboxEventType::AssetDelete).await?;
        tx.commit().await.context("committing transaction")?;
        Ok(())
    }

    pub async fn get_asset(&self, app_id: &str, team_id: &str, asset_id: &str) -> anyhow::Result<Asset> {
        require_non_empty(asset_id, "AssetIdRequired", "asset_id required")?;
        let assets_table = table_name(app_id, "data_assets_v2")?;
        let rel_table = table_name(app_id, "data_asset_tag_relations_v2")?;

        let client = self.pool.get().await.context("acquiring connection")?;
        let row = client
            .query_opt(
                &format!(
                    r#"SELECT id, team_id, creator_user_id, name, asset_type, primary_content, properties, files, media, thumbnail, keywords, status, extra, created_timestamp, updated_timestamp FROM {assets_table} WHERE team_id=$1 AND id=$2 AND is_deleted=false"#
                ),
                &[&team_id, &asset_id],
            )
            .await
            .context("fetching asset")?
            .ok_or_else(|| anyhow::anyhow!(ErrorMetadata::not_found("AssetNotFound", "asset not found")))?;

        let mut asset = Asset {
            id: row.get(0),
            team_id: row.get(1),
            creator_user_id: row.get(2),
            name: row.get(3),
            asset_type: row.get(4),
            primary_content: row.get(5),
            properties: row.get(6),
            files: row.get(7),
            media: row.get(8),
            thumbnail: row.get(9),
            keywords: row.get(10),
            status: row.get(11),
            extra: row.get(12),
            tag_ids: Vec::new(),
            created_timestamp: row.get(13),
            updated_timestamp: row.get(14),
        };

        let tag_rows = client
            .query(
                &format!(
                    r#"SELECT tag_id FROM {rel_table} WHERE team_id=$1 AND asset_id=$2 AND is_deleted=false"#
                ),
                &[&team_id, &asset_id],
            )
            .await
            .context("fetching asset tags")?;
        asset.tag_ids = tag_rows.iter().map(|row| row.get(0)).collect();

        Ok(asset)
    }

    pub async fn replace_asset_tags(
        &self,
        app_id: &str,
        team_id: &str,
        asset_id: &str,
        tag_ids: Vec<String>,
    ) -> anyhow::Result<()> {
        require_non_empty(asset_id, "AssetIdRequired", "asset_id required")?;
        let assets_table = table_name(app_id, "data_assets_v2")?;
        let rel_table = table_name(app_id, "data_asset_tag_relations_v2")?;

        let mut client = self.pool.get().await.context("acquiring connection")?;
        let tx = client
            .transaction()
            .await
            .context("beginning transaction")?;

        let now = now_millis();
        tx.execute(
            &format!(
                r#"UPDATE {rel_table} SET "is_deleted"=true, "updated_timestamp"=$1 WHERE "team_id"=$2 AND "asset_id"=$3 AND "is_deleted"=false"#
            ),
            &[&now, &team_id, &asset_id],
        )
        .await
        .context("retiring asset tag relations")?;

        let tag_ids = normalize_tag_ids(tag_ids);
        if !tag_ids.is_empty() {
            let insert_rel_sql = format!(
                r#"INSERT INTO {rel_table} (id, team_id, asset_id, tag_id, created_timestamp, updated_timestamp, is_deleted) VALUES ($1,$2,$3,$4,$5,$6,false)"#
            );
            for tag_id in &tag_ids {
                let rel_id = self.ids.next_id()?;
                tx.execute(
                    &insert_rel_sql,
                    &[&rel_id, &team_id, &asset_id, tag_id, &now, &now],
                )
                .await
                .context("inserting asset tag relation")?;
            }
        }

        tx.execute(
            &format!(
                r#"UPDATE {assets_table} SET "updated_timestamp"=$1 WHERE "team_id"=$2 AND "id"=$3 AND "is_deleted"=false"#
            ),
            &[&now, &team_id, &asset_id],
        )
        .await
        .context("touching asset updated_timestamp")?;

        insert_outbox_event(&tx, app_id, team_id, asset_id, OutboxEventType::AssetUpsert).await?;
        tx.commit().await.context("committing transaction")?;
        Ok(())
    }

    pub async fn create_tag(&self, app_id: &str, team_id: &str, mut tag: Tag) -> anyhow::Result<String> {
        require_non_empty(team_id, "TeamIdRequired", "team_id required")?;
        require_non_empty(&tag.name, "NameRequired", "name required")?;
        let tags_table = table_name(app_id, "data_tags_v2")?;

        if tag.id.is_empty() {
            tag.id = self.ids.next_id()?;
        }
        tag.team_id = team_id.to_string();
        let now = now_millis();
        if tag.created_timestamp == 0 {
            tag.created_timestamp = now;
        }
        if tag.updated_timestamp == 0 {
            tag.updated_timestamp = now;
        }
        if tag.name_norm.is_empty() {
            tag.name_norm = normalize_name(&tag.name);
        }

        let client = self.pool.get().await.context("acquiring connection")?;
        client
            .execute(
                &format!(
                    r#"INSERT INTO {tags_table}
                      (id, team_id, name, name_norm, color, extra, created_timestamp, updated_timestamp, is_deleted)
                    VALUES ($1,$2,$3,$4,$5,$6,$7,$8,false)"#
                ),
                &[
                    &tag.id,
                    &tag.team_id,
                    &tag.name,
                    &tag.name_norm,
                    &tag.color,
                    &tag.extra,
                    &tag.created_timestamp,
                    &tag.updated_timestamp,
                ],
            )
            .await
            .context("inserting tag")?;
        Ok(tag.id)
    }

    pub async fn list_tags(
        &self,
        app_id: &str,
        team_id: &str,
        keyword: &str,
        limit: i64,
        page_token: Option<&str>,
    ) -> anyhow::Result<(Vec<Tag>, Option<String>)> {
        let tags_table = table_name(app_id, "data_tags_v2")?;
        let limit = clamp_limit(limit);

        let continuation = match page_token {
            Some(token) if !token.is_empty() => Some(ListToken::decode(token)?),
            _ => None,
        };

        let mut where_parts = vec!["team_id=$1".to_string(), "is_deleted=false".to_string()];
        let mut params: Vec<Box<dyn ToSql + Sync + Send>> = vec![Box::new(team_id.to_string())];
        let mut idx = 2i32;

        if !keyword.is_empty() {
            where_parts.push(format!("(name ILIKE ${idx} OR name_norm ILIKE ${idx})"));
            params.push(Box::new(format!("%{keyword}%")));
            idx += 1;
        }
        if let Some(continuation) = &continuation {
            where_parts.push(format!(
                "(updated_timestamp < ${idx} OR (updated_timestamp = ${idx} AND id < ${}))",
                idx + 1
            ));
            params.push(Box::new(continuation.last_updated));
            params.push(Box::new(continuation.last_id.clone()));
            idx += 2;
        }
        params.push(Box::new(limit));

        let query = format!(
            r#"SELECT id, team_id, name, name_norm, color, extra, created_timestamp, updated_timestamp FROM {tags_table} WHERE {} ORDER BY updated_timestamp DESC, id DESC LIMIT ${idx}"#,
            where_parts.join(" AND ")
        );
        let params_ref: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p.as_ref() as &(dyn ToSql + Sync)).collect();

        let client = self.pool.get().await.context("acquiring connection")?;
        let rows = client
            .query(&query, &params_ref)
            .await
            .context("listing tags")?;

        let items: Vec<Tag> = rows
            .iter()
            .map(|row| Tag {
                id: row.get(0),
                team_id: row.get(1),
                name: row.get(2),
                name_norm: row.get(3),
                color: row.get(4),
                extra: row.get(5),
                created_timestamp: row.get(6),
                updated_timestamp: row.get(7),
            })
            .collect();

        let next_token = if items.len() as i64 == limit {
            items.last().map(|last| {
                ListToken {
                    last_updated: last.updated_timestamp,
                    last_id: last.id.clone(),
                }
                .encode()
            })
        } else {
            None
        };

        Ok((items, next_token))
    }

    pub async fn delete_tag(&self, app_id: &str, team_id: &str, tag_id: &str) -> anyhow::Result<()> {
        let tags_table = table_name(app_id, "data_tags_v2")?;
        let client = self.pool.get().await.context("acquiring connection")?;
        let now = now_millis();
        let rows_affected = client
            .execute(
                &format!(
                    r#"UPDATE {tags_table} SET "is_deleted"=true, "updated_timestamp"=$1 WHERE "team_id"=$2 AND "id"=$3 AND "is_deleted"=false"#
                ),
                &[&now, &team_id, &tag_id],
            )
            .await
            .context("deleting tag")?;
        if rows_affected == 0 {
            anyhow::bail!(ErrorMetadata::not_found("TagNotFound", "tag not found"));
        }
        Ok(())
    }

    pub async fn create_view(&self, app_id: &str, team_id: Option<&str>, mut view: View) -> anyhow::Result<String> {
        require_non_empty(&view.name, "NameRequired", "name required")?;
        let views_table = table_name(app_id, "data_views_v2")?;

        if view.id.is_empty() {
            view.id = self.ids.next_id()?;
        }
        let now = now_millis();
        if view.created_timestamp == 0 {
            view.created_timestamp = now;
        }
        if view.updated_timestamp == 0 {
            view.updated_timestamp = now;
        }
        view.team_id = team_id.map(|id| id.to_string());

        let client = self.pool.get().await.context("acquiring connection")?;
        client
            .execute(
                &format!(
                    r#"INSERT INTO {views_table}
                      (id, team_id, name, description, icon_url, parent_id, path, level, sort, display_config, created_timestamp, updated_timestamp, is_deleted)
                    VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,false)"#
                ),
                &[
                    &view.id,
                    &view.team_id,
                    &view.name,
                    &view.description,
                    &view.icon_url,
                    &view.parent_id,
                    &view.path,
                    &view.level,
                    &view.sort,
                    &view.display_config,
                    &view.created_timestamp,
                    &view.updated_timestamp,
                ],
            )
            .await
            .context("inserting view")?;
        Ok(view.id)
    }

    pub async fn update_view(
        &self,
        app_id: &str,
        team_id: &str,
        view_id: &str,
        patch: ViewPatch,
    ) -> anyhow::Result<()> {
        require_non_empty(view_id, "ViewIdRequired", "view_id required")?;
        if patch.is_empty() {
            anyhow::bail!(ErrorMetadata::invalid_argument("NoUpdates", "no updates"));
        }
        let views_table = table_name(app_id, "data_views_v2")?;

        let mut set_parts: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn ToSql + Sync + Send>> = Vec::new();
        let mut idx = 1i32;

        macro_rules! set_col {
            ($col:expr, $value:expr) => {{
                set_parts.push(format!("\"{}\"=${}", $col, idx));
                params.push(Box::new($value));
                idx += 1;
            }};
        }

        if let Some(name) = patch.name {
            set_col!("name", name);
        }
        if let Some(description) = patch.description {
            set_col!("description", description);
        }
        if let Some(icon_url) = patch.icon_url {
            set_col!("icon_url", icon_url);
        }
        if let Some(sort) = patch.sort {
            set_col!("sort", sort);
        }
        if let Some(display_config) = patch.display_config {
            set_col!("display_config", display_config);
        }

        let now = now_millis();
        set_parts.push(format!("\"updated_timestamp\"=${idx}"));
        params.push(Box::new(now));
        idx += 1;
        let team_id_idx = idx;
        params.push(Box::new(team_id.to_string()));
        idx += 1;
        let view_id_idx = idx;
        params.push(Box::new(view_id.to_string()));

        let query = format!(
            r#"UPDATE {views_table} SET {} WHERE ("team_id"=${team_id_idx} OR "team_id" IS NULL) AND "id"=${view_id_idx} AND "is_deleted"=false"#,
            set_parts.join(", ")
        );
        let params_ref: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p.as_ref() as &(dyn ToSql + Sync)).collect();

        let client = self.pool.get().await.context("acquiring connection")?;
        let rows_affected = client
            .execute(&query, &params_ref)
            .await
            .context("updating view")?;
        if rows_affected == 0 {
            anyhow::bail!(ErrorMetadata::not_found("ViewNotFound", "view not found"));
        }
        Ok(())
    }

    pub async fn delete_view(&self, app_id: &str, team_id: &str, view_id: &str) -> anyhow::Result<()> {
        let views_table = table_name(app_id, "data_views_v2")?;
        let client = self.pool.get().await.context("acquiring connection")?;
        let now = now_millis();
        let rows_affected = client
            .execute(
                &format!(
                    r#"UPDATE {views_table} SET "is_deleted"=true, "updated_timestamp"=$1 WHERE ("team_id"=$2 OR "team_id" IS NULL) AND "id"=$3 AND "is_deleted"=false"#
                ),
                &[&now, &team_id, &view_id],
            )
            .await
            .context("deleting view")?;
        if rows_affected == 0 {
            anyhow::bail!(ErrorMetadata::not_found("ViewNotFound", "view not found"));
        }
        Ok(())
    }

    pub async fn get_view_tree(&self, app_id: &str, team_id: &str) -> anyhow::Result<Vec<View>> {
        let views_table = table_name(app_id, "data_views_v2")?;
        let client = self.pool.get().await.context("acquiring connection")?;
        let rows = client
            .query(
                &format!(
                    r#"SELECT id, team_id, name, description, icon_url, parent_id, path, level, sort, display_config, created_timestamp, updated_timestamp FROM {views_table} WHERE (team_id=$1 OR team_id IS NULL) AND is_deleted=false ORDER BY path ASC, sort ASC"#
                ),
                &[&team_id],
            )
            .await
            .context("listing view tree")?;

        Ok(rows
            .iter()
            .map(|row| View {
                id: row.get(0),
                team_id: row.get(1),
                name: row.get(2),
                description: row.get(3),
                icon_url: row.get(4),
                parent_id: row.get(5),
                path: row.get(6),
                level: row.get(7),
                sort: row.get(8),
                display_config: row.get(9),
                created_timestamp: row.get(10),
                updated_timestamp: row.get(11),
            })
            .collect())
    }

    pub async fn replace_view_tags(
        &self,
        app_id: &str,
        team_id: &str,
        view_id: &str,
        tag_ids: Vec<String>,
    ) -> anyhow::Result<()> {
        require_non_empty(view_id, "ViewIdRequired", "view_id required")?;
        let rel_table = table_name(app_id, "data_view_tag_relations_v2")?;

        let mut client = self.pool.get().await.context("acquiring connection")?;
        let tx = client
            .transaction()
            .await
            .context("beginning transaction")?;

        let now = now_millis();
        tx.execute(
            &format!(
                r#"UPDATE {rel_table} SET "is_deleted"=true, "updated_timestamp"=$1 WHERE "team_id"=$2 AND "view_id"=$3 AND "is_deleted"=false"#
            ),
            &[&now, &team_id, &view_id],
        )
        .await
        .context("retiring view tag relations")?;

        let tag_ids = normalize_tag_ids(tag_ids);
        if !tag_ids.is_empty() {
            let insert_rel_sql = format!(
                r#"INSERT INTO {rel_table} (id, team_id, view_id, tag_id, created_timestamp, updated_timestamp, is_deleted) VALUES ($1,$2,$3,$4,$5,$6,false)"#
            );
            for tag_id in &tag_ids {
                let rel_id = self.ids.next_id()?;
                tx.execute(
                    &insert_rel_sql,
                    &[&rel_id, &team_id, &view_id, tag_id, &now, &now],
                )
                .await
                .context("inserting view tag relation")?;
            }
        }

        tx.commit().await.context("committing transaction")?;
        Ok(())
    }

    pub async fn get_view_tag_groups(
        &self,
        app_id: &str,
        team_id: &str,
        view_id: &str,
    ) -> anyhow::Result<Vec<Vec<String>>> {
        if view_id.is_empty() {
            return Ok(Vec::new());
        }
        let views_table = table_name(app_id, "data_views_v2")?;
        let rel_table = table_name(app_id, "data_view_tag_relations_v2")?;

        let client = self.pool.get().await.context("acquiring connection")?;
        let view_path: Option<String> = client
            .query_opt(
                &format!(
                    r#"SELECT path FROM {views_table} WHERE id=$1 AND (team_id=$2 OR team_id IS NULL) AND is_deleted=false"#
                ),
                &[&view_id, &team_id],
            )
            .await
            .context("looking up view path")?
            .map(|row| row.get(0));

        let Some(view_path) = view_path else {
            return Ok(Vec::new());
        };

        let subtree_rows = client
            .query(
                &format!(
                    r#"SELECT id FROM {views_table} WHERE (team_id=$1 OR team_id IS NULL) AND is_deleted=false AND path LIKE $2"#
                ),
                &[&team_id, &format!("{view_path}%")],
            )
            .await
            .context("listing subtree views")?;
        let view_ids: Vec<String> = subtree_rows.iter().map(|row| row.get(0)).collect();
        if view_ids.is_empty() {
            return Ok(Vec::new());
        }

        let tag_rows = client
            .query(
                &format!(
                    r#"SELECT view_id, array_agg(tag_id) FROM {rel_table} WHERE team_id=$1 AND view_id = ANY($2) AND is_deleted=false GROUP BY view_id"#
                ),
                &[&team_id, &view_ids],
            )
            .await
            .context("grouping view tag relations")?;

        Ok(tag_rows
            .iter()
            .filter_map(|row| {
                let tags: Vec<String> = row.get(1);
                if tags.is_empty() {
                    None
                } else {
                    Some(tags)
                }
            })
            .collect())
    }

    pub async fn get_view_tags(&self, app_id: &str, team_id: &str, view_id: &str) -> anyhow::Result<Vec<String>> {
        if view_id.is_empty() {
            return Ok(Vec::new());
        }
        let rel_table = table_name(app_id, "data_view_tag_relations_v2")?;
        let client = self.pool.get().await.context("acquiring connection")?;
        let rows = client
            .query(
                &format!(r#"SELECT tag_id FROM {rel_table} WHERE team_id=$1 AND view_id=$2 AND is_deleted=false"#),
                &[&team_id, &view_id],
            )
            .await
            .context("fetching view tags")?;
        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    pub async fn list_app_ids(&self) -> anyhow::Result<Vec<String>> {
        let client = self.pool.get().await.context("acquiring connection")?;
        let rows = client
            .query(
                r#"SELECT tablename FROM pg_catalog.pg_tables
                  WHERE schemaname NOT IN ('pg_catalog', 'information_schema')
                    AND right(tablename, char_length($1)) = $1"#,
                &[&OUTBOX_TABLE_SUFFIX],
            )
            .await
            .context("listing app ids")?;

        let mut app_ids: Vec<String> = rows
            .iter()
            .filter_map(|row| {
                let table: String = row.get(0);
                crate::naming::app_id_from_outbox_table(&table)
            })
            .collect();
        app_ids.sort();
        app_ids.dedup();
        Ok(app_ids)
    }

    pub async fn lock_outbox_batch(
        &self,
        app_id: &str,
        worker_id: &str,
        limit: i64,
        lock_timeout: Duration,
    ) -> anyhow::Result<Vec<OutboxEvent>> {
        let outbox_table = table_name(app_id, "data_outbox_events_v2")?;
        let limit = if limit <= 0 { 100 } else { limit };
        let lock_before = now_millis() - lock_timeout.as_millis() as i64;

        let mut client = self.pool.get().await.context("acquiring connection")?;
        let tx = client
            .transaction()
            .await
            .context("beginning transaction")?;

        let rows = tx
            .query(
                &format!(
                    r#"SELECT event_id, team_id, aggregate_id, event_type
                      FROM {outbox_table}
                      WHERE processed_timestamp IS NULL
                        AND (locked_at IS NULL OR locked_at < $1)
                      ORDER BY event_id ASC
                      LIMIT $2
                      FOR UPDATE SKIP LOCKED"#
                ),
                &[&lock_before, &limit],
            )
            .await
            .context("locking outbox batch")?;

        let events: Vec<OutboxEvent> = rows
            .iter()
            .map(|row| OutboxEvent {
                event_id: row.get(0),
                team_id: row.get(1),
                aggregate_id: row.get(2),
                event_type: row.get(3),
            })
            .collect();

        if !events.is_empty() {
            let ids: Vec<i64> = events.iter().map(|event| event.event_id).collect();
            let now = now_millis();
            tx.execute(
                &format!(r#"UPDATE {outbox_table} SET locked_at=$1, locked_by=$2 WHERE event_id = ANY($3)"#),
                &[&now, &worker_id, &ids],
            )
            .await
            .context("leasing outbox batch")?;
        }

        tx.commit().await.context("committing transaction")?;
        Ok(events)
    }

    pub async fn mark_outbox_processed(&self, app_id: &str, event_ids: &[i64]) -> anyhow::Result<()> {
        if event_ids.is_empty() {
            return Ok(());
        }
        let outbox_table = table_name(app_id, "data_outbox_events_v2")?;
        let client = self.pool.get().await.context("acquiring connection")?;
        let now = now_millis();
        client
            .execute(
                &format!(
                    r#"UPDATE {outbox_table} SET processed_timestamp=$1, locked_at=NULL, locked_by=NULL WHERE event_id = ANY($2)"#
                ),
                &[&now, &event_ids],
            )
            .await
            .context("marking outbox events processed")?;
        Ok(())
    }

    pub async fn mark_outbox_failed(&self, app_id: &str, worker_id: &str, event_ids: &[i64]) -> anyhow::Result<()> {
        if event_ids.is_empty() {
            return Ok(());
        }
        let outbox_table = table_name(app_id, "data_outbox_events_v2")?;
        let client = self.pool.get().await.context("acquiring connection")?;
        let now = now_millis();
        client
            .execute(
                &format!(
                    r#"UPDATE {outbox_table} SET retry_count=retry_count+1, locked_at=$1, locked_by=$2 WHERE event_id = ANY($3)"#
                ),
                &[&now, &worker_id, &event_ids],
            )
            .await
            .context("marking outbox events failed")?;
        Ok(())
    }
}

async fn insert_outbox_event(
    tx: &Transaction<'_>,
    app_id: &str,
    team_id: &str,
    asset_id: &str,
    event_type: OutboxEventType,
) -> anyhow::Result<()> {
    let outbox_table = table_name(app_id, "data_outbox_events_v2")?;
    let payload: Value = serde_json::json!({ "asset_id": asset_id });
    let now = now_millis();
    tx.execute(
        &format!(
            r#"INSERT INTO {outbox_table} (team_id, aggregate_id, event_type, payload, created_timestamp, retry_count) VALUES ($1,$2,$3,$4,$5,0)"#
        ),
        &[&team_id, &asset_id, &event_type.as_str(), &payload, &now],
    )
    .await
    .context("inserting outbox event")?;
    Ok(())
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn normalize_tag_ids(tag_ids: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(tag_ids.len());
    for tag_id in tag_ids {
        let tag_id = tag_id.trim().to_string();
        if tag_id.is_empty() || !seen.insert(tag_id.clone()) {
            continue;
        }
        out.push(tag_id);
    }
    out
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

fn clamp_limit(limit: i64) -> i64 {
    if limit <= 0 {
        DEFAULT_LIST_LIMIT
    } else if limit > MAX_LIST_LIMIT {
        MAX_LIST_LIMIT
    } else {
        limit
    }
}

fn require_non_empty(value: &str, short_msg: &'static str, msg: &'static str) -> anyhow::Result<()> {
    if value.is_empty() {
        anyhow::bail!(ErrorMetadata::invalid_argument(short_msg, msg));
    }
    Ok(())
}
