//! Thin facade wiring the store and the search client together for the HTTP
//! layer: validates `team_id` up front, resolves a view into its tag groups
//! before handing off to search, and aggregates readiness checks.

use std::sync::Arc;

use catalog_model::{
    Asset,
    Tag,
    View,
};
use catalog_search::{
    SearchClient,
    SearchResult,
};
use catalog_store::{
    AssetPatch,
    Store,
    ViewPatch,
};
use errors::ErrorMetadata;

pub struct Service {
    store: Arc<Store>,
    search: Arc<SearchClient>,
}

fn require_team_id(team_id: &str) -> anyhow::Result<()> {
    if team_id.is_empty() {
        anyhow::bail!(ErrorMetadata::invalid_argument("TeamIdRequired", "team_id required"));
    }
    Ok(())
}

impl Service {
    pub fn new(store: Arc<Store>, search: Arc<SearchClient>) -> Self {
        Self { store, search }
    }

    pub async fn ready(&self) -> anyhow::Result<()> {
        let mut issues = Vec::new();
        if let Err(error) = self.store.ping().await {
            issues.push(format!("postgres not ready: {error}"));
        }
        if let Err(error) = self.search.ping().await {
            issues.push(format!("elasticsearch not ready: {error}"));
        }
        if issues.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(ErrorMetadata::transient("NotReady", issues.join("; ")))
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn search_assets(
        &self,
        app_id: &str,
        team_id: &str,
        view_id: &str,
        user_tags: &[String],
        name: &str,
        limit: i64,
        page_token: Option<&str>,
    ) -> anyhow::Result<SearchResult> {
        require_team_id(team_id)?;
        let view_tag_groups = if view_id.is_empty() {
            Vec::new()
        } else {
            self.store.get_view_tag_groups(app_id, team_id, view_id).await?
        };
        self.search
            .search_asset_ids(app_id, team_id, &view_tag_groups, user_tags, name, limit, page_token)
            .await
    }

    pub async fn create_asset(
        &self,
        app_id: &str,
        team_id: &str,
        asset: Asset,
        tag_ids: Vec<String>,
    ) -> anyhow::Result<String> {
        require_team_id(team_id)?;
        self.store.create_asset(app_id, team_id, asset, tag_ids).await
    }

    pub async fn update_asset(&self, app_id: &str, team_id: &str, asset_id: &str, patch: AssetPatch) -> anyhow::Result<()> {
        require_team_id(team_id)?;
        self.store.update_asset(app_id, team_id, asset_id, patch).await
    }

    pub async fn delete_asset(&self, app_id: &str, team_id: &str, asset_id: &str) -> anyhow::Result<()> {
        require_team_id(team_id)?;
        self.store.delete_asset(app_id, team_id, asset_id).await
    }

    pub async fn get_asset(&self, app_id: &str, team_id: &str, asset_id: &str) -> anyhow::Result<Asset> {
        require_team_id(team_id)?;
        self.store.get_asset(app_id, team_id, asset_id).await
    }

    pub async fn replace_asset_tags(
        &self,
        app_id: &str,
        team_id: &str,
        asset_id: &str,
        tag_ids: Vec<String>,
    ) -> anyhow::Result<()> {
        require_team_id(team_id)?;
        self.store.replace_asset_tags(app_id, team_id, asset_id, tag_ids).await
    }

    pub async fn create_tag(&self, app_id: &str, team_id: &str, tag: Tag) -> anyhow::Result<String> {
        require_team_id(team_id)?;
        self.store.create_tag(app_id, team_id, tag).await
    }

    pub async fn list_tags(
        &self,
        app_id: &str,
        team_id: &str,
        keyword: &str,
        limit: i64,
        page_token: Option<&str>,
    ) -> anyhow::Result<(Vec<Tag>, Option<String>)> {
        require_team_id(team_id)?;
        self.store.list_tags(app_id, team_id, keyword, limit, page_token).await
    }

    pub async fn delete_tag(&self, app_id: &str, team_id: &str, tag_id: &str) -> anyhow::Result<()> {
        require_team_id(team_id)?;
        self.store.delete_tag(app_id, team_id, tag_id).await
    }

    pub async fn create_view(&self, app_id: &str, team_id: Option<&str>, view: View) -> anyhow::Result<String> {
        self.store.create_view(app_id, team_id, view).await
    }

    pub async fn update_view(&self, app_id: &str, team_id: &str, view_id: &str, patch: ViewPatch) -> anyhow::Result<()> {
        self.store.update_view(app_id, team_id, view_id, patch).await
    }

    pub async fn delete_view(&self, app_id: &str, team_id: &str, view_id: &str) -> anyhow::Result<()> {
        self.store.delete_view(app_id, team_id, view_id).await
    }

    pub async fn get_view_tree(&self, app_id: &str, team_id: &str) -> anyhow::Result<Vec<View>> {
        self.store.get_view_tree(app_id, team_id).await
    }

    pub async fn get_view_tags(&self, app_id: &str, team_id: &str, view_id: &str) -> anyhow::Result<Vec<String>> {
        require_team_id(team_id)?;
        self.store.get_view_tags(app_id, team_id, view_id).await
    }

    pub async fn replace_view_tags(&self, app_id: &str, team_id: &str, view_id: &str, tag_ids: Vec<String>) -> anyhow::Result<()> {
        self.store.replace_view_tags(app_id, team_id, view_id, tag_ids).await
    }
}

#[cfg(test)]
mod tests {
    use catalog_search::SearchClientConfig;

    use super::*;

    fn unconfigured_service() -> Service {
        let mut config = deadpool_postgres::Config::new();
        config.dbname = Some("catalog_test".to_string());
        let pool = config
            .create_pool(None, deadpool_postgres::tokio_postgres::NoTls)
            .expect("pool config is valid even without connecting");
        let search = SearchClient::new(SearchClientConfig {
            base_url: "http://localhost:9999".to_string(),
            user: None,
            password: None,
            page_token_secret: Vec::new(),
        })
        .expect("client config is valid");
        Service::new(Arc::new(Store::new(pool)), Arc::new(search))
    }

    #[tokio::test]
    async fn search_assets_requires_team_id() {
        let service = unconfigured_service();
        let error = service
            .search_assets("app", "", "", &[], "", 20, None)
            .await
            .unwrap_err();
        assert!(error.to_string().contains("team_id"));
    }

    #[tokio::test]
    async fn get_asset_requires_team_id() {
        let service = unconfigured_service();
        let error = service.get_asset("app", "", "asset-1").await.unwrap_err();
        assert!(error.to_string().contains("team_id"));
    }
}
