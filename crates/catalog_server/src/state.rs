use std::sync::Arc;

use catalog_reindex::Manager as ReindexManager;
use catalog_service::Service;

use crate::config::CatalogConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<CatalogConfig>,
    pub service: Arc<Service>,
    pub reindex: Arc<ReindexManager>,
}
