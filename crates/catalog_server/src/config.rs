use std::fmt;

use clap::Parser;

#[derive(Parser, Clone)]
#[clap(author, version)]
pub struct CatalogConfig {
    /// Address the HTTP server binds to.
    #[clap(long, env = "CATALOG_HTTP_ADDR", default_value = "0.0.0.0:8081")]
    pub http_addr: String,

    /// Shared secret checked against the `X-Internal-Token` header. Empty disables the check.
    #[clap(long, env = "CATALOG_INTERNAL_TOKEN", default_value = "")]
    pub internal_token: String,

    #[clap(long, env = "CATALOG_APP_ID_HEADER", default_value = "X-App-Id")]
    pub app_id_header: String,

    #[clap(long, env = "CATALOG_TEAM_ID_HEADER", default_value = "X-Team-Id")]
    pub team_id_header: String,

    /// Postgres connection string.
    #[clap(long, env = "CATALOG_PG_DSN")]
    pub pg_dsn: String,

    #[clap(long, env = "CATALOG_SEARCH_URL")]
    pub search_url: String,

    #[clap(long, env = "CATALOG_SEARCH_USER")]
    pub search_user: Option<String>,

    #[clap(long, env = "CATALOG_SEARCH_PASSWORD")]
    pub search_password: Option<String>,

    /// Signs page tokens when set; unsigned tokens are used otherwise.
    #[clap(long, env = "CATALOG_PAGE_TOKEN_SECRET", default_value = "")]
    pub page_token_secret: String,

    /// Comma-separated app_ids that get a dedicated indexer worker at startup.
    #[clap(long, env = "CATALOG_WORKER_APP_IDS", default_value = "", value_delimiter = ',')]
    pub worker_app_ids: Vec<String>,

    #[clap(long, env = "CATALOG_WORKER_ID", default_value = "worker-1")]
    pub worker_id: String,

    #[clap(long, env = "CATALOG_WORKER_BATCH_SIZE", default_value_t = 100)]
    pub worker_batch_size: i64,

    #[clap(long, env = "CATALOG_WORKER_POLL_MS", default_value_t = 1000)]
    pub worker_poll_ms: u64,

    #[clap(long, env = "CATALOG_WORKER_LOCK_MS", default_value_t = 60_000)]
    pub worker_lock_ms: u64,

    #[clap(long, env = "CATALOG_REINDEX_MAX_CONCURRENCY", default_value_t = 2)]
    pub reindex_max_concurrency: usize,
}

impl fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("http_addr", &self.http_addr)
            .field("app_id_header", &self.app_id_header)
            .field("team_id_header", &self.team_id_header)
            .field("search_url", &self.search_url)
            .field("worker_app_ids", &self.worker_app_ids)
            .field("worker_id", &self.worker_id)
            .field("worker_batch_size", &self.worker_batch_size)
            .field("worker_poll_ms", &self.worker_poll_ms)
            .field("worker_lock_ms", &self.worker_lock_ms)
            .field("reindex_max_concurrency", &self.reindex_max_concurrency)
            .finish()
    }
}
