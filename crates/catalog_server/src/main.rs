use std::sync::Arc;
use std::time::Duration;

use catalog_reindex::{
    Manager as ReindexManager,
    Reindexer,
};
use catalog_search::{
    SearchClient,
    SearchClientConfig,
};
use catalog_server::config::CatalogConfig;
use catalog_server::state::AppState;
use catalog_service::Service;
use catalog_store::Store;
use clap::Parser;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guard = cmd_util::env::config_service();
    let config = CatalogConfig::parse();
    tracing::info!(?config, "starting catalog_server");

    let mut pg_config = deadpool_postgres::Config::new();
    pg_config.url = Some(config.pg_dsn.clone());
    let pool = pg_config.create_pool(
        Some(deadpool_postgres::Runtime::Tokio1),
        deadpool_postgres::tokio_postgres::NoTls,
    )?;

    let search = Arc::new(SearchClient::new(SearchClientConfig {
        base_url: config.search_url.clone(),
        user: config.search_user.clone(),
        password: config.search_password.clone(),
        page_token_secret: config.page_token_secret.clone().into_bytes(),
    })?);

    let store = Arc::new(Store::new(pool.clone()));
    let service = Arc::new(Service::new(store.clone(), search.clone()));
    let reindexer = Reindexer::new(pool.clone(), search.clone());
    let reindex = Arc::new(ReindexManager::new(reindexer, config.reindex_max_concurrency));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut worker_tasks = Vec::new();
    for app_id in &config.worker_app_ids {
        let app_id = app_id.trim();
        if app_id.is_empty() {
            continue;
        }
        let worker = catalog_indexer::Worker::new(
            store.clone(),
            search.clone(),
            catalog_indexer::WorkerConfig {
                app_id: app_id.to_string(),
                worker_id: config.worker_id.clone(),
                batch_size: config.worker_batch_size,
                lock_timeout: Duration::from_millis(config.worker_lock_ms),
                poll_interval: Duration::from_millis(config.worker_poll_ms),
            },
        );
        let rx = shutdown_rx.clone();
        worker_tasks.push(tokio::spawn(async move { worker.run(rx).await }));
    }

    let state = AppState {
        config: Arc::new(config.clone()),
        service,
        reindex,
    };
    let app = catalog_server::router(state);

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    tracing::info!(addr = %config.http_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    for task in worker_tasks {
        let _ = task.await;
    }

    Ok(())
}
