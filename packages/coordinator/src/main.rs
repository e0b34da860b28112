use std::sync::Arc;

use coordinator::config::AppConfig;
use coordinator::database::init_db;
use coordinator::state::AppState;
use coordinator::store::DbStore;
use coordinator::{Coordinator, build_router};
use mq::{BroccoliChannel, MqConfig, init_mq};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = AppConfig::load()?;

    let db = init_db(&config.database).await?;
    info!("Database ready");

    let queue = init_mq(MqConfig {
        url: config.mq.url.clone(),
        pool_size: config.mq.pool_size,
    })
    .await?;
    let channel = Arc::new(BroccoliChannel::new(
        Arc::new(queue),
        config.mq.dlq_queue_name.clone(),
    ));

    let coordinator = Coordinator::new(
        &config,
        Arc::new(DbStore::new(db)),
        channel,
        config.judge.enable_result_consumer,
    );
    let _subscription = coordinator.start().await?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        config: Arc::new(config),
        submissions: coordinator.submissions(),
    };
    let app = build_router(state);

    info!("Coordinator listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
