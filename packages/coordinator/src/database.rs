use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tracing::info;

use crate::config::DatabaseConfig;

/// Connect and bring the schema in line with the entities.
pub async fn init_db(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("coordinator::entity::*")
        .sync(&db)
        .await?;
    info!(max_connections = config.max_connections, "Schema synced");

    Ok(db)
}
