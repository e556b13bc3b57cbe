//! 스키마 마이그레이션.

use anyhow::{Context, Result};
use rbac_service::PgStore;
use tracing::info;

/// 대기 중인 마이그레이션을 적용합니다.
pub async fn run(store: &PgStore) -> Result<()> {
    info!("Running migrations...");
    store.migrate().await.context("Migration failed")?;
    info!("Migrations applied");
    Ok(())
}
