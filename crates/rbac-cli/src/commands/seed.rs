//! 초기 데이터 생성.

use anyhow::{Context, Result};
use rbac_service::{seed_defaults, AppState, SeedReport, DEFAULT_ADMIN_PASSWORD};
use tracing::warn;

/// 기본 데이터를 생성합니다. 비밀번호를 생략하면 기본값을 사용합니다.
pub async fn run(state: &AppState, admin_password: Option<&str>) -> Result<SeedReport> {
    let password = admin_password.unwrap_or_else(|| {
        warn!("Using default admin password; change it after first login");
        DEFAULT_ADMIN_PASSWORD
    });

    seed_defaults(state, password)
        .await
        .context("Seeding failed")
}
