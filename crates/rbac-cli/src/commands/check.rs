//! 권한 점검.

use anyhow::Result;
use rbac_core::Action;
use rbac_service::AppState;
use uuid::Uuid;

/// 역할이 메뉴에 대해 액션을 수행할 수 있는지 반환합니다.
pub async fn run(state: &AppState, role_id: Uuid, menu_code: &str, action: Action) -> Result<bool> {
    Ok(state.permissions.check(role_id, menu_code, action).await?)
}
