//! 만료 세션 정리.
//!
//! 서비스는 만료된 세션을 자동으로 삭제하지 않습니다. 만료된 세션은
//! 갱신에 쓰이지 않을 뿐 남아 있으므로 주기적으로 이 명령을 실행합니다.

use anyhow::Result;
use chrono::Utc;
use rbac_service::store::SessionStore;
use rbac_service::AppState;

/// 현재 시각 기준 만료된 세션을 삭제하고 삭제 수를 반환합니다.
pub async fn run(state: &AppState) -> Result<u64> {
    Ok(state.store().purge_expired(Utc::now()).await?)
}
