//! 메뉴 트리 출력.

use anyhow::Result;
use rbac_service::AppState;
use uuid::Uuid;

/// 메뉴 트리를 JSON 문자열로 반환합니다.
///
/// 역할을 지정하면 해당 역할이 조회할 수 있는 활성 메뉴만 권한과 함께 포함됩니다.
pub async fn run(state: &AppState, include_inactive: bool, role: Option<Uuid>) -> Result<String> {
    let tree = match role {
        // 사용자 ID는 추적용이므로 CLI에서는 nil
        Some(role_id) => state.menus.accessible_tree(Uuid::nil(), role_id).await?,
        None => state.menus.tree(include_inactive).await?,
    };
    Ok(serde_json::to_string_pretty(&tree)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbac_core::AuthConfig;
    use rbac_service::store::RoleStore;
    use rbac_service::{seed_defaults, DEFAULT_ADMIN_PASSWORD};
    use serde_json::Value;

    #[tokio::test]
    async fn test_role_tree_only_contains_viewable_menus() {
        let state = AppState::in_memory(&AuthConfig::new("cli-access", "cli-refresh"));
        seed_defaults(&state, DEFAULT_ADMIN_PASSWORD).await.unwrap();
        let staff = state
            .store()
            .find_role_by_code("STAFF")
            .await
            .unwrap()
            .unwrap();

        let json: Value = serde_json::from_str(&run(&state, false, Some(staff.id)).await.unwrap())
            .unwrap();
        let nodes = json.as_array().unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0]["menuCode"], "DASHBOARD");
        assert_eq!(nodes[0]["permissions"]["canCreate"], false);

        let full: Value = serde_json::from_str(&run(&state, false, None).await.unwrap()).unwrap();
        assert_eq!(full.as_array().unwrap().len(), 4);
    }
}
