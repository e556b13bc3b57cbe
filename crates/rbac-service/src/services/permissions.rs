//! 역할-메뉴 권한 관리와 권한 검사.

use std::sync::Arc;

use chrono::Utc;
use rbac_core::{
    evaluate_access, Action, Permissions, RbacError, RbacResult, Resource, RoleMenuAccess,
};
use serde::Deserialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::WriteGate;
use crate::store::{AccessStore, MenuStore, RbacStore, RoleStore};

/// 권한 부여 입력. 생략된 플래그는 조회만 허용하는 기본값을 따릅니다.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccess {
    pub role_id: Uuid,
    pub menu_id: Uuid,
    #[serde(default)]
    pub can_view: Option<bool>,
    #[serde(default)]
    pub can_create: Option<bool>,
    #[serde(default)]
    pub can_update: Option<bool>,
    #[serde(default)]
    pub can_delete: Option<bool>,
}

impl NewAccess {
    /// 주어진 권한 4종으로 입력을 생성합니다.
    pub fn with_permissions(role_id: Uuid, menu_id: Uuid, permissions: Permissions) -> Self {
        Self {
            role_id,
            menu_id,
            can_view: Some(permissions.can_view),
            can_create: Some(permissions.can_create),
            can_update: Some(permissions.can_update),
            can_delete: Some(permissions.can_delete),
        }
    }

    fn permissions(&self) -> Permissions {
        Permissions {
            can_view: self.can_view.unwrap_or(true),
            can_create: self.can_create.unwrap_or(false),
            can_update: self.can_update.unwrap_or(false),
            can_delete: self.can_delete.unwrap_or(false),
        }
    }
}

/// 권한 수정 입력. `None` 플래그는 변경하지 않습니다.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPatch {
    #[serde(default)]
    pub can_view: Option<bool>,
    #[serde(default)]
    pub can_create: Option<bool>,
    #[serde(default)]
    pub can_update: Option<bool>,
    #[serde(default)]
    pub can_delete: Option<bool>,
}

impl AccessPatch {
    fn apply(&self, permissions: &mut Permissions) {
        if let Some(v) = self.can_view {
            permissions.can_view = v;
        }
        if let Some(v) = self.can_create {
            permissions.can_create = v;
        }
        if let Some(v) = self.can_update {
            permissions.can_update = v;
        }
        if let Some(v) = self.can_delete {
            permissions.can_delete = v;
        }
    }
}

/// 권한 서비스.
#[derive(Clone)]
pub struct PermissionService {
    store: Arc<dyn RbacStore>,
    gate: Arc<WriteGate>,
}

impl PermissionService {
    pub fn new(store: Arc<dyn RbacStore>, gate: Arc<WriteGate>) -> Self {
        Self { store, gate }
    }

    /// 역할이 메뉴에 대해 액션을 수행할 수 있는지 확인합니다.
    ///
    /// 권한 행이 없으면 거부합니다. 상위 메뉴 권한은 상속되지 않습니다.
    #[instrument(skip(self))]
    pub async fn check(&self, role_id: Uuid, menu_code: &str, action: Action) -> RbacResult<bool> {
        let row = self.store.find_access_by_code(role_id, menu_code).await?;
        let allowed = evaluate_access(row.as_ref(), action);

        if !allowed {
            debug!(has_row = row.is_some(), "Permission denied");
        }
        Ok(allowed)
    }

    /// 권한이 없으면 `Forbidden`을 반환합니다. 어떤 플래그가 실패했는지는 노출하지 않습니다.
    pub async fn require(&self, role_id: Uuid, menu_code: &str, action: Action) -> RbacResult<()> {
        if self.check(role_id, menu_code, action).await? {
            Ok(())
        } else {
            Err(RbacError::Forbidden)
        }
    }

    /// 권한 행을 생성합니다. (역할, 메뉴) 쌍당 하나만 허용됩니다.
    #[instrument(skip(self, input), fields(role_id = %input.role_id, menu_id = %input.menu_id))]
    pub async fn grant(&self, input: NewAccess) -> RbacResult<RoleMenuAccess> {
        let _guard = self.gate.enter().await;

        if self.store.find_role(input.role_id).await?.is_none() {
            return Err(RbacError::not_found(Resource::Role, input.role_id));
        }
        if self.store.find_menu(input.menu_id).await?.is_none() {
            return Err(RbacError::not_found(Resource::Menu, input.menu_id));
        }
        if self
            .store
            .find_access_for(input.role_id, input.menu_id)
            .await?
            .is_some()
        {
            return Err(RbacError::AlreadyExists(Resource::Permission));
        }

        let access = RoleMenuAccess::new(input.role_id, input.menu_id, input.permissions());
        self.store
            .insert_access(&access)
            .await
            .map_err(|e| e.or_conflict(RbacError::AlreadyExists(Resource::Permission)))?;

        info!(access_id = %access.id, permissions = ?access.permissions, "Permission granted");
        Ok(access)
    }

    /// 권한 플래그를 수정합니다.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: Uuid, patch: AccessPatch) -> RbacResult<RoleMenuAccess> {
        let _guard = self.gate.enter().await;

        let mut access = self.find(id).await?;
        patch.apply(&mut access.permissions);
        access.updated_at = Utc::now();
        self.store.update_access(&access).await?;

        info!(access_id = %id, permissions = ?access.permissions, "Permission updated");
        Ok(access)
    }

    /// 권한 행을 삭제합니다.
    #[instrument(skip(self))]
    pub async fn revoke(&self, id: Uuid) -> RbacResult<()> {
        let _guard = self.gate.enter().await;

        if self.store.delete_access(id).await? == 0 {
            return Err(RbacError::not_found(Resource::Permission, id));
        }

        info!(access_id = %id, "Permission revoked");
        Ok(())
    }

    /// 권한 행을 조회합니다.
    pub async fn find(&self, id: Uuid) -> RbacResult<RoleMenuAccess> {
        self.store
            .find_access(id)
            .await?
            .ok_or_else(|| RbacError::not_found(Resource::Permission, id))
    }

    /// 역할의 권한 행 목록 (메뉴 순서).
    pub async fn list_for_role(&self, role_id: Uuid) -> RbacResult<Vec<RoleMenuAccess>> {
        if self.store.find_role(role_id).await?.is_none() {
            return Err(RbacError::not_found(Resource::Role, role_id));
        }
        Ok(self.store.list_access_for_role(role_id).await?)
    }
}
