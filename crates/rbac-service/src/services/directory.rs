//! 사용자, 역할, 사용자-역할 할당 관리.
//!
//! 삭제는 `is_active`를 내리는 소프트 삭제입니다. 역할 코드는 생성 후
//! 변경할 수 없습니다.

use std::sync::Arc;

use chrono::Utc;
use rbac_core::{
    MembershipWithRole, RbacError, RbacResult, Resource, Role, User, UserRoleMembership,
};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use super::WriteGate;
use crate::auth::hash_password;
use crate::store::{MembershipStore, RbacStore, RoleStore, UserStore};

/// 사용자 생성 입력.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
}

/// 사용자 수정 입력. `None` 필드는 변경하지 않습니다.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// 역할 생성 입력.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRole {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// 역할 수정 입력. 코드는 포함하지 않습니다.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// 역할 할당 입력.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignment {
    pub role_id: Uuid,
    #[serde(default)]
    pub is_default: bool,
}

/// 사용자/역할 디렉터리 서비스.
#[derive(Clone)]
pub struct DirectoryService {
    store: Arc<dyn RbacStore>,
    gate: Arc<WriteGate>,
}

impl DirectoryService {
    pub fn new(store: Arc<dyn RbacStore>, gate: Arc<WriteGate>) -> Self {
        Self { store, gate }
    }

    async fn require_user(&self, id: Uuid) -> RbacResult<User> {
        self.store
            .find_user(id)
            .await?
            .ok_or_else(|| RbacError::not_found(Resource::User, id))
    }

    async fn require_role(&self, id: Uuid) -> RbacResult<Role> {
        self.store
            .find_role(id)
            .await?
            .ok_or_else(|| RbacError::not_found(Resource::Role, id))
    }

    // ============================================================================================
    // Users
    // ============================================================================================

    /// 사용자를 생성합니다. 사용자 이름과 이메일은 고유해야 합니다.
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn create_user(&self, input: NewUser) -> RbacResult<User> {
        let _guard = self.gate.enter().await;

        if self
            .store
            .user_conflicts(&input.username, &input.email)
            .await?
        {
            return Err(RbacError::AlreadyExists(Resource::User));
        }

        let password_hash = hash_password(&input.password)?;
        let user = User::new(input.username, input.email, password_hash, input.full_name);
        self.store
            .insert_user(&user)
            .await
            .map_err(|e| e.or_conflict(RbacError::AlreadyExists(Resource::User)))?;

        info!(user_id = %user.id, "User created");
        Ok(user)
    }

    /// 사용자를 수정합니다. 이메일 변경 시 고유성을 다시 확인하고,
    /// 비밀번호가 주어지면 다시 해싱합니다.
    #[instrument(skip(self, patch))]
    pub async fn update_user(&self, id: Uuid, patch: UserPatch) -> RbacResult<User> {
        let _guard = self.gate.enter().await;
        let mut user = self.require_user(id).await?;

        if let Some(email) = patch.email {
            if email != user.email {
                if let Some(other) = self.store.find_user_by_email(&email).await? {
                    if other.id != id {
                        return Err(RbacError::AlreadyExists(Resource::User));
                    }
                }
                user.email = email;
            }
        }
        if let Some(password) = patch.password {
            user.password_hash = hash_password(&password)?;
        }
        if let Some(full_name) = patch.full_name {
            user.full_name = full_name;
        }
        if let Some(is_active) = patch.is_active {
            user.is_active = is_active;
        }
        user.updated_at = Utc::now();

        self.store
            .update_user(&user)
            .await
            .map_err(|e| e.or_conflict(RbacError::AlreadyExists(Resource::User)))?;

        info!(user_id = %id, "User updated");
        Ok(user)
    }

    /// 사용자를 비활성화합니다 (소프트 삭제).
    #[instrument(skip(self))]
    pub async fn deactivate_user(&self, id: Uuid) -> RbacResult<User> {
        let _guard = self.gate.enter().await;
        let mut user = self.require_user(id).await?;
        user.deactivate();
        self.store.update_user(&user).await?;

        info!(user_id = %id, "User deactivated");
        Ok(user)
    }

    /// 전체 사용자 목록.
    pub async fn list_users(&self) -> RbacResult<Vec<User>> {
        Ok(self.store.list_users().await?)
    }

    // ============================================================================================
    // Roles
    // ============================================================================================

    /// 역할을 생성합니다. 이름 또는 코드가 겹치면 거부합니다.
    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_role(&self, input: NewRole) -> RbacResult<Role> {
        let _guard = self.gate.enter().await;

        if self.store.role_conflicts(&input.name, &input.code).await? {
            return Err(RbacError::AlreadyExists(Resource::Role));
        }

        let mut role = Role::new(input.name, input.code);
        role.description = input.description;
        self.store
            .insert_role(&role)
            .await
            .map_err(|e| e.or_conflict(RbacError::AlreadyExists(Resource::Role)))?;

        info!(role_id = %role.id, code = %role.code, "Role created");
        Ok(role)
    }

    /// 역할을 수정합니다. 이름이 바뀌면 고유성을 다시 확인합니다.
    #[instrument(skip(self, patch))]
    pub async fn update_role(&self, id: Uuid, patch: RolePatch) -> RbacResult<Role> {
        let _guard = self.gate.enter().await;
        let mut role = self.require_role(id).await?;

        if let Some(name) = patch.name {
            if name != role.name {
                if let Some(other) = self.store.find_role_by_name(&name).await? {
                    if other.id != id {
                        return Err(RbacError::AlreadyExists(Resource::Role));
                    }
                }
                role.name = name;
            }
        }
        if let Some(description) = patch.description {
            role.description = Some(description);
        }
        if let Some(is_active) = patch.is_active {
            role.is_active = is_active;
        }
        role.updated_at = Utc::now();

        self.store
            .update_role(&role)
            .await
            .map_err(|e| e.or_conflict(RbacError::AlreadyExists(Resource::Role)))?;

        info!(role_id = %id, "Role updated");
        Ok(role)
    }

    /// 역할을 비활성화합니다. 이 역할을 선택한 로그인은 `RoleInactive`로 거부됩니다.
    #[instrument(skip(self))]
    pub async fn deactivate_role(&self, id: Uuid) -> RbacResult<Role> {
        let _guard = self.gate.enter().await;
        let mut role = self.require_role(id).await?;
        role.deactivate();
        self.store.update_role(&role).await?;

        info!(role_id = %id, "Role deactivated");
        Ok(role)
    }

    /// 전체 역할 목록.
    pub async fn list_roles(&self) -> RbacResult<Vec<Role>> {
        Ok(self.store.list_roles().await?)
    }

    // ============================================================================================
    // Memberships
    // ============================================================================================

    /// 사용자에게 역할을 할당합니다.
    ///
    /// 기본 역할로 할당하면 사용자의 다른 할당에서 기본 플래그를 먼저
    /// 내려, 기본 역할이 최대 하나가 되도록 유지합니다.
    #[instrument(skip(self, assignment), fields(role_id = %assignment.role_id, is_default = assignment.is_default))]
    pub async fn assign_role(
        &self,
        user_id: Uuid,
        assignment: RoleAssignment,
        assigned_by: Option<Uuid>,
    ) -> RbacResult<UserRoleMembership> {
        let _guard = self.gate.enter().await;

        self.require_user(user_id).await?;
        self.require_role(assignment.role_id).await?;

        if self
            .store
            .find_membership(user_id, assignment.role_id)
            .await?
            .is_some()
        {
            return Err(RbacError::AlreadyExists(Resource::Assignment));
        }

        let membership =
            UserRoleMembership::new(user_id, assignment.role_id, assignment.is_default, assigned_by);
        let cleared = self
            .store
            .insert_membership(&membership)
            .await
            .map_err(|e| e.or_conflict(RbacError::AlreadyExists(Resource::Assignment)))?;
        if cleared > 0 {
            info!(user_id = %user_id, cleared, "Previous default role cleared");
        }

        info!(user_id = %user_id, role_id = %assignment.role_id, "Role assigned");
        Ok(membership)
    }

    /// 역할 할당을 해제합니다.
    #[instrument(skip(self))]
    pub async fn remove_role(&self, user_id: Uuid, role_id: Uuid) -> RbacResult<()> {
        let _guard = self.gate.enter().await;

        let removed = self.store.delete_membership(user_id, role_id).await?;
        if removed == 0 {
            return Err(RbacError::not_found(
                Resource::Assignment,
                format!("{}/{}", user_id, role_id),
            ));
        }

        info!(user_id = %user_id, role_id = %role_id, "Role removed");
        Ok(())
    }

    /// 사용자의 역할 할당 목록 (할당 시각 오름차순).
    pub async fn user_roles(&self, user_id: Uuid) -> RbacResult<Vec<MembershipWithRole>> {
        self.require_user(user_id).await?;
        Ok(self.store.list_for_user(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> DirectoryService {
        DirectoryService::new(Arc::new(MemoryStore::new()), Arc::new(WriteGate::new()))
    }

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: "Password1".to_string(),
            full_name: username.to_string(),
        }
    }

    fn new_role(name: &str, code: &str) -> NewRole {
        NewRole {
            name: name.to_string(),
            code: code.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_user() {
        let dir = service();
        dir.create_user(new_user("john")).await.unwrap();

        let mut other = new_user("jane");
        other.email = "john@example.com".to_string();
        assert!(matches!(
            dir.create_user(other).await,
            Err(RbacError::AlreadyExists(Resource::User))
        ));
    }

    #[tokio::test]
    async fn test_role_name_or_code_collision() {
        let dir = service();
        dir.create_role(new_role("Staff", "STAFF")).await.unwrap();

        assert!(matches!(
            dir.create_role(new_role("Staff", "OTHER")).await,
            Err(RbacError::AlreadyExists(Resource::Role))
        ));
        assert!(matches!(
            dir.create_role(new_role("Other", "STAFF")).await,
            Err(RbacError::AlreadyExists(Resource::Role))
        ));
    }

    #[tokio::test]
    async fn test_update_role_rechecks_name() {
        let dir = service();
        dir.create_role(new_role("Staff", "STAFF")).await.unwrap();
        let manager = dir.create_role(new_role("Manager", "MANAGER")).await.unwrap();

        let patch = RolePatch {
            name: Some("Staff".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            dir.update_role(manager.id, patch).await,
            Err(RbacError::AlreadyExists(Resource::Role))
        ));

        let renamed = dir
            .update_role(
                manager.id,
                RolePatch {
                    name: Some("Team Lead".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Team Lead");
        assert_eq!(renamed.code, "MANAGER");
    }

    #[tokio::test]
    async fn test_single_default_membership() {
        let dir = service();
        let user = dir.create_user(new_user("john")).await.unwrap();
        let staff = dir.create_role(new_role("Staff", "STAFF")).await.unwrap();
        let manager = dir.create_role(new_role("Manager", "MANAGER")).await.unwrap();

        let assign = |role_id, is_default| RoleAssignment { role_id, is_default };
        dir.assign_role(user.id, assign(staff.id, true), None).await.unwrap();
        dir.assign_role(user.id, assign(manager.id, true), Some(user.id))
            .await
            .unwrap();

        let roles = dir.user_roles(user.id).await.unwrap();
        let defaults: Vec<_> = roles
            .iter()
            .filter(|m| m.membership.is_default)
            .map(|m| m.role.code.as_str())
            .collect();
        assert_eq!(defaults, vec!["MANAGER"]);
        assert_eq!(roles[1].membership.assigned_by, Some(user.id));
    }

    #[tokio::test]
    async fn test_rejected_default_assignment_keeps_current_default() {
        let dir = service();
        let user = dir.create_user(new_user("john")).await.unwrap();
        let staff = dir.create_role(new_role("Staff", "STAFF")).await.unwrap();
        let assign = RoleAssignment {
            role_id: staff.id,
            is_default: true,
        };

        dir.assign_role(user.id, assign.clone(), None).await.unwrap();
        assert!(matches!(
            dir.assign_role(user.id, assign, None).await,
            Err(RbacError::AlreadyExists(Resource::Assignment))
        ));

        let roles = dir.user_roles(user.id).await.unwrap();
        assert_eq!(roles.len(), 1);
        assert!(roles[0].membership.is_default);
    }

    #[tokio::test]
    async fn test_assignment_errors() {
        let dir = service();
        let user = dir.create_user(new_user("john")).await.unwrap();
        let staff = dir.create_role(new_role("Staff", "STAFF")).await.unwrap();
        let assign = RoleAssignment {
            role_id: staff.id,
            is_default: false,
        };

        dir.assign_role(user.id, assign.clone(), None).await.unwrap();
        assert!(matches!(
            dir.assign_role(user.id, assign.clone(), None).await,
            Err(RbacError::AlreadyExists(Resource::Assignment))
        ));
        assert!(matches!(
            dir.assign_role(Uuid::new_v4(), assign, None).await,
            Err(RbacError::NotFound { resource: Resource::User, .. })
        ));

        dir.remove_role(user.id, staff.id).await.unwrap();
        assert!(matches!(
            dir.remove_role(user.id, staff.id).await,
            Err(RbacError::NotFound { resource: Resource::Assignment, .. })
        ));
    }

    #[tokio::test]
    async fn test_update_user_email_uniqueness() {
        let dir = service();
        dir.create_user(new_user("john")).await.unwrap();
        let jane = dir.create_user(new_user("jane")).await.unwrap();

        let patch = UserPatch {
            email: Some("john@example.com".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            dir.update_user(jane.id, patch).await,
            Err(RbacError::AlreadyExists(Resource::User))
        ));

        let deactivated = dir.deactivate_user(jane.id).await.unwrap();
        assert!(!deactivated.is_active);
    }
}
