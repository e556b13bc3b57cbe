//! 토큰 갱신 도중 세션이 삭제되는 경우.
//!
//! 세션 조회 직후 같은 세션을 지우는 저장소로 로그아웃 경쟁을 재현합니다.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rbac_core::{
    AuthConfig, Menu, MembershipWithRole, NewSession, RbacError, Role, RoleMenuAccess, Session,
    User, UserRoleMembership,
};
use rbac_service::store::{
    AccessStore, MembershipStore, MemoryStore, MenuStore, RoleStore, SessionStore, StoreResult,
    UserStore,
};
use rbac_service::{AppState, LoginRequest, NewRole, NewUser, RoleAssignment};
use tokio::sync::Mutex;
use uuid::Uuid;

const PASSWORD: &str = "correct-horse-battery";

/// 활성화되면 Refresh Token 조회 직후 해당 세션을 삭제합니다.
#[derive(Default)]
struct RevokingStore {
    inner: MemoryStore,
    revoke_on_lookup: Mutex<bool>,
}

#[async_trait]
impl UserStore for RevokingStore {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.inner.find_user(id).await
    }
    async fn find_user_by_login(&self, username_or_email: &str) -> StoreResult<Option<User>> {
        self.inner.find_user_by_login(username_or_email).await
    }
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.inner.find_user_by_email(email).await
    }
    async fn user_conflicts(&self, username: &str, email: &str) -> StoreResult<bool> {
        self.inner.user_conflicts(username, email).await
    }
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        self.inner.list_users().await
    }
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        self.inner.insert_user(user).await
    }
    async fn update_user(&self, user: &User) -> StoreResult<u64> {
        self.inner.update_user(user).await
    }
}

#[async_trait]
impl RoleStore for RevokingStore {
    async fn find_role(&self, id: Uuid) -> StoreResult<Option<Role>> {
        self.inner.find_role(id).await
    }
    async fn find_role_by_code(&self, code: &str) -> StoreResult<Option<Role>> {
        self.inner.find_role_by_code(code).await
    }
    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        self.inner.find_role_by_name(name).await
    }
    async fn role_conflicts(&self, name: &str, code: &str) -> StoreResult<bool> {
        self.inner.role_conflicts(name, code).await
    }
    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        self.inner.list_roles().await
    }
    async fn insert_role(&self, role: &Role) -> StoreResult<()> {
        self.inner.insert_role(role).await
    }
    async fn update_role(&self, role: &Role) -> StoreResult<u64> {
        self.inner.update_role(role).await
    }
}

#[async_trait]
impl MembershipStore for RevokingStore {
    async fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<MembershipWithRole>> {
        self.inner.list_for_user(user_id).await
    }
    async fn find_membership(
        &self,
        user_id: Uuid,
        role_id: Uuid,
    ) -> StoreResult<Option<UserRoleMembership>> {
        self.inner.find_membership(user_id, role_id).await
    }
    async fn insert_membership(&self, membership: &UserRoleMembership) -> StoreResult<u64> {
        self.inner.insert_membership(membership).await
    }
    async fn delete_membership(&self, user_id: Uuid, role_id: Uuid) -> StoreResult<u64> {
        self.inner.delete_membership(user_id, role_id).await
    }
}

#[async_trait]
impl MenuStore for RevokingStore {
    async fn list_menus(&self) -> StoreResult<Vec<Menu>> {
        self.inner.list_menus().await
    }
    async fn find_menu(&self, id: Uuid) -> StoreResult<Option<Menu>> {
        self.inner.find_menu(id).await
    }
    async fn find_menu_by_code(&self, code: &str) -> StoreResult<Option<Menu>> {
        self.inner.find_menu_by_code(code).await
    }
    async fn insert_menu(&self, menu: &Menu) -> StoreResult<()> {
        self.inner.insert_menu(menu).await
    }
    async fn update_menu(&self, menu: &Menu) -> StoreResult<u64> {
        self.inner.update_menu(menu).await
    }
    async fn delete_menu(&self, id: Uuid) -> StoreResult<u64> {
        self.inner.delete_menu(id).await
    }
}

#[async_trait]
impl AccessStore for RevokingStore {
    async fn find_access(&self, id: Uuid) -> StoreResult<Option<RoleMenuAccess>> {
        self.inner.find_access(id).await
    }
    async fn find_access_for(
        &self,
        role_id: Uuid,
        menu_id: Uuid,
    ) -> StoreResult<Option<RoleMenuAccess>> {
        self.inner.find_access_for(role_id, menu_id).await
    }
    async fn find_access_by_code(
        &self,
        role_id: Uuid,
        menu_code: &str,
    ) -> StoreResult<Option<RoleMenuAccess>> {
        self.inner.find_access_by_code(role_id, menu_code).await
    }
    async fn list_access_for_role(&self, role_id: Uuid) -> StoreResult<Vec<RoleMenuAccess>> {
        self.inner.list_access_for_role(role_id).await
    }
    async fn list_access_for_menu(&self, menu_id: Uuid) -> StoreResult<Vec<RoleMenuAccess>> {
        self.inner.list_access_for_menu(menu_id).await
    }
    async fn insert_access(&self, access: &RoleMenuAccess) -> StoreResult<()> {
        self.inner.insert_access(access).await
    }
    async fn update_access(&self, access: &RoleMenuAccess) -> StoreResult<u64> {
        self.inner.update_access(access).await
    }
    async fn delete_access(&self, id: Uuid) -> StoreResult<u64> {
        self.inner.delete_access(id).await
    }
}

#[async_trait]
impl SessionStore for RevokingStore {
    async fn create_session(&self, session: NewSession) -> StoreResult<Session> {
        self.inner.create_session(session).await
    }

    async fn find_active_by_refresh_token(
        &self,
        refresh_token: &str,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Session>> {
        let found = self
            .inner
            .find_active_by_refresh_token(refresh_token, user_id, now)
            .await?;
        if let Some(session) = &found {
            if *self.revoke_on_lookup.lock().await {
                self.inner
                    .delete_by_user_and_token(session.user_id, &session.access_token)
                    .await?;
            }
        }
        Ok(found)
    }

    async fn replace_access_token(
        &self,
        session_id: Uuid,
        access_token: &str,
    ) -> StoreResult<u64> {
        self.inner.replace_access_token(session_id, access_token).await
    }

    async fn delete_by_user_and_token(
        &self,
        user_id: Uuid,
        access_token: &str,
    ) -> StoreResult<u64> {
        self.inner.delete_by_user_and_token(user_id, access_token).await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        self.inner.purge_expired(now).await
    }
}

#[tokio::test]
async fn test_refresh_fails_when_session_removed_concurrently() {
    let store = Arc::new(RevokingStore::default());
    let state = AppState::new(
        store.clone(),
        &AuthConfig::new("race-access-secret", "race-refresh-secret"),
    );

    let role = state
        .directory
        .create_role(NewRole {
            name: "Staff".to_string(),
            code: "STAFF".to_string(),
            description: None,
        })
        .await
        .unwrap();
    let user = state
        .directory
        .create_user(NewUser {
            username: "choi".to_string(),
            email: "choi@example.com".to_string(),
            password: PASSWORD.to_string(),
            full_name: "Choi Yuna".to_string(),
        })
        .await
        .unwrap();
    state
        .directory
        .assign_role(
            user.id,
            RoleAssignment {
                role_id: role.id,
                is_default: true,
            },
            None,
        )
        .await
        .unwrap();

    let login = state
        .auth
        .login(LoginRequest::new("choi", PASSWORD))
        .await
        .unwrap();
    assert!(state.auth.refresh(&login.refresh_token).await.is_ok());

    *store.revoke_on_lookup.lock().await = true;
    assert!(matches!(
        state.auth.refresh(&login.refresh_token).await,
        Err(RbacError::InvalidToken)
    ));
    assert_eq!(store.inner.session_count().await, 0);
}
