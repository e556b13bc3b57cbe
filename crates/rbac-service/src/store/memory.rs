//! 인메모리 저장소.
//!
//! SQL 스키마와 같은 고유 제약을 적용하고, 메뉴 삭제 시 권한 행을
//! 함께 지웁니다. 각 연산은 단일 쓰기 락 구간 안에서 검사와 기록을
//! 모두 수행하므로 원자적입니다.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rbac_core::{
    Menu, MembershipWithRole, NewSession, Role, RoleMenuAccess, Session, User, UserRoleMembership,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    constraints, AccessStore, MembershipStore, MenuStore, RoleStore, SessionStore, StoreError,
    StoreResult, UserStore,
};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    roles: Vec<Role>,
    memberships: Vec<UserRoleMembership>,
    menus: Vec<Menu>,
    access: Vec<RoleMenuAccess>,
    sessions: Vec<Session>,
}

fn unique(constraint: &str) -> StoreError {
    StoreError::UniqueViolation {
        constraint: constraint.to_string(),
    }
}

/// 교체 헬퍼: ID가 같은 행을 바꾸고 바뀐 행 수를 반환합니다.
fn replace<T: Clone>(rows: &mut [T], value: &T, same: impl Fn(&T) -> bool) -> u64 {
    match rows.iter_mut().find(|row| same(row)) {
        Some(row) => {
            *row = value.clone();
            1
        }
        None => 0,
    }
}

fn remove_where<T>(rows: &mut Vec<T>, pred: impl Fn(&T) -> bool) -> u64 {
    let before = rows.len();
    rows.retain(|row| !pred(row));
    (before - rows.len()) as u64
}

/// 인메모리 RBAC 저장소.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// 빈 저장소를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장된 세션 수 (만료 포함).
    pub async fn session_count(&self) -> usize {
        self.tables.read().await.sessions.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_login(&self, username_or_email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.matches_login(username_or_email))
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn user_conflicts(&self, username: &str, email: &str) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .any(|u| u.username == username || u.email == email))
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users = tables.users.clone();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(unique(constraints::USERS_USERNAME));
        }
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(unique(constraints::USERS_EMAIL));
        }
        tables.users.push(user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .iter()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(unique(constraints::USERS_EMAIL));
        }
        if tables
            .users
            .iter()
            .any(|u| u.id != user.id && u.username == user.username)
        {
            return Err(unique(constraints::USERS_USERNAME));
        }
        Ok(replace(&mut tables.users, user, |u| u.id == user.id))
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn find_role(&self, id: Uuid) -> StoreResult<Option<Role>> {
        let tables = self.tables.read().await;
        Ok(tables.roles.iter().find(|r| r.id == id).cloned())
    }

    async fn find_role_by_code(&self, code: &str) -> StoreResult<Option<Role>> {
        let tables = self.tables.read().await;
        Ok(tables.roles.iter().find(|r| r.code == code).cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        let tables = self.tables.read().await;
        Ok(tables.roles.iter().find(|r| r.name == name).cloned())
    }

    async fn role_conflicts(&self, name: &str, code: &str) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables.roles.iter().any(|r| r.name == name || r.code == code))
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        let tables = self.tables.read().await;
        let mut roles = tables.roles.clone();
        roles.sort_by_key(|r| r.created_at);
        Ok(roles)
    }

    async fn insert_role(&self, role: &Role) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.roles.iter().any(|r| r.name == role.name) {
            return Err(unique(constraints::ROLES_NAME));
        }
        if tables.roles.iter().any(|r| r.code == role.code) {
            return Err(unique(constraints::ROLES_CODE));
        }
        tables.roles.push(role.clone());
        Ok(())
    }

    async fn update_role(&self, role: &Role) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        if tables
            .roles
            .iter()
            .any(|r| r.id != role.id && r.name == role.name)
        {
            return Err(unique(constraints::ROLES_NAME));
        }
        if tables
            .roles
            .iter()
            .any(|r| r.id != role.id && r.code == role.code)
        {
            return Err(unique(constraints::ROLES_CODE));
        }
        Ok(replace(&mut tables.roles, role, |r| r.id == role.id))
    }
}

#[async_trait]
impl MembershipStore for MemoryStore {
    async fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<MembershipWithRole>> {
        let tables = self.tables.read().await;

        let mut memberships: Vec<&UserRoleMembership> = tables
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .collect();
        // 안정 정렬: 같은 시각이면 삽입 순서 유지
        memberships.sort_by_key(|m| m.assigned_at);

        memberships
            .into_iter()
            .map(|membership| -> StoreResult<MembershipWithRole> {
                let role = tables
                    .roles
                    .iter()
                    .find(|r| r.id == membership.role_id)
                    .cloned()
                    .ok_or_else(|| {
                        StoreError::Corrupted(format!(
                            "membership {} references missing role {}",
                            membership.id, membership.role_id
                        ))
                    })?;
                Ok(MembershipWithRole {
                    membership: membership.clone(),
                    role,
                })
            })
            .collect()
    }

    async fn find_membership(
        &self,
        user_id: Uuid,
        role_id: Uuid,
    ) -> StoreResult<Option<UserRoleMembership>> {
        let tables = self.tables.read().await;
        Ok(tables
            .memberships
            .iter()
            .find(|m| m.user_id == user_id && m.role_id == role_id)
            .cloned())
    }

    async fn insert_membership(&self, membership: &UserRoleMembership) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        if tables
            .memberships
            .iter()
            .any(|m| m.user_id == membership.user_id && m.role_id == membership.role_id)
        {
            return Err(unique(constraints::USER_ROLES_USER_ROLE));
        }

        let mut cleared = 0;
        if membership.is_default {
            for other in tables
                .memberships
                .iter_mut()
                .filter(|m| m.user_id == membership.user_id && m.is_default)
            {
                other.is_default = false;
                cleared += 1;
            }
        }
        tables.memberships.push(membership.clone());
        Ok(cleared)
    }

    async fn delete_membership(&self, user_id: Uuid, role_id: Uuid) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        Ok(remove_where(&mut tables.memberships, |m| {
            m.user_id == user_id && m.role_id == role_id
        }))
    }
}

#[async_trait]
impl MenuStore for MemoryStore {
    async fn list_menus(&self) -> StoreResult<Vec<Menu>> {
        let tables = self.tables.read().await;
        let mut menus = tables.menus.clone();
        menus.sort_by_key(|m| m.order);
        Ok(menus)
    }

    async fn find_menu(&self, id: Uuid) -> StoreResult<Option<Menu>> {
        let tables = self.tables.read().await;
        Ok(tables.menus.iter().find(|m| m.id == id).cloned())
    }

    async fn find_menu_by_code(&self, code: &str) -> StoreResult<Option<Menu>> {
        let tables = self.tables.read().await;
        Ok(tables.menus.iter().find(|m| m.code == code).cloned())
    }

    async fn insert_menu(&self, menu: &Menu) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.menus.iter().any(|m| m.code == menu.code) {
            return Err(unique(constraints::MENUS_CODE));
        }
        tables.menus.push(menu.clone());
        Ok(())
    }

    async fn update_menu(&self, menu: &Menu) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        if tables
            .menus
            .iter()
            .any(|m| m.id != menu.id && m.code == menu.code)
        {
            return Err(unique(constraints::MENUS_CODE));
        }

        // 새 부모에서 루트까지 올라가며 자신을 만나면 순환
        let mut visited = HashSet::new();
        let mut cursor = menu.parent_id;
        while let Some(id) = cursor {
            if id == menu.id {
                return Err(StoreError::CircularParent);
            }
            if !visited.insert(id) {
                break;
            }
            cursor = tables.menus.iter().find(|m| m.id == id).and_then(|m| m.parent_id);
        }

        Ok(replace(&mut tables.menus, menu, |m| m.id == menu.id))
    }

    async fn delete_menu(&self, id: Uuid) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        remove_where(&mut tables.access, |a| a.menu_id == id);
        Ok(remove_where(&mut tables.menus, |m| m.id == id))
    }
}

#[async_trait]
impl AccessStore for MemoryStore {
    async fn find_access(&self, id: Uuid) -> StoreResult<Option<RoleMenuAccess>> {
        let tables = self.tables.read().await;
        Ok(tables.access.iter().find(|a| a.id == id).cloned())
    }

    async fn find_access_for(
        &self,
        role_id: Uuid,
        menu_id: Uuid,
    ) -> StoreResult<Option<RoleMenuAccess>> {
        let tables = self.tables.read().await;
        Ok(tables
            .access
            .iter()
            .find(|a| a.role_id == role_id && a.menu_id == menu_id)
            .cloned())
    }

    async fn find_access_by_code(
        &self,
        role_id: Uuid,
        menu_code: &str,
    ) -> StoreResult<Option<RoleMenuAccess>> {
        let tables = self.tables.read().await;
        let Some(menu) = tables.menus.iter().find(|m| m.code == menu_code) else {
            return Ok(None);
        };
        Ok(tables
            .access
            .iter()
            .find(|a| a.role_id == role_id && a.menu_id == menu.id)
            .cloned())
    }

    async fn list_access_for_role(&self, role_id: Uuid) -> StoreResult<Vec<RoleMenuAccess>> {
        let tables = self.tables.read().await;
        let order_of = |menu_id: Uuid| {
            tables
                .menus
                .iter()
                .find(|m| m.id == menu_id)
                .map(|m| m.order)
                .unwrap_or(i32::MAX)
        };

        let mut rows: Vec<RoleMenuAccess> = tables
            .access
            .iter()
            .filter(|a| a.role_id == role_id)
            .cloned()
            .collect();
        rows.sort_by_key(|a| order_of(a.menu_id));
        Ok(rows)
    }

    async fn list_access_for_menu(&self, menu_id: Uuid) -> StoreResult<Vec<RoleMenuAccess>> {
        let tables = self.tables.read().await;
        Ok(tables
            .access
            .iter()
            .filter(|a| a.menu_id == menu_id)
            .cloned()
            .collect())
    }

    async fn insert_access(&self, access: &RoleMenuAccess) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .access
            .iter()
            .any(|a| a.role_id == access.role_id && a.menu_id == access.menu_id)
        {
            return Err(unique(constraints::ACCESS_ROLE_MENU));
        }
        tables.access.push(access.clone());
        Ok(())
    }

    async fn update_access(&self, access: &RoleMenuAccess) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        Ok(replace(&mut tables.access, access, |a| a.id == access.id))
    }

    async fn delete_access(&self, id: Uuid) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        Ok(remove_where(&mut tables.access, |a| a.id == id))
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, session: NewSession) -> StoreResult<Session> {
        let session = session.into_session();
        self.tables.write().await.sessions.push(session.clone());
        Ok(session)
    }

    async fn find_active_by_refresh_token(
        &self,
        refresh_token: &str,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Session>> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .iter()
            .find(|s| {
                s.refresh_token == refresh_token && s.user_id == user_id && s.is_active_at(now)
            })
            .cloned())
    }

    async fn replace_access_token(
        &self,
        session_id: Uuid,
        access_token: &str,
    ) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        match tables.sessions.iter_mut().find(|s| s.id == session_id) {
            Some(session) => {
                session.access_token = access_token.to_string();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_by_user_and_token(
        &self,
        user_id: Uuid,
        access_token: &str,
    ) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        Ok(remove_where(&mut tables.sessions, |s| {
            s.user_id == user_id && s.access_token == access_token
        }))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        Ok(remove_where(&mut tables.sessions, |s| !s.is_active_at(now)))
    }
}
